//! Patch parsing and application.
//!
//! Understands unified (`---`/`+++`/`@@`) and normal (`2c2`, `0a1`, `3,4d2`)
//! diffs. Each hunk becomes a splice that is checked against the target
//! text before it is applied.

use memsh_types::error::{Result, ShellError};

/// A line of a unified hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Add(String),
    Delete(String),
}

/// Operation letter of a normal-format hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalOp {
    Add,
    Delete,
    Change,
}

/// One parsed hunk.
///
/// Line numbers are as written in the diff: 1-based, with an empty range
/// naming the line before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchHunk {
    Unified {
        old_start: usize,
        old_count: usize,
        new_start: usize,
        new_count: usize,
        lines: Vec<HunkLine>,
    },
    Normal {
        op: NormalOp,
        /// Inclusive `(first, last)`; for `a` both are the line to insert after.
        old_range: (usize, usize),
        /// Inclusive `(first, last)`; for `d` both are the preceding new line.
        new_range: (usize, usize),
        old_lines: Vec<String>,
        new_lines: Vec<String>,
    },
}

/// Hunks for one file, with the names from its `---`/`+++` header if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub hunks: Vec<PatchHunk>,
}

const DEV_NULL: &str = "/dev/null";

impl FilePatch {
    /// The patch creates its file (old side is `/dev/null`).
    pub fn creates_file(&self, reverse: bool) -> bool {
        let side = if reverse { &self.new_path } else { &self.old_path };
        side.as_deref() == Some(DEV_NULL)
    }

    /// The patch deletes its file (new side is `/dev/null`).
    pub fn deletes_file(&self, reverse: bool) -> bool {
        self.creates_file(!reverse)
    }

    /// Candidate target names after stripping `strip` leading components,
    /// new name first. `/dev/null` is never a candidate.
    pub fn candidates(&self, strip: usize) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for path in [&self.new_path, &self.old_path].into_iter().flatten() {
            if path == DEV_NULL {
                continue;
            }
            let stripped = strip_path(path, strip);
            if !names.contains(&stripped) {
                names.push(stripped);
            }
        }
        names
    }
}

/// Remove `level` leading components from `path`.
///
/// Stripping more components than there are leaves the file name.
pub fn strip_path(path: &str, level: usize) -> String {
    if level == 0 {
        return path.to_string();
    }
    let components: Vec<&str> = path.split('/').collect();
    if level >= components.len() {
        components.last().copied().unwrap_or(path).to_string()
    } else {
        components[level..].join("/")
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse diff text into per-file hunk lists.
///
/// Text outside recognised headers and hunks is skipped. Input with no hunk
/// at all is [`ShellError::UnsupportedPatchFormat`].
pub fn parse_patch(text: &str) -> Result<Vec<FilePatch>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current = FilePatch::default();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        if let Some(name) = line.strip_prefix("--- ")
            && let Some(next) = lines.get(idx + 1)
            && let Some(new_name) = next.strip_prefix("+++ ")
        {
            if !current.hunks.is_empty() {
                files.push(std::mem::take(&mut current));
            }
            current = FilePatch {
                old_path: Some(header_name(name)),
                new_path: Some(header_name(new_name)),
                hunks: Vec::new(),
            };
            idx += 2;
        } else if line.starts_with("@@ -") {
            let (hunk, next) = parse_unified_hunk(&lines, idx)?;
            current.hunks.push(hunk);
            idx = next;
        } else if let Some((op, old_range, new_range)) = parse_normal_header(line) {
            let (hunk, next) = parse_normal_hunk(&lines, idx, op, old_range, new_range)?;
            current.hunks.push(hunk);
            idx = next;
        } else {
            idx += 1;
        }
    }
    if !current.hunks.is_empty() {
        files.push(current);
    }
    if files.is_empty() {
        return Err(ShellError::UnsupportedPatchFormat);
    }
    log::debug!(
        "parsed patch: {} file(s), {} hunk(s)",
        files.len(),
        files.iter().map(|f| f.hunks.len()).sum::<usize>()
    );
    Ok(files)
}

/// Header file name, without any tab-separated timestamp.
fn header_name(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).trim_end().to_string()
}

fn malformed(idx: usize, reason: impl Into<String>) -> ShellError {
    ShellError::MalformedPatch {
        line: idx + 1,
        reason: reason.into(),
    }
}

/// `s,c` or `s` (count 1).
fn parse_unified_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

fn parse_unified_hunk(lines: &[&str], idx: usize) -> Result<(PatchHunk, usize)> {
    let header = lines[idx];
    let body = header
        .strip_prefix("@@ ")
        .and_then(|s| s.split(" @@").next())
        .ok_or_else(|| malformed(idx, "bad hunk header"))?;
    let mut parts = body.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .and_then(parse_unified_range);
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .and_then(parse_unified_range);
    let (Some((old_start, old_count)), Some((new_start, new_count))) = (old, new) else {
        return Err(malformed(idx, "bad hunk header"));
    };

    let (mut old_left, mut new_left) = (old_count, new_count);
    let mut body_lines = Vec::new();
    let mut pos = idx + 1;
    while old_left > 0 || new_left > 0 {
        let Some(line) = lines.get(pos) else {
            return Err(malformed(pos, "truncated hunk"));
        };
        if line.starts_with('\\') {
            pos += 1;
            continue;
        }
        let parsed = match line.chars().next() {
            Some('+') if new_left > 0 => {
                new_left -= 1;
                HunkLine::Add(line[1..].to_string())
            },
            Some('-') if old_left > 0 => {
                old_left -= 1;
                HunkLine::Delete(line[1..].to_string())
            },
            Some(' ') | None if old_left > 0 && new_left > 0 => {
                old_left -= 1;
                new_left -= 1;
                HunkLine::Context(line.get(1..).unwrap_or("").to_string())
            },
            _ => return Err(malformed(pos, format!("unexpected line in hunk: {line}"))),
        };
        body_lines.push(parsed);
        pos += 1;
    }
    // A trailing "\ No newline at end of file" belongs to this hunk.
    while lines.get(pos).is_some_and(|l| l.starts_with('\\')) {
        pos += 1;
    }
    Ok((
        PatchHunk::Unified {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: body_lines,
        },
        pos,
    ))
}

/// `N` or `N,M` as an inclusive range.
fn parse_normal_range(s: &str) -> Option<(usize, usize)> {
    let range = match s.split_once(',') {
        Some((a, b)) => (a.parse().ok()?, b.parse().ok()?),
        None => {
            let n = s.parse().ok()?;
            (n, n)
        },
    };
    (range.0 <= range.1).then_some(range)
}

/// Recognise `N[,M](a|c|d)N[,M]`.
fn parse_normal_header(line: &str) -> Option<(NormalOp, (usize, usize), (usize, usize))> {
    let at = line.find(['a', 'c', 'd'])?;
    let op = match line.as_bytes()[at] {
        b'a' => NormalOp::Add,
        b'c' => NormalOp::Change,
        _ => NormalOp::Delete,
    };
    let (left, right) = (&line[..at], &line[at + 1..]);
    let is_range = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == ',');
    if !is_range(left) || !is_range(right) {
        return None;
    }
    Some((op, parse_normal_range(left)?, parse_normal_range(right)?))
}

fn parse_normal_hunk(
    lines: &[&str],
    idx: usize,
    op: NormalOp,
    old_range: (usize, usize),
    new_range: (usize, usize),
) -> Result<(PatchHunk, usize)> {
    let old_count = match op {
        NormalOp::Add => 0,
        _ => old_range.1 - old_range.0 + 1,
    };
    let new_count = match op {
        NormalOp::Delete => 0,
        _ => new_range.1 - new_range.0 + 1,
    };

    let mut pos = idx + 1;
    let take = |prefix: &str, count: usize, pos: &mut usize| -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let line = lines.get(*pos).copied().unwrap_or_default();
            let Some(text) = line.strip_prefix(prefix) else {
                return Err(malformed(*pos, format!("expected '{prefix}' line")));
            };
            out.push(text.to_string());
            *pos += 1;
        }
        Ok(out)
    };

    let old_lines = take("< ", old_count, &mut pos)?;
    if op == NormalOp::Change {
        if lines.get(pos).copied() != Some("---") {
            return Err(malformed(pos, "expected '---' separator"));
        }
        pos += 1;
    }
    let new_lines = take("> ", new_count, &mut pos)?;
    Ok((
        PatchHunk::Normal {
            op,
            old_range,
            new_range,
            old_lines,
            new_lines,
        },
        pos,
    ))
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// A hunk reduced to "at `start`, replace `expected` with `replacement`".
#[derive(Debug)]
struct Splice {
    start: usize,
    expected: Vec<String>,
    replacement: Vec<String>,
}

impl PatchHunk {
    fn splice(&self, reverse: bool) -> Splice {
        match self {
            PatchHunk::Unified {
                old_start,
                old_count,
                new_start,
                new_count,
                lines,
            } => {
                let mut old = Vec::new();
                let mut new = Vec::new();
                for line in lines {
                    match line {
                        HunkLine::Context(t) => {
                            old.push(t.clone());
                            new.push(t.clone());
                        },
                        HunkLine::Delete(t) => old.push(t.clone()),
                        HunkLine::Add(t) => new.push(t.clone()),
                    }
                }
                let (start, count) = if reverse {
                    (*new_start, *new_count)
                } else {
                    (*old_start, *old_count)
                };
                let (expected, replacement) = if reverse { (new, old) } else { (old, new) };
                Splice {
                    start: if count == 0 { start } else { start.saturating_sub(1) },
                    expected,
                    replacement,
                }
            },
            PatchHunk::Normal {
                op,
                old_range,
                new_range,
                old_lines,
                new_lines,
            } => {
                let (range, expected, replacement, inserts) = if reverse {
                    (new_range, new_lines, old_lines, *op == NormalOp::Delete)
                } else {
                    (old_range, old_lines, new_lines, *op == NormalOp::Add)
                };
                Splice {
                    start: if inserts { range.0 } else { range.0.saturating_sub(1) },
                    expected: expected.clone(),
                    replacement: replacement.clone(),
                }
            },
        }
    }

    /// Starting line of the hunk on the side being patched.
    fn display_start(&self, reverse: bool) -> usize {
        match self {
            PatchHunk::Unified {
                old_start,
                new_start,
                ..
            } => {
                if reverse {
                    *new_start
                } else {
                    *old_start
                }
            },
            PatchHunk::Normal {
                old_range,
                new_range,
                ..
            } => {
                if reverse {
                    new_range.0
                } else {
                    old_range.0
                }
            },
        }
    }
}

/// Result of applying a file's hunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub content: String,
    /// `(hunk number, line, offset)` for every hunk that applied away from
    /// its declared position. Hunk numbers are 1-based.
    pub offsets: Vec<(usize, usize, isize)>,
}

/// Apply hunks to `original`, or undo them when `reverse` is set.
///
/// Hunks are applied from the bottom of the file up so earlier splices do
/// not shift later ones. Each hunk's expected lines are checked at the
/// declared position first, then at the nearest matching offset.
pub fn apply_hunks(original: &str, hunks: &[PatchHunk], reverse: bool) -> Result<AppliedPatch> {
    let mut lines: Vec<String> = original.lines().map(str::to_string).collect();
    let trailing_newline = original.is_empty() || original.ends_with('\n');

    let mut order: Vec<(usize, Splice)> = hunks
        .iter()
        .enumerate()
        .map(|(i, h)| (i, h.splice(reverse)))
        .collect();
    order.sort_by(|a, b| b.1.start.cmp(&a.1.start).then(b.0.cmp(&a.0)));

    let mut offsets = Vec::new();
    for (i, splice) in order {
        let Some(at) = locate(&lines, &splice) else {
            return Err(ShellError::PatchFailed(format!(
                "hunk #{} FAILED at {}",
                i + 1,
                hunks[i].display_start(reverse)
            )));
        };
        if at != splice.start {
            let offset = at as isize - splice.start as isize;
            log::debug!("hunk #{} applied with offset {offset}", i + 1);
            offsets.push((i + 1, at + 1, offset));
        }
        lines.splice(at..at + splice.expected.len(), splice.replacement);
    }
    offsets.sort_unstable();

    let mut content = lines.join("\n");
    if trailing_newline && !lines.is_empty() {
        content.push('\n');
    }
    Ok(AppliedPatch { content, offsets })
}

/// Find where `splice.expected` occurs, preferring the declared start and
/// then the closest offset (earlier before later on ties).
fn locate(lines: &[String], splice: &Splice) -> Option<usize> {
    let len = splice.expected.len();
    if len > lines.len() {
        return None;
    }
    let last = lines.len() - len;
    let matches = |at: usize| lines[at..at + len] == splice.expected[..];
    let start = splice.start.min(last);
    if splice.start <= last && matches(start) {
        return Some(start);
    }
    for delta in 1..=lines.len() {
        if let Some(at) = start.checked_sub(delta)
            && matches(at)
        {
            return Some(at);
        }
        let at = start + delta;
        if at <= last && matches(at) {
            return Some(at);
        }
        if delta > start && at > last {
            break;
        }
    }
    None
}
