//! LCS line diff and its three text renderings.

use std::borrow::Cow;

/// Comparison switches (`diff -i -w -b -B`).
///
/// Normalization only affects how lines are compared. Rendered output always
/// shows the original lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    pub ignore_case: bool,
    pub ignore_all_space: bool,
    pub ignore_space_change: bool,
    pub ignore_blank_lines: bool,
}

impl DiffOptions {
    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if !(self.ignore_case || self.ignore_all_space || self.ignore_space_change) {
            return Cow::Borrowed(line);
        }
        let mut out = if self.ignore_all_space {
            line.chars().filter(|c| !c.is_whitespace()).collect()
        } else if self.ignore_space_change {
            collapse_whitespace(line)
        } else {
            line.to_string()
        };
        if self.ignore_case {
            out = out.to_lowercase();
        }
        Cow::Owned(out)
    }
}

/// Squash runs of whitespace to one space and drop trailing whitespace.
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_space = false;
    for c in line.trim_end().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// One step of an edit script. Indices are 0-based line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffEdit {
    Common { old: usize, new: usize },
    Add { new: usize },
    Delete { old: usize },
}

/// A maximal run of changed lines: `old[old_start..old_end]` is replaced by
/// `new[new_start..new_end]`. Either side may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeBlock {
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

impl ChangeBlock {
    fn has_old(&self) -> bool {
        self.old_end > self.old_start
    }

    fn has_new(&self) -> bool {
        self.new_end > self.new_start
    }
}

/// Split text into lines without their terminators.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Compute the edit script turning `old` into `new`.
///
/// Edits come out in original order, and inside a change the deletions
/// precede the additions.
pub fn diff_lines(old: &[&str], new: &[&str], opts: &DiffOptions) -> Vec<DiffEdit> {
    let a: Vec<Cow<'_, str>> = old.iter().map(|l| opts.normalize(l)).collect();
    let b: Vec<Cow<'_, str>> = new.iter().map(|l| opts.normalize(l)).collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut edits = Vec::with_capacity(a.len().max(b.len()));
    edits.extend((0..prefix).map(|k| DiffEdit::Common { old: k, new: k }));
    lcs_edits(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
        prefix,
        &mut edits,
    );
    let (old_tail, new_tail) = (a.len() - suffix, b.len() - suffix);
    edits.extend((0..suffix).map(|k| DiffEdit::Common {
        old: old_tail + k,
        new: new_tail + k,
    }));
    edits
}

/// Edit script for the untrimmed middle. Both slices start at `offset` in
/// their full inputs.
fn lcs_edits(a: &[Cow<'_, str>], b: &[Cow<'_, str>], offset: usize, out: &mut Vec<DiffEdit>) {
    let (m, n) = (a.len(), b.len());
    let width = n + 1;
    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (m + 1) * width];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            out.push(DiffEdit::Common {
                old: offset + i,
                new: offset + j,
            });
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            out.push(DiffEdit::Delete { old: offset + i });
            i += 1;
        } else {
            out.push(DiffEdit::Add { new: offset + j });
            j += 1;
        }
    }
    out.extend((i..m).map(|k| DiffEdit::Delete { old: offset + k }));
    out.extend((j..n).map(|k| DiffEdit::Add { new: offset + k }));
}

/// Group an edit script into change blocks.
pub fn change_blocks(edits: &[DiffEdit]) -> Vec<ChangeBlock> {
    let mut blocks = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut open: Option<(usize, usize)> = None;
    for edit in edits {
        match *edit {
            DiffEdit::Common { old, new } => {
                if let Some((os, ns)) = open.take() {
                    blocks.push(ChangeBlock {
                        old_start: os,
                        old_end: i,
                        new_start: ns,
                        new_end: j,
                    });
                }
                i = old + 1;
                j = new + 1;
            },
            DiffEdit::Delete { old } => {
                open.get_or_insert((i, j));
                i = old + 1;
            },
            DiffEdit::Add { new } => {
                open.get_or_insert((i, j));
                j = new + 1;
            },
        }
    }
    if let Some((os, ns)) = open {
        blocks.push(ChangeBlock {
            old_start: os,
            old_end: i,
            new_start: ns,
            new_end: j,
        });
    }
    blocks
}

/// Whether `old` and `new` differ under `opts`.
///
/// Compares the normalized line sequences directly (blank lines removed
/// under `-B`) without building an edit script.
pub fn differs(old: &[&str], new: &[&str], opts: &DiffOptions) -> bool {
    !comparable(old, opts).eq(comparable(new, opts))
}

fn comparable<'a>(lines: &'a [&'a str], opts: &'a DiffOptions) -> impl Iterator<Item = Cow<'a, str>> {
    lines
        .iter()
        .filter(move |l| !(opts.ignore_blank_lines && l.trim().is_empty()))
        .map(move |l| opts.normalize(l))
}

/// A block that only adds or removes blank lines.
fn is_blank_change(b: &ChangeBlock, old: &[&str], new: &[&str]) -> bool {
    let blank = |l: &&str| l.trim().is_empty();
    old[b.old_start..b.old_end].iter().all(blank) && new[b.new_start..b.new_end].iter().all(blank)
}

fn blocks_for(old: &[&str], new: &[&str], opts: &DiffOptions) -> Vec<ChangeBlock> {
    let mut blocks = change_blocks(&diff_lines(old, new, opts));
    if opts.ignore_blank_lines {
        blocks.retain(|b| !is_blank_change(b, old, new));
    }
    blocks
}

fn push_line(out: &mut String, prefix: &str, line: &str) {
    out.push_str(prefix);
    out.push_str(line);
    out.push('\n');
}

// ---------------------------------------------------------------------------
// Normal format
// ---------------------------------------------------------------------------

/// 1-based inclusive range: `n` or `s,e`.
fn normal_range(start: usize, end: usize) -> String {
    if end == start + 1 {
        format!("{end}")
    } else {
        format!("{},{end}", start + 1)
    }
}

/// Classic `diff` output (`2c2`, `< old`, `---`, `> new`).
pub fn normal_diff(old: &[&str], new: &[&str], opts: &DiffOptions) -> String {
    let mut out = String::new();
    for b in blocks_for(old, new, opts) {
        match (b.has_old(), b.has_new()) {
            (false, true) => {
                out.push_str(&format!(
                    "{}a{}\n",
                    b.old_start,
                    normal_range(b.new_start, b.new_end)
                ));
            },
            (true, false) => {
                out.push_str(&format!(
                    "{}d{}\n",
                    normal_range(b.old_start, b.old_end),
                    b.new_start
                ));
            },
            _ => {
                out.push_str(&format!(
                    "{}c{}\n",
                    normal_range(b.old_start, b.old_end),
                    normal_range(b.new_start, b.new_end)
                ));
            },
        }
        for line in &old[b.old_start..b.old_end] {
            push_line(&mut out, "< ", line);
        }
        if b.has_old() && b.has_new() {
            out.push_str("---\n");
        }
        for line in &new[b.new_start..b.new_end] {
            push_line(&mut out, "> ", line);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Hunks (shared by unified and context formats)
// ---------------------------------------------------------------------------

/// Change blocks plus surrounding context, as one output hunk.
struct Hunk<'b> {
    old_start: usize,
    old_end: usize,
    new_start: usize,
    new_end: usize,
    blocks: &'b [ChangeBlock],
}

/// Merge blocks whose context windows touch or overlap.
fn group_hunks(blocks: &[ChangeBlock], context: usize, old_len: usize) -> Vec<Hunk<'_>> {
    let mut hunks = Vec::new();
    let mut first = 0;
    while first < blocks.len() {
        let mut last = first;
        while last + 1 < blocks.len()
            && blocks[last + 1].old_start - blocks[last].old_end <= 2 * context
        {
            last += 1;
        }
        let (head, tail) = (&blocks[first], &blocks[last]);
        let old_start = head.old_start.saturating_sub(context);
        let old_end = (tail.old_end + context).min(old_len);
        hunks.push(Hunk {
            old_start,
            old_end,
            new_start: head.new_start - (head.old_start - old_start),
            new_end: tail.new_end + (old_end - tail.old_end),
            blocks: &blocks[first..=last],
        });
        first = last + 1;
    }
    hunks
}

/// Hunks over every change block. Under `-B` a hunk is dropped only when
/// all of its changes are blank; blank changes inside a kept hunk are
/// printed so the hunk still applies.
fn hunks_for<'b>(
    blocks: &'b [ChangeBlock],
    old: &[&str],
    new: &[&str],
    context: usize,
    opts: &DiffOptions,
) -> Vec<Hunk<'b>> {
    let mut hunks = group_hunks(blocks, context, old.len());
    if opts.ignore_blank_lines {
        hunks.retain(|h| !h.blocks.iter().all(|b| is_blank_change(b, old, new)));
    }
    hunks
}

// ---------------------------------------------------------------------------
// Unified format
// ---------------------------------------------------------------------------

/// `s,c` with `,1` omitted. An empty range names the line before it.
fn unified_range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{count}", start + 1),
    }
}

/// `diff -u` output with `context` lines around each change.
pub fn unified_diff(
    old: &[&str],
    new: &[&str],
    old_label: &str,
    new_label: &str,
    context: usize,
    opts: &DiffOptions,
) -> String {
    let blocks = change_blocks(&diff_lines(old, new, opts));
    let hunks = hunks_for(&blocks, old, new, context, opts);
    if hunks.is_empty() {
        return String::new();
    }
    let mut out = format!("--- {old_label}\n+++ {new_label}\n");
    for hunk in hunks {
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            unified_range(hunk.old_start, hunk.old_end - hunk.old_start),
            unified_range(hunk.new_start, hunk.new_end - hunk.new_start),
        ));
        let mut pos = hunk.old_start;
        for b in hunk.blocks {
            for line in &old[pos..b.old_start] {
                push_line(&mut out, " ", line);
            }
            for line in &old[b.old_start..b.old_end] {
                push_line(&mut out, "-", line);
            }
            for line in &new[b.new_start..b.new_end] {
                push_line(&mut out, "+", line);
            }
            pos = b.old_end;
        }
        for line in &old[pos..hunk.old_end] {
            push_line(&mut out, " ", line);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Context format
// ---------------------------------------------------------------------------

fn context_range(start: usize, end: usize) -> String {
    match end - start {
        0 => format!("{start}"),
        1 => format!("{end}"),
        _ => format!("{},{end}", start + 1),
    }
}

/// `diff -c` output with `context` lines around each change.
pub fn context_diff(
    old: &[&str],
    new: &[&str],
    old_label: &str,
    new_label: &str,
    context: usize,
    opts: &DiffOptions,
) -> String {
    let blocks = change_blocks(&diff_lines(old, new, opts));
    let hunks = hunks_for(&blocks, old, new, context, opts);
    if hunks.is_empty() {
        return String::new();
    }
    let mut out = format!("*** {old_label}\n--- {new_label}\n");
    for hunk in hunks {
        out.push_str("***************\n");

        out.push_str(&format!(
            "*** {} ****\n",
            context_range(hunk.old_start, hunk.old_end)
        ));
        if hunk.blocks.iter().any(ChangeBlock::has_old) {
            let mut pos = hunk.old_start;
            for b in hunk.blocks {
                for line in &old[pos..b.old_start] {
                    push_line(&mut out, "  ", line);
                }
                let mark = if b.has_new() { "! " } else { "- " };
                for line in &old[b.old_start..b.old_end] {
                    push_line(&mut out, mark, line);
                }
                pos = b.old_end;
            }
            for line in &old[pos..hunk.old_end] {
                push_line(&mut out, "  ", line);
            }
        }

        out.push_str(&format!(
            "--- {} ----\n",
            context_range(hunk.new_start, hunk.new_end)
        ));
        if hunk.blocks.iter().any(ChangeBlock::has_new) {
            let mut pos = hunk.new_start;
            for b in hunk.blocks {
                for line in &new[pos..b.new_start] {
                    push_line(&mut out, "  ", line);
                }
                let mark = if b.has_old() { "! " } else { "+ " };
                for line in &new[b.new_start..b.new_end] {
                    push_line(&mut out, mark, line);
                }
                pos = b.new_end;
            }
            for line in &new[pos..hunk.new_end] {
                push_line(&mut out, "  ", line);
            }
        }
    }
    out
}
