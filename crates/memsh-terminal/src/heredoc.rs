//! Here-document detection and body collection.
//!
//! A line such as `cat <<EOF | sort` opens a heredoc; the following lines up
//! to the one starting with `EOF` form its body. Anything after the
//! delimiter on the closing line (`EOF > out.txt`) is a trailer that applies
//! to the heredoc command as if it had been written on the opening line.

use crate::lexer::tokenize;

/// A `<<DELIM` or `<<-DELIM` marker found on a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocMarker {
    pub delimiter: String,
    /// `<<-`: leading tabs are stripped from body lines and the delimiter.
    pub strip_tabs: bool,
}

/// A complete heredoc block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heredoc {
    /// The opening line with the closing line's trailer appended.
    pub command: String,
    /// One body per marker, in order. Lines are joined with `\n`.
    pub bodies: Vec<String>,
    /// Lines consumed, including the opening line.
    pub consumed: usize,
}

/// Heredoc markers on `line`, in order of appearance.
///
/// A line that does not tokenize has no markers.
pub fn find_markers(line: &str) -> Vec<HeredocMarker> {
    let Ok(words) = tokenize(line) else {
        return Vec::new();
    };
    let mut markers = Vec::new();
    let mut iter = words.iter();
    while let Some(word) = iter.next() {
        let strip_tabs = if word.is_operator("<<-") {
            true
        } else if word.is_operator("<<") {
            false
        } else {
            continue;
        };
        if let Some(delim) = iter.next() {
            markers.push(HeredocMarker {
                delimiter: delim.text.clone(),
                strip_tabs,
            });
        }
    }
    markers
}

/// If `line` closes a heredoc delimited by `marker`, return the trailer.
fn closing_trailer<'a>(line: &'a str, marker: &HeredocMarker) -> Option<&'a str> {
    let line = if marker.strip_tabs {
        line.trim_start_matches('\t')
    } else {
        line
    };
    let rest = line.strip_prefix(marker.delimiter.as_str())?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() || matches!(c, '|' | ';' | '&' | '>') => Some(rest.trim()),
        Some(_) => None,
    }
}

/// Collect the heredoc opened at `lines[start]`.
///
/// Returns `None` when the line opens no heredoc or a closing delimiter is
/// missing. Multiple markers on one line take consecutive bodies.
pub fn collect(lines: &[&str], start: usize) -> Option<Heredoc> {
    let opening = *lines.get(start)?;
    let markers = find_markers(opening);
    if markers.is_empty() {
        return None;
    }

    let mut pos = start + 1;
    let mut bodies = Vec::with_capacity(markers.len());
    let mut trailer = "";
    for marker in &markers {
        let mut body: Vec<&str> = Vec::new();
        loop {
            let line = *lines.get(pos)?;
            pos += 1;
            if let Some(rest) = closing_trailer(line, marker) {
                trailer = rest;
                break;
            }
            body.push(if marker.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            });
        }
        bodies.push(body.join("\n"));
    }

    let command = if trailer.is_empty() {
        opening.to_string()
    } else {
        format!("{opening} {trailer}")
    };
    log::debug!("heredoc: {} bodies, trailer {trailer:?}", bodies.len());
    Some(Heredoc {
        command,
        bodies,
        consumed: pos - start,
    })
}

/// Whether `text` ends inside an unterminated heredoc, so an interactive
/// caller has to read more lines before executing it.
pub fn needs_more_input(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        if find_markers(lines[i]).is_empty() {
            i += 1;
            continue;
        }
        match collect(&lines, i) {
            Some(doc) => i += doc.consumed,
            None => return true,
        }
    }
    false
}
