//! Splitting a line into segments joined by `|`, `&&`, `||` and `;`.

use memsh_types::error::Result;

use crate::lexer::{Word, tokenize};

/// The operator that follows a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeOp {
    /// `|`: stdout feeds the next segment's stdin.
    Pipe,
    /// `&&`: run the next group only on success.
    And,
    /// `||`: run the next group only on failure.
    Or,
    /// `;` or a newline.
    Seq,
    /// Last segment of the line.
    End,
}

/// One command of a line together with the operator after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSegment {
    pub command: Vec<Word>,
    pub op: PipeOp,
    /// Source text of the segment, with any `$(...)` still unexpanded.
    pub text: String,
}

/// Split a line on `|`, `&&`, `||`, `;` and newlines.
///
/// Operators inside quotes or inside `$(...)` are left alone. A line with
/// no operators yields a single `End` segment. Empty segments are dropped,
/// except a leading one: `| sort` is an empty segment piped into `sort`, and
/// the executor treats the empty segment as passing its input through.
pub fn parse_pipeline(line: &str) -> Result<Vec<PipelineSegment>> {
    let mut raw: Vec<(String, PipeOp)> = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut subst_depth = 0usize;

    while let Some(ch) = chars.next() {
        if in_single {
            current.push(ch);
            if ch == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            current.push(ch);
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(next) = chars.next()
            {
                current.push(next);
            }
            continue;
        }

        match ch {
            '\'' => {
                in_single = true;
                current.push(ch);
            },
            '"' => {
                in_double = true;
                current.push(ch);
            },
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            '$' if chars.peek() == Some(&'(') => {
                chars.next();
                subst_depth += 1;
                current.push_str("$(");
            },
            '(' if subst_depth > 0 => {
                subst_depth += 1;
                current.push(ch);
            },
            ')' if subst_depth > 0 => {
                subst_depth -= 1;
                current.push(ch);
            },
            _ if subst_depth > 0 => current.push(ch),
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                raw.push((std::mem::take(&mut current), PipeOp::Or));
            },
            '|' => raw.push((std::mem::take(&mut current), PipeOp::Pipe)),
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                raw.push((std::mem::take(&mut current), PipeOp::And));
            },
            ';' | '\n' => raw.push((std::mem::take(&mut current), PipeOp::Seq)),
            _ => current.push(ch),
        }
    }
    raw.push((current, PipeOp::End));

    let mut segments = Vec::with_capacity(raw.len());
    for (i, (text, op)) in raw.into_iter().enumerate() {
        let command = tokenize(&text)?;
        if command.is_empty() && (i > 0 || op == PipeOp::End) {
            continue;
        }
        segments.push(PipelineSegment { command, op, text });
    }
    if let Some(last) = segments.last_mut() {
        last.op = PipeOp::End;
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::texts;

    fn shape(line: &str) -> Vec<(Vec<String>, PipeOp)> {
        parse_pipeline(line)
            .unwrap()
            .into_iter()
            .map(|s| (texts(&s.command), s.op))
            .collect()
    }

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_command() {
        assert_eq!(shape("echo hi"), vec![(cmd(&["echo", "hi"]), PipeOp::End)]);
    }

    #[test]
    fn all_operators() {
        assert_eq!(
            shape("a | b && c || d ; e"),
            vec![
                (cmd(&["a"]), PipeOp::Pipe),
                (cmd(&["b"]), PipeOp::And),
                (cmd(&["c"]), PipeOp::Or),
                (cmd(&["d"]), PipeOp::Seq),
                (cmd(&["e"]), PipeOp::End),
            ]
        );
    }

    #[test]
    fn quoted_operators_are_literal() {
        assert_eq!(
            shape("echo 'a | b' \"c && d\" ; echo e"),
            vec![
                (cmd(&["echo", "a | b", "c && d"]), PipeOp::Seq),
                (cmd(&["echo", "e"]), PipeOp::End),
            ]
        );
    }

    #[test]
    fn substitution_operators_are_literal() {
        assert_eq!(
            shape("echo $(cat f | grep x; echo y) | wc -l"),
            vec![
                (cmd(&["echo", "$(cat", "f", "|", "grep", "x;", "echo", "y)"]), PipeOp::Pipe),
                (cmd(&["wc", "-l"]), PipeOp::End),
            ]
        );
    }

    #[test]
    fn redirect_to_stdout_is_not_and() {
        assert_eq!(
            shape("cmd 2>&1 && echo ok"),
            vec![
                (cmd(&["cmd", "2>&1"]), PipeOp::And),
                (cmd(&["echo", "ok"]), PipeOp::End),
            ]
        );
    }

    #[test]
    fn newline_is_sequence() {
        assert_eq!(
            shape("echo a\necho b"),
            vec![(cmd(&["echo", "a"]), PipeOp::Seq), (cmd(&["echo", "b"]), PipeOp::End)]
        );
    }

    #[test]
    fn trailing_and_repeated_separators() {
        assert_eq!(
            shape("echo a;; echo b;"),
            vec![(cmd(&["echo", "a"]), PipeOp::Seq), (cmd(&["echo", "b"]), PipeOp::End)]
        );
    }

    #[test]
    fn leading_operator_keeps_empty_segment() {
        assert_eq!(
            shape("| sort"),
            vec![(vec![], PipeOp::Pipe), (cmd(&["sort"]), PipeOp::End)]
        );
        assert_eq!(
            shape("; echo more"),
            vec![(vec![], PipeOp::Seq), (cmd(&["echo", "more"]), PipeOp::End)]
        );
    }

    #[test]
    fn empty_line() {
        assert!(parse_pipeline("").unwrap().is_empty());
        assert!(parse_pipeline(" ; ").unwrap().is_empty());
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(parse_pipeline("echo 'a | b").is_err());
    }
}
