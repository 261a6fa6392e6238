//! `for VAR in ITEMS; do BODY; done` parsing.
//!
//! Keywords are only recognized as unquoted words in command position:
//! at the start of the text, after `;`, a newline, `&&`, `||`, `|`, or
//! after the keyword `do`. Text inside quotes and `$(...)` is never scanned
//! for keywords.

use memsh_types::error::{Result, ShellError};

const FOR_USAGE: &str = "for VAR in ITEMS; do BODY; done";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokKind {
    /// A word; `true` when it sits in command position.
    Word(bool),
    /// A command separator or pipe.
    Op,
}

#[derive(Debug, Clone, Copy)]
struct Tok {
    start: usize,
    end: usize,
    kind: TokKind,
}

impl Tok {
    fn is_keyword(&self, text: &str, keyword: &str) -> bool {
        self.kind == TokKind::Word(true) && &text[self.start..self.end] == keyword
    }
}

/// Split `text` into words and operators with byte positions.
fn scan(text: &str) -> Vec<Tok> {
    let bytes = text.as_bytes();
    let mut toks = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut cmd_pos = true;
    let mut in_single = false;
    let mut in_double = false;
    let mut depth = 0usize;
    let mut i = 0;

    let end_word = |toks: &mut Vec<Tok>, start: &mut Option<usize>, end: usize, cmd_pos: &mut bool| {
        if let Some(s) = start.take() {
            toks.push(Tok {
                start: s,
                end,
                kind: TokKind::Word(*cmd_pos),
            });
            *cmd_pos = &text[s..end] == "do" && *cmd_pos;
        }
    };

    while i < bytes.len() {
        let b = bytes[i];
        if in_single {
            in_single = b != b'\'';
            i += 1;
            continue;
        }
        if in_double {
            match b {
                b'"' => in_double = false,
                b'\\' => i += 1,
                _ => {},
            }
            i += 1;
            continue;
        }
        if depth > 0 {
            match b {
                b'\'' => in_single = true,
                b'"' => in_double = true,
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {},
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'\\' | b'$' | b'(' => {
                word_start.get_or_insert(i);
                match b {
                    b'\'' => in_single = true,
                    b'"' => in_double = true,
                    b'\\' => i += 1,
                    b'$' if bytes.get(i + 1) == Some(&b'(') => {
                        depth = 1;
                        i += 1;
                    },
                    b'(' => depth = 1,
                    _ => {},
                }
            },
            b';' | b'\n' | b'|' => {
                end_word(&mut toks, &mut word_start, i, &mut cmd_pos);
                let len = if b == b'|' && bytes.get(i + 1) == Some(&b'|') { 2 } else { 1 };
                toks.push(Tok {
                    start: i,
                    end: i + len,
                    kind: TokKind::Op,
                });
                cmd_pos = true;
                i += len - 1;
            },
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                end_word(&mut toks, &mut word_start, i, &mut cmd_pos);
                toks.push(Tok {
                    start: i,
                    end: i + 2,
                    kind: TokKind::Op,
                });
                cmd_pos = true;
                i += 1;
            },
            b if b.is_ascii_whitespace() => {
                end_word(&mut toks, &mut word_start, i, &mut cmd_pos);
            },
            _ => {
                word_start.get_or_insert(i);
            },
        }
        i += 1;
    }
    end_word(&mut toks, &mut word_start, text.len().min(i), &mut cmd_pos);
    toks
}

/// A parsed `for` loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForLoop {
    pub var: String,
    /// Item text, not yet expanded or split.
    pub items: String,
    pub body: String,
    /// Whatever follows `done` (`| sort`, `> out`, `; echo end`).
    pub trailer: String,
}

/// Byte offset of the first `for` keyword in command position.
pub fn find_loop_start(text: &str) -> Option<usize> {
    scan(text)
        .iter()
        .find(|t| t.is_keyword(text, "for"))
        .map(|t| t.start)
}

/// Whether `text` opens more loops than it closes.
pub fn is_incomplete(text: &str) -> bool {
    let toks = scan(text);
    let opens = toks.iter().filter(|t| t.is_keyword(text, "for")).count();
    let closes = toks.iter().filter(|t| t.is_keyword(text, "done")).count();
    opens > closes
}

fn trim_separators(s: &str) -> &str {
    s.trim().trim_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Parse a loop that starts at the beginning of `text`.
pub fn parse_for(text: &str) -> Result<ForLoop> {
    let usage = || ShellError::Usage(FOR_USAGE.to_string());
    let toks = scan(text);

    let mut iter = toks.iter().enumerate();
    let Some((_, head)) = iter.next() else {
        return Err(usage());
    };
    if !head.is_keyword(text, "for") {
        return Err(usage());
    }
    let var = match iter.next() {
        Some((_, t)) if matches!(t.kind, TokKind::Word(_)) => &text[t.start..t.end],
        _ => return Err(usage()),
    };
    if var.is_empty()
        || var.starts_with(|c: char| c.is_ascii_digit())
        || !var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ShellError::Command(format!("for: `{var}': not a valid identifier")));
    }
    let in_tok = match iter.next() {
        Some((_, t)) if matches!(t.kind, TokKind::Word(_)) && &text[t.start..t.end] == "in" => t,
        _ => return Err(usage()),
    };

    let (do_idx, do_tok) = iter
        .find(|(_, t)| t.is_keyword(text, "do"))
        .ok_or_else(usage)?;
    let items = trim_separators(&text[in_tok.end..do_tok.start]).to_string();

    let mut depth = 1usize;
    let mut done_tok = None;
    for t in &toks[do_idx + 1..] {
        if t.is_keyword(text, "do") {
            depth += 1;
        } else if t.is_keyword(text, "done") {
            depth -= 1;
            if depth == 0 {
                done_tok = Some(*t);
                break;
            }
        }
    }
    let done_tok = done_tok.ok_or_else(usage)?;

    Ok(ForLoop {
        var: var.to_string(),
        items,
        body: trim_separators(&text[do_tok.end..done_tok.start]).to_string(),
        trailer: text[done_tok.end..].trim().to_string(),
    })
}

/// Replace `$VAR` and `${VAR}` with `value`, outside single quotes.
pub fn substitute_var(body: &str, var: &str, value: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = rest.chars().next() {
        if ch == '\'' && !in_double {
            in_single = !in_single;
        } else if ch == '"' && !in_single {
            in_double = !in_double;
        } else if ch == '$' && !in_single {
            let after = &rest[1..];
            if let Some(inner) = after.strip_prefix('{')
                && let Some(tail) = inner.strip_prefix(var)
                && let Some(tail) = tail.strip_prefix('}')
            {
                out.push_str(value);
                rest = tail;
                continue;
            }
            if let Some(tail) = after.strip_prefix(var)
                && !tail.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
            {
                out.push_str(value);
                rest = tail;
                continue;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_loop() {
        let l = parse_for("for x in a b c; do echo $x; done").unwrap();
        assert_eq!(l.var, "x");
        assert_eq!(l.items, "a b c");
        assert_eq!(l.body, "echo $x");
        assert_eq!(l.trailer, "");
    }

    #[test]
    fn parse_multiline_loop() {
        let l = parse_for("for f in *.txt\ndo\n  cat $f\n  echo --\ndone").unwrap();
        assert_eq!(l.items, "*.txt");
        assert_eq!(l.body, "cat $f\n  echo --");
    }

    #[test]
    fn parse_trailer() {
        let l = parse_for("for x in b a; do echo $x; done | sort").unwrap();
        assert_eq!(l.trailer, "| sort");
        let l = parse_for("for x in a; do echo $x; done > out.txt").unwrap();
        assert_eq!(l.trailer, "> out.txt");
    }

    #[test]
    fn parse_nested_loop() {
        let l = parse_for("for a in 1 2; do for b in x y; do echo $a$b; done; done; echo end").unwrap();
        assert_eq!(l.body, "for b in x y; do echo $a$b; done");
        assert_eq!(l.trailer, "; echo end");
    }

    #[test]
    fn keywords_in_quotes_and_arguments_are_ignored() {
        let l = parse_for("for w in 'do' done; do echo \"done $w\"; done").unwrap();
        assert_eq!(l.items, "'do' done");
        assert_eq!(l.body, "echo \"done $w\"");
    }

    #[test]
    fn substitution_items_are_opaque() {
        let l = parse_for("for f in $(ls; echo do); do cat $f; done").unwrap();
        assert_eq!(l.items, "$(ls; echo do)");
    }

    #[test]
    fn parse_errors() {
        assert!(parse_for("for x a b; do echo; done").is_err());
        assert!(parse_for("for x in a b; echo $x; done").is_err());
        assert!(parse_for("for x in a; do echo $x").is_err());
        assert!(parse_for("for 1x in a; do echo; done").is_err());
    }

    #[test]
    fn loop_start_positions() {
        assert_eq!(find_loop_start("for x in a; do echo; done"), Some(0));
        assert_eq!(find_loop_start("echo hi; for x in a; do echo; done"), Some(9));
        assert_eq!(find_loop_start("echo for x"), None);
        assert_eq!(find_loop_start("echo 'for x'; echo $(for)"), None);
    }

    #[test]
    fn incomplete_detection() {
        assert!(is_incomplete("for x in a b"));
        assert!(is_incomplete("for x in a b; do"));
        assert!(is_incomplete("for x in a; do for y in b; do echo; done"));
        assert!(!is_incomplete("for x in a; do echo $x; done"));
        assert!(!is_incomplete("echo done"));
    }

    #[test]
    fn substitute_plain_and_braced() {
        assert_eq!(substitute_var("echo $x ${x}y", "x", "v"), "echo v vy");
        assert_eq!(substitute_var("echo $xy $x_", "x", "v"), "echo $xy $x_");
        assert_eq!(substitute_var("echo '$x' \"$x\"", "x", "v"), "echo '$x' \"v\"");
        assert_eq!(substitute_var("cat $f.txt", "f", "a"), "cat a.txt");
    }
}
