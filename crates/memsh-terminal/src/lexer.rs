//! Tokenizer: handles single quotes, double quotes, backslash escapes and
//! splits unquoted redirection operators into their own words.

use memsh_types::error::{Result, ShellError};

/// A shell word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Any part of the word was quoted or escaped. Quoted words are never
    /// treated as operators or wildcard patterns.
    pub quoted: bool,
}

impl Word {
    /// An unquoted word.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    /// Whether this is the unquoted operator `op`.
    pub fn is_operator(&self, op: &str) -> bool {
        !self.quoted && self.text == op
    }
}

/// Tokenize a command line respecting quotes and backslash escapes.
///
/// - Single-quoted strings preserve all characters literally.
/// - Inside double quotes only `\"`, `\\` and `\$` are escapes.
/// - Backslash escapes the next character outside of quotes.
/// - Unquoted `<`, `<<`, `<<-`, `>`, `>>`, `2>`, `2>>`, `&>` and `2>&1`
///   always form separate words, so `>out` and `> out` tokenize alike.
pub fn tokenize(input: &str) -> Result<Vec<Word>> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    let flush = |words: &mut Vec<Word>, current: &mut String, quoted: &mut bool| {
        if !current.is_empty() || *quoted {
            words.push(Word {
                text: std::mem::take(current),
                quoted: *quoted,
            });
        }
        *quoted = false;
    };

    while i < chars.len() {
        let ch = chars[i];
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            match ch {
                '"' => in_double = false,
                '\\' if matches!(chars.get(i + 1), Some('"' | '\\' | '$')) => {
                    current.push(chars[i + 1]);
                    i += 1;
                },
                _ => current.push(ch),
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    quoted = true;
                },
                '"' => {
                    in_double = true;
                    quoted = true;
                },
                '\\' => {
                    if let Some(&next) = chars.get(i + 1) {
                        current.push(next);
                        i += 1;
                    }
                    quoted = true;
                },
                '<' | '>' => {
                    let mut op = String::new();
                    if !quoted && (current == "2" || current == "&") {
                        op = std::mem::take(&mut current);
                    } else {
                        flush(&mut words, &mut current, &mut quoted);
                    }
                    op.push(ch);
                    i += operator_tail(&chars, i, &mut op);
                    words.push(Word::plain(op));
                },
                c if c.is_whitespace() => flush(&mut words, &mut current, &mut quoted),
                _ => current.push(ch),
            }
        }
        i += 1;
    }

    if in_single {
        return Err(ShellError::UnterminatedQuote("single"));
    }
    if in_double {
        return Err(ShellError::UnterminatedQuote("double"));
    }
    flush(&mut words, &mut current, &mut quoted);
    Ok(words)
}

/// Extend a redirection operator starting at `chars[at]`; returns how many
/// extra characters were consumed.
fn operator_tail(chars: &[char], at: usize, op: &mut String) -> usize {
    let next = chars.get(at + 1).copied();
    match chars[at] {
        '<' if next == Some('<') => {
            op.push('<');
            if chars.get(at + 2) == Some(&'-') {
                op.push('-');
                2
            } else {
                1
            }
        },
        '>' if next == Some('>') => {
            op.push('>');
            1
        },
        '>' if next == Some('&') && chars.get(at + 2) == Some(&'1') && op == "2>" => {
            op.push_str("&1");
            2
        },
        _ => 0,
    }
}

/// Plain strings of a word list.
pub fn texts(words: &[Word]) -> Vec<String> {
    words.iter().map(|w| w.text.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(input: &str) -> Vec<String> {
        texts(&tokenize(input).unwrap())
    }

    #[test]
    fn tokenize_simple() {
        assert_eq!(strings("ls -la /tmp"), vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn tokenize_single_quotes() {
        let words = tokenize("echo 'hello   world'").unwrap();
        assert_eq!(words[1].text, "hello   world");
        assert!(words[1].quoted);
        assert!(!words[0].quoted);
    }

    #[test]
    fn tokenize_double_quotes() {
        assert_eq!(strings(r#"echo "a \"b\" c""#), vec!["echo", r#"a "b" c"#]);
    }

    #[test]
    fn tokenize_double_quotes_keep_unknown_escapes() {
        assert_eq!(strings(r#"echo "a\nb""#), vec!["echo", r"a\nb"]);
    }

    #[test]
    fn tokenize_backslash_escape() {
        let words = tokenize(r"echo hello\ world").unwrap();
        assert_eq!(words[1].text, "hello world");
        assert!(words[1].quoted);
    }

    #[test]
    fn tokenize_mixed_quotes() {
        assert_eq!(strings(r#"echo 'it'"s"done"#), vec!["echo", "itsdone"]);
    }

    #[test]
    fn tokenize_empty_quotes_make_empty_word() {
        assert_eq!(strings("echo '' x"), vec!["echo", "", "x"]);
    }

    #[test]
    fn tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t ").unwrap().is_empty());
    }

    #[test]
    fn tokenize_unterminated_single() {
        assert!(matches!(
            tokenize("echo 'oops"),
            Err(ShellError::UnterminatedQuote("single"))
        ));
    }

    #[test]
    fn tokenize_unterminated_double() {
        assert!(matches!(
            tokenize("echo \"oops"),
            Err(ShellError::UnterminatedQuote("double"))
        ));
    }

    #[test]
    fn redirection_operators_split() {
        assert_eq!(strings("echo hi >out"), vec!["echo", "hi", ">", "out"]);
        assert_eq!(strings("echo hi>>out"), vec!["echo", "hi", ">>", "out"]);
        assert_eq!(strings("cmd 2>err"), vec!["cmd", "2>", "err"]);
        assert_eq!(strings("cmd 2>>err"), vec!["cmd", "2>>", "err"]);
        assert_eq!(strings("cmd &>all"), vec!["cmd", "&>", "all"]);
        assert_eq!(strings("cmd 2>&1"), vec!["cmd", "2>&1"]);
        assert_eq!(strings("sort <in"), vec!["sort", "<", "in"]);
        assert_eq!(strings("cat <<EOF"), vec!["cat", "<<", "EOF"]);
        assert_eq!(strings("cat <<-EOF"), vec!["cat", "<<-", "EOF"]);
    }

    #[test]
    fn digit_suffix_is_not_stderr() {
        assert_eq!(strings("echo a2>f"), vec!["echo", "a2", ">", "f"]);
    }

    #[test]
    fn quoted_operator_is_a_word() {
        let words = tokenize("echo '>' \"<\"").unwrap();
        assert!(!words[1].is_operator(">"));
        assert!(!words[2].is_operator("<"));
        let words = tokenize("echo >").unwrap();
        assert!(words[1].is_operator(">"));
    }

    #[test]
    fn unicode_args() {
        assert_eq!(strings("echo héllo 日本"), vec!["echo", "héllo", "日本"]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn plain_words_split_on_whitespace(
                words in proptest::collection::vec("[a-zA-Z0-9_./-]{1,10}", 0..8),
            ) {
                let line = words.join("  ");
                prop_assert_eq!(strings(&line), words);
            }
        }
    }
}
