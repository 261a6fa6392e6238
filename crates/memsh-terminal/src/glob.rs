//! Wildcard expansion against the virtual filesystem.
//!
//! Patterns are path-aware:
//! - `*` matches zero or more characters within one path component
//! - `?` matches exactly one character other than `/`
//! - `[abc]`, `[a-z]`, `[!abc]` / `[^abc]` match one character of a set
//! - `**` matches across `/`; `**/` also matches zero directories

use std::cell::Cell;

use memsh_types::config::ShellConfig;
use memsh_vfs::Vfs;

use crate::lexer::Word;

/// Upper bound on recursive match calls, so patterns like `*a*a*a*a*b`
/// cannot backtrack without limit.
const MAX_MATCH_CALLS: usize = 100_000;

/// Whether `s` contains wildcard metacharacters (`*`, `?`, `[`).
pub fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

/// Match a whole `/`-separated path against a pattern.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = path.chars().collect();
    let calls = Cell::new(0usize);
    match_bounded(&pat, 0, &input, 0, &calls)
}

fn match_bounded(pattern: &[char], pi: usize, input: &[char], ii: usize, calls: &Cell<usize>) -> bool {
    let count = calls.get() + 1;
    calls.set(count);
    if count > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pattern.len() {
        return ii >= input.len();
    }

    match pattern[pi] {
        '*' if pattern.get(pi + 1) == Some(&'*') => {
            let mut next = pi;
            while pattern.get(next) == Some(&'*') {
                next += 1;
            }
            if pattern.get(next) == Some(&'/') {
                // `**/`: zero directories, or resume after any later `/`.
                if match_bounded(pattern, next + 1, input, ii, calls) {
                    return true;
                }
                (ii..input.len())
                    .filter(|&k| input[k] == '/')
                    .any(|k| match_bounded(pattern, next + 1, input, k + 1, calls))
            } else {
                if next >= pattern.len() {
                    return true;
                }
                (ii..=input.len()).any(|k| match_bounded(pattern, next, input, k, calls))
            }
        },

        '*' => {
            let next = pi + 1;
            let mut k = ii;
            loop {
                if match_bounded(pattern, next, input, k, calls) {
                    return true;
                }
                if k >= input.len() || input[k] == '/' {
                    return false;
                }
                k += 1;
            }
        },

        '?' => match input.get(ii) {
            Some(&c) if c != '/' => match_bounded(pattern, pi + 1, input, ii + 1, calls),
            _ => false,
        },

        '[' => match input.get(ii) {
            Some(&c) if c != '/' => {
                let (matches, len) = parse_char_class(&pattern[pi..], c);
                matches && match_bounded(pattern, pi + len, input, ii + 1, calls)
            },
            _ => false,
        },

        '\\' if pi + 1 < pattern.len() => {
            input.get(ii) == Some(&pattern[pi + 1])
                && match_bounded(pattern, pi + 2, input, ii + 1, calls)
        },

        c => input.get(ii) == Some(&c) && match_bounded(pattern, pi + 1, input, ii + 1, calls),
    }
}

/// Evaluate a `[...]` class against `ch`.
///
/// Returns whether it matched and how many pattern characters the class
/// spans. An unclosed `[` is a literal.
fn parse_char_class(pattern: &[char], ch: char) -> (bool, usize) {
    let mut idx = 1;
    let mut negate = false;
    if matches!(pattern.get(idx), Some('!' | '^')) {
        negate = true;
        idx += 1;
    }

    // `]` right after the opening (or negation) is literal.
    let first = idx;
    let mut matched = false;
    let mut closed = false;
    while idx < pattern.len() {
        let c = pattern[idx];
        if c == ']' && idx > first {
            idx += 1;
            closed = true;
            break;
        }
        if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            if (c..=pattern[idx + 2]).contains(&ch) {
                matched = true;
            }
            idx += 3;
            continue;
        }
        if c == ch {
            matched = true;
        }
        idx += 1;
    }

    if !closed {
        return (ch == '[', 1);
    }
    (matched != negate, idx)
}

/// Expand one pattern against the filesystem.
///
/// The base directory is the part of the pattern before the first
/// component containing a wildcard, resolved against the working
/// directory. Matches keep the base as written and come back sorted. A
/// pattern that matches nothing is returned unchanged.
pub fn expand_pattern(pattern: &str, vfs: &dyn Vfs) -> Vec<String> {
    let components: Vec<&str> = pattern.split('/').collect();
    let Some(first_wild) = components.iter().position(|c| has_wildcard(c)) else {
        return vec![pattern.to_string()];
    };

    let base_written = if first_wild == 0 {
        String::new()
    } else {
        format!("{}/", components[..first_wild].join("/"))
    };
    let rest = components[first_wild..].join("/");
    let base_dir = if base_written.is_empty() { "." } else { base_written.as_str() };

    let entries = match vfs.walk(base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("glob {pattern}: {e}");
            return vec![pattern.to_string()];
        },
    };

    let mut matches: Vec<String> = entries
        .iter()
        .filter(|entry| glob_match(&rest, &entry.path))
        .map(|entry| format!("{base_written}{}", entry.path))
        .collect();
    if matches.is_empty() {
        return vec![pattern.to_string()];
    }
    matches.sort();
    log::debug!("glob {pattern}: {} matches", matches.len());
    matches
}

/// Expand wildcards in a command's words.
///
/// Quoted words and the argument right after a pattern-expecting flag
/// (`find -name '*.txt'` without quotes) stay literal.
pub fn expand_words(words: &[Word], vfs: &dyn Vfs, config: &ShellConfig) -> Vec<String> {
    let mut out = Vec::with_capacity(words.len());
    let mut literal_next = false;
    for word in words {
        if word.quoted || literal_next || !has_wildcard(&word.text) {
            out.push(word.text.clone());
        } else {
            out.extend(expand_pattern(&word.text, vfs));
        }
        literal_next = !word.quoted && config.is_pattern_flag(&word.text);
    }
    out
}
