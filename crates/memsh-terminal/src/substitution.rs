//! `$(...)` command substitution.

use memsh_types::error::Result;

/// Index one past the `)` matching an opening `$(` whose body starts at
/// `chars[start]`, or `None` when unbalanced.
fn matching_paren(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if !in_single => i += 1,
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            },
            _ => {},
        }
        i += 1;
    }
    None
}

/// Characters that would turn spliced output back into shell syntax.
const SPECIAL: &[char] = &['\'', '"', '\\', ';', '|', '&', '<', '>', '$'];
/// Characters that stay special inside double quotes.
const SPECIAL_IN_DOUBLE: &[char] = &['"', '\\', '$'];

/// Backslash-escape captured output so it splices back as plain words.
/// Whitespace still separates words; quotes, operators and `$` stay literal.
fn escape_output(text: &str, in_double: bool) -> String {
    let special = if in_double { SPECIAL_IN_DOUBLE } else { SPECIAL };
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Replace every `$(...)` in `line` with the output of running its body.
///
/// Inner substitutions are expanded first (at `depth + 1`); `run` then
/// executes the fully expanded body and must not expand it again. One
/// trailing newline is removed from each captured output, and the rest is
/// escaped so it tokenizes as literal words. Once `depth` reaches
/// `max_depth` the text is returned untouched, which bounds recursion for
/// arbitrarily nested input. A failing body expands to nothing.
pub fn expand(
    line: &str,
    depth: usize,
    max_depth: usize,
    run: &mut dyn FnMut(&str) -> Result<String>,
) -> String {
    if depth >= max_depth || !line.contains("$(") {
        return line.to_string();
    }

    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if !in_single && i + 1 < chars.len() => {
                out.push(ch);
                out.push(chars[i + 1]);
                i += 2;
                continue;
            },
            '$' if !in_single && chars.get(i + 1) == Some(&'(') => {
                let Some(end) = matching_paren(&chars, i + 2) else {
                    out.extend(&chars[i..]);
                    break;
                };
                let body: String = chars[i + 2..end - 1].iter().collect();
                let body = expand(&body, depth + 1, max_depth, run);
                match run(&body) {
                    Ok(output) => {
                        let output = output.strip_suffix('\n').unwrap_or(&output);
                        out.push_str(&escape_output(output, in_double));
                    },
                    Err(e) => log::warn!("command substitution `{body}` failed: {e}"),
                }
                i = end;
                continue;
            },
            _ => {},
        }
        out.push(ch);
        i += 1;
    }
    out
}
