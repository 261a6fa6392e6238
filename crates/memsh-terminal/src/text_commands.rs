//! Text processing commands: head, tail, wc, grep, sort, uniq, tee.

use memsh_types::error::{Result, ShellError};

use crate::interpreter::{Args, Command, CommandRegistry, Environment};

/// Register the text processing commands.
pub fn register_text_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(HeadCmd));
    reg.register(Box::new(TailCmd));
    reg.register(Box::new(WcCmd));
    reg.register(Box::new(GrepCmd));
    reg.register(Box::new(SortCmd));
    reg.register(Box::new(UniqCmd));
    reg.register(Box::new(TeeCmd));
}

/// Line count for `head`/`tail`: `-n N`, `-nN` or the historic `-N`.
/// Returns the count and the optional input file.
fn parse_line_count(args: &[&str], usage: &str) -> Result<(usize, Option<String>)> {
    let args = Args::parse(args, usage, &["-n"])?;
    let mut count = args.number("-n")?.unwrap_or(10);
    let mut file = None;
    for operand in args.positional() {
        match operand.strip_prefix('-') {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                count = digits.parse().map_err(|_| args.usage_error())?;
            },
            _ if file.is_none() => file = Some(operand.clone()),
            _ => return Err(args.usage_error()),
        }
    }
    Ok((count, file))
}

// ---------------------------------------------------------------------------
// head
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show first N lines"
    }
    fn usage(&self) -> &str {
        "head [-n N] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let (n, file) = parse_line_count(args, self.usage())?;
        let text = env.read_input(file.as_deref())?;
        let result: Vec<&str> = text.lines().take(n).collect();
        Ok(result.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// tail
// ---------------------------------------------------------------------------

struct TailCmd;
impl Command for TailCmd {
    fn name(&self) -> &str {
        "tail"
    }
    fn description(&self) -> &str {
        "Show last N lines"
    }
    fn usage(&self) -> &str {
        "tail [-n N] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let (n, file) = parse_line_count(args, self.usage())?;
        let text = env.read_input(file.as_deref())?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].join("\n"))
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words, and bytes"
    }
    fn usage(&self) -> &str {
        "wc [-l] [-w] [-c] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let text = env.read_input(args.positional().first().map(String::as_str))?;
        let counts = [
            ("-l", text.lines().count()),
            ("-w", text.split_whitespace().count()),
            ("-c", text.len()),
        ];

        let selected: Vec<usize> = counts
            .iter()
            .filter(|(flag, _)| args.flag(flag))
            .map(|&(_, n)| n)
            .collect();
        if let [only] = selected.as_slice() {
            return Ok(only.to_string());
        }
        let shown: Vec<usize> = if selected.is_empty() {
            counts.iter().map(|&(_, n)| n).collect()
        } else {
            selected
        };
        Ok(shown
            .iter()
            .map(|n| format!("{n:>8}"))
            .collect::<Vec<_>>()
            .join(" "))
    }
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search for a fixed string in text"
    }
    fn usage(&self) -> &str {
        "grep [-i] [-n] [-v] [-c] <pattern> [file...]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let case_insensitive = args.flag("-i");
        let show_numbers = args.flag("-n");
        let invert = args.flag("-v");
        let count_only = args.flag("-c");

        let Some((pattern, files)) = args.positional().split_first() else {
            return Err(args.usage_error());
        };
        let pat = if case_insensitive {
            pattern.to_lowercase()
        } else {
            pattern.clone()
        };

        // (label, text) per input; the label is only shown for several files.
        let mut inputs: Vec<(Option<&str>, String)> = Vec::new();
        if files.is_empty() {
            inputs.push((None, env.read_input(None)?));
        }
        for file in files {
            inputs.push((Some(file.as_str()), env.read_input(Some(file.as_str()))?));
        }
        let labelled = inputs.len() > 1;

        let mut out = Vec::new();
        let mut total = 0usize;
        for (label, text) in &inputs {
            let mut count = 0usize;
            for (i, line) in text.lines().enumerate() {
                let found = if case_insensitive {
                    line.to_lowercase().contains(&pat)
                } else {
                    line.contains(&pat)
                };
                if found == invert {
                    continue;
                }
                count += 1;
                if count_only {
                    continue;
                }
                let mut rendered = String::new();
                if labelled && let Some(label) = label {
                    rendered.push_str(label);
                    rendered.push(':');
                }
                if show_numbers {
                    rendered.push_str(&format!("{}:", i + 1));
                }
                rendered.push_str(line);
                out.push(rendered);
            }
            if count_only {
                match label {
                    Some(label) if labelled => out.push(format!("{label}:{count}")),
                    _ => out.push(count.to_string()),
                }
            }
            total += count;
        }

        if total == 0 && !count_only {
            return Err(ShellError::status("grep", 1));
        }
        Ok(out.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// sort
// ---------------------------------------------------------------------------

/// Leading number of a line for `sort -n`; lines without one sort as 0.
fn numeric_key(line: &str) -> f64 {
    line.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

struct SortCmd;
impl Command for SortCmd {
    fn name(&self) -> &str {
        "sort"
    }
    fn description(&self) -> &str {
        "Sort lines of text"
    }
    fn usage(&self) -> &str {
        "sort [-r] [-n] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let text = env.read_input(args.positional().first().map(String::as_str))?;
        let mut lines: Vec<&str> = text.lines().collect();

        if args.flag("-n") {
            lines.sort_by(|a, b| numeric_key(a).total_cmp(&numeric_key(b)));
        } else {
            lines.sort();
        }
        if args.flag("-r") {
            lines.reverse();
        }
        Ok(lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// uniq
// ---------------------------------------------------------------------------

struct UniqCmd;
impl Command for UniqCmd {
    fn name(&self) -> &str {
        "uniq"
    }
    fn description(&self) -> &str {
        "Remove adjacent duplicate lines"
    }
    fn usage(&self) -> &str {
        "uniq [-c] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let show_count = args.flag("-c");
        let text = env.read_input(args.positional().first().map(String::as_str))?;

        let mut runs: Vec<(&str, usize)> = Vec::new();
        for line in text.lines() {
            match runs.last_mut() {
                Some((prev, count)) if *prev == line => *count += 1,
                _ => runs.push((line, 1)),
            }
        }
        let result: Vec<String> = runs
            .into_iter()
            .map(|(line, count)| {
                if show_count {
                    format!("{count:>7} {line}")
                } else {
                    line.to_string()
                }
            })
            .collect();
        Ok(result.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// tee
// ---------------------------------------------------------------------------

struct TeeCmd;
impl Command for TeeCmd {
    fn name(&self) -> &str {
        "tee"
    }
    fn description(&self) -> &str {
        "Copy stdin to files and stdout"
    }
    fn usage(&self) -> &str {
        "tee [-a] <file...>"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        if args.positional().is_empty() {
            return Err(args.usage_error());
        }
        let input = env.read_input(None)?;
        for path in args.positional() {
            if args.flag("-a") {
                env.vfs.append(path, input.as_bytes())?;
            } else {
                env.vfs.write(path, input.as_bytes())?;
            }
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memsh_types::config::ShellConfig;
    use memsh_vfs::{MemoryVfs, Vfs};

    use crate::Executor;

    fn setup() -> (CommandRegistry, MemoryVfs) {
        let mut reg = CommandRegistry::new();
        register_text_commands(&mut reg);
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/tmp").unwrap();
        vfs.write("/tmp/test.txt", b"alpha\nbeta\ngamma\ndelta\nepsilon")
            .unwrap();
        (reg, vfs)
    }

    fn exec(reg: &CommandRegistry, vfs: &mut MemoryVfs, line: &str) -> Result<String> {
        let config = ShellConfig::default();
        Executor::new(reg, &config).execute(line, vfs)
    }

    #[test]
    fn head_default_and_count() {
        let (reg, mut vfs) = setup();
        assert_eq!(
            exec(&reg, &mut vfs, "head /tmp/test.txt").unwrap(),
            "alpha\nbeta\ngamma\ndelta\nepsilon"
        );
        assert_eq!(exec(&reg, &mut vfs, "head -n 2 /tmp/test.txt").unwrap(), "alpha\nbeta");
        assert_eq!(exec(&reg, &mut vfs, "head -n1 /tmp/test.txt").unwrap(), "alpha");
        assert_eq!(exec(&reg, &mut vfs, "head -3 /tmp/test.txt").unwrap(), "alpha\nbeta\ngamma");
    }

    #[test]
    fn head_reads_stdin() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "head -n 1 < /tmp/test.txt").unwrap(), "alpha");
    }

    #[test]
    fn head_bad_count_is_usage_error() {
        let (reg, mut vfs) = setup();
        let err = exec(&reg, &mut vfs, "head -n x /tmp/test.txt").unwrap_err();
        assert_eq!(err.to_string(), "usage: head [-n N] [file]");
    }

    #[test]
    fn tail_last_lines() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "tail -n 2 /tmp/test.txt").unwrap(), "delta\nepsilon");
        assert_eq!(
            exec(&reg, &mut vfs, "tail -n 50 /tmp/test.txt").unwrap(),
            "alpha\nbeta\ngamma\ndelta\nepsilon"
        );
    }

    #[test]
    fn wc_counts() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "wc -l /tmp/test.txt").unwrap(), "5");
        assert_eq!(exec(&reg, &mut vfs, "wc -w /tmp/test.txt").unwrap(), "5");
        assert_eq!(exec(&reg, &mut vfs, "wc -c /tmp/test.txt").unwrap(), "30");
        assert_eq!(
            exec(&reg, &mut vfs, "wc /tmp/test.txt").unwrap(),
            "       5        5       30"
        );
        assert_eq!(exec(&reg, &mut vfs, "wc -lw /tmp/test.txt").unwrap(), "       5        5");
    }

    #[test]
    fn grep_basic_and_flags() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "grep eta /tmp/test.txt").unwrap(), "beta");
        assert_eq!(exec(&reg, &mut vfs, "grep -n ta /tmp/test.txt").unwrap(), "2:beta\n4:delta");
        assert_eq!(exec(&reg, &mut vfs, "grep -c a /tmp/test.txt").unwrap(), "4");
        assert_eq!(exec(&reg, &mut vfs, "grep -v a /tmp/test.txt").unwrap(), "epsilon");
        assert_eq!(exec(&reg, &mut vfs, "grep -i ALPHA /tmp/test.txt").unwrap(), "alpha");
        assert_eq!(exec(&reg, &mut vfs, "grep -vc a /tmp/test.txt").unwrap(), "1");
    }

    #[test]
    fn grep_no_match_fails_with_status() {
        let (reg, mut vfs) = setup();
        assert!(matches!(
            exec(&reg, &mut vfs, "grep zzz /tmp/test.txt"),
            Err(ShellError::ExitStatus { code: 1, .. })
        ));
        assert_eq!(exec(&reg, &mut vfs, "grep -c zzz /tmp/test.txt").unwrap(), "0");
    }

    #[test]
    fn grep_multiple_files_are_labelled() {
        let (reg, mut vfs) = setup();
        vfs.write("/tmp/other.txt", b"beta blocker").unwrap();
        assert_eq!(
            exec(&reg, &mut vfs, "grep beta /tmp/test.txt /tmp/other.txt").unwrap(),
            "/tmp/test.txt:beta\n/tmp/other.txt:beta blocker"
        );
    }

    #[test]
    fn grep_without_pattern_is_usage_error() {
        let (reg, mut vfs) = setup();
        assert!(matches!(exec(&reg, &mut vfs, "grep"), Err(ShellError::Usage(_))));
    }

    #[test]
    fn sort_lexical_numeric_reverse() {
        let (reg, mut vfs) = setup();
        vfs.write("/tmp/nums.txt", b"10\n9\n100\n1").unwrap();
        assert_eq!(exec(&reg, &mut vfs, "sort /tmp/nums.txt").unwrap(), "1\n10\n100\n9");
        assert_eq!(exec(&reg, &mut vfs, "sort -n /tmp/nums.txt").unwrap(), "1\n9\n10\n100");
        assert_eq!(exec(&reg, &mut vfs, "sort -rn /tmp/nums.txt").unwrap(), "100\n10\n9\n1");
    }

    #[test]
    fn uniq_collapses_runs() {
        let (reg, mut vfs) = setup();
        vfs.write("/tmp/dup.txt", b"a\na\nb\na").unwrap();
        assert_eq!(exec(&reg, &mut vfs, "uniq /tmp/dup.txt").unwrap(), "a\nb\na");
        assert_eq!(
            exec(&reg, &mut vfs, "uniq -c /tmp/dup.txt").unwrap(),
            "      2 a\n      1 b\n      1 a"
        );
    }

    #[test]
    fn sort_then_uniq_pipeline() {
        let (reg, mut vfs) = setup();
        vfs.write("/tmp/dup.txt", b"b\na\nb\na").unwrap();
        assert_eq!(exec(&reg, &mut vfs, "sort /tmp/dup.txt | uniq").unwrap(), "a\nb");
    }

    #[test]
    fn tee_writes_and_passes_through() {
        let (reg, mut vfs) = setup();
        let out = exec(&reg, &mut vfs, "head -n 1 /tmp/test.txt | tee /tmp/a /tmp/b").unwrap();
        assert_eq!(out, "alpha");
        assert_eq!(vfs.read_to_string("/tmp/a").unwrap(), "alpha");
        assert_eq!(vfs.read_to_string("/tmp/b").unwrap(), "alpha");
        exec(&reg, &mut vfs, "tail -n 1 /tmp/test.txt | tee -a /tmp/a").unwrap();
        assert_eq!(vfs.read_to_string("/tmp/a").unwrap(), "alphaepsilon");
    }

    #[test]
    fn tee_requires_file() {
        let (reg, mut vfs) = setup();
        assert!(matches!(exec(&reg, &mut vfs, "tee"), Err(ShellError::Usage(_))));
    }
}
