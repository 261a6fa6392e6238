//! `diff` and `patch` over the virtual filesystem.

use memsh_diff::{
    DiffOptions, FilePatch, apply_hunks, context_diff, differs, normal_diff, parse_patch,
    split_lines, unified_diff,
};
use memsh_types::error::{Result, ShellError};

use crate::executor::DEV_NULL;
use crate::interpreter::{Args, Command, CommandRegistry, Environment};

/// Register `diff` and `patch`.
pub fn register_diff_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(DiffCmd));
    reg.register(Box::new(PatchCmd));
}

/// Read a diff operand: `-` is stdin and `/dev/null` is empty.
fn read_operand(env: &Environment<'_>, path: &str) -> Result<String> {
    if path == DEV_NULL {
        return Ok(String::new());
    }
    env.read_input(Some(path))
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffFormat {
    Normal,
    Unified,
    Context,
}

struct DiffCmd;

impl DiffCmd {
    /// Output format and context size. `-U N` / `-C N` take a value,
    /// `-u` / `-c` accept an attached one (`-u5`).
    fn format(args: &Args, default_context: usize) -> Result<(DiffFormat, usize)> {
        let (format, flags) = if args.flag("-u") || args.flag("-U") {
            (DiffFormat::Unified, ["-U", "-u"])
        } else if args.flag("-c") || args.flag("-C") {
            (DiffFormat::Context, ["-C", "-c"])
        } else {
            return Ok((DiffFormat::Normal, 0));
        };
        let mut context = default_context;
        for flag in flags {
            if let Some(n) = args.number(flag)? {
                context = n;
                break;
            }
        }
        Ok((format, context))
    }
}

impl Command for DiffCmd {
    fn name(&self) -> &str {
        "diff"
    }
    fn description(&self) -> &str {
        "Compare files line by line"
    }
    fn usage(&self) -> &str {
        "diff [-u[N]|-U N|-c[N]|-C N] [-q] [-i] [-w] [-b] [-B] <old> <new>"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &["-U", "-C"])?;
        let [old_path, new_path] = args.require(2)? else {
            return Err(args.usage_error());
        };
        let (format, context) = Self::format(&args, env.config.diff_context_lines)?;
        let opts = DiffOptions {
            ignore_case: args.flag("-i"),
            ignore_all_space: args.flag("-w"),
            ignore_space_change: args.flag("-b"),
            ignore_blank_lines: args.flag("-B"),
        };

        let old_text = read_operand(env, old_path)?;
        let new_text = read_operand(env, new_path)?;
        let old = split_lines(&old_text);
        let new = split_lines(&new_text);

        if args.flag("-q") {
            return Ok(if differs(&old, &new, &opts) {
                format!("Files {old_path} and {new_path} differ")
            } else {
                String::new()
            });
        }

        let rendered = match format {
            DiffFormat::Normal => normal_diff(&old, &new, &opts),
            DiffFormat::Unified => unified_diff(&old, &new, old_path, new_path, context, &opts),
            DiffFormat::Context => context_diff(&old, &new, old_path, new_path, context, &opts),
        };
        log::debug!("diff {old_path} {new_path}: {} bytes", rendered.len());
        Ok(rendered
            .strip_suffix('\n')
            .map(str::to_string)
            .unwrap_or(rendered))
    }
}

// ---------------------------------------------------------------------------
// patch
// ---------------------------------------------------------------------------

struct PatchCmd;

/// Options shared by every file in one `patch` run.
struct PatchRun<'a> {
    strip: usize,
    reverse: bool,
    dry_run: bool,
    output: Option<&'a str>,
    target: Option<&'a str>,
}

impl PatchRun<'_> {
    /// The file a patch applies to: the explicit target, else the first
    /// header name (after `-p`) that exists, else the first one when the
    /// patch creates its file.
    fn resolve_target(&self, env: &Environment<'_>, file: &FilePatch) -> Result<String> {
        if let Some(target) = self.target {
            return Ok(target.to_string());
        }
        let candidates = file.candidates(self.strip);
        if let Some(found) = candidates.iter().find(|c| env.vfs.exists(c)) {
            return Ok(found.clone());
        }
        match candidates.into_iter().next() {
            Some(name) if file.creates_file(self.reverse) => Ok(name),
            Some(name) => Err(ShellError::PatchFailed(format!(
                "can't find file to patch: {name}"
            ))),
            None => Err(ShellError::PatchFailed(
                "no file name in patch; give the target explicitly".to_string(),
            )),
        }
    }

    fn apply(
        &self,
        env: &mut Environment<'_>,
        file: &FilePatch,
        report: &mut Vec<String>,
    ) -> Result<()> {
        let target = self.resolve_target(env, file)?;
        let verb = if self.dry_run { "checking" } else { "patching" };
        report.push(format!("{verb} file {target}"));

        let original = if file.creates_file(self.reverse) && !env.vfs.exists(&target) {
            String::new()
        } else {
            env.vfs.read_to_string(&target)?
        };
        let applied = apply_hunks(&original, &file.hunks, self.reverse)?;
        for (hunk, line, offset) in &applied.offsets {
            let unit = if offset.unsigned_abs() == 1 { "line" } else { "lines" };
            report.push(format!("Hunk #{hunk} succeeded at {line} (offset {offset} {unit})."));
        }

        if self.dry_run {
            return Ok(());
        }
        match self.output {
            Some(out) => env.vfs.write(out, applied.content.as_bytes())?,
            None if file.deletes_file(self.reverse) && applied.content.is_empty() => {
                env.vfs.remove(&target, false)?;
                log::debug!("patch removed {target}");
            },
            None => env.vfs.write(&target, applied.content.as_bytes())?,
        }
        Ok(())
    }
}

impl Command for PatchCmd {
    fn name(&self) -> &str {
        "patch"
    }
    fn description(&self) -> &str {
        "Apply a diff to files"
    }
    fn usage(&self) -> &str {
        "patch [-p N] [-R] [-o FILE] [-i PATCHFILE] [--dry-run] [file [patchfile]]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &["-p", "-o", "-i"])?;
        let operands = args.positional();
        if operands.len() > 2 {
            return Err(args.usage_error());
        }
        let patch_file = args.value("-i").or(operands.get(1).map(String::as_str));
        let input = match patch_file {
            Some(path) => env.vfs.read_to_string(path)?,
            None => env.read_input(None)?,
        };
        let files = parse_patch(&input)?;

        let run = PatchRun {
            strip: args.number("-p")?.unwrap_or(0),
            reverse: args.flag("-R"),
            dry_run: args.flag("--dry-run"),
            output: args.value("-o"),
            target: operands.first().map(String::as_str),
        };
        let mut report = Vec::new();
        for file in &files {
            run.apply(env, file, &mut report)?;
        }
        Ok(report.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memsh_types::config::ShellConfig;
    use memsh_vfs::Vfs;

    use crate::Shell;

    fn setup() -> Shell {
        let mut sh = Shell::new(ShellConfig::default()).unwrap();
        sh.vfs_mut().write("/old.txt", b"a\nb\nc\n").unwrap();
        sh.vfs_mut().write("/new.txt", b"a\nx\nc\n").unwrap();
        sh
    }

    fn exec(sh: &mut Shell, line: &str) -> String {
        sh.execute(line).unwrap()
    }

    fn text(sh: &Shell, path: &str) -> String {
        sh.vfs().read_to_string(path).unwrap()
    }

    #[test]
    fn normal_format_by_default() {
        let mut sh = setup();
        assert_eq!(exec(&mut sh, "diff old.txt new.txt"), "2c2\n< b\n---\n> x");
    }

    #[test]
    fn unified_with_context() {
        let mut sh = setup();
        assert_eq!(
            exec(&mut sh, "diff -U1 old.txt new.txt"),
            "--- old.txt\n+++ new.txt\n@@ -1,3 +1,3 @@\n a\n-b\n+x\n c"
        );
        assert_eq!(
            exec(&mut sh, "diff -U 0 old.txt new.txt"),
            "--- old.txt\n+++ new.txt\n@@ -2 +2 @@\n-b\n+x"
        );
        assert_eq!(exec(&mut sh, "diff -u0 old.txt new.txt"), exec(&mut sh, "diff -U0 old.txt new.txt"));
    }

    #[test]
    fn context_format() {
        let mut sh = setup();
        assert_eq!(
            exec(&mut sh, "diff -c old.txt new.txt"),
            "*** old.txt\n--- new.txt\n***************\n*** 1,3 ****\n  a\n! b\n  c\n--- 1,3 ----\n  a\n! x\n  c"
        );
    }

    #[test]
    fn identical_files_print_nothing() {
        let mut sh = setup();
        assert_eq!(exec(&mut sh, "diff old.txt old.txt"), "");
        assert_eq!(exec(&mut sh, "diff -u old.txt old.txt"), "");
        assert_eq!(exec(&mut sh, "diff -q old.txt old.txt"), "");
    }

    #[test]
    fn brief_reports_difference_as_success() {
        let mut sh = setup();
        assert_eq!(
            exec(&mut sh, "diff -q old.txt new.txt && echo after"),
            "Files old.txt and new.txt differ\nafter"
        );
    }

    #[test]
    fn comparison_switches() {
        let mut sh = setup();
        sh.vfs_mut().write("/upper.txt", b"A\nB\nC\n").unwrap();
        sh.vfs_mut().write("/spaced.txt", b"a\n\n b \nc\n").unwrap();
        assert_eq!(exec(&mut sh, "diff -i old.txt upper.txt"), "");
        assert_eq!(exec(&mut sh, "diff -w -B old.txt spaced.txt"), "");
        assert_ne!(exec(&mut sh, "diff -w old.txt spaced.txt"), "");
    }

    #[test]
    fn brief_honors_comparison_switches() {
        let mut sh = setup();
        sh.vfs_mut().write("/blank.txt", b"\na\nb\n\nc\n").unwrap();
        assert_eq!(exec(&mut sh, "diff -q -B old.txt blank.txt"), "");
        assert_eq!(
            exec(&mut sh, "diff -q old.txt blank.txt"),
            "Files old.txt and blank.txt differ"
        );
    }

    #[test]
    fn ignore_blank_lines_with_hunk_formats() {
        let mut sh = setup();
        sh.vfs_mut().write("/lead.txt", b"\n\nk\na\n").unwrap();
        sh.vfs_mut().write("/short.txt", b"k\nb\n").unwrap();
        assert_eq!(
            exec(&mut sh, "diff -B -u lead.txt short.txt"),
            "--- lead.txt\n+++ short.txt\n@@ -1,4 +1,2 @@\n-\n-\n k\n-a\n+b"
        );
        assert!(exec(&mut sh, "diff -B -c lead.txt short.txt").contains("*** 1,4 ****"));

        sh.vfs_mut().write("/five.txt", b"a\nb\nc\nd\ne\n").unwrap();
        sh.vfs_mut().write("/six.txt", b"a\nB\nc\n\nd\nE\n").unwrap();
        exec(&mut sh, "diff -B -u five.txt six.txt > blank.diff");
        exec(&mut sh, "patch five.txt < blank.diff");
        assert_eq!(text(&sh, "/five.txt"), "a\nB\nc\n\nd\nE\n");
    }

    #[test]
    fn stdin_operand() {
        let mut sh = setup();
        assert_eq!(exec(&mut sh, "cat new.txt | diff old.txt -"), "2c2\n< b\n---\n> x");
    }

    #[test]
    fn missing_operand_is_usage_error() {
        let mut sh = setup();
        assert!(matches!(sh.execute("diff old.txt"), Err(ShellError::Usage(_))));
        assert!(matches!(
            sh.execute("diff old.txt nope.txt"),
            Err(ShellError::NoSuchPath(_))
        ));
    }

    #[test]
    fn patch_applies_and_reverses_unified() {
        let mut sh = setup();
        exec(&mut sh, "diff -u old.txt new.txt > /tmp/change.diff");
        exec(&mut sh, "cp old.txt work.txt");
        assert_eq!(exec(&mut sh, "patch work.txt < /tmp/change.diff"), "patching file work.txt");
        assert_eq!(text(&sh, "/work.txt"), "a\nx\nc\n");
        exec(&mut sh, "patch -R work.txt < /tmp/change.diff");
        assert_eq!(text(&sh, "/work.txt"), "a\nb\nc\n");
    }

    #[test]
    fn patch_picks_target_from_headers() {
        let mut sh = setup();
        exec(&mut sh, "diff -u old.txt new.txt > /tmp/change.diff");
        exec(&mut sh, "rm new.txt");
        assert_eq!(exec(&mut sh, "patch < /tmp/change.diff"), "patching file old.txt");
        assert_eq!(text(&sh, "/old.txt"), "a\nx\nc\n");
    }

    #[test]
    fn patch_from_file_option_and_output() {
        let mut sh = setup();
        exec(&mut sh, "diff old.txt new.txt > /tmp/n.diff");
        exec(&mut sh, "patch -i /tmp/n.diff -o /tmp/out.txt old.txt");
        assert_eq!(text(&sh, "/tmp/out.txt"), "a\nx\nc\n");
        assert_eq!(text(&sh, "/old.txt"), "a\nb\nc\n");
        exec(&mut sh, "patch old.txt /tmp/n.diff");
        assert_eq!(text(&sh, "/old.txt"), "a\nx\nc\n");
    }

    #[test]
    fn patch_dry_run_leaves_file() {
        let mut sh = setup();
        exec(&mut sh, "diff -u old.txt new.txt > /tmp/d");
        assert_eq!(exec(&mut sh, "patch --dry-run old.txt < /tmp/d"), "checking file old.txt");
        assert_eq!(text(&sh, "/old.txt"), "a\nb\nc\n");
    }

    #[test]
    fn patch_strips_components() {
        let mut sh = setup();
        sh.vfs_mut().mkdir_all("/src").unwrap();
        sh.vfs_mut().write("/src/f.txt", b"one\ntwo\n").unwrap();
        sh.vfs_mut()
            .write(
                "/p.diff",
                b"--- a/src/f.txt\n+++ b/src/f.txt\n@@ -1,2 +1,2 @@\n one\n-two\n+three\n",
            )
            .unwrap();
        assert_eq!(exec(&mut sh, "patch -p1 -i p.diff"), "patching file src/f.txt");
        assert_eq!(text(&sh, "/src/f.txt"), "one\nthree\n");
    }

    #[test]
    fn patch_reports_offset() {
        let mut sh = setup();
        sh.vfs_mut().write("/shifted.txt", b"new top\na\nb\nc\n").unwrap();
        exec(&mut sh, "diff -u old.txt new.txt > /tmp/d");
        assert_eq!(
            exec(&mut sh, "patch shifted.txt < /tmp/d"),
            "patching file shifted.txt\nHunk #1 succeeded at 2 (offset 1 line)."
        );
        assert_eq!(text(&sh, "/shifted.txt"), "new top\na\nx\nc\n");
    }

    #[test]
    fn patch_creates_and_deletes_files() {
        let mut sh = setup();
        exec(&mut sh, "diff -u /dev/null new.txt > /tmp/create.diff");
        exec(&mut sh, "rm new.txt");
        exec(&mut sh, "patch < /tmp/create.diff");
        assert_eq!(text(&sh, "/new.txt"), "a\nx\nc\n");

        exec(&mut sh, "diff -u old.txt /dev/null > /tmp/delete.diff");
        exec(&mut sh, "patch < /tmp/delete.diff");
        assert!(!sh.vfs().exists("/old.txt"));
    }

    #[test]
    fn patch_failures() {
        let mut sh = setup();
        sh.vfs_mut().write("/junk", b"not a diff").unwrap();
        assert!(matches!(
            sh.execute("patch old.txt < junk"),
            Err(ShellError::UnsupportedPatchFormat)
        ));
        exec(&mut sh, "diff -u old.txt new.txt > /tmp/d");
        sh.vfs_mut().write("/other.txt", b"p\nq\n").unwrap();
        assert!(matches!(
            sh.execute("patch other.txt < /tmp/d"),
            Err(ShellError::PatchFailed(_))
        ));
    }
}
