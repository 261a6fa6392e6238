//! Script, line, pipeline and single-command execution.
//!
//! Text flows through the stages in this order: script units (heredoc
//! blocks, loops spanning lines, plain lines), `for` loops, the pipeline
//! parser, command substitution for each group as it runs, and finally
//! per-command redirection, wildcard expansion and registry dispatch.

use std::cell::RefCell;
use std::collections::VecDeque;

use memsh_types::config::ShellConfig;
use memsh_types::error::{Result, ShellError};
use memsh_vfs::Vfs;

use crate::control;
use crate::glob;
use crate::heredoc::{self, Heredoc};
use crate::interpreter::{CommandRegistry, Environment};
use crate::lexer::{Word, tokenize};
use crate::pipeline::{PipeOp, PipelineSegment, parse_pipeline};
use crate::redirect::{RedirectOp, parse_redirections};
use crate::substitution;

/// Redirection target that discards output and reads as empty.
pub const DEV_NULL: &str = "/dev/null";

/// Whether `text` must be followed by more lines before it can run: an
/// open heredoc or a `for` without its `done`.
pub fn needs_more_input(text: &str) -> bool {
    heredoc::needs_more_input(text) || control::is_incomplete(text)
}

/// One independently executed piece of a script.
enum Unit {
    Line(String),
    Heredoc(Heredoc),
}

/// A pipeline stage that failed.
struct StageFailure {
    error: ShellError,
    /// The stage was followed by `|`.
    mid_pipeline: bool,
}

/// Executes command text against a registry and a filesystem.
///
/// Holds the per-run state: heredoc bodies waiting for their `<<` and
/// diagnostics (unredirected stderr, failed loop iterations) to report
/// after the output.
pub struct Executor<'a> {
    registry: &'a CommandRegistry,
    config: &'a ShellConfig,
    heredocs: RefCell<VecDeque<String>>,
    diagnostics: RefCell<Vec<String>>,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a CommandRegistry, config: &'a ShellConfig) -> Self {
        Self {
            registry,
            config,
            heredocs: RefCell::new(VecDeque::new()),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Execute one or more lines of text.
    ///
    /// Diagnostics collected along the way are appended to the output.
    pub fn execute(&self, text: &str, vfs: &mut dyn Vfs) -> Result<String> {
        let result = self.run_script(text, vfs);
        let diagnostics = std::mem::take(&mut *self.diagnostics.borrow_mut());
        let output = result?;
        if diagnostics.is_empty() {
            return Ok(output);
        }
        let mut parts = Vec::with_capacity(diagnostics.len() + 1);
        if !output.is_empty() {
            parts.push(output);
        }
        parts.extend(diagnostics);
        Ok(parts.join("\n"))
    }

    // -----------------------------------------------------------------------
    // Scripts
    // -----------------------------------------------------------------------

    fn split_units(text: &str) -> Vec<Unit> {
        let lines: Vec<&str> = text.lines().collect();
        let mut units = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() || line.starts_with('#') {
                i += 1;
                continue;
            }
            if !heredoc::find_markers(line).is_empty() {
                if let Some(doc) = heredoc::collect(&lines, i) {
                    i += doc.consumed;
                    units.push(Unit::Heredoc(doc));
                    continue;
                }
                log::warn!("unterminated heredoc: {line}");
            }

            let mut joined = line.to_string();
            i += 1;
            while control::is_incomplete(&joined) && i < lines.len() {
                joined.push('\n');
                joined.push_str(lines[i].trim());
                i += 1;
            }
            units.push(Unit::Line(joined));
        }
        units
    }

    fn run_script(&self, text: &str, vfs: &mut dyn Vfs) -> Result<String> {
        let units = Self::split_units(text);
        if let [unit] = units.as_slice() {
            return self.run_unit(unit, vfs);
        }

        let mut outputs = Vec::new();
        for unit in &units {
            match self.run_unit(unit, vfs) {
                Ok(out) if out.is_empty() => {},
                Ok(out) => outputs.push(out),
                Err(e) => outputs.push(e.to_string()),
            }
        }
        Ok(outputs.join("\n"))
    }

    fn run_unit(&self, unit: &Unit, vfs: &mut dyn Vfs) -> Result<String> {
        match unit {
            Unit::Line(line) => self.run_line(line, 0, None, true, vfs),
            Unit::Heredoc(doc) => {
                {
                    let mut queue = self.heredocs.borrow_mut();
                    queue.clear();
                    queue.extend(doc.bodies.iter().cloned());
                }
                let result = self.run_line(&doc.command, 0, None, true, vfs);
                let leftover = self.heredocs.borrow().len();
                if leftover > 0 {
                    log::debug!("{leftover} heredoc bodies were not consumed");
                    self.heredocs.borrow_mut().clear();
                }
                result
            },
        }
    }

    // -----------------------------------------------------------------------
    // Lines and loops
    // -----------------------------------------------------------------------

    /// Run one logical line.
    ///
    /// `stdin` feeds the first command group; an empty line passes it
    /// through unchanged. `expand` is false for the body of a command
    /// substitution, whose inner substitutions were already expanded.
    fn run_line(
        &self,
        line: &str,
        depth: usize,
        stdin: Option<String>,
        expand: bool,
        vfs: &mut dyn Vfs,
    ) -> Result<String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(stdin.unwrap_or_default());
        }

        match control::find_loop_start(line) {
            Some(0) => return self.run_loop(line, depth, stdin, vfs),
            Some(pos) => return self.run_split(&line[..pos], &line[pos..], depth, stdin, vfs),
            None => {},
        }

        let segments = parse_pipeline(line)?;
        self.exec_sequence(&segments, depth, expand, stdin, vfs)
    }

    fn substitute(&self, text: &str, depth: usize, vfs: &mut dyn Vfs) -> String {
        substitution::expand(
            text,
            depth,
            self.config.max_substitution_depth,
            &mut |body: &str| self.run_line(body, depth + 1, None, false, &mut *vfs),
        )
    }

    /// Run `head`, then the loop text in `rest`, honoring the operator
    /// that ends `head`.
    fn run_split(
        &self,
        head: &str,
        rest: &str,
        depth: usize,
        stdin: Option<String>,
        vfs: &mut dyn Vfs,
    ) -> Result<String> {
        let head = head.trim_end();
        let (head, op) = if let Some(h) = head.strip_suffix("&&") {
            (h, PipeOp::And)
        } else if let Some(h) = head.strip_suffix("||") {
            (h, PipeOp::Or)
        } else if let Some(h) = head.strip_suffix('|') {
            log::debug!("piping into a loop runs it as a sequence");
            (h, PipeOp::Seq)
        } else {
            (head.trim_end_matches(';'), PipeOp::Seq)
        };

        let mut outputs = Vec::new();
        let head_ok = match self.run_line(head, depth, stdin, true, vfs) {
            Ok(out) => {
                outputs.push(out);
                true
            },
            Err(e) if op == PipeOp::And => return Err(e),
            Err(e) => {
                outputs.push(e.to_string());
                false
            },
        };

        let run_rest = match op {
            PipeOp::And => head_ok,
            PipeOp::Or => !head_ok,
            _ => true,
        };
        if run_rest {
            match self.run_line(rest, depth, None, true, vfs) {
                Ok(out) => outputs.push(out),
                Err(e) => outputs.push(e.to_string()),
            }
        }
        outputs.retain(|o| !o.is_empty());
        Ok(outputs.join("\n"))
    }

    fn run_loop(
        &self,
        text: &str,
        depth: usize,
        stdin: Option<String>,
        vfs: &mut dyn Vfs,
    ) -> Result<String> {
        let lp = control::parse_for(text)?;
        let items_text = self.substitute(&lp.items, depth, vfs);
        let words = tokenize(&items_text)?;
        let items = glob::expand_words(&words, &*vfs, self.config);
        log::debug!("for {} in {} items", lp.var, items.len());

        let mut outputs = Vec::new();
        for item in &items {
            let body = control::substitute_var(&lp.body, &lp.var, item);
            match self.run_line(&body, depth, None, true, vfs) {
                Ok(out) if out.is_empty() => {},
                Ok(out) => outputs.push(out),
                Err(e) => {
                    log::warn!("for {}={item}: {e}", lp.var);
                    self.diagnostics.borrow_mut().push(e.to_string());
                },
            }
        }
        if stdin.is_some() {
            log::debug!("loop ignores its input");
        }

        let output = outputs.join("\n");
        if lp.trailer.is_empty() {
            return Ok(output);
        }
        self.run_line(&lp.trailer, depth, Some(output), true, vfs)
    }

    // -----------------------------------------------------------------------
    // Sequences and pipelines
    // -----------------------------------------------------------------------

    /// Run segments, grouping `|`-joined ones into pipelines and applying
    /// `&&`, `||` and `;` between groups.
    /// Run groups left to right. `$(...)` in a group is expanded only when
    /// that group actually runs, so a skipped `&&`/`||` branch has no effects.
    fn exec_sequence(
        &self,
        segments: &[PipelineSegment],
        depth: usize,
        expand: bool,
        stdin: Option<String>,
        vfs: &mut dyn Vfs,
    ) -> Result<String> {
        if segments.is_empty() {
            return Ok(stdin.unwrap_or_default());
        }
        let single = segments.len() == 1;

        let mut groups: Vec<&[PipelineSegment]> = Vec::new();
        let mut start = 0;
        for (i, seg) in segments.iter().enumerate() {
            if seg.op != PipeOp::Pipe {
                groups.push(&segments[start..=i]);
                start = i + 1;
            }
        }
        if start < segments.len() {
            groups.push(&segments[start..]);
        }

        let mut stdin = stdin;
        let mut last_ok = true;
        let mut prev_op = PipeOp::Seq;
        let mut outputs = Vec::new();

        for group in groups {
            let group_op = group.last().map_or(PipeOp::End, |s| s.op);
            let should_run = match prev_op {
                PipeOp::And => last_ok,
                PipeOp::Or => !last_ok,
                _ => true,
            };
            prev_op = group_op;
            if !should_run {
                continue;
            }

            let result = if expand {
                match self.expand_group(group, depth, vfs) {
                    Ok(expanded) => self.exec_pipeline(&expanded, stdin.take(), vfs),
                    Err(error) => Err(StageFailure {
                        error,
                        mid_pipeline: false,
                    }),
                }
            } else {
                self.exec_pipeline(group, stdin.take(), vfs)
            };
            match result {
                Ok(out) => {
                    last_ok = true;
                    if !out.is_empty() {
                        outputs.push(out);
                    }
                },
                Err(failure) => {
                    last_ok = false;
                    if single || failure.mid_pipeline || group_op == PipeOp::And {
                        return Err(failure.error);
                    }
                    outputs.push(failure.error.to_string());
                },
            }
        }
        Ok(outputs.join("\n"))
    }

    /// Re-tokenize the segments of `group` that contain `$(...)` after
    /// substituting them.
    fn expand_group(
        &self,
        group: &[PipelineSegment],
        depth: usize,
        vfs: &mut dyn Vfs,
    ) -> Result<Vec<PipelineSegment>> {
        group
            .iter()
            .map(|seg| {
                if !seg.text.contains("$(") {
                    return Ok(seg.clone());
                }
                let text = self.substitute(&seg.text, depth, &mut *vfs);
                Ok(PipelineSegment {
                    command: tokenize(&text)?,
                    op: seg.op,
                    text,
                })
            })
            .collect()
    }

    fn exec_pipeline(
        &self,
        group: &[PipelineSegment],
        stdin: Option<String>,
        vfs: &mut dyn Vfs,
    ) -> std::result::Result<String, StageFailure> {
        let mut input = stdin;
        let last = group.len().saturating_sub(1);
        for (i, seg) in group.iter().enumerate() {
            match self.exec_single(&seg.command, input.take(), vfs) {
                Ok(out) => input = Some(out),
                Err(error) => {
                    return Err(StageFailure {
                        error,
                        mid_pipeline: i < last,
                    });
                },
            }
        }
        Ok(input.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Single commands
    // -----------------------------------------------------------------------

    /// Run one command with its redirections. A command with no words
    /// passes its input through, so `> file` on its own writes stdin.
    fn exec_single(&self, words: &[Word], stdin: Option<String>, vfs: &mut dyn Vfs) -> Result<String> {
        let parsed = parse_redirections(words.to_vec())?;

        let mut stdin = stdin;
        for redirection in &parsed.redirections {
            match redirection.op {
                RedirectOp::In if redirection.target == DEV_NULL => stdin = Some(String::new()),
                RedirectOp::In => stdin = Some(vfs.read_to_string(&redirection.target)?),
                RedirectOp::Heredoc { .. } => {
                    let body = self.heredocs.borrow_mut().pop_front();
                    if body.is_none() {
                        log::warn!("<<{}: heredoc body missing", redirection.target);
                    }
                    stdin = Some(body.unwrap_or_default());
                },
                _ => {},
            }
        }

        let args = glob::expand_words(&parsed.words, &*vfs, self.config);
        let (mut stdout, stderr) = match args.split_first() {
            None => (stdin.unwrap_or_default(), String::new()),
            Some((name, rest)) => {
                let argv: Vec<&str> = rest.iter().map(String::as_str).collect();
                let mut env = Environment::new(&mut *vfs, self.config);
                env.stdin = stdin;
                let result = self.registry.dispatch(name, &argv, &mut env);
                let stderr = std::mem::take(&mut env.stderr);
                match result {
                    Ok(out) => (out, stderr),
                    Err(e) if parsed.captures_stderr() => {
                        log::debug!("{name}: failure captured by stderr redirection");
                        (String::new(), join_lines(stderr.trim_end_matches('\n'), &e.to_string()))
                    },
                    Err(e) => {
                        self.report(&stderr);
                        return Err(e);
                    },
                }
            },
        };
        let stderr = stderr.trim_end_matches('\n');

        let out_redirect = parsed.last(|op| matches!(op, RedirectOp::Out | RedirectOp::Append | RedirectOp::Both));
        let err_redirect = parsed.last(RedirectOp::captures_stderr);

        match err_redirect {
            Some(r) if r.op == RedirectOp::ErrToOut => stdout = join_lines(&stdout, stderr),
            Some(r) if r.op == RedirectOp::Err => write_target(vfs, &r.target, stderr, false)?,
            Some(r) if r.op == RedirectOp::ErrAppend => write_target(vfs, &r.target, stderr, true)?,
            Some(r) => {
                // `&>` followed by a later `>`: stderr keeps the `&>` target.
                if out_redirect.map(|o| o.op) != Some(RedirectOp::Both) {
                    write_target(vfs, &r.target, stderr, false)?;
                }
            },
            None => self.report(stderr),
        }

        match out_redirect {
            None => Ok(stdout),
            Some(r) => {
                let content = if r.op == RedirectOp::Both {
                    join_lines(&stdout, stderr)
                } else {
                    stdout
                };
                write_target(vfs, &r.target, &content, r.op == RedirectOp::Append)?;
                Ok(String::new())
            },
        }
    }

    fn report(&self, stderr: &str) {
        let stderr = stderr.trim_end_matches('\n');
        if !stderr.is_empty() {
            self.diagnostics.borrow_mut().push(stderr.to_string());
        }
    }
}

/// Join two chunks of text with a newline, skipping empty ones.
fn join_lines(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a}\n{b}"),
    }
}

/// Write redirected output. Appending joins with a newline unless the file
/// is empty or already ends in one.
fn write_target(vfs: &mut dyn Vfs, target: &str, text: &str, append: bool) -> Result<()> {
    if target == DEV_NULL {
        return Ok(());
    }
    log::debug!("redirect {} bytes to {target} (append: {append})", text.len());
    if append && vfs.exists(target) {
        let existing = vfs.read_to_string(target)?;
        let combined = if existing.is_empty() || existing.ends_with('\n') {
            format!("{existing}{text}")
        } else {
            format!("{existing}\n{text}")
        };
        return vfs.write(target, combined.as_bytes());
    }
    vfs.write(target, text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Command;
    use memsh_vfs::MemoryVfs;

    /// Prints its arguments, or its stdin when it has none.
    struct Echo;
    impl Command for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn usage(&self) -> &str {
            "echo [text...]"
        }
        fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
            if args.is_empty() {
                return Ok(env.stdin.clone().unwrap_or_default());
            }
            Ok(args.join(" "))
        }
    }

    /// Writes a warning to stderr, then fails when given `fail`.
    struct Noisy;
    impl Command for Noisy {
        fn name(&self) -> &str {
            "noisy"
        }
        fn description(&self) -> &str {
            "noisy"
        }
        fn usage(&self) -> &str {
            "noisy [fail]"
        }
        fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
            env.warn("noisy: warning");
            if args.first() == Some(&"fail") {
                return Err(ShellError::Command("noisy: failed".into()));
            }
            Ok("out".into())
        }
    }

    struct Fail;
    impl Command for Fail {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "fail"
        }
        fn usage(&self) -> &str {
            "fail"
        }
        fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<String> {
            Err(ShellError::status("fail", 1))
        }
    }

    fn run(vfs: &mut MemoryVfs, text: &str) -> Result<String> {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(Echo));
        reg.register(Box::new(Noisy));
        reg.register(Box::new(Fail));
        let config = ShellConfig::default();
        Executor::new(&reg, &config).execute(text, vfs)
    }

    fn read(vfs: &MemoryVfs, path: &str) -> String {
        vfs.read_to_string(path).unwrap()
    }

    #[test]
    fn single_failure_propagates() {
        let mut vfs = MemoryVfs::new();
        assert!(matches!(run(&mut vfs, "fail"), Err(ShellError::ExitStatus { .. })));
        assert!(matches!(run(&mut vfs, "nope"), Err(ShellError::CommandNotFound(_))));
    }

    #[test]
    fn and_or_seq_semantics() {
        let mut vfs = MemoryVfs::new();
        assert!(run(&mut vfs, "fail && echo X").is_err());
        assert_eq!(
            run(&mut vfs, "fail || echo X").unwrap(),
            "fail: exited with status 1\nX"
        );
        assert_eq!(run(&mut vfs, "fail ; echo X").unwrap(), "fail: exited with status 1\nX");
        assert_eq!(run(&mut vfs, "echo a && echo b || echo c").unwrap(), "a\nb");
    }

    #[test]
    fn skipped_group_keeps_status() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(
            run(&mut vfs, "fail || echo a && echo b").unwrap(),
            "fail: exited with status 1\na\nb"
        );
        assert_eq!(run(&mut vfs, "echo a || echo b || echo c").unwrap(), "a");
    }

    #[test]
    fn mid_pipeline_failure_aborts() {
        let mut vfs = MemoryVfs::new();
        assert!(run(&mut vfs, "fail | echo x ; echo y").is_err());
    }

    #[test]
    fn pipe_feeds_stdin() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo hi | echo").unwrap(), "hi");
    }

    #[test]
    fn output_redirections() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo hi > /f").unwrap(), "");
        assert_eq!(read(&vfs, "/f"), "hi");
        run(&mut vfs, "echo bye >> /f").unwrap();
        assert_eq!(read(&vfs, "/f"), "hi\nbye");
        run(&mut vfs, "echo new >> /g").unwrap();
        assert_eq!(read(&vfs, "/g"), "new");
        assert_eq!(run(&mut vfs, "echo gone > /dev/null").unwrap(), "");
    }

    #[test]
    fn input_redirection() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/in", b"from file").unwrap();
        assert_eq!(run(&mut vfs, "echo < /in").unwrap(), "from file");
        assert_eq!(run(&mut vfs, "echo < /dev/null").unwrap(), "");
        assert!(run(&mut vfs, "echo < /missing").is_err());
    }

    #[test]
    fn stderr_routing() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "noisy").unwrap(), "out\nnoisy: warning");
        assert_eq!(run(&mut vfs, "noisy 2> /err").unwrap(), "out");
        assert_eq!(read(&vfs, "/err"), "noisy: warning");
        assert_eq!(run(&mut vfs, "noisy 2>&1").unwrap(), "out\nnoisy: warning");
        assert_eq!(run(&mut vfs, "noisy &> /all").unwrap(), "");
        assert_eq!(read(&vfs, "/all"), "out\nnoisy: warning");
        run(&mut vfs, "noisy 2>> /err").unwrap();
        assert_eq!(read(&vfs, "/err"), "noisy: warning\nnoisy: warning");
    }

    #[test]
    fn captured_failure_is_handled() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "noisy fail 2> /err && echo ok").unwrap(), "ok");
        assert_eq!(read(&vfs, "/err"), "noisy: warning\nnoisy: failed");
        assert_eq!(run(&mut vfs, "fail 2>&1").unwrap(), "fail: exited with status 1");
    }

    #[test]
    fn empty_segment_passes_input_through() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "for x in a b; do echo $x; done > /out").unwrap(), "");
        assert_eq!(read(&vfs, "/out"), "a\nb");
    }

    #[test]
    fn heredoc_feeds_stdin() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo <<EOF\nline one\nline two\nEOF").unwrap(), "line one\nline two");
    }

    #[test]
    fn heredoc_trailer_and_following_lines() {
        let mut vfs = MemoryVfs::new();
        let out = run(&mut vfs, "echo <<EOF\nbody\nEOF > /h\necho after").unwrap();
        assert_eq!(out, "after");
        assert_eq!(read(&vfs, "/h"), "body");
    }

    #[test]
    fn heredoc_without_body_reads_empty() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo <<EOF").unwrap(), "");
    }

    #[test]
    fn substitution_splices_output() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo [$(echo inner)]").unwrap(), "[inner]");
        assert_eq!(run(&mut vfs, "echo a$(fail)b").unwrap(), "ab");
    }

    #[test]
    fn skipped_branch_does_not_substitute() {
        let mut vfs = MemoryVfs::new();
        assert!(run(&mut vfs, "fail && echo $(echo leaked > /and)").is_err());
        assert!(!vfs.exists("/and"));
        assert_eq!(run(&mut vfs, "echo ok || echo $(echo leaked > /or)").unwrap(), "ok");
        assert!(!vfs.exists("/or"));
        assert_eq!(run(&mut vfs, "echo a > /f ; echo $(echo < /f)").unwrap(), "a");
    }

    #[test]
    fn substituted_text_stays_literal() {
        let mut vfs = MemoryVfs::new();
        vfs.write("/notes", b"don't; echo x > /y").unwrap();
        assert_eq!(run(&mut vfs, "echo $(echo < /notes)").unwrap(), "don't; echo x > /y");
        assert!(!vfs.exists("/y"));
        assert_eq!(run(&mut vfs, "echo \"$(echo < /notes)\"").unwrap(), "don't; echo x > /y");
    }

    #[test]
    fn deep_substitution_terminates() {
        let mut vfs = MemoryVfs::new();
        let mut line = "x".to_string();
        for _ in 0..12 {
            line = format!("echo $({line})");
        }
        let out = run(&mut vfs, &line).unwrap();
        assert!(out.contains("$(echo"), "{out}");
    }

    #[test]
    fn for_loop_runs_body_per_item() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "for x in a b c; do echo item-$x; done").unwrap(), "item-a\nitem-b\nitem-c");
    }

    #[test]
    fn for_loop_after_prefix() {
        let mut vfs = MemoryVfs::new();
        assert_eq!(run(&mut vfs, "echo start; for x in 1 2; do echo $x; done").unwrap(), "start\n1\n2");
        assert!(run(&mut vfs, "fail && for x in 1; do echo $x; done").is_err());
        assert_eq!(
            run(&mut vfs, "echo ok || for x in 1; do echo $x; done").unwrap(),
            "ok"
        );
    }

    #[test]
    fn failing_iteration_continues() {
        let mut vfs = MemoryVfs::new();
        let out = run(&mut vfs, "for c in echo fail echo; do $c hi; done").unwrap();
        assert_eq!(out, "hi\nhi\nfail: exited with status 1");
    }

    #[test]
    fn multiline_script_runs_line_by_line() {
        let mut vfs = MemoryVfs::new();
        let out = run(&mut vfs, "# comment\necho one\n\nfail\necho two").unwrap();
        assert_eq!(out, "one\nfail: exited with status 1\ntwo");
    }

    #[test]
    fn multiline_loop_is_joined() {
        let mut vfs = MemoryVfs::new();
        let out = run(&mut vfs, "for x in a b\ndo\n  echo $x\ndone\necho end").unwrap();
        assert_eq!(out, "a\nb\nend");
    }

    #[test]
    fn more_input_detection() {
        assert!(needs_more_input("cat <<EOF"));
        assert!(needs_more_input("for x in a; do"));
        assert!(!needs_more_input("echo hi"));
    }
}
