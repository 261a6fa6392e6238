//! Command trait, execution environment, flag parsing and the registry.

use std::collections::HashMap;

use memsh_types::config::ShellConfig;
use memsh_types::error::{Result, ShellError};
use memsh_vfs::Vfs;

use crate::glob;

/// Commands the registry answers itself.
const INTERCEPTED: [&str; 2] = ["help", "which"];

/// Shared mutable environment passed to every command.
pub struct Environment<'a> {
    /// The virtual file system. Relative paths resolve against its
    /// working directory.
    pub vfs: &'a mut dyn Vfs,
    /// Piped input from a previous command, a `<` file or a heredoc.
    pub stdin: Option<String>,
    /// Diagnostics written by the command. Routed by `2>`, `&>` and
    /// `2>&1`; otherwise surfaced after the line's output.
    pub stderr: String,
    pub config: &'a ShellConfig,
}

impl<'a> Environment<'a> {
    pub fn new(vfs: &'a mut dyn Vfs, config: &'a ShellConfig) -> Self {
        Self {
            vfs,
            stdin: None,
            stderr: String::new(),
            config,
        }
    }

    /// Read text from a file, or from stdin when `file` is `None` or `-`.
    pub fn read_input(&self, file: Option<&str>) -> Result<String> {
        match file {
            Some(path) if path != "-" => self.vfs.read_to_string(path),
            _ => Ok(self.stdin.clone().unwrap_or_default()),
        }
    }

    /// Expand a wildcard pattern against the filesystem.
    pub fn expand_wildcards(&self, pattern: &str) -> Vec<String> {
        glob::expand_pattern(pattern, &*self.vfs)
    }

    /// Every file and directory below `dir`, prefixed with `dir` as given.
    pub fn list_recursive(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        Ok(self
            .vfs
            .walk(dir)?
            .into_iter()
            .map(|entry| format!("{prefix}{}", entry.path))
            .collect())
    }

    /// Append a line to stderr.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.stderr.push_str(msg.as_ref());
        self.stderr.push('\n');
    }
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[path\]").
    fn usage(&self) -> &str;

    /// Command category for grouping in `help` output.
    fn category(&self) -> &str {
        "general"
    }

    /// Execute the command; the returned text is its stdout.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Flag parsing
// ---------------------------------------------------------------------------

/// Parsed command-line flags and operands.
///
/// Short flags combine (`-rf`), value flags take the next argument or an
/// attached value (`-n 5`, `-n5`, `-p1`), and a digit run after a plain
/// short flag becomes its optional value (`-u5`). `--` ends flag parsing
/// and a lone `-` is an operand.
#[derive(Debug, Clone, Default)]
pub struct Args {
    usage: String,
    flags: Vec<String>,
    values: Vec<(String, String)>,
    positional: Vec<String>,
}

impl Args {
    /// Parse `args`; `value_flags` lists the flags that take a value.
    pub fn parse(args: &[&str], usage: &str, value_flags: &[&str]) -> Result<Self> {
        let mut parsed = Self {
            usage: usage.to_string(),
            ..Self::default()
        };
        let mut iter = args.iter();

        while let Some(&arg) = iter.next() {
            if arg == "--" {
                parsed.positional.extend(iter.by_ref().map(|s| s.to_string()));
                break;
            }
            if let Some(long) = arg.strip_prefix("--") {
                if let Some((name, value)) = long.split_once('=') {
                    parsed.values.push((format!("--{name}"), value.to_string()));
                } else if value_flags.contains(&arg) {
                    let value = iter.next().ok_or_else(|| parsed.usage_error())?;
                    parsed.values.push((arg.to_string(), value.to_string()));
                } else {
                    parsed.flags.push(arg.to_string());
                }
                continue;
            }
            let Some(shorts) = arg.strip_prefix('-') else {
                parsed.positional.push(arg.to_string());
                continue;
            };
            if shorts.is_empty() || shorts.starts_with(|c: char| c.is_ascii_digit()) {
                parsed.positional.push(arg.to_string());
                continue;
            }

            for (i, c) in shorts.char_indices() {
                let flag = format!("-{c}");
                let rest = &shorts[i + c.len_utf8()..];
                if value_flags.contains(&flag.as_str()) {
                    let value = if rest.is_empty() {
                        iter.next().ok_or_else(|| parsed.usage_error())?.to_string()
                    } else {
                        rest.to_string()
                    };
                    parsed.values.push((flag, value));
                    break;
                }
                if !rest.is_empty() && rest.chars().all(|d| d.is_ascii_digit()) {
                    parsed.values.push((flag, rest.to_string()));
                    break;
                }
                parsed.flags.push(flag);
            }
        }
        Ok(parsed)
    }

    /// Whether `name` was given, with or without a value.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name) || self.values.iter().any(|(f, _)| f == name)
    }

    /// The last value given for `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(f, _)| f == name)
            .map(|(_, v)| v.as_str())
    }

    /// The last value of `name` as a number.
    pub fn number(&self, name: &str) -> Result<Option<usize>> {
        self.value(name)
            .map(|v| v.parse().map_err(|_| self.usage_error()))
            .transpose()
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// The first `n` operands, or a usage error when fewer were given.
    pub fn require(&self, n: usize) -> Result<&[String]> {
        if self.positional.len() < n {
            return Err(self.usage_error());
        }
        Ok(&self.positional[..n])
    }

    pub fn usage_error(&self) -> ShellError {
        ShellError::Usage(self.usage.clone())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of available commands with dispatch.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_ascii_lowercase(), cmd);
    }

    /// Run a command by name. Names are case-insensitive.
    pub fn dispatch(&self, name: &str, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let name_lower = name.to_ascii_lowercase();
        match name_lower.as_str() {
            "help" => return self.execute_help(args),
            "which" => return self.execute_which(args),
            _ => {},
        }
        match self.commands.get(name_lower.as_str()) {
            Some(cmd) => {
                log::debug!("dispatch {name_lower} {args:?}");
                cmd.execute(args, env)
            },
            None => Err(ShellError::CommandNotFound(name.to_string())),
        }
    }

    /// Built-in help with access to the registry.
    fn execute_help(&self, args: &[&str]) -> Result<String> {
        if let Some(&name) = args.first() {
            let name_lower = name.to_ascii_lowercase();
            return match self.commands.get(name_lower.as_str()) {
                Some(cmd) => Ok(format!(
                    "{} ({})\n  {}\n  Usage: {}",
                    cmd.name(),
                    cmd.category(),
                    cmd.description(),
                    cmd.usage()
                )),
                None if INTERCEPTED.contains(&name_lower.as_str()) => {
                    Ok(format!("{name_lower}: shell built-in"))
                },
                None => Err(ShellError::CommandNotFound(name.to_string())),
            };
        }

        let mut categories: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
        for builtin in INTERCEPTED {
            categories.entry("general").or_default().push((builtin, ""));
        }
        for cmd in self.commands.values() {
            categories
                .entry(cmd.category())
                .or_default()
                .push((cmd.name(), cmd.description()));
        }
        let mut cats: Vec<(&str, Vec<(&str, &str)>)> = categories.into_iter().collect();
        cats.sort_by_key(|(cat, _)| *cat);

        let total: usize = cats.iter().map(|(_, v)| v.len()).sum();
        let mut out = format!("Commands ({total}):\n");
        for (cat, mut cmds) in cats {
            cmds.sort_by_key(|(name, _)| *name);
            out.push_str(&format!("\n  [{cat}]\n"));
            for (name, desc) in &cmds {
                if desc.is_empty() {
                    out.push_str(&format!("    {name}\n"));
                } else {
                    out.push_str(&format!("    {name:12} {desc}\n"));
                }
            }
        }
        out.push_str("\nType 'help <command>' for details.");
        Ok(out)
    }

    /// Built-in `which` command.
    fn execute_which(&self, args: &[&str]) -> Result<String> {
        let Some(&name) = args.first() else {
            return Err(ShellError::Usage("which <command>".to_string()));
        };
        let name = name.to_ascii_lowercase();
        if INTERCEPTED.contains(&name.as_str()) {
            return Ok(format!("{name}: shell built-in"));
        }
        match self.commands.get(name.as_str()) {
            Some(cmd) => Ok(format!(
                "{}: {} ({})",
                cmd.name(),
                cmd.description(),
                cmd.category()
            )),
            None => Err(ShellError::status("which", 1)),
        }
    }

    /// Return a sorted list of (name, description) pairs.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
