//! Built-in file and general commands.

use memsh_types::error::{Result, ShellError};
use memsh_vfs::EntryKind;

use crate::glob::glob_match;
use crate::interpreter::{Args, Command, CommandRegistry, Environment};

/// Register all built-in commands into a registry.
///
/// This registers the file commands defined here plus the text and
/// diff/patch command modules.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(EchoCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(LsCmd));
    reg.register(Box::new(MkdirCmd));
    reg.register(Box::new(RmCmd));
    reg.register(Box::new(TouchCmd));
    reg.register(Box::new(CpCmd));
    reg.register(Box::new(MvCmd));
    reg.register(Box::new(FindCmd));
    reg.register(Box::new(TrueCmd));
    reg.register(Box::new(FalseCmd));
    crate::register_text_commands(reg);
    crate::register_diff_commands(reg);
}

/// Last component of a `/`-separated path.
fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print text"
    }
    fn usage(&self) -> &str {
        "echo [text...]"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<String> {
        Ok(args.join(" "))
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Concatenate files or stdin"
    }
    fn usage(&self) -> &str {
        "cat [file...]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        if args.is_empty() {
            return env.read_input(None);
        }
        let mut out = String::new();
        for &path in args {
            out.push_str(&env.read_input(Some(path))?);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// pwd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        Ok(env.vfs.current_dir())
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change working directory"
    }
    fn usage(&self) -> &str {
        "cd [path]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let target = args.first().copied().unwrap_or("/");
        env.vfs.change_dir(target)?;
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;

impl LsCmd {
    fn list(env: &Environment<'_>, path: &str) -> Result<String> {
        let meta = env.vfs.stat(path)?;
        if meta.kind == EntryKind::File {
            return Ok(path.to_string());
        }
        let lines: Vec<String> = env
            .vfs
            .read_dir(path)?
            .into_iter()
            .map(|e| {
                let suffix = if e.kind == EntryKind::Directory {
                    "/"
                } else {
                    ""
                };
                format!("{}{suffix}", e.name)
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [path...]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        match args {
            [] => Self::list(env, "."),
            [path] => Self::list(env, path),
            paths => {
                // Files first as one block, then one section per directory.
                let mut files = Vec::new();
                let mut sections = Vec::new();
                for &path in paths {
                    let listing = Self::list(env, path)?;
                    if env.vfs.is_dir(path) {
                        sections.push(format!("{path}:\n{listing}"));
                    } else {
                        files.push(listing);
                    }
                }
                if !files.is_empty() {
                    sections.insert(0, files.join("\n"));
                }
                Ok(sections.join("\n\n"))
            },
        }
    }
}

// ---------------------------------------------------------------------------
// mkdir
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create directories"
    }
    fn usage(&self) -> &str {
        "mkdir [-p] <path...>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        if args.positional().is_empty() {
            return Err(ShellError::MissingOperand("mkdir".to_string()));
        }
        let parents = args.flag("-p");
        for path in args.positional() {
            if parents {
                env.vfs.mkdir_all(path)?;
            } else {
                env.vfs.mkdir(path)?;
            }
        }
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// rm
// ---------------------------------------------------------------------------

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Remove files or directories"
    }
    fn usage(&self) -> &str {
        "rm [-r] [-f] <path...>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let recursive = args.flag("-r") || args.flag("-R");
        let force = args.flag("-f");
        if args.positional().is_empty() && !force {
            return Err(ShellError::MissingOperand("rm".to_string()));
        }
        for path in args.positional() {
            if force && !env.vfs.exists(path) {
                continue;
            }
            if !recursive && env.vfs.is_dir(path) {
                return Err(ShellError::IsADirectory(path.clone()));
            }
            env.vfs.remove(path, recursive)?;
        }
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// touch
// ---------------------------------------------------------------------------

struct TouchCmd;
impl Command for TouchCmd {
    fn name(&self) -> &str {
        "touch"
    }
    fn description(&self) -> &str {
        "Create empty files or update timestamps"
    }
    fn usage(&self) -> &str {
        "touch <file...>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        if args.is_empty() {
            return Err(ShellError::MissingOperand("touch".to_string()));
        }
        for &path in args {
            env.vfs.touch(path)?;
        }
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// cp / mv
// ---------------------------------------------------------------------------

/// Split operands into sources and a destination. With more than one
/// source the destination must be an existing directory.
fn sources_and_dest<'a>(env: &Environment<'_>, args: &'a Args) -> Result<(&'a [String], &'a str)> {
    let operands = args.positional();
    let Some((dest, sources)) = operands.split_last() else {
        return Err(args.usage_error());
    };
    if sources.is_empty() {
        return Err(args.usage_error());
    }
    if sources.len() > 1 && !env.vfs.is_dir(dest) {
        return Err(ShellError::NotADirectory(dest.clone()));
    }
    Ok((sources, dest))
}

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy files"
    }
    fn usage(&self) -> &str {
        "cp [-r] <src...> <dst>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let recursive = args.flag("-r") || args.flag("-R");
        let (sources, dest) = sources_and_dest(env, &args)?;
        for src in sources {
            env.vfs.copy(src, dest, recursive)?;
        }
        Ok(String::new())
    }
}

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move or rename files"
    }
    fn usage(&self) -> &str {
        "mv <src...> <dst>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let args = Args::parse(args, self.usage(), &[])?;
        let (sources, dest) = sources_and_dest(env, &args)?;
        for src in sources {
            env.vfs.rename(src, dest)?;
        }
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

struct FindCmd;

/// Predicates accepted by `find`. Single-dash long options do not fit
/// [`Args`], so they are parsed here.
#[derive(Default)]
struct FindQuery {
    roots: Vec<String>,
    name: Option<String>,
    iname: Option<String>,
    kind: Option<EntryKind>,
}

impl FindQuery {
    fn parse(args: &[&str], usage: &str) -> Result<Self> {
        let usage_error = || ShellError::Usage(usage.to_string());
        let mut query = Self::default();
        let mut iter = args.iter();
        while let Some(&arg) = iter.next() {
            match arg {
                "-name" => query.name = Some(iter.next().ok_or_else(usage_error)?.to_string()),
                "-iname" => {
                    query.iname = Some(iter.next().ok_or_else(usage_error)?.to_ascii_lowercase());
                },
                "-type" => {
                    query.kind = match iter.next().copied() {
                        Some("f") => Some(EntryKind::File),
                        Some("d") => Some(EntryKind::Directory),
                        _ => return Err(usage_error()),
                    };
                },
                a if a.starts_with('-') && a.len() > 1 => return Err(usage_error()),
                a => query.roots.push(a.to_string()),
            }
        }
        if query.roots.is_empty() {
            query.roots.push(".".to_string());
        }
        Ok(query)
    }

    fn accepts(&self, path: &str, kind: EntryKind) -> bool {
        let name = basename(path);
        self.kind.is_none_or(|k| k == kind)
            && self.name.as_deref().is_none_or(|p| glob_match(p, name))
            && self
                .iname
                .as_deref()
                .is_none_or(|p| glob_match(p, &name.to_ascii_lowercase()))
    }
}

impl Command for FindCmd {
    fn name(&self) -> &str {
        "find"
    }
    fn description(&self) -> &str {
        "Search for files by name"
    }
    fn usage(&self) -> &str {
        "find [path...] [-name PATTERN] [-iname PATTERN] [-type f|d]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<String> {
        let query = FindQuery::parse(args, self.usage())?;
        let mut results = Vec::new();
        for root in &query.roots {
            let meta = env.vfs.stat(root)?;
            if query.accepts(root, meta.kind) {
                results.push(root.clone());
            }
            if meta.kind == EntryKind::Directory {
                let prefix = if root.ends_with('/') {
                    root.clone()
                } else {
                    format!("{root}/")
                };
                for entry in env.vfs.walk(root)? {
                    if query.accepts(&entry.path, entry.kind) {
                        results.push(format!("{prefix}{}", entry.path));
                    }
                }
            }
        }
        Ok(results.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// true / false
// ---------------------------------------------------------------------------

struct TrueCmd;
impl Command for TrueCmd {
    fn name(&self) -> &str {
        "true"
    }
    fn description(&self) -> &str {
        "Do nothing, successfully"
    }
    fn usage(&self) -> &str {
        "true"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<String> {
        Ok(String::new())
    }
}

struct FalseCmd;
impl Command for FalseCmd {
    fn name(&self) -> &str {
        "false"
    }
    fn description(&self) -> &str {
        "Do nothing, unsuccessfully"
    }
    fn usage(&self) -> &str {
        "false"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<String> {
        Err(ShellError::status("false", 1))
    }
}
