//! Command-line options and configuration lookup.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use memsh_types::config::ShellConfig;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "MEMSH_CONFIG";

pub const USAGE: &str = "\
usage: memsh [options] [script]

Runs SCRIPT, the -c line, or commands read from stdin against an in-memory
filesystem.

options:
  -c LINE             run LINE and exit
  --config PATH       load settings from a TOML file (default: $MEMSH_CONFIG)
  --import HOST:VFS   copy a host file or directory into the filesystem first
  --export VFS:HOST   copy a filesystem path back to the host when done
  -h, --help          show this help";

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub command: Option<String>,
    pub script: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// `(host, vfs)` pairs.
    pub imports: Vec<(PathBuf, String)>,
    /// `(vfs, host)` pairs.
    pub exports: Vec<(String, PathBuf)>,
    pub help: bool,
}

impl Options {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut opts = Self::default();
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| match iter.next() {
                Some(v) => Ok(v),
                None => bail!("{flag} needs a value"),
            };
            match arg.as_str() {
                "-c" => opts.command = Some(value("-c")?),
                "--config" => opts.config = Some(PathBuf::from(value("--config")?)),
                "--import" => {
                    let spec = value("--import")?;
                    // The VFS side is absolute and has no colon, so split on the last one.
                    let Some((host, vfs)) = spec.rsplit_once(':') else {
                        bail!("--import expects HOST:VFS, got `{spec}`");
                    };
                    opts.imports.push((PathBuf::from(host), vfs.to_string()));
                },
                "--export" => {
                    let spec = value("--export")?;
                    let Some((vfs, host)) = spec.split_once(':') else {
                        bail!("--export expects VFS:HOST, got `{spec}`");
                    };
                    opts.exports.push((vfs.to_string(), PathBuf::from(host)));
                },
                "-h" | "--help" => opts.help = true,
                flag if flag.starts_with('-') && flag.len() > 1 => bail!("unknown option `{flag}`"),
                _ if opts.script.is_none() => opts.script = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument `{arg}`"),
            }
        }
        if opts.command.is_some() && opts.script.is_some() {
            bail!("-c and a script file are mutually exclusive");
        }
        Ok(opts)
    }
}

/// Load the configuration from `path`, else from `$MEMSH_CONFIG`, else
/// fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<ShellConfig> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => {
            let config = ShellConfig::load(&path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        },
        None => Ok(ShellConfig::default()),
    }
}
