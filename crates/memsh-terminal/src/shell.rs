//! A ready-to-use shell session: configuration, registry and filesystem.

use memsh_types::config::ShellConfig;
use memsh_types::error::Result;
use memsh_vfs::{MemoryVfs, Vfs};

use crate::commands::register_builtins;
use crate::executor::Executor;
use crate::interpreter::CommandRegistry;

/// Owns everything a session needs between lines.
///
/// The working directory lives in the filesystem, so `cd` in one call is
/// visible to the next.
pub struct Shell {
    registry: CommandRegistry,
    config: ShellConfig,
    vfs: MemoryVfs,
}

impl Shell {
    /// Build a session with the built-in commands, the configured
    /// directories and the configured working directory.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let mut vfs = MemoryVfs::new();
        for dir in &config.directories {
            vfs.mkdir_all(dir)?;
        }
        vfs.mkdir_all(&config.initial_cwd)?;
        vfs.change_dir(&config.initial_cwd)?;

        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        log::info!(
            "memsh session ready: {} commands, cwd {}",
            registry.list_commands().len(),
            vfs.current_dir()
        );
        Ok(Self {
            registry,
            config,
            vfs,
        })
    }

    /// Execute a line or script and return its output.
    pub fn execute(&mut self, text: &str) -> Result<String> {
        Executor::new(&self.registry, &self.config).execute(text, &mut self.vfs)
    }

    pub fn vfs(&self) -> &MemoryVfs {
        &self.vfs
    }

    pub fn vfs_mut(&mut self) -> &mut MemoryVfs {
        &mut self.vfs
    }

    /// Register additional commands.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_configured_directories() {
        let config = ShellConfig {
            initial_cwd: "/home/user".to_string(),
            directories: vec!["/tmp".to_string(), "/var/log".to_string()],
            ..ShellConfig::default()
        };
        let sh = Shell::new(config).unwrap();
        assert!(sh.vfs().is_dir("/tmp"));
        assert!(sh.vfs().is_dir("/var/log"));
        assert_eq!(sh.vfs().current_dir(), "/home/user");
    }

    #[test]
    fn state_persists_between_calls() {
        let mut sh = Shell::new(ShellConfig::default()).unwrap();
        sh.execute("mkdir /work; cd /work").unwrap();
        sh.execute("echo data > f.txt").unwrap();
        assert_eq!(sh.execute("pwd").unwrap(), "/work");
        assert_eq!(sh.execute("cat /work/f.txt").unwrap(), "data");
    }

    #[test]
    fn initial_cwd_is_normalized() {
        let config = ShellConfig {
            initial_cwd: "/tmp/../srv/./app/".to_string(),
            ..ShellConfig::default()
        };
        let sh = Shell::new(config).unwrap();
        assert_eq!(sh.vfs().current_dir(), "/srv/app");
    }

    #[test]
    fn registry_can_be_extended() {
        use crate::interpreter::{Command, Environment};

        struct Hello;
        impl Command for Hello {
            fn name(&self) -> &str {
                "hello"
            }
            fn description(&self) -> &str {
                "Greet"
            }
            fn usage(&self) -> &str {
                "hello"
            }
            fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<String> {
                Ok("hi".to_string())
            }
        }

        let mut sh = Shell::new(ShellConfig::default()).unwrap();
        sh.registry_mut().register(Box::new(Hello));
        assert_eq!(sh.execute("hello | cat").unwrap(), "hi");
        assert_eq!(sh.config().max_substitution_depth, 10);
    }
}
