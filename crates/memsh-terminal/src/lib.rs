//! Command interpreter for memsh.
//!
//! The terminal is a registry-based dispatch system. Commands implement the
//! `Command` trait and are registered by name. The executor takes raw text
//! through loops, command substitution, pipelines and redirections, and
//! dispatches each command against the virtual filesystem.

mod commands;
pub mod control;
pub mod diff_commands;
mod executor;
pub mod glob;
pub mod heredoc;
mod interpreter;
pub mod lexer;
pub mod pipeline;
pub mod redirect;
mod shell;
pub mod substitution;
pub mod text_commands;

/// Register all built-in commands (file, text, diff) into a registry.
pub use commands::register_builtins;
/// Register `diff` and `patch` into a registry.
pub use diff_commands::register_diff_commands;
/// Executes command text against a registry and a filesystem.
pub use executor::{DEV_NULL, Executor, needs_more_input};
/// Flag parser whose errors carry the command's usage string.
pub use interpreter::Args;
/// A single executable command trait.
pub use interpreter::Command;
/// Registry of available commands with dispatch.
pub use interpreter::CommandRegistry;
/// Shared mutable environment passed to every command.
pub use interpreter::Environment;
pub use lexer::{Word, tokenize};
pub use pipeline::{PipeOp, PipelineSegment, parse_pipeline};
/// A configured session owning its registry and filesystem.
pub use shell::Shell;
/// Register text processing commands (head, grep, sort, ...) into a registry.
pub use text_commands::register_text_commands;
