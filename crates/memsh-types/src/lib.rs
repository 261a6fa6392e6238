//! Foundation types for memsh.
//!
//! Shared by every memsh crate: the error taxonomy surfaced by the VFS,
//! the diff/patch engine and the interpreter, plus the shell configuration.

pub mod config;
pub mod error;
