//! Error types for memsh.

use std::io;

/// Errors produced by the filesystem, the diff/patch engine and the
/// interpreter.
///
/// Messages are shell-style and are shown to the user unmodified, so each
/// variant renders without a category prefix.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error("{0}: No such file or directory")]
    NoSuchPath(String),

    #[error("{0}: Is a directory")]
    IsADirectory(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Directory not empty")]
    NotEmpty(String),

    #[error("{0}: File exists")]
    AlreadyExists(String),

    #[error("{0}: Invalid path")]
    InvalidPath(String),

    #[error("unterminated {0} quote")]
    UnterminatedQuote(&'static str),

    #[error("{0}: missing operand")]
    MissingOperand(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("{command}: exited with status {code}")]
    ExitStatus { command: String, code: i32 },

    #[error("patch: only garbage was found in the patch input")]
    UnsupportedPatchFormat,

    #[error("patch: malformed patch at line {line}: {reason}")]
    MalformedPatch { line: usize, reason: String },

    #[error("patch: {0}")]
    PatchFailed(String),

    #[error("{0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ShellError {
    /// Shorthand for a failure that carries only an exit status.
    pub fn status(command: impl Into<String>, code: i32) -> Self {
        Self::ExitStatus {
            command: command.into(),
            code,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_not_found_display() {
        let e = ShellError::CommandNotFound("frob".into());
        assert_eq!(format!("{e}"), "frob: command not found");
    }

    #[test]
    fn no_such_path_display() {
        let e = ShellError::NoSuchPath("/nope".into());
        assert_eq!(format!("{e}"), "/nope: No such file or directory");
    }

    #[test]
    fn not_empty_display() {
        let e = ShellError::NotEmpty("/dir".into());
        assert_eq!(format!("{e}"), "/dir: Directory not empty");
    }

    #[test]
    fn unterminated_quote_display() {
        let e = ShellError::UnterminatedQuote("single");
        assert_eq!(format!("{e}"), "unterminated single quote");
    }

    #[test]
    fn exit_status_display() {
        let e = ShellError::status("false", 1);
        assert_eq!(format!("{e}"), "false: exited with status 1");
    }

    #[test]
    fn command_error_is_verbatim() {
        let e = ShellError::Command("cat: boom".into());
        assert_eq!(format!("{e}"), "cat: boom");
    }

    #[test]
    fn malformed_patch_display() {
        let e = ShellError::MalformedPatch {
            line: 4,
            reason: "bad hunk header".into(),
        };
        assert_eq!(format!("{e}"), "patch: malformed patch at line 4: bad hunk header");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: ShellError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: ShellError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn error_is_debug() {
        let e = ShellError::IsADirectory("/tmp".into());
        assert!(format!("{e:?}").contains("IsADirectory"));
    }
}
