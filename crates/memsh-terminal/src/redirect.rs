//! Extraction of I/O redirections from a tokenized command.

use memsh_types::error::{Result, ShellError};

use crate::lexer::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `>`
    Out,
    /// `>>`
    Append,
    /// `<`
    In,
    /// `<<` or `<<-`; the body comes from the heredoc queue.
    Heredoc { strip_tabs: bool },
    /// `2>`
    Err,
    /// `2>>`
    ErrAppend,
    /// `&>`
    Both,
    /// `2>&1`
    ErrToOut,
}

impl RedirectOp {
    fn from_word(word: &Word) -> Option<Self> {
        if word.quoted {
            return None;
        }
        Some(match word.text.as_str() {
            ">" => Self::Out,
            ">>" => Self::Append,
            "<" => Self::In,
            "<<" => Self::Heredoc { strip_tabs: false },
            "<<-" => Self::Heredoc { strip_tabs: true },
            "2>" => Self::Err,
            "2>>" => Self::ErrAppend,
            "&>" => Self::Both,
            "2>&1" => Self::ErrToOut,
            _ => return None,
        })
    }

    fn takes_target(self) -> bool {
        self != Self::ErrToOut
    }

    /// Whether this redirection captures the command's stderr.
    pub fn captures_stderr(self) -> bool {
        matches!(self, Self::Err | Self::ErrAppend | Self::Both | Self::ErrToOut)
    }
}

/// A single redirection with its target (empty for `2>&1`, the heredoc
/// delimiter for `<<`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub op: RedirectOp,
    pub target: String,
}

/// A command with its redirections split off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub words: Vec<Word>,
    pub redirections: Vec<Redirection>,
}

impl ParsedCommand {
    /// Last redirection whose operator matches `pred`.
    pub fn last(&self, pred: impl Fn(RedirectOp) -> bool) -> Option<&Redirection> {
        self.redirections.iter().rev().find(|r| pred(r.op))
    }

    pub fn captures_stderr(&self) -> bool {
        self.redirections.iter().any(|r| r.op.captures_stderr())
    }
}

/// Pull redirection operators and their targets out of `words`.
pub fn parse_redirections(words: Vec<Word>) -> Result<ParsedCommand> {
    let mut parsed = ParsedCommand::default();
    let mut iter = words.into_iter();

    while let Some(word) = iter.next() {
        let Some(op) = RedirectOp::from_word(&word) else {
            parsed.words.push(word);
            continue;
        };
        let target = if op.takes_target() {
            match iter.next() {
                Some(t) if RedirectOp::from_word(&t).is_none() => t.text,
                _ => return Err(ShellError::MissingOperand(word.text)),
            }
        } else {
            String::new()
        };
        parsed.redirections.push(Redirection { op, target });
    }
    Ok(parsed)
}
