//! Line-oriented diff and patch engine.
//!
//! [`diff`] computes an LCS edit script and renders it in normal, unified
//! or context format. [`patch`] parses unified and normal diffs back into
//! hunks and applies (or reverses) them against text.

pub mod diff;
pub mod patch;

pub use diff::{
    ChangeBlock, DiffEdit, DiffOptions, change_blocks, context_diff, diff_lines, differs,
    normal_diff, split_lines, unified_diff,
};
pub use patch::{
    AppliedPatch, FilePatch, HunkLine, NormalOp, PatchHunk, apply_hunks, parse_patch, strip_path,
};
