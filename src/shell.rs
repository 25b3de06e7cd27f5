//! Holds the shell's cross-command state: the last exit status and
//! whether the REPL loop should end.
//!
//! Command history and the `$PATH` cache live on [`crate::editor::LineEditor`]
//! instead, since only the line editor ever touches them.

/// Shared state threaded through the REPL loop by `&mut` reference.
pub struct Shell {
    /// Exit status of the last pipeline run. Becomes the process's exit
    /// code when the REPL loop ends. The prompt is always `"$ "` and does
    /// not vary with this value.
    pub last_status: i32,
    /// Set by the `exit` builtin to end the REPL loop.
    pub should_exit: bool,
}

impl Shell {
    pub fn new() -> Self {
        Self { last_status: 0, should_exit: false }
    }
}
