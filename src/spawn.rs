//! Safe Rust wrapper around `posix_spawnp(3)`.
//!
//! External commands are launched with `posix_spawnp` instead of
//! fork+exec, avoiding a fork of the whole address space for the common
//! case of "run this one program".
//!
//! | type | role |
//! |------|------|
//! | [`FileActions`] | RAII wrapper around `posix_spawn_file_actions_t` (fd wiring) |
//! | [`CStringVec`] | NUL-terminated pointer array for argv/envp |
//! | [`spawn`] | combines the above into one `posix_spawnp` call |

use std::ffi::CString;
use std::fmt;

// ── Error type ────────────────────────────────────────────────────

pub struct SpawnError {
    pub errno: i32,
    pub command: String,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.errno {
            libc::ENOENT => "command not found",
            libc::EACCES => "permission denied",
            _ => "spawn failed",
        };
        write!(f, "{}: {}", self.command, msg)
    }
}

impl SpawnError {
    /// 127 = command not found, 126 = permission denied, 1 = anything else.
    pub fn exit_status(&self) -> i32 {
        match self.errno {
            libc::ENOENT => 127,
            libc::EACCES => 126,
            _ => 1,
        }
    }
}

// ── FileActions ───────────────────────────────────────────────────

/// RAII wrapper around `posix_spawn_file_actions_t`. Destroyed on drop.
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    fn new() -> Self {
        unsafe {
            let mut actions: libc::posix_spawn_file_actions_t = std::mem::zeroed();
            libc::posix_spawn_file_actions_init(&mut actions);
            Self { inner: actions }
        }
    }

    fn add_dup2(&mut self, fd: i32, newfd: i32) {
        unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, newfd);
        }
    }

    fn add_close(&mut self, fd: i32) {
        unsafe {
            libc::posix_spawn_file_actions_addclose(&mut self.inner, fd);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// NUL-terminated pointer array backing argv, built from owned `CString`s.
struct CStringVec {
    _strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    fn from_args(args: &[&str]) -> Self {
        let strings: Vec<CString> = args
            .iter()
            .map(|s| CString::new(*s).unwrap_or_else(|_| CString::new("").unwrap()))
            .collect();
        let mut ptrs: Vec<*mut libc::c_char> =
            strings.iter().map(|s| s.as_ptr() as *mut libc::c_char).collect();
        ptrs.push(std::ptr::null_mut());
        Self { _strings: strings, ptrs }
    }

    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── spawn ─────────────────────────────────────────────────────────

/// Launches a child with `posix_spawnp`, returning its pid on success.
///
/// - `args`: command and arguments (`args[0]` is searched on `$PATH`)
/// - `stdin_fd`/`stdout_fd`/`stderr_fd`: fd to dup2 onto the corresponding
///   standard stream (`None` inherits the parent's)
/// - `fds_to_close`: additional fds the child must close (unused pipe ends)
pub fn spawn(
    args: &[&str],
    stdin_fd: Option<i32>,
    stdout_fd: Option<i32>,
    stderr_fd: Option<i32>,
    fds_to_close: &[i32],
) -> Result<libc::pid_t, SpawnError> {
    let argv = CStringVec::from_args(args);
    let mut actions = FileActions::new();

    if let Some(fd) = stdin_fd {
        actions.add_dup2(fd, libc::STDIN_FILENO);
        if fd != libc::STDIN_FILENO {
            actions.add_close(fd);
        }
    }
    if let Some(fd) = stdout_fd {
        actions.add_dup2(fd, libc::STDOUT_FILENO);
        if fd != libc::STDOUT_FILENO {
            actions.add_close(fd);
        }
    }
    if let Some(fd) = stderr_fd {
        actions.add_dup2(fd, libc::STDERR_FILENO);
        if fd != libc::STDERR_FILENO {
            actions.add_close(fd);
        }
    }

    for &fd in fds_to_close {
        let already_closed =
            [stdin_fd, stdout_fd, stderr_fd].iter().any(|&redir_fd| redir_fd == Some(fd));
        if !already_closed {
            actions.add_close(fd);
        }
    }

    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;

    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            argv.as_ptr().read() as *const libc::c_char,
            actions.as_ptr(),
            std::ptr::null(),
            argv.as_ptr(),
            environ as *const *mut libc::c_char,
        )
    };

    if ret != 0 {
        return Err(SpawnError { errno: ret, command: args[0].to_string() });
    }

    Ok(pid)
}
