//! Pipeline executor: wires stages together with pipes, opens the
//! pipeline's redirection targets, and runs every stage concurrently.
//!
//! A stage is either a builtin (run on a spawned thread, since it must
//! coexist with external processes already competing for the same pipe
//! fds) or an external command (run via [`spawn::spawn`]). Every pipe
//! write end is closed exactly once — by the parent right after handing
//! it to an external child, or implicitly when a builtin's [`File`] wrapper
//! drops — so downstream readers see EOF exactly when the writer is done.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::FromRawFd;
use std::thread;

use crate::builtins::{self, CommandStatus};
use crate::parser::{Pipeline, RedirectMode};
use crate::path;

enum StageHandle {
    External(libc::pid_t),
    Builtin(thread::JoinHandle<CommandStatus>),
}

/// Opens a redirection target with the given mode, creating it if absent
/// (`0o644`).
fn open_redirect(target: &str, mode: RedirectMode) -> io::Result<i32> {
    let path = std::ffi::CString::new(target.as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "nul byte in path"))?;
    let flags = libc::O_WRONLY
        | libc::O_CREAT
        | match mode {
            RedirectMode::Truncate => libc::O_TRUNC,
            RedirectMode::Append => libc::O_APPEND,
        };
    let fd = unsafe { libc::open(path.as_ptr(), flags, 0o644) };
    if fd < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

/// Runs every stage of `pipeline` to completion and returns the status of
/// its last stage — earlier stages' exit codes are observed only to avoid
/// leaving zombies, matching a standard shell's `$?` semantics for a pipe.
pub fn execute(pipeline: &Pipeline) -> CommandStatus {
    let stages = &pipeline.stages;
    if stages.is_empty() {
        return CommandStatus { exit_code: 0, terminate: false };
    }

    for stage in stages {
        if !builtins::is_builtin(&stage.name) && path::resolve(&stage.name).is_none() {
            eprintln!("{}: command not found", stage.name);
            return CommandStatus { exit_code: 1, terminate: false };
        }
    }

    let stdout_target = match &pipeline.redirection.stdout {
        Some((path, mode)) => match open_redirect(path, *mode) {
            Ok(fd) => Some(fd),
            Err(e) => {
                eprintln!("{path}: {e}");
                return CommandStatus { exit_code: 1, terminate: false };
            }
        },
        None => None,
    };
    let stderr_target = match &pipeline.redirection.stderr {
        Some((path, mode)) => match open_redirect(path, *mode) {
            Ok(fd) => Some(fd),
            Err(e) => {
                eprintln!("{path}: {e}");
                if let Some(fd) = stdout_target {
                    unsafe { libc::close(fd) };
                }
                return CommandStatus { exit_code: 1, terminate: false };
            }
        },
        None => None,
    };

    let mut pipes: Vec<(i32, i32)> = Vec::with_capacity(stages.len().saturating_sub(1));
    for _ in 0..stages.len().saturating_sub(1) {
        let mut fds = [0i32; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            eprintln!("pipe: {}", io::Error::last_os_error());
            return CommandStatus { exit_code: 1, terminate: false };
        }
        pipes.push((fds[0], fds[1]));
    }
    let all_pipe_fds: Vec<i32> = pipes.iter().flat_map(|&(r, w)| [r, w]).collect();

    let mut handles = Vec::with_capacity(stages.len());
    let mut prev_read: Option<i32> = None;

    for (i, stage) in stages.iter().enumerate() {
        let is_last = i == stages.len() - 1;
        let stdin_fd = prev_read.take();
        let stdout_fd = if is_last { stdout_target } else { Some(pipes[i].1) };
        let stderr_fd = if is_last { stderr_target } else { None };

        let mut argv: Vec<&str> = Vec::with_capacity(1 + stage.args.len());
        argv.push(stage.name.as_str());
        argv.extend(stage.args.iter().map(|s| s.as_str()));

        if builtins::is_builtin(&stage.name) {
            if let Some(fd) = stdin_fd {
                unsafe { libc::close(fd) };
            }
            let name = stage.name.clone();
            let args = stage.args.clone();
            let handle = thread::spawn(move || {
                let mut out: Box<dyn Write> = match stdout_fd {
                    Some(fd) => Box::new(unsafe { File::from_raw_fd(fd) }),
                    None => Box::new(io::stdout()),
                };
                let mut err: Box<dyn Write> = match stderr_fd {
                    Some(fd) => Box::new(unsafe { File::from_raw_fd(fd) }),
                    None => Box::new(io::stderr()),
                };
                builtins::try_exec(&name, &args, &mut out, &mut err)
            });
            handles.push(StageHandle::Builtin(handle));
        } else {
            let fds_to_close: Vec<i32> = all_pipe_fds
                .iter()
                .copied()
                .filter(|fd| Some(*fd) != stdin_fd && Some(*fd) != stdout_fd && Some(*fd) != stderr_fd)
                .collect();

            match crate::spawn::spawn(&argv, stdin_fd, stdout_fd, stderr_fd, &fds_to_close) {
                Ok(pid) => handles.push(StageHandle::External(pid)),
                Err(e) => {
                    eprintln!("{e}");
                    if let Some(fd) = stdin_fd {
                        unsafe { libc::close(fd) };
                    }
                    if let Some(fd) = stdout_fd {
                        unsafe { libc::close(fd) };
                    }
                    continue;
                }
            }

            if let Some(fd) = stdin_fd {
                unsafe { libc::close(fd) };
            }
            if !is_last {
                unsafe { libc::close(pipes[i].1) };
            } else if let Some(fd) = stdout_fd {
                unsafe { libc::close(fd) };
            }
        }

        if !is_last {
            prev_read = Some(pipes[i].0);
        }
    }

    let mut last_status = CommandStatus { exit_code: 0, terminate: false };
    for handle in handles {
        last_status = match handle {
            StageHandle::Builtin(h) => h.join().unwrap_or(CommandStatus { exit_code: 1, terminate: false }),
            StageHandle::External(pid) => {
                let mut wstatus: i32 = 0;
                unsafe { libc::waitpid(pid, &mut wstatus, 0) };
                let code = if libc::WIFEXITED(wstatus) {
                    libc::WEXITSTATUS(wstatus)
                } else {
                    128 + libc::WTERMSIG(wstatus)
                };
                CommandStatus { exit_code: code, terminate: false }
            }
        };
    }

    last_status
}
