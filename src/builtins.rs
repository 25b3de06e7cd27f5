//! Builtin commands. Builtins run in-process (no spawn), so the executor
//! checks `is_builtin` before falling back to the path resolver.

use std::env;
use std::io::Write;
use std::path::Path;

use crate::path;

/// A builtin's outcome: exit code plus whether the shell process should
/// terminate.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CommandStatus {
    pub exit_code: i32,
    pub terminate: bool,
}

impl CommandStatus {
    fn ok() -> Self {
        Self { exit_code: 0, terminate: false }
    }

    fn failed(code: i32) -> Self {
        Self { exit_code: code, terminate: false }
    }
}

/// Full builtin set, alphabetical, kept in sync with [`try_exec`]'s match arms.
pub const BUILTINS: &[&str] = &["cd", "echo", "exit", "history", "pwd", "type"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Runs the named builtin. Panics if `name` is not a builtin — callers must
/// check [`is_builtin`] first.
pub fn try_exec(
    name: &str,
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> CommandStatus {
    match name {
        "exit" => builtin_exit(args, stderr),
        "echo" => builtin_echo(args, stdout),
        "pwd" => builtin_pwd(stdout, stderr),
        "cd" => builtin_cd(args, stderr),
        "type" => builtin_type(args, stdout, stderr),
        "history" => CommandStatus::ok(),
        _ => unreachable!("{name} is not a builtin"),
    }
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> CommandStatus {
    let code = match args.first() {
        None => 0,
        Some(arg) => match arg.parse::<i32>() {
            Ok(n) => n,
            Err(_) => {
                let _ = writeln!(stderr, "exit requires one integer parameter");
                return CommandStatus { exit_code: 1, terminate: true };
            }
        },
    };
    CommandStatus { exit_code: code, terminate: true }
}

fn builtin_echo(args: &[String], stdout: &mut dyn Write) -> CommandStatus {
    let _ = writeln!(stdout, "{}", args.join(" "));
    CommandStatus::ok()
}

fn builtin_pwd(stdout: &mut dyn Write, stderr: &mut dyn Write) -> CommandStatus {
    match env::current_dir() {
        Ok(dir) => {
            let _ = writeln!(stdout, "{}", dir.display());
            CommandStatus::ok()
        }
        Err(e) => {
            let _ = writeln!(stderr, "pwd: {e}");
            CommandStatus::failed(1)
        }
    }
}

fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> CommandStatus {
    let target = match args.first() {
        Some(dir) if dir == "~" || dir.starts_with("~/") => {
            let home = env::var("HOME").unwrap_or_default();
            if dir == "~" {
                home
            } else {
                format!("{home}{}", &dir[1..])
            }
        }
        Some(dir) => dir.clone(),
        None => env::var("HOME").unwrap_or_default(),
    };

    if env::set_current_dir(Path::new(&target)).is_err() {
        let _ = writeln!(stderr, "cd: {target}: No such file or directory");
        CommandStatus::failed(1)
    } else {
        CommandStatus::ok()
    }
}

fn builtin_type(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> CommandStatus {
    let Some(name) = args.first() else {
        return CommandStatus::ok();
    };

    if is_builtin(name) {
        let _ = writeln!(stdout, "{name} is a shell builtin");
        CommandStatus::ok()
    } else if let Some(resolved) = path::resolve(name) {
        let _ = writeln!(stdout, "{name} is {}", resolved.display());
        CommandStatus::ok()
    } else {
        let _ = writeln!(stderr, "{name}: not found");
        CommandStatus::failed(1)
    }
}
