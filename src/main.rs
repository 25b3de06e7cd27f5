//! mini_rush — a small interactive POSIX-flavored shell.
//!
//! REPL loop: show prompt → read a line via the raw-mode line editor →
//! parse it into a pipeline → run it → loop.

mod builtins;
mod complete;
mod editor;
mod executor;
mod history;
mod lexer;
mod parser;
mod path;
mod shell;
mod spawn;

use editor::LineEditor;
use shell::Shell;

fn main() {
    let mut shell = Shell::new();
    let mut editor = LineEditor::new();

    loop {
        let line = match editor.read_line("$ ") {
            Some(line) => line,
            None => {
                println!();
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        editor.add_history(&line);

        let pipeline = match parser::parse(&line) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                shell.last_status = 1;
                continue;
            }
        };

        let status = executor::execute(&pipeline);
        shell.last_status = status.exit_code;
        if status.terminate {
            shell.should_exit = true;
        }

        if shell.should_exit {
            break;
        }
    }

    std::process::exit(shell.last_status);
}
