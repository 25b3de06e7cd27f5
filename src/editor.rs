//! Line editor: raw-mode terminal loop, buffer editing, redraw.
//!
//! No external crate — only `libc` (`termios`, `read(2)`, `write(2)`,
//! `poll(2)`). Raw mode is scoped to [`LineEditor::read_line`] via the
//! [`RawMode`] RAII guard, so a spawned child inherits a normal cooked-mode
//! terminal.
//!
//! Redraw is a single `write(2)` per refresh: carriage return to column 0
//! (`CSI 0G`), the prompt and buffer, then erase-to-end-of-line (`CSI 2K`
//! erases the whole line, so it is emitted before the redraw contents) is
//! avoided in favor of issuing the erase first and redrawing after, which
//! keeps the cursor math simple and matches what a single-writer redraw
//! needs.

use crate::complete;
use crate::history::History;
use crate::path::PathCache;

// ── RawMode guard ─────────────────────────────────────────────────────

/// RAII guard: saves the terminal's `termios` state on construction and
/// restores it on drop.
///
/// | flag | change | why |
/// |------|--------|-----|
/// | `c_iflag` | `BRKINT\|ICRNL\|INPCK\|ISTRIP\|IXON` off | no CR→LF translation, no flow control |
/// | `c_cflag` | `CS8` on | 8-bit clean input |
/// | `c_lflag` | `ECHO\|ICANON\|IEXTEN\|ISIG` off | no echo, byte-at-a-time reads, Ctrl-C/Z arrive as bytes |
/// | `VMIN`/`VTIME` | `1`/`0` | block for at least one byte |
struct RawMode {
    orig: libc::termios,
    fd: i32,
}

impl RawMode {
    fn enable(fd: i32) -> Self {
        let mut orig: libc::termios = unsafe { std::mem::zeroed() };
        unsafe {
            libc::tcgetattr(fd, &mut orig);
        }
        let mut raw = orig;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        unsafe {
            libc::tcsetattr(fd, libc::TCSAFLUSH, &raw);
        }
        Self { orig, fd }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.orig);
        }
    }
}

// ── Key input ─────────────────────────────────────────────────────────

pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Tab,
    CtrlA,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlK,
    CtrlL,
    CtrlU,
    CtrlW,
    Unknown,
}

fn read_byte(fd: i32) -> Option<u8> {
    let mut buf = [0u8; 1];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, 1) };
    if n == 1 {
        Some(buf[0])
    } else {
        None
    }
}

/// Parses an escape sequence following `ESC`. Polls for 50ms; a timeout
/// means `ESC` was pressed alone.
fn read_escape_seq(fd: i32) -> Key {
    let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
    let ready = unsafe { libc::poll(&mut pfd, 1, 50) };
    if ready <= 0 {
        return Key::Unknown;
    }

    match read_byte(fd) {
        Some(b'[') => {}
        _ => return Key::Unknown,
    }

    match read_byte(fd) {
        Some(b'A') => Key::Up,
        Some(b'B') => Key::Down,
        Some(b'C') => Key::Right,
        Some(b'D') => Key::Left,
        Some(b'H') => Key::Home,
        Some(b'F') => Key::End,
        Some(b'1') => if read_byte(fd) == Some(b'~') { Key::Home } else { Key::Unknown },
        Some(b'3') => if read_byte(fd) == Some(b'~') { Key::Delete } else { Key::Unknown },
        Some(b'4') => if read_byte(fd) == Some(b'~') { Key::End } else { Key::Unknown },
        _ => Key::Unknown,
    }
}

fn read_utf8(fd: i32, first: u8, expected_len: usize) -> Key {
    let mut buf = [0u8; 4];
    buf[0] = first;
    for slot in buf.iter_mut().take(expected_len).skip(1) {
        match read_byte(fd) {
            Some(b) => *slot = b,
            None => return Key::Unknown,
        }
    }
    match std::str::from_utf8(&buf[..expected_len]) {
        Ok(s) => s.chars().next().map_or(Key::Unknown, Key::Char),
        Err(_) => Key::Unknown,
    }
}

fn read_key(fd: i32) -> Key {
    let byte = match read_byte(fd) {
        Some(b) => b,
        None => return Key::Unknown,
    };

    match byte {
        b'\r' | b'\n' => Key::Enter,
        0x7f | 0x08 => Key::Backspace,
        0x1b => read_escape_seq(fd),
        0x09 => Key::Tab,
        1 => Key::CtrlA,
        3 => Key::CtrlC,
        4 => Key::CtrlD,
        5 => Key::CtrlE,
        11 => Key::CtrlK,
        12 => Key::CtrlL,
        21 => Key::CtrlU,
        23 => Key::CtrlW,
        b if (32..127).contains(&b) => Key::Char(b as char),
        b if b & 0xE0 == 0xC0 => read_utf8(fd, b, 2),
        b if b & 0xF0 == 0xE0 => read_utf8(fd, b, 3),
        b if b & 0xF8 == 0xF0 => read_utf8(fd, b, 4),
        _ => Key::Unknown,
    }
}

// ── LineEditor ──────────────────────────────────────────────────────

/// Cooperative raw-mode key loop producing one completed input line per
/// call to [`LineEditor::read_line`].
pub struct LineEditor {
    buf: String,
    cursor: usize,
    history: History,
    fd: i32,
    path_cache: PathCache,
    /// Candidate list from the previous Tab press on the same word, if any.
    tab_cache: Option<Vec<String>>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            cursor: 0,
            history: History::new(),
            fd: libc::STDIN_FILENO,
            path_cache: PathCache::new(),
            tab_cache: None,
        }
    }

    pub fn add_history(&mut self, line: &str) {
        self.history.append(line);
    }

    /// Reads one line. `Enter` returns it; `Ctrl-D` on an empty buffer
    /// returns `None` (EOF); `Ctrl-C` clears the buffer and returns an empty
    /// string's worth of input by restarting the prompt.
    pub fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.buf.clear();
        self.cursor = 0;
        self.tab_cache = None;
        self.path_cache.refresh();

        let _raw = RawMode::enable(self.fd);
        self.refresh_line(prompt);

        loop {
            let key = read_key(self.fd);
            if !matches!(key, Key::Tab) {
                self.tab_cache = None;
            }
            match key {
                Key::Enter => {
                    write_all("\n");
                    return Some(self.buf.clone());
                }
                Key::CtrlD => {
                    if self.buf.is_empty() {
                        return None;
                    }
                }
                Key::CtrlC => {
                    write_all("^C\n");
                    return Some(String::new());
                }
                Key::Char(ch) => self.insert_char(ch),
                Key::Backspace => self.delete_char_before(),
                Key::Delete => self.delete_char_at(),
                Key::Left => self.move_left(),
                Key::Right => self.move_right(),
                Key::Home | Key::CtrlA => self.move_home(),
                Key::End | Key::CtrlE => self.move_end(),
                Key::Up => self.history_prev(),
                Key::Down => self.history_next(),
                Key::Tab => {
                    self.do_complete(prompt);
                    continue;
                }
                Key::CtrlK => self.kill_to_end(),
                Key::CtrlU => self.kill_to_start(),
                Key::CtrlW => self.kill_word_back(),
                Key::CtrlL => {
                    self.clear_screen(prompt);
                    continue;
                }
                Key::Unknown => continue,
            }
            self.refresh_line(prompt);
        }
    }

    // ── Buffer operations ──────────────────────────────────────────

    fn insert_char(&mut self, ch: char) {
        self.buf.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn delete_char_before(&mut self) {
        if self.cursor > 0 {
            let prev = self.buf[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.buf.remove(prev);
            self.cursor = prev;
        }
    }

    fn delete_char_at(&mut self) {
        if self.cursor < self.buf.len() {
            self.buf.remove(self.cursor);
        }
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.buf[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.buf.len() {
            let ch = self.buf[self.cursor..].chars().next().unwrap();
            self.cursor += ch.len_utf8();
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.buf.len();
    }

    fn kill_to_end(&mut self) {
        self.buf.truncate(self.cursor);
    }

    fn kill_to_start(&mut self) {
        self.buf.drain(..self.cursor);
        self.cursor = 0;
    }

    fn kill_word_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let before = &self.buf[..self.cursor];
        let chars: Vec<(usize, char)> = before.char_indices().collect();
        let mut idx = chars.len();

        while idx > 0 && chars[idx - 1].1 == ' ' {
            idx -= 1;
        }
        while idx > 0 && chars[idx - 1].1 != ' ' {
            idx -= 1;
        }

        let byte_pos = if idx == 0 { 0 } else { chars[idx].0 };
        self.buf.drain(byte_pos..self.cursor);
        self.cursor = byte_pos;
    }

    fn clear_screen(&mut self, prompt: &str) {
        write_all("\x1b[2J\x1b[H");
        self.refresh_line(prompt);
    }

    // ── History navigation ─────────────────────────────────────────

    fn history_prev(&mut self) {
        if let Some(entry) = self.history.prev().map(|s| s.to_string()) {
            self.buf = entry;
            self.cursor = self.buf.len();
        }
    }

    fn history_next(&mut self) {
        if let Some(entry) = self.history.next().map(|s| s.to_string()) {
            self.buf = entry;
            self.cursor = self.buf.len();
        }
    }

    // ── Tab completion ─────────────────────────────────────────────

    /// Completes the word at the cursor against builtins and `$PATH`. Only
    /// completes a command-position word — this shell has no filename
    /// completion.
    fn do_complete(&mut self, prompt: &str) {
        let (outcome, cached) =
            complete::complete(&self.buf[..self.cursor], &mut self.path_cache, self.tab_cache.as_deref());
        self.tab_cache = cached;

        match outcome {
            complete::Outcome::Bell => write_all("\x07"),
            complete::Outcome::Replace(word) => {
                self.buf.replace_range(..self.cursor, &word);
                self.cursor = word.len();
                self.refresh_line(prompt);
            }
            complete::Outcome::ShowCandidates(candidates) => {
                let mut display = String::from("\n");
                display.push_str(&candidates.join("  "));
                display.push('\n');
                write_all(&display);
                self.refresh_line(prompt);
            }
        }
    }

    // ── Redraw ──────────────────────────────────────────────────────

    /// Redraws the current line in one `write(2)`: `CSI 2K` erases the
    /// whole line, `CSI 0G` returns to column 0, then the prompt and buffer
    /// are written, followed by a cursor-back sequence for any text past
    /// the cursor.
    fn refresh_line(&self, prompt: &str) {
        let buf_chars = self.buf.chars().count();
        let cursor_chars = self.buf[..self.cursor].chars().count();
        let move_back = buf_chars - cursor_chars;

        let mut out = String::new();
        out.push_str("\x1b[2K");
        out.push_str("\x1b[0G");
        out.push_str(prompt);
        out.push_str(&self.buf);
        if move_back > 0 {
            out.push_str(&format!("\x1b[{}D", move_back));
        }

        write_all(&out);
    }
}

/// Writes directly via `libc::write`, bypassing Rust's stdout buffering.
fn write_all(s: &str) {
    let bytes = s.as_bytes();
    let mut written = 0;
    while written < bytes.len() {
        let n = unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
            )
        };
        if n <= 0 {
            break;
        }
        written += n as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_editor() -> LineEditor {
        LineEditor {
            buf: String::new(),
            cursor: 0,
            history: History::new(),
            fd: libc::STDIN_FILENO,
            path_cache: PathCache::new(),
            tab_cache: None,
        }
    }

    #[test]
    fn insert_char_at_end() {
        let mut ed = test_editor();
        ed.insert_char('a');
        ed.insert_char('b');
        ed.insert_char('c');
        assert_eq!(ed.buf, "abc");
        assert_eq!(ed.cursor, 3);
    }

    #[test]
    fn insert_char_at_middle() {
        let mut ed = test_editor();
        ed.buf = "ac".to_string();
        ed.cursor = 1;
        ed.insert_char('b');
        assert_eq!(ed.buf, "abc");
        assert_eq!(ed.cursor, 2);
    }

    #[test]
    fn delete_char_before() {
        let mut ed = test_editor();
        ed.buf = "abc".to_string();
        ed.cursor = 3;
        ed.delete_char_before();
        assert_eq!(ed.buf, "ab");
        assert_eq!(ed.cursor, 2);
    }

    #[test]
    fn delete_char_at_cursor() {
        let mut ed = test_editor();
        ed.buf = "abc".to_string();
        ed.cursor = 1;
        ed.delete_char_at();
        assert_eq!(ed.buf, "ac");
        assert_eq!(ed.cursor, 1);
    }

    #[test]
    fn move_left_right() {
        let mut ed = test_editor();
        ed.buf = "abc".to_string();
        ed.cursor = 3;
        ed.move_left();
        assert_eq!(ed.cursor, 2);
        ed.move_right();
        assert_eq!(ed.cursor, 3);
    }

    #[test]
    fn kill_word_back() {
        let mut ed = test_editor();
        ed.buf = "echo hello world".to_string();
        ed.cursor = 16;
        ed.kill_word_back();
        assert_eq!(ed.buf, "echo hello ");
        assert_eq!(ed.cursor, 11);
    }

    #[test]
    fn utf8_insert_and_move() {
        let mut ed = test_editor();
        ed.insert_char('あ');
        ed.insert_char('い');
        assert_eq!(ed.buf, "あい");
        assert_eq!(ed.cursor, 6);
        ed.move_left();
        assert_eq!(ed.cursor, 3);
    }

    #[test]
    fn do_complete_replaces_command_word() {
        let mut ed = test_editor();
        ed.buf = "ech".to_string();
        ed.cursor = 3;
        ed.do_complete("$ ");
        assert_eq!(ed.buf, "echo ");
        assert_eq!(ed.cursor, 5);
    }
}
