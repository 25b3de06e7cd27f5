//! Command history: an append-only log with a cursor, persisted to
//! `~/.mini_rush_history` (one command per line).
//!
//! The cursor arithmetic is intentionally asymmetric: `prev()` decrements by
//! one, but `next()` advances by *two* to compensate for the `prev()` call
//! that must have preceded it to reach any position other than the last.
//! This gives the conventional up/down-arrow feel in the line editor without
//! the editor needing to track "are we mid-navigation" state itself.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

pub struct History {
    entries: Vec<String>,
    max_size: usize,
    cursor: usize,
    path: PathBuf,
}

impl History {
    /// Loads existing entries from `~/.mini_rush_history` (or `/tmp` if
    /// `$HOME` is unset).
    pub fn new() -> Self {
        let path = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join(".mini_rush_history");
        let mut h = Self { entries: Vec::new(), max_size: 1000, cursor: 0, path };
        h.load();
        h
    }

    fn load(&mut self) {
        if let Ok(file) = fs::File::open(&self.path) {
            let reader = BufReader::new(file);
            for line in reader.lines().flatten() {
                if !line.is_empty() {
                    self.entries.push(line);
                }
            }
            if self.entries.len() > self.max_size {
                let start = self.entries.len() - self.max_size;
                self.entries = self.entries[start..].to_vec();
            }
        }
        self.cursor = self.entries.len().saturating_sub(1);
    }

    /// Trims `line`, appends it, and moves the cursor to the last entry.
    /// Does nothing for an empty line.
    pub fn append(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.entries.push(line.to_string());
        if self.entries.len() > self.max_size {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", line);
        }
    }

    /// Returns the entry at the cursor, then moves the cursor back one
    /// (saturating at 0).
    pub fn prev(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = &self.entries[self.cursor];
        self.cursor = self.cursor.saturating_sub(1);
        Some(entry)
    }

    /// Moves the cursor forward two (saturating at the last index) and
    /// returns the entry there.
    pub fn next(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.cursor = (self.cursor + 2).min(last);
        Some(&self.entries[self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_history(entries: &[&str]) -> History {
        History {
            entries: entries.iter().map(|s| s.to_string()).collect(),
            max_size: 1000,
            cursor: entries.len().saturating_sub(1),
            path: PathBuf::from("/dev/null"),
        }
    }

    #[test]
    fn append_then_prev_returns_it() {
        let mut h = make_history(&[]);
        h.append("echo hi");
        assert_eq!(h.prev(), Some("echo hi"));
    }

    #[test]
    fn append_prev_next_cursor_at_last_entry() {
        let mut h = make_history(&["first", "second"]);
        h.append("third");
        h.prev();
        h.next();
        assert_eq!(h.entries[h.cursor], "third");
    }

    #[test]
    fn prev_saturates_at_zero() {
        let mut h = make_history(&["a", "b"]);
        assert_eq!(h.prev(), Some("b"));
        assert_eq!(h.prev(), Some("a"));
        assert_eq!(h.prev(), Some("a"));
    }

    #[test]
    fn next_advances_by_two_saturating_at_end() {
        let mut h = make_history(&["a", "b", "c", "d"]);
        h.prev(); // cursor -> 2 ("c" returned, cursor now 2)
        h.prev(); // "c" then cursor -> 1... wait see below
        // cursor starts at 3 (len-1). prev() returns entries[3]="d", cursor->2.
        // prev() returns entries[2]="c", cursor->1.
        assert_eq!(h.next(), Some("d")); // cursor 1 + 2 = 3, clamp to 3 -> "d"
    }

    #[test]
    fn next_on_empty_history_is_none() {
        let mut h = make_history(&[]);
        assert_eq!(h.next(), None);
        assert_eq!(h.prev(), None);
    }

    #[test]
    fn append_skips_empty_lines() {
        let mut h = make_history(&[]);
        h.append("");
        h.append("   ");
        assert!(h.entries.is_empty());
    }

    #[test]
    fn append_trims_whitespace() {
        let mut h = make_history(&[]);
        h.append("  echo hi  ");
        assert_eq!(h.entries[0], "echo hi");
    }
}
