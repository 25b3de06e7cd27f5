//! Command-path resolver: exact and prefix lookup over `$PATH`.
//!
//! Exact lookup scans `PATH` directories in order and returns the first
//! executable regular file whose basename matches. Prefix lookup (used by
//! tab completion) collects matches across every directory and is backed by
//! a cache that is rebuilt lazily whenever `PATH` has changed since the last
//! refresh.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Scans each directory in `PATH`, in order, for an executable regular file
/// named `name`. Unreadable directories are skipped silently.
pub fn resolve(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Caches the executable basenames under `$PATH`, keyed by the `PATH`
/// string it was built from. Used for prefix lookup (tab completion) —
/// exact lookup always re-scans, since a spawn should see the current
/// filesystem, not a possibly-stale cache.
///
/// A name appearing in more than one `PATH` directory is stored once per
/// directory rather than deduplicated — a known simplification carried
/// through to completion's candidate list.
pub struct PathCache {
    commands: Vec<String>,
    path_str: String,
}

impl PathCache {
    pub fn new() -> Self {
        let mut cache = Self { commands: Vec::new(), path_str: String::new() };
        cache.refresh();
        cache
    }

    /// Rebuilds the cache if `$PATH` has changed since the last refresh.
    pub fn refresh(&mut self) {
        let current = std::env::var("PATH").unwrap_or_default();
        if current == self.path_str && !self.commands.is_empty() {
            return;
        }
        self.path_str = current;
        self.commands.clear();
        for dir in self.path_str.split(':') {
            if dir.is_empty() {
                continue;
            }
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if let Ok(name) = entry.file_name().into_string() {
                        if is_executable(&entry.path()) {
                            self.commands.push(name);
                        }
                    }
                }
            }
        }
    }

    /// Every cached basename starting with `prefix`, sorted ascending.
    /// Duplicate basenames from different `PATH` directories are preserved.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut matches: Vec<String> =
            self.commands.iter().filter(|c| c.starts_with(prefix)).cloned().collect();
        matches.sort();
        matches
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt as _;

    fn make_exec(dir: &Path, name: &str) {
        let p = dir.join(name);
        fs::write(&p, "#!/bin/sh\n").unwrap();
        let mut perms = fs::metadata(&p).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&p, perms).unwrap();
    }

    #[test]
    fn resolve_finds_first_match_in_path_order() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        make_exec(dir2.path(), "mytool");
        let path = format!("{}:{}", dir1.path().display(), dir2.path().display());
        std::env::set_var("PATH", &path);
        assert_eq!(resolve("mytool"), Some(dir2.path().join("mytool")));
        assert_eq!(resolve("nope_xyz"), None);
    }

    #[test]
    fn resolve_skips_unreadable_and_nonexecutable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("not_exec"), "x").unwrap();
        std::env::set_var("PATH", dir.path());
        assert_eq!(resolve("not_exec"), None);
    }

    #[test]
    fn prefix_lookup_sorted() {
        let dir = tempfile::tempdir().unwrap();
        make_exec(dir.path(), "zeta");
        make_exec(dir.path(), "alpha");
        make_exec(dir.path(), "alphabet");
        std::env::set_var("PATH", dir.path());
        let mut cache = PathCache::new();
        cache.refresh();
        let matches = cache.with_prefix("alpha");
        assert_eq!(matches, vec!["alpha".to_string(), "alphabet".to_string()]);
    }

    #[test]
    fn prefix_lookup_preserves_duplicates_across_directories() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        make_exec(dir1.path(), "dupe");
        make_exec(dir2.path(), "dupe");
        let path = format!("{}:{}", dir1.path().display(), dir2.path().display());
        std::env::set_var("PATH", &path);
        let cache = PathCache::new();
        assert_eq!(cache.with_prefix("dupe"), vec!["dupe".to_string(), "dupe".to_string()]);
    }

    #[test]
    fn cache_refresh_is_noop_when_path_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        make_exec(dir.path(), "thing");
        std::env::set_var("PATH", dir.path());
        let mut cache = PathCache::new();
        assert!(cache.contains("thing"));
        cache.refresh();
        assert!(cache.contains("thing"));
    }
}
