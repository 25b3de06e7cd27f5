//! Tab completion: builtin exact match, cached candidate reapplication,
//! fresh prefix lookup, and a "closest" disambiguation rule carried over
//! verbatim from the source this crate's behavior is grounded on rather than
//! replaced with a standard longest-common-prefix completion.
//!
//! Completion here only ever targets the command position (the first word
//! of a pipeline stage) — there is no filename completion.

use crate::builtins;
use crate::path::PathCache;

/// Applies the "closest" rule to a sorted candidate list `candidates` given
/// prefix `p`. See the module doc — this reproduces a quirk rather than the
/// longest-common-prefix behavior one might expect.
pub fn closest(candidates: &[String], p: &str) -> Option<&str> {
    match candidates.len() {
        0 => None,
        1 => Some(candidates[0].as_str()),
        _ => {
            let idx = candidates.iter().position(|c| c.starts_with(p))?;
            if idx == candidates.len() - 1 {
                return Some(candidates[idx].as_str());
            }
            let r = &candidates[idx];
            let unanimous = candidates[idx + 1..].iter().all(|c| c.starts_with(r.as_str()));
            if unanimous {
                Some(candidates[idx + 1].as_str())
            } else {
                None
            }
        }
    }
}

/// Result of a completion attempt against the current buffer.
pub enum Outcome {
    /// Replace the buffer with this text (already includes a trailing space
    /// where appropriate).
    Replace(String),
    /// Print these candidates on a new line, then redraw.
    ShowCandidates(Vec<String>),
    /// Nothing matched; ring the bell.
    Bell,
}

/// Runs the completion algorithm against `buf` (the whole command-position
/// word typed so far, since this shell only completes the command word).
/// `cached` is the candidate list from a previous Tab press on the same
/// buffer, if any.
pub fn complete(buf: &str, cache: &mut PathCache, cached: Option<&[String]>) -> (Outcome, Option<Vec<String>>) {
    let exact_builtins: Vec<&&str> = builtins::BUILTINS.iter().filter(|b| b.starts_with(buf)).collect();
    if exact_builtins.len() == 1 {
        return (Outcome::Replace(format!("{} ", exact_builtins[0])), None);
    }

    if let Some(list) = cached {
        return match closest(list, buf) {
            Some(word) => (Outcome::Replace(format!("{word} ")), Some(list.to_vec())),
            None => (Outcome::ShowCandidates(list.to_vec()), Some(list.to_vec())),
        };
    }

    cache.refresh();
    let candidates = cache.with_prefix(buf);
    if candidates.is_empty() {
        return (Outcome::Bell, None);
    }

    match closest(&candidates, buf) {
        Some(word) if candidates.len() == 1 => (Outcome::Replace(format!("{word} ")), None),
        Some(word) => (Outcome::Replace(format!("{word} ")), Some(candidates)),
        None => (Outcome::Bell, Some(candidates)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn closest_empty() {
        assert_eq!(closest(&v(&[]), "a"), None);
    }

    #[test]
    fn closest_single() {
        assert_eq!(closest(&v(&["alpha"]), "a"), Some("alpha"));
    }

    #[test]
    fn closest_last_element_matches() {
        // sorted list, first match is the last element -> returned directly
        let list = v(&["bravo", "charlie"]);
        assert_eq!(closest(&list, "c"), Some("charlie"));
    }

    #[test]
    fn closest_unanimous_tail_returns_next() {
        // all entries after the first match share its prefix -> return index+1
        let list = v(&["alpha", "alphabet", "alphabetize"]);
        assert_eq!(closest(&list, "alpha"), Some("alphabet"));
    }

    #[test]
    fn closest_non_unanimous_tail_fails() {
        let list = v(&["alpha", "alphabet", "beta"]);
        assert_eq!(closest(&list, "alpha"), None);
    }

    #[test]
    fn closest_no_match_fails() {
        let list = v(&["zulu"]);
        assert_eq!(closest(&list, "a"), None);
    }

    #[test]
    fn complete_unique_builtin() {
        let mut cache = PathCache::new();
        let (outcome, cached) = complete("ech", &mut cache, None);
        assert!(matches!(outcome, Outcome::Replace(ref s) if s == "echo "));
        assert!(cached.is_none());
    }
}
