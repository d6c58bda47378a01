//! Eligibility rules shared by the counting and mirroring passes.

use crate::types::RemoteEntry;

/// Directory name that is counted and created locally but never populated.
pub const CACHE_DIR_NAME: &str = "__pycache__";

/// Entries whose final segment starts with this marker are skipped entirely.
const HIDDEN_PREFIX: char = '.';

/// Returns `true` if the entry is counted and mirrored.
pub(crate) fn is_eligible(entry: &RemoteEntry) -> bool {
    !final_segment(&entry.name).starts_with(HIDDEN_PREFIX)
}

/// Returns `true` if an eligible entry should be descended into.
pub(crate) fn should_descend(entry: &RemoteEntry) -> bool {
    entry.is_dir && final_segment(&entry.name) != CACHE_DIR_NAME
}

// Listings normally return bare names, but some servers hand back full paths.
fn final_segment(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_entries_are_not_eligible() {
        assert!(!is_eligible(&RemoteEntry::file(".bashrc", 10)));
        assert!(!is_eligible(&RemoteEntry::dir(".cache")));
        assert!(!is_eligible(&RemoteEntry::file("/home/pi/.hidden", 1)));
        assert!(is_eligible(&RemoteEntry::file("notes.txt", 1)));
        assert!(is_eligible(&RemoteEntry::file("a.b.c", 1)));
    }

    #[test]
    fn test_cache_dir_is_eligible_but_not_descended() {
        let cache = RemoteEntry::dir(CACHE_DIR_NAME);
        assert!(is_eligible(&cache));
        assert!(!should_descend(&cache));
    }

    #[test]
    fn test_cache_named_file_is_a_plain_file() {
        let file = RemoteEntry::file(CACHE_DIR_NAME, 4);
        assert!(is_eligible(&file));
        assert!(!should_descend(&file));
    }

    #[test]
    fn test_regular_dirs_are_descended() {
        assert!(should_descend(&RemoteEntry::dir("src")));
        assert!(!should_descend(&RemoteEntry::file("src", 0)));
    }
}
