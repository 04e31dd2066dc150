//! Common assertion helpers for test output validation
//!
//! Provides predicates for validating git-rescan command output and error
//! messages.

#![allow(dead_code)]

use predicates::prelude::*;

/// Creates a predicate that checks for git repository error messages
pub fn not_in_git_repo() -> impl Predicate<str> {
    predicates::str::contains("Not in a git repository")
        .or(predicates::str::contains("NotInGitRepo"))
}

/// Creates a predicate that checks for a section header
pub fn has_section(header: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("{header}:"))
}

/// Creates a predicate that checks for a status description
pub fn has_status(description: &str) -> impl Predicate<str> {
    predicates::str::contains(description.to_string())
}
