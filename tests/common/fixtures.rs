//! Test data generation utilities and predefined scenarios
//!
//! Provides functions for creating repositories with specific file states
//! to test various status scenarios consistently.

#![allow(dead_code)]

use super::repository::*;
use git_rescan::core::error::Result;

/// Scenario: three committed files modified in the worktree plus two new
/// untracked files
pub fn create_multi_file_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_test_files(&repo.path, &["file1.txt", "file2.txt", "file3.txt"])?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Initial commit")?;

    modify_test_files(&repo.path, &["file1.txt", "file2.txt", "file3.txt"])?;
    create_test_files(&repo.path, &["file4.txt", "file5.txt"])?;

    Ok(repo)
}

/// Scenario: a merge stopped on a conflict in "initial.txt"
pub fn create_conflicted_repo() -> Result<TestRepo> {
    let repo = setup_test_repo_with_initial_commit()?;

    git(&repo.path, &["checkout", "-b", "other"])?;
    create_file(&repo.path, "initial.txt", "other side\n")?;
    git(&repo.path, &["commit", "-am", "Other side"])?;

    git(&repo.path, &["checkout", "-"])?;
    create_file(&repo.path, "initial.txt", "this side\n")?;
    git(&repo.path, &["commit", "-am", "This side"])?;

    git(&repo.path, &["merge", "other"])?;
    Ok(repo)
}
