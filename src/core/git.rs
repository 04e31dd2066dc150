//! Repository access for the rescan cycle.
//!
//! This module wraps the `git2` library behind [`GitRepo`] to answer the
//! questions a cycle asks before it launches any query: which commit is the
//! baseline, whether a merge is in progress, what the empty tree is called,
//! and which options the repository configures.
//!
//! # Public API
//! - [`GitRepo`]: Opened repository with its work tree
//! - [`RepositoryState`]: Initial, normal or merging, with the commit ids involved
//! - [`RepositoryProbe`]: The subset of repository queries the orchestrator needs

use crate::core::{
    config::StatusConfig,
    error::{RescanError, Result},
};
use git2::Repository;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Head and merge situation of the repository, computed fresh each cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositoryState {
    /// No commit exists yet
    Initial,
    Normal {
        head: String,
    },
    Merging {
        head: String,
        merge_heads: Vec<String>,
    },
}

impl RepositoryState {
    pub fn head(&self) -> Option<&str> {
        match self {
            RepositoryState::Initial => None,
            RepositoryState::Normal { head } | RepositoryState::Merging { head, .. } => {
                Some(head.as_str())
            }
        }
    }

    pub fn merge_heads(&self) -> &[String] {
        match self {
            RepositoryState::Merging { merge_heads, .. } => merge_heads,
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RepositoryState::Initial => "initial",
            RepositoryState::Normal { .. } => "normal",
            RepositoryState::Merging { .. } => "merging",
        }
    }
}

/// Repository queries the orchestrator depends on
pub trait RepositoryProbe {
    fn repository_state(&self) -> Result<RepositoryState>;

    /// Id of the empty tree object, written to the object database if needed
    fn empty_tree_id(&self) -> Result<String>;
}

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| RescanError::NotInGitRepo)?;
        Ok(GitRepo { repo })
    }

    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or(RescanError::BareRepository)
    }

    pub fn git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    pub fn get_repository(&self) -> &Repository {
        &self.repo
    }

    pub fn status_config(&self) -> Result<StatusConfig> {
        let config = self.repo.config()?;
        Ok(StatusConfig::from_git_config(&config))
    }

    /// Exclusion arguments for a git without `--exclude-standard`: per-directory
    /// `.gitignore`, `info/exclude` and `core.excludesfile` when readable
    pub fn legacy_exclude_args(&self) -> Result<Vec<String>> {
        let mut args = vec!["--exclude-per-directory=.gitignore".to_string()];

        let info_exclude = self.repo.path().join("info").join("exclude");
        if fs::File::open(&info_exclude).is_ok() {
            args.push(format!("--exclude-from={}", info_exclude.display()));
        }

        let config = self.repo.config()?;
        if let Ok(user_exclude) = config.get_path("core.excludesfile") {
            if fs::File::open(&user_exclude).is_ok() {
                let normalized = fs::canonicalize(&user_exclude).unwrap_or(user_exclude);
                args.push(format!("--exclude-from={}", normalized.display()));
            }
        }

        Ok(args)
    }

    fn read_merge_heads(&self) -> Result<Option<Vec<String>>> {
        let merge_head = self.repo.path().join("MERGE_HEAD");
        if !merge_head.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&merge_head)?;
        Ok(Some(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

impl RepositoryProbe for GitRepo {
    fn repository_state(&self) -> Result<RepositoryState> {
        let head = match self.repo.head().and_then(|h| h.peel_to_commit()) {
            Ok(commit) => commit.id().to_string(),
            Err(_) => return Ok(RepositoryState::Initial),
        };

        match self.read_merge_heads()? {
            Some(merge_heads) => Ok(RepositoryState::Merging { head, merge_heads }),
            None => Ok(RepositoryState::Normal { head }),
        }
    }

    fn empty_tree_id(&self) -> Result<String> {
        let oid = self.repo.treebuilder(None)?.write()?;
        Ok(oid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> Result<()> {
        std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(RescanError::Io)?;
        Ok(())
    }

    fn setup_test_repo() -> Result<(TempDir, GitRepo)> {
        let temp_dir = TempDir::new().map_err(RescanError::Io)?;
        let repo_path = temp_dir.path();

        git(repo_path, &["init"])?;
        git(repo_path, &["config", "user.name", "Test User"])?;
        git(repo_path, &["config", "user.email", "test@example.com"])?;

        let git_repo = GitRepo::open(repo_path)?;
        Ok((temp_dir, git_repo))
    }

    #[test]
    fn test_initial_state_without_commits() -> Result<()> {
        let (_temp_dir, git_repo) = setup_test_repo()?;
        assert_eq!(git_repo.repository_state()?, RepositoryState::Initial);
        Ok(())
    }

    #[test]
    fn test_normal_state_after_commit() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        fs::write(temp_dir.path().join("a.txt"), "a\n")?;
        git(temp_dir.path(), &["add", "a.txt"])?;
        git(temp_dir.path(), &["commit", "-m", "first"])?;

        let state = git_repo.repository_state()?;
        assert_eq!(state.name(), "normal");
        assert_eq!(state.head().map(str::len), Some(40));
        Ok(())
    }

    #[test]
    fn test_merging_state_reads_merge_heads() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        fs::write(temp_dir.path().join("a.txt"), "a\n")?;
        git(temp_dir.path(), &["add", "a.txt"])?;
        git(temp_dir.path(), &["commit", "-m", "first"])?;

        let other = "1234567890123456789012345678901234567890";
        fs::write(git_repo.git_dir().join("MERGE_HEAD"), format!("{other}\n"))?;

        let state = git_repo.repository_state()?;
        assert_eq!(state.name(), "merging");
        assert_eq!(state.merge_heads(), &[other.to_string()]);
        Ok(())
    }

    #[test]
    fn test_empty_tree_id() -> Result<()> {
        let (_temp_dir, git_repo) = setup_test_repo()?;
        assert_eq!(
            git_repo.empty_tree_id()?,
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        Ok(())
    }

    #[test]
    fn test_open_non_git_directory() {
        let non_git_path = PathBuf::from("/tmp/definitely/not/a/git/repo");
        assert!(matches!(
            GitRepo::open(&non_git_path),
            Err(RescanError::NotInGitRepo)
        ));
    }

    #[test]
    fn test_legacy_exclude_args() -> Result<()> {
        let (_temp_dir, git_repo) = setup_test_repo()?;
        let args = git_repo.legacy_exclude_args()?;
        assert_eq!(args[0], "--exclude-per-directory=.gitignore");
        Ok(())
    }
}
