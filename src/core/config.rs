use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FILES_DISPLAYED: usize = 5000;

/// Options that shape a rescan cycle
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    /// Skip the index refresh pre-pass and trust file modification times
    pub trust_mtime: bool,
    /// Run the untracked file listing
    pub display_untracked: bool,
    /// Worktree entries listed before further untracked files are hidden
    pub max_files_displayed: usize,
    /// Exclusion arguments handed to the untracked file listing
    pub exclude_args: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            trust_mtime: false,
            display_untracked: true,
            max_files_displayed: DEFAULT_MAX_FILES_DISPLAYED,
            exclude_args: vec!["--exclude-standard".to_string()],
        }
    }
}

impl StatusConfig {
    /// Read `gui.trustmtime`, `gui.displayuntracked` and `gui.maxfilesdisplayed`;
    /// unset or unparsable keys keep their defaults
    pub fn from_git_config(config: &git2::Config) -> Self {
        let defaults = Self::default();

        let max_files_displayed = config
            .get_i64("gui.maxfilesdisplayed")
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(defaults.max_files_displayed);

        Self {
            trust_mtime: config
                .get_bool("gui.trustmtime")
                .unwrap_or(defaults.trust_mtime),
            display_untracked: config
                .get_bool("gui.displayuntracked")
                .unwrap_or(defaults.display_untracked),
            max_files_displayed,
            exclude_args: defaults.exclude_args,
        }
    }
}
