use crate::core::{
    config::StatusConfig,
    driver::{run_cycle, CycleOutcome},
    error::{RescanError, Result},
    git::{GitRepo, RepositoryState},
    launcher::GitLauncher,
    observer::LogObserver,
    output::{format_status_line, print_info, print_section_header},
    reconcile::DisplayListing,
    rescan::{RescanRequest, StatusSync},
    state::{FileInfo, StatusRecord, StatusTable},
    status_code::SlotStatus,
};
use serde::Serialize;
use std::env;

/// Flags of the `status` command
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub json: bool,
    pub no_untracked: bool,
    pub ignore_mtime: bool,
    pub max_files: Option<usize>,
    /// Build untracked exclusions from `.gitignore`, `info/exclude` and
    /// `core.excludesfile` instead of `--exclude-standard`
    pub legacy_exclude: bool,
}

impl StatusOptions {
    /// Command-line flags win over repository configuration
    pub fn apply(&self, config: &mut StatusConfig) {
        if self.no_untracked {
            config.display_untracked = false;
        }
        if let Some(max_files) = self.max_files {
            config.max_files_displayed = max_files;
        }
    }
}

pub fn execute_status(options: &StatusOptions) -> Result<()> {
    let current_dir = env::current_dir()?;
    let git_repo = GitRepo::open(&current_dir)?;
    let sync = collect_status(&git_repo, options)?;

    if options.json {
        let report = StatusReport::new(&sync);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let groups = StatusGroups::from_listing(sync.table(), sync.listing());
    if groups.is_empty() {
        // nothing to show, like `git status` on a clean tree
        return Ok(());
    }
    print_grouped_status_sections(&groups);

    if sync.listing().hidden > 0 {
        print_info(&format!(
            "{} untracked files not shown (limit {})",
            sync.listing().hidden,
            sync.config().max_files_displayed
        ));
    }
    Ok(())
}

/// Run one rescan of `git_repo` on a single-threaded runtime
pub fn collect_status(
    git_repo: &GitRepo,
    options: &StatusOptions,
) -> Result<StatusSync<LogObserver>> {
    let mut config = git_repo.status_config()?;
    options.apply(&mut config);
    if options.legacy_exclude {
        config.exclude_args = git_repo.legacy_exclude_args()?;
    }
    log::debug!("status config: {config:?}");

    let launcher = GitLauncher::new(git_repo.git_dir(), git_repo.workdir()?);
    let mut sync = StatusSync::with_observer(config, LogObserver);
    if !sync.reserve_initial_rescan() {
        log::warn!("index lock already {}, rescan may be refused", sync.lock().state());
    }

    let request = RescanRequest {
        honor_mtime: !options.ignore_mtime,
        force_first_diff: false,
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run_cycle(&mut sync, &launcher, git_repo, request))? {
        CycleOutcome::Completed => Ok(sync),
        CycleOutcome::Rejected => Err(RescanError::RescanInProgress),
    }
}

/// Listing entries split into the sections the command prints
#[derive(Debug, Default)]
struct StatusGroups<'a> {
    conflicts: Vec<&'a StatusRecord>,
    staged: Vec<&'a StatusRecord>,
    worktree: Vec<&'a StatusRecord>,
    untracked: Vec<&'a StatusRecord>,
}

impl<'a> StatusGroups<'a> {
    fn from_listing(table: &'a StatusTable, listing: &DisplayListing) -> Self {
        let mut groups = StatusGroups::default();

        for record in listing.staged.iter().filter_map(|p| table.get(p)) {
            groups.staged.push(record);
        }
        for record in listing.worktree.iter().filter_map(|p| table.get(p)) {
            match record.code.worktree_column() {
                SlotStatus::Unmerged => groups.conflicts.push(record),
                SlotStatus::Untracked => groups.untracked.push(record),
                _ => groups.worktree.push(record),
            }
        }

        groups
    }

    fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
            && self.staged.is_empty()
            && self.worktree.is_empty()
            && self.untracked.is_empty()
    }
}

fn print_grouped_status_sections(groups: &StatusGroups) {
    println!();
    let sections: [(&str, &[&StatusRecord], fn(&StatusRecord) -> SlotStatus); 4] = [
        ("Unmerged", &groups.conflicts, |r| r.code.worktree_column()),
        ("Staged", &groups.staged, |r| r.code.staged_column()),
        ("Not staged", &groups.worktree, |r| r.code.worktree_column()),
        ("Untracked", &groups.untracked, |r| r.code.worktree_column()),
    ];

    for (header, records, column) in sections {
        if records.is_empty() {
            continue;
        }
        print_section_header(header);
        for record in records {
            println!(
                "{}",
                format_status_line(column(record), record.code.description(), &record.path_lossy())
            );
        }
        println!();
    }
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    repository: Option<&'a RepositoryState>,
    parent: Option<&'a str>,
    files: Vec<FileReport<'a>>,
    hidden: usize,
}

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    path: String,
    code: String,
    description: &'static str,
    icon_id: u64,
    baseline_info: Option<&'a FileInfo>,
    staged_info: Option<&'a FileInfo>,
}

impl<'a> StatusReport<'a> {
    fn new(sync: &'a StatusSync<LogObserver>) -> Self {
        let files = sync
            .iterate_statuses()
            .map(|record| FileReport {
                path: record.path_lossy(),
                code: record.code.to_string(),
                description: record.code.description(),
                icon_id: record.icon_id,
                baseline_info: record.baseline_info.as_ref(),
                staged_info: record.staged_info.as_ref(),
            })
            .collect();

        StatusReport {
            repository: sync.repository_state(),
            parent: sync.diff_parent_id(),
            files,
            hidden: sync.listing().hidden,
        }
    }
}
