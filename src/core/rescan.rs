//! Rescan orchestrator.
//!
//! [`StatusSync`] owns every piece of state a rescan touches: the status
//! table, the selection, the index lock and the repository context. It is a
//! synchronous state machine driven by events (stream data, stream end,
//! refresh done); [`crate::core::driver`] feeds it from real subprocesses.
//!
//! ```text
//! Idle -> ComputingRepoState -> [Refreshing] -> StreamsActive(n) -> Reconciling -> Idle
//! ```
//!
//! Only the end of the last outstanding stream moves the cycle to
//! `Reconciling`; streams may end in any order. A request made while a cycle
//! is active is rejected.

use crate::core::{
    config::StatusConfig,
    error::{RescanError, Result},
    git::{RepositoryProbe, RepositoryState},
    launcher::QueryKind,
    lock::{LockKind, LockManager},
    observer::{NullObserver, StatusObserver},
    parser::{ParsedRecord, StreamParser},
    reconcile::DisplayListing,
    state::{SelectionSet, StatusRecord, StatusTable},
};
use bstr::{BStr, BString, ByteSlice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescanPhase {
    Idle,
    /// Lock held, reading HEAD and the merge state
    ComputingRepoState,
    /// Waiting for the index refresh pre-pass
    Refreshing,
    /// Number of status streams still running
    StreamsActive(usize),
    Reconciling,
}

/// How a rescan was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanRequest {
    /// Allow `trust_mtime` to skip the refresh pre-pass
    pub honor_mtime: bool,
    /// Move the display to the first conflict or change once the cycle ends
    pub force_first_diff: bool,
}

impl RescanRequest {
    /// A rescan the user asked for explicitly
    pub fn interactive() -> Self {
        Self {
            honor_mtime: true,
            force_first_diff: true,
        }
    }
}

impl Default for RescanRequest {
    fn default() -> Self {
        Self {
            honor_mtime: true,
            force_first_diff: false,
        }
    }
}

/// What the caller must do after asking for a rescan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescanStep {
    /// Another cycle is active or the lock is taken
    Rejected,
    /// Run the refresh pre-pass, then call [`StatusSync::refresh_finished`]
    Refresh(QueryKind),
    /// Launch these queries; stream ids are their positions
    Launch(Vec<QueryKind>),
}

#[derive(Debug)]
struct RescanSession {
    outstanding: usize,
    parsers: Vec<Option<StreamParser>>,
    force_first_diff: bool,
}

pub struct StatusSync<O: StatusObserver = NullObserver> {
    pub(crate) config: StatusConfig,
    pub(crate) lock: LockManager,
    pub(crate) table: StatusTable,
    pub(crate) selection: SelectionSet,
    pub(crate) observer: O,
    pub(crate) phase: RescanPhase,
    session: Option<RescanSession>,
    repo_state: Option<RepositoryState>,
    parent: Option<String>,
    empty_tree: Option<String>,
    amend: bool,
    pub(crate) display: Option<BString>,
    pub(crate) listing: DisplayListing,
    pub(crate) files_warning: bool,
}

impl StatusSync<NullObserver> {
    pub fn new(config: StatusConfig) -> Self {
        Self::with_observer(config, NullObserver)
    }
}

impl<O: StatusObserver> StatusSync<O> {
    pub fn with_observer(config: StatusConfig, observer: O) -> Self {
        Self {
            config,
            lock: LockManager::new(),
            table: StatusTable::new(),
            selection: SelectionSet::new(),
            observer,
            phase: RescanPhase::Idle,
            session: None,
            repo_state: None,
            parent: None,
            empty_tree: None,
            amend: false,
            display: None,
            listing: DisplayListing::default(),
            files_warning: false,
        }
    }

    /// Hold the lock as `begin-read` so nothing else takes it before the
    /// first rescan, which upgrades it
    pub fn reserve_initial_rescan(&mut self) -> bool {
        self.lock.begin(LockKind::Read)
    }

    /// Start a cycle: take the lock, compute the repository state and reset
    /// the table
    pub fn begin_rescan<P: RepositoryProbe + ?Sized>(
        &mut self,
        request: RescanRequest,
        probe: &P,
    ) -> Result<RescanStep> {
        if self.phase != RescanPhase::Idle {
            log::debug!("rescan requested during {:?}, ignoring", self.phase);
            return Ok(RescanStep::Rejected);
        }
        if !self.lock.acquire(LockKind::Read) {
            log::debug!("rescan requested while index is locked as {}", self.lock.state());
            return Ok(RescanStep::Rejected);
        }
        log::info!("rescan started");
        self.phase = RescanPhase::ComputingRepoState;
        let state = match probe.repository_state() {
            Ok(state) => state,
            Err(e) => {
                self.abort(&e);
                return Err(e);
            }
        };
        self.apply_repository_state(state);

        self.table.clear();
        self.session = Some(RescanSession {
            outstanding: 0,
            parsers: Vec::new(),
            force_first_diff: request.force_first_diff,
        });

        if request.honor_mtime && self.config.trust_mtime {
            self.launch_streams(probe).map(RescanStep::Launch)
        } else {
            self.phase = RescanPhase::Refreshing;
            self.observer.on_progress("Refreshing file status...");
            Ok(RescanStep::Refresh(QueryKind::RefreshIndex))
        }
    }

    /// The refresh pre-pass completed; returns the queries to launch
    pub fn refresh_finished<P: RepositoryProbe + ?Sized>(
        &mut self,
        probe: &P,
    ) -> Result<Vec<QueryKind>> {
        if self.phase != RescanPhase::Refreshing {
            return Err(RescanError::NoActiveRescan);
        }
        self.launch_streams(probe)
    }

    fn launch_streams<P: RepositoryProbe + ?Sized>(&mut self, probe: &P) -> Result<Vec<QueryKind>> {
        let parent = match self.diff_parent(probe) {
            Ok(parent) => parent,
            Err(e) => {
                self.abort(&e);
                return Err(e);
            }
        };

        let mut queries = vec![QueryKind::DiffIndex { parent }, QueryKind::DiffFiles];
        if self.config.display_untracked {
            queries.push(QueryKind::ListOthers {
                exclude_args: self.config.exclude_args.clone(),
            });
        }

        let session = self.session.as_mut().ok_or(RescanError::NoActiveRescan)?;
        session.parsers = queries
            .iter()
            .map(|q| q.record_format().map(StreamParser::new))
            .collect();
        session.outstanding = queries.len();

        self.phase = RescanPhase::StreamsActive(queries.len());
        self.observer.on_progress("Scanning for modified files ...");
        log::debug!("launching {} status streams", queries.len());

        Ok(queries)
    }

    /// Parent commit of the tree-vs-index diff, or the empty tree without one
    fn diff_parent<P: RepositoryProbe + ?Sized>(&mut self, probe: &P) -> Result<String> {
        if let Some(parent) = &self.parent {
            return Ok(parent.clone());
        }
        if let Some(tree) = &self.empty_tree {
            return Ok(tree.clone());
        }
        let tree = probe.empty_tree_id()?;
        self.empty_tree = Some(tree.clone());
        Ok(tree)
    }

    fn apply_repository_state(&mut self, state: RepositoryState) {
        let same_head = self.repo_state.as_ref().and_then(RepositoryState::head) == state.head();
        if self.amend && matches!(state, RepositoryState::Normal { .. }) && same_head {
            log::debug!("amending, keeping parent {:?}", self.parent);
            return;
        }
        self.parent = state.head().map(String::from);
        self.repo_state = Some(state);
    }

    /// Bytes arrived on stream `stream`
    pub fn on_stream_data(&mut self, stream: usize, bytes: &[u8]) -> Result<()> {
        let records = {
            let session = self.session.as_mut().ok_or(RescanError::NoActiveRescan)?;
            let parser = session
                .parsers
                .get_mut(stream)
                .and_then(Option::as_mut)
                .ok_or(RescanError::UnknownStream(stream))?;
            parser.feed(bytes)
        };

        for record in records {
            self.apply_record(record);
        }
        Ok(())
    }

    /// Stream `stream` reached end of file; returns `true` once the cycle
    /// has been reconciled
    pub fn on_stream_end(&mut self, stream: usize) -> Result<bool> {
        let session = self.session.as_mut().ok_or(RescanError::NoActiveRescan)?;
        let parser = session
            .parsers
            .get_mut(stream)
            .and_then(Option::take)
            .ok_or(RescanError::UnknownStream(stream))?;
        parser.finish();

        session.outstanding -= 1;
        let remaining = session.outstanding;
        if remaining > 0 {
            self.phase = RescanPhase::StreamsActive(remaining);
            return Ok(false);
        }

        let force_first_diff = self.session.take().is_some_and(|s| s.force_first_diff);
        self.reconcile(force_first_diff);
        Ok(true)
    }

    /// Abandon the active cycle after a failure and release the lock
    pub fn abort(&mut self, err: &RescanError) {
        log::error!("rescan aborted: {err}");
        self.session = None;
        self.phase = RescanPhase::Idle;
        self.lock.release();
        self.observer.on_progress(&format!("Rescan failed: {err}"));
    }

    fn apply_record(&mut self, record: ParsedRecord) {
        let path = record.path.as_bstr();
        let previous = self.table.merge(
            path,
            record.fragment,
            record.baseline_info,
            record.staged_info,
            &mut self.selection,
        );
        let current = self.table.get(path).map(|r| r.code).unwrap_or_default();
        self.observer.on_status_changed(path, previous, current);
        self.flush_invalidated();
    }

    pub(crate) fn flush_invalidated(&mut self) {
        for path in self.selection.take_invalidated() {
            self.observer.on_selection_invalidated(path.as_bstr());
        }
    }

    /// Enter amend mode; the tree-vs-index diff runs against `parent`
    pub fn begin_amend(&mut self, parent: Option<String>) {
        self.amend = true;
        self.parent = parent;
    }

    pub fn end_amend(&mut self) {
        self.amend = false;
    }

    pub fn is_rescanning(&self) -> bool {
        self.phase != RescanPhase::Idle
    }

    pub fn phase(&self) -> RescanPhase {
        self.phase
    }

    /// Mid-cycle reads are not authoritative until [`Self::is_rescanning`] is false
    pub fn get_status(&self, path: impl AsRef<[u8]>) -> Option<&StatusRecord> {
        self.table.get(path)
    }

    /// Records in ascending path order
    pub fn iterate_statuses(&self) -> impl Iterator<Item = &StatusRecord> {
        self.table.iter()
    }

    pub fn table(&self) -> &StatusTable {
        &self.table
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn listing(&self) -> &DisplayListing {
        &self.listing
    }

    /// Path shown in the diff view
    pub fn display_path(&self) -> Option<&BStr> {
        self.display.as_ref().map(|p| p.as_bstr())
    }

    pub fn show(&mut self, path: Option<BString>) {
        self.display = path;
        let shown = self.display.as_ref().map(|p| p.as_bstr());
        self.observer.on_display_changed(shown);
    }

    pub fn repository_state(&self) -> Option<&RepositoryState> {
        self.repo_state.as_ref()
    }

    pub fn diff_parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    pub fn lock(&self) -> &LockManager {
        &self.lock
    }

    pub fn lock_mut(&mut self) -> &mut LockManager {
        &mut self.lock
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status_code::StatusCode;

    struct FakeRepo {
        state: RepositoryState,
    }

    impl RepositoryProbe for FakeRepo {
        fn repository_state(&self) -> Result<RepositoryState> {
            Ok(self.state.clone())
        }

        fn empty_tree_id(&self) -> Result<String> {
            Ok("4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_string())
        }
    }

    struct BrokenRepo;

    impl RepositoryProbe for BrokenRepo {
        fn repository_state(&self) -> Result<RepositoryState> {
            Err(RescanError::NotInGitRepo)
        }

        fn empty_tree_id(&self) -> Result<String> {
            Err(RescanError::NotInGitRepo)
        }
    }

    fn normal_repo() -> FakeRepo {
        FakeRepo {
            state: RepositoryState::Normal {
                head: "abcdefabcdefabcdefabcdefabcdefabcdefabcd".to_string(),
            },
        }
    }

    fn trusting_config() -> StatusConfig {
        StatusConfig {
            trust_mtime: true,
            ..StatusConfig::default()
        }
    }

    fn launched(step: RescanStep) -> Vec<QueryKind> {
        match step {
            RescanStep::Launch(queries) => queries,
            other => panic!("expected launch, got {other:?}"),
        }
    }

    #[test]
    fn test_three_streams_need_three_ends() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        let queries = launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);
        assert_eq!(queries.len(), 3);

        assert!(!sync.on_stream_end(2)?);
        assert!(!sync.on_stream_end(0)?);
        assert!(sync.is_rescanning());
        assert_eq!(sync.phase(), RescanPhase::StreamsActive(1));

        assert!(sync.on_stream_end(1)?);
        assert!(!sync.is_rescanning());
        assert!(!sync.lock().is_locked());
        Ok(())
    }

    #[test]
    fn test_request_during_cycle_is_rejected() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);

        let again = sync.begin_rescan(RescanRequest::default(), &normal_repo())?;
        assert_eq!(again, RescanStep::Rejected);
        assert_eq!(sync.phase(), RescanPhase::StreamsActive(3));
        Ok(())
    }

    #[test]
    fn test_refresh_pre_pass_unless_mtime_trusted() -> Result<()> {
        let mut sync = StatusSync::new(StatusConfig::default());
        let step = sync.begin_rescan(RescanRequest::default(), &normal_repo())?;
        assert_eq!(step, RescanStep::Refresh(QueryKind::RefreshIndex));
        assert_eq!(sync.phase(), RescanPhase::Refreshing);
        assert!(sync.lock().is_locked());

        let queries = sync.refresh_finished(&normal_repo())?;
        assert_eq!(queries.len(), 3);
        Ok(())
    }

    #[test]
    fn test_ignoring_mtime_forces_refresh() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        let request = RescanRequest {
            honor_mtime: false,
            force_first_diff: false,
        };
        let step = sync.begin_rescan(request, &normal_repo())?;
        assert_eq!(step, RescanStep::Refresh(QueryKind::RefreshIndex));
        Ok(())
    }

    #[test]
    fn test_untracked_listing_is_optional() -> Result<()> {
        let config = StatusConfig {
            display_untracked: false,
            ..trusting_config()
        };
        let mut sync = StatusSync::new(config);
        let queries = launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);

        assert_eq!(queries.len(), 2);
        assert!(!sync.on_stream_end(0)?);
        assert!(sync.on_stream_end(1)?);
        Ok(())
    }

    #[test]
    fn test_initial_repository_diffs_against_empty_tree() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        let repo = FakeRepo {
            state: RepositoryState::Initial,
        };
        let queries = launched(sync.begin_rescan(RescanRequest::default(), &repo)?);

        assert_eq!(
            queries[0],
            QueryKind::DiffIndex {
                parent: "4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_stream_data_merges_records() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);

        sync.on_stream_data(2, b"new.txt\0half")?;
        sync.on_stream_data(1, b":100644 100644 1111 0000 M\0lib.rs\0")?;

        assert_eq!(
            sync.get_status("new.txt").map(|r| r.code),
            StatusCode::parse("_O")
        );
        assert_eq!(
            sync.get_status("lib.rs").map(|r| r.code),
            StatusCode::parse("_M")
        );
        assert!(sync.get_status("half").is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_or_repeated_stream_end_is_an_error() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);

        assert!(matches!(
            sync.on_stream_end(7),
            Err(RescanError::UnknownStream(7))
        ));
        assert!(!sync.on_stream_end(0)?);
        assert!(matches!(
            sync.on_stream_end(0),
            Err(RescanError::UnknownStream(0))
        ));
        Ok(())
    }

    #[test]
    fn test_repository_failure_releases_lock() {
        let mut sync = StatusSync::new(trusting_config());
        let result = sync.begin_rescan(RescanRequest::default(), &BrokenRepo);

        assert!(result.is_err());
        assert!(!sync.is_rescanning());
        assert!(!sync.lock().is_locked());
    }

    #[test]
    fn test_reserved_lock_is_upgraded_by_rescan() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        assert!(sync.reserve_initial_rescan());
        assert!(!sync.lock_mut().acquire(LockKind::Update));

        launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);
        assert!(sync.is_rescanning());
        Ok(())
    }

    #[derive(Default)]
    struct Shown(Vec<Option<String>>);

    impl StatusObserver for Shown {
        fn on_display_changed(&mut self, path: Option<&BStr>) {
            self.0.push(path.map(|p| p.to_string()));
        }
    }

    #[test]
    fn test_show_notifies_observer() {
        let mut sync = StatusSync::with_observer(trusting_config(), Shown::default());
        sync.show(Some("src/main.rs".into()));
        sync.show(None);

        assert_eq!(sync.display_path(), None);
        assert_eq!(
            sync.observer().0,
            vec![Some("src/main.rs".to_string()), None]
        );
    }

    #[test]
    fn test_second_reservation_is_refused() -> Result<()> {
        let mut sync = StatusSync::new(trusting_config());
        assert!(sync.reserve_initial_rescan());
        assert!(!sync.reserve_initial_rescan());

        launched(sync.begin_rescan(RescanRequest::default(), &normal_repo())?);
        Ok(())
    }

    #[test]
    fn test_amend_keeps_parent_for_same_head() -> Result<()> {
        let repo = normal_repo();
        let mut sync = StatusSync::new(trusting_config());
        launched(sync.begin_rescan(RescanRequest::default(), &repo)?);
        for stream in 0..3 {
            sync.on_stream_end(stream)?;
        }

        sync.begin_amend(Some("0123012301230123012301230123012301230123".to_string()));
        let queries = launched(sync.begin_rescan(RescanRequest::default(), &repo)?);

        assert_eq!(
            queries[0],
            QueryKind::DiffIndex {
                parent: "0123012301230123012301230123012301230123".to_string()
            }
        );
        Ok(())
    }
}
