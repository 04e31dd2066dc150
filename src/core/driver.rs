//! Async event loop for one rescan cycle.
//!
//! [`run_cycle`] drives a [`StatusSync`] with real query streams. Each stream
//! gets a pump task that forwards chunks over an unbounded channel; the loop
//! here is the only code that touches the status table, so merges happen one
//! at a time in arrival order.
//!
//! Pump tasks are aborted when the loop returns, which drops their streams
//! and kills any query still running.

use crate::core::{
    error::{RescanError, Result},
    git::RepositoryProbe,
    launcher::{Launcher, QueryKind, QueryStream},
    observer::StatusObserver,
    rescan::{RescanRequest, RescanStep, StatusSync},
};
use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every stream ended and the table was reconciled
    Completed,
    /// Another cycle was active or the index was locked
    Rejected,
}

#[derive(Debug)]
enum StreamEvent {
    Data(usize, Bytes),
    End(usize, Result<()>),
}

/// Pump tasks of the running cycle, aborted together on drop
#[derive(Default)]
struct PumpSet {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for PumpSet {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Run one full cycle: refresh pre-pass if needed, every status query, then
/// reconciliation
pub async fn run_cycle<O, L, P>(
    sync: &mut StatusSync<O>,
    launcher: &L,
    probe: &P,
    request: RescanRequest,
) -> Result<CycleOutcome>
where
    O: StatusObserver,
    L: Launcher + ?Sized,
    P: RepositoryProbe + ?Sized,
{
    let queries = match sync.begin_rescan(request, probe)? {
        RescanStep::Rejected => return Ok(CycleOutcome::Rejected),
        RescanStep::Launch(queries) => queries,
        RescanStep::Refresh(query) => {
            if let Err(e) = refresh_index(launcher, &query).await {
                sync.abort(&e);
                return Err(e);
            }
            sync.refresh_finished(probe)?
        }
    };

    match pump_streams(sync, launcher, &queries).await {
        Ok(()) => Ok(CycleOutcome::Completed),
        Err(e) => {
            if sync.is_rescanning() {
                sync.abort(&e);
            }
            Err(e)
        }
    }
}

/// Run the refresh pre-pass, discarding its output
async fn refresh_index<L: Launcher + ?Sized>(launcher: &L, query: &QueryKind) -> Result<()> {
    let mut stream = launcher.spawn(query)?;
    while stream.read_chunk().await?.is_some() {}

    // stale stat info is only a performance issue; the diffs still run
    if let Err(e) = stream.close().await {
        log::warn!("index refresh failed: {e}");
    }
    Ok(())
}

async fn pump_streams<O, L>(
    sync: &mut StatusSync<O>,
    launcher: &L,
    queries: &[QueryKind],
) -> Result<()>
where
    O: StatusObserver,
    L: Launcher + ?Sized,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut pumps = PumpSet::default();

    for (id, query) in queries.iter().enumerate() {
        let stream = launcher.spawn(query).inspect_err(|e| {
            log::error!("failed to launch {query}: {e}");
        })?;
        pumps.handles.push(tokio::spawn(pump(id, stream, tx.clone())));
    }
    drop(tx);

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Data(id, bytes) => sync.on_stream_data(id, &bytes)?,
            StreamEvent::End(id, status) => {
                status?;
                if sync.on_stream_end(id)? {
                    return Ok(());
                }
            }
        }
    }

    Err(RescanError::StreamsInterrupted)
}

async fn pump(id: usize, mut stream: QueryStream, tx: UnboundedSender<StreamEvent>) {
    loop {
        match stream.read_chunk().await {
            Ok(Some(bytes)) => {
                if tx.send(StreamEvent::Data(id, bytes)).is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(StreamEvent::End(id, Err(e)));
                return;
            }
        }
    }

    let status = stream.close().await;
    let _ = tx.send(StreamEvent::End(id, status));
}
