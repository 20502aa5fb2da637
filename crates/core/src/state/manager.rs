//! Run manager for coordinating many concurrent runs.
//!
//! The RunManager spawns each run on its own tokio task and keeps a
//! registry of runs indexed by id. Runs are independent: they share
//! read-only agents and gateways but never a transcript.

use crate::engine::Orchestrator;
use crate::state::run::RunState;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tk_protocol::events::RunEvent;
use tk_protocol::run_models::RunStatus;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

struct RunEntry {
    orchestrator: Orchestrator,

    /// Latest known state. Refreshed whenever the run's task returns.
    state: RunState,

    cancel: CancellationToken,

    /// Task currently driving the run, if any.
    handle: Option<JoinHandle<()>>,
}

/// Manages all runs started through it.
pub struct RunManager {
    runs: Arc<Mutex<HashMap<Uuid, RunEntry>>>,

    /// Channel receiving the events of every run.
    events_tx: mpsc::Sender<RunEvent>,
}

impl RunManager {
    /// Create a new RunManager.
    ///
    /// The receiving end of `events_tx` must be drained (or dropped);
    /// runs block while the channel is full.
    pub fn new(events_tx: mpsc::Sender<RunEvent>) -> Self {
        Self {
            runs: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
        }
    }

    /// Start running `task` with `orchestrator` in the background.
    ///
    /// # Returns
    ///
    /// The id of the new run, known before the run's task is spawned.
    pub async fn start_run(&self, orchestrator: Orchestrator, task: impl Into<String>) -> Uuid {
        let state = orchestrator.new_run();
        let run_id = state.id;
        let cancel = CancellationToken::new();

        let mut snapshot = state.clone();
        snapshot.status = RunStatus::Running;
        self.runs.lock().await.insert(
            run_id,
            RunEntry {
                orchestrator: orchestrator.clone(),
                state: snapshot,
                cancel: cancel.clone(),
                handle: None,
            },
        );

        let runs = Arc::clone(&self.runs);
        let events_tx = self.events_tx.clone();
        let task = task.into();
        let handle = tokio::spawn(async move {
            let mut state = state;
            if let Err(e) = orchestrator
                .execute(&mut state, task, &events_tx, &cancel)
                .await
            {
                warn!(run_id = %state.id, error = %e, "run ended with an error");
            }
            store(&runs, state).await;
        });

        if let Some(entry) = self.runs.lock().await.get_mut(&run_id) {
            entry.handle = Some(handle);
        }
        run_id
    }

    /// Resume a run that is waiting for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is unknown or not awaiting the user.
    pub async fn resume(&self, run_id: Uuid, input: impl Into<String>) -> Result<()> {
        let mut runs = self.runs.lock().await;
        let entry = runs
            .get_mut(&run_id)
            .ok_or_else(|| anyhow!("Run {run_id} not found"))?;

        if entry.state.status != RunStatus::AwaitingUser {
            return Err(anyhow!(
                "Run {run_id} is {:?}, not awaiting user input",
                entry.state.status
            ));
        }

        let orchestrator = entry.orchestrator.clone();
        let mut state = entry.state.clone();
        entry.state.status = RunStatus::Running;
        entry.cancel = CancellationToken::new();
        let cancel = entry.cancel.clone();

        let runs_handle = Arc::clone(&self.runs);
        let events_tx = self.events_tx.clone();
        let input = input.into();
        entry.handle = Some(tokio::spawn(async move {
            if let Err(e) = orchestrator
                .resume(&mut state, input, &events_tx, &cancel)
                .await
            {
                warn!(run_id = %state.id, error = %e, "resumed run ended with an error");
            }
            store(&runs_handle, state).await;
        }));

        Ok(())
    }

    /// Request cancellation of a run.
    ///
    /// The run stops at its next check; an in-flight gateway call is
    /// abandoned and its result discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found.
    pub async fn cancel(&self, run_id: Uuid) -> Result<()> {
        let runs = self.runs.lock().await;
        let entry = runs
            .get(&run_id)
            .ok_or_else(|| anyhow!("Run {run_id} not found"))?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Wait until the run's current task returns and get its state.
    ///
    /// Returns `None` for unknown runs.
    pub async fn wait(&self, run_id: Uuid) -> Option<RunState> {
        let handle = {
            let mut runs = self.runs.lock().await;
            runs.get_mut(&run_id)?.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(run_id = %run_id, error = %e, "run task panicked");
            }
        }

        self.get(run_id).await
    }

    /// Latest known state of a run.
    pub async fn get(&self, run_id: Uuid) -> Option<RunState> {
        self.runs
            .lock()
            .await
            .get(&run_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn status(&self, run_id: Uuid) -> Option<RunStatus> {
        self.runs
            .lock()
            .await
            .get(&run_id)
            .map(|entry| entry.state.status)
    }

    /// Ids and statuses of all known runs.
    pub async fn list_runs(&self) -> Vec<(Uuid, RunStatus)> {
        self.runs
            .lock()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.state.status))
            .collect()
    }

    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }
}

async fn store(runs: &Mutex<HashMap<Uuid, RunEntry>>, state: RunState) {
    if let Some(entry) = runs.lock().await.get_mut(&state.id) {
        entry.state = state;
    }
}
