//! Decompilation pipeline coordinator
//!
//! A run takes a fragment through generation, compilation and verification,
//! in that order, each stage attempted exactly once. Recoverable results
//! (compiler diagnostics, a low match score) flow into the [`PipelineRun`];
//! a backend failure or a cancellation aborts the run with a
//! [`PipelineError`] naming the stage, and nothing is recorded.

mod progress;
mod state;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::compiler::Compiler;
use crate::constants::progress::{COMPILE_PERCENT, COMPLETE_PERCENT, GENERATE_PERCENT, VERIFY_PERCENT};
use crate::errors::{PipelineError, PipelineResult};
use crate::generator::CodeGenerator;
use crate::history::ResultStore;
use crate::models::{Fragment, PipelineRun, ProgressEvent, ProgressStage, RunId, Stage};
use crate::verifier::BinaryVerifier;

pub use self::progress::ProgressReporter;
pub use self::state::RunState;

type ActiveTable = Mutex<HashMap<RunId, ActiveRun>>;

fn lock_table(table: &ActiveTable) -> MutexGuard<'_, HashMap<RunId, ActiveRun>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reservation for a run that has not started yet.
///
/// Obtained from [`PipelineCoordinator::prepare`], so the caller knows the
/// run id (and can cancel it) before the run completes. The run stays in the
/// active table until the ticket is dropped, whether it was executed,
/// abandoned mid-run or never used.
#[derive(Debug)]
pub struct RunTicket {
    id: RunId,
    token: CancellationToken,
    table: Weak<ActiveTable>,
}

impl RunTicket {
    pub fn id(&self) -> &RunId {
        &self.id
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            if lock_table(&table).remove(&self.id).is_some() {
                debug!("Run {} released", self.id);
            }
        }
    }
}

#[derive(Debug)]
struct ActiveRun {
    token: CancellationToken,
    state: RunState,
}

/// Sequences the three stages and records completed runs.
pub struct PipelineCoordinator {
    generator: Arc<dyn CodeGenerator>,
    compiler: Arc<dyn Compiler>,
    verifier: Arc<dyn BinaryVerifier>,
    store: Arc<ResultStore>,
    progress: ProgressReporter,
    active: Arc<ActiveTable>,
}

impl PipelineCoordinator {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        compiler: Arc<dyn Compiler>,
        verifier: Arc<dyn BinaryVerifier>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            generator,
            compiler,
            verifier,
            store,
            progress: ProgressReporter::new(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Receive progress events for every run started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Reserve a run id.
    pub fn prepare(&self) -> RunTicket {
        let ticket = RunTicket {
            id: RunId::next(),
            token: CancellationToken::new(),
            table: Arc::downgrade(&self.active),
        };
        self.active_runs_mut().insert(
            ticket.id.clone(),
            ActiveRun {
                token: ticket.token.clone(),
                state: RunState::Idle,
            },
        );
        ticket
    }

    /// Ask a pending or in-flight run to stop at its next stage boundary.
    ///
    /// Returns `false` if no such run is active.
    pub fn cancel(&self, id: &RunId) -> bool {
        match self.active_runs_mut().get(id) {
            Some(active) => {
                info!("Cancellation requested for run {}", id);
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Current state of an active run.
    pub fn run_state(&self, id: &RunId) -> Option<RunState> {
        self.active_runs_mut().get(id).map(|active| active.state)
    }

    /// Ids of runs that have been prepared but not finished.
    pub fn active_runs(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self.active_runs_mut().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn history(&self) -> Vec<PipelineRun> {
        self.store.list()
    }

    pub fn clear_history(&self) {
        self.store.clear();
    }

    /// Run the pipeline on `fragment`.
    pub async fn run(&self, fragment: &Fragment) -> PipelineResult<PipelineRun> {
        let ticket = self.prepare();
        self.execute(ticket, fragment).await
    }

    /// Run the pipeline for a prepared ticket.
    pub async fn execute(&self, ticket: RunTicket, fragment: &Fragment) -> PipelineResult<PipelineRun> {
        info!("Starting run {} for {}", ticket.id, fragment.identifier());

        let result = self.drive(&ticket, fragment).await;
        let id = ticket.id.clone();
        drop(ticket);

        match &result {
            Ok(run) => {
                self.store.append(run.clone());
                self.publish(&id, ProgressStage::Complete, COMPLETE_PERCENT, format!("Decompilation {}", run.status()));
                info!(
                    "Run {} completed: {} ({}% match)",
                    id,
                    run.status(),
                    run.match_percentage().unwrap_or(0)
                );
            }
            Err(e) if e.is_cancelled() => {
                warn!("Run {} cancelled before {} stage", id, e.stage);
                self.publish(&id, ProgressStage::Failed, 0, format!("Cancelled before {}", e.stage));
            }
            Err(e) => {
                error!("Run {} failed: {}", id, e);
                self.publish(&id, ProgressStage::Failed, 0, e.to_string());
            }
        }

        result
    }

    async fn drive(&self, ticket: &RunTicket, fragment: &Fragment) -> PipelineResult<PipelineRun> {
        self.enter(ticket, Stage::Generate, GENERATE_PERCENT, "Generating C code...")?;
        let generated = self
            .generator
            .generate(fragment)
            .await
            .map_err(|e| self.fail(ticket, PipelineError::new(Stage::Generate, e)))?;

        self.enter(ticket, Stage::Compile, COMPILE_PERCENT, "Compiling C code...")?;
        let outcome = self
            .compiler
            .compile(&generated.source)
            .await
            .map_err(|e| self.fail(ticket, PipelineError::new(Stage::Compile, e)))?;

        // Dropping `outcome` on any early return removes its workspace.
        self.enter(ticket, Stage::Verify, VERIFY_PERCENT, "Verifying decompilation...")?;
        let verdict = self
            .verifier
            .verify(fragment, &generated.source, &outcome)
            .await
            .map_err(|e| self.fail(ticket, PipelineError::new(Stage::Verify, e)))?;

        let run = PipelineRun::assemble(
            ticket.id.clone(),
            fragment,
            generated.source,
            generated.confidence,
            &outcome,
            verdict,
        );
        self.transition(&ticket.id, RunState::Completed(run.status()));
        Ok(run)
    }

    /// Check for cancellation, then move into `stage`.
    fn enter(&self, ticket: &RunTicket, stage: Stage, percent: u8, message: &str) -> PipelineResult<()> {
        if ticket.token.is_cancelled() {
            return Err(self.fail(ticket, PipelineError::cancelled(stage)));
        }
        self.transition(&ticket.id, RunState::working(stage));
        self.publish(&ticket.id, stage.into(), percent, message.to_string());
        Ok(())
    }

    fn fail(&self, ticket: &RunTicket, error: PipelineError) -> PipelineError {
        self.transition(&ticket.id, RunState::Failed(error.stage));
        error
    }

    fn transition(&self, id: &RunId, next: RunState) {
        if let Some(active) = self.active_runs_mut().get_mut(id) {
            debug_assert!(
                active.state.can_transition(next),
                "illegal transition {} -> {}",
                active.state,
                next
            );
            debug!("Run {}: {} -> {}", id, active.state, next);
            active.state = next;
        }
    }

    fn publish(&self, id: &RunId, stage: ProgressStage, percent: u8, message: String) {
        self.progress.publish(ProgressEvent {
            run_id: id.clone(),
            stage,
            percent_complete: percent,
            message,
        });
    }

    fn active_runs_mut(&self) -> MutexGuard<'_, HashMap<RunId, ActiveRun>> {
        lock_table(&self.active)
    }
}
