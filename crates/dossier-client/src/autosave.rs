//! Debounced autosave.
//!
//! An actor task owns the latest wire snapshot. Every [`AutosaveHandle::changed`]
//! replaces the snapshot and pushes the deadline out by the quiet window; when
//! the deadline passes, one flush runs for whatever is newest.
//!
//! ```text
//!   Session ──changed(snapshot)──▶ ┌─────────────────────────┐
//!           ──flush_now()────────▶ │ AutosaveActor           │──spawn──▶ Flusher::flush
//!           ◀──oneshot outcome──── │ latest + deadline       │           (tracked)
//!                                  └─────────────────────────┘
//! ```
//!
//! Flushes are full-state replaces keyed by `externalItemId`, so overlapping
//! ones are harmless: the server keeps whichever lands last. The exit flush
//! bypasses the actor entirely (see [`Flusher::spawn_detached`]).

use std::sync::Arc;
use std::time::Duration;

use dossier_types::WireDocument;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ReportStore};
use crate::credentials::CredentialSource;
use crate::inflight::InFlight;

/// What a flush did. Failures never propagate further than this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    Saved,
    /// No credential; nothing was sent.
    Skipped,
    /// No snapshot to send, or the actor has stopped.
    Idle,
    Failed(BackendError),
}

// ============================================================================
// Flusher
// ============================================================================

/// Sends one snapshot to the report store.
#[derive(Clone)]
pub struct Flusher {
    store: Arc<dyn ReportStore>,
    credentials: Arc<dyn CredentialSource>,
}

impl Flusher {
    pub fn new(store: Arc<dyn ReportStore>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { store, credentials }
    }

    pub async fn flush(&self, doc: &WireDocument) -> FlushOutcome {
        let Some(token) = self.credentials.token() else {
            debug!(document = %doc.external_item_id, "no credential, flush skipped");
            return FlushOutcome::Skipped;
        };
        match self.store.save(&token, doc).await {
            Ok(()) => {
                info!(document = %doc.external_item_id, sections = doc.sections.len(), "report saved");
                FlushOutcome::Saved
            }
            Err(e) => {
                warn!(document = %doc.external_item_id, error = %e, "report flush failed");
                FlushOutcome::Failed(e)
            }
        }
    }

    /// Fire a flush that nobody waits for and nothing cancels.
    ///
    /// Used on exit: the task is spawned on `runtime` outside any session
    /// tracking, so it keeps running after the session is gone.
    pub fn spawn_detached(&self, runtime: &Handle, doc: WireDocument) {
        let this = self.clone();
        debug!(document = %doc.external_item_id, "exit flush");
        runtime.spawn(async move {
            this.flush(&doc).await;
        });
    }
}

// ============================================================================
// Actor
// ============================================================================

enum AutosaveCommand {
    /// Baseline state; flushed only on request.
    Seed(WireDocument),
    Changed(WireDocument),
    FlushNow { reply: oneshot::Sender<FlushOutcome> },
}

/// Handle to the autosave actor. Dropping every clone stops it.
#[derive(Clone, Debug)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<AutosaveCommand>,
}

impl AutosaveHandle {
    /// Set the snapshot without starting the quiet window.
    pub fn seed(&self, snapshot: WireDocument) {
        let _ = self.tx.send(AutosaveCommand::Seed(snapshot));
    }

    /// Record a new snapshot and restart the quiet window.
    pub fn changed(&self, snapshot: WireDocument) {
        if self.tx.send(AutosaveCommand::Changed(snapshot)).is_err() {
            debug!("autosave actor gone, change dropped");
        }
    }

    /// Flush the latest snapshot now and wait for the result.
    pub async fn flush_now(&self) -> FlushOutcome {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(AutosaveCommand::FlushNow { reply }).is_err() {
            return FlushOutcome::Idle;
        }
        // A torn-down actor aborts the flush before it replies.
        rx.await.unwrap_or(FlushOutcome::Idle)
    }
}

struct AutosaveActor {
    flusher: Flusher,
    quiet_window: Duration,
    latest: Option<WireDocument>,
    deadline: Option<Instant>,
    inflight: InFlight,
}

impl AutosaveActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<AutosaveCommand>) {
        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = timer => {
                    self.deadline = None;
                    self.spawn_flush(None);
                }
            }
        }
        debug!("autosave actor shutting down: channel closed");
        self.inflight.abort_all();
    }

    fn handle(&mut self, cmd: AutosaveCommand) {
        match cmd {
            AutosaveCommand::Seed(snapshot) => {
                self.latest = Some(snapshot);
            }
            AutosaveCommand::Changed(snapshot) => {
                self.latest = Some(snapshot);
                self.deadline = Some(Instant::now() + self.quiet_window);
            }
            AutosaveCommand::FlushNow { reply } => {
                self.deadline = None;
                self.spawn_flush(Some(reply));
            }
        }
    }

    fn spawn_flush(&mut self, reply: Option<oneshot::Sender<FlushOutcome>>) {
        let Some(snapshot) = self.latest.clone() else {
            if let Some(reply) = reply {
                let _ = reply.send(FlushOutcome::Idle);
            }
            return;
        };
        let flusher = self.flusher.clone();
        self.inflight.spawn(async move {
            let outcome = flusher.flush(&snapshot).await;
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        });
    }
}

/// Start the autosave actor on the current runtime.
pub fn spawn_autosave(flusher: Flusher, quiet_window: Duration) -> AutosaveHandle {
    let runtime = Handle::current();
    let (tx, rx) = mpsc::unbounded_channel();
    let actor = AutosaveActor {
        flusher,
        quiet_window,
        latest: None,
        deadline: None,
        inflight: InFlight::new(runtime.clone()),
    };
    runtime.spawn(actor.run(rx));
    AutosaveHandle { tx }
}
