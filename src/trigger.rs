//! Coalescing rebuild triggers.
//!
//! Startup and "content updated" notifications both funnel into a
//! [`RebuildTrigger`]. A single worker task runs rebuilds one after another;
//! at most one further rebuild can be queued behind the one in flight, and
//! triggers arriving while one is already queued are absorbed by it.
//!
//! A failed rebuild is logged and the worker keeps going. The previous
//! snapshot stays live.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::RebuildStatus;
use crate::service::IndexService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Startup,
    ContentUpdated,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Startup => write!(f, "startup"),
            TriggerReason::ContentUpdated => write!(f, "content-updated"),
        }
    }
}

/// Outcome of the most recent triggered rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Idle,
    Rebuilt(RebuildStatus),
    Failed(String),
}

pub struct RebuildTrigger {
    tx: mpsc::Sender<TriggerReason>,
    outcome: watch::Receiver<(u64, TriggerOutcome)>,
    worker: JoinHandle<()>,
}

impl RebuildTrigger {
    /// Start the worker. Must be called inside a Tokio runtime.
    pub fn spawn(service: Arc<IndexService>) -> Self {
        let (tx, mut rx) = mpsc::channel::<TriggerReason>(1);
        let (outcome_tx, outcome) = watch::channel((0u64, TriggerOutcome::Idle));

        let worker = tokio::spawn(async move {
            let mut runs = 0u64;
            while let Some(reason) = rx.recv().await {
                tracing::info!(%reason, "rebuild triggered");
                runs += 1;
                let result = match service.rebuild().await {
                    Ok(status) => TriggerOutcome::Rebuilt(status),
                    Err(e) => {
                        tracing::error!(%reason, error = %e, "triggered rebuild failed");
                        TriggerOutcome::Failed(e.to_string())
                    }
                };
                let _ = outcome_tx.send((runs, result));
            }
        });

        Self {
            tx,
            outcome,
            worker,
        }
    }

    /// Request a rebuild. Returns `false` when the request was absorbed by
    /// one already queued (or the worker has stopped).
    pub fn trigger(&self, reason: TriggerReason) -> bool {
        match self.tx.try_send(reason) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(%reason, "rebuild already pending; trigger coalesced");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(%reason, "rebuild worker has stopped; trigger dropped");
                false
            }
        }
    }

    /// Subscribe to `(completed runs, last outcome)` updates.
    pub fn outcomes(&self) -> watch::Receiver<(u64, TriggerOutcome)> {
        self.outcome.clone()
    }

    /// Stop accepting triggers and wait for queued work to drain.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "rebuild worker terminated abnormally");
        }
    }
}
