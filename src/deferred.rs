use std::future::Future;

use tokio::sync::oneshot;

use crate::error::LoadError;

/// Two-phase field resolution handle.
///
/// Phase 1 ([`Deferred::spawn`]) registers demand: it starts an independent
/// unit of work that writes its single outcome to a one-shot channel and
/// returns immediately, so the executor can keep visiting sibling fields —
/// and those siblings can keep feeding keys into the same loader batch.
///
/// Phase 2 ([`Deferred::resolve`]) is invoked by the executor once every
/// same-turn resolver has had its chance to register; it blocks only on this
/// one outcome.
#[derive(Debug)]
pub struct Deferred<T> {
    outcome_rx: oneshot::Receiver<Result<T, LoadError>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Spawns `work` and returns a handle to its eventual outcome without
    /// awaiting it.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        tokio::task::spawn(async move {
            if outcome_tx.send(work.await).is_err() {
                tracing::debug!("deferred outcome dropped before resolution");
            }
        });
        Self { outcome_rx }
    }

    /// Consumes the handle and waits for the spawned work's outcome.
    pub async fn resolve(self) -> Result<T, LoadError> {
        self.outcome_rx.await.unwrap_or(Err(LoadError::Disconnected))
    }
}
