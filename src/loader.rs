use std::hash::Hash;
use std::ops::Drop;
use std::{collections::HashMap, fmt::Debug};

use tokio::sync::{mpsc, oneshot};

use crate::{
    batch_function::BatchFunction,
    error::{KeyFailure, LoadError, LoadResult},
    loader_op::LoadRequest,
    loader_worker::LoaderWorker,
};

/// Coalesces individual key requests into batched fetches against some
/// expensive resource, primarily to mitigate the N+1 problem of per-field
/// graph resolution.
///
/// Callers invoke [`Loader::load`] and [`Loader::load_many`] from any number
/// of concurrent tasks; the loader enqueues each request for its worker task,
/// which drains the queue once per execution frame, fetches every distinct
/// key it saw in a single `BatchFunction` call, and resolves each request
/// through its own response channel. No caller can tell that its request was
/// merged with others.
///
/// Results are cached for the lifetime of the loader, which is expected to
/// match one resolution session: a key resolved once is never fetched again
/// through the same loader.
pub struct Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    request_tx: mpsc::UnboundedSender<LoadRequest<K, V>>,
    load_task_handle: tokio::task::JoinHandle<()>,
}

impl<K, V> Drop for Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    fn drop(&mut self) {
        self.load_task_handle.abort();
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Hash + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
{
    /// Creates a new Loader for the provided BatchFunction and Context type.
    ///
    /// Note: the batch function is passed in as a marker for type inference.
    pub fn new<F, ContextT>(_: F, context: ContextT) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            request_tx: tx,
            load_task_handle: tokio::task::spawn(
                LoaderWorker::<K, V, F, HashMap<K, LoadResult<V>>, ContextT>::new(
                    HashMap::new(),
                    rx,
                    context,
                )
                .start(),
            ),
        }
    }

    /// Loads the value addressed by `key`.
    ///
    /// Returns `Ok(Some(value))` on a hit, `Ok(None)` if the key addresses no
    /// entity, and `Err` if the batch the key rode in failed.
    ///
    /// If the key was already resolved earlier in this session, the cached
    /// result is returned as soon as the worker processes the request and the
    /// key takes no part in a new batch. Otherwise the key joins the batch
    /// accumulating in the current execution frame.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        let (response_tx, response_rx) = oneshot::channel();
        if self.request_tx.send(LoadRequest::One(key, response_tx)).is_err() {
            return Err(LoadError::Disconnected);
        }
        response_rx.await.unwrap_or(Err(LoadError::Disconnected))
    }

    /// Loads many values at once; semantically one `load` per key, completed
    /// when every constituent completes.
    ///
    /// On success the returned values align with the input keys. If any
    /// constituent fails, the whole call fails with
    /// [`LoadError::Aggregate`], which names each failed key alongside its
    /// error.
    pub async fn load_many(&self, keys: Vec<K>) -> Result<Vec<Option<V>>, LoadError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let (response_tx, response_rx) = oneshot::channel();
        if self.request_tx.send(LoadRequest::Many(keys.clone(), response_tx)).is_err() {
            return Err(LoadError::Disconnected);
        }
        let results = match response_rx.await {
            Ok(results) => results,
            Err(_) => return Err(LoadError::Disconnected),
        };

        let mut values = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(value) => values.push(value),
                Err(error) => failures.push(KeyFailure::new(format!("{key:?}"), error)),
            }
        }
        if failures.is_empty() {
            Ok(values)
        } else {
            Err(LoadError::Aggregate(failures))
        }
    }
}
