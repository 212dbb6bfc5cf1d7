use std::slice;

use tokio::sync::oneshot;

use crate::error::{LoadError, LoadResult};

/// A load operation queued for the `LoaderWorker`, pairing the requested
/// key(s) with the oneshot channel the eventual result is delivered on.
///
/// One `LoadRequest` exists per `load`/`load_many` call, even when several
/// requests share a key; every request sharing a key receives the same
/// resolved value (or the same error) once the batch completes.
#[derive(Debug)]
pub enum LoadRequest<K, V> {
    One(K, oneshot::Sender<LoadResult<V>>),
    Many(Vec<K>, oneshot::Sender<Vec<LoadResult<V>>>),
}

impl<K, V> LoadRequest<K, V>
where
    V: Send + Clone + std::fmt::Debug,
{
    pub fn keys(&self) -> &[K] {
        match self {
            LoadRequest::One(ref key, _) => slice::from_ref(key),
            LoadRequest::Many(ref keys, _) => keys,
        }
    }

    /// Resolves this request with one result per requested key, in key order.
    pub fn send_response(self, mut values: Vec<LoadResult<V>>) {
        match self {
            LoadRequest::One(_, response_tx) => {
                let response = if values.is_empty() {
                    Err(LoadError::Disconnected)
                } else {
                    values.swap_remove(0)
                };
                if response_tx.send(response).is_err() {
                    tracing::error!("receiver dropped");
                }
            }
            LoadRequest::Many(_, response_tx) => {
                if response_tx.send(values).is_err() {
                    tracing::error!("receiver dropped");
                }
            }
        }
    }
}
