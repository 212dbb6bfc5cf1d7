use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use tracing::{span, Level};

use crate::{
    batch_function::BatchFunction,
    cache::Cache,
    error::{LoadError, LoadResult},
    loader_op::LoadRequest,
};

/// A `LoaderWorker` is the "single-thread" worker task that actually does the
/// coalescing and loading work.
///
/// Once started, it runs in a loop until the parent Loader aborts its
/// `JoinHandle` or drops the request queue tx channel.
///
/// The worker can be in one of three states during its lifetime:
///
/// 1. Waiting for requests.
/// 2. Flushing the request queue and staging keys for loading.
/// 3. Executing its batch function.
///
/// One cycle through this loop may be called an "execution frame".
///
/// In state (1), the worker awaits any message on the request queue channel,
/// idling until work arrives.
///
/// In state (2), the worker synchronously pulls requests from the queue until
/// the queue reports empty, i.e. until no further `load` call was made in the
/// current scheduling turn. Every resolver the executor invoked during that
/// turn therefore contributes its keys to the same batch. Requests fully
/// answerable from the session cache are resolved immediately; keys not yet
/// cached are staged for loading.
///
/// In state (3), the worker deduplicates the staged keys (first-seen order)
/// and invokes its `BatchFunction` once with the distinct set. The per-key
/// results are written to the session cache and every pending request is then
/// resolved from the cache, so requests sharing a key observe the same
/// outcome. A batch-level failure — the function returning `Err`, or
/// breaking its length contract — is recorded for every staged key, leaving
/// no request unresolved.
pub struct LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Debug + Hash + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache,
    ContextT: Send + Sync + 'static,
{
    cache: CacheT,
    request_rx: mpsc::UnboundedReceiver<LoadRequest<K, V>>,
    keys_to_load: Vec<K>,
    pending_requests: Vec<LoadRequest<K, V>>,
    context: ContextT,
    phantom_batch_function: PhantomData<F>,
    debug_name: &'static str,
}

impl<K, V, F, CacheT, ContextT> LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Debug + Hash + Clone + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = LoadResult<V>>,
    ContextT: Send + Sync + 'static,
{
    pub fn new(
        cache: CacheT,
        request_rx: mpsc::UnboundedReceiver<LoadRequest<K, V>>,
        context: ContextT,
    ) -> Self {
        Self {
            cache,
            request_rx,
            keys_to_load: Vec::new(),
            pending_requests: Vec::new(),
            context,
            phantom_batch_function: PhantomData,
            debug_name: std::any::type_name::<(K, V)>(),
        }
    }

    pub async fn start(mut self) {
        let span = span!(Level::TRACE, "LoaderWorker", kv = self.debug_name);
        let _enter = span.enter();

        loop {
            // Async await until we receive the first request.
            match self.request_rx.recv().await {
                None => {
                    tracing::info!("Tx channel closed. Terminating LoaderWorker.");
                    return;
                }
                Some(request) => self.stage_request(request),
            }
            // Flush the remainder of the queue before executing the load.
            while let Some(Some(request)) = self.request_rx.recv().now_or_never() {
                self.stage_request(request);
            }
            if !self.pending_requests.is_empty() {
                self.execute_load().await;
            }
        }
    }

    #[tracing::instrument(skip(self))]
    fn stage_request(&mut self, request: LoadRequest<K, V>) {
        let cached = self.cache.get_key_vals(request.keys());
        let keys_to_load = cached
            .iter()
            .filter_map(|(k, v)| if v.is_none() { Some((*k).clone()) } else { None })
            .collect::<Vec<_>>();
        tracing::debug!(requested_keys = ?request.keys(), ?keys_to_load);
        if keys_to_load.is_empty() {
            let values = cached
                .into_iter()
                .map(|(_k, v)| v.cloned().unwrap_or(Err(LoadError::Disconnected)))
                .collect::<Vec<_>>();
            request.send_response(values);
        } else {
            self.keys_to_load.extend(keys_to_load);
            self.pending_requests.push(request);
        }
    }

    #[tracing::instrument(skip(self))]
    async fn execute_load(&mut self) {
        // Deduplicate by identity, preserving first-seen order.
        let mut seen = HashSet::with_capacity(self.keys_to_load.len());
        let distinct_keys = self
            .keys_to_load
            .drain(..)
            .filter(|k| seen.insert(k.clone()))
            .collect::<Vec<_>>();

        let results: Vec<LoadResult<V>> = match F::load(&distinct_keys, &self.context).await {
            Ok(values) if values.len() == distinct_keys.len() => {
                values.into_iter().map(Ok).collect()
            }
            Ok(values) => {
                let error = LoadError::contract(format!(
                    "returned {} results for {} distinct keys",
                    values.len(),
                    distinct_keys.len()
                ));
                tracing::error!(%error, "misaligned batch function result");
                vec![Err(error); distinct_keys.len()]
            }
            Err(error) => {
                tracing::debug!(%error, "batch function failed, failing the whole batch");
                vec![Err(error); distinct_keys.len()]
            }
        };
        tracing::debug!(batch_size = distinct_keys.len(), ?results);
        self.cache.insert_many(distinct_keys.into_iter().zip(results));

        for request in self.pending_requests.drain(..) {
            let values = self
                .cache
                .get(request.keys())
                .into_iter()
                .map(|slot| {
                    slot.cloned().unwrap_or_else(|| {
                        Err(LoadError::contract("no result slot for requested key"))
                    })
                })
                .collect::<Vec<_>>();
            request.send_response(values);
        }
    }
}
