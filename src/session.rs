use tokio_util::sync::CancellationToken;

use crate::{
    fetchers::{AffiliationsBatchFn, CustomerBatchFn, EntityKey, FetchContext, GroupBatchFn},
    key::ResolverKey,
    loader::Loader,
    source::{Affiliation, Customer, Group, SourceHandle},
};

/// Per-query resolution state: one typed loader per entity type.
///
/// A `Session` is created at the start of one top-level query and dropped at
/// its end, taking every loader's cache with it — there is no cross-query
/// memoization. Field resolvers reach the right loader through the session
/// rather than through a stringly-keyed lookup in some shared context.
///
/// Sessions are usually wrapped in an `Arc` so deferred resolver tasks can
/// hold onto them.
pub struct Session {
    source: SourceHandle,
    cancel: CancellationToken,
    pub customers: Loader<EntityKey, Customer>,
    pub affiliations: Loader<EntityKey, Vec<Affiliation>>,
    pub groups: Loader<EntityKey, Group>,
}

impl Session {
    pub fn new(source: SourceHandle) -> Self {
        Self::with_cancellation(source, CancellationToken::new())
    }

    /// Creates a session whose fetches abort when `cancel` is cancelled.
    pub fn with_cancellation(source: SourceHandle, cancel: CancellationToken) -> Self {
        Self {
            customers: Loader::new(CustomerBatchFn, FetchContext::new(cancel.clone())),
            affiliations: Loader::new(AffiliationsBatchFn, FetchContext::new(cancel.clone())),
            groups: Loader::new(GroupBatchFn, FetchContext::new(cancel.clone())),
            source,
            cancel,
        }
    }

    /// Cancels every in-flight and future fetch of this session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn customer_key(&self, id: u64) -> EntityKey {
        ResolverKey::new(id.to_string(), self.source.clone())
    }

    pub fn group_key(&self, id: u64) -> EntityKey {
        ResolverKey::new(id.to_string(), self.source.clone())
    }
}
