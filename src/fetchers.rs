use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    batch_function::BatchFunction,
    error::{LoadError, SourceError},
    key::ResolverKey,
    source::{Affiliation, Customer, Group, SourceHandle},
};

/// Key used by every entity loader: a stringified id plus the handle to the
/// data source it dispatches against.
pub type EntityKey = ResolverKey<SourceHandle>;

/// Per-request context threaded through every batch fetch.
///
/// Cancelling the token makes in-flight fetches fail fast with
/// [`LoadError::Cancelled`], which then fans out to the whole batch.
#[derive(Clone, Default)]
pub struct FetchContext {
    cancel: CancellationToken,
}

impl FetchContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

/// Parses every key identity into a numeric id.
///
/// One unparsable identity fails the whole batch: a malformed key is a
/// caller defect, not a per-key fetch outcome.
fn parse_ids(keys: &[EntityKey]) -> Result<Vec<u64>, LoadError> {
    keys.iter()
        .map(|key| {
            key.identity().parse::<u64>().map_err(|e| LoadError::KeyParse {
                identity: key.identity().to_owned(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Runs one bulk read under the context's cancellation token.
async fn run_fetch<T>(
    context: &FetchContext,
    fetch: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, LoadError> {
    if context.cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    tokio::select! {
        _ = context.cancel.cancelled() => Err(LoadError::Cancelled),
        result = fetch => result.map_err(LoadError::fetch),
    }
}

/// Fetches customers by id: one `WHERE id IN (...)` style read for the whole
/// batch, one `Option<Customer>` slot per requested id.
pub struct CustomerBatchFn;

#[async_trait]
impl BatchFunction<EntityKey, Customer> for CustomerBatchFn {
    type Context = FetchContext;

    async fn load(
        keys: &[EntityKey],
        context: &FetchContext,
    ) -> Result<Vec<Option<Customer>>, LoadError> {
        let source = match keys.first() {
            Some(key) => key.source(),
            None => return Ok(Vec::new()),
        };
        let ids = parse_ids(keys)?;
        let customers = run_fetch(context, source.customers_by_ids(&ids)).await?;
        tracing::debug!(batch_size = ids.len(), "customer batch");

        let mut by_id: HashMap<u64, Customer> =
            customers.into_iter().map(|c| (c.id, c)).collect();
        Ok(ids.iter().map(|id| by_id.remove(id)).collect())
    }
}

/// Fetches each customer's affiliations: one read across all requested
/// customer ids, grouped locally by customer.
///
/// A customer with no affiliation rows still gets a result — an empty list,
/// never not-found and never an omitted slot.
pub struct AffiliationsBatchFn;

#[async_trait]
impl BatchFunction<EntityKey, Vec<Affiliation>> for AffiliationsBatchFn {
    type Context = FetchContext;

    async fn load(
        keys: &[EntityKey],
        context: &FetchContext,
    ) -> Result<Vec<Option<Vec<Affiliation>>>, LoadError> {
        let source = match keys.first() {
            Some(key) => key.source(),
            None => return Ok(Vec::new()),
        };
        let customer_ids = parse_ids(keys)?;
        let affiliations =
            run_fetch(context, source.affiliations_by_customer_ids(&customer_ids)).await?;
        tracing::debug!(batch_size = customer_ids.len(), "affiliation batch");

        let mut by_customer: HashMap<u64, Vec<Affiliation>> = HashMap::new();
        for affiliation in affiliations {
            by_customer.entry(affiliation.customer_id).or_default().push(affiliation);
        }
        Ok(customer_ids
            .iter()
            .map(|id| Some(by_customer.remove(id).unwrap_or_default()))
            .collect())
    }
}

/// Fetches groups by id; same shape as [`CustomerBatchFn`].
pub struct GroupBatchFn;

#[async_trait]
impl BatchFunction<EntityKey, Group> for GroupBatchFn {
    type Context = FetchContext;

    async fn load(
        keys: &[EntityKey],
        context: &FetchContext,
    ) -> Result<Vec<Option<Group>>, LoadError> {
        let source = match keys.first() {
            Some(key) => key.source(),
            None => return Ok(Vec::new()),
        };
        let ids = parse_ids(keys)?;
        let groups = run_fetch(context, source.groups_by_ids(&ids)).await?;
        tracing::debug!(batch_size = ids.len(), "group batch");

        let mut by_id: HashMap<u64, Group> = groups.into_iter().map(|g| (g.id, g)).collect();
        Ok(ids.iter().map(|id| by_id.remove(id)).collect())
    }
}
