use async_trait::async_trait;

use crate::error::LoadError;

/// A `BatchFunction` defines how a `Loader` fetches a batch of values from
/// the underlying resource. It receives the deduplicated slice of keys that
/// accumulated during the loader's most recent execution frame, plus a user
/// defined context struct, and performs exactly one bulk read for all of
/// them.
///
/// Contract: on success the returned list must contain exactly one slot per
/// input key, in input order. `Some(value)` is a fetched entity; `None` means
/// the key addressed no entity (not-found is a value, not an error). A length
/// mismatch is treated by the loader as an unrecoverable contract violation
/// for that batch.
///
/// Returning `Err` fails the batch as a whole: the same error is fanned out
/// to every request that contributed a key. There is no partial-batch retry;
/// retry policy, if any, belongs to the resource behind the function.
///
/// Multiple `BatchFunction`s (and therefore loaders) can share the same
/// context, likely through an `Arc`.
#[async_trait]
pub trait BatchFunction<K, V> {
    type Context;
    async fn load(keys: &[K], context: &Self::Context) -> Result<Vec<Option<V>>, LoadError>;
}
