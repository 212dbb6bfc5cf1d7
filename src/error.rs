use thiserror::Error;

/// Outcome of loading a single key.
///
/// `Ok(Some(v))` is a fetched value, `Ok(None)` means the identity is valid
/// but no matching entity exists. Not-found is a value, not an error; callers
/// can always tell "the entity does not exist" apart from "the fetch could
/// not be performed".
pub type LoadResult<V> = Result<Option<V>, LoadError>;

/// Failure of a load request.
///
/// Errors are `Clone` because one batch-level failure is fanned out to every
/// pending request that contributed a key to that batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The key's identity could not be parsed as the identifier type the
    /// batch function expects. Shared by every key in the affected batch.
    #[error("key {identity:?} is not a valid identifier: {reason}")]
    KeyParse { identity: String, reason: String },

    /// The bulk read against the data source failed. Shared by every key in
    /// the affected batch; there is no partial-batch retry.
    #[error("batch fetch failed: {0}")]
    Fetch(String),

    /// The batch function broke its alignment contract, e.g. returned a
    /// result list whose length disagrees with the distinct key count.
    #[error("batch function contract violation: {0}")]
    Contract(String),

    /// The request context was cancelled while the fetch was in flight.
    #[error("load cancelled")]
    Cancelled,

    /// The loader (or a deferred resolver task) went away before delivering
    /// a result.
    #[error("loader shut down before the request resolved")]
    Disconnected,

    /// One or more constituents of a `load_many` failed.
    #[error("{}", format_failures(.0))]
    Aggregate(Vec<KeyFailure>),
}

impl LoadError {
    pub fn fetch(err: impl ToString) -> Self {
        LoadError::Fetch(err.to_string())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        LoadError::Contract(msg.into())
    }
}

/// A single constituent failure inside a [`LoadError::Aggregate`], retaining
/// which key failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: String,
    pub error: Box<LoadError>,
}

impl KeyFailure {
    pub fn new(key: impl Into<String>, error: LoadError) -> Self {
        Self { key: key.into(), error: Box::new(error) }
    }
}

fn format_failures(failures: &[KeyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("key {}: {}", f.key, f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Error raised by a [`DataSource`](crate::source::DataSource) bulk read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("query failed: {0}")]
    Query(String),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_joins_constituent_messages() {
        let err = LoadError::Aggregate(vec![
            KeyFailure::new("1", LoadError::fetch("connection reset")),
            KeyFailure::new("7", LoadError::Cancelled),
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("key 1: batch fetch failed: connection reset"));
        assert!(rendered.contains("key 7: load cancelled"));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn key_parse_names_the_offending_identity() {
        let err = LoadError::KeyParse {
            identity: "banana".to_owned(),
            reason: "invalid digit found in string".to_owned(),
        };
        assert!(err.to_string().contains("\"banana\""));
    }
}
