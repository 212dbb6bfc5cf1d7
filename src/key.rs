use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity token addressing one entity within one loader's namespace,
/// carrying the data-source handle the batch function dispatches against.
///
/// Equality, ordering, and hashing consider the identity string only: two
/// keys with equal identities inside the same loader are the same logical
/// request and coalesce to one batch slot. Identity collisions across
/// loaders are harmless since each loader is its own namespace.
pub struct ResolverKey<S> {
    identity: Arc<str>,
    source: S,
}

impl<S> ResolverKey<S> {
    pub fn new(identity: impl Into<Arc<str>>, source: S) -> Self {
        Self { identity: identity.into(), source }
    }

    /// The stable identity string used for coalescing.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Handle to the data source this key should be fetched from.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: Clone> Clone for ResolverKey<S> {
    fn clone(&self) -> Self {
        Self { identity: Arc::clone(&self.identity), source: self.source.clone() }
    }
}

impl<S> PartialEq for ResolverKey<S> {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl<S> Eq for ResolverKey<S> {}

impl<S> Hash for ResolverKey<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl<S> fmt::Debug for ResolverKey<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResolverKey").field(&self.identity).finish()
    }
}

impl<S> fmt::Display for ResolverKey<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_the_source_handle() {
        let a = ResolverKey::new("42", "source-a");
        let b = ResolverKey::new("42", "source-b");
        let c = ResolverKey::new("7", "source-a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hashes_by_identity() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ResolverKey::new("42", ()));
        assert!(set.contains(&ResolverKey::new("42", ())));
        assert!(!set.contains(&ResolverKey::new("43", ())));
    }
}
