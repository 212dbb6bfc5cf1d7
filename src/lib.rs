mod batch_function;
mod cache;
mod deferred;
mod error;
mod key;
mod loader;
mod loader_op;
mod loader_worker;

pub mod fetchers;
pub mod graph;
pub mod session;
pub mod source;

pub use batch_function::BatchFunction;
pub use deferred::Deferred;
pub use error::{KeyFailure, LoadError, LoadResult, SourceError};
pub use key::ResolverKey;
pub use loader::Loader;
pub use session::Session;
