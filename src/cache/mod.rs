//! Hierarchical result cache
//!
//! The cache has three pieces: a path codec deriving cache paths from query
//! URLs, an in-memory tree of results that only grows within a run, and a
//! disk layer persisting each completed subtree to a JSON file so later runs
//! skip the network for paths already fetched.

mod disk;
mod path;
mod store;

pub use disk::DiskCache;
pub use path::{CachePath, CachePathError};
pub use store::{CacheStore, Payload};
