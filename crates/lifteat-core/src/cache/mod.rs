//! Cache building blocks shared by the query client.
//!
//! - `QueryKey` / `KeySegment`: structured keys and the standard key builder
//! - `CacheConfig`: per-category freshness policy, with file overrides
//! - `CacheEntry`: one cached query result plus its fetch state
//!
//! Entries store their payload as JSON values, so any `Serialize` type can
//! be cached and read back through `DeserializeOwned`.

pub mod config;
pub mod entry;
pub mod key;

pub use config::{durations, CacheConfig, CacheOverrides};
pub use entry::{CacheEntry, FetchStatus};
pub use key::{build_cache_key, KeySegment, QueryKey};
