//! The caching client.
//!
//! `QueryClient` stores category-tagged query results and decides when they
//! are refetched: on demand when stale, on reconnect for queries paused
//! while offline, and on focus regain. Online and focus state live in
//! `OnlineManager` / `FocusManager`, which the connectivity observers feed
//! through the `OnlineSink` and `FocusSink` traits.

pub mod error;
pub mod filter;
pub mod managers;
pub mod query_client;

pub use error::QueryError;
pub use filter::QueryFilter;
pub use managers::{FocusManager, FocusSink, OnlineManager, OnlineSink};
pub use query_client::{QueryClient, QuerySnapshot, RetryPolicy};
