//! Client-side data synchronization for Lift Eat.
//!
//! This crate keeps cached query results in step with the device's
//! connectivity and the user's edits:
//!
//! - [`DataCategory`]: the closed set of tags every cached query carries
//! - [`QueryClient`]: the query cache, with retry, pause-while-offline and
//!   refetch on reconnect or focus
//! - [`ConnectivityObserver`] / [`AppStateObserver`]: feed platform events
//!   into the client's online and focus flags
//! - [`ClientRegistry`]: reach the shared client from code that was not
//!   handed one
//! - [`invalidate_cache`]: category-scoped invalidation, optionally
//!   cascading to related categories
//! - [`prefetch_essential_data`]: startup warm-up
//!
//! Bootstrap usually looks like:
//!
//! ```no_run
//! use std::sync::Arc;
//! use lifteat_core::{
//!     registry, telemetry, ClientConfig, ConnectivityObserver, EventHub, NetworkState, QueryClient,
//! };
//!
//! # async fn bootstrap() -> anyhow::Result<()> {
//! let config = ClientConfig::load()?;
//! telemetry::init_tracing(config.log_filter.as_deref().unwrap_or("warn"));
//!
//! let client = Arc::new(QueryClient::from_config(&config));
//! registry::set_client(Arc::clone(&client));
//! let _worker = client.spawn_lifecycle_worker();
//!
//! let network = EventHub::<NetworkState>::new();
//! let _observer = ConnectivityObserver::activate(&network, Arc::clone(&client));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod category;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod invalidation;
pub mod prefetch;
pub mod registry;
pub mod telemetry;

pub use cache::{build_cache_key, CacheConfig, CacheEntry, CacheOverrides, FetchStatus, KeySegment, QueryKey};
pub use category::{DataCategory, UnknownCategory};
pub use client::{
    FocusManager, FocusSink, OnlineManager, OnlineSink, QueryClient, QueryError, QueryFilter,
    QuerySnapshot, RetryPolicy,
};
pub use config::ClientConfig;
pub use connectivity::{
    AppState, AppStateObserver, ConnectionType, ConnectivityObserver, EventHub, EventSource,
    NetworkState, Subscription,
};
pub use invalidation::{invalidate_cache, InvalidateOptions};
pub use prefetch::{prefetch_essential_data, PrefetchOptions, PrefetchPriority, PrefetchReport, PrefetchTask};
pub use registry::{get_client, set_client, ClientRegistry};
