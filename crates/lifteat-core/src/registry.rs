//! Process-wide access to the shared query client.
//!
//! Code that is built with a `QueryClient` should receive it explicitly.
//! The registry exists for callers that cannot be handed one, such as
//! notification handlers or deeply nested background helpers.
//!
//! Contract: bootstrap registers the client once; everyone else only
//! reads. A second registration replaces the first (last writer wins), which
//! is what a re-initialization such as a development reload needs. The
//! replacement is logged at WARN so an unintended double bootstrap shows up.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use lifteat_core::{ClientRegistry, QueryClient};
//!
//! let registry = ClientRegistry::new();
//! assert!(registry.get_client().is_none());
//!
//! let client = Arc::new(QueryClient::new());
//! registry.set_client(Arc::clone(&client));
//! assert!(Arc::ptr_eq(&registry.get_client().unwrap(), &client));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::category::DataCategory;
use crate::client::QueryClient;
use crate::invalidation::{invalidate_cache, InvalidateOptions};

static GLOBAL_REGISTRY: Lazy<ClientRegistry> = Lazy::new(ClientRegistry::new);

#[derive(Debug, Default)]
pub struct ClientRegistry {
    slot: RwLock<Option<Arc<QueryClient>>>,
    generation: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static ClientRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register the shared client, returning the one it replaces.
    pub fn set_client(&self, client: Arc<QueryClient>) -> Option<Arc<QueryClient>> {
        let previous = self.slot.write().replace(client);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if previous.is_some() {
            warn!(generation, "Query client replaced in registry");
        } else {
            info!(generation, "Query client registered");
        }
        previous
    }

    /// The shared client, or `None` before bootstrap.
    pub fn get_client(&self) -> Option<Arc<QueryClient>> {
        self.slot.read().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Number of `set_client` calls so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn clear(&self) -> Option<Arc<QueryClient>> {
        self.slot.write().take()
    }

    /// Invalidate a category on the registered client.
    ///
    /// Before bootstrap nothing has been cached, so this is a no-op that
    /// returns 0.
    pub async fn invalidate_category(
        &self,
        category: DataCategory,
        options: &InvalidateOptions,
    ) -> usize {
        match self.get_client() {
            Some(client) => invalidate_cache(&client, category, options).await,
            None => {
                debug!(%category, "No query client registered, skipping invalidation");
                0
            }
        }
    }
}

/// Register the process-wide client.
pub fn set_client(client: Arc<QueryClient>) -> Option<Arc<QueryClient>> {
    ClientRegistry::global().set_client(client)
}

/// The process-wide client, or `None` before bootstrap.
pub fn get_client() -> Option<Arc<QueryClient>> {
    ClientRegistry::global().get_client()
}

/// Invalidate a category on the process-wide client, if there is one.
pub async fn invalidate_category(category: DataCategory, options: &InvalidateOptions) -> usize {
    ClientRegistry::global()
        .invalidate_category(category, options)
        .await
}
