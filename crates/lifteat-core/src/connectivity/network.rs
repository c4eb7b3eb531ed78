use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::source::{subscribe, EventSource, Subscription};
use crate::client::OnlineSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Unknown,
    None,
    Wifi,
    Cellular,
    Ethernet,
    Other,
}

/// Network status as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    /// `None` while the platform has not determined reachability.
    pub is_connected: Option<bool>,
    pub kind: ConnectionType,
}

impl NetworkState {
    pub fn connected(kind: ConnectionType) -> Self {
        Self {
            is_connected: Some(true),
            kind,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            is_connected: Some(false),
            kind: ConnectionType::None,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    /// Only a definite connected report counts as online.
    pub fn is_online(&self) -> bool {
        self.is_connected == Some(true)
    }
}

/// Keeps a sink's online flag in step with platform connectivity.
///
/// Every platform event is forwarded once, in delivery order. The observer
/// makes no retry decisions; reacting to reconnects is up to the sink.
pub struct ConnectivityObserver {
    subscription: Subscription,
}

impl ConnectivityObserver {
    pub fn activate<S, K>(source: &S, sink: Arc<K>) -> Self
    where
        S: EventSource<NetworkState> + ?Sized,
        K: OnlineSink + ?Sized + 'static,
    {
        let subscription = subscribe(source, move |state: &NetworkState| {
            let online = state.is_online();
            debug!(kind = ?state.kind, connected = ?state.is_connected, online, "Connectivity event");
            sink.set_online(online);
        });
        info!("Connectivity observer activated");
        Self { subscription }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Safe to call more than once; dropping the observer does the same.
    pub fn deactivate(&self) {
        if self.subscription.is_active() {
            info!("Connectivity observer deactivated");
        }
        self.subscription.unsubscribe();
    }
}
