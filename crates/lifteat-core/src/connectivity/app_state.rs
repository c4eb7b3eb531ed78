use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::source::{subscribe, EventSource, Subscription};
use crate::client::FocusSink;

/// Application lifecycle state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Active,
    Inactive,
    Background,
    Unknown,
}

impl AppState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, AppState::Active)
    }
}

/// Feeds a sink's focus flag from app lifecycle events.
pub struct AppStateObserver {
    subscription: Subscription,
}

impl AppStateObserver {
    pub fn activate<S, K>(source: &S, sink: Arc<K>) -> Self
    where
        S: EventSource<AppState> + ?Sized,
        K: FocusSink + ?Sized + 'static,
    {
        let subscription = subscribe(source, move |state: &AppState| {
            debug!(?state, "App state event");
            sink.set_focused(state.is_foreground());
        });
        Self { subscription }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn deactivate(&self) {
        self.subscription.unsubscribe();
    }
}
