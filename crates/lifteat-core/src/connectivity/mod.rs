//! Bridges platform lifecycle events into the query client.
//!
//! The platform side is abstracted as an [`EventSource`]: something that
//! accepts listeners and hands back a teardown. [`EventHub`] is the in-process
//! implementation platform adapters push into.
//!
//! - [`ConnectivityObserver`]: network reachability to an [`OnlineSink`](crate::client::OnlineSink)
//! - [`AppStateObserver`]: foreground state to a [`FocusSink`](crate::client::FocusSink)
//!
//! Both hold a [`Subscription`] that is released on `deactivate` or drop.

pub mod app_state;
pub mod network;
pub mod source;

pub use app_state::{AppState, AppStateObserver};
pub use network::{ConnectionType, ConnectivityObserver, NetworkState};
pub use source::{subscribe, EventHub, EventSource, Listener, Subscription, Teardown};
