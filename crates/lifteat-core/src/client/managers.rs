//! Online and focus flags.
//!
//! Both are `watch` channels so background workers can await transitions
//! while setters stay synchronous.

use tokio::sync::watch;
use tracing::info;

/// Receives the device's reachability.
pub trait OnlineSink: Send + Sync {
    fn set_online(&self, online: bool);
}

/// Receives whether the app is in the foreground.
pub trait FocusSink: Send + Sync {
    fn set_focused(&self, focused: bool);
}

#[derive(Debug)]
struct WatchFlag {
    tx: watch::Sender<bool>,
}

impl WatchFlag {
    fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns whether the value changed.
    fn set(&self, value: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[derive(Debug)]
pub struct OnlineManager {
    flag: WatchFlag,
}

impl OnlineManager {
    pub fn new(online: bool) -> Self {
        Self {
            flag: WatchFlag::new(online),
        }
    }

    pub fn is_online(&self) -> bool {
        self.flag.get()
    }

    /// Update the flag, returning `true` on an actual transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.flag.set(online);
        if changed {
            info!(online, "Network status changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for OnlineManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OnlineSink for OnlineManager {
    fn set_online(&self, online: bool) {
        OnlineManager::set_online(self, online);
    }
}

#[derive(Debug)]
pub struct FocusManager {
    flag: WatchFlag,
}

impl FocusManager {
    pub fn new(focused: bool) -> Self {
        Self {
            flag: WatchFlag::new(focused),
        }
    }

    pub fn is_focused(&self) -> bool {
        self.flag.get()
    }

    pub fn set_focused(&self, focused: bool) -> bool {
        let changed = self.flag.set(focused);
        if changed {
            info!(focused, "App focus changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FocusSink for FocusManager {
    fn set_focused(&self, focused: bool) {
        FocusManager::set_focused(self, focused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_online_reports_transitions_only() {
        let manager = OnlineManager::default();
        assert!(manager.is_online());
        assert!(!manager.set_online(true));
        assert!(manager.set_online(false));
        assert!(!manager.is_online());
        assert!(!manager.set_online(false));
        assert!(manager.set_online(true));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let manager = OnlineManager::new(false);
        let mut rx = manager.subscribe();

        manager.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn test_focus_manager() {
        let manager = FocusManager::default();
        assert!(manager.set_focused(false));
        assert!(!manager.is_focused());
    }
}
