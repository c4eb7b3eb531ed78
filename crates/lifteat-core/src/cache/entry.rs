use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::DataCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Fetching,
    /// Waiting for the network to come back.
    Paused,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub category: DataCategory,
    pub data: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub status: FetchStatus,
    pub invalidated: bool,
    pub failure_count: u32,
    pub error: Option<String>,
}

impl CacheEntry {
    pub fn new(category: DataCategory) -> Self {
        Self {
            category,
            data: None,
            updated_at: None,
            last_accessed: Utc::now(),
            status: FetchStatus::Idle,
            invalidated: false,
            failure_count: 0,
            error: None,
        }
    }

    pub(crate) fn store(&mut self, data: Value) {
        let now = Utc::now();
        self.data = Some(data);
        self.updated_at = Some(now);
        self.last_accessed = now;
        self.status = FetchStatus::Idle;
        self.invalidated = false;
        self.failure_count = 0;
        self.error = None;
    }

    pub(crate) fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Minutes since the last successful fetch.
    pub fn age_minutes(&self) -> Option<i64> {
        self.updated_at
            .map(|updated_at| (Utc::now() - updated_at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        let Some(minutes) = self.age_minutes() else {
            return "never".to_string();
        };

        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }
        match self.updated_at {
            Some(updated_at) => elapsed_since(updated_at) > stale_time,
            None => true,
        }
    }

    pub fn is_expired(&self, gc_time: Duration) -> bool {
        elapsed_since(self.last_accessed) > gc_time
    }
}

fn elapsed_since(instant: DateTime<Utc>) -> Duration {
    // Negative deltas (clock skew) count as zero
    (Utc::now() - instant).to_std().unwrap_or(Duration::ZERO)
}
