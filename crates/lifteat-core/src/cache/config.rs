use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::DataCategory;

/// Standard freshness windows.
pub mod durations {
    use std::time::Duration;

    pub const BRIEF: Duration = Duration::from_secs(60);
    pub const SHORT: Duration = Duration::from_secs(5 * 60);
    pub const MEDIUM: Duration = Duration::from_secs(15 * 60);
    pub const LONG: Duration = Duration::from_secs(60 * 60);
    pub const VERY_LONG: Duration = Duration::from_secs(6 * 60 * 60);
    pub const PERSISTENT: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Retries after the first failed attempt.
const DEFAULT_RETRY: u32 = 2;

/// Freshness and refetch policy for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long fetched data counts as fresh.
    pub stale_time: Duration,
    /// How long an entry survives without being read.
    pub gc_time: Duration,
    pub retry: u32,
    pub refetch_on_window_focus: bool,
    pub refetch_on_reconnect: bool,
}

impl CacheConfig {
    const fn new(stale_time: Duration, gc_time: Duration, refetch_on_window_focus: bool) -> Self {
        Self {
            stale_time,
            gc_time,
            retry: DEFAULT_RETRY,
            refetch_on_window_focus,
            refetch_on_reconnect: true,
        }
    }

    pub fn for_category(category: DataCategory) -> Self {
        use durations::*;

        match category {
            DataCategory::UserDetails => Self::new(MEDIUM, VERY_LONG, true),
            DataCategory::UserPreferences | DataCategory::UserContext => {
                Self::new(MEDIUM, LONG, true)
            }
            DataCategory::Meal | DataCategory::MealDetails | DataCategory::PlanDetails => {
                Self::new(MEDIUM, VERY_LONG, true)
            }
            DataCategory::MealsList | DataCategory::PlansList => Self::new(SHORT, LONG, true),
            // Ingredients rarely change
            DataCategory::IngredientsList => Self::new(LONG, PERSISTENT, false),
        }
    }

    pub fn with_overrides(mut self, overrides: &CacheOverrides) -> Self {
        if let Some(secs) = overrides.stale_secs {
            self.stale_time = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.gc_secs {
            self.gc_time = Duration::from_secs(secs);
        }
        if let Some(retry) = overrides.retry {
            self.retry = retry;
        }
        if let Some(focus) = overrides.refetch_on_window_focus {
            self.refetch_on_window_focus = focus;
        }
        if let Some(reconnect) = overrides.refetch_on_reconnect {
            self.refetch_on_reconnect = reconnect;
        }
        self
    }
}

/// Partial policy, as stored in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOverrides {
    pub stale_secs: Option<u64>,
    pub gc_secs: Option<u64>,
    pub retry: Option<u32>,
    pub refetch_on_window_focus: Option<bool>,
    pub refetch_on_reconnect: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredients_skip_focus_refetch() {
        let config = CacheConfig::for_category(DataCategory::IngredientsList);
        assert!(!config.refetch_on_window_focus);
        assert!(config.refetch_on_reconnect);
        assert_eq!(config.stale_time, durations::LONG);
        assert_eq!(config.gc_time, durations::PERSISTENT);
    }

    #[test]
    fn test_lists_go_stale_before_details() {
        let list = CacheConfig::for_category(DataCategory::MealsList);
        let details = CacheConfig::for_category(DataCategory::MealDetails);
        assert!(list.stale_time < details.stale_time);
    }

    #[test]
    fn test_every_category_retries_twice() {
        for category in DataCategory::ALL {
            assert_eq!(CacheConfig::for_category(category).retry, 2);
        }
    }

    #[test]
    fn test_overrides_only_touch_set_fields() {
        let overrides = CacheOverrides {
            stale_secs: Some(10),
            retry: Some(0),
            ..Default::default()
        };
        let base = CacheConfig::for_category(DataCategory::PlansList);
        let config = base.with_overrides(&overrides);

        assert_eq!(config.stale_time, Duration::from_secs(10));
        assert_eq!(config.retry, 0);
        assert_eq!(config.gc_time, base.gc_time);
        assert_eq!(config.refetch_on_window_focus, base.refetch_on_window_focus);
    }
}
