//! Category-scoped cache invalidation.
//!
//! Invalidation marks entries stale; they are refetched the next time they
//! are read, or immediately when `refetch` is set and the device is online.

use tracing::info;

use crate::cache::{KeySegment, QueryKey};
use crate::category::DataCategory;
use crate::client::{QueryClient, QueryFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidateOptions {
    /// Restrict to entries of one entity.
    pub id: Option<KeySegment>,
    /// Invalidate exactly this key and nothing else.
    pub exact: Option<QueryKey>,
    /// Also invalidate [`DataCategory::related`] categories, with the same id.
    pub invalidate_related: bool,
    /// Refetch invalidated entries right away when online.
    pub refetch: bool,
}

impl InvalidateOptions {
    pub fn for_id(id: impl Into<KeySegment>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn exact(key: QueryKey) -> Self {
        Self {
            exact: Some(key),
            ..Default::default()
        }
    }

    pub fn with_related(mut self) -> Self {
        self.invalidate_related = true;
        self
    }

    pub fn with_refetch(mut self) -> Self {
        self.refetch = true;
        self
    }
}

fn category_filter(category: DataCategory, id: Option<&KeySegment>) -> QueryFilter {
    match id {
        Some(id) => QueryFilter::CategoryWithId(category, id.clone()),
        None => QueryFilter::Category(category),
    }
}

/// Invalidate cached queries of `category`. Returns how many were marked.
pub async fn invalidate_cache(
    client: &QueryClient,
    category: DataCategory,
    options: &InvalidateOptions,
) -> usize {
    let mut filters = Vec::new();

    if let Some(exact) = &options.exact {
        filters.push(QueryFilter::Exact(exact.clone()));
    } else {
        filters.push(category_filter(category, options.id.as_ref()));
        if options.invalidate_related {
            filters.extend(
                category
                    .related()
                    .iter()
                    .map(|related| category_filter(*related, options.id.as_ref())),
            );
        }
    }

    let invalidated: usize = filters
        .iter()
        .map(|filter| client.invalidate_queries(filter))
        .sum();

    info!(
        %category,
        id = ?options.id,
        exact = ?options.exact.as_ref().map(|k| k.to_string()),
        related = options.invalidate_related,
        invalidated,
        "Invalidated cache"
    );

    if options.refetch && client.is_online() {
        for filter in &filters {
            client.refetch_queries(filter).await;
        }
    }

    invalidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_cache_key;

    fn seeded_client() -> QueryClient {
        let client = QueryClient::new();
        let entries = [
            (DataCategory::MealsList, None),
            (DataCategory::MealDetails, Some(1)),
            (DataCategory::MealDetails, Some(2)),
            (DataCategory::Meal, Some(1)),
            (DataCategory::PlansList, None),
        ];
        for (category, id) in entries {
            let key = build_cache_key(category, id.map(KeySegment::from), None);
            client.set_query_data(key, category, &"cached").unwrap();
        }
        client
    }

    fn is_stale(client: &QueryClient, category: DataCategory, id: Option<i64>) -> bool {
        let key = build_cache_key(category, id.map(KeySegment::from), None);
        let entry = client.get_entry(&key).unwrap();
        entry.is_stale(client.config_for(category).stale_time)
    }

    #[tokio::test]
    async fn test_whole_category() {
        let client = seeded_client();
        let count = invalidate_cache(&client, DataCategory::MealDetails, &InvalidateOptions::default()).await;

        assert_eq!(count, 2);
        assert!(is_stale(&client, DataCategory::MealDetails, Some(1)));
        assert!(is_stale(&client, DataCategory::MealDetails, Some(2)));
        assert!(!is_stale(&client, DataCategory::MealsList, None));
    }

    #[tokio::test]
    async fn test_single_id() {
        let client = seeded_client();
        let count = invalidate_cache(&client, DataCategory::MealDetails, &InvalidateOptions::for_id(2)).await;

        assert_eq!(count, 1);
        assert!(!is_stale(&client, DataCategory::MealDetails, Some(1)));
        assert!(is_stale(&client, DataCategory::MealDetails, Some(2)));
    }

    #[tokio::test]
    async fn test_related_cascade_is_one_level() {
        let client = seeded_client();
        let options = InvalidateOptions::for_id(1).with_related();
        let count = invalidate_cache(&client, DataCategory::Meal, &options).await;

        // meal 1, meal-details 1; the list has no id segment so it stays fresh
        assert_eq!(count, 2);
        assert!(is_stale(&client, DataCategory::Meal, Some(1)));
        assert!(is_stale(&client, DataCategory::MealDetails, Some(1)));
        assert!(!is_stale(&client, DataCategory::MealDetails, Some(2)));

        let count = invalidate_cache(
            &client,
            DataCategory::MealDetails,
            &InvalidateOptions::default().with_related(),
        )
        .await;
        assert_eq!(count, 3);
        assert!(is_stale(&client, DataCategory::MealsList, None));
        assert!(!is_stale(&client, DataCategory::PlansList, None));
    }

    #[tokio::test]
    async fn test_exact_ignores_related() {
        let client = seeded_client();
        let key = build_cache_key(DataCategory::Meal, Some(1.into()), None);
        let options = InvalidateOptions::exact(key).with_related();

        let count = invalidate_cache(&client, DataCategory::Meal, &options).await;
        assert_eq!(count, 1);
        assert!(!is_stale(&client, DataCategory::MealDetails, Some(1)));
    }

    #[tokio::test]
    async fn test_refetch_after_invalidate() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let key = build_cache_key(DataCategory::UserPreferences, None, None);

        let _: u32 = client
            .fetch_query(key.clone(), DataCategory::UserPreferences, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(1u32) }
            })
            .await
            .unwrap();

        let options = InvalidateOptions::default().with_refetch();
        invalidate_cache(&client, DataCategory::UserPreferences, &options).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!is_stale(&client, DataCategory::UserPreferences, None));
    }
}
