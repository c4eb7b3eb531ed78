//! Warm the cache with essential data at startup.

use std::future::Future;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::QueryKey;
use crate::category::DataCategory;
use crate::client::query_client::{into_fetcher, Fetcher};
use crate::client::{QueryClient, QueryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrefetchPriority {
    High,
    Medium,
    Low,
}

pub struct PrefetchTask {
    pub name: String,
    pub priority: PrefetchPriority,
    pub key: QueryKey,
    pub category: DataCategory,
    fetcher: Fetcher,
}

impl PrefetchTask {
    pub fn new<T, F, Fut>(
        name: impl Into<String>,
        priority: PrefetchPriority,
        key: QueryKey,
        category: DataCategory,
        fetcher: F,
    ) -> Self
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            key,
            category,
            fetcher: into_fetcher(fetcher),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrefetchOptions {
    /// Keep going after a failed task.
    pub silent_errors: bool,
    /// Log every task as it starts.
    pub verbose: bool,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            silent_errors: true,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub total: usize,
    pub succeeded: usize,
    /// Task name and error message.
    pub failed: Vec<(String, String)>,
}

impl PrefetchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run prefetch tasks one at a time, highest priority first.
///
/// Keys that are already fresh are not refetched. `on_progress` receives
/// `(completed, total)` after each task.
pub async fn prefetch_essential_data(
    client: &QueryClient,
    mut tasks: Vec<PrefetchTask>,
    options: PrefetchOptions,
    on_progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
) -> Result<PrefetchReport, QueryError> {
    tasks.sort_by_key(|task| task.priority);

    let mut report = PrefetchReport {
        total: tasks.len(),
        ..Default::default()
    };
    info!(total = report.total, silent_errors = options.silent_errors, "Starting prefetch");

    for (index, task) in tasks.into_iter().enumerate() {
        if options.verbose {
            info!(task = %task.name, priority = ?task.priority, "Prefetching");
        }

        match client
            .fetch_value(task.key.clone(), task.category, task.fetcher)
            .await
        {
            Ok(_) => {
                debug!(task = %task.name, "Prefetch succeeded");
                report.succeeded += 1;
            }
            Err(e) => {
                warn!(task = %task.name, error = %e, "Prefetch failed");
                if !options.silent_errors {
                    return Err(e);
                }
                report.failed.push((task.name, e.to_string()));
            }
        }

        if let Some(on_progress) = on_progress {
            on_progress(index + 1, report.total);
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "Prefetch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_cache_key;
    use crate::config::ClientConfig;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn fast_client() -> QueryClient {
        QueryClient::from_config(&ClientConfig {
            retry_delay_ms: 0,
            max_retry_delay_ms: 0,
            ..Default::default()
        })
    }

    fn recording_task(
        name: &'static str,
        priority: PrefetchPriority,
        category: DataCategory,
        order: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> PrefetchTask {
        let order = Arc::clone(order);
        PrefetchTask::new(
            name,
            priority,
            build_cache_key(category, None, None),
            category,
            move || {
                order.lock().push(name);
                async move {
                    if fail {
                        anyhow::bail!("{} unavailable", name);
                    }
                    Ok(name.to_string())
                }
            },
        )
    }

    #[tokio::test]
    async fn test_runs_by_priority_and_reports_progress() {
        let client = fast_client();
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![
            recording_task("ingredients", PrefetchPriority::Low, DataCategory::IngredientsList, &order, false),
            recording_task("user", PrefetchPriority::High, DataCategory::UserDetails, &order, false),
            recording_task("meals", PrefetchPriority::Medium, DataCategory::MealsList, &order, false),
            recording_task("plan", PrefetchPriority::High, DataCategory::PlanDetails, &order, false),
        ];
        let progress = Mutex::new(Vec::new());
        let on_progress = |done: usize, total: usize| progress.lock().push((done, total));

        let report = prefetch_essential_data(&client, tasks, PrefetchOptions::default(), Some(&on_progress))
            .await
            .unwrap();

        assert!(report.all_succeeded());
        assert_eq!(report.succeeded, 4);
        assert_eq!(*order.lock(), vec!["user", "plan", "meals", "ingredients"]);
        assert_eq!(progress.lock().last(), Some(&(4, 4)));
        assert_eq!(client.len(), 4);
    }

    #[tokio::test]
    async fn test_silent_errors_continue() {
        let client = fast_client();
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![
            recording_task("user", PrefetchPriority::High, DataCategory::UserDetails, &order, true),
            recording_task("meals", PrefetchPriority::Low, DataCategory::MealsList, &order, false),
        ];

        let report = prefetch_essential_data(&client, tasks, PrefetchOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "user");
    }

    #[tokio::test]
    async fn test_loud_errors_abort() {
        let client = fast_client();
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![
            recording_task("user", PrefetchPriority::High, DataCategory::UserDetails, &order, true),
            recording_task("meals", PrefetchPriority::Low, DataCategory::MealsList, &order, false),
        ];
        let options = PrefetchOptions {
            silent_errors: false,
            ..Default::default()
        };

        let err = prefetch_essential_data(&client, tasks, options, None)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Fetch { .. }));
        // three attempts on "user", "meals" never started
        assert_eq!(*order.lock(), vec!["user", "user", "user"]);
    }

    #[tokio::test]
    async fn test_fresh_keys_are_skipped() {
        let client = fast_client();
        let key = build_cache_key(DataCategory::UserDetails, None, None);
        client.set_query_data(key, DataCategory::UserDetails, &"cached").unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![recording_task("user", PrefetchPriority::High, DataCategory::UserDetails, &order, false)];
        let report = prefetch_essential_data(&client, tasks, PrefetchOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(order.lock().is_empty());
    }
}
