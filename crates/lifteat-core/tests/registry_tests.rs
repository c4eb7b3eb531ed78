use std::sync::Arc;

use lifteat_core::registry::{self, invalidate_category};
use lifteat_core::{
    build_cache_key, ClientRegistry, DataCategory, InvalidateOptions, KeySegment, QueryClient,
};
use serial_test::serial;

fn reset_global() {
    ClientRegistry::global().clear();
}

#[test]
#[serial]
fn test_get_before_bootstrap_returns_none() {
    reset_global();
    assert!(registry::get_client().is_none());
    assert!(!ClientRegistry::global().is_initialized());
}

#[test]
#[serial]
fn test_bootstrap_then_reload_replaces_client() {
    reset_global();
    assert!(registry::get_client().is_none());

    let instance_a = Arc::new(QueryClient::new());
    assert!(registry::set_client(Arc::clone(&instance_a)).is_none());
    assert!(Arc::ptr_eq(&registry::get_client().unwrap(), &instance_a));

    // development reload registers a fresh client
    let instance_b = Arc::new(QueryClient::new());
    let replaced = registry::set_client(Arc::clone(&instance_b)).unwrap();
    assert!(Arc::ptr_eq(&replaced, &instance_a));
    assert!(Arc::ptr_eq(&registry::get_client().unwrap(), &instance_b));
}

#[test]
#[serial]
fn test_generation_counts_every_registration() {
    reset_global();
    let before = ClientRegistry::global().generation();

    registry::set_client(Arc::new(QueryClient::new()));
    registry::set_client(Arc::new(QueryClient::new()));

    assert_eq!(ClientRegistry::global().generation(), before + 2);
}

#[tokio::test]
#[serial]
async fn test_invalidate_category_is_noop_before_bootstrap() {
    reset_global();
    let count = invalidate_category(DataCategory::MealsList, &InvalidateOptions::default()).await;
    assert_eq!(count, 0);
}

#[tokio::test]
#[serial]
async fn test_invalidate_category_reaches_registered_client() {
    reset_global();
    let client = Arc::new(QueryClient::new());
    let key = build_cache_key(DataCategory::PlanDetails, Some(KeySegment::from(8)), None);
    client
        .set_query_data(key.clone(), DataCategory::PlanDetails, &"plan")
        .unwrap();
    registry::set_client(Arc::clone(&client));

    let count = invalidate_category(DataCategory::PlanDetails, &InvalidateOptions::for_id(8)).await;

    assert_eq!(count, 1);
    assert!(client.get_entry(&key).unwrap().invalidated);
    reset_global();
}
