//! Smoke tests for data loaders composed the way applications use them.

use std::sync::Arc;
use std::thread;

use serde_json::json;

use pagewise_test_utils::{
    assertions::{assert_delegate_overflow, assert_fetch_error, assert_invalid_config},
    fixtures, init_test_tracing, CappedLoader, DataLoader, FailingLoader, FetchError,
    FetchLimitOvercomer, FetchRange, Filter, LoaderError, LoaderExt, OverflowingLoader,
    RecordingLoader, SortClause,
};

// ============================================================================
// CONCURRENT USE
// ============================================================================

#[test]
fn test_concurrent_fetches_share_one_decorator() {
    init_test_tracing();
    let loader = Arc::new(
        FetchLimitOvercomer::new(CappedLoader::new(fixtures::numbered(1000), 7), 7).unwrap(),
    );

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let loader = Arc::clone(&loader);
            thread::spawn(move || {
                let start = i * 50;
                let records = loader
                    .fetch(None, &[], FetchRange::new(start, 300).unwrap())
                    .unwrap();
                (start, records, loader.count(None).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (start, records, total) = handle.join().unwrap();
        assert_eq!(records, (start..start + 300).collect::<Vec<_>>());
        assert_eq!(total, 1000);
    }
}

#[test]
fn test_concurrent_fetches_through_recording_delegate() {
    let delegate = Arc::new(RecordingLoader::new(fixtures::numbered(100)));
    let loader = Arc::new(FetchLimitOvercomer::new(Arc::clone(&delegate), 10).unwrap());

    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let loader = Arc::clone(&loader);
            thread::spawn(move || {
                loader
                    .fetch(None, &[], FetchRange::new(i * 25, 25).unwrap())
                    .unwrap()
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());

    // Each 25-record window takes ceil(25 / 10) = 3 delegate calls
    assert_eq!(delegate.fetch_count(), 12);
    assert!(delegate.fetch_ranges().iter().all(|range| range.len() <= 10));
}

// ============================================================================
// JSON RECORDS
// ============================================================================

#[test]
fn test_nested_property_filter_through_decorator() {
    let loader = CappedLoader::new(fixtures::json_records(40), 4)
        .overcome_fetch_limit(4)
        .unwrap();

    let filter = Filter::eq("address.zip", "10003");
    let matches = loader
        .fetch_all(Some(&filter), &[SortClause::desc("id")])
        .unwrap();

    let ids: Vec<_> = matches.iter().map(|record| record["id"].clone()).collect();
    assert_eq!(ids, vec![json!(33), json!(23), json!(13), json!(3)]);
}

fn names(people: &[pagewise_test_utils::Person]) -> Vec<&str> {
    people.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_capped_backend_serves_full_listing() {
    init_test_tracing();
    let backend = CappedLoader::new(fixtures::people_loader(), 3);

    // Without the decorator the backend silently truncates
    let truncated = backend.fetch(None, &[], FetchRange::first(8)).unwrap();
    assert_eq!(truncated.len(), 3);

    let loader = FetchLimitOvercomer::new(&backend, 3).unwrap();
    let all = loader
        .fetch(None, &[SortClause::asc("name")], FetchRange::first(8))
        .unwrap();
    assert_eq!(
        names(&all),
        vec!["Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi"]
    );
}

#[test]
fn test_filtered_sorted_window_through_decorator() {
    init_test_tracing();
    let loader = CappedLoader::new(fixtures::people_loader(), 2)
        .overcome_fetch_limit(2)
        .unwrap();

    let filter = Filter::ne("city", "Lisbon");
    let sort = [SortClause::desc("age"), SortClause::asc("name")];
    let page = loader
        .fetch(Some(&filter), &sort, FetchRange::inclusive(1, 4).unwrap())
        .unwrap();

    // Oslo/Berlin by age desc: Frank 67, Carol 41, Alice 30, Bob 25, Erin 19, Grace null
    assert_eq!(names(&page), vec!["Carol", "Alice", "Bob", "Erin"]);
}

#[test]
fn test_delegate_error_aborts_without_retry() {
    init_test_tracing();
    let delegate = FailingLoader::new(fixtures::numbered(100), 2);
    let loader = FetchLimitOvercomer::new(&delegate, 10).unwrap();

    let result = loader.fetch(None, &[], FetchRange::first(35));

    assert_fetch_error(&result);
    assert_eq!(result.unwrap_err(), FailingLoader::<()>::backend_error());
    assert_eq!(delegate.fetch_attempts(), 2);
}

#[test]
fn test_count_error_propagates() {
    let delegate = FailingLoader::new(fixtures::numbered(5), u64::MAX).failing_count();
    let loader = FetchLimitOvercomer::new(delegate, 10).unwrap();
    assert!(matches!(
        loader.count(None),
        Err(LoaderError::Fetch(FetchError::Backend { .. }))
    ));
}

#[test]
fn test_over_returning_delegate_is_rejected() {
    let loader = FetchLimitOvercomer::new(OverflowingLoader, 5).unwrap();
    assert_delegate_overflow(&loader.fetch(None, &[], FetchRange::first(20)));
}

#[test]
fn test_zero_limit_config_is_rejected() {
    let result =
        FetchLimitOvercomer::from_config(OverflowingLoader, &fixtures::config_with_limit(0));
    assert_invalid_config(&result.map(|_| ()), "delegate_fetch_limit");
}

#[test]
fn test_shared_delegate_outlives_decorators() {
    let shared = Arc::new(RecordingLoader::new(fixtures::numbered(50)));

    let small = FetchLimitOvercomer::new(Arc::clone(&shared), 5).unwrap();
    let large = FetchLimitOvercomer::new(Arc::clone(&shared), 20).unwrap();

    let from_small = small.fetch(None, &[], FetchRange::first(12)).unwrap();
    let from_large = large.fetch(None, &[], FetchRange::first(12)).unwrap();
    assert_eq!(from_small, from_large);
    assert_eq!(from_small.len(), 12);
    drop(small);
    drop(large);

    // 3 calls from the small decorator, 1 from the large one
    assert_eq!(shared.fetch_count(), 4);
    assert_eq!(Arc::strong_count(&shared), 1);
}

#[test]
fn test_with_filter_then_overcome() {
    let loader = CappedLoader::new(fixtures::people_loader(), 1)
        .with_filter(Filter::eq("city", "Berlin"))
        .overcome_fetch_limit(1)
        .unwrap();

    assert_eq!(loader.count(None).unwrap(), 3);
    let everyone = loader.fetch_all(None, &[SortClause::asc("name")]).unwrap();
    assert_eq!(names(&everyone), vec!["Alice", "Carol", "Frank"]);

    let older = loader.fetch_all(Some(&Filter::gt("age", 35)), &[]).unwrap();
    assert_eq!(older.len(), 2);
}

#[test]
fn test_overcomer_over_trait_object() {
    let backend: Box<dyn DataLoader<Item = u64>> =
        Box::new(CappedLoader::new(fixtures::numbered(30), 7));
    let loader = FetchLimitOvercomer::new(backend, 7).unwrap();

    let records = loader
        .fetch(None, &[], FetchRange::new(20, 50).unwrap())
        .unwrap();
    assert_eq!(records, (20..30).collect::<Vec<_>>());
}
