//! PAGEWISE Test Utilities
//!
//! Centralized test infrastructure for the PAGEWISE workspace:
//! - Instrumented mock loaders (recording, capped, failing, overflowing)
//! - Proptest generators for records, windows and sort clauses
//! - Test fixtures for common scenarios
//! - Custom assertions for PAGEWISE-specific validation

// Re-export loaders from their source crate
pub use pagewise_storage::{
    DataLoader, EmptyDataLoader, FetchLimitOvercomer, FilteredDataLoader, ListDataLoader,
    LoaderExt,
};

// Re-export core types for convenience
pub use pagewise_core::{
    CompareOperator, ConfigError, FetchError, FetchRange, Filter, FilterError, LoaderConfig,
    LoaderError, LoaderResult, SortClause, SortDirection, ValidationError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Install a `tracing` subscriber for test output, honouring `RUST_LOG`.
/// Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// SAMPLE RECORD
// ============================================================================

/// Sample record used across the workspace tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub age: Option<u32>,
    pub email: Option<String>,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

impl Person {
    /// New person with a fresh time-ordered id.
    pub fn new(name: impl Into<String>, age: Option<u32>, city: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            age,
            email: None,
            city: city.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// MOCK LOADERS
// ============================================================================

/// A call observed by a [`RecordingLoader`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderCall {
    Fetch {
        filter: Option<Filter>,
        sort_by: Vec<SortClause>,
        range: FetchRange,
        returned: usize,
    },
    Count {
        filter: Option<Filter>,
    },
}

/// Wraps a loader and records every call made to it.
#[derive(Debug)]
pub struct RecordingLoader<L> {
    inner: L,
    calls: Mutex<Vec<LoaderCall>>,
}

impl<L> RecordingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<LoaderCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Windows passed to `fetch`, in order.
    pub fn fetch_ranges(&self) -> Vec<FetchRange> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LoaderCall::Fetch { range, .. } => Some(range),
                LoaderCall::Count { .. } => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_ranges().len()
    }

    pub fn count_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, LoaderCall::Count { .. }))
            .count()
    }

    pub fn reset(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn record(&self, call: LoaderCall) -> LoaderResult<()> {
        self.calls
            .lock()
            .map_err(|_| LoaderError::Fetch(FetchError::LockPoisoned))?
            .push(call);
        Ok(())
    }
}

impl<L: DataLoader> DataLoader for RecordingLoader<L> {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        let records = self.inner.fetch(filter, sort_by, range)?;
        self.record(LoaderCall::Fetch {
            filter: filter.cloned(),
            sort_by: sort_by.to_vec(),
            range,
            returned: records.len(),
        })?;
        Ok(records)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        self.record(LoaderCall::Count {
            filter: filter.cloned(),
        })?;
        self.inner.count(filter)
    }
}

/// Silently returns at most `cap` records per fetch, like a REST endpoint
/// with a server-side page size.
#[derive(Debug, Clone)]
pub struct CappedLoader<L> {
    inner: L,
    cap: u64,
}

impl<L> CappedLoader<L> {
    pub fn new(inner: L, cap: u64) -> Self {
        Self { inner, cap }
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }
}

impl<L: DataLoader> DataLoader for CappedLoader<L> {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        let capped = FetchRange::new(range.start(), range.len().min(self.cap))?;
        self.inner.fetch(filter, sort_by, capped)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        self.inner.count(filter)
    }
}

/// Delegates normally until the `fail_on`-th fetch (1-based), which fails
/// with a backend error. Counts always succeed unless `fail_count` is set.
#[derive(Debug)]
pub struct FailingLoader<L> {
    inner: L,
    fail_on: u64,
    fail_count: bool,
    fetches: AtomicU64,
}

impl<L> FailingLoader<L> {
    pub fn new(inner: L, fail_on: u64) -> Self {
        Self {
            inner,
            fail_on,
            fail_count: false,
            fetches: AtomicU64::new(0),
        }
    }

    /// Also fail every `count` call.
    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    /// Number of fetch attempts so far, including the failing one.
    pub fn fetch_attempts(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn backend_error() -> LoaderError {
        LoaderError::Fetch(FetchError::Backend {
            source_name: "failing-loader".to_string(),
            reason: "injected failure".to_string(),
        })
    }
}

impl<L: DataLoader> DataLoader for FailingLoader<L> {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(Self::backend_error());
        }
        self.inner.fetch(filter, sort_by, range)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        if self.fail_count {
            return Err(Self::backend_error());
        }
        self.inner.count(filter)
    }
}

/// Misbehaving delegate: returns one more record than requested.
#[derive(Debug, Clone, Default)]
pub struct OverflowingLoader;

impl DataLoader for OverflowingLoader {
    type Item = u64;

    fn fetch(
        &self,
        _filter: Option<&Filter>,
        _sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<u64>> {
        Ok((range.start()..=range.end_exclusive()).collect())
    }

    fn count(&self, _filter: Option<&Filter>) -> LoaderResult<u64> {
        Ok(u64::MAX)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating PAGEWISE types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_city() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Berlin".to_string()),
            Just("Oslo".to_string()),
            Just("Lisbon".to_string()),
            Just("Tallinn".to_string()),
        ]
    }

    pub fn arb_person() -> impl Strategy<Value = Person> {
        (
            any::<[u8; 16]>(),
            "[A-Z][a-z]{2,8}",
            proptest::option::of(0u32..100),
            proptest::option::of("[a-z]{3,8}@example\\.com"),
            arb_city(),
            arb_timestamp(),
        )
            .prop_map(|(id, name, age, email, city, created_at)| Person {
                id: Uuid::from_bytes(id),
                name,
                age,
                email,
                city,
                created_at,
            })
    }

    pub fn arb_people(max: usize) -> impl Strategy<Value = Vec<Person>> {
        proptest::collection::vec(arb_person(), 0..=max)
    }

    /// Window with `start < max_start` and `length <= max_len`.
    pub fn arb_fetch_range(max_start: u64, max_len: u64) -> impl Strategy<Value = FetchRange> {
        (0..max_start, 0..=max_len).prop_map(|(start, len)| {
            FetchRange::new(start, len).unwrap_or(FetchRange::empty(start))
        })
    }

    pub fn arb_fetch_limit() -> impl Strategy<Value = u64> {
        1u64..64
    }

    pub fn arb_sort_direction() -> impl Strategy<Value = SortDirection> {
        prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
    }

    pub fn arb_sort_clause() -> impl Strategy<Value = SortClause> {
        (
            prop_oneof![
                Just("name"),
                Just("age"),
                Just("city"),
                Just("email"),
                Just("created_at"),
            ],
            arb_sort_direction(),
        )
            .prop_map(|(property, direction)| SortClause::new(property, direction))
    }

    /// Sort clauses always ending with `id`, so the order is total.
    pub fn arb_total_sort() -> impl Strategy<Value = Vec<SortClause>> {
        proptest::collection::vec(arb_sort_clause(), 0..3).prop_map(|mut clauses| {
            clauses.push(SortClause::asc("id"));
            clauses
        })
    }

    pub fn arb_person_filter() -> impl Strategy<Value = Option<Filter>> {
        prop_oneof![
            Just(None),
            arb_city().prop_map(|city| Some(Filter::eq("city", city))),
            (0u32..100).prop_map(|age| Some(Filter::ge("age", age))),
            Just(Some(Filter::is_null("email"))),
            "[A-Z]".prop_map(|prefix| Some(Filter::starts_with("name", prefix))),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Loader over the integers `0..total`.
    pub fn numbered(total: u64) -> ListDataLoader<u64> {
        ListDataLoader::new(0..total).unwrap_or_default()
    }

    /// Loader over `total` untyped JSON records with a nested address.
    ///
    /// Record `n` is `{"id": n, "parity": "even"|"odd", "address": {"zip": "1000<n % 10>"}}`.
    pub fn json_records(total: u64) -> ListDataLoader<Value> {
        ListDataLoader::new((0..total).map(json_record)).unwrap_or_default()
    }

    pub fn json_record(n: u64) -> Value {
        json!({
            "id": n,
            "parity": if n % 2 == 0 { "even" } else { "odd" },
            "address": { "zip": format!("{:05}", 10_000 + n % 10) },
        })
    }

    /// A person with a deterministic id derived from `seq`.
    pub fn person(seq: u128, name: &str, age: Option<u32>, city: &str) -> Person {
        Person {
            id: Uuid::from_u128(seq),
            name: name.to_string(),
            age,
            email: Some(format!("{}@example.com", name.to_lowercase())),
            city: city.to_string(),
            created_at: DateTime::from_timestamp(1_700_000_000 + seq as i64 * 3600, 0)
                .unwrap_or_else(Utc::now),
        }
    }

    /// Eight people across three cities; Grace has no age, Heidi no email.
    pub fn people() -> Vec<Person> {
        let mut heidi = person(8, "Heidi", Some(52), "Lisbon");
        heidi.email = None;
        vec![
            person(1, "Alice", Some(30), "Berlin"),
            person(2, "Bob", Some(25), "Oslo"),
            person(3, "Carol", Some(41), "Berlin"),
            person(4, "Dave", Some(30), "Lisbon"),
            person(5, "Erin", Some(19), "Oslo"),
            person(6, "Frank", Some(67), "Berlin"),
            person(7, "Grace", None, "Oslo"),
            heidi,
        ]
    }

    pub fn people_loader() -> ListDataLoader<Person> {
        ListDataLoader::new(people()).unwrap_or_default()
    }

    /// Minimal valid configuration with the given fetch limit.
    pub fn config_with_limit(limit: u64) -> LoaderConfig {
        LoaderConfig::new().with_delegate_fetch_limit(limit)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for PAGEWISE-specific validation.

    use super::*;

    /// Assert that a LoaderResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &LoaderResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a LoaderResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &LoaderResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a LoaderResult is an invalid-value Config error for `field`.
    #[track_caller]
    pub fn assert_invalid_config<T: std::fmt::Debug>(result: &LoaderResult<T>, field: &str) {
        match result {
            Err(LoaderError::Config(ConfigError::InvalidValue { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in InvalidValue error");
            }
            other => panic!("Expected InvalidValue config error for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a LoaderResult is a Fetch error.
    #[track_caller]
    pub fn assert_fetch_error<T: std::fmt::Debug>(result: &LoaderResult<T>) {
        match result {
            Err(LoaderError::Fetch(_)) => {}
            other => panic!("Expected Fetch error, got: {:?}", other),
        }
    }

    /// Assert that a LoaderResult is a DelegateOverflow error.
    #[track_caller]
    pub fn assert_delegate_overflow<T: std::fmt::Debug>(result: &LoaderResult<T>) {
        match result {
            Err(LoaderError::Fetch(FetchError::DelegateOverflow { requested, returned })) => {
                assert!(returned > requested, "Overflow must report returned > requested");
            }
            other => panic!("Expected DelegateOverflow, got: {:?}", other),
        }
    }

    /// Assert that no window in `ranges` exceeds `limit` records.
    #[track_caller]
    pub fn assert_windows_within_limit(ranges: &[FetchRange], limit: u64) {
        for range in ranges {
            assert!(
                range.len() <= limit,
                "Window {} requests {} records, limit is {}",
                range,
                range.len(),
                limit
            );
        }
    }

    /// Assert that `ranges` tile a contiguous span without gaps or overlap.
    #[track_caller]
    pub fn assert_contiguous(ranges: &[FetchRange]) {
        for pair in ranges.windows(2) {
            assert_eq!(
                pair[0].end_exclusive(),
                pair[1].start(),
                "Windows {} and {} are not contiguous",
                pair[0],
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_loader_truncates() {
        let loader = CappedLoader::new(fixtures::numbered(100), 10);
        let page = loader.fetch(None, &[], FetchRange::first(25)).unwrap();
        assert_eq!(page, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_recording_loader_records_calls() {
        let loader = RecordingLoader::new(fixtures::numbered(5));
        loader.fetch(None, &[], FetchRange::first(3)).unwrap();
        loader.count(None).unwrap();

        assert_eq!(loader.fetch_ranges(), vec![FetchRange::first(3)]);
        assert_eq!(loader.count_calls(), 1);

        loader.reset();
        assert!(loader.calls().is_empty());
    }

    #[test]
    fn test_failing_loader_fails_on_nth_fetch() {
        let loader = FailingLoader::new(fixtures::numbered(5), 2);
        assert!(loader.fetch(None, &[], FetchRange::first(1)).is_ok());
        assert!(loader.fetch(None, &[], FetchRange::first(1)).is_err());
        assert!(loader.fetch(None, &[], FetchRange::first(1)).is_ok());
        assert_eq!(loader.fetch_attempts(), 3);
    }

    #[test]
    fn test_overflowing_loader_over_returns() {
        let page = OverflowingLoader
            .fetch(None, &[], FetchRange::new(4, 3).unwrap())
            .unwrap();
        assert_eq!(page.len(), 4);
    }

    #[test]
    fn test_json_records_fixture() {
        let loader = fixtures::json_records(20);
        assert_eq!(loader.count(Some(&Filter::eq("parity", "odd"))).unwrap(), 10);
        assert_eq!(loader.count(Some(&Filter::eq("address.zip", "10007"))).unwrap(), 2);
        assert_eq!(
            fixtures::json_record(4),
            json!({"id": 4, "parity": "even", "address": {"zip": "10004"}})
        );
    }

    #[test]
    fn test_people_fixture() {
        let loader = fixtures::people_loader();
        assert_eq!(loader.count(None).unwrap(), 8);
        assert_eq!(loader.count(Some(&Filter::eq("city", "Berlin"))).unwrap(), 3);
        assert_eq!(loader.count(Some(&Filter::is_null("email"))).unwrap(), 1);
    }
}
