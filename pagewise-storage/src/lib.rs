//! PAGEWISE Storage - Data Loader Trait and Implementations
//!
//! Defines the data-loader abstraction every backing store implements, the
//! fetch-limit-overcoming decorator, and in-memory loaders used for testing
//! and small collections.

pub mod filtered;
pub mod list_loader;
pub mod overcomer;

pub use filtered::FilteredDataLoader;
pub use list_loader::{EmptyDataLoader, ListDataLoader};
pub use overcomer::FetchLimitOvercomer;

pub use pagewise_core::{
    Filter, FetchRange, LoaderConfig, LoaderError, LoaderResult, SortClause, SortDirection,
};

use std::sync::Arc;

// ============================================================================
// DATA LOADER TRAIT
// ============================================================================

/// Filtered, sorted, range-limited retrieval plus total count over a
/// collection of records.
///
/// Implementations may cap how many records a single [`fetch`](Self::fetch)
/// returns regardless of the requested window; wrap such a loader in a
/// [`FetchLimitOvercomer`] to lift the cap.
pub trait DataLoader: Send + Sync {
    /// Record type produced by this loader.
    type Item;

    /// Fetch records matching `filter`, ordered by `sort_by`, restricted to `range`.
    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>>;

    /// Count records matching `filter`, ignoring any window.
    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64>;
}

impl<L: DataLoader + ?Sized> DataLoader for &L {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        (**self).fetch(filter, sort_by, range)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        (**self).count(filter)
    }
}

impl<L: DataLoader + ?Sized> DataLoader for Box<L> {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        (**self).fetch(filter, sort_by, range)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        (**self).count(filter)
    }
}

impl<L: DataLoader + ?Sized> DataLoader for Arc<L> {
    type Item = L::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        (**self).fetch(filter, sort_by, range)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        (**self).count(filter)
    }
}

// ============================================================================
// EXTENSION METHODS
// ============================================================================

/// Combinators available on every [`DataLoader`].
pub trait LoaderExt: DataLoader + Sized {
    /// AND `filter` into every call made through the returned loader.
    fn with_filter(self, filter: Filter) -> FilteredDataLoader<Self> {
        FilteredDataLoader::new(self, filter)
    }

    /// Lift a per-call fetch cap of `delegate_fetch_limit` records.
    fn overcome_fetch_limit(
        self,
        delegate_fetch_limit: u64,
    ) -> LoaderResult<FetchLimitOvercomer<Self>> {
        FetchLimitOvercomer::new(self, delegate_fetch_limit)
    }

    /// Count the matches, then fetch all of them in one window.
    fn fetch_all(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
    ) -> LoaderResult<Vec<Self::Item>> {
        let total = self.count(filter)?;
        self.fetch(filter, sort_by, FetchRange::first(total))
    }
}

impl<L: DataLoader> LoaderExt for L {}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> ListDataLoader<serde_json::Value> {
        ListDataLoader::new((0..30).map(|i| serde_json::json!({"id": i, "even": i % 2 == 0})))
            .unwrap()
    }

    #[test]
    fn test_dyn_loader_through_arc_and_box() {
        let shared: Arc<dyn DataLoader<Item = serde_json::Value>> = Arc::new(people());
        assert_eq!(shared.count(None).unwrap(), 30);

        let boxed: Box<dyn DataLoader<Item = serde_json::Value>> = Box::new(people());
        let page = boxed.fetch(None, &[], FetchRange::first(5)).unwrap();
        assert_eq!(page.len(), 5);
    }

    #[test]
    fn test_fetch_all_uses_count() {
        let loader = people();
        let evens = loader
            .fetch_all(Some(&Filter::eq("even", true)), &[SortClause::desc("id")])
            .unwrap();
        assert_eq!(evens.len(), 15);
        assert_eq!(evens[0]["id"], 28);
    }

    #[test]
    fn test_ext_chain() {
        let loader = people()
            .with_filter(Filter::eq("even", true))
            .overcome_fetch_limit(4)
            .unwrap();
        assert_eq!(loader.count(None).unwrap(), 15);
        let all = loader.fetch_all(None, &[]).unwrap();
        assert_eq!(all.len(), 15);
    }
}
