//! Loader that always applies a fixed filter.

use std::borrow::Cow;

use pagewise_core::{FetchRange, Filter, LoaderResult, SortClause};

use crate::DataLoader;

/// Wraps a delegate and ANDs a fixed filter into every fetch and count.
#[derive(Debug, Clone)]
pub struct FilteredDataLoader<D> {
    delegate: D,
    filter: Filter,
}

impl<D> FilteredDataLoader<D> {
    pub fn new(delegate: D, filter: Filter) -> Self {
        Self { delegate, filter }
    }

    /// The fixed filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn into_inner(self) -> D {
        self.delegate
    }

    fn combine<'a>(&'a self, filter: Option<&'a Filter>) -> Cow<'a, Filter> {
        match filter {
            Some(extra) => Cow::Owned(self.filter.clone().and(extra.clone())),
            None => Cow::Borrowed(&self.filter),
        }
    }
}

impl<D: DataLoader> DataLoader for FilteredDataLoader<D> {
    type Item = D::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        let combined = self.combine(filter);
        self.delegate.fetch(Some(&*combined), sort_by, range)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        let combined = self.combine(filter);
        self.delegate.count(Some(&*combined))
    }
}
