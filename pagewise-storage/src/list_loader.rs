//! In-memory data loaders.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::RwLock;

use pagewise_core::{
    property, sort_order, FetchError, FetchRange, Filter, LoaderError, LoaderResult, Predicate,
    SortClause, SortDirection, ValidationError,
};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::DataLoader;

/// A record together with the JSON view filters and sort clauses read.
#[derive(Debug, Clone)]
struct Row<T> {
    item: T,
    view: Value,
}

/// Loader over an in-memory list of records.
///
/// Filters and sort clauses are evaluated against each record's serde JSON
/// form, computed once when the record is added. Sorting is stable, so
/// records that compare equal keep their insertion order.
#[derive(Debug)]
pub struct ListDataLoader<T> {
    rows: RwLock<Vec<Row<T>>>,
}

impl<T> Default for ListDataLoader<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Serialize> ListDataLoader<T> {
    /// Create a loader over `items`.
    pub fn new(items: impl IntoIterator<Item = T>) -> LoaderResult<Self> {
        let rows = items
            .into_iter()
            .map(to_row)
            .collect::<LoaderResult<Vec<_>>>()?;
        Ok(Self {
            rows: RwLock::new(rows),
        })
    }

    /// Append a record.
    pub fn push(&self, item: T) -> LoaderResult<()> {
        let row = to_row(item)?;
        self.write()?.push(row);
        Ok(())
    }

    /// Append several records. Nothing is added if any record fails to serialize.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> LoaderResult<()> {
        let rows = items
            .into_iter()
            .map(to_row)
            .collect::<LoaderResult<Vec<_>>>()?;
        self.write()?.extend(rows);
        Ok(())
    }
}

impl<T> ListDataLoader<T> {
    /// Remove all records.
    pub fn clear(&self) -> LoaderResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Number of records held, ignoring any filter.
    pub fn len(&self) -> LoaderResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LoaderResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> LoaderResult<std::sync::RwLockReadGuard<'_, Vec<Row<T>>>> {
        self.rows
            .read()
            .map_err(|_| LoaderError::Fetch(FetchError::LockPoisoned))
    }

    fn write(&self) -> LoaderResult<std::sync::RwLockWriteGuard<'_, Vec<Row<T>>>> {
        self.rows
            .write()
            .map_err(|_| LoaderError::Fetch(FetchError::LockPoisoned))
    }
}

fn to_row<T: Serialize>(item: T) -> LoaderResult<Row<T>> {
    let view = serde_json::to_value(&item).map_err(|e| {
        LoaderError::Validation(ValidationError::Serialization {
            reason: e.to_string(),
        })
    })?;
    Ok(Row { item, view })
}

fn compile(filter: Option<&Filter>) -> LoaderResult<Option<Predicate>> {
    filter.map(Filter::compile).transpose()
}

fn accepts(predicate: Option<&Predicate>, view: &Value) -> bool {
    predicate.map_or(true, |p| p.matches(view))
}

fn compare_rows(a: &Value, b: &Value, sort_by: &[SortClause]) -> Ordering {
    for clause in sort_by {
        let left = property(a, &clause.property).unwrap_or(&Value::Null);
        let right = property(b, &clause.property).unwrap_or(&Value::Null);
        let ordering = match clause.direction {
            SortDirection::Asc => sort_order(left, right),
            SortDirection::Desc => sort_order(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl<T: Clone + Send + Sync> DataLoader for ListDataLoader<T> {
    type Item = T;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<T>> {
        let predicate = compile(filter)?;
        let rows = self.read()?;

        let mut matching: Vec<&Row<T>> = rows
            .iter()
            .filter(|row| accepts(predicate.as_ref(), &row.view))
            .collect();
        if !sort_by.is_empty() {
            matching.sort_by(|a, b| compare_rows(&a.view, &b.view, sort_by));
        }

        let (from, to) = range.slice_bounds(matching.len());
        trace!(%range, matched = matching.len(), returned = to - from, "list loader fetch");
        Ok(matching[from..to].iter().map(|row| row.item.clone()).collect())
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        let predicate = compile(filter)?;
        let rows = self.read()?;
        Ok(rows.iter().filter(|row| accepts(predicate.as_ref(), &row.view)).count() as u64)
    }
}

/// Loader with no records.
#[derive(Debug)]
pub struct EmptyDataLoader<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> EmptyDataLoader<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for EmptyDataLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EmptyDataLoader<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> DataLoader for EmptyDataLoader<T> {
    type Item = T;

    fn fetch(
        &self,
        _filter: Option<&Filter>,
        _sort_by: &[SortClause],
        _range: FetchRange,
    ) -> LoaderResult<Vec<T>> {
        Ok(Vec::new())
    }

    fn count(&self, _filter: Option<&Filter>) -> LoaderResult<u64> {
        Ok(0)
    }
}
