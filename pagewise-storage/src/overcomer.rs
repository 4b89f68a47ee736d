//! Fetch-limit-overcoming decorator.
//!
//! Some backends (REST endpoints, capped SQL views) return at most N records
//! per call no matter how large the requested window is. [`FetchLimitOvercomer`]
//! wraps such a loader and serves arbitrarily large windows by issuing a
//! sequence of bounded delegate calls.

use std::num::NonZeroU64;

use pagewise_core::{
    validate_fetch_limit, FetchError, FetchRange, Filter, LoaderConfig, LoaderError,
    LoaderResult, SortClause,
};
use tracing::{debug, trace, warn};

use crate::DataLoader;

/// Presents an uncapped [`DataLoader`] over a delegate that returns at most
/// `delegate_fetch_limit` records per fetch.
///
/// The delegate may be owned, borrowed (`&L`) or shared (`Arc<L>`); the
/// decorator never tears it down beyond dropping its own handle.
///
/// # Example
///
/// ```ignore
/// let capped = RestPersonLoader::new(client); // returns at most 100 per call
/// let loader = FetchLimitOvercomer::new(&capped, 100)?;
/// let page = loader.fetch(None, &[], FetchRange::new(0, 250)?)?; // 3 delegate calls
/// ```
#[derive(Debug, Clone)]
pub struct FetchLimitOvercomer<D> {
    delegate: D,
    delegate_fetch_limit: NonZeroU64,
}

impl<D> FetchLimitOvercomer<D> {
    /// Wrap `delegate`. Fails with a config error when `delegate_fetch_limit` is 0.
    pub fn new(delegate: D, delegate_fetch_limit: u64) -> LoaderResult<Self> {
        let delegate_fetch_limit = validate_fetch_limit(delegate_fetch_limit)?;
        Ok(Self {
            delegate,
            delegate_fetch_limit,
        })
    }

    /// Wrap `delegate` using the limit from `config`.
    pub fn from_config(delegate: D, config: &LoaderConfig) -> LoaderResult<Self> {
        let delegate_fetch_limit = config.validate()?;
        Ok(Self {
            delegate,
            delegate_fetch_limit,
        })
    }

    pub fn delegate_fetch_limit(&self) -> u64 {
        self.delegate_fetch_limit.get()
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn into_inner(self) -> D {
        self.delegate
    }
}

impl<D: DataLoader> DataLoader for FetchLimitOvercomer<D> {
    type Item = D::Item;

    fn fetch(
        &self,
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Vec<Self::Item>> {
        let needed = range.len();
        if needed == 0 {
            return Ok(Vec::new());
        }

        let limit = self.delegate_fetch_limit.get();
        let mut accumulated = Vec::new();
        let mut fetched: u64 = 0;

        while fetched < needed {
            let to_fetch = (needed - fetched).min(limit);
            let window = FetchRange::new(range.start() + fetched, to_fetch)?;
            debug!(offset = window.start(), to_fetch, "fetching chunk from delegate");

            let chunk = self.delegate.fetch(filter, sort_by, window)?;
            let returned = chunk.len() as u64;
            if returned > to_fetch {
                warn!(
                    requested = to_fetch,
                    returned,
                    "delegate returned more records than requested"
                );
                return Err(LoaderError::Fetch(FetchError::DelegateOverflow {
                    requested: to_fetch,
                    returned,
                }));
            }

            accumulated.extend(chunk);
            fetched += returned;

            if returned < to_fetch {
                trace!(
                    fetched,
                    needed,
                    "short read from delegate, treating as end of data"
                );
                break;
            }
        }

        Ok(accumulated)
    }

    fn count(&self, filter: Option<&Filter>) -> LoaderResult<u64> {
        self.delegate.count(filter)
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
