//! Zero-based fetch windows over a result set.

use crate::{LoaderError, LoaderResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Range, RangeInclusive};

/// A zero-based window `[start, end]` (inclusive end) into a result set.
///
/// The window is stored as `start` plus `length`, so an empty window can sit
/// at any start position. `start + length` never overflows `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFetchRange")]
pub struct FetchRange {
    start: u64,
    length: u64,
}

/// Unchecked wire form, validated on deserialization.
#[derive(Deserialize)]
struct RawFetchRange {
    start: u64,
    length: u64,
}

impl TryFrom<RawFetchRange> for FetchRange {
    type Error = LoaderError;

    fn try_from(raw: RawFetchRange) -> LoaderResult<Self> {
        Self::new(raw.start, raw.length)
    }
}

impl FetchRange {
    /// Create a window of `length` records starting at `start`.
    pub fn new(start: u64, length: u64) -> LoaderResult<Self> {
        if start.checked_add(length).is_none() {
            return Err(LoaderError::Validation(ValidationError::InvalidRange {
                start,
                length,
                reason: "start + length overflows u64".to_string(),
            }));
        }
        Ok(Self { start, length })
    }

    /// Create a window from an inclusive end. `end < start` yields an empty window.
    pub fn inclusive(start: u64, end: u64) -> LoaderResult<Self> {
        if end < start {
            return Ok(Self::empty(start));
        }
        match (end - start).checked_add(1) {
            Some(length) => Self::new(start, length),
            None => Err(LoaderError::Validation(ValidationError::InvalidRange {
                start,
                length: u64::MAX,
                reason: "window length exceeds u64".to_string(),
            })),
        }
    }

    /// An empty window at `start`.
    pub const fn empty(start: u64) -> Self {
        Self { start, length: 0 }
    }

    /// The first `n` records.
    pub const fn first(n: u64) -> Self {
        Self { start: 0, length: n }
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn len(&self) -> u64 {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Inclusive end, or `None` for an empty window.
    pub const fn end(&self) -> Option<u64> {
        if self.length == 0 {
            None
        } else {
            Some(self.start + self.length - 1)
        }
    }

    /// Exclusive end (`start + length`).
    pub const fn end_exclusive(&self) -> u64 {
        self.start + self.length
    }

    /// Clamp this window to a collection of `total` items, returning
    /// `(from, to)` suitable for slicing.
    pub fn slice_bounds(&self, total: usize) -> (usize, usize) {
        let from = usize::try_from(self.start).unwrap_or(usize::MAX).min(total);
        let to = usize::try_from(self.end_exclusive())
            .unwrap_or(usize::MAX)
            .min(total);
        (from, to)
    }
}

impl TryFrom<Range<u64>> for FetchRange {
    type Error = LoaderError;

    fn try_from(range: Range<u64>) -> LoaderResult<Self> {
        Self::new(range.start, range.end.saturating_sub(range.start))
    }
}

impl TryFrom<RangeInclusive<u64>> for FetchRange {
    type Error = LoaderError;

    fn try_from(range: RangeInclusive<u64>) -> LoaderResult<Self> {
        Self::inclusive(*range.start(), *range.end())
    }
}

impl fmt::Display for FetchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, empty]", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_length() {
        let range = FetchRange::inclusive(5, 24).unwrap();
        assert_eq!(range.start(), 5);
        assert_eq!(range.len(), 20);
        assert_eq!(range.end(), Some(24));
        assert_eq!(range.end_exclusive(), 25);
    }

    #[test]
    fn test_inclusive_end_before_start_is_empty() {
        let range = FetchRange::inclusive(7, 3).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.start(), 7);
        assert_eq!(range.end(), None);
    }

    #[test]
    fn test_single_element_range() {
        let range = FetchRange::inclusive(4, 4).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.end(), Some(4));
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(FetchRange::new(u64::MAX, 1).is_err());
        assert!(FetchRange::inclusive(0, u64::MAX).is_err());
        assert!(FetchRange::new(u64::MAX, 0).is_ok());
    }

    #[test]
    fn test_try_from_std_ranges() {
        let half_open = FetchRange::try_from(10u64..15).unwrap();
        assert_eq!(half_open, FetchRange::new(10, 5).unwrap());

        let inclusive = FetchRange::try_from(10u64..=14).unwrap();
        assert_eq!(inclusive, half_open);

        #[allow(clippy::reversed_empty_ranges)]
        let backwards = FetchRange::try_from(10u64..5).unwrap();
        assert!(backwards.is_empty());
    }

    #[test]
    fn test_slice_bounds_clamps() {
        let range = FetchRange::new(8, 10).unwrap();
        assert_eq!(range.slice_bounds(12), (8, 12));
        assert_eq!(range.slice_bounds(5), (5, 5));
        assert_eq!(FetchRange::first(3).slice_bounds(100), (0, 3));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: FetchRange = serde_json::from_str(r#"{"start":2,"length":3}"#).unwrap();
        assert_eq!(ok.end(), Some(4));

        let overflow = serde_json::from_str::<FetchRange>(&format!(
            r#"{{"start":{},"length":1}}"#,
            u64::MAX
        ));
        assert!(overflow.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(FetchRange::inclusive(5, 14).unwrap().to_string(), "[5, 14]");
        assert_eq!(FetchRange::empty(3).to_string(), "[3, empty]");
    }
}
