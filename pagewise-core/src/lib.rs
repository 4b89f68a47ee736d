//! PAGEWISE Core - Data Loader Types
//!
//! Pure data structures shared by every data loader: filters, sort clauses,
//! fetch windows, configuration and errors. Loaders themselves live in
//! `pagewise-storage`.

pub mod config;
pub mod error;
pub mod filter;
pub mod range;
pub mod sort;
pub mod sql;
pub mod value;

pub use config::{validate_fetch_limit, LoaderConfig, DELEGATE_FETCH_LIMIT_ENV};
pub use error::{ConfigError, FetchError, FilterError, LoaderError, LoaderResult, ValidationError};
pub use filter::{CompareOperator, Filter, Predicate};
pub use range::FetchRange;
pub use sort::{SortClause, SortDirection};
pub use sql::SqlQuery;
pub use value::{compare_values, property, sort_order};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
