//! Error types for PAGEWISE operations

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors raised while fetching or counting records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Delegate returned {returned} records for a window of {requested}")]
    DelegateOverflow { requested: u64, returned: u64 },

    #[error("Backend {source_name} failed: {reason}")]
    Backend { source_name: String, reason: String },

    #[error("Loader lock poisoned")]
    LockPoisoned,
}

/// Filter evaluation and rendering errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unsupported filter {kind}: {reason}")]
    UnsupportedFilter { kind: String, reason: String },

    #[error("Invalid LIKE pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid property name: {property}")]
    InvalidProperty { property: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid range starting at {start} with length {length}: {reason}")]
    InvalidRange {
        start: u64,
        length: u64,
        reason: String,
    },

    #[error("Record serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Master error type for all PAGEWISE errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for PAGEWISE operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "delegate_fetch_limit".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("delegate_fetch_limit"));
        assert!(msg.contains("0"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_fetch_error_display_overflow() {
        let err = FetchError::DelegateOverflow {
            requested: 10,
            returned: 11,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_fetch_error_display_backend() {
        let err = FetchError::Backend {
            source_name: "people".to_string(),
            reason: "connection reset".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("people"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_filter_error_display_invalid_property() {
        let err = FilterError::InvalidProperty {
            property: "name; DROP TABLE".to_string(),
        };
        assert!(format!("{}", err).contains("DROP TABLE"));
    }

    #[test]
    fn test_loader_error_from_variants() {
        let config = LoaderError::from(ConfigError::InvalidValue {
            field: "delegate_fetch_limit".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
        assert!(matches!(config, LoaderError::Config(_)));

        let fetch = LoaderError::from(FetchError::LockPoisoned);
        assert!(matches!(fetch, LoaderError::Fetch(_)));

        let filter = LoaderError::from(FilterError::UnsupportedFilter {
            kind: "NativeSql".to_string(),
            reason: "in-memory".to_string(),
        });
        assert!(matches!(filter, LoaderError::Filter(_)));

        let validation = LoaderError::from(ValidationError::Serialization {
            reason: "not an object".to_string(),
        });
        assert!(matches!(validation, LoaderError::Validation(_)));
    }
}
