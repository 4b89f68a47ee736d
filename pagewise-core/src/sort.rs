//! Sort clauses passed through to data loaders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single (property, direction) ordering term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortClause {
    /// Property to sort on; dotted paths address nested fields.
    pub property: String,
    pub direction: SortDirection,
}

impl SortClause {
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    /// Ascending clause.
    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    /// Descending clause.
    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    pub fn is_ascending(&self) -> bool {
        self.direction == SortDirection::Asc
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.property.clone(), self.direction.reversed())
    }
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.direction.as_sql())
    }
}
