//! Filter expressions over records
//!
//! A [`Filter`] describes a restriction over a record collection. Data
//! loaders either translate it for their backend (see [`crate::sql`]) or
//! evaluate it in memory against a JSON view of each record via
//! [`Filter::compile`].

use crate::value::{compare_values, property};
use crate::{FilterError, LoaderResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator for property filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl CompareOperator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Filter expression over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// `property <op> value`
    Compare {
        property: String,
        op: CompareOperator,
        value: Value,
    },
    /// Property is null or missing
    IsNull { property: String },
    /// Property is present and not null
    IsNotNull { property: String },
    /// Case-sensitive LIKE; `%` matches any run, `_` one character
    Like { property: String, pattern: String },
    /// Case-insensitive LIKE
    #[serde(rename = "ilike")]
    ILike { property: String, pattern: String },
    /// Property equals one of `values`
    In { property: String, values: Vec<Value> },
    /// Logical AND
    And { filters: Vec<Filter> },
    /// Logical OR
    Or { filters: Vec<Filter> },
    /// Logical NOT
    Not { filter: Box<Filter> },
    /// Backend-specific SQL with `?` placeholders
    NativeSql { clause: String, params: Vec<Value> },
}

impl Filter {
    /// Create a comparison filter.
    pub fn compare(
        property: impl Into<String>,
        op: CompareOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Compare {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Eq, value)
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Ne, value)
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Lt, value)
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Le, value)
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Gt, value)
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOperator::Ge, value)
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Self::IsNull {
            property: property.into(),
        }
    }

    pub fn is_not_null(property: impl Into<String>) -> Self {
        Self::IsNotNull {
            property: property.into(),
        }
    }

    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    pub fn ilike(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ILike {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    /// Case-sensitive prefix match. `%` and `_` in `prefix` stay wildcards.
    pub fn starts_with(property: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::like(property, format!("{}%", prefix.into()))
    }

    /// Case-insensitive prefix match.
    pub fn istarts_with(property: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::ilike(property, format!("{}%", prefix.into()))
    }

    pub fn is_in<V: Into<Value>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn native_sql(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self::NativeSql {
            clause: clause.into(),
            params,
        }
    }

    /// AND two filters, flattening nested ANDs.
    pub fn and(self, other: Filter) -> Self {
        let mut filters = match self {
            Self::And { filters } => filters,
            single => vec![single],
        };
        match other {
            Self::And { filters: rest } => filters.extend(rest),
            single => filters.push(single),
        }
        Self::And { filters }
    }

    /// OR two filters, flattening nested ORs.
    pub fn or(self, other: Filter) -> Self {
        let mut filters = match self {
            Self::Or { filters } => filters,
            single => vec![single],
        };
        match other {
            Self::Or { filters: rest } => filters.extend(rest),
            single => filters.push(single),
        }
        Self::Or { filters }
    }

    /// Negate this filter. Double negation collapses.
    pub fn negate(self) -> Self {
        match self {
            Self::Not { filter } => *filter,
            other => Self::Not {
                filter: Box::new(other),
            },
        }
    }

    /// AND all filters together. `None` for an empty input.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Option<Self> {
        filters.into_iter().reduce(Self::and)
    }

    /// OR all filters together. `None` for an empty input.
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Option<Self> {
        filters.into_iter().reduce(Self::or)
    }

    /// Compile into a predicate that can be evaluated in memory.
    pub fn compile(&self) -> LoaderResult<Predicate> {
        Ok(match self {
            Self::Compare {
                property,
                op,
                value,
            } => Predicate::Compare {
                property: property.clone(),
                op: *op,
                value: value.clone(),
            },
            Self::IsNull { property } => Predicate::IsNull {
                property: property.clone(),
                negated: false,
            },
            Self::IsNotNull { property } => Predicate::IsNull {
                property: property.clone(),
                negated: true,
            },
            Self::Like { property, pattern } => Predicate::Matches {
                property: property.clone(),
                regex: like_to_regex(pattern, false)?,
            },
            Self::ILike { property, pattern } => Predicate::Matches {
                property: property.clone(),
                regex: like_to_regex(pattern, true)?,
            },
            Self::In { property, values } => Predicate::In {
                property: property.clone(),
                values: values.clone(),
            },
            Self::And { filters } => {
                Predicate::All(filters.iter().map(Self::compile).collect::<LoaderResult<_>>()?)
            }
            Self::Or { filters } => {
                Predicate::Any(filters.iter().map(Self::compile).collect::<LoaderResult<_>>()?)
            }
            Self::Not { filter } => Predicate::Not(Box::new(filter.compile()?)),
            Self::NativeSql { clause, .. } => {
                return Err(FilterError::UnsupportedFilter {
                    kind: "native_sql".to_string(),
                    reason: format!("cannot evaluate `{clause}` in memory"),
                }
                .into())
            }
        })
    }

    /// Evaluate against a single JSON record view.
    pub fn test(&self, record: &Value) -> LoaderResult<bool> {
        Ok(self.compile()?.matches(record))
    }
}

impl std::ops::BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl std::ops::BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        self.negate()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare {
                property,
                op,
                value,
            } => write!(f, "{} {} {}", property, op.as_sql(), value),
            Self::IsNull { property } => write!(f, "{property} IS NULL"),
            Self::IsNotNull { property } => write!(f, "{property} IS NOT NULL"),
            Self::Like { property, pattern } => write!(f, "{property} LIKE {pattern:?}"),
            Self::ILike { property, pattern } => write!(f, "{property} ILIKE {pattern:?}"),
            Self::In { property, values } => {
                write!(f, "{property} IN (")?;
                write_joined(f, values, ", ")?;
                write!(f, ")")
            }
            Self::And { filters } => {
                write!(f, "(")?;
                write_joined(f, filters, " AND ")?;
                write!(f, ")")
            }
            Self::Or { filters } => {
                write!(f, "(")?;
                write_joined(f, filters, " OR ")?;
                write!(f, ")")
            }
            Self::Not { filter } => write!(f, "NOT {filter}"),
            Self::NativeSql { clause, .. } => write!(f, "({clause})"),
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Translate a LIKE pattern into an anchored regex.
fn like_to_regex(pattern: &str, case_insensitive: bool) -> LoaderResult<Regex> {
    let mut source = String::from(if case_insensitive { "(?si)^" } else { "(?s)^" });
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| {
        FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// A compiled, in-memory form of a [`Filter`].
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        property: String,
        op: CompareOperator,
        value: Value,
    },
    IsNull {
        property: String,
        negated: bool,
    },
    Matches {
        property: String,
        regex: Regex,
    },
    In {
        property: String,
        values: Vec<Value>,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against a JSON record view. Missing properties read as null.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Self::Compare {
                property: name,
                op,
                value,
            } => {
                let actual = lookup(record, name);
                match (actual.is_null(), value.is_null()) {
                    (is_null, true) => match op {
                        CompareOperator::Eq => is_null,
                        CompareOperator::Ne => !is_null,
                        _ => false,
                    },
                    (true, false) => false,
                    (false, false) => match compare_values(actual, value) {
                        Some(ordering) => op.accepts(ordering),
                        None => match op {
                            CompareOperator::Eq => actual == value,
                            CompareOperator::Ne => actual != value,
                            _ => false,
                        },
                    },
                }
            }
            Self::IsNull {
                property: name,
                negated,
            } => lookup(record, name).is_null() != *negated,
            Self::Matches {
                property: name,
                regex,
            } => lookup(record, name)
                .as_str()
                .is_some_and(|s| regex.is_match(s)),
            Self::In {
                property: name,
                values,
            } => {
                let actual = lookup(record, name);
                !actual.is_null() && values.iter().any(|candidate| values_equal(actual, candidate))
            }
            Self::All(predicates) => predicates.iter().all(|p| p.matches(record)),
            Self::Any(predicates) => predicates.iter().any(|p| p.matches(record)),
            Self::Not(inner) => !inner.matches(record),
        }
    }
}

fn lookup<'a>(record: &'a Value, name: &str) -> &'a Value {
    property(record, name).unwrap_or(&Value::Null)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}
