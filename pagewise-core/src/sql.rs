//! SQL rendering of filter, sort and range
//!
//! SQL-backed loaders translate a fetch call into a parameterized
//! statement. Placeholders are positional `?` markers (SQL-92 / JDBC
//! style); `params` holds their values in order.

use crate::{CompareOperator, FetchRange, Filter, FilterError, LoaderResult, SortClause};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("Invalid identifier regex")
});

/// Rendered pieces of a SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlQuery {
    /// WHERE body without the keyword
    pub where_clause: Option<String>,
    /// ORDER BY body without the keyword
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: u64,
    /// Positional parameters for the `?` placeholders
    pub params: Vec<Value>,
}

impl SqlQuery {
    /// Render a windowed, sorted, filtered query.
    pub fn render(
        filter: Option<&Filter>,
        sort_by: &[SortClause],
        range: FetchRange,
    ) -> LoaderResult<Self> {
        let mut query = Self::render_count(filter)?;

        if !sort_by.is_empty() {
            let terms = sort_by
                .iter()
                .map(|clause| {
                    check_identifier(&clause.property)?;
                    Ok(clause.to_string())
                })
                .collect::<LoaderResult<Vec<_>>>()?;
            query.order_by = Some(terms.join(", "));
        }

        query.limit = Some(range.len());
        query.offset = range.start();
        Ok(query)
    }

    /// Render only the filter, for COUNT queries.
    pub fn render_count(filter: Option<&Filter>) -> LoaderResult<Self> {
        let mut writer = SqlWriter::default();
        let where_clause = match filter {
            Some(filter) => {
                writer.write(filter)?;
                Some(writer.sql)
            }
            None => None,
        };
        Ok(Self {
            where_clause,
            params: writer.params,
            ..Self::default()
        })
    }

    /// Assemble `SELECT * FROM table ...`.
    pub fn to_sql(&self, table: &str) -> LoaderResult<String> {
        check_identifier(table)?;
        let mut sql = format!("SELECT * FROM {table}");
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, self.offset));
        }
        Ok(sql)
    }

    /// Assemble `SELECT COUNT(*) FROM table ...`, ignoring order and window.
    pub fn count_sql(&self, table: &str) -> LoaderResult<String> {
        check_identifier(table)?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        Ok(sql)
    }
}

fn check_identifier(name: &str) -> LoaderResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(FilterError::InvalidProperty {
            property: name.to_string(),
        }
        .into())
    }
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn write(&mut self, filter: &Filter) -> LoaderResult<()> {
        match filter {
            Filter::Compare {
                property,
                op,
                value,
            } => {
                check_identifier(property)?;
                match (op, value.is_null()) {
                    (CompareOperator::Eq, true) => self.push(&format!("{property} IS NULL")),
                    (CompareOperator::Ne, true) => self.push(&format!("{property} IS NOT NULL")),
                    _ => {
                        self.push(&format!("{} {} ?", property, op.as_sql()));
                        self.params.push(value.clone());
                    }
                }
            }
            Filter::IsNull { property } => {
                check_identifier(property)?;
                self.push(&format!("{property} IS NULL"));
            }
            Filter::IsNotNull { property } => {
                check_identifier(property)?;
                self.push(&format!("{property} IS NOT NULL"));
            }
            Filter::Like { property, pattern } => {
                check_identifier(property)?;
                self.push(&format!("{property} LIKE ?"));
                self.params.push(Value::String(pattern.clone()));
            }
            Filter::ILike { property, pattern } => {
                check_identifier(property)?;
                self.push(&format!("LOWER({property}) LIKE LOWER(?)"));
                self.params.push(Value::String(pattern.clone()));
            }
            Filter::In { property, values } => {
                check_identifier(property)?;
                if values.is_empty() {
                    self.push("1 = 0");
                } else {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    self.push(&format!("{property} IN ({placeholders})"));
                    self.params.extend(values.iter().cloned());
                }
            }
            Filter::And { filters } => self.write_junction(filters, " AND ", "1 = 1")?,
            Filter::Or { filters } => self.write_junction(filters, " OR ", "1 = 0")?,
            Filter::Not { filter } => {
                self.push("NOT (");
                self.write(filter)?;
                self.push(")");
            }
            Filter::NativeSql { clause, params } => {
                let expected = clause.matches('?').count();
                if expected != params.len() {
                    return Err(FilterError::UnsupportedFilter {
                        kind: "native_sql".to_string(),
                        reason: format!(
                            "clause has {} placeholders but {} params",
                            expected,
                            params.len()
                        ),
                    }
                    .into());
                }
                self.push(&format!("({clause})"));
                self.params.extend(params.iter().cloned());
            }
        }
        Ok(())
    }

    fn write_junction(&mut self, filters: &[Filter], sep: &str, empty: &str) -> LoaderResult<()> {
        if filters.is_empty() {
            self.push(empty);
            return Ok(());
        }
        self.push("(");
        for (i, child) in filters.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            self.write(child)?;
        }
        self.push(")");
        Ok(())
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }
}
