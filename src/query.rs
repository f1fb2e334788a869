use anyhow::Result;

use crate::drivers::{Dialect, SqlDriver, Value};

/// The set of rows eligible for backup, as a renderable single-table query.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    table: String,
    select: Vec<String>,
    filters: Vec<String>,
    bindings: Vec<Value>,
    after: Option<(String, Value)>,
    order_by: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl RowQuery {
    /// Every row of `table`.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            select: Vec::new(),
            filters: Vec::new(),
            bindings: Vec::new(),
            after: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Restrict rows with a raw SQL condition using `?` placeholders.
    /// Conditions accumulate with `AND`.
    pub fn filter(mut self, condition: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.filters.push(condition.into());
        self.bindings.extend(bindings);
        self
    }

    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.select = columns;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    /// Keyset cursor: only rows whose `column` is greater than `value`.
    pub fn after_key(mut self, column: impl Into<String>, value: Value) -> Self {
        self.after = Some((column.into(), value));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, m: u64) -> Self {
        self.offset = Some(m);
        self
    }

    pub fn source_table(&self) -> &str {
        &self.table
    }

    fn where_clause(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut conditions: Vec<String> = self.filters.iter().map(|f| format!("({})", f)).collect();
        let mut bindings = self.bindings.clone();
        if let Some((column, value)) = &self.after {
            conditions.push(format!("{} > ?", dialect.quote(column)));
            bindings.push(value.clone());
        }
        if conditions.is_empty() {
            (String::new(), bindings)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), bindings)
        }
    }

    /// Render as `SELECT` text plus its positional bindings.
    pub fn to_sql(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let columns = if self.select.is_empty() {
            "*".to_string()
        } else {
            dialect.quote_list(&self.select)
        };
        let (where_sql, bindings) = self.where_clause(dialect);
        let mut sql = format!("SELECT {} FROM {}{}", columns, dialect.quote(&self.table), where_sql);

        if let Some(column) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {}", dialect.quote(column)));
        }
        match (self.limit, self.offset) {
            (Some(n), Some(m)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", n, m)),
            (Some(n), None) => sql.push_str(&format!(" LIMIT {}", n)),
            // both engines need a LIMIT before OFFSET
            (None, Some(m)) => {
                let unbounded = match dialect {
                    Dialect::MySql => "18446744073709551615",
                    Dialect::Sqlite => "-1",
                };
                sql.push_str(&format!(" LIMIT {} OFFSET {}", unbounded, m))
            }
            (None, None) => {}
        }
        (sql, bindings)
    }

    /// `SELECT COUNT(*)` over the same conditions; ordering and paging are ignored.
    pub fn count_sql(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let (where_sql, bindings) = self.where_clause(dialect);
        (format!("SELECT COUNT(*) FROM {}{}", dialect.quote(&self.table), where_sql), bindings)
    }

    pub fn count(&self, driver: &dyn SqlDriver) -> Result<u64> {
        let (sql, bindings) = self.count_sql(driver.dialect());
        driver.count(&sql, &bindings)
    }
}
