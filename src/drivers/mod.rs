use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

pub mod dialect;
pub mod selector;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod recording;

pub use dialect::Dialect;

/// A single bound or fetched SQL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// TEXT whose bytes are not valid UTF-8; bound back as TEXT unchanged.
    RawText(Vec<u8>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

/// A fetched row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A column as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: String,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into() }
    }
}

/// SQL execution and schema introspection against one database.
pub trait SqlDriver {
    fn name(&self) -> &'static str;

    fn dialect(&self) -> Dialect;

    /// Run a statement, returning the number of affected rows.
    fn execute(&self, statement: &str, bindings: &[Value]) -> Result<usize>;

    fn query(&self, statement: &str, bindings: &[Value]) -> Result<Vec<Row>>;

    fn table_exists(&self, name: &str) -> Result<bool>;

    fn list_table_names(&self) -> Result<Vec<String>>;

    /// Columns of `table` in declaration order.
    fn columns(&self, table: &str) -> Result<Vec<Column>>;

    /// Create `target` as an empty structural copy of `source`.
    fn duplicate_table(&self, source: &str, target: &str) -> Result<()> {
        let statement = self
            .dialect()
            .create_table_like(target, source)
            .ok_or_else(|| anyhow!("{} cannot copy table structure with a single statement", self.name()))?;
        self.execute(&statement, &[])?;
        Ok(())
    }

    /// Run a `SELECT COUNT(*) ...` statement and read its single value.
    fn count(&self, statement: &str, bindings: &[Value]) -> Result<u64> {
        let rows = self.query(statement, bindings)?;
        match rows.first().and_then(|r| r.values.first()) {
            Some(Value::Integer(n)) if *n >= 0 => Ok(*n as u64),
            Some(other) => Err(anyhow!("unexpected count result: {:?}", other)),
            None => Err(anyhow!("count query returned no rows")),
        }
    }
}
