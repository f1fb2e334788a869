//! In-memory driver that records every statement, for statement-shape tests.

use anyhow::{Result, anyhow};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use super::{Column, Dialect, Row, SqlDriver, Value};

#[derive(Default)]
pub struct RecordingDriver {
    pub tables: RefCell<BTreeMap<String, Vec<Column>>>,
    pub executed: RefCell<Vec<(String, Vec<Value>)>>,
    pub queried: RefCell<Vec<(String, Vec<Value>)>>,
    pub results: RefCell<VecDeque<Vec<Row>>>,
    pub count: Cell<u64>,
    pub fail_ddl: Cell<bool>,
}

impl RecordingDriver {
    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.borrow_mut().insert(
            name.to_string(),
            columns.iter().map(|(n, k)| Column::new(*n, *k)).collect(),
        );
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.executed.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl SqlDriver for RecordingDriver {
    fn name(&self) -> &'static str { "recording" }

    fn dialect(&self) -> Dialect { Dialect::MySql }

    fn execute(&self, statement: &str, bindings: &[Value]) -> Result<usize> {
        if statement.starts_with("CREATE TABLE") {
            if self.fail_ddl.get() {
                return Err(anyhow!("permission denied"));
            }
            // CREATE TABLE `target` LIKE `source`
            let parts: Vec<&str> = statement.split('`').collect();
            let (target, source) = (parts[1], parts[3]);
            let columns = self
                .tables
                .borrow()
                .get(source)
                .cloned()
                .ok_or_else(|| anyhow!("no such table {}", source))?;
            self.tables.borrow_mut().insert(target.to_string(), columns);
        }
        self.executed.borrow_mut().push((statement.to_string(), bindings.to_vec()));
        Ok(1)
    }

    fn query(&self, statement: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.queried.borrow_mut().push((statement.to_string(), bindings.to_vec()));
        if statement.starts_with("SELECT COUNT(*)") {
            return Ok(vec![Row {
                columns: vec!["count".into()],
                values: vec![Value::Integer(self.count.get() as i64)],
            }]);
        }
        Ok(self.results.borrow_mut().pop_front().unwrap_or_default())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tables.borrow().contains_key(name))
    }

    fn list_table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.borrow().keys().cloned().collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>> {
        Ok(self.tables.borrow().get(table).cloned().unwrap_or_default())
    }
}
