use anyhow::{Context, Result, anyhow};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use std::path::Path;
use tracing::debug;

use super::{Column, Dialect, Row, SqlDriver, Value};

pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_slice())),
            Value::RawText(b) => ToSqlOutput::Borrowed(ValueRef::Text(b.as_slice())),
        })
    }
}

fn to_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::RawText(t.to_vec()),
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

impl SqlDriver for SqliteDriver {
    fn name(&self) -> &'static str { "sqlite" }

    fn dialect(&self) -> Dialect { Dialect::Sqlite }

    fn execute(&self, statement: &str, bindings: &[Value]) -> Result<usize> {
        debug!(statement, bindings = bindings.len(), "sqlite execute");
        Ok(self.conn.execute(statement, params_from_iter(bindings.iter()))?)
    }

    fn query(&self, statement: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        debug!(statement, bindings = bindings.len(), "sqlite query");
        let mut stmt = self.conn.prepare(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(bindings.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(to_value(row.get_ref(i)?));
            }
            out.push(Row { columns: columns.clone(), values });
        }
        Ok(out)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    fn list_table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |r| Ok(Column::new(r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// SQLite has no `CREATE TABLE .. LIKE ..`; rebuild the table from its
    /// column list instead. Declared types, `NOT NULL`, defaults and the
    /// primary key carry over. Foreign keys, checks and indexes do not.
    fn duplicate_table(&self, source: &str, target: &str) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([source], |r| {
                Ok(ColumnDefinition {
                    name: r.get(0)?,
                    kind: r.get(1)?,
                    not_null: r.get::<_, i64>(2)? != 0,
                    default: r.get(3)?,
                    pk: r.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(anyhow!("table '{}' does not exist", source));
        }

        self.execute(&create_table_sql(target, &columns), &[])?;
        Ok(())
    }
}

struct ColumnDefinition {
    name: String,
    kind: String,
    not_null: bool,
    default: Option<String>,
    /// 1-based position within the primary key, 0 when not part of it.
    pk: i64,
}

fn create_table_sql(table: &str, columns: &[ColumnDefinition]) -> String {
    let d = Dialect::Sqlite;
    let mut parts: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = d.quote(&c.name);
            if !c.kind.is_empty() {
                def.push(' ');
                def.push_str(&c.kind);
            }
            if c.not_null {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default {
                def.push_str(&format!(" DEFAULT ({})", default));
            }
            def
        })
        .collect();

    let mut keys: Vec<&ColumnDefinition> = columns.iter().filter(|c| c.pk > 0).collect();
    keys.sort_by_key(|c| c.pk);
    if !keys.is_empty() {
        let names: Vec<String> = keys.iter().map(|c| c.name.clone()).collect();
        parts.push(format!("PRIMARY KEY ({})", d.quote_list(&names)));
    }

    format!("CREATE TABLE {} ({})", d.quote(table), parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SqliteDriver {
        let d = SqliteDriver::open_in_memory().unwrap();
        d.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))", &[])
            .unwrap();
        d
    }

    #[test]
    fn rebuilt_definition_keeps_keys_defaults_and_not_null() {
        let d = driver();
        d.execute(
            "CREATE TABLE memberships (user_id INTEGER NOT NULL REFERENCES users(id), \
             group_id INTEGER, role TEXT DEFAULT 'member', note, PRIMARY KEY (group_id, user_id))",
            &[],
        )
        .unwrap();
        d.duplicate_table("memberships", "memberships_backup").unwrap();

        let sql: String = d
            .connection()
            .query_row("SELECT sql FROM sqlite_master WHERE name = 'memberships_backup'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(
            sql,
            r#"CREATE TABLE "memberships_backup" ("user_id" INTEGER NOT NULL, "group_id" INTEGER, "role" TEXT DEFAULT ('member'), "note", PRIMARY KEY ("group_id", "user_id"))"#
        );
        let fks: i64 = d
            .connection()
            .query_row("SELECT COUNT(*) FROM pragma_foreign_key_list('memberships_backup')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fks, 0);
    }

    #[test]
    fn invalid_utf8_text_keeps_its_bytes() {
        let d = driver();
        d.execute("INSERT INTO users (id, name) VALUES (1, CAST(x'80FF41' AS TEXT))", &[])
            .unwrap();
        let rows = d.query("SELECT name FROM users", &[]).unwrap();
        assert_eq!(rows[0].values, vec![Value::RawText(vec![0x80, 0xFF, 0x41])]);

        d.execute("INSERT INTO users (id, name) VALUES (2, ?)", &rows[0].values).unwrap();
        let copied = d
            .query("SELECT hex(name), typeof(name) FROM users WHERE id = 2", &[])
            .unwrap();
        assert_eq!(copied[0].values, vec![Value::from("80FF41"), Value::from("text")]);
    }

    #[test]
    fn introspects_columns_in_order() {
        let d = driver();
        let cols = d.columns("users").unwrap();
        assert_eq!(cols, vec![Column::new("id", "INTEGER"), Column::new("name", "VARCHAR(50)")]);
        assert!(d.columns("missing").unwrap().is_empty());
    }

    #[test]
    fn duplicate_keeps_primary_key() {
        let d = driver();
        d.duplicate_table("users", "users_backup").unwrap();
        assert!(d.table_exists("users_backup").unwrap());
        assert_eq!(d.columns("users_backup").unwrap(), d.columns("users").unwrap());

        let insert = Dialect::Sqlite.insert_ignore_row("users_backup", &["id".into(), "name".into()]);
        assert_eq!(d.execute(&insert, &[Value::Integer(1), "a".into()]).unwrap(), 1);
        assert_eq!(d.execute(&insert, &[Value::Integer(1), "b".into()]).unwrap(), 0);
    }

    #[test]
    fn duplicate_of_missing_table_fails() {
        let d = driver();
        assert!(d.duplicate_table("nope", "nope_backup").is_err());
        assert!(!d.table_exists("nope_backup").unwrap());
    }

    #[test]
    fn query_round_trips_values() {
        let d = driver();
        d.execute("INSERT INTO users (id, name) VALUES (?, ?)", &[Value::Integer(7), Value::Null])
            .unwrap();
        let rows = d.query("SELECT id, name FROM users", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(7)));
        assert_eq!(rows[0].get("name"), Some(&Value::Null));
        assert_eq!(d.count("SELECT COUNT(*) FROM users", &[]).unwrap(), 1);
        assert_eq!(d.list_table_names().unwrap(), vec!["users".to_string()]);
    }
}
