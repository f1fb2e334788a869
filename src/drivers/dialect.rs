/// SQL flavour used when rendering statements.
///
/// The bundled driver speaks `Sqlite`. `MySql` (backtick quoting,
/// `INSERT IGNORE`, `CREATE TABLE .. LIKE ..`) is for callers that implement
/// [`SqlDriver`](super::SqlDriver) over their own MySQL connection; the
/// default `duplicate_table` uses its `LIKE` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    pub fn insert_ignore(&self) -> &'static str {
        match self {
            Dialect::MySql => "INSERT IGNORE INTO",
            Dialect::Sqlite => "INSERT OR IGNORE INTO",
        }
    }

    /// Single-statement structural copy, when the engine has one.
    pub fn create_table_like(&self, target: &str, source: &str) -> Option<String> {
        match self {
            Dialect::MySql => Some(format!("CREATE TABLE {} LIKE {}", self.quote(target), self.quote(source))),
            Dialect::Sqlite => None,
        }
    }

    pub fn quote_list(&self, idents: &[String]) -> String {
        idents.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ")
    }

    /// `INSERT IGNORE INTO t (a, b) VALUES (?, ?)`
    pub fn insert_ignore_row(&self, table: &str, columns: &[String]) -> String {
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "{} {} ({}) VALUES ({})",
            self.insert_ignore(),
            self.quote(table),
            self.quote_list(columns),
            placeholders
        )
    }

    /// `INSERT IGNORE INTO t (a, b) SELECT ...`
    pub fn insert_ignore_select(&self, table: &str, columns: &[String], select_sql: &str) -> String {
        format!(
            "{} {} ({}) {}",
            self.insert_ignore(),
            self.quote(table),
            self.quote_list(columns),
            select_sql
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_statement_shapes() {
        let d = Dialect::MySql;
        assert_eq!(
            d.create_table_like("users_backup", "users").as_deref(),
            Some("CREATE TABLE `users_backup` LIKE `users`")
        );
        assert_eq!(
            d.insert_ignore_row("users_backup", &["id".into(), "name".into()]),
            "INSERT IGNORE INTO `users_backup` (`id`, `name`) VALUES (?, ?)"
        );
    }

    #[test]
    fn sqlite_quotes_and_has_no_like() {
        let d = Dialect::Sqlite;
        assert_eq!(d.quote("we\"ird"), "\"we\"\"ird\"");
        assert!(d.create_table_like("a", "b").is_none());
        assert!(d.insert_ignore_row("t", &["x".into()]).starts_with("INSERT OR IGNORE INTO \"t\""));
    }
}
