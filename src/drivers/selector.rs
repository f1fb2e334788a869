use anyhow::{Result, anyhow};

use super::{SqlDriver, sqlite::SqliteDriver};

/// Open a driver for a database address: a SQLite file path, `sqlite://path`,
/// or `:memory:`. Server addresses are recognised but not supported.
pub fn open_driver_for_target(target: &str) -> Result<Box<dyn SqlDriver>> {
    if target.starts_with("mysql://")
        || target.starts_with("postgres://")
        || target.starts_with("postgresql://")
    {
        return Err(anyhow!("no driver available for '{}'; only sqlite databases are supported", target));
    }

    let path = target.strip_prefix("sqlite://").unwrap_or(target);
    if path.is_empty() {
        return Err(anyhow!("database address is empty"));
    }
    if path == ":memory:" {
        return Ok(Box::new(SqliteDriver::open_in_memory()?));
    }
    Ok(Box::new(SqliteDriver::open(path)?))
}
