use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drivers::SqlDriver;
use crate::error::{BackupError, Result};
use crate::events::Dispatcher;
use crate::query::RowQuery;
use crate::schema::SchemaResolver;

pub mod bulk;
pub mod row;

pub const DEFAULT_CHUNK_SIZE: u64 = 1000;

/// How rows reach the backup table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// Fetch rows by primary key and insert-or-ignore each one.
    #[default]
    Row,
    /// Page through the rows server side with `INSERT IGNORE .. SELECT`.
    Bulk,
}

impl BackupMode {
    pub fn copier(&self) -> &'static dyn Copier {
        match self {
            BackupMode::Row => &row::RowCopier,
            BackupMode::Bulk => &bulk::BulkCopier,
        }
    }
}

/// Everything a copier needs for one run.
pub struct CopyJob<'a> {
    pub driver: &'a dyn SqlDriver,
    pub model: &'a str,
    pub query: RowQuery,
    pub target: String,
    pub primary_key: &'a str,
    pub chunk_size: u64,
}

pub trait Copier {
    /// Copy the job's rows, emitting one event per chunk. Returns the number
    /// of rows processed, which includes rows the target already held.
    fn copy(&self, job: &CopyJob<'_>, events: &mut Dispatcher<'_>) -> Result<u64>;
}

/// A table-backed entity whose rows can be copied into a backup table.
pub trait Backupable {
    /// Name reported in progress events.
    fn model_name(&self) -> &str;

    fn table(&self) -> &str;

    /// Base name of the backup table family.
    fn backup_table_name(&self) -> String {
        format!("{}_backup", self.table())
    }

    fn primary_key(&self) -> &str {
        "id"
    }

    /// Rows eligible for backup.
    fn backupable(&self) -> Result<RowQuery> {
        Err(BackupError::configuration(
            self.model_name(),
            "implement `backupable` to select the rows to back up",
        ))
    }

    fn backup_mode(&self) -> BackupMode {
        BackupMode::Row
    }

    /// Overrides the chunk size given on the command line.
    fn chunk_size(&self) -> Option<u64> {
        None
    }

    fn backup_all(&self, driver: &dyn SqlDriver, chunk_size: u64, events: &mut Dispatcher<'_>) -> Result<u64>
    where
        Self: Sized,
    {
        backup_all(self, driver, chunk_size, events)
    }
}

pub fn effective_chunk_size(model: &dyn Backupable, requested: u64) -> u64 {
    model.chunk_size().unwrap_or(requested)
}

/// Resolve the backup table for `model` and copy its eligible rows into it.
pub fn backup_all(
    model: &dyn Backupable,
    driver: &dyn SqlDriver,
    chunk_size: u64,
    events: &mut Dispatcher<'_>,
) -> Result<u64> {
    if chunk_size == 0 {
        return Err(BackupError::Argument("chunk size must be greater than zero".into()));
    }

    let query = model.backupable()?;
    if query.source_table() != model.table() {
        return Err(BackupError::configuration(
            model.model_name(),
            format!(
                "backupable rows come from '{}' but the model's table is '{}'",
                query.source_table(),
                model.table()
            ),
        ));
    }

    let target = SchemaResolver::new(driver).resolve(model.table(), &model.backup_table_name())?;
    let mode = model.backup_mode();
    let job = CopyJob {
        driver,
        model: model.model_name(),
        query,
        target,
        primary_key: model.primary_key(),
        chunk_size,
    };

    let total = mode.copier().copy(&job, events)?;
    info!(model = job.model, backup = %job.target, ?mode, total, "backup finished");
    Ok(total)
}

/// Number of rows `backup_all` would process, without writing anything.
pub fn pretend(model: &dyn Backupable, driver: &dyn SqlDriver) -> Result<u64> {
    Ok(model.backupable()?.count(driver)?)
}
