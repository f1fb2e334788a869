use tracing::debug;

use super::{CopyJob, Copier};
use crate::error::{BackupError, Result};
use crate::events::{BackupEvent, Dispatcher};

/// Walks the rows in primary-key order, `chunk_size` at a time, and writes
/// each one with its own insert-or-ignore. Rows already in the backup table
/// are left as they are, so a rerun after a failure is harmless.
pub struct RowCopier;

impl Copier for RowCopier {
    fn copy(&self, job: &CopyJob<'_>, events: &mut Dispatcher<'_>) -> Result<u64> {
        let dialect = job.driver.dialect();
        let pk = job.primary_key;
        let mut total: u64 = 0;
        let mut last_key = None;

        loop {
            let mut chunk = job.query.clone().order_by(pk).limit(job.chunk_size);
            if let Some(key) = last_key.take() {
                chunk = chunk.after_key(pk, key);
            }
            let (sql, bindings) = chunk.to_sql(dialect);
            let rows = job.driver.query(&sql, &bindings)?;
            let Some(last) = rows.last() else { break };

            for row in &rows {
                let insert = dialect.insert_ignore_row(&job.target, &row.columns);
                job.driver.execute(&insert, &row.values)?;
            }

            total += rows.len() as u64;
            last_key = Some(last.get(pk).cloned().ok_or_else(|| {
                BackupError::configuration(job.model, format!("selected rows lack primary key column '{}'", pk))
            })?);
            debug!(model = job.model, backup = %job.target, rows = rows.len(), total, "chunk copied");
            events.dispatch(&BackupEvent::new(job.model, total))?;

            if (rows.len() as u64) < job.chunk_size {
                break;
            }
        }

        Ok(total)
    }
}
