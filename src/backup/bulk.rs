use tracing::debug;

use super::{CopyJob, Copier};
use crate::error::{BackupError, Result};
use crate::events::{BackupEvent, Dispatcher};

/// Copies the rows without loading them: one `INSERT IGNORE .. SELECT` per
/// page of `chunk_size` rows.
///
/// Pages use LIMIT/OFFSET over the primary-key order, recomputed from the
/// initial count. Rows inserted or deleted in the source while the run is in
/// progress can shift page boundaries, so a concurrent write may cause a row
/// to be skipped or copied twice (the second copy is ignored).
pub struct BulkCopier;

impl Copier for BulkCopier {
    fn copy(&self, job: &CopyJob<'_>, events: &mut Dispatcher<'_>) -> Result<u64> {
        let dialect = job.driver.dialect();
        let total = job.query.count(job.driver)?;
        if total == 0 {
            return Ok(0);
        }

        // source column order; the target has the same set
        let columns: Vec<String> = job
            .driver
            .columns(job.query.source_table())?
            .into_iter()
            .map(|c| c.name)
            .collect();
        if columns.is_empty() {
            return Err(BackupError::configuration(
                job.model,
                format!("table '{}' has no columns", job.query.source_table()),
            ));
        }

        let pages = total.div_ceil(job.chunk_size);
        for page in 1..=pages {
            let (select_sql, bindings) = job
                .query
                .clone()
                .select(columns.clone())
                .order_by(job.primary_key)
                .limit(job.chunk_size)
                .offset((page - 1) * job.chunk_size)
                .to_sql(dialect);
            let statement = dialect.insert_ignore_select(&job.target, &columns, &select_sql);
            let inserted = job.driver.execute(&statement, &bindings)?;

            let done = total.min(page * job.chunk_size);
            debug!(model = job.model, backup = %job.target, page, pages, inserted, "page copied");
            events.dispatch(&BackupEvent::new(job.model, done))?;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Value;
    use crate::drivers::recording::RecordingDriver;
    use crate::query::RowQuery;

    fn job<'a>(driver: &'a RecordingDriver, chunk_size: u64) -> CopyJob<'a> {
        CopyJob {
            driver,
            model: "User",
            query: RowQuery::table("users").filter("deleted_at < ?", vec!["2024-01-01".into()]),
            target: "users_backup".into(),
            primary_key: "id",
            chunk_size,
        }
    }

    #[test]
    fn emits_capped_running_counts_per_page() {
        let d = RecordingDriver::default().with_table("users", &[("id", "int"), ("name", "varchar")]);
        d.count.set(2500);

        let counts = std::cell::RefCell::new(Vec::new());
        let mut events = Dispatcher::new();
        events.listen(|e| {
            counts.borrow_mut().push(e.count);
            Ok(())
        });
        let total = BulkCopier.copy(&job(&d, 1000), &mut events).unwrap();
        drop(events);

        assert_eq!(total, 2500);
        assert_eq!(counts.into_inner(), vec![1000, 2000, 2500]);

        let executed = d.executed.borrow();
        assert_eq!(executed.len(), 3);
        assert_eq!(
            executed[2].0,
            "INSERT IGNORE INTO `users_backup` (`id`, `name`) SELECT `id`, `name` FROM `users` \
             WHERE (deleted_at < ?) ORDER BY `id` LIMIT 1000 OFFSET 2000"
        );
        assert_eq!(executed[0].1, vec![Value::from("2024-01-01")]);
    }

    #[test]
    fn counts_with_the_source_bindings() {
        let d = RecordingDriver::default().with_table("users", &[("id", "int")]);
        BulkCopier.copy(&job(&d, 10), &mut Dispatcher::new()).unwrap();
        let queried = d.queried.borrow();
        assert_eq!(queried[0].0, "SELECT COUNT(*) FROM `users` WHERE (deleted_at < ?)");
        assert_eq!(queried[0].1, vec![Value::from("2024-01-01")]);
    }

    #[test]
    fn nothing_to_copy_issues_no_writes() {
        let d = RecordingDriver::default().with_table("users", &[("id", "int")]);
        assert_eq!(BulkCopier.copy(&job(&d, 10), &mut Dispatcher::new()).unwrap(), 0);
        assert!(d.statements().is_empty());
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let d = RecordingDriver::default().with_table("users", &[("id", "int")]);
        d.count.set(20);
        let mut last = 0;
        let mut events = Dispatcher::new();
        events.listen(|e| {
            last = e.count;
            Ok(())
        });
        BulkCopier.copy(&job(&d, 10), &mut events).unwrap();
        drop(events);
        assert_eq!(last, 20);
        assert_eq!(d.statements().len(), 2);
    }
}
