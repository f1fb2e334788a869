//! Copy rows of database tables into versioned backup tables.
//!
//! A [`Backupable`] model names its table and the rows eligible for backup.
//! [`backup_all`] asks the [`SchemaResolver`] for a backup table whose
//! columns match the source table (creating `<table>_backup`, `_backup_1`,
//! ... as the source schema drifts) and then copies the rows with the
//! model's [`BackupMode`], reporting progress through a [`Dispatcher`].

pub mod backup;
pub mod cli;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod ops;
pub mod query;
pub mod registry;
pub mod schema;
pub mod storage;

pub use backup::{BackupMode, Backupable, backup_all};
pub use drivers::{Column, Dialect, Row, SqlDriver, Value};
pub use error::BackupError;
pub use events::{BackupEvent, Dispatcher};
pub use query::RowQuery;
pub use registry::ModelRegistry;
pub use schema::{ColumnSignature, SchemaResolver};
