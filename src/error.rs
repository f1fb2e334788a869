use thiserror::Error;

/// Errors surfaced by a backup run.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The model did not supply the row-set to back up.
    #[error("model '{model}' does not define its backupable rows: {reason}")]
    Configuration { model: String, reason: String },

    /// Creating a backup table failed.
    #[error("failed to create backup table '{table}': {source}")]
    SchemaOperation {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    /// A progress listener failed; the remaining chunks are not copied.
    #[error("backup listener failed: {0}")]
    Listener(#[source] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl BackupError {
    pub fn configuration(model: &str, reason: impl Into<String>) -> Self {
        BackupError::Configuration { model: model.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
