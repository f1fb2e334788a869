use serde::{Deserialize, Serialize};

use crate::backup::{BackupMode, DEFAULT_CHUNK_SIZE};
use crate::drivers::Value;

/// Contents of `backupable.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackupConfig {
    /// Database address, e.g. a SQLite file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default = "default_chunk")]
    pub chunk: u64,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { database: None, chunk: DEFAULT_CHUNK_SIZE, models: Vec::new() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub mode: BackupMode,
    /// SQL condition selecting the rows to back up; all rows when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Value>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    /// Base name of the backup tables (default `<table>_backup`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_table: Option<String>,
    /// `false` marks a model that has no row-set definition yet.
    #[serde(default = "default_true")]
    pub backupable: bool,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            mode: BackupMode::default(),
            filter: None,
            bindings: Vec::new(),
            primary_key: default_primary_key(),
            chunk_size: None,
            backup_table: None,
            backupable: true,
        }
    }
}

fn default_chunk() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}
