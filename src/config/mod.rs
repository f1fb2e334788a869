pub mod backupable;

pub use backupable::{BackupConfig, ModelConfig};
