use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{BackupConfig, ModelConfig};

pub const CONFIG_FILE: &str = "backupable.json";

/// Write a starter configuration into `dir`.
pub fn init_at(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        return Err(anyhow!("{} already exists", path.display()));
    }
    fs::create_dir_all(dir)?;

    let mut example = ModelConfig::new("User", "users");
    example.filter = Some("deleted_at IS NOT NULL".into());
    let cfg = BackupConfig {
        database: Some("database.sqlite".into()),
        models: vec![example],
        ..BackupConfig::default()
    };
    save_config(&path, &cfg)?;
    Ok(path)
}

/// Nearest `backupable.json` in `start` or its parents.
pub fn find_config(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    Err(anyhow!("no {} found in {} or its parents", CONFIG_FILE, start.display()))
}

pub fn load_config(path: &Path) -> Result<BackupConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: BackupConfig = serde_json::from_str(&content)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &BackupConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(cfg)?;
    fs::write(path, content)?;
    Ok(())
}

/// Relative database paths are taken from the configuration file's directory.
pub fn resolve_database(config_path: &Path, database: &str) -> String {
    let is_relative_file = !database.contains("://")
        && database != ":memory:"
        && Path::new(database).is_relative();
    match config_path.parent() {
        Some(dir) if is_relative_file && !dir.as_os_str().is_empty() => {
            dir.join(database).display().to_string()
        }
        _ => database.to_string(),
    }
}
