use crate::backup::{BackupMode, Backupable};
use crate::config::{BackupConfig, ModelConfig};
use crate::error::{BackupError, Result};
use crate::query::RowQuery;

/// A model described by configuration rather than code.
pub struct ConfiguredModel {
    config: ModelConfig,
}

impl ConfiguredModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

impl Backupable for ConfiguredModel {
    fn model_name(&self) -> &str {
        &self.config.name
    }

    fn table(&self) -> &str {
        &self.config.table
    }

    fn backup_table_name(&self) -> String {
        self.config
            .backup_table
            .clone()
            .unwrap_or_else(|| format!("{}_backup", self.config.table))
    }

    fn primary_key(&self) -> &str {
        &self.config.primary_key
    }

    fn backupable(&self) -> Result<RowQuery> {
        if !self.config.backupable {
            return Err(BackupError::configuration(
                &self.config.name,
                "model is marked as having no backupable rows",
            ));
        }
        let query = RowQuery::table(self.config.table.clone());
        Ok(match &self.config.filter {
            Some(filter) => query.filter(filter.clone(), self.config.bindings.clone()),
            None => query,
        })
    }

    fn backup_mode(&self) -> BackupMode {
        self.config.mode
    }

    fn chunk_size(&self) -> Option<u64> {
        self.config.chunk_size
    }
}

/// The models the command line can back up, in registration order.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<Box<dyn Backupable>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &BackupConfig) -> Self {
        let mut registry = Self::new();
        for model in &cfg.models {
            registry.register(ConfiguredModel::new(model.clone()));
        }
        registry
    }

    pub fn register(&mut self, model: impl Backupable + 'static) {
        self.models.push(Box::new(model));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backupable> {
        self.models.iter().find(|m| m.model_name() == name).map(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Backupable> {
        self.models.iter().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models chosen by `--model` / `--except`, plus the requested names that
    /// are not registered.
    pub fn select(&self, only: &[String], except: &[String]) -> Result<Selection<'_>> {
        if !only.is_empty() && !except.is_empty() {
            return Err(BackupError::Argument(
                "the --model and --except options cannot be combined".into(),
            ));
        }

        if !only.is_empty() {
            let mut selection = Selection::default();
            for name in only {
                match self.get(name) {
                    Some(model) => selection.models.push(model),
                    None => selection.unknown.push(name.clone()),
                }
            }
            return Ok(selection);
        }

        Ok(Selection {
            models: self
                .iter()
                .filter(|m| !except.iter().any(|e| e == m.model_name()))
                .collect(),
            unknown: Vec::new(),
        })
    }
}

#[derive(Default)]
pub struct Selection<'a> {
    pub models: Vec<&'a dyn Backupable>,
    pub unknown: Vec<String>,
}
