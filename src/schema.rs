use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::drivers::{Column, SqlDriver};
use crate::error::{BackupError, Result};

/// Column names mapped to normalized declared types. Equality ignores
/// column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSignature(BTreeMap<String, String>);

impl ColumnSignature {
    pub fn new(columns: &[Column]) -> Self {
        columns.iter().cloned().collect()
    }

    pub fn of(driver: &dyn SqlDriver, table: &str) -> Result<Self> {
        Ok(Self::new(&driver.columns(table)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human-readable differences going from `self` to `current`,
    /// e.g. `+email text`, `-legacy`, `~age int -> bigint`.
    pub fn drift_from(&self, current: &ColumnSignature) -> Vec<String> {
        let mut changes = Vec::new();
        for (name, kind) in &current.0 {
            match self.0.get(name) {
                None => changes.push(format!("+{} {}", name, kind)),
                Some(old) if old != kind => changes.push(format!("~{} {} -> {}", name, old, kind)),
                Some(_) => {}
            }
        }
        for name in self.0.keys().filter(|n| !current.0.contains_key(*n)) {
            changes.push(format!("-{}", name));
        }
        changes
    }
}

impl FromIterator<Column> for ColumnSignature {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|c| (c.name, c.kind.trim().to_lowercase()))
                .collect(),
        )
    }
}

/// Naming of the versioned backup tables that belong to one base name:
/// `base` is index 0, `base_1`, `base_2`, ... follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFamily {
    base: String,
}

impl BackupFamily {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn member(&self, index: u32) -> String {
        if index == 0 {
            self.base.clone()
        } else {
            format!("{}_{}", self.base, index)
        }
    }

    /// Index of `table` within the family. Only canonical suffixes count:
    /// `base_01` or `base_x` are unrelated tables.
    pub fn index_of(&self, table: &str) -> Option<u32> {
        if table == self.base {
            return Some(0);
        }
        let suffix = table.strip_prefix(self.base.as_str())?.strip_prefix('_')?;
        if suffix.is_empty() || suffix.starts_with('0') || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Existing members, ordered by index.
    pub fn members(&self, table_names: &[String]) -> Vec<(u32, String)> {
        let mut found: Vec<(u32, String)> = table_names
            .iter()
            .filter_map(|t| self.index_of(t).map(|i| (i, t.clone())))
            .collect();
        found.sort();
        found
    }

    pub fn latest(&self, table_names: &[String]) -> Option<u32> {
        self.members(table_names).last().map(|(i, _)| *i)
    }
}

/// Picks the backup table for a source table, creating a new family member
/// when the latest one no longer matches the source's columns.
///
/// Only the highest-indexed member is ever reused. When it has drifted the
/// next table is `max + 1`, never a gap or an older stale member.
///
/// No locking is done. Two processes resolving the same family at once may
/// both try to create the same table; the loser succeeds if the winner's
/// table already matches the source, and fails otherwise. Callers that need
/// strict serialization must hold an external lock keyed by source table.
pub struct SchemaResolver<'a> {
    driver: &'a dyn SqlDriver,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(driver: &'a dyn SqlDriver) -> Self {
        Self { driver }
    }

    pub fn family_members(&self, base: &str) -> Result<Vec<String>> {
        let names = self.driver.list_table_names()?;
        Ok(BackupFamily::new(base)
            .members(&names)
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }

    /// Name of a backup table for `source` whose columns match the source's
    /// current columns.
    pub fn resolve(&self, source: &str, base: &str) -> Result<String> {
        let family = BackupFamily::new(base);
        let names = self.driver.list_table_names()?;

        let Some(latest) = family.latest(&names) else {
            let target = family.member(0);
            self.create(source, &target)?;
            return Ok(target);
        };

        let candidate = family.member(latest);
        let current = ColumnSignature::of(self.driver, source)?;
        let existing = ColumnSignature::of(self.driver, &candidate)?;
        if existing == current {
            debug!(source, backup = %candidate, "reusing backup table");
            return Ok(candidate);
        }

        let next = latest.checked_add(1).ok_or_else(|| BackupError::SchemaOperation {
            table: candidate.clone(),
            source: anyhow::anyhow!("no backup table index left after '{}'", candidate),
        })?;
        let target = family.member(next);
        warn!(
            source,
            stale = %candidate,
            next = %target,
            changes = %existing.drift_from(&current).join(", "),
            "source table drifted from its backup table"
        );
        self.create(source, &target)?;
        Ok(target)
    }

    fn create(&self, source: &str, target: &str) -> Result<()> {
        match self.driver.duplicate_table(source, target) {
            Ok(()) => {
                info!(source, backup = target, "created backup table");
                Ok(())
            }
            Err(err) => {
                if self.created_concurrently(source, target) {
                    warn!(source, backup = target, error = %err, "backup table was created concurrently; reusing it");
                    return Ok(());
                }
                Err(BackupError::SchemaOperation { table: target.to_string(), source: err })
            }
        }
    }

    fn created_concurrently(&self, source: &str, target: &str) -> bool {
        let exists = self.driver.table_exists(target).unwrap_or(false);
        if !exists {
            return false;
        }
        match (ColumnSignature::of(self.driver, source), ColumnSignature::of(self.driver, target)) {
            (Ok(a), Ok(b)) => !a.is_empty() && a == b,
            _ => false,
        }
    }
}
