use anyhow::Result;
use colored::*;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::warn;

use crate::backup::{self, Backupable, BackupMode, effective_chunk_size};
use crate::drivers::SqlDriver;
use crate::events::Dispatcher;
use crate::registry::ModelRegistry;
use crate::schema::SchemaResolver;
use crate::storage;

/// Options of the `backup` command.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub models: Vec<String>,
    pub except: Vec<String>,
    pub chunk: u64,
    pub pretend: bool,
}

/// Rows processed for one model (or rows that would be, under `--pretend`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutcome {
    pub model: String,
    pub total: u64,
}

pub fn do_backup(
    driver: &dyn SqlDriver,
    registry: &ModelRegistry,
    opts: &BackupOptions,
) -> Result<Vec<ModelOutcome>> {
    let selection = registry.select(&opts.models, &opts.except)?;
    for name in &selection.unknown {
        warn!(model = %name, "skipping unknown model");
        eprintln!(
            "{} {}: {}",
            "!".yellow().bold(),
            "Warning".yellow(),
            format!("model '{}' is not configured; skipping", name)
        );
    }

    if selection.models.is_empty() {
        print_info("No backupable models found.");
        return Ok(Vec::new());
    }

    if opts.pretend {
        return pretend_all(driver, &selection.models);
    }

    let started = chrono::Local::now();
    let bar = create_progress_bar("Backing up");
    let mut outcomes = Vec::new();

    for &model in &selection.models {
        let chunk = effective_chunk_size(model, opts.chunk);
        let mut announced = false;
        let mut events = Dispatcher::new();
        events.listen(|event| {
            if !announced {
                announced = true;
                bar.println("");
                bar.println(info_line(&format!("Backing up [{}] records.", event.model)));
            }
            bar.println(two_column(&event.model, &format!("{} records", event.count)));
            bar.set_message(format!("{}: {} records", event.model, event.count));
            Ok(())
        });

        let total = match backup::backup_all(model, driver, chunk, &mut events) {
            Ok(total) => total,
            Err(err) => {
                bar.abandon_with_message(format!("Backup of [{}] failed", model.model_name()));
                return Err(err.into());
            }
        };
        drop(events);

        if total == 0 {
            bar.println(info_line(&format!("No backupable [{}] records found.", model.model_name())));
        }
        outcomes.push(ModelOutcome { model: model.model_name().to_string(), total });
    }

    bar.finish_and_clear();
    print_summary(&selection.models, &outcomes);
    let elapsed = chrono::Local::now() - started;
    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Backup finished in {:.2}s", elapsed.num_milliseconds() as f64 / 1000.0).green()
    );
    Ok(outcomes)
}

fn pretend_all(driver: &dyn SqlDriver, models: &[&dyn Backupable]) -> Result<Vec<ModelOutcome>> {
    let mut outcomes = Vec::new();
    for &model in models {
        let count = backup::pretend(model, driver)?;
        if count == 0 {
            print_info(&format!("No backupable [{}] records found.", model.model_name()));
        } else {
            print_info(&format!("{} [{}] records will be backed up.", count, model.model_name()));
        }
        outcomes.push(ModelOutcome { model: model.model_name().to_string(), total: count });
    }
    Ok(outcomes)
}

pub fn do_list(driver: &dyn SqlDriver, registry: &ModelRegistry) -> Result<()> {
    if registry.is_empty() {
        print_info("No models configured");
        return Ok(());
    }

    let resolver = SchemaResolver::new(driver);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Model").add_attribute(Attribute::Bold),
            Cell::new("Table").add_attribute(Attribute::Bold),
            Cell::new("Mode").add_attribute(Attribute::Bold),
            Cell::new("Backup tables").add_attribute(Attribute::Bold),
        ]);

    for model in registry.iter() {
        let members = resolver.family_members(&model.backup_table_name())?;
        let backups = if members.is_empty() { "-".to_string() } else { members.join(", ") };
        table.add_row(vec![
            Cell::new(model.model_name()),
            Cell::new(model.table()),
            Cell::new(mode_name(model.backup_mode())),
            Cell::new(backups),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub fn do_init(dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let path = storage::init_at(&dir)?;
    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Wrote {}", path.display()).green()
    );
    Ok(())
}

pub fn do_version() {
    println!("{} {}", "backupable".bold(), env!("CARGO_PKG_VERSION").cyan());
}

fn print_summary(models: &[&dyn Backupable], outcomes: &[ModelOutcome]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Model").add_attribute(Attribute::Bold),
            Cell::new("Mode").add_attribute(Attribute::Bold),
            Cell::new("Records").add_attribute(Attribute::Bold),
        ]);
    for (model, outcome) in models.iter().zip(outcomes) {
        table.add_row(vec![
            Cell::new(&outcome.model),
            Cell::new(mode_name(model.backup_mode())),
            Cell::new(outcome.total).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
}

fn mode_name(mode: BackupMode) -> &'static str {
    match mode {
        BackupMode::Row => "row",
        BackupMode::Bulk => "bulk",
    }
}

fn info_line(message: &str) -> String {
    format!("{} {}", "i".blue().bold(), message.blue())
}

fn print_info(message: &str) {
    println!("{}", info_line(message));
}

/// `left ........ right`, padded to a fixed width.
fn two_column(left: &str, right: &str) -> String {
    const WIDTH: usize = 60;
    let dots = WIDTH.saturating_sub(left.chars().count() + right.chars().count() + 2).max(3);
    format!("  {} {} {}", left, ".".repeat(dots).bright_black(), right)
}

fn create_progress_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    bar.set_message(prefix.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}
