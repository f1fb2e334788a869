use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use backupable::backup::DEFAULT_CHUNK_SIZE;
use backupable::cli::{Cli, Commands};
use backupable::config::BackupConfig;
use backupable::drivers::{SqlDriver, selector::open_driver_for_target};
use backupable::ops::{self, BackupOptions};
use backupable::registry::ModelRegistry;
use backupable::storage;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { ref dir } => {
            ops::do_init(dir.clone())?;
        }
        Commands::Version => {
            ops::do_version();
        }
        Commands::Backup { ref models, ref except, chunk, pretend } => {
            let (cfg, driver) = open(&cli)?;
            let registry = ModelRegistry::from_config(&cfg);
            let opts = BackupOptions {
                models: models.clone(),
                except: except.clone(),
                chunk: chunk.unwrap_or(cfg.chunk),
                pretend,
            };
            ops::do_backup(driver.as_ref(), &registry, &opts)?;
        }
        Commands::List => {
            let (cfg, driver) = open(&cli)?;
            ops::do_list(driver.as_ref(), &ModelRegistry::from_config(&cfg))?;
        }
    }

    Ok(())
}

/// Load the configuration and connect to its database.
fn open(cli: &Cli) -> Result<(BackupConfig, Box<dyn SqlDriver>)> {
    let path = match &cli.config {
        Some(p) => p.clone(),
        None => storage::find_config(&std::env::current_dir()?)?,
    };
    let cfg = storage::load_config(&path)?;
    if cfg.chunk == 0 {
        return Err(anyhow!("chunk in {} must be greater than zero (default {})", path.display(), DEFAULT_CHUNK_SIZE));
    }

    let database = match (&cli.database, &cfg.database) {
        (Some(db), _) => db.clone(),
        (None, Some(db)) => storage::resolve_database(&path, db),
        (None, None) => return Err(anyhow!("no database configured; pass --database or set it in {}", path.display())),
    };
    let driver = open_driver_for_target(&database)?;
    Ok((cfg, driver))
}
