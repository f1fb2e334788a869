use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// backupable: copy table rows into versioned backup tables
#[derive(Parser, Debug)]
#[command(name = "backupable", version, about = "Copy eligible table rows into schema-checked backup tables.", long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Path to backupable.json (searched for upwards from the current directory if omitted)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Database address, overriding the configuration (e.g., app.sqlite)
    #[arg(short = 'd', long = "database", global = true)]
    pub database: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up the records of the configured models
    Backup {
        /// Names of the models to back up
        #[arg(long = "model", value_name = "MODEL", conflicts_with = "except")]
        models: Vec<String>,

        /// Names of the models to leave out
        #[arg(long = "except", value_name = "MODEL")]
        except: Vec<String>,

        /// Number of records per chunk (defaults to the configuration's chunk, 1000)
        #[arg(long = "chunk", value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        chunk: Option<u64>,

        /// Show how many records would be backed up without copying anything
        #[arg(long)]
        pretend: bool,
    },

    /// Write a starter backupable.json into the target (or current) directory
    Init {
        /// Directory to write the configuration into
        dir: Option<PathBuf>,
    },

    /// List each model's backup tables
    List,

    /// Print CLI version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn repeatable_model_flags() {
        let cli = Cli::try_parse_from(["backupable", "backup", "--model", "User", "--model", "Order", "--pretend"])
            .unwrap();
        match cli.command {
            Commands::Backup { models, except, chunk, pretend } => {
                assert_eq!(models, vec!["User", "Order"]);
                assert!(except.is_empty());
                assert_eq!(chunk, None);
                assert!(pretend);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn model_and_except_conflict() {
        let err = Cli::try_parse_from(["backupable", "backup", "--model", "Foo", "--except", "Bar"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn zero_chunk_is_rejected() {
        assert!(Cli::try_parse_from(["backupable", "backup", "--chunk", "0"]).is_err());
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["backupable", "list", "--database", "app.sqlite"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some("app.sqlite"));
    }
}
