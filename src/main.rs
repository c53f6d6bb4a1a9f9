//! shelve - snapshot a folder tree, package it and ship it to object storage.

mod commands;
mod error;

use clap::{ArgAction, Parser, Subcommand};
use shelve_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// shelve - archive folders to object storage
#[derive(Parser, Debug)]
#[command(name = "shelve")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (toml, yaml or json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Snapshot, package, bundle, catalogue and upload a folder
    Archive {
        /// Name of the folder to archive
        folder: String,

        /// Label appended to the archive id (spaces become underscores)
        #[arg(long)]
        name: Option<String>,

        /// Creation time as "YYYY-MM-DD HH:MM" (UTC); defaults to now
        #[arg(long)]
        timestamp: Option<String>,

        /// Keep the local bundle and scratch space after the run
        #[arg(long)]
        no_cleanup: bool,
    },

    /// Write the manifest of a folder without archiving it
    Snapshot {
        /// Name of the folder to snapshot
        folder: String,

        /// Where to write the manifest document
        out: PathBuf,
    },

    /// Query the archive catalog
    #[command(subcommand)]
    Catalog(CatalogCommands),
}

#[derive(Subcommand, Debug)]
enum CatalogCommands {
    /// Print one catalog record
    Get {
        /// Archive id
        id: String,
    },

    /// List catalog records, oldest first
    #[command(alias = "ls")]
    List {
        /// Only records stored in this bucket
        #[arg(long)]
        bucket: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:?}");
            return ExitCode::FAILURE;
        },
    };

    let result = match cli.command {
        Commands::Archive {
            folder,
            name,
            timestamp,
            no_cleanup,
        } => commands::archive(&config, &folder, name.as_deref(), timestamp.as_deref(), no_cleanup).await,
        Commands::Snapshot { folder, out } => commands::snapshot(&config, &folder, &out).await,
        Commands::Catalog(CatalogCommands::Get { id }) => commands::catalog_get(&config, &id).await,
        Commands::Catalog(CatalogCommands::List { bucket }) => {
            commands::catalog_list(&config, bucket.as_deref()).await
        },
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case::archive(&["shelve", "archive", "Finances", "--name", "Q1 2024", "--no-cleanup"])]
    #[case::snapshot(&["shelve", "-v", "snapshot", "Finances", "out.json"])]
    #[case::catalog_get(&["shelve", "catalog", "get", "archive_202401010930"])]
    #[case::catalog_list(&["shelve", "--config", "shelve.toml", "catalog", "ls", "--bucket", "b"])]
    fn test_parses(#[case] args: &[&str]) {
        Cli::try_parse_from(args).unwrap();
    }

    #[test]
    fn test_archive_arguments() {
        let cli = Cli::try_parse_from(["shelve", "-vv", "archive", "Finances", "--timestamp", "2024-01-01 09:30"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Archive {
            folder,
            name,
            timestamp,
            no_cleanup,
        } = cli.command
        else {
            panic!("expected the archive command");
        };
        assert_eq!(folder, "Finances");
        assert_eq!(name, None);
        assert_eq!(timestamp.as_deref(), Some("2024-01-01 09:30"));
        assert!(!no_cleanup);
    }

    #[test]
    fn test_folder_is_required() {
        assert!(Cli::try_parse_from(["shelve", "archive"]).is_err());
    }
}
