//! kenya-update-aspirants - bring Mzalendo aspirants in line with the IEBC
//!
//! Without `--commit` the run is a dry run: everything is reconciled inside a
//! transaction that is rolled back at the end, and the report shows what
//! would have changed.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pombola_common::config::{RootFolder, TomlConfig, DATABASE_ENV, ROOT_FOLDER_ENV};
use pombola_common::db::init_database;
use pombola_iebc::config::IebcCredentials;
use pombola_iebc::corrections::Corrections;
use pombola_iebc::data_files::SAME_PERSON_REVIEW;
use pombola_iebc::iebc::{IebcClient, IebcFeed, ResponseCache};
use pombola_iebc::races::RaceTable;
use pombola_iebc::same_person::SamePersonChecker;
use pombola_iebc::{ImportSettings, Importer};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for kenya-update-aspirants
#[derive(Parser, Debug)]
#[command(name = "kenya-update-aspirants")]
#[command(about = "Update Mzalendo aspirants from the IEBC candidate API")]
#[command(version)]
struct Cli {
    /// Root folder holding the database and election data
    #[arg(long, global = true, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Database file (default: <root>/pombola.db)
    #[arg(long, global = true, env = DATABASE_ENV)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true, env = "POMBOLA_CONFIG")]
    config: Option<PathBuf>,

    /// IEBC application id
    #[arg(long, global = true)]
    api_id: Option<String>,

    /// IEBC shared secret
    #[arg(long, global = true)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile aspirant positions with the IEBC candidate lists
    Run {
        /// Actually update the database
        #[arg(long)]
        commit: bool,

        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Ignore cached API responses and fetch them again
        #[arg(long)]
        refresh_cache: bool,
    },
    /// List candidate/person pairs awaiting a same-person decision
    Pending,
}

fn init_logging(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.logging.level)));

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config)?;

    info!(
        "kenya-update-aspirants {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut root = RootFolder::resolve(cli.root_folder.as_deref(), &config);
    if let Some(database) = &cli.database {
        root = root.with_database_path(database.clone());
    }
    info!("Root folder: {}", root.root().display());
    info!("Data directory: {}", root.data_directory().display());

    match cli.command {
        Command::Pending => list_pending(&root),
        Command::Run {
            commit,
            report,
            refresh_cache,
        } => {
            run_import(
                &cli.api_id,
                &cli.api_secret,
                &config,
                &root,
                commit,
                report,
                refresh_cache,
            )
            .await
        }
    }
}

fn list_pending(root: &RootFolder) -> Result<()> {
    let checker = SamePersonChecker::load(root.data_directory().join(SAME_PERSON_REVIEW))
        .context("Failed to read same-person review file")?;
    let pending = checker.pending();

    if pending.is_empty() {
        println!("Nothing awaiting review in {}", checker.path().display());
        return Ok(());
    }

    println!("{} pair(s) awaiting review in {}:", pending.len(), checker.path().display());
    for row in pending {
        println!(
            "  {} {} ({}, {}) -> {} [{}]",
            row.candidate_code,
            row.candidate_name,
            row.place_slug,
            row.race_type,
            row.person_name,
            row.person_slug
        );
    }
    Ok(())
}

async fn run_import(
    api_id: &Option<String>,
    api_secret: &Option<String>,
    config: &TomlConfig,
    root: &RootFolder,
    commit: bool,
    report_path: Option<PathBuf>,
    refresh_cache: bool,
) -> Result<()> {
    root.ensure_exists().context("Failed to create root folder")?;

    let db_pool = init_database(root.database_path())
        .await
        .context("Failed to open database")?;
    info!("Database: {}", root.database_path().display());

    let data_directory = root.data_directory();
    let corrections = Corrections::load(data_directory).context("Failed to load correction tables")?;
    let checker = SamePersonChecker::load(data_directory.join(SAME_PERSON_REVIEW))
        .context("Failed to read same-person review file")?;

    let credentials = IebcCredentials::resolve(api_id.as_deref(), api_secret.as_deref(), config)?;
    let cache = ResponseCache::open(data_directory.join(&config.iebc.cache_directory), refresh_cache)
        .context("Failed to open API cache")?;

    let mut client = IebcClient::new(
        &config.iebc.api_base_url,
        credentials.api_id,
        credentials.api_secret,
        config.iebc.rate_limit_ms,
    )?;
    client
        .authenticate()
        .await
        .context("Failed to authenticate with the IEBC API")?;

    let settings = ImportSettings::from_config(&config.iebc, chrono::Local::now().date_naive(), commit);
    let mut importer = Importer::new(
        IebcFeed::new(client, cache),
        RaceTable::from_config(&config.iebc),
        corrections,
        checker,
        settings,
    );

    let report = importer.run(&db_pool).await.context("Aspirant import failed")?;
    report.log_summary();

    if let Some(path) = report_path {
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    db_pool.close().await;
    Ok(())
}
