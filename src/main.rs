use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

// Use library instead of local modules
use paper_listings::{count_papers, insert_papers, load_csv, setup_database, Config, ListingEngine};

#[derive(Parser)]
#[command(name = "paper-listings", version, about = "New and cross-listed papers by category and period")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Metadata database, overriding the config
    #[arg(long, global = true, env = "PAPER_LISTINGS_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import paper metadata from CSV
    Import {
        csv: PathBuf,
    },
    /// Print the listing of an archive or category
    List {
        archive_or_category: String,
        year: i32,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        show: Option<usize>,
    },
    /// Print monthly new/cross counts for a year
    Counts {
        archive: String,
        year: i32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    match cli.command {
        Command::Import { csv } => run_import(&config, &csv),
        Command::List {
            archive_or_category,
            year,
            month,
            skip,
            show,
        } => {
            let engine = open_engine(&config)?;
            let show = show.unwrap_or(config.default_show);
            let listing = engine.get_articles_for_period(&archive_or_category, year, month, skip, show)?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
        Command::Counts { archive, year } => {
            let engine = open_engine(&config)?;
            let counts = engine.get_yearly_counts(&archive, year)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
            Ok(())
        }
    }
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    let papers = load_csv(csv_path).with_context(|| format!("Failed to read {:?}", csv_path))?;
    info!("Loaded {} metadata rows from CSV", papers.len());

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    setup_database(&conn)?;

    let inserted = insert_papers(&conn, &papers)?;
    let total = count_papers(&conn)?;
    info!("Inserted {} rows; database holds {} papers", inserted, total);

    Ok(())
}

fn open_engine(config: &Config) -> Result<ListingEngine<Connection>> {
    if !config.database_path.exists() {
        anyhow::bail!(
            "Database not found at {:?}; run `paper-listings import <csv>` first",
            config.database_path
        );
    }

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    let taxonomy = config.taxonomy().context("Failed to load taxonomy")?;

    Ok(ListingEngine::new(taxonomy, conn, config.expiry_policy()?))
}
