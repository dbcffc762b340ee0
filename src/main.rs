use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rssbox::config::Config;
use rssbox::feed::HttpFetcher;
use rssbox::ingest::{IngestFailure, Ingestor};
use rssbox::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/rssbox/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("rssbox"))
}

/// Config file location: `--config` if given, otherwise inside the config
/// directory. The directory is only resolved when needed.
fn resolve_config_path(
    cli: Option<PathBuf>,
    config_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    match cli {
        Some(path) => Ok(path),
        None => Ok(config_dir()?.join("config.toml")),
    }
}

/// Database location: `--db`, then `database_path` from the config, then
/// `rssbox.db` inside the config directory (created on demand).
fn resolve_db_path(
    cli: Option<PathBuf>,
    configured: Option<PathBuf>,
    config_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = cli.or(configured) {
        return Ok(path);
    }
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir).context("Failed to create config directory")?;
    }
    Ok(dir.join("rssbox.db"))
}

#[derive(Parser, Debug)]
#[command(
    name = "rssbox",
    version,
    about = "Fetch RSS/Atom feeds into a deduplicated article store"
)]
struct Args {
    /// Config file (default: ~/.config/rssbox/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides `database_path` from the config
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the feed registry
    Feeds {
        #[command(subcommand)]
        action: FeedsAction,
    },
    /// Fetch every registered feed once and store new articles
    Update {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FeedsAction {
    /// List registered feeds, newest first
    List,
    /// Register a feed URL
    Add { url: String },
    /// Unregister a feed URL (its articles are kept)
    Remove { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.clone(), get_config_dir)?;

    // Parse errors are reported after logging is up, so load quietly first.
    let config = Config::load(&config_path);

    // RUST_LOG wins; otherwise use the configured level.
    let default_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = resolve_db_path(args.db.clone(), config.database_path.clone(), get_config_dir)?;

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            anyhow::bail!(
                "Database {} is locked by another rssbox process. Please try again later.",
                db_path.display()
            );
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let outcome = run(&args.command, &config, &db).await;
    db.close().await;
    outcome
}

async fn run(command: &Command, config: &Config, db: &Database) -> Result<()> {
    match command {
        Command::Feeds { action } => match action {
            FeedsAction::List => {
                let feeds = db.list_feeds().await.context("Failed to list feeds")?;
                if feeds.is_empty() {
                    println!("No feeds registered. Add one with: rssbox feeds add <URL>");
                }
                for feed in feeds {
                    println!("{:>5}  {}", feed.id, feed.url);
                }
            }
            FeedsAction::Add { url } => {
                let feed = db
                    .add_feed(url)
                    .await
                    .with_context(|| format!("Failed to add feed {}", url))?;
                println!("Feed {} registered: {}", feed.id, feed.url);
            }
            FeedsAction::Remove { url } => {
                let removed = db
                    .remove_feed(url)
                    .await
                    .with_context(|| format!("Failed to remove feed {}", url))?;
                if removed {
                    println!("Feed removed: {}", url);
                } else {
                    println!("Feed not registered: {}", url);
                }
            }
        },
        Command::Update { json } => {
            let fetcher =
                HttpFetcher::from_config(config).context("Failed to build HTTP client")?;
            let ingestor = Ingestor::new(db.clone(), fetcher, db.clone())
                .with_concurrency(config.fetch_concurrency());

            let result = ingestor.run_cycle().await.context("Update failed")?;

            if *json {
                let body = serde_json::json!({
                    "status": "success",
                    "new_articles_count": result.new_article_count,
                });
                println!("{}", body);
            } else {
                println!(
                    "{} new articles from {} feeds ({} failed, {} already stored)",
                    result.new_article_count,
                    result.sources_total,
                    result.sources_failed,
                    result.duplicates
                );
                for failure in &result.failures {
                    match failure {
                        IngestFailure::SourceFetchFailed { url, cause, .. } => {
                            eprintln!("  feed {}: {}", url, cause)
                        }
                        IngestFailure::WriteFailed { link, cause } => {
                            eprintln!("  article {}: {}", link, cause)
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
