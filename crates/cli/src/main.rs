use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use roster_core::logging::{self, LoggingConfig};
use roster_core::{Config, NewRecord, Record, SearchResult, Status, demo_records};
use roster_store::{RecordStore, SearchFilters};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_CONFIG_PATH: &str = "roster.toml";

/// Roster - a user record store with weighted search
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Store user records and search them by name, username and bio", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to roster.toml (default: ./roster.toml if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file, overriding the config and ROSTER_DB
    #[arg(long, value_name = "PATH", conflicts_with = "memory")]
    db: Option<PathBuf>,

    /// Use a throwaway in-memory database
    #[arg(long)]
    memory: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an example roster.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Insert the ten demo users
    Seed,
    /// Insert a single user
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        bio: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
        #[arg(long)]
        created_by: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
    },
    /// List every user in insertion order
    List,
    /// Show the newest users first
    Recent {
        #[arg(short = 'n', long, default_value_t = 2)]
        limit: usize,
    },
    /// Ranked search over name, username and bio
    Search {
        /// Search terms (joined with spaces)
        #[arg(required = true, value_name = "QUERY")]
        query: Vec<String>,

        /// Maximum results (default: search.default_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,

        #[arg(long)]
        role: Option<String>,
    },
    /// Show record counts
    Stats,
}

fn parse_status(s: &str) -> std::result::Result<Status, String> {
    Status::from_str(s).map_err(|e| e.message)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        return cmd_init_config(&path, force);
    }

    let config = resolve_config(load_config(cli.config.as_deref())?, cli.db.as_deref(), cli.memory);

    let mut logging_config = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        logging_config = logging_config.with_level("debug");
    }
    let _log_guard = logging::init_logging(Some(logging_config)).context("Failed to initialize logging")?;

    let store = RecordStore::open_with(&config.store)
        .await
        .context("Failed to open record store")?;

    let result = dispatch(&store, &config, cli.command, cli.json).await;
    store.close().await.context("Failed to close record store")?;
    result
}

async fn dispatch(store: &RecordStore, config: &Config, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::InitConfig { .. } => anyhow::bail!("init-config does not operate on the record store"),
        Commands::Seed => cmd_seed(store, json).await,
        Commands::Add { username, email, name, bio, role, status, created_by, nickname } => {
            let mut record = NewRecord::new(username, email).with_name(name).with_bio(bio);
            record.role = role;
            record.status = status.unwrap_or_default();
            record.created_by = created_by;
            record.nickname = nickname;
            cmd_add(store, record, json).await
        }
        Commands::List => cmd_list(store, json).await,
        Commands::Recent { limit } => cmd_recent(store, limit, json).await,
        Commands::Search { query, limit, status, role } => {
            let filters =
                SearchFilters { status, role, limit: Some(limit.unwrap_or(config.search.default_limit)) };
            cmd_search(store, &query.join(" "), filters, json).await
        }
        Commands::Stats => cmd_stats(store, json).await,
    }
}

/// Load config from an explicit path, the default path, or fall back to defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Config::from_file(default_path)
                    .with_context(|| format!("Failed to load config from {}", default_path.display()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Layer ROSTER_DB and command-line overrides on top of the file config
fn resolve_config(config: Config, db: Option<&Path>, memory: bool) -> Config {
    let mut config = config.with_env_overrides();
    if let Some(db) = db {
        config = config.with_db_override(&db.to_string_lossy());
    }
    if memory {
        config.store.in_memory = true;
    }
    config
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    std::fs::write(path, Config::example()).context("Failed to write config")?;
    println!("{} Wrote example config to {}", "Success:".green().bold(), path.display());
    Ok(())
}

async fn cmd_seed(store: &RecordStore, json: bool) -> Result<()> {
    let records = demo_records().context("Failed to load demo users")?;
    let inserted = store.insert(records).await.context("Failed to insert demo users")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inserted)?);
    } else {
        println!("{} {} users added", "Success:".green().bold(), inserted.len());
    }
    Ok(())
}

async fn cmd_add(store: &RecordStore, record: NewRecord, json: bool) -> Result<()> {
    let inserted = store.insert_one(record).await.context("Failed to add user")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inserted)?);
    } else {
        println!("{} Added {}", "Success:".green().bold(), format_record(&inserted));
    }
    Ok(())
}

async fn cmd_list(store: &RecordStore, json: bool) -> Result<()> {
    let records = store.list().await.context("Failed to list users")?;
    print_records(&records, json)
}

async fn cmd_recent(store: &RecordStore, limit: usize, json: bool) -> Result<()> {
    let records = store.recent(limit).await.context("Failed to fetch recent users")?;
    print_records(&records, json)
}

async fn cmd_search(store: &RecordStore, query: &str, filters: SearchFilters, json: bool) -> Result<()> {
    let results = store
        .search_filtered(query, filters)
        .await
        .with_context(|| format!("Search for '{}' failed", query))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("{} Users found: {}", "Info:".blue().bold(), results.len());
    for result in &results {
        println!("{}", format_hit(result));
    }
    Ok(())
}

async fn cmd_stats(store: &RecordStore, json: bool) -> Result<()> {
    let stats = store.stats().await.context("Failed to read store statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Roster Status".green().bold().underline());
    println!("  Records: {}", stats.record_count.cyan());
    for (status, count) in &stats.by_status {
        println!("    - {}: {}", status, count);
    }
    Ok(())
}

fn print_records(records: &[Record], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No users stored", "Info:".yellow().bold());
    }
    for record in records {
        println!("{}", format_record(record));
    }
    Ok(())
}

fn format_record(record: &Record) -> String {
    format!(
        "#{} {} <{}> {} [{}/{}]",
        record.id, record.username, record.email, record.name, record.role, record.status
    )
}

fn format_hit(result: &SearchResult) -> String {
    format!("{:>4}  {}", result.score, format_record(&result.record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    async fn in_memory_store() -> RecordStore {
        RecordStore::open_in_memory().await.unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["roster", "list"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.db.is_none());
        assert!(!cli.memory);
        assert!(!cli.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_db_conflicts_with_memory() {
        assert!(Cli::try_parse_from(["roster", "--db", "a.db", "--memory", "list"]).is_err());
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::try_parse_from(["roster", "search", "coding", "coffee", "-n", "3", "--status", "active"]).unwrap();
        if let Commands::Search { query, limit, status, role } = cli.command {
            assert_eq!(query, vec!["coding", "coffee"]);
            assert_eq!(limit, Some(3));
            assert_eq!(status, Some(Status::Active));
            assert!(role.is_none());
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_cli_search_requires_query() {
        assert!(Cli::try_parse_from(["roster", "search"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["roster", "search", "x", "--status", "banned"]).is_err());
    }

    #[test]
    fn test_cli_recent_default_limit() {
        let cli = Cli::try_parse_from(["roster", "recent"]).unwrap();
        assert!(matches!(cli.command, Commands::Recent { limit: 2 }));
    }

    #[test]
    fn test_cli_add_command() {
        let cli = Cli::try_parse_from([
            "roster",
            "add",
            "--username",
            "alice123",
            "--email",
            "alice@example.com",
            "--role",
            "admin",
        ])
        .unwrap();
        if let Commands::Add { username, email, name, role, status, .. } = cli.command {
            assert_eq!(username, "alice123");
            assert_eq!(email, "alice@example.com");
            assert_eq!(name, "");
            assert_eq!(role.as_deref(), Some("admin"));
            assert!(status.is_none());
        } else {
            panic!("Expected Add command");
        }
    }

    #[test]
    fn test_load_config_explicit_missing() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_explicit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("roster.toml");
        std::fs::write(&path, "[search]\ndefault_limit = 4\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.default_limit, 4);
    }

    #[test]
    fn test_resolve_config_overrides() {
        let config = resolve_config(Config::default(), Some(Path::new("/tmp/other.db")), false);
        assert!(!config.store.in_memory);
        assert_eq!(config.store.path, PathBuf::from("/tmp/other.db"));

        let config = resolve_config(Config::default(), None, true);
        assert!(config.store.in_memory);
    }

    #[test]
    fn test_init_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("roster.toml");

        cmd_init_config(&path, false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[store]"));
        assert!(Config::from_file(&path).is_ok());

        assert!(cmd_init_config(&path, false).is_err());
        assert!(cmd_init_config(&path, true).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_seed_then_search() {
        let store = in_memory_store().await;
        cmd_seed(&store, false).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 10);

        let filters = SearchFilters { limit: Some(10), ..Default::default() };
        assert!(cmd_search(&store, "coding", filters.clone(), false).await.is_ok());
        assert!(cmd_search(&store, "coding", filters, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_cmd_seed_twice_fails() {
        let store = in_memory_store().await;
        cmd_seed(&store, false).await.unwrap();

        let err = cmd_seed(&store, false).await.unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_cmd_add_invalid_email() {
        let store = in_memory_store().await;
        let result = cmd_add(&store, NewRecord::new("alice123", "nope"), false).await;
        assert!(format!("{:#}", result.unwrap_err()).contains("valid email"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cmd_list_recent_stats() {
        let store = in_memory_store().await;
        assert!(cmd_list(&store, false).await.is_ok());

        cmd_seed(&store, true).await.unwrap();
        assert!(cmd_list(&store, true).await.is_ok());
        assert!(cmd_recent(&store, 2, false).await.is_ok());
        assert!(cmd_stats(&store, false).await.is_ok());
        assert!(cmd_stats(&store, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_search_uses_default_limit() {
        let store = in_memory_store().await;
        cmd_seed(&store, false).await.unwrap();

        let config = Config::default();
        let command = Commands::Search { query: vec!["developer".to_string()], limit: None, status: None, role: None };
        assert!(dispatch(&store, &config, command, false).await.is_ok());
    }

    #[test]
    fn test_format_hit() {
        let record = Record::from_new(
            3,
            NewRecord::new("charlie_b", "charlie@example.com").with_name("Charlie Brown").normalize(),
            chrono::Utc::now(),
        );
        let line = format_hit(&SearchResult { record, score: 5 });
        assert!(line.starts_with("   5  #3 charlie_b"));
        assert!(line.contains("[USER/pending]"));
    }
}
