use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use foda_planner::config::{load_config, AppConfig};
use foda_planner::http::{self, AppState};
use foda_planner::state::{self, bootstrap};

/// foda-planner - FODA, CANVA and TOWS strategic planning service
#[derive(Parser)]
#[command(name = "foda-planner", version, about, long_about = None)]
struct Cli {
    /// Optional YAML config file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate, seed and serve HTTP (default)
    Serve,

    /// Apply pending schema migrations and exit
    Migrate,

    /// Migrate, then create default users and sample records
    InitDb,

    /// Report database reachability and row counts
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(database = %state::redact(&config.database_url), "Configuration loaded");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(config).await,
        Commands::Migrate => cmd_migrate(&config).await,
        Commands::InitDb => cmd_init_db(&config).await,
        Commands::Check => cmd_check(&config).await,
    }
}

async fn cmd_serve(config: AppConfig) -> Result<()> {
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set; sessions are signed with the development key");
    }
    let store = state::open_store(&config.database_url).await?;
    let applied = bootstrap::initialize(store.as_ref(), &config).await?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "Applied migrations at startup");
    }
    http::serve(AppState::new(store, config)).await
}

async fn cmd_migrate(config: &AppConfig) -> Result<()> {
    let store = state::open_store(&config.database_url).await?;
    let applied = store.migrate().await?;

    if applied.is_empty() {
        println!("{}", "Schema is up-to-date.".green());
    } else {
        for m in &applied {
            println!("  {} v{} {}", "+".green(), m.version, m.name.bold());
        }
        println!();
        println!(
            "{} Applied {} migration(s).",
            "✓".green().bold(),
            applied.len()
        );
    }
    Ok(())
}

async fn cmd_init_db(config: &AppConfig) -> Result<()> {
    let store = state::open_store(&config.database_url).await?;
    let applied = store.migrate().await?;
    let seeded = bootstrap::seed_defaults(store.as_ref()).await?;
    let counts = store.counts().await?;

    println!("{}", "Database initialized".bold().cyan());
    println!("{}", "─".repeat(40));
    println!("  {} {}", "Migrations applied:".bold(), applied.len());
    println!("  {} {}", "Users created:".bold(), seeded.users_created.to_string().green());
    println!("  {} {}", "Records created:".bold(), seeded.aspects_created.to_string().green());
    println!("  {} {}", "Total users:".bold(), counts.usuarios);
    println!("  {} {}", "Total records:".bold(), counts.aspectos);
    Ok(())
}

async fn cmd_check(config: &AppConfig) -> Result<()> {
    let store = state::open_store(&config.database_url).await?;
    match store.counts().await {
        Ok(counts) => {
            println!(
                "{} {} ({})",
                "✓".green().bold(),
                "Database reachable".green(),
                state::redact(&config.database_url)
            );
            println!("  usuarios:    {}", counts.usuarios);
            println!("  aspectos:    {}", counts.aspectos);
            println!("  estrategias: {}", counts.estrategias);
            println!("  actividades: {}", counts.actividades);
            println!("  tareas:      {}", counts.tareas);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), "Database unavailable".red());
            bail!("{:#}", e)
        }
    }
}
