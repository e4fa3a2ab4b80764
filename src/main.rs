use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use kuis::commands::{self, Command};
use kuis::config::AppConfig;
use kuis::logging::init_logging;
use kuis::services::DatabaseService;

#[derive(Parser)]
#[command(name = "kuis")]
#[command(about = "Gamified quiz engine: import quizzes, score attempts, track XP, streaks and achievements")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to <config dir>/kuis/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database, overrides config and KUIS_DATABASE
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    init_logging(&config.logging, cli.verbose)?;
    debug!("using database {}", config.database.path.display());

    // 数据库句柄由入口创建并显式传给各命令
    let db = DatabaseService::open(&config.database.path).with_context(|| {
        format!("failed to open database {}", config.database.path.display())
    })?;

    commands::run(cli.command, &db, &config)
}
