// 命令行命令模块
// 每个子命令一个处理函数，错误统一包装为 anyhow

mod admin;
mod profile;
mod quiz;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::AppConfig;
use crate::models::User;
use crate::services::DatabaseService;

pub use admin::{check_command, clean_user_command, import_command, init_command};
pub use profile::{achievements_command, leaderboard_command, profile_command, register_command};
pub use quiz::{categories_command, quizzes_command, show_command, submit_command};

#[derive(Subcommand)]
pub enum Command {
    /// Create the schema and seed default categories, achievements and a sample quiz
    Init,

    /// Import quizzes from a JSON/Markdown file or a directory of them
    Import {
        /// File or directory, defaults to the configured quiz directory
        path: Option<PathBuf>,
    },

    /// Show content statistics and the first quiz
    Check,

    /// List categories with quiz counts
    Categories,

    /// List quizzes in a category
    Quizzes {
        category: String,
    },

    /// Show a quiz with its questions and option ids
    Show {
        slug: String,
    },

    /// Register a user
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Submit answers from a JSON payload file
    Submit {
        #[arg(long)]
        email: String,

        /// {"quizId": .., "answers": {"<questionId>": <optionId>}, "timeTaken": ..}
        payload: PathBuf,
    },

    /// Show XP, level progress and streak
    Profile {
        #[arg(long)]
        email: String,
    },

    /// List achievements, with unlock state when a user is given
    Achievements {
        #[arg(long)]
        email: Option<String>,
    },

    /// Top users by total XP
    Leaderboard {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Delete a user and all of their records
    CleanUser {
        #[arg(long)]
        email: String,
    },
}

/// 分发子命令
pub fn run(command: Command, db: &DatabaseService, config: &AppConfig) -> Result<()> {
    match command {
        Command::Init => init_command(db),
        Command::Import { path } => {
            let path = path.unwrap_or_else(|| config.import.quiz_dir.clone());
            import_command(db, &path)
        }
        Command::Check => check_command(db),
        Command::Categories => categories_command(db),
        Command::Quizzes { category } => quizzes_command(db, &category),
        Command::Show { slug } => show_command(db, &slug),
        Command::Register { name, email } => register_command(db, &name, &email),
        Command::Submit { email, payload } => submit_command(db, &email, &payload),
        Command::Profile { email } => profile_command(db, &email),
        Command::Achievements { email } => achievements_command(db, email.as_deref()),
        Command::Leaderboard { limit } => leaderboard_command(db, limit),
        Command::CleanUser { email } => clean_user_command(db, &email),
    }
}

/// 按邮箱查找用户，不存在时报错
pub(crate) fn require_user(db: &DatabaseService, email: &str) -> Result<User> {
    db.find_user_by_email(email)?
        .with_context(|| format!("no user registered with email {}", email))
}
