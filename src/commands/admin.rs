// 管理命令：初始化、导入、检查、清理用户

use std::path::Path;

use anyhow::{bail, Result};
use log::info;

use crate::gamification::format_xp;
use crate::services::{seed_defaults, DatabaseService, Importer};

pub fn init_command(db: &DatabaseService) -> Result<()> {
    seed_defaults(db)?;
    match db.db_path() {
        Some(path) => println!("Database ready at {}", path.display()),
        None => println!("Database ready (in memory)"),
    }
    Ok(())
}

pub fn import_command(db: &DatabaseService, path: &Path) -> Result<()> {
    let importer = Importer::new(db.clone());
    let report = if path.is_dir() {
        importer.import_dir(path)?
    } else if path.is_file() {
        importer.import_file(path)?
    } else {
        bail!("{} does not exist", path.display());
    };

    println!("Files processed: {}", report.files_processed);
    println!("Quizzes imported: {}", report.total_quizzes);
    println!("Questions imported: {}", report.total_questions);
    if !report.skipped.is_empty() {
        println!("\nSkipped ({}):", report.skipped.len());
        for reason in &report.skipped {
            println!("  - {}", reason);
        }
    }
    Ok(())
}

pub fn check_command(db: &DatabaseService) -> Result<()> {
    let stats = db.content_stats()?;

    println!("Categories: {}", stats.categories);
    println!("Quizzes:    {}", stats.quizzes);
    println!("Questions:  {}", stats.questions);
    println!("Options:    {}", stats.options);

    println!("\nPer category:");
    for summary in &stats.per_category {
        println!(
            "  {} {} ({}): {} quiz",
            summary.category.icon.as_deref().unwrap_or("•"),
            summary.category.name,
            summary.category.slug,
            summary.quiz_count
        );
    }

    match db.first_quiz()? {
        Some(first) => {
            println!(
                "\nFirst quiz: {} [{}] {} XP, {} questions",
                first.quiz.title,
                first.quiz.difficulty.label(),
                format_xp(first.quiz.xp_reward),
                first.questions.len()
            );
            if let Some(question) = first.questions.first() {
                println!("  Q1: {}", question.content);
                println!("  Options: {}", question.options.len());
            }
        }
        None => println!("\nNo quizzes imported yet."),
    }
    Ok(())
}

pub fn clean_user_command(db: &DatabaseService, email: &str) -> Result<()> {
    if db.delete_user_by_email(email)? {
        info!("deleted user {}", email);
        println!("Deleted {} and all related records.", email);
    } else {
        println!("No user with email {}.", email);
    }
    Ok(())
}
