// 测验命令：浏览分类与测验，提交答卷

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::require_user;
use crate::models::QuizSubmission;
use crate::services::{DatabaseService, QuizService};

pub fn categories_command(db: &DatabaseService) -> Result<()> {
    let categories = db.list_categories()?;
    if categories.is_empty() {
        println!("No categories. Run `kuis init` first.");
        return Ok(());
    }

    for summary in categories {
        let category = &summary.category;
        println!(
            "{} {} ({}) - {} quiz",
            category.icon.as_deref().unwrap_or("•"),
            category.name,
            category.slug,
            summary.quiz_count
        );
        if let Some(desc) = &category.description {
            println!("    {}", desc);
        }
    }
    Ok(())
}

pub fn quizzes_command(db: &DatabaseService, category_slug: &str) -> Result<()> {
    let category = db
        .find_category_by_slug(category_slug)?
        .with_context(|| format!("unknown category {}", category_slug))?;
    let quizzes = db.list_quizzes_in_category(category.id)?;

    println!("{} ({} quiz)\n", category.name, quizzes.len());
    for summary in quizzes {
        let quiz = &summary.quiz;
        println!(
            "  #{} {} [{}] {} questions, {} XP, {}s",
            quiz.id,
            quiz.title,
            quiz.difficulty.label(),
            summary.question_count,
            quiz.xp_reward,
            quiz.time_limit
        );
        println!("    slug: {}", quiz.slug);
    }
    Ok(())
}

pub fn show_command(db: &DatabaseService, slug: &str) -> Result<()> {
    let quiz = db
        .find_quiz_by_slug(slug)?
        .with_context(|| format!("unknown quiz {}", slug))?;
    let full = db
        .load_quiz(quiz.id)?
        .with_context(|| format!("quiz {} disappeared", slug))?;

    println!("#{} {}", full.quiz.id, full.quiz.title);
    if let Some(desc) = &full.quiz.description {
        println!("{}", desc);
    }
    println!(
        "Difficulty: {}  Reward: {} XP  Time limit: {}s\n",
        full.quiz.difficulty.label(),
        full.quiz.xp_reward,
        full.quiz.time_limit
    );

    for question in &full.questions {
        println!("[{}] (question {}) {}", question.position, question.id, question.content);
        for option in &question.options {
            println!("    ({}) {}", option.id, option.content);
        }
        println!();
    }
    Ok(())
}

pub fn submit_command(db: &DatabaseService, email: &str, payload: &Path) -> Result<()> {
    let user = require_user(db, email)?;
    let raw = fs::read_to_string(payload)
        .with_context(|| format!("failed to read {}", payload.display()))?;
    let submission: QuizSubmission = serde_json::from_str(&raw)
        .with_context(|| format!("invalid submission payload in {}", payload.display()))?;

    let today = chrono::Local::now().date_naive();
    let result = QuizService::new(db.clone()).submit(&user.id, &submission, today)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
