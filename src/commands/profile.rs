// 用户命令：注册、个人资料、成就、排行榜

use anyhow::Result;
use log::info;

use super::require_user;
use crate::gamification::format_xp;
use crate::models::AchievementStatus;
use crate::services::{DatabaseService, QuizService};

pub fn register_command(db: &DatabaseService, name: &str, email: &str) -> Result<()> {
    let user = db.create_user(name, email)?;
    info!("registered user {} ({})", user.email, user.id);
    println!("Registered {} <{}>", user.name, user.email);
    println!("User id: {}", user.id);
    Ok(())
}

pub fn profile_command(db: &DatabaseService, email: &str) -> Result<()> {
    let user = require_user(db, email)?;
    let today = chrono::Local::now().date_naive();
    let profile = QuizService::new(db.clone()).profile(&user.id, today)?;
    let progress = &profile.progress;

    println!("{} <{}>", profile.user.name, profile.user.email);
    println!(
        "Level {} - {} ({})",
        progress.current_level.level, progress.current_level.title, progress.current_level.title_en
    );
    println!("Total XP: {}", profile.total_xp_display);
    match progress.next_level {
        Some(next) => println!(
            "Progress: {}/{} XP ({:.0}%) to {}",
            progress.xp_into_level, progress.xp_span_of_level, progress.percent, next.title
        ),
        None => println!("Progress: max level reached"),
    }
    println!(
        "Streak: {} day(s), longest {}",
        profile.streak.current, profile.streak.longest
    );

    if !profile.recent_attempts.is_empty() {
        println!("\nRecent attempts:");
        for attempt in &profile.recent_attempts {
            println!(
                "  {} quiz #{} score {} +{} XP ({}s)",
                attempt.completed_at.format("%Y-%m-%d %H:%M"),
                attempt.quiz_id,
                attempt.score,
                attempt.xp_earned,
                attempt.time_taken
            );
        }
    }
    Ok(())
}

pub fn achievements_command(db: &DatabaseService, email: Option<&str>) -> Result<()> {
    let user = email.map(|e| require_user(db, e)).transpose()?;
    let views = QuizService::new(db.clone())
        .achievements_with_progress(user.as_ref().map(|u| u.id.as_str()))?;

    let unlocked = views
        .iter()
        .filter(|v| v.status == AchievementStatus::Unlocked)
        .count();
    println!("Achievements {}/{}\n", unlocked, views.len());

    for view in views {
        let achievement = &view.achievement;
        let state = match view.status {
            AchievementStatus::Unlocked => "unlocked",
            AchievementStatus::Locked => "locked",
        };
        println!(
            "  {} {} [{}] {}%",
            achievement.icon, achievement.name, state, view.progress
        );
        println!(
            "      {} ({} {})",
            achievement.description, achievement.achievement_type, achievement.threshold
        );
        if let Some(earned_at) = view.earned_at {
            println!("      earned {}", earned_at.format("%Y-%m-%d"));
        }
    }
    Ok(())
}

pub fn leaderboard_command(db: &DatabaseService, limit: u32) -> Result<()> {
    let entries = db.leaderboard(limit)?;
    if entries.is_empty() {
        println!("No users yet.");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:>3}. {:<24} {:>7} XP  Lv {} {}  🔥{}",
            entry.rank,
            entry.name,
            format_xp(entry.total_xp),
            entry.level,
            entry.title,
            entry.current_streak
        );
    }
    Ok(())
}
