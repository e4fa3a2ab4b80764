//! 经验值计算
//!
//! 单次测验的经验 = 基础奖励 × 得分比例 × 难度系数 × (1 + 用时奖励)，
//! 满分再加固定奖励，最后整体乘以连续打卡系数，四舍五入（半数向上）取整。

use serde::{Deserialize, Serialize};

use crate::models::Difficulty;

/// 用时奖励上限 (20%)
pub const TIME_BONUS_MAX: f64 = 0.2;

/// 满分奖励
pub const PERFECT_SCORE_BONUS: u32 = 50;

/// 连续打卡天数阈值与系数，按阈值升序
pub const STREAK_BONUS: [(u32, f64); 4] = [(3, 1.1), (7, 1.25), (14, 1.5), (30, 2.0)];

/// 一次测验的结算输入，调用方负责保证 score_percent 在 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub base_reward: u32,
    pub difficulty: Difficulty,
    pub time_limit_seconds: u32,
    pub score_percent: u32,
    pub time_taken_seconds: u32,
    pub current_streak_days: u32,
}

pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 1.0,
        Difficulty::Medium => 1.5,
        Difficulty::Hard => 2.0,
    }
}

/// 满足的最大阈值对应的系数，未达到任何阈值时为 1.0
pub fn streak_multiplier(streak_days: u32) -> f64 {
    STREAK_BONUS
        .iter()
        .rev()
        .find(|(threshold, _)| streak_days >= *threshold)
        .map_or(1.0, |(_, multiplier)| *multiplier)
}

fn time_bonus(time_limit_seconds: u32, time_taken_seconds: u32) -> f64 {
    if time_limit_seconds == 0 {
        return 0.0;
    }
    let limit = f64::from(time_limit_seconds);
    let ratio = ((limit - f64::from(time_taken_seconds)) / limit).max(0.0);
    ratio * TIME_BONUS_MAX
}

/// 计算本次测验获得的经验值
pub fn compute_xp(outcome: &QuizOutcome) -> u32 {
    let score_multiplier = f64::from(outcome.score_percent) / 100.0;
    let bonus = time_bonus(outcome.time_limit_seconds, outcome.time_taken_seconds);
    let perfect_bonus = if outcome.score_percent == 100 {
        f64::from(PERFECT_SCORE_BONUS)
    } else {
        0.0
    };

    let raw = (f64::from(outcome.base_reward)
        * score_multiplier
        * difficulty_multiplier(outcome.difficulty)
        * (1.0 + bonus)
        + perfect_bonus)
        * streak_multiplier(outcome.current_streak_days);

    // 非负数上 f64::round 即半数向上
    raw.max(0.0).round() as u32
}

/// 1.2K / 3.4M 形式的经验值显示
pub fn format_xp(xp: u32) -> String {
    if xp >= 1_000_000 {
        format!("{:.1}M", f64::from(xp) / 1_000_000.0)
    } else if xp >= 1_000 {
        format!("{:.1}K", f64::from(xp) / 1_000.0)
    } else {
        xp.to_string()
    }
}
