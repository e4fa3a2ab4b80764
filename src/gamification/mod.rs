//! 游戏化计算
//!
//! 经验值、等级、连续打卡与成就判定。全部为无状态纯函数，
//! 输入为存储层提供的快照，可在多线程中直接调用。

mod achievements;
mod levels;
mod streak;
mod xp;

pub use achievements::{
    evaluate_new_achievements, progress_percent, AchievementDefinition, AchievementType,
    UserAggregateStats,
};
pub use levels::{
    check_level_up, level_from_xp, level_progress, Level, LevelProgress, LEVELS, MAX_LEVEL,
};
pub use streak::{advance_streak, StreakState};
pub use xp::{
    compute_xp, difficulty_multiplier, format_xp, streak_multiplier, QuizOutcome,
    PERFECT_SCORE_BONUS, STREAK_BONUS, TIME_BONUS_MAX,
};
