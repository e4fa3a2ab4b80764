//! 成就判定
//!
//! 成就只有锁定和解锁两种状态，且只会从锁定变为解锁。判定本身是纯函数，
//! 写入已获得记录由存储层在同一事务内完成。

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::KuisError;

/// 成就统计维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementType {
    QuizComplete,
    PerfectScore,
    Streak,
    XpMilestone,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuizComplete => "QUIZ_COMPLETE",
            Self::PerfectScore => "PERFECT_SCORE",
            Self::Streak => "STREAK",
            Self::XpMilestone => "XP_MILESTONE",
        }
    }
}

impl FromStr for AchievementType {
    type Err = KuisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "QUIZ_COMPLETE" => Ok(Self::QuizComplete),
            "PERFECT_SCORE" => Ok(Self::PerfectScore),
            "STREAK" => Ok(Self::Streak),
            "XP_MILESTONE" => Ok(Self::XpMilestone),
            _ => Err(KuisError::UnrecognizedAchievementType(s.to_string())),
        }
    }
}

impl fmt::Display for AchievementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for AchievementType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AchievementType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        raw.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// 成就定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub badge_color: String,
    pub achievement_type: AchievementType,
    /// > 0
    pub threshold: u32,
}

/// 用户汇总统计，由存储层计算
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAggregateStats {
    pub total_quiz_completed: u32,
    pub perfect_score_count: u32,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub total_xp: u32,
}

impl UserAggregateStats {
    /// 某一维度的当前值
    pub fn value_for(&self, achievement_type: AchievementType) -> u32 {
        match achievement_type {
            AchievementType::QuizComplete => self.total_quiz_completed,
            AchievementType::PerfectScore => self.perfect_score_count,
            AchievementType::Streak => self.current_streak_days,
            AchievementType::XpMilestone => self.total_xp,
        }
    }
}

/// 返回尚未获得且已达到阈值的成就，保持输入顺序
pub fn evaluate_new_achievements<'a>(
    definitions: &'a [AchievementDefinition],
    already_earned: &HashSet<i64>,
    stats: &UserAggregateStats,
) -> Vec<&'a AchievementDefinition> {
    definitions
        .iter()
        .filter(|def| !already_earned.contains(&def.id))
        .filter(|def| stats.value_for(def.achievement_type) >= def.threshold)
        .collect()
}

/// 达成进度百分比，封顶 100
pub fn progress_percent(current_value: u32, threshold: u32) -> u32 {
    if threshold == 0 {
        return 100;
    }
    let percent = (f64::from(current_value) / f64::from(threshold) * 100.0).round();
    percent.min(100.0) as u32
}
