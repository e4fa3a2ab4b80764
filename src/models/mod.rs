//! 领域数据结构
//! 分类、测验、题目、用户与答题记录，以及提交接口的输入输出形状

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::KuisError;
use crate::gamification::AchievementDefinition;

/// 测验难度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }

    /// 印尼语显示名
    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "Mudah",
            Self::Medium => "Sedang",
            Self::Hard => "Sulit",
        }
    }
}

impl FromStr for Difficulty {
    type Err = KuisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "MEDIUM" => Ok(Self::Medium),
            "HARD" => Ok(Self::Hard),
            _ => Err(KuisError::UnrecognizedDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        raw.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// 测验分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// 分类及其测验数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub quiz_count: u32,
}

/// 测验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub difficulty: Difficulty,
    pub xp_reward: u32,
    /// 秒
    pub time_limit: u32,
    pub created_at: DateTime<Utc>,
}

/// 测验及题目数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub question_count: u32,
}

/// 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub content: String,
    pub explanation: Option<String>,
    pub position: u32,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// 第一个正确选项
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// 带全部题目的测验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizWithQuestions {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// 用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub total_xp: u32,
    pub level: u32,
    pub created_at: DateTime<Utc>,
}

/// 答题记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: String,
    pub quiz_id: i64,
    pub score: u32,
    pub xp_earned: u32,
    pub time_taken: u32,
    pub completed_at: DateTime<Utc>,
}

/// 单题作答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: i64,
    pub selected_option_id: i64,
    pub is_correct: bool,
}

/// 排行榜条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub name: String,
    pub total_xp: u32,
    pub level: u32,
    pub title: String,
    pub current_streak: u32,
}

/// 题库内容统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStats {
    pub categories: u32,
    pub quizzes: u32,
    pub questions: u32,
    pub options: u32,
    pub per_category: Vec<CategorySummary>,
}

/// 成就状态，只能从 Locked 变为 Unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    Locked,
    Unlocked,
}

/// 成就及用户进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementView {
    pub achievement: AchievementDefinition,
    pub status: AchievementStatus,
    pub earned_at: Option<DateTime<Utc>>,
    pub progress: u32,
}

// ==================== 写入用结构 ====================

/// 新建分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// 新建成就
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub badge_color: String,
    pub achievement_type: crate::gamification::AchievementType,
    pub threshold: u32,
}

/// 待写入的选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDraft {
    pub content: String,
    pub is_correct: bool,
}

/// 待写入的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub content: String,
    pub explanation: Option<String>,
    pub options: Vec<OptionDraft>,
}

/// 待写入的测验（导入后、入库前）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_slug: String,
    pub difficulty: Difficulty,
    pub xp_reward: u32,
    pub time_limit: u32,
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// 入库前校验，返回第一处问题
    pub fn validate(&self) -> Result<(), KuisError> {
        if self.title.trim().is_empty() {
            return Err(KuisError::Validation("quiz title is empty".to_string()));
        }
        if self.slug.trim().is_empty() {
            return Err(KuisError::Validation(format!("quiz '{}' has no slug", self.title)));
        }
        if self.category_slug.trim().is_empty() {
            return Err(KuisError::Validation(format!("quiz '{}' has no category", self.slug)));
        }
        if self.time_limit == 0 {
            return Err(KuisError::Validation(format!(
                "quiz '{}' time limit must be positive",
                self.slug
            )));
        }
        if self.questions.is_empty() {
            return Err(KuisError::Validation(format!("quiz '{}' has no questions", self.slug)));
        }
        for (idx, question) in self.questions.iter().enumerate() {
            if question.content.trim().is_empty() {
                return Err(KuisError::Validation(format!(
                    "quiz '{}' question {}: empty content",
                    self.slug,
                    idx + 1
                )));
            }
            if question.options.len() < 2 {
                return Err(KuisError::Validation(format!(
                    "quiz '{}' question {}: needs at least 2 options",
                    self.slug,
                    idx + 1
                )));
            }
            let correct = question.options.iter().filter(|o| o.is_correct).count();
            if correct != 1 {
                return Err(KuisError::Validation(format!(
                    "quiz '{}' question {}: expected exactly 1 correct option, found {}",
                    self.slug,
                    idx + 1,
                    correct
                )));
            }
        }
        Ok(())
    }
}

// ==================== 提交接口 ====================

/// 客户端提交的答卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub quiz_id: i64,
    /// questionId -> selectedOptionId
    pub answers: HashMap<i64, i64>,
    /// 秒
    pub time_taken: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUp {
    pub level: u32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub id: i64,
    pub name: String,
}

/// 提交结果，客户端界面依赖此结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    pub attempt_id: i64,
    pub score: u32,
    pub xp_earned: u32,
    #[serde(rename = "newTotalXP")]
    pub new_total_xp: u32,
    pub new_level: u32,
    pub level_up: Option<LevelUp>,
    pub streak: StreakSummary,
    pub achievements: Vec<EarnedAchievement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("EASY".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);

        let err = "EXPERT".parse::<Difficulty>().unwrap_err();
        assert!(matches!(err, KuisError::UnrecognizedDifficulty(ref s) if s == "EXPERT"));
    }

    #[test]
    fn test_difficulty_label() {
        assert_eq!(Difficulty::Easy.label(), "Mudah");
        assert_eq!(Difficulty::Medium.label(), "Sedang");
        assert_eq!(Difficulty::Hard.label(), "Sulit");
    }

    fn draft() -> QuizDraft {
        QuizDraft {
            title: "Pengenalan Ekonomi Syariah".to_string(),
            slug: "pengenalan-ekonomi-syariah".to_string(),
            description: None,
            category_slug: "dasar-ekonomi-syariah".to_string(),
            difficulty: Difficulty::Easy,
            xp_reward: 100,
            time_limit: 300,
            questions: vec![QuestionDraft {
                content: "Apa itu riba?".to_string(),
                explanation: None,
                options: vec![
                    OptionDraft {
                        content: "Tambahan yang batil".to_string(),
                        is_correct: true,
                    },
                    OptionDraft {
                        content: "Bagi hasil".to_string(),
                        is_correct: false,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut no_questions = draft();
        no_questions.questions.clear();
        assert!(matches!(no_questions.validate(), Err(KuisError::Validation(_))));

        let mut two_correct = draft();
        two_correct.questions[0].options[1].is_correct = true;
        assert!(two_correct.validate().is_err());

        let mut one_option = draft();
        one_option.questions[0].options.pop();
        assert!(one_option.validate().is_err());

        let mut no_time = draft();
        no_time.time_limit = 0;
        assert!(no_time.validate().is_err());
    }

    #[test]
    fn test_submission_payload_decoding() {
        let json = r#"{"quizId": 7, "answers": {"1": 4, "2": 9}, "timeTaken": 120}"#;
        let submission: QuizSubmission = serde_json::from_str(json).unwrap();

        assert_eq!(submission.quiz_id, 7);
        assert_eq!(submission.answers.get(&1), Some(&4));
        assert_eq!(submission.answers.get(&2), Some(&9));
        assert_eq!(submission.time_taken, 120);
    }

    #[test]
    fn test_submission_result_shape() {
        let result = SubmissionResult {
            success: true,
            attempt_id: 1,
            score: 100,
            xp_earned: 170,
            new_total_xp: 170,
            new_level: 2,
            level_up: Some(LevelUp {
                level: 2,
                title: "Pelajar".to_string(),
            }),
            streak: StreakSummary {
                current: 1,
                longest: 1,
            },
            achievements: vec![EarnedAchievement {
                id: 1,
                name: "Langkah Pertama".to_string(),
            }],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["xpEarned"], 170);
        assert_eq!(value["newTotalXP"], 170);
        assert_eq!(value["newLevel"], 2);
        assert_eq!(value["levelUp"]["title"], "Pelajar");
        assert_eq!(value["streak"]["current"], 1);
        assert_eq!(value["achievements"][0]["name"], "Langkah Pertama");
    }

    #[test]
    fn test_level_up_null_when_absent() {
        let result = SubmissionResult {
            success: true,
            attempt_id: 3,
            score: 50,
            xp_earned: 20,
            new_total_xp: 120,
            new_level: 2,
            level_up: None,
            streak: StreakSummary {
                current: 2,
                longest: 4,
            },
            achievements: Vec::new(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert!(value["levelUp"].is_null());
    }
}
