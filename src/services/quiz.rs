// 答题服务模块
// 评分、结算经验与成就，以及个人资料与成就进度查询

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::error::{KuisError, Result};
use crate::gamification::{format_xp, level_progress, progress_percent, LevelProgress};
use crate::models::{
    AchievementStatus, AchievementView, QuizAttempt, QuizSubmission, QuizWithQuestions,
    StreakSummary, SubmissionResult, User, UserAnswer,
};
use crate::services::database::{DatabaseService, GradedAttempt};

const RECENT_ATTEMPTS: u32 = 5;

/// 个人资料
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub total_xp_display: String,
    pub progress: LevelProgress,
    pub streak: StreakSummary,
    pub recent_attempts: Vec<QuizAttempt>,
}

/// 答卷评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct: u32,
    pub total: u32,
    /// 0..=100
    pub score: u32,
    pub answers: Vec<UserAnswer>,
}

/// 按每题第一个正确选项评分，未作答的题计为错误且不记录
pub fn grade_answers(quiz: &QuizWithQuestions, submission: &QuizSubmission) -> Result<Grade> {
    let total = quiz.questions.len() as u32;
    if total == 0 {
        return Err(KuisError::Validation(format!(
            "quiz '{}' has no questions",
            quiz.quiz.slug
        )));
    }

    let mut answers = Vec::new();
    for question in &quiz.questions {
        let Some(&selected) = submission.answers.get(&question.id) else {
            continue;
        };
        let is_correct = question.correct_option().is_some_and(|o| o.id == selected);
        debug!("question {} selected {} correct={}", question.id, selected, is_correct);
        answers.push(UserAnswer {
            question_id: question.id,
            selected_option_id: selected,
            is_correct,
        });
    }

    let correct = answers.iter().filter(|a| a.is_correct).count() as u32;
    let score = (f64::from(correct) / f64::from(total) * 100.0).round() as u32;

    Ok(Grade {
        correct,
        total,
        score,
        answers,
    })
}

/// 答题服务
#[derive(Clone)]
pub struct QuizService {
    db: DatabaseService,
}

impl QuizService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// 提交答卷并结算
    pub fn submit(
        &self,
        user_id: &str,
        submission: &QuizSubmission,
        today: NaiveDate,
    ) -> Result<SubmissionResult> {
        let quiz = self
            .db
            .load_quiz(submission.quiz_id)?
            .ok_or_else(|| KuisError::not_found("quiz", submission.quiz_id))?;
        let grade = grade_answers(&quiz, submission)?;

        let result = self.db.record_submission(&GradedAttempt {
            user_id,
            quiz: &quiz.quiz,
            score: grade.score,
            time_taken: submission.time_taken,
            answers: grade.answers,
            today,
        })?;

        info!(
            "user {} finished '{}': {}/{} correct, score {}, +{} XP",
            user_id, quiz.quiz.slug, grade.correct, grade.total, result.score, result.xp_earned
        );
        if let Some(level_up) = &result.level_up {
            info!("user {} reached level {} ({})", user_id, level_up.level, level_up.title);
        }
        for achievement in &result.achievements {
            info!("user {} unlocked '{}'", user_id, achievement.name);
        }

        Ok(result)
    }

    /// 个人资料，超过一天未活动的连续打卡显示为 0
    pub fn profile(&self, user_id: &str, today: NaiveDate) -> Result<UserProfile> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| KuisError::not_found("user", user_id))?;

        let streak = match self.db.find_streak(user_id)? {
            Some(s) if s.is_active_on(today) => StreakSummary {
                current: s.current_streak,
                longest: s.longest_streak,
            },
            Some(s) => StreakSummary {
                current: 0,
                longest: s.longest_streak,
            },
            None => StreakSummary {
                current: 0,
                longest: 0,
            },
        };

        Ok(UserProfile {
            total_xp_display: format_xp(user.total_xp),
            progress: level_progress(user.total_xp),
            recent_attempts: self.db.recent_attempts(user_id, RECENT_ATTEMPTS)?,
            streak,
            user,
        })
    }

    /// 全部成就及状态；未登录时全部锁定
    pub fn achievements_with_progress(&self, user_id: Option<&str>) -> Result<Vec<AchievementView>> {
        let definitions = self.db.list_achievements()?;

        let Some(user_id) = user_id else {
            return Ok(definitions
                .into_iter()
                .map(|achievement| AchievementView {
                    achievement,
                    status: AchievementStatus::Locked,
                    earned_at: None,
                    progress: 0,
                })
                .collect());
        };

        let stats = self.db.user_stats(user_id)?;
        let earned = self.db.earned_achievements(user_id)?;

        Ok(definitions
            .into_iter()
            .map(|achievement| {
                let earned_at: Option<DateTime<Utc>> = earned.get(&achievement.id).copied();
                let (status, progress) = match earned_at {
                    // 已解锁的成就固定为 100，不随当前连续天数回落
                    Some(_) => (AchievementStatus::Unlocked, 100),
                    None => (
                        AchievementStatus::Locked,
                        progress_percent(
                            stats.value_for(achievement.achievement_type),
                            achievement.threshold,
                        ),
                    ),
                };
                AchievementView {
                    achievement,
                    status,
                    earned_at,
                    progress,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::AchievementType;
    use crate::models::{Difficulty, NewAchievement, NewCategory, OptionDraft, QuestionDraft, QuizDraft};
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn achievement(name: &str, achievement_type: AchievementType, threshold: u32) -> NewAchievement {
        NewAchievement {
            name: name.to_string(),
            description: format!("{} desc", name),
            icon: "🏅".to_string(),
            badge_color: "#000000".to_string(),
            achievement_type,
            threshold,
        }
    }

    /// 一个 EASY 测验（xp 100，300 秒，2 题）和一个已注册用户
    fn setup() -> (DatabaseService, QuizService, QuizWithQuestions, String) {
        let db = DatabaseService::open_in_memory().unwrap();
        let category_id = db
            .ensure_category(&NewCategory {
                name: "Dasar Ekonomi Syariah".to_string(),
                slug: "dasar-ekonomi-syariah".to_string(),
                description: None,
                icon: None,
                color: None,
            })
            .unwrap();

        let question = |content: &str| QuestionDraft {
            content: content.to_string(),
            explanation: Some("penjelasan".to_string()),
            options: vec![
                OptionDraft {
                    content: "benar".to_string(),
                    is_correct: true,
                },
                OptionDraft {
                    content: "salah".to_string(),
                    is_correct: false,
                },
            ],
        };
        let quiz_id = db
            .save_quiz(
                &QuizDraft {
                    title: "Riba dan Gharar".to_string(),
                    slug: "riba-dan-gharar".to_string(),
                    description: None,
                    category_slug: "dasar-ekonomi-syariah".to_string(),
                    difficulty: Difficulty::Easy,
                    xp_reward: 100,
                    time_limit: 300,
                    questions: vec![question("Apa itu riba?"), question("Apa itu gharar?")],
                },
                category_id,
            )
            .unwrap();

        db.ensure_achievement(&achievement("Langkah Pertama", AchievementType::QuizComplete, 1))
            .unwrap();
        db.ensure_achievement(&achievement("Sempurna!", AchievementType::PerfectScore, 1))
            .unwrap();
        db.ensure_achievement(&achievement("Pembelajar Aktif", AchievementType::QuizComplete, 10))
            .unwrap();

        let quiz = db.load_quiz(quiz_id).unwrap().unwrap();
        let user = db.create_user("Aisyah", "aisyah@example.com").unwrap();
        (db.clone(), QuizService::new(db), quiz, user.id)
    }

    fn answers(quiz: &QuizWithQuestions, correct: usize) -> HashMap<i64, i64> {
        quiz.questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let option = if idx < correct {
                    q.options.iter().find(|o| o.is_correct)
                } else {
                    q.options.iter().find(|o| !o.is_correct)
                };
                (q.id, option.unwrap().id)
            })
            .collect()
    }

    fn submission(quiz: &QuizWithQuestions, correct: usize, time_taken: u32) -> QuizSubmission {
        QuizSubmission {
            quiz_id: quiz.quiz.id,
            answers: answers(quiz, correct),
            time_taken,
        }
    }

    #[test]
    fn test_grade_answers() {
        let (_, _, quiz, _) = setup();
        let grade = grade_answers(&quiz, &submission(&quiz, 1, 60)).unwrap();
        assert_eq!(grade.correct, 1);
        assert_eq!(grade.total, 2);
        assert_eq!(grade.score, 50);
        assert_eq!(grade.answers.len(), 2);

        let mut partial = submission(&quiz, 2, 60);
        partial.answers.remove(&quiz.questions[1].id);
        let grade = grade_answers(&quiz, &partial).unwrap();
        assert_eq!(grade.score, 50);
        assert_eq!(grade.answers.len(), 1);
    }

    #[test]
    fn test_grade_empty_quiz_is_rejected() {
        let (_, _, mut quiz, _) = setup();
        quiz.questions.clear();
        let err = grade_answers(&quiz, &submission(&quiz, 0, 10)).unwrap_err();
        assert!(matches!(err, KuisError::Validation(_)));
    }

    #[test]
    fn test_first_perfect_submission() {
        let (db, service, quiz, user_id) = setup();
        let today = date(2024, 3, 10);

        // 100 * 1.0 * 1.0 * (1 + 0.2 * 0.5) + 50 = 160
        let result = service
            .submit(&user_id, &submission(&quiz, 2, 150), today)
            .unwrap();

        assert!(result.success);
        assert_eq!(result.score, 100);
        assert_eq!(result.xp_earned, 160);
        assert_eq!(result.new_total_xp, 160);
        assert_eq!(result.new_level, 2);
        assert_eq!(result.level_up.as_ref().unwrap().title, "Pelajar");
        assert_eq!(result.streak, StreakSummary { current: 1, longest: 1 });

        let names: Vec<&str> = result.achievements.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Langkah Pertama", "Sempurna!"]);

        let user = db.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.total_xp, 160);
        assert_eq!(user.level, 2);
    }

    #[test]
    fn test_same_day_resubmission_keeps_streak_and_no_duplicate_achievements() {
        let (_, service, quiz, user_id) = setup();
        let today = date(2024, 3, 10);

        service.submit(&user_id, &submission(&quiz, 2, 150), today).unwrap();
        let second = service
            .submit(&user_id, &submission(&quiz, 1, 300), today)
            .unwrap();

        // 100 * 0.5 * 1.0 * (1 + 0) = 50
        assert_eq!(second.score, 50);
        assert_eq!(second.xp_earned, 50);
        assert_eq!(second.new_total_xp, 210);
        assert!(second.level_up.is_none());
        assert_eq!(second.streak, StreakSummary { current: 1, longest: 1 });
        assert!(second.achievements.is_empty());
    }

    #[test]
    fn test_streak_multiplier_uses_previous_streak() {
        let (_, service, quiz, user_id) = setup();

        for (day, expected_streak) in [(1, 1), (2, 2), (3, 3)] {
            let result = service
                .submit(&user_id, &submission(&quiz, 0, 300), date(2024, 3, day))
                .unwrap();
            assert_eq!(result.streak.current, expected_streak);
        }

        // 前一次连续 3 天，系数 1.1：(100 * 1.0 + 50) * 1.1 = 165
        let result = service
            .submit(&user_id, &submission(&quiz, 2, 300), date(2024, 3, 4))
            .unwrap();
        assert_eq!(result.xp_earned, 165);
        assert_eq!(result.streak, StreakSummary { current: 4, longest: 4 });

        let result = service
            .submit(&user_id, &submission(&quiz, 0, 300), date(2024, 3, 9))
            .unwrap();
        assert_eq!(result.streak, StreakSummary { current: 1, longest: 4 });
    }

    #[test]
    fn test_submit_unknown_quiz_or_user() {
        let (_, service, quiz, user_id) = setup();
        let mut missing = submission(&quiz, 2, 100);
        missing.quiz_id = 9999;
        let err = service.submit(&user_id, &missing, date(2024, 3, 10)).unwrap_err();
        assert!(matches!(err, KuisError::NotFound { entity: "quiz", .. }));

        let err = service
            .submit("no-such-user", &submission(&quiz, 2, 100), date(2024, 3, 10))
            .unwrap_err();
        assert!(matches!(err, KuisError::NotFound { entity: "user", .. }));
    }

    #[test]
    fn test_profile_hides_stale_streak() {
        let (db, service, quiz, user_id) = setup();
        service.submit(&user_id, &submission(&quiz, 2, 150), date(2024, 3, 10)).unwrap();

        let profile = service.profile(&user_id, date(2024, 3, 11)).unwrap();
        assert_eq!(profile.streak.current, 1);
        assert_eq!(profile.progress.current_level.level, 2);
        assert_eq!(profile.recent_attempts.len(), 1);
        assert_eq!(profile.total_xp_display, "160");

        let profile = service.profile(&user_id, date(2024, 3, 13)).unwrap();
        assert_eq!(profile.streak, StreakSummary { current: 0, longest: 1 });
        // 存储的记录不变
        assert_eq!(db.find_streak(&user_id).unwrap().unwrap().current_streak, 1);
    }

    #[test]
    fn test_achievements_with_progress() {
        let (_, service, quiz, user_id) = setup();

        let anonymous = service.achievements_with_progress(None).unwrap();
        assert_eq!(anonymous.len(), 3);
        assert!(anonymous
            .iter()
            .all(|v| v.status == AchievementStatus::Locked && v.progress == 0));

        service.submit(&user_id, &submission(&quiz, 1, 150), date(2024, 3, 10)).unwrap();
        let views = service.achievements_with_progress(Some(&user_id)).unwrap();

        let find = |name: &str| views.iter().find(|v| v.achievement.name == name).unwrap();
        let first = find("Langkah Pertama");
        assert_eq!(first.status, AchievementStatus::Unlocked);
        assert!(first.earned_at.is_some());
        assert_eq!(first.progress, 100);
        assert_eq!(find("Pembelajar Aktif").progress, 10);
        assert_eq!(find("Sempurna!").status, AchievementStatus::Locked);
    }

    #[test]
    fn test_concurrent_submissions_award_each_achievement_once() {
        use crate::gamification::evaluate_new_achievements;
        use crate::services::seed::{seed_defaults, SAMPLE_QUIZ_SLUG};
        use std::collections::HashSet;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kuis.db");
        let db = DatabaseService::open(&path).unwrap();
        seed_defaults(&db).unwrap();
        let user_id = db.create_user("Aisyah", "aisyah@example.com").unwrap().id;
        let quiz_id = db.find_quiz_by_slug(SAMPLE_QUIZ_SLUG).unwrap().unwrap().id;
        let quiz = db.load_quiz(quiz_id).unwrap().unwrap();
        let perfect = submission(&quiz, quiz.questions.len(), 120);
        let today = date(2024, 3, 10);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                let user_id = user_id.clone();
                let perfect = perfect.clone();
                thread::spawn(move || {
                    let db = DatabaseService::open(&path)?;
                    QuizService::new(db).submit(&user_id, &perfect, today)
                })
            })
            .collect();
        let results: Vec<SubmissionResult> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        let stats = db.user_stats(&user_id).unwrap();
        assert_eq!(stats.total_quiz_completed, 8);
        assert_eq!(stats.perfect_score_count, 8);

        let definitions = db.list_achievements().unwrap();
        let qualifying = evaluate_new_achievements(&definitions, &HashSet::new(), &stats);
        let earned = db.earned_achievements(&user_id).unwrap();
        assert_eq!(earned.len(), qualifying.len());

        let reported: Vec<i64> = results
            .iter()
            .flat_map(|r| r.achievements.iter().map(|a| a.id))
            .collect();
        assert_eq!(reported.len(), qualifying.len());
        let unique: HashSet<i64> = reported.iter().copied().collect();
        assert_eq!(unique.len(), reported.len());

        let xp_sum: u32 = results.iter().map(|r| r.xp_earned).sum();
        let user = db.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user.total_xp, xp_sum);
        assert_eq!(results.iter().map(|r| r.new_total_xp).max(), Some(xp_sum));
    }
}
