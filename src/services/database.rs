// 数据库服务模块
// 提供 SQLite 存储：题库、用户、答题记录、连续打卡与成就

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::error::{KuisError, Result};
use crate::gamification::{
    advance_streak, check_level_up, compute_xp, evaluate_new_achievements, level_from_xp,
    AchievementDefinition, QuizOutcome, StreakState, UserAggregateStats,
};
use crate::models::{
    AnswerOption, Category, CategorySummary, ContentStats, EarnedAchievement, LeaderboardEntry,
    LevelUp, NewAchievement, NewCategory, Question, Quiz, QuizAttempt, QuizDraft, QuizSummary,
    QuizWithQuestions, StreakSummary, SubmissionResult, User, UserAnswer,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    total_xp INTEGER NOT NULL DEFAULT 0 CHECK(total_xp >= 0),
    level INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    icon TEXT,
    color TEXT
);

CREATE TABLE IF NOT EXISTS quizzes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    category_id INTEGER NOT NULL,
    difficulty TEXT NOT NULL CHECK(difficulty IN ('EASY', 'MEDIUM', 'HARD')),
    xp_reward INTEGER NOT NULL DEFAULT 100,
    time_limit INTEGER NOT NULL CHECK(time_limit > 0),
    created_at TEXT NOT NULL,
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    explanation TEXT,
    position INTEGER NOT NULL,
    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS answer_options (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    is_correct BOOLEAN NOT NULL DEFAULT 0,
    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS quiz_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    quiz_id INTEGER NOT NULL,
    score INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
    xp_earned INTEGER NOT NULL,
    time_taken INTEGER NOT NULL,
    completed_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS user_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attempt_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    selected_option_id INTEGER NOT NULL,
    is_correct BOOLEAN NOT NULL,
    FOREIGN KEY (attempt_id) REFERENCES quiz_attempts(id) ON DELETE CASCADE,
    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS user_streaks (
    user_id TEXT PRIMARY KEY,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_active_date TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    badge_color TEXT NOT NULL,
    type TEXT NOT NULL CHECK(type IN ('QUIZ_COMPLETE', 'PERFECT_SCORE', 'STREAK', 'XP_MILESTONE')),
    threshold INTEGER NOT NULL CHECK(threshold > 0)
);

CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL,
    achievement_id INTEGER NOT NULL,
    earned_at TEXT NOT NULL,
    PRIMARY KEY (user_id, achievement_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (achievement_id) REFERENCES achievements(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_quizzes_category ON quizzes(category_id);
CREATE INDEX IF NOT EXISTS idx_questions_quiz ON questions(quiz_id);
CREATE INDEX IF NOT EXISTS idx_options_question ON answer_options(question_id);
CREATE INDEX IF NOT EXISTS idx_attempts_user ON quiz_attempts(user_id);
CREATE INDEX IF NOT EXISTS idx_users_total_xp ON users(total_xp DESC);
"#;

/// 已评分、待入库的一次答题
#[derive(Debug, Clone)]
pub struct GradedAttempt<'a> {
    pub user_id: &'a str,
    pub quiz: &'a Quiz,
    /// 0..=100
    pub score: u32,
    pub time_taken: u32,
    pub answers: Vec<UserAnswer>,
    pub today: NaiveDate,
}

const USER_COLUMNS: &str = "id, name, email, total_xp, level, created_at";
const QUIZ_COLUMNS: &str =
    "id, title, slug, description, category_id, difficulty, xp_reward, time_limit, created_at";

/// 数据库服务
///
/// 由进程入口创建并显式传递给各服务，克隆共享同一连接
#[derive(Clone)]
pub struct DatabaseService {
    pool: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// 打开（或创建）数据库文件并初始化表结构
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// 内存数据库，用于测试
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let service = Self {
            pool: Arc::new(Mutex::new(conn)),
            db_path,
        };
        service.initialize()?;
        Ok(service)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.pool.lock().map_err(|_| KuisError::LockPoisoned)
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// 在 IMMEDIATE 事务中执行，闭包出错时回滚
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ==================== 用户 ====================

    /// 注册用户
    pub fn create_user(&self, name: &str, email: &str) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(KuisError::Validation("name and email are required".to_string()));
        }
        if !email.contains('@') {
            return Err(KuisError::Validation(format!("invalid email: {}", email)));
        }

        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        if exists {
            return Err(KuisError::Validation(format!("email already registered: {}", email)));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            total_xp: 0,
            level: 1,
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO users (id, name, email, total_xp, level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                user.email,
                user.total_xp,
                user.level,
                user.created_at.to_rfc3339(),
            ],
        )?;

        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![email.trim().to_lowercase()], Self::row_to_user)
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        Self::fetch_user(&conn, id)
    }

    /// 删除用户及其全部记录，返回是否存在
    pub fn delete_user_by_email(&self, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM users WHERE email = ?1",
            params![email.trim().to_lowercase()],
        )?;
        Ok(deleted > 0)
    }

    fn fetch_user(conn: &Connection, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::row_to_user).optional()?)
    }

    fn update_user_progress(conn: &Connection, user_id: &str, total_xp: u32, level: u32) -> Result<()> {
        conn.execute(
            "UPDATE users SET total_xp = ?1, level = ?2 WHERE id = ?3",
            params![total_xp, level, user_id],
        )?;
        Ok(())
    }

    // ==================== 分类 ====================

    /// 按 slug 插入分类，已存在时保持不变，返回分类 id
    pub fn ensure_category(&self, category: &NewCategory) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, slug, description, icon, color)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slug) DO NOTHING",
            params![
                category.name,
                category.slug,
                category.description,
                category.icon,
                category.color,
            ],
        )?;
        let id = conn.query_row(
            "SELECT id FROM categories WHERE slug = ?1",
            params![category.slug],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, slug, description, icon, color FROM categories WHERE slug = ?1",
                params![slug],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// 列出分类及各自测验数
    pub fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let conn = self.conn()?;
        Self::fetch_category_summaries(&conn)
    }

    fn fetch_category_summaries(conn: &Connection) -> Result<Vec<CategorySummary>> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.slug, c.description, c.icon, c.color, COUNT(q.id)
             FROM categories c
             LEFT JOIN quizzes q ON q.category_id = c.id
             GROUP BY c.id
             ORDER BY c.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                category: Self::row_to_category(row)?,
                quiz_count: row.get(6)?,
            })
        })?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    // ==================== 测验 ====================

    /// 按 slug 新建或更新测验，并整体替换题目
    ///
    /// 已存在的测验保留原分类；已有答题记录的测验不允许替换题目
    pub fn save_quiz(&self, draft: &QuizDraft, category_id: i64) -> Result<i64> {
        self.transaction(|tx| {
            let attempts: u32 = tx.query_row(
                "SELECT COUNT(a.id)
                 FROM quizzes q
                 JOIN quiz_attempts a ON a.quiz_id = q.id
                 WHERE q.slug = ?1",
                params![draft.slug],
                |row| row.get(0),
            )?;
            if attempts > 0 {
                return Err(KuisError::Validation(format!(
                    "quiz '{}' already has {} attempt(s), questions cannot be replaced",
                    draft.slug, attempts
                )));
            }

            let quiz_id: i64 = tx.query_row(
                "INSERT INTO quizzes
                 (title, slug, description, category_id, difficulty, xp_reward, time_limit, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(slug) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    difficulty = excluded.difficulty,
                    xp_reward = excluded.xp_reward,
                    time_limit = excluded.time_limit
                 RETURNING id",
                params![
                    draft.title,
                    draft.slug,
                    draft.description,
                    category_id,
                    draft.difficulty,
                    draft.xp_reward,
                    draft.time_limit,
                    Utc::now().to_rfc3339(),
                ],
                |row| row.get(0),
            )?;

            tx.execute("DELETE FROM questions WHERE quiz_id = ?1", params![quiz_id])?;

            let mut question_stmt = tx.prepare(
                "INSERT INTO questions (quiz_id, content, explanation, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut option_stmt = tx.prepare(
                "INSERT INTO answer_options (question_id, content, is_correct)
                 VALUES (?1, ?2, ?3)",
            )?;

            for (idx, question) in draft.questions.iter().enumerate() {
                question_stmt.execute(params![
                    quiz_id,
                    question.content,
                    question.explanation,
                    (idx + 1) as u32,
                ])?;
                let question_id = tx.last_insert_rowid();
                for option in &question.options {
                    option_stmt.execute(params![question_id, option.content, option.is_correct])?;
                }
            }

            Ok(quiz_id)
        })
    }

    pub fn find_quiz_by_slug(&self, slug: &str) -> Result<Option<Quiz>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM quizzes WHERE slug = ?1", QUIZ_COLUMNS);
        Ok(conn.query_row(&sql, params![slug], Self::row_to_quiz).optional()?)
    }

    /// 某分类下的测验及题目数
    pub fn list_quizzes_in_category(&self, category_id: i64) -> Result<Vec<QuizSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.title, q.slug, q.description, q.category_id, q.difficulty,
                    q.xp_reward, q.time_limit, q.created_at, COUNT(qs.id)
             FROM quizzes q
             LEFT JOIN questions qs ON qs.quiz_id = q.id
             WHERE q.category_id = ?1
             GROUP BY q.id
             ORDER BY q.id",
        )?;
        let rows = stmt.query_map(params![category_id], |row| {
            Ok(QuizSummary {
                quiz: Self::row_to_quiz(row)?,
                question_count: row.get(9)?,
            })
        })?;

        let mut quizzes = Vec::new();
        for row in rows {
            quizzes.push(row?);
        }
        Ok(quizzes)
    }

    pub fn load_quiz(&self, quiz_id: i64) -> Result<Option<QuizWithQuestions>> {
        let conn = self.conn()?;
        Self::fetch_quiz_with_questions(&conn, quiz_id)
    }

    /// 测验及其题目、选项，题目按 position、选项按 id 排序
    fn fetch_quiz_with_questions(conn: &Connection, quiz_id: i64) -> Result<Option<QuizWithQuestions>> {
        let sql = format!("SELECT {} FROM quizzes WHERE id = ?1", QUIZ_COLUMNS);
        let Some(quiz) = conn.query_row(&sql, params![quiz_id], Self::row_to_quiz).optional()? else {
            return Ok(None);
        };

        let mut option_stmt = conn.prepare(
            "SELECT o.id, o.question_id, o.content, o.is_correct
             FROM answer_options o
             JOIN questions q ON q.id = o.question_id
             WHERE q.quiz_id = ?1
             ORDER BY o.id",
        )?;
        let option_rows = option_stmt.query_map(params![quiz_id], |row| {
            Ok(AnswerOption {
                id: row.get(0)?,
                question_id: row.get(1)?,
                content: row.get(2)?,
                is_correct: row.get(3)?,
            })
        })?;
        let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for option in option_rows {
            let option = option?;
            options_by_question.entry(option.question_id).or_default().push(option);
        }

        let mut question_stmt = conn.prepare(
            "SELECT id, quiz_id, content, explanation, position
             FROM questions WHERE quiz_id = ?1 ORDER BY position",
        )?;
        let question_rows = question_stmt.query_map(params![quiz_id], |row| {
            Ok(Question {
                id: row.get(0)?,
                quiz_id: row.get(1)?,
                content: row.get(2)?,
                explanation: row.get(3)?,
                position: row.get(4)?,
                options: Vec::new(),
            })
        })?;
        let mut questions = Vec::new();
        for question in question_rows {
            let mut question = question?;
            question.options = options_by_question.remove(&question.id).unwrap_or_default();
            questions.push(question);
        }

        Ok(Some(QuizWithQuestions { quiz, questions }))
    }

    // ==================== 答题记录 ====================

    /// 写入答题记录及各题作答，返回记录 id
    fn insert_attempt(
        conn: &Connection,
        user_id: &str,
        quiz_id: i64,
        score: u32,
        xp_earned: u32,
        time_taken: u32,
        answers: &[UserAnswer],
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO quiz_attempts (user_id, quiz_id, score, xp_earned, time_taken, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, quiz_id, score, xp_earned, time_taken, Utc::now().to_rfc3339()],
        )?;
        let attempt_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            "INSERT INTO user_answers (attempt_id, question_id, selected_option_id, is_correct)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for answer in answers {
            stmt.execute(params![
                attempt_id,
                answer.question_id,
                answer.selected_option_id,
                answer.is_correct,
            ])?;
        }

        Ok(attempt_id)
    }

    /// 在同一个 IMMEDIATE 事务内结算一次答题
    ///
    /// 经验按提交前的连续打卡天数计算；成就按提交后的统计判定，
    /// 已获得集合也在事务内读取，同一用户并发提交不会重复授予
    pub fn record_submission(&self, attempt: &GradedAttempt<'_>) -> Result<SubmissionResult> {
        self.transaction(|tx| {
            let user = Self::fetch_user(tx, attempt.user_id)?
                .ok_or_else(|| KuisError::not_found("user", attempt.user_id))?;
            let prev_streak = Self::fetch_streak(tx, attempt.user_id)?;

            let xp_earned = compute_xp(&QuizOutcome {
                base_reward: attempt.quiz.xp_reward,
                difficulty: attempt.quiz.difficulty,
                time_limit_seconds: attempt.quiz.time_limit,
                score_percent: attempt.score,
                time_taken_seconds: attempt.time_taken,
                current_streak_days: prev_streak.map_or(0, |s| s.current_streak),
            });

            let attempt_id = Self::insert_attempt(
                tx,
                attempt.user_id,
                attempt.quiz.id,
                attempt.score,
                xp_earned,
                attempt.time_taken,
                &attempt.answers,
            )?;

            let new_total_xp = user.total_xp.saturating_add(xp_earned);
            let new_level = level_from_xp(new_total_xp);
            Self::update_user_progress(tx, attempt.user_id, new_total_xp, new_level.level)?;
            let level_up = check_level_up(user.total_xp, new_total_xp).map(|level| LevelUp {
                level: level.level,
                title: level.title.to_string(),
            });

            let streak = advance_streak(prev_streak.as_ref(), attempt.today);
            Self::upsert_streak(tx, attempt.user_id, &streak)?;

            let stats = Self::fetch_user_stats(tx, attempt.user_id)?;
            let definitions = Self::fetch_achievements(tx)?;
            let earned_ids = Self::fetch_earned_ids(tx, attempt.user_id)?;
            let mut achievements = Vec::new();
            for definition in evaluate_new_achievements(&definitions, &earned_ids, &stats) {
                if Self::insert_user_achievement(tx, attempt.user_id, definition.id)? {
                    achievements.push(EarnedAchievement {
                        id: definition.id,
                        name: definition.name.clone(),
                    });
                }
            }

            Ok(SubmissionResult {
                success: true,
                attempt_id,
                score: attempt.score,
                xp_earned,
                new_total_xp,
                new_level: new_level.level,
                level_up,
                streak: StreakSummary {
                    current: streak.current_streak,
                    longest: streak.longest_streak,
                },
                achievements,
            })
        })
    }

    /// 用户最近的答题记录
    pub fn recent_attempts(&self, user_id: &str, limit: u32) -> Result<Vec<QuizAttempt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, quiz_id, score, xp_earned, time_taken, completed_at
             FROM quiz_attempts WHERE user_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(QuizAttempt {
                id: row.get(0)?,
                user_id: row.get(1)?,
                quiz_id: row.get(2)?,
                score: row.get(3)?,
                xp_earned: row.get(4)?,
                time_taken: row.get(5)?,
                completed_at: parse_timestamp(6, row.get(6)?)?,
            })
        })?;

        let mut attempts = Vec::new();
        for row in rows {
            attempts.push(row?);
        }
        Ok(attempts)
    }

    // ==================== 连续打卡 ====================

    pub fn find_streak(&self, user_id: &str) -> Result<Option<StreakState>> {
        let conn = self.conn()?;
        Self::fetch_streak(&conn, user_id)
    }

    fn fetch_streak(conn: &Connection, user_id: &str) -> Result<Option<StreakState>> {
        let streak = conn
            .query_row(
                "SELECT current_streak, longest_streak, last_active_date
                 FROM user_streaks WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(StreakState {
                        current_streak: row.get(0)?,
                        longest_streak: row.get(1)?,
                        last_active_date: parse_date(2, row.get(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(streak)
    }

    fn upsert_streak(conn: &Connection, user_id: &str, streak: &StreakState) -> Result<()> {
        conn.execute(
            "INSERT INTO user_streaks (user_id, current_streak, longest_streak, last_active_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                last_active_date = excluded.last_active_date",
            params![
                user_id,
                streak.current_streak,
                streak.longest_streak,
                streak.last_active_date.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    // ==================== 统计与成就 ====================

    pub fn user_stats(&self, user_id: &str) -> Result<UserAggregateStats> {
        let conn = self.conn()?;
        Self::fetch_user_stats(&conn, user_id)
    }

    /// 汇总用户统计，用户不存在时返回 NotFound
    fn fetch_user_stats(conn: &Connection, user_id: &str) -> Result<UserAggregateStats> {
        conn.query_row(
            "SELECT u.total_xp,
                    (SELECT COUNT(*) FROM quiz_attempts a WHERE a.user_id = u.id),
                    (SELECT COUNT(*) FROM quiz_attempts a WHERE a.user_id = u.id AND a.score = 100),
                    COALESCE(s.current_streak, 0),
                    COALESCE(s.longest_streak, 0)
             FROM users u
             LEFT JOIN user_streaks s ON s.user_id = u.id
             WHERE u.id = ?1",
            params![user_id],
            |row| {
                Ok(UserAggregateStats {
                    total_xp: row.get(0)?,
                    total_quiz_completed: row.get(1)?,
                    perfect_score_count: row.get(2)?,
                    current_streak_days: row.get(3)?,
                    longest_streak_days: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| KuisError::not_found("user", user_id))
    }

    /// 按名称插入成就，已存在时保持不变
    pub fn ensure_achievement(&self, achievement: &NewAchievement) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO achievements (name, description, icon, badge_color, type, threshold)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO NOTHING",
            params![
                achievement.name,
                achievement.description,
                achievement.icon,
                achievement.badge_color,
                achievement.achievement_type,
                achievement.threshold,
            ],
        )?;
        let id = conn.query_row(
            "SELECT id FROM achievements WHERE name = ?1",
            params![achievement.name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// 展示用排序：类型、阈值
    pub fn list_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        let conn = self.conn()?;
        Self::query_achievements(&conn, "ORDER BY type, threshold")
    }

    /// 判定用排序：id
    fn fetch_achievements(conn: &Connection) -> Result<Vec<AchievementDefinition>> {
        Self::query_achievements(conn, "ORDER BY id")
    }

    fn query_achievements(conn: &Connection, order_by: &str) -> Result<Vec<AchievementDefinition>> {
        let sql = format!(
            "SELECT id, name, description, icon, badge_color, type, threshold FROM achievements {}",
            order_by
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(AchievementDefinition {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                badge_color: row.get(4)?,
                achievement_type: row.get(5)?,
                threshold: row.get(6)?,
            })
        })?;

        let mut achievements = Vec::new();
        for row in rows {
            achievements.push(row?);
        }
        Ok(achievements)
    }

    /// 用户已获得的成就 id -> 获得时间
    pub fn earned_achievements(&self, user_id: &str) -> Result<HashMap<i64, DateTime<Utc>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT achievement_id, earned_at FROM user_achievements WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, i64>(0)?, parse_timestamp(1, row.get(1)?)?))
        })?;

        let mut earned = HashMap::new();
        for row in rows {
            let (id, earned_at) = row?;
            earned.insert(id, earned_at);
        }
        Ok(earned)
    }

    fn fetch_earned_ids(conn: &Connection, user_id: &str) -> Result<HashSet<i64>> {
        let mut stmt =
            conn.prepare("SELECT achievement_id FROM user_achievements WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, i64>(0))?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }

    /// 记录获得成就，已获得时忽略
    fn insert_user_achievement(conn: &Connection, user_id: &str, achievement_id: i64) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, earned_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, achievement_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    // ==================== 排行榜与统计 ====================

    /// 按总经验降序
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.total_xp, u.level, COALESCE(s.current_streak, 0)
             FROM users u
             LEFT JOIN user_streaks s ON s.user_id = u.id
             ORDER BY u.total_xp DESC, u.name ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let total_xp: u32 = row.get(2)?;
            Ok(LeaderboardEntry {
                rank: 0,
                user_id: row.get(0)?,
                name: row.get(1)?,
                total_xp,
                level: row.get(3)?,
                title: level_from_xp(total_xp).title.to_string(),
                current_streak: row.get(4)?,
            })
        })?;

        let mut entries = Vec::new();
        for (idx, row) in rows.enumerate() {
            let mut entry = row?;
            entry.rank = idx as u32 + 1;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// 题库统计
    pub fn content_stats(&self) -> Result<ContentStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<u32> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            Ok(conn.query_row(&sql, [], |row| row.get(0))?)
        };

        Ok(ContentStats {
            categories: count("categories")?,
            quizzes: count("quizzes")?,
            questions: count("questions")?,
            options: count("answer_options")?,
            per_category: Self::fetch_category_summaries(&conn)?,
        })
    }

    /// id 最小的测验
    pub fn first_quiz(&self) -> Result<Option<QuizWithQuestions>> {
        let conn = self.conn()?;
        let first: Option<i64> = conn
            .query_row("SELECT id FROM quizzes ORDER BY id LIMIT 1", [], |row| row.get(0))
            .optional()?;
        match first {
            Some(id) => Self::fetch_quiz_with_questions(&conn, id),
            None => Ok(None),
        }
    }

    // ==================== 辅助方法 ====================

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            total_xp: row.get(3)?,
            level: row.get(4)?,
            created_at: parse_timestamp(5, row.get(5)?)?,
        })
    }

    fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            icon: row.get(4)?,
            color: row.get(5)?,
        })
    }

    fn row_to_quiz(row: &Row) -> rusqlite::Result<Quiz> {
        Ok(Quiz {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            category_id: row.get(4)?,
            difficulty: row.get(5)?,
            xp_reward: row.get(6)?,
            time_limit: row.get(7)?,
            created_at: parse_timestamp(8, row.get(8)?)?,
        })
    }
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
