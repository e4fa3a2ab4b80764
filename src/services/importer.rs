// 题库导入模块
// 支持 JSON 数组文件与 Markdown 文档，目录导入按文件名排序

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{KuisError, Result};
use crate::models::{Difficulty, OptionDraft, QuestionDraft, QuizDraft};
use crate::services::database::DatabaseService;
use crate::services::parser::parse_quiz_markdown;

const JSON_EXTENSIONS: &[&str] = &["json"];
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// JSON 题库中的选项
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionData {
    pub content: String,
    pub is_correct: bool,
}

/// JSON 题库中的题目
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    pub content: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub options: Vec<OptionData>,
}

/// JSON 题库中的测验
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_slug: String,
    pub difficulty: String,
    pub xp_reward: u32,
    pub time_limit: u32,
    pub questions: Vec<QuestionData>,
}

impl QuizData {
    /// 难度字符串在这里才解析，未知值返回错误
    pub fn into_draft(self) -> Result<QuizDraft> {
        let difficulty: Difficulty = self.difficulty.parse()?;
        Ok(QuizDraft {
            title: self.title,
            slug: self.slug,
            description: self.description,
            category_slug: self.category_slug,
            difficulty,
            xp_reward: self.xp_reward,
            time_limit: self.time_limit,
            questions: self
                .questions
                .into_iter()
                .map(|q| QuestionDraft {
                    content: q.content,
                    explanation: q.explanation,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| OptionDraft {
                            content: o.content,
                            is_correct: o.is_correct,
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

/// 导入结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub files_processed: u32,
    pub total_quizzes: u32,
    pub total_questions: u32,
    /// 被跳过的测验或文件及原因
    pub skipped: Vec<String>,
}

impl ImportReport {
    fn merge(&mut self, other: ImportReport) {
        self.files_processed += other.files_processed;
        self.total_quizzes += other.total_quizzes;
        self.total_questions += other.total_questions;
        self.skipped.extend(other.skipped);
    }
}

/// 题库导入器
#[derive(Clone)]
pub struct Importer {
    db: DatabaseService,
}

impl Importer {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// 导入目录下的全部 *.json、*.md 与 *.markdown 文件
    pub fn import_dir(&self, dir: &Path) -> Result<ImportReport> {
        if !dir.is_dir() {
            return Err(KuisError::not_found("directory", dir.display()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_quiz_file(path))
            .collect();
        files.sort();

        info!("importing {} file(s) from {}", files.len(), dir.display());

        let mut report = ImportReport::default();
        for path in files {
            match self.import_file(&path) {
                Ok(file_report) => report.merge(file_report),
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    report.skipped.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        info!(
            "import finished: {} file(s), {} quiz(zes), {} question(s), {} skipped",
            report.files_processed,
            report.total_quizzes,
            report.total_questions,
            report.skipped.len()
        );
        Ok(report)
    }

    /// 导入单个文件，按扩展名选择格式
    pub fn import_file(&self, path: &Path) -> Result<ImportReport> {
        let content = fs::read_to_string(path)?;
        let label = path.display().to_string();

        let drafts: Vec<(String, Result<QuizDraft>)> = match extension(path).as_deref() {
            Some(ext) if JSON_EXTENSIONS.contains(&ext) => {
                let quizzes: Vec<QuizData> = serde_json::from_str(&content)?;
                quizzes
                    .into_iter()
                    .map(|q| (format!("{} [{}]", label, q.slug), q.into_draft()))
                    .collect()
            }
            Some(ext) if MARKDOWN_EXTENSIONS.contains(&ext) => {
                vec![(label.clone(), parse_quiz_markdown(&content))]
            }
            _ => {
                return Err(KuisError::Validation(format!(
                    "unsupported file type: {}",
                    label
                )))
            }
        };

        let mut report = ImportReport {
            files_processed: 1,
            ..ImportReport::default()
        };
        for (source, draft) in drafts {
            match draft.and_then(|d| self.import_draft(&d)) {
                Ok(question_count) => {
                    report.total_quizzes += 1;
                    report.total_questions += question_count;
                }
                Err(e) => {
                    warn!("skipping quiz {}: {}", source, e);
                    report.skipped.push(format!("{}: {}", source, e));
                }
            }
        }
        Ok(report)
    }

    /// 校验并写入一个测验，返回题目数
    pub fn import_draft(&self, draft: &QuizDraft) -> Result<u32> {
        draft.validate()?;

        let category = self
            .db
            .find_category_by_slug(&draft.category_slug)?
            .ok_or_else(|| KuisError::not_found("category", &draft.category_slug))?;

        let quiz_id = self.db.save_quiz(draft, category.id)?;
        debug!(
            "imported quiz '{}' (id {}) with {} question(s)",
            draft.slug,
            quiz_id,
            draft.questions.len()
        );
        Ok(draft.questions.len() as u32)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_quiz_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| {
        JSON_EXTENSIONS.contains(&ext.as_str()) || MARKDOWN_EXTENSIONS.contains(&ext.as_str())
    })
}
