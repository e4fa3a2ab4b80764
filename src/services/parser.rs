//! Markdown 题库解析
//! 使用 pulldown-cmark 的 Pull 模式解析测验文档：
//!
//! ```text
//! # 标题
//!
//! slug: pengenalan-riba
//! category: dasar-ekonomi-syariah
//! difficulty: EASY
//! xp: 100
//! time: 300
//!
//! 描述文字
//!
//! ## 题干
//!
//! - [x] 正确选项
//! - [ ] 错误选项
//!
//! > 解析
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::error::{KuisError, Result};
use crate::models::{Difficulty, OptionDraft, QuestionDraft, QuizDraft};
use crate::utils::slugify;

pub const DEFAULT_XP_REWARD: u32 = 100;
pub const DEFAULT_TIME_LIMIT: u32 = 300;

fn metadata_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(slug|category|difficulty|xp|time)\s*:\s*(.*?)\s*$")
            .expect("valid metadata regex")
    })
}

/// 当前文本写入的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Title,
    QuestionHeading,
    QuestionBody,
    Option,
    Explanation,
}

/// Markdown 测验解析器
#[derive(Debug)]
pub struct MarkdownParser {
    section: Section,
    title: String,
    attributes: HashMap<String, String>,
    description: Vec<String>,
    questions: Vec<QuestionDraft>,
    current_question: Option<QuestionDraft>,
    current_content: String,
    current_option_correct: bool,
    quote_depth: usize,
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self {
            section: Section::Preamble,
            title: String::new(),
            attributes: HashMap::new(),
            description: Vec::new(),
            questions: Vec::new(),
            current_question: None,
            current_content: String::new(),
            current_option_correct: false,
            quote_depth: 0,
        }
    }

    /// 解析一份文档为一个测验草稿，不做完整性校验
    pub fn parse(&mut self, content: &str) -> Result<QuizDraft> {
        self.reset();

        let parser = Parser::new_ext(content, Options::ENABLE_TASKLISTS);
        for event in parser {
            self.process_event(event);
        }
        self.save_current_question();

        self.build_draft()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.current_content.clear();
                if level == HeadingLevel::H1 {
                    self.section = Section::Title;
                } else if level == HeadingLevel::H2 {
                    self.start_new_question();
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                let text = self.take_content();
                if level == HeadingLevel::H1 {
                    self.title = text;
                    self.section = Section::Preamble;
                } else if level == HeadingLevel::H2 {
                    if let Some(q) = self.current_question.as_mut() {
                        q.content = text;
                    }
                    self.section = Section::QuestionBody;
                }
            }
            Event::Start(Tag::BlockQuote) => {
                self.quote_depth += 1;
                if self.current_question.is_some() {
                    self.flush_paragraph();
                    self.section = Section::Explanation;
                }
            }
            Event::End(TagEnd::BlockQuote) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.section == Section::Explanation && self.quote_depth == 0 {
                    let text = self.take_content();
                    if let Some(q) = self.current_question.as_mut() {
                        if !text.is_empty() {
                            q.explanation = Some(match q.explanation.take() {
                                Some(prev) => format!("{}\n{}", prev, text),
                                None => text,
                            });
                        }
                    }
                    self.section = Section::QuestionBody;
                }
            }
            Event::Start(Tag::Item) => {
                if self.current_question.is_some() && self.section == Section::QuestionBody {
                    self.flush_paragraph();
                    self.section = Section::Option;
                    self.current_option_correct = false;
                }
            }
            Event::End(TagEnd::Item) => {
                if self.section == Section::Option {
                    let content = self.take_content();
                    let is_correct = self.current_option_correct;
                    if let Some(q) = self.current_question.as_mut() {
                        if !content.is_empty() {
                            q.options.push(OptionDraft { content, is_correct });
                        }
                    }
                    self.section = Section::QuestionBody;
                }
            }
            Event::TaskListMarker(checked) => {
                if self.section == Section::Option {
                    self.current_option_correct = checked;
                }
            }
            Event::End(TagEnd::Paragraph) => match self.section {
                Section::Preamble => {
                    let text = std::mem::take(&mut self.current_content);
                    self.absorb_preamble(&text);
                }
                Section::QuestionBody => self.flush_paragraph(),
                Section::Explanation => self.current_content.push('\n'),
                _ => {}
            },
            Event::Text(text) | Event::Code(text) => {
                self.current_content.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak => {
                self.current_content.push('\n');
            }
            _ => {}
        }
    }

    /// 标题与第一题之间：元数据行或描述
    fn absorb_preamble(&mut self, text: &str) {
        let mut description = Vec::new();
        for line in text.lines() {
            if let Some(caps) = metadata_line().captures(line) {
                self.attributes
                    .insert(caps[1].to_ascii_lowercase(), caps[2].to_string());
            } else if !line.trim().is_empty() {
                description.push(line.trim().to_string());
            }
        }
        if !description.is_empty() {
            self.description.push(description.join(" "));
        }
    }

    /// 题干下方的段落并入题干
    fn flush_paragraph(&mut self) {
        let text = self.take_content();
        if text.is_empty() {
            return;
        }
        if let Some(q) = self.current_question.as_mut() {
            if q.content.is_empty() {
                q.content = text;
            } else {
                q.content = format!("{}\n{}", q.content, text);
            }
        }
    }

    fn take_content(&mut self) -> String {
        let text = std::mem::take(&mut self.current_content);
        text.trim().to_string()
    }

    fn start_new_question(&mut self) {
        self.save_current_question();
        self.current_question = Some(QuestionDraft {
            content: String::new(),
            explanation: None,
            options: Vec::new(),
        });
        self.section = Section::QuestionHeading;
    }

    fn save_current_question(&mut self) {
        if self.section == Section::QuestionBody {
            self.flush_paragraph();
        }
        if let Some(question) = self.current_question.take() {
            if !question.content.trim().is_empty() {
                self.questions.push(question);
            }
        }
    }

    fn build_draft(&mut self) -> Result<QuizDraft> {
        let title = self.title.clone();
        let slug = match self.attributes.get("slug") {
            Some(s) if !s.is_empty() => s.clone(),
            _ => slugify(&title),
        };
        let difficulty = match self.attributes.get("difficulty") {
            Some(raw) => raw.parse::<Difficulty>()?,
            None => Difficulty::Easy,
        };
        let xp_reward = self.numeric_attribute("xp", DEFAULT_XP_REWARD)?;
        let time_limit = self.numeric_attribute("time", DEFAULT_TIME_LIMIT)?;

        Ok(QuizDraft {
            title,
            slug,
            description: (!self.description.is_empty()).then(|| self.description.join("\n")),
            category_slug: self.attributes.get("category").cloned().unwrap_or_default(),
            difficulty,
            xp_reward,
            time_limit,
            questions: std::mem::take(&mut self.questions),
        })
    }

    fn numeric_attribute(&self, key: &str, default: u32) -> Result<u32> {
        match self.attributes.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| KuisError::Validation(format!("invalid {} value: {}", key, raw))),
            None => Ok(default),
        }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析单个 Markdown 测验文档
pub fn parse_quiz_markdown(content: &str) -> Result<QuizDraft> {
    MarkdownParser::new().parse(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# Pengenalan Riba

slug: pengenalan-riba
category: dasar-ekonomi-syariah
difficulty: medium
xp: 150
time: 240

Kuis singkat tentang konsep riba.

## Apa arti riba secara bahasa?

- [ ] Jual beli
- [x] Tambahan
- [ ] Sewa

> Riba secara bahasa berarti *tambahan* (ziyadah).

## Manakah yang termasuk akad bagi hasil?

Pilih satu jawaban.

- [x] Mudharabah
- [ ] Qardh
"#;

    #[test]
    fn test_parse_full_document() {
        let draft = parse_quiz_markdown(SAMPLE).unwrap();

        assert_eq!(draft.title, "Pengenalan Riba");
        assert_eq!(draft.slug, "pengenalan-riba");
        assert_eq!(draft.category_slug, "dasar-ekonomi-syariah");
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.xp_reward, 150);
        assert_eq!(draft.time_limit, 240);
        assert_eq!(draft.description.as_deref(), Some("Kuis singkat tentang konsep riba."));
        assert_eq!(draft.questions.len(), 2);

        let first = &draft.questions[0];
        assert_eq!(first.content, "Apa arti riba secara bahasa?");
        assert_eq!(first.options.len(), 3);
        assert!(first.options[1].is_correct);
        assert_eq!(first.options[1].content, "Tambahan");
        assert_eq!(
            first.explanation.as_deref(),
            Some("Riba secara bahasa berarti tambahan (ziyadah).")
        );

        let second = &draft.questions[1];
        assert_eq!(
            second.content,
            "Manakah yang termasuk akad bagi hasil?\nPilih satu jawaban."
        );
        assert_eq!(second.options.len(), 2);
        assert!(second.explanation.is_none());

        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_defaults_and_slug_from_title() {
        let draft = parse_quiz_markdown(
            "# Zakat & Infak 101\n\ncategory: zakat-digital\n\n## Nisab zakat emas?\n\n- [x] 85 gram\n- [ ] 10 gram\n",
        )
        .unwrap();

        assert_eq!(draft.slug, "zakat-infak-101");
        assert_eq!(draft.difficulty, Difficulty::Easy);
        assert_eq!(draft.xp_reward, DEFAULT_XP_REWARD);
        assert_eq!(draft.time_limit, DEFAULT_TIME_LIMIT);
        assert!(draft.description.is_none());
    }

    #[test]
    fn test_unknown_difficulty() {
        let err = parse_quiz_markdown("# Q\n\ndifficulty: extreme\n").unwrap_err();
        assert!(matches!(err, KuisError::UnrecognizedDifficulty(_)));
    }

    #[test]
    fn test_invalid_number() {
        let err = parse_quiz_markdown("# Q\n\ntime: lima menit\n").unwrap_err();
        assert!(matches!(err, KuisError::Validation(_)));
    }

    #[test]
    fn test_question_without_correct_option_fails_validation() {
        let draft = parse_quiz_markdown(
            "# Q\n\ncategory: fintech-syariah\n\n## P2P lending syariah?\n\n- [ ] A\n- [ ] B\n",
        )
        .unwrap();
        assert_eq!(draft.questions[0].options.len(), 2);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_parser_is_reusable() {
        let mut parser = MarkdownParser::new();
        let first = parser.parse(SAMPLE).unwrap();
        let second = parser.parse(SAMPLE).unwrap();
        assert_eq!(first, second);
    }
}
