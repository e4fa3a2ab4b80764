// 服务模块
// 存储、答题结算、题库导入与默认数据

pub mod database;
pub mod importer;
pub mod parser;
pub mod quiz;
pub mod seed;

pub use database::{DatabaseService, GradedAttempt};
pub use importer::{ImportReport, Importer, QuizData};
pub use parser::{parse_quiz_markdown, MarkdownParser};
pub use quiz::{grade_answers, Grade, QuizService, UserProfile};
pub use seed::seed_defaults;
