//! 错误类型
//! 库内统一使用 `KuisError`，命令行层再包装为 anyhow

use thiserror::Error;

/// 库错误
#[derive(Debug, Error)]
pub enum KuisError {
    #[error("unrecognized difficulty: {0}")]
    UnrecognizedDifficulty(String),

    #[error("unrecognized achievement type: {0}")]
    UnrecognizedAchievementType(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl KuisError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KuisError>;
