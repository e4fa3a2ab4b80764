//! kuis: 游戏化测验引擎
//!
//! 题库导入、答题计分、经验与等级、连续打卡与成就。

pub mod commands;
pub mod config;
pub mod error;
pub mod gamification;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{KuisError, Result};
