use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

const APP_DIR: &str = "kuis";

/// 应用数据目录，取不到平台目录时退回当前目录下的 data/
pub fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub fn get_database_path() -> PathBuf {
    get_app_data_dir().join("kuis.db")
}

pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

fn non_alnum() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"))
}

/// 标题转 URL slug，例如 "Riba & Gharar 101" -> "riba-gharar-101"
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    non_alnum()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}
