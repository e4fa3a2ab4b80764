// 默认数据
// 分类与成就定义，重复执行不会产生重复记录

use log::info;

use crate::error::Result;
use crate::gamification::AchievementType;
use crate::models::{Difficulty, NewAchievement, NewCategory, OptionDraft, QuestionDraft, QuizDraft};
use crate::services::database::DatabaseService;

/// (slug, 名称, 描述, 图标, 颜色)
const DEFAULT_CATEGORIES: [(&str, &str, &str, &str, &str); 6] = [
    (
        "dasar-ekonomi-syariah",
        "Dasar Ekonomi Syariah",
        "Pelajari prinsip dasar ekonomi Islam: halal/haram, riba, gharar, dan maysir",
        "📖",
        "#10b981",
    ),
    (
        "perbankan-syariah",
        "Perbankan Syariah",
        "Memahami akad-akad dalam perbankan syariah: mudharabah, murabahah, musyarakah, wadi'ah",
        "🏦",
        "#3b82f6",
    ),
    (
        "fintech-syariah",
        "Fintech Syariah",
        "P2P lending syariah, crowdfunding, dan payment gateway berbasis syariah",
        "📱",
        "#8b5cf6",
    ),
    (
        "investasi-halal",
        "Investasi Halal",
        "Saham syariah, sukuk, reksadana syariah, dan instrumen investasi halal lainnya",
        "📈",
        "#f59e0b",
    ),
    (
        "asuransi-syariah",
        "Asuransi Syariah",
        "Takaful, hibah, dan konsep asuransi berbasis syariah",
        "🛡️",
        "#ef4444",
    ),
    (
        "zakat-digital",
        "Zakat Digital",
        "Perhitungan zakat, platform digital, infaq dan sedekah online",
        "💰",
        "#06b6d4",
    ),
];

/// (名称, 描述, 图标, 徽章颜色, 类型, 阈值)
const DEFAULT_ACHIEVEMENTS: [(&str, &str, &str, &str, AchievementType, u32); 8] = [
    (
        "Langkah Pertama",
        "Selesaikan quiz pertama Anda",
        "🎯",
        "#10b981",
        AchievementType::QuizComplete,
        1,
    ),
    (
        "Pembelajar Aktif",
        "Selesaikan 10 quiz",
        "📚",
        "#3b82f6",
        AchievementType::QuizComplete,
        10,
    ),
    (
        "Ahli Quiz",
        "Selesaikan 50 quiz",
        "🏆",
        "#f59e0b",
        AchievementType::QuizComplete,
        50,
    ),
    (
        "Sempurna!",
        "Dapatkan skor 100% pada quiz",
        "⭐",
        "#fbbf24",
        AchievementType::PerfectScore,
        1,
    ),
    (
        "Konsisten",
        "Belajar 7 hari berturut-turut",
        "🔥",
        "#ef4444",
        AchievementType::Streak,
        7,
    ),
    (
        "Dedikasi",
        "Belajar 30 hari berturut-turut",
        "💪",
        "#8b5cf6",
        AchievementType::Streak,
        30,
    ),
    (
        "Rising Star",
        "Kumpulkan 1000 XP",
        "🌟",
        "#06b6d4",
        AchievementType::XpMilestone,
        1000,
    ),
    (
        "Knowledge Seeker",
        "Kumpulkan 5000 XP",
        "🎓",
        "#ec4899",
        AchievementType::XpMilestone,
        5000,
    ),
];

pub const SAMPLE_QUIZ_SLUG: &str = "pengenalan-ekonomi-syariah";

/// (题干, 解析, 选项, 正确选项下标)
const SAMPLE_QUESTIONS: [(&str, &str, [&str; 4], usize); 5] = [
    (
        "Apa yang dimaksud dengan 'riba' dalam ekonomi Islam?",
        "Riba adalah tambahan atau kelebihan yang diambil dari transaksi utang-piutang atau jual beli secara batil. Islam melarang riba karena dianggap tidak adil dan eksploitatif.",
        [
            "Keuntungan dari perdagangan yang halal",
            "Tambahan yang diambil dari pinjaman secara batil",
            "Pembagian hasil usaha antara dua pihak",
            "Biaya administrasi bank",
        ],
        1,
    ),
    (
        "Apa perbedaan utama antara bank syariah dan bank konvensional?",
        "Bank syariah tidak menggunakan sistem bunga (riba) melainkan menggunakan sistem bagi hasil (profit sharing) yang sesuai dengan prinsip syariah.",
        [
            "Bank syariah tidak memberikan pinjaman",
            "Bank syariah menggunakan sistem bagi hasil, bukan bunga",
            "Bank syariah hanya untuk muslim",
            "Bank syariah tidak memiliki ATM",
        ],
        1,
    ),
    (
        "Apa yang dimaksud dengan 'gharar' dalam transaksi syariah?",
        "Gharar adalah ketidakjelasan atau ketidakpastian dalam suatu transaksi. Islam melarang transaksi yang mengandung gharar karena dapat merugikan salah satu pihak.",
        [
            "Keuntungan yang berlebihan",
            "Ketidakjelasan atau ketidakpastian",
            "Pemberian hadiah",
            "Simpanan yang aman",
        ],
        1,
    ),
    (
        "Akad mudharabah adalah bentuk kerjasama antara...",
        "Mudharabah adalah kerjasama antara pemilik modal (shahibul maal) dan pengelola dana (mudharib) dengan pembagian keuntungan sesuai kesepakatan.",
        [
            "Penjual dan pembeli",
            "Pemilik modal dan pengelola dana",
            "Bank dan nasabah",
            "Pegawai dan perusahaan",
        ],
        1,
    ),
    (
        "Prinsip dasar ekonomi syariah yang melarang judi disebut...",
        "Maysir adalah segala bentuk perjudian atau spekulasi yang mengandung unsur untung-untungan. Islam melarang maysir karena dapat menyebabkan kerugian dan ketidakadilan.",
        ["Riba", "Gharar", "Maysir", "Tadlis"],
        2,
    ),
];

/// 示例测验，属于第一个默认分类
pub fn sample_quiz() -> QuizDraft {
    QuizDraft {
        title: "Pengenalan Ekonomi Syariah".to_string(),
        slug: SAMPLE_QUIZ_SLUG.to_string(),
        description: Some(
            "Quiz dasar untuk memahami konsep-konsep fundamental dalam ekonomi syariah".to_string(),
        ),
        category_slug: DEFAULT_CATEGORIES[0].0.to_string(),
        difficulty: Difficulty::Easy,
        xp_reward: 100,
        time_limit: 300,
        questions: SAMPLE_QUESTIONS
            .iter()
            .map(|(content, explanation, options, correct)| QuestionDraft {
                content: content.to_string(),
                explanation: Some(explanation.to_string()),
                options: options
                    .iter()
                    .enumerate()
                    .map(|(idx, option)| OptionDraft {
                        content: option.to_string(),
                        is_correct: idx == *correct,
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn default_categories() -> Vec<NewCategory> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(slug, name, description, icon, color)| NewCategory {
            name: name.to_string(),
            slug: slug.to_string(),
            description: Some(description.to_string()),
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
        })
        .collect()
}

pub fn default_achievements() -> Vec<NewAchievement> {
    DEFAULT_ACHIEVEMENTS
        .iter()
        .map(
            |(name, description, icon, badge_color, achievement_type, threshold)| NewAchievement {
                name: name.to_string(),
                description: description.to_string(),
                icon: icon.to_string(),
                badge_color: badge_color.to_string(),
                achievement_type: *achievement_type,
                threshold: *threshold,
            },
        )
        .collect()
}

/// 写入默认分类、成就与示例测验，已存在的示例测验保持不变
pub fn seed_defaults(db: &DatabaseService) -> Result<()> {
    let categories = default_categories();
    let mut first_category_id = None;
    for category in &categories {
        let id = db.ensure_category(category)?;
        first_category_id.get_or_insert(id);
    }

    if let Some(category_id) = first_category_id {
        if db.find_quiz_by_slug(SAMPLE_QUIZ_SLUG)?.is_none() {
            db.save_quiz(&sample_quiz(), category_id)?;
        }
    }

    let achievements = default_achievements();
    for achievement in &achievements {
        db.ensure_achievement(achievement)?;
    }

    info!(
        "seeded {} categories and {} achievements",
        categories.len(),
        achievements.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let db = DatabaseService::open_in_memory().unwrap();
        seed_defaults(&db).unwrap();
        seed_defaults(&db).unwrap();

        let categories = db.list_categories().unwrap();
        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0].category.slug, "dasar-ekonomi-syariah");

        let achievements = db.list_achievements().unwrap();
        assert_eq!(achievements.len(), 8);

        let stats = db.content_stats().unwrap();
        assert_eq!(stats.quizzes, 1);
        assert_eq!(stats.questions, 5);
        assert_eq!(stats.options, 20);
    }

    #[test]
    fn test_sample_quiz_is_valid() {
        let quiz = sample_quiz();
        assert!(quiz.validate().is_ok());
        assert!(quiz.questions[4].options[2].is_correct);
        assert_eq!(quiz.questions[4].options[2].content, "Maysir");
    }

    #[test]
    fn test_default_achievements_have_positive_thresholds() {
        assert!(default_achievements().iter().all(|a| a.threshold > 0));
        let streaks: Vec<u32> = default_achievements()
            .iter()
            .filter(|a| a.achievement_type == AchievementType::Streak)
            .map(|a| a.threshold)
            .collect();
        assert_eq!(streaks, vec![7, 30]);
    }
}
