//! 等级表与等级计算

use serde::Serialize;

/// 等级定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Level {
    pub level: u32,
    pub min_xp: u32,
    pub title: &'static str,
    pub title_en: &'static str,
}

/// 全部等级，按 min_xp 严格递增
pub static LEVELS: &[Level] = &[
    Level {
        level: 1,
        min_xp: 0,
        title: "Pemula",
        title_en: "Beginner",
    },
    Level {
        level: 2,
        min_xp: 100,
        title: "Pelajar",
        title_en: "Learner",
    },
    Level {
        level: 3,
        min_xp: 300,
        title: "Pengamat",
        title_en: "Observer",
    },
    Level {
        level: 4,
        min_xp: 600,
        title: "Praktisi",
        title_en: "Practitioner",
    },
    Level {
        level: 5,
        min_xp: 1000,
        title: "Ahli",
        title_en: "Expert",
    },
    Level {
        level: 6,
        min_xp: 1500,
        title: "Pakar",
        title_en: "Specialist",
    },
    Level {
        level: 7,
        min_xp: 2100,
        title: "Master",
        title_en: "Master",
    },
    Level {
        level: 8,
        min_xp: 2800,
        title: "Guru",
        title_en: "Guru",
    },
    Level {
        level: 9,
        min_xp: 3600,
        title: "Cendekiawan",
        title_en: "Scholar",
    },
    Level {
        level: 10,
        min_xp: 4500,
        title: "Pakar Keuangan",
        title_en: "Financial Expert",
    },
];

pub const MAX_LEVEL: u32 = 10;

/// 当前经验值对应的等级
pub fn level_from_xp(total_xp: u32) -> &'static Level {
    let mut current = &LEVELS[0];
    for level in LEVELS {
        if total_xp >= level.min_xp {
            current = level;
        } else {
            break;
        }
    }
    current
}

/// 等级内进度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub current_level: &'static Level,
    /// 满级时为 None
    pub next_level: Option<&'static Level>,
    pub xp_into_level: u32,
    /// 满级时为 0
    pub xp_span_of_level: u32,
    /// 0..=100
    pub percent: f64,
}

impl LevelProgress {
    pub fn is_max_level(&self) -> bool {
        self.next_level.is_none()
    }
}

/// 计算距下一级的进度
pub fn level_progress(total_xp: u32) -> LevelProgress {
    let current_level = level_from_xp(total_xp);
    let next_level = LEVELS.iter().find(|l| l.level == current_level.level + 1);
    let xp_into_level = total_xp.saturating_sub(current_level.min_xp);

    match next_level {
        Some(next) => {
            let xp_span_of_level = next.min_xp - current_level.min_xp;
            let percent = (f64::from(xp_into_level) / f64::from(xp_span_of_level) * 100.0).min(100.0);
            LevelProgress {
                current_level,
                next_level,
                xp_into_level,
                xp_span_of_level,
                percent,
            }
        }
        None => LevelProgress {
            current_level,
            next_level: None,
            xp_into_level,
            xp_span_of_level: 0,
            percent: 100.0,
        },
    }
}

/// 若经验增长跨越了等级，返回新等级
pub fn check_level_up(prev_xp: u32, new_xp: u32) -> Option<&'static Level> {
    let prev = level_from_xp(prev_xp);
    let next = level_from_xp(new_xp);
    (next.level > prev.level).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_table_is_well_formed() {
        assert_eq!(LEVELS.len() as u32, MAX_LEVEL);
        assert_eq!(LEVELS[0].level, 1);
        assert_eq!(LEVELS[0].min_xp, 0);
        for pair in LEVELS.windows(2) {
            assert!(pair[0].min_xp < pair[1].min_xp);
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
    }

    #[test]
    fn test_level_from_xp() {
        assert_eq!(level_from_xp(0).level, 1);
        assert_eq!(level_from_xp(99).level, 1);
        assert_eq!(level_from_xp(100).level, 2);
        assert_eq!(level_from_xp(299).level, 2);
        assert_eq!(level_from_xp(300).level, 3);
        assert_eq!(level_from_xp(4499).level, 9);
        assert_eq!(level_from_xp(4500).level, 10);
        assert_eq!(level_from_xp(1_000_000).level, 10);
        assert_eq!(level_from_xp(4500).title, "Pakar Keuangan");
    }

    #[test]
    fn test_level_from_xp_is_monotonic() {
        let mut last = 0;
        for xp in 0..6000 {
            let level = level_from_xp(xp).level;
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn test_level_progress() {
        let progress = level_progress(150);
        assert_eq!(progress.current_level.level, 2);
        assert_eq!(progress.next_level.map(|l| l.level), Some(3));
        assert_eq!(progress.xp_into_level, 50);
        assert_eq!(progress.xp_span_of_level, 200);
        assert_eq!(progress.percent, 25.0);
        assert!(!progress.is_max_level());
    }

    #[test]
    fn test_level_progress_zero() {
        let progress = level_progress(0);
        assert_eq!(progress.current_level.level, 1);
        assert_eq!(progress.xp_into_level, 0);
        assert_eq!(progress.xp_span_of_level, 100);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn test_level_progress_max() {
        let progress = level_progress(5000);
        assert_eq!(progress.current_level.level, 10);
        assert!(progress.next_level.is_none());
        assert_eq!(progress.xp_into_level, 500);
        assert_eq!(progress.xp_span_of_level, 0);
        assert_eq!(progress.percent, 100.0);
        assert!(progress.is_max_level());
    }

    #[test]
    fn test_check_level_up() {
        let level = check_level_up(90, 100).expect("should level up");
        assert_eq!(level.level, 2);
        assert_eq!(level.title, "Pelajar");

        assert!(check_level_up(100, 150).is_none());
        assert!(check_level_up(0, 0).is_none());
    }

    #[test]
    fn test_check_level_up_skips_levels() {
        let level = check_level_up(50, 700).unwrap();
        assert_eq!(level.level, 4);
    }
}
