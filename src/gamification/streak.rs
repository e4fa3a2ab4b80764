//! 连续打卡
//! 只按自然日比较，今天的日期由调用方传入

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 连续打卡状态，longest_streak >= current_streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: NaiveDate,
}

impl StreakState {
    /// 在 today 看来打卡是否仍然有效（今天或昨天有活动）
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        let days_since = (today - self.last_active_date).num_days();
        (0..=1).contains(&days_since)
    }
}

/// 根据上次状态推进到 today
pub fn advance_streak(prev: Option<&StreakState>, today: NaiveDate) -> StreakState {
    let Some(prev) = prev else {
        return StreakState {
            current_streak: 1,
            longest_streak: 1,
            last_active_date: today,
        };
    };

    if prev.last_active_date == today {
        return *prev;
    }

    let current_streak = if today.pred_opt() == Some(prev.last_active_date) {
        prev.current_streak + 1
    } else {
        // 中断（包括上次日期在今天之后）
        1
    };

    StreakState {
        current_streak,
        longest_streak: prev.longest_streak.max(current_streak),
        last_active_date: today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_activity() {
        let today = day(2024, 3, 10);
        let state = advance_streak(None, today);
        assert_eq!(
            state,
            StreakState {
                current_streak: 1,
                longest_streak: 1,
                last_active_date: today,
            }
        );
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let today = day(2024, 3, 10);
        let prev = StreakState {
            current_streak: 4,
            longest_streak: 8,
            last_active_date: today,
        };
        assert_eq!(advance_streak(Some(&prev), today), prev);
    }

    #[test]
    fn test_consecutive_day_extends() {
        let today = day(2024, 3, 10);
        let prev = StreakState {
            current_streak: 5,
            longest_streak: 5,
            last_active_date: day(2024, 3, 9),
        };
        let state = advance_streak(Some(&prev), today);
        assert_eq!(state.current_streak, 6);
        assert_eq!(state.longest_streak, 6);
        assert_eq!(state.last_active_date, today);
    }

    #[test]
    fn test_extend_across_month_boundary() {
        let prev = StreakState {
            current_streak: 2,
            longest_streak: 9,
            last_active_date: day(2024, 2, 29),
        };
        let state = advance_streak(Some(&prev), day(2024, 3, 1));
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.longest_streak, 9);
    }

    #[test]
    fn test_gap_resets_current_keeps_longest() {
        let today = day(2024, 3, 10);
        let prev = StreakState {
            current_streak: 5,
            longest_streak: 9,
            last_active_date: day(2024, 3, 7),
        };
        let state = advance_streak(Some(&prev), today);
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 9);
        assert_eq!(state.last_active_date, today);
    }

    #[test]
    fn test_gap_from_zero_longest() {
        let prev = StreakState {
            current_streak: 0,
            longest_streak: 0,
            last_active_date: day(2024, 1, 1),
        };
        let state = advance_streak(Some(&prev), day(2024, 3, 10));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 1);
    }

    #[test]
    fn test_future_last_active_resets() {
        let prev = StreakState {
            current_streak: 3,
            longest_streak: 3,
            last_active_date: day(2024, 3, 12),
        };
        let state = advance_streak(Some(&prev), day(2024, 3, 10));
        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 3);
    }

    #[test]
    fn test_is_active_on() {
        let state = StreakState {
            current_streak: 3,
            longest_streak: 3,
            last_active_date: day(2024, 3, 9),
        };
        assert!(state.is_active_on(day(2024, 3, 9)));
        assert!(state.is_active_on(day(2024, 3, 10)));
        assert!(!state.is_active_on(day(2024, 3, 11)));
    }
}
