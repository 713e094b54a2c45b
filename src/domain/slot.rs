// ==========================================
// 课表一致性引擎 - 时间槽模型
// ==========================================
// 职责: (周次, 星期, 节次) 坐标及其比较/邻接规则
// ==========================================

use crate::domain::types::{FIRST_TIME_SLOT, FIRST_WEEKDAY, LAST_TIME_SLOT, LAST_WEEKDAY};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Slot - 时间槽坐标
// ==========================================
// 字段顺序即排序键: week → weekday → time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub week: u32,
    pub weekday: u8,
    pub time: u8,
}

impl Slot {
    pub fn new(week: u32, weekday: u8, time: u8) -> Self {
        Self {
            week,
            weekday,
            time,
        }
    }

    /// 星期与节次是否落在合法范围内
    pub fn is_valid(&self) -> bool {
        self.week >= 1 && is_valid_weekday(self.weekday) && is_valid_time(self.time)
    }

    pub fn same_week(&self, other: &Slot) -> bool {
        self.week == other.week
    }

    /// 相邻星期（±1 天）
    pub fn weekday_adjacent(&self, other: &Slot) -> bool {
        self.weekday.abs_diff(other.weekday) == 1
    }

    /// 相邻节次（±1 节）
    pub fn time_adjacent(&self, other: &Slot) -> bool {
        self.time.abs_diff(other.time) == 1
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}/D{}/T{}", self.week, self.weekday, self.time)
    }
}

pub fn is_valid_weekday(weekday: u8) -> bool {
    (FIRST_WEEKDAY..=LAST_WEEKDAY).contains(&weekday)
}

pub fn is_valid_time(time: u8) -> bool {
    (FIRST_TIME_SLOT..=LAST_TIME_SLOT).contains(&time)
}

/// 统计一天内的"窗口"节数
///
/// 对已占用节次升序排列, 相邻两节间距 > 1 时累计 (间距 - 1)
pub fn count_windows<I>(occupied: I) -> u32
where
    I: IntoIterator<Item = u8>,
{
    let mut times: Vec<u8> = occupied.into_iter().collect();
    times.sort_unstable();
    times.dedup();

    times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > 1)
        .map(|gap| u32::from(gap - 1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ordering_is_week_day_time() {
        let mut slots = vec![
            Slot::new(2, 1, 1),
            Slot::new(1, 3, 2),
            Slot::new(1, 3, 1),
            Slot::new(1, 1, 8),
        ];
        slots.sort();
        assert_eq!(
            slots,
            vec![
                Slot::new(1, 1, 8),
                Slot::new(1, 3, 1),
                Slot::new(1, 3, 2),
                Slot::new(2, 1, 1)
            ]
        );
    }

    #[test]
    fn test_slot_validity() {
        assert!(Slot::new(1, 6, 8).is_valid());
        assert!(!Slot::new(1, 7, 1).is_valid());
        assert!(!Slot::new(1, 1, 0).is_valid());
        assert!(!Slot::new(0, 1, 1).is_valid());
    }

    #[test]
    fn test_adjacency() {
        let a = Slot::new(3, 2, 4);
        assert!(a.time_adjacent(&Slot::new(3, 2, 5)));
        assert!(a.time_adjacent(&Slot::new(5, 1, 3)));
        assert!(!a.time_adjacent(&Slot::new(3, 2, 4)));
        assert!(a.weekday_adjacent(&Slot::new(3, 3, 1)));
        assert!(!a.weekday_adjacent(&Slot::new(3, 4, 1)));
    }

    #[test]
    fn test_count_windows() {
        assert_eq!(count_windows(Vec::<u8>::new()), 0);
        assert_eq!(count_windows(vec![3]), 0);
        assert_eq!(count_windows(vec![1, 2, 3]), 0);
        // 1 _ 3: 一个窗口
        assert_eq!(count_windows(vec![1, 3]), 1);
        // 1 _ _ 4 _ 6: 三个窗口
        assert_eq!(count_windows(vec![6, 1, 4]), 3);
        // 重复节次（小组并行）不影响
        assert_eq!(count_windows(vec![2, 2, 4]), 1);
    }
}
