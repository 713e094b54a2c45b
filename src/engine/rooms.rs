// ==========================================
// 课表一致性引擎 - 空闲教室查询
// ==========================================
// 职责: 查询某时间槽未被占用的教室, 按楼栋筛选
// 规则:
// - 候选教室: 快照任意位置出现过的教室
// - 楼栋: 教室名分隔符之前的数字前缀（"1.305" → "1"）
// - Other: 前缀非数字的教室（如 "Спортзал", "А.12"）
// ==========================================

use crate::config::EngineConfig;
use crate::domain::slot::Slot;
use crate::domain::timetable::{RoomName, Snapshot};
use crate::engine::error::EngineResult;
use crate::engine::overlap::{check_slot_range, OverlapDetector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ==========================================
// BuildingFilter - 楼栋筛选
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingFilter {
    #[default]
    All,
    Building(String),
    Other,
}

impl FromStr for BuildingFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "all" => BuildingFilter::All,
            "other" => BuildingFilter::Other,
            building => BuildingFilter::Building(building.to_string()),
        })
    }
}

impl fmt::Display for BuildingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildingFilter::All => write!(f, "all"),
            BuildingFilter::Building(b) => write!(f, "{}", b),
            BuildingFilter::Other => write!(f, "other"),
        }
    }
}

// ==========================================
// RoomFinder
// ==========================================
pub struct RoomFinder {
    detector: OverlapDetector,
    separator: char,
}

impl RoomFinder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            // 空闲查询按实际占用计算, 不排除共享场地
            detector: OverlapDetector::new(),
            separator: config.building_separator,
        }
    }

    /// 查询空闲教室（升序）
    ///
    /// 周次不存在时视为全部空闲
    pub fn find_free_rooms(
        &self,
        snapshot: &Snapshot,
        week: u32,
        weekday: u8,
        time: u8,
        filter: &BuildingFilter,
    ) -> EngineResult<Vec<RoomName>> {
        check_slot_range(week, weekday, time)?;
        let occupancy = self.detector.occupancy(snapshot)?;

        let rooms: Vec<RoomName> = occupancy
            .free_rooms(&Slot::new(week, weekday, time))
            .filter(|room| self.matches(room, filter))
            .cloned()
            .collect();

        tracing::debug!(week, weekday, time, %filter, free = rooms.len(), "空闲教室查询完成");
        Ok(rooms)
    }

    /// 快照中出现过的数字楼栋（按数值升序）
    pub fn list_buildings(&self, snapshot: &Snapshot) -> Vec<String> {
        let numbers: BTreeSet<u64> = snapshot
            .all_rooms()
            .iter()
            .filter_map(|room| self.numeric_building(room))
            .filter_map(|b| b.parse().ok())
            .collect();
        numbers.into_iter().map(|n| n.to_string()).collect()
    }

    fn matches(&self, room: &RoomName, filter: &BuildingFilter) -> bool {
        match filter {
            BuildingFilter::All => true,
            BuildingFilter::Building(b) => room.building(self.separator) == Some(b.as_str()),
            BuildingFilter::Other => self.numeric_building(room).is_none(),
        }
    }

    fn numeric_building<'r>(&self, room: &'r RoomName) -> Option<&'r str> {
        room.building(self.separator)
            .filter(|b| !b.is_empty() && b.chars().all(|c| c.is_ascii_digit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Day, Group, Lesson, Week};
    use crate::domain::types::LessonType;
    use chrono::NaiveDate;

    fn snapshot() -> Snapshot {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let lesson = |time, room: &str| Lesson::new(time, "Math", LessonType::Lecture).with_room(room);
        Snapshot::new(vec![Week::new(1, start, start + chrono::Duration::days(5))
            .with_group(Group::new("A").with_day(Day {
                weekday: 1,
                lessons: vec![lesson(1, "1.305"), lesson(2, "10.101"), lesson(2, "Спортзал")],
            }))
            .with_group(Group::new("B").with_day(Day {
                weekday: 1,
                lessons: vec![lesson(1, "2.110"), lesson(3, "1.204"), lesson(4, "А.12")],
            }))])
    }

    fn finder() -> RoomFinder {
        RoomFinder::new(&EngineConfig::default())
    }

    fn names(rooms: &[RoomName]) -> Vec<&str> {
        rooms.iter().map(|r| r.as_str()).collect()
    }

    #[test]
    fn test_free_rooms_exclude_busy_slot() {
        let rooms = finder()
            .find_free_rooms(&snapshot(), 1, 1, 1, &BuildingFilter::All)
            .unwrap();
        assert_eq!(names(&rooms), vec!["1.204", "10.101", "А.12", "Спортзал"]);
    }

    #[test]
    fn test_building_filters() {
        let snap = snapshot();
        let rooms = finder()
            .find_free_rooms(&snap, 1, 1, 2, &"1".parse().unwrap())
            .unwrap();
        // "10.101" 不属于 1 号楼
        assert_eq!(names(&rooms), vec!["1.204", "1.305"]);

        let rooms = finder()
            .find_free_rooms(&snap, 1, 1, 4, &BuildingFilter::Other)
            .unwrap();
        assert_eq!(names(&rooms), vec!["Спортзал"]);
    }

    #[test]
    fn test_unknown_week_is_all_free() {
        let rooms = finder()
            .find_free_rooms(&snapshot(), 9, 3, 3, &BuildingFilter::All)
            .unwrap();
        assert_eq!(rooms.len(), 6);
    }

    #[test]
    fn test_out_of_range_slot_rejected() {
        let err = finder()
            .find_free_rooms(&snapshot(), 1, 7, 1, &BuildingFilter::All)
            .unwrap_err();
        assert!(err.validation_issues().is_some());
    }

    #[test]
    fn test_list_buildings_numeric_order() {
        assert_eq!(finder().list_buildings(&snapshot()), vec!["1", "2", "10"]);
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("all".parse::<BuildingFilter>().unwrap(), BuildingFilter::All);
        assert_eq!("other".parse::<BuildingFilter>().unwrap(), BuildingFilter::Other);
        assert_eq!(
            "3".parse::<BuildingFilter>().unwrap(),
            BuildingFilter::Building("3".to_string())
        );
    }
}
