// ==========================================
// 课表一致性引擎 - 引擎参数
// ==========================================
// 职责: 调课评分权重、候选上限、楼栋分隔符、共享场地、语言
// 默认值: 与课表调度约定的常量一致
// ==========================================

use crate::domain::timetable::RoomName;
use serde::{Deserialize, Serialize};

// ==========================================
// TransferWeights - 调课评分权重
// ==========================================
// 加分项为正, 罚分项为负
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferWeights {
    pub same_week: i32,        // 同一周
    pub same_weekday: i32,     // 同一星期
    pub adjacent_weekday: i32, // 相邻星期
    pub adjacent_time: i32,    // 相邻节次
    pub room_substitute: i32,  // 找到同楼栋替代教室
    pub room_busy: i32,        // 教室被占且无替代
    pub teacher_busy: i32,     // 教师被占
    pub window: i32,           // 每个窗口节次
}

impl Default for TransferWeights {
    fn default() -> Self {
        Self {
            same_week: 20,
            same_weekday: 15,
            adjacent_weekday: 10,
            adjacent_time: 10,
            room_substitute: 5,
            room_busy: -20,
            teacher_busy: -30,
            window: -5,
        }
    }
}

// ==========================================
// EngineConfig - 引擎参数集合
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: TransferWeights,
    pub max_options: usize,
    pub building_separator: char,
    pub ignored_rooms: Vec<RoomName>,
    pub locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: TransferWeights::default(),
            max_options: 5,
            building_separator: '.',
            ignored_rooms: Vec::new(),
            locale: "ru".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_ignored_rooms<I>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = RoomName>,
    {
        self.ignored_rooms.extend(rooms);
        self
    }
}
