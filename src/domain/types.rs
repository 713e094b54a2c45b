// ==========================================
// 课表一致性引擎 - 领域类型定义
// ==========================================
// 依据: 课表数据模型 - 周/日/节次编码
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 节次与星期范围
// ==========================================
// 星期: 1..=6 (周一~周六), 节次: 1..=8
pub const FIRST_WEEKDAY: u8 = 1;
pub const LAST_WEEKDAY: u8 = 6;
pub const FIRST_TIME_SLOT: u8 = 1;
pub const LAST_TIME_SLOT: u8 = 8;

/// 全部教学日 (周一~周六)
pub fn weekdays() -> std::ops::RangeInclusive<u8> {
    FIRST_WEEKDAY..=LAST_WEEKDAY
}

/// 全部节次 (1~8)
pub fn time_slots() -> std::ops::RangeInclusive<u8> {
    FIRST_TIME_SLOT..=LAST_TIME_SLOT
}

// ==========================================
// 课程类型 (Lesson Type)
// ==========================================
// 序列化格式: 与上游课表文件一致 ("л." / "пр." / "лаб.")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonType {
    #[serde(rename = "л.", alias = "lecture")]
    Lecture, // 讲授
    #[serde(rename = "пр.", alias = "practice")]
    Practice, // 习题课
    #[serde(rename = "лаб.", alias = "lab")]
    Lab, // 实验课
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonType::Lecture => write!(f, "л."),
            LessonType::Practice => write!(f, "пр."),
            LessonType::Lab => write!(f, "лаб."),
        }
    }
}

// ==========================================
// 冲突类型 (Conflict Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Room,    // 教室占用冲突
    Teacher, // 教师占用冲突
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Room => write!(f, "room"),
            ConflictKind::Teacher => write!(f, "teacher"),
        }
    }
}

// ==========================================
// 冲突处理决策 (Resolution)
// ==========================================
// 针对"周次已存在"冲突的人工决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Skip,    // 丢弃上传数据, 保留现有
    Replace, // 丢弃现有数据, 保留上传
    Merge,   // 现有 + 上传 合并
}

impl Default for Resolution {
    // 未在决策表中出现的冲突周: 保留现有数据
    fn default() -> Self {
        Resolution::Skip
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Skip => write!(f, "skip"),
            Resolution::Replace => write!(f, "replace"),
            Resolution::Merge => write!(f, "merge"),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Resolution::Skip),
            "replace" => Ok(Resolution::Replace),
            "merge" => Ok(Resolution::Merge),
            other => Err(format!("未知的冲突处理方式: {}", other)),
        }
    }
}

// ==========================================
// 变更类型 (Change Type)
// ==========================================
// 用于课表修改历史
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create, // 新增课程
    Update, // 修改课程
    Delete, // 删除课程
    Upload, // 文件上传合并
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Create => write!(f, "create"),
            ChangeType::Update => write!(f, "update"),
            ChangeType::Delete => write!(f, "delete"),
            ChangeType::Upload => write!(f, "upload"),
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            "delete" => Ok(ChangeType::Delete),
            "upload" => Ok(ChangeType::Upload),
            other => Err(format!("未知的变更类型: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_type_wire_names() {
        let json = serde_json::to_string(&LessonType::Lab).unwrap();
        assert_eq!(json, "\"лаб.\"");

        let parsed: LessonType = serde_json::from_str("\"пр.\"").unwrap();
        assert_eq!(parsed, LessonType::Practice);

        // 英文别名
        let parsed: LessonType = serde_json::from_str("\"lecture\"").unwrap();
        assert_eq!(parsed, LessonType::Lecture);
    }

    #[test]
    fn test_resolution_default_is_skip() {
        assert_eq!(Resolution::default(), Resolution::Skip);
        assert_eq!("MERGE".parse::<Resolution>().unwrap(), Resolution::Merge);
        assert!("keep".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_ranges() {
        assert_eq!(weekdays().count(), 6);
        assert_eq!(time_slots().count(), 8);
    }
}
