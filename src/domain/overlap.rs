// ==========================================
// 课表一致性引擎 - 冲突(накладка)模型
// ==========================================
// 职责: 冲突检测的输出结构
// ==========================================

use crate::domain::slot::Slot;
use crate::domain::timetable::{Lesson, RoomName, TeacherName};
use crate::domain::types::ConflictKind;
use serde::{Deserialize, Serialize};

// ==========================================
// LessonOccurrence - 冲突涉及的一节课
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonOccurrence {
    pub group_name: String,
    pub subject: String,
    pub subgroup: u8,
    pub teacher: Option<TeacherName>, // 主讲教师
    pub room: Option<RoomName>,       // 主教室
}

impl LessonOccurrence {
    pub fn of(group_name: &str, lesson: &Lesson) -> Self {
        Self {
            group_name: group_name.to_string(),
            subject: lesson.subject.clone(),
            subgroup: lesson.subgroup,
            teacher: lesson.primary_teacher().cloned(),
            room: lesson.primary_room().cloned(),
        }
    }
}

// ==========================================
// Conflict - 单个资源冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub week: u32,
    pub weekday: u8,
    pub time: u8,
    pub resource_name: String, // 教室名 或 教师名
    pub involved_lessons: Vec<LessonOccurrence>,
}

impl Conflict {
    pub fn slot(&self) -> Slot {
        Slot::new(self.week, self.weekday, self.time)
    }

    /// 是否涉及指定组
    pub fn involves_group(&self, group_name: &str) -> bool {
        self.involved_lessons
            .iter()
            .any(|o| o.group_name == group_name)
    }
}

// ==========================================
// OverlapReport - 冲突检测结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub room_overlaps: Vec<Conflict>,
    pub teacher_overlaps: Vec<Conflict>,
    pub total_count: usize,
}

impl OverlapReport {
    pub fn new(room_overlaps: Vec<Conflict>, teacher_overlaps: Vec<Conflict>) -> Self {
        let total_count = room_overlaps.len() + teacher_overlaps.len();
        Self {
            room_overlaps,
            teacher_overlaps,
            total_count,
        }
    }

    /// 无冲突
    pub fn is_clean(&self) -> bool {
        self.total_count == 0
    }

    /// 全部冲突（教室在前）
    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.room_overlaps.iter().chain(self.teacher_overlaps.iter())
    }
}
