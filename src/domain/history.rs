// ==========================================
// 课表一致性引擎 - 修改历史领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（谁在何时修改了哪个时间槽）
// ==========================================

use crate::domain::timetable::Lesson;
use crate::domain::types::ChangeType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// LessonSummary - 课程摘要
// ==========================================
// 历史记录中只保留可读字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub teachers: Vec<String>,
    pub auditories: Vec<String>,
    pub subgroup: u8,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        Self {
            subject: lesson.subject.clone(),
            kind: lesson.kind.to_string(),
            teachers: lesson.teachers.iter().map(|t| t.name.to_string()).collect(),
            auditories: lesson.auditories.iter().map(|r| r.name.to_string()).collect(),
            subgroup: lesson.subgroup,
        }
    }
}

// ==========================================
// ChangeRecord - 修改记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub record_id: String,          // 记录ID (UUID)
    pub recorded_at: NaiveDateTime, // 记录时间
    pub change_type: ChangeType,
    pub editor: Option<String>,     // 操作人 / 来源地址

    // ===== 定位 =====
    pub group_name: Option<String>,
    pub week: Option<u32>,
    pub weekday: Option<u8>,
    pub time: Option<u8>,

    // ===== 变更内容 =====
    pub old_lessons: Vec<LessonSummary>,
    pub new_lessons: Vec<LessonSummary>,
    pub detail: Option<String>,
}

impl ChangeRecord {
    /// 时间槽编辑记录
    pub fn slot_edit(
        change_type: ChangeType,
        group_name: &str,
        week: u32,
        weekday: u8,
        time: u8,
        old_lessons: &[Lesson],
        new_lessons: &[Lesson],
    ) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: chrono::Local::now().naive_local(),
            change_type,
            editor: None,
            group_name: Some(group_name.to_string()),
            week: Some(week),
            weekday: Some(weekday),
            time: Some(time),
            old_lessons: old_lessons.iter().map(LessonSummary::from).collect(),
            new_lessons: new_lessons.iter().map(LessonSummary::from).collect(),
            detail: None,
        }
    }

    /// 上传合并记录
    pub fn upload(detail: impl Into<String>) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: chrono::Local::now().naive_local(),
            change_type: ChangeType::Upload,
            editor: None,
            group_name: None,
            week: None,
            weekday: None,
            time: None,
            old_lessons: Vec::new(),
            new_lessons: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    pub fn with_editor(mut self, editor: Option<String>) -> Self {
        self.editor = editor;
        self
    }
}
