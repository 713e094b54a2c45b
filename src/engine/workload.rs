// ==========================================
// 课表一致性引擎 - 教师工作量统计
// ==========================================
// 职责: 统计某教师在整个快照中的授课情况
// 输出:
// - 按课程: 讲授/习题/实验次数、授课组、学时
// - 合计: 各类型次数与总学时
// - 明细: 按 (周次, 星期, 节次) 升序的授课列表
// 规则: 每节课计 2 学时; 教师按名称精确匹配
// ==========================================

use crate::domain::timetable::{RoomName, Snapshot, TeacherName};
use crate::domain::types::LessonType;
use crate::engine::error::EngineResult;
use crate::engine::validator::validate_snapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 每节课学时
pub const HOURS_PER_LESSON: u32 = 2;

// ==========================================
// 统计结构
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCounts {
    pub lectures: u32,
    pub practices: u32,
    pub labs: u32,
}

impl LessonCounts {
    fn add(&mut self, kind: LessonType) {
        match kind {
            LessonType::Lecture => self.lectures += 1,
            LessonType::Practice => self.practices += 1,
            LessonType::Lab => self.labs += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.lectures + self.practices + self.labs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectWorkload {
    pub subject: String,
    pub counts: LessonCounts,
    pub groups: Vec<String>, // 升序
    pub total_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherLesson {
    pub week: u32,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub weekday: u8,
    pub time: u8,
    pub group_name: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    pub subgroup: u8,
    pub room: Option<RoomName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherWorkload {
    pub teacher: TeacherName,
    pub subjects: Vec<SubjectWorkload>, // 按课程名升序
    pub totals: LessonCounts,
    pub total_hours: u32,
    pub lessons: Vec<TeacherLesson>,
}

#[derive(Default)]
struct SubjectAcc {
    counts: LessonCounts,
    groups: BTreeSet<String>,
}

/// 统计教师工作量
///
/// 教师不在快照中时返回空统计
pub fn teacher_workload(snapshot: &Snapshot, teacher: &TeacherName) -> EngineResult<TeacherWorkload> {
    validate_snapshot(snapshot)?;

    let mut by_subject: BTreeMap<String, SubjectAcc> = BTreeMap::new();
    let mut totals = LessonCounts::default();
    let mut lessons = Vec::new();

    for week in &snapshot.weeks {
        for group in &week.groups {
            for day in &group.days {
                for lesson in day
                    .lessons
                    .iter()
                    .filter(|l| l.teachers.iter().any(|t| &t.name == teacher))
                {
                    let acc = by_subject.entry(lesson.subject.clone()).or_default();
                    acc.counts.add(lesson.kind);
                    acc.groups.insert(group.group_name.clone());
                    totals.add(lesson.kind);

                    lessons.push(TeacherLesson {
                        week: week.week_number,
                        date_start: week.date_start,
                        date_end: week.date_end,
                        weekday: day.weekday,
                        time: lesson.time,
                        group_name: group.group_name.clone(),
                        subject: lesson.subject.clone(),
                        kind: lesson.kind,
                        subgroup: lesson.subgroup,
                        room: lesson.primary_room().cloned(),
                    });
                }
            }
        }
    }

    lessons.sort_by(|a, b| {
        (a.week, a.weekday, a.time, &a.group_name).cmp(&(b.week, b.weekday, b.time, &b.group_name))
    });

    let subjects: Vec<SubjectWorkload> = by_subject
        .into_iter()
        .map(|(subject, acc)| SubjectWorkload {
            subject,
            total_hours: acc.counts.total() * HOURS_PER_LESSON,
            counts: acc.counts,
            groups: acc.groups.into_iter().collect(),
        })
        .collect();

    let total_hours = subjects.iter().map(|s| s.total_hours).sum();
    tracing::debug!(%teacher, lessons = lessons.len(), total_hours, "教师工作量统计完成");

    Ok(TeacherWorkload {
        teacher: teacher.clone(),
        subjects,
        totals,
        total_hours,
        lessons,
    })
}
