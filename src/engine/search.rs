// ==========================================
// 课表一致性引擎 - 课表查询
// ==========================================
// 职责: 快照上的只读查询
// - 按 组/课程/类型 检索课程, 附上课日期
// - 教师/教室 单周课表投影
// - 下拉列表用的去重取值
// 规则: 名称精确匹配; 空条件视为不过滤
// ==========================================

use crate::domain::timetable::{Lesson, RoomName, Snapshot, TeacherName, Week};
use crate::domain::types::LessonType;
use crate::engine::error::EngineResult;
use crate::engine::validator::validate_snapshot;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 全部课程类型（固定顺序）
pub const LESSON_TYPES: [LessonType; 3] = [LessonType::Lecture, LessonType::Practice, LessonType::Lab];

// ==========================================
// 检索
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, rename = "lesson_type")]
    pub kind: Option<LessonType>,
}

impl SearchQuery {
    fn matches_group(&self, group_name: &str) -> bool {
        active(&self.group).map_or(true, |g| g == group_name)
    }

    fn matches_lesson(&self, lesson: &Lesson) -> bool {
        active(&self.subject).map_or(true, |s| s == lesson.subject)
            && self.kind.map_or(true, |k| k == lesson.kind)
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub date: NaiveDate, // 周起始日 + (星期 - 1)
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
    pub teachers: Vec<TeacherName>,
    pub auditories: Vec<RoomName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    /// 快照覆盖的日期范围（与检索条件无关）
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// 按条件检索课程
///
/// 结果按 (日期, 节次, 组, 小组) 升序
pub fn search_timetable(snapshot: &Snapshot, query: &SearchQuery) -> EngineResult<SearchResult> {
    validate_snapshot(snapshot)?;

    let mut hits = Vec::new();
    for week in &snapshot.weeks {
        for group in week.groups.iter().filter(|g| query.matches_group(&g.group_name)) {
            for day in &group.days {
                let date = lesson_date(week, day.weekday);
                for lesson in day.lessons.iter().filter(|l| query.matches_lesson(l)) {
                    hits.push(SearchHit {
                        date,
                        week: week.week_number,
                        date_start: week.date_start,
                        date_end: week.date_end,
                        weekday: day.weekday,
                        time: lesson.time,
                        group_name: group.group_name.clone(),
                        subject: lesson.subject.clone(),
                        kind: lesson.kind,
                        subgroup: lesson.subgroup,
                        teachers: lesson.teacher_names().cloned().collect(),
                        auditories: lesson.room_names().cloned().collect(),
                    });
                }
            }
        }
    }

    hits.sort_by(|a, b| {
        (a.date, a.time, &a.group_name, a.subgroup).cmp(&(b.date, b.time, &b.group_name, b.subgroup))
    });

    let date_range = snapshot
        .weeks
        .iter()
        .flat_map(|w| [w.date_start, w.date_end])
        .fold(None, |range: Option<(NaiveDate, NaiveDate)>, d| match range {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        });

    tracing::debug!(hits = hits.len(), ?query, "课表检索完成");
    Ok(SearchResult { hits, date_range })
}

fn lesson_date(week: &Week, weekday: u8) -> NaiveDate {
    week.date_start + chrono::Duration::days(i64::from(weekday) - 1)
}

// ==========================================
// 教师 / 教室 课表投影
// ==========================================

/// 同一时间槽内合并后的课程（合班课的多个组归为一条）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedLesson {
    pub weekday: u8,
    pub time: u8,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    pub groups: Vec<String>, // 升序
    pub teacher: Option<TeacherName>,
    pub room: Option<RoomName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTimetable {
    pub week_number: u32,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// 按 (星期, 节次, 课程) 升序
    pub lessons: Vec<ProjectedLesson>,
}

/// 教师单周课表; 周次不存在返回 None
///
/// 同一时间槽内 (课程, 类型, 首个教室) 相同的课程合并, 组名汇总
pub fn teacher_timetable(
    snapshot: &Snapshot,
    teacher: &TeacherName,
    week_number: u32,
) -> EngineResult<Option<ResourceTimetable>> {
    project(snapshot, week_number, |lesson| {
        lesson.teacher_names().any(|t| t == teacher)
    })
}

/// 教室单周课表; 周次不存在返回 None
///
/// 同一时间槽内 (课程, 类型, 首个教师) 相同的课程合并, 组名汇总
pub fn room_timetable(
    snapshot: &Snapshot,
    room: &RoomName,
    week_number: u32,
) -> EngineResult<Option<ResourceTimetable>> {
    project(snapshot, week_number, |lesson| lesson.room_names().any(|r| r == room))
}

fn project<F>(snapshot: &Snapshot, week_number: u32, selects: F) -> EngineResult<Option<ResourceTimetable>>
where
    F: Fn(&Lesson) -> bool,
{
    validate_snapshot(snapshot)?;
    let Some(week) = snapshot.week(week_number) else {
        return Ok(None);
    };

    let mut lessons: Vec<ProjectedLesson> = Vec::new();
    for group in &week.groups {
        for day in &group.days {
            for lesson in day.lessons.iter().filter(|l| selects(*l)) {
                let teacher = lesson.primary_teacher().cloned();
                let room = lesson.primary_room().cloned();

                let existing = lessons.iter_mut().find(|p| {
                    p.weekday == day.weekday
                        && p.time == lesson.time
                        && p.subject == lesson.subject
                        && p.kind == lesson.kind
                        && p.teacher == teacher
                        && p.room == room
                });
                match existing {
                    Some(p) => {
                        if !p.groups.contains(&group.group_name) {
                            p.groups.push(group.group_name.clone());
                        }
                    }
                    None => lessons.push(ProjectedLesson {
                        weekday: day.weekday,
                        time: lesson.time,
                        subject: lesson.subject.clone(),
                        kind: lesson.kind,
                        groups: vec![group.group_name.clone()],
                        teacher,
                        room,
                    }),
                }
            }
        }
    }

    for p in &mut lessons {
        p.groups.sort();
    }
    lessons.sort_by(|a, b| (a.weekday, a.time, &a.subject).cmp(&(b.weekday, b.time, &b.subject)));

    Ok(Some(ResourceTimetable {
        week_number: week.week_number,
        date_start: week.date_start,
        date_end: week.date_end,
        lessons,
    }))
}

/// 起始日所在 ISO 周与 `today` 最接近的周次; 距离相同取周次较小者
pub fn closest_week(snapshot: &Snapshot, today: NaiveDate) -> Option<u32> {
    let current = i64::from(today.iso_week().week());
    let mut weeks: Vec<&Week> = snapshot.weeks.iter().collect();
    weeks.sort_by_key(|w| w.week_number);

    weeks
        .into_iter()
        .min_by_key(|w| (i64::from(w.date_start.iso_week().week()) - current).abs())
        .map(|w| w.week_number)
}

// ==========================================
// 去重取值
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueValues {
    pub groups: Vec<String>,
    pub subjects: Vec<String>,
    pub teachers: Vec<TeacherName>,
    pub auditories: Vec<RoomName>,
    pub lesson_types: Vec<LessonType>,
}

/// 快照中出现过的组/课程/教师/教室（各自升序, 空值过滤）
pub fn unique_values(snapshot: &Snapshot) -> UniqueValues {
    let mut groups = BTreeSet::new();
    let mut subjects = BTreeSet::new();
    let mut teachers = BTreeSet::new();
    let mut auditories = BTreeSet::new();

    for group in snapshot.weeks.iter().flat_map(|w| w.groups.iter()) {
        if !group.group_name.trim().is_empty() {
            groups.insert(group.group_name.clone());
        }
        for lesson in group.days.iter().flat_map(|d| d.lessons.iter()) {
            if lesson.has_subject() {
                subjects.insert(lesson.subject.clone());
            }
            teachers.extend(lesson.teacher_names().cloned());
            auditories.extend(lesson.room_names().cloned());
        }
    }

    UniqueValues {
        groups: groups.into_iter().collect(),
        subjects: subjects.into_iter().collect(),
        teachers: teachers.into_iter().collect(),
        auditories: auditories.into_iter().collect(),
        lesson_types: LESSON_TYPES.to_vec(),
    }
}

/// 某组在全部周次中的课程名（升序）
pub fn subjects_by_group(snapshot: &Snapshot, group_name: &str) -> Vec<String> {
    snapshot
        .weeks
        .iter()
        .filter_map(|w| w.group(group_name))
        .flat_map(|g| g.days.iter())
        .flat_map(|d| d.lessons.iter())
        .filter(|l| l.has_subject())
        .map(|l| l.subject.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Day, Group};

    fn week(n: u32) -> Week {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + chrono::Duration::weeks(i64::from(n) - 1);
        Week::new(n, start, start + chrono::Duration::days(5))
    }

    fn lesson(time: u8, subject: &str, kind: LessonType, teacher: &str, room: &str) -> Lesson {
        Lesson::new(time, subject, kind).with_teacher(teacher).with_room(room)
    }

    /// 第 1 周: CS-101 与 CS-102 周二第 1 节合班上 Math
    fn snapshot() -> Snapshot {
        Snapshot::new(vec![
            week(2).with_group(Group::new("CS-101").with_day(Day {
                weekday: 1,
                lessons: vec![lesson(1, "Math", LessonType::Practice, "Ivanov", "1.204")],
            })),
            week(1)
                .with_group(
                    Group::new("CS-102")
                        .with_day(Day {
                            weekday: 2,
                            lessons: vec![lesson(1, "Math", LessonType::Lecture, "Ivanov", "1.305")],
                        })
                        .with_day(Day {
                            weekday: 1,
                            lessons: vec![
                                lesson(3, "Physics", LessonType::Lab, "Petrov", "2.101").with_subgroup(2),
                                lesson(3, "Physics", LessonType::Lab, "Petrov", "2.101").with_subgroup(1),
                            ],
                        }),
                )
                .with_group(Group::new("CS-101").with_day(Day {
                    weekday: 2,
                    lessons: vec![lesson(1, "Math", LessonType::Lecture, "Ivanov", "1.305")],
                })),
        ])
    }

    #[test]
    fn test_search_sorts_by_date_time_group_subgroup() {
        let result = search_timetable(&snapshot(), &SearchQuery::default()).unwrap();

        let order: Vec<(NaiveDate, &str, u8)> = result
            .hits
            .iter()
            .map(|h| (h.date, h.group_name.as_str(), h.subgroup))
            .collect();
        let d = |day| NaiveDate::from_ymd_opt(2025, 9, day).unwrap();
        assert_eq!(
            order,
            vec![
                (d(1), "CS-102", 1),
                (d(1), "CS-102", 2),
                (d(2), "CS-101", 0),
                (d(2), "CS-102", 0),
                (d(8), "CS-101", 0),
            ]
        );
        assert_eq!(result.date_range, Some((d(1), d(13))));
    }

    #[test]
    fn test_search_filters() {
        let snapshot = snapshot();

        let query = SearchQuery {
            group: Some("CS-101".to_string()),
            subject: Some("Math".to_string()),
            kind: Some(LessonType::Lecture),
        };
        let result = search_timetable(&snapshot, &query).unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].week, 1);
        assert_eq!(result.hits[0].teachers, vec![TeacherName::from("Ivanov")]);

        // 空字符串视为不过滤
        let query = SearchQuery {
            group: Some("  ".to_string()),
            subject: Some("Physics".to_string()),
            kind: None,
        };
        assert_eq!(search_timetable(&snapshot, &query).unwrap().hits.len(), 2);

        let query = SearchQuery {
            group: Some("CS-999".to_string()),
            ..SearchQuery::default()
        };
        let result = search_timetable(&snapshot, &query).unwrap();
        assert!(result.hits.is_empty());
        assert!(result.date_range.is_some());
    }

    #[test]
    fn test_teacher_timetable_merges_shared_lecture() {
        let timetable = teacher_timetable(&snapshot(), &TeacherName::from("Ivanov"), 1)
            .unwrap()
            .unwrap();

        assert_eq!(timetable.week_number, 1);
        assert_eq!(timetable.lessons.len(), 1);
        let shared = &timetable.lessons[0];
        assert_eq!((shared.weekday, shared.time), (2, 1));
        assert_eq!(shared.groups, vec!["CS-101", "CS-102"]);
        assert_eq!(shared.room, Some(RoomName::from("1.305")));

        assert!(teacher_timetable(&snapshot(), &TeacherName::from("Ivanov"), 7)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_room_timetable_keeps_subgroups_together() {
        let timetable = room_timetable(&snapshot(), &RoomName::from("2.101"), 1)
            .unwrap()
            .unwrap();
        assert_eq!(timetable.lessons.len(), 1);
        assert_eq!(timetable.lessons[0].subject, "Physics");
        assert_eq!(timetable.lessons[0].groups, vec!["CS-102"]);

        let empty = room_timetable(&snapshot(), &RoomName::from("9.999"), 2)
            .unwrap()
            .unwrap();
        assert!(empty.lessons.is_empty());
    }

    #[test]
    fn test_closest_week() {
        let snapshot = snapshot();
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();

        assert_eq!(closest_week(&snapshot, d(9, 3)), Some(1));
        assert_eq!(closest_week(&snapshot, d(9, 10)), Some(2));
        assert_eq!(closest_week(&snapshot, d(12, 1)), Some(2));
        assert_eq!(closest_week(&Snapshot::default(), d(9, 3)), None);
    }

    #[test]
    fn test_lookup_lists() {
        let values = unique_values(&snapshot());
        assert_eq!(values.groups, vec!["CS-101", "CS-102"]);
        assert_eq!(values.subjects, vec!["Math", "Physics"]);
        assert_eq!(
            values.teachers,
            vec![TeacherName::from("Ivanov"), TeacherName::from("Petrov")]
        );
        assert_eq!(values.auditories.len(), 3);
        assert_eq!(values.lesson_types, LESSON_TYPES.to_vec());

        assert_eq!(subjects_by_group(&snapshot(), "CS-101"), vec!["Math"]);
        assert_eq!(subjects_by_group(&snapshot(), "CS-102"), vec!["Math", "Physics"]);
        assert!(subjects_by_group(&snapshot(), "CS-999").is_empty());
    }
}
