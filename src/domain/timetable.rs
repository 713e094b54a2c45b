// ==========================================
// 课表一致性引擎 - 课表实体
// ==========================================
// 依据: 课表数据模型 - Week / Group / Day / Lesson
// ==========================================
// 职责: 定义快照结构及只读访问方法
// 红线: 教师/教室按名称精确匹配, 不做大小写/空白归一化
// ==========================================

use crate::domain::types::LessonType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// TeacherName / RoomName - 名称值对象
// ==========================================
// 用途: 避免与课程名称等普通字符串混用
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherName(String);

impl TeacherName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 空名称视为缺失
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TeacherName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeacherName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// 楼栋前缀（分隔符之前的部分）
    ///
    /// 名称中不含分隔符时返回 None（无法判定楼栋）
    pub fn building(&self, separator: char) -> Option<&str> {
        self.0.split_once(separator).map(|(building, _)| building)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ==========================================
// TeacherRef / RoomRef - 扁平引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherRef {
    #[serde(rename = "teacher_name", default)]
    pub name: TeacherName,
}

impl TeacherRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: TeacherName::new(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomRef {
    #[serde(rename = "auditory_name", default)]
    pub name: RoomName,
}

impl RoomRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: RoomName::new(name),
        }
    }
}

// ==========================================
// Lesson - 课程
// ==========================================
// 同一 (组, 星期, 节次) 内以 (subject, subgroup) 唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub time: u8,                 // 节次 1..=8
    #[serde(default)]
    pub subject: String,          // 课程名称
    #[serde(rename = "type")]
    pub kind: LessonType,         // 课程类型
    #[serde(default)]
    pub subgroup: u8,             // 小组编号 (0 = 全组)
    #[serde(default)]
    pub teachers: Vec<TeacherRef>,
    #[serde(default)]
    pub auditories: Vec<RoomRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,        // 所属周次 (编辑时写入)
}

impl Lesson {
    pub fn new(time: u8, subject: impl Into<String>, kind: LessonType) -> Self {
        Self {
            time,
            subject: subject.into(),
            kind,
            subgroup: 0,
            teachers: Vec::new(),
            auditories: Vec::new(),
            week: None,
        }
    }

    pub fn with_subgroup(mut self, subgroup: u8) -> Self {
        self.subgroup = subgroup;
        self
    }

    pub fn with_teacher(mut self, name: impl Into<String>) -> Self {
        self.teachers.push(TeacherRef::new(name));
        self
    }

    pub fn with_room(mut self, name: impl Into<String>) -> Self {
        self.auditories.push(RoomRef::new(name));
        self
    }

    pub fn has_subject(&self) -> bool {
        !self.subject.trim().is_empty()
    }

    /// 非空教师名称
    pub fn teacher_names(&self) -> impl Iterator<Item = &TeacherName> {
        self.teachers.iter().map(|t| &t.name).filter(|n| !n.is_blank())
    }

    /// 非空教室名称
    pub fn room_names(&self) -> impl Iterator<Item = &RoomName> {
        self.auditories.iter().map(|r| &r.name).filter(|n| !n.is_blank())
    }

    /// 主讲教师（第一个非空教师）
    pub fn primary_teacher(&self) -> Option<&TeacherName> {
        self.teacher_names().next()
    }

    /// 主教室（第一个非空教室）
    pub fn primary_room(&self) -> Option<&RoomName> {
        self.room_names().next()
    }

    /// 合并去重键: (节次, 小组, 课程)
    pub fn merge_key(&self) -> (u8, u8, &str) {
        (self.time, self.subgroup, self.subject.as_str())
    }

    /// 除 week 标记外内容是否一致（用于合并差异记录与变更判定）
    pub fn same_content(&self, other: &Lesson) -> bool {
        self.time == other.time
            && self.subject == other.subject
            && self.kind == other.kind
            && self.subgroup == other.subgroup
            && self.teachers == other.teachers
            && self.auditories == other.auditories
    }
}

// ==========================================
// Day / Group / Week
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub weekday: u8, // 1..=6
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Day {
    pub fn empty(weekday: u8) -> Self {
        Self {
            weekday,
            lessons: Vec::new(),
        }
    }

    pub fn lessons_at(&self, time: u8) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().filter(move |l| l.time == time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl Group {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            days: Vec::new(),
        }
    }

    pub fn with_day(mut self, day: Day) -> Self {
        self.days.push(day);
        self
    }

    pub fn day(&self, weekday: u8) -> Option<&Day> {
        self.days.iter().find(|d| d.weekday == weekday)
    }

    pub fn day_mut(&mut self, weekday: u8) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.weekday == weekday)
    }

    pub fn lesson_count(&self) -> usize {
        self.days.iter().map(|d| d.lessons.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub week_number: u32,
    #[serde(with = "week_date")]
    pub date_start: NaiveDate,
    #[serde(with = "week_date")]
    pub date_end: NaiveDate,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Week {
    pub fn new(week_number: u32, date_start: NaiveDate, date_end: NaiveDate) -> Self {
        Self {
            week_number,
            date_start,
            date_end,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn group(&self, group_name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.group_name == group_name)
    }

    pub fn group_mut(&mut self, group_name: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.group_name == group_name)
    }

    /// 是否存在至少一节课
    pub fn has_lessons(&self) -> bool {
        self.groups.iter().any(|g| g.lesson_count() > 0)
    }

    /// 指定 (星期, 节次) 的全部课程, 附带组名
    pub fn lessons_at(&self, weekday: u8, time: u8) -> impl Iterator<Item = (&str, &Lesson)> {
        self.groups.iter().flat_map(move |g| {
            g.days
                .iter()
                .filter(move |d| d.weekday == weekday)
                .flat_map(move |d| d.lessons_at(time))
                .map(move |l| (g.group_name.as_str(), l))
        })
    }
}

// ==========================================
// Snapshot - 课表快照
// ==========================================
// 完整的内存课表状态, 整体读取/整体写回
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub weeks: Vec<Week>,
}

impl Snapshot {
    pub fn new(weeks: Vec<Week>) -> Self {
        Self { weeks }
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn week(&self, week_number: u32) -> Option<&Week> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    pub fn week_mut(&mut self, week_number: u32) -> Option<&mut Week> {
        self.weeks.iter_mut().find(|w| w.week_number == week_number)
    }

    pub fn week_numbers(&self) -> BTreeSet<u32> {
        self.weeks.iter().map(|w| w.week_number).collect()
    }

    /// 快照中出现过的全部教室（排序去重）
    pub fn all_rooms(&self) -> BTreeSet<RoomName> {
        self.weeks
            .iter()
            .flat_map(|w| w.groups.iter())
            .flat_map(|g| g.days.iter())
            .flat_map(|d| d.lessons.iter())
            .flat_map(|l| l.room_names().cloned())
            .collect()
    }

    pub fn lesson_count(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|w| w.groups.iter())
            .map(|g| g.lesson_count())
            .sum()
    }
}

impl From<Vec<Week>> for Snapshot {
    fn from(weeks: Vec<Week>) -> Self {
        Self { weeks }
    }
}

// ==========================================
// 周日期序列化
// ==========================================
// 写出: YYYY-MM-DD; 读入: YYYY-MM-DD 或 DD.MM.YYYY
pub mod week_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const ISO_FORMAT: &str = "%Y-%m-%d";
    const DOTTED_FORMAT: &str = "%d.%m.%Y";

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, ISO_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(raw, DOTTED_FORMAT))
            .ok()
    }

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(ISO_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("日期格式错误: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_room_building_prefix() {
        assert_eq!(RoomName::from("1.305").building('.'), Some("1"));
        assert_eq!(RoomName::from("А.12").building('.'), Some("А"));
        assert_eq!(RoomName::from("Спортзал").building('.'), None);
    }

    #[test]
    fn test_lesson_wire_format() {
        let json = r#"{
            "time": 2,
            "subject": "Физика",
            "type": "лаб.",
            "subgroup": 1,
            "teachers": [{"teacher_name": "Иванов И.И."}],
            "auditories": [{"auditory_name": "1.305"}]
        }"#;

        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.time, 2);
        assert_eq!(lesson.kind, LessonType::Lab);
        assert_eq!(lesson.primary_teacher().unwrap().as_str(), "Иванов И.И.");
        assert_eq!(lesson.primary_room().unwrap().as_str(), "1.305");
        assert_eq!(lesson.week, None);
    }

    #[test]
    fn test_blank_names_are_skipped() {
        let lesson = Lesson::new(1, "Math", LessonType::Lecture)
            .with_teacher("")
            .with_teacher("Petrov")
            .with_room("  ");

        assert_eq!(lesson.primary_teacher().unwrap().as_str(), "Petrov");
        assert!(lesson.primary_room().is_none());
    }

    #[test]
    fn test_week_dates_accept_dotted_format() {
        let json = r#"{"week_number": 3, "date_start": "15.09.2025", "date_end": "2025-09-20", "groups": []}"#;
        let week: Week = serde_json::from_str(json).unwrap();
        assert_eq!(week.date_start, date(2025, 9, 15));
        assert_eq!(week.date_end, date(2025, 9, 20));

        let out = serde_json::to_value(&week).unwrap();
        assert_eq!(out["date_start"], "2025-09-15");
    }

    #[test]
    fn test_week_lessons_at_carries_group_name() {
        let week = Week::new(1, date(2025, 9, 1), date(2025, 9, 6))
            .with_group(Group::new("CS-101").with_day(Day {
                weekday: 2,
                lessons: vec![Lesson::new(3, "Math", LessonType::Lecture)],
            }))
            .with_group(Group::new("CS-102").with_day(Day {
                weekday: 2,
                lessons: vec![Lesson::new(4, "Physics", LessonType::Lab)],
            }));

        let found: Vec<_> = week.lessons_at(2, 3).map(|(g, l)| (g, l.subject.as_str())).collect();
        assert_eq!(found, vec![("CS-101", "Math")]);
        assert!(week.has_lessons());
    }
}
