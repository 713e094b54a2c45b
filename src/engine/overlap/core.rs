use super::occupancy::SlotOccupancy;
use crate::config::EngineConfig;
use crate::domain::overlap::{Conflict, LessonOccurrence, OverlapReport};
use crate::domain::slot::{is_valid_time, is_valid_weekday};
use crate::domain::timetable::{Lesson, RoomName, Snapshot, TeacherName, Week};
use crate::domain::types::ConflictKind;
use crate::engine::error::{EngineError, EngineResult, ValidationIssue};
use crate::engine::validator::validate_snapshot;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

// ==========================================
// Partition - 同一资源键下按区分键分桶
// ==========================================
// 保持区分键首次出现顺序, 输出稳定
struct Partition<K> {
    buckets: Vec<(K, Vec<LessonOccurrence>)>,
}

impl<K: PartialEq> Partition<K> {
    fn new() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }

    fn push(&mut self, key: K, occurrence: LessonOccurrence) {
        match self.buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(occurrence),
            None => self.buckets.push((key, vec![occurrence])),
        }
    }

    fn is_conflict(&self) -> bool {
        self.buckets.len() > 1
    }

    fn into_occurrences(self) -> Vec<LessonOccurrence> {
        self.buckets.into_iter().flat_map(|(_, list)| list).collect()
    }
}

// ==========================================
// OverlapDetector - 冲突检测引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct OverlapDetector {
    ignored_rooms: BTreeSet<RoomName>, // 共享场地, 不参与教室冲突
}

impl OverlapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_ignored_rooms(config.ignored_rooms.iter().cloned())
    }

    pub fn with_ignored_rooms<I>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = RoomName>,
    {
        self.ignored_rooms.extend(rooms);
        self
    }

    fn counts_as_room(&self, room: &RoomName) -> bool {
        !self.ignored_rooms.contains(room)
    }

    // ==========================================
    // 全量扫描
    // ==========================================

    /// 扫描整个快照中已存在的冲突
    ///
    /// # 返回
    /// - room_overlaps / teacher_overlaps 按 (周次, 星期, 节次, 资源名) 升序
    #[instrument(skip_all, fields(weeks = snapshot.weeks.len()))]
    pub fn find_all(&self, snapshot: &Snapshot) -> EngineResult<OverlapReport> {
        validate_snapshot(snapshot)?;

        let mut room_overlaps = Vec::new();
        let mut teacher_overlaps = Vec::new();

        for week in &snapshot.weeks {
            self.scan_week(week, &mut room_overlaps, &mut teacher_overlaps);
        }

        sort_conflicts(&mut room_overlaps);
        sort_conflicts(&mut teacher_overlaps);

        tracing::debug!(
            room_overlaps = room_overlaps.len(),
            teacher_overlaps = teacher_overlaps.len(),
            "冲突扫描完成"
        );

        Ok(OverlapReport::new(room_overlaps, teacher_overlaps))
    }

    fn scan_week(&self, week: &Week, rooms_out: &mut Vec<Conflict>, teachers_out: &mut Vec<Conflict>) {
        // (星期, 节次, 教室) → 按课程分桶
        let mut room_index: BTreeMap<(u8, u8, &RoomName), Partition<&str>> = BTreeMap::new();
        // (星期, 节次, 教师) → 按 (课程, 教室) 分桶
        let mut teacher_index: BTreeMap<(u8, u8, &TeacherName), Partition<(&str, &RoomName)>> =
            BTreeMap::new();

        for group in &week.groups {
            for day in &group.days {
                for lesson in &day.lessons {
                    if !lesson.has_subject() {
                        continue;
                    }
                    let subject = lesson.subject.as_str();
                    let occurrence = LessonOccurrence::of(&group.group_name, lesson);

                    for room in lesson.room_names().filter(|r| self.counts_as_room(r)) {
                        room_index
                            .entry((day.weekday, lesson.time, room))
                            .or_insert_with(Partition::new)
                            .push(subject, occurrence.clone());
                    }

                    let Some(room) = lesson.primary_room() else {
                        continue;
                    };
                    for teacher in lesson.teacher_names() {
                        teacher_index
                            .entry((day.weekday, lesson.time, teacher))
                            .or_insert_with(Partition::new)
                            .push((subject, room), occurrence.clone());
                    }
                }
            }
        }

        for ((weekday, time, room), partition) in room_index {
            if partition.is_conflict() {
                rooms_out.push(Conflict {
                    kind: ConflictKind::Room,
                    week: week.week_number,
                    weekday,
                    time,
                    resource_name: room.to_string(),
                    involved_lessons: partition.into_occurrences(),
                });
            }
        }

        for ((weekday, time, teacher), partition) in teacher_index {
            if partition.is_conflict() {
                teachers_out.push(Conflict {
                    kind: ConflictKind::Teacher,
                    week: week.week_number,
                    weekday,
                    time,
                    resource_name: teacher.to_string(),
                    involved_lessons: partition.into_occurrences(),
                });
            }
        }
    }

    // ==========================================
    // 编辑前实时预检
    // ==========================================

    /// 将拟写入某组某时间槽的课程与同槽其他组的课程逐一比对
    ///
    /// # 参数
    /// - `group_name`: 被编辑的组（其现有课程不参与比较）
    ///
    /// # 返回
    /// - total_count > 0 时调用方须取得显式确认后才能写入
    #[instrument(skip(self, snapshot, candidates))]
    pub fn check(
        &self,
        snapshot: &Snapshot,
        week: u32,
        weekday: u8,
        time: u8,
        candidates: &[Lesson],
        group_name: Option<&str>,
    ) -> EngineResult<OverlapReport> {
        validate_snapshot(snapshot)?;
        check_slot_range(week, weekday, time)?;

        let Some(week_data) = snapshot.week(week) else {
            return Ok(OverlapReport::default());
        };

        let existing: Vec<(&str, &Lesson)> = week_data
            .lessons_at(weekday, time)
            .filter(|(g, _)| Some(*g) != group_name)
            .collect();

        let own_group = group_name.unwrap_or_default();
        let mut room_overlaps = Vec::new();
        let mut teacher_overlaps = Vec::new();

        for candidate in candidates {
            let Some((new_subject, new_room, new_teacher)) = comparable(candidate) else {
                continue;
            };

            for (other_group, lesson) in &existing {
                let Some((subject, room, teacher)) = comparable(lesson) else {
                    continue;
                };

                let pair = || {
                    vec![
                        LessonOccurrence::of(other_group, lesson),
                        LessonOccurrence::of(own_group, candidate),
                    ]
                };

                if new_room == room && new_subject != subject && self.counts_as_room(new_room) {
                    room_overlaps.push(Conflict {
                        kind: ConflictKind::Room,
                        week,
                        weekday,
                        time,
                        resource_name: new_room.to_string(),
                        involved_lessons: pair(),
                    });
                }

                if new_teacher == teacher && (new_subject != subject || new_room != room) {
                    teacher_overlaps.push(Conflict {
                        kind: ConflictKind::Teacher,
                        week,
                        weekday,
                        time,
                        resource_name: new_teacher.to_string(),
                        involved_lessons: pair(),
                    });
                }
            }
        }

        Ok(OverlapReport::new(room_overlaps, teacher_overlaps))
    }

    // ==========================================
    // 占用索引
    // ==========================================

    /// 构建快照占用索引（供调课推荐/空闲教室查询使用）
    pub fn occupancy<'a>(&self, snapshot: &'a Snapshot) -> EngineResult<SlotOccupancy<'a>> {
        validate_snapshot(snapshot)?;
        Ok(SlotOccupancy::build(snapshot))
    }
}

/// 可比较的课程: 课程名、主教室、主讲教师均存在
fn comparable(lesson: &Lesson) -> Option<(&str, &RoomName, &TeacherName)> {
    if !lesson.has_subject() {
        return None;
    }
    Some((
        lesson.subject.as_str(),
        lesson.primary_room()?,
        lesson.primary_teacher()?,
    ))
}

fn sort_conflicts(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|a, b| {
        (a.week, a.weekday, a.time, &a.resource_name).cmp(&(
            b.week,
            b.weekday,
            b.time,
            &b.resource_name,
        ))
    });
}

pub(crate) fn check_slot_range(week: u32, weekday: u8, time: u8) -> EngineResult<()> {
    let mut issues = Vec::new();
    if week == 0 {
        issues.push(ValidationIssue::new("week", "周次必须 ≥ 1"));
    }
    if !is_valid_weekday(weekday) {
        issues.push(ValidationIssue::new("weekday", format!("星期越界: {}", weekday)));
    }
    if !is_valid_time(time) {
        issues.push(ValidationIssue::new("time", format!("节次越界: {}", time)));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(issues))
    }
}
