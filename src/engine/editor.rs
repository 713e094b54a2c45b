// ==========================================
// 课表一致性引擎 - 时间槽编辑器
// ==========================================
// 职责: 替换某组某时间槽的全部课程, 写入前做冲突预检
// 流程:
// 1) 校验快照与待写入课程
// 2) 冲突预检（除非调用方显式忽略）, 有冲突则拒绝写入
// 3) 判定 新增/修改/删除/无变化
// 4) 写入课程并生成修改记录
// ==========================================

use crate::config::EngineConfig;
use crate::domain::history::ChangeRecord;
use crate::domain::overlap::OverlapReport;
use crate::domain::timetable::{Day, Lesson, Snapshot};
use crate::domain::types::ChangeType;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::overlap::OverlapDetector;
use crate::engine::validator::{validate_lessons, validate_snapshot};
use crate::i18n::t_in;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

// ==========================================
// SlotEdit - 编辑请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEdit {
    pub group_name: String,
    pub week: u32,
    pub weekday: u8,
    pub time: u8,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub ignore_overlaps: bool,
    #[serde(default)]
    pub editor: Option<String>,
}

// ==========================================
// EditOutcome - 编辑结果
// ==========================================
#[derive(Debug, Clone)]
pub enum EditOutcome {
    /// 存在冲突, 未写入（需显式确认后以 ignore_overlaps 重试）
    Blocked(OverlapReport),
    /// 已写入
    Applied {
        change_type: ChangeType,
        record: ChangeRecord,
    },
    /// 新旧课程一致, 未写入
    NoChange,
}

// ==========================================
// SlotEditor
// ==========================================
pub struct SlotEditor {
    detector: OverlapDetector,
    locale: String,
}

impl SlotEditor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            detector: OverlapDetector::from_config(config),
            locale: config.locale.clone(),
        }
    }

    /// 应用一次时间槽编辑
    ///
    /// # 错误
    /// - Validation: 快照或课程不合法
    /// - SlotNotFound: 周次或组不存在
    /// - InvariantViolation: 待写入课程中 (课程, 小组) 重复
    #[instrument(skip(self, snapshot, edit), fields(group = %edit.group_name, week = edit.week))]
    pub fn apply_slot_edit(&self, snapshot: &mut Snapshot, edit: SlotEdit) -> EngineResult<EditOutcome> {
        validate_snapshot(snapshot)?;
        validate_lessons(edit.week, edit.weekday, edit.time, &edit.lessons)?;
        check_unique_keys(&edit)?;

        let group_exists = snapshot
            .week(edit.week)
            .is_some_and(|w| w.group(&edit.group_name).is_some());
        if !group_exists {
            return Err(EngineError::SlotNotFound {
                week: edit.week,
                group: edit.group_name,
            });
        }

        if !edit.ignore_overlaps {
            let report = self.detector.check(
                snapshot,
                edit.week,
                edit.weekday,
                edit.time,
                &edit.lessons,
                Some(&edit.group_name),
            )?;
            if !report.is_clean() {
                tracing::info!(total = report.total_count, "编辑存在冲突, 等待确认");
                return Ok(EditOutcome::Blocked(report));
            }
        }

        let SlotEdit {
            group_name,
            week,
            weekday,
            time,
            mut lessons,
            editor,
            ..
        } = edit;

        let group = snapshot
            .week_mut(week)
            .and_then(|w| w.group_mut(&group_name))
            .ok_or_else(|| EngineError::SlotNotFound {
                week,
                group: group_name.clone(),
            })?;

        if group.day(weekday).is_none() {
            group.days.push(Day::empty(weekday));
            group.days.sort_by_key(|d| d.weekday);
        }
        let day = group.day_mut(weekday).ok_or_else(|| EngineError::InvariantViolation {
            week,
            group: group_name.clone(),
            weekday,
            time,
            message: "星期创建失败".to_string(),
        })?;

        // 其他周标记的同节次课程不属于本次编辑
        let in_slot = |l: &Lesson| l.time == time && l.week.unwrap_or(week) == week;
        let old: Vec<Lesson> = day.lessons.iter().filter(|l| in_slot(l)).cloned().collect();
        let Some(change_type) = classify(&old, &lessons) else {
            return Ok(EditOutcome::NoChange);
        };

        for lesson in &mut lessons {
            lesson.week = Some(week);
        }
        day.lessons.retain(|l| !in_slot(l));
        day.lessons.extend(lessons.iter().cloned());

        let summary_source = if change_type == ChangeType::Delete {
            &old
        } else {
            &lessons
        };
        let summary = summary_source
            .iter()
            .map(|l| l.subject.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let detail = t_in(
            &self.locale,
            &format!("edit.{}", change_type),
            &[("summary", summary.as_str())],
        );

        let mut record =
            ChangeRecord::slot_edit(change_type, &group_name, week, weekday, time, &old, &lessons)
                .with_editor(editor);
        record.detail = Some(detail);

        tracing::info!(%change_type, weekday, time, "时间槽已更新");
        Ok(EditOutcome::Applied {
            change_type,
            record,
        })
    }
}

fn check_unique_keys(edit: &SlotEdit) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for lesson in &edit.lessons {
        if !seen.insert((lesson.subject.as_str(), lesson.subgroup)) {
            return Err(EngineError::InvariantViolation {
                week: edit.week,
                group: edit.group_name.clone(),
                weekday: edit.weekday,
                time: edit.time,
                message: format!(
                    "课程 {} 小组 {} 重复出现",
                    lesson.subject, lesson.subgroup
                ),
            });
        }
    }
    Ok(())
}

/// 判定变更类型, None 表示无变化
fn classify(old: &[Lesson], new: &[Lesson]) -> Option<ChangeType> {
    match (old.is_empty(), new.is_empty()) {
        (true, true) => None,
        (true, false) => Some(ChangeType::Create),
        (false, true) => Some(ChangeType::Delete),
        (false, false) => {
            let changed = old.len() != new.len()
                || old.iter().zip(new).any(|(o, n)| !o.same_content(n));
            changed.then_some(ChangeType::Update)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Group, Week};
    use crate::domain::types::LessonType;
    use chrono::NaiveDate;

    fn snapshot() -> Snapshot {
        let start = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        Snapshot::new(vec![Week::new(3, start, start + chrono::Duration::days(5))
            .with_group(Group::new("CS-101").with_day(Day {
                weekday: 2,
                lessons: vec![Lesson::new(2, "Algebra", LessonType::Lab)
                    .with_teacher("Ivanov")
                    .with_room("1.305")],
            }))
            .with_group(Group::new("CS-102").with_day(Day {
                weekday: 2,
                lessons: vec![Lesson::new(3, "Physics", LessonType::Lecture)
                    .with_teacher("Petrov")
                    .with_room("1.305")],
            }))])
    }

    fn edit(group: &str, time: u8, lessons: Vec<Lesson>) -> SlotEdit {
        SlotEdit {
            group_name: group.to_string(),
            week: 3,
            weekday: 2,
            time,
            lessons,
            ignore_overlaps: false,
            editor: Some("10.0.0.7".to_string()),
        }
    }

    fn editor() -> SlotEditor {
        SlotEditor::new(&EngineConfig::default())
    }

    #[test]
    fn test_create_stamps_week_and_records_history() {
        let mut snap = snapshot();
        let lesson = Lesson::new(3, "Databases", LessonType::Practice)
            .with_teacher("Sidorov")
            .with_room("2.210");

        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 3, vec![lesson]))
            .unwrap();

        match outcome {
            EditOutcome::Applied { change_type, record } => {
                assert_eq!(change_type, ChangeType::Create);
                assert!(record.old_lessons.is_empty());
                assert_eq!(record.new_lessons[0].subject, "Databases");
                assert_eq!(record.editor.as_deref(), Some("10.0.0.7"));
                assert_eq!(record.detail.as_deref(), Some("Добавлено занятие: Databases"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let day = snap.week(3).unwrap().group("CS-101").unwrap().day(2).unwrap();
        let written: Vec<_> = day.lessons_at(3).collect();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].week, Some(3));
    }

    #[test]
    fn test_conflicting_edit_is_blocked_until_confirmed() {
        let mut snap = snapshot();
        let clash = Lesson::new(3, "Databases", LessonType::Practice)
            .with_teacher("Sidorov")
            .with_room("1.305");

        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 3, vec![clash.clone()]))
            .unwrap();
        match outcome {
            EditOutcome::Blocked(report) => assert_eq!(report.room_overlaps.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(snap, snapshot());

        let mut confirmed = edit("CS-101", 3, vec![clash]);
        confirmed.ignore_overlaps = true;
        let outcome = editor().apply_slot_edit(&mut snap, confirmed).unwrap();
        assert!(matches!(outcome, EditOutcome::Applied { change_type: ChangeType::Create, .. }));
    }

    #[test]
    fn test_update_delete_and_no_change() {
        let mut snap = snapshot();
        let same = Lesson::new(2, "Algebra", LessonType::Lab)
            .with_teacher("Ivanov")
            .with_room("1.305");

        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 2, vec![same.clone()]))
            .unwrap();
        assert!(matches!(outcome, EditOutcome::NoChange));

        let mut moved_room = same.clone();
        moved_room.auditories[0].name = "1.306".into();
        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 2, vec![moved_room]))
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Applied { change_type: ChangeType::Update, .. }));

        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 2, vec![]))
            .unwrap();
        match outcome {
            EditOutcome::Applied { change_type, record } => {
                assert_eq!(change_type, ChangeType::Delete);
                assert_eq!(record.old_lessons.len(), 1);
                assert_eq!(record.detail.as_deref(), Some("Удалено занятие: Algebra"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(snap.week(3).unwrap().group("CS-101").unwrap().lesson_count(), 0);
    }

    #[test]
    fn test_unknown_group_and_duplicate_keys() {
        let mut snap = snapshot();
        let err = editor()
            .apply_slot_edit(&mut snap, edit("CS-999", 2, vec![]))
            .unwrap_err();
        assert!(matches!(err, EngineError::SlotNotFound { week: 3, .. }));

        let twice = vec![
            Lesson::new(4, "Math", LessonType::Lecture),
            Lesson::new(4, "Math", LessonType::Practice),
        ];
        let err = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 4, twice))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { time: 4, .. }));
    }

    #[test]
    fn test_missing_day_is_created() {
        let mut snap = snapshot();
        let mut request = edit("CS-102", 1, vec![Lesson::new(1, "Art", LessonType::Practice)]);
        request.weekday = 5;

        let outcome = editor().apply_slot_edit(&mut snap, request).unwrap();
        assert!(matches!(outcome, EditOutcome::Applied { change_type: ChangeType::Create, .. }));

        let days: Vec<u8> = snap.week(3).unwrap().group("CS-102").unwrap().days.iter().map(|d| d.weekday).collect();
        assert_eq!(days, vec![2, 5]);
    }

    #[test]
    fn test_lessons_tagged_with_other_week_survive() {
        let mut snap = snapshot();
        let mut foreign = Lesson::new(2, "Seminar", LessonType::Practice);
        foreign.week = Some(4);
        snap.week_mut(3).unwrap().group_mut("CS-101").unwrap().day_mut(2).unwrap().lessons.push(foreign);

        let outcome = editor()
            .apply_slot_edit(&mut snap, edit("CS-101", 2, vec![]))
            .unwrap();
        match outcome {
            EditOutcome::Applied { record, .. } => assert_eq!(record.old_lessons.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let day = snap.week(3).unwrap().group("CS-101").unwrap().day(2).unwrap();
        let left: Vec<_> = day.lessons.iter().map(|l| l.subject.as_str()).collect();
        assert_eq!(left, vec!["Seminar"]);
    }
}
