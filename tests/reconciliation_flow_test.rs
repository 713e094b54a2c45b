// ==========================================
// 上传协调与编辑 端到端测试
// ==========================================
// 测试目标: AppState(SQLite) 上的 上传 → 周次冲突 → 决策 → 持久化 → 历史 流程
// ==========================================


use std::collections::HashMap;
use test_helpers::{create_test_db, lesson_json, subjects_in_week, upload_file, week_json};
use timetable_engine::api::ApiError;
use timetable_engine::app::AppState;
use timetable_engine::engine::{BuildingFilter, EditOutcome, SlotEdit};
use timetable_engine::{BeginOutcome, ChangeType, Lesson, LessonType, Resolution};
use uuid::Uuid;

fn math(time: u8) -> serde_json::Value {
    lesson_json(time, "Math", "Ivanov", "1.305")
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_upload_without_collision_commits_and_persists() {
    timetable_engine::logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();

    {
        let state = AppState::new(db_path.clone()).unwrap();
        let outcome = state
            .timetable_api
            .upload(
                &[upload_file(
                    "a.json",
                    vec![week_json(1, "CS-101", vec![math(1)]), week_json(2, "CS-101", vec![math(1)])],
                )],
                Some("tester"),
            )
            .unwrap();
        assert!(outcome.is_committed());
    }

    // 重新打开数据库, 数据仍在
    let state = AppState::new(db_path).unwrap();
    let snapshot = state.timetable_api.snapshot().unwrap();
    assert_eq!(snapshot.week_numbers().into_iter().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(subjects_in_week(&snapshot, 1), vec!["Math"]);

    let history = state.timetable_api.recent_changes(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::Upload);
    assert_eq!(history[0].editor.as_deref(), Some("tester"));
    assert_eq!(history[0].detail.as_deref(), Some("Загружено недель: 2"));
}

#[test]
fn test_collision_waits_for_decision_then_applies_it() {
    timetable_engine::logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    api.upload(
        &[upload_file(
            "a.json",
            vec![week_json(1, "CS-101", vec![math(1)]), week_json(2, "CS-101", vec![math(1)])],
        )],
        None,
    )
    .unwrap();

    // 第 2 周与现有重复, 第 3 周为新周
    let outcome = api
        .upload(
            &[upload_file(
                "b.json",
                vec![
                    week_json(2, "CS-101", vec![lesson_json(1, "Physics", "Petrov", "2.101")]),
                    week_json(3, "CS-101", vec![math(2)]),
                ],
            )],
            None,
        )
        .unwrap();

    let BeginOutcome::AwaitingResolution { token, conflicts } = outcome else {
        panic!("第 2 周应触发冲突");
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].week_number, 2);
    assert_eq!(conflicts[0].sources, vec!["b.json".to_string()]);

    // 决策前权威快照不变
    let before = api.snapshot().unwrap();
    assert_eq!(before.week_numbers().len(), 2);
    assert_eq!(subjects_in_week(&before, 2), vec!["Math"]);
    assert_eq!(api.pending_upload(token).unwrap().conflicts, conflicts);

    let decisions = HashMap::from([(2, Resolution::Replace)]);
    let summary = api.resolve_upload(token, &decisions, Some("tester")).unwrap();
    assert_eq!(summary.applied.get(&2), Some(&Resolution::Replace));

    let after = api.snapshot().unwrap();
    assert_eq!(after.week_numbers().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(subjects_in_week(&after, 2), vec!["Physics"]);
    assert_eq!(subjects_in_week(&after, 3), vec!["Math"]);

    // 同一令牌不能再次处理
    let err = api.resolve_upload(token, &decisions, None).unwrap_err();
    assert!(matches!(err, ApiError::UnknownToken(t) if t == token));

    assert_eq!(api.recent_changes(10).unwrap().len(), 2);
}

#[test]
fn test_merge_decision_keeps_both_sides() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    api.upload(&[upload_file("a.json", vec![week_json(4, "CS-101", vec![math(1)])])], None)
        .unwrap();
    let outcome = api
        .upload(
            &[upload_file(
                "b.json",
                vec![week_json(4, "CS-101", vec![lesson_json(3, "Physics", "Petrov", "2.101")])],
            )],
            None,
        )
        .unwrap();
    let token = outcome.token().unwrap();

    api.resolve_upload(token, &HashMap::from([(4, Resolution::Merge)]), None)
        .unwrap();

    let snapshot = api.snapshot().unwrap();
    assert_eq!(subjects_in_week(&snapshot, 4), vec!["Math", "Physics"]);
}

#[test]
fn test_discarded_upload_leaves_snapshot_untouched() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    api.upload(&[upload_file("a.json", vec![week_json(1, "CS-101", vec![math(1)])])], None)
        .unwrap();
    let token = api
        .upload(
            &[upload_file(
                "b.json",
                vec![week_json(1, "CS-101", vec![lesson_json(1, "Physics", "Petrov", "2.101")])],
            )],
            None,
        )
        .unwrap()
        .token()
        .unwrap();

    api.discard_upload(token).unwrap();

    assert_eq!(subjects_in_week(&api.snapshot().unwrap(), 1), vec!["Math"]);
    assert!(matches!(api.pending_upload(token), Err(ApiError::UnknownToken(_))));
    assert!(matches!(
        api.resolve_upload(Uuid::new_v4(), &HashMap::new(), None),
        Err(ApiError::UnknownToken(_))
    ));
}

#[test]
fn test_invalid_upload_is_rejected_as_a_whole() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    let good = upload_file("good.json", vec![week_json(1, "CS-101", vec![math(1)])]);
    let bad = upload_file("bad.json", vec![week_json(2, "", vec![math(1)])]);

    let err = api.upload(&[good, bad], None).unwrap_err();
    let issues = err.validation_issues().expect("应为校验错误");
    assert!(issues.iter().any(|i| i.source.as_deref() == Some("bad.json")));
    assert!(api.snapshot().unwrap().is_empty());
    assert!(api.recent_changes(10).unwrap().is_empty());
}

#[test]
fn test_slot_edit_blocks_on_overlap_and_records_history() {
    timetable_engine::logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    let mut week = week_json(1, "CS-101", vec![math(1)]);
    week["groups"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"group_name": "CS-102", "days": []}));
    api.upload(&[upload_file("a.json", vec![week])], None).unwrap();

    // Ivanov 在 CS-101 周一第 1 节已有课
    let edit = SlotEdit {
        group_name: "CS-102".to_string(),
        week: 1,
        weekday: 1,
        time: 1,
        lessons: vec![Lesson::new(1, "Algebra", LessonType::Practice)
            .with_teacher("Ivanov")
            .with_room("1.204")],
        ignore_overlaps: false,
        editor: Some("tester".to_string()),
    };

    match api.apply_edit(edit.clone()).unwrap() {
        EditOutcome::Blocked(report) => {
            assert_eq!(report.teacher_overlaps.len(), 1);
            assert!(report.room_overlaps.is_empty());
        }
        other => panic!("应被冲突阻止: {:?}", other),
    }
    assert!(api.group_changes("CS-102").unwrap().is_empty());

    let confirmed = SlotEdit {
        ignore_overlaps: true,
        ..edit
    };
    assert!(matches!(
        api.apply_edit(confirmed).unwrap(),
        EditOutcome::Applied { change_type: ChangeType::Create, .. }
    ));

    let history = api.group_changes("CS-102").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::Create);
    assert_eq!(history[0].new_lessons[0].subject, "Algebra");

    // 冲突已写入, 全量检测可见
    assert_eq!(api.detect_overlaps().unwrap().teacher_overlaps.len(), 1);

    // 1.204 被占用, 1.305 也被占用
    let free = api.free_rooms(1, 1, 1, &BuildingFilter::All).unwrap();
    assert!(free.is_empty());
    let free = api.free_rooms(1, 1, 2, &BuildingFilter::Building("1".into())).unwrap();
    let names: Vec<&str> = free.iter().map(|r| r.as_str()).collect();
    assert_eq!(names, vec!["1.204", "1.305"]);
}

#[test]
fn test_workload_over_persisted_snapshot() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    let api = &state.timetable_api;

    api.upload(
        &[upload_file(
            "a.json",
            vec![week_json(1, "CS-101", vec![math(1), math(2)]), week_json(2, "CS-101", vec![math(1)])],
        )],
        None,
    )
    .unwrap();

    let workload = api.teacher_workload("Ivanov").unwrap();
    assert_eq!(workload.totals.lectures, 3);
    assert_eq!(workload.total_hours, 6);
    assert_eq!(workload.lessons.len(), 3);

    assert!(matches!(api.teacher_workload("  "), Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_commit_survives_history_write_failure() {
    timetable_engine::logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path.clone()).unwrap();
    let api = &state.timetable_api;

    api.upload(&[upload_file("a.json", vec![week_json(2, "CS-101", vec![math(1)])])], None)
        .unwrap();
    let token = api
        .upload(
            &[upload_file(
                "b.json",
                vec![week_json(2, "CS-101", vec![lesson_json(1, "Physics", "Petrov", "2.101")])],
            )],
            None,
        )
        .unwrap()
        .token()
        .unwrap();

    // 历史表不可写时快照仍照常提交
    let conn = timetable_engine::db::open_sqlite_connection(&db_path).unwrap();
    conn.execute_batch("DROP TABLE timetable_history").unwrap();

    let summary = api
        .resolve_upload(token, &HashMap::from([(2, Resolution::Replace)]), Some("tester"))
        .unwrap();
    assert_eq!(summary.applied.get(&2), Some(&Resolution::Replace));
    assert_eq!(subjects_in_week(&api.snapshot().unwrap(), 2), vec!["Physics"]);

    let edit = SlotEdit {
        group_name: "CS-101".to_string(),
        week: 2,
        weekday: 1,
        time: 3,
        lessons: vec![Lesson::new(3, "Algebra", LessonType::Practice)
            .with_teacher("Sidorov")
            .with_room("3.110")],
        ignore_overlaps: false,
        editor: None,
    };
    assert!(matches!(api.apply_edit(edit).unwrap(), EditOutcome::Applied { .. }));
    assert_eq!(subjects_in_week(&api.snapshot().unwrap(), 2), vec!["Algebra", "Physics"]);

    let clean = api
        .upload(&[upload_file("c.json", vec![week_json(5, "CS-101", vec![math(1)])])], None)
        .unwrap();
    assert!(clean.is_committed());
}
