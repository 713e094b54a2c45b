// ==========================================
// 课表一致性引擎 - 结构校验器
// ==========================================
// 职责: 在检测/推荐/合并之前校验快照与片段的结构完整性
// 检查:
// - 周次 ≥ 1, date_start ≤ date_end
// - 组名非空
// - 星期 1..=6, 节次 1..=8
// - (仅快照) 周次唯一 / 周内组名唯一 / 组内星期唯一
// 红线: 收集全部问题后一次性返回, 不做部分放行
// ==========================================

use crate::domain::slot::{is_valid_time, is_valid_weekday};
use crate::domain::timetable::{Lesson, Snapshot, Week};
use crate::engine::error::{EngineError, EngineResult, ValidationIssue};
use std::collections::HashSet;

/// 校验权威快照
pub fn validate_snapshot(snapshot: &Snapshot) -> EngineResult<()> {
    let mut issues = Vec::new();
    let mut seen_weeks = HashSet::new();

    for week in &snapshot.weeks {
        if !seen_weeks.insert(week.week_number) {
            issues.push(
                ValidationIssue::new("week_number", "快照中周次重复").in_week(week.week_number),
            );
        }

        check_week(week, &mut issues);

        let mut seen_groups = HashSet::new();
        for group in &week.groups {
            if !group.group_name.trim().is_empty() && !seen_groups.insert(group.group_name.as_str())
            {
                issues.push(
                    ValidationIssue::new("group_name", "同一周内组名重复")
                        .in_week(week.week_number)
                        .in_group(&group.group_name),
                );
            }

            let mut seen_days = HashSet::new();
            for day in &group.days {
                if !seen_days.insert(day.weekday) {
                    issues.push(
                        ValidationIssue::new("weekday", format!("星期 {} 重复出现", day.weekday))
                            .in_week(week.week_number)
                            .in_group(&group.group_name),
                    );
                }
            }
        }
    }

    finish(issues)
}

/// 校验待合并片段
///
/// 片段之间允许周次重复（由合并器归并）
pub fn validate_fragments(fragments: &[Week]) -> EngineResult<()> {
    let mut issues = Vec::new();

    for (idx, week) in fragments.iter().enumerate() {
        let before = issues.len();
        check_week(week, &mut issues);
        for issue in issues.iter_mut().skip(before) {
            issue.fragment = Some(idx);
        }
    }

    finish(issues)
}

/// 校验单个时间槽的待写入课程
pub fn validate_lessons(week: u32, weekday: u8, time: u8, lessons: &[Lesson]) -> EngineResult<()> {
    let mut issues = Vec::new();

    if week == 0 {
        issues.push(ValidationIssue::new("week", "周次必须 ≥ 1"));
    }
    if !is_valid_weekday(weekday) {
        issues.push(ValidationIssue::new("weekday", format!("星期越界: {}", weekday)).in_week(week));
    }
    if !is_valid_time(time) {
        issues.push(ValidationIssue::new("time", format!("节次越界: {}", time)).in_week(week));
    }
    for lesson in lessons {
        if lesson.time != time {
            issues.push(
                ValidationIssue::new(
                    "time",
                    format!("课程节次 {} 与目标节次 {} 不一致", lesson.time, time),
                )
                .in_week(week),
            );
        }
        if !lesson.has_subject() {
            issues.push(ValidationIssue::new("subject", "课程名称缺失").in_week(week));
        }
    }

    finish(issues)
}

fn check_week(week: &Week, issues: &mut Vec<ValidationIssue>) {
    if week.week_number == 0 {
        issues.push(ValidationIssue::new("week_number", "周次缺失或为 0"));
    }

    if week.date_start > week.date_end {
        issues.push(
            ValidationIssue::new(
                "date_start",
                format!("开始日期 {} 晚于结束日期 {}", week.date_start, week.date_end),
            )
            .in_week(week.week_number),
        );
    }

    for group in &week.groups {
        if group.group_name.trim().is_empty() {
            issues.push(ValidationIssue::new("group_name", "组名缺失").in_week(week.week_number));
            continue;
        }

        for day in &group.days {
            if !is_valid_weekday(day.weekday) {
                issues.push(
                    ValidationIssue::new("weekday", format!("星期越界: {}", day.weekday))
                        .in_week(week.week_number)
                        .in_group(&group.group_name),
                );
                continue;
            }

            for lesson in &day.lessons {
                if !is_valid_time(lesson.time) {
                    issues.push(
                        ValidationIssue::new("time", format!("节次越界: {}", lesson.time))
                            .in_week(week.week_number)
                            .in_group(&group.group_name),
                    );
                }
            }
        }
    }
}

fn finish(issues: Vec<ValidationIssue>) -> EngineResult<()> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(issues))
    }
}
