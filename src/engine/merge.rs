// ==========================================
// 课表一致性引擎 - 周课表合并器
// ==========================================
// 职责: 将多个片段中同一周次的数据归并为一个 Week
// 规则:
// - 按周次分组, 日期取该周第一个片段
// - 每个组预置星期 1..=6 六个空日
// - 课程以 (节次, 小组, 课程名) 去重, 先到者保留
// - 组按首次出现顺序, 周按周次升序
// 红线: 任一片段结构不合法则整批拒绝
// ==========================================

use crate::domain::reconcile::{MergeDiscrepancy, MergeReport};
use crate::domain::timetable::{Day, Group, Week};
use crate::domain::types::weekdays;
use crate::engine::error::EngineResult;
use crate::engine::validator::validate_fragments;
use std::collections::BTreeMap;
use tracing::instrument;

// ==========================================
// WeekMerger - 周课表合并器
// ==========================================
#[derive(Debug, Default)]
pub struct WeekMerger;

impl WeekMerger {
    pub fn new() -> Self {
        Self
    }

    /// 合并片段, 只返回合并后的周
    pub fn merge_weeks(&self, fragments: Vec<Week>) -> EngineResult<Vec<Week>> {
        Ok(self.merge_with_report(fragments)?.weeks)
    }

    /// 合并片段并返回差异报告
    ///
    /// # 返回
    /// - weeks: 每个周次一个 Week（周次升序）
    /// - discrepancies: 去重时被丢弃且内容与保留者不同的课程
    #[instrument(skip_all, fields(fragments = fragments.len()))]
    pub fn merge_with_report(&self, fragments: Vec<Week>) -> EngineResult<MergeReport> {
        validate_fragments(&fragments)?;

        let mut by_number: BTreeMap<u32, WeekAccumulator> = BTreeMap::new();
        let mut discrepancies = Vec::new();

        for fragment in fragments {
            let acc = by_number
                .entry(fragment.week_number)
                .or_insert_with(|| WeekAccumulator::new(&fragment));

            if acc.week.date_start != fragment.date_start || acc.week.date_end != fragment.date_end {
                tracing::warn!(
                    week_number = fragment.week_number,
                    kept_start = %acc.week.date_start,
                    kept_end = %acc.week.date_end,
                    other_start = %fragment.date_start,
                    other_end = %fragment.date_end,
                    "同一周次的片段日期不一致, 采用首个片段日期"
                );
            }

            for group in fragment.groups {
                acc.absorb_group(group, &mut discrepancies);
            }
        }

        let weeks: Vec<Week> = by_number.into_values().map(|acc| acc.week).collect();

        if !discrepancies.is_empty() {
            tracing::warn!(count = discrepancies.len(), "合并时丢弃了内容不同的重复课程");
        }
        tracing::info!(weeks = weeks.len(), "周课表合并完成");

        Ok(MergeReport {
            weeks,
            discrepancies,
        })
    }
}

// ==========================================
// WeekAccumulator - 单周累加器
// ==========================================
struct WeekAccumulator {
    week: Week,
}

impl WeekAccumulator {
    fn new(first: &Week) -> Self {
        Self {
            week: Week::new(first.week_number, first.date_start, first.date_end),
        }
    }

    fn group_slot(&mut self, group_name: &str) -> &mut Group {
        let idx = match self
            .week
            .groups
            .iter()
            .position(|g| g.group_name == group_name)
        {
            Some(idx) => idx,
            None => {
                let mut group = Group::new(group_name);
                group.days = weekdays().map(Day::empty).collect();
                self.week.groups.push(group);
                self.week.groups.len() - 1
            }
        };
        &mut self.week.groups[idx]
    }

    fn absorb_group(&mut self, incoming: Group, discrepancies: &mut Vec<MergeDiscrepancy>) {
        let week_number = self.week.week_number;
        let group_name = incoming.group_name.clone();
        let target = self.group_slot(&group_name);

        for day in incoming.days {
            // 星期已由校验保证在 1..=6, 骨架中必然存在
            let Some(existing) = target.day_mut(day.weekday) else {
                continue;
            };

            for lesson in day.lessons {
                let duplicate = existing
                    .lessons
                    .iter()
                    .find(|kept| kept.merge_key() == lesson.merge_key());

                match duplicate {
                    None => existing.lessons.push(lesson),
                    Some(kept) if kept.same_content(&lesson) => {}
                    Some(kept) => discrepancies.push(MergeDiscrepancy {
                        week_number,
                        group_name: group_name.clone(),
                        weekday: day.weekday,
                        time: lesson.time,
                        subgroup: lesson.subgroup,
                        subject: lesson.subject.clone(),
                        kept: kept.clone(),
                        dropped: lesson,
                    }),
                }
            }
        }
    }
}
