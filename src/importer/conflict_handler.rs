// ==========================================
// 课表一致性引擎 - 周次冲突处理器实现
// ==========================================
// 职责: 检测同一来源内/跨批次（与现有课表）重复的周次
// ==========================================

use crate::domain::reconcile::{IncomingFragment, WeekCollision};
use crate::importer::importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    fn detect_duplicates(&self, fragment: &IncomingFragment) -> Vec<(usize, u32)> {
        let mut first_occurrence: HashMap<u32, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (idx, week) in fragment.weeks.iter().enumerate() {
            if first_occurrence.contains_key(&week.week_number) {
                duplicates.push((idx, week.week_number));
            } else {
                first_occurrence.insert(week.week_number, idx);
            }
        }

        duplicates
    }

    fn detect_cross_batch_duplicates(
        &self,
        incoming: &[IncomingFragment],
        existing: &BTreeSet<u32>,
    ) -> Vec<WeekCollision> {
        let mut collisions: BTreeMap<u32, WeekCollision> = BTreeMap::new();

        for fragment in incoming {
            for week in fragment
                .weeks
                .iter()
                .filter(|w| existing.contains(&w.week_number))
            {
                let entry = collisions
                    .entry(week.week_number)
                    .or_insert_with(|| WeekCollision {
                        week_number: week.week_number,
                        date_start: week.date_start,
                        date_end: week.date_end,
                        sources: Vec::new(),
                    });
                if !entry.sources.contains(&fragment.source) {
                    entry.sources.push(fragment.source.clone());
                }
            }
        }

        collisions.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::Week;
    use chrono::NaiveDate;

    fn week(n: u32) -> Week {
        let d = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        Week::new(n, d, d)
    }

    #[test]
    fn test_detect_duplicates_none() {
        let handler = ConflictHandler;
        let fragment = IncomingFragment::new("a.json", vec![week(1), week(2)]);

        assert!(handler.detect_duplicates(&fragment).is_empty());
    }

    #[test]
    fn test_detect_duplicates_found() {
        let handler = ConflictHandler;
        let fragment = IncomingFragment::new("a.json", vec![week(1), week(2), week(1), week(1)]);

        let duplicates = handler.detect_duplicates(&fragment);

        assert_eq!(duplicates, vec![(2, 1), (3, 1)]);
    }

    #[test]
    fn test_detect_cross_batch_duplicates() {
        let handler = ConflictHandler;
        let incoming = vec![
            IncomingFragment::new("b.json", vec![week(5), week(3)]),
            IncomingFragment::new("a.json", vec![week(3), week(9)]),
        ];
        let existing = BTreeSet::from([3, 5, 7]);

        let collisions = handler.detect_cross_batch_duplicates(&incoming, &existing);

        let weeks: Vec<u32> = collisions.iter().map(|c| c.week_number).collect();
        assert_eq!(weeks, vec![3, 5]);
        assert_eq!(collisions[0].sources, vec!["b.json", "a.json"]);
        assert_eq!(collisions[1].sources, vec!["b.json"]);
    }
}
