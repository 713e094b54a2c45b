use super::scoring::{score_slot, MoveContext};
use crate::config::EngineConfig;
use crate::domain::slot::Slot;
use crate::domain::timetable::{Lesson, Snapshot};
use crate::domain::transfer::TransferOption;
use crate::domain::types::{time_slots, FIRST_WEEKDAY, LAST_WEEKDAY};
use crate::engine::error::EngineResult;
use crate::engine::overlap::{check_slot_range, OverlapDetector};
use tracing::instrument;

// ==========================================
// TransferRecommender - 调课推荐引擎
// ==========================================
pub struct TransferRecommender {
    config: EngineConfig,
    detector: OverlapDetector,
}

impl TransferRecommender {
    pub fn new(config: EngineConfig) -> Self {
        let detector = OverlapDetector::from_config(&config);
        Self { config, detector }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 为一节课寻找调课候选
    ///
    /// # 参数
    /// - `group_name`: 课程所属组
    /// - `lesson`: 待调课程（主讲教师/主教室参与评分）
    /// - `current_week` / `current_weekday` / `current_time`: 当前位置
    ///
    /// # 返回
    /// - 分数 > 0 的候选, 按分数降序; 同分保持 周→星期→节次 枚举顺序
    #[instrument(skip(self, snapshot, lesson), fields(subject = %lesson.subject))]
    pub fn find_options(
        &self,
        snapshot: &Snapshot,
        group_name: &str,
        lesson: &Lesson,
        current_week: u32,
        current_weekday: u8,
        current_time: u8,
    ) -> EngineResult<Vec<TransferOption>> {
        check_slot_range(current_week, current_weekday, current_time)?;
        let occupancy = self.detector.occupancy(snapshot)?;

        let ctx = MoveContext {
            config: &self.config,
            group_name,
            teacher: lesson.primary_teacher(),
            room: lesson.primary_room(),
            current: Slot::new(current_week, current_weekday, current_time),
        };

        let mut weeks: Vec<u32> = snapshot
            .weeks
            .iter()
            .filter(|w| w.week_number >= current_week && w.has_lessons())
            .map(|w| w.week_number)
            .collect();
        weeks.sort_unstable();

        let mut options = Vec::new();
        for week in weeks {
            let first_weekday = if week == current_week {
                current_weekday
            } else {
                FIRST_WEEKDAY
            };

            for weekday in first_weekday..=LAST_WEEKDAY {
                for time in time_slots() {
                    let candidate = Slot::new(week, weekday, time);
                    if candidate == ctx.current {
                        continue;
                    }

                    let scored = score_slot(&ctx, &occupancy, &candidate);
                    if scored.total > 0 {
                        options.push(TransferOption {
                            week,
                            weekday,
                            time,
                            score: scored.total,
                            room: scored.room,
                            conflicts: scored.notes,
                        });
                    }
                }
            }
        }

        let candidates = options.len();
        // sort_by 为稳定排序
        options.sort_by(|a, b| b.score.cmp(&a.score));
        options.truncate(self.config.max_options);

        tracing::debug!(candidates, returned = options.len(), "调课候选计算完成");
        Ok(options)
    }
}
