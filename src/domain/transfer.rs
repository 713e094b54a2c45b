// ==========================================
// 课表一致性引擎 - 调课候选
// ==========================================

use crate::domain::slot::Slot;
use crate::domain::timetable::RoomName;
use serde::{Deserialize, Serialize};

/// 调课候选时间槽（附评分与说明）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOption {
    pub week: u32,
    pub weekday: u8,
    pub time: u8,
    pub score: i32,
    pub room: Option<RoomName>, // 原教室 或 同楼栋替代教室
    pub conflicts: Vec<String>, // 已本地化的冲突说明
}

impl TransferOption {
    pub fn slot(&self) -> Slot {
        Slot::new(self.week, self.weekday, self.time)
    }
}
