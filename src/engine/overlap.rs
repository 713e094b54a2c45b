// ==========================================
// 课表一致性引擎 - 冲突检测引擎
// ==========================================
// 职责: 扫描快照中已存在的教室/教师冲突, 以及编辑前的实时冲突预检
// 输入: 课表快照 (只读)
// 输出: OverlapReport (按 周→星期→节次 升序)
// 规则:
// - 教室冲突: 同一 (星期, 节次, 教室) 出现 ≥2 个不同课程
// - 教师冲突: 同一 (星期, 节次, 教师) 出现 ≥2 个不同 (课程, 教室) 组合
// - 缺少课程名/教室/教师的课程不参与对应比较
// ==========================================

mod core;
mod occupancy;


pub(crate) use self::core::check_slot_range;
pub use self::core::OverlapDetector;
pub use occupancy::SlotOccupancy;
