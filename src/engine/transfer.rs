// ==========================================
// 课表一致性引擎 - 调课推荐引擎
// ==========================================
// 职责: 为一节课寻找可调往的时间槽并评分
// 输入: 课表快照 (只读) + 组名 + 课程 + 当前位置
// 输出: 至多 max_options 个 TransferOption (分数降序)
// 搜索范围:
// - 周次 ≥ 当前周, 且该周至少有一节课
// - 当前周内星期 ≥ 当前星期, 其余周 1..=6
// - 节次 1..=8, 排除当前位置
// ==========================================

mod core;
mod scoring;


pub use self::core::TransferRecommender;
