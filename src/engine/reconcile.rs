// ==========================================
// 课表一致性引擎 - 上传冲突处理协调器
// ==========================================
// 状态流转:
//   Idle → PendingConflictCheck → Clean → Committed
//                               → HasConflicts → AwaitingResolution → Resolved → Committed
// 规则:
// - 上传周次在现有课表中已存在 = 周次冲突, 暂存并返回令牌
// - 决策: skip 保留现有 / replace 保留上传 / merge 两者合并
// - 未给出决策的冲突周按 skip 处理
// 红线: 提交全有或全无; 暂存条目在提交前即被取出, 成功失败都不会残留
// ==========================================

mod core;


pub use self::core::ReconciliationCoordinator;
