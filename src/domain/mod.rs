// ==========================================
// 课表一致性引擎 - 领域模型层
// ==========================================
// 职责: 定义课表实体、时间槽、冲突、合并结构
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod history;
pub mod overlap;
pub mod reconcile;
pub mod slot;
pub mod timetable;
pub mod transfer;
pub mod types;

// 重导出核心类型
pub use history::{ChangeRecord, LessonSummary};
pub use overlap::{Conflict, LessonOccurrence, OverlapReport};
pub use reconcile::{
    BeginOutcome, IncomingFragment, MergeDiscrepancy, MergeReport, PendingReconciliation,
    ResolutionSummary, WeekCollision,
};
pub use slot::Slot;
pub use transfer::TransferOption;
pub use timetable::{
    Day, Group, Lesson, RoomName, RoomRef, Snapshot, TeacherName, TeacherRef, Week,
};
pub use types::{ChangeType, ConflictKind, LessonType, Resolution};
