// ==========================================
// 课表一致性引擎 - 引擎层
// ==========================================
// 职责: 冲突检测、调课推荐、周课表合并、上传冲突协调
// 红线: 引擎不拼 SQL, 快照一律显式传入（无全局状态）
// ==========================================

pub mod editor;
pub mod error;
pub mod merge;
pub mod overlap;
pub mod reconcile;
pub mod rooms;
pub mod search;
pub mod transfer;
pub mod validator;
pub mod workload;

// 重导出核心引擎
pub use editor::{EditOutcome, SlotEdit, SlotEditor};
pub use error::{EngineError, EngineResult, ValidationIssue};
pub use merge::WeekMerger;
pub use overlap::{OverlapDetector, SlotOccupancy};
pub use reconcile::ReconciliationCoordinator;
pub use rooms::{BuildingFilter, RoomFinder};
pub use search::{
    closest_week, room_timetable, search_timetable, subjects_by_group, teacher_timetable,
    unique_values, ProjectedLesson, ResourceTimetable, SearchHit, SearchQuery, SearchResult,
    UniqueValues,
};
pub use transfer::TransferRecommender;
pub use validator::{validate_fragments, validate_lessons, validate_snapshot};
pub use workload::{teacher_workload, LessonCounts, SubjectWorkload, TeacherLesson, TeacherWorkload};
