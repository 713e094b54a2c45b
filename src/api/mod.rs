// ==========================================
// 课表一致性引擎 - API 层
// ==========================================
// 职责: 提供绑定仓储的业务接口, 供命令行/外部服务调用
// ==========================================

pub mod error;
pub mod timetable_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use timetable_api::TimetableApi;
