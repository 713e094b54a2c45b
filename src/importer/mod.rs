// ==========================================
// 课表一致性引擎 - 导入层
// ==========================================
// 职责: 上传文件解析为片段, 周次重复检测
// 支持: JSON (UTF-8)
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod error;
pub mod file_parser;
pub mod importer_trait;

// 重导出核心类型
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use error::{ImportError, ImportResult};
pub use file_parser::JsonFragmentParser;

// 重导出 Trait 接口
pub use importer_trait::{ConflictHandler, FileParser};
