// ==========================================
// 课表一致性引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 课表冲突检测 / 调课推荐 / 上传合并与冲突处理
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "ru");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 上传文件
pub mod importer;

// 配置层 - 引擎参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ChangeType, ConflictKind, LessonType, Resolution};

// 领域实体
pub use domain::{
    BeginOutcome, ChangeRecord, Conflict, Day, Group, IncomingFragment, Lesson, OverlapReport,
    RoomName, Slot, Snapshot, TeacherName, TransferOption, Week,
};

// 引擎
pub use engine::{
    OverlapDetector, ReconciliationCoordinator, RoomFinder, SlotEditor, TransferRecommender,
    WeekMerger,
};

// API
pub use api::TimetableApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "课表一致性引擎";
