// ==========================================
// 课表一致性引擎 - 配置层
// ==========================================
// 职责: 引擎参数定义与持久化覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config::{EngineConfig, TransferWeights};
