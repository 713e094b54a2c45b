// ==========================================
// 课表一致性引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::TimetableApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{HistoryRepository, SqliteSnapshotRepository};

/// 应用状态
///
/// 包含 API 实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 课表 API
    pub timetable_api: Arc<TimetableApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 修改历史仓储（用于审计追踪）
    pub history_repo: Arc<HistoryRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 从 config_kv 加载引擎配置
    /// 3. 创建仓储与 API 实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let engine_config = config_manager
            .load_engine_config()
            .map_err(|e| format!("无法加载引擎配置: {}", e))?;
        tracing::info!(
            locale = %engine_config.locale,
            max_options = engine_config.max_options,
            ignored_rooms = engine_config.ignored_rooms.len(),
            "引擎配置已加载"
        );

        // ==========================================
        // Repository / API
        // ==========================================
        let snapshot_repo = Arc::new(SqliteSnapshotRepository::new(conn.clone()));
        let history_repo = Arc::new(HistoryRepository::new(conn));

        let timetable_api = Arc::new(
            TimetableApi::new(snapshot_repo, engine_config).with_history(history_repo.clone()),
        );

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            timetable_api,
            config_manager,
            history_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 TIMETABLE_ENGINE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("TIMETABLE_ENGINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./timetable_engine.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("timetable-engine");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("timetable_engine.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_on_fresh_db() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db_path = file.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.timetable_api.snapshot().unwrap().is_empty());
        assert_eq!(state.timetable_api.config().max_options, 5);
    }

    #[test]
    fn test_config_overrides_reach_api() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db_path = file.path().to_str().unwrap().to_string();

        {
            let state = AppState::new(db_path.clone()).unwrap();
            state
                .config_manager
                .set_global_config_value("transfer.max_options", "3")
                .unwrap();
        }

        let state = AppState::new(db_path).unwrap();
        assert_eq!(state.timetable_api.config().max_options, 3);
    }
}
