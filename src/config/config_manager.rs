// ==========================================
// 课表一致性引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 规则: 缺失或格式错误的配置项回退默认值并告警
// ==========================================

use crate::config::engine_config::{EngineConfig, TransferWeights};
use crate::db::open_sqlite_connection;
use crate::domain::timetable::RoomName;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置（按键升序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    // ===== 引擎参数 =====

    /// 组装引擎参数（未配置项使用默认值）
    pub fn load_engine_config(&self) -> RepositoryResult<EngineConfig> {
        let defaults = EngineConfig::default();
        let w = TransferWeights::default();

        let weights = TransferWeights {
            same_week: self.get_parsed(config_keys::WEIGHT_SAME_WEEK, w.same_week)?,
            same_weekday: self.get_parsed(config_keys::WEIGHT_SAME_WEEKDAY, w.same_weekday)?,
            adjacent_weekday: self
                .get_parsed(config_keys::WEIGHT_ADJACENT_WEEKDAY, w.adjacent_weekday)?,
            adjacent_time: self.get_parsed(config_keys::WEIGHT_ADJACENT_TIME, w.adjacent_time)?,
            room_substitute: self
                .get_parsed(config_keys::WEIGHT_ROOM_SUBSTITUTE, w.room_substitute)?,
            room_busy: self.get_parsed(config_keys::PENALTY_ROOM_BUSY, w.room_busy)?,
            teacher_busy: self.get_parsed(config_keys::PENALTY_TEACHER_BUSY, w.teacher_busy)?,
            window: self.get_parsed(config_keys::PENALTY_WINDOW, w.window)?,
        };

        let max_options = match self.get_parsed(config_keys::MAX_OPTIONS, defaults.max_options)? {
            0 => {
                tracing::warn!(config_key = config_keys::MAX_OPTIONS, "候选上限不能为 0，使用默认值");
                defaults.max_options
            }
            n => n,
        };

        let building_separator =
            self.get_parsed(config_keys::BUILDING_SEPARATOR, defaults.building_separator)?;

        let ignored_rooms = match self.get_global_config_value(config_keys::IGNORED_ROOMS)? {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(RoomName::from)
                .collect(),
            None => defaults.ignored_rooms,
        };

        let locale = match self.get_global_config_value(config_keys::LOCALE)? {
            Some(raw) if crate::i18n::is_supported_locale(raw.trim()) => raw.trim().to_string(),
            Some(raw) => {
                tracing::warn!(
                    config_key = config_keys::LOCALE,
                    raw_value = %raw,
                    "不支持的语言，使用默认值"
                );
                defaults.locale
            }
            None => defaults.locale,
        };

        Ok(EngineConfig {
            weights,
            max_options,
            building_separator,
            ignored_rooms,
            locale,
        })
    }

    /// 读取并解析配置值，格式错误时告警并回退默认值
    fn get_parsed<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };

        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 调课评分
    pub const WEIGHT_SAME_WEEK: &str = "transfer.weight.same_week";
    pub const WEIGHT_SAME_WEEKDAY: &str = "transfer.weight.same_weekday";
    pub const WEIGHT_ADJACENT_WEEKDAY: &str = "transfer.weight.adjacent_weekday";
    pub const WEIGHT_ADJACENT_TIME: &str = "transfer.weight.adjacent_time";
    pub const WEIGHT_ROOM_SUBSTITUTE: &str = "transfer.weight.room_substitute";
    pub const PENALTY_ROOM_BUSY: &str = "transfer.penalty.room_busy";
    pub const PENALTY_TEACHER_BUSY: &str = "transfer.penalty.teacher_busy";
    pub const PENALTY_WINDOW: &str = "transfer.penalty.window";

    // 调课候选
    pub const MAX_OPTIONS: &str = "transfer.max_options";
    pub const BUILDING_SEPARATOR: &str = "rooms.building_separator";

    // 冲突检测: 逗号分隔的共享场地
    pub const IGNORED_ROOMS: &str = "overlap.ignored_rooms";

    // 界面语言 (ru / en)
    pub const LOCALE: &str = "locale";
}
