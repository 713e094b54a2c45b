// ==========================================
// 课表一致性引擎 - 修改历史数据仓储
// ==========================================
// 红线: 所有写入必须记录
// ==========================================

use crate::domain::history::{ChangeRecord, LessonSummary};
use crate::domain::types::ChangeType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// HistoryRepository - 修改历史仓储
// ==========================================
pub struct HistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条修改记录
    ///
    /// # 返回
    /// - `Ok(record_id)`
    pub fn append(&self, record: &ChangeRecord) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO timetable_history (
                record_id, recorded_at, change_type, editor,
                group_name, week, weekday, time,
                old_lessons_json, new_lessons_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.record_id,
                record.recorded_at.format(TS_FORMAT).to_string(),
                record.change_type.to_string(),
                record.editor,
                record.group_name,
                record.week,
                record.weekday,
                record.time,
                serde_json::to_string(&record.old_lessons)?,
                serde_json::to_string(&record.new_lessons)?,
                record.detail,
            ],
        )?;

        Ok(record.record_id.clone())
    }

    /// 最近的修改记录（新→旧）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ChangeRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, recorded_at, change_type, editor,
                   group_name, week, weekday, time,
                   old_lessons_json, new_lessons_json, detail
            FROM timetable_history
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let raw = stmt
            .query_map(params![limit as i64], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRecord::into_record).collect()
    }

    /// 指定组的修改记录（新→旧）
    pub fn list_for_group(&self, group_name: &str) -> RepositoryResult<Vec<ChangeRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, recorded_at, change_type, editor,
                   group_name, week, weekday, time,
                   old_lessons_json, new_lessons_json, detail
            FROM timetable_history
            WHERE group_name = ?1
            ORDER BY recorded_at DESC, rowid DESC
            "#,
        )?;

        let raw = stmt
            .query_map(params![group_name], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRecord::into_record).collect()
    }
}

// 行原始值, 解析 JSON/时间/枚举在连接之外完成
struct RawRecord {
    record_id: String,
    recorded_at: String,
    change_type: String,
    editor: Option<String>,
    group_name: Option<String>,
    week: Option<u32>,
    weekday: Option<u8>,
    time: Option<u8>,
    old_lessons_json: String,
    new_lessons_json: String,
    detail: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_id: row.get(0)?,
            recorded_at: row.get(1)?,
            change_type: row.get(2)?,
            editor: row.get(3)?,
            group_name: row.get(4)?,
            week: row.get(5)?,
            weekday: row.get(6)?,
            time: row.get(7)?,
            old_lessons_json: row.get(8)?,
            new_lessons_json: row.get(9)?,
            detail: row.get(10)?,
        })
    }

    fn into_record(self) -> RepositoryResult<ChangeRecord> {
        let recorded_at = NaiveDateTime::parse_from_str(&self.recorded_at, TS_FORMAT).map_err(
            |e| RepositoryError::FieldValueError {
                field: "recorded_at".to_string(),
                message: e.to_string(),
            },
        )?;
        let change_type = self
            .change_type
            .parse::<ChangeType>()
            .map_err(|message| RepositoryError::FieldValueError {
                field: "change_type".to_string(),
                message,
            })?;
        let old_lessons: Vec<LessonSummary> = serde_json::from_str(&self.old_lessons_json)?;
        let new_lessons: Vec<LessonSummary> = serde_json::from_str(&self.new_lessons_json)?;

        Ok(ChangeRecord {
            record_id: self.record_id,
            recorded_at,
            change_type,
            editor: self.editor,
            group_name: self.group_name,
            week: self.week,
            weekday: self.weekday,
            time: self.time,
            old_lessons,
            new_lessons,
            detail: self.detail,
        })
    }
}
