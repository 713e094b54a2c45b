// ==========================================
// 课表一致性引擎 - 课表快照仓储
// ==========================================
// 职责: 权威快照的整体读取 / 整体写回
// 红线: 写回必须全有或全无（单事务）
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::timetable::{week_date, Group, Snapshot, Week};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SnapshotRepository Trait
// ==========================================
pub trait SnapshotRepository: Send + Sync {
    /// 读取完整快照（按周次升序）
    fn load(&self) -> RepositoryResult<Snapshot>;

    /// 用新快照整体替换权威快照
    fn replace(&self, snapshot: &Snapshot) -> RepositoryResult<()>;
}

// ==========================================
// SqliteSnapshotRepository - SQLite 实现
// ==========================================
pub struct SqliteSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnapshotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl SnapshotRepository for SqliteSnapshotRepository {
    fn load(&self) -> RepositoryResult<Snapshot> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT week_number, date_start, date_end, groups_json
             FROM timetable_week ORDER BY week_number",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut weeks = Vec::new();
        for row in rows {
            let (week_number, start, end, groups_json) = row?;
            let groups: Vec<Group> = serde_json::from_str(&groups_json)?;
            weeks.push(Week {
                week_number,
                date_start: parse_date("date_start", &start)?,
                date_end: parse_date("date_end", &end)?,
                groups,
            });
        }

        Ok(Snapshot::new(weeks))
    }

    fn replace(&self, snapshot: &Snapshot) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM timetable_week", [])?;
        for week in &snapshot.weeks {
            tx.execute(
                "INSERT INTO timetable_week (week_number, date_start, date_end, groups_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    week.week_number,
                    week.date_start.format("%Y-%m-%d").to_string(),
                    week.date_end.format("%Y-%m-%d").to_string(),
                    serde_json::to_string(&week.groups)?,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::debug!(weeks = snapshot.weeks.len(), "课表快照已写回");
        Ok(())
    }
}

fn parse_date(field: &str, raw: &str) -> RepositoryResult<chrono::NaiveDate> {
    week_date::parse(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("日期格式错误: {}", raw),
    })
}

// ==========================================
// InMemorySnapshotRepository - 内存实现
// ==========================================
// 用途: 测试与命令行一次性处理
#[derive(Default)]
pub struct InMemorySnapshotRepository {
    snapshot: Mutex<Snapshot>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn load(&self) -> RepositoryResult<Snapshot> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(guard.clone())
    }

    fn replace(&self, snapshot: &Snapshot) -> RepositoryResult<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        *guard = snapshot.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Day, Lesson};
    use crate::domain::types::LessonType;
    use chrono::NaiveDate;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn sample_snapshot() -> Snapshot {
        let date = |d| NaiveDate::from_ymd_opt(2025, 9, d).unwrap();
        Snapshot::new(vec![
            Week::new(2, date(8), date(13)),
            Week::new(1, date(1), date(6)).with_group(Group::new("CS-101").with_day(Day {
                weekday: 1,
                lessons: vec![Lesson::new(1, "Math", LessonType::Lecture)
                    .with_teacher("Ivanov")
                    .with_room("1.305")],
            })),
        ])
    }

    #[test]
    fn test_sqlite_replace_then_load() {
        let repo = SqliteSnapshotRepository::new(setup_test_db());
        assert!(repo.load().unwrap().is_empty());

        let snapshot = sample_snapshot();
        repo.replace(&snapshot).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.week_numbers().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(loaded.week(1), snapshot.week(1));
        assert_eq!(loaded.lesson_count(), 1);
    }

    #[test]
    fn test_sqlite_replace_drops_missing_weeks() {
        let repo = SqliteSnapshotRepository::new(setup_test_db());
        repo.replace(&sample_snapshot()).unwrap();

        let mut smaller = sample_snapshot();
        smaller.weeks.retain(|w| w.week_number == 2);
        repo.replace(&smaller).unwrap();

        assert_eq!(repo.load().unwrap().weeks.len(), 1);
    }

    #[test]
    fn test_sqlite_replace_is_all_or_nothing() {
        let repo = SqliteSnapshotRepository::new(setup_test_db());
        repo.replace(&sample_snapshot()).unwrap();

        // 周次重复触发主键冲突, 整个事务回滚
        let mut broken = sample_snapshot();
        broken.weeks.push(broken.weeks[0].clone());
        assert!(repo.replace(&broken).is_err());

        assert_eq!(repo.load().unwrap(), {
            let mut expected = sample_snapshot();
            expected.weeks.sort_by_key(|w| w.week_number);
            expected
        });
    }

    #[test]
    fn test_in_memory_repository() {
        let repo = InMemorySnapshotRepository::new();
        assert!(repo.load().unwrap().is_empty());

        repo.replace(&sample_snapshot()).unwrap();
        assert_eq!(repo.load().unwrap(), sample_snapshot());
    }
}
