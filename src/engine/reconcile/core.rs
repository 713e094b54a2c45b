use crate::domain::reconcile::{
    BeginOutcome, IncomingFragment, PendingReconciliation, ResolutionSummary,
};
use crate::domain::timetable::{Snapshot, Week};
use crate::domain::types::Resolution;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::merge::WeekMerger;
use crate::engine::validator::validate_fragments;
use crate::importer::{ConflictHandler, ConflictHandlerImpl};
use crate::repository::error::RepositoryError;
use crate::repository::snapshot_repo::SnapshotRepository;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// ReconciliationCoordinator - 冲突处理协调器
// ==========================================
pub struct ReconciliationCoordinator {
    repository: Arc<dyn SnapshotRepository>,
    merger: WeekMerger,
    // 暂存区: 令牌 → 待处理上传
    pending: Mutex<HashMap<Uuid, PendingReconciliation>>,
    // 单写者: 读取-合并-写回 期间持有
    write_lock: Mutex<()>,
}

impl ReconciliationCoordinator {
    pub fn new(repository: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            repository,
            merger: WeekMerger::new(),
            pending: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    // ==========================================
    // 上传
    // ==========================================

    /// 接收一批上传片段
    ///
    /// # 返回
    /// - Committed: 无周次冲突, 已与现有课表合并并提交
    /// - AwaitingResolution: 有冲突, 权威快照未改动, 需调用 resolve
    #[instrument(skip_all, fields(sources = incoming.len()))]
    pub fn begin(&self, incoming: Vec<IncomingFragment>) -> EngineResult<BeginOutcome> {
        validate_incoming(&incoming)?;

        let _writer = self.lock_writer()?;
        let current = self.repository.load()?;
        let existing = current.week_numbers();

        let conflicts = ConflictHandlerImpl.detect_cross_batch_duplicates(&incoming, &existing);
        if conflicts.is_empty() {
            let fragments = current
                .weeks
                .into_iter()
                .chain(incoming.into_iter().flat_map(|f| f.weeks))
                .collect();
            let report = self.merger.merge_with_report(fragments)?;
            self.repository.replace(&Snapshot::new(report.weeks.clone()))?;

            tracing::info!(weeks = report.weeks.len(), "上传无周次冲突, 已直接提交");
            return Ok(BeginOutcome::Committed(report));
        }

        let token = Uuid::new_v4();
        let entry = PendingReconciliation {
            token,
            incoming,
            conflicts: conflicts.clone(),
            created_at: Utc::now(),
        };
        self.lock_pending()?.insert(token, entry);

        tracing::info!(
            %token,
            collisions = conflicts.len(),
            "上传存在周次冲突, 等待人工决策"
        );
        Ok(BeginOutcome::AwaitingResolution { token, conflicts })
    }

    // ==========================================
    // 决策提交
    // ==========================================

    /// 按决策表合并并提交
    ///
    /// # 参数
    /// - `decisions`: 冲突周 → 决策; 缺省为 skip, 非冲突周的条目被忽略
    ///
    /// # 错误
    /// - UnknownToken: 令牌不存在（已处理/已丢弃/并发处理中被他人取走）
    #[instrument(skip(self, decisions))]
    pub fn resolve(
        &self,
        token: Uuid,
        decisions: &HashMap<u32, Resolution>,
    ) -> EngineResult<ResolutionSummary> {
        // 先取出暂存条目: 同一令牌只能被处理一次
        let entry = self
            .lock_pending()?
            .remove(&token)
            .ok_or(EngineError::UnknownToken(token))?;

        let _writer = self.lock_writer()?;
        let current = self.repository.load()?;

        // 冲突集按提交时的现有周重新计算
        let existing = current.week_numbers();
        let colliding: BTreeSet<u32> = entry
            .incoming
            .iter()
            .flat_map(|f| f.weeks.iter().map(|w| w.week_number))
            .filter(|week| existing.contains(week))
            .collect();

        let stale: Vec<u32> = entry
            .colliding_weeks()
            .collect::<BTreeSet<u32>>()
            .symmetric_difference(&colliding)
            .copied()
            .collect();
        if !stale.is_empty() {
            tracing::warn!(%token, weeks = ?stale, "暂存后冲突周已变化, 按提交时的现有周重新判定");
        }

        for week in decisions.keys().filter(|w| !colliding.contains(*w)) {
            tracing::warn!(week, "决策针对非冲突周, 已忽略");
        }

        let applied: BTreeMap<u32, Resolution> = colliding
            .iter()
            .map(|week| (*week, decisions.get(week).copied().unwrap_or_default()))
            .collect();

        let fragments = assemble(current.weeks, entry.incoming, &applied);
        let report = self.merger.merge_with_report(fragments)?;
        self.repository.replace(&Snapshot::new(report.weeks.clone()))?;

        tracing::info!(
            %token,
            weeks = report.weeks.len(),
            decisions = ?applied,
            "冲突决策已提交"
        );

        Ok(ResolutionSummary {
            weeks: report.weeks,
            applied,
            discrepancies: report.discrepancies,
        })
    }

    // ==========================================
    // 暂存区管理
    // ==========================================

    /// 丢弃暂存条目（放弃本次上传）
    pub fn discard(&self, token: Uuid) -> EngineResult<()> {
        self.lock_pending()?
            .remove(&token)
            .map(|_| ())
            .ok_or(EngineError::UnknownToken(token))
    }

    /// 查看暂存条目
    pub fn pending(&self, token: Uuid) -> EngineResult<Option<PendingReconciliation>> {
        Ok(self.lock_pending()?.get(&token).cloned())
    }

    pub fn pending_count(&self) -> EngineResult<usize> {
        Ok(self.lock_pending()?.len())
    }

    /// 清理超过指定时长的暂存条目
    ///
    /// # 返回
    /// 被清理的条目数
    pub fn purge_older_than(&self, max_age: Duration) -> EngineResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut pending = self.lock_pending()?;
        let before = pending.len();
        pending.retain(|_, entry| entry.created_at > cutoff);
        let purged = before - pending.len();

        if purged > 0 {
            tracing::info!(purged, "已清理过期的冲突暂存");
        }
        Ok(purged)
    }

    /// 持有写锁执行一次 读取-修改-写回
    ///
    /// 供时间槽编辑等其他写入路径使用, 与上传提交串行
    pub fn with_writer<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn SnapshotRepository) -> EngineResult<T>,
    {
        let _writer = self.lock_writer()?;
        f(self.repository.as_ref())
    }

    fn lock_pending(&self) -> EngineResult<MutexGuard<'_, HashMap<Uuid, PendingReconciliation>>> {
        self.pending
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    fn lock_writer(&self) -> EngineResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }
}

/// 逐个来源校验, 问题附带来源名
fn validate_incoming(incoming: &[IncomingFragment]) -> EngineResult<()> {
    let mut issues = Vec::new();
    for fragment in incoming {
        if let Err(err) = validate_fragments(&fragment.weeks) {
            match err {
                EngineError::Validation(found) => issues.extend(
                    found
                        .into_iter()
                        .map(|issue| issue.in_source(fragment.source.clone())),
                ),
                other => return Err(other),
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(issues))
    }
}

/// 按决策挑选参与合并的周（现有在前, 合并时现有课程优先保留）
fn assemble(
    current: Vec<Week>,
    incoming: Vec<IncomingFragment>,
    applied: &BTreeMap<u32, Resolution>,
) -> Vec<Week> {
    let keep_current = |week: &Week| applied.get(&week.week_number) != Some(&Resolution::Replace);
    let keep_incoming = |week: &Week| applied.get(&week.week_number) != Some(&Resolution::Skip);

    current
        .into_iter()
        .filter(|w| keep_current(w))
        .chain(
            incoming
                .into_iter()
                .flat_map(|f| f.weeks)
                .filter(|w| keep_incoming(w)),
        )
        .collect()
}
