// ==========================================
// 课表一致性引擎 - 课表 API
// ==========================================
// 职责: 绑定快照仓储, 对外提供检测/推荐/合并/上传协调/编辑/查询
// 并发: 读取取快照副本; 写入经协调器写锁串行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::EngineConfig;
use crate::domain::history::ChangeRecord;
use crate::domain::overlap::OverlapReport;
use crate::domain::reconcile::{
    BeginOutcome, IncomingFragment, PendingReconciliation, ResolutionSummary, WeekCollision,
};
use crate::domain::timetable::{Lesson, RoomName, Snapshot, TeacherName, Week};
use crate::domain::transfer::TransferOption;
use crate::domain::types::Resolution;
use crate::engine::{
    closest_week, room_timetable, search_timetable, subjects_by_group, teacher_timetable,
    teacher_workload, unique_values, BuildingFilter, EditOutcome, OverlapDetector,
    ReconciliationCoordinator, ResourceTimetable, RoomFinder, SearchQuery, SearchResult, SlotEdit,
    SlotEditor, TeacherWorkload, TransferRecommender, UniqueValues, WeekMerger,
};
use crate::i18n::t_in;
use crate::importer::{ConflictHandler, ConflictHandlerImpl, FileParser, JsonFragmentParser};
use crate::repository::history_repo::HistoryRepository;
use crate::repository::snapshot_repo::SnapshotRepository;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// TimetableApi
// ==========================================
pub struct TimetableApi {
    snapshots: Arc<dyn SnapshotRepository>,
    history: Option<Arc<HistoryRepository>>,
    config: EngineConfig,
    detector: OverlapDetector,
    recommender: TransferRecommender,
    editor: SlotEditor,
    rooms: RoomFinder,
    coordinator: ReconciliationCoordinator,
}

impl TimetableApi {
    pub fn new(snapshots: Arc<dyn SnapshotRepository>, config: EngineConfig) -> Self {
        Self {
            detector: OverlapDetector::from_config(&config),
            recommender: TransferRecommender::new(config.clone()),
            editor: SlotEditor::new(&config),
            rooms: RoomFinder::new(&config),
            coordinator: ReconciliationCoordinator::new(snapshots.clone()),
            snapshots,
            history: None,
            config,
        }
    }

    /// 启用修改历史记录
    pub fn with_history(mut self, history: Arc<HistoryRepository>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 当前权威快照（副本）
    pub fn snapshot(&self) -> ApiResult<Snapshot> {
        Ok(self.snapshots.load()?)
    }

    // ==========================================
    // 冲突检测
    // ==========================================

    pub fn detect_overlaps(&self) -> ApiResult<OverlapReport> {
        let snapshot = self.snapshot()?;
        Ok(self.detector.find_all(&snapshot)?)
    }

    pub fn check_overlaps(
        &self,
        week: u32,
        weekday: u8,
        time: u8,
        candidates: &[Lesson],
        group_name: Option<&str>,
    ) -> ApiResult<OverlapReport> {
        let snapshot = self.snapshot()?;
        Ok(self
            .detector
            .check(&snapshot, week, weekday, time, candidates, group_name)?)
    }

    // ==========================================
    // 调课推荐
    // ==========================================

    pub fn find_transfer_options(
        &self,
        group_name: &str,
        lesson: &Lesson,
        week: u32,
        weekday: u8,
        time: u8,
    ) -> ApiResult<Vec<TransferOption>> {
        let snapshot = self.snapshot()?;
        Ok(self
            .recommender
            .find_options(&snapshot, group_name, lesson, week, weekday, time)?)
    }

    // ==========================================
    // 合并与上传
    // ==========================================

    /// 纯合并（不读写仓储）
    pub fn merge_weeks(&self, fragments: Vec<Week>) -> ApiResult<Vec<Week>> {
        Ok(WeekMerger::new().merge_weeks(fragments)?)
    }

    /// 解析一个上传文件
    pub fn parse_upload(&self, source: &str, bytes: &[u8]) -> ApiResult<IncomingFragment> {
        let fragment = JsonFragmentParser.parse(source, bytes)?;

        let duplicates = ConflictHandlerImpl.detect_duplicates(&fragment);
        if !duplicates.is_empty() {
            tracing::warn!(
                source,
                duplicates = ?duplicates,
                "上传文件内周次重复, 合并时按周次归并"
            );
        }
        Ok(fragment)
    }

    /// 预览上传会产生的周次冲突（不暂存, 不写入）
    pub fn preview_collisions(
        &self,
        incoming: &[IncomingFragment],
    ) -> ApiResult<Vec<WeekCollision>> {
        let existing = self.snapshot()?.week_numbers();
        Ok(ConflictHandlerImpl.detect_cross_batch_duplicates(incoming, &existing))
    }

    /// 解析并提交一批上传文件
    ///
    /// # 参数
    /// - files: (来源名, 原始内容)
    pub fn upload(&self, files: &[(String, Vec<u8>)], editor: Option<&str>) -> ApiResult<BeginOutcome> {
        let fragments = files
            .iter()
            .map(|(source, bytes)| self.parse_upload(source, bytes))
            .collect::<ApiResult<Vec<_>>>()?;
        self.begin_upload(fragments, editor)
    }

    pub fn begin_upload(
        &self,
        incoming: Vec<IncomingFragment>,
        editor: Option<&str>,
    ) -> ApiResult<BeginOutcome> {
        let outcome = self.coordinator.begin(incoming)?;
        if let BeginOutcome::Committed(report) = &outcome {
            self.record_upload(report.weeks.len(), editor);
        }
        Ok(outcome)
    }

    pub fn resolve_upload(
        &self,
        token: Uuid,
        decisions: &HashMap<u32, Resolution>,
        editor: Option<&str>,
    ) -> ApiResult<ResolutionSummary> {
        let summary = self.coordinator.resolve(token, decisions)?;
        self.record_upload(summary.weeks.len(), editor);
        Ok(summary)
    }

    pub fn discard_upload(&self, token: Uuid) -> ApiResult<()> {
        Ok(self.coordinator.discard(token)?)
    }

    pub fn pending_upload(&self, token: Uuid) -> ApiResult<PendingReconciliation> {
        self.coordinator
            .pending(token)?
            .ok_or(ApiError::UnknownToken(token))
    }

    pub fn purge_stale_uploads(&self, max_age: chrono::Duration) -> ApiResult<usize> {
        Ok(self.coordinator.purge_older_than(max_age)?)
    }

    // ==========================================
    // 时间槽编辑
    // ==========================================

    /// 编辑时间槽; 写入成功时记录修改历史
    pub fn apply_edit(&self, edit: SlotEdit) -> ApiResult<EditOutcome> {
        let outcome = self.coordinator.with_writer(|repo| {
            let mut snapshot = repo.load()?;
            let outcome = self.editor.apply_slot_edit(&mut snapshot, edit)?;
            if matches!(outcome, EditOutcome::Applied { .. }) {
                repo.replace(&snapshot)?;
            }
            Ok(outcome)
        })?;

        if let EditOutcome::Applied { record, .. } = &outcome {
            self.append_history(record);
        }
        Ok(outcome)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn free_rooms(
        &self,
        week: u32,
        weekday: u8,
        time: u8,
        filter: &BuildingFilter,
    ) -> ApiResult<Vec<RoomName>> {
        let snapshot = self.snapshot()?;
        Ok(self
            .rooms
            .find_free_rooms(&snapshot, week, weekday, time, filter)?)
    }

    pub fn list_buildings(&self) -> ApiResult<Vec<String>> {
        let snapshot = self.snapshot()?;
        Ok(self.rooms.list_buildings(&snapshot))
    }

    pub fn teacher_workload(&self, teacher: &str) -> ApiResult<TeacherWorkload> {
        if teacher.trim().is_empty() {
            return Err(ApiError::InvalidInput("教师名称不能为空".to_string()));
        }
        let snapshot = self.snapshot()?;
        Ok(teacher_workload(&snapshot, &TeacherName::from(teacher))?)
    }

    pub fn search(&self, query: &SearchQuery) -> ApiResult<SearchResult> {
        let snapshot = self.snapshot()?;
        Ok(search_timetable(&snapshot, query)?)
    }

    /// 教师单周课表; 未指定周次时取与今天最接近的周
    pub fn teacher_timetable(&self, teacher: &str, week: Option<u32>) -> ApiResult<ResourceTimetable> {
        if teacher.trim().is_empty() {
            return Err(ApiError::InvalidInput("教师名称不能为空".to_string()));
        }
        let snapshot = self.snapshot()?;
        let week = pick_week(&snapshot, week)?;
        teacher_timetable(&snapshot, &TeacherName::from(teacher), week)?
            .ok_or_else(|| ApiError::NotFound(format!("周次 {}", week)))
    }

    /// 教室单周课表; 未指定周次时取与今天最接近的周
    pub fn room_timetable(&self, room: &str, week: Option<u32>) -> ApiResult<ResourceTimetable> {
        if room.trim().is_empty() {
            return Err(ApiError::InvalidInput("教室名称不能为空".to_string()));
        }
        let snapshot = self.snapshot()?;
        let week = pick_week(&snapshot, week)?;
        room_timetable(&snapshot, &RoomName::from(room), week)?
            .ok_or_else(|| ApiError::NotFound(format!("周次 {}", week)))
    }

    pub fn unique_values(&self) -> ApiResult<UniqueValues> {
        Ok(unique_values(&self.snapshot()?))
    }

    pub fn subjects_by_group(&self, group_name: &str) -> ApiResult<Vec<String>> {
        Ok(subjects_by_group(&self.snapshot()?, group_name))
    }

    /// 最近的修改记录（未启用历史时为空）
    pub fn recent_changes(&self, limit: usize) -> ApiResult<Vec<ChangeRecord>> {
        match &self.history {
            Some(history) => Ok(history.list_recent(limit)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn group_changes(&self, group_name: &str) -> ApiResult<Vec<ChangeRecord>> {
        match &self.history {
            Some(history) => Ok(history.list_for_group(group_name)?),
            None => Ok(Vec::new()),
        }
    }

    // ==========================================
    // 历史记录
    // ==========================================

    fn record_upload(&self, weeks: usize, editor: Option<&str>) {
        let detail = t_in(
            &self.config.locale,
            "edit.upload",
            &[("count", weeks.to_string().as_str())],
        );
        let record = ChangeRecord::upload(detail).with_editor(editor.map(str::to_string));
        self.append_history(&record);
    }

    /// 写入修改历史; 快照已提交, 历史写入失败只告警不回传
    fn append_history(&self, record: &ChangeRecord) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(e) = history.append(record) {
            tracing::warn!(
                record_id = %record.record_id,
                change_type = ?record.change_type,
                error = %e,
                "修改历史写入失败, 变更已生效"
            );
        }
    }
}

fn pick_week(snapshot: &Snapshot, week: Option<u32>) -> ApiResult<u32> {
    week.or_else(|| closest_week(snapshot, chrono::Local::now().date_naive()))
        .ok_or_else(|| ApiError::NotFound("课表为空".to_string()))
}
