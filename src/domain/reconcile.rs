// ==========================================
// 课表一致性引擎 - 合并与冲突处理模型
// ==========================================
// 职责: 上传片段 / 周次冲突 / 待处理暂存 / 合并报告
// ==========================================

use crate::domain::timetable::{Lesson, Week};
use crate::domain::types::Resolution;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ==========================================
// IncomingFragment - 上传片段
// ==========================================
// 一个来源（通常是一个上传文件）携带的若干周
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingFragment {
    pub source: String, // 来源标识（文件名等）
    pub weeks: Vec<Week>,
}

impl IncomingFragment {
    pub fn new(source: impl Into<String>, weeks: Vec<Week>) -> Self {
        Self {
            source: source.into(),
            weeks,
        }
    }
}

// ==========================================
// WeekCollision - 周次冲突
// ==========================================
// 上传周次在现有课表中已存在
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCollision {
    pub week_number: u32,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub sources: Vec<String>, // 携带该周的上传来源（按出现顺序去重）
}

// ==========================================
// PendingReconciliation - 待处理暂存
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReconciliation {
    pub token: Uuid,
    pub incoming: Vec<IncomingFragment>,
    pub conflicts: Vec<WeekCollision>,
    pub created_at: DateTime<Utc>,
}

impl PendingReconciliation {
    pub fn colliding_weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.conflicts.iter().map(|c| c.week_number)
    }
}

// ==========================================
// BeginOutcome - 上传处理结果
// ==========================================
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// 无周次冲突, 已合并并提交
    Committed(MergeReport),
    /// 存在周次冲突, 等待人工决策
    AwaitingResolution {
        token: Uuid,
        conflicts: Vec<WeekCollision>,
    },
}

impl BeginOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, BeginOutcome::Committed(_))
    }

    pub fn token(&self) -> Option<Uuid> {
        match self {
            BeginOutcome::Committed(_) => None,
            BeginOutcome::AwaitingResolution { token, .. } => Some(*token),
        }
    }
}

// ==========================================
// ResolutionSummary - 决策提交结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub weeks: Vec<Week>,
    pub applied: BTreeMap<u32, Resolution>, // 每个冲突周实际采用的决策（含默认）
    pub discrepancies: Vec<MergeDiscrepancy>,
}

// ==========================================
// MergeReport / MergeDiscrepancy - 合并报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub weeks: Vec<Week>,
    pub discrepancies: Vec<MergeDiscrepancy>,
}

/// 去重键相同但其余字段不同的课程: 保留先出现者, 记录被丢弃者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDiscrepancy {
    pub week_number: u32,
    pub group_name: String,
    pub weekday: u8,
    pub time: u8,
    pub subgroup: u8,
    pub subject: String,
    pub kept: Lesson,
    pub dropped: Lesson,
}
