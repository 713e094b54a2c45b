// ==========================================
// 课表一致性引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误必须携带可定位的上下文（周次/组/星期/节次）
// ==========================================

use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ==========================================
// ValidationIssue - 单项校验问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub source: Option<String>,     // 来源（文件名）
    pub fragment: Option<usize>,    // 片段序号（从 0 开始）
    pub week_number: Option<u32>,
    pub group_name: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: None,
            fragment: None,
            week_number: None,
            group_name: None,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn in_fragment(mut self, fragment: usize) -> Self {
        self.fragment = Some(fragment);
        self
    }

    pub fn in_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn in_week(mut self, week_number: u32) -> Self {
        self.week_number = Some(week_number);
        self
    }

    pub fn in_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "[{}] ", source)?;
        }
        if let Some(fragment) = self.fragment {
            write!(f, "片段#{} ", fragment)?;
        }
        if let Some(week) = self.week_number {
            write!(f, "周{} ", week)?;
        }
        if let Some(group) = &self.group_name {
            write!(f, "组{} ", group)?;
        }
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn describe_issues(issues: &[ValidationIssue]) -> String {
    match issues.first() {
        Some(first) if issues.len() > 1 => format!("{} (另有 {} 项)", first, issues.len() - 1),
        Some(first) => first.to_string(),
        None => "未知问题".to_string(),
    }
}

// ==========================================
// EngineError - 引擎错误
// ==========================================
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入校验 =====
    /// 片段/快照结构不合法, 整批拒绝
    #[error("数据校验失败: {}", describe_issues(.0))]
    Validation(Vec<ValidationIssue>),

    // ===== 查找失败 =====
    /// 冲突处理令牌不存在（已处理/已丢弃/从未创建）
    #[error("冲突处理令牌不存在或已失效: {0}")]
    UnknownToken(Uuid),

    #[error("课表位置不存在: week={week}, group={group}")]
    SlotNotFound { week: u32, group: String },

    // ===== 不变量 =====
    #[error("课表不变量违反 (week={week}, group={group}, weekday={weekday}, time={time}): {message}")]
    InvariantViolation {
        week: u32,
        group: String,
        weekday: u8,
        time: u8,
        message: String,
    },

    // ===== 存储 =====
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl EngineError {
    pub fn validation_issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            EngineError::Validation(issues) => Some(issues),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
