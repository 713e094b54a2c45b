// ==========================================
// 课表一致性引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误必须指明来源（文件名）
// ==========================================

use crate::engine::error::ValidationIssue;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件编码错误 [{source_name}]: {message}（仅支持 UTF-8）")]
    EncodingError {
        source_name: String,
        message: String,
    },

    // ===== 内容解析错误 =====
    #[error("JSON 解析失败 [{source_name}]: {message}")]
    JsonParseError {
        source_name: String,
        message: String,
    },

    #[error("课表结构不支持 [{source_name}]: {message}")]
    UnsupportedShape {
        source_name: String,
        message: String,
    },

    /// 片段字段缺失或类型错误, 整个来源拒绝
    #[error("片段校验失败: {} 项问题", .0.len())]
    InvalidFragments(Vec<ValidationIssue>),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    pub fn issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            ImportError::InvalidFragments(issues) => Some(issues),
            _ => None,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
