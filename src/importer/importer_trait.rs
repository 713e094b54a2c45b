// ==========================================
// 课表一致性引擎 - 导入接口
// ==========================================
// 职责: 定义上传文件解析与周次冲突检测接口（不包含实现）
// ==========================================

use crate::domain::reconcile::{IncomingFragment, WeekCollision};
use crate::importer::error::ImportResult;
use std::collections::BTreeSet;

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: JsonFragmentParser
pub trait FileParser: Send + Sync {
    /// 将一个来源的原始字节解析为上传片段
    ///
    /// # 参数
    /// - source: 来源标识（文件名）, 写入片段及所有错误
    /// - bytes: 原始内容
    fn parse(&self, source: &str, bytes: &[u8]) -> ImportResult<IncomingFragment>;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测同一来源内重复的周次
    ///
    /// # 返回
    /// - Vec<(片段序号, 周次)>: 重复片段（不包括第一次出现）
    fn detect_duplicates(&self, fragment: &IncomingFragment) -> Vec<(usize, u32)>;

    /// 检测与现有课表的周次冲突
    ///
    /// # 参数
    /// - existing: 现有课表的周次
    ///
    /// # 返回
    /// - 冲突列表（周次升序, 日期取首个携带该周的片段, 来源按出现顺序去重）
    fn detect_cross_batch_duplicates(
        &self,
        incoming: &[IncomingFragment],
        existing: &BTreeSet<u32>,
    ) -> Vec<WeekCollision>;
}
