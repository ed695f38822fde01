// ==========================================
// 温室气体中心报表 - 引擎层错误类型
// ==========================================
// 单行问题不属于错误（RowOutcome::Skipped + 诊断行）
// 这里只有中止整次导出的情况
// ==========================================

use crate::report::ReportError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("导出已取消 (已处理 {processed} 行)")]
    Cancelled { processed: usize },

    #[error("导出配置无效: {0}")]
    InvalidConfig(String),

    #[error("查找表读取失败: {0}")]
    LookupStore(#[from] RepositoryError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub type EngineResult<T> = Result<T, EngineError>;
