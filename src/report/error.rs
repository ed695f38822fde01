// ==========================================
// 温室气体中心报表 - 报表读写错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 报表层错误类型
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("工作表名称无效: {0}")]
    InvalidSheetName(String),

    #[error("xlsx 生成失败: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("报表写入失败 ({path}): {message}")]
    Io { path: String, message: String },

    #[error("模块报表读取失败 ({path}): {message}")]
    Read { path: String, message: String },
}

/// Result 类型别名
pub type ReportResult<T> = Result<T, ReportError>;
