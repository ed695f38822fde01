// ==========================================
// 温室气体中心报表 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，向调用方暴露单一的用户可读错误
// 说明: 单行解析失败 / 因子缺失不是错误，只出现在诊断表中
// ==========================================

use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::report::error::ReportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与配置
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 源文件不可用（整次导出中止）
    // ==========================================
    #[error("源文件不可用: {0}")]
    SourceUnavailable(#[from] ImportError),

    // ==========================================
    // 执行
    // ==========================================
    #[error("导出已取消 (已处理 {processed} 行)")]
    Cancelled { processed: usize },

    #[error("后台任务失败: {0}")]
    TaskFailed(String),

    // ==========================================
    // 数据访问与报表文件
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("字段{field}错误: {message}")]
    FieldValueError { field: String, message: String },

    #[error("报表文件错误: {0}")]
    ReportError(#[from] ReportError),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::FieldValueError { field, message } => {
                ApiError::FieldValueError { field, message }
            }
            RepositoryError::CsvImportError { line, message } => {
                ApiError::InvalidInput(format!("CSV 第 {} 行: {}", line, message))
            }
            RepositoryError::SourceError(e) => ApiError::SourceUnavailable(e),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled { processed } => ApiError::Cancelled { processed },
            EngineError::InvalidConfig(msg) => ApiError::InvalidInput(msg),
            EngineError::LookupStore(e) => e.into(),
            EngineError::Report(e) => ApiError::ReportError(e),
        }
    }
}

// ConfigManager 使用 Box<dyn Error>（非 Send），在边界处转为文本
impl From<Box<dyn std::error::Error>> for ApiError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_map_to_user_facing_variants() {
        let cancelled: ApiError = EngineError::Cancelled { processed: 512 }.into();
        assert!(matches!(cancelled, ApiError::Cancelled { processed: 512 }));

        let invalid: ApiError = EngineError::InvalidConfig("year must be positive".into()).into();
        assert_eq!(invalid.to_string(), "无效输入: year must be positive");

        let lookup: ApiError =
            EngineError::LookupStore(RepositoryError::LockError("poisoned".into())).into();
        assert!(matches!(lookup, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_csv_import_error_mentions_line() {
        let err: ApiError = RepositoryError::CsvImportError {
            line: 4,
            message: "factor 'x' no numérico".into(),
        }
        .into();
        assert!(err.to_string().contains("第 4 行"));
    }
}
