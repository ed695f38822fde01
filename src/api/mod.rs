// ==========================================
// 温室气体中心报表 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI / 外部 UI 调用
// ==========================================

pub mod error;
pub mod export_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use export_api::{ExportApi, ExportSummary, SummaryInputs, SummaryReport};
