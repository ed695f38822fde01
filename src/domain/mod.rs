// ==========================================
// 温室气体中心报表 - 领域模型层
// ==========================================
// 职责: 定义账单行、因子表、报表文档与处理结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod billing;
pub mod factor;
pub mod outcome;
pub mod report;
pub mod types;

// 重导出核心类型
pub use billing::{
    BillingRow, ColumnMapping, ConnectionPointRegistration, FieldSource, SourceSheet,
};
pub use factor::FactorTable;
pub use outcome::{DiagnosticLog, RowOutcome, SkipReason};
pub use report::{CellValue, ReportDocument, ReportSheet};
pub use types::{EmissionChannel, Module, Scope};
