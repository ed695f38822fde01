// ==========================================
// 温室气体中心报表 - 引擎层
// ==========================================
// 职责: 年度分摊、供应点分摊、因子解析、中心聚合、
//       公式化明细行与跨模块汇总
// 红线: Engine 不拼 SQL，数据经 FactorSource / RegistrationSource 进入
// ==========================================

pub mod center_aggregator;
pub mod connection_splitter;
pub mod error;
pub mod factor_resolver;
pub mod formula;
pub mod locator;
pub mod module_export;
pub mod prorator;
pub mod row_writer;
pub mod summary_merger;

// 重导出核心引擎
pub use center_aggregator::{CenterAggregates, CenterAggregator, CenterTotals};
pub use connection_splitter::{
    CenterAllocation, CenterShare, ConnectionPointSplitter, RegistrationSource,
};
pub use error::{EngineError, EngineResult};
pub use factor_resolver::{normalize_key, FactorResolver, FactorSource, ResolvedFactors};
pub use formula::{FormulaEvaluator, FormulaValue};
pub use locator::{
    per_center_sheet_name, ColumnLocator, ColumnMatch, KeywordColumnLocator,
    PerCenterSheetLocator, SheetLocator, SheetMatch,
};
pub use module_export::{
    detail_sheet_name, total_sheet_name, AcceptedRow, CancelFlag, ExportContext,
    ModuleExportResult, ModuleExporter, DIAGNOSTICS_SHEET,
};
pub use prorator::{DateOverlapProrator, Proration};
pub use row_writer::{FormulaBackedRowWriter, RowQuantities, WrittenRow};
pub use summary_merger::{ModuleReports, SummaryMerger, SummaryResult, GENERAL_SHEET, SCOPE_SHEET};
