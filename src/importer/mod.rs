// ==========================================
// 温室气体中心报表 - 导入层
// ==========================================
// 职责: 外部账单表格 → SourceSheet → BillingRow
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, RowMapper};
pub use file_parser::{CsvParser, ExcelParser, SheetParser, UniversalFileParser};
