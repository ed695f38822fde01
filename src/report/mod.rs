// ==========================================
// 温室气体中心报表 - 报表文件层
// ==========================================
// 职责: ReportDocument ⇄ .xlsx
// 写: rust_xlsxwriter（公式单元格附带求值缓存）
// 读: calamine（合并时读回已完成的模块报表）
// ==========================================

pub mod error;
pub mod xlsx_reader;
pub mod xlsx_writer;

pub use error::{ReportError, ReportResult};
pub use xlsx_reader::XlsxReportReader;
pub use xlsx_writer::XlsxReportWriter;
