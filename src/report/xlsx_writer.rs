// ==========================================
// 温室气体中心报表 - xlsx 写出
// ==========================================
// 整个工作簿先渲染到内存，再写入同目录临时文件并改名覆盖目标
// 失败时不留下截断的报表文件
// ==========================================

use crate::domain::report::{CellValue, ReportDocument};
use crate::engine::formula::{FormulaEvaluator, FormulaValue};
use crate::report::error::{ReportError, ReportResult};
use rust_xlsxwriter::{Format, Formula, Workbook};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Excel 工作表名最大长度
const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// 默认列宽
const COLUMN_WIDTH: f64 = 18.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxReportWriter;

impl XlsxReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// 工作表名校验（长度、非法字符、重名）
    pub fn validate_sheet_names(doc: &ReportDocument) -> ReportResult<()> {
        let mut seen = HashSet::new();
        for sheet in &doc.sheets {
            let name = sheet.name.as_str();
            if name.trim().is_empty()
                || name.chars().count() > MAX_SHEET_NAME_LEN
                || name.contains(&INVALID_SHEET_CHARS[..])
                || name.starts_with('\'')
                || name.ends_with('\'')
            {
                return Err(ReportError::InvalidSheetName(name.to_string()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ReportError::InvalidSheetName(format!("{} (duplicada)", name)));
            }
        }
        Ok(())
    }

    /// 渲染为 xlsx 字节
    ///
    /// 公式单元格写入表达式，并附带求值结果作为缓存值，
    /// 未重算的读取端（含本 crate 的读取器）也能看到数值
    pub fn render(&self, doc: &ReportDocument) -> ReportResult<Vec<u8>> {
        Self::validate_sheet_names(doc)?;

        let evaluator = FormulaEvaluator::new(doc);
        let header_format = Format::new().set_bold();
        let mut workbook = Workbook::new();

        for sheet in &doc.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            let columns = sheet.column_count();
            for col in 0..columns {
                worksheet.set_column_width(col as u16, COLUMN_WIDTH)?;
            }

            for (r, row) in sheet.rows.iter().enumerate() {
                let row_idx = r as u32;
                for (c, cell) in row.iter().enumerate() {
                    let col_idx = c as u16;
                    match cell {
                        CellValue::Empty => {}
                        CellValue::Text(text) if r == 0 => {
                            worksheet.write_string_with_format(row_idx, col_idx, text, &header_format)?;
                        }
                        CellValue::Text(text) => {
                            worksheet.write_string(row_idx, col_idx, text)?;
                        }
                        CellValue::Number(n) => {
                            worksheet.write_number(row_idx, col_idx, *n)?;
                        }
                        CellValue::Formula(expr) => {
                            let result = cached_result(&evaluator.cell_value(&sheet.name, r, c));
                            let formula = Formula::new(expr.as_str()).set_result(result);
                            worksheet.write_formula(row_idx, col_idx, formula)?;
                        }
                    }
                }
            }
            debug!(sheet = %sheet.name, rows = sheet.row_count(), "工作表渲染完成");
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// 写出到目标路径（临时文件 + 改名）
    #[instrument(skip(self, doc), fields(path = %path.as_ref().display(), sheets = doc.sheets.len()))]
    pub fn write<P: AsRef<Path>>(&self, doc: &ReportDocument, path: P) -> ReportResult<()> {
        let target = path.as_ref();
        let bytes = self.render(doc)?;

        let temp = temp_sibling(target);
        let io_error = |e: std::io::Error| ReportError::Io {
            path: target.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&temp, &bytes).map_err(io_error)?;
        if let Err(e) = std::fs::rename(&temp, target) {
            let _ = std::fs::remove_file(&temp);
            return Err(io_error(e));
        }

        info!(bytes = bytes.len(), "报表已写出");
        Ok(())
    }
}

/// 同目录临时文件: .<文件名>.<uuid>.tmp
fn temp_sibling(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.xlsx".to_string());
    target.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
}

fn cached_result(value: &FormulaValue) -> String {
    match value {
        FormulaValue::Bool(true) => "TRUE".to_string(),
        FormulaValue::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> ReportDocument {
        let mut doc = ReportDocument::new();
        let sheet = doc.add_sheet("Gas - Por centro");
        sheet.push_text_row(&["Centro", "Consumo (kWh)"]);
        sheet.push_row(vec![CellValue::text("Sede"), CellValue::Number(10.0)]);
        sheet.push_row(vec![CellValue::text("TOTAL"), CellValue::formula("=SUM(B2:B2)")]);
        doc
    }

    #[test]
    fn test_invalid_sheet_names_rejected() {
        let mut doc = ReportDocument::new();
        doc.add_sheet("Hoja/1");
        assert!(matches!(
            XlsxReportWriter::validate_sheet_names(&doc),
            Err(ReportError::InvalidSheetName(_))
        ));

        let mut doc = ReportDocument::new();
        doc.add_sheet("Total");
        doc.add_sheet("total");
        assert!(XlsxReportWriter::validate_sheet_names(&doc).is_err());

        let mut doc = ReportDocument::new();
        doc.add_sheet("x".repeat(32));
        assert!(XlsxReportWriter::validate_sheet_names(&doc).is_err());
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out").join("gas.xlsx");
        XlsxReportWriter::new().write(&sample(), &target).unwrap();

        assert!(target.exists());
        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_invalid_document_writes_nothing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("bad.xlsx");
        let mut doc = sample();
        doc.add_sheet("a:b");
        assert!(XlsxReportWriter::new().write(&doc, &target).is_err());
        assert!(!target.exists());
    }
}
