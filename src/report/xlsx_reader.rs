// ==========================================
// 温室气体中心报表 - xlsx 读回
// ==========================================
// 用途: 合并前读回已完成的模块报表
// 公式单元格读取缓存值（写出时已附带）
// ==========================================

use crate::domain::report::{CellValue, ReportDocument, ReportSheet};
use crate::importer::file_parser::excel_serial_to_iso;
use crate::report::error::{ReportError, ReportResult};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, instrument};

#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxReportReader;

impl XlsxReportReader {
    pub fn new() -> Self {
        Self
    }

    /// 读取整个工作簿（保持工作表顺序，单元格坐标与源一致）
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn read<P: AsRef<Path>>(&self, path: P) -> ReportResult<ReportDocument> {
        let path = path.as_ref();
        let read_error = |message: String| ReportError::Read {
            path: path.display().to_string(),
            message,
        };
        if !path.exists() {
            return Err(read_error("archivo no encontrado".to_string()));
        }

        let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();
        let mut doc = ReportDocument::new();

        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| read_error(e.to_string()))?;
            let mut sheet = ReportSheet::new(name.clone());

            if let Some((row_offset, col_offset)) = range.start() {
                for (r, data_row) in range.rows().enumerate() {
                    for (c, cell) in data_row.iter().enumerate() {
                        let value = data_to_cell(cell);
                        if value != CellValue::Empty {
                            sheet.set(row_offset as usize + r, col_offset as usize + c, value);
                        }
                    }
                }
            }

            debug!(sheet = %name, rows = sheet.row_count(), "工作表读回完成");
            doc.push_sheet(sheet);
        }

        Ok(doc)
    }
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        Data::DateTime(dt) => excel_serial_to_iso(dt.as_f64())
            .map(CellValue::Text)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
