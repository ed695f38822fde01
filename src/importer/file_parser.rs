// ==========================================
// 温室气体中心报表 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls/.ods) / CSV (.csv)
// 输出: SourceSheet（单元格文本，列号与源表列号一致）
// ==========================================

use crate::domain::billing::SourceSheet;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

// ==========================================
// SheetParser Trait
// ==========================================
// 用途: 源文件 → SourceSheet
// 实现者: CsvParser, ExcelParser
pub trait SheetParser: Send + Sync {
    /// 解析文件中的一张表
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - sheet_name: 工作表名（None = 第一张；CSV 忽略）
    fn parse_sheet(&self, file_path: &Path, sheet_name: Option<&str>) -> ImportResult<SourceSheet>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 分隔符探测: 首行分号多于逗号时使用分号（西语区导出的常见格式）
    fn sniff_delimiter(content: &str) -> u8 {
        let first_line = content.lines().next().unwrap_or("");
        let semicolons = first_line.matches(';').count();
        let commas = first_line.matches(',').count();
        if semicolons > commas {
            b';'
        } else {
            b','
        }
    }

    /// UTF-8 优先，失败时按 Latin-1 逐字节解码
    fn decode(bytes: Vec<u8>) -> String {
        match String::from_utf8(bytes) {
            Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        }
    }
}

impl SheetParser for CsvParser {
    fn parse_sheet(&self, file_path: &Path, _sheet_name: Option<&str>) -> ImportResult<SourceSheet> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut bytes = Vec::new();
        File::open(file_path)?.read_to_end(&mut bytes)?;
        let content = Self::decode(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头由 SourceSheet 自行识别
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::sniff_delimiter(&content))
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|v| v.trim().to_string()).collect());
        }

        let name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        Ok(SourceSheet::from_rows(name, rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl SheetParser for ExcelParser {
    fn parse_sheet(&self, file_path: &Path, sheet_name: Option<&str>) -> ImportResult<SourceSheet> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "xlsb" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 工作簿在本函数内打开并随作用域释放
        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names().to_vec();
        let target = match sheet_name {
            Some(name) => sheet_names
                .iter()
                .find(|s| s.trim().eq_ignore_ascii_case(name.trim()))
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::NoWorksheet(file_path.display().to_string()))?,
        };

        let range = workbook
            .worksheet_range(&target)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        // 补齐区域左上角之前的空行/空列，保证列号与源表一致
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut cells = vec![String::new(); col_offset];
            cells.extend(data_row.iter().map(cell_to_text));
            rows.push(cells);
        }

        debug!(sheet = %target, rows = rows.len(), "工作表读取完成");
        Ok(SourceSheet::from_rows(target, rows))
    }
}

/// 单元格 → 文本（日期单元格转为 ISO 日期）
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            excel_serial_to_iso(dt.as_f64()).unwrap_or_else(|| format_number(dt.as_f64()))
        }
        Data::DateTimeIso(s) => s.chars().take(10).collect(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// 数值格式化: 整数不带小数点，其余用 '.' 作小数点
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Excel 序列日期 → "YYYY-MM-DD"（1900 日期系统）
pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(Duration::days(serial.floor() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    #[instrument(skip(self, file_path), fields(path = %file_path.as_ref().display()))]
    pub fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
        sheet_name: Option<&str>,
    ) -> ImportResult<SourceSheet> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_sheet(path, sheet_name),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => ExcelParser.parse_sheet(path, sheet_name),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
