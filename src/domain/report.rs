// ==========================================
// 温室气体中心报表 - 报表文档模型
// ==========================================
// ReportDocument: 有序命名工作表；单元格为字面量或公式
// 构建一次，结束时一次性写出（不做增量写入）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// 公式表达式（以 '=' 开头，A1 引用）
    Formula(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn formula(expr: impl Into<String>) -> Self {
        let expr = expr.into();
        if expr.starts_with('=') {
            CellValue::Formula(expr)
        } else {
            CellValue::Formula(format!("={}", expr))
        }
    }

    /// 可选文本：None → 空单元格
    pub fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Empty,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 单元格显示文本（公式返回表达式本身）
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Formula(f) => f.clone(),
        }
    }
}

// ==========================================
// ReportSheet - 工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl ReportSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// 追加一行，返回其行号（从 0 开始）
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> usize {
        self.rows.push(cells);
        self.rows.len() - 1
    }

    /// 追加一行纯文本
    pub fn push_text_row<S: AsRef<str>>(&mut self, cells: &[S]) -> usize {
        self.push_row(cells.iter().map(|c| CellValue::text(c.as_ref())).collect())
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, CellValue::default);
        }
        cells[col] = value;
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// 单元格文本（去首尾空白；非文本单元格按显示值）
    pub fn text_at(&self, row: usize, col: usize) -> String {
        self.get(row, col)
            .map(|c| c.display().trim().to_string())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

// ==========================================
// ReportDocument - 报表文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportDocument {
    pub sheets: Vec<ReportSheet>,
}

impl ReportDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加工作表并返回可变引用
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut ReportSheet {
        self.sheets.push(ReportSheet::new(name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn push_sheet(&mut self, sheet: ReportSheet) {
        self.sheets.push(sheet);
    }

    /// 按名称精确查找
    pub fn sheet(&self, name: &str) -> Option<&ReportSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// 按名称查找（忽略大小写与首尾空白）
    pub fn sheet_ignore_case(&self, name: &str) -> Option<&ReportSheet> {
        let wanted = name.trim().to_lowercase();
        self.sheets
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

// ==========================================
// A1 引用工具
// ==========================================

/// 列号（从 0 开始）→ 列字母: 0 → A, 25 → Z, 26 → AA
pub fn column_letter(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 列字母 → 列号（从 0 开始）
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for ch in letters.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        n = n * 26 + (upper as usize - 'A' as usize + 1);
    }
    Some(n - 1)
}

/// (行, 列)（从 0 开始）→ "B3"
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// 公式中的工作表名引用: 'Gas - Por centro'
pub fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("ab"), Some(27));
        assert_eq!(column_index("ZZ"), Some(701));
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_cell_ref_and_quote() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(9, 13), "N10");
        assert_eq!(quote_sheet("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_sheet_set_grows_grid() {
        let mut sheet = ReportSheet::new("Hoja");
        sheet.set(2, 3, CellValue::Number(1.5));
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.column_count(), 4);
        assert_eq!(sheet.get(2, 3).and_then(|c| c.as_number()), Some(1.5));
        assert_eq!(sheet.get(0, 0), None);
    }

    #[test]
    fn test_formula_constructor_prefixes_equals() {
        assert_eq!(CellValue::formula("A1+1"), CellValue::Formula("=A1+1".into()));
        assert_eq!(CellValue::formula("=A1"), CellValue::Formula("=A1".into()));
    }

    #[test]
    fn test_sheet_lookup_ignore_case() {
        let mut doc = ReportDocument::new();
        doc.add_sheet("Gas - Por centro");
        assert!(doc.sheet("gas - por centro").is_none());
        assert!(doc.sheet_ignore_case(" gas - POR centro ").is_some());
    }
}
