// ==========================================
// 温室气体中心报表 - 账单领域模型
// ==========================================
// 源表格 → 列映射 → BillingRow（读出后不可变）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// SourceSheet - 源数据表
// ==========================================
// 用途: UI/导入层提供的原始行（单元格文本，列号从 0 开始）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
    /// 表头行号（首个存在非空单元格的行）；None 表示整张表为空
    pub header_row: Option<usize>,
}

impl SourceSheet {
    /// 由原始行构建，并自动识别表头行
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let header_row = detect_header_row(&rows);
        Self {
            name: name.into(),
            rows,
            header_row,
        }
    }

    /// 表头单元格
    pub fn headers(&self) -> &[String] {
        match self.header_row {
            Some(idx) => &self.rows[idx],
            None => &[],
        }
    }

    /// 表头之后的数据行: (源行号从 1 开始, 行)
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Vec<String>)> {
        let start = self.header_row.map(|h| h + 1).unwrap_or(self.rows.len());
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .map(|(idx, row)| (idx + 1, row))
    }

    pub fn data_row_count(&self) -> usize {
        match self.header_row {
            Some(h) => self.rows.len().saturating_sub(h + 1),
            None => 0,
        }
    }
}

/// 表头识别: 第一行存在任意非空单元格
pub fn detect_header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .position(|row| row.iter().any(|cell| !cell.trim().is_empty()))
}

// ==========================================
// FieldSource - 字段来源
// ==========================================
// 列号 / 固定字面量（燃气/制冷剂类型）/ 未映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Column(usize),
    Literal(String),
    #[default]
    Unmapped,
}

impl FieldSource {
    /// 兼容 UI 的整数约定：-1（或任意负数）表示未映射
    pub fn from_index(index: i64) -> Self {
        if index < 0 {
            FieldSource::Unmapped
        } else {
            FieldSource::Column(index as usize)
        }
    }

    pub fn is_mapped(&self) -> bool {
        !matches!(self, FieldSource::Unmapped)
    }

    /// 从一行中取值（空白视为 None）
    pub fn extract(&self, row: &[String]) -> Option<String> {
        let raw = match self {
            FieldSource::Column(idx) => row.get(*idx)?.as_str(),
            FieldSource::Literal(value) => value.as_str(),
            FieldSource::Unmapped => return None,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

// ==========================================
// ColumnMapping - 列映射
// ==========================================
// factor_key: 电力 = 排放主体列（售电公司未登记时的回退）
//             燃气/燃料/制冷剂 = 类型（通常为固定字面量）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColumnMapping {
    #[serde(default)]
    pub connection_point: FieldSource,
    #[serde(default)]
    pub invoice_id: FieldSource,
    #[serde(default)]
    pub period_start: FieldSource,
    #[serde(default)]
    pub period_end: FieldSource,
    #[serde(default)]
    pub quantity: FieldSource,
    #[serde(default)]
    pub center: FieldSource,
    #[serde(default)]
    pub factor_key: FieldSource,
}

// ==========================================
// BillingRow - 账单行
// ==========================================
// 用途: 映射后的一条源记录（读出后不可变）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillingRow {
    pub row_number: usize,                // 源表行号（从 1 开始）
    pub connection_point: Option<String>, // 计量/供应点 (CUPS)
    pub invoice_id: Option<String>,       // 发票号
    pub period_start: Option<String>,     // 账期开始（原始文本）
    pub period_end: Option<String>,       // 账期结束（原始文本）
    pub quantity_raw: Option<String>,     // 原始数量文本
    pub quantity: Option<f64>,            // 解析后的数量（None = 无法解析）
    pub center: Option<String>,           // 中心名称
    pub factor_key: Option<String>,       // 因子查找键
}

// ==========================================
// ConnectionPointRegistration - 供应点登记
// ==========================================
// 一个供应点可登记到多个中心；售电公司用于电力市场法因子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPointRegistration {
    pub connection_point: String,
    pub center_name: String,
    #[serde(default)]
    pub marketer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_header_is_first_non_empty_row() {
        let sheet = SourceSheet::from_rows(
            "Hoja1",
            vec![row(&["", " "]), row(&["CUPS", "Consumo"]), row(&["ES001", "10"])],
        );
        assert_eq!(sheet.header_row, Some(1));
        assert_eq!(sheet.headers()[0], "CUPS");
        let data: Vec<_> = sheet.data_rows().collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].0, 3);
    }

    #[test]
    fn test_empty_sheet_has_no_header() {
        let sheet = SourceSheet::from_rows("Hoja1", vec![row(&["", ""])]);
        assert_eq!(sheet.header_row, None);
        assert_eq!(sheet.data_rows().count(), 0);
        assert_eq!(sheet.data_row_count(), 0);
    }

    #[test]
    fn test_field_source_extract() {
        let r = row(&["  ES001 ", ""]);
        assert_eq!(FieldSource::Column(0).extract(&r), Some("ES001".to_string()));
        assert_eq!(FieldSource::Column(1).extract(&r), None);
        assert_eq!(FieldSource::Column(9).extract(&r), None);
        assert_eq!(
            FieldSource::Literal("Gas natural".into()).extract(&r),
            Some("Gas natural".to_string())
        );
        assert_eq!(FieldSource::from_index(-1), FieldSource::Unmapped);
        assert_eq!(FieldSource::from_index(2), FieldSource::Column(2));
    }

    #[test]
    fn test_mapping_deserializes_from_json_profile() {
        let json = r#"{"quantity": {"column": 4}, "factor_key": {"literal": "R-410A"}}"#;
        let mapping: ColumnMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.quantity, FieldSource::Column(4));
        assert_eq!(mapping.factor_key, FieldSource::Literal("R-410A".into()));
        assert_eq!(mapping.center, FieldSource::Unmapped);
    }
}
