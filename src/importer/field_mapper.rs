// ==========================================
// 温室气体中心报表 - 字段映射器实现
// ==========================================
// 职责: 源行（单元格文本）+ ColumnMapping → BillingRow
// 说明: 映射不会失败；数量无法解析时 quantity = None，由引擎决定跳过
// ==========================================

use crate::domain::billing::{BillingRow, ColumnMapping};
use crate::importer::data_cleaner::DataCleaner;

// ==========================================
// RowMapper Trait
// ==========================================
pub trait RowMapper: Send + Sync {
    /// 将一行源数据映射为 BillingRow
    ///
    /// # 参数
    /// - row: 单元格文本（列号从 0 开始）
    /// - row_number: 源表行号（从 1 开始，用于诊断）
    /// - mapping: 字段 → 列号/字面量
    fn map_row(&self, row: &[String], row_number: usize, mapping: &ColumnMapping) -> BillingRow;
}

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 整行是否为空白
    pub fn is_blank_row(row: &[String]) -> bool {
        row.iter().all(|c| c.trim().is_empty())
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl RowMapper for FieldMapper {
    fn map_row(&self, row: &[String], row_number: usize, mapping: &ColumnMapping) -> BillingRow {
        let text = |source: &crate::domain::billing::FieldSource| {
            self.cleaner.normalize_null(source.extract(row))
        };

        let quantity_raw = text(&mapping.quantity);
        let quantity = quantity_raw
            .as_deref()
            .and_then(|raw| self.cleaner.parse_quantity(raw));

        BillingRow {
            row_number,
            connection_point: text(&mapping.connection_point).map(|cp| cp.to_uppercase()),
            invoice_id: text(&mapping.invoice_id),
            period_start: text(&mapping.period_start),
            period_end: text(&mapping.period_end),
            quantity_raw,
            quantity,
            center: text(&mapping.center),
            factor_key: text(&mapping.factor_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::FieldSource;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            connection_point: FieldSource::Column(0),
            invoice_id: FieldSource::Column(1),
            period_start: FieldSource::Column(2),
            period_end: FieldSource::Column(3),
            quantity: FieldSource::Column(4),
            center: FieldSource::Unmapped,
            factor_key: FieldSource::Literal("Gas natural".into()),
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_map_row_basic() {
        let mapper = FieldMapper::new();
        let record = mapper.map_row(
            &row(&[" es001 ", "F-1", "01/06/2023", "30/06/2023", "1.234,5"]),
            5,
            &mapping(),
        );

        assert_eq!(record.row_number, 5);
        assert_eq!(record.connection_point.as_deref(), Some("ES001"));
        assert_eq!(record.invoice_id.as_deref(), Some("F-1"));
        assert_eq!(record.quantity, Some(1234.5));
        assert_eq!(record.center, None);
        assert_eq!(record.factor_key.as_deref(), Some("Gas natural"));
    }

    #[test]
    fn test_map_row_invalid_quantity_keeps_raw() {
        let mapper = FieldMapper::new();
        let record = mapper.map_row(&row(&["ES001", "F-1", "", "", "pendiente"]), 2, &mapping());

        assert_eq!(record.quantity, None);
        assert_eq!(record.quantity_raw.as_deref(), Some("pendiente"));
        assert_eq!(record.period_start, None);
    }

    #[test]
    fn test_short_row_yields_missing_fields() {
        let mapper = FieldMapper::new();
        let record = mapper.map_row(&row(&["ES001"]), 3, &mapping());
        assert_eq!(record.quantity_raw, None);
        assert_eq!(record.invoice_id, None);
    }

    #[test]
    fn test_is_blank_row() {
        assert!(FieldMapper::is_blank_row(&row(&["", "  "])));
        assert!(!FieldMapper::is_blank_row(&row(&["", "x"])));
    }
}
