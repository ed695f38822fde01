// ==========================================
// 温室气体中心报表 - 单次导出配置
// ==========================================
// 由调用方构建并显式传入每次导出；引擎本身不读文件、不读数据库
// ==========================================

use crate::domain::billing::ColumnMapping;
use crate::domain::types::Module;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_LOCATION_KEY: &str = "mix peninsular";
pub const DEFAULT_UNASSIGNED_CENTER: &str = "SIN CENTRO";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub module: Module,
    pub year: i32,
    pub mapping: ColumnMapping,
    /// 非空时只处理这些发票号
    #[serde(default)]
    pub valid_invoice_ids: HashSet<String>,
    /// 电力位置法因子查找键
    pub location_key: String,
    /// 无中心时的归属桶
    pub unassigned_center_label: String,
}

impl ExportConfig {
    pub fn new(module: Module, year: i32, mapping: ColumnMapping) -> Self {
        Self {
            module,
            year,
            mapping,
            valid_invoice_ids: HashSet::new(),
            location_key: DEFAULT_LOCATION_KEY.to_string(),
            unassigned_center_label: DEFAULT_UNASSIGNED_CENTER.to_string(),
        }
    }

    pub fn with_invoice_filter<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_invoice_ids = ids
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// 发票号是否通过预过滤（集合为空时全部通过）
    pub fn invoice_selected(&self, invoice: Option<&str>) -> bool {
        if self.valid_invoice_ids.is_empty() {
            return true;
        }
        invoice
            .map(|i| self.valid_invoice_ids.contains(i.trim()))
            .unwrap_or(false)
    }

    /// 基本校验，返回问题描述
    pub fn validate(&self) -> Result<(), String> {
        if self.year <= 0 {
            return Err(format!("year must be positive, got {}", self.year));
        }
        if !self.mapping.quantity.is_mapped() {
            return Err("quantity column is not mapped".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::FieldSource;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            quantity: FieldSource::Column(4),
            ..Default::default()
        }
    }

    #[test]
    fn test_invoice_filter() {
        let open = ExportConfig::new(Module::Gas, 2023, mapping());
        assert!(open.invoice_selected(None));

        let filtered = open.with_invoice_filter(vec![" F-1 ", ""]);
        assert_eq!(filtered.valid_invoice_ids.len(), 1);
        assert!(filtered.invoice_selected(Some("F-1")));
        assert!(!filtered.invoice_selected(Some("F-2")));
        assert!(!filtered.invoice_selected(None));
    }

    #[test]
    fn test_validate() {
        assert!(ExportConfig::new(Module::Fuel, 2023, mapping()).validate().is_ok());
        assert!(ExportConfig::new(Module::Fuel, 0, mapping()).validate().is_err());
        assert!(ExportConfig::new(Module::Fuel, 2023, ColumnMapping::default())
            .validate()
            .is_err());
    }
}
