// ==========================================
// 温室气体中心报表 - 工作表 / 列定位器
// ==========================================
// 合并报表时按名称变体找到各模块的"按中心"表，按表头关键字找到数值列
// 回退顺序固定，匹配结果写入诊断表
// ==========================================

use crate::domain::report::{ReportDocument, ReportSheet};
use crate::domain::types::Module;
use crate::engine::factor_resolver::normalize_key;

// ==========================================
// SheetLocator Trait
// ==========================================

/// 定位到的工作表
#[derive(Debug, Clone, PartialEq)]
pub struct SheetMatch<'d> {
    pub sheet: &'d ReportSheet,
    /// 命中的名称变体
    pub variant: String,
    /// 变体序号（从 1 开始）
    pub variant_index: usize,
}

pub trait SheetLocator: Send + Sync {
    /// 按顺序尝试的名称变体
    fn variants(&self, module: Module) -> Vec<String>;

    /// 依次尝试名称变体，先精确匹配，再忽略大小写与重音
    fn locate<'d>(&self, doc: &'d ReportDocument, module: Module) -> Option<SheetMatch<'d>> {
        for (idx, variant) in self.variants(module).into_iter().enumerate() {
            let wanted = normalize_key(&variant);
            let found = doc
                .sheet(&variant)
                .or_else(|| doc.sheets.iter().find(|s| normalize_key(&s.name) == wanted));
            if let Some(sheet) = found {
                return Some(SheetMatch {
                    sheet,
                    variant,
                    variant_index: idx + 1,
                });
            }
        }
        None
    }
}

/// 历史命名: "<模块> - Por centro" → "<模块> Por centro" → "Por centro"
#[derive(Debug, Default, Clone, Copy)]
pub struct PerCenterSheetLocator;

pub fn per_center_sheet_name(module: Module) -> String {
    format!("{} - Por centro", module.sheet_label())
}

impl SheetLocator for PerCenterSheetLocator {
    fn variants(&self, module: Module) -> Vec<String> {
        vec![
            per_center_sheet_name(module),
            format!("{} Por centro", module.sheet_label()),
            "Por centro".to_string(),
        ]
    }
}

// ==========================================
// ColumnLocator Trait
// ==========================================

/// 定位到的列
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    pub column: usize,
    /// 命中表头所在行；None = 使用位置默认值
    pub header_row: Option<usize>,
    pub header_text: Option<String>,
}

impl ColumnMatch {
    pub fn is_fallback(&self) -> bool {
        self.header_row.is_none()
    }
}

pub trait ColumnLocator: Send + Sync {
    /// 在表头区域查找包含任一关键字组全部关键字的单元格
    ///
    /// # 参数
    /// - keyword_sets: 关键字组（组内为"且"，组间为"或"），使用无重音小写
    /// - default_column: 未命中时的位置默认值
    fn locate(&self, sheet: &ReportSheet, keyword_sets: &[&[&str]], default_column: usize) -> ColumnMatch;
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordColumnLocator {
    scan_rows: usize,
}

impl KeywordColumnLocator {
    pub fn new(scan_rows: usize) -> Self {
        Self {
            scan_rows: scan_rows.max(1),
        }
    }
}

impl Default for KeywordColumnLocator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ColumnLocator for KeywordColumnLocator {
    fn locate(&self, sheet: &ReportSheet, keyword_sets: &[&[&str]], default_column: usize) -> ColumnMatch {
        for (row_idx, row) in sheet.rows.iter().take(self.scan_rows).enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let Some(text) = cell.as_text() else {
                    continue;
                };
                let normalized = normalize_key(text);
                let hit = keyword_sets
                    .iter()
                    .any(|set| !set.is_empty() && set.iter().all(|k| normalized.contains(k)));
                if hit {
                    return ColumnMatch {
                        column: col_idx,
                        header_row: Some(row_idx),
                        header_text: Some(text.to_string()),
                    };
                }
            }
        }
        ColumnMatch {
            column: default_column,
            header_row: None,
            header_text: None,
        }
    }
}
