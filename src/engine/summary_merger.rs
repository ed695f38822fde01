// ==========================================
// 温室气体中心报表 - 跨模块汇总合并
// ==========================================
// 输入: 最多四个已完成的模块报表（缺失模块按 0 计）
// 输出: Generales / Por alcance / Diagnóstico + 各模块"按中心"表副本
// 中心数值一律用跨表 SUMIF 公式引用副本，不写预计算字面量
// 中心名不区分大小写合并；SUMIF 条件中的 * ? ~ 转义为字面量
// ==========================================

use crate::domain::outcome::DiagnosticLog;
use crate::domain::report::{
    cell_ref, column_letter, quote_sheet, CellValue, ReportDocument, ReportSheet,
};
use crate::domain::types::{EmissionChannel, Module, Scope};
use crate::engine::formula::{FormulaEvaluator, FormulaValue};
use crate::engine::locator::{
    per_center_sheet_name, ColumnLocator, ColumnMatch, KeywordColumnLocator,
    PerCenterSheetLocator, SheetLocator,
};
use crate::engine::module_export::build_diagnostics_sheet;
use tracing::{info, instrument};

pub const GENERAL_SHEET: &str = "Generales";
pub const SCOPE_SHEET: &str = "Por alcance";

type KeywordSets = &'static [&'static [&'static str]];

const QUANTITY_KEYWORDS: KeywordSets = &[&["consumo"], &["cantidad"]];
const ELECTRICITY_MARKET_KEYWORDS: KeywordSets = &[&["emisiones", "mercado"]];
const ELECTRICITY_LOCATION_KEYWORDS: KeywordSets = &[&["emisiones", "ubicacion"]];
const GAS_KEYWORDS: KeywordSets = &[&["emisiones", "mercado"]];
const DIRECT_KEYWORDS: KeywordSets = &[&["emisiones"]];

/// 合并报表的一列
struct SummaryColumn {
    module: Module,
    header: String,
    keywords: KeywordSets,
    default_column: usize,
    /// None: 消耗量列
    channel: Option<EmissionChannel>,
}

fn summary_columns() -> Vec<SummaryColumn> {
    let quantity = |module: Module, header: String| SummaryColumn {
        module,
        header,
        keywords: QUANTITY_KEYWORDS,
        default_column: 1,
        channel: None,
    };
    vec![
        quantity(Module::Electricity, "Consumo electricidad (kWh)".to_string()),
        SummaryColumn {
            module: Module::Electricity,
            header: "Emisiones electricidad mercado (t CO2e)".to_string(),
            keywords: ELECTRICITY_MARKET_KEYWORDS,
            default_column: 2,
            channel: Some(EmissionChannel::Market),
        },
        SummaryColumn {
            module: Module::Electricity,
            header: "Emisiones electricidad ubicación (t CO2e)".to_string(),
            keywords: ELECTRICITY_LOCATION_KEYWORDS,
            default_column: 3,
            channel: Some(EmissionChannel::Location),
        },
        quantity(Module::Gas, "Consumo gas (kWh)".to_string()),
        SummaryColumn {
            module: Module::Gas,
            header: "Emisiones gas (t CO2e)".to_string(),
            keywords: GAS_KEYWORDS,
            default_column: 2,
            channel: Some(EmissionChannel::Market),
        },
        quantity(Module::Fuel, "Consumo combustibles (l)".to_string()),
        SummaryColumn {
            module: Module::Fuel,
            header: "Emisiones combustibles (t CO2e)".to_string(),
            keywords: DIRECT_KEYWORDS,
            default_column: 2,
            channel: Some(EmissionChannel::Direct),
        },
        quantity(Module::Refrigerant, "Recarga refrigerantes (kg)".to_string()),
        SummaryColumn {
            module: Module::Refrigerant,
            header: "Emisiones refrigerantes (t CO2e)".to_string(),
            keywords: DIRECT_KEYWORDS,
            default_column: 2,
            channel: Some(EmissionChannel::Direct),
        },
    ]
}

impl SummaryColumn {
    /// 是否计入某个范围列（Generales 第 idx+1 列）
    fn feeds(&self, scope: Scope, channel: Option<EmissionChannel>) -> bool {
        self.channel.is_some()
            && self.module.scope() == scope
            && (channel.is_none() || self.channel == channel)
    }
}

// ==========================================
// ModuleReports - 四个可选的模块报表
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleReports<'a> {
    pub electricity: Option<&'a ReportDocument>,
    pub gas: Option<&'a ReportDocument>,
    pub fuel: Option<&'a ReportDocument>,
    pub refrigerant: Option<&'a ReportDocument>,
}

impl<'a> ModuleReports<'a> {
    pub fn get(&self, module: Module) -> Option<&'a ReportDocument> {
        match module {
            Module::Electricity => self.electricity,
            Module::Gas => self.gas,
            Module::Fuel => self.fuel,
            Module::Refrigerant => self.refrigerant,
        }
    }

    pub fn set(&mut self, module: Module, doc: &'a ReportDocument) {
        match module {
            Module::Electricity => self.electricity = Some(doc),
            Module::Gas => self.gas = Some(doc),
            Module::Fuel => self.fuel = Some(doc),
            Module::Refrigerant => self.refrigerant = Some(doc),
        }
    }
}

/// 单个模块在合并中的解析结果
struct ResolvedModule {
    module: Module,
    copy: ReportSheet,
    /// 每个 SummaryColumn 对应的源列
    columns: Vec<(usize, ColumnMatch)>,
    /// 副本中数据区的首行（0 起）
    data_start: usize,
    centers: Vec<String>,
}

/// 合并结果
#[derive(Debug)]
pub struct SummaryResult {
    pub document: ReportDocument,
    pub diagnostics: DiagnosticLog,
    pub centers: Vec<String>,
}

pub struct SummaryMerger {
    sheet_locator: Box<dyn SheetLocator>,
    column_locator: Box<dyn ColumnLocator>,
}

impl SummaryMerger {
    pub fn new(header_scan_rows: usize) -> Self {
        Self {
            sheet_locator: Box::new(PerCenterSheetLocator),
            column_locator: Box::new(KeywordColumnLocator::new(header_scan_rows)),
        }
    }

    pub fn with_locators(
        sheet_locator: Box<dyn SheetLocator>,
        column_locator: Box<dyn ColumnLocator>,
    ) -> Self {
        Self {
            sheet_locator,
            column_locator,
        }
    }

    /// 合并最多四个模块报表
    #[instrument(skip(self, reports))]
    pub fn merge(&self, reports: &ModuleReports<'_>) -> SummaryResult {
        let columns = summary_columns();
        let mut diagnostics = DiagnosticLog::new();
        let mut resolved: Vec<ResolvedModule> = Vec::new();

        for module in Module::ALL {
            let Some(doc) = reports.get(module) else {
                diagnostics.push(format!(
                    "{}: module report not provided; contributions = 0",
                    module.sheet_label()
                ));
                continue;
            };
            match self.resolve_module(module, doc, &columns, &mut diagnostics) {
                Some(r) => resolved.push(r),
                None => diagnostics.push(format!(
                    "{}: per-center sheet not found (tried {}); contributions = 0",
                    module.sheet_label(),
                    self.sheet_locator
                        .variants(module)
                        .iter()
                        .map(|v| format!("'{}'", v))
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            }
        }

        let centers = unify_centers(&resolved, &mut diagnostics);
        let general = build_general_sheet(&columns, &resolved, &centers);
        let scope = build_scope_sheet(&columns, &centers);
        diagnostics.push(format!("{} centers merged", centers.len()));

        let mut document = ReportDocument::new();
        document.push_sheet(general);
        document.push_sheet(scope);
        document.push_sheet(build_diagnostics_sheet(&diagnostics));
        for r in resolved {
            document.push_sheet(r.copy);
        }

        info!(
            centers = centers.len(),
            sheets = document.sheets.len(),
            "跨模块汇总完成"
        );

        SummaryResult {
            document,
            diagnostics,
            centers,
        }
    }

    fn resolve_module(
        &self,
        module: Module,
        doc: &ReportDocument,
        columns: &[SummaryColumn],
        diagnostics: &mut DiagnosticLog,
    ) -> Option<ResolvedModule> {
        let found = self.sheet_locator.locate(doc, module)?;
        diagnostics.push(format!(
            "{}: using sheet '{}' (variant {} '{}')",
            module.sheet_label(),
            found.sheet.name,
            found.variant_index,
            found.variant
        ));

        let mut matches = Vec::new();
        for (idx, column) in columns.iter().enumerate().filter(|(_, c)| c.module == module) {
            let hit = self
                .column_locator
                .locate(found.sheet, column.keywords, column.default_column);
            diagnostics.push(match &hit.header_text {
                Some(text) => format!(
                    "{}: '{}' from column {} (header '{}')",
                    module.sheet_label(),
                    column.header,
                    hit.column + 1,
                    text
                ),
                None => format!(
                    "{}: '{}' from column {} (positional default)",
                    module.sheet_label(),
                    column.header,
                    hit.column + 1
                ),
            });
            matches.push((idx, hit));
        }

        // 数据从命中的表头下一行开始；全部回退时从首个非空行的下一行开始
        let data_start = matches
            .iter()
            .filter_map(|(_, m)| m.header_row)
            .max()
            .map(|h| h + 1)
            .unwrap_or_else(|| {
                found
                    .sheet
                    .rows
                    .iter()
                    .position(|r| r.iter().any(|c| !c.is_empty()))
                    .map(|h| h + 1)
                    .unwrap_or(0)
            });

        let copy = copy_as_values(doc, found.sheet, per_center_sheet_name(module));
        let centers = (data_start..copy.row_count())
            .map(|row| copy.text_at(row, 0))
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("total"))
            .fold(Vec::<String>::new(), |mut acc, c| {
                if !acc.contains(&c) {
                    acc.push(c);
                }
                acc
            });

        Some(ResolvedModule {
            module,
            copy,
            columns: matches,
            data_start,
            centers,
        })
    }
}

/// 中心列表: 不区分大小写去重，保留首次出现的写法，电力优先
fn unify_centers(resolved: &[ResolvedModule], diagnostics: &mut DiagnosticLog) -> Vec<String> {
    let mut centers: Vec<String> = Vec::new();
    for r in resolved {
        for center in &r.centers {
            let key = center.to_lowercase();
            match centers.iter().find(|c| c.to_lowercase() == key) {
                None => centers.push(center.clone()),
                Some(kept) if kept != center => {
                    diagnostics.push_unique(format!(
                        "{}: center '{}' merged into '{}' (case-insensitive match)",
                        r.module.sheet_label(),
                        center,
                        kept
                    ));
                }
                Some(_) => {}
            }
        }
    }
    centers
}

/// SUMIF 条件字面量: 通配符转义后再按公式字符串转义引号
fn sumif_criterion(center: &str) -> String {
    let mut escaped = String::with_capacity(center.len() + 1);
    escaped.push('=');
    for c in center.chars() {
        match c {
            '~' | '*' | '?' => {
                escaped.push('~');
                escaped.push(c);
            }
            '"' => escaped.push_str("\"\""),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 复制工作表；公式单元格替换为求值结果（副本脱离原文档的其他表）
fn copy_as_values(doc: &ReportDocument, sheet: &ReportSheet, name: String) -> ReportSheet {
    let evaluator = FormulaEvaluator::new(doc);
    let mut copy = ReportSheet::new(name);
    for (r, row) in sheet.rows.iter().enumerate() {
        let cells = row
            .iter()
            .enumerate()
            .map(|(c, cell)| match cell {
                CellValue::Formula(_) => match evaluator.cell_value(&sheet.name, r, c) {
                    FormulaValue::Number(n) => CellValue::Number(n),
                    FormulaValue::Text(s) => CellValue::Text(s),
                    FormulaValue::Bool(b) => CellValue::Number(if b { 1.0 } else { 0.0 }),
                    FormulaValue::Empty | FormulaValue::Error(_) => CellValue::Empty,
                },
                other => other.clone(),
            })
            .collect();
        copy.push_row(cells);
    }
    copy
}

fn build_general_sheet(
    columns: &[SummaryColumn],
    resolved: &[ResolvedModule],
    centers: &[String],
) -> ReportSheet {
    let mut sheet = ReportSheet::new(GENERAL_SHEET);
    let mut header = vec!["Centro".to_string()];
    header.extend(columns.iter().map(|c| c.header.clone()));
    sheet.push_text_row(&header);

    for center in centers {
        let mut cells = vec![CellValue::text(center.as_str())];
        for (idx, column) in columns.iter().enumerate() {
            let source = resolved.iter().find(|m| m.module == column.module);
            let cell = match source.and_then(|m| {
                m.columns
                    .iter()
                    .find(|(i, _)| *i == idx)
                    .map(|(_, hit)| (m, hit))
            }) {
                Some((m, hit)) if m.data_start < m.copy.row_count() => {
                    let copy = quote_sheet(&m.copy.name);
                    let (first, last) = (m.data_start + 1, m.copy.row_count());
                    let values = column_letter(hit.column);
                    CellValue::formula(format!(
                        "=SUMIF({copy}!$A${first}:$A${last},\"{}\",{copy}!${values}${first}:${values}${last})",
                        sumif_criterion(center)
                    ))
                }
                _ => CellValue::Number(0.0),
            };
            cells.push(cell);
        }
        sheet.push_row(cells);
    }

    push_totals_row(&mut sheet, columns.len(), centers.len());
    sheet
}

fn build_scope_sheet(columns: &[SummaryColumn], centers: &[String]) -> ReportSheet {
    let buckets = [
        (Scope::Scope1, None, String::new()),
        (Scope::Scope2, Some(EmissionChannel::Market), " mercado".to_string()),
        (Scope::Scope2, Some(EmissionChannel::Location), " ubicación".to_string()),
    ];
    // 每个范围列对应的 Generales 列号
    let sources: Vec<Vec<usize>> = buckets
        .iter()
        .map(|(scope, channel, _)| {
            columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.feeds(*scope, *channel))
                .map(|(idx, _)| idx + 1)
                .collect()
        })
        .collect();

    let mut sheet = ReportSheet::new(SCOPE_SHEET);
    let mut header = vec!["Centro".to_string()];
    header.extend(
        buckets
            .iter()
            .map(|(scope, _, suffix)| format!("{}{} (t CO2e)", scope, suffix)),
    );
    header.push("Total (t CO2e)".to_string());
    sheet.push_text_row(&header);

    let general = quote_sheet(GENERAL_SHEET);
    for (i, center) in centers.iter().enumerate() {
        let r = i + 1;
        let mut cells = vec![CellValue::text(center.as_str())];
        for cols in &sources {
            cells.push(if cols.is_empty() {
                CellValue::Number(0.0)
            } else {
                let terms: Vec<String> = cols
                    .iter()
                    .map(|c| format!("{}!{}", general, cell_ref(r, *c)))
                    .collect();
                CellValue::formula(format!("={}", terms.join("+")))
            });
        }
        // 总计 = 范围 1 + 范围 2 市场法
        cells.push(CellValue::formula(format!(
            "={}+{}",
            cell_ref(r, 1),
            cell_ref(r, 2)
        )));
        sheet.push_row(cells);
    }

    push_totals_row(&mut sheet, buckets.len() + 1, centers.len());
    sheet
}

/// 合计行: 每个数值列对数据行求和
fn push_totals_row(sheet: &mut ReportSheet, numeric_columns: usize, data_rows: usize) {
    let mut cells = vec![CellValue::text("TOTAL")];
    for col in 1..=numeric_columns {
        if data_rows == 0 {
            cells.push(CellValue::Number(0.0));
        } else {
            cells.push(CellValue::formula(format!(
                "=SUM({}:{})",
                cell_ref(1, col),
                cell_ref(data_rows, col)
            )));
        }
    }
    sheet.push_row(cells);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_doc(name: &str, headers: &[&str], rows: &[(&str, [f64; 3])]) -> ReportDocument {
        let mut doc = ReportDocument::new();
        doc.add_sheet("Detalle").push_text_row(&["x"]);
        let sheet = doc.add_sheet(name);
        sheet.push_text_row(headers);
        for (center, values) in rows {
            let mut cells = vec![CellValue::text(*center)];
            cells.extend(values.iter().take(headers.len() - 1).map(|v| CellValue::Number(*v)));
            sheet.push_row(cells);
        }
        doc
    }

    fn electricity() -> ReportDocument {
        module_doc(
            "Electricidad - Por centro",
            &[
                "Centro",
                "Consumo (kWh)",
                "Emisiones mercado (t CO2e)",
                "Emisiones ubicación (t CO2e)",
            ],
            &[("Sede", [100.0, 25.0, 20.0]), ("Almacén", [50.0, 12.5, 10.0])],
        )
    }

    fn gas() -> ReportDocument {
        module_doc(
            "Gas Por centro",
            &["Centro", "Consumo (kWh)", "Emisiones mercado (t CO2e)"],
            &[("Planta", [200.0, 36.0, 0.0]), ("Sede", [10.0, 2.0, 0.0]), ("TOTAL", [210.0, 38.0, 0.0])],
        )
    }

    #[test]
    fn test_merge_sheet_order_and_centers() {
        let elec = electricity();
        let gas = gas();
        let reports = ModuleReports {
            electricity: Some(&elec),
            gas: Some(&gas),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);

        assert_eq!(
            result.document.sheet_names(),
            vec![
                "Generales",
                "Por alcance",
                "Diagnóstico",
                "Electricidad - Por centro",
                "Gas - Por centro"
            ]
        );
        assert_eq!(result.centers, vec!["Sede", "Almacén", "Planta"]);
        assert!(result.diagnostics.contains("Combustibles: module report not provided"));
        assert!(result.diagnostics.contains("Gas: using sheet 'Gas Por centro' (variant 2"));
    }

    #[test]
    fn test_lookup_formulas_and_scope_totals() {
        let elec = electricity();
        let gas = gas();
        let reports = ModuleReports {
            electricity: Some(&elec),
            gas: Some(&gas),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);
        let general = result.document.sheet(GENERAL_SHEET).unwrap();

        assert_eq!(
            general.get(1, 2),
            Some(&CellValue::Formula(
                "=SUMIF('Electricidad - Por centro'!$A$2:$A$3,\"=Sede\",'Electricidad - Por centro'!$C$2:$C$3)"
                    .into()
            ))
        );
        // 燃料模块缺失 → 字面量 0
        assert_eq!(general.get(1, 6), Some(&CellValue::Number(0.0)));

        let ev = FormulaEvaluator::new(&result.document);
        // Sede: 电力市场法 25 + 燃气 2
        assert_eq!(ev.number_at(SCOPE_SHEET, 1, 1), Some(2.0));
        assert_eq!(ev.number_at(SCOPE_SHEET, 1, 2), Some(25.0));
        assert_eq!(ev.number_at(SCOPE_SHEET, 1, 3), Some(20.0));
        assert_eq!(ev.number_at(SCOPE_SHEET, 1, 4), Some(27.0));
        // Planta 无电力 → SUMIF 无命中 → 0
        assert_eq!(ev.number_at(GENERAL_SHEET, 3, 1), Some(0.0));
        // 合计行（TOTAL 行不参与）
        assert_eq!(ev.number_at(GENERAL_SHEET, 4, 4), Some(210.0));
        assert_eq!(ev.number_at(SCOPE_SHEET, 4, 4), Some(75.5));
    }

    #[test]
    fn test_case_variant_centers_are_merged() {
        let fuel = module_doc(
            "Combustibles - Por centro",
            &["Centro", "Consumo (l)", "Emisiones (t CO2e)"],
            &[
                ("Sede", [10.0, 1.0, 0.0]),
                ("SEDE", [30.0, 3.0, 0.0]),
                ("TOTAL", [40.0, 4.0, 0.0]),
            ],
        );
        let elec = electricity();
        let reports = ModuleReports {
            electricity: Some(&elec),
            fuel: Some(&fuel),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);
        assert_eq!(result.centers, vec!["Sede", "Almacén"]);
        assert!(result
            .diagnostics
            .contains("Combustibles: center 'SEDE' merged into 'Sede' (case-insensitive match)"));

        let ev = FormulaEvaluator::new(&result.document);
        assert_eq!(ev.number_at(GENERAL_SHEET, 1, 6), Some(40.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, 1, 7), Some(4.0));
        // 合计与模块合计一致
        let total = result.centers.len() + 1;
        assert_eq!(ev.number_at(GENERAL_SHEET, total, 6), Some(40.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, total, 7), Some(4.0));
        assert_eq!(ev.number_at(SCOPE_SHEET, total, 1), Some(4.0));
    }

    #[test]
    fn test_wildcard_characters_in_center_names_match_literally() {
        let gas = module_doc(
            "Gas - Por centro",
            &["Centro", "Consumo (kWh)", "Emisiones mercado (t CO2e)"],
            &[
                ("Nave*", [5.0, 1.0, 0.0]),
                ("Nave 2", [7.0, 2.0, 0.0]),
                ("Obra \"Norte\"?", [11.0, 3.0, 0.0]),
            ],
        );
        let reports = ModuleReports {
            gas: Some(&gas),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);
        let general = result.document.sheet(GENERAL_SHEET).unwrap();
        assert_eq!(
            general.get(1, 4),
            Some(&CellValue::Formula(
                "=SUMIF('Gas - Por centro'!$A$2:$A$4,\"=Nave~*\",'Gas - Por centro'!$B$2:$B$4)"
                    .into()
            ))
        );

        let ev = FormulaEvaluator::new(&result.document);
        assert_eq!(ev.number_at(GENERAL_SHEET, 1, 4), Some(5.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, 2, 4), Some(7.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, 3, 5), Some(3.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, 4, 5), Some(6.0));
    }

    #[test]
    fn test_scope_columns_follow_module_scope() {
        let columns = summary_columns();
        let scope1: Vec<Module> = columns
            .iter()
            .filter(|c| c.feeds(Scope::Scope1, None))
            .map(|c| c.module)
            .collect();
        assert_eq!(scope1, vec![Module::Gas, Module::Fuel, Module::Refrigerant]);
        let market: Vec<&str> = columns
            .iter()
            .filter(|c| c.feeds(Scope::Scope2, Some(EmissionChannel::Market)))
            .map(|c| c.header.as_str())
            .collect();
        assert_eq!(market, vec!["Emisiones electricidad mercado (t CO2e)"]);

        let scope = build_scope_sheet(&columns, &["Sede".to_string()]);
        assert_eq!(scope.text_at(0, 1), "Alcance 1 (t CO2e)");
        assert_eq!(scope.text_at(0, 3), "Alcance 2 ubicación (t CO2e)");
        assert_eq!(
            scope.get(1, 1),
            Some(&CellValue::Formula(
                "='Generales'!F2+'Generales'!H2+'Generales'!J2".into()
            ))
        );
    }

    #[test]
    fn test_positional_fallback_is_recorded() {
        let fuel = module_doc(
            "Por centro",
            &["Centro", "Litros", "CO2"],
            &[("Sede", [40.0, 0.1, 0.0])],
        );
        let reports = ModuleReports {
            fuel: Some(&fuel),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);
        assert!(result.diagnostics.contains("from column 3 (positional default)"));
        let ev = FormulaEvaluator::new(&result.document);
        assert_eq!(ev.number_at(GENERAL_SHEET, 1, 6), Some(40.0));
        assert_eq!(ev.number_at(GENERAL_SHEET, 1, 7), Some(0.1));
    }

    #[test]
    fn test_missing_per_center_sheet_is_not_fatal() {
        let mut doc = ReportDocument::new();
        doc.add_sheet("Resumen").push_text_row(&["x"]);
        let reports = ModuleReports {
            refrigerant: Some(&doc),
            ..Default::default()
        };
        let result = SummaryMerger::new(5).merge(&reports);
        assert!(result.centers.is_empty());
        assert!(result.diagnostics.contains("Refrigerantes: per-center sheet not found"));
        assert_eq!(result.document.sheets.len(), 3);
    }
}
