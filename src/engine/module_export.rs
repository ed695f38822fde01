// ==========================================
// 温室气体中心报表 - 单模块导出编排
// ==========================================
// 流程: 源行 → 映射 → 发票过滤 → 数量解析 → 年度分摊
//       → 供应点分摊 → 因子解析 → 明细行 + 中心聚合
// 输出: 明细 / 按中心 / 合计 / 诊断 四张工作表（内存中构建，一次写出）
// 红线: 单行问题只产生 Skipped + 诊断行，绝不中断整次导出
// ==========================================

use crate::config::ExportConfig;
use crate::domain::billing::{BillingRow, SourceSheet};
use crate::domain::factor::FactorTable;
use crate::domain::outcome::{DiagnosticLog, RowOutcome, SkipReason};
use crate::domain::report::{column_letter, quote_sheet, CellValue, ReportDocument, ReportSheet};
use crate::domain::types::Module;
use crate::engine::center_aggregator::{CenterAggregates, CenterAggregator};
use crate::engine::connection_splitter::{CenterAllocation, ConnectionPointSplitter};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::factor_resolver::{FactorResolver, ResolvedFactors};
use crate::engine::locator::per_center_sheet_name;
use crate::engine::prorator::{DateOverlapProrator, Proration};
use crate::engine::row_writer::{FormulaBackedRowWriter, RowQuantities};
use crate::importer::field_mapper::{FieldMapper, RowMapper};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 取消标志轮询间隔（行）
pub const CANCEL_CHECK_INTERVAL: usize = 256;

/// 诊断表名称
pub const DIAGNOSTICS_SHEET: &str = "Diagnóstico";

pub fn detail_sheet_name(module: Module) -> String {
    format!("{} - Detalle", module.sheet_label())
}

pub fn total_sheet_name(module: Module) -> String {
    format!("{} - Total", module.sheet_label())
}

// ==========================================
// CancelFlag - 粗粒度取消
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==========================================
// ExportContext - 单次导出的全部输入（显式传入）
// ==========================================
pub struct ExportContext<'a> {
    pub config: &'a ExportConfig,
    pub factors: &'a FactorTable,
    pub splitter: &'a ConnectionPointSplitter,
}

/// 通过全部过滤的行
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedRow {
    pub row: BillingRow,
    pub quantity: f64,
    pub proration: Proration,
    pub allocations: Vec<CenterAllocation>,
    pub factors: ResolvedFactors,
}

/// 导出结果
#[derive(Debug)]
pub struct ModuleExportResult {
    pub run_id: String,
    pub module: Module,
    pub year: i32,
    pub document: ReportDocument,
    pub aggregates: CenterAggregates,
    pub diagnostics: DiagnosticLog,
    pub accepted_rows: usize,
    pub skipped_rows: usize,
    pub detail_rows: usize,
}

// ==========================================
// ModuleExporter
// ==========================================
pub struct ModuleExporter {
    prorator: DateOverlapProrator,
    resolver: FactorResolver,
    mapper: Box<dyn RowMapper>,
}

impl ModuleExporter {
    pub fn new() -> Self {
        Self {
            prorator: DateOverlapProrator::new(),
            resolver: FactorResolver::new(),
            mapper: Box::new(FieldMapper::new()),
        }
    }

    pub fn with_mapper(mapper: Box<dyn RowMapper>) -> Self {
        Self {
            mapper,
            ..Self::new()
        }
    }

    /// 单行处理（不写报表）
    pub fn process_row(
        &self,
        row: BillingRow,
        ctx: &ExportContext<'_>,
        diagnostics: &mut DiagnosticLog,
    ) -> RowOutcome<AcceptedRow> {
        let config = ctx.config;

        if !config.invoice_selected(row.invoice_id.as_deref()) {
            return RowOutcome::Skipped(SkipReason::InvoiceNotSelected {
                invoice: row.invoice_id.clone(),
            });
        }

        let quantity = match (&row.quantity_raw, row.quantity) {
            (None, _) => return RowOutcome::Skipped(SkipReason::MissingQuantity),
            (Some(raw), None) => {
                return RowOutcome::Skipped(SkipReason::InvalidQuantity { raw: raw.clone() })
            }
            (Some(_), Some(q)) if q <= 0.0 => {
                return RowOutcome::Skipped(SkipReason::NonPositiveQuantity { value: q })
            }
            (Some(_), Some(q)) => q,
        };

        let proration = self.prorator.prorate(
            row.period_start.as_deref(),
            row.period_end.as_deref(),
            config.year,
        );
        if proration.dates_known && proration.is_outside() {
            return RowOutcome::Skipped(SkipReason::OutsideYear {
                start: row.period_start.clone(),
                end: row.period_end.clone(),
                year: config.year,
            });
        }

        let applicable = quantity * proration.fraction;
        let allocations = ctx.splitter.split(
            row.connection_point.as_deref(),
            row.center.as_deref(),
            applicable,
            &config.unassigned_center_label,
        );

        let marketer = ctx.splitter.marketer_for(row.connection_point.as_deref());
        let factors = self.resolver.resolve_row(
            ctx.factors,
            &row,
            marketer,
            &config.location_key,
            diagnostics,
        );

        if factors.values.iter().any(|(_, f)| !f.is_finite()) || !applicable.is_finite() {
            return RowOutcome::Skipped(SkipReason::Failed {
                message: "non-finite quantity or factor".to_string(),
            });
        }

        RowOutcome::Accepted(AcceptedRow {
            row,
            quantity,
            proration,
            allocations,
            factors,
        })
    }

    /// 导出一个模块的完整报表
    #[instrument(skip(self, sheet, ctx, cancel), fields(module = %ctx.config.module, year = ctx.config.year))]
    pub fn export(
        &self,
        sheet: &SourceSheet,
        ctx: &ExportContext<'_>,
        cancel: Option<&CancelFlag>,
    ) -> EngineResult<ModuleExportResult> {
        ctx.config.validate().map_err(EngineError::InvalidConfig)?;
        if ctx.factors.module != ctx.config.module || ctx.factors.year != ctx.config.year {
            return Err(EngineError::InvalidConfig(format!(
                "factor table {}/{} does not match export {}/{}",
                ctx.factors.module, ctx.factors.year, ctx.config.module, ctx.config.year
            )));
        }

        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let module = ctx.config.module;
        let writer = FormulaBackedRowWriter::new(module);

        let mut diagnostics = DiagnosticLog::new();
        let mut aggregator = CenterAggregator::new(module);
        let mut detail = ReportSheet::new(detail_sheet_name(module));
        writer.write_header(&mut detail);

        let mut accepted_rows = 0usize;
        let mut skipped_rows = 0usize;

        if sheet.header_row.is_none() {
            diagnostics.push(SkipReason::NoHeader.to_string());
        }

        for (processed, (row_number, cells)) in sheet.data_rows().enumerate() {
            if processed % CANCEL_CHECK_INTERVAL == 0 && cancel.map_or(false, |c| c.is_cancelled()) {
                info!(run_id = %run_id, processed, "导出已取消");
                return Err(EngineError::Cancelled { processed });
            }
            if FieldMapper::is_blank_row(cells) {
                continue;
            }

            let billing = self.mapper.map_row(cells, row_number, &ctx.config.mapping);
            match self.process_row(billing, ctx, &mut diagnostics) {
                RowOutcome::Accepted(accepted) => {
                    accepted_rows += 1;
                    for allocation in &accepted.allocations {
                        let written = writer.write_row(
                            &mut detail,
                            &accepted.row,
                            &RowQuantities {
                                total_quantity: accepted.quantity,
                                period_days: accepted.proration.period_days,
                                days_in_year: accepted.proration.overlap_days,
                                center: allocation.center.clone(),
                                centers_at_point: allocation.centers_at_point,
                            },
                            &accepted.factors,
                        );
                        aggregator.add(&allocation.center, written.center_quantity, &written.emissions);
                    }
                }
                RowOutcome::Skipped(reason) => {
                    skipped_rows += 1;
                    debug!(row = row_number, reason = %reason, "跳过源行");
                    diagnostics.skipped(row_number, &reason);
                }
            }
        }

        let aggregates = aggregator.finalize();
        diagnostics.push(format!(
            "{} centers aggregated ({} rows accepted, {} rows skipped)",
            aggregates.len(),
            accepted_rows,
            skipped_rows
        ));

        let detail_rows = detail.row_count().saturating_sub(1);
        let mut document = ReportDocument::new();
        document.push_sheet(detail);
        document.push_sheet(build_per_center_sheet(module, &aggregates));
        document.push_sheet(build_total_sheet(
            module,
            ctx.config.year,
            &aggregates,
            accepted_rows,
            skipped_rows,
        ));
        document.push_sheet(build_diagnostics_sheet(&diagnostics));

        info!(
            run_id = %run_id,
            module = %module,
            year = ctx.config.year,
            accepted = accepted_rows,
            skipped = skipped_rows,
            centers = aggregates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "模块导出完成"
        );

        Ok(ModuleExportResult {
            run_id,
            module,
            year: ctx.config.year,
            document,
            aggregates,
            diagnostics,
            accepted_rows,
            skipped_rows,
            detail_rows,
        })
    }
}

impl Default for ModuleExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// 按中心表: 中心 | 消耗量 | 各通道排放（聚合字面值）
pub fn build_per_center_sheet(module: Module, aggregates: &CenterAggregates) -> ReportSheet {
    let mut sheet = ReportSheet::new(per_center_sheet_name(module));
    let mut header = vec![
        "Centro".to_string(),
        format!("Consumo ({})", module.quantity_unit()),
    ];
    for channel in module.channels() {
        header.push(format!("Emisiones {} (t CO2e)", channel.label()));
    }
    sheet.push_text_row(&header);

    for totals in aggregates.iter() {
        let mut cells = vec![
            CellValue::text(totals.center.as_str()),
            CellValue::Number(totals.quantity),
        ];
        cells.extend(totals.emissions.iter().map(|e| CellValue::Number(*e)));
        sheet.push_row(cells);
    }
    sheet
}

/// 合计表: 统计项 + 对按中心表各列的 SUM 公式
fn build_total_sheet(
    module: Module,
    year: i32,
    aggregates: &CenterAggregates,
    accepted_rows: usize,
    skipped_rows: usize,
) -> ReportSheet {
    let mut sheet = ReportSheet::new(total_sheet_name(module));
    sheet.push_text_row(&["Concepto", "Valor"]);
    sheet.push_row(vec![CellValue::text("Módulo"), CellValue::text(module.sheet_label())]);
    sheet.push_row(vec![CellValue::text("Año"), CellValue::Number(year as f64)]);
    sheet.push_row(vec![
        CellValue::text("Centros"),
        CellValue::Number(aggregates.len() as f64),
    ]);
    sheet.push_row(vec![
        CellValue::text("Filas aceptadas"),
        CellValue::Number(accepted_rows as f64),
    ]);
    sheet.push_row(vec![
        CellValue::text("Filas omitidas"),
        CellValue::Number(skipped_rows as f64),
    ]);

    let per_center = quote_sheet(&per_center_sheet_name(module));
    let last_row = aggregates.len() + 1;
    let sum_of = |col: usize| {
        if aggregates.is_empty() {
            CellValue::Number(0.0)
        } else {
            let letter = column_letter(col);
            CellValue::formula(format!(
                "=SUM({}!{}2:{}{})",
                per_center, letter, letter, last_row
            ))
        }
    };

    sheet.push_row(vec![
        CellValue::text(format!("Consumo total ({})", module.quantity_unit())),
        sum_of(1),
    ]);
    for (idx, channel) in module.channels().iter().enumerate() {
        sheet.push_row(vec![
            CellValue::text(format!("Emisiones {} (t CO2e)", channel.label())),
            sum_of(2 + idx),
        ]);
    }
    sheet
}

/// 诊断表（每行一条）
pub fn build_diagnostics_sheet(diagnostics: &DiagnosticLog) -> ReportSheet {
    let mut sheet = ReportSheet::new(DIAGNOSTICS_SHEET);
    sheet.push_text_row(&["Diagnóstico"]);
    for line in diagnostics.lines() {
        sheet.push_text_row(&[line.as_str()]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{ColumnMapping, ConnectionPointRegistration, FieldSource};
    use crate::engine::formula::FormulaEvaluator;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            connection_point: FieldSource::Column(0),
            invoice_id: FieldSource::Column(1),
            period_start: FieldSource::Column(2),
            period_end: FieldSource::Column(3),
            quantity: FieldSource::Column(4),
            center: FieldSource::Column(5),
            factor_key: FieldSource::Column(6),
        }
    }

    fn sheet(rows: &[[&str; 7]]) -> SourceSheet {
        let mut all = vec![vec![
            "CUPS", "Factura", "Inicio", "Fin", "Consumo", "Centro", "Comercializadora",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()];
        for r in rows {
            all.push(r.iter().map(|c| c.to_string()).collect());
        }
        SourceSheet::from_rows("Hoja1", all)
    }

    fn run(source: &SourceSheet, year: i32) -> ModuleExportResult {
        let config = ExportConfig::new(Module::Electricity, year, mapping());
        let factors = FactorTable::from_entries(
            Module::Electricity,
            year,
            vec![("Iberdrola", 250.0), ("Mix peninsular", 200.0)],
        );
        let splitter = ConnectionPointSplitter::new(&[
            ConnectionPointRegistration {
                connection_point: "ES001".into(),
                center_name: "Sede".into(),
                marketer: None,
            },
            ConnectionPointRegistration {
                connection_point: "ES001".into(),
                center_name: "Almacén".into(),
                marketer: None,
            },
        ]);
        let ctx = ExportContext {
            config: &config,
            factors: &factors,
            splitter: &splitter,
        };
        ModuleExporter::new().export(source, &ctx, None).unwrap()
    }

    #[test]
    fn test_export_builds_four_sheets_in_order() {
        let source = sheet(&[["ES002", "F-1", "2023-06-01", "2023-06-30", "300", "Sede", "Iberdrola"]]);
        let result = run(&source, 2023);
        assert_eq!(
            result.document.sheet_names(),
            vec![
                "Electricidad - Detalle",
                "Electricidad - Por centro",
                "Electricidad - Total",
                "Diagnóstico"
            ]
        );
        assert_eq!(result.accepted_rows, 1);
        let sede = result.aggregates.get("Sede").unwrap();
        assert_eq!(sede.quantity, 300.0);
        assert!((sede.emissions[0] - 75.0).abs() < 1e-9);
        assert!((sede.emissions[1] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_year_row_is_skipped() {
        let source = sheet(&[["ES002", "F-1", "2023-06-01", "2023-06-30", "300", "Sede", "Iberdrola"]]);
        let result = run(&source, 2024);
        assert_eq!(result.accepted_rows, 0);
        assert_eq!(result.skipped_rows, 1);
        assert!(result.aggregates.is_empty());
        assert!(result.diagnostics.contains("outside year 2024"));
        assert_eq!(result.detail_rows, 0);
    }

    #[test]
    fn test_shared_point_produces_one_detail_row_per_center() {
        let source = sheet(&[["ES001", "F-1", "2023-06-01", "2023-06-30", "100", "", "Iberdrola"]]);
        let result = run(&source, 2023);
        assert_eq!(result.detail_rows, 2);
        assert_eq!(result.aggregates.get("Sede").unwrap().quantity, 50.0);
        assert_eq!(result.aggregates.get("Almacén").unwrap().quantity, 50.0);

        let ev = FormulaEvaluator::new(&result.document);
        assert_eq!(ev.number_at("Electricidad - Detalle", 1, 12), Some(50.0));
    }

    #[test]
    fn test_skip_reasons_and_blank_rows() {
        let source = sheet(&[
            ["", "", "", "", "", "", ""],
            ["ES002", "F-1", "", "", "n/a", "Sede", "Iberdrola"],
            ["ES002", "F-2", "", "", "", "Sede", "Iberdrola"],
            ["ES002", "F-3", "", "", "-4", "Sede", "Iberdrola"],
            ["ES002", "F-4", "2023-06-30", "2023-06-01", "4", "Sede", "Iberdrola"],
        ]);
        let result = run(&source, 2023);
        assert_eq!(result.skipped_rows, 4);
        assert!(result.diagnostics.contains("row 3 skipped: quantity 'n/a' is not a number"));
        assert!(result.diagnostics.contains("row 4 skipped: quantity missing"));
        assert!(result.diagnostics.contains("row 5 skipped: quantity -4 is not positive"));
        assert!(result.diagnostics.contains("row 6 skipped: period"));
        assert!(result
            .diagnostics
            .contains("0 centers aggregated (0 rows accepted, 4 rows skipped)"));
    }

    #[test]
    fn test_total_sheet_sums_per_center_columns() {
        let source = sheet(&[
            ["ES002", "F-1", "2023-06-01", "2023-06-30", "300", "Sede", "Iberdrola"],
            ["ES003", "F-2", "2023-07-01", "2023-07-31", "100", "Planta", "Iberdrola"],
        ]);
        let result = run(&source, 2023);
        let ev = FormulaEvaluator::new(&result.document);
        // 第 7 行: 消耗量合计
        assert_eq!(ev.number_at("Electricidad - Total", 6, 1), Some(400.0));
        assert_eq!(ev.number_at("Electricidad - Total", 7, 1), Some(100.0));
    }

    #[test]
    fn test_empty_source_reports_no_header() {
        let source = SourceSheet::from_rows("Hoja1", vec![vec![String::new()]]);
        let result = run(&source, 2023);
        assert!(result.diagnostics.contains("no header found"));
        assert_eq!(result.document.sheets.len(), 4);
    }

    #[test]
    fn test_cancelled_before_first_batch() {
        let source = sheet(&[["ES002", "F-1", "2023-06-01", "2023-06-30", "300", "Sede", "Iberdrola"]]);
        let config = ExportConfig::new(Module::Electricity, 2023, mapping());
        let factors = FactorTable::new(Module::Electricity, 2023);
        let splitter = ConnectionPointSplitter::default();
        let ctx = ExportContext {
            config: &config,
            factors: &factors,
            splitter: &splitter,
        };
        let flag = CancelFlag::new();
        flag.cancel();
        let result = ModuleExporter::new().export(&source, &ctx, Some(&flag));
        assert!(matches!(result, Err(EngineError::Cancelled { processed: 0 })));
    }

    #[test]
    fn test_mismatched_factor_table_is_rejected() {
        let source = sheet(&[]);
        let config = ExportConfig::new(Module::Gas, 2023, mapping());
        let factors = FactorTable::new(Module::Gas, 2022);
        let splitter = ConnectionPointSplitter::default();
        let ctx = ExportContext {
            config: &config,
            factors: &factors,
            splitter: &splitter,
        };
        let result = ModuleExporter::new().export(&source, &ctx, None);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
