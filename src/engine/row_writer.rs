// ==========================================
// 温室气体中心报表 - 公式化明细行写入器
// ==========================================
// 原始字段 + 因子写字面量；所有派生数值写公式，只引用同一行左侧单元格
// 同时按公式的运算顺序计算字面值，供聚合使用（公式/字面量一致）
// ==========================================

use crate::domain::billing::BillingRow;
use crate::domain::report::{cell_ref, CellValue, ReportSheet};
use crate::domain::types::{EmissionChannel, Module};
use crate::engine::factor_resolver::ResolvedFactors;

// ===== 明细表列布局（从 0 开始）=====
pub const COL_CONNECTION_POINT: usize = 0;
pub const COL_INVOICE: usize = 1;
pub const COL_START: usize = 2;
pub const COL_END: usize = 3;
pub const COL_CENTER: usize = 4;
pub const COL_FACTOR_KEY: usize = 5;
pub const COL_QUANTITY: usize = 6;
pub const COL_PERIOD_DAYS: usize = 7;
pub const COL_DAYS_IN_YEAR: usize = 8;
pub const COL_PERCENT_YEAR: usize = 9;
pub const COL_YEAR_QUANTITY: usize = 10;
pub const COL_CENTERS_AT_POINT: usize = 11;
pub const COL_PERCENT_CENTER: usize = 12;
pub const COL_CENTER_QUANTITY: usize = 13;
pub const COL_FIRST_FACTOR: usize = 14;

/// 一条明细行的计算输入
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuantities {
    pub total_quantity: f64,
    /// 0 = 日期未知（公式按 100 % 处理）
    pub period_days: i64,
    pub days_in_year: i64,
    pub center: String,
    pub centers_at_point: usize,
}

/// 写入结果（与公式结果一致的字面值）
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenRow {
    pub sheet_row: usize,
    pub year_quantity: f64,
    pub center_quantity: f64,
    pub emissions: Vec<f64>,
}

pub struct FormulaBackedRowWriter {
    module: Module,
    channels: &'static [EmissionChannel],
}

impl FormulaBackedRowWriter {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            channels: module.channels(),
        }
    }

    pub fn factor_column(&self, channel_index: usize) -> usize {
        COL_FIRST_FACTOR + channel_index
    }

    pub fn emissions_column(&self, channel_index: usize) -> usize {
        COL_FIRST_FACTOR + self.channels.len() + channel_index
    }

    pub fn column_count(&self) -> usize {
        COL_FIRST_FACTOR + self.channels.len() * 2
    }

    /// 明细表表头
    pub fn write_header(&self, sheet: &mut ReportSheet) -> usize {
        let unit = self.module.quantity_unit();
        let mut header: Vec<String> = vec![
            "CUPS".to_string(),
            "Factura".to_string(),
            "Fecha inicio".to_string(),
            "Fecha fin".to_string(),
            "Centro".to_string(),
            self.module.factor_key_label().to_string(),
            format!("Consumo ({})", unit),
            "Días periodo".to_string(),
            "Días en el año".to_string(),
            "% año".to_string(),
            format!("Consumo año ({})", unit),
            "Centros en CUPS".to_string(),
            "% centro".to_string(),
            format!("Consumo centro ({})", unit),
        ];
        for channel in self.channels {
            header.push(format!("Factor {} (kg CO2e/{})", channel.label(), unit));
        }
        for channel in self.channels {
            header.push(format!("Emisiones {} (t CO2e)", channel.label()));
        }
        sheet.push_text_row(&header)
    }

    /// 写入一条明细行
    ///
    /// # 参数
    /// - raw: 源行（字面量列）
    /// - quantities: 数量/天数/中心分摊
    /// - factors: 各通道因子（写字面量，位于排放公式左侧）
    pub fn write_row(
        &self,
        sheet: &mut ReportSheet,
        raw: &BillingRow,
        quantities: &RowQuantities,
        factors: &ResolvedFactors,
    ) -> WrittenRow {
        let r = sheet.row_count();
        let at = |col: usize| cell_ref(r, col);

        let mut cells = vec![CellValue::Empty; self.column_count()];
        cells[COL_CONNECTION_POINT] = CellValue::opt_text(raw.connection_point.as_deref());
        cells[COL_INVOICE] = CellValue::opt_text(raw.invoice_id.as_deref());
        cells[COL_START] = CellValue::opt_text(raw.period_start.as_deref());
        cells[COL_END] = CellValue::opt_text(raw.period_end.as_deref());
        cells[COL_CENTER] = CellValue::text(quantities.center.as_str());
        cells[COL_FACTOR_KEY] = CellValue::opt_text(factors.key_used.as_deref());
        cells[COL_QUANTITY] = CellValue::Number(quantities.total_quantity);
        cells[COL_PERIOD_DAYS] = CellValue::Number(quantities.period_days as f64);
        cells[COL_DAYS_IN_YEAR] = CellValue::Number(quantities.days_in_year as f64);
        cells[COL_PERCENT_YEAR] = CellValue::formula(format!(
            "=IF({h}=0,100,{i}/{h}*100)",
            h = at(COL_PERIOD_DAYS),
            i = at(COL_DAYS_IN_YEAR)
        ));
        cells[COL_YEAR_QUANTITY] = CellValue::formula(format!(
            "={}*({}/100)",
            at(COL_QUANTITY),
            at(COL_PERCENT_YEAR)
        ));
        cells[COL_CENTERS_AT_POINT] = CellValue::Number(quantities.centers_at_point as f64);
        cells[COL_PERCENT_CENTER] =
            CellValue::formula(format!("=100/{}", at(COL_CENTERS_AT_POINT)));
        cells[COL_CENTER_QUANTITY] = CellValue::formula(format!(
            "={}*({}/100)",
            at(COL_YEAR_QUANTITY),
            at(COL_PERCENT_CENTER)
        ));

        // 字面值按公式相同的运算顺序计算
        let percent_year = if quantities.period_days == 0 {
            100.0
        } else {
            quantities.days_in_year as f64 / quantities.period_days as f64 * 100.0
        };
        let year_quantity = quantities.total_quantity * (percent_year / 100.0);
        let percent_center = 100.0 / quantities.centers_at_point.max(1) as f64;
        let center_quantity = year_quantity * (percent_center / 100.0);

        let mut emissions = Vec::with_capacity(self.channels.len());
        for (idx, channel) in self.channels.iter().enumerate() {
            let factor = factors.factor(*channel);
            let factor_col = self.factor_column(idx);
            cells[factor_col] = CellValue::Number(factor);
            cells[self.emissions_column(idx)] = CellValue::formula(format!(
                "={}*{}/1000",
                at(COL_CENTER_QUANTITY),
                at(factor_col)
            ));
            emissions.push(center_quantity * factor / 1000.0);
        }

        let sheet_row = sheet.push_row(cells);
        WrittenRow {
            sheet_row,
            year_quantity,
            center_quantity,
            emissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ReportDocument;
    use crate::engine::formula::FormulaEvaluator;

    fn factors(values: Vec<(EmissionChannel, f64)>) -> ResolvedFactors {
        ResolvedFactors {
            values,
            key_used: Some("Iberdrola".into()),
        }
    }

    fn raw() -> BillingRow {
        BillingRow {
            row_number: 2,
            connection_point: Some("ES001".into()),
            invoice_id: Some("F-1".into()),
            period_start: Some("2022-12-28".into()),
            period_end: Some("2023-01-06".into()),
            quantity: Some(100.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_formulas_reference_only_left_cells() {
        let writer = FormulaBackedRowWriter::new(Module::Electricity);
        let mut doc = ReportDocument::new();
        let sheet = doc.add_sheet("Electricidad - Detalle");
        writer.write_header(sheet);
        writer.write_row(
            sheet,
            &raw(),
            &RowQuantities {
                total_quantity: 100.0,
                period_days: 10,
                days_in_year: 6,
                center: "Sede".into(),
                centers_at_point: 2,
            },
            &factors(vec![
                (EmissionChannel::Market, 250.0),
                (EmissionChannel::Location, 180.0),
            ]),
        );

        let row = &sheet.rows[1];
        assert_eq!(row[COL_PERCENT_YEAR], CellValue::Formula("=IF(H2=0,100,I2/H2*100)".into()));
        assert_eq!(row[COL_YEAR_QUANTITY], CellValue::Formula("=G2*(J2/100)".into()));
        assert_eq!(row[COL_PERCENT_CENTER], CellValue::Formula("=100/L2".into()));
        assert_eq!(row[COL_CENTER_QUANTITY], CellValue::Formula("=K2*(M2/100)".into()));
        assert_eq!(row[14], CellValue::Number(250.0));
        assert_eq!(row[15], CellValue::Number(180.0));
        assert_eq!(row[16], CellValue::Formula("=N2*O2/1000".into()));
        assert_eq!(row[17], CellValue::Formula("=N2*P2/1000".into()));
        assert_eq!(sheet.rows[0].len(), writer.column_count());
    }

    #[test]
    fn test_literal_values_match_formula_results() {
        let writer = FormulaBackedRowWriter::new(Module::Electricity);
        let mut doc = ReportDocument::new();
        let written = {
            let sheet = doc.add_sheet("D");
            writer.write_row(
                sheet,
                &raw(),
                &RowQuantities {
                    total_quantity: 100.0,
                    period_days: 10,
                    days_in_year: 6,
                    center: "Sede".into(),
                    centers_at_point: 2,
                },
                &factors(vec![
                    (EmissionChannel::Market, 250.0),
                    (EmissionChannel::Location, 180.0),
                ]),
            )
        };

        assert!((written.year_quantity - 60.0).abs() < 1e-9);
        assert!((written.center_quantity - 30.0).abs() < 1e-9);

        let ev = FormulaEvaluator::new(&doc);
        let n = ev.number_at("D", written.sheet_row, COL_CENTER_QUANTITY).unwrap();
        assert!((n - written.center_quantity).abs() < 1e-9);
        for idx in 0..2 {
            let e = ev
                .number_at("D", written.sheet_row, writer.emissions_column(idx))
                .unwrap();
            assert!((e - written.emissions[idx]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_dates_written_as_full_year() {
        let writer = FormulaBackedRowWriter::new(Module::Refrigerant);
        let mut doc = ReportDocument::new();
        let sheet = doc.add_sheet("R");
        let written = writer.write_row(
            sheet,
            &BillingRow::default(),
            &RowQuantities {
                total_quantity: 2.0,
                period_days: 0,
                days_in_year: 0,
                center: "SIN CENTRO".into(),
                centers_at_point: 1,
            },
            &factors(vec![(EmissionChannel::Direct, 2088.0)]),
        );
        assert_eq!(writer.column_count(), 16);
        assert!((written.emissions[0] - 4.176).abs() < 1e-9);

        let ev = FormulaEvaluator::new(&doc);
        assert_eq!(ev.number_at("R", 0, COL_PERCENT_YEAR), Some(100.0));
    }
}
