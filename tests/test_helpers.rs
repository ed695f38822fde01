// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、查找表种子数据、内存源表与 CSV 文件
// ==========================================
#![allow(dead_code)]

use ghg_center_report::api::ExportApi;
use ghg_center_report::domain::billing::{
    ColumnMapping, ConnectionPointRegistration, FieldSource, SourceSheet,
};
use ghg_center_report::domain::report::{CellValue, ReportSheet};
use ghg_center_report::domain::types::Module;
use ghg_center_report::repository::EmissionFactorEntity;
use std::error::Error;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// 源表表头（与 standard_mapping 列号一致）
pub const SOURCE_HEADER: [&str; 7] = [
    "CUPS",
    "Factura",
    "Fecha inicio",
    "Fecha fin",
    "Consumo",
    "Centro",
    "Comercializadora",
];

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = ghg_center_report::db::open_sqlite_connection(&db_path)?;
    ghg_center_report::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建指向临时数据库的 ExportApi（同时初始化测试日志）
pub fn create_test_api() -> (NamedTempFile, ExportApi) {
    ghg_center_report::logging::init_test();
    let (file, db_path) = create_test_db().unwrap();
    let api = ExportApi::new(&db_path).unwrap();
    (file, api)
}

/// 写入 (模块, 年份) 的因子表
pub fn seed_factors(api: &ExportApi, module: Module, year: i32, entries: &[(&str, f64)]) {
    for (key, factor) in entries {
        api.factor_repository()
            .upsert(&EmissionFactorEntity {
                module,
                year,
                factor_key: key.to_string(),
                factor: *factor,
            })
            .unwrap();
    }
}

/// 写入供应点登记: (供应点, 中心, 售电公司)
pub fn seed_registry(api: &ExportApi, entries: &[(&str, &str, Option<&str>)]) {
    for (point, center, marketer) in entries {
        api.registry_repository()
            .upsert(&ConnectionPointRegistration {
                connection_point: point.to_string(),
                center_name: center.to_string(),
                marketer: marketer.map(str::to_string),
            })
            .unwrap();
    }
}

/// 标准列映射: CUPS | 发票 | 开始 | 结束 | 数量 | 中心 | 因子键
pub fn standard_mapping() -> ColumnMapping {
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

/// 类型为固定字面量的映射（燃气/燃料/制冷剂）
pub fn literal_type_mapping(type_name: &str) -> ColumnMapping {
    ColumnMapping {
        factor_key: FieldSource::Literal(type_name.to_string()),
        ..standard_mapping()
    }
}

/// 由数据行构建带标准表头的内存源表
pub fn source_sheet(rows: &[[&str; 7]]) -> SourceSheet {
    let mut all = vec![SOURCE_HEADER.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
    all.extend(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
    );
    SourceSheet::from_rows("Facturas", all)
}

/// 写入临时 CSV（分号分隔）
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

/// 单元格数值（缓存的公式结果可能以数值文本读回）
pub fn numeric(sheet: &ReportSheet, row: usize, col: usize) -> Option<f64> {
    match sheet.get(row, col)? {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(t) => t.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// 按首列文本查找行号
pub fn find_row(sheet: &ReportSheet, first_cell: &str) -> Option<usize> {
    (0..sheet.row_count()).find(|r| sheet.text_at(*r, 0) == first_cell)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
