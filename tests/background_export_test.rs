// ==========================================
// 后台导出与取消测试
// ==========================================

mod test_helpers;

use ghg_center_report::api::{ApiError, ExportApi};
use ghg_center_report::config::ExportConfig;
use ghg_center_report::domain::types::Module;
use ghg_center_report::engine::CancelFlag;
use ghg_center_report::report::XlsxReportReader;
use std::sync::Arc;
use tempfile::TempDir;
use test_helpers::*;

fn fuel_csv() -> tempfile::NamedTempFile {
    write_csv(&[
        "Matrícula;Factura;Desde;Hasta;Litros;Centro;Combustible",
        "1234-ABC;C-1;2023-03-01;2023-03-31;120,5;Flota;Gasóleo A",
        "5678-DEF;C-2;2023-04-01;2023-04-30;80;Flota;Gasolina 95",
    ])
}

fn fuel_api() -> (tempfile::NamedTempFile, Arc<ExportApi>) {
    let (db, api) = create_test_api();
    seed_factors(
        &api,
        Module::Fuel,
        2023,
        &[("Gasóleo A", 2.52), ("Gasolina 95", 2.18)],
    );
    (db, Arc::new(api))
}

#[tokio::test]
async fn test_spawned_export_writes_report() {
    let (_db, api) = fuel_api();
    let input = fuel_csv();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("informes").join("combustibles.xlsx");

    let config = ExportConfig::new(Module::Fuel, 2023, standard_mapping());
    let handle = api.spawn_module_export(
        input.path().to_path_buf(),
        None,
        output.clone(),
        config,
        CancelFlag::new(),
    );
    let summary = ExportApi::join_export(handle).await.unwrap();

    assert_eq!(summary.module, Module::Fuel);
    assert_eq!(summary.accepted_rows, 2);
    assert_eq!(summary.centers, 1);
    assert!(output.exists());

    let doc = XlsxReportReader::new().read(&output).unwrap();
    let per_center = doc.sheet("Combustibles - Por centro").unwrap();
    let flota = find_row(per_center, "Flota").unwrap();
    assert_close(numeric(per_center, flota, 1).unwrap(), 200.5);
    let expected = (120.5 * 2.52 + 80.0 * 2.18) / 1000.0;
    assert!((numeric(per_center, flota, 2).unwrap() - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_cancelled_export_writes_nothing() {
    let (_db, api) = fuel_api();
    let input = fuel_csv();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("combustibles.xlsx");

    let cancel = CancelFlag::new();
    cancel.cancel();
    let config = ExportConfig::new(Module::Fuel, 2023, standard_mapping());
    let handle =
        api.spawn_module_export(input.path().to_path_buf(), None, output.clone(), config, cancel);
    let err = ExportApi::join_export(handle).await.unwrap_err();

    assert!(matches!(err, ApiError::Cancelled { processed: 0 }));
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unsupported_input_format_fails_cleanly() {
    let (_db, api) = fuel_api();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("facturas.txt");
    std::fs::write(&input, "nada").unwrap();

    let config = ExportConfig::new(Module::Fuel, 2023, standard_mapping());
    let handle = api.spawn_module_export(
        input,
        None,
        dir.path().join("out.xlsx"),
        config,
        CancelFlag::new(),
    );
    let err = ExportApi::join_export(handle).await.unwrap_err();
    assert!(matches!(err, ApiError::SourceUnavailable(_)));
}
