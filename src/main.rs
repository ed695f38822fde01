// ==========================================
// 温室气体中心报表 - 命令行入口
// ==========================================
// 用法:
//   ghg-center-report export <module> <input> <output> [year] [--sheet S] [--invoices A,B]
//   ghg-center-report summary <output> [--electricity P] [--gas P] [--fuel P] [--refrigerant P]
//   ghg-center-report import-factors <module> <year> <csv>
//   ghg-center-report factor-years <module>
//   ghg-center-report delete-factors <module> <year>
//   ghg-center-report import-registry <csv>
//   ghg-center-report delete-registry <point>
//   ghg-center-report set-year <year>
//   ghg-center-report set-mapping <module> <json>
// 数据库: GHG_REPORT_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use ghg_center_report::api::{ExportApi, SummaryInputs};
use ghg_center_report::db::get_default_db_path;
use ghg_center_report::domain::billing::ColumnMapping;
use ghg_center_report::domain::types::Module;
use ghg_center_report::engine::CancelFlag;
use ghg_center_report::logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "\
uso:
  ghg-center-report export <módulo> <entrada> <salida> [año] [--sheet HOJA] [--invoices F1,F2]
  ghg-center-report summary <salida> [--electricity P] [--gas P] [--fuel P] [--refrigerant P]
  ghg-center-report import-factors <módulo> <año> <csv>
  ghg-center-report factor-years <módulo>
  ghg-center-report delete-factors <módulo> <año>
  ghg-center-report import-registry <csv>
  ghg-center-report delete-registry <punto>
  ghg-center-report set-year <año>
  ghg-center-report set-mapping <módulo> <json>
módulos: electricity | gas | fuel | refrigerant";

/// 位置参数与 --key value 选项
struct CliArgs {
    positional: Vec<String>,
    options: Vec<(String, String)>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut options = Vec::new();
        while let Some(arg) = args.next() {
            if let Some(key) = arg.strip_prefix("--") {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("falta el valor de --{}", key))?;
                options.push((key.to_string(), value));
            } else {
                positional.push(arg);
            }
        }
        Ok(Self { positional, options })
    }

    fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn arg(&self, idx: usize, name: &str) -> Result<&str> {
        self.positional
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("falta <{}>\n{}", name, USAGE))
    }
}

fn parse_module(text: &str) -> Result<Module> {
    Module::parse(text).ok_or_else(|| anyhow!("módulo desconocido: {}\n{}", text, USAGE))
}

fn parse_year(text: &str) -> Result<i32> {
    let year: i32 = text
        .trim()
        .parse()
        .with_context(|| format!("año inválido: {}", text))?;
    if year <= 0 {
        bail!("año inválido: {}", year);
    }
    Ok(year)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(c) => c,
        None => {
            eprintln!("{}", USAGE);
            return Ok(());
        }
    };
    let cli = CliArgs::parse(args)?;

    let db_path = get_default_db_path();
    info!(version = ghg_center_report::VERSION, db = %db_path, "{}", ghg_center_report::APP_NAME);
    let api = Arc::new(ExportApi::new(&db_path).context("no se pudo abrir la base de datos")?);

    match command.as_str() {
        "export" => run_export(api, &cli).await,
        "summary" => {
            let output = PathBuf::from(cli.arg(0, "salida")?);
            let inputs = SummaryInputs {
                electricity: cli.option("electricity").map(PathBuf::from),
                gas: cli.option("gas").map(PathBuf::from),
                fuel: cli.option("fuel").map(PathBuf::from),
                refrigerant: cli.option("refrigerant").map(PathBuf::from),
            };
            let report = api.merge_summary(&inputs, &output)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        "import-factors" => {
            let module = parse_module(cli.arg(0, "módulo")?)?;
            let year = parse_year(cli.arg(1, "año")?)?;
            let csv = PathBuf::from(cli.arg(2, "csv")?);
            let count = api.import_factors(module, year, &csv)?;
            println!("{} factores importados ({} {})", count, module, year);
            Ok(())
        }
        "factor-years" => {
            let module = parse_module(cli.arg(0, "módulo")?)?;
            let years = api.factor_years(module)?;
            if years.is_empty() {
                println!("sin factores para {}", module);
            }
            for year in years {
                println!("{}", year);
            }
            Ok(())
        }
        "delete-factors" => {
            let module = parse_module(cli.arg(0, "módulo")?)?;
            let year = parse_year(cli.arg(1, "año")?)?;
            let count = api.delete_factor_year(module, year)?;
            println!("{} factores eliminados ({} {})", count, module, year);
            Ok(())
        }
        "import-registry" => {
            let csv = PathBuf::from(cli.arg(0, "csv")?);
            let count = api.import_registry(&csv)?;
            println!(
                "{} registros de punto de suministro importados ({} en total)",
                count,
                api.registry_count()?
            );
            Ok(())
        }
        "delete-registry" => {
            let point = cli.arg(0, "punto")?;
            let count = api.delete_registration(point)?;
            println!("{} registros eliminados para {}", count, point);
            Ok(())
        }
        "set-year" => {
            let year = parse_year(cli.arg(0, "año")?)?;
            api.set_reporting_year(year)?;
            println!("año de informe: {}", year);
            Ok(())
        }
        "set-mapping" => {
            let module = parse_module(cli.arg(0, "módulo")?)?;
            let mapping: ColumnMapping = serde_json::from_str(cli.arg(1, "json")?)
                .context("mapeo de columnas inválido")?;
            api.save_mapping_profile(module, &mapping)?;
            println!("mapeo guardado para {}", module);
            Ok(())
        }
        other => bail!("comando desconocido: {}\n{}", other, USAGE),
    }
}

/// 单模块导出: 后台执行，Ctrl-C 触发取消
async fn run_export(api: Arc<ExportApi>, cli: &CliArgs) -> Result<()> {
    let module = parse_module(cli.arg(0, "módulo")?)?;
    let input = PathBuf::from(cli.arg(1, "entrada")?);
    let output = PathBuf::from(cli.arg(2, "salida")?);
    let year = cli.positional.get(3).map(|y| parse_year(y)).transpose()?;
    let invoices: Vec<String> = cli
        .option("invoices")
        .map(|list| list.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    let config = api.build_export_config(module, year, None, invoices)?;
    let cancel = CancelFlag::new();
    let mut handle = api.spawn_module_export(
        input,
        cli.option("sheet").map(str::to_string),
        output,
        config,
        cancel.clone(),
    );

    let joined = tokio::select! {
        res = &mut handle => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("收到中断信号，正在取消导出");
            cancel.cancel();
            handle.await
        }
    };
    let summary = joined.context("la tarea de exportación falló")??;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
