// ==========================================
// 温室气体中心报表 - 导出 API
// ==========================================
// 职责: 一次调用 = 打开查找表 → 读取源表 → 运行引擎 → 写出报表
// 另提供: 跨模块汇总、查找表 CSV 导入、后台执行与粗粒度取消
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ExportConfig, ExportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::billing::{ColumnMapping, SourceSheet};
use crate::domain::types::Module;
use crate::engine::connection_splitter::ConnectionPointSplitter;
use crate::engine::factor_resolver::FactorResolver;
use crate::engine::module_export::{CancelFlag, ExportContext, ModuleExportResult, ModuleExporter};
use crate::engine::summary_merger::{ModuleReports, SummaryMerger};
use crate::importer::file_parser::UniversalFileParser;
use crate::report::{XlsxReportReader, XlsxReportWriter};
use crate::repository::{ConnectionPointRepository, FactorRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// 单模块导出结果（不含文档本身）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub run_id: String,
    pub module: Module,
    pub year: i32,
    pub output_path: String,
    pub accepted_rows: usize,
    pub skipped_rows: usize,
    pub detail_rows: usize,
    pub centers: usize,
    pub diagnostics: Vec<String>,
}

impl ExportSummary {
    fn from_result(result: &ModuleExportResult, output: &Path) -> Self {
        Self {
            run_id: result.run_id.clone(),
            module: result.module,
            year: result.year,
            output_path: output.display().to_string(),
            accepted_rows: result.accepted_rows,
            skipped_rows: result.skipped_rows,
            detail_rows: result.detail_rows,
            centers: result.aggregates.len(),
            diagnostics: result.diagnostics.lines().to_vec(),
        }
    }
}

/// 跨模块汇总的输入文件（缺失模块按 0 计）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryInputs {
    pub electricity: Option<PathBuf>,
    pub gas: Option<PathBuf>,
    pub fuel: Option<PathBuf>,
    pub refrigerant: Option<PathBuf>,
}

impl SummaryInputs {
    pub fn get(&self, module: Module) -> Option<&PathBuf> {
        match module {
            Module::Electricity => self.electricity.as_ref(),
            Module::Gas => self.gas.as_ref(),
            Module::Fuel => self.fuel.as_ref(),
            Module::Refrigerant => self.refrigerant.as_ref(),
        }
    }
}

/// 跨模块汇总结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub output_path: String,
    pub centers: Vec<String>,
    pub diagnostics: Vec<String>,
}

// ==========================================
// ExportApi
// ==========================================
pub struct ExportApi {
    config: Arc<ConfigManager>,
    factors: Arc<FactorRepository>,
    registry: Arc<ConnectionPointRepository>,
}

impl ExportApi {
    /// 打开数据库（三个存储共享一个连接）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .and_then(|c| init_schema(&c).map(|_| c))
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        Ok(Self {
            factors: Arc::new(FactorRepository::from_connection(conn.clone())?),
            registry: Arc::new(ConnectionPointRepository::from_connection(conn.clone())?),
            config: Arc::new(ConfigManager::from_connection(conn)?),
        })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config
    }

    pub fn factor_repository(&self) -> &FactorRepository {
        &self.factors
    }

    pub fn registry_repository(&self) -> &ConnectionPointRepository {
        &self.registry
    }

    /// 由持久化配置构建单次导出配置
    ///
    /// # 参数
    /// - year: None = 配置中的报告年份
    /// - mapping: None = 该模块保存的列映射方案
    /// - invoice_ids: 发票号预过滤（为空表示不过滤）
    pub fn build_export_config(
        &self,
        module: Module,
        year: Option<i32>,
        mapping: Option<ColumnMapping>,
        invoice_ids: Vec<String>,
    ) -> ApiResult<ExportConfig> {
        let year = match year {
            Some(y) => y,
            None => self.config.get_reporting_year()?,
        };
        if year <= 0 {
            return Err(ApiError::InvalidInput(format!("año inválido: {}", year)));
        }
        let mapping = match mapping {
            Some(m) => m,
            None => self.config.get_mapping_profile(module)?.ok_or_else(|| {
                ApiError::InvalidInput(format!("no hay mapeo de columnas guardado para {}", module))
            })?,
        };

        let mut config = ExportConfig::new(module, year, mapping).with_invoice_filter(invoice_ids);
        config.location_key = self.config.get_electricity_location_key()?;
        config.unassigned_center_label = self.config.get_unassigned_center_label()?;
        Ok(config)
    }

    /// 在内存中导出（不写文件）
    #[instrument(skip(self, sheet, config, cancel), fields(module = %config.module, year = config.year))]
    pub fn export_sheet(
        &self,
        sheet: &SourceSheet,
        config: &ExportConfig,
        cancel: Option<&CancelFlag>,
    ) -> ApiResult<ModuleExportResult> {
        let factors = FactorResolver::new().load_factors(self.factors.as_ref(), config.module, config.year)?;
        let splitter = ConnectionPointSplitter::from_source(self.registry.as_ref())?;
        info!(
            factors = factors.len(),
            connection_points = splitter.registered_point_count(),
            "查找表已加载"
        );

        let ctx = ExportContext {
            config,
            factors: &factors,
            splitter: &splitter,
        };
        Ok(ModuleExporter::new().export(sheet, &ctx, cancel)?)
    }

    /// 导出一个模块: 源文件 → 报表文件
    #[instrument(skip(self, config, cancel), fields(module = %config.module, year = config.year))]
    pub fn export_module(
        &self,
        input: &Path,
        sheet_name: Option<&str>,
        output: &Path,
        config: &ExportConfig,
        cancel: Option<&CancelFlag>,
    ) -> ApiResult<ExportSummary> {
        let sheet = UniversalFileParser.parse(input, sheet_name)?;
        let result = self.export_sheet(&sheet, config, cancel)?;
        if cancel.map_or(false, |c| c.is_cancelled()) {
            return Err(ApiError::Cancelled {
                processed: sheet.data_row_count(),
            });
        }
        XlsxReportWriter::new().write(&result.document, output)?;
        Ok(ExportSummary::from_result(&result, output))
    }

    /// 在 tokio 阻塞线程池中执行导出
    ///
    /// 通过 cancel 取消: 每 256 行检查一次，取消后不写任何文件
    pub fn spawn_module_export(
        self: &Arc<Self>,
        input: PathBuf,
        sheet_name: Option<String>,
        output: PathBuf,
        config: ExportConfig,
        cancel: CancelFlag,
    ) -> JoinHandle<ApiResult<ExportSummary>> {
        let api = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            api.export_module(&input, sheet_name.as_deref(), &output, &config, Some(&cancel))
        })
    }

    /// 等待后台导出完成
    pub async fn join_export(handle: JoinHandle<ApiResult<ExportSummary>>) -> ApiResult<ExportSummary> {
        handle
            .await
            .map_err(|e| ApiError::TaskFailed(e.to_string()))?
    }

    /// 跨模块汇总: 读取已完成的模块报表 → 汇总报表
    #[instrument(skip(self, inputs))]
    pub fn merge_summary(&self, inputs: &SummaryInputs, output: &Path) -> ApiResult<SummaryReport> {
        let reader = XlsxReportReader::new();
        let mut documents = Vec::new();
        for module in Module::ALL {
            if let Some(path) = inputs.get(module) {
                documents.push((module, reader.read(path)?));
            }
        }

        let mut reports = ModuleReports::default();
        for (module, doc) in &documents {
            reports.set(*module, doc);
        }

        let scan_rows = self.config.get_summary_header_scan_rows()?;
        let result = SummaryMerger::new(scan_rows).merge(&reports);
        XlsxReportWriter::new().write(&result.document, output)?;

        Ok(SummaryReport {
            output_path: output.display().to_string(),
            centers: result.centers,
            diagnostics: result.diagnostics.lines().to_vec(),
        })
    }

    /// 导入某 (模块, 年份) 的排放因子 CSV
    pub fn import_factors(&self, module: Module, year: i32, csv_path: &Path) -> ApiResult<usize> {
        Ok(self.factors.import_csv(module, year, csv_path)?)
    }

    /// 某模块已导入因子的年份（降序）
    pub fn factor_years(&self, module: Module) -> ApiResult<Vec<i32>> {
        Ok(self.factors.available_years(module)?)
    }

    /// 删除某 (模块, 年份) 的因子表，返回删除条数
    pub fn delete_factor_year(&self, module: Module, year: i32) -> ApiResult<usize> {
        let deleted = self.factors.delete_year(module, year)?;
        info!(module = %module, year, deleted, "因子表已删除");
        Ok(deleted)
    }

    /// 导入供应点登记 CSV
    pub fn import_registry(&self, csv_path: &Path) -> ApiResult<usize> {
        Ok(self.registry.import_csv(csv_path)?)
    }

    /// 当前登记条数
    pub fn registry_count(&self) -> ApiResult<usize> {
        Ok(self.registry.count()?)
    }

    /// 删除一个供应点的全部登记
    pub fn delete_registration(&self, connection_point: &str) -> ApiResult<usize> {
        if connection_point.trim().is_empty() {
            return Err(ApiError::InvalidInput("punto de suministro vacío".to_string()));
        }
        Ok(self.registry.delete_point(connection_point)?)
    }

    pub fn set_reporting_year(&self, year: i32) -> ApiResult<()> {
        if year <= 0 {
            return Err(ApiError::InvalidInput(format!("año inválido: {}", year)));
        }
        Ok(self.config.set_reporting_year(year)?)
    }

    pub fn save_mapping_profile(&self, module: Module, mapping: &ColumnMapping) -> ApiResult<()> {
        Ok(self.config.save_mapping_profile(module, mapping)?)
    }
}
