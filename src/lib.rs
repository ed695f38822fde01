// ==========================================
// 温室气体中心报表 - 核心库
// ==========================================
// 账单表格（电力/燃气/燃料/制冷剂）→ 按中心、按年度的排放报表
// 技术栈: Rust + SQLite + xlsx
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 数据类型
pub mod domain;

// 数据仓储层 - 供应点登记 / 排放因子
pub mod repository;

// 引擎层 - 分摊、因子、聚合、公式化报表
pub mod engine;

// 导入层 - 外部账单表格
pub mod importer;

// 报表文件层 - xlsx 读写
pub mod report;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    BillingRow, CellValue, ColumnMapping, ConnectionPointRegistration, DiagnosticLog,
    EmissionChannel, FactorTable, FieldSource, Module, ReportDocument, ReportSheet, RowOutcome,
    Scope, SkipReason, SourceSheet,
};

// 引擎
pub use engine::{
    CancelFlag, CenterAggregator, ConnectionPointSplitter, DateOverlapProrator, FactorResolver,
    FormulaBackedRowWriter, FormulaEvaluator, ModuleExporter, SummaryMerger,
};

// 配置
pub use config::{ConfigManager, ExportConfig};

// API
pub use api::{ApiError, ApiResult, ExportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "GHG Center Report";
