// ==========================================
// 温室气体中心报表 - 配置层
// ==========================================
// 职责: 持久化配置 (config_kv) + 单次导出的显式配置
// ==========================================

pub mod config_manager;
pub mod export_config;
pub mod export_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use export_config::{ExportConfig, DEFAULT_LOCATION_KEY, DEFAULT_UNASSIGNED_CENTER};
pub use export_config_trait::ExportConfigReader;
