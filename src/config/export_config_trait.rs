// ==========================================
// 温室气体中心报表 - 导出配置读取 Trait
// ==========================================
// 职责: 定义 API 层构建 ExportConfig 所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::billing::ColumnMapping;
use crate::domain::types::Module;
use std::error::Error;

// ==========================================
// ExportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ExportConfigReader: Send + Sync {
    /// 报告年份
    ///
    /// # 默认值
    /// - 当前年份 - 1
    fn get_reporting_year(&self) -> Result<i32, Box<dyn Error>>;

    /// 电力位置法因子查找键
    ///
    /// # 默认值
    /// - "mix peninsular"
    fn get_electricity_location_key(&self) -> Result<String, Box<dyn Error>>;

    /// 无中心行的归属桶名称
    ///
    /// # 默认值
    /// - "SIN CENTRO"
    fn get_unassigned_center_label(&self) -> Result<String, Box<dyn Error>>;

    /// 合并报表时表头扫描行数
    ///
    /// # 默认值
    /// - 5
    fn get_summary_header_scan_rows(&self) -> Result<usize, Box<dyn Error>>;

    /// 模块的列映射方案（config_kv: mapping_profile/<MODULE>，JSON）
    ///
    /// # 返回
    /// - None: 未保存过映射
    fn get_mapping_profile(&self, module: Module) -> Result<Option<ColumnMapping>, Box<dyn Error>>;
}
