// ==========================================
// 温室气体中心报表 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::export_config_trait::ExportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::billing::ColumnMapping;
use crate::domain::types::Module;
use chrono::{Datelike, Local};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 设置报告年份
    pub fn set_reporting_year(&self, year: i32) -> Result<(), Box<dyn Error>> {
        if year <= 0 {
            return Err(format!("年份必须为正数: {}", year).into());
        }
        self.set_global_config_value(config_keys::REPORTING_YEAR, &year.to_string())
    }

    /// 保存模块列映射方案
    pub fn save_mapping_profile(&self, module: Module, mapping: &ColumnMapping) -> Result<(), Box<dyn Error>> {
        let raw = serde_json::to_string(mapping)?;
        self.set_global_config_value(&config_keys::mapping_profile(module), &raw)
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// ExportConfigReader Trait 实现
// ==========================================
impl ExportConfigReader for ConfigManager {
    fn get_reporting_year(&self) -> Result<i32, Box<dyn Error>> {
        let default_year = Local::now().year() - 1;
        let value = self.get_config_or_default(config_keys::REPORTING_YEAR, &default_year.to_string())?;
        Ok(value
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|y| *y > 0)
            .unwrap_or(default_year))
    }

    fn get_electricity_location_key(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::ELECTRICITY_LOCATION_KEY,
            crate::config::export_config::DEFAULT_LOCATION_KEY,
        )?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(crate::config::export_config::DEFAULT_LOCATION_KEY.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn get_unassigned_center_label(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::UNASSIGNED_CENTER_LABEL,
            crate::config::export_config::DEFAULT_UNASSIGNED_CENTER,
        )?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(crate::config::export_config::DEFAULT_UNASSIGNED_CENTER.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn get_summary_header_scan_rows(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SUMMARY_HEADER_SCAN_ROWS, "5")?;
        Ok(value.trim().parse::<usize>().ok().filter(|n| *n > 0).unwrap_or(5))
    }

    fn get_mapping_profile(&self, module: Module) -> Result<Option<ColumnMapping>, Box<dyn Error>> {
        let key = config_keys::mapping_profile(module);
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let mapping: ColumnMapping = serde_json::from_str(&raw)?;
        Ok(Some(mapping))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::types::Module;

    pub const REPORTING_YEAR: &str = "reporting_year";
    pub const ELECTRICITY_LOCATION_KEY: &str = "electricity_location_key";
    pub const UNASSIGNED_CENTER_LABEL: &str = "unassigned_center_label";
    pub const SUMMARY_HEADER_SCAN_ROWS: &str = "summary_header_scan_rows";

    /// 列映射方案: mapping_profile/<MODULE>
    pub fn mapping_profile(module: Module) -> String {
        format!("mapping_profile/{}", module.to_db_str())
    }
}
