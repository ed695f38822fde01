// ==========================================
// 温室气体中心报表 - 排放因子表
// ==========================================
// 作用域: 一个 (模块, 年份)；导出开始时构建一次，之后只读
// 键: 归一化后的售电公司 / 燃气类型 / 燃料类型 / 制冷剂类型
// ==========================================

use crate::domain::types::Module;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    pub module: Module,
    pub year: i32,
    entries: HashMap<String, f64>, // 归一化键 → 因子 (kg CO2e / 单位)
}

impl FactorTable {
    pub fn new(module: Module, year: i32) -> Self {
        Self {
            module,
            year,
            entries: HashMap::new(),
        }
    }

    /// 由 (原始键, 因子) 构建；键在插入时归一化
    pub fn from_entries<I, K>(module: Module, year: i32, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut table = Self::new(module, year);
        for (key, factor) in entries {
            table.insert(key.as_ref(), factor);
        }
        table
    }

    /// 插入因子；同一归一化键后写覆盖先写
    pub fn insert(&mut self, raw_key: &str, factor: f64) {
        let key = crate::engine::factor_resolver::normalize_key(raw_key);
        if !key.is_empty() {
            self.entries.insert(key, factor);
        }
    }

    /// 按已归一化的键查询
    pub fn get_normalized(&self, normalized_key: &str) -> Option<f64> {
        self.entries.get(normalized_key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
