// ==========================================
// 温室气体中心报表 - 中心聚合器
// ==========================================
// 一次 (模块, 年份) 导出一个实例；按中心名精确匹配累加
// 首次出现时创建，只增不删，finalize 后只读
// ==========================================

use crate::domain::types::Module;
use std::collections::HashMap;

/// 单个中心的累计值
#[derive(Debug, Clone, PartialEq)]
pub struct CenterTotals {
    pub center: String,
    pub quantity: f64,
    /// 与 Module::channels() 顺序一致
    pub emissions: Vec<f64>,
    /// 贡献的明细行数
    pub rows: usize,
}

#[derive(Debug)]
pub struct CenterAggregator {
    module: Module,
    index: HashMap<String, usize>,
    totals: Vec<CenterTotals>,
}

impl CenterAggregator {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            index: HashMap::new(),
            totals: Vec::new(),
        }
    }

    /// 累加一条明细
    ///
    /// emissions 长度不足通道数时按 0 处理，多余的忽略
    pub fn add(&mut self, center: &str, quantity: f64, emissions: &[f64]) {
        let channel_count = self.module.channels().len();
        let idx = match self.index.get(center) {
            Some(idx) => *idx,
            None => {
                self.totals.push(CenterTotals {
                    center: center.to_string(),
                    quantity: 0.0,
                    emissions: vec![0.0; channel_count],
                    rows: 0,
                });
                let idx = self.totals.len() - 1;
                self.index.insert(center.to_string(), idx);
                idx
            }
        };

        let entry = &mut self.totals[idx];
        entry.quantity += quantity;
        for (total, value) in entry.emissions.iter_mut().zip(emissions) {
            *total += value;
        }
        entry.rows += 1;
    }

    pub fn center_count(&self) -> usize {
        self.totals.len()
    }

    pub fn finalize(self) -> CenterAggregates {
        CenterAggregates {
            module: self.module,
            index: self.index,
            totals: self.totals,
        }
    }
}

// ==========================================
// CenterAggregates - 只读结果（按首次出现顺序）
// ==========================================
#[derive(Debug, Clone)]
pub struct CenterAggregates {
    pub module: Module,
    index: HashMap<String, usize>,
    totals: Vec<CenterTotals>,
}

impl CenterAggregates {
    pub fn get(&self, center: &str) -> Option<&CenterTotals> {
        self.index.get(center).map(|idx| &self.totals[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CenterTotals> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn total_quantity(&self) -> f64 {
        self.totals.iter().map(|t| t.quantity).sum()
    }

    /// 某通道的全部中心排放合计
    pub fn total_emissions(&self, channel_index: usize) -> f64 {
        self.totals
            .iter()
            .filter_map(|t| t.emissions.get(channel_index))
            .sum()
    }
}
