// ==========================================
// 温室气体中心报表 - 排放因子解析器
// ==========================================
// 职责: 加载 (模块, 年份) 因子表；键归一化；按模块/通道解析因子
// 红线: resolve 永不失败，未命中 → 0.0 + 诊断行
// ==========================================

use crate::domain::billing::BillingRow;
use crate::domain::factor::FactorTable;
use crate::domain::outcome::DiagnosticLog;
use crate::domain::types::{EmissionChannel, Module};
use crate::repository::RepositoryResult;
use tracing::{instrument, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 查找键归一化
///
/// 去首尾空白 → 空白（含不换行空格）折叠为单个空格 → NFKD 去重音 → 小写
pub fn normalize_key(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

// ==========================================
// FactorSource Trait
// ==========================================
// 因子持久化存储（导出开始时查询一次，从不写入）
pub trait FactorSource: Send + Sync {
    fn factor_entries(&self, module: Module, year: i32) -> RepositoryResult<Vec<(String, f64)>>;
}

// ==========================================
// ResolvedFactors - 单行各通道因子
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFactors {
    /// 与 Module::channels() 顺序一致
    pub values: Vec<(EmissionChannel, f64)>,
    /// 实际使用的查找键（写入明细表）
    pub key_used: Option<String>,
}

impl ResolvedFactors {
    pub fn factor(&self, channel: EmissionChannel) -> f64 {
        self.values
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FactorResolver;

impl FactorResolver {
    pub fn new() -> Self {
        Self
    }

    /// 加载 (模块, 年份) 因子表
    #[instrument(skip(self, source))]
    pub fn load_factors(
        &self,
        source: &dyn FactorSource,
        module: Module,
        year: i32,
    ) -> RepositoryResult<FactorTable> {
        let entries = source.factor_entries(module, year)?;
        Ok(FactorTable::from_entries(module, year, entries))
    }

    /// 查找但不记录诊断
    pub fn lookup(&self, table: &FactorTable, key: &str) -> Option<f64> {
        table.get_normalized(&normalize_key(key))
    }

    /// 解析因子；未命中返回 0.0 并追加诊断行（同一键只记录一次）
    pub fn resolve(&self, table: &FactorTable, key: Option<&str>, diagnostics: &mut DiagnosticLog) -> f64 {
        if let Some(factor) = key.and_then(|k| self.lookup(table, k)) {
            return factor;
        }
        let shown = key.map(str::trim).filter(|k| !k.is_empty()).unwrap_or("(empty)");
        let line = format!(
            "entity/type {} not found for year {}; using factor=0.0",
            shown, table.year
        );
        if diagnostics.push_unique(line) {
            warn!(module = %table.module, year = table.year, key = shown, "排放因子未找到");
        }
        0.0
    }

    /// 按模块解析一行的全部通道因子
    ///
    /// # 参数
    /// - marketer: 供应点登记的售电/售气公司（None = 未登记）
    /// - location_key: 电力位置法查找键（配置项）
    pub fn resolve_row(
        &self,
        table: &FactorTable,
        row: &BillingRow,
        marketer: Option<&str>,
        location_key: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> ResolvedFactors {
        let row_key = row.factor_key.as_deref();
        match table.module {
            Module::Electricity => {
                // 供应点 → 售电公司；未登记时回退到排放主体列
                let entity = marketer.or(row_key);
                let market = self.resolve(table, entity, diagnostics);
                let location = self.resolve(table, Some(location_key), diagnostics);
                ResolvedFactors {
                    values: vec![
                        (EmissionChannel::Market, market),
                        (EmissionChannel::Location, location),
                    ],
                    key_used: entity.map(str::to_string),
                }
            }
            Module::Gas => {
                let by_type = self.resolve(table, row_key, diagnostics);
                let market = match marketer {
                    Some(name) => match self.lookup(table, name) {
                        Some(factor) => factor,
                        None => {
                            diagnostics.push_unique(format!(
                                "gas marketer {} not found for year {}; using gas type factor",
                                name.trim(),
                                table.year
                            ));
                            by_type
                        }
                    },
                    None => by_type,
                };
                ResolvedFactors {
                    values: vec![
                        (EmissionChannel::Market, market),
                        (EmissionChannel::Location, by_type),
                    ],
                    key_used: row_key.map(str::to_string),
                }
            }
            Module::Fuel | Module::Refrigerant => ResolvedFactors {
                values: vec![(
                    EmissionChannel::Direct,
                    self.resolve(table, row_key, diagnostics),
                )],
                key_used: row_key.map(str::to_string),
            },
        }
    }
}
