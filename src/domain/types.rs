// ==========================================
// 温室气体中心报表 - 领域类型定义
// ==========================================
// 模块 (电力/燃气/燃料/制冷剂)、排放通道、范围
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 报表模块 (Module)
// ==========================================
// 每次导出只处理一个模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Electricity, // 电力（范围2）
    Gas,         // 燃气（范围1）
    Fuel,        // 燃料（范围1）
    Refrigerant, // 制冷剂补充（范围1）
}

impl Module {
    /// 全部模块（合并报表时的固定顺序，电力优先）
    pub const ALL: [Module; 4] = [
        Module::Electricity,
        Module::Gas,
        Module::Fuel,
        Module::Refrigerant,
    ];

    /// 报表中使用的模块名称（工作表名前缀）
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Module::Electricity => "Electricidad",
            Module::Gas => "Gas",
            Module::Fuel => "Combustibles",
            Module::Refrigerant => "Refrigerantes",
        }
    }

    /// 数据库存储值
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Module::Electricity => "ELECTRICITY",
            Module::Gas => "GAS",
            Module::Fuel => "FUEL",
            Module::Refrigerant => "REFRIGERANT",
        }
    }

    /// 解析模块名（容忍大小写和西语/英语两种写法）
    pub fn parse(value: &str) -> Option<Module> {
        match value.trim().to_lowercase().as_str() {
            "electricity" | "electricidad" | "elec" => Some(Module::Electricity),
            "gas" => Some(Module::Gas),
            "fuel" | "combustible" | "combustibles" => Some(Module::Fuel),
            "refrigerant" | "refrigerante" | "refrigerantes" => Some(Module::Refrigerant),
            _ => None,
        }
    }

    /// 该模块跟踪的排放通道
    pub fn channels(&self) -> &'static [EmissionChannel] {
        match self {
            Module::Electricity | Module::Gas => {
                &[EmissionChannel::Market, EmissionChannel::Location]
            }
            Module::Fuel | Module::Refrigerant => &[EmissionChannel::Direct],
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Module::Electricity => Scope::Scope2,
            Module::Gas | Module::Fuel | Module::Refrigerant => Scope::Scope1,
        }
    }

    /// 消耗量单位（表头展示用）
    pub fn quantity_unit(&self) -> &'static str {
        match self {
            Module::Electricity | Module::Gas => "kWh",
            Module::Fuel => "l",
            Module::Refrigerant => "kg",
        }
    }

    /// 因子查找键的表头名称
    pub fn factor_key_label(&self) -> &'static str {
        match self {
            Module::Electricity => "Comercializadora",
            Module::Gas => "Tipo de gas",
            Module::Fuel => "Tipo de combustible",
            Module::Refrigerant => "Tipo de refrigerante",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 排放通道 (Emission Channel)
// ==========================================
// 电力/燃气: 市场法 + 位置法；燃料/制冷剂: 直接排放
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmissionChannel {
    Market,   // 市场法（售电/售气公司因子）
    Location, // 位置法（电网均值 / 燃料类型因子）
    Direct,   // 直接排放
}

impl EmissionChannel {
    pub fn label(&self) -> &'static str {
        match self {
            EmissionChannel::Market => "mercado",
            EmissionChannel::Location => "ubicación",
            EmissionChannel::Direct => "directas",
        }
    }
}

impl fmt::Display for EmissionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmissionChannel::Market => write!(f, "MARKET"),
            EmissionChannel::Location => write!(f, "LOCATION"),
            EmissionChannel::Direct => write!(f, "DIRECT"),
        }
    }
}

// ==========================================
// 排放范围 (Scope)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Scope1, // 直接排放
    Scope2, // 外购能源间接排放
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Scope1 => write!(f, "Alcance 1"),
            Scope::Scope2 => write!(f, "Alcance 2"),
        }
    }
}
