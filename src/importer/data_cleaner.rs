// ==========================================
// 温室气体中心报表 - 数据清洗器实现
// ==========================================
// 职责: TRIM / 不换行空格标准化 / NULL 标准化 / 区域无关的数值解析
// ==========================================

use regex::Regex;
use std::sync::OnceLock;

pub struct DataCleaner;

// 尾数 + 可选指数 + 可选单位；整串必须匹配
fn numeric_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^([+-]?[0-9][0-9.,]*)((?:[eE][+-]?[0-9]+)?)(?i:kwh|mwh|gwh|wh|nm3|m3|m³|litros|litro|lt|l|kg|tco2e|t|€|eur|uds|ud)?$",
        )
        .expect("valid numeric regex")
    })
}

impl DataCleaner {
    /// 清洗文本: 不换行空格 → 普通空格，连续空白折叠，去首尾空白
    pub fn clean_text(&self, value: &str) -> String {
        value
            .replace(|c: char| c == '\u{00a0}' || c == '\u{202f}' || c == '\u{2007}', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let cleaned = self.clean_text(&v);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }

    /// 区域无关的数值解析
    ///
    /// 规则:
    /// - 去掉内部空白（含不换行空格）与已知的尾随单位（kWh、m3、l、kg、€ 等）
    /// - 支持科学计数法指数（1.5E+3、2,5e-4），分隔符规则只作用于尾数
    /// - 其余尾随字符（如 "12abc"）视为无法解析
    /// - 同时出现 '.' 与 ',' 时，靠后的一个是小数点
    /// - 仅出现一种分隔符: 出现一次为小数点，多次为千分位
    ///
    /// # 返回
    /// - None: 无法解析
    pub fn parse_quantity(&self, raw: &str) -> Option<f64> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{2007}')
            .collect();
        let caps = numeric_token().captures(&compact)?;
        let token = caps.get(1)?.as_str();
        let exponent = caps.get(2).map_or("", |m| m.as_str());

        let last_dot = token.rfind('.');
        let last_comma = token.rfind(',');
        let normalized = match (last_dot, last_comma) {
            (Some(d), Some(c)) => {
                if d > c {
                    token.replace(',', "")
                } else {
                    token.replace('.', "").replace(',', ".")
                }
            }
            (None, Some(_)) => {
                if token.matches(',').count() == 1 {
                    token.replace(',', ".")
                } else {
                    token.replace(',', "")
                }
            }
            (Some(_), None) => {
                if token.matches('.').count() == 1 {
                    token.to_string()
                } else {
                    token.replace('.', "")
                }
            }
            (None, None) => token.to_string(),
        };

        format!("{}{}", normalized.trim_end_matches('.'), exponent)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}
