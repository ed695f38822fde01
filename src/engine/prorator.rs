// ==========================================
// 温室气体中心报表 - 账期年度分摊引擎
// ==========================================
// 职责: 宽松日期解析 + 账期落在目标年份内的数量比例
// 规则: 含首尾两端按天计数；任一日期无法解析时整笔计入目标年份
// ==========================================

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

// ==========================================
// Proration - 分摊结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proration {
    /// 账期总天数（含首尾）；日期未知时为 0
    pub period_days: i64,
    /// 落在目标年份内的天数；日期未知时为 0
    pub overlap_days: i64,
    /// 适用比例 [0, 1]
    pub fraction: f64,
    /// 两个日期是否都解析成功
    pub dates_known: bool,
}

impl Proration {
    /// 适用百分比（写入报表时使用）
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }

    /// 与目标年份无交集（该行不计入当年）
    pub fn is_outside(&self) -> bool {
        self.fraction <= 0.0
    }
}

fn day_month_year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2}|\d{4})$").expect("valid date regex")
    })
}

fn compact_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid date regex"))
}

fn non_digit_split() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\D+").expect("valid split regex"))
}

// ==========================================
// DateOverlapProrator - 账期分摊器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct DateOverlapProrator;

impl DateOverlapProrator {
    pub fn new() -> Self {
        Self
    }

    /// 宽松日期解析
    ///
    /// 尝试顺序（命中即返回）:
    /// 1) ISO yyyy-mm-dd
    /// 2) dd/mm/yyyy、mm/dd/yyyy（2 位或 4 位年份，分隔符 / - .）
    /// 3) 紧凑 yyyymmdd
    /// 4) 兜底: 按非数字切分，先日在前、后月在前
    ///
    /// 返回 None 表示"未知"，调用方不得视为错误
    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        // 去掉时间部分: "2023-06-01 00:00:00" / "2023-06-01T00:00:00"
        let date_part = if trimmed.contains(':') {
            trimmed
                .split(|c: char| c == ' ' || c == 'T')
                .next()
                .unwrap_or(trimmed)
        } else {
            trimmed
        };

        // 1) ISO
        let four_digit_year = date_part.split('-').next().map_or(false, |y| y.len() == 4);
        if four_digit_year {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                return Some(date);
            }
        }

        // 2) 日/月/年 与 月/日/年
        if let Some(caps) = day_month_year_pattern().captures(date_part) {
            let first: u32 = caps[1].parse().ok()?;
            let second: u32 = caps[2].parse().ok()?;
            let year = expand_year(&caps[3])?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, second, first)
                .or_else(|| NaiveDate::from_ymd_opt(year, first, second))
            {
                return Some(date);
            }
        }

        // 3) yyyymmdd
        if let Some(caps) = compact_pattern().captures(date_part) {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }

        // 4) 兜底切分
        self.parse_by_split(date_part)
    }

    fn parse_by_split(&self, text: &str) -> Option<NaiveDate> {
        let parts: Vec<&str> = non_digit_split()
            .split(text)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 {
            return None;
        }

        let nums: Vec<u32> = parts
            .iter()
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;

        if parts[0].len() == 4 {
            let year = nums[0] as i32;
            return NaiveDate::from_ymd_opt(year, nums[1], nums[2])
                .or_else(|| NaiveDate::from_ymd_opt(year, nums[2], nums[1]));
        }

        let year = expand_year(parts[2])?;
        NaiveDate::from_ymd_opt(year, nums[1], nums[0])
            .or_else(|| NaiveDate::from_ymd_opt(year, nums[0], nums[1]))
    }

    /// 计算账期在目标年份内的分摊结果
    pub fn prorate(&self, start_text: Option<&str>, end_text: Option<&str>, target_year: i32) -> Proration {
        let start = start_text.and_then(|s| self.parse_date(s));
        let end = end_text.and_then(|s| self.parse_date(s));

        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            // 任一日期未知: 整笔计入目标年份
            _ => {
                return Proration {
                    period_days: 0,
                    overlap_days: 0,
                    fraction: 1.0,
                    dates_known: false,
                }
            }
        };

        if end < start {
            return Proration {
                period_days: 0,
                overlap_days: 0,
                fraction: 0.0,
                dates_known: true,
            };
        }

        let period_days = (end - start).num_days() + 1;
        let overlap_days = overlap_days_in_year(start, end, target_year);

        Proration {
            period_days,
            overlap_days,
            fraction: overlap_days as f64 / period_days as f64,
            dates_known: true,
        }
    }

    /// 目标年份适用数量
    ///
    /// - 数量 <= 0 → 0
    /// - 结束早于开始 → 0
    /// - 无交集 → 0
    pub fn applicable_quantity(
        &self,
        start_text: Option<&str>,
        end_text: Option<&str>,
        total_quantity: f64,
        target_year: i32,
    ) -> f64 {
        if total_quantity <= 0.0 || !total_quantity.is_finite() {
            return 0.0;
        }
        total_quantity * self.prorate(start_text, end_text, target_year).fraction
    }
}

/// [start, end] 与目标年份 [1/1, 12/31] 的交集天数（含首尾）
fn overlap_days_in_year(start: NaiveDate, end: NaiveDate, year: i32) -> i64 {
    let (Some(year_start), Some(year_end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return 0;
    };
    let from = start.max(year_start);
    let to = end.min(year_end);
    if to < from {
        0
    } else {
        (to - from).num_days() + 1
    }
}

/// 2 位年份 → 2000 + yy（>= 70 视为 19xx）；4 位原样
fn expand_year(text: &str) -> Option<i32> {
    let value: i32 = text.parse().ok()?;
    match text.len() {
        2 if value >= 70 => Some(1900 + value),
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}
