// ==========================================
// 温室气体中心报表 - 行处理结果与诊断日志
// ==========================================
// 单行失败只产生 Skipped + 诊断行，绝不中断整次导出
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    Accepted(T),
    Skipped(SkipReason),
}

impl<T> RowOutcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RowOutcome::Accepted(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            RowOutcome::Accepted(v) => Some(v),
            RowOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            RowOutcome::Accepted(_) => None,
            RowOutcome::Skipped(reason) => Some(reason),
        }
    }
}

// ==========================================
// SkipReason - 跳过原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// 源表没有表头（整表为空）
    NoHeader,
    /// 账期与目标年份无交集（或结束早于开始）
    OutsideYear {
        start: Option<String>,
        end: Option<String>,
        year: i32,
    },
    /// 发票号不在选中集合中
    InvoiceNotSelected { invoice: Option<String> },
    /// 数量缺失
    MissingQuantity,
    /// 数量无法解析
    InvalidQuantity { raw: String },
    /// 数量 <= 0
    NonPositiveQuantity { value: f64 },
    /// 其他单行异常
    Failed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoHeader => write!(f, "no header found"),
            SkipReason::OutsideYear { start, end, year } => write!(
                f,
                "period {} - {} outside year {}",
                start.as_deref().unwrap_or("?"),
                end.as_deref().unwrap_or("?"),
                year
            ),
            SkipReason::InvoiceNotSelected { invoice } => write!(
                f,
                "invoice {} not in selected invoice filter",
                invoice.as_deref().unwrap_or("(none)")
            ),
            SkipReason::MissingQuantity => write!(f, "quantity missing"),
            SkipReason::InvalidQuantity { raw } => write!(f, "quantity '{}' is not a number", raw),
            SkipReason::NonPositiveQuantity { value } => {
                write!(f, "quantity {} is not positive", value)
            }
            SkipReason::Failed { message } => write!(f, "row error: {}", message),
        }
    }
}

// ==========================================
// DiagnosticLog - 诊断日志（报表最后一张工作表）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    lines: Vec<String>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// 同一条内容只记录一次（因子缺失在大表中会重复出现）
    pub fn push_unique(&mut self, line: impl Into<String>) -> bool {
        let line = line.into();
        if self.lines.iter().any(|l| *l == line) {
            return false;
        }
        self.lines.push(line);
        true
    }

    /// 记录跳过的源行
    pub fn skipped(&mut self, row_number: usize, reason: &SkipReason) {
        self.lines
            .push(format!("row {} skipped: {}", row_number, reason));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.lines.iter().any(|l| l.contains(fragment))
    }
}
