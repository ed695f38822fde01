// ==========================================
// 温室气体中心报表 - 公式求值器
// ==========================================
// 职责: 对 ReportDocument 求值引擎输出的公式子集
// 用途: 写 xlsx 时缓存公式结果；测试中校验公式/字面量一致性
// 支持: 数字 / 字符串 / A1 引用（含 $、跨表、区域、整列）
//       + - * / & 比较运算 / 一元负号
//       SUM MIN MAX IF IFERROR SUMIF（条件含比较运算与 * ? ~ 通配符）
// ==========================================

use crate::domain::report::{column_index, CellValue, ReportDocument, ReportSheet};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ==========================================
// FormulaValue - 求值结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
    /// Excel 风格错误码: #DIV/0! #N/A #VALUE! #REF! #NAME?
    Error(String),
}

impl FormulaValue {
    fn error(code: &str) -> Self {
        FormulaValue::Error(code.to_string())
    }

    /// 数值视图（空单元格按 0）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Text(_) | FormulaValue::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => write!(f, "{}", n),
            FormulaValue::Text(s) => write!(f, "{}", s),
            FormulaValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Empty => Ok(()),
            FormulaValue::Error(code) => write!(f, "{}", code),
        }
    }
}

// ==========================================
// 词法
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum RefPart {
    Cell { row: usize, col: usize },
    Column { col: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct Reference {
    sheet: Option<String>,
    start: RefPart,
    end: Option<RefPart>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Bool(bool),
    Ref(Reference),
    Func(String),
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Cmp(CmpOp),
    LParen,
    RParen,
    Comma,
}

/// "$A$1" / "B7" / "C" / "$D" → RefPart（行列从 0 开始）
fn parse_ref_part(word: &str) -> Option<RefPart> {
    let body = word.strip_prefix('$').unwrap_or(word);
    let letters: String = body.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let rest = &body[letters.len()..];
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    let col = column_index(&letters)?;
    if digits.is_empty() {
        if rest.is_empty() {
            return Some(RefPart::Column { col });
        }
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some(RefPart::Cell { row: row - 1, col })
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// 读取引用（可带 ':' 区域）
    fn read_reference(&mut self, sheet: Option<String>, first: String) -> Result<Token, String> {
        let start = parse_ref_part(&first).ok_or_else(|| "#REF!".to_string())?;
        let end = if self.peek() == Some(':') {
            self.pos += 1;
            let second = self.read_word();
            Some(parse_ref_part(&second).ok_or_else(|| "#REF!".to_string())?)
        } else {
            None
        };
        // 单独的整列引用不合法
        if end.is_none() && matches!(start, RefPart::Column { .. }) {
            return Err("#NAME?".to_string());
        }
        Ok(Token::Ref(Reference { sheet, start, end }))
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match c {
                '0'..='9' | '.' => {
                    let start = self.pos;
                    while let Some(d) = self.peek() {
                        if d.is_ascii_digit() || d == '.' {
                            self.pos += 1;
                        } else if (d == 'e' || d == 'E') && self.pos > start {
                            self.pos += 1;
                            if matches!(self.peek(), Some('+') | Some('-')) {
                                self.pos += 1;
                            }
                        } else {
                            break;
                        }
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    Token::Number(text.parse().map_err(|_| "#VALUE!".to_string())?)
                }
                '"' => {
                    self.pos += 1;
                    let mut text = String::new();
                    loop {
                        match self.peek() {
                            Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => {
                                text.push('"');
                                self.pos += 2;
                            }
                            Some('"') => {
                                self.pos += 1;
                                break;
                            }
                            Some(ch) => {
                                text.push(ch);
                                self.pos += 1;
                            }
                            None => return Err("#VALUE!".to_string()),
                        }
                    }
                    Token::Text(text)
                }
                '\'' => {
                    self.pos += 1;
                    let mut sheet = String::new();
                    loop {
                        match self.peek() {
                            Some('\'') if self.chars.get(self.pos + 1) == Some(&'\'') => {
                                sheet.push('\'');
                                self.pos += 2;
                            }
                            Some('\'') => {
                                self.pos += 1;
                                break;
                            }
                            Some(ch) => {
                                sheet.push(ch);
                                self.pos += 1;
                            }
                            None => return Err("#REF!".to_string()),
                        }
                    }
                    if self.peek() != Some('!') {
                        return Err("#REF!".to_string());
                    }
                    self.pos += 1;
                    let first = self.read_word();
                    self.read_reference(Some(sheet), first)?
                }
                c if c.is_alphabetic() || c == '$' || c == '_' => {
                    let word = self.read_word();
                    match self.peek() {
                        Some('!') => {
                            self.pos += 1;
                            let first = self.read_word();
                            self.read_reference(Some(word), first)?
                        }
                        Some('(') => Token::Func(word.to_uppercase()),
                        _ => match word.to_uppercase().as_str() {
                            "TRUE" => Token::Bool(true),
                            "FALSE" => Token::Bool(false),
                            _ => self.read_reference(None, word)?,
                        },
                    }
                }
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '&' => self.single(Token::Amp),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ',' | ';' => self.single(Token::Comma),
                '=' => self.single(Token::Cmp(CmpOp::Eq)),
                '<' => {
                    self.pos += 1;
                    match self.peek() {
                        Some('=') => self.single(Token::Cmp(CmpOp::Le)),
                        Some('>') => self.single(Token::Cmp(CmpOp::Ne)),
                        _ => Token::Cmp(CmpOp::Lt),
                    }
                }
                '>' => {
                    self.pos += 1;
                    match self.peek() {
                        Some('=') => self.single(Token::Cmp(CmpOp::Ge)),
                        _ => Token::Cmp(CmpOp::Gt),
                    }
                }
                _ => return Err("#NAME?".to_string()),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }
}

// ==========================================
// 语法
// ==========================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Ref(Reference),
    Neg(Box<Expr>),
    Binary(Token, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse(mut self) -> Result<Expr, String> {
        let expr = self.comparison()?;
        if self.pos != self.tokens.len() {
            return Err("#VALUE!".to_string());
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.concat()?;
        while let Some(op @ Token::Cmp(_)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.concat()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Amp) {
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary(Token::Amp, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::Ref(r)) => Ok(Expr::Ref(r)),
            Some(Token::LParen) => {
                let inner = self.comparison()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("#VALUE!".to_string()),
                }
            }
            Some(Token::Func(name)) => {
                if self.next() != Some(Token::LParen) {
                    return Err("#NAME?".to_string());
                }
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    return Ok(Expr::Call(name, args));
                }
                loop {
                    args.push(self.comparison()?);
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        _ => return Err("#VALUE!".to_string()),
                    }
                }
                Ok(Expr::Call(name, args))
            }
            _ => Err("#VALUE!".to_string()),
        }
    }
}

fn parse_formula(formula: &str) -> Result<Expr, String> {
    let body = formula.trim();
    let body = body.strip_prefix('=').unwrap_or(body);
    let tokens = Lexer::new(body).tokenize()?;
    Parser { tokens, pos: 0 }.parse()
}

// ==========================================
// FormulaEvaluator - 求值器
// ==========================================

/// 区域边界（行列从 0 开始，含两端）
struct Bounds<'d> {
    sheet: &'d ReportSheet,
    rows: (usize, usize),
    cols: (usize, usize),
}

pub struct FormulaEvaluator<'d> {
    doc: &'d ReportDocument,
    cache: RefCell<HashMap<(String, usize, usize), FormulaValue>>,
    in_progress: RefCell<HashSet<(String, usize, usize)>>,
}

impl<'d> FormulaEvaluator<'d> {
    pub fn new(doc: &'d ReportDocument) -> Self {
        Self {
            doc,
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    fn find_sheet(&self, name: &str) -> Option<&'d ReportSheet> {
        self.doc.sheet(name).or_else(|| self.doc.sheet_ignore_case(name))
    }

    /// 在指定工作表上下文中求值一条公式
    pub fn evaluate(&self, sheet: &str, formula: &str) -> FormulaValue {
        match parse_formula(formula) {
            Ok(expr) => self.eval(&expr, sheet),
            Err(code) => FormulaValue::Error(code),
        }
    }

    /// 单元格值（公式单元格递归求值并缓存；循环引用 → #REF!）
    pub fn cell_value(&self, sheet: &str, row: usize, col: usize) -> FormulaValue {
        let Some(target) = self.find_sheet(sheet) else {
            return FormulaValue::error("#REF!");
        };
        self.value_in(target, row, col)
    }

    /// 单元格数值（文本与错误返回 None）
    pub fn number_at(&self, sheet: &str, row: usize, col: usize) -> Option<f64> {
        self.cell_value(sheet, row, col).as_number()
    }

    fn value_in(&self, sheet: &'d ReportSheet, row: usize, col: usize) -> FormulaValue {
        match sheet.get(row, col) {
            None | Some(CellValue::Empty) => FormulaValue::Empty,
            Some(CellValue::Number(n)) => FormulaValue::Number(*n),
            Some(CellValue::Text(s)) => FormulaValue::Text(s.clone()),
            Some(CellValue::Formula(f)) => {
                let key = (sheet.name.clone(), row, col);
                if let Some(hit) = self.cache.borrow().get(&key) {
                    return hit.clone();
                }
                if !self.in_progress.borrow_mut().insert(key.clone()) {
                    return FormulaValue::error("#REF!");
                }
                let value = self.evaluate(&sheet.name, f);
                self.in_progress.borrow_mut().remove(&key);
                self.cache.borrow_mut().insert(key, value.clone());
                value
            }
        }
    }

    fn bounds(&self, reference: &Reference, current: &str) -> Option<Bounds<'d>> {
        let sheet = self.find_sheet(reference.sheet.as_deref().unwrap_or(current))?;
        let end = reference.end.unwrap_or(reference.start);
        let last_row = sheet.row_count().saturating_sub(1);
        let (r1, c1) = match reference.start {
            RefPart::Cell { row, col } => (row, col),
            RefPart::Column { col } => (0, col),
        };
        let (r2, c2) = match end {
            RefPart::Cell { row, col } => (row, col),
            RefPart::Column { col } => (last_row, col),
        };
        Some(Bounds {
            sheet,
            rows: (r1.min(r2), r1.max(r2)),
            cols: (c1.min(c2), c1.max(c2)),
        })
    }

    /// 函数参数展开: 区域 → 全部单元格；标量 → 单值
    fn flatten(&self, expr: &Expr, current: &str) -> Vec<(FormulaValue, bool)> {
        match expr {
            Expr::Ref(r) if r.end.is_some() => {
                let Some(b) = self.bounds(r, current) else {
                    return vec![(FormulaValue::error("#REF!"), false)];
                };
                let mut out = Vec::new();
                for row in b.rows.0..=b.rows.1.min(b.sheet.row_count().saturating_sub(1)) {
                    for col in b.cols.0..=b.cols.1 {
                        out.push((self.value_in(b.sheet, row, col), true));
                    }
                }
                out
            }
            other => vec![(self.eval(other, current), false)],
        }
    }

    fn eval(&self, expr: &Expr, current: &str) -> FormulaValue {
        match expr {
            Expr::Number(n) => FormulaValue::Number(*n),
            Expr::Text(s) => FormulaValue::Text(s.clone()),
            Expr::Bool(b) => FormulaValue::Bool(*b),
            Expr::Ref(r) => {
                if r.end.is_some() {
                    return FormulaValue::error("#VALUE!");
                }
                match (self.bounds(r, current), r.start) {
                    (Some(b), RefPart::Cell { row, col }) => self.value_in(b.sheet, row, col),
                    _ => FormulaValue::error("#REF!"),
                }
            }
            Expr::Neg(inner) => match to_number(&self.eval(inner, current)) {
                Ok(n) => FormulaValue::Number(-n),
                Err(e) => e,
            },
            Expr::Binary(op, left, right) => {
                let l = self.eval(left, current);
                let r = self.eval(right, current);
                binary(op, l, r)
            }
            Expr::Call(name, args) => self.call(name, args, current),
        }
    }

    fn call(&self, name: &str, args: &[Expr], current: &str) -> FormulaValue {
        match name {
            "SUM" | "MIN" | "MAX" => {
                let mut numbers = Vec::new();
                for arg in args {
                    for (value, from_range) in self.flatten(arg, current) {
                        match &value {
                            FormulaValue::Error(_) => return value.clone(),
                            FormulaValue::Number(n) => numbers.push(*n),
                            // 区域内的文本/空白被忽略，直接参数则强制转换
                            other if !from_range => match to_number(other) {
                                Ok(n) => numbers.push(n),
                                Err(e) => return e,
                            },
                            _ => {}
                        }
                    }
                }
                let result = match name {
                    "SUM" => numbers.iter().sum(),
                    "MIN" => numbers.iter().copied().fold(f64::INFINITY, f64::min),
                    _ => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                };
                FormulaValue::Number(if result.is_finite() { result } else { 0.0 })
            }
            "IF" => {
                if args.len() < 2 || args.len() > 3 {
                    return FormulaValue::error("#VALUE!");
                }
                match truthy(&self.eval(&args[0], current)) {
                    Ok(true) => self.eval(&args[1], current),
                    Ok(false) => match args.get(2) {
                        Some(otherwise) => self.eval(otherwise, current),
                        None => FormulaValue::Bool(false),
                    },
                    Err(e) => e,
                }
            }
            "IFERROR" => {
                if args.len() != 2 {
                    return FormulaValue::error("#VALUE!");
                }
                let value = self.eval(&args[0], current);
                if value.is_error() {
                    self.eval(&args[1], current)
                } else {
                    value
                }
            }
            "SUMIF" => self.sumif(args, current),
            _ => FormulaValue::error("#NAME?"),
        }
    }

    /// SUMIF(条件区域, 条件, [求和区域])；求和区域与条件区域按左上角对齐
    fn sumif(&self, args: &[Expr], current: &str) -> FormulaValue {
        if args.len() < 2 || args.len() > 3 {
            return FormulaValue::error("#VALUE!");
        }
        let Expr::Ref(range) = &args[0] else {
            return FormulaValue::error("#VALUE!");
        };
        let sum_ref = match args.get(2) {
            Some(Expr::Ref(r)) => r,
            Some(_) => return FormulaValue::error("#VALUE!"),
            None => range,
        };
        let criterion = match self.eval(&args[1], current) {
            FormulaValue::Error(e) => return FormulaValue::Error(e),
            value => Criterion::parse(&value),
        };
        let (Some(b), Some(sum)) = (self.bounds(range, current), self.bounds(sum_ref, current)) else {
            return FormulaValue::error("#REF!");
        };

        let mut total = 0.0;
        let last = b.rows.1.min(b.sheet.row_count().saturating_sub(1));
        for row in b.rows.0..=last {
            for col in b.cols.0..=b.cols.1 {
                if !criterion.matches(&self.value_in(b.sheet, row, col)) {
                    continue;
                }
                let target = (sum.rows.0 + row - b.rows.0, sum.cols.0 + col - b.cols.0);
                match self.value_in(sum.sheet, target.0, target.1) {
                    FormulaValue::Number(n) => total += n,
                    FormulaValue::Error(e) => return FormulaValue::Error(e),
                    _ => {}
                }
            }
        }
        FormulaValue::Number(total)
    }
}

// ==========================================
// Criterion - SUMIF 条件
// ==========================================
// "=x" / "x" 相等（文本不区分大小写，* ? 通配，~ 转义）
// "<>x" 不等；"<" "<=" ">" ">=" 比较
#[derive(Debug, Clone, PartialEq)]
enum Criterion {
    Number(CmpOp, f64),
    Text(CmpOp, String),
}

impl Criterion {
    fn parse(value: &FormulaValue) -> Self {
        let text = match value {
            FormulaValue::Number(n) => return Criterion::Number(CmpOp::Eq, *n),
            FormulaValue::Bool(b) => return Criterion::Text(CmpOp::Eq, if *b { "TRUE" } else { "FALSE" }.to_string()),
            FormulaValue::Empty => String::new(),
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Error(e) => e.clone(),
        };
        let (op, operand) = [
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<>", CmpOp::Ne),
            ("=", CmpOp::Eq),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ]
        .iter()
        .find_map(|(prefix, op)| text.strip_prefix(prefix).map(|rest| (*op, rest.to_string())))
        .unwrap_or((CmpOp::Eq, text));

        match operand.trim().parse::<f64>() {
            Ok(n) if !operand.trim().is_empty() => Criterion::Number(op, n),
            _ => Criterion::Text(op, operand),
        }
    }

    fn matches(&self, candidate: &FormulaValue) -> bool {
        match self {
            Criterion::Number(op, n) => {
                let value = match candidate {
                    FormulaValue::Number(v) => Some(*v),
                    FormulaValue::Text(t) if matches!(op, CmpOp::Eq | CmpOp::Ne) => t.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match value {
                    Some(v) => compare(*op, &FormulaValue::Number(v), &FormulaValue::Number(*n)) == FormulaValue::Bool(true),
                    None => *op == CmpOp::Ne,
                }
            }
            Criterion::Text(op, pattern) => {
                let text = match candidate {
                    FormulaValue::Text(t) => t.as_str(),
                    FormulaValue::Empty => "",
                    _ => return *op == CmpOp::Ne,
                };
                match op {
                    CmpOp::Eq => wildcard_match(pattern, text),
                    CmpOp::Ne => !wildcard_match(pattern, text),
                    _ => {
                        !text.is_empty()
                            && compare(
                                *op,
                                &FormulaValue::Text(text.to_string()),
                                &FormulaValue::Text(pattern.clone()),
                            ) == FormulaValue::Bool(true)
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PatternChar {
    Literal(char),
    AnyOne,
    AnyMany,
}

/// 不区分大小写的通配符匹配（* 任意串，? 单字符，~ 转义下一个字符）
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '~' => match chars.next() {
                Some(escaped) => PatternChar::Literal(escaped),
                None => PatternChar::Literal('~'),
            },
            '*' => PatternChar::AnyMany,
            '?' => PatternChar::AnyOne,
            other => PatternChar::Literal(other),
        };
        tokens.push(token);
    }
    let text: Vec<char> = text.chars().collect();

    // matched[j] = 前 i 个模式元素能否匹配 text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        for j in 0..=text.len() {
            next[j] = match token {
                PatternChar::AnyMany => matched[j] || (j > 0 && next[j - 1]),
                _ if j == 0 => false,
                PatternChar::AnyOne => matched[j - 1],
                PatternChar::Literal(c) => matched[j - 1] && chars_equal_ignore_case(*c, text[j - 1]),
            };
        }
        matched = next;
    }
    matched[text.len()]
}

fn chars_equal_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn to_number(value: &FormulaValue) -> Result<f64, FormulaValue> {
    match value {
        FormulaValue::Number(n) => Ok(*n),
        FormulaValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        FormulaValue::Empty => Ok(0.0),
        FormulaValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FormulaValue::error("#VALUE!")),
        FormulaValue::Error(_) => Err(value.clone()),
    }
}

fn truthy(value: &FormulaValue) -> Result<bool, FormulaValue> {
    match value {
        FormulaValue::Bool(b) => Ok(*b),
        FormulaValue::Text(s) => match s.to_uppercase().as_str() {
            "TRUE" => Ok(true),
            "FALSE" => Ok(false),
            _ => Err(FormulaValue::error("#VALUE!")),
        },
        other => to_number(other).map(|n| n != 0.0),
    }
}

fn compare(op: CmpOp, l: &FormulaValue, r: &FormulaValue) -> FormulaValue {
    use std::cmp::Ordering;
    let ordering = match (l, r) {
        (FormulaValue::Text(x), FormulaValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (FormulaValue::Text(x), FormulaValue::Empty) => x.as_str().cmp(""),
        (FormulaValue::Empty, FormulaValue::Text(y)) => "".cmp(y.as_str()),
        // 数字总是小于文本
        (FormulaValue::Text(_), _) => Ordering::Greater,
        (_, FormulaValue::Text(_)) => Ordering::Less,
        _ => match (to_number(l), to_number(r)) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Err(e), _) | (_, Err(e)) => return e,
        },
    };
    let result = match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    };
    FormulaValue::Bool(result)
}

fn binary(op: &Token, l: FormulaValue, r: FormulaValue) -> FormulaValue {
    if l.is_error() {
        return l;
    }
    if r.is_error() {
        return r;
    }
    match op {
        Token::Cmp(cmp) => compare(*cmp, &l, &r),
        Token::Amp => FormulaValue::Text(format!("{}{}", l, r)),
        _ => {
            let (x, y) = match (to_number(&l), to_number(&r)) {
                (Ok(x), Ok(y)) => (x, y),
                (Err(e), _) | (_, Err(e)) => return e,
            };
            match op {
                Token::Plus => FormulaValue::Number(x + y),
                Token::Minus => FormulaValue::Number(x - y),
                Token::Star => FormulaValue::Number(x * y),
                Token::Slash if y == 0.0 => FormulaValue::error("#DIV/0!"),
                Token::Slash => FormulaValue::Number(x / y),
                _ => FormulaValue::error("#VALUE!"),
            }
        }
    }
}
