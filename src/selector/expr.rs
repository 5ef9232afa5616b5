use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, SelectorError};
use crate::model::{CellRow, CellTable, CellValue};

// ---------------------------------------------------------------------------
// Expression – a boolean threshold predicate over row columns
// ---------------------------------------------------------------------------

/// A parsed threshold expression such as `~PDL1 > 0.25` or
/// `~E2 == 1 & Tissue == "stroma"`.
///
/// Keeps the original source text verbatim so structural errors can echo the
/// definition exactly as the user wrote it; the parsed tree provides the
/// canonical text used for display names.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Pred,
}

#[derive(Debug, Clone, PartialEq)]
enum Pred {
    Cmp {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// A reference to a table column.
    Column(String),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

impl Expression {
    /// Parse an expression from its source text.
    ///
    /// Any number of leading `~` markers is accepted and skipped; the stored
    /// source keeps them. Grammar, loosest-binding first: `|`, `&`,
    /// comparison; parentheses group. Operands are column names (backticks
    /// quote names containing spaces), numbers, or quoted strings.
    pub fn parse(source: &str) -> Result<Expression> {
        let fail = |reason: String| SelectorError::BadExpression {
            text: source.to_string(),
            reason,
        };

        let mut body = source.trim();
        while let Some(rest) = body.strip_prefix('~') {
            body = rest.trim_start();
        }
        if body.is_empty() {
            return Err(fail("empty expression".to_string()));
        }

        let tokens = lex(body).map_err(&fail)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or().map_err(&fail)?;
        if let Some(extra) = parser.peek() {
            return Err(fail(format!("unexpected trailing {}", describe(extra))));
        }
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    /// The original text, exactly as given to [`Expression::parse`].
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Canonical text: the parsed tree printed with single spaces and
    /// minimal parentheses, leading markers gone. Used for display names.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        render(&self.root, &mut out, 0);
        out
    }

    /// Check every referenced column against the table's column list.
    pub fn validate_columns(&self, table: &CellTable) -> Result<()> {
        let mut columns = Vec::new();
        collect_columns(&self.root, &mut columns);
        for column in columns {
            if !table.has_column(column) {
                return Err(SelectorError::UnknownColumn {
                    column: column.to_string(),
                    selector_text: self.source.clone(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate against a single row. Missing values and type-mismatched
    /// comparisons resolve to `false`; columns are assumed validated.
    pub fn matches_row(&self, row: &CellRow) -> bool {
        eval_pred(&self.root, row)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn collect_columns<'a>(pred: &'a Pred, out: &mut Vec<&'a str>) {
    match pred {
        Pred::Cmp { lhs, rhs, .. } => {
            for operand in [lhs, rhs] {
                if let Operand::Column(name) = operand {
                    out.push(name);
                }
            }
        }
        Pred::And(a, b) | Pred::Or(a, b) => {
            collect_columns(a, out);
            collect_columns(b, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical rendering
// ---------------------------------------------------------------------------

fn precedence(pred: &Pred) -> u8 {
    match pred {
        Pred::Or(..) => 1,
        Pred::And(..) => 2,
        Pred::Cmp { .. } => 3,
    }
}

fn render(pred: &Pred, out: &mut String, parent: u8) {
    let prec = precedence(pred);
    let grouped = prec < parent;
    if grouped {
        out.push('(');
    }
    match pred {
        Pred::Cmp { lhs, op, rhs } => {
            render_operand(lhs, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            render_operand(rhs, out);
        }
        Pred::And(a, b) => {
            render(a, out, prec);
            out.push_str(" & ");
            render(b, out, prec);
        }
        Pred::Or(a, b) => {
            render(a, out, prec);
            out.push_str(" | ");
            render(b, out, prec);
        }
    }
    if grouped {
        out.push(')');
    }
}

fn render_operand(operand: &Operand, out: &mut String) {
    match operand {
        Operand::Column(name) => {
            if is_plain_ident(name) {
                out.push_str(name);
            } else {
                out.push('`');
                out.push_str(name);
                out.push('`');
            }
        }
        Operand::Number(n) => out.push_str(&n.to_string()),
        Operand::Text(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

// ---------------------------------------------------------------------------
// Per-row evaluation
// ---------------------------------------------------------------------------

enum Resolved<'a> {
    Num(f64),
    Text(&'a str),
    Bool(bool),
    Missing,
}

fn eval_pred(pred: &Pred, row: &CellRow) -> bool {
    match pred {
        Pred::And(a, b) => eval_pred(a, row) && eval_pred(b, row),
        Pred::Or(a, b) => eval_pred(a, row) || eval_pred(b, row),
        Pred::Cmp { lhs, op, rhs } => compare(resolve(lhs, row), resolve(rhs, row), *op),
    }
}

fn resolve<'a>(operand: &'a Operand, row: &'a CellRow) -> Resolved<'a> {
    match operand {
        Operand::Number(n) => Resolved::Num(*n),
        Operand::Text(s) => Resolved::Text(s),
        Operand::Column(name) => match row.get(name) {
            None | Some(CellValue::Null) => Resolved::Missing,
            Some(CellValue::Int(i)) => Resolved::Num(*i as f64),
            Some(CellValue::Float(v)) => Resolved::Num(*v),
            Some(CellValue::Text(s)) => Resolved::Text(s),
            Some(CellValue::Bool(b)) => Resolved::Bool(*b),
        },
    }
}

fn compare(lhs: Resolved<'_>, rhs: Resolved<'_>, op: CmpOp) -> bool {
    match (lhs, rhs) {
        (Resolved::Num(a), Resolved::Num(b)) => ordering_matches(a.partial_cmp(&b), op),
        (Resolved::Text(a), Resolved::Text(b)) => ordering_matches(Some(a.cmp(b)), op),
        (Resolved::Bool(a), Resolved::Bool(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => false,
        },
        // Missing or type-mismatched operands never match.
        _ => false,
    }
}

fn ordering_matches(ord: Option<Ordering>, op: CmpOp) -> bool {
    let Some(ord) = ord else {
        return false;
    };
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Cmp(CmpOp),
    Amp,
    Pipe,
    LParen,
    RParen,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(s) => format!("`{s}`"),
        Token::Number(n) => n.to_string(),
        Token::Str(s) => format!("\"{s}\""),
        Token::Cmp(op) => format!("`{}`", op.symbol()),
        Token::Amp => "`&`".to_string(),
        Token::Pipe => "`|`".to_string(),
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
    }
}

fn lex(src: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                tokens.push(Token::Amp);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Eq));
                    i += 2;
                } else {
                    return Err("single `=` is not an operator, use `==`".to_string());
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Ne));
                    i += 2;
                } else {
                    return Err("expected `!=`".to_string());
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                    i += 1;
                }
            }
            '`' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '`' {
                    j += 1;
                }
                if j == chars.len() {
                    return Err("unterminated backquoted column name".to_string());
                }
                tokens.push(Token::Ident(chars[start..j].iter().collect()));
                i = j + 1;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j == chars.len() {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            '-' | '0'..='9' => {
                let start = i;
                let mut j = i;
                if chars[j] == '-' {
                    j += 1;
                    if !matches!(chars.get(j), Some(d) if d.is_ascii_digit()) {
                        return Err("unexpected `-`".to_string());
                    }
                }
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    j += 1;
                }
                let text: String = chars[start..j].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| format!("invalid number `{text}`"))?;
                tokens.push(Token::Number(value));
                i = j;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < chars.len()
                    && (chars[j].is_alphanumeric() || chars[j] == '_' || chars[j] == '.')
                {
                    j += 1;
                }
                tokens.push(Token::Ident(chars[start..j].iter().collect()));
                i = j;
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> std::result::Result<Pred, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_and()?;
            left = Pred::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> std::result::Result<Pred, String> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Token::Amp) {
            self.advance();
            let right = self.parse_primary()?;
            left = Pred::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> std::result::Result<Pred, String> {
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.parse_or()?;
            if self.advance() != Some(Token::RParen) {
                return Err("missing closing parenthesis".to_string());
            }
            return Ok(inner);
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> std::result::Result<Pred, String> {
        let lhs = self.parse_operand("left-hand")?;
        let op = match self.advance() {
            Some(Token::Cmp(op)) => op,
            Some(other) => {
                return Err(format!(
                    "expected a comparison operator, found {}",
                    describe(&other)
                ))
            }
            None => return Err("expected a comparison operator".to_string()),
        };
        let rhs = self.parse_operand("right-hand")?;
        Ok(Pred::Cmp { lhs, op, rhs })
    }

    fn parse_operand(&mut self, side: &str) -> std::result::Result<Operand, String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(Operand::Column(name)),
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Str(s)) => Ok(Operand::Text(s)),
            Some(other) => Err(format!(
                "expected a column or literal, found {}",
                describe(&other)
            )),
            None => Err(format!("missing {side} operand")),
        }
    }
}
