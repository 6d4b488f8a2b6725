//! Condition expressions used by tool-binding `when` clauses and workflow
//! transitions.
//!
//! A small, closed grammar: literals, dotted identifiers, comparisons and
//! boolean connectives. Expressions are parsed into an AST and interpreted;
//! source text is never executed or spliced into generated code.
//!
//! ```text
//! expr    := or
//! or      := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | cmp
//! cmp     := primary (("=="|"!="|"<"|"<="|">"|">=") primary)?
//! primary := number | 'str' | "str" | true | false | null | ident | "(" expr ")"
//! ident   := [A-Za-z_][A-Za-z0-9_]* ("." [A-Za-z0-9_-]+)*
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::ExpressionError;
use crate::domain::quote::python_str;

pub const MAX_EXPRESSION_LEN: usize = 512;
pub const MAX_DEPTH: usize = 32;

// ── Values ───────────────────────────────────────────────────────────────────

/// Runtime value of an expression operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            other => Self::Str(other.to_string()),
        }
    }
}

/// Variables visible to an expression.
///
/// Identifiers under an *optional namespace* (for example `options`) resolve
/// to `null` when unbound; any other unbound identifier is an error.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, Value>,
    optional_namespaces: Vec<String>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_optional_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.optional_namespaces.push(namespace.into());
        self
    }

    fn lookup(&self, name: &str) -> Result<Value, ExpressionError> {
        if let Some(v) = self.values.get(name) {
            return Ok(v.clone());
        }
        let optional = self
            .optional_namespaces
            .iter()
            .any(|ns| name.strip_prefix(ns.as_str()).is_some_and(|rest| rest.starts_with('.')));
        if optional {
            Ok(Value::Null)
        } else {
            Err(ExpressionError::UnknownIdentifier(name.to_string()))
        }
    }
}

// ── AST ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
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
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Every identifier referenced, in source order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Ident(name) => out.push(name),
            Self::Not(inner) => inner.collect_identifiers(out),
            Self::And(l, r) | Self::Or(l, r) | Self::Compare { left: l, right: r, .. } => {
                l.collect_identifiers(out);
                r.collect_identifiers(out);
            }
        }
    }

    /// Checks that every identifier is either one of `exact` or lives under
    /// one of the `namespaces` (as `<ns>.<key>`).
    pub fn check_identifiers(
        &self,
        exact: &[&str],
        namespaces: &[&str],
    ) -> Result<(), ExpressionError> {
        for name in self.identifiers() {
            let under_namespace = namespaces.iter().any(|ns| {
                name.strip_prefix(ns)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|key| !key.is_empty())
            });
            if !exact.contains(&name) && !under_namespace {
                let mut allowed: Vec<String> = exact.iter().map(|s| (*s).to_string()).collect();
                allowed.extend(namespaces.iter().map(|ns| format!("{ns}.<key>")));
                return Err(ExpressionError::ForbiddenIdentifier {
                    name: name.to_string(),
                    allowed: allowed.join(", "),
                });
            }
        }
        Ok(())
    }

    /// Evaluates to a value.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, ExpressionError> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Ident(name) => bindings.lookup(name),
            Self::Not(inner) => Ok(Value::Bool(!inner.evaluate_bool("!", bindings)?)),
            Self::And(l, r) => Ok(Value::Bool(
                l.evaluate_bool("&&", bindings)? && r.evaluate_bool("&&", bindings)?,
            )),
            Self::Or(l, r) => Ok(Value::Bool(
                l.evaluate_bool("||", bindings)? || r.evaluate_bool("||", bindings)?,
            )),
            Self::Compare { op, left, right } => {
                let l = left.evaluate(bindings)?;
                let r = right.evaluate(bindings)?;
                compare(*op, &l, &r).map(Value::Bool)
            }
        }
    }

    fn evaluate_bool(&self, op: &'static str, bindings: &Bindings) -> Result<bool, ExpressionError> {
        match self.evaluate(bindings)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExpressionError::NotBoolean {
                op,
                found: other.type_name(),
            }),
        }
    }

    /// Evaluates a whole condition; the result must be a boolean.
    pub fn matches(&self, bindings: &Bindings) -> Result<bool, ExpressionError> {
        self.evaluate_bool("condition", bindings)
    }

    /// Renders the AST as a Python expression. `ident` maps each identifier
    /// to the Python code that reads it.
    pub fn to_python(&self, ident: &dyn Fn(&str) -> String) -> String {
        match self {
            Self::Literal(v) => python_literal(v),
            Self::Ident(name) => ident(name),
            Self::Not(inner) => format!("(not {})", inner.to_python(ident)),
            Self::And(l, r) => format!("({} and {})", l.to_python(ident), r.to_python(ident)),
            Self::Or(l, r) => format!("({} or {})", l.to_python(ident), r.to_python(ident)),
            Self::Compare { op, left, right } => format!(
                "({} {} {})",
                left.to_python(ident),
                op.symbol(),
                right.to_python(ident)
            ),
        }
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool, ExpressionError> {
    match op {
        CmpOp::Eq => Ok(l == r),
        CmpOp::Ne => Ok(l != r),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (l, r) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(ExpressionError::TypeMismatch {
                        op: op.symbol(),
                        left: l.type_name(),
                        right: r.type_name(),
                    });
                }
            };
            let Some(ordering) = ordering else {
                return Ok(false);
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq => ordering.is_eq(),
                CmpOp::Ne => ordering.is_ne(),
            })
        }
    }
}

fn format_number(n: f64) -> String {
    // `{}` on f64 prints integral values without a fractional part.
    format!("{n}")
}

fn python_literal(v: &Value) -> String {
    match v {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) => python_str(s),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::Null) => f.write_str("null"),
            Self::Literal(Value::Bool(b)) => write!(f, "{b}"),
            Self::Literal(Value::Number(n)) => f.write_str(&format_number(*n)),
            Self::Literal(Value::Str(s)) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Self::Ident(name) => f.write_str(name),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(l, r) => write!(f, "({l} && {r})"),
            Self::Or(l, r) => write!(f, "({l} || {r})"),
            Self::Compare { op, left, right } => {
                write!(f, "({} {} {})", Operand(left), op.symbol(), Operand(right))
            }
        }
    }
}

/// A comparison operand; negations are parenthesised so `!` cannot swallow
/// the comparison when the text is parsed again.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Not(_) => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

// ── Lexer ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    Not,
    And,
    Or,
    Cmp(CmpOp),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {}", format_number(*n)),
            Self::Str(_) => "string".to_string(),
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::True => "'true'".to_string(),
            Self::False => "'false'".to_string(),
            Self::Null => "'null'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Not => "'!'".to_string(),
            Self::And => "'&&'".to_string(),
            Self::Or => "'||'".to_string(),
            Self::Cmp(op) => format!("'{}'", op.symbol()),
        }
    }
}

fn lex(src: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while let Some(&(pos, c)) = chars.get(i) {
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push((pos, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((pos, Token::RParen));
                i += 1;
            }
            '&' if peek(i + 1) == Some('&') => {
                tokens.push((pos, Token::And));
                i += 2;
            }
            '|' if peek(i + 1) == Some('|') => {
                tokens.push((pos, Token::Or));
                i += 2;
            }
            '=' if peek(i + 1) == Some('=') => {
                tokens.push((pos, Token::Cmp(CmpOp::Eq)));
                i += 2;
            }
            '!' if peek(i + 1) == Some('=') => {
                tokens.push((pos, Token::Cmp(CmpOp::Ne)));
                i += 2;
            }
            '!' => {
                tokens.push((pos, Token::Not));
                i += 1;
            }
            '<' | '>' => {
                let or_equal = peek(i + 1) == Some('=');
                let op = match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    _ => CmpOp::Ge,
                };
                tokens.push((pos, Token::Cmp(op)));
                i += if or_equal { 2 } else { 1 };
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match peek(i) {
                        None => return Err(ExpressionError::UnterminatedString { pos }),
                        Some('\\') => match peek(i + 1) {
                            Some(escaped) => {
                                text.push(escaped);
                                i += 2;
                            }
                            None => return Err(ExpressionError::UnterminatedString { pos }),
                        },
                        Some(ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((pos, Token::Str(text)));
            }
            c if c.is_ascii_digit()
                || (c == '-' && peek(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while peek(i).is_some_and(|n| n.is_ascii_digit()) {
                    i += 1;
                }
                if peek(i) == Some('.') && peek(i + 1).is_some_and(|n| n.is_ascii_digit()) {
                    i += 1;
                    while peek(i).is_some_and(|n| n.is_ascii_digit()) {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                let n = text
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ExpressionError::InvalidNumber(text.clone()))?;
                tokens.push((pos, Token::Number(n)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while peek(i).is_some_and(|n| n.is_ascii_alphanumeric() || n == '_') {
                    i += 1;
                }
                while peek(i) == Some('.')
                    && peek(i + 1).is_some_and(|n| n.is_ascii_alphanumeric() || n == '_' || n == '-')
                {
                    i += 1;
                    while peek(i).is_some_and(|n| n.is_ascii_alphanumeric() || n == '_' || n == '-')
                    {
                        i += 1;
                    }
                }
                let word: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word),
                };
                tokens.push((pos, token));
            }
            other => return Err(ExpressionError::UnexpectedChar { pos, ch: other }),
        }
    }
    Ok(tokens)
}

// ── Parser ───────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.cursor).cloned();
        if item.is_some() {
            self.cursor += 1;
        }
        item
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.cursor += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.cursor += 1;
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Not) {
            self.cursor += 1;
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.cmp()
    }

    fn cmp(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.primary()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.cursor += 1;
            let right = self.primary()?;
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let (pos, token) = self.next().ok_or(ExpressionError::UnexpectedEnd)?;
        match token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                self.enter()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((pos, other)) => Err(ExpressionError::UnexpectedToken {
                        pos,
                        found: other.describe(),
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                pos,
                found: other.describe(),
            }),
        }
    }
}

/// Parses an expression.
///
/// # Errors
///
/// Returns an error for empty or over-long input, lexical errors, grammar
/// violations and nesting beyond [`MAX_DEPTH`].
pub fn parse(src: &str) -> Result<Expr, ExpressionError> {
    let len = src.chars().count();
    if len > MAX_EXPRESSION_LEN {
        return Err(ExpressionError::TooLong {
            len,
            max: MAX_EXPRESSION_LEN,
        });
    }
    let tokens = lex(src)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    if let Some((pos, token)) = parser.next() {
        return Err(ExpressionError::UnexpectedToken {
            pos,
            found: token.describe(),
        });
    }
    Ok(expr)
}
