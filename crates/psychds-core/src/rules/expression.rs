//! Selector expression language.
//!
//! Schema rules carry `selectors`: boolean expressions over the per-file
//! context, e.g. `extension == ".csv"` or `sidecar.name == "study"`.
//! Expressions are parsed to an AST and interpreted against a scope; no
//! host-language evaluation is involved. Compilation is cached by
//! expression text.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unexpected character {0:?} in expression")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

/// Name resolution for identifiers. Dotted identifiers arrive as
/// segments; unresolved names evaluate as null.
pub trait EvalScope {
    fn resolve(&self, path: &[&str]) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(Vec<String>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate to a JSON value.
    pub fn eval(&self, scope: &dyn EvalScope) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Ident(path) => {
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                scope.resolve(&segments).unwrap_or(Value::Null)
            }
            Expr::Not(inner) => Value::Bool(!truthy(&inner.eval(scope))),
            Expr::Eq(a, b) => Value::Bool(a.eval(scope) == b.eval(scope)),
            Expr::Ne(a, b) => Value::Bool(a.eval(scope) != b.eval(scope)),
            Expr::And(a, b) => {
                if truthy(&a.eval(scope)) {
                    b.eval(scope)
                } else {
                    Value::Bool(false)
                }
            }
            Expr::Or(a, b) => {
                let left = a.eval(scope);
                if truthy(&left) {
                    left
                } else {
                    b.eval(scope)
                }
            }
        }
    }

    /// Evaluate as a selector predicate.
    pub fn eval_bool(&self, scope: &dyn EvalScope) -> bool {
        truthy(&self.eval(scope))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Compile an expression to its AST.
pub fn compile(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
    }
}

/// Shared compile cache keyed by expression text.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    compiled: RwLock<HashMap<String, Arc<Expr>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, text: &str) -> Result<Arc<Expr>, ExprError> {
        if let Some(expr) = self
            .compiled
            .read()
            .ok()
            .and_then(|cache| cache.get(text).cloned())
        {
            return Ok(expr);
        }
        let expr = Arc::new(compile(text)?);
        if let Ok(mut cache) = self.compiled.write() {
            cache.insert(text.to_string(), Arc::clone(&expr));
        }
        Ok(expr)
    }

    /// Evaluate a selector against a scope. Compile and evaluation
    /// problems both come back as `Err` so callers can apply the
    /// errors-are-false policy in one place.
    pub fn eval_selector(&self, text: &str, scope: &dyn EvalScope) -> Result<bool, ExprError> {
        Ok(self.compile(text)?.eval_bool(scope))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(f64),
    Ident(Vec<String>),
    True,
    False,
    Null,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Not,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err(ExprError::UnterminatedString),
                        },
                        Some(c) => value.push(c),
                        None => return Err(ExprError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::EqEq);
                } else {
                    return Err(ExprError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(ExprError::UnexpectedChar('&'));
                }
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_some() {
                    tokens.push(Token::OrOr);
                } else {
                    return Err(ExprError::UnexpectedChar('|'));
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed = number
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(number.clone()))?;
                tokens.push(Token::Num(parsed));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '@' => {
                let mut segments = vec![String::new()];
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '@' {
                        if let Some(last) = segments.last_mut() {
                            last.push(d);
                        }
                        chars.next();
                    } else if d == '.' {
                        segments.push(String::new());
                        chars.next();
                    } else {
                        break;
                    }
                }
                match segments.as_slice() {
                    [one] if one == "true" => tokens.push(Token::True),
                    [one] if one == "false" => tokens.push(Token::False),
                    [one] if one == "null" => tokens.push(Token::Null),
                    _ => tokens.push(Token::Ident(segments)),
                }
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
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
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_unary()?;
        match self.peek() {
            Some(Token::EqEq) => {
                self.next();
                let right = self.parse_unary()?;
                Ok(Expr::Eq(Box::new(left), Box::new(right)))
            }
            Some(Token::NotEq) => {
                self.next();
                let right = self.parse_unary()?;
                Ok(Expr::Ne(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Num(n)) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            )),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Ident(path)) => Ok(Expr::Ident(path)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken(format!("{:?}", other))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(format!("{:?}", other))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}
