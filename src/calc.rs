//! Calculated fields: `name = expression` statements evaluated per record.
//!
//! A calculations string holds `;`-separated statements. Expressions combine
//! numbers, double-quoted strings and field references (`Year` or
//! `col["Release Year"]`) with `+ - * /` and parentheses. `*` and `/` bind
//! tighter than `+` and `-`; all four are left-associative.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::{Number, Value};

use crate::schema::{FieldType, Record, Schema};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Op(char),
    Assign,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' | '=' | '(' | ')' | '[' | ']' | '+' | '-' | '*' | '/' => {
                tokens.push(match c {
                    ';' => Token::Semicolon,
                    '=' => Token::Assign,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    op => Token::Op(op),
                });
                chars.next();
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some('"') => text.push('"'),
                            Some('\\') => text.push('\\'),
                            Some(other) => {
                                text.push('\\');
                                text.push(other);
                            }
                            None => return Err("Unterminated escape sequence in string".to_string()),
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => text.push(c),
                    }
                }
                if !closed {
                    return Err("Unterminated string literal".to_string());
                }
                tokens.push(Token::String(text));
            }
            '0'..='9' | '.' => {
                let mut digits = String::new();
                while let Some(nc) = chars.next_if(|nc| nc.is_ascii_digit() || *nc == '.') {
                    digits.push(nc);
                }
                match digits.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => return Err(format!("Invalid number: {}", digits)),
                }
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(nc) = chars.next_if(|nc| nc.is_alphanumeric() || *nc == '_') {
                    name.push(nc);
                }
                tokens.push(Token::Identifier(name));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Field(String),
    Negate(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("Expected {:?}, found {:?}", expected, token)),
            None => Err(format!("Expected {:?} at end of expression", expected)),
        }
    }

    fn parse(mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let expr = self.parse_sum()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("Unexpected token: {:?}", token)),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_product()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let right = self.parse_product()?;
            let op = BinaryOp::from_char(*c).ok_or_else(|| format!("Unknown operator: {}", c))?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while let Some(Token::Op(c @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let right = self.parse_unary()?;
            let op = BinaryOp::from_char(*c).ok_or_else(|| format!("Unknown operator: {}", c))?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::String(s)) => Ok(Expr::Text(s.clone())),
            Some(Token::Identifier(name)) if name == "col" && self.peek() == Some(&Token::LBracket) => {
                self.pos += 1;
                let field = match self.advance() {
                    Some(Token::String(s)) | Some(Token::Identifier(s)) => s.clone(),
                    _ => return Err("col[] must contain a string or identifier".to_string()),
                };
                self.expect(&Token::RBracket)?;
                Ok(Expr::Field(field))
            }
            Some(Token::Identifier(name)) => Ok(Expr::Field(name.clone())),
            Some(Token::LParen) => {
                let inner = self.parse_sum()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(format!("Unexpected token in term: {:?}", token)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| *t == Token::Semicolon)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a single expression.
pub fn parse_expression(input: &str) -> Result<Expr> {
    let tokens = tokenize(input).map_err(|e| eyre!("Invalid expression '{}': {}", input, e))?;
    Parser::new(&tokens)
        .parse()
        .map_err(|e| eyre!("Invalid expression '{}': {}", input, e))
}

/// A named expression added to every record.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedField {
    pub name: String,
    pub expression: Expr,
}

impl CalculatedField {
    /// Evaluate against `record`.
    pub fn evaluate(&self, record: &Record) -> Value {
        eval(&self.expression, record)
    }

    /// Schema type of the computed column: `string` when the expression can
    /// only produce text, `int` otherwise.
    pub fn field_type(&self, schema: &Schema) -> FieldType {
        if is_textual(&self.expression, schema) {
            FieldType::String
        } else {
            FieldType::Int
        }
    }
}

/// Parse a calculations string into its fields, in statement order. Blank
/// statements are skipped, so a trailing `;` is allowed.
pub fn parse_calculations(input: &str) -> Result<Vec<CalculatedField>> {
    let tokens = tokenize(input).map_err(|e| eyre!("Invalid calculations '{}': {}", input, e))?;
    split_statements(&tokens)
        .into_iter()
        .map(|statement| {
            let (name, rest) = match statement {
                [Token::Identifier(name), Token::Assign, rest @ ..]
                | [Token::String(name), Token::Assign, rest @ ..] => (name.clone(), rest),
                _ => {
                    return Err(eyre!(
                        "Invalid calculation in '{}': expected NAME = EXPRESSION",
                        input
                    ))
                }
            };
            let expression = Parser::new(rest)
                .parse()
                .map_err(|e| eyre!("Invalid calculation '{}': {}", name, e))?;
            Ok(CalculatedField { name, expression })
        })
        .collect()
}

fn is_textual(expr: &Expr, schema: &Schema) -> bool {
    match expr {
        Expr::Text(_) => true,
        Expr::Field(name) => schema.get(name) == Some(FieldType::String),
        Expr::Binary(left, BinaryOp::Add, right) => {
            is_textual(left, schema) && is_textual(right, schema)
        }
        Expr::Number(_) | Expr::Negate(_) | Expr::Binary(..) => false,
    }
}

/// JSON number for a computed result. Integral results become integers;
/// non-finite results become null.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn eval(expr: &Expr, record: &Record) -> Value {
    match expr {
        Expr::Number(n) => number_value(*n),
        Expr::Text(s) => Value::String(s.clone()),
        Expr::Field(name) => record.get(name).cloned().unwrap_or(Value::Null),
        Expr::Negate(inner) => match eval(inner, record).as_f64() {
            Some(n) => number_value(-n),
            None => Value::Null,
        },
        Expr::Binary(left, op, right) => {
            let left = eval(left, record);
            let right = eval(right, record);
            if let (BinaryOp::Add, Value::String(a), Value::String(b)) = (op, &left, &right) {
                return Value::String(format!("{}{}", a, b));
            }
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Value::Null;
            };
            match op {
                BinaryOp::Add => number_value(a + b),
                BinaryOp::Sub => number_value(a - b),
                BinaryOp::Mul => number_value(a * b),
                BinaryOp::Div if b == 0.0 => Value::Null,
                BinaryOp::Div => number_value(a / b),
            }
        }
    }
}

/// Copy of `record` with every calculated field added. Later fields see the
/// values of earlier ones.
pub fn apply(fields: &[CalculatedField], record: &Record) -> Record {
    let mut out = record.clone();
    for field in fields {
        let value = field.evaluate(&out);
        out.insert(field.name.clone(), value);
    }
    out
}

pub fn apply_all(fields: &[CalculatedField], records: &[Record]) -> Vec<Record> {
    if fields.is_empty() {
        return records.to_vec();
    }
    records.iter().map(|r| apply(fields, r)).collect()
}

/// `schema` with the calculated fields appended (or retyped when a name is
/// already declared).
pub fn augment_schema(fields: &[CalculatedField], schema: &Schema) -> Schema {
    let mut augmented = schema.clone();
    for field in fields {
        let field_type = field.field_type(&augmented);
        augmented.insert(field.name.clone(), field_type);
    }
    augmented
}
