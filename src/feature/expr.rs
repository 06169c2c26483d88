//! 特性条件表达式
//! 受限布尔文法：特性名、&&、||、括号。不定义 && 与 || 之间的优先级，
//! 混用时必须显式加括号，否则视为语法错误。

use std::fmt;

use thiserror::Error;

use super::catalog::{FeatureCatalog, FeatureName, FeatureSet};

/// 表达式解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("表达式语法错误：'{token}' {reason}")]
    Grammar { token: String, reason: String },
    #[error("未知特性名称 '{0}'")]
    UnknownFeature(String),
}

impl ExprError {
    fn grammar(token: impl Into<String>, reason: impl Into<String>) -> Self {
        ExprError::Grammar {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// 特性表达式树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureExpr {
    Leaf(FeatureName),
    And(Box<FeatureExpr>, Box<FeatureExpr>),
    Or(Box<FeatureExpr>, Box<FeatureExpr>),
}

impl FeatureExpr {
    /// 解析条件字符串（续行已由调用方拼接）
    pub fn parse(text: &str, catalog: &FeatureCatalog) -> Result<Self, ExprError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ExprError::grammar("", "空表达式"));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            catalog,
        };
        let expr = parser.parse_chain()?;
        if let Some(extra) = parser.tokens.get(parser.pos) {
            return Err(ExprError::grammar(extra.to_string(), "多余的记号"));
        }
        Ok(expr)
    }

    /// 针对启用集合求值（纯函数，无副作用）
    pub fn evaluate(&self, enabled: &FeatureSet) -> bool {
        match self {
            FeatureExpr::Leaf(name) => enabled.contains(name.as_str()),
            FeatureExpr::And(a, b) => a.evaluate(enabled) && b.evaluate(enabled),
            FeatureExpr::Or(a, b) => a.evaluate(enabled) || b.evaluate(enabled),
        }
    }
}

/// 规范化输出：`(A && B)` / `(A || B)`，递归加括号
impl fmt::Display for FeatureExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureExpr::Leaf(name) => write!(f, "{}", name),
            FeatureExpr::And(a, b) => write!(f, "({} && {})", a, b),
            FeatureExpr::Or(a, b) => write!(f, "({} || {})", a, b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    LParen,
    RParen,
    AndAnd,
    OrOr,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
        }
    }
}

/// 按空白、括号、&&、|| 切分（逐字符推进，非 ASCII 字符落入普通记号）
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while let Some(c) = rest.chars().next() {
        let (token, len) = if c == '(' {
            (Token::LParen, 1)
        } else if c == ')' {
            (Token::RParen, 1)
        } else if rest.starts_with("&&") {
            (Token::AndAnd, 2)
        } else if rest.starts_with("||") {
            (Token::OrOr, 2)
        } else {
            let end = rest
                .char_indices()
                .find(|&(i, ch)| ch.is_whitespace() || ch == '(' || ch == ')' || is_operator_at(rest, i))
                .map_or(rest.len(), |(i, _)| i);
            (Token::Word(&rest[..end]), end)
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }

    tokens
}

fn is_operator_at(text: &str, i: usize) -> bool {
    let tail = &text[i..];
    tail.starts_with("&&") || tail.starts_with("||")
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    And,
    Or,
}

impl BinaryOp {
    fn combine(self, lhs: FeatureExpr, rhs: FeatureExpr) -> FeatureExpr {
        match self {
            BinaryOp::And => FeatureExpr::And(Box::new(lhs), Box::new(rhs)),
            BinaryOp::Or => FeatureExpr::Or(Box::new(lhs), Box::new(rhs)),
        }
    }
}

struct Parser<'a, 'c> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    catalog: &'c FeatureCatalog,
}

impl Parser<'_, '_> {
    /// chain := operand (op operand)*，同一链中只允许一种运算符，左结合
    fn parse_chain(&mut self) -> Result<FeatureExpr, ExprError> {
        let mut lhs = self.parse_operand()?;
        let mut chain_op: Option<BinaryOp> = None;

        while let Some(&token) = self.tokens.get(self.pos) {
            let op = match token {
                Token::AndAnd => BinaryOp::And,
                Token::OrOr => BinaryOp::Or,
                _ => break,
            };
            if chain_op.is_some_and(|prev| prev != op) {
                return Err(ExprError::grammar(
                    token.to_string(),
                    "&& 与 || 混用时必须加括号",
                ));
            }
            chain_op = Some(op);
            self.pos += 1;

            let rhs = self.parse_operand()?;
            lhs = op.combine(lhs, rhs);
        }

        Ok(lhs)
    }

    /// operand := FEATURE | '(' chain ')'
    fn parse_operand(&mut self) -> Result<FeatureExpr, ExprError> {
        let Some(&token) = self.tokens.get(self.pos) else {
            return Err(ExprError::grammar("", "表达式意外结束"));
        };
        self.pos += 1;

        match token {
            Token::Word(word) => {
                if !is_identifier(word) {
                    return Err(ExprError::grammar(word, "不是合法的特性名"));
                }
                self.catalog
                    .lookup(word)
                    .map(|name| FeatureExpr::Leaf(name.clone()))
                    .ok_or_else(|| ExprError::UnknownFeature(word.to_string()))
            }
            Token::LParen => {
                let inner = self.parse_chain()?;
                match self.tokens.get(self.pos) {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(other) => Err(ExprError::grammar(other.to_string(), "此处应为 ')'")),
                    None => Err(ExprError::grammar("(", "括号未闭合")),
                }
            }
            other => Err(ExprError::grammar(other.to_string(), "此处应为特性名或 '('")),
        }
    }
}
