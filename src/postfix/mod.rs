use crate::value::Value;
use std::fmt;

mod converter;
mod executor;
mod stack;
mod tokenizer;

pub use converter::Converter;
pub use executor::{Executor, Frame};
pub use stack::{StackItem, ValueStack};
pub use tokenizer::{Token, Tokenizer};

/// Default cap on user call depth and index selector nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    NotEqual,
    Match,

    // Logical
    And,
    Or,

    // Prefix
    Negate,
    Not,
}

impl Operator {
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or | Operator::And => 1,
            Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThanOrEqual
            | Operator::Equal
            | Operator::NotEqual
            | Operator::Match => 2,
            Operator::Add | Operator::Subtract => 3,
            Operator::Multiply | Operator::Divide | Operator::Modulo | Operator::Negate => 4,
            Operator::Power | Operator::Not => 5,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, Operator::Power)
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, Operator::Negate | Operator::Not)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Match => "=~",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Negate => "_",
            Operator::Not => "!",
        }
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "%" => Ok(Operator::Modulo),
            "^" => Ok(Operator::Power),
            ">" => Ok(Operator::GreaterThan),
            "<" => Ok(Operator::LessThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "<=" => Ok(Operator::LessThanOrEqual),
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "=~" => Ok(Operator::Match),
            "&&" => Ok(Operator::And),
            "||" => Ok(Operator::Or),
            "!" => Ok(Operator::Not),
            _ => Err(format!("Unknown operator: {}", value)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal and identifier operands as they appear in a postfix sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    /// Already unescaped string literal.
    Str(String),
    Identifier(String),
    /// Raw JSON text (`[...]`, `{...}`, `null`, `true`, `false`), decoded on evaluation.
    Json(String),
    /// Delimited pattern text, e.g. `/^a+$/i`.
    Regex(String),
    /// An identifier frozen to its value when a function was defined.
    Value(Value),
}

/// One element of a converted (postfix) formula.
#[derive(Debug, Clone, PartialEq)]
pub enum PostfixToken {
    Operand(Operand),
    Operator(Operator),
    /// Bracket contents of an array access, converted on their own.
    Selector(Vec<PostfixToken>),
    /// Pops a selector and its target.
    Index,
    Call { name: String, args: usize },
}

impl fmt::Display for PostfixToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixToken::Operand(Operand::Number(n)) => write!(f, "{}", n),
            PostfixToken::Operand(Operand::Str(s)) => write!(f, "{:?}", s),
            PostfixToken::Operand(Operand::Identifier(name)) => f.write_str(name),
            PostfixToken::Operand(Operand::Json(text) | Operand::Regex(text)) => f.write_str(text),
            PostfixToken::Operand(Operand::Value(value)) => write!(f, "<{}>", value),
            PostfixToken::Operator(op) => write!(f, "{}", op),
            PostfixToken::Selector(tokens) => {
                f.write_str("[")?;
                for (i, token) in tokens.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", token)?;
                }
                f.write_str("]")
            }
            PostfixToken::Index => f.write_str("@["),
            PostfixToken::Call { name, args } => write!(f, "{}/{}", name, args),
        }
    }
}

/// Renders a postfix sequence on one line, mostly for logging.
pub fn render(tokens: &[PostfixToken]) -> String {
    tokens
        .iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
