use crate::error::EvalError;
use crate::functions::{math, IntoNativeFunction};
use crate::postfix::{Converter, Executor, Frame, Operand, PostfixToken, DEFAULT_MAX_DEPTH};
use crate::registry::{self, Registry, UserFunction};
use crate::value::Value;
use log::{debug, warn};
use lru::LruCache;
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;
use regex::Regex;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

#[derive(Parser)]
#[grammar = "statement.pest"]
struct StatementParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Deepest allowed nesting of user function calls and index selectors.
    pub max_recursion_depth: usize,
    /// Compiled regular expressions kept per evaluator.
    pub regex_cache_size: NonZeroUsize,
    /// When set, failures are only reported through [`Evaluator::last_error`].
    pub suppress_errors: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_DEPTH,
            regex_cache_size: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
            suppress_errors: false,
        }
    }
}

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Value(Value),
    Assigned { name: String, value: Value },
    Defined { signature: String },
}

impl Evaluation {
    /// The value `evaluate` reports: a definition yields `true`.
    pub fn into_value(self) -> Value {
        match self {
            Evaluation::Value(value) | Evaluation::Assigned { value, .. } => value,
            Evaluation::Defined { .. } => Value::Bool(true),
        }
    }
}

/// Evaluates formulas against its own variables and functions.
///
/// A statement is one of
/// - `name = expr`: evaluates `expr` and stores it,
/// - `name(a, b) = expr`: defines a function, freezing every other variable
///   in `expr` to its current value,
/// - anything else: a plain expression.
///
/// ```
/// use formula_rs::{Evaluator, Value};
///
/// let mut evaluator = Evaluator::new();
/// evaluator.evaluate("f(x, y) = x^2 + y").unwrap();
/// assert_eq!(evaluator.evaluate("f(2, 3)"), Ok(Value::Number(7.0)));
/// ```
pub struct Evaluator {
    registry: Registry,
    regex_cache: LruCache<String, Regex>,
    config: EvaluatorConfig,
    last_error: Option<String>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self {
            registry: Registry::new(),
            regex_cache: LruCache::new(config.regex_cache_size),
            config,
            last_error: None,
        }
    }

    pub fn evaluate(&mut self, expression: &str) -> Result<Value, EvalError> {
        self.evaluate_statement(expression)
            .map(Evaluation::into_value)
    }

    /// Short for [`Evaluator::evaluate`].
    pub fn e(&mut self, expression: &str) -> Result<Value, EvalError> {
        self.evaluate(expression)
    }

    pub fn evaluate_statement(&mut self, expression: &str) -> Result<Evaluation, EvalError> {
        self.last_error = None;
        let result = self.run_statement(expression);
        if let Err(error) = &result {
            let message = error.to_string();
            if !self.config.suppress_errors {
                warn!("{message}");
            }
            self.last_error = Some(message);
        }
        result
    }

    fn run_statement(&mut self, expression: &str) -> Result<Evaluation, EvalError> {
        let statement = preprocess(expression);
        if statement.is_empty() {
            return Err(EvalError::syntax("empty expression"));
        }

        let pair = StatementParser::parse(Rule::statement, &statement)
            .map_err(|e| EvalError::syntax(e.to_string()))?
            .next()
            .ok_or_else(|| EvalError::internal("statement not classified"))?;

        match pair.as_rule() {
            Rule::assignment => {
                let mut inner = pair.into_inner();
                let name = next_text(&mut inner)?;
                let body = next_text(&mut inner)?;
                self.assign(name, body)
            }
            Rule::function_definition => {
                let mut inner = pair.into_inner();
                let name = next_text(&mut inner)?;
                let parameters = inner
                    .next()
                    .ok_or_else(|| EvalError::internal("missing parameter list"))?
                    .into_inner()
                    .map(|parameter| parameter.as_str().to_string())
                    .collect();
                let body = next_text(&mut inner)?;
                self.define(name, parameters, body)
            }
            Rule::expression => {
                let tokens = self.convert(pair.as_str())?;
                self.execute(&tokens).map(Evaluation::Value)
            }
            rule => Err(EvalError::internal(format!("unexpected statement {:?}", rule))),
        }
    }

    fn assign(&mut self, name: &str, body: &str) -> Result<Evaluation, EvalError> {
        if Registry::is_constant(name) {
            return Err(EvalError::ConstantReassignment(name.to_string()));
        }
        let tokens = self.convert(body)?;
        let value = self.execute(&tokens)?;
        self.registry.set_variable(name, value.clone())?;
        debug!("Assigned {name} = {value}");
        Ok(Evaluation::Assigned {
            name: name.to_string(),
            value,
        })
    }

    fn define(
        &mut self,
        name: &str,
        parameters: Vec<String>,
        body: &str,
    ) -> Result<Evaluation, EvalError> {
        if math::is_builtin(name) {
            return Err(EvalError::BuiltinRedefinition(name.to_string()));
        }
        for (i, parameter) in parameters.iter().enumerate() {
            if parameters[..i].contains(parameter) {
                return Err(EvalError::syntax(format!(
                    "duplicate parameter '{}' in {}()",
                    parameter, name
                )));
            }
        }

        let tokens = self.convert(body)?;
        let frozen = self.freeze(tokens, &parameters)?;
        let signature = registry::signature(name, &parameters);
        self.registry
            .define_function(name, UserFunction::new(parameters, frozen))?;
        Ok(Evaluation::Defined { signature })
    }

    /// Replaces every identifier that is not a parameter with its current value.
    fn freeze(
        &self,
        tokens: Vec<PostfixToken>,
        parameters: &[String],
    ) -> Result<Vec<PostfixToken>, EvalError> {
        tokens
            .into_iter()
            .map(|token| match token {
                PostfixToken::Operand(Operand::Identifier(name)) if !parameters.contains(&name) => {
                    let value = self
                        .registry
                        .variable(&name)
                        .cloned()
                        .ok_or(EvalError::UndefinedVariable(name))?;
                    Ok(PostfixToken::Operand(Operand::Value(value)))
                }
                PostfixToken::Selector(selector) => {
                    Ok(PostfixToken::Selector(self.freeze(selector, parameters)?))
                }
                other => Ok(other),
            })
            .collect()
    }

    /// Converts an expression to postfix without evaluating it.
    pub fn convert(&self, expression: &str) -> Result<Vec<PostfixToken>, EvalError> {
        Converter::new(&self.registry)
            .with_max_depth(self.config.max_recursion_depth)
            .convert(&preprocess(expression))
    }

    /// Evaluates the output of [`Evaluator::convert`].
    pub fn execute(&mut self, tokens: &[PostfixToken]) -> Result<Value, EvalError> {
        Executor::new(
            &mut self.registry,
            &mut self.regex_cache,
            self.config.max_recursion_depth,
        )
        .execute(tokens, &Frame::new(), 0)
    }

    /// Registers a host function. Its arity is the number of parameters it
    /// takes; built-in names are rejected.
    pub fn register_native_function<Args>(
        &mut self,
        name: &str,
        function: impl IntoNativeFunction<Args>,
    ) -> Result<(), EvalError> {
        self.registry
            .register_native(name, function.into_native_function())
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) -> Result<(), EvalError> {
        self.registry.set_variable(name, value.into())
    }

    /// User variables, without the constants and capture groups.
    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.registry.variables()
    }

    /// User functions as `name(a,b)`.
    pub fn functions(&self) -> Vec<String> {
        self.registry.function_signatures()
    }

    /// Message of the error raised by the last statement, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_suppress_errors(&mut self, suppress: bool) {
        self.config.suppress_errors = suppress;
    }

    pub fn suppress_errors(&self) -> bool {
        self.config.suppress_errors
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops line breaks, surrounding whitespace and one trailing `;`.
fn preprocess(expression: &str) -> String {
    let joined: String = expression
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    let trimmed = joined.trim();
    trimmed
        .strip_suffix(';')
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

fn next_text<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<&'i str, EvalError> {
    pairs
        .next()
        .map(|pair| pair.as_str())
        .ok_or_else(|| EvalError::internal("incomplete statement"))
}
