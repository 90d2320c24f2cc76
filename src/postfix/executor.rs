use super::{Operand, Operator, PostfixToken, ValueStack};
use crate::error::EvalError;
use crate::functions::math;
use crate::registry::{Callee, Registry};
use crate::value::Value;
use log::debug;
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Local argument frame of a user function call.
pub type Frame = HashMap<String, Value>;

/// Evaluates postfix sequences against a registry.
///
/// Regex matches write their capture groups back into the registry, so the
/// executor borrows it mutably.
pub struct Executor<'a> {
    registry: &'a mut Registry,
    regex_cache: &'a mut LruCache<String, Regex>,
    max_depth: usize,
}

impl<'a> Executor<'a> {
    pub fn new(
        registry: &'a mut Registry,
        regex_cache: &'a mut LruCache<String, Regex>,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            regex_cache,
            max_depth,
        }
    }

    /// Runs `tokens` to a single value. `depth` counts the user function
    /// calls and index selectors already in progress.
    pub fn execute(
        &mut self,
        tokens: &[PostfixToken],
        frame: &Frame,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let mut stack = ValueStack::new();

        for token in tokens {
            let value = match token {
                PostfixToken::Operand(operand) => self.load(operand, frame)?,
                PostfixToken::Operator(op @ (Operator::Negate | Operator::Not)) => {
                    let value = pop(&mut stack)?;
                    match op {
                        Operator::Negate => (value * Value::Number(-1.0))?,
                        _ => Value::Bool(!value.is_truthy()),
                    }
                }
                PostfixToken::Operator(op) => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    self.apply(*op, left, right)?
                }
                PostfixToken::Selector(selector) => {
                    if depth >= self.max_depth {
                        return Err(EvalError::RecursionLimitExceeded(self.max_depth));
                    }
                    self.execute(selector, frame, depth + 1)?
                }
                PostfixToken::Index => {
                    let selector = pop(&mut stack)?;
                    let target = pop(&mut stack)?;
                    target.index(&selector)?
                }
                PostfixToken::Call { name, args } => self.call(name, *args, &mut stack, depth)?,
            };
            stack.push(value);
        }

        let result = pop(&mut stack)?;
        if !stack.is_empty() {
            return Err(EvalError::internal(format!(
                "{} values left on the stack",
                stack.len() + 1
            )));
        }
        Ok(result)
    }

    fn load(&self, operand: &Operand, frame: &Frame) -> Result<Value, EvalError> {
        match operand {
            Operand::Number(n) => Ok(Value::Number(*n)),
            Operand::Str(s) => Ok(Value::String(s.clone())),
            Operand::Regex(text) => Ok(Value::String(text.clone())),
            Operand::Value(value) => Ok(value.clone()),
            Operand::Json(text) => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|_| EvalError::InvalidJsonLiteral(text.clone())),
            Operand::Identifier(name) => {
                debug!("LoadVariable: {name}");
                frame
                    .get(name)
                    .or_else(|| self.registry.variable(name))
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))
            }
        }
    }

    fn apply(&mut self, op: Operator, left: Value, right: Value) -> Result<Value, EvalError> {
        match op {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
            Operator::Modulo => left % right,
            Operator::Power => left.power(right),
            Operator::GreaterThan => ordered(&left, &right, op, Ordering::is_gt),
            Operator::LessThan => ordered(&left, &right, op, Ordering::is_lt),
            Operator::GreaterThanOrEqual => ordered(&left, &right, op, Ordering::is_ge),
            Operator::LessThanOrEqual => ordered(&left, &right, op, Ordering::is_le),
            Operator::Equal => Ok(Value::Bool(left.loose_eq(&right))),
            Operator::NotEqual => Ok(Value::Bool(!left.loose_eq(&right))),
            // both sides are already evaluated; these only pick one
            Operator::And => Ok(if left.is_truthy() { right } else { left }),
            Operator::Or => Ok(if left.is_truthy() { left } else { right }),
            Operator::Match => self.match_regex(&left, &right),
            Operator::Negate | Operator::Not => Err(EvalError::internal(format!(
                "prefix operator '{}' used as binary",
                op
            ))),
        }
    }

    /// `subject =~ pattern`. Pushes 1 or 0 and rebinds `$0..$N`.
    fn match_regex(&mut self, subject: &Value, pattern: &Value) -> Result<Value, EvalError> {
        if let Value::Array(_) | Value::Object(_) = pattern {
            return Err(EvalError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: format!("expected a pattern string, got {}", pattern.type_name()),
            });
        }
        let regex = self.compile(&pattern.to_string())?;
        let subject = subject.to_string();

        match regex.captures(&subject) {
            Some(captures) => {
                let groups = captures
                    .iter()
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                self.registry.set_captures(groups);
                Ok(Value::Number(1.0))
            }
            None => {
                self.registry.clear_captures();
                Ok(Value::Number(0.0))
            }
        }
    }

    fn compile(&mut self, pattern: &str) -> Result<Regex, EvalError> {
        if let Some(regex) = self.regex_cache.get(pattern) {
            return Ok(regex.clone());
        }

        let invalid = |reason: String| EvalError::InvalidRegex {
            pattern: pattern.to_string(),
            reason,
        };
        let (body, flags) = split_delimited(pattern).map_err(invalid)?;

        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                'u' => {
                    builder.unicode(true);
                }
                'U' => {
                    builder.swap_greed(true);
                }
                'X' | 'J' => {}
                other => return Err(invalid(format!("unknown modifier '{}'", other))),
            }
        }
        let regex = builder.build().map_err(|e| invalid(e.to_string()))?;

        debug!("Compiled regex {pattern}");
        self.regex_cache.put(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn call(
        &mut self,
        name: &str,
        count: usize,
        stack: &mut ValueStack<Value>,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let callee = self
            .registry
            .resolve_function(name)
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))?;
        let expected = match &callee {
            Callee::Builtin => 1,
            Callee::User(function) => function.arity(),
            Callee::Native(native) => native.arity(),
        };
        if count != expected {
            return Err(EvalError::Arity {
                name: name.to_string(),
                given: count,
                expected,
            });
        }

        let mut arguments = Vec::with_capacity(count);
        for _ in 0..count {
            arguments.push(pop(stack)?);
        }
        arguments.reverse();
        debug!("Call: {name}({arguments:?})");

        match callee {
            Callee::Builtin => {
                let x = arguments[0].to_number(name)?;
                math::apply(name, x)
                    .map(Value::Number)
                    .ok_or_else(|| EvalError::internal(format!("'{}' is not a built-in", name)))
            }
            Callee::User(function) => {
                if depth >= self.max_depth {
                    return Err(EvalError::RecursionLimitExceeded(self.max_depth));
                }
                let frame: Frame = function
                    .parameters()
                    .iter()
                    .cloned()
                    .zip(arguments)
                    .collect();
                self.execute(function.body(), &frame, depth + 1)
            }
            Callee::Native(native) => {
                native
                    .call(&arguments)
                    .map_err(|message| EvalError::NativeFunction {
                        name: name.to_string(),
                        message,
                    })
            }
        }
    }
}

fn ordered(
    left: &Value,
    right: &Value,
    op: Operator,
    expected: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    let ordering = left.compare(right, op.symbol())?;
    Ok(Value::Bool(ordering.is_some_and(expected)))
}

fn pop(stack: &mut ValueStack<Value>) -> Result<Value, EvalError> {
    stack
        .pop()
        .ok_or_else(|| EvalError::internal("missing operand"))
}

/// Splits `/body/flags` (any non-alphanumeric delimiter; bracket pairs
/// close with their counterpart) into body and flags.
fn split_delimited(pattern: &str) -> Result<(&str, &str), String> {
    let delimiter = pattern
        .chars()
        .next()
        .ok_or_else(|| "empty pattern".to_string())?;
    if delimiter.is_alphanumeric() || delimiter == '\\' || delimiter.is_whitespace() {
        return Err("delimiter must not be alphanumeric, backslash or whitespace".to_string());
    }
    let closing = match delimiter {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    };

    let rest = &pattern[delimiter.len_utf8()..];
    let end = rest
        .rfind(closing)
        .ok_or_else(|| format!("no ending delimiter '{}' found", closing))?;
    Ok((&rest[..end], &rest[end + closing.len_utf8()..]))
}
