use super::{render, Operand, DEFAULT_MAX_DEPTH, Operator, PostfixToken, StackItem, Token, Tokenizer, ValueStack};
use crate::error::EvalError;
use crate::registry::Registry;
use log::debug;

/// Infix to postfix conversion (shunting-yard).
///
/// Function arities are checked against the registry while converting, so a
/// call with the wrong number of arguments never reaches the executor.
pub struct Converter<'a> {
    registry: &'a Registry,
    max_depth: usize,
}

impl<'a> Converter<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limits how deeply array-index selectors may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn convert(&self, source: &str) -> Result<Vec<PostfixToken>, EvalError> {
        let tokens = Tokenizer::new(source).tokenize()?;
        let output = self.convert_tokens(tokens, 0)?;
        debug!("Converted '{}' to: {}", source, render(&output));
        Ok(output)
    }

    fn convert_tokens(
        &self,
        tokens: Vec<Token>,
        depth: usize,
    ) -> Result<Vec<PostfixToken>, EvalError> {
        if tokens.is_empty() {
            return Err(EvalError::syntax("empty expression"));
        }

        let mut output = Vec::new();
        let mut stack: ValueStack<StackItem> = ValueStack::new();
        let mut expecting_operand = true;
        // set after `name(` and after a comma: the next token starts an argument
        let mut begin_argument = false;
        let mut call_opened = false;

        for token in tokens {
            if begin_argument && token != Token::RightParen && !stack.increment_argument() {
                return Err(EvalError::internal("argument outside of a call"));
            }
            let after_call_open = call_opened;
            begin_argument = false;
            call_opened = false;

            match token {
                Token::Number(_) | Token::Identifier(_) if !expecting_operand => {
                    push_operator(Operator::Multiply, &mut stack, &mut output);
                    output.push(PostfixToken::Operand(operand(token)?));
                }
                Token::Number(_)
                | Token::Str(_)
                | Token::Json(_)
                | Token::Regex(_)
                | Token::Identifier(_) => {
                    if !expecting_operand {
                        return Err(EvalError::syntax(format!(
                            "unexpected {} after an operand",
                            describe(&token)
                        )));
                    }
                    output.push(PostfixToken::Operand(operand(token)?));
                    expecting_operand = false;
                }

                Token::Call(name) => {
                    if !expecting_operand {
                        push_operator(Operator::Multiply, &mut stack, &mut output);
                    }
                    if self.registry.resolve_function(&name).is_some() {
                        stack.push(StackItem::Call(name));
                        stack.push(StackItem::ArgCount(0));
                        stack.push(StackItem::LeftParen);
                        begin_argument = true;
                        call_opened = true;
                    } else {
                        // `a(...)` with no such function is `a * (...)`
                        output.push(PostfixToken::Operand(Operand::Identifier(name)));
                        push_operator(Operator::Multiply, &mut stack, &mut output);
                        stack.push(StackItem::LeftParen);
                    }
                    expecting_operand = true;
                }

                Token::LeftParen => {
                    if !expecting_operand {
                        push_operator(Operator::Multiply, &mut stack, &mut output);
                    }
                    stack.push(StackItem::LeftParen);
                    expecting_operand = true;
                }

                Token::RightParen => {
                    if expecting_operand && !after_call_open {
                        return Err(EvalError::syntax("unexpected ')'"));
                    }
                    self.close_parenthesis(&mut stack, &mut output)?;
                    expecting_operand = false;
                }

                Token::Comma => {
                    if expecting_operand {
                        return Err(EvalError::syntax("unexpected ','"));
                    }
                    if !pop_to_parenthesis(&mut stack, &mut output)
                        || !matches!(stack.peek(1), Some(StackItem::ArgCount(_)))
                    {
                        return Err(EvalError::syntax("unexpected ','"));
                    }
                    stack.push(StackItem::LeftParen);
                    begin_argument = true;
                    expecting_operand = true;
                }

                Token::Operator(Operator::Subtract) if expecting_operand => {
                    stack.push(StackItem::Operator(Operator::Negate));
                }
                Token::Operator(Operator::Not) => {
                    if !expecting_operand {
                        return Err(EvalError::syntax("unexpected operator '!'"));
                    }
                    stack.push(StackItem::Operator(Operator::Not));
                }
                Token::Operator(op) => {
                    if expecting_operand {
                        return Err(EvalError::syntax(format!("unexpected operator '{}'", op)));
                    }
                    push_operator(op, &mut stack, &mut output);
                    expecting_operand = true;
                }

                Token::Index(raw) => {
                    if expecting_operand {
                        return Err(EvalError::syntax("unexpected '['"));
                    }
                    if raw.trim().is_empty() {
                        return Err(EvalError::syntax("invalid array access"));
                    }
                    if depth >= self.max_depth {
                        return Err(EvalError::RecursionLimitExceeded(self.max_depth));
                    }
                    let selector =
                        self.convert_tokens(Tokenizer::new(&raw).tokenize()?, depth + 1)?;
                    output.push(PostfixToken::Selector(selector));
                    output.push(PostfixToken::Index);
                }
            }
        }

        if expecting_operand {
            return Err(EvalError::syntax("unexpected end of expression"));
        }

        while let Some(item) = stack.pop() {
            match item {
                StackItem::Operator(op) => output.push(PostfixToken::Operator(op)),
                _ => return Err(EvalError::syntax("missing closing parenthesis")),
            }
        }

        Ok(output)
    }

    /// Pops back to the matching `(` and, if it opened a call, emits the call
    /// after checking its argument count.
    fn close_parenthesis(
        &self,
        stack: &mut ValueStack<StackItem>,
        output: &mut Vec<PostfixToken>,
    ) -> Result<(), EvalError> {
        if !pop_to_parenthesis(stack, output) {
            return Err(EvalError::syntax("unexpected closing parenthesis"));
        }

        let Some(StackItem::ArgCount(given)) = stack.peek(1).cloned() else {
            return Ok(());
        };
        stack.pop();
        let Some(StackItem::Call(name)) = stack.pop() else {
            return Err(EvalError::internal("argument count without a call"));
        };

        let expected = self
            .registry
            .arity_of(&name)
            .ok_or_else(|| EvalError::internal(format!("'{}' is no longer a function", name)))?;
        if given != expected {
            return Err(EvalError::Arity {
                name,
                given,
                expected,
            });
        }

        output.push(PostfixToken::Call { name, args: given });
        Ok(())
    }
}

fn push_operator(op: Operator, stack: &mut ValueStack<StackItem>, output: &mut Vec<PostfixToken>) {
    while let Some(StackItem::Operator(top)) = stack.peek(1) {
        let pops = if op.is_right_associative() {
            op.precedence() < top.precedence()
        } else {
            op.precedence() <= top.precedence()
        };
        if !pops {
            break;
        }
        let top = *top;
        stack.pop();
        output.push(PostfixToken::Operator(top));
    }
    stack.push(StackItem::Operator(op));
}

/// Moves operators to the output up to and including the nearest `(`.
/// Returns `false` if there is none.
fn pop_to_parenthesis(stack: &mut ValueStack<StackItem>, output: &mut Vec<PostfixToken>) -> bool {
    loop {
        match stack.pop() {
            Some(StackItem::LeftParen) => return true,
            Some(StackItem::Operator(op)) => output.push(PostfixToken::Operator(op)),
            Some(_) | None => return false,
        }
    }
}

fn operand(token: Token) -> Result<Operand, EvalError> {
    match token {
        Token::Number(n) => Ok(Operand::Number(n)),
        Token::Str(s) => Ok(Operand::Str(s)),
        Token::Json(text) => Ok(Operand::Json(text)),
        Token::Regex(text) => Ok(Operand::Regex(text)),
        Token::Identifier(name) => Ok(Operand::Identifier(name)),
        other => Err(EvalError::internal(format!("{:?} is not an operand", other))),
    }
}

fn describe(token: &Token) -> &'static str {
    match token {
        Token::Number(_) => "number",
        Token::Str(_) => "string",
        Token::Json(_) => "literal",
        Token::Regex(_) => "regex",
        _ => "token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UserFunction;

    fn convert(source: &str) -> Result<String, EvalError> {
        let registry = Registry::new();
        Converter::new(&registry)
            .convert(source)
            .map(|tokens| render(&tokens))
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(convert("2+3*4").unwrap(), "2 3 4 * +");
        assert_eq!(convert("(2+3)*4").unwrap(), "2 3 + 4 *");
        assert_eq!(convert("2^3^2").unwrap(), "2 3 2 ^ ^");
        assert_eq!(convert("8-4-2").unwrap(), "8 4 - 2 -");
        assert_eq!(convert("a > 1 && b < 2 || c").unwrap(), "a 1 > b 2 < && c ||");
    }

    #[test]
    fn test_negation() {
        assert_eq!(convert("4-2").unwrap(), "4 2 -");
        assert_eq!(convert("-4+2").unwrap(), "4 _ 2 +");
        assert_eq!(convert("4*-2").unwrap(), "4 2 _ *");
        assert_eq!(convert("-2^2").unwrap(), "2 2 ^ _");
        assert_eq!(convert("2^-1").unwrap(), "2 1 _ ^");
        assert_eq!(convert("!a && b").unwrap(), "a ! b &&");
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(convert("sqrt(16)").unwrap(), "16 sqrt/1");
        assert_eq!(convert("if(a, b + 1, c)").unwrap(), "a b 1 + c if/3");
        assert_eq!(convert("sqrt(sqrt(16)) * 2").unwrap(), "16 sqrt/1 sqrt/1 2 *");
        assert_eq!(
            convert("if(sin(x), if(1, 2, 3), (4))").unwrap(),
            "x sin/1 1 2 3 if/3 4 if/3"
        );
    }

    #[test]
    fn test_arity_is_checked() {
        assert_eq!(
            convert("sqrt(1, 2)"),
            Err(EvalError::Arity {
                name: "sqrt".to_string(),
                given: 2,
                expected: 1
            })
        );
        assert_eq!(
            convert("if(1, 2)"),
            Err(EvalError::Arity {
                name: "if".to_string(),
                given: 2,
                expected: 3
            })
        );

        let mut registry = Registry::new();
        registry
            .define_function("zero", UserFunction::new(vec![], vec![]))
            .unwrap();
        let tokens = Converter::new(&registry).convert("zero() + 1").unwrap();
        assert_eq!(render(&tokens), "zero/0 1 +");
        assert!(matches!(
            Converter::new(&registry).convert("zero(1)"),
            Err(EvalError::Arity { given: 1, .. })
        ));
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(convert("2x").unwrap(), "2 x *");
        assert_eq!(convert("2(3)").unwrap(), "2 3 *");
        assert_eq!(convert("(1+1)(2)").unwrap(), "1 1 + 2 *");
        assert_eq!(convert("a(2)").unwrap(), "a 2 *");
        assert_eq!(convert("2sqrt(4)").unwrap(), "2 4 sqrt/1 *");
        assert_eq!(convert("-8(5/2)^2").unwrap(), "8 _ 5 2 / 2 ^ *");
    }

    #[test]
    fn test_array_access() {
        assert_eq!(convert("a[0]").unwrap(), "a [0] @[");
        assert_eq!(convert("a[i + 1] * 2").unwrap(), "a [i 1 +] @[ 2 *");
        assert_eq!(convert("[1, 2][1]").unwrap(), "[1, 2] [1] @[");
        assert_eq!(convert(r#"o["k"][0]"#).unwrap(), r#"o ["k"] @[ [0] @["#);
        assert!(convert("a[]").is_err());
    }

    #[test]
    fn test_selector_nesting_limit() {
        let registry = Registry::new();
        let nested = |depth: usize| format!("a{}[1]{}", "[a".repeat(depth), "]".repeat(depth));

        let converter = Converter::new(&registry).with_max_depth(3);
        assert_eq!(render(&converter.convert(&nested(2)).unwrap()), "a [a [a [1] @[] @[] @[");
        assert_eq!(
            converter.convert(&nested(3)),
            Err(EvalError::RecursionLimitExceeded(3))
        );
        assert_eq!(
            Converter::new(&registry).convert(&nested(2_000)),
            Err(EvalError::RecursionLimitExceeded(DEFAULT_MAX_DEPTH))
        );
    }

    #[test]
    fn test_parenthesis_errors() {
        assert_eq!(
            convert("(1+2"),
            Err(EvalError::syntax("missing closing parenthesis"))
        );
        assert_eq!(
            convert("1+2)"),
            Err(EvalError::syntax("unexpected closing parenthesis"))
        );
        assert_eq!(convert("sqrt(4"), Err(EvalError::syntax("missing closing parenthesis")));
        assert_eq!(convert("()"), Err(EvalError::syntax("unexpected ')'")));
        assert_eq!(convert("1, 2"), Err(EvalError::syntax("unexpected ','")));
        assert_eq!(convert("(1, 2)"), Err(EvalError::syntax("unexpected ','")));
        assert_eq!(convert("if(1, 2,)"), Err(EvalError::syntax("unexpected ')'")));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(convert(""), Err(EvalError::syntax("empty expression")));
        assert_eq!(convert("1 +"), Err(EvalError::syntax("unexpected end of expression")));
        assert_eq!(convert("* 2"), Err(EvalError::syntax("unexpected operator '*'")));
        assert!(convert(r#"1 "a""#).is_err());
        assert!(convert("1 !").is_err());
    }
}
