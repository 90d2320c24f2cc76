pub mod error;
pub mod evaluator;
pub mod functions;
pub mod postfix;
pub mod registry;
pub mod value;

pub use error::EvalError;
pub use evaluator::{Evaluation, Evaluator, EvaluatorConfig};
pub use functions::{FromValue, IntoNativeFunction, NativeFunction};
pub use value::Value;

use rayon::prelude::*;

/// Evaluates one statement with a fresh [`Evaluator`].
pub fn evaluate_expression(expression: &str) -> Result<Value, EvalError> {
    let mut evaluator = Evaluator::new();
    evaluator.set_suppress_errors(true);
    evaluator.evaluate(expression)
}

/// Evaluates independent formulas in parallel, one fresh [`Evaluator`] each.
/// Results are in input order.
pub fn evaluate_batch(expressions: &[&str]) -> Vec<Result<Value, EvalError>> {
    expressions
        .par_iter()
        .map(|expression| evaluate_expression(expression))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_expression() {
        assert_eq!(evaluate_expression("2 + 3 * 4"), Ok(Value::Number(14.0)));
        assert_eq!(evaluate_expression("x"), Err(EvalError::UndefinedVariable("x".into())));
    }

    #[test]
    fn test_evaluate_batch_keeps_order() {
        let results = evaluate_batch(&["1 + 1", "a = 3", "a", "'x' + 1"]);
        assert_eq!(results[0], Ok(Value::Number(2.0)));
        assert_eq!(results[1], Ok(Value::Number(3.0)));
        // every formula gets its own evaluator
        assert_eq!(results[2], Err(EvalError::UndefinedVariable("a".into())));
        assert_eq!(results[3], Ok(Value::from("x1")));
    }
}
