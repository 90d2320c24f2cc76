use thiserror::Error;

/// Every way converting or evaluating a formula can fail.
///
/// The `Display` text doubles as the message reported by
/// [`Evaluator::last_error`](crate::Evaluator::last_error).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("wrong number of arguments for {name}() ({given} given, {expected} expected)")]
    Arity {
        name: String,
        given: usize,
        expected: usize,
    },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("cannot assign to constant '{0}'")]
    ConstantReassignment(String),

    #[error("undefined function '{0}()'")]
    UndefinedFunction(String),

    #[error("cannot redefine built-in function '{0}()'")]
    BuiltinRedefinition(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid regex {pattern}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("invalid object for selector: {0}")]
    InvalidSelector(String),

    #[error("invalid json {0}")]
    InvalidJsonLiteral(String),

    #[error("unsupported operand for '{operator}': {operand}")]
    TypeMismatch { operator: String, operand: String },

    #[error("{name}() failed: {message}")]
    NativeFunction { name: String, message: String },

    #[error("maximum recursion depth of {0} exceeded")]
    RecursionLimitExceeded(usize),

    #[error("internal error: {0}")]
    InternalConsistency(String),
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        EvalError::Syntax(message.into())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        EvalError::InternalConsistency(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(EvalError::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            EvalError::ConstantReassignment("pi".to_string()).to_string(),
            "cannot assign to constant 'pi'"
        );
        assert_eq!(
            EvalError::Arity {
                name: "f".to_string(),
                given: 1,
                expected: 2
            }
            .to_string(),
            "wrong number of arguments for f() (1 given, 2 expected)"
        );
    }
}
