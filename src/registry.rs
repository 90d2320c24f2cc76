use crate::error::EvalError;
use crate::functions::{self, math, NativeFunction};
use crate::postfix::PostfixToken;
use crate::value::Value;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::f64::consts;
use std::sync::Arc;

const CONSTANTS: [&str; 2] = ["pi", "e"];

/// A user-defined function with its free variables already replaced by values.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    parameters: Vec<String>,
    body: Vec<PostfixToken>,
}

impl UserFunction {
    pub fn new(parameters: Vec<String>, body: Vec<PostfixToken>) -> Self {
        Self { parameters, body }
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn body(&self) -> &[PostfixToken] {
        &self.body
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// What a function name resolves to, in lookup order.
#[derive(Debug, Clone)]
pub enum Callee {
    Builtin,
    User(Arc<UserFunction>),
    Native(NativeFunction),
}

/// Variables, user functions and native functions owned by one evaluator.
#[derive(Debug, Clone)]
pub struct Registry {
    variables: HashMap<String, Value>,
    functions: BTreeMap<String, Arc<UserFunction>>,
    natives: HashMap<String, NativeFunction>,
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self {
            variables: HashMap::from([
                ("pi".to_string(), Value::Number(consts::PI)),
                ("e".to_string(), Value::Number(consts::E)),
            ]),
            functions: BTreeMap::new(),
            natives: HashMap::new(),
        };
        functions::register_functions(&mut registry);
        registry
    }

    pub fn is_constant(name: &str) -> bool {
        CONSTANTS.contains(&name)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        if Self::is_constant(name) {
            return Err(EvalError::ConstantReassignment(name.to_string()));
        }
        if !is_identifier(name) {
            return Err(EvalError::syntax(format!("invalid variable name '{}'", name)));
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Drops the capture variables of the previous match.
    pub fn clear_captures(&mut self) {
        self.variables.retain(|name, _| !name.starts_with('$'));
    }

    /// Binds `$0` to the whole match and `$1..$N` to the groups.
    pub fn set_captures(&mut self, groups: Vec<String>) {
        self.clear_captures();
        for (i, group) in groups.into_iter().enumerate() {
            self.variables.insert(format!("${}", i), Value::String(group));
        }
    }

    pub fn define_function(&mut self, name: &str, function: UserFunction) -> Result<(), EvalError> {
        if math::is_builtin(name) {
            return Err(EvalError::BuiltinRedefinition(name.to_string()));
        }
        debug!("Defining function {}", signature(name, function.parameters()));
        self.functions.insert(name.to_string(), Arc::new(function));
        Ok(())
    }

    pub fn register_native(&mut self, name: &str, native: NativeFunction) -> Result<(), EvalError> {
        if math::is_builtin(name) {
            return Err(EvalError::BuiltinRedefinition(name.to_string()));
        }
        if !is_identifier(name) {
            return Err(EvalError::syntax(format!("invalid function name '{}'", name)));
        }
        self.insert_native(name, native);
        Ok(())
    }

    pub(crate) fn insert_native(&mut self, name: &str, native: NativeFunction) {
        self.natives.insert(name.to_string(), native);
    }

    /// Built-ins win over user functions, which win over native functions.
    pub fn resolve_function(&self, name: &str) -> Option<Callee> {
        if math::is_builtin(name) {
            return Some(Callee::Builtin);
        }
        if let Some(function) = self.functions.get(name) {
            return Some(Callee::User(Arc::clone(function)));
        }
        self.natives.get(name).cloned().map(Callee::Native)
    }

    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.resolve_function(name).map(|callee| match callee {
            Callee::Builtin => 1,
            Callee::User(function) => function.arity(),
            Callee::Native(native) => native.arity(),
        })
    }

    /// User variables, without constants and capture groups.
    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.variables
            .iter()
            .filter(|(name, _)| !Self::is_constant(name) && !name.starts_with('$'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// User functions rendered as `name(a,b)`, sorted by name.
    pub fn function_signatures(&self) -> Vec<String> {
        self.functions
            .iter()
            .map(|(name, function)| signature(name, function.parameters()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn signature(name: &str, parameters: &[String]) -> String {
    format!("{}({})", name, parameters.join(","))
}

/// `[a-z][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::IntoNativeFunction;

    #[test]
    fn test_constants_are_seeded_and_protected() {
        let mut registry = Registry::new();
        assert_eq!(registry.variable("pi"), Some(&Value::Number(consts::PI)));
        assert_eq!(
            registry.set_variable("e", Value::Number(1.0)),
            Err(EvalError::ConstantReassignment("e".to_string()))
        );
        assert!(registry.variables().is_empty());
    }

    #[test]
    fn test_set_variable_requires_identifier() {
        let mut registry = Registry::new();
        assert!(registry.set_variable("a_1", Value::Number(1.0)).is_ok());
        assert!(registry.set_variable("A", Value::Number(1.0)).is_err());
        assert!(registry.set_variable("$1", Value::Number(1.0)).is_err());
    }

    #[test]
    fn test_captures_replace_previous_ones() {
        let mut registry = Registry::new();
        registry.set_captures(vec!["ab".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(registry.variable("$2"), Some(&Value::from("b")));

        registry.set_captures(vec!["x".to_string()]);
        assert_eq!(registry.variable("$0"), Some(&Value::from("x")));
        assert_eq!(registry.variable("$1"), None);
        assert!(registry.variables().is_empty());
    }

    #[test]
    fn test_function_resolution_order() {
        let mut registry = Registry::new();
        assert!(matches!(registry.resolve_function("sqrt"), Some(Callee::Builtin)));
        assert!(matches!(registry.resolve_function("if"), Some(Callee::Native(_))));
        assert_eq!(registry.arity_of("if"), Some(3));
        assert!(registry.resolve_function("f").is_none());

        registry
            .define_function("if", UserFunction::new(vec!["x".to_string()], vec![]))
            .unwrap();
        assert!(matches!(registry.resolve_function("if"), Some(Callee::User(_))));
        assert_eq!(registry.arity_of("if"), Some(1));
    }

    #[test]
    fn test_builtins_cannot_be_redefined() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.define_function("sin", UserFunction::new(vec![], vec![])),
            Err(EvalError::BuiltinRedefinition("sin".to_string()))
        );

        let one = || -> Result<Value, String> { Ok(Value::Number(1.0)) };
        assert_eq!(
            registry.register_native("ln", one.into_native_function()),
            Err(EvalError::BuiltinRedefinition("ln".to_string()))
        );
    }

    #[test]
    fn test_function_signatures() {
        let mut registry = Registry::new();
        registry
            .define_function(
                "g",
                UserFunction::new(vec!["x".to_string(), "y".to_string()], vec![]),
            )
            .unwrap();
        registry
            .define_function("f", UserFunction::new(vec![], vec![]))
            .unwrap();
        assert_eq!(registry.function_signatures(), vec!["f()", "g(x,y)"]);
    }
}
