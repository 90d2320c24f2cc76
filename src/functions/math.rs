use std::borrow::Cow;

/// Single-argument math functions that can be called but never redefined.
pub const BUILTINS: [&str; 22] = [
    "sin", "sinh", "arcsin", "asin", "arcsinh", "asinh", "cos", "cosh", "arccos", "acos",
    "arccosh", "acosh", "tan", "tanh", "arctan", "atan", "arctanh", "atanh", "sqrt", "abs", "ln",
    "log",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Maps `arc*` spellings to `a*` and `ln` to `log`.
fn canonical(name: &str) -> Cow<'_, str> {
    match name {
        "ln" => Cow::Borrowed("log"),
        _ => match name.strip_prefix("arc") {
            Some(rest) => Cow::Owned(format!("a{}", rest)),
            None => Cow::Borrowed(name),
        },
    }
}

/// Applies a built-in; `None` if `name` is not one. `log` is the natural logarithm.
pub fn apply(name: &str, x: f64) -> Option<f64> {
    let result = match canonical(name).as_ref() {
        "sin" => x.sin(),
        "sinh" => x.sinh(),
        "asin" => x.asin(),
        "asinh" => x.asinh(),
        "cos" => x.cos(),
        "cosh" => x.cosh(),
        "acos" => x.acos(),
        "acosh" => x.acosh(),
        "tan" => x.tan(),
        "tanh" => x.tanh(),
        "atan" => x.atan(),
        "atanh" => x.atanh(),
        "sqrt" => x.sqrt(),
        "abs" => x.abs(),
        "log" => x.ln(),
        _ => return None,
    };
    Some(result)
}
