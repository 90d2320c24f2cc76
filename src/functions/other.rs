use super::IntoNativeFunction;
use crate::registry::Registry;
use crate::value::Value;

pub fn register(registry: &mut Registry) {
    registry.insert_native("if", conditional.into_native_function());
}

/// `if(condition, then, otherwise)`. Both branches have already been evaluated.
pub fn conditional(condition: bool, then: Value, otherwise: Value) -> Result<Value, String> {
    Ok(if condition { then } else { otherwise })
}
