pub mod math;
pub mod native;
pub mod other;

pub use native::{FromValue, IntoNativeFunction, NativeFunction};

use crate::registry::Registry;

pub fn register_functions(registry: &mut Registry) {
    other::register(registry);
}
