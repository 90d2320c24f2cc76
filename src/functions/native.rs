use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A host callable with a fixed number of positional arguments.
#[derive(Clone)]
pub struct NativeFunction {
    arity: usize,
    function: Function,
}

impl NativeFunction {
    pub fn new<F>(arity: usize, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            arity,
            function: Arc::new(function),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        if args.len() != self.arity {
            return Err(format!(
                "Expected {} arguments, but got {}",
                self.arity,
                args.len()
            ));
        }
        (self.function)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Conversion of a formula value into a typed native-function argument.
pub trait FromValue: Sized {
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "any value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "a number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "an integer";

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_number()
            .filter(|n| n.fract() == 0.0 && n.is_finite())
            .map(|n| n as i64)
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "a boolean";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.is_truthy())
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) | Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl FromValue for Vec<Value> {
    const TYPE_NAME: &'static str = "an array";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

fn argument<T: FromValue>(args: &[Value], position: usize) -> Result<T, String> {
    args.get(position)
        .and_then(T::from_value)
        .ok_or_else(|| format!("Expected argument {} to be {}", position, T::TYPE_NAME))
}

/// Anything that can be registered as a native function.
///
/// Implemented for closures and functions taking up to six [`FromValue`]
/// arguments and returning `Result<Value, String>`; the arity is the number
/// of parameters.
pub trait IntoNativeFunction<Args> {
    fn into_native_function(self) -> NativeFunction;
}

impl IntoNativeFunction<NativeFunction> for NativeFunction {
    fn into_native_function(self) -> NativeFunction {
        self
    }
}

macro_rules! count {
    () => (0usize);
    ($head:ident $($tail:ident)*) => (1usize + count!($($tail)*));
}

macro_rules! impl_into_native_function {
    ($($ty:ident $arg:ident $index:tt),*) => {
        impl<F, $($ty,)*> IntoNativeFunction<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Result<Value, String> + Send + Sync + 'static,
            $($ty: FromValue,)*
        {
            #[allow(unused_variables)]
            fn into_native_function(self) -> NativeFunction {
                NativeFunction::new(count!($($ty)*), move |args: &[Value]| {
                    $(let $arg = argument::<$ty>(args, $index)?;)*
                    (self)($($arg),*)
                })
            }
        }
    };
}

impl_into_native_function!();
impl_into_native_function!(A a 0);
impl_into_native_function!(A a 0, B b 1);
impl_into_native_function!(A a 0, B b 1, C c 2);
impl_into_native_function!(A a 0, B b 1, C c 2, D d 3);
impl_into_native_function!(A a 0, B b 1, C c 2, D d 3, E e 4);
impl_into_native_function!(A a 0, B b 1, C c 2, D d 3, E e 4, G g 5);
