use formula_rs::{Evaluator, Value};
use log::debug;

fn add(a: f64, b: f64) -> Result<Value, String> {
    Ok(Value::Number(a + b))
}

fn divide(a: f64, b: f64) -> Result<Value, String> {
    if b == 0.0 {
        return Err("divide by zero".to_string());
    }
    Ok(Value::Number(a / b))
}

fn main() {
    pretty_env_logger::init();

    let mut evaluator = Evaluator::new();
    evaluator.register_native_function("add", add).unwrap();
    evaluator.register_native_function("divide", divide).unwrap();

    let statements = [
        "price = 120",
        "volume = 3000",
        "discount(p, rate) = p - p * rate",
        "discount(price, 0.25)",
        "add(1, divide(10, 4)) * 2",
        "price > 100 && volume < 5000",
        r#""Order-1234" =~ /^order-(\d+)$/i"#,
        "$1 * 2",
        "divide(1, 0)",
    ];

    for statement in statements {
        match evaluator.evaluate(statement) {
            Ok(result) => println!("{statement} => {result}"),
            Err(err) => println!("{statement} => error: {err}"),
        }
    }

    debug!("variables: {:?}", evaluator.variables());
    println!("functions: {:?}", evaluator.functions());
}
