use formula_rs::evaluate_batch;

fn main() {
    pretty_env_logger::init();

    let expressions = [
        "120 > 100 && 3000 < 5000",
        "80 > 100 && 6000 < 5000",
        "sqrt(2)^2",
        "[1, 2, 3][1] * 10",
        "1 / 0",
    ];

    let results = evaluate_batch(&expressions);
    for (i, (expression, result)) in expressions.iter().zip(results).enumerate() {
        match result {
            Ok(value) => println!("Result {}: {} = {}", i, expression, value),
            Err(err) => println!("Result {}: {} failed: {}", i, expression, err),
        }
    }
}
