use formula_rs::{postfix, Evaluator};

fn main() {
    pretty_env_logger::init();

    let mut evaluator = Evaluator::new();

    let expression = "price > 50 && volume < 5000";
    let tokens = evaluator
        .convert(expression)
        .expect("Failed to convert");
    println!("Postfix: {}", postfix::render(&tokens));

    for (price, volume) in [(120.0, 3000.0), (40.0, 3000.0), (120.0, 9000.0)] {
        evaluator.set_variable("price", price).unwrap();
        evaluator.set_variable("volume", volume).unwrap();

        match evaluator.execute(&tokens) {
            Ok(result) => println!("price={price} volume={volume}: {}", result.is_truthy()),
            Err(err) => println!("Error: {}", err),
        }
    }
}
