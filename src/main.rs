#![allow(non_snake_case)]
use RustedAMR::Examples::amr_examples::amr_examples;
use RustedAMR::meshcontrol::amr_loop::init_logging;

fn main() {
    init_logging(Some("info".to_string()));
    let example = 1;
    amr_examples(example);
}
