// src/main.rs

use std::env;
use std::process;

use galleon::search::engine::run_game;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Default: computer plays black.
    let computer_is_white = if args.len() > 1 {
        match args[1].as_str() {
            "--white" => true,
            "--black" => false,
            _ => {
                println!("Usage: {} [--white | --black]", args[0]);
                process::exit(1);
            }
        }
    } else {
        false
    };

    run_game(computer_is_white);
}
