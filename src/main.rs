//! Binary entry point for `eng-bump`.

use std::process;

fn main() {
    if let Err(e) = eng_bump::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
