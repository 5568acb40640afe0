use std::process::exit;

use colored::Colorize;

fn main() {
    if let Err(e) = combfuzz::app::run_cli() {
        eprintln!("{} {}", "[!]".bold().red(), e);
        exit(1);
    }
}
