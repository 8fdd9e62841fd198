use colored::*;

use crate::core::turn::{Role, Turn};

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_magenta().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_magenta());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

pub fn print_turn(turn: &Turn) {
    match turn.role {
        Role::User => println!("{} {}", "you:".yellow().bold(), turn.content),
        Role::Assistant => println!("{} {}", "pixy:".bright_magenta().bold(), turn.content),
    }
}
