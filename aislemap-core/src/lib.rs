pub mod classify;
pub mod download;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod report;
pub mod session;

pub use error::{Error, Result};

use colored::Colorize;

const BANNER: &str = r#"
   ▄▄▄       ██▓  ██████  ██▓    ▓█████  ███▄ ▄███▓ ▄▄▄       ██▓███
  ▒████▄    ▓██▒▒██    ▒ ▓██▒    ▓█   ▀ ▓██▒▀█▀ ██▒▒████▄    ▓██░  ██▒
  ▒██  ▀█▄  ▒██▒░ ▓██▄   ▒██░    ▒███   ▓██    ▓██░▒██  ▀█▄  ▓██░ ██▓▒
  ░██▄▄▄▄██ ░██░  ▒   ██▒▒██░    ▒▓█  ▄ ▒██    ▒██ ░██▄▄▄▄██ ▒██▄█▓▒ ▒
   ▓█   ▓██▒░██░▒██████▒▒░██████▒░▒████▒▒██▒   ░██▒ ▓█   ▓██▒▒██▒ ░  ░
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "in-store map API explorer".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
