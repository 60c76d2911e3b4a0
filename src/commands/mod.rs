//! CLI command implementations

pub mod delete;
pub mod engage;
pub mod list;
pub mod login;
pub mod publish;
pub mod show;

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Print `message` and read one trimmed line from stdin
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
