//! Colour-coded console lines for operators following a run.
//!
//! Diagnostics go through `tracing`; these helpers are the human-facing
//! progress output. Colouring follows `colored`'s global switch, which also
//! honours `NO_COLOR`.

use colored::Colorize;

pub fn set_color(enabled: bool) {
    if !enabled {
        colored::control::set_override(false);
    }
}

pub fn info(message: &str) {
    println!("{}", message.blue());
}

pub fn warning(message: &str) {
    println!("{}", message.yellow());
}

pub fn success(message: &str) {
    println!("{}", format!("✅ {}", message).green());
}

pub fn failure(message: &str) {
    eprintln!("{}", format!("❌ {}", message).red());
}

/// Red line on stdout, for results rather than errors
pub fn alert(message: &str) {
    println!("{}", format!("❌ {}", message).red());
}

/// Section heading, preceded by a blank line
pub fn heading(message: &str) {
    println!("\n{}", message.magenta());
}
