//! Output formatting utilities for the CLI.

use console::style;
use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Bold a label the way the human-readable renderers highlight counts and
/// headings; a no-op under `NO_COLOR` since `console` checks it internally.
pub fn heading(text: &str) -> String {
    style(text).bold().to_string()
}
