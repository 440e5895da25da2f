//! Formatters - Different output formatters for command results

use crate::command_result::{CommandResult, Level};
use std::io::{IsTerminal, Write};

const OUTPUT_PREFIX: &str = "d4t: ";
const ERROR_PREFIX: &str = "!!!: ";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Formatter trait
pub trait Formatter {
    fn format(&self, result: &CommandResult) -> String;
    fn write_to(&self, result: &CommandResult, writer: &mut dyn Write) -> std::io::Result<()> {
        write!(writer, "{}", self.format(result))
    }
}

/// Shell formatter - prefixed lines, colored by level
pub struct ShellFormatter {
    pub color: bool,
}

impl Formatter for ShellFormatter {
    fn format(&self, result: &CommandResult) -> String {
        result
            .lines
            .iter()
            .map(|line| {
                let (prefix, color) = match line.level {
                    Level::Output | Level::Info => (OUTPUT_PREFIX, GREEN),
                    Level::Warn => (OUTPUT_PREFIX, YELLOW),
                    Level::Error => (ERROR_PREFIX, RED),
                };
                if self.color {
                    format!("{}{}{}{}\n", color, prefix, line.text, RESET)
                } else {
                    format!("{}{}\n", prefix, line.text)
                }
            })
            .collect()
    }
}

/// Text formatter - bare lines, for scripting
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, result: &CommandResult) -> String {
        result
            .lines
            .iter()
            .map(|line| format!("{}\n", line.text))
            .collect()
    }
}

/// JSON formatter - returns JSON string of structured data
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, result: &CommandResult) -> String {
        let json = serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
        format!("{}\n", json)
    }
}

/// Formatters module - factory for creating formatters
pub struct Formatters;

impl Formatters {
    pub fn by_name(name: &str) -> Box<dyn Formatter> {
        match name.to_lowercase().as_str() {
            "text" | "simple" => Box::new(TextFormatter),
            "json" => Box::new(JsonFormatter),
            _ => Box::new(ShellFormatter {
                color: Self::color_supported(),
            }),
        }
    }

    /// Colorization only works on posix terminals
    fn color_supported() -> bool {
        !cfg!(windows) && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_result::Operation;

    fn result() -> CommandResult {
        let mut result = CommandResult::new(Operation::List);
        result.output("Abysia").warn("Skipped Broken");
        result
    }

    #[test]
    fn test_shell_without_color() {
        let formatter = ShellFormatter { color: false };
        assert_eq!(
            formatter.format(&result()),
            "d4t: Abysia\nd4t: Skipped Broken\n"
        );

        let failure = CommandResult::failure(Operation::Backup, "nope");
        assert_eq!(formatter.format(&failure), "!!!: nope\n");
    }

    #[test]
    fn test_shell_with_color() {
        let formatted = ShellFormatter { color: true }.format(&result());
        assert!(formatted.starts_with("\x1b[32md4t: Abysia\x1b[0m\n"));
        assert!(formatted.contains("\x1b[33m"));
    }

    #[test]
    fn test_text() {
        assert_eq!(TextFormatter.format(&result()), "Abysia\nSkipped Broken\n");
    }

    #[test]
    fn test_json() {
        let value: serde_json::Value =
            serde_json::from_str(JsonFormatter.format(&result()).trim()).unwrap();
        assert_eq!(value["operation"], "list");
        assert_eq!(value["lines"][1]["level"], "warn");
    }

    #[test]
    fn test_write_to() {
        let mut out = Vec::new();
        TextFormatter.write_to(&result(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Abysia\nSkipped Broken\n");
    }
}
