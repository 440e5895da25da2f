//! CommandResult - Encapsulates the result of executing a command

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of operation performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Cd,
    List,
    Create,
    Backup,
    Restore,
    Replay,
    Submit,
    Resubmit,
    Get,
    Version,
    Complete,
    Config,
    Error,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Cd => write!(f, "cd"),
            Operation::List => write!(f, "list"),
            Operation::Create => write!(f, "create"),
            Operation::Backup => write!(f, "backup"),
            Operation::Restore => write!(f, "restore"),
            Operation::Replay => write!(f, "replay"),
            Operation::Submit => write!(f, "submit"),
            Operation::Resubmit => write!(f, "resubmit"),
            Operation::Get => write!(f, "get"),
            Operation::Version => write!(f, "version"),
            Operation::Complete => write!(f, "complete"),
            Operation::Config => write!(f, "config"),
            Operation::Error => write!(f, "error"),
        }
    }
}

/// Severity of a single output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Output,
    Info,
    Warn,
    Error,
}

/// One line of command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub level: Level,
    pub text: String,
}

/// Result of executing a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub operation: Operation,
    pub success: bool,
    pub lines: Vec<Line>,
    #[serde(flatten)]
    pub details: HashMap<String, serde_json::Value>,
}

impl CommandResult {
    /// Create a new, successful CommandResult without output
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            success: true,
            lines: Vec::new(),
            details: HashMap::new(),
        }
    }

    /// Create a failed CommandResult carrying an error message
    pub fn failure(operation: Operation, message: impl Into<String>) -> Self {
        let mut result = Self::new(operation);
        result.success = false;
        result.error(message);
        result
    }

    /// Add a plain output line
    pub fn output(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Level::Output, text)
    }

    /// Add an informational line
    pub fn info(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Level::Info, text)
    }

    /// Add a warning line
    pub fn warn(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Level::Warn, text)
    }

    /// Add an error line
    pub fn error(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Level::Error, text)
    }

    fn push(&mut self, level: Level, text: impl Into<String>) -> &mut Self {
        self.lines.push(Line {
            level,
            text: text.into(),
        });
        self
    }

    /// Check if the command succeeded
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Check if the command failed
    pub fn is_failure(&self) -> bool {
        !self.success
    }

    /// Add a detail field
    pub fn add_detail(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.details.insert(key.into(), value);
    }

    /// Get a detail field
    pub fn get_detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }
}
