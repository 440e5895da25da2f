//! dom4tools - Manage Dominions 4 save game directories from the command line
//!
//! This library provides turn backups, restores, replays and turn submission
//! for the play-by-email games found in a Dominions 4 installation.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

pub mod backup;
pub mod command_result;
pub mod commands;
pub mod config;
pub mod formatters;
pub mod game;
pub mod installation;
pub mod mailer;
pub mod replay;
pub mod savefile;
pub mod session;

pub use command_result::CommandResult;
pub use commands::Command;
pub use config::Config;
pub use formatters::Formatters;
pub use game::Game;
pub use installation::{GameCollection, Installation};
pub use mailer::{Mailer, Mailsend, SmtpMailer, Submission};
pub use savefile::{SaveFile, SaveKind};
pub use session::Session;

/// Directory below the installation root that holds one directory per game
pub const SAVED_GAMES_DIR: &str = "savedgames";

/// Game names used by Dominions 4 itself
pub const RESERVED_GAME_NAMES: &[&str] = &["newlords"];

/// Address turns are mailed to
pub const TURN_SUBMISSION_ADDRESS: &str = "turns@llamaserver.net";

lazy_static! {
    /// Backup orders file, capturing the turn number
    pub static ref TWOH_BACKUP_REGEX: Regex = Regex::new(r"-(\d+)\.2h$").unwrap();

    /// Backup turn file, capturing the turn number
    pub static ref TRN_BACKUP_REGEX: Regex = Regex::new(r"-(\d+)\.trn$").unwrap();
}

/// Normalized form of a game name, used wherever game identity is compared
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// Check whether two game names refer to the same game
pub fn same_game_name(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Validate a game name, returning every reason it is rejected
///
/// Game names are invalid when they are reserved by Dominions 4 or contain spaces.
pub fn validate_game_name(name: &str) -> std::result::Result<(), Vec<String>> {
    let mut reasons = Vec::new();

    if let Some(reserved) = RESERVED_GAME_NAMES
        .iter()
        .find(|reserved| same_game_name(name, reserved))
    {
        reasons.push(format!("\"{}\" is a reserved game name", reserved));
    }

    if name.contains(' ') {
        reasons.push("Game names must not contain spaces".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}

/// Convenience predicate over [`validate_game_name`]
pub fn valid_game_name(name: &str) -> bool {
    validate_game_name(name).is_ok()
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid game name '{name}': {}", reasons.join(", "))]
    InvalidName { name: String, reasons: Vec<String> },

    #[error("Game already exists: {name} at {}", directory.display())]
    DuplicateGame { name: String, directory: PathBuf },

    #[error("Could not find a game called {0}")]
    GameNotFound(String),

    #[error("Could not find a {kind} file for {game}")]
    MissingFile { game: String, kind: SaveKind },

    #[error("Backup for turn {turn} already exists in {}, not forcing", directory.display())]
    BackupExists { turn: u32, directory: PathBuf },

    #[error("Neither trn nor 2h backups exist for turn {turn} in {}", directory.display())]
    NoBackupFound { turn: u32, directory: PathBuf },

    #[error("No turn backups found for {0}")]
    NoBackups(String),

    #[error("Could not read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{file_name}' does not end in .{extension}")]
    MissingExtension { file_name: String, extension: String },

    #[error("'{0}' already carries a turn number")]
    AlreadyDecorated(String),

    #[error("Copied {completed:?} but failed on {}: {source}", failed.display())]
    IncompleteCopy {
        completed: Vec<PathBuf>,
        failed: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permissions for {} were {mode:o} and not 600. Please update (e.g. chmod 0600 {}) as sensitive information might be stored in the config.", path.display(), path.display())]
    InsecureConfig { path: PathBuf, mode: u32 },

    #[error("Could not find '{0}'. Please install mailsend or set MAILSEND_PATH")]
    MailerNotFound(String),

    #[error("Timeout after {0:?} while sending mail")]
    MailTimeout(Duration),

    #[error("Failed sending mail: {0}")]
    MailFailed(String),

    #[error("No turn set to submit, try: d4t submit {0} TURN_NUMBER")]
    NoTurnToSubmit(String),

    #[error("{} does not exist", .0.display())]
    TurnNotDownloaded(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
