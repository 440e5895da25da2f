//! Savefile - The per-turn files Dominions 4 keeps for a game

use crate::{backup, Result, TRN_BACKUP_REGEX, TWOH_BACKUP_REGEX};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Kind of save file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveKind {
    /// Turn orders written by the player (`.2h`)
    Orders,
    /// Turn result sent by the host (`.trn`)
    Turn,
}

impl SaveKind {
    pub const ALL: [SaveKind; 2] = [SaveKind::Orders, SaveKind::Turn];

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            SaveKind::Orders => "2h",
            SaveKind::Turn => "trn",
        }
    }

    /// Pattern matching a backup of this kind, capturing the turn number
    pub fn backup_regex(self) -> &'static Regex {
        match self {
            SaveKind::Orders => &*TWOH_BACKUP_REGEX,
            SaveKind::Turn => &*TRN_BACKUP_REGEX,
        }
    }

    /// Does the file name end in this kind's extension?
    pub fn matches(self, file_name: &str) -> bool {
        file_name.ends_with(&format!(".{}", self.extension()))
    }

    /// Turn number of a backup file name of this kind
    ///
    /// `None` for canonical names and for turn numbers that do not fit a `u32`.
    pub fn backup_turn(self, file_name: &str) -> Option<u32> {
        self.backup_regex()
            .captures(file_name)
            .and_then(|captures| captures[1].parse().ok())
    }
}

impl std::fmt::Display for SaveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A save file inside a game directory, either current or a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub kind: SaveKind,
    pub file_name: String,
    pub path: PathBuf,
}

impl SaveFile {
    /// Create a SaveFile for `file_name` inside `directory`
    pub fn new(kind: SaveKind, directory: &Path, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let path = directory.join(&file_name);
        Self {
            kind,
            file_name,
            path,
        }
    }

    /// Backup file name of this file for the given turn number
    pub fn backup_name(&self, turn_number: u32) -> Result<String> {
        backup::backup_filename(&self.file_name, turn_number, self.kind.extension())
    }

    /// Backup file path of this file for the given turn number, next to the file itself
    pub fn backup_path(&self, turn_number: u32) -> Result<PathBuf> {
        Ok(self.path.with_file_name(self.backup_name(turn_number)?))
    }

    /// File name with any backup decoration removed
    pub fn canonical_name(&self) -> String {
        backup::canonical_filename(&self.file_name, self.kind.extension())
    }
}
