//! Game - One save game directory, its current turn files and their backups

use crate::{savefile::SaveFile, savefile::SaveKind, Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A Dominions 4 game
#[derive(Debug, Clone)]
pub struct Game {
    pub name: String,
    pub directory: PathBuf,
    pub orders_file: Option<SaveFile>,
    pub turn_file: Option<SaveFile>,
    pub orders_backups: BTreeMap<u32, SaveFile>,
    pub turn_backups: BTreeMap<u32, SaveFile>,
}

impl Game {
    /// Create a Game for a directory without looking at its contents
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            orders_file: None,
            turn_file: None,
            orders_backups: BTreeMap::new(),
            turn_backups: BTreeMap::new(),
        }
    }

    /// Load a Game by scanning its directory for current files and backups
    pub fn load(name: impl Into<String>, directory: impl Into<PathBuf>) -> Result<Self> {
        let mut game = Self::new(name, directory);

        let entries = fs::read_dir(&game.directory).map_err(|source| Error::DirectoryUnreadable {
            path: game.directory.clone(),
            source,
        })?;

        let mut file_names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::DirectoryUnreadable {
                path: game.directory.clone(),
                source,
            })?;
            // Only regular files (or links to them) can be save files
            if !entry.path().is_file() {
                continue;
            }
            if let Some(file_name) = entry.file_name().to_str() {
                file_names.push(file_name.to_string());
            }
        }

        for kind in SaveKind::ALL {
            let current = current_file_name(&file_names, kind)
                .map(|file_name| SaveFile::new(kind, &game.directory, file_name));

            let backups: BTreeMap<u32, SaveFile> = file_names
                .iter()
                .filter_map(|file_name| {
                    kind.backup_turn(file_name)
                        .map(|turn| (turn, SaveFile::new(kind, &game.directory, file_name.clone())))
                })
                .collect();

            debug!(
                game = %game.name,
                %kind,
                current = ?current.as_ref().map(|f| &f.file_name),
                backups = backups.len(),
                "scanned game directory"
            );

            match kind {
                SaveKind::Orders => {
                    game.orders_file = current;
                    game.orders_backups = backups;
                }
                SaveKind::Turn => {
                    game.turn_file = current;
                    game.turn_backups = backups;
                }
            }
        }

        Ok(game)
    }

    /// Current file of the given kind, if one was found
    pub fn current_file(&self, kind: SaveKind) -> Option<&SaveFile> {
        match kind {
            SaveKind::Orders => self.orders_file.as_ref(),
            SaveKind::Turn => self.turn_file.as_ref(),
        }
    }

    /// Current file of the given kind, failing if the game has none
    pub fn require_file(&self, kind: SaveKind) -> Result<&SaveFile> {
        self.current_file(kind).ok_or_else(|| Error::MissingFile {
            game: self.name.clone(),
            kind,
        })
    }

    /// Backups of the given kind, keyed by turn number
    pub fn backups(&self, kind: SaveKind) -> &BTreeMap<u32, SaveFile> {
        match kind {
            SaveKind::Orders => &self.orders_backups,
            SaveKind::Turn => &self.turn_backups,
        }
    }

    /// Backed up turn numbers of the given kind, ascending
    pub fn backup_turns(&self, kind: SaveKind) -> Vec<u32> {
        self.backups(kind).keys().copied().collect()
    }

    /// Highest turn number with a turn result backup
    pub fn latest_backup_turn(&self) -> Option<u32> {
        self.turn_backups.keys().next_back().copied()
    }

    /// The turn after the latest turn result backup, or 1 if there is none
    pub fn current_turn_number(&self) -> u32 {
        self.latest_backup_turn()
            .map(|turn| turn.saturating_add(1))
            .unwrap_or(1)
    }

    /// Back up the current 2h and trn files as the given turn number
    ///
    /// The 2h file is copied first. If the trn copy fails afterwards the 2h
    /// backup stays in place and the error names it.
    pub fn backup(&self, turn_number: u32, force: bool) -> Result<()> {
        let orders = self.require_file(SaveKind::Orders)?;
        let turn = self.require_file(SaveKind::Turn)?;

        let orders_target = orders.backup_path(turn_number)?;
        let turn_target = turn.backup_path(turn_number)?;

        if !force && (orders_target.exists() || turn_target.exists()) {
            return Err(Error::BackupExists {
                turn: turn_number,
                directory: self.directory.clone(),
            });
        }

        info!(game = %self.name, turn = turn_number, "backing up");
        copy_all(&[(&orders.path, &orders_target), (&turn.path, &turn_target)])
    }

    /// Restore the backed up files for the given turn number over the current files
    ///
    /// Either kind may be missing a backup for the turn, in which case its
    /// current file is left alone. Fails only when neither kind has one.
    pub fn restore(&self, turn_number: u32) -> Result<()> {
        let mut copies = Vec::new();

        for kind in SaveKind::ALL {
            if let Some(backup) = self.backups(kind).get(&turn_number) {
                let target = match self.current_file(kind) {
                    Some(current) => current.path.clone(),
                    None => self.directory.join(backup.canonical_name()),
                };
                copies.push((backup.path.clone(), target));
            }
        }

        if copies.is_empty() {
            return Err(Error::NoBackupFound {
                turn: turn_number,
                directory: self.directory.clone(),
            });
        }

        info!(game = %self.name, turn = turn_number, files = copies.len(), "restoring");
        copy_all(&copies)
    }

    /// Create the directory for this game, including missing parents
    pub fn create(&self) -> Result<()> {
        info!(game = %self.name, directory = %self.directory.display(), "creating game directory");
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// Delete the directory for this game and everything in it
    pub fn delete(&self) -> Result<()> {
        info!(game = %self.name, directory = %self.directory.display(), "deleting game directory");
        fs::remove_dir_all(&self.directory)?;
        Ok(())
    }

    /// The name of the replay for the given turn number of this game
    ///
    /// Example: PretendersOfReddit13
    pub fn replay_name(&self, turn_number: u32) -> String {
        format!("{}{}", self.name, turn_number)
    }

    /// Move a downloaded turn file from `folder` over the current trn file
    pub fn fetch_turn(&self, folder: &Path) -> Result<()> {
        let turn = self.require_file(SaveKind::Turn)?;
        let download = folder.join(&turn.file_name);

        if !download.is_file() {
            return Err(Error::TurnNotDownloaded(download));
        }

        info!(game = %self.name, from = %download.display(), "fetching turn");
        move_file(&download, &turn.path)
    }
}

/// Pick the current file of a kind among the directory's file names
///
/// Backups never count. With several candidates the shortest name wins, ties
/// broken by lexical order.
fn current_file_name(file_names: &[String], kind: SaveKind) -> Option<String> {
    file_names
        .iter()
        .filter(|name| kind.matches(name) && !kind.backup_regex().is_match(name))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// Copy files in order, stopping at the first failure
pub(crate) fn copy_all<P: AsRef<Path>>(pairs: &[(P, P)]) -> Result<()> {
    let mut completed = Vec::new();

    for (from, to) in pairs {
        let (from, to) = (from.as_ref(), to.as_ref());
        debug!(from = %from.display(), to = %to.display(), "copying");

        if let Err(source) = fs::copy(from, to) {
            if completed.is_empty() {
                return Err(Error::Io(source));
            }
            return Err(Error::IncompleteCopy {
                completed,
                failed: to.to_path_buf(),
                source,
            });
        }
        completed.push(to.to_path_buf());
    }

    Ok(())
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    // Rename fails across file systems
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}
