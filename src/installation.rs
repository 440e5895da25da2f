//! Installation - A Dominions 4 data directory and the games saved in it

use crate::{
    game::Game, normalize_name, same_game_name, validate_game_name, Error, Result,
    SAVED_GAMES_DIR,
};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A Dominions 4 installation
///
/// Holds no games itself: every call to [`Installation::games`] reads the
/// saved games directory again, so results always reflect the disk.
#[derive(Debug, Clone)]
pub struct Installation {
    pub base_path: PathBuf,
}

/// A game directory that could not be loaded during a scan
#[derive(Debug)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub error: Error,
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Skipped {}: {}", self.path.display(), self.error)
    }
}

/// Games found in an installation, plus the directories that were skipped
#[derive(Debug, Default)]
pub struct GameCollection {
    pub games: Vec<Game>,
    pub warnings: Vec<ScanWarning>,
}

/// What creating a game did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    New,
    /// An existing game with the same name was deleted first
    Replaced { name: String, directory: PathBuf },
}

impl Installation {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding one directory per game
    pub fn saved_games_path(&self) -> PathBuf {
        self.base_path.join(SAVED_GAMES_DIR)
    }

    /// Directory a game with the given name lives in
    pub fn game_directory(&self, name: &str) -> PathBuf {
        self.saved_games_path().join(name)
    }

    /// Read all games from the saved games directory
    ///
    /// Entries that are not directories or have invalid names are ignored.
    /// Game directories that fail to load are reported as warnings.
    pub fn games(&self) -> Result<GameCollection> {
        let saved_games = self.saved_games_path();
        let entries = fs::read_dir(&saved_games).map_err(|source| Error::DirectoryUnreadable {
            path: saved_games.clone(),
            source,
        })?;

        let mut collection = GameCollection::default();

        for entry in entries {
            let entry = entry.map_err(|source| Error::DirectoryUnreadable {
                path: saved_games.clone(),
                source,
            })?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = %path.display(), "skipping non UTF-8 directory name");
                continue;
            };

            if validate_game_name(&name).is_err() {
                debug!(%name, "skipping directory with invalid game name");
                continue;
            }

            match Game::load(name, &path) {
                Ok(game) => collection.games.push(game),
                Err(error) => {
                    warn!(path = %path.display(), %error, "could not load game");
                    collection.warnings.push(ScanWarning { path, error });
                }
            }
        }

        collection
            .games
            .sort_by(|a, b| normalize_name(&a.name).cmp(&normalize_name(&b.name)));

        Ok(collection)
    }

    /// Find a game by name, ignoring case
    pub fn find_game(&self, name: &str) -> Result<Game> {
        self.games()?.find_by_name(name).cloned()
    }

    /// Create the directory for a new game
    ///
    /// With `force`, an existing game of the same name (ignoring case) is
    /// deleted first; without it the existing game is an error.
    pub fn create_game(&self, name: &str, force: bool) -> Result<Created> {
        validate_game_name(name).map_err(|reasons| Error::InvalidName {
            name: name.to_string(),
            reasons,
        })?;

        let collection = self.games()?;
        let created = match collection.find_by_name(name) {
            Ok(existing) if force => {
                existing.delete()?;
                Created::Replaced {
                    name: existing.name.clone(),
                    directory: existing.directory.clone(),
                }
            }
            Ok(existing) => {
                return Err(Error::DuplicateGame {
                    name: existing.name.clone(),
                    directory: existing.directory.clone(),
                })
            }
            Err(_) => Created::New,
        };

        Game::new(name, self.game_directory(name)).create()?;
        Ok(created)
    }
}

impl GameCollection {
    /// Find a game by name, ignoring case
    pub fn find_by_name(&self, name: &str) -> Result<&Game> {
        self.games
            .iter()
            .find(|game| same_game_name(&game.name, name))
            .ok_or_else(|| Error::GameNotFound(name.to_string()))
    }

    /// Names of all games, in collection order
    pub fn names(&self) -> Vec<&str> {
        self.games.iter().map(|game| game.name.as_str()).collect()
    }
}
