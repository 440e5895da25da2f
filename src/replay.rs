//! Replay - One new game per backed up turn, so old turns can be opened in Dominions 4

use crate::{
    game::{copy_all, Game},
    installation::{Created, Installation},
    savefile::SaveKind,
    Error, Result,
};
use serde::Serialize;
use tracing::info;

/// Inclusive range of turns to replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRange {
    pub start: u32,
    pub end: u32,
}

impl TurnRange {
    /// Range from `start` covering `count` turns, capped at the latest turn backup
    ///
    /// Without a count (or with a count of 0) the range ends at the latest backup.
    pub fn resolve(game: &Game, start: u32, count: Option<u32>) -> Result<Self> {
        let latest = game
            .latest_backup_turn()
            .ok_or_else(|| Error::NoBackups(game.name.clone()))?;

        let end = match count {
            Some(count) if count > 0 => start.saturating_add(count - 1).min(latest),
            _ => latest,
        };

        Ok(Self { start, end })
    }

    pub fn turns(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// What happened to a single turn of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplayStep {
    Created { turn: u32, game: String },
    Replaced { turn: u32, game: String },
    Deleted { turn: u32, game: String },
    MissingBackup { turn: u32, kind: SaveKind },
    AlreadyExists { turn: u32, game: String },
    NotFound { turn: u32, game: String },
}

impl ReplayStep {
    /// Did this turn get skipped?
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ReplayStep::MissingBackup { .. }
                | ReplayStep::AlreadyExists { .. }
                | ReplayStep::NotFound { .. }
        )
    }
}

impl std::fmt::Display for ReplayStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayStep::Created { game, .. } => write!(f, "Creating {}", game),
            ReplayStep::Replaced { game, .. } => write!(f, "Overwriting {}", game),
            ReplayStep::Deleted { game, .. } => write!(f, "Deleting {}", game),
            ReplayStep::MissingBackup { turn, kind } => {
                write!(f, "No .{} file found for turn {}, skipping", kind, turn)
            }
            ReplayStep::AlreadyExists { turn, game } => write!(
                f,
                "Game {} for turn {} already exists, skipping (use --force to overwrite)",
                game, turn
            ),
            ReplayStep::NotFound { turn, .. } => write!(f, "No game found for turn {}", turn),
        }
    }
}

/// Create a game for every turn in `range` holding that turn's backups under canonical names
///
/// Turns without both a trn and a 2h backup are skipped, as are turns whose
/// replay game exists when `force` is not set.
pub fn materialize(
    installation: &Installation,
    game: &Game,
    range: TurnRange,
    force: bool,
) -> Result<Vec<ReplayStep>> {
    info!(game = %game.name, start = range.start, end = range.end, "creating replays");
    let mut steps = Vec::new();

    for turn in range.turns() {
        let Some(trn) = game.turn_backups.get(&turn) else {
            steps.push(ReplayStep::MissingBackup {
                turn,
                kind: SaveKind::Turn,
            });
            continue;
        };
        let Some(twoh) = game.orders_backups.get(&turn) else {
            steps.push(ReplayStep::MissingBackup {
                turn,
                kind: SaveKind::Orders,
            });
            continue;
        };

        let replay_name = game.replay_name(turn);
        let step = match installation.create_game(&replay_name, force) {
            Ok(Created::New) => ReplayStep::Created {
                turn,
                game: replay_name.clone(),
            },
            Ok(Created::Replaced { .. }) => ReplayStep::Replaced {
                turn,
                game: replay_name.clone(),
            },
            Err(Error::DuplicateGame { name, .. }) => {
                steps.push(ReplayStep::AlreadyExists { turn, game: name });
                continue;
            }
            Err(e) => return Err(e),
        };

        let directory = installation.game_directory(&replay_name);
        copy_all(&[
            (trn.path.clone(), directory.join(trn.canonical_name())),
            (twoh.path.clone(), directory.join(twoh.canonical_name())),
        ])?;

        steps.push(step);
    }

    Ok(steps)
}

/// Delete the replay game of every turn in `range`
pub fn destroy(installation: &Installation, game: &Game, range: TurnRange) -> Result<Vec<ReplayStep>> {
    info!(game = %game.name, start = range.start, end = range.end, "deleting replays");
    let collection = installation.games()?;
    let mut steps = Vec::new();

    for turn in range.turns() {
        let replay_name = game.replay_name(turn);

        match collection.find_by_name(&replay_name) {
            Ok(replay) => {
                replay.delete()?;
                steps.push(ReplayStep::Deleted {
                    turn,
                    game: replay.name.clone(),
                });
            }
            Err(_) => steps.push(ReplayStep::NotFound {
                turn,
                game: replay_name,
            }),
        }
    }

    Ok(steps)
}
