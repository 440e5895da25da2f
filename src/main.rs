//! d4t - Manage your Dominions 4 games from the command line

use clap::{CommandFactory, Parser, Subcommand};
use dom4tools::command_result::{CommandResult, Operation};
use dom4tools::commands::{
    BackupCommand, CdCommand, Command, CompleteCommand, CreateCommand, GetCommand, ListCommand,
    ReplayCommand, RestoreCommand, SubmitCommand, VersionCommand,
};
use dom4tools::config::Paths;
use dom4tools::formatters::Formatter;
use dom4tools::{Formatters, Session};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "d4t")]
#[command(author, version, about = "Manage your Dominions 4 games from the command line.", long_about = None)]
#[command(after_help = "With --bash-completion anywhere on the command line, completion candidates are printed instead of running a command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Plain output without prefixes or colors
    #[arg(long, global = true)]
    simple_output: bool,

    /// Output formatter (shell, text, json)
    #[arg(long, global = true, default_value = "shell")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print name of Dominions 4 data directory OR specified game directory (for use in scripting)
    Cd {
        /// Name of the game
        game: Option<String>,
    },

    /// List all games
    List,

    /// Create a new game
    Create {
        /// Name of the game
        game: String,

        /// Overwrite existing game
        #[arg(short, long)]
        force: bool,
    },

    /// Back up the current trn and 2h files of a game as a turn, to restore them later
    Backup {
        /// Name of the game to back up
        game: String,

        /// Back up which turn number?
        turn: u32,

        /// Overwrite existing backup
        #[arg(short, long)]
        force: bool,
    },

    /// Restore all backed up files for a given turn of a game
    Restore {
        /// Name of the game to restore for
        game: String,

        /// Restore which turn number?
        turn: u32,
    },

    /// Create new games for every backed up turn of a game
    Replay {
        /// Name of the game to replay
        game: String,

        /// Overwrite existing games
        #[arg(short, long)]
        force: bool,

        /// Delete games instead of creating them
        #[arg(short, long = "delete")]
        destroy: bool,

        /// Start on which turn?
        #[arg(short, long = "start-turn", default_value_t = 1)]
        start: u32,

        /// Replay how many turns?
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Submit a game
    Submit {
        /// Name of the game to submit
        game: String,

        /// Submit which turn? Needed for backup
        turn: Option<u32>,

        /// Don't back up
        #[arg(short = 'b', long)]
        skip_backup: bool,
    },

    /// Resubmit a game
    Resubmit {
        /// Name of the game to resubmit
        game: String,

        /// Resubmit which turn? Needed for backup
        turn: Option<u32>,
    },

    /// Get the turn for a game
    Get {
        /// Name of the game you want to get the turn for
        game: String,
    },

    /// Print the version
    Version,
}

impl Commands {
    fn into_command(self) -> Box<dyn Command> {
        match self {
            Commands::Cd { game } => Box::new(CdCommand { game }),
            Commands::List => Box::new(ListCommand),
            Commands::Create { game, force } => Box::new(CreateCommand { name: game, force }),
            Commands::Backup { game, turn, force } => {
                Box::new(BackupCommand { game, turn, force })
            }
            Commands::Restore { game, turn } => Box::new(RestoreCommand { game, turn }),
            Commands::Replay {
                game,
                force,
                destroy,
                start,
                count,
            } => Box::new(ReplayCommand {
                game,
                force,
                destroy,
                start,
                count,
            }),
            Commands::Submit {
                game,
                turn,
                skip_backup,
            } => Box::new(SubmitCommand {
                game,
                turn,
                skip_backup,
                resubmit: false,
            }),
            Commands::Resubmit { game, turn } => Box::new(SubmitCommand {
                game,
                turn,
                skip_backup: false,
                resubmit: true,
            }),
            Commands::Get { game } => Box::new(GetCommand { game }),
            Commands::Version => Box::new(VersionCommand::current()),
        }
    }
}

/// Completion scripts pass this to get candidates instead of running a command
const COMPLETION_FLAG: &str = "--bash-completion";

fn main() {
    init_logging();

    let mut args: Vec<String> = std::env::args().collect();
    if let Some(index) = args.iter().position(|arg| arg == COMPLETION_FLAG) {
        args.remove(index);
        complete(&args[1..]);
    }

    let cli = Cli::parse_from(args);

    // cd output is consumed by scripts, keep it bare
    let formatter_name = if cli.simple_output || matches!(cli.command, Commands::Cd { .. }) {
        "text"
    } else {
        cli.format.as_str()
    };
    let formatter = Formatters::by_name(formatter_name);

    let command = cli.command.into_command();
    let results = run(command.as_ref());
    finish(formatter.as_ref(), &results);
}

/// Print completion candidates for the words typed so far and exit
///
/// Setup notices are left out so scripts only see candidates.
fn complete(words: &[String]) -> ! {
    let command = CompleteCommand {
        verbs: Cli::command()
            .get_subcommands()
            .map(|verb| verb.get_name().to_string())
            .collect(),
        verb: words.iter().find(|word| !word.starts_with('-')).cloned(),
    };

    let results = run(&command);
    let last = results.len().saturating_sub(1);
    finish(Formatters::by_name("text").as_ref(), &results[last..]);
}

/// Write results and exit, failing if the last result failed
fn finish(formatter: &dyn Formatter, results: &[CommandResult]) -> ! {
    let mut stdout = io::stdout();
    for result in results {
        if let Err(e) = write_result(formatter, result, &mut stdout) {
            eprintln!("Output error: {}", e);
            std::process::exit(1);
        }
    }

    let success = results.last().map(CommandResult::is_success).unwrap_or(false);
    std::process::exit(if success { 0 } else { 1 });
}

/// Run a command, returning setup notices (if any) followed by the command's result
fn run(command: &dyn Command) -> Vec<CommandResult> {
    let paths = match Paths::from_env() {
        Ok(paths) => paths,
        Err(e) => return vec![CommandResult::failure(Operation::Error, e.to_string())],
    };

    let (session, notices) = match Session::open(&paths) {
        Ok(opened) => opened,
        Err(e) => return vec![CommandResult::failure(Operation::Config, e.to_string())],
    };

    let result = session.call(command);

    if notices.lines.is_empty() {
        vec![result]
    } else {
        vec![notices, result]
    }
}

fn write_result(
    formatter: &dyn Formatter,
    result: &CommandResult,
    writer: &mut dyn Write,
) -> io::Result<()> {
    formatter.write_to(result, writer)?;
    writer.flush()
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("D4T_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
