//! Commands - CLI verb implementations

use crate::{
    command_result::{CommandResult, Level, Operation},
    installation::Created,
    mailer::Submission,
    replay::{self, TurnRange},
    savefile::SaveKind,
    session::Session,
    Error, Result, TURN_SUBMISSION_ADDRESS,
};
use tracing::debug;

/// Trait for executable commands
///
/// Output is added to `result` as the command goes, so lines written before
/// a failure are still reported.
pub trait Command {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()>;
    fn operation(&self) -> Operation;
}

/// Verbs whose first argument is a game name
const GAME_VERBS: &[&str] = &["cd", "backup", "restore", "replay", "submit", "resubmit", "get"];

/// Print the installation directory, or the directory of a game
pub struct CdCommand {
    pub game: Option<String>,
}

impl Command for CdCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let directory = match self.game {
            Some(ref name) => session.find_game(name)?.directory,
            None => session.installation.base_path.clone(),
        };
        result.output(directory.display().to_string());
        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Cd
    }
}

/// List all games of the installation
pub struct ListCommand;

impl Command for ListCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let collection = session.installation.games()?;
        for name in collection.names() {
            result.output(name);
        }
        for warning in &collection.warnings {
            result.warn(warning.to_string());
        }
        result.add_detail("games", serde_json::json!(collection.names()));

        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::List
    }
}

/// Create a new, empty game directory
pub struct CreateCommand {
    pub name: String,
    pub force: bool,
}

impl Command for CreateCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let created = session.installation.create_game(&self.name, self.force)?;
        match created {
            Created::New => {
                result.output(format!("Creating {}", self.name));
            }
            Created::Replaced { name, directory } => {
                result.info(format!(
                    "Overwriting existing game {} at {}",
                    name,
                    directory.display()
                ));
            }
        }
        result.add_detail(
            "directory",
            serde_json::json!(session.installation.game_directory(&self.name)),
        );

        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Create
    }
}

/// Back up the current files of a game as a turn
pub struct BackupCommand {
    pub game: String,
    pub turn: u32,
    pub force: bool,
}

impl Command for BackupCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let game = session.find_game(&self.game)?;
        result.output(format!(
            "Backing up game {}, turn number {}",
            game.name, self.turn
        ));
        game.backup(self.turn, self.force)?;
        result.add_detail("turn", serde_json::json!(self.turn));

        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Backup
    }
}

/// Restore the backed up files of a turn
pub struct RestoreCommand {
    pub game: String,
    pub turn: u32,
}

impl Command for RestoreCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let game = session.find_game(&self.game)?;
        result.output(format!("Restoring turn {} for game {}", self.turn, game.name));
        game.restore(self.turn)?;
        result.add_detail("turn", serde_json::json!(self.turn));

        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Restore
    }
}

/// Create (or delete) one game per backed up turn
pub struct ReplayCommand {
    pub game: String,
    pub force: bool,
    pub destroy: bool,
    pub start: u32,
    pub count: Option<u32>,
}

impl Command for ReplayCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let game = session.find_game(&self.game)?;
        let range = TurnRange::resolve(&game, self.start, self.count)?;
        let steps = if self.destroy {
            result.output(format!(
                "Deleting replays for {}, starting at {}, ending at {}",
                game.name, range.start, range.end
            ));
            replay::destroy(&session.installation, &game, range)?
        } else {
            result.output(format!(
                "Replaying turns for {}, starting at {}, ending at {}",
                game.name, range.start, range.end
            ));
            replay::materialize(&session.installation, &game, range, self.force)?
        };

        for step in &steps {
            if step.is_skip() {
                result.warn(step.to_string());
            } else {
                result.output(step.to_string());
            }
        }
        result.add_detail("steps", serde_json::json!(steps));

        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Replay
    }
}

/// Mail the current orders of a game
pub struct SubmitCommand {
    pub game: String,
    pub turn: Option<u32>,
    pub skip_backup: bool,
    pub resubmit: bool,
}

impl SubmitCommand {
    fn operation_name(&self) -> Operation {
        if self.resubmit {
            Operation::Resubmit
        } else {
            Operation::Submit
        }
    }
}

impl Command for SubmitCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let game = session.find_game(&self.game)?;

        let turn = match self.turn {
            Some(turn) if turn > 0 => turn,
            _ if self.resubmit => game.current_turn_number().saturating_sub(1),
            _ => game.current_turn_number(),
        };
        if turn == 0 {
            return Err(Error::NoTurnToSubmit(game.name.clone()));
        }

        if !self.skip_backup {
            result.output(format!(
                "Backing up game {}, turn number {}",
                game.name, turn
            ));
            game.backup(turn, self.resubmit)?;
        }

        let config = &session.config;
        if !matches!(config.submitstyle.as_str(), "smtp" | "mailsend") {
            return Err(Error::Config("No submitstyle set in config".to_string()));
        }
        let smtp = config.validate_smtp()?;
        let orders = game.require_file(SaveKind::Orders)?;

        let submission = Submission {
            to: TURN_SUBMISSION_ADDRESS.to_string(),
            from: smtp.from.clone(),
            server: smtp.server.clone(),
            port: smtp.port.clone(),
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            subject: format!("{} turn {}", game.name, turn),
            attachment: orders.path.clone(),
        };

        result.output(format!("Submitting game {}, turn {}", game.name, turn));
        let mailer = session.mailer();
        debug!(transport = mailer.name(), "submitting");
        mailer.send(&submission)?;
        result.add_detail("turn", serde_json::json!(turn));

        Ok(())
    }

    fn operation(&self) -> Operation {
        self.operation_name()
    }
}

/// Fetch a downloaded turn file into a game
pub struct GetCommand {
    pub game: String,
}

impl Command for GetCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        let game = session.find_game(&self.game)?;

        if session.config.getstyle != "folder" {
            return Err(Error::Config("No getstyle set in config".to_string()));
        }
        game.fetch_turn(&session.downloads_dir)?;
        result.output(format!("Got turn for {}", game.name));
        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Get
    }
}

/// Print the version
pub struct VersionCommand {
    pub version: String,
    pub prerelease: Option<String>,
    pub revision: Option<String>,
}

impl VersionCommand {
    /// Version of this build
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            prerelease: option_env!("D4T_PRERELEASE").map(str::to_string),
            revision: option_env!("D4T_GIT_COMMIT").map(str::to_string),
        }
    }

    pub fn version_string(&self) -> String {
        let mut version = format!("dom4tools v{}", self.version);
        if let Some(ref prerelease) = self.prerelease {
            version.push_str(&format!("-{}", prerelease));
            if let Some(ref revision) = self.revision {
                version.push_str(&format!(" ({})", revision));
            }
        }
        version
    }
}

impl Command for VersionCommand {
    fn execute(&self, _session: &Session, result: &mut CommandResult) -> Result<()> {
        result.output(self.version_string());
        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Version
    }
}

/// Print completion candidates for shell scripts instead of running a verb
///
/// Without a verb the verb names are printed, after a verb taking a game the
/// game names, after any other verb nothing.
pub struct CompleteCommand {
    pub verbs: Vec<String>,
    pub verb: Option<String>,
}

impl Command for CompleteCommand {
    fn execute(&self, session: &Session, result: &mut CommandResult) -> Result<()> {
        match self.verb.as_deref() {
            None => {
                for verb in &self.verbs {
                    result.output(verb.as_str());
                }
            }
            Some(verb) if GAME_VERBS.contains(&verb) => {
                let mut games = CommandResult::new(Operation::List);
                ListCommand.execute(session, &mut games)?;
                result.lines.extend(
                    games
                        .lines
                        .into_iter()
                        .filter(|line| line.level == Level::Output),
                );
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn operation(&self) -> Operation {
        Operation::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::installation::Installation;
    use crate::mailer::Mailer;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingMailer {
        sent: Rc<RefCell<Vec<Submission>>>,
    }

    impl Mailer for RecordingMailer {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn send(&self, submission: &Submission) -> Result<()> {
            self.sent.borrow_mut().push(submission.clone());
            Ok(())
        }
    }

    struct RefusingMailer;

    impl Mailer for RefusingMailer {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn send(&self, _submission: &Submission) -> Result<()> {
            Err(Error::MailFailed("connection refused".to_string()))
        }
    }

    trait Run {
        fn run(&self, session: &Session) -> Result<CommandResult>;
    }

    impl<C: Command> Run for C {
        fn run(&self, session: &Session) -> Result<CommandResult> {
            let mut result = CommandResult::new(self.operation());
            self.execute(session, &mut result)?;
            Ok(result)
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn session(config: Config) -> (TempDir, Session, RecordingMailer) {
        let root = TempDir::new().unwrap();
        let installation = Installation::new(root.path().join("dominions4"));
        let dir = installation.game_directory("Abysia");
        fs::create_dir_all(&dir).unwrap();
        write(&dir, "early_abysia.2h", "orders");
        write(&dir, "early_abysia.trn", "turn");
        fs::create_dir_all(root.path().join("Downloads")).unwrap();

        let mailer = RecordingMailer::default();
        let session = Session::new(
            installation,
            config,
            root.path().join("Downloads"),
            Box::new(mailer.clone()),
        );
        (root, session, mailer)
    }

    fn smtp_config() -> Config {
        let mut config = Config::template();
        config.smtpsettings.password = "secret".to_string();
        config
    }

    fn texts(result: &CommandResult) -> Vec<&str> {
        result.lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn test_cd_prints_directories() {
        let (_root, session, _) = session(Config::template());

        let result = CdCommand { game: None }.run(&session).unwrap();
        assert_eq!(
            texts(&result),
            vec![session.installation.base_path.display().to_string()]
        );

        let result = CdCommand {
            game: Some("abysia".to_string()),
        }
        .run(&session)
        .unwrap();
        assert_eq!(
            texts(&result),
            vec![session.installation.game_directory("Abysia").display().to_string()]
        );
    }

    #[test]
    fn test_list() {
        let (_root, session, _) = session(Config::template());
        session.installation.create_game("Ulm", false).unwrap();

        let result = ListCommand.run(&session).unwrap();

        assert_eq!(texts(&result), vec!["Abysia", "Ulm"]);
    }

    #[test]
    fn test_create_then_backup_then_restore() {
        let (_root, session, _) = session(Config::template());

        let result = CreateCommand {
            name: "Ulm".to_string(),
            force: false,
        }
        .run(&session)
        .unwrap();
        assert_eq!(texts(&result), vec!["Creating Ulm"]);

        BackupCommand {
            game: "Abysia".to_string(),
            turn: 1,
            force: false,
        }
        .run(&session)
        .unwrap();

        let dir = session.installation.game_directory("Abysia");
        write(&dir, "early_abysia.trn", "turn 2");

        let result = RestoreCommand {
            game: "Abysia".to_string(),
            turn: 1,
        }
        .run(&session)
        .unwrap();
        assert_eq!(texts(&result), vec!["Restoring turn 1 for game Abysia"]);
        assert_eq!(fs::read_to_string(dir.join("early_abysia.trn")).unwrap(), "turn");
    }

    #[test]
    fn test_replay_reports_each_turn() {
        let (_root, session, _) = session(Config::template());
        let dir = session.installation.game_directory("Abysia");
        write(&dir, "early_abysia-1.2h", "o1");
        write(&dir, "early_abysia-1.trn", "t1");
        write(&dir, "early_abysia-2.trn", "t2");

        let result = ReplayCommand {
            game: "Abysia".to_string(),
            force: false,
            destroy: false,
            start: 1,
            count: None,
        }
        .run(&session)
        .unwrap();

        assert_eq!(
            texts(&result),
            vec![
                "Replaying turns for Abysia, starting at 1, ending at 2",
                "Creating Abysia1",
                "No .2h file found for turn 2, skipping",
            ]
        );
        assert_eq!(result.lines[2].level, Level::Warn);
    }

    #[test]
    fn test_submit_backs_up_and_mails_orders() {
        let (_root, session, mailer) = session(smtp_config());

        let result = SubmitCommand {
            game: "Abysia".to_string(),
            turn: None,
            skip_backup: false,
            resubmit: false,
        }
        .run(&session)
        .unwrap();

        assert_eq!(result.operation, Operation::Submit);
        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Abysia turn 1");
        assert_eq!(sent[0].to, TURN_SUBMISSION_ADDRESS);
        assert!(sent[0].attachment.ends_with("early_abysia.2h"));
        assert!(session
            .installation
            .game_directory("Abysia")
            .join("early_abysia-1.trn")
            .exists());
    }

    #[test]
    fn test_resubmit_uses_previous_turn_and_forces_backup() {
        let (_root, session, mailer) = session(smtp_config());
        let dir = session.installation.game_directory("Abysia");
        write(&dir, "early_abysia-1.2h", "old");
        write(&dir, "early_abysia-1.trn", "old");

        SubmitCommand {
            game: "Abysia".to_string(),
            turn: None,
            skip_backup: false,
            resubmit: true,
        }
        .run(&session)
        .unwrap();

        assert_eq!(mailer.sent.borrow()[0].subject, "Abysia turn 1");
        assert_eq!(fs::read_to_string(dir.join("early_abysia-1.2h")).unwrap(), "orders");
    }

    #[test]
    fn test_resubmit_without_backups_has_no_turn() {
        let (_root, session, mailer) = session(smtp_config());

        let err = SubmitCommand {
            game: "Abysia".to_string(),
            turn: None,
            skip_backup: true,
            resubmit: true,
        }
        .run(&session)
        .unwrap_err();

        assert!(matches!(err, Error::NoTurnToSubmit(_)));
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn test_submit_requires_smtp_settings() {
        let (_root, session, mailer) = session(Config::template());

        let err = SubmitCommand {
            game: "Abysia".to_string(),
            turn: Some(3),
            skip_backup: true,
            resubmit: false,
        }
        .run(&session)
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn test_get_moves_downloaded_turn() {
        let (root, session, _) = session(Config::template());
        write(&root.path().join("Downloads"), "early_abysia.trn", "fresh");

        let result = GetCommand {
            game: "Abysia".to_string(),
        }
        .run(&session)
        .unwrap();

        assert_eq!(texts(&result), vec!["Got turn for Abysia"]);
        let dir = session.installation.game_directory("Abysia");
        assert_eq!(fs::read_to_string(dir.join("early_abysia.trn")).unwrap(), "fresh");
    }

    #[test]
    fn test_failed_submit_keeps_backup_output() {
        let (root, _, _) = session(smtp_config());
        let session = Session::new(
            Installation::new(root.path().join("dominions4")),
            smtp_config(),
            root.path().join("Downloads"),
            Box::new(RefusingMailer),
        );

        let result = session.call(&SubmitCommand {
            game: "Abysia".to_string(),
            turn: Some(2),
            skip_backup: false,
            resubmit: false,
        });

        assert!(result.is_failure());
        assert_eq!(
            texts(&result),
            vec![
                "Backing up game Abysia, turn number 2",
                "Submitting game Abysia, turn 2",
                "Failed sending mail: connection refused",
            ]
        );
        assert_eq!(result.lines[2].level, Level::Error);
        let dir = session.installation.game_directory("Abysia");
        assert!(dir.join("early_abysia-2.2h").exists());
    }

    #[test]
    fn test_submit_accepts_mailsend_style() {
        let mut config = smtp_config();
        config.submitstyle = "mailsend".to_string();
        let (_root, session, mailer) = session(config);

        SubmitCommand {
            game: "Abysia".to_string(),
            turn: Some(1),
            skip_backup: true,
            resubmit: false,
        }
        .run(&session)
        .unwrap();

        assert_eq!(mailer.sent.borrow().len(), 1);
    }

    fn complete(session: &Session, verb: Option<&str>) -> Vec<String> {
        let result = CompleteCommand {
            verbs: vec!["cd".to_string(), "list".to_string(), "create".to_string()],
            verb: verb.map(str::to_string),
        }
        .run(session)
        .unwrap();
        result.lines.into_iter().map(|line| line.text).collect()
    }

    #[test]
    fn test_complete_verbs_and_games() {
        let (_root, session, _) = session(Config::template());
        session.installation.create_game("Ulm", false).unwrap();

        assert_eq!(complete(&session, None), vec!["cd", "list", "create"]);
        assert_eq!(complete(&session, Some("backup")), vec!["Abysia", "Ulm"]);
        assert_eq!(complete(&session, Some("replay")), vec!["Abysia", "Ulm"]);
        assert!(complete(&session, Some("create")).is_empty());
        assert!(complete(&session, Some("version")).is_empty());
    }

    #[test]
    fn test_version_string() {
        let plain = VersionCommand {
            version: "1.2.0".to_string(),
            prerelease: None,
            revision: Some("abc123".to_string()),
        };
        assert_eq!(plain.version_string(), "dom4tools v1.2.0");

        let dev = VersionCommand {
            version: "1.2.0".to_string(),
            prerelease: Some("dev".to_string()),
            revision: Some("abc123".to_string()),
        };
        assert_eq!(dev.version_string(), "dom4tools v1.2.0-dev (abc123)");
    }
}
