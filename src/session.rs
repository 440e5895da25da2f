//! Session - Everything a command needs to run

use crate::{
    command_result::{CommandResult, Operation},
    commands::Command,
    config::{Config, Paths},
    game::Game,
    installation::Installation,
    mailer::{Mailer, Mailsend, SmtpMailer},
    Error, Result,
};
use std::path::PathBuf;
use tracing::debug;

/// Mid-level: Holds the installation, configuration and mailer for one invocation
pub struct Session {
    pub installation: Installation,
    pub config: Config,
    pub downloads_dir: PathBuf,
    mailer: Box<dyn Mailer>,
}

impl Session {
    /// Create a new session
    pub fn new(
        installation: Installation,
        config: Config,
        downloads_dir: PathBuf,
        mailer: Box<dyn Mailer>,
    ) -> Self {
        Self {
            installation,
            config,
            downloads_dir,
            mailer,
        }
    }

    /// Open a session for the given paths, creating the default config on first run
    ///
    /// The mail transport follows the config's `submitstyle`. Returns the
    /// session and an info result naming anything that had to be created.
    pub fn open(paths: &Paths) -> Result<(Self, CommandResult)> {
        let mut notices = CommandResult::new(Operation::Config);

        if !paths.config_file.exists() {
            notices.info(format!(
                "No configuration found at {}, creating default config",
                paths.config_file.display()
            ));
        }
        let (config, created) = Config::load_or_init(&paths.config_file)?;
        for path in created {
            notices.info(format!("Created {}", path.display()));
        }

        let mailer = transport(&config);
        let session = Self::new(
            Installation::new(&paths.base_dir),
            config,
            paths.downloads_dir.clone(),
            mailer,
        );
        Ok((session, notices))
    }

    /// Look up a game by name in a fresh scan of the installation
    pub fn find_game(&self, name: &str) -> Result<Game> {
        self.installation.find_game(name)
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    /// Execute a command, turning errors into a failed result
    ///
    /// Lines the command wrote before failing are kept ahead of the error.
    pub fn call(&self, command: &dyn Command) -> CommandResult {
        let mut result = CommandResult::new(command.operation());
        if let Err(error) = command.execute(self, &mut result) {
            debug!(operation = %command.operation(), ?error, "command failed");
            report_error(&mut result, &error);
        }
        result
    }
}

/// Mail transport for a config: `mailsend` runs the external program, anything else speaks SMTP
fn transport(config: &Config) -> Box<dyn Mailer> {
    match config.submitstyle.as_str() {
        "mailsend" => Box::new(Mailsend::new(None)),
        _ => Box::new(SmtpMailer::new()),
    }
}

/// Mark a result failed, with follow-up hints where the user can act on them
fn report_error(result: &mut CommandResult, error: &Error) {
    result.success = false;
    match error {
        Error::InvalidName { reasons, .. } if !reasons.is_empty() => {
            for reason in reasons {
                result.error(reason.clone());
            }
        }
        Error::DuplicateGame { .. } => {
            result
                .error(error.to_string())
                .error("if you want to overwrite, call with -f or --force");
        }
        _ => {
            result.error(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CreateCommand;
    use std::fs;
    use tempfile::TempDir;

    fn paths(root: &TempDir) -> Paths {
        Paths {
            base_dir: root.path().join("dominions4"),
            config_file: root.path().join("config").join("config.json"),
            downloads_dir: root.path().join("Downloads"),
        }
    }

    #[test]
    fn test_open_creates_config() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);

        let (session, notices) = Session::open(&paths).unwrap();

        assert!(paths.config_file.exists());
        assert_eq!(session.config, Config::template());
        assert_eq!(notices.lines.len(), 3);

        let (_, notices) = Session::open(&paths).unwrap();
        assert!(notices.lines.is_empty());
    }

    #[test]
    fn test_transport_follows_submitstyle() {
        let mut config = Config::template();
        assert_eq!(transport(&config).name(), "smtp");

        config.submitstyle = "mailsend".to_string();
        assert_eq!(transport(&config).name(), "mailsend");
    }

    #[test]
    fn test_call_reports_duplicate_with_hint() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);
        fs::create_dir_all(paths.base_dir.join("savedgames").join("Abysia")).unwrap();
        let (session, _) = Session::open(&paths).unwrap();

        let result = session.call(&CreateCommand {
            name: "abysia".to_string(),
            force: false,
        });

        assert!(result.is_failure());
        assert_eq!(result.lines.len(), 2);
        assert!(result.lines[0].text.starts_with("Game already exists: Abysia"));
    }

    #[test]
    fn test_call_reports_invalid_name() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);
        fs::create_dir_all(paths.base_dir.join("savedgames")).unwrap();
        let (session, _) = Session::open(&paths).unwrap();

        let result = session.call(&CreateCommand {
            name: "newlords".to_string(),
            force: false,
        });

        assert!(result.is_failure());
        assert_eq!(result.lines[0].text, "\"newlords\" is a reserved game name");
    }
}
