//! Config - Per-user settings and default locations
//!
//! ## Path Resolution Order
//!
//! Each path can be overridden through an environment variable:
//!
//! | Path | Override | Unix default | Windows default |
//! |---|---|---|---|
//! | installation | `D4T_BASE_DIR` | `~/dominions4` | `%APPDATA%\Dominions4` |
//! | config file | `D4T_CONFIG` | `~/.dom4tools/config.json` | `%LOCALAPPDATA%\dom4tools\config.json` |
//! | downloads | `D4T_DOWNLOADS` | `~/Downloads` | `%USERPROFILE%\Downloads` |

use crate::{Error, Result};
use directories::{BaseDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings for sending turns by mail
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub from: String,
    pub server: String,
    pub port: String,
    pub username: String,
    pub password: String,
}

/// Settings for fetching turns by mail
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapSettings {
    pub server: String,
    pub port: String,
    pub username: String,
    pub password: String,
}

/// Contents of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub submitstyle: String,
    pub getstyle: String,
    pub smtpsettings: SmtpSettings,
    pub imapsettings: ImapSettings,
}

impl Config {
    /// The template written on first run
    pub fn template() -> Self {
        Self {
            submitstyle: "smtp".to_string(),
            getstyle: "folder".to_string(),
            smtpsettings: SmtpSettings {
                from: "your@email.com".to_string(),
                server: "smtp.gmail.com".to_string(),
                port: "587".to_string(),
                username: "your.login@email.com".to_string(),
                password: String::new(),
            },
            imapsettings: ImapSettings::default(),
        }
    }

    /// Load the configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the configuration to a file readable only by its owner
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                create_private_dir(dir)?;
            }
        }

        let data = serde_json::to_string_pretty(self)?;
        write_private(path, data.as_bytes())
    }

    /// Load the configuration, creating the template first if there is none
    ///
    /// Returns the config and the paths that had to be created. Fails if the
    /// file is readable by anyone but its owner.
    pub fn load_or_init(path: &Path) -> Result<(Self, Vec<PathBuf>)> {
        let mut created = Vec::new();

        if !path.exists() {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() && !dir.exists() {
                    create_private_dir(dir)?;
                    created.push(dir.to_path_buf());
                }
            }
            Self::template().save(path)?;
            created.push(path.to_path_buf());
        }

        check_permissions(path)?;
        let config = Self::load(path)?;
        debug!(path = %path.display(), "loaded config");

        Ok((config, created))
    }

    /// Check that everything needed to send mail is set
    pub fn validate_smtp(&self) -> Result<&SmtpSettings> {
        let smtp = &self.smtpsettings;
        let required = [
            ("\"from\"", &smtp.from),
            ("port", &smtp.port),
            ("server", &smtp.server),
            ("username", &smtp.username),
            ("password", &smtp.password),
        ];

        for (field, value) in required {
            if value.is_empty() {
                return Err(Error::Config(format!("no {} set in smtpsettings", field)));
            }
        }

        Ok(smtp)
    }
}

/// Locations the tool works with
#[derive(Debug, Clone)]
pub struct Paths {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub downloads_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from the environment, falling back to platform defaults
    pub fn from_env() -> Result<Self> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;

        let base_dir = env_path("D4T_BASE_DIR").unwrap_or_else(|| default_base_dir(&base_dirs));
        let config_file =
            env_path("D4T_CONFIG").unwrap_or_else(|| default_config_file(&base_dirs));
        let downloads_dir = env_path("D4T_DOWNLOADS").unwrap_or_else(|| {
            UserDirs::new()
                .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| base_dirs.home_dir().join("Downloads"))
        });

        Ok(Self {
            base_dir,
            config_file,
            downloads_dir,
        })
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(not(windows))]
fn default_base_dir(base_dirs: &BaseDirs) -> PathBuf {
    base_dirs.home_dir().join("dominions4")
}

#[cfg(windows)]
fn default_base_dir(base_dirs: &BaseDirs) -> PathBuf {
    base_dirs.data_dir().join("Dominions4")
}

#[cfg(not(windows))]
fn default_config_file(base_dirs: &BaseDirs) -> PathBuf {
    base_dirs.home_dir().join(".dom4tools").join("config.json")
}

#[cfg(windows)]
fn default_config_file(base_dirs: &BaseDirs) -> PathBuf {
    base_dirs.data_local_dir().join("dom4tools").join("config.json")
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data)?;
    Ok(())
}

/// The config may hold mail passwords, so only its owner may read it
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode() & 0o777;
    if mode != 0o600 {
        return Err(Error::InsecureConfig {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_or_init_writes_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".dom4tools").join("config.json");

        let (config, created) = Config::load_or_init(&path).unwrap();

        assert_eq!(config, Config::template());
        assert_eq!(created, vec![path.parent().unwrap().to_path_buf(), path.clone()]);

        let (_, created) = Config::load_or_init(&path).unwrap();
        assert!(created.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_template_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        Config::load_or_init(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_readable_config_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let err = Config::load_or_init(&path).unwrap_err();

        assert!(matches!(err, Error::InsecureConfig { mode: 0o644, .. }));
    }

    #[test]
    fn test_missing_fields_default() {
        let config: Config = serde_json::from_str(r#"{"submitstyle": "smtp"}"#).unwrap();

        assert_eq!(config.submitstyle, "smtp");
        assert_eq!(config.getstyle, "");
        assert_eq!(config.smtpsettings, SmtpSettings::default());
    }

    #[test]
    fn test_validate_smtp() {
        let mut config = Config::template();
        let err = config.validate_smtp().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no password set in smtpsettings");

        config.smtpsettings.password = "hunter2".to_string();
        assert!(config.validate_smtp().is_ok());
    }

    #[test]
    fn test_json_field_names() {
        let value = serde_json::to_value(Config::template()).unwrap();
        assert_eq!(value["smtpsettings"]["server"], "smtp.gmail.com");
        assert_eq!(value["getstyle"], "folder");
    }
}
