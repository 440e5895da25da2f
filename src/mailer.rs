//! Mailer - Sending turn files by mail
//!
//! `SmtpMailer` talks to the configured SMTP server directly, `Mailsend`
//! hands the submission to the external `mailsend` program.

use crate::{Error, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const TIMEOUT_SECS: u64 = 10;
const POLL_INTERVAL_MS: u64 = 50;
const SYSTEM_PATH: &str = "mailsend";

/// Port speaking TLS from the first byte, every other port upgrades with STARTTLS
const SMTPS_PORT: u16 = 465;

/// A turn file to be mailed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub to: String,
    pub from: String,
    pub server: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub subject: String,
    pub attachment: PathBuf,
}

/// Something that can deliver a submission
pub trait Mailer {
    /// Short transport name, for logs
    fn name(&self) -> &'static str;
    fn send(&self, submission: &Submission) -> Result<()>;
}

/// Sends mail over SMTP with the configured credentials
pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(TIMEOUT_SECS),
        }
    }

    /// The mail for a submission: empty body, the turn file as attachment
    pub fn message(submission: &Submission) -> Result<Message> {
        let from = submission.from.parse::<Mailbox>().map_err(|e| {
            Error::Config(format!("invalid \"from\" in smtpsettings: {}", e))
        })?;
        let to = submission
            .to
            .parse::<Mailbox>()
            .map_err(|e| Error::MailFailed(format!("invalid recipient: {}", e)))?;

        let file_name = submission
            .attachment
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = ContentType::parse("application/octet-stream")
            .map_err(|e| Error::MailFailed(e.to_string()))?;
        let attachment = Attachment::new(file_name).body(fs::read(&submission.attachment)?, content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(submission.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(String::new()))
                    .singlepart(attachment),
            )
            .map_err(|e| Error::MailFailed(e.to_string()))
    }

    fn transport(&self, submission: &Submission) -> Result<SmtpTransport> {
        let port = submission.port.parse::<u16>().map_err(|_| {
            Error::Config(format!("invalid port \"{}\" in smtpsettings", submission.port))
        })?;

        let builder = if port == SMTPS_PORT {
            SmtpTransport::relay(&submission.server)
        } else {
            SmtpTransport::starttls_relay(&submission.server)
        }
        .map_err(|e| Error::MailFailed(e.to_string()))?;

        Ok(builder
            .port(port)
            .credentials(Credentials::new(
                submission.username.clone(),
                submission.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn send(&self, submission: &Submission) -> Result<()> {
        let message = Self::message(submission)?;
        let transport = self.transport(submission)?;

        info!(to = %submission.to, server = %submission.server, subject = %submission.subject, "sending mail");
        let response = transport
            .send(&message)
            .map_err(|e| Error::MailFailed(e.to_string()))?;
        debug!(code = %response.code(), "smtp server accepted mail");
        Ok(())
    }
}

/// Sends mail through the external `mailsend` program
pub struct Mailsend {
    mailsend_path: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl Mailsend {
    /// Create a new Mailsend instance
    ///
    /// The program is looked up as `mailsend_path`, then `MAILSEND_PATH`, then `mailsend`.
    pub fn new(mailsend_path: Option<String>) -> Self {
        let mailsend = mailsend_path.unwrap_or_else(|| {
            std::env::var("MAILSEND_PATH").unwrap_or_else(|_| SYSTEM_PATH.to_string())
        });

        Self {
            mailsend_path: mailsend,
            timeout: Duration::from_secs(TIMEOUT_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }

    /// Change how long a single send may take before the process is killed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if mailsend can be run
    fn is_available(&self) -> bool {
        Command::new(&self.mailsend_path)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Command line arguments for a submission
    ///
    /// The password is not among them, mailsend reads it from `SMTP_USER_PASS`.
    fn arguments(submission: &Submission) -> Vec<String> {
        let attachment = submission.attachment.to_string_lossy().to_string();
        let args: [&str; 22] = [
            "-to",
            &submission.to,
            "-from",
            &submission.from,
            "-starttls",
            "-port",
            &submission.port,
            "-auth",
            "-smtp",
            &submission.server,
            "-sub",
            &submission.subject,
            "+cc",
            "+bc",
            "-user",
            &submission.username,
            "-M",
            " ",
            "-mime-type",
            "application/octet-stream",
            "-attach",
            &attachment,
        ];
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl Mailer for Mailsend {
    fn name(&self) -> &'static str {
        "mailsend"
    }

    fn send(&self, submission: &Submission) -> Result<()> {
        if !self.is_available() {
            return Err(Error::MailerNotFound(self.mailsend_path.clone()));
        }

        info!(to = %submission.to, subject = %submission.subject, "sending mail");
        let mut child = Command::new(&self.mailsend_path)
            .args(Self::arguments(submission))
            .env("SMTP_USER_PASS", &submission.password)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| Error::MailFailed(e.to_string()))?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                debug!(%status, "mailsend finished");
                if status.success() {
                    return Ok(());
                }
                return Err(Error::MailFailed(status.to_string()));
            }

            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::MailTimeout(self.timeout));
            }

            thread::sleep(self.poll_interval);
        }
    }
}
