//! Owner notification for new subscribers.
//!
//! Enabled only when both an owner address and an SMTP host are configured.
//! Delivery failures are logged by the caller and never change the response.

use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};

/// What the owner is told about a new subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberNotice {
    pub email: String,
    /// List size including the new subscriber.
    pub total: usize,
}

impl SubscriberNotice {
    pub fn subject(&self) -> String {
        format!("New newsletter subscriber: {}", self.email)
    }

    pub fn body(&self) -> String {
        format!(
            "A new subscriber registered: {}\n\nTotal subscribers: {}",
            self.email, self.total
        )
    }
}

/// Delivers [`SubscriberNotice`]s. Called from a blocking task.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &SubscriberNotice) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub owner: String,
    pub host: String,
    pub port: u16,
    /// Implicit TLS from the first byte; otherwise STARTTLS when offered.
    pub secure: bool,
    pub credentials: Option<(String, String)>,
    pub from: String,
}

/// Sends one plain-text mail per notice over SMTP.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn message(&self, notice: &SubscriberNotice) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .with_context(|| format!("parse sender address {}", self.config.from))?;
        let to: Mailbox = self
            .config
            .owner
            .parse()
            .with_context(|| format!("parse owner address {}", self.config.owner))?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(notice.subject())
            .body(notice.body())
            .context("build notification mail")
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let host = self.config.host.as_str();
        let builder = if self.config.secure {
            SmtpTransport::relay(host).with_context(|| format!("configure smtp relay {host}"))?
        } else {
            let tls = TlsParameters::new(host.to_string())
                .with_context(|| format!("configure tls for {host}"))?;
            SmtpTransport::builder_dangerous(host).tls(Tls::Opportunistic(tls))
        };
        let mut builder = builder.port(self.config.port);
        if let Some((user, pass)) = &self.config.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, notice: &SubscriberNotice) -> Result<()> {
        let message = self.message(notice)?;
        self.transport()?
            .send(&message)
            .with_context(|| format!("send notification via {}", self.config.host))?;
        Ok(())
    }
}
