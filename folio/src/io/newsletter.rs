//! Newsletter signup client.
//!
//! Keeps a local subscription list under [`SUBSCRIPTIONS_KEY`] and, when an
//! endpoint is configured, forwards new subscribers to it. An unreachable
//! endpoint degrades to a local-only save.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::email::{is_valid_email, same_address};
use crate::io::store::DirStore;

/// Key for the locally kept subscription list.
pub const SUBSCRIPTIONS_KEY: &str = "newsletter_subscriptions_v1";

/// One subscription, as stored locally and by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    /// RFC 3339 timestamp in UTC.
    pub date: String,
}

impl Subscriber {
    pub fn new(email: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            date: format_date(at),
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("please enter a valid email")]
    InvalidEmail,
    #[error("could not reach newsletter endpoint: {0}")]
    Network(String),
}

/// Destination for new subscribers beyond the local list.
pub trait SubscriptionSink {
    fn send(&self, subscriber: &Subscriber) -> Result<(), SubscribeError>;
}

/// Sink that POSTs `{email, date}` as JSON.
pub struct HttpSink {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

impl SubscriptionSink for HttpSink {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    fn send(&self, subscriber: &Subscriber) -> Result<(), SubscribeError> {
        let response = self
            .agent
            .post(self.endpoint.as_str())
            .send_json(subscriber)
            .map_err(|err| SubscribeError::Network(err.to_string()))?;
        debug!(status = response.status().as_u16(), "endpoint accepted subscriber");
        Ok(())
    }
}

/// How a subscription request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    AlreadySubscribed,
    /// Forwarded to the endpoint and recorded locally.
    Sent,
    /// Recorded locally only; `fallback` is set when the endpoint failed.
    SavedLocally { fallback: Option<String> },
}

impl SubscribeOutcome {
    /// User-facing notice.
    pub fn notice(&self) -> &'static str {
        match self {
            SubscribeOutcome::AlreadySubscribed => "You are already subscribed.",
            SubscribeOutcome::Sent => "Subscribed! (sent to configured endpoint)",
            SubscribeOutcome::SavedLocally { fallback: None } => "Subscribed locally.",
            SubscribeOutcome::SavedLocally { fallback: Some(_) } => {
                "Could not reach newsletter endpoint; saved locally."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeReport {
    pub outcome: SubscribeOutcome,
    /// False when the local list could not be written; the subscription then
    /// only lived for this invocation.
    pub persisted: bool,
}

/// Local subscription list plus an optional forwarding sink.
pub struct Newsletter<'a> {
    store: &'a DirStore,
    sink: Option<&'a dyn SubscriptionSink>,
}

impl<'a> Newsletter<'a> {
    pub fn new(store: &'a DirStore, sink: Option<&'a dyn SubscriptionSink>) -> Self {
        Self { store, sink }
    }

    /// Locally known subscribers in insertion order. Unreadable storage reads
    /// as empty.
    pub fn subscribers(&self) -> Vec<Subscriber> {
        match self.store.read_key(SUBSCRIPTIONS_KEY) {
            Ok(list) => list,
            Err(err) => {
                warn!(error = ?err, "failed to read local subscriptions");
                Vec::new()
            }
        }
    }

    pub fn subscribe(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<SubscribeReport, SubscribeError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(SubscribeError::InvalidEmail);
        }

        let mut list = self.subscribers();
        if list.iter().any(|sub| same_address(&sub.email, email)) {
            debug!(email, "already subscribed locally");
            return Ok(SubscribeReport {
                outcome: SubscribeOutcome::AlreadySubscribed,
                persisted: true,
            });
        }

        let subscriber = Subscriber::new(email, now);
        let outcome = match self.sink {
            Some(sink) => match sink.send(&subscriber) {
                Ok(()) => SubscribeOutcome::Sent,
                Err(err) => {
                    warn!(error = %err, "newsletter endpoint failed, saving locally");
                    SubscribeOutcome::SavedLocally {
                        fallback: Some(err.to_string()),
                    }
                }
            },
            None => SubscribeOutcome::SavedLocally { fallback: None },
        };

        list.push(subscriber);
        let persisted = match self.store.write_key(SUBSCRIPTIONS_KEY, &list) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = ?err, "failed to save local subscriptions");
                false
            }
        };
        info!(email, ?outcome, "subscribed");
        Ok(SubscribeReport { outcome, persisted })
    }
}
