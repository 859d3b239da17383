//! Change-notification channel port and adapters.
//!
//! # Responsibility
//! - Define the ordered append queue + timestamp register contract consumed by
//!   the external push service.
//! - Encode notification records into queue payloads.
//!
//! # Invariants
//! - Appends to one queue preserve call order.
//! - The repository only writes to the channel; it never reads back.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod notifier;

pub use memory::MemoryChannel;
pub use notifier::{ChangeNotifier, Subject};

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Channel backend unreachable or internally broken.
    Unavailable(String),
    /// Payload does not follow the `"{id}-{event}"` shape.
    MalformedPayload(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "notification channel unavailable: {message}"),
            Self::MalformedPayload(payload) => {
                write!(f, "malformed notification payload `{payload}`")
            }
        }
    }
}

impl Error for NotifyError {}

/// Ordered, append-only delivery channel plus an expiring register.
pub trait NotifyChannel: Send + Sync {
    fn append(&self, queue: &str, payload: &str) -> NotifyResult<()>;

    fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> NotifyResult<()>;
}

/// Kind of mutation a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Create,
    Update,
}

impl ChangeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// One appended notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub subject_id: i64,
    pub event: ChangeEvent,
    /// Unix seconds at enqueue time.
    pub enqueued_at: i64,
}

impl ChangeRecord {
    /// Queue payload: `"{subject_id}-{event}"`.
    pub fn payload(&self) -> String {
        format!("{}-{}", self.subject_id, self.event.as_str())
    }

    /// Parses a queue payload back into `(subject_id, event)`.
    ///
    /// Used by consumers; the repository never reads the queue.
    pub fn parse_payload(payload: &str) -> NotifyResult<(i64, ChangeEvent)> {
        let malformed = || NotifyError::MalformedPayload(payload.to_string());
        let (id, event) = payload.rsplit_once('-').ok_or_else(malformed)?;
        let id = id.parse::<i64>().map_err(|_| malformed())?;
        let event = ChangeEvent::parse(event).ok_or_else(malformed)?;
        Ok((id, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrip() {
        let record = ChangeRecord {
            subject_id: 42,
            event: ChangeEvent::Create,
            enqueued_at: 1,
        };
        assert_eq!(record.payload(), "42-create");
        assert_eq!(
            ChangeRecord::parse_payload("42-create").unwrap(),
            (42, ChangeEvent::Create)
        );
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for payload in ["42", "x-update", "42-delete", ""] {
            assert!(ChangeRecord::parse_payload(payload).is_err(), "{payload}");
        }
    }
}
