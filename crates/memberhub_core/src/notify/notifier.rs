//! Publishes member/account change records onto the channel.

use super::{ChangeEvent, ChangeRecord, NotifyChannel, NotifyResult};
use crate::config::RepoConfig;
use crate::model::MemberId;
use log::warn;
use std::sync::Arc;

/// Notification-bearing subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Member,
    Account,
}

impl Subject {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Account => "account",
        }
    }
}

/// Channel adapter used by the repository after a committed store write.
pub struct ChangeNotifier {
    channel: Arc<dyn NotifyChannel>,
    retention_secs: u64,
    member_update_queue: String,
    member_notify_queue: String,
    account_notify_queue: String,
    member_update_time_prefix: String,
    account_update_time_prefix: String,
}

impl ChangeNotifier {
    pub fn new(channel: Arc<dyn NotifyChannel>, config: &RepoConfig) -> Self {
        Self {
            channel,
            retention_secs: config.update_time_retention_secs,
            member_update_queue: config.member_update_queue.clone(),
            member_notify_queue: config.member_notify_queue.clone(),
            account_notify_queue: config.account_notify_queue.clone(),
            member_update_time_prefix: config.member_update_time_prefix.clone(),
            account_update_time_prefix: config.account_update_time_prefix.clone(),
        }
    }

    /// Register key holding the latest update time of one subject.
    pub fn update_time_key(&self, subject: Subject, member_id: MemberId) -> String {
        match subject {
            Subject::Member => format!("{}{member_id}", self.member_update_time_prefix),
            Subject::Account => format!("{}{member_id}", self.account_update_time_prefix),
        }
    }

    /// Records the latest update time, then appends to the subject's queues.
    ///
    /// Member changes go to both the push queue (raw id) and the update queue
    /// (`"{id}-{event}"`); account changes go to the account push queue only.
    /// Every step runs even when an earlier one fails; the first error is
    /// returned after all of them were tried.
    pub fn publish(
        &self,
        subject: Subject,
        member_id: MemberId,
        event: ChangeEvent,
        timestamp: i64,
    ) -> NotifyResult<ChangeRecord> {
        let record = ChangeRecord {
            subject_id: member_id,
            event,
            enqueued_at: timestamp,
        };
        let mut first_error = None;
        let mut track = |target: &str, result: NotifyResult<()>| {
            if let Err(err) = result {
                warn!(
                    "event=notify_step module=notify status=error subject={} target={target} member_id={member_id} error={err}",
                    subject.as_str()
                );
                first_error.get_or_insert(err);
            }
        };

        let register_key = self.update_time_key(subject, member_id);
        track(
            &register_key,
            self.channel
                .set_with_ttl(&register_key, timestamp, self.retention_secs),
        );

        let id = member_id.to_string();
        match subject {
            Subject::Member => {
                track(
                    &self.member_notify_queue,
                    self.channel.append(&self.member_notify_queue, &id),
                );
                track(
                    &self.member_update_queue,
                    self.channel
                        .append(&self.member_update_queue, &record.payload()),
                );
            }
            Subject::Account => {
                track(
                    &self.account_notify_queue,
                    self.channel.append(&self.account_notify_queue, &id),
                );
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemoryChannel, NotifyError};

    /// Memory channel whose register writes always fail.
    struct RegisterDown(MemoryChannel);

    impl NotifyChannel for RegisterDown {
        fn append(&self, queue: &str, payload: &str) -> NotifyResult<()> {
            self.0.append(queue, payload)
        }

        fn set_with_ttl(&self, _key: &str, _value: i64, _ttl_secs: u64) -> NotifyResult<()> {
            Err(NotifyError::Unavailable("register offline".to_string()))
        }
    }

    #[test]
    fn member_publish_writes_register_and_both_queues() {
        let channel = Arc::new(MemoryChannel::new());
        let config = RepoConfig::default();
        let notifier = ChangeNotifier::new(channel.clone(), &config);

        let record = notifier
            .publish(Subject::Member, 5, ChangeEvent::Update, 1_700_000_000)
            .unwrap();

        assert_eq!(record.payload(), "5-update");
        assert_eq!(channel.snapshot(&config.member_update_queue), vec!["5-update"]);
        assert_eq!(channel.snapshot(&config.member_notify_queue), vec!["5"]);
        assert_eq!(
            channel.latest(&notifier.update_time_key(Subject::Member, 5)),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn account_publish_skips_member_update_queue() {
        let channel = Arc::new(MemoryChannel::new());
        let config = RepoConfig::default();
        let notifier = ChangeNotifier::new(channel.clone(), &config);

        notifier
            .publish(Subject::Account, 8, ChangeEvent::Update, 10)
            .unwrap();

        assert_eq!(channel.queue_len(&config.member_update_queue), 0);
        assert_eq!(channel.snapshot(&config.account_notify_queue), vec!["8"]);
    }

    #[test]
    fn register_failure_still_appends_every_queue() {
        let channel = Arc::new(RegisterDown(MemoryChannel::new()));
        let config = RepoConfig::default();
        let notifier = ChangeNotifier::new(channel.clone(), &config);

        let err = notifier
            .publish(Subject::Member, 3, ChangeEvent::Create, 20)
            .unwrap_err();

        assert!(matches!(err, NotifyError::Unavailable(_)));
        assert_eq!(channel.0.snapshot(&config.member_notify_queue), vec!["3"]);
        assert_eq!(
            channel.0.snapshot(&config.member_update_queue),
            vec!["3-create"]
        );
        assert_eq!(channel.0.latest(&notifier.update_time_key(Subject::Member, 3)), None);
    }
}
