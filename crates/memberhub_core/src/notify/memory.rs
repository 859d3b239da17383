//! In-process notification channel.

use super::{NotifyChannel, NotifyError, NotifyResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Default)]
struct ChannelState {
    queues: HashMap<String, VecDeque<String>>,
    /// Value and expiry; `None` never expires.
    registers: HashMap<String, (i64, Option<Instant>)>,
}

/// Mutex-guarded queues and expiring registers.
///
/// Consumer-side helpers (`drain`, `latest`) stand in for the push service.
#[derive(Default)]
pub struct MemoryChannel {
    state: Mutex<ChannelState>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued payload, oldest first.
    pub fn drain(&self, queue: &str) -> Vec<String> {
        match self.lock() {
            Ok(mut state) => state
                .queues
                .get_mut(queue)
                .map(|items| items.drain(..).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Copies the queue without consuming it.
    pub fn snapshot(&self, queue: &str) -> Vec<String> {
        match self.lock() {
            Ok(state) => state
                .queues
                .get(queue)
                .map(|items| items.iter().cloned().collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub fn queue_len(&self, queue: &str) -> usize {
        self.lock()
            .map(|state| state.queues.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Latest register value, or `None` when absent or expired.
    pub fn latest(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        let state = self.lock().ok()?;
        state
            .registers
            .get(key)
            .filter(|(_, expires_at)| expires_at.map_or(true, |at| now < at))
            .map(|(value, _)| *value)
    }

    fn lock(&self) -> NotifyResult<MutexGuard<'_, ChannelState>> {
        self.state
            .lock()
            .map_err(|_| NotifyError::Unavailable("memory channel lock poisoned".to_string()))
    }
}

impl NotifyChannel for MemoryChannel {
    fn append(&self, queue: &str, payload: &str) -> NotifyResult<()> {
        self.lock()?
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> NotifyResult<()> {
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_secs));
        self.lock()?
            .registers
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_drain_empties() {
        let channel = MemoryChannel::new();
        channel.append("q", "1-create").unwrap();
        channel.append("q", "1-update").unwrap();
        assert_eq!(channel.snapshot("q"), vec!["1-create", "1-update"]);
        assert_eq!(channel.drain("q"), vec!["1-create", "1-update"]);
        assert_eq!(channel.queue_len("q"), 0);
    }

    #[test]
    fn registers_expire() {
        let channel = MemoryChannel::new();
        channel.set_with_ttl("live", 10, 60).unwrap();
        channel.set_with_ttl("dead", 10, 0).unwrap();
        assert_eq!(channel.latest("live"), Some(10));
        assert_eq!(channel.latest("dead"), None);
        channel.set_with_ttl("forever", 7, u64::MAX).unwrap();
        assert_eq!(channel.latest("forever"), Some(7));
    }
}
