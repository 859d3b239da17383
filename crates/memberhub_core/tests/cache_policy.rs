use memberhub_core::{
    Cache, CacheError, CacheResult, CachedMemberRepository, Member, MemberRepository,
    MemoryChannel, NoopCache, NotifyChannel, NotifyError, NotifyResult, RepoConfig,
    SqliteMemberStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache whose every call fails, counting the attempts.
#[derive(Default)]
struct DownCache {
    calls: AtomicUsize,
}

impl DownCache {
    fn fail<T>(&self) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

impl Cache for DownCache {
    fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.fail()
    }

    fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
        self.fail()
    }

    fn del(&self, _key: &str) -> CacheResult<()> {
        self.fail()
    }

    fn delete_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        self.fail()
    }
}

struct DownChannel;

impl NotifyChannel for DownChannel {
    fn append(&self, _queue: &str, _payload: &str) -> NotifyResult<()> {
        Err(NotifyError::Unavailable("queue offline".to_string()))
    }

    fn set_with_ttl(&self, _key: &str, _value: i64, _ttl_secs: u64) -> NotifyResult<()> {
        Err(NotifyError::Unavailable("queue offline".to_string()))
    }
}

/// Working queues in front of a register that is always down.
#[derive(Default)]
struct RegisterDownChannel {
    queues: MemoryChannel,
}

impl NotifyChannel for RegisterDownChannel {
    fn append(&self, queue: &str, payload: &str) -> NotifyResult<()> {
        self.queues.append(queue, payload)
    }

    fn set_with_ttl(&self, _key: &str, _value: i64, _ttl_secs: u64) -> NotifyResult<()> {
        Err(NotifyError::Unavailable("register offline".to_string()))
    }
}

fn store() -> Arc<SqliteMemberStore> {
    Arc::new(SqliteMemberStore::open_in_memory().unwrap())
}

#[test]
fn repository_works_with_noop_cache() {
    let repo = CachedMemberRepository::new(
        store(),
        Arc::new(NoopCache),
        Arc::new(MemoryChannel::new()),
        RepoConfig::default(),
    )
    .unwrap();

    let mut member = Member::new("alice", "hash");
    let id = repo.save_member(&mut member).unwrap();
    assert_eq!(repo.get_member(id).unwrap().unwrap(), member);
    assert_eq!(repo.level_manager().levels().unwrap(), Vec::new());
    assert_eq!(repo.record_take_out(id).unwrap(), 1);
}

#[test]
fn cache_failures_degrade_to_store_reads() {
    let cache = Arc::new(DownCache::default());
    let repo = CachedMemberRepository::new(
        store(),
        cache.clone(),
        Arc::new(MemoryChannel::new()),
        RepoConfig::default(),
    )
    .unwrap();

    let mut member = Member::new("bob", "hash");
    let id = repo.save_member(&mut member).unwrap();
    assert_eq!(repo.get_member(id).unwrap().unwrap().usr, "bob");
    assert!(repo.get_profile(id).unwrap().is_some());
    assert_eq!(repo.delete_member(id).unwrap(), 1);
    assert!(repo.get_member(id).unwrap().is_none());
    assert_eq!(repo.take_out_times(id).unwrap(), 0);
    assert!(cache.calls.load(Ordering::SeqCst) > 0);
}

#[test]
fn notification_failures_do_not_fail_writes() {
    let repo = CachedMemberRepository::new(
        store(),
        Arc::new(NoopCache),
        Arc::new(DownChannel),
        RepoConfig::default(),
    )
    .unwrap();

    let mut member = Member::new("carol", "hash");
    let id = repo.save_member(&mut member).unwrap();
    let mut account = repo.get_account(id).unwrap().unwrap();
    account.balance = 3.0;
    repo.save_account(&mut account).unwrap();
    assert_eq!(repo.get_account(id).unwrap().unwrap().balance, 3.0);
}

#[test]
fn register_outage_still_pushes_to_queues() {
    let channel = Arc::new(RegisterDownChannel::default());
    let config = RepoConfig::default();
    let repo = CachedMemberRepository::new(
        store(),
        Arc::new(NoopCache),
        channel.clone(),
        config.clone(),
    )
    .unwrap();

    let id = repo.save_member(&mut Member::new("dan", "hash")).unwrap();
    let mut account = repo.get_account(id).unwrap().unwrap();
    account.balance = 1.0;
    repo.save_account(&mut account).unwrap();

    assert_eq!(
        channel.queues.snapshot(&config.member_update_queue),
        vec![format!("{id}-create")]
    );
    assert_eq!(
        channel.queues.snapshot(&config.member_notify_queue),
        vec![id.to_string()]
    );
    assert_eq!(
        channel.queues.snapshot(&config.account_notify_queue),
        vec![id.to_string()]
    );
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let result = CachedMemberRepository::new(
        store(),
        Arc::new(NoopCache),
        Arc::new(MemoryChannel::new()),
        RepoConfig::default().with_namespace(""),
    );
    assert!(matches!(result, Err(memberhub_core::RepoError::Config(_))));
}
