use memberhub_core::{
    Account, BalanceInfo, BankInfo, Cache, CachedMemberRepository, CleanupStep, EntityKind,
    FavoriteKind, GrowAccount, InvitationMember, Member, MemberId, MemberRepository, MemberStore,
    MemoryCache, MemoryChannel, Profile, Record, Relation, RepoConfig, RepoError, SelectQuery,
    SqliteMemberStore, Store, StoreError, StoreResult,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// SQLite store whose saves fail for selected record kinds.
struct FlakyStore {
    inner: SqliteMemberStore,
    failing: Mutex<HashSet<EntityKind>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: SqliteMemberStore::open_in_memory().unwrap(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    fn fail_saves(&self, kinds: &[EntityKind]) {
        self.failing.lock().unwrap().extend(kinds.iter().copied());
    }
}

impl<E: Record> Store<E> for FlakyStore
where
    SqliteMemberStore: Store<E>,
{
    fn get(&self, key: E::Key) -> StoreResult<Option<E>> {
        Store::<E>::get(&self.inner, key)
    }

    fn save(&self, entity: &mut E) -> StoreResult<E::Key> {
        if self.failing.lock().unwrap().contains(&E::KIND) {
            return Err(StoreError::Unavailable(format!("{} writes offline", E::KIND)));
        }
        Store::<E>::save(&self.inner, entity)
    }

    fn delete(&self, key: E::Key) -> StoreResult<usize> {
        Store::<E>::delete(&self.inner, key)
    }

    fn select(&self, query: &SelectQuery) -> StoreResult<Vec<E>> {
        Store::<E>::select(&self.inner, query)
    }
}

impl MemberStore for FlakyStore {
    fn member_by_usr(&self, usr: &str) -> StoreResult<Option<Member>> {
        self.inner.member_by_usr(usr)
    }

    fn member_id_by_usr(&self, usr: &str) -> StoreResult<Option<MemberId>> {
        self.inner.member_id_by_usr(usr)
    }

    fn member_id_by_phone(&self, phone: &str) -> StoreResult<Option<MemberId>> {
        self.inner.member_id_by_phone(phone)
    }

    fn member_id_by_email(&self, email: &str) -> StoreResult<Option<MemberId>> {
        self.inner.member_id_by_email(email)
    }

    fn member_id_by_invitation_code(&self, code: &str) -> StoreResult<Option<MemberId>> {
        self.inner.member_id_by_invitation_code(code)
    }

    fn usr_taken(&self, usr: &str, exclude: MemberId) -> StoreResult<bool> {
        self.inner.usr_taken(usr, exclude)
    }

    fn phone_bound(&self, phone: &str, exclude: MemberId) -> StoreResult<bool> {
        self.inner.phone_bound(phone, exclude)
    }

    fn member_update_time(&self, member_id: MemberId) -> StoreResult<Option<i64>> {
        self.inner.member_update_time(member_id)
    }

    fn count_members(&self) -> StoreResult<i64> {
        self.inner.count_members()
    }

    fn count_members_by_level(&self, level: i32) -> StoreResult<i64> {
        self.inner.count_members_by_level(level)
    }

    fn level_value_by_exp(&self, exp: i64) -> StoreResult<Option<i32>> {
        self.inner.level_value_by_exp(exp)
    }

    fn update_grow_account(
        &self,
        member_id: MemberId,
        grow: &GrowAccount,
        update_time: i64,
    ) -> StoreResult<usize> {
        self.inner.update_grow_account(member_id, grow, update_time)
    }

    fn delete_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<usize> {
        self.inner.delete_address(member_id, address_id)
    }

    fn set_default_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<bool> {
        self.inner.set_default_address(member_id, address_id)
    }

    fn favorite_exists(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<bool> {
        self.inner.favorite_exists(member_id, kind, refer_id)
    }

    fn delete_favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<usize> {
        self.inner.delete_favorite(member_id, kind, refer_id)
    }

    fn invitees(
        &self,
        inviter_id: MemberId,
        offset: u32,
        limit: u32,
    ) -> StoreResult<(i64, Vec<InvitationMember>)> {
        self.inner.invitees(inviter_id, offset, limit)
    }

    fn sub_invitation_counts(
        &self,
        member_ids: &[MemberId],
    ) -> StoreResult<BTreeMap<MemberId, i64>> {
        self.inner.sub_invitation_counts(member_ids)
    }

    fn inviter_of(&self, member_id: MemberId) -> StoreResult<Option<Member>> {
        self.inner.inviter_of(member_id)
    }

    fn balance_info_by_trade_no(&self, trade_no: &str) -> StoreResult<Option<BalanceInfo>> {
        self.inner.balance_info_by_trade_no(trade_no)
    }

    fn cleanup_orphans(&self, step: CleanupStep) -> StoreResult<usize> {
        self.inner.cleanup_orphans(step)
    }
}

struct Fixture {
    repo: CachedMemberRepository,
    store: Arc<FlakyStore>,
    cache: Arc<MemoryCache>,
    channel: Arc<MemoryChannel>,
    config: RepoConfig,
}

fn fixture() -> Fixture {
    let store = Arc::new(FlakyStore::new());
    let cache = Arc::new(MemoryCache::new());
    let channel = Arc::new(MemoryChannel::new());
    let config = RepoConfig::default();
    let repo = CachedMemberRepository::new(
        store.clone(),
        cache.clone(),
        channel.clone(),
        config.clone(),
    )
    .unwrap();
    Fixture {
        repo,
        store,
        cache,
        channel,
        config,
    }
}

#[test]
fn failed_satellites_keep_member_and_report_kinds() {
    let fx = fixture();
    fx.store
        .fail_saves(&[EntityKind::Account, EntityKind::Relation]);

    let mut member = Member::new("alice", "hash");
    let err = fx.repo.save_member(&mut member).unwrap_err();

    let (member_id, failed) = match err {
        RepoError::PartialInitialization { member_id, failed } => (member_id, failed),
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(member_id, member.id);
    assert_eq!(failed, vec![EntityKind::Account, EntityKind::Relation]);

    let store = fx.store.as_ref();
    assert!(Store::<Member>::get(store, member_id).unwrap().is_some());
    assert!(Store::<BankInfo>::get(store, member_id).unwrap().is_some());
    assert!(Store::<Profile>::get(store, member_id).unwrap().is_some());
    assert!(Store::<Account>::get(store, member_id).unwrap().is_none());
    assert!(Store::<Relation>::get(store, member_id).unwrap().is_none());
    assert_eq!(fx.repo.get_member(member_id).unwrap().unwrap().usr, "alice");

    assert_eq!(
        fx.channel.snapshot(&fx.config.member_update_queue),
        vec![format!("{member_id}-create")]
    );
}

#[test]
fn failed_member_write_leaves_cache_and_channel_untouched() {
    let fx = fixture();
    let mut member = Member::new("bob", "hash");
    let id = fx.repo.save_member(&mut member).unwrap();
    let key = fx.repo.cache_keys().record::<Member>(id);
    let projected = fx.cache.get(&key).unwrap();
    assert!(projected.is_some());

    fx.store.fail_saves(&[EntityKind::Member]);
    member.exp = 99;
    let err = fx.repo.save_member(&mut member).unwrap_err();

    assert!(matches!(err, RepoError::Store(StoreError::Unavailable(_))));
    assert_eq!(fx.cache.get(&key).unwrap(), projected);
    assert_eq!(fx.repo.get_member(id).unwrap().unwrap().exp, 0);
    assert_eq!(fx.channel.queue_len(&fx.config.member_update_queue), 1);
    assert_eq!(fx.channel.queue_len(&fx.config.member_notify_queue), 1);
}

#[test]
fn failed_account_write_sends_no_account_notification() {
    let fx = fixture();
    let id = fx
        .repo
        .save_member(&mut Member::new("carol", "hash"))
        .unwrap();
    let mut account = fx.repo.get_account(id).unwrap().unwrap();

    fx.store.fail_saves(&[EntityKind::Account]);
    account.balance = 30.0;
    assert!(matches!(
        fx.repo.save_account(&mut account).unwrap_err(),
        RepoError::Store(_)
    ));

    assert_eq!(fx.repo.get_account(id).unwrap().unwrap().balance, 0.0);
    assert_eq!(fx.channel.queue_len(&fx.config.account_notify_queue), 0);
}
