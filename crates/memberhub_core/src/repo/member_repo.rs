//! Cache-coherent member repository over the store, cache and channel ports.

use crate::cache::{Cache, CacheKeys};
use crate::config::RepoConfig;
use crate::manager::{LevelManager, SharedManager};
use crate::model::{
    Account, Address, BalanceInfo, BalanceLog, BankInfo, BuyerGroup, EntityKind, Favorite,
    FavoriteKind, GrowAccount, IntegralLog, InvitationMember, LevelUpLog, Member, MemberId,
    Profile, Record, Relation, TrustedInfo, ValidationError, WalletLog,
};
use crate::notify::{ChangeEvent, ChangeNotifier, NotifyChannel, Subject};
use crate::repo::cache_layer::CacheLayer;
use crate::repo::clock::{next_update_time, seconds_until_day_end, unix_now};
use crate::repo::{MemberRepository, RepoError, RepoResult};
use crate::store::{MemberStore, SelectQuery, Store, CLEANUP_STEPS};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const INVITATION_CODE_LEN: usize = 8;

/// Member repository projecting committed store state into a cache and
/// publishing member/account changes.
pub struct CachedMemberRepository {
    store: Arc<dyn MemberStore>,
    layer: CacheLayer,
    notifier: ChangeNotifier,
    levels: SharedManager<LevelManager>,
}

impl CachedMemberRepository {
    pub fn new(
        store: Arc<dyn MemberStore>,
        cache: Arc<dyn Cache>,
        channel: Arc<dyn NotifyChannel>,
        config: RepoConfig,
    ) -> RepoResult<Self> {
        config.validate()?;
        let layer = CacheLayer::new(
            cache,
            CacheKeys::new(config.cache_namespace.as_str()),
            config.cache_ttl,
        );
        Ok(Self {
            store,
            layer,
            notifier: ChangeNotifier::new(channel, &config),
            levels: SharedManager::new(),
        })
    }

    /// Key scheme used for every cache entry this repository writes.
    pub fn cache_keys(&self) -> &CacheKeys {
        self.layer.keys()
    }

    fn store(&self) -> &(dyn MemberStore + 'static) {
        self.store.as_ref()
    }

    fn read<E>(&self, key: E::Key) -> RepoResult<Option<E>>
    where
        E: Record,
        dyn MemberStore: Store<E>,
    {
        let cache_key = self.layer.keys().record::<E>(key);
        self.layer.read_through(self.store(), key, &cache_key)
    }

    fn write<E>(&self, entity: &mut E) -> RepoResult<E::Key>
    where
        E: Record,
        dyn MemberStore: Store<E>,
    {
        let keys = self.layer.keys();
        self.layer
            .write_through(self.store(), entity, |saved| keys.record::<E>(saved.key()))
    }

    /// Read-through lookup that creates and persists `blank` when the member
    /// is registered but the record is missing.
    fn read_or_heal<E>(&self, member_id: MemberId, blank: fn(MemberId) -> E) -> RepoResult<Option<E>>
    where
        E: Record<Key = MemberId>,
        dyn MemberStore: Store<E>,
    {
        if let Some(found) = self.read::<E>(member_id)? {
            return Ok(Some(found));
        }
        if self.store().member_update_time(member_id)?.is_none() {
            return Ok(None);
        }
        let mut healed = blank(member_id);
        self.write(&mut healed)?;
        info!(
            "event=default_heal module=repo status=ok kind={} member_id={member_id}",
            E::KIND
        );
        Ok(Some(healed))
    }

    /// Latest update time of an existing member; `UnknownMember` otherwise.
    fn require_member(&self, member_id: MemberId) -> RepoResult<i64> {
        self.store()
            .member_update_time(member_id)?
            .ok_or(RepoError::Validation(ValidationError::UnknownMember(member_id)))
    }

    /// Recounts members into the cached total; on failure the total is
    /// dropped so the next read recounts.
    fn refresh_total_members(&self) {
        let key = self.layer.keys().total_members();
        let result = self
            .store()
            .count_members()
            .map_err(|err| err.to_string())
            .and_then(|total| {
                self.layer
                    .cache()
                    .set(&key, &total.to_string(), None)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            warn!("event=total_members module=repo status=error error={err}");
            self.layer.evict(&key);
        }
    }

    fn publish(&self, subject: Subject, member_id: MemberId, event: ChangeEvent, timestamp: i64) {
        match self.notifier.publish(subject, member_id, event, timestamp) {
            Ok(record) => debug!(
                "event=notify module=repo status=ok subject={} payload={}",
                subject.as_str(),
                record.payload()
            ),
            Err(err) => warn!(
                "event=notify module=repo status=error subject={} member_id={member_id} error={err}",
                subject.as_str()
            ),
        }
    }

    /// Creates the satellites of a freshly inserted member; returns the kinds
    /// that could not be created.
    fn initialize_satellites(&self, member_id: MemberId, now: i64) -> Vec<EntityKind> {
        let mut failed = Vec::new();

        let mut account = Account::opening(member_id, now);
        if let Err(err) = self.write(&mut account) {
            error!("event=member_init module=repo status=error kind=account member_id={member_id} error={err}");
            failed.push(EntityKind::Account);
        }

        let mut bank = BankInfo::blank(member_id);
        bank.update_time = now;
        if let Err(err) = self.write(&mut bank) {
            error!("event=member_init module=repo status=error kind=bank_info member_id={member_id} error={err}");
            failed.push(EntityKind::BankInfo);
        }

        let mut relation = Relation::blank(member_id);
        if let Err(err) = self.write(&mut relation) {
            error!("event=member_init module=repo status=error kind=relation member_id={member_id} error={err}");
            failed.push(EntityKind::Relation);
        }

        let mut profile = Profile::blank(member_id);
        profile.update_time = now;
        if let Err(err) = self.write(&mut profile) {
            error!("event=member_init module=repo status=error kind=profile member_id={member_id} error={err}");
            failed.push(EntityKind::Profile);
        }

        failed
    }

    /// Evicts every single-key projection owned by `member_id`.
    fn evict_member_projections(&self, member_id: MemberId) {
        let keys = self.layer.keys();
        self.layer.evict(&keys.record::<Profile>(member_id));
        self.layer.evict(&keys.record::<BankInfo>(member_id));
        self.layer.evict(&keys.record::<Account>(member_id));
        self.layer.evict(&keys.record::<Relation>(member_id));
        self.layer.evict(&keys.record::<TrustedInfo>(member_id));
        self.layer.sweep(&self.address_prefix(member_id));
    }

    fn address_prefix(&self, member_id: MemberId) -> String {
        format!(
            "{}{member_id}:",
            self.layer.keys().kind_prefix(EntityKind::Address)
        )
    }
}

fn generate_invitation_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(INVITATION_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Sets `create_time` once and moves `update_time` strictly forward.
fn stamp_history(create_time: &mut i64, update_time: &mut i64) {
    let now = unix_now();
    if *create_time == 0 {
        *create_time = now;
    }
    *update_time = next_update_time(*update_time, now);
}

impl MemberRepository for CachedMemberRepository {
    fn get_member(&self, member_id: MemberId) -> RepoResult<Option<Member>> {
        self.read::<Member>(member_id)
    }

    fn save_member(&self, member: &mut Member) -> RepoResult<MemberId> {
        member.validate()?;
        if self.store().usr_taken(&member.usr, member.id)? {
            return Err(ValidationError::UsernameTaken(member.usr.clone()).into());
        }

        let created = member.is_new();
        let now = unix_now();
        let previous = if created {
            member.update_time
        } else {
            self.require_member(member.id)?.max(member.update_time)
        };
        if created {
            if member.reg_time == 0 {
                member.reg_time = now;
            }
            if member.invitation_code.is_empty() {
                member.invitation_code = generate_invitation_code();
            }
        }
        member.update_time = next_update_time(previous, now);

        let member_id = self.write(member)?;

        let failed = if created {
            let failed = self.initialize_satellites(member_id, member.update_time);
            self.refresh_total_members();
            failed
        } else {
            Vec::new()
        };

        let event = if created {
            ChangeEvent::Create
        } else {
            ChangeEvent::Update
        };
        self.publish(Subject::Member, member_id, event, member.update_time);

        if !failed.is_empty() {
            return Err(RepoError::PartialInitialization { member_id, failed });
        }
        info!(
            "event=member_save module=repo status=ok member_id={member_id} change={}",
            event.as_str()
        );
        Ok(member_id)
    }

    fn delete_member(&self, member_id: MemberId) -> RepoResult<usize> {
        let cache_key = self.layer.keys().record::<Member>(member_id);
        let rows = self
            .layer
            .delete_through::<Member, _>(self.store(), member_id, &cache_key)?;
        self.evict_member_projections(member_id);

        for step in CLEANUP_STEPS {
            match self.store().cleanup_orphans(step) {
                Ok(removed) => debug!(
                    "event=member_cleanup module=repo status=ok step={} removed={removed}",
                    step.as_str()
                ),
                Err(err) => warn!(
                    "event=member_cleanup module=repo status=error step={} member_id={member_id} error={err}",
                    step.as_str()
                ),
            }
        }

        if rows > 0 {
            self.refresh_total_members();
        }
        info!("event=member_delete module=repo status=ok member_id={member_id} rows={rows}");
        Ok(rows)
    }

    fn member_by_usr(&self, usr: &str) -> RepoResult<Option<Member>> {
        Ok(self.store().member_by_usr(usr)?)
    }

    fn member_id_by_usr(&self, usr: &str) -> RepoResult<Option<MemberId>> {
        Ok(self.store().member_id_by_usr(usr)?)
    }

    fn member_id_by_phone(&self, phone: &str) -> RepoResult<Option<MemberId>> {
        Ok(self.store().member_id_by_phone(phone)?)
    }

    fn member_id_by_email(&self, email: &str) -> RepoResult<Option<MemberId>> {
        Ok(self.store().member_id_by_email(email)?)
    }

    fn member_id_by_invitation_code(&self, code: &str) -> RepoResult<Option<MemberId>> {
        Ok(self.store().member_id_by_invitation_code(code)?)
    }

    fn usr_taken(&self, usr: &str, exclude: MemberId) -> RepoResult<bool> {
        Ok(self.store().usr_taken(usr, exclude)?)
    }

    fn phone_bound(&self, phone: &str, exclude: MemberId) -> RepoResult<bool> {
        Ok(self.store().phone_bound(phone, exclude)?)
    }

    fn member_update_time(&self, member_id: MemberId) -> RepoResult<Option<i64>> {
        Ok(self.store().member_update_time(member_id)?)
    }

    fn count_members(&self) -> RepoResult<i64> {
        Ok(self.store().count_members()?)
    }

    fn total_members(&self) -> RepoResult<i64> {
        let key = self.layer.keys().total_members();
        match self.layer.cache().get_int(&key) {
            Ok(Some(total)) => return Ok(total),
            Ok(None) => {}
            Err(err) => {
                warn!("event=total_members module=repo status=error error={err}");
                self.layer.evict(&key);
            }
        }
        let total = self.store().count_members()?;
        if let Err(err) = self.layer.cache().set(&key, &total.to_string(), None) {
            warn!("event=total_members module=repo status=error error={err}");
        }
        Ok(total)
    }

    fn count_members_by_level(&self, level: i32) -> RepoResult<i64> {
        Ok(self.store().count_members_by_level(level)?)
    }

    fn level_value_by_exp(&self, exp: i64) -> RepoResult<Option<i32>> {
        Ok(self.store().level_value_by_exp(exp)?)
    }

    fn get_profile(&self, member_id: MemberId) -> RepoResult<Option<Profile>> {
        self.read_or_heal(member_id, Profile::blank)
    }

    fn save_profile(&self, profile: &mut Profile) -> RepoResult<MemberId> {
        profile.validate()?;
        self.require_member(profile.member_id)?;
        profile.update_time = next_update_time(profile.update_time, unix_now());
        self.write(profile)
    }

    fn get_account(&self, member_id: MemberId) -> RepoResult<Option<Account>> {
        self.read::<Account>(member_id)
    }

    fn save_account(&self, account: &mut Account) -> RepoResult<MemberId> {
        account.validate()?;
        self.require_member(account.member_id)?;
        account.update_time = next_update_time(account.update_time, unix_now());
        let member_id = self.write(account)?;
        self.publish(
            Subject::Account,
            member_id,
            ChangeEvent::Update,
            account.update_time,
        );
        Ok(member_id)
    }

    fn update_grow_account(
        &self,
        member_id: MemberId,
        grow: &GrowAccount,
    ) -> RepoResult<usize> {
        let now = unix_now();
        let rows = self.store().update_grow_account(member_id, grow, now)?;
        self.layer
            .evict(&self.layer.keys().record::<Account>(member_id));
        if rows > 0 {
            self.publish(Subject::Account, member_id, ChangeEvent::Update, now);
        }
        Ok(rows)
    }

    fn get_relation(&self, member_id: MemberId) -> RepoResult<Option<Relation>> {
        self.read::<Relation>(member_id)
    }

    fn save_relation(&self, relation: &mut Relation) -> RepoResult<MemberId> {
        relation.validate()?;
        self.require_member(relation.member_id)?;
        self.write(relation)
    }

    fn get_bank_info(&self, member_id: MemberId) -> RepoResult<Option<BankInfo>> {
        self.read_or_heal(member_id, BankInfo::blank)
    }

    fn save_bank_info(&self, bank: &mut BankInfo) -> RepoResult<MemberId> {
        bank.validate()?;
        self.require_member(bank.member_id)?;
        let stored = Store::<BankInfo>::get(self.store(), bank.member_id)?;
        if stored.as_ref().is_some_and(|current| current.is_locked) {
            warn!(
                "event=bank_save module=repo status=rejected reason=locked member_id={}",
                bank.member_id
            );
            return Err(ValidationError::BankInfoLocked(bank.member_id).into());
        }
        let previous = stored.map_or(bank.update_time, |current| {
            current.update_time.max(bank.update_time)
        });
        bank.update_time = next_update_time(previous, unix_now());
        self.write(bank)
    }

    fn unlock_bank_info(&self, member_id: MemberId) -> RepoResult<bool> {
        let Some(mut bank) = Store::<BankInfo>::get(self.store(), member_id)? else {
            return Ok(false);
        };
        bank.is_locked = false;
        bank.update_time = next_update_time(bank.update_time, unix_now());
        self.write(&mut bank)?;
        info!("event=bank_unlock module=repo status=ok member_id={member_id}");
        Ok(true)
    }

    fn get_trusted_info(&self, member_id: MemberId) -> RepoResult<Option<TrustedInfo>> {
        self.read_or_heal(member_id, TrustedInfo::blank)
    }

    fn save_trusted_info(&self, trusted: &mut TrustedInfo) -> RepoResult<MemberId> {
        trusted.validate()?;
        self.require_member(trusted.member_id)?;
        trusted.update_time = next_update_time(trusted.update_time, unix_now());
        self.write(trusted)
    }

    fn addresses(&self, member_id: MemberId) -> RepoResult<Vec<Address>> {
        Ok(Store::<Address>::select(
            self.store(),
            &SelectQuery::owned_by(member_id),
        )?)
    }

    fn get_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<Option<Address>> {
        let cache_key = self.layer.keys().address(member_id, address_id);
        let found: Option<Address> =
            self.layer
                .read_through(self.store(), address_id, &cache_key)?;
        match found {
            Some(address) if address.member_id == member_id => Ok(Some(address)),
            Some(_) => {
                self.layer.evict(&cache_key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn save_address(&self, address: &mut Address) -> RepoResult<i64> {
        address.validate()?;
        if !address.is_new() {
            if let Some(stored) = Store::<Address>::get(self.store(), address.id)? {
                if stored.member_id != address.member_id {
                    return Err(ValidationError::AddressOwnerMismatch {
                        address_id: address.id,
                        member_id: address.member_id,
                    }
                    .into());
                }
            }
        }
        if address.is_default {
            // Other addresses lose their flag in the store; drop their projections.
            self.layer.sweep(&self.address_prefix(address.member_id));
        }
        let keys = self.layer.keys();
        self.layer.write_through(self.store(), address, |saved| {
            keys.address(saved.member_id, saved.id)
        })
    }

    fn set_default_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<bool> {
        let updated = self.store().set_default_address(member_id, address_id)?;
        if updated {
            self.layer.sweep(&self.address_prefix(member_id));
        }
        Ok(updated)
    }

    fn delete_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<usize> {
        let result = self.store().delete_address(member_id, address_id);
        self.layer
            .evict(&self.layer.keys().address(member_id, address_id));
        Ok(result?)
    }

    fn favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> RepoResult<bool> {
        if member_id <= 0 {
            return Err(ValidationError::MissingOwner("favorite").into());
        }
        if self.store().favorite_exists(member_id, kind, refer_id)? {
            return Ok(false);
        }
        let mut favorite = Favorite {
            id: 0,
            member_id,
            kind,
            refer_id,
            update_time: unix_now(),
        };
        Store::<Favorite>::save(self.store(), &mut favorite)?;
        Ok(true)
    }

    fn favored(&self, member_id: MemberId, kind: FavoriteKind, refer_id: i64) -> RepoResult<bool> {
        Ok(self.store().favorite_exists(member_id, kind, refer_id)?)
    }

    fn cancel_favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> RepoResult<usize> {
        Ok(self.store().delete_favorite(member_id, kind, refer_id)?)
    }

    fn invitees(
        &self,
        inviter_id: MemberId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<(i64, Vec<InvitationMember>)> {
        Ok(self.store().invitees(inviter_id, offset, limit)?)
    }

    fn sub_invitation_counts(
        &self,
        member_ids: &[MemberId],
    ) -> RepoResult<BTreeMap<MemberId, i64>> {
        Ok(self.store().sub_invitation_counts(member_ids)?)
    }

    fn inviter_of(&self, member_id: MemberId) -> RepoResult<Option<Member>> {
        Ok(self.store().inviter_of(member_id)?)
    }

    fn get_level_up_log(&self, id: i32) -> RepoResult<Option<LevelUpLog>> {
        Ok(Store::<LevelUpLog>::get(self.store(), id)?)
    }

    fn save_level_up_log(&self, log: &mut LevelUpLog) -> RepoResult<i32> {
        if log.member_id <= 0 {
            return Err(ValidationError::MissingOwner("level_up_log").into());
        }
        if log.create_time == 0 {
            log.create_time = unix_now();
        }
        Ok(Store::<LevelUpLog>::save(self.store(), log)?)
    }

    fn save_integral_log(&self, log: &mut IntegralLog) -> RepoResult<i64> {
        if log.member_id <= 0 {
            return Err(ValidationError::MissingOwner("integral_log").into());
        }
        if log.create_time == 0 {
            log.create_time = unix_now();
        }
        Ok(Store::<IntegralLog>::save(self.store(), log)?)
    }

    fn save_balance_log(&self, log: &mut BalanceLog) -> RepoResult<i32> {
        log.validate()?;
        stamp_history(&mut log.create_time, &mut log.update_time);
        Ok(Store::<BalanceLog>::save(self.store(), log)?)
    }

    fn save_wallet_log(&self, log: &mut WalletLog) -> RepoResult<i32> {
        log.validate()?;
        stamp_history(&mut log.create_time, &mut log.update_time);
        Ok(Store::<WalletLog>::save(self.store(), log)?)
    }

    fn get_wallet_log(&self, id: i32) -> RepoResult<Option<WalletLog>> {
        Ok(Store::<WalletLog>::get(self.store(), id)?)
    }

    fn get_balance_info(&self, id: i32) -> RepoResult<Option<BalanceInfo>> {
        Ok(Store::<BalanceInfo>::get(self.store(), id)?)
    }

    fn get_balance_info_by_no(&self, trade_no: &str) -> RepoResult<Option<BalanceInfo>> {
        Ok(self.store().balance_info_by_trade_no(trade_no)?)
    }

    fn save_balance_info(&self, info: &mut BalanceInfo) -> RepoResult<i32> {
        info.validate()?;
        if let Some(existing) = self.store().balance_info_by_trade_no(&info.trade_no)? {
            if existing.id != info.id {
                return Err(ValidationError::TradeNoTaken(info.trade_no.clone()).into());
            }
        }
        stamp_history(&mut info.create_time, &mut info.update_time);
        Ok(Store::<BalanceInfo>::save(self.store(), info)?)
    }

    fn buyer_groups(&self) -> RepoResult<Vec<BuyerGroup>> {
        Ok(Store::<BuyerGroup>::select(
            self.store(),
            &SelectQuery::all(),
        )?)
    }

    fn save_buyer_group(&self, group: &mut BuyerGroup) -> RepoResult<i32> {
        group.validate()?;
        let id = Store::<BuyerGroup>::save(self.store(), group)?;
        info!("event=buyer_group_save module=repo status=ok group_id={id}");
        Ok(id)
    }

    fn take_out_times(&self, member_id: MemberId) -> RepoResult<i64> {
        let key = self.layer.keys().take_out_times(member_id);
        match self.layer.cache().get_int(&key) {
            Ok(times) => Ok(times.unwrap_or(0)),
            Err(err) => {
                warn!("event=take_out_read module=repo status=error member_id={member_id} error={err}");
                Ok(0)
            }
        }
    }

    fn record_take_out(&self, member_id: MemberId) -> RepoResult<i64> {
        let times = self.take_out_times(member_id)? + 1;
        let key = self.layer.keys().take_out_times(member_id);
        let ttl_secs = seconds_until_day_end(unix_now());
        if let Err(err) = self
            .layer
            .cache()
            .set_expire(&key, &times.to_string(), ttl_secs)
        {
            warn!("event=take_out_write module=repo status=error member_id={member_id} error={err}");
        }
        Ok(times)
    }

    fn level_manager(&self) -> Arc<LevelManager> {
        self.levels
            .get_or_init(|| LevelManager::new(Arc::clone(&self.store), self.layer.clone()))
    }
}
