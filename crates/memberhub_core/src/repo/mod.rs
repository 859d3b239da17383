//! Cache-coherent member repository.
//!
//! # Responsibility
//! - Compose the store, cache and notification ports behind one
//!   use-case oriented contract.
//! - Keep the cache a disposable projection of committed store state.
//!
//! # Invariants
//! - Writes run Store -> Cache -> Notification; a failed step skips the rest.
//! - Only store and validation failures reach the caller; cache and
//!   notification failures are logged and swallowed.
//! - Member deletes always evict, then run every cleanup step.

use crate::config::ConfigError;
use crate::manager::LevelManager;
use crate::model::{
    Account, Address, BalanceInfo, BalanceLog, BankInfo, BuyerGroup, EntityKind, FavoriteKind,
    GrowAccount, IntegralLog, InvitationMember, LevelUpLog, Member, MemberId, Profile, Relation,
    TrustedInfo, ValidationError, WalletLog,
};
use crate::store::StoreError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub(crate) mod cache_layer;
pub(crate) mod clock;
mod member_repo;

pub use member_repo::CachedMemberRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error surfaced to callers.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Store(StoreError),
    Config(ConfigError),
    /// The member row was created but some satellites were not.
    PartialInitialization {
        member_id: MemberId,
        failed: Vec<EntityKind>,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::PartialInitialization { member_id, failed } => {
                let kinds = failed
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(
                    f,
                    "member {member_id} created but satellite initialization failed: {kinds}"
                )
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::PartialInitialization { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Member-domain data access used by services and handlers.
///
/// Implementations are shared across threads.
pub trait MemberRepository: Send + Sync {
    /// Read-through member lookup.
    fn get_member(&self, member_id: MemberId) -> RepoResult<Option<Member>>;
    /// Inserts (`id == 0`) or updates a member and returns its id.
    ///
    /// A new member gets its account, bank info, relation and profile
    /// created in the same call. Updating an id with no member is
    /// `ValidationError::UnknownMember`.
    fn save_member(&self, member: &mut Member) -> RepoResult<MemberId>;
    /// Deletes a member, evicts it and sweeps orphaned dependent rows.
    fn delete_member(&self, member_id: MemberId) -> RepoResult<usize>;

    fn member_by_usr(&self, usr: &str) -> RepoResult<Option<Member>>;
    fn member_id_by_usr(&self, usr: &str) -> RepoResult<Option<MemberId>>;
    fn member_id_by_phone(&self, phone: &str) -> RepoResult<Option<MemberId>>;
    fn member_id_by_email(&self, email: &str) -> RepoResult<Option<MemberId>>;
    fn member_id_by_invitation_code(&self, code: &str) -> RepoResult<Option<MemberId>>;
    fn usr_taken(&self, usr: &str, exclude: MemberId) -> RepoResult<bool>;
    fn phone_bound(&self, phone: &str, exclude: MemberId) -> RepoResult<bool>;
    fn member_update_time(&self, member_id: MemberId) -> RepoResult<Option<i64>>;
    fn count_members(&self) -> RepoResult<i64>;
    /// Member total kept in the cache; recounted from the store on a miss.
    fn total_members(&self) -> RepoResult<i64>;
    fn count_members_by_level(&self, level: i32) -> RepoResult<i64>;
    fn level_value_by_exp(&self, exp: i64) -> RepoResult<Option<i32>>;

    /// Satellite saves fail with `ValidationError::UnknownMember` when the
    /// owning member does not exist.
    ///
    /// Returns a blank profile for registered members without one.
    fn get_profile(&self, member_id: MemberId) -> RepoResult<Option<Profile>>;
    fn save_profile(&self, profile: &mut Profile) -> RepoResult<MemberId>;

    fn get_account(&self, member_id: MemberId) -> RepoResult<Option<Account>>;
    fn save_account(&self, account: &mut Account) -> RepoResult<MemberId>;
    /// Updates the investment columns only; returns affected rows.
    fn update_grow_account(&self, member_id: MemberId, grow: &GrowAccount)
        -> RepoResult<usize>;

    fn get_relation(&self, member_id: MemberId) -> RepoResult<Option<Relation>>;
    fn save_relation(&self, relation: &mut Relation) -> RepoResult<MemberId>;

    /// Returns a blank, unlocked bank info for registered members without one.
    fn get_bank_info(&self, member_id: MemberId) -> RepoResult<Option<BankInfo>>;
    /// Rejects the write while the stored bank info is locked.
    fn save_bank_info(&self, bank: &mut BankInfo) -> RepoResult<MemberId>;
    /// Clears the lock; false when the member has no bank info.
    fn unlock_bank_info(&self, member_id: MemberId) -> RepoResult<bool>;

    /// Returns a blank trusted info for registered members without one.
    fn get_trusted_info(&self, member_id: MemberId) -> RepoResult<Option<TrustedInfo>>;
    fn save_trusted_info(&self, trusted: &mut TrustedInfo) -> RepoResult<MemberId>;

    fn addresses(&self, member_id: MemberId) -> RepoResult<Vec<Address>>;
    /// Address lookup scoped to its owner.
    fn get_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<Option<Address>>;
    /// Saving a default address clears the flag on the member's others.
    fn save_address(&self, address: &mut Address) -> RepoResult<i64>;
    fn set_default_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<bool>;
    fn delete_address(&self, member_id: MemberId, address_id: i64) -> RepoResult<usize>;

    /// Adds a favorite; false when it already existed.
    fn favorite(&self, member_id: MemberId, kind: FavoriteKind, refer_id: i64)
        -> RepoResult<bool>;
    fn favored(&self, member_id: MemberId, kind: FavoriteKind, refer_id: i64)
        -> RepoResult<bool>;
    fn cancel_favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> RepoResult<usize>;

    fn invitees(
        &self,
        inviter_id: MemberId,
        offset: u32,
        limit: u32,
    ) -> RepoResult<(i64, Vec<InvitationMember>)>;
    fn sub_invitation_counts(&self, member_ids: &[MemberId])
        -> RepoResult<BTreeMap<MemberId, i64>>;
    fn inviter_of(&self, member_id: MemberId) -> RepoResult<Option<Member>>;

    fn get_level_up_log(&self, id: i32) -> RepoResult<Option<LevelUpLog>>;
    fn save_level_up_log(&self, log: &mut LevelUpLog) -> RepoResult<i32>;
    fn save_integral_log(&self, log: &mut IntegralLog) -> RepoResult<i64>;

    fn save_balance_log(&self, log: &mut BalanceLog) -> RepoResult<i32>;
    fn save_wallet_log(&self, log: &mut WalletLog) -> RepoResult<i32>;
    fn get_wallet_log(&self, id: i32) -> RepoResult<Option<WalletLog>>;
    fn get_balance_info(&self, id: i32) -> RepoResult<Option<BalanceInfo>>;
    fn get_balance_info_by_no(&self, trade_no: &str) -> RepoResult<Option<BalanceInfo>>;
    /// Trade numbers are unique across balance infos.
    fn save_balance_info(&self, info: &mut BalanceInfo) -> RepoResult<i32>;

    /// Every buyer group ordered by id.
    fn buyer_groups(&self) -> RepoResult<Vec<BuyerGroup>>;
    fn save_buyer_group(&self, group: &mut BuyerGroup) -> RepoResult<i32>;

    /// Withdrawals recorded today; 0 when the counter is absent.
    fn take_out_times(&self, member_id: MemberId) -> RepoResult<i64>;
    /// Increments today's withdrawal counter and returns the new value.
    fn record_take_out(&self, member_id: MemberId) -> RepoResult<i64>;

    /// Shared level manager, constructed on first demand.
    fn level_manager(&self) -> Arc<LevelManager>;
}
