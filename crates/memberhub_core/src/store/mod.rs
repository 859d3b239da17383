//! Durable store port.
//!
//! # Responsibility
//! - Define per-kind primary-key persistence (`Store<E>`).
//! - Define member-specific secondary lookups and orphan cleanup steps
//!   (`MemberStore`).
//!
//! # Invariants
//! - The store is the system of record; `get` never consults a cache.
//! - `save` on a new auto-keyed record inserts and back-fills the key before
//!   returning it; an existing auto key is updated, never re-inserted.
//! - Saving a default address clears the flag on the member's other
//!   addresses in the same store transaction.

use crate::db::DbError;
use crate::model::{
    Account, Address, BalanceInfo, BalanceLog, BankInfo, BuyerGroup, Favorite, FavoriteKind,
    GrowAccount, IntegralLog, InvitationMember, Level, LevelUpLog, Member, MemberId, Profile,
    Record, Relation, TrustedInfo, WalletLog,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteMemberStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Backend cannot be reached (e.g. poisoned connection lock).
    Unavailable(String),
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
    /// Update of an auto-keyed record whose key has no row.
    NotFound(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted member data: {message}"),
            Self::NotFound(what) => write!(f, "{what} not found"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
            Self::InvalidData(_) => None,
            Self::NotFound(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and pagination for `Store::select`.
///
/// Rows are always returned ordered by primary key ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    /// Restrict to rows owned by this member.
    pub member_id: Option<MemberId>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl SelectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(member_id: MemberId) -> Self {
        Self {
            member_id: Some(member_id),
            ..Self::default()
        }
    }
}

/// Primary-key persistence for one record kind.
pub trait Store<E: Record>: Send + Sync {
    fn get(&self, key: E::Key) -> StoreResult<Option<E>>;

    /// Inserts a new auto-keyed record, updates an existing one, or upserts a
    /// member-keyed record; returns the (possibly new) key.
    ///
    /// An auto-keyed record with a key that has no row fails with `NotFound`.
    fn save(&self, entity: &mut E) -> StoreResult<E::Key>;

    /// Returns the number of affected rows (0 when absent).
    fn delete(&self, key: E::Key) -> StoreResult<usize>;

    fn select(&self, query: &SelectQuery) -> StoreResult<Vec<E>>;
}

/// One statically enumerated orphan sweep run after a member delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    Profile,
    BankInfo,
    Account,
    Relation,
    TrustedInfo,
    Addresses,
    Favorites,
    IntegralLogs,
    LevelUpLogs,
    BalanceLogs,
    WalletLogs,
    BalanceInfos,
}

/// Cleanup order: satellites first, then history, then ledgers.
pub const CLEANUP_STEPS: [CleanupStep; 12] = [
    CleanupStep::Profile,
    CleanupStep::BankInfo,
    CleanupStep::Account,
    CleanupStep::Relation,
    CleanupStep::TrustedInfo,
    CleanupStep::Addresses,
    CleanupStep::Favorites,
    CleanupStep::IntegralLogs,
    CleanupStep::LevelUpLogs,
    CleanupStep::BalanceLogs,
    CleanupStep::WalletLogs,
    CleanupStep::BalanceInfos,
];

impl CleanupStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::BankInfo => "bank_info",
            Self::Account => "account",
            Self::Relation => "relation",
            Self::TrustedInfo => "trusted_info",
            Self::Addresses => "addresses",
            Self::Favorites => "favorites",
            Self::IntegralLogs => "integral_logs",
            Self::LevelUpLogs => "level_up_logs",
            Self::BalanceLogs => "balance_logs",
            Self::WalletLogs => "wallet_logs",
            Self::BalanceInfos => "balance_infos",
        }
    }
}

/// Full store surface required by the member repository.
pub trait MemberStore:
    Store<Member>
    + Store<Account>
    + Store<Profile>
    + Store<Relation>
    + Store<BankInfo>
    + Store<TrustedInfo>
    + Store<Address>
    + Store<Level>
    + Store<Favorite>
    + Store<LevelUpLog>
    + Store<IntegralLog>
    + Store<BalanceLog>
    + Store<WalletLog>
    + Store<BalanceInfo>
    + Store<BuyerGroup>
{
    fn member_by_usr(&self, usr: &str) -> StoreResult<Option<Member>>;

    fn member_id_by_usr(&self, usr: &str) -> StoreResult<Option<MemberId>>;

    fn member_id_by_phone(&self, phone: &str) -> StoreResult<Option<MemberId>>;

    fn member_id_by_email(&self, email: &str) -> StoreResult<Option<MemberId>>;

    fn member_id_by_invitation_code(&self, code: &str) -> StoreResult<Option<MemberId>>;

    /// Whether another member (not `exclude`) already uses `usr`.
    fn usr_taken(&self, usr: &str, exclude: MemberId) -> StoreResult<bool>;

    /// Whether another member (not `exclude`) already bound `phone`.
    fn phone_bound(&self, phone: &str, exclude: MemberId) -> StoreResult<bool>;

    fn member_update_time(&self, member_id: MemberId) -> StoreResult<Option<i64>>;

    fn count_members(&self) -> StoreResult<i64>;

    fn count_members_by_level(&self, level: i32) -> StoreResult<i64>;

    /// Highest enabled level whose requirement `exp` satisfies.
    fn level_value_by_exp(&self, exp: i64) -> StoreResult<Option<i32>>;

    /// Column-level update of the investment fields; returns affected rows.
    fn update_grow_account(
        &self,
        member_id: MemberId,
        grow: &GrowAccount,
        update_time: i64,
    ) -> StoreResult<usize>;

    /// Deletes an address only if it belongs to `member_id`.
    fn delete_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<usize>;

    /// Makes `address_id` the member's only default; false if not owned.
    fn set_default_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<bool>;

    fn favorite_exists(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<bool>;

    fn delete_favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<usize>;

    /// Total and one page of members invited by `inviter_id`, ordered by
    /// level descending then id.
    fn invitees(
        &self,
        inviter_id: MemberId,
        offset: u32,
        limit: u32,
    ) -> StoreResult<(i64, Vec<InvitationMember>)>;

    /// Number of direct invitees for each given member.
    fn sub_invitation_counts(&self, member_ids: &[MemberId])
        -> StoreResult<BTreeMap<MemberId, i64>>;

    fn inviter_of(&self, member_id: MemberId) -> StoreResult<Option<Member>>;

    fn balance_info_by_trade_no(&self, trade_no: &str) -> StoreResult<Option<BalanceInfo>>;

    /// Deletes rows of one dependent table whose member no longer exists.
    fn cleanup_orphans(&self, step: CleanupStep) -> StoreResult<usize>;
}
