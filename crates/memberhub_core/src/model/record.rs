//! Entity kind tags and the persisted-record contract.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};

/// Kind tag for every persisted member-subsystem shape.
///
/// The tag drives cache-key namespacing, store table selection and log
/// metadata. Prefixes are distinct and never contain `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Member,
    Account,
    Profile,
    Relation,
    BankInfo,
    TrustedInfo,
    Address,
    Level,
    Favorite,
    LevelUpLog,
    IntegralLog,
    BalanceLog,
    WalletLog,
    BalanceInfo,
    BuyerGroup,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 15] = [
        EntityKind::Member,
        EntityKind::Account,
        EntityKind::Profile,
        EntityKind::Relation,
        EntityKind::BankInfo,
        EntityKind::TrustedInfo,
        EntityKind::Address,
        EntityKind::Level,
        EntityKind::Favorite,
        EntityKind::LevelUpLog,
        EntityKind::IntegralLog,
        EntityKind::BalanceLog,
        EntityKind::WalletLog,
        EntityKind::BalanceInfo,
        EntityKind::BuyerGroup,
    ];

    /// Cache namespace segment for this kind.
    pub fn cache_prefix(self) -> &'static str {
        match self {
            Self::Member => "mm",
            Self::Account => "acc",
            Self::Profile => "pro",
            Self::Relation => "rel",
            Self::BankInfo => "bank",
            Self::TrustedInfo => "trust",
            Self::Address => "addr",
            Self::Level => "lv",
            Self::Favorite => "fav",
            Self::LevelUpLog => "lvup",
            Self::IntegralLog => "integral",
            Self::BalanceLog => "ballog",
            Self::WalletLog => "wallog",
            Self::BalanceInfo => "balinfo",
            Self::BuyerGroup => "bgroup",
        }
    }

    /// Stable snake_case name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Account => "account",
            Self::Profile => "profile",
            Self::Relation => "relation",
            Self::BankInfo => "bank_info",
            Self::TrustedInfo => "trusted_info",
            Self::Address => "address",
            Self::Level => "level",
            Self::Favorite => "favorite",
            Self::LevelUpLog => "level_up_log",
            Self::IntegralLog => "integral_log",
            Self::BalanceLog => "balance_log",
            Self::WalletLog => "wallet_log",
            Self::BalanceInfo => "balance_info",
            Self::BuyerGroup => "buyer_group",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract shared by every shape the store persists and the cache projects.
///
/// Records with an auto-assigned key (`AUTO_KEY = true`) are inserted when
/// their key is zero; the store back-fills the new key through `assign_key`.
/// Records keyed by their owning member id are always upserted.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: Copy + Debug + Display + Eq + Send + Sync + 'static;

    const KIND: EntityKind;
    const AUTO_KEY: bool;

    fn key(&self) -> Self::Key;

    fn assign_key(&mut self, key: Self::Key);

    /// Whether saving this record must insert and assign a new key.
    fn is_new(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::EntityKind;
    use std::collections::HashSet;

    #[test]
    fn cache_prefixes_are_distinct_and_colon_free() {
        let prefixes: HashSet<&str> = EntityKind::ALL
            .iter()
            .map(|kind| kind.cache_prefix())
            .collect();
        assert_eq!(prefixes.len(), EntityKind::ALL.len());
        assert!(prefixes.iter().all(|prefix| !prefix.contains(':')));
    }
}
