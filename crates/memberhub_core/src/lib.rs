//! Cache-coherent member repository core.
//! The store is the system of record; the cache is a disposable projection
//! and change notifications are published after every committed write.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod manager;
pub mod model;
pub mod notify;
pub mod repo;
pub mod store;

pub use cache::{Cache, CacheError, CacheKeys, CacheResult, MemoryCache, NoopCache};
pub use config::{ConfigError, RepoConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use manager::{LevelManager, SharedManager};
pub use model::{
    Account, Address, BalanceInfo, BalanceLog, BankInfo, BuyerGroup, EntityKind, Favorite,
    FavoriteKind, GrowAccount, IntegralLog, InvitationMember, Level, LevelUpLog, Member, MemberId,
    MemberState, Profile, Record, Relation, TrustedInfo, ValidationError, WalletLog,
};
pub use notify::{
    ChangeEvent, ChangeRecord, MemoryChannel, NotifyChannel, NotifyError, NotifyResult,
};
pub use repo::{CachedMemberRepository, MemberRepository, RepoError, RepoResult};
pub use store::{
    CleanupStep, MemberStore, SelectQuery, SqliteMemberStore, Store, StoreError, StoreResult,
    CLEANUP_STEPS,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
