//! Member domain model.
//!
//! # Responsibility
//! - Define the member aggregate and its satellite records.
//! - Tag every persisted shape with a stable `EntityKind` and key.
//!
//! # Invariants
//! - `Member::id` is assigned by the store once and never changes.
//! - Satellite records (profile, account, bank, relation, trusted info) are
//!   keyed 1:1 by member id and never exist without an owning member.
//! - At most one address per member carries the default flag.

pub mod address;
pub mod group;
pub mod history;
pub mod ledger;
pub mod level;
pub mod member;
pub mod record;
pub mod satellite;
pub mod validation;

pub use address::Address;
pub use group::BuyerGroup;
pub use history::{Favorite, FavoriteKind, IntegralLog, InvitationMember, LevelUpLog};
pub use ledger::{BalanceInfo, BalanceLog, WalletLog};
pub use level::Level;
pub use member::{Member, MemberId, MemberState};
pub use record::{EntityKind, Record};
pub use satellite::{Account, BankInfo, GrowAccount, Profile, Relation, TrustedInfo};
pub use validation::ValidationError;
