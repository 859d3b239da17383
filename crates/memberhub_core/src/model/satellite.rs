//! 1:1 satellite records keyed by member id.

use crate::model::member::MemberId;
use crate::model::record::{EntityKind, Record};
use crate::model::validation::{check_email, check_owner, check_phone, ValidationError};
use serde::{Deserialize, Serialize};

/// Implements `Record` for a shape keyed by its owning member id.
macro_rules! member_keyed_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            type Key = MemberId;

            const KIND: EntityKind = $kind;
            const AUTO_KEY: bool = false;

            fn key(&self) -> MemberId {
                self.member_id
            }

            fn assign_key(&mut self, key: MemberId) {
                self.member_id = key;
            }

            fn is_new(&self) -> bool {
                false
            }
        }
    };
}

/// Personal profile of a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub member_id: MemberId,
    /// Display name.
    pub name: String,
    pub avatar: String,
    pub sex: i32,
    pub birthday: String,
    pub phone: String,
    pub address: String,
    pub im: String,
    pub email: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    pub remark: String,
    pub update_time: i64,
}

impl Profile {
    /// Blank profile used for default-record healing.
    pub fn blank(member_id: MemberId) -> Self {
        Self {
            member_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "profile")?;
        check_phone(&self.phone)?;
        check_email(&self.email)
    }

    /// Whether the fields required for checkout are filled in.
    pub fn is_completed(&self) -> bool {
        !self.name.is_empty() && !self.phone.is_empty() && !self.address.is_empty()
    }
}

member_keyed_record!(Profile, EntityKind::Profile);

/// Monetary balances of a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub member_id: MemberId,
    pub integral: i64,
    /// Cash balance.
    pub balance: f64,
    pub wallet_balance: f64,
    /// Investment ("grow") balance and its bookkeeping.
    pub grow_balance: f64,
    pub grow_amount: f64,
    pub grow_earnings: f64,
    pub grow_total_earnings: f64,
    pub total_expense: f64,
    pub total_charge: f64,
    pub total_pay: f64,
    pub update_time: i64,
}

impl Account {
    /// Zero-valued account created together with a new member.
    pub fn opening(member_id: MemberId, update_time: i64) -> Self {
        Self {
            member_id,
            update_time,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "account")
    }
}

member_keyed_record!(Account, EntityKind::Account);

/// Investment account snapshot written by the grow-account update path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrowAccount {
    pub balance: f64,
    pub amount: f64,
    pub earnings: f64,
    pub total_earnings: f64,
}

/// Invitation and registration relations of a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub member_id: MemberId,
    pub card_no: String,
    /// Member who invited this member; 0 when none.
    pub inviter_id: MemberId,
    /// Comma-joined inviter chain, nearest first.
    pub inviter_str: String,
    /// Merchant the member registered through.
    pub reg_mch_id: i32,
}

impl Relation {
    pub fn blank(member_id: MemberId) -> Self {
        Self {
            member_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "relation")
    }
}

member_keyed_record!(Relation, EntityKind::Relation);

/// Withdrawal bank card of a member.
///
/// Once locked, the record only changes through the explicit unlock path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankInfo {
    pub member_id: MemberId,
    pub bank_name: String,
    pub account: String,
    pub account_name: String,
    /// Branch network.
    pub network: String,
    pub state: i32,
    pub is_locked: bool,
    pub update_time: i64,
}

impl BankInfo {
    /// Blank, unlocked, enabled bank info.
    pub fn blank(member_id: MemberId) -> Self {
        Self {
            member_id,
            state: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "bank_info")
    }

    /// Whether the card details are usable for withdrawal.
    pub fn is_complete(&self) -> bool {
        !self.bank_name.is_empty() && !self.account.is_empty() && !self.account_name.is_empty()
    }
}

member_keyed_record!(BankInfo, EntityKind::BankInfo);

/// Real-name verification record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedInfo {
    pub member_id: MemberId,
    pub real_name: String,
    pub card_id: String,
    pub trust_image: String,
    pub reviewed: bool,
    pub review_time: i64,
    pub remark: String,
    pub update_time: i64,
}

impl TrustedInfo {
    pub fn blank(member_id: MemberId) -> Self {
        Self {
            member_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "trusted_info")
    }
}

member_keyed_record!(TrustedInfo, EntityKind::TrustedInfo);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bank_info_is_enabled_unlocked_and_incomplete() {
        let bank = BankInfo::blank(3);
        assert_eq!(bank.state, 1);
        assert!(!bank.is_locked);
        assert!(!bank.is_complete());
    }

    #[test]
    fn profile_validation_checks_contact_fields() {
        let mut profile = Profile::blank(1);
        assert!(profile.validate().is_ok());
        profile.email = "broken".to_string();
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn satellites_without_owner_are_rejected() {
        assert!(Account::opening(0, 0).validate().is_err());
        assert!(Relation::blank(0).validate().is_err());
    }
}
