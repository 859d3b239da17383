//! Member aggregate root.
//!
//! # Invariants
//! - `id == 0` means "not yet persisted"; the store assigns the id on insert.
//! - `update_time` is stamped by the repository and strictly increases on
//!   every persisted mutation.

use crate::model::record::{EntityKind, Record};
use crate::model::validation::{check_username, ValidationError};
use serde::{Deserialize, Serialize};

/// Member identifier assigned by the store.
pub type MemberId = i64;

/// Account state of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    /// Login and trading are disabled.
    Stopped,
    /// Normal, enabled member.
    Ok,
}

impl MemberState {
    pub(crate) fn to_db(self) -> i64 {
        match self {
            Self::Stopped => 0,
            Self::Ok => 1,
        }
    }

    pub(crate) fn from_db(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Ok),
            _ => None,
        }
    }
}

/// Persisted member row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Login name, unique across members.
    pub usr: String,
    /// Password hash.
    pub pwd: String,
    /// Trade password hash.
    pub trade_pwd: String,
    /// Experience points.
    pub exp: i64,
    /// Current level value.
    pub level: i32,
    pub invitation_code: String,
    pub premium_user: i32,
    /// Unix seconds; 0 when not premium.
    pub premium_expires: i64,
    /// Registration source channel.
    pub reg_from: String,
    pub reg_ip: String,
    /// Unix seconds.
    pub reg_time: i64,
    /// Verification code and its expiry (unix seconds).
    pub check_code: String,
    pub check_expires: i64,
    pub state: MemberState,
    pub login_time: i64,
    pub last_login_time: i64,
    /// Unix seconds, stamped on every persisted mutation.
    pub update_time: i64,
}

impl Member {
    /// Creates an unsaved member with enabled state and blank metadata.
    pub fn new(usr: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            id: 0,
            usr: usr.into(),
            pwd: pwd.into(),
            trade_pwd: String::new(),
            exp: 0,
            level: 0,
            invitation_code: String::new(),
            premium_user: 0,
            premium_expires: 0,
            reg_from: String::new(),
            reg_ip: String::new(),
            reg_time: 0,
            check_code: String::new(),
            check_expires: 0,
            state: MemberState::Ok,
            login_time: 0,
            last_login_time: 0,
            update_time: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.usr)
    }

    pub fn is_enabled(&self) -> bool {
        self.state == MemberState::Ok
    }

    /// Whether the verification code is still usable at `now` (unix seconds).
    pub fn check_code_valid(&self, code: &str, now: i64) -> bool {
        !self.check_code.is_empty() && self.check_code == code && now <= self.check_expires
    }
}

impl Record for Member {
    type Key = MemberId;

    const KIND: EntityKind = EntityKind::Member;
    const AUTO_KEY: bool = true;

    fn key(&self) -> MemberId {
        self.id
    }

    fn assign_key(&mut self, key: MemberId) {
        self.id = key;
    }

    fn is_new(&self) -> bool {
        self.id <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_member_is_unsaved_and_enabled() {
        let member = Member::new("alice", "hash");
        assert!(member.is_new());
        assert!(member.is_enabled());
        assert!(member.validate().is_ok());
    }

    #[test]
    fn check_code_respects_expiry() {
        let mut member = Member::new("alice", "hash");
        member.check_code = "1234".to_string();
        member.check_expires = 100;
        assert!(member.check_code_valid("1234", 99));
        assert!(!member.check_code_valid("1234", 101));
        assert!(!member.check_code_valid("4321", 99));
    }

    #[test]
    fn state_db_mapping_rejects_unknown_values() {
        assert_eq!(MemberState::from_db(1), Some(MemberState::Ok));
        assert_eq!(MemberState::from_db(7), None);
    }
}
