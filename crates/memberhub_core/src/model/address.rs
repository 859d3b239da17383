//! Delivery addresses (1:N per member).

use crate::model::member::MemberId;
use crate::model::record::{EntityKind, Record};
use crate::model::validation::{check_owner, check_phone, ValidationError};
use serde::{Deserialize, Serialize};

/// Delivery address owned by one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Store-assigned id; 0 until inserted.
    pub id: i64,
    pub member_id: MemberId,
    /// Consignee name.
    pub real_name: String,
    pub phone: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    /// Joined province/city/district label.
    pub area: String,
    pub address: String,
    pub is_default: bool,
}

impl Address {
    pub fn new(member_id: MemberId, real_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            member_id,
            real_name: real_name.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "address")?;
        check_phone(&self.phone)
    }
}

impl Record for Address {
    type Key = i64;

    const KIND: EntityKind = EntityKind::Address;
    const AUTO_KEY: bool = true;

    fn key(&self) -> i64 {
        self.id
    }

    fn assign_key(&mut self, key: i64) {
        self.id = key;
    }

    fn is_new(&self) -> bool {
        self.id <= 0
    }
}
