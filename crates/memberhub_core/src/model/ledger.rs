//! Balance and wallet ledgers of a member.
//!
//! Like the other history rows these bypass the cache and are swept by the
//! orphan cleanup once their member is gone.

use crate::model::member::MemberId;
use crate::model::record::{EntityKind, Record};
use crate::model::validation::{check_owner, ValidationError};
use serde::{Deserialize, Serialize};

/// One balance movement (charge, payment, refund, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceLog {
    pub id: i32,
    pub member_id: MemberId,
    /// External order or trade number the movement belongs to.
    pub outer_no: String,
    pub kind: i32,
    pub title: String,
    /// Signed amount.
    pub amount: f64,
    pub procedure_fee: f64,
    pub state: i32,
    pub remark: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl BalanceLog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "balance_log")
    }
}

/// One wallet (present account) movement, reviewed before it settles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletLog {
    pub id: i32,
    pub member_id: MemberId,
    pub outer_no: String,
    pub kind: i32,
    pub title: String,
    pub amount: f64,
    pub procedure_fee: f64,
    pub review_state: i32,
    pub remark: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl WalletLog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "wallet_log")
    }
}

/// Balance change request addressed by its trade number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub id: i32,
    pub member_id: MemberId,
    /// Unique per record.
    pub trade_no: String,
    pub kind: i32,
    pub title: String,
    pub amount: f64,
    /// Commission charged on `amount`.
    pub csn_amount: f64,
    pub state: i32,
    pub create_time: i64,
    pub update_time: i64,
}

impl BalanceInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_owner(self.member_id, "balance_info")?;
        if self.trade_no.trim().is_empty() {
            return Err(ValidationError::EmptyTradeNo);
        }
        Ok(())
    }
}

macro_rules! i32_record {
    ($record:ty, $kind:expr) => {
        impl Record for $record {
            type Key = i32;

            const KIND: EntityKind = $kind;
            const AUTO_KEY: bool = true;

            fn key(&self) -> i32 {
                self.id
            }

            fn assign_key(&mut self, key: i32) {
                self.id = key;
            }

            fn is_new(&self) -> bool {
                self.id <= 0
            }
        }
    };
}

i32_record!(BalanceLog, EntityKind::BalanceLog);
i32_record!(WalletLog, EntityKind::WalletLog);
i32_record!(BalanceInfo, EntityKind::BalanceInfo);
