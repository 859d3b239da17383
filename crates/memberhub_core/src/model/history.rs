//! Transactional history rows owned by a member.
//!
//! These rows are never cached; they are written through the store directly
//! and swept by the orphan cleanup when their member is deleted.

use crate::model::member::MemberId;
use crate::model::record::{EntityKind, Record};
use serde::{Deserialize, Serialize};

/// What a favorite points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteKind {
    Shop,
    Goods,
}

impl FavoriteKind {
    pub(crate) fn to_db(self) -> i64 {
        match self {
            Self::Shop => 1,
            Self::Goods => 2,
        }
    }

    pub(crate) fn from_db(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Shop),
            2 => Some(Self::Goods),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub member_id: MemberId,
    pub kind: FavoriteKind,
    /// Id of the shop or goods item.
    pub refer_id: i64,
    pub update_time: i64,
}

impl Record for Favorite {
    type Key = i64;

    const KIND: EntityKind = EntityKind::Favorite;
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

/// Level change request/record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpLog {
    pub id: i32,
    pub member_id: MemberId,
    pub origin_level: i32,
    pub target_level: i32,
    pub is_free: bool,
    pub payment_id: i32,
    pub reviewed: bool,
    pub create_time: i64,
}

impl Record for LevelUpLog {
    type Key = i32;

    const KIND: EntityKind = EntityKind::LevelUpLog;
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

/// Integral (points) change record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegralLog {
    pub id: i64,
    pub member_id: MemberId,
    pub kind: i32,
    pub title: String,
    /// Signed point delta.
    pub value: i64,
    pub remark: String,
    pub create_time: i64,
}

impl Record for IntegralLog {
    type Key = i64;

    const KIND: EntityKind = EntityKind::IntegralLog;
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

/// Read model for the "members I invited" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationMember {
    pub member_id: MemberId,
    pub usr: String,
    pub level: i32,
    pub avatar: String,
    pub name: String,
    pub phone: String,
    pub im: String,
}
