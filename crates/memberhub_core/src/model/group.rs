//! Buyer groups: pricing tiers a member buys under.

use crate::model::record::{EntityKind, Record};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerGroup {
    pub id: i32,
    pub name: String,
    pub enable_retail: bool,
    pub enable_wholesale: bool,
    /// Days before a rebate settles.
    pub rebate_period: i32,
}

impl BuyerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enable_retail: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyGroupName);
        }
        Ok(())
    }
}

impl Record for BuyerGroup {
    type Key = i32;

    const KIND: EntityKind = EntityKind::BuyerGroup;
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
