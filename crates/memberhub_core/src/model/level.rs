//! Member level definitions.

use crate::model::record::{EntityKind, Record};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// One level definition; the full set is read ordered by `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: i32,
    pub name: String,
    /// Experience required to reach this level.
    pub require_exp: i64,
    /// Program-facing identifier used by templates and rules.
    pub program_signal: String,
    /// Whether members of this level count as official members.
    pub is_official: bool,
    pub enabled: bool,
    /// Whether members can upgrade into this level by payment.
    pub allow_upgrade: bool,
}

impl Level {
    pub fn new(name: impl Into<String>, require_exp: i64) -> Self {
        Self {
            name: name.into(),
            require_exp,
            enabled: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyLevelName);
        }
        Ok(())
    }
}

impl Record for Level {
    type Key = i32;

    const KIND: EntityKind = EntityKind::Level;
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
