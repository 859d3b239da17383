//! Cache key derivation.
//!
//! # Invariants
//! - Keys are a pure function of (namespace, kind, natural key).
//! - Layout is `{namespace}:{kind prefix}:{part}[:{part}...]`; kind prefixes
//!   are distinct and colon-free, so kinds sharing a numeric id never collide.

use crate::model::{EntityKind, MemberId, Record};
use std::fmt::Display;

const LEVEL_SET_SEGMENT: &str = "set";
const LEVEL_MARKER_SEGMENT: &str = "ver";
const TAKE_OUT_TIMES_SEGMENT: &str = "take_out_times";
const TOTAL_MEMBERS_SEGMENT: &str = "total_members";

/// Derives every cache key the repository reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    namespace: String,
}

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: namespace.trim_end_matches(':').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for one entity identified by one or more natural key parts.
    pub fn entity(&self, kind: EntityKind, parts: &[&dyn Display]) -> String {
        let mut key = self.kind_prefix(kind);
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                key.push(':');
            }
            key.push_str(&part.to_string());
        }
        key
    }

    /// Key for a record identified by its own key.
    pub fn record<E: Record>(&self, key: E::Key) -> String {
        self.entity(E::KIND, &[&key])
    }

    /// Address keys are compound: owning member, then address id.
    pub fn address(&self, member_id: MemberId, address_id: i64) -> String {
        self.entity(EntityKind::Address, &[&member_id, &address_id])
    }

    /// Prefix covering every key of `kind`, used for namespace sweeps.
    pub fn kind_prefix(&self, kind: EntityKind) -> String {
        format!("{}:{}:", self.namespace, kind.cache_prefix())
    }

    /// Key holding the full ordered level collection.
    pub fn level_set(&self) -> String {
        format!("{}{LEVEL_SET_SEGMENT}", self.kind_prefix(EntityKind::Level))
    }

    /// Version marker guarding `level_set`.
    pub fn level_marker(&self) -> String {
        format!("{}{LEVEL_MARKER_SEGMENT}", self.kind_prefix(EntityKind::Level))
    }

    /// Daily withdrawal counter of one member.
    pub fn take_out_times(&self, member_id: MemberId) -> String {
        format!("{}:{TAKE_OUT_TIMES_SEGMENT}:{member_id}", self.namespace)
    }

    /// Registered member total, refreshed when members are created or deleted.
    pub fn total_members(&self) -> String {
        format!("{}:{TOTAL_MEMBERS_SEGMENT}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Member};
    use std::collections::HashSet;

    #[test]
    fn same_id_differs_across_kinds() {
        let keys = CacheKeys::new("ns");
        let member = keys.record::<Member>(7);
        let account = keys.record::<Account>(7);
        assert_eq!(member, "ns:mm:7");
        assert_eq!(account, "ns:acc:7");
        assert_ne!(member, account);
    }

    #[test]
    fn keys_are_stable_and_unique_across_all_kinds() {
        let keys = CacheKeys::new("ns:");
        let mut seen = HashSet::new();
        for kind in EntityKind::ALL {
            for id in 1..=5_i64 {
                assert!(seen.insert(keys.entity(kind, &[&id])));
                assert_eq!(keys.entity(kind, &[&id]), keys.entity(kind, &[&id]));
            }
        }
    }

    #[test]
    fn compound_address_key_is_distinct_from_simple_key() {
        let keys = CacheKeys::new("ns");
        assert_eq!(keys.address(3, 12), "ns:addr:3:12");
        assert_ne!(keys.address(3, 12), keys.address(31, 2));
    }

    #[test]
    fn level_collection_keys_share_sweep_prefix() {
        let keys = CacheKeys::new("ns");
        let prefix = keys.kind_prefix(EntityKind::Level);
        assert!(keys.level_set().starts_with(&prefix));
        assert!(keys.level_marker().starts_with(&prefix));
        assert!(!keys.take_out_times(1).starts_with(&prefix));
    }
}
