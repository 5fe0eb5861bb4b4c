//! Entity records, relationship keys, and contribution records.
//!
//! `CacheData` is the record agents produce and readers consume: its
//! relationship map is keyed by logical relationship-type name. `StoredData`
//! is the same record as the backing store holds it, keyed by
//! [`RelationshipKey`] so every entry carries the agent that contributed it.
//! Only the provider engine converts between the two.

use crate::validate::RESERVED_DELIMITER;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// One entity as produced by a caching agent or returned to a reader.
///
/// Identity is the `(type, id)` pair; the type name travels alongside the
/// record in every operation and is never embedded in it. Attributes are
/// opaque JSON; relationships map logical relationship-type names to target
/// entity ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheData {
    /// Unique identifier within the entity type.
    pub id: String,
    /// Seconds until the record may expire; `-1` means no expiry.
    /// Enforcement belongs to the backing store.
    pub ttl_seconds: i64,
    /// Opaque payload, merged per attribute name on write.
    pub attributes: HashMap<String, Value>,
    /// Related entity ids keyed by logical relationship-type name.
    pub relationships: HashMap<String, BTreeSet<String>>,
}

impl CacheData {
    /// Create a record with no expiry, no attributes, and no relationships.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ttl_seconds: -1,
            attributes: HashMap::new(),
            relationships: HashMap::new(),
        }
    }

    /// Set the expiry in seconds.
    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Set the target ids of one relationship type.
    pub fn with_relationship<I, S>(mut self, name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships
            .insert(name.into(), ids.into_iter().map(Into::into).collect());
        self
    }
}

/// Composite key for one relationship entry in a stored record.
///
/// The store keeps one entry per (relationship type, contributing agent)
/// pair so agents never clobber each other's edges. Construction goes
/// through [`RelationshipKey::sourced`] for engine writes and
/// [`RelationshipKey::unsourced`] for raw passthrough writes; the source
/// cannot be changed after the fact.
///
/// # Wire Format
///
/// Serializes as `name:agent` when sourced and bare `name` when not,
/// splitting on the first `:` when read back. The name side never contains
/// the delimiter (type-name validation rejects it); the agent side may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RelationshipKey {
    name: String,
    source: Option<String>,
}

impl RelationshipKey {
    /// Key for a relationship contributed by a known agent.
    pub fn sourced(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
        }
    }

    /// Key with no agent attribution.
    ///
    /// Arises only from raw passthrough writes and external writers. A
    /// record carrying one of these cannot be read back through the merging
    /// read path.
    pub fn unsourced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    /// Logical relationship-type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Agent that contributed this entry, if attributed.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Split into logical name and optional source.
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.name, self.source)
    }
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}{}{}", self.name, RESERVED_DELIMITER, source),
            None => f.write_str(&self.name),
        }
    }
}

impl From<String> for RelationshipKey {
    fn from(raw: String) -> Self {
        match raw.split_once(RESERVED_DELIMITER) {
            Some((name, source)) => Self::sourced(name, source),
            None => Self::unsourced(raw),
        }
    }
}

impl From<&str> for RelationshipKey {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<RelationshipKey> for String {
    fn from(key: RelationshipKey) -> Self {
        key.to_string()
    }
}

/// One entity as the backing store holds it.
///
/// Identical to [`CacheData`] except the relationship map is keyed by
/// [`RelationshipKey`], so each entry records which agent contributed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredData {
    /// Unique identifier within the entity type.
    pub id: String,
    /// Seconds until the record may expire; `-1` means no expiry.
    pub ttl_seconds: i64,
    /// Opaque payload, merged per attribute name on write.
    pub attributes: HashMap<String, Value>,
    /// Related entity ids keyed by (relationship type, contributing agent).
    pub relationships: HashMap<RelationshipKey, BTreeSet<String>>,
}

impl StoredData {
    /// Create a record with no expiry, no attributes, and no relationships.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ttl_seconds: -1,
            attributes: HashMap::new(),
            relationships: HashMap::new(),
        }
    }

    /// Set the expiry in seconds.
    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Set the target ids under one relationship key.
    pub fn with_relationship<I, S>(mut self, key: RelationshipKey, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships
            .insert(key, ids.into_iter().map(Into::into).collect());
        self
    }
}

/// Last-write record for one `(type, agent)` pair.
///
/// Overwritten wholesale each time the agent stores a batch for the type.
/// The id set is the eviction-delta input for authoritative types; the ttl
/// is the batch maximum so this record cannot expire strictly before the
/// data whose provenance it tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Agent that produced the batch.
    pub source: String,
    /// Every id the agent stored for the type in its latest batch.
    pub ids: BTreeSet<String>,
    /// Maximum ttl across the batch; `-1` when none set one.
    pub ttl_seconds: i64,
}

impl Contribution {
    /// Create an empty contribution for an agent.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ids: BTreeSet::new(),
            ttl_seconds: -1,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: wire roundtrip preserves a sourced key, even when the
        /// source itself contains the delimiter.
        #[test]
        fn prop_sourced_key_wire_roundtrip(
            name in "[a-zA-Z0-9_-]{1,16}",
            source in "[a-zA-Z0-9:._-]{1,16}",
        ) {
            let key = RelationshipKey::sourced(name.clone(), source.clone());
            let parsed = RelationshipKey::from(key.to_string());
            prop_assert_eq!(parsed, key);
        }

        /// Property: wire roundtrip preserves an unsourced key.
        #[test]
        fn prop_unsourced_key_wire_roundtrip(name in "[a-zA-Z0-9_-]{1,16}") {
            let key = RelationshipKey::unsourced(name.clone());
            let parsed = RelationshipKey::from(key.to_string());
            prop_assert_eq!(parsed, key);
        }

        /// Property: parsing splits on the first delimiter only, never a
        /// later one.
        #[test]
        fn prop_parse_splits_on_first_delimiter(
            name in "[a-zA-Z0-9_-]{1,16}",
            source in "[a-zA-Z0-9:._-]{1,16}",
        ) {
            let wire = format!("{}:{}", name, source);
            let parsed = RelationshipKey::from(wire);
            prop_assert_eq!(parsed.name(), name.as_str());
            prop_assert_eq!(parsed.source(), Some(source.as_str()));
        }
    }
}
