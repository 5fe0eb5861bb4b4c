//! In-memory backing store.
//!
//! Reference implementation of [`BackingStore`] over a single `RwLock`, so
//! every write operation is atomic across the record map and the
//! contribution ledger. Expiry is lazy: a record whose age exceeds a
//! non-negative ttl is treated as absent on read and replaced wholesale on
//! the next merge.

use crate::BackingStore;
use chrono::{DateTime, Duration, Utc};
use conflux_core::{
    ConfluxError, ConfluxResult, Contribution, RelationshipFilter, StoreError, StoredData,
};
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A stored record plus the timestamp its ttl counts from.
#[derive(Debug)]
struct VersionedRecord {
    data: StoredData,
    written_at: DateTime<Utc>,
}

impl VersionedRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.data.ttl_seconds >= 0
            && now.signed_duration_since(self.written_at)
                > Duration::seconds(self.data.ttl_seconds)
    }
}

/// A ledger entry plus the timestamp its ttl counts from.
#[derive(Debug)]
struct VersionedContribution {
    contribution: Contribution,
    written_at: DateTime<Utc>,
}

impl VersionedContribution {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.contribution.ttl_seconds >= 0
            && now.signed_duration_since(self.written_at)
                > Duration::seconds(self.contribution.ttl_seconds)
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// type -> id -> record
    records: HashMap<String, HashMap<String, VersionedRecord>>,
    /// type -> source agent -> ledger entry
    ledger: HashMap<String, HashMap<String, VersionedContribution>>,
}

/// In-memory [`BackingStore`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record and ledger entry.
    pub fn clear(&self) -> ConfluxResult<()> {
        let mut inner = self.write_inner()?;
        inner.records.clear();
        inner.ledger.clear();
        Ok(())
    }

    /// Number of types with at least one record, expired ones included.
    pub fn type_count(&self) -> ConfluxResult<usize> {
        let inner = self.read_inner()?;
        Ok(inner.records.values().filter(|records| !records.is_empty()).count())
    }

    /// Number of records held for a type, expired ones included.
    pub fn record_count(&self, type_name: &str) -> ConfluxResult<usize> {
        let inner = self.read_inner()?;
        Ok(inner.records.get(type_name).map_or(0, HashMap::len))
    }

    fn read_inner(&self) -> ConfluxResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| ConfluxError::Store(StoreError::LockPoisoned))
    }

    fn write_inner(&self) -> ConfluxResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| ConfluxError::Store(StoreError::LockPoisoned))
    }
}

impl BackingStore for InMemoryStore {
    // === Read Operations ===

    fn get(
        &self,
        type_name: &str,
        id: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Option<StoredData>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .and_then(|records| records.get(id))
            .filter(|record| !record.is_expired(now))
            .map(|record| apply_filter(record.data.clone(), filter)))
    }

    fn get_all(
        &self,
        type_name: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<StoredData>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .map(|records| {
                records
                    .values()
                    .filter(|record| !record.is_expired(now))
                    .map(|record| apply_filter(record.data.clone(), filter))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_many(
        &self,
        type_name: &str,
        ids: &[String],
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<StoredData>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .map(|records| {
                ids.iter()
                    .filter_map(|id| records.get(id))
                    .filter(|record| !record.is_expired(now))
                    .map(|record| apply_filter(record.data.clone(), filter))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn identifiers(&self, type_name: &str) -> ConfluxResult<BTreeSet<String>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, record)| !record.is_expired(now))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn filter_identifiers(&self, type_name: &str, glob: &str) -> ConfluxResult<BTreeSet<String>> {
        let pattern = compile_glob(glob)?;
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .map(|records| {
                records
                    .iter()
                    .filter(|(id, record)| !record.is_expired(now) && pattern.is_match(id))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn existing_identifiers(
        &self,
        type_name: &str,
        ids: &[String],
    ) -> ConfluxResult<BTreeSet<String>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .records
            .get(type_name)
            .map(|records| {
                ids.iter()
                    .filter(|id| {
                        records
                            .get(*id)
                            .is_some_and(|record| !record.is_expired(now))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    // === Write Operations ===

    fn merge(&self, type_name: &str, record: StoredData) -> ConfluxResult<()> {
        let now = Utc::now();
        let mut inner = self.write_inner()?;
        let records = inner.records.entry(type_name.to_string()).or_default();
        upsert(records, record, now);
        Ok(())
    }

    fn merge_all(
        &self,
        type_name: &str,
        records: Vec<StoredData>,
        contribution: Option<Contribution>,
    ) -> ConfluxResult<()> {
        let now = Utc::now();
        let mut inner = self.write_inner()?;

        let stored = inner.records.entry(type_name.to_string()).or_default();
        for record in records {
            upsert(stored, record, now);
        }

        if let Some(contribution) = contribution {
            inner
                .ledger
                .entry(type_name.to_string())
                .or_default()
                .insert(
                    contribution.source.clone(),
                    VersionedContribution {
                        contribution,
                        written_at: now,
                    },
                );
        }
        Ok(())
    }

    fn evict_all(&self, type_name: &str, ids: &[String]) -> ConfluxResult<()> {
        let mut inner = self.write_inner()?;
        if let Some(records) = inner.records.get_mut(type_name) {
            for id in ids {
                records.remove(id);
            }
        }
        Ok(())
    }

    // === Contribution Ledger ===

    fn contribution(&self, type_name: &str, source: &str) -> ConfluxResult<Option<Contribution>> {
        let now = Utc::now();
        let inner = self.read_inner()?;
        Ok(inner
            .ledger
            .get(type_name)
            .and_then(|sources| sources.get(source))
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.contribution.clone()))
    }
}

/// Merge one incoming record into the live map for its type.
///
/// An expired record is replaced wholesale rather than merged into, so a
/// dead record's attributes never resurface under a fresh ttl.
fn upsert(records: &mut HashMap<String, VersionedRecord>, record: StoredData, now: DateTime<Utc>) {
    match records.entry(record.id.clone()) {
        Entry::Occupied(mut slot) => {
            if slot.get().is_expired(now) {
                slot.insert(VersionedRecord {
                    data: record,
                    written_at: now,
                });
            } else {
                let existing = slot.get_mut();
                merge_into(&mut existing.data, record);
                existing.written_at = now;
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(VersionedRecord {
                data: record,
                written_at: now,
            });
        }
    }
}

/// Attributes merge per name with the incoming value winning; each incoming
/// relationship key replaces its previous id set; the ttl takes the
/// incoming value.
fn merge_into(existing: &mut StoredData, incoming: StoredData) {
    existing.ttl_seconds = incoming.ttl_seconds;
    existing.attributes.extend(incoming.attributes);
    existing.relationships.extend(incoming.relationships);
}

/// Drop relationship entries whose logical name the filter excludes.
fn apply_filter(mut data: StoredData, filter: Option<&RelationshipFilter>) -> StoredData {
    if let Some(filter) = filter {
        data.relationships.retain(|key, _| filter.matches(key.name()));
    }
    data
}

/// Compile a shell-style glob (`*` and `?`) to an anchored regex.
fn compile_glob(glob: &str) -> ConfluxResult<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 2);
    pattern.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|err| {
        ConfluxError::Store(StoreError::InvalidGlob {
            glob: glob.to_string(),
            reason: err.to_string(),
        })
    })
}

// =============================================================================
// TESTS
// =============================================================================
