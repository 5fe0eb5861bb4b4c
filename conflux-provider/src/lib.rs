//! CONFLUX Provider - Cache Reconciliation Engine
//!
//! The write path caching agents feed and the merged read path consumers
//! see. `ProviderCache` turns per-cycle agent reports into batch stores and
//! eviction deltas, driven by each agent's declared classification. The
//! engine holds no state of its own; everything lives in the backing store.

use conflux_core::{
    validate_type_name, validate_type_names, AgentDataTypes, CacheData, CacheResult,
    ConfluxResult, Contribution, CorruptionError, RelationshipFilter, RelationshipKey,
    StoredData, ValidationError,
};
use conflux_storage::BackingStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Entity id reserved for bookkeeping records in stores written by older
/// releases. Rejected on writes and stripped from reads so it can never
/// surface as user data.
const ALL_ID: &str = "_ALL_";

// ============================================================================
// PROVIDER CACHE
// ============================================================================

/// Reconciliation engine between caching agents and a backing store.
///
/// Agents report complete or additive snapshots per entity type through
/// [`ProviderCache::put_cache_result`]; consumers read merged entities back
/// through [`ProviderCache::get`] and friends. On write, every relationship
/// is attributed to the reporting agent; on read, attribution is stripped
/// and target-id sets are unioned across agents, so readers see one logical
/// relationship map per entity no matter how many agents contributed to it.
///
/// The engine is cheap to clone and safe to share across workers; all
/// coordination is delegated to the store's merge contract.
pub struct ProviderCache<C>
where
    C: BackingStore,
{
    store: Arc<C>,
}

impl<C> ProviderCache<C>
where
    C: BackingStore,
{
    /// Create an engine over a backing store.
    pub fn new(store: Arc<C>) -> Self {
        Self { store }
    }

    /// Backing store handle.
    pub fn store(&self) -> &C {
        &self.store
    }

    // === Agent Write Path ===

    /// Reconcile one agent's collection cycle into the store.
    ///
    /// Explicit evictions seed the pending set. For every authoritative
    /// type the agent declares, ids it contributed last cycle but left out
    /// of this report join the pending set. Every declared type's batch is
    /// then stored and the agent's ledger entry for it replaced, informative
    /// and on-demand types included, and each id just stored is exempted
    /// from eviction; freshly written data survives the call even when the
    /// same id was listed for explicit eviction. Types present in the
    /// result but never declared are stored the same way. Whatever remains
    /// pending is evicted per type, and the first store or eviction failure
    /// aborts the remainder.
    pub fn put_cache_result(
        &self,
        source: &str,
        types: &AgentDataTypes,
        result: CacheResult,
    ) -> ConfluxResult<()> {
        validate_result(types, &result)?;

        let CacheResult {
            mut results,
            evictions,
        } = result;
        let mut pending: BTreeMap<String, BTreeSet<String>> = evictions.into_iter().collect();

        // Delta reads must land before any write below replaces the ledger
        // entries they read from.
        for type_name in types.authoritative() {
            let previous = match self.store.contribution(type_name, source)? {
                Some(previous) => previous,
                None => continue,
            };
            let incoming: BTreeSet<&str> = results
                .get(type_name)
                .map(|batch| batch.iter().map(|record| record.id.as_str()).collect())
                .unwrap_or_default();
            pending.entry(type_name.clone()).or_default().extend(
                previous
                    .ids
                    .into_iter()
                    .filter(|id| !incoming.contains(id.as_str())),
            );
        }

        // Every declared type is stored even with no data, so an empty
        // authoritative report leaves an empty ledger entry behind.
        for type_name in types.all_declared() {
            let batch = results.remove(type_name).unwrap_or_default();
            let stored = self.store_batch(type_name, source, batch)?;
            exempt(&mut pending, type_name, &stored);
        }

        // Escape hatch for agents that report beyond their declaration.
        let undeclared: BTreeMap<String, Vec<CacheData>> = results.into_iter().collect();
        for (type_name, batch) in undeclared {
            tracing::warn!(
                source = %source,
                type_name = %type_name,
                "Storing data for a type the agent does not declare"
            );
            let stored = self.store_batch(&type_name, source, batch)?;
            exempt(&mut pending, &type_name, &stored);
        }

        for (type_name, ids) in pending {
            if ids.is_empty() {
                continue;
            }
            tracing::debug!(type_name = %type_name, count = ids.len(), "Evicting stale entities");
            let ids: Vec<String> = ids.into_iter().collect();
            self.store.evict_all(&type_name, &ids)?;
        }
        Ok(())
    }

    /// Store an agent's batches without any eviction-delta computation.
    ///
    /// Ledger entries are still replaced for the types present in the
    /// result, so a later authoritative reconciliation treats these ids as
    /// contributed. Explicit evictions in the result are ignored.
    pub fn add_cache_result(
        &self,
        source: &str,
        types: &AgentDataTypes,
        result: CacheResult,
    ) -> ConfluxResult<()> {
        validate_result(types, &result)?;

        let batches: BTreeMap<String, Vec<CacheData>> = result.results.into_iter().collect();
        for (type_name, batch) in batches {
            self.store_batch(&type_name, source, batch)?;
        }
        Ok(())
    }

    /// Merge one record directly into a type's storage namespace.
    ///
    /// No ledger bookkeeping happens and relationship names pass through
    /// verbatim: a name carrying `:` becomes a sourced key, anything else
    /// lands unsourced and cannot be read back through the merging read
    /// path.
    pub fn put_cache_data(&self, type_name: &str, record: CacheData) -> ConfluxResult<()> {
        validate_type_name(type_name)?;
        if record.id == ALL_ID {
            return Err(ValidationError::ReservedId { id: record.id }.into());
        }
        self.store.merge(type_name, parse_relationships(record))
    }

    /// Delete records of a type; ids that do not exist are ignored.
    ///
    /// Ledger entries are left as they are, so the next authoritative
    /// report from the contributing agent is diffed against its full last
    /// batch regardless of out-of-band deletions.
    pub fn evict_deleted_items(&self, type_name: &str, ids: &[String]) -> ConfluxResult<()> {
        validate_type_name(type_name)?;
        self.store.evict_all(type_name, ids)
    }

    // === Read Path ===

    /// Get one entity with relationships merged across contributing agents.
    ///
    /// The reserved bookkeeping id is never looked up; asking for it
    /// returns `None`.
    pub fn get(
        &self,
        type_name: &str,
        id: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Option<CacheData>> {
        validate_type_name(type_name)?;
        if id == ALL_ID {
            return Ok(None);
        }
        Ok(self
            .store
            .get(type_name, id, filter)?
            .map(merge_relationships)
            .transpose()?)
    }

    /// Get every entity of a type, relationship-merged.
    pub fn get_all(
        &self,
        type_name: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<CacheData>> {
        validate_type_name(type_name)?;
        self.store
            .get_all(type_name, filter)?
            .into_iter()
            .filter(|record| record.id != ALL_ID)
            .map(merge_relationships)
            .collect()
    }

    /// Get the named entities of a type, relationship-merged; missing ids
    /// are skipped.
    pub fn get_many(
        &self,
        type_name: &str,
        ids: &[String],
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<CacheData>> {
        validate_type_name(type_name)?;
        self.store
            .get_many(type_name, ids, filter)?
            .into_iter()
            .filter(|record| record.id != ALL_ID)
            .map(merge_relationships)
            .collect()
    }

    /// Every stored id of a type.
    pub fn identifiers(&self, type_name: &str) -> ConfluxResult<BTreeSet<String>> {
        validate_type_name(type_name)?;
        let mut ids = self.store.identifiers(type_name)?;
        ids.remove(ALL_ID);
        Ok(ids)
    }

    /// Stored ids of a type matching a shell-style glob (`*` and `?`).
    pub fn filter_identifiers(
        &self,
        type_name: &str,
        glob: &str,
    ) -> ConfluxResult<BTreeSet<String>> {
        validate_type_name(type_name)?;
        let mut ids = self.store.filter_identifiers(type_name, glob)?;
        ids.remove(ALL_ID);
        Ok(ids)
    }

    /// The subset of `ids` stored for a type.
    pub fn existing_identifiers(
        &self,
        type_name: &str,
        ids: &[String],
    ) -> ConfluxResult<BTreeSet<String>> {
        validate_type_name(type_name)?;
        let mut ids = self.store.existing_identifiers(type_name, ids)?;
        ids.remove(ALL_ID);
        Ok(ids)
    }

    /// Store one agent's batch for one type and replace its ledger entry,
    /// returning the ids written.
    fn store_batch(
        &self,
        type_name: &str,
        source: &str,
        batch: Vec<CacheData>,
    ) -> ConfluxResult<BTreeSet<String>> {
        let mut contribution = Contribution::new(source);
        let mut records = Vec::with_capacity(batch.len());
        for item in batch {
            contribution.ids.insert(item.id.clone());
            contribution.ttl_seconds = contribution.ttl_seconds.max(item.ttl_seconds);
            records.push(attribute_relationships(item, source));
        }
        let stored = contribution.ids.clone();
        self.store.merge_all(type_name, records, Some(contribution))?;
        Ok(stored)
    }
}

impl<C> Clone for ProviderCache<C>
where
    C: BackingStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Check every type name a result touches and reject reserved record ids.
///
/// Offending type names are reported all at once: the declared set, the
/// result's data and eviction keys, and the relationship names inside each
/// record all count.
fn validate_result(types: &AgentDataTypes, result: &CacheResult) -> ConfluxResult<()> {
    let mut names: BTreeSet<&str> = types.all_declared();
    names.extend(result.results.keys().map(String::as_str));
    names.extend(result.evictions.keys().map(String::as_str));
    for batch in result.results.values() {
        for record in batch {
            names.extend(record.relationships.keys().map(String::as_str));
        }
    }
    validate_type_names(names)?;

    for batch in result.results.values() {
        for record in batch {
            if record.id == ALL_ID {
                return Err(ValidationError::ReservedId {
                    id: record.id.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Attribute every relationship in an agent-produced record to its agent.
fn attribute_relationships(record: CacheData, source: &str) -> StoredData {
    let CacheData {
        id,
        ttl_seconds,
        attributes,
        relationships,
    } = record;
    let relationships = relationships
        .into_iter()
        .map(|(name, ids)| (RelationshipKey::sourced(name, source), ids))
        .collect();
    StoredData {
        id,
        ttl_seconds,
        attributes,
        relationships,
    }
}

/// Convert a raw record's relationship names to stored keys verbatim,
/// splitting on the reserved delimiter where present.
fn parse_relationships(record: CacheData) -> StoredData {
    let CacheData {
        id,
        ttl_seconds,
        attributes,
        relationships,
    } = record;
    let relationships = relationships
        .into_iter()
        .map(|(name, ids)| (RelationshipKey::from(name), ids))
        .collect();
    StoredData {
        id,
        ttl_seconds,
        attributes,
        relationships,
    }
}

/// Collapse stored relationship keys to logical names, unioning target ids
/// across contributing agents. An unsourced key means the store was written
/// to outside the engine's contract.
fn merge_relationships(stored: StoredData) -> ConfluxResult<CacheData> {
    let StoredData {
        id,
        ttl_seconds,
        attributes,
        relationships,
    } = stored;
    let mut merged: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (key, ids) in relationships {
        match key.into_parts() {
            (name, Some(_)) => merged.entry(name).or_default().extend(ids),
            (name, None) => {
                return Err(CorruptionError::UnattributedRelationship { id, name }.into());
            }
        }
    }
    Ok(CacheData {
        id,
        ttl_seconds,
        attributes,
        relationships: merged,
    })
}

/// Shield freshly stored ids from this call's evictions.
fn exempt(
    pending: &mut BTreeMap<String, BTreeSet<String>>,
    type_name: &str,
    stored: &BTreeSet<String>,
) {
    if let Some(ids) = pending.get_mut(type_name) {
        ids.retain(|id| !stored.contains(id));
    }
}

// =============================================================================
// TESTS
// =============================================================================
