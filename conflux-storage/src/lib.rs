//! CONFLUX Storage - Backing Store Contract and In-Memory Reference
//!
//! Defines the keyed store the provider engine writes through, plus an
//! in-memory implementation of it. Persistent backends live out of tree;
//! everything they must honor is specified on the trait.

pub mod memory;

pub use memory::InMemoryStore;

use conflux_core::{ConfluxResult, Contribution, RelationshipFilter, StoredData};
use std::collections::BTreeSet;

// ============================================================================
// BACKING STORE TRAIT
// ============================================================================

/// Backing key/value store for cached entities, grouped by type.
///
/// Implementations provide atomic per-(type, id) merge, batch eviction, and
/// the per-(type, agent) contribution ledger the engine's eviction delta
/// reads. The ledger lives in its own namespace: nothing written through
/// [`BackingStore::merge_all`]'s contribution argument is ever visible to
/// the read operations. All operations are synchronous with respect to the
/// caller; failures propagate unmodified and carry no retry policy.
pub trait BackingStore: Send + Sync {
    // === Read Operations ===

    /// Get one record, or `None` when it is absent or expired.
    fn get(
        &self,
        type_name: &str,
        id: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Option<StoredData>>;

    /// Get every record of a type.
    fn get_all(
        &self,
        type_name: &str,
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<StoredData>>;

    /// Get the named records of a type; missing ids are skipped.
    fn get_many(
        &self,
        type_name: &str,
        ids: &[String],
        filter: Option<&RelationshipFilter>,
    ) -> ConfluxResult<Vec<StoredData>>;

    /// Every stored id of a type.
    fn identifiers(&self, type_name: &str) -> ConfluxResult<BTreeSet<String>>;

    /// Stored ids of a type matching a shell-style glob (`*` and `?`).
    fn filter_identifiers(&self, type_name: &str, glob: &str) -> ConfluxResult<BTreeSet<String>>;

    /// The subset of `ids` stored for a type.
    fn existing_identifiers(
        &self,
        type_name: &str,
        ids: &[String],
    ) -> ConfluxResult<BTreeSet<String>>;

    // === Write Operations ===

    /// Upsert one record with merge semantics: attributes merge per name
    /// with the incoming value winning, each incoming relationship key
    /// replaces its previous id set while keys absent from the incoming
    /// record survive, and the ttl takes the incoming value. Never touches
    /// the contribution ledger.
    fn merge(&self, type_name: &str, record: StoredData) -> ConfluxResult<()>;

    /// Upsert a batch with the same per-record semantics. When a
    /// contribution is given, the ledger entry for `(type_name,
    /// contribution.source)` is replaced in the same atomic operation.
    fn merge_all(
        &self,
        type_name: &str,
        records: Vec<StoredData>,
        contribution: Option<Contribution>,
    ) -> ConfluxResult<()>;

    /// Delete records; ids that do not exist are ignored. Ledger entries
    /// are left untouched.
    fn evict_all(&self, type_name: &str, ids: &[String]) -> ConfluxResult<()>;

    // === Contribution Ledger ===

    /// The last-write record for `(type_name, source)`, if any.
    fn contribution(&self, type_name: &str, source: &str) -> ConfluxResult<Option<Contribution>>;
}
