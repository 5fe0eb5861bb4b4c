//! Property-Based Tests for the Merged Read Path
//!
//! **Property 1: Relationship Names Round-Trip**
//! Relationship names an agent writes come back exactly as written; the
//! attribution added on store never leaks into reads.
//!
//! **Property 2: Relationship Union Across Agents**
//! Two agents relating the same entity under the same name produce the
//! union of their target sets on read.
//!
//! **Property 3: Reserved Id Invisibility**
//! The reserved bookkeeping id never surfaces through any read operation,
//! even when a legacy writer planted it in the entity namespace.
//!
//! **Property 4: Filtered Reads**
//! A relationship filter keeps exactly the included names.
//!
//! **Property 5: Listing and Point Reads Agree**
//! Every id a listing returns is individually readable, and batch reads
//! return one entity per stored id.

use conflux_core::{AgentDataTypes, CacheData, CacheResult, RelationshipFilter, StoredData};
use conflux_provider::ProviderCache;
use conflux_storage::{BackingStore, InMemoryStore};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn engine() -> (Arc<InMemoryStore>, ProviderCache<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let cache = ProviderCache::new(Arc::clone(&store));
    (store, cache)
}

fn informative(type_name: &str) -> AgentDataTypes {
    AgentDataTypes::builder()
        .informative(type_name)
        .build()
        .expect("valid classification")
}

fn single_record_report(type_name: &str, record: CacheData) -> CacheResult {
    CacheResult::new().with_data(type_name, vec![record])
}

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

/// Strategy for sets of relationship-type names.
fn relationship_names_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z][a-zA-Z0-9]{0,10}", 1..5)
}

/// Strategy for non-empty sets of entity ids.
fn id_set_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z][a-z0-9-]{0,11}", 1..8)
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Relationship Names Round-Trip**
    ///
    /// Every relationship name written is read back unchanged, with no
    /// attribution suffix and nothing extra.
    #[test]
    fn prop_relationship_names_roundtrip(names in relationship_names_strategy()) {
        let (_, cache) = engine();
        let types = informative("serverGroups");

        let mut record = CacheData::new("sg-1");
        for name in &names {
            record = record.with_relationship(name.clone(), ["target-1"]);
        }
        cache
            .put_cache_result("aws-agent", &types, single_record_report("serverGroups", record))
            .expect("put should succeed");

        let found = cache
            .get("serverGroups", "sg-1", None)
            .expect("get should succeed")
            .expect("entity should exist");
        let read_names: BTreeSet<String> = found.relationships.keys().cloned().collect();
        prop_assert_eq!(read_names, names);
    }

    /// **Property 2: Relationship Union Across Agents**
    ///
    /// Target sets written by different agents under the same name union
    /// on read.
    #[test]
    fn prop_relationship_targets_union_across_agents(
        from_a in id_set_strategy(),
        from_b in id_set_strategy(),
    ) {
        let (_, cache) = engine();
        let types = informative("serverGroups");

        let record_a = CacheData::new("sg-1").with_relationship("instances", from_a.clone());
        cache
            .put_cache_result("agent-a", &types, single_record_report("serverGroups", record_a))
            .expect("put should succeed");
        let record_b = CacheData::new("sg-1").with_relationship("instances", from_b.clone());
        cache
            .put_cache_result("agent-b", &types, single_record_report("serverGroups", record_b))
            .expect("put should succeed");

        let found = cache
            .get("serverGroups", "sg-1", None)
            .expect("get should succeed")
            .expect("entity should exist");
        let expected: BTreeSet<String> = from_a.union(&from_b).cloned().collect();
        prop_assert_eq!(&found.relationships["instances"], &expected);
    }

    /// **Property 3: Reserved Id Invisibility**
    ///
    /// With a legacy bookkeeping record planted directly in the store, the
    /// engine's reads still return only user entities.
    #[test]
    fn prop_reserved_id_never_surfaces(ids in id_set_strategy()) {
        let (store, cache) = engine();
        let types = informative("serverGroups");

        let records = ids.iter().map(|id| CacheData::new(id.clone())).collect();
        cache
            .put_cache_result("aws-agent", &types, CacheResult::new().with_data("serverGroups", records))
            .expect("put should succeed");
        store
            .merge("serverGroups", StoredData::new("_ALL_"))
            .expect("merge should succeed");

        prop_assert!(cache
            .get("serverGroups", "_ALL_", None)
            .expect("get should succeed")
            .is_none());

        let listed = cache
            .identifiers("serverGroups")
            .expect("identifiers should succeed");
        prop_assert_eq!(&listed, &ids);

        let globbed = cache
            .filter_identifiers("serverGroups", "*")
            .expect("filter should succeed");
        prop_assert_eq!(&globbed, &ids);

        let fetched = cache
            .get_all("serverGroups", None)
            .expect("get_all should succeed");
        prop_assert_eq!(fetched.len(), ids.len());
    }

    /// **Property 4: Filtered Reads**
    ///
    /// Filtering to a subset of the written relationship names returns
    /// exactly that subset.
    #[test]
    fn prop_filtered_read_keeps_included_names(names in relationship_names_strategy()) {
        let (_, cache) = engine();
        let types = informative("serverGroups");

        let mut record = CacheData::new("sg-1");
        for name in &names {
            record = record.with_relationship(name.clone(), ["target-1"]);
        }
        cache
            .put_cache_result("aws-agent", &types, single_record_report("serverGroups", record))
            .expect("put should succeed");

        let included: BTreeSet<String> = names.iter().step_by(2).cloned().collect();
        let filter = RelationshipFilter::include(included.iter().cloned());
        let found = cache
            .get("serverGroups", "sg-1", Some(&filter))
            .expect("get should succeed")
            .expect("entity should exist");
        let read_names: BTreeSet<String> = found.relationships.keys().cloned().collect();
        prop_assert_eq!(read_names, included);
    }

    /// **Property 5: Listing and Point Reads Agree**
    ///
    /// Each listed id resolves through `get`, batch reads return one
    /// entity per id, and `existing_identifiers` confirms exactly the
    /// stored subset.
    #[test]
    fn prop_listing_matches_point_reads(ids in id_set_strategy()) {
        let (_, cache) = engine();
        let types = informative("serverGroups");

        let records = ids.iter().map(|id| CacheData::new(id.clone())).collect();
        cache
            .put_cache_result("aws-agent", &types, CacheResult::new().with_data("serverGroups", records))
            .expect("put should succeed");

        let listed = cache
            .identifiers("serverGroups")
            .expect("identifiers should succeed");
        prop_assert_eq!(&listed, &ids);

        for id in &listed {
            let found = cache
                .get("serverGroups", id, None)
                .expect("get should succeed");
            prop_assert!(found.is_some(), "listed id {} should resolve", id);
        }

        let mut requested: Vec<String> = ids.iter().cloned().collect();
        requested.push("MISSING".to_string());
        let fetched = cache
            .get_many("serverGroups", &requested, None)
            .expect("get_many should succeed");
        prop_assert_eq!(fetched.len(), ids.len());

        let existing = cache
            .existing_identifiers("serverGroups", &requested)
            .expect("existing should succeed");
        prop_assert_eq!(existing, ids);
    }
}
