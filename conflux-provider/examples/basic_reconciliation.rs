//! Basic Reconciliation Example
//!
//! Demonstrates the fundamental CONFLUX workflow:
//! 1. Declare a caching agent's entity types (authoritative vs informative)
//! 2. Reconcile a collection cycle into the cache
//! 3. Read merged entities back
//! 4. Let a second agent enrich the same entity
//! 5. Watch an authoritative re-report evict stale entries
//!
//! This example uses the in-memory store for simplicity. Persistent
//! backends implement the same `BackingStore` trait.

use conflux_core::{AgentDataTypes, CacheData, CacheResult, ConfluxResult};
use conflux_provider::ProviderCache;
use conflux_storage::InMemoryStore;
use serde_json::json;
use std::sync::Arc;

fn main() -> ConfluxResult<()> {
    println!("=== CONFLUX Basic Reconciliation Example ===\n");

    // Step 1: Initialize the engine over an in-memory store
    let cache = ProviderCache::new(Arc::new(InMemoryStore::new()));
    println!("✓ Engine initialized (in-memory store)");

    // Step 2: Declare what the compute agent produces
    let compute_types = AgentDataTypes::builder()
        .authoritative("serverGroups")
        .informative("loadBalancers")
        .build()?;
    println!("\n✓ Classification built");
    println!("  Authoritative: {:?}", compute_types.authoritative());
    println!("  Informative: {:?}", compute_types.informative());

    // Step 3: Reconcile the first collection cycle
    let first_cycle = CacheResult::new()
        .with_data(
            "serverGroups",
            vec![
                CacheData::new("payments-v001")
                    .with_attribute("region", json!("us-east-1"))
                    .with_attribute("capacity", json!(3))
                    .with_relationship("instances", ["i-01", "i-02", "i-03"]),
                CacheData::new("billing-v007")
                    .with_attribute("region", json!("us-east-1"))
                    .with_relationship("instances", ["i-11"]),
            ],
        )
        .with_data(
            "loadBalancers",
            vec![CacheData::new("payments-elb")
                .with_relationship("serverGroups", ["payments-v001"])],
        );
    cache.put_cache_result("compute-agent", &compute_types, first_cycle)?;
    println!("\n✓ First cycle reconciled");
    println!("  serverGroups: {:?}", cache.identifiers("serverGroups")?);
    println!("  loadBalancers: {:?}", cache.identifiers("loadBalancers")?);

    // Step 4: Read one entity back, relationships merged
    let payments = cache
        .get("serverGroups", "payments-v001", None)?
        .expect("entity should exist");
    println!("\n✓ Retrieved payments-v001");
    println!("  region: {}", payments.attributes["region"]);
    println!("  instances: {:?}", payments.relationships["instances"]);

    // Step 5: A monitoring agent enriches the same server group
    let monitoring_types = AgentDataTypes::builder()
        .informative("serverGroups")
        .build()?;
    let enrichment = CacheResult::new().with_data(
        "serverGroups",
        vec![CacheData::new("payments-v001")
            .with_attribute("healthState", json!("Up"))
            .with_relationship("instances", ["i-04"])],
    );
    cache.put_cache_result("monitoring-agent", &monitoring_types, enrichment)?;

    let merged = cache
        .get("serverGroups", "payments-v001", None)?
        .expect("entity should exist");
    println!("\n✓ Second agent merged into payments-v001");
    println!("  healthState: {}", merged.attributes["healthState"]);
    println!("  instances: {:?}", merged.relationships["instances"]);

    // Step 6: The next compute cycle no longer reports billing-v007
    let second_cycle = CacheResult::new().with_data(
        "serverGroups",
        vec![CacheData::new("payments-v001")
            .with_attribute("region", json!("us-east-1"))
            .with_relationship("instances", ["i-01", "i-02", "i-03"])],
    );
    cache.put_cache_result("compute-agent", &compute_types, second_cycle)?;
    println!("\n✓ Second cycle reconciled");
    println!("  serverGroups: {:?}", cache.identifiers("serverGroups")?);
    println!(
        "  billing-v007 present: {}",
        cache.get("serverGroups", "billing-v007", None)?.is_some()
    );

    // Step 7: Filter identifiers with a glob
    let payment_groups = cache.filter_identifiers("serverGroups", "payments-*")?;
    println!("\n✓ Glob filter 'payments-*': {:?}", payment_groups);

    println!("\n=== Example Complete ===");
    println!("This demonstrates the core reconciliation loop:");
    println!("  declare types → reconcile cycles → read merged views");

    Ok(())
}
