//! Agent data-type classification and per-cycle results.
//!
//! Every caching agent declares the entity types it produces and under what
//! contract before the engine will reconcile its output. The classification
//! is validated at construction and immutable afterwards, so the engine
//! never has to re-check it.

use crate::data::CacheData;
use crate::error::ClassificationError;
use std::collections::{BTreeSet, HashMap};

/// How a caching agent relates to the entity types it declares.
///
/// An authoritative type is a complete snapshot: any id the agent stored
/// last cycle but left out of the new report is deleted. An informative
/// type is additive only. The optional on-demand type is populated outside
/// the normal cycle and behaves like an informative type for eviction.
///
/// Built through [`AgentDataTypes::builder`]; an empty, overlapping, or
/// colliding classification cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDataTypes {
    authoritative: BTreeSet<String>,
    informative: BTreeSet<String>,
    on_demand: Option<String>,
}

impl AgentDataTypes {
    /// Start building a classification.
    pub fn builder() -> AgentDataTypesBuilder {
        AgentDataTypesBuilder::default()
    }

    /// Types this agent reports as complete snapshots.
    pub fn authoritative(&self) -> &BTreeSet<String> {
        &self.authoritative
    }

    /// Types this agent contributes to additively.
    pub fn informative(&self) -> &BTreeSet<String> {
        &self.informative
    }

    /// Type populated outside the normal cycle, if declared.
    pub fn on_demand(&self) -> Option<&str> {
        self.on_demand.as_deref()
    }

    /// Union of every declared type, on-demand included.
    pub fn all_declared(&self) -> BTreeSet<&str> {
        let mut all: BTreeSet<&str> = self.authoritative.iter().map(String::as_str).collect();
        all.extend(self.informative.iter().map(String::as_str));
        if let Some(on_demand) = &self.on_demand {
            all.insert(on_demand.as_str());
        }
        all
    }
}

/// Accumulates type declarations and validates them on build.
#[derive(Debug, Clone, Default)]
pub struct AgentDataTypesBuilder {
    authoritative: BTreeSet<String>,
    informative: BTreeSet<String>,
    on_demand: Option<String>,
}

impl AgentDataTypesBuilder {
    /// Declare an authoritative type.
    pub fn authoritative(mut self, type_name: impl Into<String>) -> Self {
        self.authoritative.insert(type_name.into());
        self
    }

    /// Declare an informative type.
    pub fn informative(mut self, type_name: impl Into<String>) -> Self {
        self.informative.insert(type_name.into());
        self
    }

    /// Declare the on-demand type, replacing any previous one.
    pub fn on_demand(mut self, type_name: impl Into<String>) -> Self {
        self.on_demand = Some(type_name.into());
        self
    }

    /// Validate and freeze the classification.
    ///
    /// Fails when nothing authoritative or informative was declared, when a
    /// type appears in both sets, or when the on-demand type collides with
    /// either set.
    pub fn build(self) -> Result<AgentDataTypes, ClassificationError> {
        if self.authoritative.is_empty() && self.informative.is_empty() {
            return Err(ClassificationError::NoDeclaredTypes);
        }

        let overlap: Vec<String> = self
            .authoritative
            .intersection(&self.informative)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(ClassificationError::Overlapping { names: overlap });
        }

        if let Some(on_demand) = &self.on_demand {
            if self.authoritative.contains(on_demand) || self.informative.contains(on_demand) {
                return Err(ClassificationError::OnDemandCollision {
                    type_name: on_demand.clone(),
                });
            }
        }

        Ok(AgentDataTypes {
            authoritative: self.authoritative,
            informative: self.informative,
            on_demand: self.on_demand,
        })
    }
}

/// Everything a caching agent produced in one collection cycle.
///
/// Entities are grouped by type; the eviction map names ids the agent wants
/// removed explicitly. An id that appears both in the data and in the
/// evictions for the same type survives the call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheResult {
    /// Entities produced this cycle, per type.
    pub results: HashMap<String, Vec<CacheData>>,
    /// Ids to evict explicitly, per type.
    pub evictions: HashMap<String, BTreeSet<String>>,
}

impl CacheResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the entities produced for one type.
    pub fn with_data(mut self, type_name: impl Into<String>, items: Vec<CacheData>) -> Self {
        self.results.entry(type_name.into()).or_default().extend(items);
        self
    }

    /// Add explicit evictions for one type.
    pub fn with_evictions<I, S>(mut self, type_name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evictions
            .entry(type_name.into())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
