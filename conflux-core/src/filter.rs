//! Read-side relationship filtering.

use std::collections::BTreeSet;

/// Restricts which relationship types a read materializes.
///
/// Matching is on the logical relationship-type name; the contributing
/// agent is invisible to filtering. Passing no filter at all returns every
/// relationship.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipFilter {
    include: BTreeSet<String>,
}

impl RelationshipFilter {
    /// Materialize only the named relationship types.
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Materialize no relationships at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the named relationship type passes the filter.
    pub fn matches(&self, name: &str) -> bool {
        self.include.contains(name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
