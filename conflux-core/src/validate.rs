//! Type-name validation.
//!
//! The `:` character is reserved for relationship-key namespacing, so no
//! entity type name may contain it. Validation runs synchronously before
//! any store access on every public operation that takes type names.

use crate::error::ValidationError;

/// Delimiter reserved for relationship-key namespacing.
pub const RESERVED_DELIMITER: char = ':';

/// Check a single type name for the reserved delimiter.
pub fn validate_type_name(type_name: &str) -> Result<(), ValidationError> {
    if type_name.contains(RESERVED_DELIMITER) {
        return Err(ValidationError::ReservedDelimiter {
            names: vec![type_name.to_string()],
        });
    }
    Ok(())
}

/// Check a batch of type names, reporting every offender at once rather
/// than failing on the first.
pub fn validate_type_names<I, S>(type_names: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = type_names
        .into_iter()
        .filter(|name| name.as_ref().contains(RESERVED_DELIMITER))
        .map(|name| name.as_ref().to_string())
        .collect();
    if names.is_empty() {
        return Ok(());
    }
    names.sort();
    names.dedup();
    Err(ValidationError::ReservedDelimiter { names })
}

// =============================================================================
// TESTS
// =============================================================================
