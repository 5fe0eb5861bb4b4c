//! CONFLUX Core - Data Types and Validation
//!
//! Defines the entity records, relationship keys, agent classification,
//! and error types shared by every CONFLUX crate. No storage logic lives
//! here; the backing store contract is in conflux-storage and the
//! reconciliation engine in conflux-provider.

pub mod agent;
pub mod data;
pub mod error;
pub mod filter;
pub mod validate;

pub use agent::{AgentDataTypes, AgentDataTypesBuilder, CacheResult};
pub use data::{CacheData, Contribution, RelationshipKey, StoredData};
pub use error::{
    ClassificationError, ConfluxError, ConfluxResult, CorruptionError, StoreError,
    ValidationError,
};
pub use filter::RelationshipFilter;
pub use validate::{validate_type_name, validate_type_names, RESERVED_DELIMITER};
