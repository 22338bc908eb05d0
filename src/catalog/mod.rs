//! Catalog module - command registration, lookup and ranked search
//!
//! # Module Structure
//!
//! - `types` - Command ids, descriptors, registration shapes, results
//! - `fingerprint` - Content-derived command ids
//! - `normalize` - Registration + overrides → canonical fields
//! - `search` - The find → rank → slice pipeline
//! - `highlight` - Match positions for UI highlighting
//! - `index` - `CatalogIndex`, the owner of all entries

mod fingerprint;
mod highlight;
mod index;
mod normalize;
mod search;
mod types;

pub use fingerprint::fingerprint;
pub use highlight::match_indices;
pub use index::CatalogIndex;
pub use normalize::{CONTEXT_MENU_CATEGORY, MENU_PATH_SEPARATOR};
pub use types::{
    CommandDescriptor, CommandId, MissingRegistration, NativeCommand, QueryResult, RawDescriptor,
    Registration,
};

// Callback contracts live with the gateway but are part of this API
pub use crate::gateway::{Action, CommandState, Validation};

#[cfg(test)]
#[path = "../catalog_tests.rs"]
mod tests;
