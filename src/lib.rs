//! Autocompleter - prefix search over provider-supplied records.
//!
//! Records from any number of providers are normalized into terms and
//! indexed under a named configuration. Queries are expanded through phrase
//! aliases, matched against term prefixes in or out of word order, narrowed
//! by facet filters and merged into one ranked list.

pub mod alias;
pub mod cache;
pub mod engine;
pub mod error;
pub mod facets;
pub mod index;
pub mod matcher;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod types;

pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::alias::{AliasTable, AliasTarget};
    pub use crate::engine::*;
    pub use crate::error::{AutocompleteError, Result};
    pub use crate::facets::{check_facets, hash_facets, parse_facets, validate_facets, Facet, FacetGroup, FacetHash, FacetKind};
    pub use crate::index::*;
    pub use crate::normalize::{get_normalized_term, normalize_rounding, Normalizer};
    pub use crate::provider::*;
    pub use crate::registry::*;
    pub use crate::settings::*;
    pub use crate::types::*;
}
