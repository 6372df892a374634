//! Error type shared by every component of the autocompleter.

/// Errors raised while building or querying an autocomplete index.
#[derive(Debug, thiserror::Error)]
pub enum AutocompleteError {
  /// A value handed to `normalize_rounding` was not a finite number.
  #[error("invalid numeric input: {0}")]
  InvalidNumber(String),

  /// The storage collaborator behind the index could not serve the request.
  #[error("index store unavailable: {0}")]
  StoreUnavailable(String),

  #[error("provider `{provider}` is not registered for autocompleter `{name}`")]
  ProviderNotRegistered { name: String, provider: String },

  /// Configuration and provider names become key segments and may not
  /// contain the key separator or be empty.
  #[error("invalid name `{0}`")]
  InvalidName(String),

  #[error("invalid settings: {0}")]
  InvalidSettings(#[from] serde_json::Error),

  #[error("invalid facets: {0}")]
  InvalidFacets(String),

  /// A provider's record source failed while it was being iterated.
  #[error("record source failed: {0}")]
  Source(String),

  #[error("corrupt index record at `{key}`: {source}")]
  CorruptRecord {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Crate-wide result alias.
pub type Result<T, E = AutocompleteError> = std::result::Result<T, E>;
