//! Mapping from autocompleter names to their registered providers.

use crate::error::{AutocompleteError, Result};
use crate::index::store::KEY_SEPARATOR;
use crate::provider::ProviderHandle;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only table of configurations, built once at startup.
///
/// Each configuration keeps its providers in registration order, which is
/// also the tie-break order between providers in merged results.
#[derive(Clone, Default)]
pub struct Registry {
  configs: BTreeMap<String, Vec<Arc<dyn ProviderHandle>>>,
}

impl Registry {
  pub fn builder() -> RegistryBuilder {
    RegistryBuilder::default()
  }

  /// Providers of a configuration, or `None` when the name is unknown.
  pub fn providers(&self, name: &str) -> Option<&[Arc<dyn ProviderHandle>]> {
    self.configs.get(name).map(Vec::as_slice)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.configs.keys().map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.configs.contains_key(name)
  }
}

/// Collects registrations and validates them in [`build`](RegistryBuilder::build).
///
/// # Examples
///
/// ```
/// # use autocompleter::prelude::*;
/// # use std::sync::Arc;
/// # struct Word;
/// # impl Provider for Word {
/// #   type Record = String;
/// #   fn provider_name(&self) -> &str { "word" }
/// #   fn get_term(&self, r: &String) -> Option<String> { Some(r.clone()) }
/// #   fn get_data(&self, _r: &String) -> Payload { Payload::new() }
/// # }
/// let words: Arc<dyn ProviderHandle> =
///   Arc::new(DictBacked::new(Word, [("1".to_string(), "hello".to_string())]));
///
/// let registry = Registry::builder()
///   .register("words", words.clone())
///   .register("mixed", words.clone())
///   .register("mixed", words)
///   .build()
///   .unwrap();
///
/// assert_eq!(registry.providers("mixed").map(|p| p.len()), Some(1));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
  configs: BTreeMap<String, Vec<Arc<dyn ProviderHandle>>>,
  errors: Vec<String>,
}

impl RegistryBuilder {
  /// Adds a provider to a configuration.
  ///
  /// Registering the same provider twice under one name is a no-op. The
  /// same provider may be registered under several names.
  pub fn register(mut self, name: impl Into<String>, provider: Arc<dyn ProviderHandle>) -> Self {
    let name = name.into();
    if let Err(reason) = check_name(&name).and_then(|_| check_name(provider.provider_name())) {
      self.errors.push(reason);
      return self;
    }

    let providers = self.configs.entry(name.clone()).or_default();
    let existing = providers
      .iter()
      .find(|existing| existing.provider_name() == provider.provider_name())
      .cloned();
    match existing {
      Some(existing) if same_handle(&existing, &provider) => {}
      Some(_) => self.errors.push(format!(
        "two different providers named `{}` in `{name}`",
        provider.provider_name()
      )),
      None => providers.push(provider),
    }
    self
  }

  pub fn build(self) -> Result<Registry> {
    if let Some(reason) = self.errors.into_iter().next() {
      return Err(AutocompleteError::InvalidName(reason));
    }
    Ok(Registry {
      configs: self.configs,
    })
  }
}

fn check_name(name: &str) -> std::result::Result<(), String> {
  if name.is_empty() || name.contains(KEY_SEPARATOR) {
    Err(format!("`{}` cannot be used as a name", name.escape_debug()))
  } else {
    Ok(())
  }
}

fn same_handle(a: &Arc<dyn ProviderHandle>, b: &Arc<dyn ProviderHandle>) -> bool {
  std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::{DictBacked, Provider};
  use crate::types::Payload;

  struct Named(&'static str);

  impl Provider for Named {
    type Record = String;

    fn provider_name(&self) -> &str {
      self.0
    }

    fn get_term(&self, record: &String) -> Option<String> {
      Some(record.clone())
    }

    fn get_data(&self, _record: &String) -> Payload {
      Payload::new()
    }
  }

  fn handle(name: &'static str) -> Arc<dyn ProviderHandle> {
    Arc::new(DictBacked::new(Named(name), Vec::new()))
  }

  #[test]
  fn test_registration_order_and_idempotence() {
    let stock = handle("stock");
    let ind = handle("ind");
    let registry = Registry::builder()
      .register("mixed", stock.clone())
      .register("mixed", ind.clone())
      .register("mixed", stock.clone())
      .register("stock", stock)
      .build()
      .unwrap();

    let names: Vec<_> = registry
      .providers("mixed")
      .unwrap()
      .iter()
      .map(|p| p.provider_name().to_string())
      .collect();
    assert_eq!(names, vec!["stock", "ind"]);
    assert!(registry.contains("stock"));
    assert!(registry.providers("nope").is_none());
  }

  #[test]
  fn test_conflicting_provider_names_rejected() {
    let result = Registry::builder()
      .register("mixed", handle("stock"))
      .register("mixed", handle("stock"))
      .build();
    assert!(matches!(result, Err(AutocompleteError::InvalidName(_))));
  }

  #[test]
  fn test_separator_in_name_rejected() {
    let result = Registry::builder()
      .register(format!("bad{KEY_SEPARATOR}name"), handle("stock"))
      .build();
    assert!(result.is_err());
  }
}
