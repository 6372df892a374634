//! Mixed autocompleter over stocks and metrics.
//!
//! Run with `RUST_LOG=autocompleter=debug cargo run --example mixed` to see
//! the build and query events.

use autocompleter::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// A listed company.
#[derive(Debug, Clone)]
pub struct Company {
  pub id: u32,
  pub name: String,
  pub symbol: String,
  pub market_cap: f64,
  pub sector: String,
}

impl Company {
  pub fn new(id: u32, name: &str, symbol: &str, market_cap: f64, sector: &str) -> Self {
    Self {
      id,
      name: name.to_string(),
      symbol: symbol.to_string(),
      market_cap,
      sector: sector.to_string(),
    }
  }
}

impl Identified for Company {
  fn natural_id(&self) -> ItemId {
    self.id.to_string()
  }
}

struct CompanyProvider;

impl Provider for CompanyProvider {
  type Record = Company;

  fn provider_name(&self) -> &str {
    "stock"
  }

  fn get_terms(&self, c: &Company) -> Vec<String> {
    vec![c.name.clone(), c.symbol.clone()]
  }

  fn get_score(&self, c: &Company) -> f64 {
    c.market_cap
  }

  fn get_facets(&self) -> Vec<String> {
    vec!["sector".to_string()]
  }

  fn get_data(&self, c: &Company) -> Payload {
    json!({
      "type": "stock",
      "id": c.id,
      "score": c.market_cap,
      "display_name": format!("{} ({})", c.name, c.symbol),
      "sector": c.sector,
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
  }
}

struct MetricProvider;

impl Provider for MetricProvider {
  type Record = &'static str;

  fn provider_name(&self) -> &str {
    "metric"
  }

  fn get_term(&self, label: &&'static str) -> Option<String> {
    Some(label.to_string())
  }

  fn get_data(&self, label: &&'static str) -> Payload {
    json!({"type": "metric", "display_name": label})
      .as_object()
      .cloned()
      .unwrap_or_default()
  }

  fn get_phrase_aliases(&self) -> AliasTable {
    AliasTable::new().alias("EV", "Enterprise Value")
  }
}

fn sample_companies() -> Vec<Company> {
  vec![
    Company::new(1, "Apple Inc", "AAPL", 2900.0, "Technology"),
    Company::new(2, "Microsoft Corporation", "MSFT", 2800.0, "Technology"),
    Company::new(3, "Mastercard Incorporated", "MA", 380.0, "Financial Services"),
    Company::new(4, "Marathon Oil Corporation", "MRO", 15.0, "Energy"),
    Company::new(5, "Exxon Mobil Corporation", "XOM", 420.0, "Energy"),
  ]
}

fn print(title: &str, results: &[Suggestion]) {
  println!("{title}");
  for s in results {
    println!("  [{:>6}] {:<8} {}", s.score, s.provider, s.payload["display_name"]);
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let companies: Arc<dyn RecordSource<Company>> = Arc::new(sample_companies());
  let metrics = DictBacked::new(
    MetricProvider,
    [
      ("ev".to_string(), "Enterprise Value"),
      ("ev_sales".to_string(), "EV to Sales"),
      ("market_cap".to_string(), "Market Cap"),
    ],
  );

  let registry = Registry::builder()
    .register("mixed", Arc::new(ModelBacked::new(CompanyProvider, companies)))
    .register("mixed", Arc::new(metrics))
    .build()?;
  let settings = Settings::from_json(r#"{"match_out_of_order": true, "max_results": 5}"#)?;
  let engine = AutocompleteEngine::builder()
    .registry(registry)
    .settings(settings)
    .build();

  let mixed = engine.autocompleter("mixed");
  let indexed = mixed.store_all()?;
  println!("indexed {indexed} items\n");

  let options = SuggestOptions::default();
  print("ma:", &mixed.suggest("ma", &options)?);
  print("corporation oil:", &mixed.suggest("corporation oil", &options)?);
  print("enterprise:", &mixed.suggest("enterprise", &options)?);

  let facets = parse_facets(&json!([
    {"type": "or", "facets": [{"key": "sector", "value": "Energy"}]}
  ]))?;
  print(
    "corp, sector = Energy:",
    &mixed.suggest("corp", &options.clone().facets(facets))?,
  );

  mixed.remove_all()?;
  print("ma after remove_all:", &mixed.suggest("ma", &options)?);
  Ok(())
}
