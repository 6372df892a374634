#![allow(dead_code)]

use autocompleter::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Stock {
  pub id: u32,
  pub name: &'static str,
  pub symbol: &'static str,
  pub market_cap: f64,
  pub sector: &'static str,
  pub industry: &'static str,
  pub hidden: bool,
}

impl Identified for Stock {
  fn natural_id(&self) -> ItemId {
    self.id.to_string()
  }
}

#[derive(Debug, Clone)]
pub struct Indicator {
  pub id: u32,
  pub name: &'static str,
  pub internal_name: &'static str,
  pub score: f64,
}

impl Identified for Indicator {
  fn natural_id(&self) -> ItemId {
    self.id.to_string()
  }
}

#[derive(Debug, Clone)]
pub struct Metric {
  pub label: &'static str,
  pub short_label: &'static str,
  pub score: Option<f64>,
}

pub fn stock(
  id: u32,
  name: &'static str,
  symbol: &'static str,
  market_cap: f64,
  sector: &'static str,
  industry: &'static str,
) -> Stock {
  Stock {
    id,
    name,
    symbol,
    market_cap,
    sector,
    industry,
    hidden: false,
  }
}

pub fn stocks() -> Vec<Stock> {
  vec![
    stock(1, "Apple Inc", "AAPL", 900.0, "Technology", "Consumer Electronics"),
    stock(2, "Microsoft Corporation", "MSFT", 850.0, "Technology", "Software"),
    stock(3, "Mastercard Incorporated", "MA", 300.0, "Financial Services", "Credit Services"),
    stock(4, "Marathon Oil Corporation", "MRO", 20.0, "Energy", "Oil & Gas E&P"),
    stock(5, "Exxon Mobil Corporation", "XOM", 400.0, "Energy", "Oil & Gas Integrated"),
    stock(6, "Macy's Inc", "M", 10.0, "Consumer Cyclical", "Department Stores"),
    stock(7, "Oracle Corporation", "ORCL", 350.0, "Technology", "Software"),
    Stock {
      hidden: true,
      ..stock(8, "Hidden Holdings", "HIDE", 500.0, "Technology", "Software")
    },
  ]
}

pub fn indicators() -> Vec<Indicator> {
  let ind = |id, name, internal_name, score| Indicator {
    id,
    name,
    internal_name,
    score,
  };
  vec![
    ind(1, "US Unemployment Rate", "unemployment_rate", 10.0),
    ind(2, "Consumer Price Index", "consumer_price_index", 20.0),
    ind(3, "US GDP", "gdp", 30.0),
    ind(4, "United States Housing Starts", "housing_starts", 5.0),
    ind(5, "Canada Inflation Rate", "canada_inflation", 4.0),
    ind(6, "California Unemployment Rate", "ca_unemployment", 3.0),
    ind(7, "Producer Price Index", "ppi", 15.0),
  ]
}

pub fn metrics() -> Vec<(ItemId, Metric)> {
  let metric = |label, short_label, score| Metric {
    label,
    short_label,
    score,
  };
  [
    metric("Enterprise Value", "ev", Some(5.0)),
    metric("EV to Sales", "ev_sales", None),
    metric("Revenue Growth", "rev_growth", Some(3.0)),
    metric("Turnover Ratio", "turnover", None),
    metric("Price to Earnings", "pe_ratio", Some(4.0)),
    metric("Market Cap", "market_cap", Some(6.0)),
  ]
  .into_iter()
  .map(|m| (m.short_label.to_string(), m))
  .collect()
}

pub fn payload(value: Value) -> Payload {
  value.as_object().cloned().unwrap_or_default()
}

pub struct StockProvider;

impl Provider for StockProvider {
  type Record = Stock;

  fn provider_name(&self) -> &str {
    "stock"
  }

  fn get_terms(&self, s: &Stock) -> Vec<String> {
    vec![s.name.to_string(), s.symbol.to_string()]
  }

  fn get_score(&self, s: &Stock) -> f64 {
    s.market_cap
  }

  fn get_data(&self, s: &Stock) -> Payload {
    payload(json!({
      "type": "stock",
      "id": s.id,
      "score": s.market_cap,
      "display_name": format!("{} ({})", s.name, s.symbol),
      "search_name": s.symbol,
    }))
  }
}

pub struct FacetedStockProvider;

impl Provider for FacetedStockProvider {
  type Record = Stock;

  fn provider_name(&self) -> &str {
    "faceted_stock"
  }

  fn get_terms(&self, s: &Stock) -> Vec<String> {
    vec![s.name.to_string(), s.symbol.to_string()]
  }

  fn get_score(&self, s: &Stock) -> f64 {
    s.market_cap
  }

  fn include_item(&self, s: &Stock) -> bool {
    !s.hidden
  }

  fn get_facets(&self) -> Vec<String> {
    vec!["sector".to_string(), "industry".to_string()]
  }

  fn get_data(&self, s: &Stock) -> Payload {
    payload(json!({
      "type": "stock",
      "id": s.id,
      "score": s.market_cap,
      "display_name": format!("{} ({})", s.name, s.symbol),
      "search_name": s.symbol,
      "sector": s.sector,
      "industry": s.industry,
    }))
  }
}

fn indicator_payload(i: &Indicator) -> Payload {
  payload(json!({
    "type": "indicator",
    "id": i.id,
    "score": i.score,
    "display_name": i.name,
    "search_name": i.internal_name,
  }))
}

pub struct IndicatorProvider;

impl Provider for IndicatorProvider {
  type Record = Indicator;

  fn provider_name(&self) -> &str {
    "ind"
  }

  fn get_item_id(&self, i: &Indicator) -> Option<ItemId> {
    Some(i.internal_name.to_string())
  }

  fn get_term(&self, i: &Indicator) -> Option<String> {
    Some(i.name.to_string())
  }

  fn get_score(&self, i: &Indicator) -> f64 {
    i.score
  }

  fn get_data(&self, i: &Indicator) -> Payload {
    indicator_payload(i)
  }
}

pub struct IndicatorAliasedProvider;

impl Provider for IndicatorAliasedProvider {
  type Record = Indicator;

  fn provider_name(&self) -> &str {
    "indal"
  }

  fn get_term(&self, i: &Indicator) -> Option<String> {
    Some(i.name.to_string())
  }

  fn get_score(&self, i: &Indicator) -> f64 {
    i.score
  }

  fn get_data(&self, i: &Indicator) -> Payload {
    indicator_payload(i)
  }

  fn get_phrase_aliases(&self) -> AliasTable {
    AliasTable::new()
      .alias("United States", ["US", "USA", "America", "U-S-A", "U/S-A"])
      .alias("Consumer Price Index", "CPI")
      .alias("Gross Domestic Product", "GDP")
      .alias("California", "CA")
      .alias("Canada", "CA")
  }
}

pub struct IndicatorSelectiveProvider;

impl Provider for IndicatorSelectiveProvider {
  type Record = Indicator;

  fn provider_name(&self) -> &str {
    "indsel"
  }

  fn get_term(&self, i: &Indicator) -> Option<String> {
    Some(i.name.to_string())
  }

  fn get_score(&self, i: &Indicator) -> f64 {
    i.score
  }

  fn include_item(&self, i: &Indicator) -> bool {
    i.name != "US Unemployment Rate"
  }

  fn get_data(&self, i: &Indicator) -> Payload {
    indicator_payload(i)
  }
}

pub struct CalcProvider;

impl Provider for CalcProvider {
  type Record = Metric;

  fn provider_name(&self) -> &str {
    "metric"
  }

  fn get_item_id(&self, m: &Metric) -> Option<ItemId> {
    Some(m.short_label.to_string())
  }

  fn get_term(&self, m: &Metric) -> Option<String> {
    Some(m.label.to_string())
  }

  fn get_score(&self, m: &Metric) -> f64 {
    m.score.unwrap_or(1.0)
  }

  fn get_data(&self, m: &Metric) -> Payload {
    payload(json!({
      "type": "metric",
      "id": m.short_label,
      "score": m.score.unwrap_or(1.0),
      "display_name": m.label,
      "search_name": m.label,
    }))
  }
}

pub struct CalcAliasedProvider;

impl Provider for CalcAliasedProvider {
  type Record = Metric;

  fn provider_name(&self) -> &str {
    "metric_aliased"
  }

  fn get_item_id(&self, m: &Metric) -> Option<ItemId> {
    Some(m.label.to_string())
  }

  fn get_term(&self, m: &Metric) -> Option<String> {
    Some(m.label.to_string())
  }

  fn get_score(&self, m: &Metric) -> f64 {
    m.score.unwrap_or(1.0)
  }

  fn get_data(&self, m: &Metric) -> Payload {
    payload(json!({
      "type": "metric",
      "id": m.label,
      "score": m.score.unwrap_or(1.0),
      "display_name": m.label,
      "search_name": m.label,
    }))
  }

  fn get_phrase_aliases(&self) -> AliasTable {
    AliasTable::new().alias("EV", "Enterprise Value")
  }

  fn get_one_way_phrase_aliases(&self) -> AliasTable {
    AliasTable::new().alias("Revenue", "Turnover")
  }
}

/// Every provider of the test app, sharing one record source per model.
pub struct Fixture {
  pub stock: Arc<ModelBacked<StockProvider>>,
  pub faceted_stock: Arc<ModelBacked<FacetedStockProvider>>,
  pub ind: Arc<ModelBacked<IndicatorProvider>>,
  pub indal: Arc<ModelBacked<IndicatorAliasedProvider>>,
  pub indsel: Arc<ModelBacked<IndicatorSelectiveProvider>>,
  pub metric: Arc<DictBacked<CalcProvider>>,
  pub metric_aliased: Arc<DictBacked<CalcAliasedProvider>>,
}

impl Fixture {
  pub fn new() -> Self {
    let stocks: Arc<dyn RecordSource<Stock>> = Arc::new(stocks());
    let indicators: Arc<dyn RecordSource<Indicator>> = Arc::new(indicators());
    Self {
      stock: Arc::new(ModelBacked::new(StockProvider, stocks.clone()).page_size(3)),
      faceted_stock: Arc::new(ModelBacked::new(FacetedStockProvider, stocks)),
      ind: Arc::new(ModelBacked::new(IndicatorProvider, indicators.clone())),
      indal: Arc::new(ModelBacked::new(IndicatorAliasedProvider, indicators.clone())),
      indsel: Arc::new(ModelBacked::new(IndicatorSelectiveProvider, indicators)),
      metric: Arc::new(DictBacked::new(CalcProvider, metrics())),
      metric_aliased: Arc::new(DictBacked::new(CalcAliasedProvider, Vec::new()).with_iterator(metrics)),
    }
  }

  pub fn registry(&self) -> Registry {
    Registry::builder()
      .register("faceted_stock", self.faceted_stock.clone())
      .register("stock", self.stock.clone())
      .register("mixed", self.stock.clone())
      .register("mixed", self.ind.clone())
      .register("mixed", self.metric.clone())
      .register("ind_stock", self.ind.clone())
      .register("ind_stock", self.stock.clone())
      .register("mixed", self.stock.clone())
      .register("indicator", self.ind.clone())
      .register("indicator_aliased", self.indal.clone())
      .register("indicator_selective", self.indsel.clone())
      .register("metric", self.metric.clone())
      .register("metric_aliased", self.metric_aliased.clone())
      .register("facet_stock_no_facet_ind", self.faceted_stock.clone())
      .register("facet_stock_no_facet_ind", self.ind.clone())
      .build()
      .expect("fixture registry is valid")
  }

  pub fn engine(&self, settings: Settings) -> AutocompleteEngine {
    init_tracing();
    AutocompleteEngine::builder()
      .registry(self.registry())
      .settings(settings)
      .build()
  }
}

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn ids(results: &[Suggestion]) -> Vec<&str> {
  results.iter().map(|s| s.item_id.as_str()).collect()
}

pub fn suggest(engine: &AutocompleteEngine, name: &str, query: &str) -> Vec<Suggestion> {
  engine
    .suggest(name, query, &SuggestOptions::default())
    .expect("suggest succeeds")
}
