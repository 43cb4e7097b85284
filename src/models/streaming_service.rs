use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest coverage a league can reach, in percent
pub const MAX_COVERAGE_PERCENT: f64 = 100.0;

static PRICE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d*)?|\.\d+").expect("price pattern is valid"));

/// Parses a price label like "$79.99/month" into its leading decimal value.
///
/// Labels without any digits (or missing entirely) parse to `f64::INFINITY`, which keeps
/// such services out of budget fitting and drives their value score to zero.
pub fn parse_price(price: &str) -> f64 {
    PRICE_PATTERN
        .find(price)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::INFINITY)
}

/// How one service carries one league
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeagueCoverage {
    #[serde(default)]
    pub channels: Vec<String>,
    /// Human label such as "Most national games"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
}

impl LeagueCoverage {
    /// Coverage percent clamped into [0, 100]; absent means zero
    pub fn percent(&self) -> f64 {
        self.coverage_percent
            .filter(|p| !p.is_nan())
            .map(|p| p.clamp(0.0, MAX_COVERAGE_PERCENT))
            .unwrap_or(0.0)
    }
}

/// Raw service record as stored in the catalog data file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub service_category: Option<String>,
    #[serde(default)]
    pub leagues: Option<BTreeMap<String, LeagueCoverage>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// A streaming service with its price normalized for scoring
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamingService {
    pub id: String,
    pub name: String,
    /// Price label exactly as published (e.g. "$10.99/month")
    pub price: String,
    /// Leading decimal of `price`, or infinity when it has none
    pub numeric_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_category: Option<String>,
    pub leagues: BTreeMap<String, LeagueCoverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl From<ServiceRecord> for StreamingService {
    fn from(record: ServiceRecord) -> Self {
        let price = record.price.unwrap_or_default();
        let numeric_price = parse_price(&price);

        StreamingService {
            id: record.id,
            name: record.name,
            price,
            numeric_price,
            service_category: record.service_category,
            // A missing league map is the same as covering nothing
            leagues: record.leagues.unwrap_or_default(),
            notes: record.notes,
            link: record.link,
        }
    }
}

impl StreamingService {
    /// Creates a service from a price label, with no league coverage yet
    pub fn new(id: &str, name: &str, price: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            numeric_price: parse_price(price),
            service_category: None,
            leagues: BTreeMap::new(),
            notes: None,
            link: None,
        }
    }

    /// Adds (or replaces) coverage for a league
    pub fn with_league(mut self, league_id: &str, coverage: LeagueCoverage) -> Self {
        self.leagues.insert(league_id.to_string(), coverage);
        self
    }

    /// Coverage entry for a league, if the service carries it at all
    pub fn league(&self, league_id: &str) -> Option<&LeagueCoverage> {
        self.leagues.get(league_id)
    }

    /// Binary coverage: any entry counts, regardless of percent
    pub fn covers(&self, league_id: &str) -> bool {
        self.leagues.contains_key(league_id)
    }

    pub fn coverage_percent(&self, league_id: &str) -> f64 {
        self.league(league_id).map(LeagueCoverage::percent).unwrap_or(0.0)
    }

    /// Category used for grouping; services without one land in "Other"
    pub fn category(&self) -> &str {
        self.service_category.as_deref().unwrap_or("Other")
    }
}
