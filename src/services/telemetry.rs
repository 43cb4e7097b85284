use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Bundle, UserPreferences},
};

/// Length of an anonymous bundle hash
pub const BUNDLE_HASH_LEN: usize = 32;

#[derive(Serialize)]
struct BundleSignature<'a> {
    services: Vec<&'a str>,
    leagues: Vec<&'a str>,
    preferences: &'a BTreeMap<String, u8>,
}

/// Anonymous, order-independent fingerprint of a bundle and the selection behind it
pub fn bundle_hash(
    service_ids: &[&str],
    league_ids: &[String],
    preferences: &BTreeMap<String, u8>,
) -> String {
    let mut services = service_ids.to_vec();
    services.sort_unstable();
    let mut leagues: Vec<&str> = league_ids.iter().map(String::as_str).collect();
    leagues.sort_unstable();

    let signature = BundleSignature {
        services,
        leagues,
        preferences,
    };
    // Serializing string vectors and a string-keyed map cannot fail
    let json = serde_json::to_string(&signature).unwrap_or_default();

    STANDARD
        .encode(json)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(BUNDLE_HASH_LEN)
        .collect()
}

/// Anonymous session identifier attached to every event
pub fn new_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Monthly price bracket of a bundle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRange {
    Budget,
    Mid,
    Premium,
    Luxury,
}

impl BudgetRange {
    pub fn from_price(price: f64) -> Self {
        if price < 25.0 {
            BudgetRange::Budget
        } else if price < 75.0 {
            BudgetRange::Mid
        } else if price < 150.0 {
            BudgetRange::Premium
        } else {
            BudgetRange::Luxury
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BundleGenerated,
}

/// Payload of a `bundle_generated` event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleGeneratedData {
    pub service_count: usize,
    pub service_ids: Vec<String>,
    pub total_price: f64,
    pub league_count: usize,
    pub league_ids: Vec<String>,
    pub league_preferences: BTreeMap<String, u8>,
    pub total_coverage: f64,
    pub total_weighted_coverage: f64,
    pub average_coverage_per_league: f64,
    pub has_subscriptions: bool,
    pub subscription_count: usize,
    pub budget_range: BudgetRange,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub session_id: String,
    pub bundle_hash: String,
    pub timestamp: DateTime<Utc>,
    pub data: BundleGeneratedData,
}

impl BundleEvent {
    /// Describes a bundle the engine just produced for a selection
    pub fn bundle_generated(
        session_id: impl Into<String>,
        bundle: &Bundle,
        league_ids: &[String],
        preferences: &UserPreferences,
    ) -> Self {
        let service_ids = bundle.service_ids();
        let average = if league_ids.is_empty() {
            0.0
        } else {
            bundle.total_coverage / league_ids.len() as f64
        };
        let subscription_count = preferences.subscribed_service_ids.len();

        Self {
            event_type: EventType::BundleGenerated,
            session_id: session_id.into(),
            bundle_hash: bundle_hash(&service_ids, league_ids, &preferences.league_preferences),
            timestamp: Utc::now(),
            data: BundleGeneratedData {
                service_count: service_ids.len(),
                service_ids: service_ids.iter().map(|s| s.to_string()).collect(),
                total_price: bundle.total_price,
                league_count: league_ids.len(),
                league_ids: league_ids.to_vec(),
                league_preferences: preferences.league_preferences.clone(),
                total_coverage: bundle.total_coverage,
                total_weighted_coverage: bundle.total_weighted_coverage,
                average_coverage_per_league: average,
                has_subscriptions: subscription_count > 0,
                subscription_count,
                budget_range: BudgetRange::from_price(bundle.total_price),
            },
        }
    }
}

/// Destination for usage events
///
/// Recording is best effort: callers log failures and carry on.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, event: BundleEvent) -> AppResult<()>;
}

/// Writes events to the structured log
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl TelemetrySink for TracingSink {
    async fn record(&self, event: BundleEvent) -> AppResult<()> {
        let data = serde_json::to_string(&event.data)
            .map_err(|e| AppError::Internal(format!("Encoding telemetry event: {}", e)))?;
        tracing::info!(
            target: "telemetry",
            event_type = ?event.event_type,
            session_id = %event.session_id,
            bundle_hash = %event.bundle_hash,
            timestamp = %event.timestamp.to_rfc3339(),
            data = %data,
            "Bundle event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamingService;

    fn prefs() -> BTreeMap<String, u8> {
        [("nfl".to_string(), 5), ("mls".to_string(), 2)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_bundle_hash_shape() {
        let hash = bundle_hash(&["fubo", "espn_plus"], &["nfl".to_string()], &prefs());
        assert_eq!(hash.len(), BUNDLE_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_bundle_hash_ignores_order() {
        let leagues_a = vec!["nfl".to_string(), "mls".to_string()];
        let leagues_b = vec!["mls".to_string(), "nfl".to_string()];
        assert_eq!(
            bundle_hash(&["fubo", "espn_plus"], &leagues_a, &prefs()),
            bundle_hash(&["espn_plus", "fubo"], &leagues_b, &prefs())
        );
    }

    #[test]
    fn test_bundle_hash_encodes_sorted_signature() {
        let json = r#"{"services":["a","b"],"leagues":["nfl"],"preferences":{}}"#;
        let expected: String = STANDARD
            .encode(json)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(BUNDLE_HASH_LEN)
            .collect();
        assert_eq!(
            bundle_hash(&["b", "a"], &["nfl".to_string()], &BTreeMap::new()),
            expected
        );
    }

    #[test]
    fn test_budget_ranges() {
        assert_eq!(BudgetRange::from_price(0.0), BudgetRange::Budget);
        assert_eq!(BudgetRange::from_price(24.99), BudgetRange::Budget);
        assert_eq!(BudgetRange::from_price(25.0), BudgetRange::Mid);
        assert_eq!(BudgetRange::from_price(74.99), BudgetRange::Mid);
        assert_eq!(BudgetRange::from_price(75.0), BudgetRange::Premium);
        assert_eq!(BudgetRange::from_price(150.0), BudgetRange::Luxury);
        assert_eq!(BudgetRange::from_price(f64::INFINITY), BudgetRange::Luxury);
    }

    #[test]
    fn test_session_id() {
        let id = new_session_id();
        assert!(id.starts_with("session_"));
        assert_ne!(id, new_session_id());
    }

    #[test]
    fn test_bundle_generated_event() {
        let bundle = Bundle {
            services: vec![
                StreamingService::new("a", "Alpha", "$10"),
                StreamingService::new("b", "Beta", "$20"),
            ],
            total_price: 30.0,
            per_league_coverage: Default::default(),
            total_coverage: 150.0,
            covered_leagues: Default::default(),
            total_weighted_coverage: 450.0,
        };
        let preferences = UserPreferences {
            subscribed_service_ids: vec!["a".to_string()],
            ..Default::default()
        };
        let leagues = vec!["nfl".to_string(), "nba".to_string()];

        let event = BundleEvent::bundle_generated("session_x", &bundle, &leagues, &preferences);
        assert_eq!(event.data.service_count, 2);
        assert_eq!(event.data.average_coverage_per_league, 75.0);
        assert!(event.data.has_subscriptions);
        assert_eq!(event.data.budget_range, BudgetRange::Mid);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "bundle_generated");
        assert_eq!(value["sessionId"], "session_x");
        assert_eq!(value["data"]["budgetRange"], "mid");
        assert_eq!(value["data"]["serviceIds"][1], "b");
    }

    #[test]
    fn test_tracing_sink_records() {
        let bundle = Bundle {
            services: vec![StreamingService::new("a", "Alpha", "$10")],
            total_price: 10.0,
            per_league_coverage: Default::default(),
            total_coverage: 0.0,
            covered_leagues: Default::default(),
            total_weighted_coverage: 0.0,
        };
        let event =
            BundleEvent::bundle_generated(new_session_id(), &bundle, &[], &UserPreferences::new());
        let result = tokio_test::block_on(TracingSink.record(event));
        assert!(result.is_ok());
    }

    #[test]
    fn test_mock_sink() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record()
            .withf(|event| event.data.service_count == 0)
            .times(1)
            .returning(|_| Ok(()));

        let bundle = Bundle {
            services: vec![],
            total_price: 0.0,
            per_league_coverage: Default::default(),
            total_coverage: 0.0,
            covered_leagues: Default::default(),
            total_weighted_coverage: 0.0,
        };
        let event = BundleEvent::bundle_generated("s", &bundle, &[], &UserPreferences::new());
        assert!(tokio_test::block_on(sink.record(event)).is_ok());
    }
}
