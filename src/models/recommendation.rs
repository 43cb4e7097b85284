use serde::Serialize;
use std::collections::BTreeMap;

use super::StreamingService;

/// Which headline slot a recommendation fills
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Badge {
    #[serde(rename = "Top Coverage")]
    TopCoverage,
    #[serde(rename = "Best Value")]
    BestValue,
}

/// Channels carrying one selected league within a set of services
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeagueCoverageDetail {
    pub name: String,
    pub icon: String,
    /// Entries read "<channel> (on <service name>)", deduplicated
    pub channels: Vec<String>,
}

/// Binary coverage of the selected leagues by a set of services
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CoverageSummary {
    #[serde(rename = "total_covered_leagues_count")]
    pub count: usize,
    #[serde(rename = "selected_leagues_covered_details")]
    pub details: BTreeMap<String, LeagueCoverageDetail>,
}

/// A current subscription the recommended bundle does not need
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RedundantSubscription {
    pub id: String,
    pub name: String,
    pub price: String,
    pub numeric_price: f64,
}

impl From<&StreamingService> for RedundantSubscription {
    fn from(service: &StreamingService) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            price: service.price.clone(),
            numeric_price: service.numeric_price,
        }
    }
}

/// A combination of services scored against the selected leagues
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BundleRecommendation {
    /// Sorted, comma-joined member ids
    pub id: String,
    pub services_involved: Vec<StreamingService>,
    /// What the user would pay on top of current subscriptions
    pub additional_numeric_cost: f64,
    #[serde(flatten)]
    pub coverage: CoverageSummary,
    pub total_numeric_price: f64,
    pub newly_covered_leagues_details: BTreeMap<String, LeagueCoverageDetail>,
    pub display_name: String,
    pub value_score: f64,
    pub badge: Option<Badge>,
    pub redundant_subscriptions: Vec<RedundantSubscription>,
    pub potential_savings: f64,
    pub weighted_coverage_score: f64,
}

/// A single catalog service listed after the headline picks
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceRecommendation {
    pub id: String,
    pub service: StreamingService,
    pub display_name: String,
    #[serde(flatten)]
    pub coverage: CoverageSummary,
    pub additional_numeric_cost: f64,
    pub total_numeric_price: f64,
    pub is_subscribed: bool,
    pub value_score: f64,
}

/// One entry of the recommendation list
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecommendationItem {
    Bundle(BundleRecommendation),
    Service(ServiceRecommendation),
}

impl RecommendationItem {
    pub fn id(&self) -> &str {
        match self {
            RecommendationItem::Bundle(b) => &b.id,
            RecommendationItem::Service(s) => &s.id,
        }
    }

    pub fn coverage(&self) -> &CoverageSummary {
        match self {
            RecommendationItem::Bundle(b) => &b.coverage,
            RecommendationItem::Service(s) => &s.coverage,
        }
    }

    pub fn services(&self) -> &[StreamingService] {
        match self {
            RecommendationItem::Bundle(b) => &b.services_involved,
            RecommendationItem::Service(s) => std::slice::from_ref(&s.service),
        }
    }

    pub fn badge(&self) -> Option<Badge> {
        match self {
            RecommendationItem::Bundle(b) => b.badge,
            RecommendationItem::Service(_) => None,
        }
    }

    pub fn total_numeric_price(&self) -> f64 {
        match self {
            RecommendationItem::Bundle(b) => b.total_numeric_price,
            RecommendationItem::Service(s) => s.total_numeric_price,
        }
    }
}

/// Ranked output: headline picks first, then individual services
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecommendationList {
    pub items: Vec<RecommendationItem>,
}

impl RecommendationList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    fn with_badge(&self, badge: Badge) -> Option<&BundleRecommendation> {
        self.items.iter().find_map(|item| match item {
            RecommendationItem::Bundle(b) if b.badge == Some(badge) => Some(b),
            _ => None,
        })
    }

    pub fn top_coverage(&self) -> Option<&BundleRecommendation> {
        self.with_badge(Badge::TopCoverage)
    }

    pub fn best_value(&self) -> Option<&BundleRecommendation> {
        self.with_badge(Badge::BestValue)
    }

    /// Items other than the headline picks
    pub fn other_options(&self) -> impl Iterator<Item = &RecommendationItem> {
        self.items.iter().filter(|item| item.badge().is_none())
    }
}

/// Percent-aware coverage of one league inside a bundle
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoveredLeague {
    pub name: String,
    pub icon: String,
    pub channels: Vec<String>,
    /// First non-empty human coverage label among the member services
    pub coverage: String,
    pub coverage_percent: f64,
}

/// A concrete set of services with summed, capped, preference-weighted coverage
///
/// Produced by the optimizer and by the budget adjuster.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bundle {
    pub services: Vec<StreamingService>,
    pub total_price: f64,
    /// Every target league, covered or not, with its capped percent
    pub per_league_coverage: BTreeMap<String, f64>,
    pub total_coverage: f64,
    /// Only leagues with coverage above zero
    pub covered_leagues: BTreeMap<String, CoveredLeague>,
    pub total_weighted_coverage: f64,
}

impl Bundle {
    pub fn service_ids(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.id.as_str()).collect()
    }

    /// League ids this bundle was scored against
    pub fn league_ids(&self) -> Vec<String> {
        self.per_league_coverage.keys().cloned().collect()
    }
}
