mod catalog;
mod league;
mod recommendation;
mod streaming_service;
mod user_preferences;

pub use catalog::{Catalog, ServiceCategoryGroup};
pub use league::{League, LeagueCategory, SelectedLeague, UNKNOWN_LEAGUE_ICON};
pub use recommendation::{
    Badge, Bundle, BundleRecommendation, CoverageSummary, CoveredLeague, LeagueCoverageDetail,
    RecommendationItem, RecommendationList, RedundantSubscription, ServiceRecommendation,
};
pub use streaming_service::{
    parse_price, LeagueCoverage, ServiceRecord, StreamingService, MAX_COVERAGE_PERCENT,
};
pub use user_preferences::{
    UserPreferences, DEFAULT_PREFERENCE_WEIGHT, MAX_PREFERENCE_WEIGHT, MIN_PREFERENCE_WEIGHT,
};
