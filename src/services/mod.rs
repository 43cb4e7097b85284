pub mod budget;
pub mod candidates;
pub mod coverage;
pub mod engine;
pub mod optimizer;
pub mod ranking;
pub mod telemetry;

pub use budget::{DEFAULT_BUDGET_TOLERANCE, SMALL_BUDGET_THRESHOLD};
pub use candidates::{canonical_id, generate_candidates, BundleCandidate};
pub use coverage::{CoverageCalculator, CoverageKey};
pub use engine::{RecommendationEngine, DEFAULT_EXHAUSTIVE_SERVICE_LIMIT};
pub use ranking::{compute_recommendations, value_score};
pub use telemetry::{
    bundle_hash, new_session_id, BudgetRange, BundleEvent, BundleGeneratedData, TelemetrySink,
    TracingSink,
};
