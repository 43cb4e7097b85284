use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Bundle, LeagueCategory, RecommendationList, ServiceCategoryGroup, UserPreferences},
    services::{new_session_id, BundleEvent, RecommendationEngine, DEFAULT_BUDGET_TOLERANCE},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(flatten)]
    pub preferences: UserPreferences,
    /// Also fit the optimal bundle under this monthly price
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Caller's anonymous session; a new one is issued when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BudgetFit {
    pub max_price: f64,
    pub tolerance: f64,
    /// `None` when nothing fits
    pub bundle: Option<Bundle>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    /// `None` when no league is selected or the catalog is empty
    pub bundle: Option<Bundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetFit>,
}

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub service_ids: Vec<String>,
    #[serde(flatten)]
    pub preferences: UserPreferences,
    pub max_price: f64,
    #[serde(default)]
    pub tolerance: Option<f64>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// League taxonomy, in catalog order
pub async fn get_leagues(State(state): State<AppState>) -> Json<Vec<LeagueCategory>> {
    Json(state.catalog.categories().to_vec())
}

/// Services grouped by category
pub async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceCategoryGroup>> {
    Json(state.catalog.grouped_by_category())
}

/// Ranked bundle and service recommendations for a selection
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(preferences): Json<UserPreferences>,
) -> AppResult<Json<RecommendationList>> {
    tracing::info!(
        request_id = %request_id,
        leagues = preferences.selected_league_ids.len(),
        subscriptions = preferences.subscribed_service_ids.len(),
        "Processing recommendation request"
    );

    let catalog = state.catalog.clone();
    let list = run_blocking(move || {
        RecommendationEngine::new(&catalog, &preferences).compute_recommendations()
    })
    .await?;

    tracing::info!(request_id = %request_id, items = list.len(), "Recommendations ready");

    Ok(Json(list))
}

/// Best weighted-coverage bundle, optionally fitted to a budget
pub async fn optimize(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<OptimizeRequest>,
) -> AppResult<Json<OptimizeResponse>> {
    let max_price = request.max_price.map(validate_max_price).transpose()?;
    let tolerance = validate_tolerance(request.tolerance)?;

    tracing::info!(
        request_id = %request_id,
        leagues = request.preferences.selected_league_ids.len(),
        max_price = ?max_price,
        "Processing optimization request"
    );

    let catalog = state.catalog.clone();
    let limit = state.exhaustive_service_limit;
    let preferences = request.preferences.clone();
    let response = run_blocking(move || {
        let engine =
            RecommendationEngine::new(&catalog, &preferences).with_exhaustive_limit(limit);
        let bundle = engine.build_optimal_bundle(&preferences.unique_league_ids())?;

        let budget = max_price.map(|max_price| BudgetFit {
            max_price,
            tolerance,
            bundle: bundle
                .as_ref()
                .and_then(|optimal| engine.adjust_bundle_for_budget(optimal, max_price, tolerance)),
        });

        Ok::<_, AppError>(OptimizeResponse { bundle, budget })
    })
    .await??;

    if let Some(bundle) = &response.bundle {
        let session_id = request.session_id.unwrap_or_else(new_session_id);
        report_bundle(&state, &request_id, session_id, bundle, &request.preferences).await;
    }

    Ok(Json(response))
}

/// Fits an explicit list of services to a budget
pub async fn budget(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<BudgetRequest>,
) -> AppResult<Json<BudgetFit>> {
    let max_price = validate_max_price(request.max_price)?;
    let tolerance = validate_tolerance(request.tolerance)?;

    tracing::info!(
        request_id = %request_id,
        services = request.service_ids.len(),
        max_price,
        tolerance,
        "Processing budget request"
    );

    let catalog = state.catalog.clone();
    let fit = run_blocking(move || {
        let preferences = request.preferences;
        let engine = RecommendationEngine::new(&catalog, &preferences);
        let start = engine.bundle_from_ids(&request.service_ids, &preferences.unique_league_ids())?;
        Ok::<_, AppError>(BudgetFit {
            max_price,
            tolerance,
            bundle: engine.adjust_bundle_for_budget(&start, max_price, tolerance),
        })
    })
    .await??;

    Ok(Json(fit))
}

/// Runs CPU-bound engine work on the blocking pool
async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Engine task failed: {}", e)))
}

fn validate_max_price(max_price: f64) -> AppResult<f64> {
    if !max_price.is_finite() || max_price < 0.0 {
        return Err(AppError::InvalidInput(
            "max_price must be a non-negative number".to_string(),
        ));
    }
    Ok(max_price)
}

fn validate_tolerance(tolerance: Option<f64>) -> AppResult<f64> {
    let tolerance = tolerance.unwrap_or(DEFAULT_BUDGET_TOLERANCE);
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(AppError::InvalidInput(
            "tolerance must be a non-negative number".to_string(),
        ));
    }
    Ok(tolerance)
}

/// Sends a `bundle_generated` event; failures are logged and otherwise ignored
async fn report_bundle(
    state: &AppState,
    request_id: &RequestId,
    session_id: String,
    bundle: &Bundle,
    preferences: &UserPreferences,
) {
    if !state.telemetry_enabled {
        return;
    }

    let event = BundleEvent::bundle_generated(
        session_id,
        bundle,
        &preferences.unique_league_ids(),
        preferences,
    );
    if let Err(e) = state.telemetry.record(event).await {
        tracing::warn!(request_id = %request_id, error = %e, "Telemetry event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Catalog;
    use crate::services::telemetry::MockTelemetrySink;
    use std::sync::Arc;

    const SERVICES: &str = r#"[
        {"id": "a", "name": "Alpha", "price": "$10", "leagues": {"nfl": {"channels": ["CBS"], "coveragePercent": 60}}},
        {"id": "b", "name": "Beta", "price": "$8", "leagues": {"nfl": {"channels": ["FOX"], "coveragePercent": 50}}}
    ]"#;
    const LEAGUES: &str = r#"[{"name": "Football", "leagues": [{"id": "nfl", "name": "NFL", "icon": "🏈"}]}]"#;

    fn state(sink: MockTelemetrySink) -> AppState {
        AppState::from_catalog(Catalog::from_json(SERVICES, LEAGUES).unwrap())
            .with_telemetry(Arc::new(sink))
    }

    fn optimize_request(max_price: Option<f64>) -> OptimizeRequest {
        OptimizeRequest {
            preferences: UserPreferences {
                selected_league_ids: vec!["nfl".to_string()],
                ..Default::default()
            },
            max_price,
            tolerance: None,
            session_id: Some("session_test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_optimize_reports_bundle() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record()
            .withf(|event| {
                event.session_id == "session_test" && event.data.service_ids == ["a", "b"]
            })
            .times(1)
            .returning(|_| Ok(()));

        let Json(response) = optimize(
            State(state(sink)),
            Extension(RequestId::new()),
            Json(optimize_request(None)),
        )
        .await
        .unwrap();

        assert_eq!(response.bundle.unwrap().service_ids(), vec!["a", "b"]);
        assert!(response.budget.is_none());
    }

    #[tokio::test]
    async fn test_telemetry_failure_does_not_fail_request() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record()
            .times(1)
            .returning(|_| Err(AppError::Internal("collector down".to_string())));

        let result = optimize(
            State(state(sink)),
            Extension(RequestId::new()),
            Json(optimize_request(Some(9.0))),
        )
        .await;

        let Json(response) = result.unwrap();
        // Dropping Beta loses the least weighted coverage
        let fit = response.budget.unwrap();
        assert_eq!(fit.bundle.unwrap().service_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_telemetry_disabled() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record().times(0);

        let mut state = state(sink);
        state.telemetry_enabled = false;

        let result = optimize(
            State(state),
            Extension(RequestId::new()),
            Json(optimize_request(None)),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_budget_rejected() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_record().times(0);

        let result = optimize(
            State(state(sink)),
            Extension(RequestId::new()),
            Json(optimize_request(Some(-1.0))),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validation() {
        assert_eq!(validate_tolerance(None).unwrap(), DEFAULT_BUDGET_TOLERANCE);
        assert!(validate_tolerance(Some(f64::NAN)).is_err());
        assert!(validate_max_price(f64::INFINITY).is_err());
        assert_eq!(validate_max_price(0.0).unwrap(), 0.0);
    }
}
