use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{Bundle, Catalog, StreamingService, UserPreferences},
};

use super::coverage::CoverageCalculator;

/// Catalogs up to this size are optimized by scanning every subset
pub const DEFAULT_EXHAUSTIVE_SERVICE_LIMIT: usize = 20;

/// Bundle recommendation engine for one catalog and one selection snapshot
///
/// Create one per request: the coverage memo it owns is scoped to this instance and is
/// never shared between threads.
pub struct RecommendationEngine<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) preferences: &'a UserPreferences,
    pub(crate) coverage: CoverageCalculator<'a>,
    pub(crate) subscribed: HashSet<String>,
    pub(crate) exhaustive_limit: usize,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(catalog: &'a Catalog, preferences: &'a UserPreferences) -> Self {
        Self {
            catalog,
            preferences,
            coverage: CoverageCalculator::new(catalog),
            subscribed: catalog.known_service_ids(&preferences.subscribed_service_ids),
            exhaustive_limit: DEFAULT_EXHAUSTIVE_SERVICE_LIMIT,
        }
    }

    /// Overrides the catalog size above which the optimizer stops enumerating subsets
    pub fn with_exhaustive_limit(mut self, limit: usize) -> Self {
        self.exhaustive_limit = limit;
        self
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn coverage(&self) -> &CoverageCalculator<'a> {
        &self.coverage
    }

    pub fn is_subscribed(&self, service_id: &str) -> bool {
        self.subscribed.contains(service_id)
    }

    /// Current subscriptions, in catalog order
    pub(crate) fn subscribed_services(&self) -> Vec<&'a StreamingService> {
        self.catalog
            .services()
            .iter()
            .filter(|s| self.is_subscribed(&s.id))
            .collect()
    }

    /// Scores an explicit list of services against the given leagues
    pub fn bundle_from_ids(&self, service_ids: &[String], league_ids: &[String]) -> AppResult<Bundle> {
        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let service = self
                .catalog
                .service(id)
                .ok_or_else(|| AppError::NotFound(format!("Unknown service '{}'", id)))?;
            services.push(service);
        }

        Ok(self
            .coverage
            .bundle_stats(&services, &dedup(league_ids), self.preferences))
    }
}

/// Drops repeated ids, keeping first occurrences in order
pub(crate) fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeagueCoverage, ServiceRecord};

    fn catalog() -> Catalog {
        let services = r#"[
            {"id": "a", "name": "Alpha", "price": "$10", "leagues": {"nfl": {"channels": ["CBS"], "coveragePercent": 70}}},
            {"id": "b", "name": "Beta", "price": "$5"}
        ]"#;
        Catalog::from_json(services, "[]").unwrap()
    }

    #[test]
    fn test_unknown_subscriptions_ignored() {
        let catalog = catalog();
        let prefs = UserPreferences {
            subscribed_service_ids: vec!["a".into(), "ghost".into()],
            ..Default::default()
        };
        let engine = RecommendationEngine::new(&catalog, &prefs);
        assert!(engine.is_subscribed("a"));
        assert!(!engine.is_subscribed("ghost"));
        assert_eq!(engine.subscribed_services().len(), 1);
    }

    #[test]
    fn test_bundle_from_ids() {
        let catalog = catalog();
        let prefs = UserPreferences::new();
        let engine = RecommendationEngine::new(&catalog, &prefs);

        let bundle = engine
            .bundle_from_ids(
                &["a".to_string(), "b".to_string(), "a".to_string()],
                &["nfl".to_string()],
            )
            .unwrap();
        assert_eq!(bundle.service_ids(), vec!["a", "b"]);
        assert_eq!(bundle.total_price, 15.0);
        assert_eq!(bundle.per_league_coverage["nfl"], 70.0);
    }

    #[test]
    fn test_bundle_from_unknown_id() {
        let catalog = catalog();
        let prefs = UserPreferences::new();
        let engine = RecommendationEngine::new(&catalog, &prefs);

        let result = engine.bundle_from_ids(&["nope".to_string()], &[]);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_exhaustive_limit_override() {
        let catalog = Catalog::new(
            vec![ServiceRecord {
                id: "x".into(),
                name: "X".into(),
                price: Some("$1".into()),
                service_category: None,
                leagues: Some(
                    [("nfl".to_string(), LeagueCoverage::default())]
                        .into_iter()
                        .collect(),
                ),
                notes: None,
                link: None,
            }],
            vec![],
        )
        .unwrap();
        let prefs = UserPreferences::new();
        let engine = RecommendationEngine::new(&catalog, &prefs).with_exhaustive_limit(4);
        assert_eq!(engine.exhaustive_limit, 4);
        assert!(engine.catalog().service("x").unwrap().covers("nfl"));
    }
}
