use crate::models::{Bundle, StreamingService};

use super::engine::RecommendationEngine;

/// Slack allowed above the requested maximum price
pub const DEFAULT_BUDGET_TOLERANCE: f64 = 2.0;

/// At or below this budget only single affordable services are considered
pub const SMALL_BUDGET_THRESHOLD: f64 = 6.0;

impl<'a> RecommendationEngine<'a> {
    /// Trims a bundle until its price fits `max_price + tolerance`
    ///
    /// Small budgets (at most [`SMALL_BUDGET_THRESHOLD`]) skip trimming and return the
    /// single affordable catalog service with the best weighted coverage, or `None` if
    /// nothing is affordable. Otherwise the service whose removal loses the least
    /// weighted coverage is dropped, one at a time, first one found on ties. `None`
    /// means the bundle emptied before it fit.
    pub fn adjust_bundle_for_budget(
        &self,
        bundle: &Bundle,
        max_price: f64,
        tolerance: f64,
    ) -> Option<Bundle> {
        if bundle.services.is_empty() {
            return None;
        }

        let league_ids = bundle.league_ids();

        if max_price <= SMALL_BUDGET_THRESHOLD {
            let best = self.best_affordable_service(&league_ids, max_price);
            tracing::info!(
                path = "small_budget",
                max_price,
                picked = best.map(|s| s.id.as_str()),
                "Budget adjusted"
            );
            return best.map(|service| {
                self.coverage
                    .bundle_stats(&[service], &league_ids, self.preferences)
            });
        }

        let ceiling = max_price + tolerance;
        let mut current: Vec<&StreamingService> = bundle.services.iter().collect();
        let mut removed = Vec::new();

        while !current.is_empty() {
            let stats = self
                .coverage
                .bundle_stats(&current, &league_ids, self.preferences);
            if stats.total_price <= ceiling {
                tracing::info!(
                    path = "greedy",
                    max_price,
                    tolerance,
                    removed = ?removed,
                    total_price = stats.total_price,
                    "Budget adjusted"
                );
                return Some(stats);
            }

            let mut min_impact = f64::INFINITY;
            let mut to_remove = None;
            for (i, service) in current.iter().enumerate() {
                let rest: Vec<&StreamingService> = current
                    .iter()
                    .filter(|s| s.id != service.id)
                    .copied()
                    .collect();
                let without = self
                    .coverage
                    .bundle_stats(&rest, &league_ids, self.preferences);
                let impact = stats.total_weighted_coverage - without.total_weighted_coverage;
                if impact < min_impact {
                    min_impact = impact;
                    to_remove = Some(i);
                }
            }

            let Some(index) = to_remove else {
                break;
            };
            removed.push(current.remove(index).id.clone());
        }

        tracing::info!(
            path = "greedy",
            max_price,
            tolerance,
            "No bundle fits the budget"
        );
        None
    }

    /// Best single catalog service priced at or below `max_price`
    ///
    /// Ranked by weighted coverage, then number of leagues listed, then price.
    fn best_affordable_service(
        &self,
        league_ids: &[String],
        max_price: f64,
    ) -> Option<&'a StreamingService> {
        let weighted = |service: &StreamingService| -> f64 {
            league_ids
                .iter()
                .map(|l| {
                    service.coverage_percent(l) * f64::from(self.preferences.preference_weight(l))
                })
                .sum()
        };
        let listed = |service: &StreamingService| {
            league_ids.iter().filter(|l| service.covers(l)).count()
        };

        let catalog = self.catalog;
        let mut affordable: Vec<(&'a StreamingService, f64, usize)> = catalog
            .services()
            .iter()
            .filter(|s| s.numeric_price <= max_price)
            .map(|s| (s, weighted(s), listed(s)))
            .collect();

        affordable.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.numeric_price.total_cmp(&b.0.numeric_price))
        });

        affordable.first().map(|(service, _, _)| *service)
    }
}
