use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::models::{
    Badge, BundleRecommendation, Catalog, RecommendationItem, RecommendationList,
    RedundantSubscription, ServiceRecommendation, StreamingService, UserPreferences,
};

use super::candidates::{generate_candidates, BundleCandidate};
use super::engine::RecommendationEngine;

/// Leagues covered per unit of extra spend
///
/// Free additions that cover something are infinitely valuable; covering nothing is
/// worth nothing. An infinite cost yields zero.
pub fn value_score(covered: usize, additional_cost: f64) -> f64 {
    if additional_cost > 0.0 {
        covered as f64 / additional_cost
    } else if covered > 0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Top Coverage order: most leagues, cheapest, least extra spend, fewest services
fn by_coverage(a: &BundleRecommendation, b: &BundleRecommendation) -> Ordering {
    b.coverage
        .count
        .cmp(&a.coverage.count)
        .then_with(|| a.total_numeric_price.total_cmp(&b.total_numeric_price))
        .then_with(|| a.additional_numeric_cost.total_cmp(&b.additional_numeric_cost))
        .then_with(|| a.services_involved.len().cmp(&b.services_involved.len()))
}

/// Best Value order: highest value score, most leagues, least extra spend
fn by_value(a: &BundleRecommendation, b: &BundleRecommendation) -> Ordering {
    b.value_score
        .total_cmp(&a.value_score)
        .then_with(|| b.coverage.count.cmp(&a.coverage.count))
        .then_with(|| a.additional_numeric_cost.total_cmp(&b.additional_numeric_cost))
}

/// Remaining services: subscribed first, most leagues, least extra spend
fn by_service(a: &ServiceRecommendation, b: &ServiceRecommendation) -> Ordering {
    b.is_subscribed
        .cmp(&a.is_subscribed)
        .then_with(|| b.coverage.count.cmp(&a.coverage.count))
        .then_with(|| a.additional_numeric_cost.total_cmp(&b.additional_numeric_cost))
}

impl<'a> RecommendationEngine<'a> {
    /// Ranks candidate bundles for the selected leagues
    ///
    /// Returns the Top Coverage pick, the Best Value pick when a strictly cheaper
    /// candidate exists, then every other service that covers at least one selected
    /// league. No leagues selected means an empty list.
    pub fn compute_recommendations(&mut self) -> RecommendationList {
        let league_ids = self.preferences.unique_league_ids();
        if league_ids.is_empty() {
            return RecommendationList::default();
        }

        let catalog = self.catalog;
        let subscribed = self.subscribed_services();
        let base = self.coverage.coverage_of(&subscribed, &league_ids);
        let base_covered: HashSet<&str> = base.details.keys().map(String::as_str).collect();

        let candidates = generate_candidates(catalog.services(), &self.subscribed);
        let candidate_count = candidates.len();

        let mut ranked = Vec::with_capacity(candidate_count);
        for candidate in candidates {
            if let Some(item) = self.enrich(candidate, &league_ids, &base_covered) {
                ranked.push(item);
            }
        }

        if ranked.is_empty() {
            tracing::info!(
                candidates = candidate_count,
                leagues = league_ids.len(),
                "No candidate covers any selected league"
            );
            return RecommendationList::default();
        }

        ranked.sort_by(by_coverage);

        let mut top = ranked[0].clone();
        top.badge = Some(Badge::TopCoverage);
        self.mark_redundant(&mut top);

        let best_value = {
            let mut pool: Vec<&BundleRecommendation> = ranked
                .iter()
                .filter(|item| {
                    item.id != top.id
                        && item.total_numeric_price < top.total_numeric_price
                        && item.coverage.count > 0
                })
                .collect();
            pool.sort_by(|a, b| by_value(a, b));
            pool.first().map(|&item| {
                let mut pick = item.clone();
                pick.badge = Some(Badge::BestValue);
                self.mark_redundant(&mut pick);
                pick
            })
        };

        let mut items = vec![RecommendationItem::Bundle(top)];
        if let Some(pick) = best_value {
            items.push(RecommendationItem::Bundle(pick));
        }

        let in_picks: HashSet<String> = items
            .iter()
            .flat_map(|item| item.services().iter().map(|s| s.id.clone()))
            .collect();

        let mut remaining = Vec::new();
        for service in catalog.services() {
            if in_picks.contains(&service.id) {
                continue;
            }
            if let Some(item) = self.service_item(service, &league_ids) {
                remaining.push(item);
            }
        }
        remaining.sort_by(by_service);

        for item in remaining {
            if !items.iter().any(|existing| existing.id() == item.id) {
                items.push(RecommendationItem::Service(item));
            }
        }

        tracing::info!(
            candidates = candidate_count,
            scored = ranked.len(),
            items = items.len(),
            top_coverage = items[0].id(),
            best_value = items
                .iter()
                .find(|i| i.badge() == Some(Badge::BestValue))
                .map(|i| i.id()),
            coverage_cache_entries = self.coverage.cached_entries(),
            "Recommendations computed"
        );

        RecommendationList { items }
    }

    /// Scores a candidate; candidates covering nothing are dropped
    fn enrich(
        &mut self,
        candidate: BundleCandidate<'a>,
        league_ids: &[String],
        base_covered: &HashSet<&str>,
    ) -> Option<BundleRecommendation> {
        let id = candidate.canonical_id();
        let coverage = self.coverage.coverage_of(&candidate.services, league_ids);
        if coverage.count == 0 {
            return None;
        }

        let all_new = candidate
            .services
            .iter()
            .all(|s| !self.is_subscribed(&s.id));
        let newly_covered: BTreeMap<_, _> = coverage
            .details
            .iter()
            .filter(|(league_id, _)| all_new || !base_covered.contains(league_id.as_str()))
            .map(|(league_id, detail)| (league_id.clone(), detail.clone()))
            .collect();

        let weighted = self
            .coverage
            .bundle_stats(&candidate.services, league_ids, self.preferences)
            .total_weighted_coverage;

        let display_name = candidate
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");

        Some(BundleRecommendation {
            id,
            total_numeric_price: candidate.services.iter().map(|s| s.numeric_price).sum(),
            value_score: value_score(coverage.count, candidate.additional_cost),
            services_involved: candidate.services.into_iter().cloned().collect(),
            additional_numeric_cost: candidate.additional_cost,
            coverage: (*coverage).clone(),
            newly_covered_leagues_details: newly_covered,
            display_name,
            badge: None,
            redundant_subscriptions: Vec::new(),
            potential_savings: 0.0,
            weighted_coverage_score: weighted,
        })
    }

    /// Lists subscriptions the pick leaves out and what dropping them would save
    fn mark_redundant(&self, pick: &mut BundleRecommendation) {
        let members: HashSet<&str> = pick
            .services_involved
            .iter()
            .map(|s| s.id.as_str())
            .collect();

        let redundant: Vec<RedundantSubscription> = self
            .subscribed_services()
            .into_iter()
            .filter(|s| !members.contains(s.id.as_str()))
            .map(RedundantSubscription::from)
            .collect();

        pick.potential_savings = redundant.iter().map(|s| s.numeric_price).sum();
        pick.redundant_subscriptions = redundant;
    }

    fn service_item(
        &mut self,
        service: &'a StreamingService,
        league_ids: &[String],
    ) -> Option<ServiceRecommendation> {
        let coverage = self.coverage.coverage_of(&[service], league_ids);
        if coverage.count == 0 {
            return None;
        }

        let is_subscribed = self.is_subscribed(&service.id);
        let additional = if is_subscribed {
            0.0
        } else {
            service.numeric_price
        };

        Some(ServiceRecommendation {
            id: service.id.clone(),
            service: service.clone(),
            display_name: service.name.clone(),
            coverage: (*coverage).clone(),
            additional_numeric_cost: additional,
            total_numeric_price: service.numeric_price,
            is_subscribed,
            value_score: value_score(coverage.count, additional),
        })
    }
}

/// Ranks recommendations for one selection snapshot with a fresh engine
pub fn compute_recommendations(
    catalog: &Catalog,
    preferences: &UserPreferences,
) -> RecommendationList {
    RecommendationEngine::new(catalog, preferences).compute_recommendations()
}
