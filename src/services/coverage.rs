use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;

use crate::models::{
    Bundle, Catalog, CoverageSummary, CoveredLeague, LeagueCoverageDetail, StreamingService,
    UserPreferences, MAX_COVERAGE_PERCENT, UNKNOWN_LEAGUE_ICON,
};

/// Memo key: the service set and league set, each sorted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoverageKey {
    services: Vec<String>,
    leagues: Vec<String>,
}

impl CoverageKey {
    pub fn new(services: &[&StreamingService], league_ids: &[String]) -> Self {
        let mut services: Vec<String> = services.iter().map(|s| s.id.clone()).collect();
        services.sort();
        let mut leagues = league_ids.to_vec();
        leagues.sort();
        Self { services, leagues }
    }
}

impl Display for CoverageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cov:{}|{}",
            self.services.join(","),
            self.leagues.join(",")
        )
    }
}

/// Computes league coverage for sets of services
///
/// Binary coverage is memoized per (service set, league set). The cache lives exactly as
/// long as the calculator, which is owned by one engine instance.
pub struct CoverageCalculator<'a> {
    catalog: &'a Catalog,
    cache: HashMap<CoverageKey, Arc<CoverageSummary>>,
    hits: usize,
}

impl<'a> CoverageCalculator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
            hits: 0,
        }
    }

    /// Number of distinct (service set, league set) pairs computed so far
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }

    fn league_label(&self, league_id: &str) -> (String, String) {
        match self.catalog.league(league_id) {
            Some(league) => (league.name.clone(), league.icon.clone()),
            None => (league_id.to_string(), UNKNOWN_LEAGUE_ICON.to_string()),
        }
    }

    /// Which target leagues at least one service carries, with the channels that carry them
    pub fn coverage_of(
        &mut self,
        services: &[&StreamingService],
        league_ids: &[String],
    ) -> Arc<CoverageSummary> {
        let key = CoverageKey::new(services, league_ids);
        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            return Arc::clone(cached);
        }

        let mut details: BTreeMap<String, LeagueCoverageDetail> = BTreeMap::new();

        for service in services {
            for league_id in league_ids {
                let Some(league) = service.league(league_id) else {
                    continue;
                };

                let entry = details.entry(league_id.clone()).or_insert_with(|| {
                    let (name, icon) = self.league_label(league_id);
                    LeagueCoverageDetail {
                        name,
                        icon,
                        channels: Vec::new(),
                    }
                });

                for channel in &league.channels {
                    let labelled = format!("{} (on {})", channel, service.name);
                    if !entry.channels.contains(&labelled) {
                        entry.channels.push(labelled);
                    }
                }
            }
        }

        let summary = Arc::new(CoverageSummary {
            count: details.len(),
            details,
        });

        tracing::trace!(key = %key, covered = summary.count, "Coverage computed");

        self.cache.insert(key, Arc::clone(&summary));
        summary
    }

    /// Summed, capped and preference-weighted coverage of a set of services
    ///
    /// Each league's percent is the sum over member services, capped at 100. Only entries
    /// with a non-zero percent contribute channels and the coverage label.
    pub fn bundle_stats(
        &self,
        services: &[&StreamingService],
        league_ids: &[String],
        preferences: &UserPreferences,
    ) -> Bundle {
        let total_price: f64 = services.iter().map(|s| s.numeric_price).sum();
        let mut per_league_coverage = BTreeMap::new();
        let mut covered_leagues = BTreeMap::new();
        let mut total_coverage = 0.0;
        let mut total_weighted_coverage = 0.0;

        for league_id in league_ids {
            let weight = f64::from(preferences.preference_weight(league_id));

            let mut sum = 0.0;
            let mut label = String::new();
            let mut channels = Vec::new();
            for service in services {
                let Some(league) = service.league(league_id) else {
                    continue;
                };
                let percent = league.percent();
                if percent <= 0.0 {
                    continue;
                }
                sum += percent;
                if label.is_empty() {
                    if let Some(text) = league.coverage.as_deref().filter(|t| !t.is_empty()) {
                        label = text.to_string();
                    }
                }
                channels.extend(
                    league
                        .channels
                        .iter()
                        .map(|ch| format!("{} (on {})", ch, service.name)),
                );
            }

            let capped = clamp_percent(sum);
            per_league_coverage.insert(league_id.clone(), capped);
            total_coverage += capped;
            total_weighted_coverage += capped * weight;

            if capped > 0.0 {
                let (name, icon) = self.league_label(league_id);
                covered_leagues.insert(
                    league_id.clone(),
                    CoveredLeague {
                        name,
                        icon,
                        channels,
                        coverage: label,
                        coverage_percent: capped,
                    },
                );
            }
        }

        Bundle {
            services: services.iter().map(|s| (*s).clone()).collect(),
            total_price,
            per_league_coverage,
            total_coverage,
            covered_leagues,
            total_weighted_coverage,
        }
    }
}

/// Keeps a summed league percent inside [0, 100]
pub fn clamp_percent(sum: f64) -> f64 {
    if sum.is_nan() {
        return 0.0;
    }
    sum.clamp(0.0, MAX_COVERAGE_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeagueCategory, League, LeagueCoverage};

    fn coverage(channels: &[&str], percent: Option<f64>, label: Option<&str>) -> LeagueCoverage {
        LeagueCoverage {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            coverage: label.map(str::to_string),
            coverage_percent: percent,
        }
    }

    fn catalog() -> Catalog {
        let categories = vec![LeagueCategory {
            name: "Pro".to_string(),
            leagues: vec![League::new("nfl", "NFL", "🏈"), League::new("nba", "NBA", "🏀")],
        }];
        Catalog::new(vec![], categories).unwrap()
    }

    fn leagues(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_binary_coverage_counts_entries_regardless_of_percent() {
        let catalog = catalog();
        let mut calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("nfl", coverage(&["CBS"], None, None));
        let b = StreamingService::new("b", "Beta", "$8")
            .with_league("nba", coverage(&["TNT"], Some(0.0), None));

        let summary = calc.coverage_of(&[&a, &b], &leagues(&["nfl", "nba", "mls"]));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.details["nfl"].name, "NFL");
        assert_eq!(summary.details["nfl"].channels, vec!["CBS (on Alpha)"]);
        assert!(!summary.details.contains_key("mls"));
    }

    #[test]
    fn test_channels_deduplicated_across_services() {
        let catalog = catalog();
        let mut calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("nfl", coverage(&["CBS", "CBS", "FOX"], None, None));
        let b = StreamingService::new("b", "Beta", "$8")
            .with_league("nfl", coverage(&["CBS"], None, None));

        let summary = calc.coverage_of(&[&a, &b], &leagues(&["nfl"]));
        assert_eq!(
            summary.details["nfl"].channels,
            vec!["CBS (on Alpha)", "FOX (on Alpha)", "CBS (on Beta)"]
        );
    }

    #[test]
    fn test_unknown_league_falls_back_to_id() {
        let catalog = catalog();
        let mut calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("cfl", coverage(&["TSN"], None, None));

        let summary = calc.coverage_of(&[&a], &leagues(&["cfl"]));
        assert_eq!(summary.details["cfl"].name, "cfl");
        assert_eq!(summary.details["cfl"].icon, "?");
    }

    #[test]
    fn test_memoized_by_sorted_sets() {
        let catalog = catalog();
        let mut calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("nfl", coverage(&["CBS"], None, None));
        let b = StreamingService::new("b", "Beta", "$8")
            .with_league("nba", coverage(&["TNT"], None, None));

        let first = calc.coverage_of(&[&a, &b], &leagues(&["nfl", "nba"]));
        let second = calc.coverage_of(&[&b, &a], &leagues(&["nba", "nfl"]));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calc.cached_entries(), 1);
        assert_eq!(calc.cache_hits(), 1);

        // A different league set is a different entry
        calc.coverage_of(&[&a, &b], &leagues(&["nfl"]));
        assert_eq!(calc.cached_entries(), 2);
    }

    #[test]
    fn test_key_display() {
        let a = StreamingService::new("b", "Beta", "$8");
        let b = StreamingService::new("a", "Alpha", "$10");
        let key = CoverageKey::new(&[&a, &b], &leagues(&["nfl", "mls"]));
        assert_eq!(format!("{}", key), "cov:a,b|mls,nfl");
    }

    #[test]
    fn test_bundle_stats_sums_and_caps() {
        let catalog = catalog();
        let calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("nfl", coverage(&["CBS"], Some(60.0), Some("Sunday games")));
        let b = StreamingService::new("b", "Beta", "$8")
            .with_league("nfl", coverage(&["FOX"], Some(50.0), Some("National games")));

        let mut prefs = UserPreferences::new();
        prefs.update_league_preference("nfl", 5);

        let stats = calc.bundle_stats(&[&a, &b], &leagues(&["nfl", "nba"]), &prefs);
        assert_eq!(stats.total_price, 18.0);
        assert_eq!(stats.per_league_coverage["nfl"], 100.0);
        assert_eq!(stats.per_league_coverage["nba"], 0.0);
        assert_eq!(stats.total_coverage, 100.0);
        assert_eq!(stats.total_weighted_coverage, 500.0);

        let nfl = &stats.covered_leagues["nfl"];
        assert_eq!(nfl.coverage, "Sunday games");
        assert_eq!(nfl.channels, vec!["CBS (on Alpha)", "FOX (on Beta)"]);
        assert!(!stats.covered_leagues.contains_key("nba"));
    }

    #[test]
    fn test_bundle_stats_ignores_zero_percent_entries() {
        let catalog = catalog();
        let calc = CoverageCalculator::new(&catalog);
        let a = StreamingService::new("a", "Alpha", "$10")
            .with_league("nfl", coverage(&["CBS"], None, Some("Listed only")));

        let stats = calc.bundle_stats(&[&a], &leagues(&["nfl"]), &UserPreferences::new());
        assert_eq!(stats.per_league_coverage["nfl"], 0.0);
        assert!(stats.covered_leagues.is_empty());
        assert_eq!(stats.total_weighted_coverage, 0.0);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(130.0), 100.0);
        assert_eq!(clamp_percent(-5.0), 0.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }
}
