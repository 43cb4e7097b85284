use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::{AppError, AppResult};

use super::{League, LeagueCategory, ServiceRecord, StreamingService};

/// Services of one category, as shown in the subscription picker
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceCategoryGroup {
    pub category_name: String,
    pub icon: String,
    pub services: Vec<StreamingService>,
}

/// In-memory service catalog and league taxonomy
///
/// Built once at start-up and shared read-only by every request. Service order and
/// league order are preserved from the source data; they drive the engine's
/// deterministic tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: Vec<StreamingService>,
    categories: Vec<LeagueCategory>,
    service_index: HashMap<String, usize>,
    league_index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate service or league ids
    pub fn new(records: Vec<ServiceRecord>, categories: Vec<LeagueCategory>) -> AppResult<Self> {
        let services: Vec<StreamingService> =
            records.into_iter().map(StreamingService::from).collect();

        let mut service_index = HashMap::with_capacity(services.len());
        for (i, service) in services.iter().enumerate() {
            if service_index.insert(service.id.clone(), i).is_some() {
                return Err(AppError::Catalog(format!(
                    "duplicate service id '{}'",
                    service.id
                )));
            }
        }

        let mut league_index = HashMap::new();
        for (c, category) in categories.iter().enumerate() {
            for (l, league) in category.leagues.iter().enumerate() {
                if league_index.insert(league.id.clone(), (c, l)).is_some() {
                    return Err(AppError::Catalog(format!(
                        "duplicate league id '{}'",
                        league.id
                    )));
                }
            }
        }

        Ok(Self {
            services,
            categories,
            service_index,
            league_index,
        })
    }

    /// Parses the service list and the league taxonomy from JSON documents
    pub fn from_json(services_json: &str, leagues_json: &str) -> AppResult<Self> {
        let records: Vec<ServiceRecord> = serde_json::from_str(services_json)?;
        let categories: Vec<LeagueCategory> = serde_json::from_str(leagues_json)?;
        Self::new(records, categories)
    }

    /// Loads the catalog from the two JSON data files
    pub fn load(services_path: impl AsRef<Path>, leagues_path: impl AsRef<Path>) -> AppResult<Self> {
        let services_path = services_path.as_ref();
        let leagues_path = leagues_path.as_ref();

        let services_json = std::fs::read_to_string(services_path).map_err(|e| {
            AppError::Catalog(format!("reading {}: {}", services_path.display(), e))
        })?;
        let leagues_json = std::fs::read_to_string(leagues_path).map_err(|e| {
            AppError::Catalog(format!("reading {}: {}", leagues_path.display(), e))
        })?;

        let catalog = Self::from_json(&services_json, &leagues_json)?;

        tracing::info!(
            services = catalog.services.len(),
            leagues = catalog.league_index.len(),
            categories = catalog.categories.len(),
            "Catalog loaded"
        );

        Ok(catalog)
    }

    pub fn services(&self) -> &[StreamingService] {
        &self.services
    }

    pub fn service(&self, id: &str) -> Option<&StreamingService> {
        self.service_index.get(id).map(|&i| &self.services[i])
    }

    pub fn categories(&self) -> &[LeagueCategory] {
        &self.categories
    }

    pub fn league(&self, id: &str) -> Option<&League> {
        self.league_index
            .get(id)
            .map(|&(c, l)| &self.categories[c].leagues[l])
    }

    /// Every league across all categories, in taxonomy order
    pub fn all_leagues_flat(&self) -> impl Iterator<Item = &League> {
        self.categories.iter().flat_map(|c| c.leagues.iter())
    }

    pub fn league_count(&self) -> usize {
        self.league_index.len()
    }

    /// Groups services by their category, sorted by category name
    pub fn grouped_by_category(&self) -> Vec<ServiceCategoryGroup> {
        let mut grouped: BTreeMap<&str, Vec<StreamingService>> = BTreeMap::new();
        for service in &self.services {
            grouped
                .entry(service.category())
                .or_default()
                .push(service.clone());
        }

        grouped
            .into_iter()
            .map(|(name, services)| ServiceCategoryGroup {
                category_name: name.to_string(),
                icon: category_icon(name).to_string(),
                services,
            })
            .collect()
    }

    /// Ids of services that exist in this catalog, dropping unknown ones
    pub fn known_service_ids<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
        ids.into_iter()
            .filter(|id| self.service_index.contains_key(id.as_str()))
            .cloned()
            .collect()
    }
}

fn category_icon(category: &str) -> &'static str {
    match category {
        "Live TV Streaming" => "📺",
        "League/Sport Specific" => "🎯",
        "Sport Specific & Add-ons" => "➕",
        _ => "📦",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = r#"[
        {"id": "fubo", "name": "Fubo", "price": "$79.99/month", "serviceCategory": "Live TV Streaming",
         "leagues": {"nfl": {"channels": ["CBS", "FOX"], "coveragePercent": 80}}},
        {"id": "espn_plus", "name": "ESPN+", "price": "$10.99/month", "serviceCategory": "League/Sport Specific",
         "leagues": {"nhl": {"channels": ["ESPN+"], "coveragePercent": 60}}},
        {"id": "mystery", "name": "Mystery Box", "price": "call us"}
    ]"#;

    const LEAGUES: &str = r#"[
        {"name": "Football", "leagues": [{"id": "nfl", "name": "NFL", "icon": "🏈"}]},
        {"name": "Hockey", "leagues": [{"id": "nhl", "name": "NHL", "icon": "🏒"}]}
    ]"#;

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json(SERVICES, LEAGUES).unwrap();
        assert_eq!(catalog.services().len(), 3);
        assert_eq!(catalog.league_count(), 2);
        assert_eq!(catalog.service("espn_plus").unwrap().numeric_price, 10.99);
        assert_eq!(catalog.league("nhl").unwrap().name, "NHL");
        assert!(catalog.league("cfl").is_none());

        let flat: Vec<&str> = catalog.all_leagues_flat().map(|l| l.id.as_str()).collect();
        assert_eq!(flat, vec!["nfl", "nhl"]);
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let services = r#"[{"id": "a", "name": "A"}, {"id": "a", "name": "A again"}]"#;
        let result = Catalog::from_json(services, "[]");
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_duplicate_league_rejected() {
        let leagues = r#"[
            {"name": "One", "leagues": [{"id": "nfl", "name": "NFL"}]},
            {"name": "Two", "leagues": [{"id": "nfl", "name": "NFL"}]}
        ]"#;
        let result = Catalog::from_json("[]", leagues);
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_grouped_by_category() {
        let catalog = Catalog::from_json(SERVICES, LEAGUES).unwrap();
        let groups = catalog.grouped_by_category();

        let names: Vec<&str> = groups.iter().map(|g| g.category_name.as_str()).collect();
        assert_eq!(names, vec!["League/Sport Specific", "Live TV Streaming", "Other"]);
        assert_eq!(groups[0].icon, "🎯");
        assert_eq!(groups[1].icon, "📺");
        assert_eq!(groups[2].icon, "📦");
        assert_eq!(groups[2].services[0].id, "mystery");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Catalog::load("/nonexistent/services.json", "/nonexistent/leagues.json");
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_known_service_ids() {
        let catalog = Catalog::from_json(SERVICES, LEAGUES).unwrap();
        let requested = vec!["fubo".to_string(), "ghost".to_string()];
        let known = catalog.known_service_ids(&requested);
        assert_eq!(known.len(), 1);
        assert!(known.contains("fubo"));
    }
}
