use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Catalog, SelectedLeague};

/// Lowest league preference weight
pub const MIN_PREFERENCE_WEIGHT: u8 = 1;
/// Highest league preference weight
pub const MAX_PREFERENCE_WEIGHT: u8 = 5;
/// Weight used for leagues the user never rated
pub const DEFAULT_PREFERENCE_WEIGHT: u8 = 3;

/// The user's league selection, current subscriptions and per-league priorities
///
/// Owned by the caller; the engine only reads it. Both id lists keep insertion order
/// and never hold duplicates when mutated through the methods below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    /// Leagues the user wants to watch
    #[serde(default)]
    pub selected_league_ids: Vec<String>,
    /// Services the user is already paying for
    #[serde(default)]
    pub subscribed_service_ids: Vec<String>,
    /// League id to weight in [1, 5]
    #[serde(default)]
    pub league_preferences: BTreeMap<String, u8>,
}

fn clamp_weight(weight: i64) -> u8 {
    weight.clamp(MIN_PREFERENCE_WEIGHT as i64, MAX_PREFERENCE_WEIGHT as i64) as u8
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a league, or unselects it when already selected.
    /// The league's preference weight is kept either way.
    pub fn toggle_league(&mut self, league_id: &str) {
        toggle(&mut self.selected_league_ids, league_id);
    }

    /// Adds a subscription, or removes it when already subscribed
    pub fn toggle_subscription(&mut self, service_id: &str) {
        toggle(&mut self.subscribed_service_ids, service_id);
    }

    pub fn select_all_leagues(&mut self, catalog: &Catalog) {
        self.selected_league_ids = catalog.all_leagues_flat().map(|l| l.id.clone()).collect();
    }

    pub fn unselect_all_leagues(&mut self) {
        self.selected_league_ids.clear();
    }

    pub fn select_all_services(&mut self, catalog: &Catalog) {
        self.subscribed_service_ids = catalog.services().iter().map(|s| s.id.clone()).collect();
    }

    pub fn unselect_all_services(&mut self) {
        self.subscribed_service_ids.clear();
    }

    /// Sets one league's weight, clamped into [1, 5]
    pub fn update_league_preference(&mut self, league_id: &str, weight: i64) {
        self.league_preferences
            .insert(league_id.to_string(), clamp_weight(weight));
    }

    /// Forgets every weight, so all leagues fall back to the default
    pub fn reset_league_preferences(&mut self) {
        self.league_preferences.clear();
    }

    /// Gives every currently selected league the same (clamped) weight
    pub fn set_all_league_preferences(&mut self, weight: i64) {
        let weight = clamp_weight(weight);
        for league_id in &self.selected_league_ids {
            self.league_preferences.insert(league_id.clone(), weight);
        }
    }

    pub fn is_subscribed(&self, service_id: &str) -> bool {
        self.subscribed_service_ids.iter().any(|id| id == service_id)
    }

    /// Weight of a league; unrated (or zero) weights read as the default
    pub fn preference_weight(&self, league_id: &str) -> u8 {
        match self.league_preferences.get(league_id) {
            Some(&w) if w > 0 => w.min(MAX_PREFERENCE_WEIGHT),
            _ => DEFAULT_PREFERENCE_WEIGHT,
        }
    }

    /// Selected league ids with duplicates removed, first occurrence kept
    pub fn unique_league_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.selected_league_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }

    /// Selected leagues in taxonomy order, with their weights
    pub fn selected_leagues(&self, catalog: &Catalog) -> Vec<SelectedLeague> {
        catalog
            .all_leagues_flat()
            .filter(|league| self.selected_league_ids.contains(&league.id))
            .map(|league| SelectedLeague {
                league: league.clone(),
                preference_weight: self.preference_weight(&league.id),
            })
            .collect()
    }

    /// Selected leagues, highest weight first (taxonomy order within a weight)
    pub fn selected_leagues_by_preference(&self, catalog: &Catalog) -> Vec<SelectedLeague> {
        let mut leagues = self.selected_leagues(catalog);
        leagues.sort_by(|a, b| b.preference_weight.cmp(&a.preference_weight));
        leagues
    }
}

fn toggle(ids: &mut Vec<String>, id: &str) {
    if let Some(index) = ids.iter().position(|existing| existing == id) {
        ids.remove(index);
    } else {
        ids.push(id.to_string());
    }
}
