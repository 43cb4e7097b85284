use serde::{Deserialize, Serialize};

/// Icon shown for leagues the taxonomy does not know about
pub const UNKNOWN_LEAGUE_ICON: &str = "?";

/// A sports league users can select
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct League {
    pub id: String,
    pub name: String,
    #[serde(default = "unknown_icon")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

fn unknown_icon() -> String {
    UNKNOWN_LEAGUE_ICON.to_string()
}

impl League {
    pub fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            logo: None,
        }
    }
}

/// A named group of leagues (e.g. "Football", "Motorsport")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeagueCategory {
    #[serde(alias = "category", alias = "categoryName")]
    pub name: String,
    #[serde(default)]
    pub leagues: Vec<League>,
}

/// A selected league together with the user's preference weight for it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectedLeague {
    #[serde(flatten)]
    pub league: League,
    pub preference_weight: u8,
}
