// Built-in context profiles and the store that tracks the active one.
// Body texts are injected ahead of whatever the user has typed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::{self, KeyValueStore};
use crate::logging;

pub const LEARNING: &str = "learning";
pub const BUSINESS: &str = "business";
pub const TECHNICAL: &str = "technical";
pub const CONSTRUCTION: &str = "construction";

/// Fallback when the active id is missing from the store
pub const DEFAULT_PROFILE_ID: &str = LEARNING;

/// Storage key for the serialized profile map
pub const PROFILES_KEY: &str = "contextProfiles";
/// Storage key for the active profile id
pub const CURRENT_PROFILE_KEY: &str = "currentProfile";

const LEARNING_CONTEXT: &str = "Visual learner who reverse-engineers concepts. Explain casually, no academic tone. Show working examples first, then break down the concepts. I learn by building and understanding how things work.";

const BUSINESS_CONTEXT: &str = "Construction background entrepreneur transitioning to tech. Focus on practical business applications, market opportunities, and actionable strategies. No fluff - give me concrete next steps.";

const TECHNICAL_CONTEXT: &str = "Building AI context management system. Need technical details but explained for someone transitioning from construction to tech. Show code examples and practical implementations.";

const CONSTRUCTION_CONTEXT: &str = "20+ years construction experience. Relate tech concepts to construction processes. Focus on automation, efficiency, and practical tools that solve real job site problems.";

// ============ Profile ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Map key in storage, not repeated inside the record
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "context")]
    pub body_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Profile {
    pub fn new(id: &str, display_name: &str, body_text: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            body_text: body_text.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

pub fn builtin_profiles() -> Vec<Profile> {
    vec![
        Profile::new(
            LEARNING,
            "Learning Mode",
            LEARNING_CONTEXT,
            &["explain", "learn", "understand", "how", "why"],
        ),
        Profile::new(
            BUSINESS,
            "Business Strategy",
            BUSINESS_CONTEXT,
            &["business", "market", "strategy", "revenue", "growth"],
        ),
        Profile::new(
            TECHNICAL,
            "Technical Development",
            TECHNICAL_CONTEXT,
            &["code", "build", "technical", "implement", "architecture"],
        ),
        Profile::new(
            CONSTRUCTION,
            "Construction Focus",
            CONSTRUCTION_CONTEXT,
            &["construction", "automation", "tools", "efficiency", "jobsite"],
        ),
    ]
}

/// Decode each saved entry on its own; entries that fail are logged and dropped
fn parse_saved_entries(entries: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, Profile> {
    entries
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<Profile>(value) {
            Ok(profile) => Some((id, profile)),
            Err(e) => {
                logging::log_error(None, &format!("Skipping saved profile '{}': {}", id, e));
                None
            }
        })
        .collect()
}

// ============ Profile Store ============

#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
    active_id: String,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::with_profiles(builtin_profiles())
    }
}

impl ProfileStore {
    /// Store over `profiles`; the default id must be among them to be a usable fallback
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
            active_id: DEFAULT_PROFILE_ID.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Active id, or the default when the active id has no profile
    pub fn active_id(&self) -> &str {
        if self.contains(&self.active_id) {
            &self.active_id
        } else {
            DEFAULT_PROFILE_ID
        }
    }

    pub fn active(&self) -> Option<&Profile> {
        self.get(self.active_id())
    }

    pub fn is_default_active(&self) -> bool {
        self.active_id() == DEFAULT_PROFILE_ID
    }

    /// Switch the active profile; unknown ids fall back to the default
    pub fn set_active(&mut self, id: &str) {
        if self.contains(id) {
            self.active_id = id.to_string();
        } else {
            logging::log_error(None, &format!("Unknown profile '{}', using {}", id, DEFAULT_PROFILE_ID));
            self.active_id = DEFAULT_PROFILE_ID.to_string();
        }
    }

    /// Merge by id, incoming entries win
    pub fn overlay(&mut self, incoming: BTreeMap<String, Profile>) {
        for (id, mut profile) in incoming {
            profile.id = id.clone();
            self.profiles.insert(id, profile);
        }
    }

    // ============ Persistence ============

    /// Overlay saved profiles and restore the active id.
    /// Missing or malformed entries are treated as absent; a bad entry only
    /// drops itself, not its neighbours.
    pub fn load_from(&mut self, store: &impl KeyValueStore) {
        match store.get(PROFILES_KEY) {
            Ok(Some(saved)) => match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&saved) {
                Ok(entries) => {
                    let profiles = parse_saved_entries(entries);
                    logging::log_profile(None, &format!("Loaded {} saved profiles", profiles.len()));
                    self.overlay(profiles);
                }
                Err(e) => logging::log_error(None, &format!("Ignoring malformed saved profiles: {}", e)),
            },
            Ok(None) => {}
            Err(e) => logging::log_error(None, &format!("Failed to read saved profiles: {}", e)),
        }

        match store.get(CURRENT_PROFILE_KEY) {
            Ok(Some(current)) if !current.trim().is_empty() => self.set_active(current.trim()),
            Ok(_) => {}
            Err(e) => logging::log_error(None, &format!("Failed to read current profile: {}", e)),
        }
    }

    pub fn save_to(&self, store: &impl KeyValueStore) -> db::Result<()> {
        let serialized = serde_json::to_string(&self.profiles)?;
        store.set(PROFILES_KEY, &serialized)?;
        store.set(CURRENT_PROFILE_KEY, self.active_id())?;
        logging::log_profile(None, &format!("Saved {} profiles, active: {}", self.profiles.len(), self.active_id()));
        Ok(())
    }
}
