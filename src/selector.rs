use crate::profiles::{BUSINESS, CONSTRUCTION, DEFAULT_PROFILE_ID, TECHNICAL};

/// Keyword groups checked in priority order; first group with a hit wins
const KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    (BUSINESS, &["business", "strategy", "market"]),
    (TECHNICAL, &["code", "programming", "api", "technical"]),
    (CONSTRUCTION, &["construction", "building", "contractor"]),
];

/// Pick a starting profile from the visible page text
pub fn select_profile(page_text: &str) -> &'static str {
    let lower = page_text.to_lowercase();

    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(profile_id, _)| *profile_id)
        .unwrap_or(DEFAULT_PROFILE_ID)
}
