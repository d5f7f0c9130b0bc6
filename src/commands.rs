//! `#tag` directives typed into the watched input.
//!
//! Tags are read left to right. Profile tags switch the active profile (the
//! last one wins) and are stripped from the text. `#new` is removed,
//! `#carry` becomes the carry-over marker, anything else stays as typed.
//! All rewrites apply to one working text in the order the tags appear.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::logging;
use crate::profiles::{ProfileStore, BUSINESS, CONSTRUCTION, LEARNING, TECHNICAL};

// Word characters and boundaries are ASCII-only: `#newé` is `#new` followed by `é`
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"#((?-u:\w)+)").expect("valid tag regex"));
static NEW_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)#new(?-u:\b)").expect("valid #new regex"));
static CARRY_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)#carry(?-u:\b)").expect("valid #carry regex"));
static SWITCH_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    let words = SWITCH_TAGS.iter().map(|(word, _)| *word).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)#(?:{})(?-u:\b)", words)).expect("valid profile tag regex")
});

/// Tag word to profile id
const SWITCH_TAGS: &[(&str, &str)] = &[
    ("learning", LEARNING),
    ("learn", LEARNING),
    ("business", BUSINESS),
    ("biz", BUSINESS),
    ("technical", TECHNICAL),
    ("tech", TECHNICAL),
    ("code", TECHNICAL),
    ("construction", CONSTRUCTION),
    ("build", CONSTRUCTION),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Switch(&'static str),
    New,
    Carry,
    Unknown(String),
}

impl Directive {
    pub fn from_tag(word: &str) -> Directive {
        let word = word.to_lowercase();
        if let Some((_, profile_id)) = SWITCH_TAGS.iter().find(|(tag, _)| *tag == word) {
            Directive::Switch(*profile_id)
        } else if word == "new" {
            Directive::New
        } else if word == "carry" {
            Directive::Carry
        } else {
            Directive::Unknown(word)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutcome {
    pub text: String,
    pub profile_switched: bool,
    /// Every tag found, in order of appearance
    pub directives: Vec<Directive>,
}

/// All tags in `raw`, left to right, lower-cased
pub fn parse_tags(raw: &str) -> Vec<Directive> {
    TAG_REGEX
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|word| Directive::from_tag(word.as_str()))
        .collect()
}

/// Apply the directives in `raw` to `profiles` and return the rewritten text
pub fn process_tags(raw: &str, profiles: &mut ProfileStore, carry_marker: &str) -> TagOutcome {
    let directives = parse_tags(raw);
    let mut text = raw.to_string();
    let mut profile_switched = false;

    for directive in &directives {
        match directive {
            Directive::Switch(profile_id) => {
                profiles.set_active(profile_id);
                profile_switched = true;
            }
            Directive::New => {
                text = NEW_TAG_REGEX.replace_all(&text, "").trim().to_string();
                logging::log_command(None, "New session started");
            }
            Directive::Carry => {
                text = CARRY_TAG_REGEX
                    .replace_all(&text, regex::NoExpand(carry_marker))
                    .trim()
                    .to_string();
                logging::log_command(None, "Carrying context forward");
            }
            Directive::Unknown(_) => {}
        }
    }

    if profile_switched {
        let name = profiles
            .active()
            .map(|p| p.display_name.as_str())
            .unwrap_or(profiles.active_id());
        logging::log_command(None, &format!("Profile switched to: {}", name));
        text = SWITCH_TAG_REGEX.replace_all(&text, "").trim().to_string();
    }

    TagOutcome {
        text,
        profile_switched,
        directives,
    }
}
