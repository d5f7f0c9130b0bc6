use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============ Platform Config ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Case-insensitive substring of the page address
    pub match_token: String,
    /// Tried in order; earlier selectors take priority
    pub candidate_selectors: Vec<String>,
    pub settle_delay_ms: u64,
    /// Fired on the input after each write, in this order
    pub notify_events: Vec<String>,
}

impl PlatformConfig {
    pub fn new(match_token: &str, selectors: &[&str], settle_delay_ms: u64, events: &[&str]) -> Self {
        Self {
            match_token: match_token.to_lowercase(),
            candidate_selectors: selectors.iter().map(|s| s.to_string()).collect(),
            settle_delay_ms,
            notify_events: events.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPlatform<'a> {
    pub id: &'a str,
    pub config: &'a PlatformConfig,
}

// ============ Platform Registry ============

#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    entries: Vec<(String, PlatformConfig)>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PlatformRegistry {
    pub fn new(entries: Vec<(String, PlatformConfig)>) -> Self {
        Self { entries }
    }

    /// Supported chat apps, in detection priority order
    pub fn builtin() -> Self {
        Self::new(vec![
            (
                "claude.ai".to_string(),
                PlatformConfig::new(
                    "claude.ai",
                    &[
                        r#"div[contenteditable="true"]"#,
                        r#"textarea[placeholder*="message"]"#,
                        r#"div[role="textbox"]"#,
                        ".ProseMirror",
                    ],
                    2000,
                    &["input", "change", "focus"],
                ),
            ),
            (
                "deepseek".to_string(),
                PlatformConfig::new(
                    "deepseek",
                    &[
                        r#"textarea[class*="chat-input"]"#,
                        r#"textarea[class*="input"]"#,
                        r#"textarea:not([style*="display: none"])"#,
                    ],
                    1500,
                    &["input", "change", "keyup"],
                ),
            ),
            (
                "perplexity.ai".to_string(),
                PlatformConfig::new(
                    "perplexity.ai",
                    &[
                        r#"textarea[placeholder*="Ask anything"]"#,
                        r#"textarea[data-testid*="search"]"#,
                        r#"div[contenteditable="true"]"#,
                    ],
                    2000,
                    &["input", "change", "focus"],
                ),
            ),
            (
                "chat.openai.com".to_string(),
                PlatformConfig::new(
                    "chat.openai.com",
                    &[
                        r#"textarea[data-id*="chat"]"#,
                        r#"textarea[placeholder*="Send a message"]"#,
                        "#prompt-textarea",
                    ],
                    2500,
                    &["input", "change", "keyup"],
                ),
            ),
        ])
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// First registered platform whose token occurs in `address`.
    /// Linear scan: on overlapping tokens the earlier entry wins.
    pub fn detect(&self, address: &str) -> Option<DetectedPlatform<'_>> {
        let address = address.to_lowercase();
        self.entries
            .iter()
            .find(|(_, config)| address.contains(&config.match_token.to_lowercase()))
            .map(|(id, config)| DetectedPlatform { id: id.as_str(), config })
    }
}
