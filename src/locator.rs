use std::time::Duration;

use crate::dom::{Document, Element, InputHandle};
use crate::platforms::PlatformConfig;

// ============ Predicates ============

/// Rendered with a non-zero box and not hidden by style
pub fn is_visible(element: &impl Element) -> bool {
    let size = element.bounding_size();
    let style = element.computed_style();
    size.width > 0.0 && size.height > 0.0 && style.display != "none" && style.visibility != "hidden"
}

pub fn is_interactive(element: &impl Element) -> bool {
    !element.is_disabled() && !element.is_read_only()
}

/// First visible, interactive match, trying selectors in priority order
pub fn locate<D: Document>(document: &D, config: &PlatformConfig) -> Option<InputHandle<D::Element>> {
    for selector in &config.candidate_selectors {
        let found = document
            .query_selector_all(selector)
            .into_iter()
            .find(|element| is_visible(element) && is_interactive(element));
        if let Some(element) = found {
            return Some(InputHandle::from_element(element));
        }
    }
    None
}

// ============ Diagnostics ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFlags {
    pub visible: bool,
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorDiagnostic {
    pub selector: String,
    pub matches: Vec<MatchFlags>,
}

impl SelectorDiagnostic {
    pub fn format_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: found {} elements", self.selector, self.matches.len())];
        lines.extend(self.matches.iter().enumerate().map(|(i, m)| {
            format!("  [{}] visible: {}, interactive: {}", i, m.visible, m.interactive)
        }));
        lines
    }
}

/// Why each selector came up empty
pub fn diagnose<D: Document>(document: &D, config: &PlatformConfig) -> Vec<SelectorDiagnostic> {
    config
        .candidate_selectors
        .iter()
        .map(|selector| SelectorDiagnostic {
            selector: selector.clone(),
            matches: document
                .query_selector_all(selector)
                .iter()
                .map(|element| MatchFlags {
                    visible: is_visible(element),
                    interactive: is_interactive(element),
                })
                .collect(),
        })
        .collect()
}

// ============ Search Cycle ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    WaitingSettle,
    Searching,
    Found,
    Exhausted,
}

/// What the driver should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    Wait(Duration),
    Search,
    Done(SearchState),
}

/// Retry policy for one pass: settle, then search up to `max_attempts` times
#[derive(Debug, Clone)]
pub struct SearchCycle {
    state: SearchState,
    attempts: u32,
    max_attempts: u32,
    retry_delay: Duration,
    pending_wait: Option<Duration>,
}

impl SearchCycle {
    pub fn new(settle_delay: Duration, retry_delay: Duration, max_attempts: u32) -> Self {
        Self {
            state: SearchState::WaitingSettle,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            retry_delay,
            pending_wait: Some(settle_delay),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Searches that came up empty so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn next_step(&mut self) -> SearchStep {
        if let Some(wait) = self.pending_wait.take() {
            return SearchStep::Wait(wait);
        }
        match self.state {
            SearchState::WaitingSettle => {
                self.state = SearchState::Searching;
                SearchStep::Search
            }
            SearchState::Searching => SearchStep::Search,
            done => SearchStep::Done(done),
        }
    }

    /// Record the result of the search just run
    pub fn record(&mut self, found: bool) {
        if self.state != SearchState::Searching {
            return;
        }
        if found {
            self.state = SearchState::Found;
            return;
        }
        self.attempts += 1;
        if self.attempts < self.max_attempts {
            self.pending_wait = Some(self.retry_delay);
        } else {
            self.state = SearchState::Exhausted;
        }
    }
}
