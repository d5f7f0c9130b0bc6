use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::commands::process_tags;
use crate::config::EngineConfig;
use crate::db::KeyValueStore;
use crate::dom::{Document, Element, InputHandle};
use crate::locator::{diagnose, locate, SearchCycle, SearchStep, SelectorDiagnostic};
use crate::logging;
use crate::platforms::{PlatformConfig, PlatformRegistry};
use crate::profiles::ProfileStore;
use crate::selector::select_profile;

// ============ Scheduling ============

/// Suspension used for settle, retry and debounce waits
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// External events that start a pass or end the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PageReady,
    Mutation,
    Teardown,
}

// ============ Engine State ============

#[derive(Debug, Clone)]
pub struct EngineState {
    pub profiles: ProfileStore,
    /// Empty searches in the current pass
    pub attempt_count: u32,
    /// Set once a command or an earlier pass has chosen the profile
    pub profile_pinned: bool,
}

impl EngineState {
    pub fn new(profiles: ProfileStore) -> Self {
        Self {
            profiles,
            attempt_count: 0,
            profile_pinned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Unsupported,
    Exhausted {
        platform: String,
        diagnostics: Vec<SelectorDiagnostic>,
    },
    Injected {
        platform: String,
        profile_id: String,
        content: String,
    },
}

// ============ Composition ============

/// Profile body alone, or body + separator + label + query
pub fn compose(body: &str, query: &str, config: &EngineConfig) -> String {
    if query.trim().is_empty() {
        body.to_string()
    } else {
        format!("{}{}{}{}", body, config.separator, config.query_label, query)
    }
}

/// Drop a profile body (and query label) left by an earlier injection,
/// leaving only what the user typed
pub fn strip_prior_injection<'a>(existing: &'a str, profiles: &ProfileStore, config: &EngineConfig) -> &'a str {
    let label = format!("{}{}", config.separator, config.query_label);
    profiles
        .profiles()
        .filter(|p| !p.body_text.is_empty())
        .filter_map(|p| existing.strip_prefix(p.body_text.as_str()))
        .filter_map(|rest| if rest.is_empty() { Some(rest) } else { rest.strip_prefix(label.as_str()) })
        .min_by_key(|query| query.len())
        .unwrap_or(existing)
}

// ============ Injector ============

pub struct Injector<D: Document, S: Sleeper> {
    document: D,
    sleeper: S,
    registry: PlatformRegistry,
    config: EngineConfig,
    state: EngineState,
}

impl<D: Document, S: Sleeper> Injector<D, S> {
    pub fn new(document: D, sleeper: S, registry: PlatformRegistry, profiles: ProfileStore, config: EngineConfig) -> Self {
        Self {
            document,
            sleeper,
            registry,
            config,
            state: EngineState::new(profiles),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// One full detect -> select -> locate -> inject run
    pub async fn run_pass(&mut self) -> PassOutcome {
        let pass_id = Uuid::new_v4().to_string();
        let pass = Some(pass_id.as_str());
        self.state.attempt_count = 0;

        let address = self.document.location();
        let Some(detected) = self.registry.detect(&address) else {
            logging::log_platform(pass, "No supported AI platform detected");
            return PassOutcome::Unsupported;
        };
        let platform_id = detected.id.to_string();
        let platform = detected.config.clone();
        logging::log_platform(pass, &format!("Detected: {}", platform_id));

        if !self.state.profile_pinned && self.state.profiles.is_default_active() {
            let chosen = select_profile(&self.document.body_text());
            self.state.profiles.set_active(chosen);
            logging::log_profile(pass, &format!("Selected {} from page content", chosen));
        }
        self.state.profile_pinned = true;

        let Some(handle) = self.search(&platform_id, &platform, pass).await else {
            logging::log_locator(pass, "Injection failed - debugging info:");
            let diagnostics = diagnose(&self.document, &platform);
            logging::log_locator(pass, &format!("=== DEBUG: {} ===", platform_id));
            for line in diagnostics.iter().flat_map(|d| d.format_lines()) {
                logging::log_locator(pass, &line);
            }
            return PassOutcome::Exhausted {
                platform: platform_id,
                diagnostics,
            };
        };

        let content = self.inject(&handle, &platform, pass);
        PassOutcome::Injected {
            platform: platform_id,
            profile_id: self.state.profiles.active_id().to_string(),
            content,
        }
    }

    async fn search(&mut self, platform_id: &str, platform: &PlatformConfig, pass: Option<&str>) -> Option<InputHandle<D::Element>> {
        let mut cycle = SearchCycle::new(
            platform.settle_delay(),
            self.config.retry_delay(),
            self.config.max_attempts,
        );

        loop {
            match cycle.next_step() {
                SearchStep::Wait(duration) => self.sleeper.sleep(duration).await,
                SearchStep::Search => {
                    logging::log_locator(pass, &format!(
                        "Attempt {}/{} on {}",
                        cycle.attempts() + 1,
                        self.config.max_attempts,
                        platform_id
                    ));
                    let found = locate(&self.document, platform);
                    cycle.record(found.is_some());
                    self.state.attempt_count = cycle.attempts();
                    if found.is_some() {
                        return found;
                    }
                }
                SearchStep::Done(_) => return None,
            }
        }
    }

    /// Rewrite the input with the active profile and return what was written
    fn inject(&mut self, handle: &InputHandle<D::Element>, platform: &PlatformConfig, pass: Option<&str>) -> String {
        let existing = handle.read();
        let mut query = strip_prior_injection(&existing, &self.state.profiles, &self.config).to_string();

        if !query.trim().is_empty() {
            let outcome = process_tags(&query, &mut self.state.profiles, &self.config.carry_marker);
            if outcome.profile_switched {
                logging::log_profile(pass, &format!("Switched to {} by tag", self.state.profiles.active_id()));
            }
            query = outcome.text;
        }

        let (name, body) = match self.state.profiles.active() {
            Some(profile) => (profile.display_name.clone(), profile.body_text.clone()),
            None => {
                logging::log_error(pass, "No profile available, injecting query only");
                (String::new(), String::new())
            }
        };

        let content = compose(&body, &query, &self.config);
        handle.write(&content);

        let element = handle.element();
        for event in &platform.notify_events {
            element.dispatch_event(event);
        }
        element.focus();

        logging::log_injection(pass, &format!("Injected {} profile", name));
        content
    }

    // ============ Session Loop ============

    /// Serve triggers until teardown or until every sender is gone.
    /// Passes never overlap; triggers queued while one runs collapse into a
    /// single follow-up pass. Returns the number of passes run.
    pub async fn run(&mut self, mut triggers: UnboundedReceiver<Trigger>, store: &impl KeyValueStore) -> usize {
        let mut passes = 0;

        while let Some(trigger) = triggers.recv().await {
            if trigger == Trigger::Teardown {
                break;
            }
            if trigger == Trigger::Mutation {
                self.sleeper.sleep(self.config.mutation_debounce()).await;
            }

            let mut teardown = false;
            while let Ok(queued) = triggers.try_recv() {
                if queued == Trigger::Teardown {
                    teardown = true;
                    break;
                }
            }

            self.run_pass().await;
            passes += 1;

            if teardown {
                break;
            }
        }

        self.teardown(store);
        passes
    }

    /// Best-effort save of profiles and the active id
    pub fn teardown(&self, store: &impl KeyValueStore) {
        if let Err(e) = self.state.profiles.save_to(store) {
            logging::log_error(None, &format!("Failed to save profiles: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::dom::fake::{FakeDocument, FakeElement, FakeNode};
    use crate::profiles::{Profile, BUSINESS, CURRENT_PROFILE_KEY, LEARNING, TECHNICAL};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::sync::mpsc::{self, UnboundedSender};

    const EDITABLE: &str = r#"div[contenteditable="true"]"#;

    type Hook = Box<dyn Fn(usize)>;

    /// Records every wait and returns at once; `hook` sees the wait index
    #[derive(Default)]
    struct RecordingSleeper {
        waits: Rc<RefCell<Vec<Duration>>>,
        hook: Option<Hook>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
            let index = {
                let mut waits = self.waits.borrow_mut();
                waits.push(duration);
                waits.len() - 1
            };
            if let Some(hook) = &self.hook {
                hook(index);
            }
            std::future::ready(())
        }
    }

    fn short_profiles() -> ProfileStore {
        ProfileStore::with_profiles(vec![
            Profile::new(LEARNING, "Learning Mode", "B", &[]),
            Profile::new(BUSINESS, "Business Strategy", "BIZ", &[]),
            Profile::new(TECHNICAL, "Technical Development", "TECH", &[]),
        ])
    }

    fn injector(doc: &FakeDocument, sleeper: RecordingSleeper) -> Injector<FakeDocument, RecordingSleeper> {
        Injector::new(doc.clone(), sleeper, PlatformRegistry::builtin(), short_profiles(), EngineConfig::default())
    }

    fn claude_page(body: &str) -> (FakeDocument, FakeElement) {
        let doc = FakeDocument::new("https://claude.ai/new", body);
        let input = doc.add(EDITABLE, FakeNode::editable());
        (doc, input)
    }

    #[test]
    fn test_compose_and_strip() {
        let config = EngineConfig::default();
        let profiles = short_profiles();

        assert_eq!(compose("B", "", &config), "B");
        assert_eq!(compose("B", "  ", &config), "B");
        assert_eq!(compose("B", "X", &config), "B\n\nQuery: X");

        assert_eq!(strip_prior_injection("BIZ\n\nQuery: X", &profiles, &config), "X");
        assert_eq!(strip_prior_injection("B", &profiles, &config), "");
        // Typed text that merely starts like a body is kept
        assert_eq!(strip_prior_injection("Because", &profiles, &config), "Because");
        assert_eq!(strip_prior_injection("hello", &profiles, &config), "hello");
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let doc = FakeDocument::new("https://example.com", "");
        let sleeper = RecordingSleeper::default();
        let waits = sleeper.waits.clone();
        let mut engine = injector(&doc, sleeper);

        assert_eq!(engine.run_pass().await, PassOutcome::Unsupported);
        assert!(waits.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_empty_field_gets_body_only() {
        let (doc, input) = claude_page("Good day");
        let mut engine = injector(&doc, RecordingSleeper::default());

        let outcome = engine.run_pass().await;
        assert_eq!(
            outcome,
            PassOutcome::Injected {
                platform: "claude.ai".to_string(),
                profile_id: LEARNING.to_string(),
                content: "B".to_string(),
            }
        );

        let node = input.node();
        assert_eq!(node.text, "B");
        assert_eq!(node.events, vec!["input", "change", "focus"]);
        assert!(node.focused);
    }

    #[tokio::test]
    async fn test_existing_content_becomes_query() {
        let (doc, input) = claude_page("Good day");
        input.0.borrow_mut().text = "X".to_string();
        let mut engine = injector(&doc, RecordingSleeper::default());

        engine.run_pass().await;
        assert_eq!(input.node().text, "B\n\nQuery: X");
    }

    #[tokio::test]
    async fn test_value_bearing_input() {
        let doc = FakeDocument::new("https://chat.openai.com/", "");
        let input = doc.add("#prompt-textarea", FakeNode::textarea());
        input.0.borrow_mut().value = "why?".to_string();
        let mut engine = injector(&doc, RecordingSleeper::default());

        engine.run_pass().await;
        let node = input.node();
        assert_eq!(node.value, "B\n\nQuery: why?");
        assert_eq!(node.text, "");
        assert_eq!(node.events, vec!["input", "change", "keyup"]);
    }

    #[tokio::test]
    async fn test_tags_switch_profile_and_rewrite_query() {
        let (doc, input) = claude_page("Good day");
        input.0.borrow_mut().text = "#biz plan Q3".to_string();
        let mut engine = injector(&doc, RecordingSleeper::default());

        engine.run_pass().await;
        assert_eq!(input.node().text, "BIZ\n\nQuery: plan Q3");
        assert_eq!(engine.state().profiles.active_id(), BUSINESS);
    }

    #[tokio::test]
    async fn test_tag_only_input_gets_body_only() {
        let (doc, input) = claude_page("Good day");
        input.0.borrow_mut().text = "#tech".to_string();
        let mut engine = injector(&doc, RecordingSleeper::default());

        engine.run_pass().await;
        assert_eq!(input.node().text, "TECH");
    }

    #[tokio::test]
    async fn test_selector_seeds_once() {
        let (doc, input) = claude_page("Market update and strategy");
        let mut engine = injector(&doc, RecordingSleeper::default());

        engine.run_pass().await;
        assert_eq!(engine.state().profiles.active_id(), BUSINESS);
        assert_eq!(input.node().text, "BIZ");

        input.0.borrow_mut().text = "#learning hi".to_string();
        engine.run_pass().await;
        assert_eq!(input.node().text, "B\n\nQuery: hi");

        // Pinned: the business-heavy page does not win it back
        engine.run_pass().await;
        assert_eq!(engine.state().profiles.active_id(), LEARNING);
        assert_eq!(input.node().text, "B\n\nQuery: hi");
    }

    #[tokio::test]
    async fn test_rerun_reinjects_same_text() {
        let (doc, input) = claude_page("Good day");
        input.0.borrow_mut().text = "X".to_string();
        let sleeper = RecordingSleeper::default();
        let waits = sleeper.waits.clone();
        let mut engine = injector(&doc, sleeper);

        let first = engine.run_pass().await;
        let events_after_first = input.node().events.len();
        let second = engine.run_pass().await;

        assert_eq!(first, second);
        assert_eq!(input.node().text, "B\n\nQuery: X");
        // Not a no-op: the second pass searched and fired events again
        assert_eq!(input.node().events.len(), events_after_first * 2);
        assert_eq!(waits.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let doc = FakeDocument::new("https://claude.ai/new", "");
        doc.add(EDITABLE, FakeNode::editable().hidden());
        let sleeper = RecordingSleeper::default();
        let waits = sleeper.waits.clone();
        let mut engine = injector(&doc, sleeper);

        let outcome = engine.run_pass().await;
        let PassOutcome::Exhausted { platform, diagnostics } = outcome else {
            panic!("expected exhaustion, got {:?}", outcome);
        };
        assert_eq!(platform, "claude.ai");
        assert_eq!(diagnostics.len(), 4);
        assert_eq!(diagnostics[0].matches.len(), 1);
        assert!(!diagnostics[0].matches[0].visible);
        assert_eq!(engine.state().attempt_count, 8);

        let waits = waits.borrow();
        assert_eq!(waits.len(), 8);
        assert_eq!(waits[0], Duration::from_millis(2000));
        assert!(waits[1..].iter().all(|d| *d == Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_input_appears_during_retries() {
        let doc = FakeDocument::new("https://chat.deepseek.com/", "");
        let late = doc.clone();
        let sleeper = RecordingSleeper {
            hook: Some(Box::new(move |index| {
                if index == 3 {
                    late.add(r#"textarea[class*="input"]"#, FakeNode::textarea());
                }
            })),
            ..RecordingSleeper::default()
        };
        let mut engine = injector(&doc, sleeper);

        let outcome = engine.run_pass().await;
        assert!(matches!(outcome, PassOutcome::Injected { .. }));
        assert_eq!(engine.state().attempt_count, 3);
    }

    #[tokio::test]
    async fn test_attempt_count_resets_each_pass() {
        let doc = FakeDocument::new("https://claude.ai/new", "");
        let mut engine = injector(&doc, RecordingSleeper::default());
        engine.run_pass().await;
        assert_eq!(engine.state().attempt_count, 8);

        doc.add(EDITABLE, FakeNode::editable());
        engine.run_pass().await;
        assert_eq!(engine.state().attempt_count, 0);
    }

    #[tokio::test]
    async fn test_run_debounces_mutations_and_saves_on_teardown() {
        let (doc, input) = claude_page("Good day");
        input.0.borrow_mut().text = "#tech hi".to_string();
        let sleeper = RecordingSleeper::default();
        let waits = sleeper.waits.clone();
        let mut engine = injector(&doc, sleeper);
        let store = Database::open_in_memory().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Trigger::Mutation).unwrap();
        tx.send(Trigger::Teardown).unwrap();

        let passes = engine.run(rx, &store).await;
        assert_eq!(passes, 1);
        assert_eq!(waits.borrow()[0], Duration::from_millis(1000));
        assert_eq!(waits.borrow()[1], Duration::from_millis(2000));
        assert_eq!(store.get(CURRENT_PROFILE_KEY).unwrap().as_deref(), Some(TECHNICAL));
    }

    #[tokio::test]
    async fn test_triggers_during_pass_coalesce() {
        let (doc, _input) = claude_page("Good day");
        let (tx, rx) = mpsc::unbounded_channel();
        let sender: Rc<RefCell<Option<UnboundedSender<Trigger>>>> = Rc::new(RefCell::new(Some(tx.clone())));
        let hook_sender = sender.clone();
        let sleeper = RecordingSleeper {
            // Settle wait of the first pass: the page mutates three times
            hook: Some(Box::new(move |index| {
                if index == 0 {
                    if let Some(tx) = hook_sender.borrow_mut().take() {
                        for _ in 0..3 {
                            tx.send(Trigger::Mutation).unwrap();
                        }
                    }
                }
            })),
            ..RecordingSleeper::default()
        };
        let waits = sleeper.waits.clone();
        let mut engine = injector(&doc, sleeper);
        let store = Database::open_in_memory().unwrap();

        tx.send(Trigger::PageReady).unwrap();
        drop(tx);

        let passes = engine.run(rx, &store).await;
        assert_eq!(passes, 2);
        // settle, debounce, settle
        assert_eq!(waits.borrow().len(), 3);
        assert!(store.get(CURRENT_PROFILE_KEY).unwrap().is_some());
        assert!(sender.borrow().is_none());
    }
}
