pub mod commands;
pub mod config;
pub mod db;
pub mod dom;
pub mod locator;
pub mod logging;
pub mod orchestrator;
pub mod platforms;
pub mod profiles;
pub mod selector;

use tokio::sync::mpsc::UnboundedReceiver;

pub use config::{EngineConfig, SessionOptions};
pub use db::{Database, KeyValueStore, StoreError};
pub use dom::{Document, Element, InputHandle};
pub use orchestrator::{Injector, PassOutcome, Sleeper, TokioSleeper, Trigger};
pub use platforms::{PlatformConfig, PlatformRegistry};
pub use profiles::{Profile, ProfileStore};

use profiles::PROFILES_KEY;

// ============ Session ============

/// One page lifetime: the engine plus the store it loads from and saves to
pub struct Session<D: Document, S: Sleeper = TokioSleeper> {
    pub injector: Injector<D, S>,
    pub store: Database,
}

impl<D: Document> Session<D, TokioSleeper> {
    /// Set up logging, open the store and restore saved profiles
    pub fn start(document: D, options: SessionOptions) -> Result<Self, StoreError> {
        Self::start_with(document, TokioSleeper, options)
    }
}

impl<D: Document, S: Sleeper> Session<D, S> {
    pub fn start_with(document: D, sleeper: S, options: SessionOptions) -> Result<Self, StoreError> {
        if let Some(log_dir) = &options.log_dir {
            if let Err(e) = logging::init_logging(log_dir) {
                tracing::warn!("Failed to initialize logging: {}", e);
            }
            // Clean up old log files (keep last 7 days)
            let _ = logging::cleanup_old_logs();
        }

        let store = match &options.database_path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };

        match store.updated_at(PROFILES_KEY) {
            Ok(Some(saved_at)) => logging::log_storage(&format!("Saved profiles last written at {}", saved_at)),
            Ok(None) => logging::log_storage("No saved profiles, using built-ins"),
            Err(e) => logging::log_error(None, &format!("Failed to read profile timestamp: {}", e)),
        }

        let mut profiles = ProfileStore::default();
        profiles.load_from(&store);

        let registry = PlatformRegistry::builtin();
        logging::log_injection(
            None,
            &format!(
                "Session started, active profile: {}, platforms: {}",
                profiles.active_id(),
                registry.ids().collect::<Vec<_>>().join(", ")
            ),
        );

        let injector = Injector::new(document, sleeper, registry, profiles, options.engine);

        Ok(Self { injector, store })
    }

    /// Serve page triggers until teardown; returns the number of passes run
    pub async fn run(&mut self, triggers: UnboundedReceiver<Trigger>) -> usize {
        self.injector.run(triggers, &self.store).await
    }
}
