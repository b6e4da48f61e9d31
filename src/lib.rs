//! Aurora Compass client core
//!
//! Toolkit-independent state for the client: navigation, paged lists, and
//! persisted theme settings. [`ClientCore`] wires the pieces together for a
//! host application; each piece can also be used on its own through the
//! re-exported crates.

#![warn(missing_docs)]

use std::sync::Arc;

pub use app_state;
pub use app_ui;
pub use storage;

pub use app_state::{
    LoadError, LoadOutcome, PageLoader, PagedListController, PaginationConfig, PendingWrite,
};
pub use app_ui::{NavigationController, NavigationError, Route, RouteCatalog, ThemeChoice, ThemeStore};
pub use storage::{KvConfig, KvError, KvSettingsStorage, KvStore, SettingsStorage};

/// Install a `tracing` fmt subscriber
///
/// `RUST_LOG` takes precedence; `default_directive` (e.g. `"info"` or
/// `"app_state=debug"`) applies when it is unset or unparsable. Returns
/// `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}

/// Navigation, theme, and list configuration for one signed-in client
pub struct ClientCore {
    navigation: NavigationController,
    theme: ThemeStore,
    pagination: PaginationConfig,
}

impl Default for ClientCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCore {
    /// Create a core whose theme is not persisted
    pub fn new() -> Self {
        Self {
            navigation: NavigationController::new(),
            theme: ThemeStore::new(),
            pagination: PaginationConfig::default(),
        }
    }

    /// Create a core persisting its theme to `storage`
    ///
    /// Hydration runs in the background; await [`ready`](Self::ready) before
    /// the first render to avoid a flash of the default theme. Must be called
    /// from within a Tokio runtime.
    pub fn with_storage(storage: Arc<dyn SettingsStorage>) -> Self {
        Self {
            navigation: NavigationController::new(),
            theme: ThemeStore::spawn(storage),
            pagination: PaginationConfig::default(),
        }
    }

    /// Open the sled database at `config.path` and persist the theme in it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: KvConfig) -> Result<Self, KvError> {
        let kv = Arc::new(KvStore::new(config)?);
        tracing::info!("client core opened");
        Ok(Self::with_storage(Arc::new(KvSettingsStorage::new(kv))))
    }

    /// Use `config` for lists created by [`paged_list`](Self::paged_list)
    pub fn with_pagination(mut self, config: PaginationConfig) -> Self {
        self.pagination = config;
        self
    }

    /// Use a custom route catalog
    pub fn with_catalog(mut self, catalog: RouteCatalog) -> Self {
        self.navigation = NavigationController::with_catalog(catalog);
        self
    }

    /// Wait until persisted settings are loaded
    pub async fn ready(&self) {
        self.theme.ready().await
    }

    /// Navigation controller
    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    /// Mutable navigation controller
    pub fn navigation_mut(&mut self) -> &mut NavigationController {
        &mut self.navigation
    }

    /// Theme store (cheap to clone into screens)
    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    /// Create an empty paged list with the core's pagination settings
    pub fn paged_list<T: Send + 'static>(&self) -> PagedListController<T> {
        PagedListController::new(self.pagination.clone())
    }
}
