//! Navigation system for Aurora Compass
//!
//! This module provides a type-safe navigation core with:
//! - Route definitions with string identifiers for deep linking
//! - A route catalog deciding which screens show global chrome
//! - A single back-stack controller with tab-switch semantics
//!
//! Route identifiers look like `chat/alice.bsky.social`: the segment before
//! the first `/` is the route base, the rest are URL-encoded parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::watch;

// =============================================================================
// Errors
// =============================================================================

/// Navigation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The route base is not in the catalog
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// The route base is known but its parameters are wrong
    #[error("Malformed route {route}: {reason}")]
    MalformedRoute {
        /// Route identifier as given
        route: String,
        /// What was wrong with it
        reason: String,
    },

    /// A navigation state violates the stack invariants
    #[error("Invalid navigation state: {0}")]
    InvalidState(String),
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavigationError>;

// =============================================================================
// Route Bases
// =============================================================================

/// Parameter-free kind of a route, as named by the first identifier segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteBase {
    /// Home timeline
    Home,
    /// Search / explore
    Search,
    /// Saved feeds list
    Feeds,
    /// Notifications
    Notifications,
    /// Chat list
    Messages,
    /// Signed-in user's own profile
    MyProfile,
    /// Another user's profile
    Profile,
    /// Followers of a user
    Followers,
    /// Accounts a user follows
    Follows,
    /// Post thread
    PostThread,
    /// Hashtag feed
    Hashtag,
    /// Custom feed
    Feed,
    /// One-to-one conversation
    Chat,
    /// Settings
    Settings,
    /// Appearance settings (theme picker)
    AppearanceSettings,
    /// Post composer
    Composer,
    /// Sign in
    Login,
}

impl RouteBase {
    /// Every route base, in catalog order
    pub const ALL: [RouteBase; 17] = [
        RouteBase::Home,
        RouteBase::Search,
        RouteBase::Feeds,
        RouteBase::Notifications,
        RouteBase::Messages,
        RouteBase::MyProfile,
        RouteBase::Profile,
        RouteBase::Followers,
        RouteBase::Follows,
        RouteBase::PostThread,
        RouteBase::Hashtag,
        RouteBase::Feed,
        RouteBase::Chat,
        RouteBase::Settings,
        RouteBase::AppearanceSettings,
        RouteBase::Composer,
        RouteBase::Login,
    ];

    /// First identifier segment for this base
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteBase::Home => "home",
            RouteBase::Search => "search",
            RouteBase::Feeds => "feeds",
            RouteBase::Notifications => "notifications",
            RouteBase::Messages => "messages",
            RouteBase::MyProfile => "me",
            RouteBase::Profile => "profile",
            RouteBase::Followers => "followers",
            RouteBase::Follows => "follows",
            RouteBase::PostThread => "post",
            RouteBase::Hashtag => "hashtag",
            RouteBase::Feed => "feed",
            RouteBase::Chat => "chat",
            RouteBase::Settings => "settings",
            RouteBase::AppearanceSettings => "appearance",
            RouteBase::Composer => "compose",
            RouteBase::Login => "login",
        }
    }

    /// Look a base up by its identifier segment
    pub fn from_name(name: &str) -> Option<RouteBase> {
        RouteBase::ALL.into_iter().find(|base| base.as_str() == name)
    }

    /// Minimum and maximum number of parameters
    fn arity(&self) -> (usize, usize) {
        match self {
            RouteBase::Profile
            | RouteBase::Followers
            | RouteBase::Follows
            | RouteBase::Hashtag
            | RouteBase::Chat => (1, 1),
            RouteBase::PostThread | RouteBase::Feed => (2, 2),
            RouteBase::Search | RouteBase::Composer => (0, 1),
            _ => (0, 0),
        }
    }
}

impl fmt::Display for RouteBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Route Definitions
// =============================================================================

/// All screens the navigation core can show
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "route", content = "params")]
pub enum Route {
    // Main screens
    /// Home timeline
    #[default]
    Home,
    /// Search, optionally pre-filled
    Search {
        /// Search query
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    /// Saved feeds list
    Feeds,
    /// Notifications
    Notifications,
    /// Chat list
    Messages,
    /// Signed-in user's own profile
    MyProfile,

    // Detail screens
    /// Another user's profile
    Profile {
        /// Handle or DID
        handle: String,
    },
    /// Followers of a user
    Followers {
        /// Handle or DID
        handle: String,
    },
    /// Accounts a user follows
    Follows {
        /// Handle or DID
        handle: String,
    },
    /// Post thread
    PostThread {
        /// Author handle or DID
        author: String,
        /// Record key
        rkey: String,
    },
    /// Hashtag feed
    Hashtag {
        /// Tag without `#`
        tag: String,
    },
    /// Custom feed
    Feed {
        /// Creator handle or DID
        creator: String,
        /// Record key
        rkey: String,
    },
    /// One-to-one conversation
    Chat {
        /// Peer handle or DID
        peer: String,
    },
    /// Settings
    Settings,
    /// Appearance settings
    AppearanceSettings,
    /// Post composer
    Composer {
        /// URI of the post being replied to
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },
    /// Sign in
    Login,
}

impl Route {
    /// Base of this route
    pub fn base(&self) -> RouteBase {
        match self {
            Route::Home => RouteBase::Home,
            Route::Search { .. } => RouteBase::Search,
            Route::Feeds => RouteBase::Feeds,
            Route::Notifications => RouteBase::Notifications,
            Route::Messages => RouteBase::Messages,
            Route::MyProfile => RouteBase::MyProfile,
            Route::Profile { .. } => RouteBase::Profile,
            Route::Followers { .. } => RouteBase::Followers,
            Route::Follows { .. } => RouteBase::Follows,
            Route::PostThread { .. } => RouteBase::PostThread,
            Route::Hashtag { .. } => RouteBase::Hashtag,
            Route::Feed { .. } => RouteBase::Feed,
            Route::Chat { .. } => RouteBase::Chat,
            Route::Settings => RouteBase::Settings,
            Route::AppearanceSettings => RouteBase::AppearanceSettings,
            Route::Composer { .. } => RouteBase::Composer,
            Route::Login => RouteBase::Login,
        }
    }

    /// Parameters in identifier order
    ///
    /// An empty optional parameter is the same as an absent one.
    fn params(&self) -> Vec<&str> {
        match self {
            Route::Search { query } => {
                query.as_deref().filter(|q| !q.is_empty()).into_iter().collect()
            }
            Route::Composer { reply_to } => {
                reply_to.as_deref().filter(|r| !r.is_empty()).into_iter().collect()
            }
            Route::Profile { handle } | Route::Followers { handle } | Route::Follows { handle } => {
                vec![handle.as_str()]
            }
            Route::PostThread { author, rkey } => vec![author.as_str(), rkey.as_str()],
            Route::Hashtag { tag } => vec![tag.as_str()],
            Route::Feed { creator, rkey } => vec![creator.as_str(), rkey.as_str()],
            Route::Chat { peer } => vec![peer.as_str()],
            _ => Vec::new(),
        }
    }

    /// String identifier, e.g. `post/alice.bsky.social/3k2yihx`
    pub fn id(&self) -> String {
        let mut id = self.base().as_str().to_string();
        for param in self.params() {
            id.push('/');
            id.push_str(&urlencoding::encode(param));
        }
        id
    }

    /// URL path for deep links (`/` for home)
    pub fn to_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            _ => format!("/{}", self.id()),
        }
    }

    /// Display title for headers
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Search { .. } => "Search",
            Route::Feeds => "Feeds",
            Route::Notifications => "Notifications",
            Route::Messages => "Chats",
            Route::MyProfile | Route::Profile { .. } => "Profile",
            Route::Followers { .. } => "Followers",
            Route::Follows { .. } => "Following",
            Route::PostThread { .. } => "Post",
            Route::Hashtag { .. } => "Hashtag",
            Route::Feed { .. } => "Feed",
            Route::Chat { .. } => "Chat",
            Route::Settings => "Settings",
            Route::AppearanceSettings => "Appearance",
            Route::Composer { .. } => "New Post",
            Route::Login => "Sign in",
        }
    }

    /// Parse an identifier or deep-link path
    ///
    /// Accepts `chat/alice`, `/chat/alice`, and `/` or an empty string for home.
    pub fn parse(input: &str) -> Result<Route> {
        let trimmed = input.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Route::Home);
        }

        let mut segments = trimmed.split('/');
        let name = segments.next().unwrap_or_default();
        let base = RouteBase::from_name(name)
            .ok_or_else(|| NavigationError::UnknownRoute(input.to_string()))?;

        let malformed = |reason: String| NavigationError::MalformedRoute {
            route: input.to_string(),
            reason,
        };

        let mut params = Vec::new();
        for raw in segments {
            if raw.is_empty() {
                return Err(malformed("empty parameter".to_string()));
            }
            let decoded = urlencoding::decode(raw)
                .map_err(|e| malformed(format!("invalid encoding: {}", e)))?;
            params.push(decoded.into_owned());
        }

        let (min, max) = base.arity();
        if params.len() < min || params.len() > max {
            return Err(malformed(format!(
                "expected {} parameter(s), found {}",
                if min == max { min.to_string() } else { format!("{}-{}", min, max) },
                params.len()
            )));
        }

        let mut params = params.into_iter();
        let mut next = || params.next().unwrap_or_default();
        Ok(match base {
            RouteBase::Home => Route::Home,
            RouteBase::Search => Route::Search { query: Some(next()).filter(|q| !q.is_empty()) },
            RouteBase::Feeds => Route::Feeds,
            RouteBase::Notifications => Route::Notifications,
            RouteBase::Messages => Route::Messages,
            RouteBase::MyProfile => Route::MyProfile,
            RouteBase::Profile => Route::Profile { handle: next() },
            RouteBase::Followers => Route::Followers { handle: next() },
            RouteBase::Follows => Route::Follows { handle: next() },
            RouteBase::PostThread => Route::PostThread { author: next(), rkey: next() },
            RouteBase::Hashtag => Route::Hashtag { tag: next() },
            RouteBase::Feed => Route::Feed { creator: next(), rkey: next() },
            RouteBase::Chat => Route::Chat { peer: next() },
            RouteBase::Settings => Route::Settings,
            RouteBase::AppearanceSettings => Route::AppearanceSettings,
            RouteBase::Composer => Route::Composer { reply_to: Some(next()).filter(|r| !r.is_empty()) },
            RouteBase::Login => Route::Login,
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Route {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self> {
        Route::parse(s)
    }
}

// =============================================================================
// Route Catalog
// =============================================================================

/// Whether a screen shows global chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Tab-level screen, global chrome visible
    Main,
    /// Drill-down screen, global chrome hidden
    Detail,
}

/// Static classification of route bases into main and detail sets
///
/// Every base not in the main set is a detail route, so the two sets are
/// disjoint and cover every route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCatalog {
    main: BTreeSet<RouteBase>,
}

impl Default for RouteCatalog {
    fn default() -> Self {
        Self::new([
            RouteBase::Home,
            RouteBase::Search,
            RouteBase::Feeds,
            RouteBase::Notifications,
            RouteBase::Messages,
            RouteBase::MyProfile,
        ])
    }
}

impl RouteCatalog {
    /// Create a catalog with the given main bases
    pub fn new(main: impl IntoIterator<Item = RouteBase>) -> Self {
        Self { main: main.into_iter().collect() }
    }

    /// Kind of a route base
    pub fn kind(&self, base: RouteBase) -> RouteKind {
        if self.main.contains(&base) {
            RouteKind::Main
        } else {
            RouteKind::Detail
        }
    }

    /// Whether a typed route shows global chrome
    pub fn is_main(&self, route: &Route) -> bool {
        self.kind(route.base()) == RouteKind::Main
    }

    /// Classify a route identifier by its base (the part before the first `/`)
    pub fn classify(&self, route_id: &str) -> Result<RouteKind> {
        let trimmed = route_id.trim().trim_start_matches('/');
        let name = trimmed.split('/').next().unwrap_or_default();
        if name.is_empty() {
            return Ok(self.kind(RouteBase::Home));
        }
        RouteBase::from_name(name)
            .map(|base| self.kind(base))
            .ok_or_else(|| NavigationError::UnknownRoute(route_id.to_string()))
    }

    /// Whether a route identifier names a main route
    ///
    /// Unknown identifiers are logged and treated as detail routes, so
    /// chrome is hidden rather than shown for a screen that cannot exist.
    pub fn is_main_route(&self, route_id: &str) -> bool {
        match self.classify(route_id) {
            Ok(kind) => kind == RouteKind::Main,
            Err(error) => {
                tracing::warn!(%error, "chrome lookup for unknown route");
                false
            }
        }
    }

    /// Main route bases
    pub fn main_bases(&self) -> impl Iterator<Item = RouteBase> + '_ {
        self.main.iter().copied()
    }

    /// Detail route bases
    pub fn detail_bases(&self) -> impl Iterator<Item = RouteBase> + '_ {
        RouteBase::ALL.into_iter().filter(|base| !self.main.contains(base))
    }
}

// =============================================================================
// Navigation State
// =============================================================================

/// A back-stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this entry, stable while it stays on the stack
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self { route, key: uuid::Uuid::new_v4().to_string() }
    }
}

/// How the last state change happened, for transition animations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Initial or restored state
    #[default]
    None,
    /// A route was pushed
    Push,
    /// The top route was popped
    Pop,
    /// The stack was reset (tab switch)
    Reset,
}

/// Complete navigation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Route on top of the stack
    pub current_route: Route,
    /// Back-stack, bottom (home) to top (current)
    pub stack: Vec<StackEntry>,
    /// How the last change happened
    #[serde(default)]
    pub last_transition: Transition,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current_route: Route::Home,
            stack: vec![StackEntry::new(Route::Home)],
            last_transition: Transition::None,
        }
    }
}

impl NavigationState {
    /// Check the stack invariants
    pub fn validate(&self) -> Result<()> {
        let top = self
            .stack
            .last()
            .ok_or_else(|| NavigationError::InvalidState("empty stack".to_string()))?;
        if self.stack[0].route != Route::Home {
            return Err(NavigationError::InvalidState(format!(
                "stack root is {}, expected home",
                self.stack[0].route
            )));
        }
        if top.route != self.current_route {
            return Err(NavigationError::InvalidState(format!(
                "current route {} is not on top of the stack ({})",
                self.current_route, top.route
            )));
        }
        Ok(())
    }

    /// Routes on the stack, bottom to top
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.stack.iter().map(|entry| &entry.route)
    }
}

// =============================================================================
// Navigation Controller
// =============================================================================

/// Owner of the current route and back-stack
///
/// Every change is published to subscribers before the mutating call returns.
pub struct NavigationController {
    state: NavigationState,
    catalog: RouteCatalog,
    state_tx: watch::Sender<NavigationState>,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    /// Create a controller on home with the default catalog
    pub fn new() -> Self {
        Self::with_catalog(RouteCatalog::default())
    }

    /// Create a controller on home with a custom catalog
    pub fn with_catalog(catalog: RouteCatalog) -> Self {
        let state = NavigationState::default();
        let (state_tx, _) = watch::channel(state.clone());
        Self { state, catalog, state_tx }
    }

    /// Go to `route`
    ///
    /// Without `clear_stack`, pushes `route` unless it is already current.
    /// With `clear_stack`, the stack becomes `[Home, route]` (or `[Home]`
    /// for home). Returns whether the state changed.
    pub fn navigate(&mut self, route: Route, clear_stack: bool) -> bool {
        if clear_stack {
            let target_depth = if route == Route::Home { 1 } else { 2 };
            if self.state.current_route == route && self.state.stack.len() == target_depth {
                return false;
            }
            // The root entry is always home; keep it so its key stays stable.
            self.state.stack.truncate(1);
            if route != Route::Home {
                self.state.stack.push(StackEntry::new(route.clone()));
            }
            self.state.last_transition = Transition::Reset;
        } else {
            if self.state.current_route == route {
                return false;
            }
            self.state.stack.push(StackEntry::new(route.clone()));
            self.state.last_transition = Transition::Push;
        }

        tracing::debug!(
            route = %route,
            clear_stack,
            depth = self.state.stack.len(),
            "navigate"
        );
        self.state.current_route = route;
        self.publish();
        true
    }

    /// Switch to a main screen, discarding detail history
    pub fn navigate_to_main(&mut self, route: Route) -> bool {
        self.navigate(route, true)
    }

    /// Go to a route given by identifier, rejecting unknown or malformed ones
    pub fn navigate_path(&mut self, route_id: &str, clear_stack: bool) -> Result<bool> {
        match Route::parse(route_id) {
            Ok(route) => Ok(self.navigate(route, clear_stack)),
            Err(error) => {
                tracing::warn!(%error, "rejected navigation");
                Err(error)
            }
        }
    }

    /// Pop the top route
    ///
    /// Returns `false` at the root; the host decides what that means
    /// (usually leaving the app).
    pub fn go_back(&mut self) -> bool {
        if self.state.stack.len() <= 1 {
            return false;
        }
        self.state.stack.pop();
        self.state.current_route = self
            .state
            .stack
            .last()
            .map(|entry| entry.route.clone())
            .unwrap_or_default();
        self.state.last_transition = Transition::Pop;

        tracing::debug!(route = %self.state.current_route, depth = self.state.stack.len(), "go back");
        self.publish();
        true
    }

    /// Whether `go_back` would do anything
    pub fn can_go_back(&self) -> bool {
        self.state.stack.len() > 1
    }

    /// Current route
    pub fn current_route(&self) -> &Route {
        &self.state.current_route
    }

    /// Back-stack entries, bottom to top
    pub fn stack(&self) -> &[StackEntry] {
        &self.state.stack
    }

    /// Stack depth
    pub fn depth(&self) -> usize {
        self.state.stack.len()
    }

    /// Whether the current screen shows global chrome
    pub fn shows_chrome(&self) -> bool {
        self.catalog.is_main(&self.state.current_route)
    }

    /// Route catalog
    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    /// Current state
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state_tx.subscribe()
    }

    /// Copy of the state, for persisting across launches
    pub fn snapshot(&self) -> NavigationState {
        self.state.clone()
    }

    /// Install a previously saved state after checking its invariants
    pub fn restore(&mut self, mut state: NavigationState) -> Result<()> {
        state.validate()?;
        state.last_transition = Transition::None;
        self.state = state;
        self.publish();
        Ok(())
    }

    /// Back to a fresh stack on home
    pub fn reset(&mut self) {
        self.state = NavigationState::default();
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

// =============================================================================
// Tests
// =============================================================================
