//! User interface core for Aurora Compass
//!
//! This crate holds the UI-facing state that does not depend on a rendering
//! toolkit: where the user is, and what the app looks like.
//!
//! # Modules
//!
//! - [`navigation`] - Typed routes, the route catalog, and the back-stack controller
//! - [`theme`] - Theme presets, custom themes, and the persisted theme store
//!
//! # Example
//!
//! ```rust
//! use app_ui::navigation::{NavigationController, Route};
//!
//! let mut nav = NavigationController::new();
//! nav.navigate(Route::Chat { peer: "alice.bsky.social".to_string() }, false);
//! assert!(!nav.shows_chrome());
//!
//! nav.navigate_to_main(Route::Notifications);
//! assert!(nav.shows_chrome());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;
pub mod theme;

// Re-export commonly used types
pub use navigation::{
    NavigationController, NavigationError, NavigationState, Route, RouteBase, RouteCatalog,
    RouteKind, StackEntry, Transition,
};

pub use theme::{
    parse_hex_color, rgb_to_hex, CustomTheme, ThemeChoice, ThemeError, ThemeName, ThemePalette,
    ThemeStore,
};
