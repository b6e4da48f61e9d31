//! Theme values and the persisted theme store for Aurora Compass
//!
//! Three presets are built in:
//! - Light: A bright theme with white background
//! - Dark: A dark theme with near-black background
//! - Dim: A dimmed dark theme with softer contrast
//!
//! Users may also author one [`CustomTheme`] on top of a preset. The active
//! choice and the custom theme are persisted under the `theme` namespace.
//!
//! # Usage
//!
//! ```rust
//! use app_ui::theme::{ThemeChoice, ThemeName, ThemeStore};
//!
//! let store = ThemeStore::new();
//! assert_eq!(store.current_theme(), ThemeChoice::Preset(ThemeName::Light));
//! ```

use app_state::settings::{Hydration, PendingWrite, SettingsConfig, SettingsStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use storage::SettingsStorage;
use thiserror::Error;
use tokio::sync::watch;

/// Storage namespace for theme settings
pub const THEME_NAMESPACE: &str = "theme";

/// Maximum length of a custom theme name, in characters
pub const MAX_THEME_NAME_LEN: usize = 32;

// =============================================================================
// Errors
// =============================================================================

/// Theme errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    /// Not a `#RRGGBB` color
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Custom theme name is empty or too long
    #[error("Invalid theme name: {0:?}")]
    InvalidName(String),

    /// No preset with this name
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
}

// =============================================================================
// Color Utilities
// =============================================================================

/// Parse a `#RRGGBB` (or `RRGGBB`) string to RGB components
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Convert RGB to hex string
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

fn normalize_color(color: &str) -> Result<String, ThemeError> {
    parse_hex_color(color)
        .map(|(r, g, b)| rgb_to_hex(r, g, b))
        .ok_or_else(|| ThemeError::InvalidColor(color.to_string()))
}

// =============================================================================
// Presets
// =============================================================================

/// Built-in theme presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    /// Light theme
    #[default]
    Light,
    /// Dark theme
    Dark,
    /// Dim theme (softer dark)
    Dim,
}

impl ThemeName {
    /// Every preset
    pub const ALL: [ThemeName; 3] = [ThemeName::Light, ThemeName::Dark, ThemeName::Dim];

    /// Platform color scheme (dim is still a dark scheme)
    pub fn color_scheme(&self) -> &'static str {
        match self {
            ThemeName::Light => "light",
            ThemeName::Dark | ThemeName::Dim => "dark",
        }
    }

    /// Check if this is a dark preset
    pub fn is_dark(&self) -> bool {
        matches!(self, ThemeName::Dark | ThemeName::Dim)
    }

    /// Semantic colors of this preset
    pub fn palette(&self) -> ThemePalette {
        let (background, background_light, text, text_light, primary, border) = match self {
            ThemeName::Light => ("#FFFFFF", "#F7F7F7", "#000000", "#3D3D3D", "#9D4EDD", "#E5E5E5"),
            ThemeName::Dark => ("#0A0F1A", "#111827", "#FFFFFF", "#96A5BC", "#B06BE8", "#243044"),
            ThemeName::Dim => ("#1A2332", "#212D3F", "#FFFFFF", "#99A9BA", "#AD68E5", "#344459"),
        };
        ThemePalette {
            background: background.to_string(),
            background_light: background_light.to_string(),
            text: text.to_string(),
            text_light: text_light.to_string(),
            primary: primary.to_string(),
            border: border.to_string(),
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeName::Light => write!(f, "Light"),
            ThemeName::Dark => write!(f, "Dark"),
            ThemeName::Dim => write!(f, "Dim"),
        }
    }
}

impl std::str::FromStr for ThemeName {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ThemeName::Light),
            "dark" => Ok(ThemeName::Dark),
            "dim" => Ok(ThemeName::Dim),
            _ => Err(ThemeError::UnknownTheme(s.to_string())),
        }
    }
}

/// Resolved semantic colors, as `#RRGGBB` strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePalette {
    /// Main background color
    pub background: String,
    /// Elevated surfaces
    pub background_light: String,
    /// Primary text color
    pub text: String,
    /// Secondary text color
    pub text_light: String,
    /// Accent for links and primary buttons
    pub primary: String,
    /// Border color
    pub border: String,
}

// =============================================================================
// Custom Themes
// =============================================================================

/// A user-authored theme layered over a preset
///
/// Deserializing validates and normalizes like [`CustomTheme::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomThemeFields")]
pub struct CustomTheme {
    /// Display name
    pub name: String,
    /// Preset supplying every color not overridden
    pub base: ThemeName,
    /// Accent color
    pub accent: String,
    /// Background override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Deserialize)]
struct CustomThemeFields {
    name: String,
    base: ThemeName,
    accent: String,
    #[serde(default)]
    background: Option<String>,
}

impl TryFrom<CustomThemeFields> for CustomTheme {
    type Error = ThemeError;

    fn try_from(fields: CustomThemeFields) -> Result<Self, Self::Error> {
        let theme = CustomTheme::new(fields.name, fields.base, &fields.accent)?;
        match fields.background {
            Some(background) => theme.with_background(&background),
            None => Ok(theme),
        }
    }
}

impl CustomTheme {
    /// Create a custom theme, normalizing the accent to `#RRGGBB`
    pub fn new(name: impl Into<String>, base: ThemeName, accent: &str) -> Result<Self, ThemeError> {
        let theme = Self {
            name: name.into().trim().to_string(),
            base,
            accent: normalize_color(accent)?,
            background: None,
        };
        theme.validate()?;
        Ok(theme)
    }

    /// Override the background color
    pub fn with_background(mut self, background: &str) -> Result<Self, ThemeError> {
        self.background = Some(normalize_color(background)?);
        Ok(self)
    }

    /// Check name and colors
    pub fn validate(&self) -> Result<(), ThemeError> {
        let len = self.name.chars().count();
        if len == 0 || len > MAX_THEME_NAME_LEN {
            return Err(ThemeError::InvalidName(self.name.clone()));
        }
        normalize_color(&self.accent)?;
        if let Some(background) = &self.background {
            normalize_color(background)?;
        }
        Ok(())
    }

    /// Base palette with this theme's overrides applied
    pub fn palette(&self) -> ThemePalette {
        let mut palette = self.base.palette();
        palette.primary = self.accent.clone();
        if let Some(background) = &self.background {
            palette.background = background.clone();
        }
        palette
    }
}

/// The active theme: a preset or the user's custom theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "theme", rename_all = "lowercase")]
pub enum ThemeChoice {
    /// Built-in preset
    Preset(ThemeName),
    /// User-authored theme
    Custom(CustomTheme),
}

impl Default for ThemeChoice {
    fn default() -> Self {
        ThemeChoice::Preset(ThemeName::default())
    }
}

impl From<ThemeName> for ThemeChoice {
    fn from(name: ThemeName) -> Self {
        ThemeChoice::Preset(name)
    }
}

impl From<CustomTheme> for ThemeChoice {
    fn from(theme: CustomTheme) -> Self {
        ThemeChoice::Custom(theme)
    }
}

impl ThemeChoice {
    /// Display name
    pub fn name(&self) -> String {
        match self {
            ThemeChoice::Preset(name) => name.to_string(),
            ThemeChoice::Custom(theme) => theme.name.clone(),
        }
    }

    /// Preset this choice is built on
    pub fn base(&self) -> ThemeName {
        match self {
            ThemeChoice::Preset(name) => *name,
            ThemeChoice::Custom(theme) => theme.base,
        }
    }

    /// Check if the choice renders dark
    pub fn is_dark(&self) -> bool {
        self.base().is_dark()
    }

    /// Resolved colors
    pub fn palette(&self) -> ThemePalette {
        match self {
            ThemeChoice::Preset(name) => name.palette(),
            ThemeChoice::Custom(theme) => theme.palette(),
        }
    }
}

// =============================================================================
// Theme Store
// =============================================================================

/// Persisted theme settings shared by every screen
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ThemeStore {
    settings: Arc<SettingsStore<ThemeChoice>>,
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeStore {
    /// Create an unbound store on the light preset
    pub fn new() -> Self {
        Self {
            settings: Arc::new(SettingsStore::with_config(
                ThemeChoice::default(),
                SettingsConfig::new(THEME_NAMESPACE),
            )),
        }
    }

    /// Create a store bound to `storage`, hydrating in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(storage: Arc<dyn SettingsStorage>) -> Self {
        Self {
            settings: SettingsStore::spawn(
                ThemeChoice::default(),
                storage,
                SettingsConfig::new(THEME_NAMESPACE),
            ),
        }
    }

    /// Bind (or re-bind) `storage` and restore persisted themes
    pub async fn initialize(&self, storage: Arc<dyn SettingsStorage>) -> Hydration {
        let hydration = self.settings.initialize(storage).await;
        tracing::debug!(theme = %self.current_theme().name(), ?hydration, "theme hydrated");
        hydration
    }

    /// Whether hydration has completed
    pub fn is_ready(&self) -> bool {
        self.settings.is_ready()
    }

    /// Wait until hydration has completed
    pub async fn ready(&self) {
        self.settings.ready().await
    }

    /// Active theme
    pub fn current_theme(&self) -> ThemeChoice {
        self.settings.current()
    }

    /// Colors of the active theme
    pub fn palette(&self) -> ThemePalette {
        self.current_theme().palette()
    }

    /// The user's custom theme, whether or not it is active
    pub fn custom_theme(&self) -> Option<CustomTheme> {
        match self.settings.custom()? {
            ThemeChoice::Custom(theme) => Some(theme),
            ThemeChoice::Preset(_) => None,
        }
    }

    /// Whether the user has saved a custom theme
    pub fn has_custom_theme(&self) -> bool {
        self.custom_theme().is_some()
    }

    /// Switch the active theme; the custom theme is kept
    pub fn set_theme(&self, theme: impl Into<ThemeChoice>) -> PendingWrite {
        let theme = theme.into();
        tracing::debug!(theme = %theme.name(), "set theme");
        self.settings.set(theme)
    }

    /// Save `theme` as the custom theme and activate it
    pub fn save_custom_theme(&self, theme: CustomTheme) -> Result<PendingWrite, ThemeError> {
        theme.validate()?;
        tracing::debug!(theme = %theme.name, base = %theme.base, "save custom theme");
        Ok(self.settings.save_custom(ThemeChoice::Custom(theme)))
    }

    /// Subscribe to active theme changes
    pub fn subscribe(&self) -> watch::Receiver<ThemeChoice> {
        self.settings.subscribe()
    }

    /// Underlying settings store
    pub fn settings(&self) -> &SettingsStore<ThemeChoice> {
        &self.settings
    }
}
