//! Application state management for Aurora Compass
//!
//! This crate provides the stateful controllers screens share: incremental
//! paged-list loading and persisted, reactive client settings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pagination;
pub mod settings;

pub use pagination::{
    ExhaustionPolicy, LoadError, LoadOutcome, PageLoader, PagedListController, PaginationConfig,
    PaginationState, PaginationStatus, SkipReason,
};
pub use settings::{
    Hydration, PendingWrite, SettingValue, SettingsConfig, SettingsError, SettingsState,
    SettingsStore,
};
