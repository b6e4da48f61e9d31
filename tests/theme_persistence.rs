//! Theme persistence integration tests
//!
//! The theme store against real backends: sled, the JSON settings file, and
//! a storage shared between two stores.

use aurora_client_core::app_ui::theme::{CustomTheme, ThemeName};
use aurora_client_core::storage::{FileSettingsStorage, MemorySettingsStorage};
use aurora_client_core::{ClientCore, KvConfig, KvSettingsStorage, KvStore, ThemeChoice, ThemeStore};
use std::sync::Arc;
use tempfile::TempDir;

fn dusk() -> CustomTheme {
    CustomTheme::new("Dusk", ThemeName::Dim, "#FFB703").unwrap()
}

/// A fresh install reads the default theme without any storage
#[test]
fn test_fresh_install_defaults() {
    let core = ClientCore::new();
    assert_eq!(core.theme().current_theme(), ThemeChoice::Preset(ThemeName::Light));
    assert!(!core.theme().has_custom_theme());
}

/// A core without storage is ready immediately, so hosts awaiting it render
#[tokio::test]
async fn test_unpersisted_core_is_ready() {
    let core = ClientCore::new();
    tokio::time::timeout(std::time::Duration::from_secs(1), core.ready())
        .await
        .expect("core without storage should be ready");
    assert!(core.theme().is_ready());
}

/// Theme choices survive an app restart with the file backend
#[tokio::test]
async fn test_file_backend_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");

    // First launch: author a custom theme, then switch back to a preset
    {
        let store = ThemeStore::new();
        store.initialize(Arc::new(FileSettingsStorage::new(&path))).await;
        store.save_custom_theme(dusk()).unwrap().wait().await.unwrap();
        store.set_theme(ThemeName::Dark).wait().await.unwrap();
    }

    // Second launch
    let store = ThemeStore::spawn(Arc::new(FileSettingsStorage::new(&path)));
    store.ready().await;
    assert_eq!(store.current_theme(), ThemeChoice::Preset(ThemeName::Dark));
    assert_eq!(store.custom_theme(), Some(dusk()));
}

/// Theme choices land in sled under the settings scope
#[tokio::test]
async fn test_sled_backend_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config = KvConfig::new(temp_dir.path().join("kv").to_string_lossy().to_string());
    let kv = Arc::new(KvStore::new(config).unwrap());

    let store = ThemeStore::new();
    store.initialize(Arc::new(KvSettingsStorage::new(Arc::clone(&kv)))).await;
    store.save_custom_theme(dusk()).unwrap().wait().await.unwrap();

    assert!(kv.get_raw("settings:theme:custom").unwrap().is_some());
    assert!(kv.get_raw("settings:theme:current").unwrap().is_some());

    let second = ThemeStore::new();
    let hydration = second.initialize(Arc::new(KvSettingsStorage::new(kv))).await;
    assert!(hydration.current_restored);
    assert!(hydration.custom_restored);
    assert_eq!(second.current_theme(), ThemeChoice::Custom(dusk()));
}

/// `ClientCore::open` wires a sled-backed theme store
#[tokio::test]
async fn test_client_core_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = KvConfig::new(temp_dir.path().join("core").to_string_lossy().to_string());

    let core = ClientCore::open(config).unwrap();
    core.ready().await;
    assert!(core.theme().is_ready());

    core.theme().set_theme(ThemeName::Dim).wait().await.unwrap();
    assert!(core.theme().current_theme().is_dark());
}

/// A theme picked before hydration finishes is not overwritten by stale data
#[tokio::test]
async fn test_early_choice_beats_stale_persisted_value() {
    let storage = MemorySettingsStorage::new();
    {
        let old = ThemeStore::new();
        old.initialize(Arc::new(storage.clone())).await;
        old.set_theme(ThemeName::Dark).wait().await.unwrap();
    }

    let store = ThemeStore::spawn(Arc::new(storage.clone()));
    // The hydration task has not run yet on this single-threaded runtime
    let pending = store.set_theme(ThemeName::Dim);
    store.ready().await;
    pending.wait().await.unwrap();

    assert_eq!(store.current_theme(), ThemeChoice::Preset(ThemeName::Dim));

    let reopened = ThemeStore::new();
    reopened.initialize(Arc::new(storage)).await;
    assert_eq!(reopened.current_theme(), ThemeChoice::Preset(ThemeName::Dim));
}
