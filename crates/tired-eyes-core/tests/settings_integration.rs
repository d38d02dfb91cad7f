//! Integration tests for settings shared through one TOML file.
//!
//! Two stores over the same path stand in for two processes (the running
//! reminder and a `config set` invocation).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tired_eyes_core::{
    ConfigError, CoreError, NotificationType, Settings, SettingsStore, ThemePreference,
    TomlFileBackend,
};

fn shared_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tired-eyes-settings.toml");
    (dir, path)
}

#[test]
fn write_in_one_store_is_seen_by_another_after_refresh() {
    let (_dir, path) = shared_file();
    let running = SettingsStore::new(TomlFileBackend::new(&path));
    let editor = SettingsStore::new(TomlFileBackend::new(&path));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    running.on_change(move |s| {
        assert_eq!(s.notification_type, NotificationType::Fullscreen);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    editor.set_key("notificationType", "fullscreen").unwrap();

    // Reads always go to the file.
    assert_eq!(running.read().notification_type, NotificationType::Fullscreen);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(running.refresh());
    assert!(!running.refresh());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn settings_survive_reopen() {
    let (_dir, path) = shared_file();
    let store = SettingsStore::new(TomlFileBackend::new(&path));
    store
        .update(|s| {
            s.work_duration_minutes = 45;
            s.theme = ThemePreference::Dark;
            s.close_to_tray = false;
        })
        .unwrap();
    drop(store);

    let reopened = SettingsStore::new(TomlFileBackend::new(&path));
    let settings = reopened.read();
    assert_eq!(settings.work_duration_minutes, 45);
    assert_eq!(settings.theme, ThemePreference::Dark);
    assert!(!settings.close_to_tray);
}

#[test]
fn rejected_write_leaves_file_and_listeners_alone() {
    let (_dir, path) = shared_file();
    let store = SettingsStore::new(TomlFileBackend::new(&path));
    store.set_key("breakDurationSeconds", "30").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    store.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = store.set_key("breakDurationSeconds", "5").unwrap_err();
    assert!(matches!(err, CoreError::Config(ConfigError::InvalidValue { .. })));
    let err = store.set_key("volume", "3").unwrap_err();
    assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.read().break_duration_seconds, 30);
}

#[test]
fn hand_edited_file_is_clamped_on_read() {
    let (_dir, path) = shared_file();
    std::fs::write(
        &path,
        "notificationType = \"fullscreen\"\nbreakDurationSeconds = 3\nworkDurationMinutes = 0\n",
    )
    .unwrap();

    let settings = SettingsStore::new(TomlFileBackend::new(&path)).read();
    assert_eq!(settings.notification_type, NotificationType::Fullscreen);
    assert_eq!(settings.break_duration_seconds, 20);
    assert_eq!(settings.work_duration_minutes, 1);
    assert_eq!(settings.theme, ThemePreference::System);
}

#[test]
fn corrupt_file_reads_as_defaults() {
    let (_dir, path) = shared_file();
    std::fs::write(&path, "this is { not toml").unwrap();
    assert_eq!(SettingsStore::new(TomlFileBackend::new(&path)).read(), Settings::default());
}
