//! Typed local preferences.
//!
//! These used to be ad-hoc flat keys in browser-local storage; here they are
//! one schema-checked document with the same file-backed persistence and
//! change notification as the reference list.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

const EVENT_BUS_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalPrefs {
    pub theme: ThemeMode,
    /// Whether to run the celebration animation after confirming an apply.
    pub celebrate_on_apply: bool,
}

impl Default for LocalPrefs {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Light,
            celebrate_on_apply: true,
        }
    }
}

/// File-backed preference store with change broadcast.
pub struct PrefsStore {
    path: PathBuf,
    current: Mutex<LocalPrefs>,
    events: broadcast::Sender<LocalPrefs>,
}

impl PrefsStore {
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "waypoint")
            .context("could not determine a platform data directory")?;
        let dir = dirs.data_dir();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        Ok(Self::open(dir.join("prefs.json")))
    }

    /// A missing or corrupt file loads as defaults.
    pub fn open(path: PathBuf) -> Self {
        let current = load(&path);
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            path,
            current: Mutex::new(current),
            events,
        }
    }

    pub fn get(&self) -> LocalPrefs {
        *self.current.lock().unwrap()
    }

    /// Applies a mutation, persists, and broadcasts the new value.
    pub fn update(&self, apply: impl FnOnce(&mut LocalPrefs)) -> LocalPrefs {
        let updated = {
            let mut current = self.current.lock().unwrap();
            apply(&mut current);
            *current
        };
        self.persist(updated);
        let _ = self.events.send(updated);
        updated
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LocalPrefs> {
        self.events.subscribe()
    }

    fn persist(&self, prefs: LocalPrefs) {
        match serde_json::to_string_pretty(&prefs) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    warn!("could not persist prefs to {}: {err}", self.path.display());
                }
            }
            Err(err) => warn!("could not serialize prefs: {err}"),
        }
    }
}

fn load(path: &Path) -> LocalPrefs {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!("ignoring corrupt prefs file {}: {err}", path.display());
                LocalPrefs::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalPrefs::default(),
        Err(err) => {
            warn!("could not read prefs file {}: {err}", path.display());
            LocalPrefs::default()
        }
    }
}
