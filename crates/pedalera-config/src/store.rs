//! The live configuration store and its persistence loop.
//!
//! Mutable sections (state, presets) sit behind mutexes; every mutation
//! fires a single-slot save signal. A dedicated saver thread waits on the
//! signal and serializes the whole config back to disk, so file I/O never
//! happens on the UI or audio threads. The slot coalesces bursts of
//! mutations into one write.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::error::ConfigError;
use crate::jsonc;
use crate::paths;
use crate::types::{
    AudioConfig, EffectsConfig, LoggerConfig, PresetsConfig, RawConfig, StateConfig,
};

/// Message on the save channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSignal {
    /// A mutation happened; persist the config.
    Save,
    /// Shut the saver thread down.
    Shutdown,
}

/// Live configuration shared across the application.
pub struct ConfigStore {
    audio: AudioConfig,
    logger: LoggerConfig,
    effects: EffectsConfig,
    state: Mutex<StateConfig>,
    presets: Mutex<PresetsConfig>,
    path: Mutex<Option<PathBuf>>,
    save_tx: SyncSender<SaveSignal>,
}

impl ConfigStore {
    /// Discover, read, and parse the config file.
    ///
    /// A missing file yields pure defaults (and saves will create the
    /// default path). Read or parse failures are fatal.
    pub fn load() -> Result<(Arc<Self>, Receiver<SaveSignal>), ConfigError> {
        let Some(path) = paths::find_config_file() else {
            tracing::info!("no config file found, using defaults");
            return Ok(Self::from_raw(RawConfig::default(), None));
        };

        let data =
            fs::read_to_string(&path).map_err(|e| ConfigError::read_file(&path, e))?;

        let is_jsonc = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonc"));
        let data = if is_jsonc {
            jsonc::strip_comments(&data)
        } else {
            data
        };

        let raw: RawConfig =
            serde_json::from_str(&data).map_err(|e| ConfigError::ParseJson {
                path: path.clone(),
                source: e,
            })?;

        tracing::info!(path = %path.display(), "config loaded");
        Ok(Self::from_raw(raw, Some(path)))
    }

    /// Build a store from parsed sections; missing sections take defaults.
    pub fn from_raw(raw: RawConfig, path: Option<PathBuf>) -> (Arc<Self>, Receiver<SaveSignal>) {
        let (save_tx, save_rx) = sync_channel(1);

        let store = Arc::new(Self {
            audio: raw.audio.unwrap_or_default(),
            logger: raw.logger.unwrap_or_default(),
            effects: raw.effects.unwrap_or_default(),
            state: Mutex::new(raw.state.unwrap_or_default()),
            presets: Mutex::new(raw.presets.unwrap_or_default()),
            path: Mutex::new(path),
            save_tx,
        });

        (store, save_rx)
    }

    /// Audio stream parameters (immutable).
    pub fn audio(&self) -> &AudioConfig {
        &self.audio
    }

    /// Logger settings (immutable).
    pub fn logger(&self) -> &LoggerConfig {
        &self.logger
    }

    /// Effect loader settings (immutable).
    pub fn effects(&self) -> &EffectsConfig {
        &self.effects
    }

    /// Snapshot of the persisted runtime state.
    pub fn state(&self) -> StateConfig {
        self.lock_state().clone()
    }

    /// Persist the selected input device name.
    pub fn set_input_device(&self, name: &str) {
        self.lock_state().input_device = name.to_string();
        self.signal_save();
    }

    /// Persist the selected output device name.
    pub fn set_output_device(&self, name: &str) {
        self.lock_state().output_device = name.to_string();
        self.signal_save();
    }

    /// Persist the chain bypass flag.
    pub fn set_effects_enabled(&self, enabled: bool) {
        self.lock_state().effects_enabled = enabled;
        self.signal_save();
    }

    /// Persist the rhythm tempo state.
    pub fn set_rhythm(&self, bpm: f64, subdivision: u32) {
        {
            let mut state = self.lock_state();
            state.rhythm_bpm = bpm;
            state.rhythm_subdivision = subdivision;
        }
        self.signal_save();
    }

    /// Run a read-only closure over the preset set.
    pub fn read_presets<R>(&self, f: impl FnOnce(&PresetsConfig) -> R) -> R {
        f(&self.lock_presets())
    }

    /// Run a mutating closure over the preset set; a save is signalled
    /// only when the closure succeeds.
    pub fn update_presets<R>(
        &self,
        f: impl FnOnce(&mut PresetsConfig) -> Result<R, ConfigError>,
    ) -> Result<R, ConfigError> {
        let result = f(&mut self.lock_presets());
        if result.is_ok() {
            self.signal_save();
        }
        result
    }

    /// Queue a save; non-blocking, coalesced with any pending signal.
    pub fn signal_save(&self) {
        let _ = self.save_tx.try_send(SaveSignal::Save);
    }

    /// Ask the saver thread to exit after any in-flight save.
    pub fn shutdown(&self) {
        let _ = self.save_tx.send(SaveSignal::Shutdown);
    }

    /// Serialize the whole config to the loaded path, or the default
    /// app-data path when none was loaded. Creates directories as needed.
    pub fn save_now(&self) -> Result<PathBuf, ConfigError> {
        let save_path = {
            let mut path = self.path.lock().unwrap_or_else(PoisonError::into_inner);
            path.get_or_insert_with(|| {
                let default = paths::default_save_path();
                tracing::debug!(path = %default.display(), "no config file loaded, using default path");
                default
            })
            .clone()
        };

        if let Some(dir) = save_path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
        }

        let raw = RawConfig {
            audio: Some(self.audio.clone()),
            logger: Some(self.logger.clone()),
            effects: Some(self.effects.clone()),
            state: Some(self.lock_state().clone()),
            presets: Some(self.lock_presets().clone()),
        };

        let data = serde_json::to_string_pretty(&raw).map_err(ConfigError::Marshal)?;
        fs::write(&save_path, data).map_err(|e| ConfigError::write_file(&save_path, e))?;

        tracing::info!(path = %save_path.display(), "config saved");
        Ok(save_path)
    }

    /// The path saves go to (set after a load or a first save).
    pub fn loaded_path(&self) -> Option<PathBuf> {
        self.path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn set_path(&self, path: PathBuf) {
        *self.path.lock().unwrap() = Some(path);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StateConfig> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_presets(&self) -> std::sync::MutexGuard<'_, PresetsConfig> {
        self.presets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawn the persistence loop.
///
/// The thread sleeps on the save channel; each [`SaveSignal::Save`]
/// serializes the config, logging (not propagating) failures so the next
/// signal retries. [`SaveSignal::Shutdown`] or a disconnected channel ends
/// the loop.
pub fn spawn_saver(store: Arc<ConfigStore>, signals: Receiver<SaveSignal>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            match signals.recv() {
                Ok(SaveSignal::Save) => {
                    tracing::debug!("received save signal");
                    if let Err(error) = store.save_now() {
                        tracing::error!(%error, "failed to save config");
                    }
                }
                Ok(SaveSignal::Shutdown) | Err(_) => {
                    tracing::debug!("save loop stopped");
                    return;
                }
            }
        }
    })
}
