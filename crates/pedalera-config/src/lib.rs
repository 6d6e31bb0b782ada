//! Configuration, persistence, and preset management for the pedalera rig.
//!
//! The config file is JSON (or JSONC with comments) discovered by probing
//! `./config.jsonc`, `./config.json`, then the same names under the
//! per-user app-data directory. Every runtime mutation (device switch,
//! chain toggle, tempo change, preset edit) fires a single-slot save
//! signal consumed by a background saver thread — see [`ConfigStore`] and
//! [`spawn_saver`].
//!
//! [`PresetManager`] owns the preset set on top of the store and drives
//! the runtime chain through injected callbacks.

mod error;
mod jsonc;
mod paths;
mod preset;
mod store;
mod types;

pub use error::ConfigError;
pub use jsonc::strip_comments;
pub use paths::{APP_NAME, app_data_dir, default_save_path, find_config_file};
pub use preset::{
    AvailableEffectsFn, EffectStatus, PresetChangedFn, PresetManager, PresetStatus,
};
pub use store::{ConfigStore, SaveSignal, spawn_saver};
pub use types::{
    AudioConfig, EffectsConfig, LoggerConfig, Preset, PresetsConfig, RawConfig, StateConfig,
};
