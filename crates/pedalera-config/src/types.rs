//! Config file sections.
//!
//! Every section and every field is optional in the file; missing pieces
//! take the defaults documented on each field. Durations serialize as
//! humane strings (`"10ms"`, `"5s"`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Stream parameters; immutable for the lifetime of a stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames per callback buffer.
    #[serde(default = "default_frames_per_buffer")]
    pub frames_per_buffer: u32,
    /// Channel count (1 = mono duplex).
    #[serde(default = "default_num_channels")]
    pub num_channels: u16,
    /// Requested device latency.
    #[serde(default = "default_target_latency", with = "humane_duration")]
    pub target_latency: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frames_per_buffer: default_frames_per_buffer(),
            num_channels: default_num_channels(),
            target_latency: default_target_latency(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Oldest log files beyond this count are pruned at startup.
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Directory log files are written into.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Writer buffer size in bytes.
    #[serde(default = "default_log_buffer_size")]
    pub buffer_size: usize,
    /// How often buffered output is flushed.
    #[serde(default = "default_flush_interval", with = "humane_duration")]
    pub flush_interval: Duration,
    /// Minimum level recorded (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_log_files: default_max_log_files(),
            logs_dir: default_logs_dir(),
            buffer_size: default_log_buffer_size(),
            flush_interval: default_flush_interval(),
            level: default_log_level(),
        }
    }
}

/// Effect loader settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectsConfig {
    /// Directory scanned recursively for `.fx` files.
    #[serde(default = "default_effects_dir")]
    pub effects_dir: PathBuf,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            effects_dir: default_effects_dir(),
        }
    }
}

/// Persisted runtime state, written back on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateConfig {
    /// Name of the last selected input device ("" = host default).
    #[serde(default)]
    pub input_device: String,
    /// Name of the last selected output device ("" = host default).
    #[serde(default)]
    pub output_device: String,
    /// Whether the effect chain is engaged.
    #[serde(default = "default_effects_enabled")]
    pub effects_enabled: bool,
    /// Last rhythm BPM (0 = unset; falls back to 120).
    #[serde(default)]
    pub rhythm_bpm: f64,
    /// Last rhythm subdivision (0 = unset; falls back to 8).
    #[serde(default)]
    pub rhythm_subdivision: u32,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            input_device: String::new(),
            output_device: String::new(),
            effects_enabled: default_effects_enabled(),
            rhythm_bpm: 0.0,
            rhythm_subdivision: 0,
        }
    }
}

/// A named, ordered list of effect names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    /// Unique preset name.
    pub name: String,
    /// Effect names applied in order.
    #[serde(default)]
    pub effect_chain: Vec<String>,
}

/// The preset set and the active-preset pointer.
///
/// Invariant: `active_preset` either names a member of `presets` or is
/// empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresetsConfig {
    /// All presets in definition order.
    #[serde(default)]
    pub presets: Vec<Preset>,
    /// Name of the active preset ("" = none).
    #[serde(default)]
    pub active_preset: String,
}

impl PresetsConfig {
    /// Find a preset by name.
    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Find a preset by name, mutably.
    pub fn get_preset_mut(&mut self, name: &str) -> Option<&mut Preset> {
        self.presets.iter_mut().find(|p| p.name == name)
    }

    /// The preset the active pointer names, if any.
    pub fn active_preset_config(&self) -> Option<&Preset> {
        if self.active_preset.is_empty() {
            return None;
        }
        self.get_preset(&self.active_preset)
    }
}

/// The whole config file; sections absent from the file stay `None` and
/// fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawConfig {
    /// Audio stream section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,
    /// Logger section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<LoggerConfig>,
    /// Effects section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<EffectsConfig>,
    /// Runtime state section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateConfig>,
    /// Presets section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<PresetsConfig>,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_frames_per_buffer() -> u32 {
    64
}

fn default_num_channels() -> u16 {
    1
}

fn default_target_latency() -> Duration {
    Duration::from_millis(10)
}

fn default_max_log_files() -> usize {
    30
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_buffer_size() -> usize {
    256 * 1024
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_effects_dir() -> PathBuf {
    PathBuf::from("./effects")
}

fn default_effects_enabled() -> bool {
    true
}

/// Durations as `"250ms"` / `"5s"` strings.
mod humane_duration {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = value.as_millis();
        let text = if millis > 0 && millis % 1000 == 0 {
            format!("{}s", millis / 1000)
        } else {
            format!("{millis}ms")
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        let text = text.trim();

        if let Some(ms) = text.strip_suffix("ms") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| Error::custom(format!("invalid duration '{text}'")))?;
            return Ok(Duration::from_millis(ms));
        }
        if let Some(secs) = text.strip_suffix('s') {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| Error::custom(format!("invalid duration '{text}'")))?;
            return Ok(Duration::from_secs(secs));
        }
        Err(Error::custom(format!(
            "invalid duration '{text}' (expected e.g. \"10ms\" or \"5s\")"
        )))
    }
}
