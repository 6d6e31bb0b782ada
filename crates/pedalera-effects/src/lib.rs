//! Effect loading and the runtime chain for the pedalera rig.
//!
//! Effects are `.fx` source files in a user directory: a display name,
//! optional numeric constants, and a per-sample `process` expression (see
//! [`dsl`]). The [`loader`](load_effects_dir) compiles them into an
//! [`EffectRegistry`]; the [`Chain`] materializes the active preset's name
//! list against that registry and applies the result to each audio buffer.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pedalera_core::SharedOnsetContext;
//! use pedalera_effects::Chain;
//!
//! let chain = Chain::new("./effects", true, Arc::new(SharedOnsetContext::new()), None);
//! chain.set_preset_chain(&["soft drive".into()]);
//!
//! let mut buffer = [0.0f32; 64];
//! chain.process(&mut buffer);
//! ```

pub mod dsl;

mod chain;
mod error;
mod loader;

pub use chain::{Chain, EffectInfo, EnabledChangeFn};
pub use error::EffectError;
pub use loader::{EFFECT_EXTENSION, EffectRegistry, ScriptEffect, load_effect_file, load_effects_dir};
