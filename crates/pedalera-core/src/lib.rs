//! Core types for the pedalera rig.
//!
//! This crate holds the pieces every other crate agrees on:
//!
//! - [`Effect`]: the trait the realtime chain invokes per buffer
//! - [`OnsetContext`] / [`SharedOnsetContext`]: the read-mostly "is there
//!   an onset right now?" snapshot effects may consult
//! - [`TempoState`] / [`Subdivision`]: musical timing converted to the
//!   sample domain
//!
//! Everything here is dependency-free and safe to call from the audio
//! thread where documented.

mod effect;
mod onset_context;
mod tempo;

pub use effect::Effect;
pub use onset_context::{OnsetContext, SharedOnsetContext};
pub use tempo::{
    DEFAULT_BPM, MAX_BPM, MAX_TAP_HISTORY, MIN_BPM, Subdivision, TAP_RESET_THRESHOLD, TempoState,
};
