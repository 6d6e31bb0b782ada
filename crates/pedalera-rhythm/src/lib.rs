//! Onset detection and rhythm quantization.
//!
//! Two cooperating pieces, both driven from the audio callback:
//!
//! - [`OnsetDetector`]: per-buffer RMS/envelope transient detection on the
//!   input signal, publishing [`OnsetEvent`]s into a bounded lock-free
//!   queue (capacity 4, drop-on-full).
//! - [`RhythmEngine`]: consumes those events, holds at most one pending
//!   event until the next grid-slot boundary, then emits a
//!   [`QuantizedOnset`] exactly once per slot crossed.
//!
//! The queues are single-producer/single-consumer rtrb rings; neither end
//! ever blocks, which is what lets both sides run inside the realtime
//! callback.

mod detector;
mod engine;

pub use detector::{DetectorConfig, OnsetDetector, OnsetEvent};
pub use engine::{QuantizedOnset, RhythmEngine, RhythmEngineConfig, StateChangeFn};
