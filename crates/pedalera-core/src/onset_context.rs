//! Shared onset snapshot for on-beat effects.

use std::sync::{PoisonError, RwLock};

/// Snapshot of the most recent quantized onset.
///
/// Written by the audio thread once per callback: set when the rhythm
/// engine emits a quantized onset, cleared otherwise. Effects receive a
/// copy through [`Effect::process`](crate::Effect::process).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnsetContext {
    /// Whether an onset fired on the current grid slot.
    pub has_onset: bool,
    /// Normalized energy of the originating onset, in `[0, 1]`.
    pub energy: f32,
    /// Fractional position within the current beat, in `[0, 1)`.
    pub beat_position: f64,
    /// 0-based slot within the beat the onset was quantized to.
    pub slot_index: i32,
}

/// Read-mostly cell holding the current [`OnsetContext`].
///
/// The single writer is the audio thread (once per callback); readers are
/// effects (through the per-buffer copy the chain takes) and UI queries.
/// Writer contention is therefore rare by construction, which is the
/// condition under which the audio thread may take this lock. Poisoning
/// is ignored rather than propagated so the audio thread can never panic
/// here.
#[derive(Debug, Default)]
pub struct SharedOnsetContext {
    cell: RwLock<OnsetContext>,
}

impl SharedOnsetContext {
    /// Create a cleared context cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a quantized onset for the current buffer.
    pub fn set(&self, energy: f32, beat_position: f64, slot_index: i32) {
        let mut ctx = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        *ctx = OnsetContext {
            has_onset: true,
            energy,
            beat_position,
            slot_index,
        };
    }

    /// Clear the onset flag for the current buffer.
    pub fn clear(&self) {
        let mut ctx = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        *ctx = OnsetContext::default();
    }

    /// Copy out the current snapshot.
    pub fn get(&self) -> OnsetContext {
        *self.cell.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let shared = SharedOnsetContext::new();
        shared.set(0.7, 0.125, 3);

        let ctx = shared.get();
        assert!(ctx.has_onset);
        assert_eq!(ctx.energy, 0.7);
        assert_eq!(ctx.beat_position, 0.125);
        assert_eq!(ctx.slot_index, 3);
    }

    #[test]
    fn clear_resets_everything() {
        let shared = SharedOnsetContext::new();
        shared.set(0.9, 0.5, 7);
        shared.clear();
        assert_eq!(shared.get(), OnsetContext::default());
    }
}
