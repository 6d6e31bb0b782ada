//! Tempo state: BPM, subdivision grid, and tap tempo.
//!
//! Converts user intent (tap, BPM nudge, subdivision cycle) into the
//! sample-domain constants the rhythm engine quantizes against.

use std::time::{Duration, Instant};

/// Lowest accepted BPM; inputs below are clamped.
pub const MIN_BPM: f64 = 30.0;

/// Highest accepted BPM; inputs above are clamped.
pub const MAX_BPM: f64 = 300.0;

/// BPM used when a stored or requested value is out of range.
pub const DEFAULT_BPM: f64 = 120.0;

/// Maximum number of taps kept for tap-tempo averaging.
pub const MAX_TAP_HISTORY: usize = 4;

/// A pause longer than this discards the tap history.
pub const TAP_RESET_THRESHOLD: Duration = Duration::from_secs(2);

/// Number of equal slots per beat — the grid resolution.
///
/// Cycling wraps: 1/64 → 1/2 and 1/2 → 1/64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Subdivision {
    /// Half-beat slots (1/2)
    Sub2 = 2,
    /// Quarter-beat slots (1/4)
    Sub4 = 4,
    /// Eighth-beat slots (1/8)
    #[default]
    Sub8 = 8,
    /// Sixteenth-beat slots (1/16)
    Sub16 = 16,
    /// Thirty-second-beat slots (1/32)
    Sub32 = 32,
    /// Sixty-fourth-beat slots (1/64)
    Sub64 = 64,
}

impl Subdivision {
    /// Slots per beat as an integer.
    pub fn slots(self) -> u32 {
        self as u32
    }

    /// The next-finer subdivision, wrapping 1/64 → 1/2.
    pub fn next(self) -> Self {
        match self {
            Subdivision::Sub2 => Subdivision::Sub4,
            Subdivision::Sub4 => Subdivision::Sub8,
            Subdivision::Sub8 => Subdivision::Sub16,
            Subdivision::Sub16 => Subdivision::Sub32,
            Subdivision::Sub32 => Subdivision::Sub64,
            Subdivision::Sub64 => Subdivision::Sub2,
        }
    }

    /// The next-coarser subdivision, wrapping 1/2 → 1/64.
    pub fn prev(self) -> Self {
        match self {
            Subdivision::Sub64 => Subdivision::Sub32,
            Subdivision::Sub32 => Subdivision::Sub16,
            Subdivision::Sub16 => Subdivision::Sub8,
            Subdivision::Sub8 => Subdivision::Sub4,
            Subdivision::Sub4 => Subdivision::Sub2,
            Subdivision::Sub2 => Subdivision::Sub64,
        }
    }

    /// Parse a stored integer; anything unrecognized coerces to 1/8.
    pub fn from_u32(value: u32) -> Self {
        match value {
            2 => Subdivision::Sub2,
            4 => Subdivision::Sub4,
            8 => Subdivision::Sub8,
            16 => Subdivision::Sub16,
            32 => Subdivision::Sub32,
            64 => Subdivision::Sub64,
            _ => Subdivision::Sub8,
        }
    }

    /// Display label, e.g. `"1/8"`.
    pub fn label(self) -> String {
        format!("1/{}", self.slots())
    }
}

/// Tempo state with derived sample-domain timing constants.
///
/// Invariants (re-established on every mutation):
/// - `bpm` ∈ `[MIN_BPM, MAX_BPM]`
/// - `samples_per_beat == round(sample_rate * 60 / bpm)`
/// - `samples_per_slot == max(1, samples_per_beat / subdivision)`
#[derive(Debug, Clone)]
pub struct TempoState {
    bpm: f64,
    subdivision: Subdivision,
    sample_rate: f32,
    samples_per_beat: i64,
    samples_per_slot: i64,
    tap_times: Vec<Instant>,
}

impl TempoState {
    /// Create a tempo state; `bpm` is clamped into range.
    pub fn new(bpm: f64, subdivision: Subdivision, sample_rate: f32) -> Self {
        let mut state = Self {
            bpm: clamp_bpm(bpm),
            subdivision,
            sample_rate,
            samples_per_beat: 0,
            samples_per_slot: 0,
            tap_times: Vec::with_capacity(MAX_TAP_HISTORY),
        };
        state.recalculate();
        state
    }

    /// Current BPM.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Current subdivision.
    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    /// Samples in one beat at the current BPM.
    pub fn samples_per_beat(&self) -> i64 {
        self.samples_per_beat
    }

    /// Samples in one grid slot; never less than 1.
    pub fn samples_per_slot(&self) -> i64 {
        self.samples_per_slot
    }

    /// Number of taps currently in the history.
    pub fn tap_count(&self) -> usize {
        self.tap_times.len()
    }

    /// Set BPM (clamped) and recompute derived values.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
        self.recalculate();
    }

    /// Nudge BPM by `delta` (result clamped).
    pub fn adjust_bpm(&mut self, delta: f64) {
        self.set_bpm(self.bpm + delta);
    }

    /// Change the subdivision and recompute derived values.
    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.subdivision = subdivision;
        self.recalculate();
    }

    /// Cycle to the next-finer subdivision.
    pub fn next_subdivision(&mut self) {
        self.set_subdivision(self.subdivision.next());
    }

    /// Cycle to the next-coarser subdivision.
    pub fn prev_subdivision(&mut self) {
        self.set_subdivision(self.subdivision.prev());
    }

    /// Register a tap at `now`.
    ///
    /// A tap more than [`TAP_RESET_THRESHOLD`] after the previous one
    /// starts a fresh history. Returns `true` when the tap produced a BPM
    /// update (at least two taps in the window).
    pub fn register_tap(&mut self, now: Instant) -> bool {
        if let Some(&last) = self.tap_times.last()
            && now.saturating_duration_since(last) > TAP_RESET_THRESHOLD
        {
            self.tap_times.clear();
        }

        self.tap_times.push(now);
        if self.tap_times.len() > MAX_TAP_HISTORY {
            self.tap_times.remove(0);
        }

        if self.tap_times.len() < 2 {
            return false;
        }

        let total: Duration = self
            .tap_times
            .windows(2)
            .map(|pair| pair[1].saturating_duration_since(pair[0]))
            .sum();
        let avg = total / (self.tap_times.len() - 1) as u32;

        if avg.is_zero() {
            return false;
        }

        self.set_bpm(60.0 / avg.as_secs_f64());
        true
    }

    /// Discard the tap history without touching BPM.
    pub fn reset_taps(&mut self) {
        self.tap_times.clear();
    }

    fn recalculate(&mut self) {
        self.samples_per_beat = (f64::from(self.sample_rate) * 60.0 / self.bpm).round() as i64;
        self.samples_per_slot = (self.samples_per_beat / i64::from(self.subdivision.slots())).max(1);
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}
