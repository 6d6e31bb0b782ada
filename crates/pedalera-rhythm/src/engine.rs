//! Tempo-grid quantization of onset events.

use std::sync::Mutex;
use std::time::Instant;

use pedalera_core::{MAX_BPM, MIN_BPM, Subdivision, TempoState};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::detector::OnsetEvent;

/// Capacity of the quantized-onset queue read by the UI.
const QUANTIZED_QUEUE_CAPACITY: usize = 16;

/// Called synchronously after every tempo mutation with `(bpm, subdivision)`
/// so persistence can be arranged by the caller.
pub type StateChangeFn = Box<dyn Fn(f64, u32) + Send>;

/// An onset snapped to the metric grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedOnset {
    /// The detector event that was quantized.
    pub original_event: OnsetEvent,
    /// Fractional offset within the current beat at emission, in `[0, 1)`.
    pub beat_position: f64,
    /// 0-based slot within the beat, in `[0, subdivision)`.
    pub slot_index: i32,
    /// Whether the event waited for a slot boundary (always true here).
    pub was_queued: bool,
}

/// Construction parameters for [`RhythmEngine`].
pub struct RhythmEngineConfig {
    /// Stream sample rate in Hz.
    pub sample_rate: f32,
    /// Starting BPM; out-of-range values (including the 0 persisted by a
    /// fresh state section) fall back to 120.
    pub initial_bpm: f64,
    /// Starting grid resolution.
    pub subdivision: Subdivision,
    /// Optional synchronous observer of tempo mutations.
    pub on_state_change: Option<StateChangeFn>,
}

struct EngineState {
    tempo: TempoState,
    total_samples: i64,
    current_slot: i64,
    pending: Option<OnsetEvent>,
    last_slot_fired: i64,
    onset_events: Option<Consumer<OnsetEvent>>,
    quantized: Option<Producer<QuantizedOnset>>,
    on_state_change: Option<StateChangeFn>,
}

/// Consumes onset events and emits at most one quantized onset per grid
/// slot, at the slot boundary.
///
/// # Thread contract
///
/// [`process_buffer`](Self::process_buffer) is called only from the audio
/// thread; all mutators and read queries may be called from other threads.
pub struct RhythmEngine {
    state: Mutex<EngineState>,
}

impl RhythmEngine {
    /// Build an engine reading `onset_events`, plus the consuming end of
    /// its quantized-onset queue.
    pub fn new(
        cfg: RhythmEngineConfig,
        onset_events: Consumer<OnsetEvent>,
    ) -> (Self, Consumer<QuantizedOnset>) {
        let bpm = if (MIN_BPM..=MAX_BPM).contains(&cfg.initial_bpm) {
            cfg.initial_bpm
        } else {
            pedalera_core::DEFAULT_BPM
        };

        let (producer, consumer) = RingBuffer::new(QUANTIZED_QUEUE_CAPACITY);

        let engine = Self {
            state: Mutex::new(EngineState {
                tempo: TempoState::new(bpm, cfg.subdivision, cfg.sample_rate),
                total_samples: 0,
                current_slot: 0,
                pending: None,
                last_slot_fired: -1,
                onset_events: Some(onset_events),
                quantized: Some(producer),
                on_state_change: cfg.on_state_change,
            }),
        };

        (engine, consumer)
    }

    /// Advance the grid by one buffer; returns the quantized onset when a
    /// slot boundary was crossed with an event pending.
    pub fn process_buffer(&self, buffer_len: usize) -> Option<QuantizedOnset> {
        let mut s = self.lock();

        drain_onset_events(&mut s);

        let old_slot = s.current_slot;
        s.total_samples += buffer_len as i64;

        if s.tempo.samples_per_slot() > 0 {
            s.current_slot = s.total_samples / s.tempo.samples_per_slot();
        }

        if s.current_slot > old_slot
            && s.current_slot > s.last_slot_fired
            && let Some(event) = s.pending.take()
        {
            let quantized = QuantizedOnset {
                original_event: event,
                slot_index: (s.current_slot % i64::from(s.tempo.subdivision().slots())) as i32,
                beat_position: beat_position(&s),
                was_queued: true,
            };

            if let Some(tx) = s.quantized.as_mut() {
                // Non-blocking publish; a full queue drops the event.
                let _ = tx.push(quantized);
            }

            s.last_slot_fired = s.current_slot;
            return Some(quantized);
        }

        None
    }

    /// Fractional position within the current beat, in `[0, 1)`.
    pub fn beat_phase(&self) -> f64 {
        beat_position(&self.lock())
    }

    /// Number of whole beats elapsed since the stream started.
    pub fn beat_count(&self) -> i64 {
        let s = self.lock();
        if s.tempo.samples_per_beat() == 0 {
            return 0;
        }
        s.total_samples / s.tempo.samples_per_beat()
    }

    /// Absolute grid slot the playhead is in.
    pub fn current_slot(&self) -> i64 {
        self.lock().current_slot
    }

    /// Slot within the current beat, in `[0, subdivision)`.
    pub fn slot_in_beat(&self) -> i32 {
        let s = self.lock();
        (s.current_slot % i64::from(s.tempo.subdivision().slots())) as i32
    }

    /// Register a tap-tempo tap; returns true when BPM was updated.
    pub fn register_tap(&self, now: Instant) -> bool {
        let mut s = self.lock();
        let updated = s.tempo.register_tap(now);
        if updated {
            notify_state_change(&s);
        }
        updated
    }

    /// Set BPM directly (clamped to the valid range).
    pub fn set_bpm(&self, bpm: f64) {
        let mut s = self.lock();
        s.tempo.set_bpm(bpm);
        notify_state_change(&s);
    }

    /// Nudge BPM by `delta`.
    pub fn adjust_bpm(&self, delta: f64) {
        let mut s = self.lock();
        s.tempo.adjust_bpm(delta);
        notify_state_change(&s);
    }

    /// Current BPM.
    pub fn bpm(&self) -> f64 {
        self.lock().tempo.bpm()
    }

    /// Change the grid resolution.
    pub fn set_subdivision(&self, subdivision: Subdivision) {
        let mut s = self.lock();
        s.tempo.set_subdivision(subdivision);
        notify_state_change(&s);
    }

    /// Cycle to the next-finer grid.
    pub fn next_subdivision(&self) {
        let mut s = self.lock();
        s.tempo.next_subdivision();
        notify_state_change(&s);
    }

    /// Cycle to the next-coarser grid.
    pub fn prev_subdivision(&self) {
        let mut s = self.lock();
        s.tempo.prev_subdivision();
        notify_state_change(&s);
    }

    /// Current grid resolution.
    pub fn subdivision(&self) -> Subdivision {
        self.lock().tempo.subdivision()
    }

    /// Samples per grid slot at the current tempo.
    pub fn samples_per_slot(&self) -> i64 {
        self.lock().tempo.samples_per_slot()
    }

    /// Samples per beat at the current tempo.
    pub fn samples_per_beat(&self) -> i64 {
        self.lock().tempo.samples_per_beat()
    }

    /// Close both queue endpoints; consumers observe abandonment.
    pub fn close(&self) {
        let mut s = self.lock();
        s.quantized = None;
        s.onset_events = None;
        tracing::debug!("rhythm engine channels closed");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Pull onset events from the queue, coalescing to at most one pending.
///
/// With an event already pending, everything currently readable is drained
/// and discarded (rapid onsets within a slot collapse to the first one).
/// Otherwise the first readable event becomes pending and the remainder is
/// discarded.
fn drain_onset_events(s: &mut EngineState) {
    let Some(rx) = s.onset_events.as_mut() else {
        return;
    };

    if s.pending.is_some() {
        while rx.pop().is_ok() {}
        return;
    }

    match rx.pop() {
        Ok(event) => s.pending = Some(event),
        Err(_) => return,
    }

    while rx.pop().is_ok() {}
}

fn beat_position(s: &EngineState) -> f64 {
    let samples_per_beat = s.tempo.samples_per_beat();
    if samples_per_beat == 0 {
        return 0.0;
    }
    (s.total_samples % samples_per_beat) as f64 / samples_per_beat as f64
}

fn notify_state_change(s: &EngineState) {
    tracing::debug!(
        bpm = s.tempo.bpm(),
        subdivision = s.tempo.subdivision().slots(),
        "tempo changed"
    );
    if let Some(callback) = &s.on_state_change {
        callback(s.tempo.bpm(), s.tempo.subdivision().slots());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine_at(
        bpm: f64,
        subdivision: Subdivision,
    ) -> (RhythmEngine, Producer<OnsetEvent>, Consumer<QuantizedOnset>) {
        let (producer, consumer) = RingBuffer::new(4);
        let (engine, quantized) = RhythmEngine::new(
            RhythmEngineConfig {
                sample_rate: 48000.0,
                initial_bpm: bpm,
                subdivision,
                on_state_change: None,
            },
            consumer,
        );
        (engine, producer, quantized)
    }

    #[test]
    fn quantizes_onset_to_next_slot_boundary() {
        // 48 kHz at 120 BPM, 1/8 grid: 24000 samples/beat, 3000/slot.
        let (engine, mut onsets, mut quantized) = engine_at(120.0, Subdivision::Sub8);

        onsets
            .push(OnsetEvent {
                energy: 0.5,
                timestamp: 0,
            })
            .unwrap();

        let q = engine.process_buffer(3000).expect("slot boundary crossed");
        assert_eq!(q.slot_index, 1);
        assert!((q.beat_position - 0.125).abs() < 1e-9);
        assert!(q.was_queued);
        assert_eq!(q.original_event.energy, 0.5);

        // The same event also reached the UI queue.
        assert_eq!(quantized.pop().unwrap(), q);

        // No new onset: the next boundary emits nothing.
        assert!(engine.process_buffer(3000).is_none());
    }

    #[test]
    fn no_emission_without_onsets() {
        let (engine, _onsets, mut quantized) = engine_at(120.0, Subdivision::Sub8);
        for _ in 0..64 {
            assert!(engine.process_buffer(3000).is_none());
        }
        assert!(quantized.pop().is_err());
    }

    #[test]
    fn rapid_onsets_collapse_to_first() {
        let (engine, mut onsets, _quantized) = engine_at(120.0, Subdivision::Sub8);

        onsets
            .push(OnsetEvent {
                energy: 0.9,
                timestamp: 10,
            })
            .unwrap();
        onsets
            .push(OnsetEvent {
                energy: 0.1,
                timestamp: 20,
            })
            .unwrap();

        let q = engine.process_buffer(3000).unwrap();
        assert_eq!(q.original_event.timestamp, 10);

        // The second event was discarded, not deferred to the next slot.
        assert!(engine.process_buffer(3000).is_none());
    }

    #[test]
    fn onsets_arriving_while_pending_are_dropped() {
        let (engine, mut onsets, _quantized) = engine_at(120.0, Subdivision::Sub8);

        onsets
            .push(OnsetEvent {
                energy: 0.9,
                timestamp: 10,
            })
            .unwrap();
        // Mid-slot buffer: takes the event pending, no boundary yet.
        assert!(engine.process_buffer(1000).is_none());

        onsets
            .push(OnsetEvent {
                energy: 0.2,
                timestamp: 1500,
            })
            .unwrap();
        // The pending event wins; the newcomer is discarded.
        let q = engine.process_buffer(2000).unwrap();
        assert_eq!(q.original_event.timestamp, 10);
        assert!(engine.process_buffer(3000).is_none());
    }

    #[test]
    fn at_most_one_emission_per_slot() {
        let (engine, mut onsets, _quantized) = engine_at(120.0, Subdivision::Sub8);

        let mut emissions = 0;
        for i in 0..30 {
            let _ = onsets.push(OnsetEvent {
                energy: 0.5,
                timestamp: i,
            });
            // Ten 300-sample buffers per 3000-sample slot.
            if engine.process_buffer(300).is_some() {
                emissions += 1;
            }
        }
        // 30 buffers = 9000 samples = 3 slot crossings.
        assert_eq!(emissions, 3);
    }

    #[test]
    fn out_of_range_initial_bpm_falls_back_to_default() {
        let (engine, _onsets, _quantized) = engine_at(0.0, Subdivision::Sub8);
        assert_eq!(engine.bpm(), 120.0);
    }

    #[test]
    fn mutators_fire_state_change_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_callback = Arc::clone(&calls);

        let (_producer, consumer) = RingBuffer::new(4);
        let (engine, _quantized) = RhythmEngine::new(
            RhythmEngineConfig {
                sample_rate: 48000.0,
                initial_bpm: 120.0,
                subdivision: Subdivision::Sub8,
                on_state_change: Some(Box::new(move |bpm, sub| {
                    assert!((MIN_BPM..=MAX_BPM).contains(&bpm));
                    assert!(sub >= 2 && sub <= 64);
                    calls_in_callback.fetch_add(1, Ordering::SeqCst);
                })),
            },
            consumer,
        );

        engine.set_bpm(140.0);
        engine.adjust_bpm(-2.0);
        engine.next_subdivision();
        engine.prev_subdivision();
        engine.set_subdivision(Subdivision::Sub16);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // A lone tap does not update BPM and must not fire the callback.
        assert!(!engine.register_tap(Instant::now()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn close_abandons_quantized_queue() {
        let (engine, _onsets, quantized) = engine_at(120.0, Subdivision::Sub8);
        engine.close();
        assert!(quantized.is_abandoned());
        // Processing after close still advances time without panicking.
        assert!(engine.process_buffer(3000).is_none());
    }
}
