//! Energy-based onset detection.
//!
//! The detector computes per-buffer RMS, runs it through an exponential
//! envelope follower with separate attack/release coefficients, and
//! compares the follower against a slowly adapting baseline. An onset is
//! emitted when the follower/baseline ratio spikes while the detector is
//! re-armed, outside the refractory window, on a sharp rise.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};

/// A detected transient on the input signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetEvent {
    /// Normalized onset strength in `[0, 1]`.
    pub energy: f32,
    /// Total input samples processed when the onset fired.
    pub timestamp: i64,
}

/// Detector tuning; all fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Follower/baseline ratio required to emit.
    pub threshold: f32,
    /// RMS floor below which the detector resets and re-arms.
    pub min_energy: f32,
    /// Envelope rise time constant in milliseconds.
    pub attack_ms: f32,
    /// Envelope fall time constant in milliseconds.
    pub release_ms: f32,
    /// Refractory period after an emission, in milliseconds.
    pub min_interval_ms: f32,
    /// Stream sample rate in Hz.
    pub sample_rate: f32,
    /// Capacity of the emitted-event queue.
    pub queue_capacity: usize,
}

impl DetectorConfig {
    /// Default tuning for a guitar input at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            threshold: 5.0,
            min_energy: 0.01,
            attack_ms: 2.0,
            release_ms: 500.0,
            min_interval_ms: 150.0,
            sample_rate,
            queue_capacity: 4,
        }
    }
}

struct DetectorState {
    threshold: f32,
    min_energy: f32,
    attack_coeff: f32,
    release_coeff: f32,
    min_interval_samples: i64,

    energy_follower: f32,
    baseline: f32,
    samples_since_last: i64,
    last_energy: f32,
    current_energy: f32,
    was_low: bool,
    peak_energy: f32,
    total_samples: i64,

    events: Option<Producer<OnsetEvent>>,
}

/// Per-buffer transient detector.
///
/// # Thread contract
///
/// [`process`](Self::process) is called only from the audio thread.
/// [`set_threshold`](Self::set_threshold), [`set_enabled`](Self::set_enabled),
/// [`reset`](Self::reset) and [`current_energy`](Self::current_energy) may
/// be called from any thread.
pub struct OnsetDetector {
    state: Mutex<DetectorState>,
    enabled: AtomicBool,
}

impl OnsetDetector {
    /// Build a detector and the consuming end of its event queue.
    pub fn new(cfg: DetectorConfig) -> (Self, Consumer<OnsetEvent>) {
        let samples_per_ms = cfg.sample_rate / 1000.0;
        let attack_coeff = 1.0 - (-1.0 / f64::from(cfg.attack_ms * samples_per_ms)).exp() as f32;
        let release_coeff = 1.0 - (-1.0 / f64::from(cfg.release_ms * samples_per_ms)).exp() as f32;

        let (producer, consumer) = RingBuffer::new(cfg.queue_capacity);

        let detector = Self {
            state: Mutex::new(DetectorState {
                threshold: cfg.threshold,
                min_energy: cfg.min_energy,
                attack_coeff,
                release_coeff,
                min_interval_samples: (cfg.min_interval_ms * samples_per_ms) as i64,
                energy_follower: 0.0,
                baseline: 0.01,
                samples_since_last: 0,
                last_energy: 0.0,
                current_energy: 0.0,
                was_low: true,
                peak_energy: 0.0,
                total_samples: 0,
                events: Some(producer),
            }),
            enabled: AtomicBool::new(true),
        };

        (detector, consumer)
    }

    /// Analyze one input buffer. Returns `true` when an onset was emitted.
    pub fn process(&self, samples: &[f32]) -> bool {
        if !self.enabled.load(Ordering::Relaxed) || samples.is_empty() {
            return false;
        }

        let mut d = self.lock();
        let buffer_len = samples.len() as i64;

        let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_squares / samples.len() as f32).sqrt();

        // Silence: advance time, drop all tracking state, re-arm.
        if rms < d.min_energy {
            d.samples_since_last += buffer_len;
            d.total_samples += buffer_len;
            d.was_low = true;
            d.peak_energy = 0.0;
            d.last_energy = 0.0;
            d.current_energy = 0.0;
            d.energy_follower = 0.0;
            return false;
        }

        let coeff = if rms > d.energy_follower {
            d.attack_coeff
        } else {
            d.release_coeff
        };
        d.energy_follower += coeff * (rms - d.energy_follower);

        // Baseline tracks the signal floor, only while the signal sits
        // near it. Clamped away from zero to keep the ratio finite.
        if rms < d.baseline * 2.0 {
            d.baseline += d.release_coeff * 0.05 * (rms - d.baseline);
        }
        if d.baseline < 1e-4 {
            d.baseline = 1e-4;
        }

        d.last_energy = d.current_energy;
        d.current_energy = rms;

        let ratio = d.energy_follower / d.baseline;

        if rms > d.peak_energy {
            d.peak_energy = rms;
        }

        // Re-arm once the signal has fallen well below the last peak.
        if !d.was_low && d.peak_energy > d.min_energy * 5.0 && rms < d.peak_energy * 0.1 {
            d.was_low = true;
            d.peak_energy = rms;
        }

        let is_onset = ratio > d.threshold
            && d.was_low
            && d.samples_since_last >= d.min_interval_samples
            && d.current_energy > d.last_energy * 3.0
            && d.current_energy > d.min_energy * 3.0;

        if is_onset {
            let normalized_energy = (ratio / d.threshold / 2.0).min(1.0);
            let event = OnsetEvent {
                energy: normalized_energy,
                timestamp: d.total_samples,
            };

            if let Some(events) = d.events.as_mut() {
                // Non-blocking publish; a full queue drops the event.
                let _ = events.push(event);
            }

            d.samples_since_last = 0;
            d.was_low = false;
            d.peak_energy = rms;
        } else {
            d.samples_since_last += buffer_len;
        }

        d.total_samples += buffer_len;
        is_onset
    }

    /// Follower/baseline ratio normalized by the threshold, in `[0, 1]`.
    pub fn current_energy(&self) -> f32 {
        let d = self.lock();
        if d.baseline < 1e-4 {
            return 0.0;
        }
        (d.energy_follower / d.baseline / d.threshold).min(1.0)
    }

    /// Change the emission threshold.
    pub fn set_threshold(&self, threshold: f32) {
        self.lock().threshold = threshold;
    }

    /// Enable or disable detection; a disabled detector ignores input.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether detection is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Restore the armed idle state with the refractory window elapsed.
    pub fn reset(&self) {
        let mut d = self.lock();
        d.energy_follower = 0.0;
        d.baseline = 0.001;
        d.samples_since_last = d.min_interval_samples;
        d.last_energy = 0.0;
        d.current_energy = 0.0;
        d.was_low = true;
        d.peak_energy = 0.0;
    }

    /// Close the event queue; the consumer observes abandonment.
    pub fn close(&self) {
        self.lock().events = None;
        tracing::debug!("onset event channel closed");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DetectorState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;
    const BUFFER: usize = 64;

    fn buffers(amplitude: f32) -> Vec<f32> {
        vec![amplitude; BUFFER]
    }

    /// Prime the follower with a quiet hum, then hit with a loud buffer.
    ///
    /// The follower rises slowly (2 ms attack applied per buffer), so a
    /// cold loud buffer alone never clears the ratio threshold; a realistic
    /// trigger is quiet signal that pumps the follower above 5x the
    /// baseline, followed by a sharp rise.
    fn trigger_onset(detector: &OnsetDetector) -> bool {
        detector.reset();
        for _ in 0..60 {
            detector.process(&buffers(0.02));
        }
        detector.process(&buffers(0.5))
    }

    #[test]
    fn silence_emits_nothing() {
        let (detector, mut events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));

        for _ in 0..50 {
            assert!(!detector.process(&buffers(0.0)));
        }
        assert!(events.pop().is_err());
        // State stayed fully re-armed through the silence.
        assert_eq!(detector.current_energy(), 0.0);
    }

    #[test]
    fn sharp_rise_after_quiet_emits_event() {
        let (detector, mut events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));

        assert!(trigger_onset(&detector));

        let event = events.pop().expect("event published");
        assert!(event.energy > 0.0 && event.energy <= 1.0);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn refractory_period_suppresses_double_fire() {
        let (detector, mut events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));

        assert!(trigger_onset(&detector));
        // Immediately following buffers sit inside the refractory window.
        assert!(!detector.process(&buffers(0.9)));
        assert!(!detector.process(&buffers(0.9)));

        assert!(events.pop().is_ok());
        assert!(events.pop().is_err());
    }

    #[test]
    fn impulse_train_fires_once_per_impulse() {
        let (detector, _events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));
        detector.reset();

        let mut emissions = 0;
        for _ in 0..5 {
            // Silence past the refractory window re-arms, the quiet hum
            // re-primes the follower, the hit fires.
            for _ in 0..120 {
                detector.process(&buffers(0.0));
            }
            for _ in 0..60 {
                detector.process(&buffers(0.02));
            }
            if detector.process(&buffers(0.5)) {
                emissions += 1;
            }
        }
        assert_eq!(emissions, 5);
    }

    #[test]
    fn queue_drops_on_full_without_blocking() {
        let mut cfg = DetectorConfig::new(SAMPLE_RATE);
        cfg.queue_capacity = 1;
        let (detector, mut events) = OnsetDetector::new(cfg);

        assert!(trigger_onset(&detector));
        // Second onset with a full queue still reports detection.
        assert!(trigger_onset(&detector));

        assert!(events.pop().is_ok());
        assert!(events.pop().is_err());
    }

    #[test]
    fn disabled_detector_ignores_input() {
        let (detector, mut events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));
        detector.set_enabled(false);
        assert!(!trigger_onset(&detector));
        assert!(events.pop().is_err());
        assert!(!detector.is_enabled());
    }

    #[test]
    fn close_abandons_the_queue() {
        let (detector, events) = OnsetDetector::new(DetectorConfig::new(SAMPLE_RATE));
        detector.close();
        assert!(events.is_abandoned());
    }
}
