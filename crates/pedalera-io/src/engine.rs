//! The duplex audio engine.

use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, Stream, StreamConfig};

use pedalera_config::{AudioConfig, ConfigStore};
use pedalera_core::SharedOnsetContext;
use pedalera_effects::Chain;
use pedalera_rhythm::{OnsetDetector, RhythmEngine};

use crate::{AudioError, Result};

struct StreamPair {
    _input: Stream,
    _output: Stream,
}

struct EngineInner {
    input_devices: Vec<Device>,
    output_devices: Vec<Device>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_index: usize,
    output_index: usize,
    streams: Option<StreamPair>,
}

/// Owns the input/output device pair and the realtime stream lifecycle.
///
/// State machine: `Stopped → Running → Stopped`. A device switch is
/// `Running → Stopped → Running`; there is no paused state — the chain's
/// enabled flag is the bypass.
pub struct AudioEngine {
    inner: Mutex<EngineInner>,
    chain: Arc<Chain>,
    detector: Arc<OnsetDetector>,
    rhythm: Arc<RhythmEngine>,
    onset_context: Arc<SharedOnsetContext>,
    audio_cfg: AudioConfig,
    store: Arc<ConfigStore>,
}

impl AudioEngine {
    /// Enumerate devices and restore the previously saved selection.
    ///
    /// A saved device name that no longer exists logs a warning and falls
    /// back to the host default.
    pub fn new(
        chain: Arc<Chain>,
        detector: Arc<OnsetDetector>,
        rhythm: Arc<RhythmEngine>,
        onset_context: Arc<SharedOnsetContext>,
        store: Arc<ConfigStore>,
    ) -> Result<Self> {
        let host = cpal::default_host();

        let mut input_devices = Vec::new();
        let mut input_names = Vec::new();
        for device in host.input_devices().map_err(AudioError::GetDevices)? {
            if let Ok(name) = device.name() {
                input_devices.push(device);
                input_names.push(name);
            }
        }

        let mut output_devices = Vec::new();
        let mut output_names = Vec::new();
        for device in host.output_devices().map_err(AudioError::GetDevices)? {
            if let Ok(name) = device.name() {
                output_devices.push(device);
                output_names.push(name);
            }
        }

        tracing::info!(
            inputs = input_devices.len(),
            outputs = output_devices.len(),
            "found audio devices"
        );

        let default_input = host.default_input_device().and_then(|d| d.name().ok());
        let default_output = host.default_output_device().and_then(|d| d.name().ok());

        let mut inner = EngineInner {
            input_devices,
            output_devices,
            input_names,
            output_names,
            input_index: 0,
            output_index: 0,
            streams: None,
        };

        if let Some(name) = default_input
            && let Some(idx) = inner.input_names.iter().position(|n| *n == name)
        {
            inner.input_index = idx;
        }
        if let Some(name) = default_output
            && let Some(idx) = inner.output_names.iter().position(|n| *n == name)
        {
            inner.output_index = idx;
        }

        let state = store.state();
        restore_saved_device(
            &state.input_device,
            &inner.input_names,
            &mut inner.input_index,
            "input",
        );
        restore_saved_device(
            &state.output_device,
            &inner.output_names,
            &mut inner.output_index,
            "output",
        );

        let audio_cfg = store.audio().clone();

        Ok(Self {
            inner: Mutex::new(inner),
            chain,
            detector,
            rhythm,
            onset_context,
            audio_cfg,
            store,
        })
    }

    /// Open and start the duplex stream pair.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        self.start_stream(&mut inner)
    }

    /// Stop any open stream and close the rhythm subsystem channels.
    /// Idempotent.
    pub fn stop(&self) {
        let mut inner = self.lock();
        stop_stream(&mut inner);
        self.detector.close();
        self.rhythm.close();
        tracing::info!("audio engine stopped");
    }

    /// Switch to the next input device, restarting the stream.
    ///
    /// Returns the new device's name. When the restart fails the engine
    /// logs the error and stays stopped; the selection is still persisted.
    pub fn next_input_device(&self) -> String {
        let mut inner = self.lock();
        if inner.input_devices.is_empty() {
            return String::new();
        }

        stop_stream(&mut inner);
        inner.input_index = (inner.input_index + 1) % inner.input_devices.len();
        let name = inner.input_names[inner.input_index].clone();
        tracing::info!(device = %name, "switched input device");

        if let Err(error) = self.start_stream(&mut inner) {
            tracing::error!(%error, "failed to restart stream");
        }

        self.store.set_input_device(&name);
        name
    }

    /// Switch to the next output device, restarting the stream.
    pub fn next_output_device(&self) -> String {
        let mut inner = self.lock();
        if inner.output_devices.is_empty() {
            return String::new();
        }

        stop_stream(&mut inner);
        inner.output_index = (inner.output_index + 1) % inner.output_devices.len();
        let name = inner.output_names[inner.output_index].clone();
        tracing::info!(device = %name, "switched output device");

        if let Err(error) = self.start_stream(&mut inner) {
            tracing::error!(%error, "failed to restart stream");
        }

        self.store.set_output_device(&name);
        name
    }

    /// Name of the active input device, `"none"` without devices.
    pub fn current_input_device(&self) -> String {
        let inner = self.lock();
        if inner.input_devices.is_empty() {
            return "none".to_string();
        }
        inner.input_names[inner.input_index].clone()
    }

    /// Name of the active output device, `"none"` without devices.
    pub fn current_output_device(&self) -> String {
        let inner = self.lock();
        if inner.output_devices.is_empty() {
            return "none".to_string();
        }
        inner.output_names[inner.output_index].clone()
    }

    /// The onset detector driven by this engine's callback.
    pub fn detector(&self) -> &Arc<OnsetDetector> {
        &self.detector
    }

    /// The rhythm engine driven by this engine's callback.
    pub fn rhythm(&self) -> &Arc<RhythmEngine> {
        &self.rhythm
    }

    fn start_stream(&self, inner: &mut EngineInner) -> Result<()> {
        if inner.input_devices.is_empty() || inner.output_devices.is_empty() {
            return Err(AudioError::NoDevices);
        }

        let input_device = &inner.input_devices[inner.input_index];
        let output_device = &inner.output_devices[inner.output_index];

        tracing::info!(
            input = %inner.input_names[inner.input_index],
            output = %inner.output_names[inner.output_index],
            "using devices"
        );

        let channels = self.audio_cfg.num_channels.max(1);
        let stream_config = StreamConfig {
            channels,
            sample_rate: self.audio_cfg.sample_rate,
            buffer_size: BufferSize::Fixed(self.audio_cfg.frames_per_buffer),
        };

        // The capture ring carries input to the output callback. Sized
        // from the target latency, never under four output buffers so a
        // scheduling hiccup on one side cannot starve the other.
        let frame_samples =
            self.audio_cfg.frames_per_buffer as usize * usize::from(channels);
        let latency_samples = (self.audio_cfg.target_latency.as_secs_f64()
            * f64::from(self.audio_cfg.sample_rate)) as usize
            * usize::from(channels);
        let ring_capacity = latency_samples.max(frame_samples * 4);
        let (mut producer, mut consumer) = rtrb::RingBuffer::<f32>::new(ring_capacity);

        let input_stream = input_device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        if producer.push(sample).is_err() {
                            // Ring full: drop the remainder of this buffer.
                            break;
                        }
                    }
                },
                |err| tracing::error!(%err, "input stream error"),
                None,
            )
            .map_err(AudioError::OpenStream)?;

        let chain = Arc::clone(&self.chain);
        let detector = Arc::clone(&self.detector);
        let rhythm = Arc::clone(&self.rhythm);
        let onset_context = Arc::clone(&self.onset_context);

        let output_stream = output_device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // 1. Monitor copy: drain captured input into the output
                    //    buffer, zero-filling any shortfall.
                    let mut filled = 0;
                    while filled < data.len() {
                        match consumer.pop() {
                            Ok(sample) => {
                                data[filled] = sample;
                                filled += 1;
                            }
                            Err(_) => break,
                        }
                    }
                    data[filled..].fill(0.0);

                    // 2. Transient detection on the pre-effect signal.
                    detector.process(data);

                    // 3. Rhythm advance; publish or clear the onset snapshot.
                    if let Some(q) = rhythm.process_buffer(data.len()) {
                        onset_context.set(
                            q.original_event.energy,
                            q.beat_position,
                            q.slot_index,
                        );
                    } else {
                        onset_context.clear();
                    }

                    // 4. Effect chain mutates the buffer in place.
                    chain.process(data);
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(AudioError::OpenStream)?;

        input_stream.play().map_err(AudioError::StartStream)?;
        output_stream.play().map_err(AudioError::StartStream)?;

        inner.streams = Some(StreamPair {
            _input: input_stream,
            _output: output_stream,
        });

        tracing::info!(
            sample_rate = self.audio_cfg.sample_rate,
            frames_per_buffer = self.audio_cfg.frames_per_buffer,
            "audio engine started"
        );
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stop_stream(inner: &mut EngineInner) {
    if inner.streams.take().is_some() {
        tracing::debug!("stream stopped");
    }
}

fn restore_saved_device(saved: &str, names: &[String], index: &mut usize, role: &str) {
    if saved.is_empty() {
        return;
    }
    match names.iter().position(|n| n == saved) {
        Some(idx) => {
            *index = idx;
            tracing::info!(device = saved, role, "restored saved device");
        }
        None => {
            let fallback = names.get(*index).map_or("none", |n| n.as_str());
            tracing::warn!(saved, using = fallback, role, "saved device not found, using default");
        }
    }
}
