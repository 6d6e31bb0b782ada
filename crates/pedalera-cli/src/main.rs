//! Pedalera - a terminal guitar rig.
//!
//! Wires the subsystems leaves-first: config store → onset detector →
//! rhythm engine → effect chain → preset manager → audio engine → TUI.

mod devices;
mod logging;
mod tui;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use pedalera_config::{ConfigStore, PresetManager, spawn_saver};
use pedalera_core::{SharedOnsetContext, Subdivision};
use pedalera_effects::Chain;
use pedalera_io::AudioEngine;
use pedalera_rhythm::{DetectorConfig, OnsetDetector, RhythmEngine, RhythmEngineConfig};

#[derive(Parser)]
#[command(name = "pedalera")]
#[command(author, version, about = "Terminal guitar rig", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio devices
    Devices,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Devices) => devices::run(),
        None => run_rig(),
    }
}

fn run_rig() -> anyhow::Result<()> {
    let (store, save_signals) = ConfigStore::load()?;
    logging::init(store.logger())?;
    let saver = spawn_saver(Arc::clone(&store), save_signals);

    let result = run_with_store(&store);

    // The saver drains any pending signal before honoring the shutdown.
    store.shutdown();
    let _ = saver.join();
    result
}

fn run_with_store(store: &Arc<ConfigStore>) -> anyhow::Result<()> {
    let state = store.state();
    let sample_rate = store.audio().sample_rate as f32;
    let onset_context = Arc::new(SharedOnsetContext::new());

    let (detector, onset_events) = OnsetDetector::new(DetectorConfig::new(sample_rate));
    let detector = Arc::new(detector);

    let rhythm_store = Arc::clone(store);
    let (rhythm, quantized) = RhythmEngine::new(
        RhythmEngineConfig {
            sample_rate,
            initial_bpm: state.rhythm_bpm,
            subdivision: Subdivision::from_u32(state.rhythm_subdivision),
            on_state_change: Some(Box::new(move |bpm, subdivision| {
                rhythm_store.set_rhythm(bpm, subdivision);
            })),
        },
        onset_events,
    );
    let rhythm = Arc::new(rhythm);

    let chain_store = Arc::clone(store);
    let chain = Arc::new(Chain::new(
        store.effects().effects_dir.clone(),
        state.effects_enabled,
        Arc::clone(&onset_context),
        Some(Box::new(move |enabled| {
            chain_store.set_effects_enabled(enabled);
        })),
    ));

    let registry_chain = Arc::clone(&chain);
    let applied_chain = Arc::clone(&chain);
    let presets = Arc::new(PresetManager::new(
        Arc::clone(store),
        Box::new(move || registry_chain.available_effect_names()),
        Box::new(move |names: &[String]| applied_chain.set_preset_chain(names)),
    ));

    // Materialize the active preset before audio starts.
    if let Some(preset) = presets.get_active_preset() {
        chain.set_preset_chain(&preset.effect_chain);
    }

    let engine = Arc::new(AudioEngine::new(
        Arc::clone(&chain),
        detector,
        Arc::clone(&rhythm),
        onset_context,
        Arc::clone(store),
    )?);
    engine.start()?;

    let result = tui::run(chain, Arc::clone(&engine), presets, quantized);

    engine.stop();
    result
}
