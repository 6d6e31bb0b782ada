//! Config round-trips and preset-set properties against real files.

use std::path::PathBuf;
use std::time::Duration;

use pedalera_config::{
    AudioConfig, EffectsConfig, LoggerConfig, Preset, PresetsConfig, RawConfig, StateConfig,
    strip_comments,
};
use proptest::prelude::*;

fn full_config() -> RawConfig {
    RawConfig {
        audio: Some(AudioConfig {
            sample_rate: 48000,
            frames_per_buffer: 128,
            num_channels: 1,
            target_latency: Duration::from_millis(12),
        }),
        logger: Some(LoggerConfig {
            max_log_files: 10,
            logs_dir: PathBuf::from("/tmp/pedalera-logs"),
            buffer_size: 64 * 1024,
            flush_interval: Duration::from_secs(2),
            level: "debug".to_string(),
        }),
        effects: Some(EffectsConfig {
            effects_dir: PathBuf::from("./fx"),
        }),
        state: Some(StateConfig {
            input_device: "Scarlett 2i2".to_string(),
            output_device: "Built-in Output".to_string(),
            effects_enabled: false,
            rhythm_bpm: 96.5,
            rhythm_subdivision: 16,
        }),
        presets: Some(PresetsConfig {
            presets: vec![
                Preset {
                    name: "Clean".to_string(),
                    effect_chain: vec![],
                },
                Preset {
                    name: "Lead".to_string(),
                    effect_chain: vec!["drive".to_string(), "echo".to_string()],
                },
            ],
            active_preset: "Lead".to_string(),
        }),
    }
}

#[test]
fn nested_config_round_trips() {
    let original = full_config();

    let json = serde_json::to_string_pretty(&original).unwrap();
    let reloaded: RawConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(original, reloaded);

    // A second serialization is byte-identical: key ordering is stable.
    let json_again = serde_json::to_string_pretty(&reloaded).unwrap();
    assert_eq!(json, json_again);
}

#[test]
fn jsonc_round_trips_through_comment_stripping() {
    let original = full_config();
    let json = serde_json::to_string_pretty(&original).unwrap();

    let commented = format!(
        "// pedalera rig config\n{}\n/* trailing\n   notes */\n",
        json
    );
    let reloaded: RawConfig =
        serde_json::from_str(&strip_comments(&commented)).unwrap();
    assert_eq!(original, reloaded);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any sequence of add/remove/reorder list operations, a preset's
    /// chain stays consistent with the same operations applied to a plain
    /// vector.
    #[test]
    fn preset_chain_matches_reference_vec(
        ops in prop::collection::vec((0u8..3, 0usize..8, 0usize..8), 0..40),
    ) {
        use pedalera_config::{ConfigStore, PresetManager};
        use std::sync::Arc;

        let (store, _signals) = ConfigStore::from_raw(RawConfig::default(), None);
        let manager = PresetManager::new(
            Arc::clone(&store),
            Box::new(|| Vec::new()),
            Box::new(|_chain: &[String]| {}),
        );
        manager.create_preset("P", vec![]).unwrap();

        let mut reference: Vec<String> = Vec::new();
        let mut counter = 0usize;

        for (op, a, b) in ops {
            match op {
                // Insert a fresh name at position `a` (appends out of range).
                0 => {
                    let name = format!("e{counter}");
                    counter += 1;
                    manager.add_effect_to_preset("P", &name, a).unwrap();
                    if a < reference.len() {
                        reference.insert(a, name);
                    } else {
                        reference.push(name);
                    }
                }
                // Remove by name, when that index exists.
                1 => {
                    if a < reference.len() {
                        let name = reference[a].clone();
                        manager.remove_effect_from_preset("P", &name).unwrap();
                        reference.retain(|n| n != &name);
                    }
                }
                // Reorder when both indices are valid. The target index
                // drops by one when it sat past the removed slot.
                _ => {
                    if a < reference.len() && b < reference.len() {
                        manager.reorder_effect_in_preset("P", a, b).unwrap();
                        let moved = reference.remove(a);
                        let at = if b > a { b - 1 } else { b };
                        reference.insert(at, moved);
                    }
                }
            }

            let chain = manager.get_preset("P").unwrap().effect_chain;
            prop_assert_eq!(&chain, &reference);
        }
    }
}
