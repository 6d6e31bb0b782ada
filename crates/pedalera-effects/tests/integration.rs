//! Loader behavior against real directories.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pedalera_core::{Effect, OnsetContext, SharedOnsetContext};
use pedalera_effects::{Chain, EffectError, load_effects_dir};
use proptest::prelude::*;
use tempfile::TempDir;

fn write_effect(dir: &Path, file: &str, name: &str, expr: &str) {
    fs::write(
        dir.join(file),
        format!("name = \"{name}\"\nprocess = {expr}\n"),
    )
    .unwrap();
}

#[test]
fn missing_directory_yields_empty_registry() {
    let registry = load_effects_dir(Path::new("/definitely/not/here/pedalera")).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn loads_recursively_and_sorts_names() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("nested/deep")).unwrap();

    write_effect(dir.path(), "z.fx", "zeta", "x");
    write_effect(&dir.path().join("nested"), "m.fx", "mid", "x * 2");
    write_effect(&dir.path().join("nested/deep"), "a.fx", "alpha", "x + 1");

    let registry = load_effects_dir(dir.path()).unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.names(), ["alpha", "mid", "zeta"]);
}

#[test]
fn non_effect_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_effect(dir.path(), "real.fx", "real", "x");
    fs::write(dir.path().join("notes.txt"), "name = \"fake\"").unwrap();
    fs::write(dir.path().join("script.sh"), "echo hi").unwrap();

    let registry = load_effects_dir(dir.path()).unwrap();
    assert_eq!(registry.names(), ["real"]);
}

#[test]
fn malformed_files_are_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    write_effect(dir.path(), "good.fx", "good", "x");
    fs::write(dir.path().join("broken.fx"), "process = frob(").unwrap();

    let registry = load_effects_dir(dir.path()).unwrap();
    assert_eq!(registry.names(), ["good"]);
}

#[test]
fn duplicate_names_abort_with_no_partial_registry() {
    let dir = TempDir::new().unwrap();
    write_effect(dir.path(), "one.fx", "same", "x");
    write_effect(dir.path(), "two.fx", "same", "x * 2");
    write_effect(dir.path(), "other.fx", "other", "x");

    let err = load_effects_dir(dir.path()).unwrap_err();
    match err {
        EffectError::DuplicateName(name) => assert_eq!(name, "same"),
        other => panic!("expected DuplicateName, got {other}"),
    }
}

#[test]
fn loaded_effects_read_the_onset_context() {
    let dir = TempDir::new().unwrap();
    write_effect(dir.path(), "duck.fx", "duck", "x * (1 - onset * onset_energy)");

    let ctx = Arc::new(SharedOnsetContext::new());
    let chain = Chain::new(dir.path(), true, Arc::clone(&ctx), None);
    chain.set_preset_chain(&["duck".into()]);

    let mut buf = [1.0f32; 4];
    chain.process(&mut buf);
    assert_eq!(buf, [1.0; 4]);

    ctx.set(0.5, 0.25, 1);
    chain.process(&mut buf);
    for s in buf {
        assert!((s - 0.5).abs() < 1e-6);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A directory of N well-formed, uniquely named effects loads to a
    /// registry of exactly N lex-sorted names.
    #[test]
    fn well_formed_unique_effects_all_load(count in 1usize..20) {
        let dir = TempDir::new().unwrap();
        let mut expected: Vec<String> = Vec::new();

        for i in 0..count {
            let name = format!("effect{i:02}");
            write_effect(dir.path(), &format!("{name}.fx"), &name, "x");
            expected.push(name);
        }
        expected.sort();

        let registry = load_effects_dir(dir.path()).unwrap();
        prop_assert_eq!(registry.len(), count);
        prop_assert_eq!(registry.names(), expected);
    }

    /// Loaded programs stay finite for finite inputs.
    #[test]
    fn drive_effect_output_is_finite(x in -4.0f32..4.0) {
        let dir = TempDir::new().unwrap();
        write_effect(
            dir.path(),
            "drive.fx",
            "drive",
            "clamp(tanh(x * 6.0) * 0.8, -1, 1)",
        );

        let registry = load_effects_dir(dir.path()).unwrap();
        let effect = registry.get("drive").unwrap();
        let mut buf = [x];
        effect.process(&mut buf, &OnsetContext::default());
        prop_assert!(buf[0].is_finite());
        prop_assert!((-1.0..=1.0).contains(&buf[0]));
    }
}
