//! Effect-file loading and the name-keyed registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pedalera_core::{Effect, OnsetContext};
use walkdir::WalkDir;

use crate::dsl::{Program, parse_effect_source};
use crate::error::EffectError;

/// File extension recognized as an effect source file.
pub const EFFECT_EXTENSION: &str = "fx";

/// An effect compiled from a `.fx` source file.
///
/// Value-immutable after load; parameters are baked into the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEffect {
    name: String,
    program: Program,
}

impl ScriptEffect {
    /// Compile an effect from source text.
    pub fn from_source(source: &str) -> Result<Self, crate::dsl::DslError> {
        let parsed = parse_effect_source(source)?;
        Ok(Self {
            name: parsed.name,
            program: parsed.program,
        })
    }
}

impl Effect for ScriptEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, samples: &mut [f32], ctx: &OnsetContext) {
        for s in samples.iter_mut() {
            *s = self.program.eval(*s, ctx);
        }
    }
}

/// Name-keyed set of loaded effects.
///
/// Backed by a `BTreeMap` so iteration is lexicographic by name.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    effects: BTreeMap<String, Arc<ScriptEffect>>,
}

impl EffectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an effect by display name.
    pub fn get(&self, name: &str) -> Option<Arc<ScriptEffect>> {
        self.effects.get(name).cloned()
    }

    /// All effect names, lexicographically sorted.
    pub fn names(&self) -> Vec<String> {
        self.effects.keys().cloned().collect()
    }

    /// Number of loaded effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether the registry holds no effects.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Load one effect file.
pub fn load_effect_file(path: &Path) -> Result<ScriptEffect, EffectError> {
    let source = fs::read_to_string(path).map_err(|e| EffectError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    ScriptEffect::from_source(&source).map_err(|e| EffectError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Recursively load every `.fx` file under `dir` into a fresh registry.
///
/// A missing directory yields an empty registry. Files that fail to read
/// or parse are skipped with a warning. A duplicate display name aborts
/// the whole load.
pub fn load_effects_dir(dir: &Path) -> Result<EffectRegistry, EffectError> {
    let mut registry = EffectRegistry::new();

    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "effects directory missing, registry empty");
        return Ok(registry);
    }

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| EffectError::WalkDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EFFECT_EXTENSION) {
            continue;
        }

        let effect = match load_effect_file(path) {
            Ok(effect) => effect,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping effect file");
                continue;
            }
        };

        let name = effect.name().to_string();
        if registry.effects.contains_key(&name) {
            return Err(EffectError::DuplicateName(name));
        }
        registry.effects.insert(name, Arc::new(effect));
    }

    Ok(registry)
}
