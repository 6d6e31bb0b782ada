//! The runtime effect chain applied inside the audio callback.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use pedalera_core::{Effect, SharedOnsetContext};

use crate::error::EffectError;
use crate::loader::{EffectRegistry, ScriptEffect, load_effects_dir};

/// Called with the new value whenever the bypass flag is toggled, so the
/// caller can arrange persistence.
pub type EnabledChangeFn = Box<dyn Fn(bool) + Send + Sync>;

/// One entry of the active chain as reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectInfo {
    /// Effect display name.
    pub name: String,
    /// Whether the name resolved against the current registry.
    pub available: bool,
}

struct ChainInner {
    registry: EffectRegistry,
    active: Vec<Arc<ScriptEffect>>,
    /// The preset's name list as last applied; `reload` re-resolves it
    /// against the fresh registry.
    active_names: Vec<String>,
}

/// Ordered, toggleable pipeline of effects.
///
/// The audio thread calls [`process`](Self::process) under a read lock;
/// the UI thread takes the write lock for reload and preset changes.
/// Writer contention is rare, which keeps the callback from waiting in
/// practice.
pub struct Chain {
    inner: RwLock<ChainInner>,
    enabled: AtomicBool,
    effects_dir: PathBuf,
    onset_context: Arc<SharedOnsetContext>,
    on_enabled_change: Option<EnabledChangeFn>,
}

impl Chain {
    /// Build a chain, loading the registry from `effects_dir`.
    ///
    /// A load failure is logged and leaves the registry empty; the rig
    /// still runs, passing audio through untouched.
    pub fn new(
        effects_dir: impl Into<PathBuf>,
        enabled: bool,
        onset_context: Arc<SharedOnsetContext>,
        on_enabled_change: Option<EnabledChangeFn>,
    ) -> Self {
        let effects_dir = effects_dir.into();

        let registry = match load_effects_dir(&effects_dir) {
            Ok(registry) => {
                tracing::info!(effects = ?registry.names(), "effects loaded");
                registry
            }
            Err(error) => {
                tracing::error!(%error, "failed to load effects");
                EffectRegistry::new()
            }
        };

        Self {
            inner: RwLock::new(ChainInner {
                registry,
                active: Vec::new(),
                active_names: Vec::new(),
            }),
            enabled: AtomicBool::new(enabled),
            effects_dir,
            onset_context,
            on_enabled_change,
        }
    }

    /// Apply the chain to one buffer. A disabled chain returns untouched.
    pub fn process(&self, samples: &mut [f32]) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.active.is_empty() {
            return;
        }

        // One snapshot per buffer; every effect sees the same context.
        let ctx = self.onset_context.get();
        for effect in &inner.active {
            effect.process(samples, &ctx);
        }
    }

    /// Reload the registry from disk and re-resolve the active preset
    /// chain against it.
    ///
    /// Fails only on directory-walk or duplicate-name errors; the previous
    /// registry stays active in that case.
    pub fn reload(&self) -> Result<(), EffectError> {
        tracing::debug!("reloading effects from disk");
        let registry = load_effects_dir(&self.effects_dir)?;
        tracing::info!(effects = ?registry.names(), "effects loaded");

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.registry = registry;
        let names = inner.active_names.clone();
        resolve_chain(&mut inner, &names);
        Ok(())
    }

    /// Replace the active chain with `names` resolved against the current
    /// registry. Unknown names are dropped (queryable through
    /// [`missing_effects_for`](Self::missing_effects_for)).
    pub fn set_preset_chain(&self, names: &[String]) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        resolve_chain(&mut inner, names);
        tracing::debug!("chain updated from preset");
    }

    /// Invert the bypass flag, notify the persistence hook, and return the
    /// new value.
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_not(Ordering::AcqRel);
        tracing::debug!(enabled, "chain toggled");
        if let Some(callback) = &self.on_enabled_change {
            callback(enabled);
        }
        enabled
    }

    /// Whether the chain is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Whether the materialized chain holds at least one effect.
    pub fn has_active_effects(&self) -> bool {
        !self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .is_empty()
    }

    /// All loadable effect names, lexicographically sorted.
    pub fn available_effect_names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .registry
            .names()
    }

    /// The materialized chain in order.
    pub fn active_chain_info(&self) -> Vec<EffectInfo> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .iter()
            .map(|effect| EffectInfo {
                name: effect.name().to_string(),
                available: true,
            })
            .collect()
    }

    /// Names from `names` that do not resolve against the registry.
    pub fn missing_effects_for(&self, names: &[String]) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        names
            .iter()
            .filter(|name| inner.registry.get(name).is_none())
            .cloned()
            .collect()
    }
}

fn resolve_chain(inner: &mut ChainInner, names: &[String]) {
    let mut active = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match inner.registry.get(name) {
            Some(effect) => active.push(effect),
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        tracing::warn!(?missing, "preset has missing effects");
    }

    inner.active = active;
    inner.active_names = names.to_vec();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn write_effect(dir: &std::path::Path, file: &str, name: &str, expr: &str) {
        fs::write(
            dir.join(file),
            format!("name = \"{name}\"\nprocess = {expr}\n"),
        )
        .unwrap();
    }

    fn add_chain_fixture() -> (TempDir, Chain) {
        let dir = TempDir::new().unwrap();
        write_effect(dir.path(), "a.fx", "A", "x + 0.1");
        write_effect(dir.path(), "b.fx", "B", "x + 0.1");
        write_effect(dir.path(), "c.fx", "C", "x + 0.1");

        let chain = Chain::new(dir.path(), true, Arc::new(SharedOnsetContext::new()), None);
        (dir, chain)
    }

    #[test]
    fn enabled_chain_applies_effects_in_order() {
        let (_dir, chain) = add_chain_fixture();
        chain.set_preset_chain(&["A".into(), "B".into(), "C".into()]);

        let mut buf = [0.0f32; 4];
        chain.process(&mut buf);
        for s in buf {
            assert!((s - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn toggled_off_chain_is_a_hard_bypass() {
        let (_dir, chain) = add_chain_fixture();
        chain.set_preset_chain(&["A".into(), "B".into(), "C".into()]);

        assert!(!chain.toggle());
        assert!(!chain.is_enabled());

        let mut buf = [0.0f32; 4];
        chain.process(&mut buf);
        assert_eq!(buf, [0.0; 4]);

        assert!(chain.toggle());
        assert!(chain.is_enabled());
    }

    #[test]
    fn toggle_notifies_persistence_hook() {
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let dir = TempDir::new().unwrap();
        let chain = Chain::new(
            dir.path(),
            true,
            Arc::new(SharedOnsetContext::new()),
            Some(Box::new(move |enabled| {
                sink.lock().unwrap().push(enabled);
            })),
        );

        chain.toggle();
        chain.toggle();
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn missing_effects_are_dropped_not_fatal() {
        let (_dir, chain) = add_chain_fixture();
        // Registry holds A and C for this preset; B is unknown.
        chain.set_preset_chain(&["A".into(), "missing".into(), "C".into()]);

        let info = chain.active_chain_info();
        let names: Vec<_> = info.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);

        let missing = chain.missing_effects_for(&[
            "A".into(),
            "missing".into(),
            "C".into(),
        ]);
        assert_eq!(missing, vec!["missing".to_string()]);

        // Playback is not interrupted.
        let mut buf = [0.0f32; 2];
        chain.process(&mut buf);
        for s in buf {
            assert!((s - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn reload_reresolves_the_applied_preset() {
        let (dir, chain) = add_chain_fixture();
        chain.set_preset_chain(&["A".into(), "D".into()]);
        assert_eq!(chain.active_chain_info().len(), 1);

        // A new effect file appears on disk under the applied name.
        write_effect(dir.path(), "d.fx", "D", "x * 2");
        chain.reload().unwrap();

        let names: Vec<_> = chain
            .active_chain_info()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["A", "D"]);
    }

    #[test]
    fn reload_failure_keeps_previous_registry() {
        let (dir, chain) = add_chain_fixture();
        assert_eq!(chain.available_effect_names(), ["A", "B", "C"]);

        // Introduce a duplicate display name; the reload must fail whole.
        write_effect(dir.path(), "dup.fx", "A", "x");
        assert!(matches!(
            chain.reload(),
            Err(EffectError::DuplicateName(_))
        ));
        assert_eq!(chain.available_effect_names(), ["A", "B", "C"]);
    }

    #[test]
    fn empty_names_empty_chain() {
        let (_dir, chain) = add_chain_fixture();
        chain.set_preset_chain(&[]);
        assert!(!chain.has_active_effects());
    }
}
