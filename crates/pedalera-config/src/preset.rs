//! Preset management: the named chain sets and the active pointer.
//!
//! The manager owns no audio state. It mutates the preset section of the
//! [`ConfigStore`] and drives the runtime chain through the injected
//! `on_preset_changed` callback whenever the active preset's effect list
//! changes. Effect availability is resolved through the injected
//! `available_effects` callback.

use std::sync::Arc;

use crate::error::ConfigError;
use crate::store::ConfigStore;
use crate::types::Preset;

/// Returns the names of all loadable effects.
pub type AvailableEffectsFn = Box<dyn Fn() -> Vec<String> + Send + Sync>;

/// Receives the active preset's new effect list.
pub type PresetChangedFn = Box<dyn Fn(&[String]) + Send + Sync>;

/// One chain entry with its availability against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectStatus {
    /// Effect name as stored in the preset.
    pub name: String,
    /// Whether the effect is currently loadable.
    pub available: bool,
}

/// A preset with per-effect availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetStatus {
    /// Preset name.
    pub name: String,
    /// Chain entries in order.
    pub effect_chain: Vec<EffectStatus>,
    /// Number of unavailable effects.
    pub missing_count: usize,
    /// Names of the unavailable effects.
    pub missing_effects: Vec<String>,
}

/// Authority over the preset set and the active-preset pointer.
pub struct PresetManager {
    store: Arc<ConfigStore>,
    available_effects: AvailableEffectsFn,
    on_preset_changed: PresetChangedFn,
}

impl PresetManager {
    /// Build a manager over the store's preset section.
    pub fn new(
        store: Arc<ConfigStore>,
        available_effects: AvailableEffectsFn,
        on_preset_changed: PresetChangedFn,
    ) -> Self {
        Self {
            store,
            available_effects,
            on_preset_changed,
        }
    }

    /// Activate the named preset; drives the chain on success.
    pub fn set_active_preset(&self, name: &str) -> Result<(), ConfigError> {
        let chain = self.store.update_presets(|presets| {
            let preset = presets
                .get_preset(name)
                .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
            let chain = preset.effect_chain.clone();
            presets.active_preset = name.to_string();
            Ok(chain)
        })?;

        (self.on_preset_changed)(&chain);
        tracing::info!(preset = name, "active preset changed");
        Ok(())
    }

    /// Create a new preset; fails on a duplicate name.
    pub fn create_preset(&self, name: &str, chain: Vec<String>) -> Result<(), ConfigError> {
        self.store.update_presets(|presets| {
            if presets.get_preset(name).is_some() {
                return Err(ConfigError::PresetExists(name.to_string()));
            }
            presets.presets.push(Preset {
                name: name.to_string(),
                effect_chain: chain,
            });
            Ok(())
        })?;

        tracing::info!(preset = name, "preset created");
        Ok(())
    }

    /// Guarantee an active preset exists.
    ///
    /// With no presets at all, creates and activates an empty `"Default"`
    /// and returns `true`. With presets but no active pointer, activates
    /// the first. Returns `false` otherwise.
    pub fn ensure_active_preset(&self) -> Result<bool, ConfigError> {
        let (created, chain) = self.store.update_presets(|presets| {
            if presets.presets.is_empty() {
                presets.presets.push(Preset {
                    name: "Default".to_string(),
                    effect_chain: Vec::new(),
                });
                presets.active_preset = "Default".to_string();
                return Ok((true, Some(Vec::new())));
            }

            if presets.active_preset.is_empty() {
                let first = presets.presets[0].clone();
                presets.active_preset = first.name;
                return Ok((false, Some(first.effect_chain)));
            }

            Ok((false, None))
        })?;

        if let Some(chain) = chain {
            (self.on_preset_changed)(&chain);
        }
        if created {
            tracing::info!("created default preset");
        }
        Ok(created)
    }

    /// Replace a preset's whole chain.
    pub fn update_preset_chain(&self, name: &str, chain: Vec<String>) -> Result<(), ConfigError> {
        let active_changed = self.store.update_presets(|presets| {
            let active = presets.active_preset == name;
            let preset = presets
                .get_preset_mut(name)
                .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
            preset.effect_chain = chain.clone();
            Ok(active)
        })?;

        if active_changed {
            (self.on_preset_changed)(&chain);
        }
        Ok(())
    }

    /// Insert an effect into a preset's chain.
    ///
    /// A `position` outside `[0, len)` appends; otherwise the effect is
    /// inserted at that index, shifting the tail.
    pub fn add_effect_to_preset(
        &self,
        name: &str,
        effect: &str,
        position: usize,
    ) -> Result<(), ConfigError> {
        self.mutate_chain(name, |chain| {
            if position < chain.len() {
                chain.insert(position, effect.to_string());
            } else {
                chain.push(effect.to_string());
            }
            Ok(())
        })
    }

    /// Remove every occurrence of an effect from a preset's chain.
    pub fn remove_effect_from_preset(&self, name: &str, effect: &str) -> Result<(), ConfigError> {
        self.mutate_chain(name, |chain| {
            chain.retain(|entry| entry != effect);
            Ok(())
        })
    }

    /// Move the effect at `from` to `to`.
    ///
    /// The effect is removed at `from`; when `to > from` the target index
    /// is decremented by one to account for the removal, then the effect
    /// is inserted at `to`. Out-of-range indices fail.
    pub fn reorder_effect_in_preset(
        &self,
        name: &str,
        from: usize,
        to: usize,
    ) -> Result<(), ConfigError> {
        self.mutate_chain(name, |chain| {
            if from >= chain.len() || to >= chain.len() {
                return Err(ConfigError::PresetInvalidIndex {
                    from,
                    to,
                    len: chain.len(),
                });
            }
            let effect = chain.remove(from);
            let insert_at = if to > from { to - 1 } else { to };
            chain.insert(insert_at, effect);
            Ok(())
        })
    }

    /// Delete a preset.
    ///
    /// Deleting the active preset activates the first remaining preset, or
    /// clears the active pointer when none remain; the chain is driven
    /// either way.
    pub fn delete_preset(&self, name: &str) -> Result<(), ConfigError> {
        let new_chain = self.store.update_presets(|presets| {
            let was_active = presets.active_preset == name;

            let index = presets
                .presets
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
            presets.presets.remove(index);

            if !was_active {
                return Ok(None);
            }

            if let Some(first) = presets.presets.first() {
                presets.active_preset = first.name.clone();
                Ok(Some(first.effect_chain.clone()))
            } else {
                presets.active_preset = String::new();
                Ok(Some(Vec::new()))
            }
        })?;

        if let Some(chain) = new_chain {
            (self.on_preset_changed)(&chain);
        }
        Ok(())
    }

    /// The active preset, if the pointer names one.
    pub fn get_active_preset(&self) -> Option<Preset> {
        self.store
            .read_presets(|presets| presets.active_preset_config().cloned())
    }

    /// Name of the active preset ("" = none).
    pub fn get_active_preset_name(&self) -> String {
        self.store.read_presets(|presets| presets.active_preset.clone())
    }

    /// Status of the active preset with per-effect availability.
    pub fn get_active_preset_status(&self) -> Option<PresetStatus> {
        let preset = self.get_active_preset()?;
        Some(self.status_for(&preset))
    }

    /// Status of every preset, in definition order.
    pub fn get_all_presets_status(&self) -> Vec<PresetStatus> {
        let presets = self.store.read_presets(|presets| presets.presets.clone());
        presets.iter().map(|p| self.status_for(p)).collect()
    }

    /// All preset names, in definition order.
    pub fn get_preset_names(&self) -> Vec<String> {
        self.store
            .read_presets(|presets| presets.presets.iter().map(|p| p.name.clone()).collect())
    }

    /// A preset by name.
    pub fn get_preset(&self, name: &str) -> Option<Preset> {
        self.store
            .read_presets(|presets| presets.get_preset(name).cloned())
    }

    /// Whether any presets exist.
    pub fn has_presets(&self) -> bool {
        self.store.read_presets(|presets| !presets.presets.is_empty())
    }

    /// Names of all loadable effects, from the injected callback.
    pub fn get_available_effects(&self) -> Vec<String> {
        (self.available_effects)()
    }

    fn status_for(&self, preset: &Preset) -> PresetStatus {
        let available = self.get_available_effects();

        let mut status = PresetStatus {
            name: preset.name.clone(),
            effect_chain: Vec::with_capacity(preset.effect_chain.len()),
            missing_count: 0,
            missing_effects: Vec::new(),
        };

        for effect_name in &preset.effect_chain {
            let is_available = available.iter().any(|a| a == effect_name);
            status.effect_chain.push(EffectStatus {
                name: effect_name.clone(),
                available: is_available,
            });
            if !is_available {
                status.missing_count += 1;
                status.missing_effects.push(effect_name.clone());
            }
        }

        status
    }

    /// Mutate one preset's chain; drives the runtime chain when the preset
    /// is the active one.
    fn mutate_chain(
        &self,
        name: &str,
        f: impl FnOnce(&mut Vec<String>) -> Result<(), ConfigError>,
    ) -> Result<(), ConfigError> {
        let active_chain = self.store.update_presets(|presets| {
            let active = presets.active_preset == name;
            let preset = presets
                .get_preset_mut(name)
                .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
            f(&mut preset.effect_chain)?;
            Ok(active.then(|| preset.effect_chain.clone()))
        })?;

        if let Some(chain) = active_chain {
            (self.on_preset_changed)(&chain);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConfigStore;
    use crate::types::RawConfig;
    use std::sync::Mutex;

    type ChainLog = Arc<Mutex<Vec<Vec<String>>>>;

    fn manager() -> (PresetManager, ChainLog) {
        let (store, _signals) = ConfigStore::from_raw(RawConfig::default(), None);
        let log: ChainLog = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        let manager = PresetManager::new(
            store,
            Box::new(|| vec!["drive".to_string(), "echo".to_string()]),
            Box::new(move |chain: &[String]| {
                sink.lock().unwrap().push(chain.to_vec());
            }),
        );
        (manager, log)
    }

    fn chain_of(manager: &PresetManager, name: &str) -> Vec<String> {
        manager.get_preset(name).unwrap().effect_chain
    }

    #[test]
    fn create_and_activate() {
        let (manager, log) = manager();

        manager
            .create_preset("Lead", vec!["drive".into()])
            .unwrap();
        assert!(matches!(
            manager.create_preset("Lead", vec![]),
            Err(ConfigError::PresetExists(_))
        ));

        manager.set_active_preset("Lead").unwrap();
        assert_eq!(manager.get_active_preset_name(), "Lead");
        assert_eq!(log.lock().unwrap().last().unwrap(), &["drive".to_string()]);

        assert!(matches!(
            manager.set_active_preset("Ghost"),
            Err(ConfigError::PresetNotFound(_))
        ));
    }

    #[test]
    fn ensure_active_creates_default_once() {
        let (manager, _log) = manager();

        assert!(manager.ensure_active_preset().unwrap());
        assert_eq!(manager.get_active_preset_name(), "Default");
        assert!(manager.get_active_preset().unwrap().effect_chain.is_empty());

        // Second call: presets exist and one is active.
        assert!(!manager.ensure_active_preset().unwrap());
    }

    #[test]
    fn ensure_active_adopts_first_preset() {
        let (manager, _log) = manager();
        manager.create_preset("One", vec![]).unwrap();
        manager.create_preset("Two", vec![]).unwrap();

        assert!(!manager.ensure_active_preset().unwrap());
        assert_eq!(manager.get_active_preset_name(), "One");
    }

    #[test]
    fn add_effect_positions() {
        let (manager, _log) = manager();
        manager
            .create_preset("P", vec!["a".into(), "b".into()])
            .unwrap();

        // In-range inserts, out-of-range appends.
        manager.add_effect_to_preset("P", "x", 1).unwrap();
        assert_eq!(chain_of(&manager, "P"), ["a", "x", "b"]);

        manager.add_effect_to_preset("P", "y", 99).unwrap();
        assert_eq!(chain_of(&manager, "P"), ["a", "x", "b", "y"]);
    }

    #[test]
    fn remove_effect_drops_all_occurrences() {
        let (manager, _log) = manager();
        manager
            .create_preset("P", vec!["a".into(), "b".into(), "a".into()])
            .unwrap();

        manager.remove_effect_from_preset("P", "a").unwrap();
        assert_eq!(chain_of(&manager, "P"), ["b"]);
    }

    #[test]
    fn reorder_adjusts_target_index_for_the_removal() {
        let (manager, _log) = manager();
        manager
            .create_preset(
                "P",
                vec!["A".into(), "B".into(), "C".into(), "D".into()],
            )
            .unwrap();

        // to > from: the target index shifts down once the source is out.
        manager.reorder_effect_in_preset("P", 0, 3).unwrap();
        assert_eq!(chain_of(&manager, "P"), ["B", "C", "A", "D"]);

        // to < from: the target index is used as-is.
        manager.reorder_effect_in_preset("P", 2, 0).unwrap();
        assert_eq!(chain_of(&manager, "P"), ["A", "B", "C", "D"]);

        assert!(matches!(
            manager.reorder_effect_in_preset("P", 0, 4),
            Err(ConfigError::PresetInvalidIndex { .. })
        ));
    }

    #[test]
    fn edits_to_the_active_preset_drive_the_chain() {
        let (manager, log) = manager();
        manager.create_preset("P", vec!["a".into()]).unwrap();
        manager.create_preset("Q", vec!["q".into()]).unwrap();
        manager.set_active_preset("P").unwrap();
        log.lock().unwrap().clear();

        // Active preset edits propagate...
        manager.add_effect_to_preset("P", "b", 99).unwrap();
        assert_eq!(
            log.lock().unwrap().last().unwrap(),
            &["a".to_string(), "b".to_string()]
        );

        // ...inactive preset edits do not.
        manager.add_effect_to_preset("Q", "z", 0).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn delete_active_activates_first_remaining() {
        let (manager, log) = manager();
        manager.create_preset("One", vec!["a".into()]).unwrap();
        manager.create_preset("Two", vec!["b".into()]).unwrap();
        manager.set_active_preset("Two").unwrap();
        log.lock().unwrap().clear();

        manager.delete_preset("Two").unwrap();
        assert_eq!(manager.get_active_preset_name(), "One");
        assert_eq!(log.lock().unwrap().last().unwrap(), &["a".to_string()]);

        manager.delete_preset("One").unwrap();
        assert_eq!(manager.get_active_preset_name(), "");
        assert!(log.lock().unwrap().last().unwrap().is_empty());
        assert!(!manager.has_presets());
    }

    #[test]
    fn delete_inactive_keeps_active_pointer() {
        let (manager, log) = manager();
        manager.create_preset("One", vec![]).unwrap();
        manager.create_preset("Two", vec![]).unwrap();
        manager.set_active_preset("One").unwrap();
        log.lock().unwrap().clear();

        manager.delete_preset("Two").unwrap();
        assert_eq!(manager.get_active_preset_name(), "One");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn status_reports_missing_effects() {
        let (manager, _log) = manager();
        manager
            .create_preset(
                "P",
                vec!["drive".into(), "ghost".into(), "echo".into()],
            )
            .unwrap();
        manager.set_active_preset("P").unwrap();

        let status = manager.get_active_preset_status().unwrap();
        assert_eq!(status.missing_count, 1);
        assert_eq!(status.missing_effects, vec!["ghost".to_string()]);
        assert_eq!(status.effect_chain.len(), 3);
        assert!(status.effect_chain[0].available);
        assert!(!status.effect_chain[1].available);

        let all = manager.get_all_presets_status();
        assert_eq!(all.len(), 1);
        assert_eq!(manager.get_preset_names(), vec!["P".to_string()]);
    }
}
