use clazzflow_ir::Clazz;

use crate::{DfaError, EnvId, Store, Value};

/// One node of an effect environment chain: `effect` is bound to `initial`
/// on top of `outer`.
///
/// Nodes are interned like every other key, so two installations of the same
/// value over the same chain share a node. The value a node currently holds
/// starts out as `initial` and grows when the effect is replaced.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvKey {
    pub outer: Option<EnvId>,
    pub effect: Clazz,
    pub initial: Value,
}

impl Store {
    /// A chain that binds `effect` to `value` on top of `outer`. `outer`
    /// itself is left untouched.
    pub fn extend_env(&mut self, outer: Option<EnvId>, effect: Clazz, value: Value) -> EnvId {
        let key = EnvKey {
            outer,
            effect,
            initial: value,
        };
        if let Some(index) = self.envs.get_index_of(&key) {
            return EnvId(index);
        }
        let current = key.initial.clone();
        let (index, _) = self.envs.insert_full(key, current);
        self.mark_changed(|| format!("new environment binding {effect}"));
        EnvId(index)
    }

    pub fn env_key(&self, id: EnvId) -> Result<&EnvKey, DfaError> {
        self.envs
            .get_index(id.0)
            .map(|(k, _)| k)
            .ok_or(DfaError::UnknownEnv(id))
    }

    /// Innermost node of the chain starting at `env` that binds `effect`.
    fn find_binding(&self, env: Option<EnvId>, effect: Clazz) -> Result<Option<EnvId>, DfaError> {
        let mut cursor = env;
        while let Some(id) = cursor {
            let key = self.env_key(id)?;
            if key.effect == effect {
                return Ok(Some(id));
            }
            cursor = key.outer;
        }
        Ok(None)
    }

    /// The effect of type `effect` visible in `env`: the innermost binding,
    /// or the default if nothing in the chain binds it.
    pub fn lookup_effect(
        &self,
        env: Option<EnvId>,
        effect: Clazz,
    ) -> Result<Option<Value>, DfaError> {
        if let Some(id) = self.find_binding(env, effect)? {
            return Ok(self.envs.get_index(id.0).map(|(_, v)| v.clone()));
        }
        Ok(self.default_effects.get(&effect).cloned())
    }

    /// Join `value` into the binding `lookup_effect` would return.
    pub fn replace_effect(
        &mut self,
        env: Option<EnvId>,
        effect: Clazz,
        value: &Value,
    ) -> Result<(), DfaError> {
        let Some(id) = self.find_binding(env, effect)? else {
            if !self.default_effects.contains_key(&effect) {
                return Err(DfaError::NoEffectToReplace {
                    effect: effect.to_string(),
                });
            }
            self.install_default(effect, value);
            return Ok(());
        };
        let (_, current) = self.envs.get_index_mut(id.0).ok_or(DfaError::UnknownEnv(id))?;
        let joined = current.join(value);
        if joined != *current {
            *current = joined;
            self.mark_changed(|| format!("effect {effect} in {id} replaced"));
        }
        Ok(())
    }

    /// Join `value` into the default for `effect`. Returns true if the default
    /// grew, in which case the defaults generation advances.
    pub fn install_default(&mut self, effect: Clazz, value: &Value) -> bool {
        let joined = match self.default_effects.get(&effect) {
            Some(old) => old.join(value),
            None => value.clone(),
        };
        if self.default_effects.get(&effect) == Some(&joined) {
            return false;
        }
        self.default_effects.insert(effect, joined);
        self.defaults_generation += 1;
        self.mark_changed(|| format!("default effect {effect} changed"));
        true
    }

    pub fn default_effect(&self, effect: Clazz) -> Option<&Value> {
        self.default_effects.get(&effect)
    }

    /// Advances every time a default effect grows.
    pub fn defaults_generation(&self) -> u64 {
        self.defaults_generation
    }

    pub fn env_count(&self) -> usize {
        self.envs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstanceId;

    fn v(i: usize) -> Value {
        Value::Instance(InstanceId::from_raw(i))
    }

    #[test]
    fn lookup_prefers_the_innermost_binding() {
        let logger = Clazz::from_raw(1);
        let other = Clazz::from_raw(2);
        let mut store = Store::new();
        store.install_default(logger, &v(0));
        let outer = store.extend_env(None, logger, v(1));
        let inner = store.extend_env(Some(outer), other, v(2));

        assert_eq!(store.lookup_effect(None, logger).unwrap(), Some(v(0)));
        assert_eq!(store.lookup_effect(Some(inner), logger).unwrap(), Some(v(1)));
        assert_eq!(store.lookup_effect(Some(inner), other).unwrap(), Some(v(2)));
        assert_eq!(store.lookup_effect(Some(outer), other).unwrap(), None);
    }

    #[test]
    fn extending_shares_equal_nodes() {
        let logger = Clazz::from_raw(1);
        let mut store = Store::new();
        let a = store.extend_env(None, logger, v(1));
        let b = store.extend_env(None, logger, v(1));
        assert_eq!(a, b);
        assert_eq!(store.env_count(), 1);
    }

    #[test]
    fn defaults_bump_the_generation_only_when_they_grow() {
        let logger = Clazz::from_raw(1);
        let mut store = Store::new();
        assert!(store.install_default(logger, &v(0)));
        assert!(!store.install_default(logger, &v(0)));
        assert_eq!(store.defaults_generation(), 1);
        assert!(store.install_default(logger, &v(1)));
        assert_eq!(store.default_effect(logger), Some(&v(0).join(&v(1))));
    }

    #[test]
    fn replace_targets_the_binding_or_the_default() {
        let logger = Clazz::from_raw(1);
        let mut store = Store::new();
        assert!(store.replace_effect(None, logger, &v(3)).is_err());

        store.install_default(logger, &v(0));
        let env = store.extend_env(None, logger, v(1));
        store.replace_effect(Some(env), logger, &v(2)).unwrap();
        assert_eq!(
            store.lookup_effect(Some(env), logger).unwrap(),
            Some(v(1).join(&v(2)))
        );
        assert_eq!(store.default_effect(logger), Some(&v(0)));

        store.replace_effect(None, logger, &v(2)).unwrap();
        assert_eq!(store.default_effect(logger), Some(&v(0).join(&v(2))));
    }
}
