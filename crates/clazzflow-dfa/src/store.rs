use std::collections::BTreeMap;

use clazzflow_ir::{Clazz, Site};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::{ArrayId, CallId, CallKey, CallState, DfaError, EnvKey, InstanceId, Value};

/// Identity of an abstract instance.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceKey {
    pub clazz: Clazz,
    /// Creating clazz, when instances are told apart by it.
    pub context: Option<Clazz>,
}

/// Identity of an abstract raw array.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayKey {
    /// Allocated by a `fuzion.sys.array.alloc` call.
    Alloc(CallId),
    /// Backing a constant string.
    Constant(Site),
}

pub type Fields = BTreeMap<Clazz, Value>;

/// Interning tables for everything the analysis discovers.
///
/// Each table maps a canonical key to the mutable state that belongs to it;
/// the key's position is its id, so ids are stable and entries are never
/// removed. Every insertion of a new key and every join that grows a stored
/// value marks the store as changed, which is what keeps the fixpoint loop
/// going.
#[derive(Clone, Debug, Default)]
pub struct Store {
    pub(crate) instances: IndexMap<InstanceKey, Fields, FxBuildHasher>,
    pub(crate) calls: IndexMap<CallKey, CallState, FxBuildHasher>,
    pub(crate) envs: IndexMap<EnvKey, Value, FxBuildHasher>,
    pub(crate) arrays: IndexMap<ArrayKey, Value, FxBuildHasher>,
    pub(crate) default_effects: BTreeMap<Clazz, Value>,
    pub(crate) defaults_generation: u64,
    changed: Option<String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Change tracking ------------------------------------------------------

    /// Record a change. Only the first reason of a sweep is kept.
    pub(crate) fn mark_changed(&mut self, reason: impl FnOnce() -> String) {
        if self.changed.is_none() {
            self.changed = Some(reason());
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed.is_some()
    }

    /// Reset the change flag, returning the reason it was set for.
    pub fn take_changed(&mut self) -> Option<String> {
        self.changed.take()
    }

    // -- Instances ------------------------------------------------------------

    /// The canonical instance for `(clazz, context)`, created on first use.
    pub fn instance(&mut self, clazz: Clazz, context: Option<Clazz>) -> InstanceId {
        let key = InstanceKey { clazz, context };
        if let Some(index) = self.instances.get_index_of(&key) {
            return InstanceId(index);
        }
        let (index, _) = self.instances.insert_full(key, Fields::new());
        self.mark_changed(|| format!("new instance of {clazz}"));
        InstanceId(index)
    }

    pub fn instance_key(&self, id: InstanceId) -> Result<InstanceKey, DfaError> {
        self.instances
            .get_index(id.0)
            .map(|(k, _)| *k)
            .ok_or(DfaError::UnknownInstance(id))
    }

    pub fn instance_clazz(&self, id: InstanceId) -> Result<Clazz, DfaError> {
        self.instance_key(id).map(|k| k.clazz)
    }

    pub fn fields(&self, id: InstanceId) -> Result<&Fields, DfaError> {
        self.instances
            .get_index(id.0)
            .map(|(_, f)| f)
            .ok_or(DfaError::UnknownInstance(id))
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &InstanceKey, &Fields)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, (k, f))| (InstanceId(i), k, f))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn join_field(&mut self, id: InstanceId, field: Clazz, value: &Value) -> Result<(), DfaError> {
        let (_, fields) = self
            .instances
            .get_index_mut(id.0)
            .ok_or(DfaError::UnknownInstance(id))?;
        let grown = match fields.get(&field) {
            Some(old) => {
                let joined = old.join(value);
                (joined != *old).then_some(joined)
            }
            None => Some(value.clone()),
        };
        if let Some(v) = grown {
            fields.insert(field, v);
            self.mark_changed(|| format!("{field} of {id} grew to {value}"));
        }
        Ok(())
    }

    /// Join `value` into `field` of every instance `target` may be.
    pub fn set_field(
        &mut self,
        target: &Value,
        field: Clazz,
        value: &Value,
    ) -> Result<(), DfaError> {
        for atom in target.atoms() {
            match atom {
                Value::Instance(id) => self.join_field(*id, field, value)?,
                Value::Boxed(b) => self.set_field(&b.original, field, value)?,
                Value::NoValue | Value::Undefined => {}
                v => return Err(DfaError::unexpected("instance", v)),
            }
        }
        Ok(())
    }

    /// Join of `field` over every instance `target` may be. A field nobody
    /// wrote to reads as [`Value::Undefined`].
    pub fn read_field(&self, target: &Value, field: Clazz) -> Result<Value, DfaError> {
        let mut result = Value::NoValue;
        for atom in target.atoms() {
            let v = match atom {
                Value::Instance(id) => self
                    .fields(*id)?
                    .get(&field)
                    .cloned()
                    .unwrap_or(Value::Undefined),
                Value::Boxed(b) => self.read_field(&b.original, field)?,
                Value::NoValue => Value::NoValue,
                Value::Undefined => Value::Undefined,
                v => return Err(DfaError::unexpected("instance", v)),
            };
            result = result.join(&v);
        }
        Ok(result)
    }

    /// The instance of `ref_clazz` a value instance is boxed into. It
    /// receives every field of the original.
    pub fn box_instance(
        &mut self,
        id: InstanceId,
        ref_clazz: Clazz,
    ) -> Result<InstanceId, DfaError> {
        let context = self.instance_key(id)?.context;
        let boxed = self.instance(ref_clazz, context);
        let fields = self.fields(id)?.clone();
        for (field, value) in &fields {
            self.join_field(boxed, *field, value)?;
        }
        Ok(boxed)
    }

    // -- Arrays ---------------------------------------------------------------

    pub fn array(&mut self, key: ArrayKey) -> ArrayId {
        if let Some(index) = self.arrays.get_index_of(&key) {
            return ArrayId(index);
        }
        let (index, _) = self.arrays.insert_full(key, Value::NoValue);
        self.mark_changed(|| format!("new array for {key:?}"));
        ArrayId(index)
    }

    /// Join `value` into the elements of `id`.
    pub fn array_set(&mut self, id: ArrayId, value: &Value) -> Result<(), DfaError> {
        let (_, elements) = self
            .arrays
            .get_index_mut(id.0)
            .ok_or(DfaError::UnknownArray(id))?;
        let joined = elements.join(value);
        if joined != *elements {
            *elements = joined;
            self.mark_changed(|| format!("elements of {id} grew to {value}"));
        }
        Ok(())
    }

    /// Every value stored into `id` so far, [`Value::Undefined`] if none.
    pub fn array_get(&self, id: ArrayId) -> Result<Value, DfaError> {
        let (_, elements) = self.arrays.get_index(id.0).ok_or(DfaError::UnknownArray(id))?;
        Ok(match elements {
            Value::NoValue => Value::Undefined,
            v => v.clone(),
        })
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clazzflow_ir::NumericKind;

    use crate::NumericValue;

    fn num(bits: u64) -> Value {
        Value::Numeric(NumericValue::exact(Clazz::from_raw(1), NumericKind::I32, bits))
    }

    #[test]
    fn instances_are_interned() {
        let mut store = Store::new();
        let a = store.instance(Clazz::from_raw(5), None);
        assert_eq!(store.take_changed(), Some("new instance of clazz#5".to_string()));
        let b = store.instance(Clazz::from_raw(5), None);
        assert_eq!(a, b);
        assert!(!store.is_changed());
        let c = store.instance(Clazz::from_raw(5), Some(Clazz::from_raw(9)));
        assert_ne!(a, c);
        assert_eq!(store.instance_count(), 2);
    }

    #[test]
    fn field_writes_join() {
        let mut store = Store::new();
        let field = Clazz::from_raw(2);
        let target = Value::Instance(store.instance(Clazz::from_raw(5), None));
        store.take_changed();

        assert_eq!(store.read_field(&target, field).unwrap(), Value::Undefined);
        store.set_field(&target, field, &num(1)).unwrap();
        assert!(store.take_changed().is_some());
        store.set_field(&target, field, &num(1)).unwrap();
        assert!(!store.is_changed());
        store.set_field(&target, field, &num(2)).unwrap();
        assert_eq!(
            store.read_field(&target, field).unwrap(),
            Value::Numeric(NumericValue::any(Clazz::from_raw(1), NumericKind::I32))
        );
    }

    #[test]
    fn writes_through_sets_reach_every_instance() {
        let mut store = Store::new();
        let field = Clazz::from_raw(2);
        let a = Value::Instance(store.instance(Clazz::from_raw(5), None));
        let b = Value::Instance(store.instance(Clazz::from_raw(6), None));
        let both = a.join(&b);
        store.set_field(&both, field, &num(3)).unwrap();
        assert_eq!(store.read_field(&a, field).unwrap(), num(3));
        assert_eq!(store.read_field(&b, field).unwrap(), num(3));
        assert!(store.set_field(&Value::Unit, field, &num(3)).is_err());
    }

    #[test]
    fn arrays_accumulate_elements() {
        let mut store = Store::new();
        let id = store.array(ArrayKey::Alloc(CallId::from_raw(0)));
        assert_eq!(store.array_get(id).unwrap(), Value::Undefined);
        store.array_set(id, &num(4)).unwrap();
        assert_eq!(store.array_get(id).unwrap(), num(4));
        assert_eq!(store.array(ArrayKey::Alloc(CallId::from_raw(0))), id);
    }
}
