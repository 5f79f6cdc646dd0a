use clazzflow_ir::Clazz;

use crate::{CallId, DfaError, EnvId, InstanceId, Store, Value};

/// Identity of an abstract call: two call sites share a [`CallId`] exactly
/// when all of these compare equal.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallKey {
    pub clazz: Clazz,
    /// The precondition of `clazz` is called rather than its body.
    pub pre: bool,
    pub target: Value,
    pub args: Vec<Value>,
    pub env: Option<EnvId>,
}

/// Mutable state of an abstract call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallState {
    /// Instance holding the call's arguments and locals.
    pub frame: InstanceId,
    /// Some walk of the call's code reached its end.
    pub returns: bool,
    /// The call that discovered this one; `None` for the entry point.
    pub origin: Option<CallId>,
}

impl Store {
    /// The canonical call for `key`, created on first use with a frame
    /// instance in `frame_context`.
    pub fn call(
        &mut self,
        key: CallKey,
        frame_context: Option<Clazz>,
        origin: Option<CallId>,
    ) -> CallId {
        if let Some(index) = self.calls.get_index_of(&key) {
            return CallId(index);
        }
        let clazz = key.clazz;
        let frame = self.instance(clazz, frame_context);
        let (index, _) = self.calls.insert_full(
            key,
            CallState {
                frame,
                returns: false,
                origin,
            },
        );
        self.mark_changed(|| format!("new call to {clazz}"));
        CallId(index)
    }

    pub fn call_key(&self, id: CallId) -> Result<&CallKey, DfaError> {
        self.calls
            .get_index(id.0)
            .map(|(k, _)| k)
            .ok_or(DfaError::UnknownCall(id))
    }

    pub fn call_state(&self, id: CallId) -> Result<CallState, DfaError> {
        self.calls
            .get_index(id.0)
            .map(|(_, s)| *s)
            .ok_or(DfaError::UnknownCall(id))
    }

    /// Record that `id` can return. This only ever goes from false to true.
    pub fn mark_returns(&mut self, id: CallId) -> Result<(), DfaError> {
        let (_, state) = self
            .calls
            .get_index_mut(id.0)
            .ok_or(DfaError::UnknownCall(id))?;
        if !state.returns {
            state.returns = true;
            self.mark_changed(|| format!("{id} returns"));
        }
        Ok(())
    }

    pub fn calls(&self) -> impl Iterator<Item = (CallId, &CallKey, &CallState)> {
        self.calls
            .iter()
            .enumerate()
            .map(|(i, (k, s))| (CallId(i), k, s))
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(clazz: usize, args: Vec<Value>) -> CallKey {
        CallKey {
            clazz: Clazz::from_raw(clazz),
            pre: false,
            target: Value::Unit,
            args,
            env: None,
        }
    }

    #[test]
    fn equal_contexts_collapse() {
        let mut store = Store::new();
        let a = store.call(key(4, vec![Value::TRUE]), None, None);
        let b = store.call(key(4, vec![Value::TRUE]), None, Some(a));
        let c = store.call(key(4, vec![Value::FALSE]), None, Some(a));
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Both contexts share the per-clazz frame.
        assert_eq!(
            store.call_state(a).unwrap().frame,
            store.call_state(c).unwrap().frame
        );
        assert_eq!(store.call_state(c).unwrap().origin, Some(a));
    }

    #[test]
    fn returns_is_sticky() {
        let mut store = Store::new();
        let a = store.call(key(4, vec![]), None, None);
        store.take_changed();
        store.mark_returns(a).unwrap();
        assert!(store.take_changed().is_some());
        store.mark_returns(a).unwrap();
        assert!(!store.is_changed());
        assert!(store.call_state(a).unwrap().returns);
        assert!(store.call_key(CallId::from_raw(9)).is_err());
    }
}
