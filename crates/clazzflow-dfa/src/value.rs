use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};
use std::fmt;

use clazzflow_ir::{Clazz, Lattice, NumericKind};

use crate::{ArrayId, DfaError, InstanceId};

/// Abstract boolean.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoolValue {
    False,
    True,
    /// Either.
    Any,
}

impl BoolValue {
    pub fn from_tag(tag: u32) -> Self {
        if tag == 1 {
            BoolValue::True
        } else {
            BoolValue::False
        }
    }

    /// Whether a match case selecting `tag` can be taken.
    pub fn admits(self, tag: u32) -> bool {
        match self {
            BoolValue::Any => true,
            BoolValue::True => tag == 1,
            BoolValue::False => tag == 0,
        }
    }
}

/// A number of a fixed-width kind, optionally with its exact bit pattern.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericValue {
    pub clazz: Clazz,
    pub kind: NumericKind,
    /// `None` stands for any value of the kind.
    pub bits: Option<u64>,
}

impl NumericValue {
    pub fn any(clazz: Clazz, kind: NumericKind) -> Self {
        Self {
            clazz,
            kind,
            bits: None,
        }
    }

    pub fn exact(clazz: Clazz, kind: NumericKind, bits: u64) -> Self {
        Self {
            clazz,
            kind,
            bits: Some(bits),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxedValue {
    pub original: Value,
    pub value_clazz: Clazz,
    pub ref_clazz: Clazz,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaggedValue {
    pub original: Value,
    /// The choice clazz.
    pub clazz: Clazz,
    pub tag: u32,
}

/// An over-approximation of the runtime values at some program point.
///
/// Values form a join semilattice with [`Value::NoValue`] as bottom. Join
/// never loses information: the result of `a.join(b)` describes every
/// runtime value either side describes.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Nothing: the producing path never returns.
    NoValue,
    /// A value that was never constructed, e.g. a field read before any write.
    Undefined,
    Unit,
    Bool(BoolValue),
    Numeric(NumericValue),
    Instance(InstanceId),
    Boxed(Box<BoxedValue>),
    Tagged(Box<TaggedValue>),
    SysArray(ArrayId),
    /// Two or more atoms that no cheaper representation covers.
    Set(BTreeSet<Value>),
}

/// Atoms with equal keys are merged into one atom by join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MergeKey {
    Unit,
    Bool,
    Numeric(Clazz),
    Instance(InstanceId),
    Boxed(Clazz, Clazz),
    Tagged(Clazz, u32),
    SysArray(ArrayId),
}

impl Value {
    pub const TRUE: Value = Value::Bool(BoolValue::True);
    pub const FALSE: Value = Value::Bool(BoolValue::False);
    pub const BOOL: Value = Value::Bool(BoolValue::Any);

    pub fn bool(b: bool) -> Self {
        if b { Value::TRUE } else { Value::FALSE }
    }

    pub fn numeric(n: NumericValue) -> Self {
        Value::Numeric(n)
    }

    pub fn boxed(original: Value, value_clazz: Clazz, ref_clazz: Clazz) -> Self {
        Value::Boxed(Box::new(BoxedValue {
            original,
            value_clazz,
            ref_clazz,
        }))
    }

    pub fn tagged(original: Value, clazz: Clazz, tag: u32) -> Self {
        Value::Tagged(Box::new(TaggedValue {
            original,
            clazz,
            tag,
        }))
    }

    /// The members of a set, or the value itself.
    pub fn atoms(&self) -> impl Iterator<Item = &Value> {
        let (set, single) = match self {
            Value::Set(s) => (Some(s.iter()), None),
            v => (None, Some(v)),
        };
        set.into_iter().flatten().chain(single)
    }

    /// True for the two values join treats as identities.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::NoValue | Value::Undefined)
    }

    /// Structural comparison; this is the key equality of the store.
    pub fn is_distinct_from(&self, other: &Value) -> bool {
        self.cmp(other) != std::cmp::Ordering::Equal
    }

    pub fn join(&self, other: &Value) -> Value {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Value::NoValue, v) | (v, Value::NoValue) => return v.clone(),
            (Value::Undefined, v) | (v, Value::Undefined) => return v.clone(),
            _ => {}
        }

        let mut merged: BTreeMap<MergeKey, Value> = BTreeMap::new();
        for atom in self.atoms().chain(other.atoms()) {
            let Some(key) = atom.merge_key() else {
                continue;
            };
            match merged.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(atom.clone());
                }
                Entry::Occupied(mut e) => {
                    let m = merge_atoms(e.get(), atom);
                    e.insert(m);
                }
            }
        }

        if merged.len() == 1 {
            merged.into_values().next().unwrap_or(Value::NoValue)
        } else {
            Value::Set(merged.into_values().collect())
        }
    }

    pub fn is_subseteq(&self, other: &Value) -> bool {
        &self.join(other) == other
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(match self {
            Value::NoValue | Value::Undefined | Value::Set(_) => return None,
            Value::Unit => MergeKey::Unit,
            Value::Bool(_) => MergeKey::Bool,
            Value::Numeric(n) => MergeKey::Numeric(n.clazz),
            Value::Instance(id) => MergeKey::Instance(*id),
            Value::Boxed(b) => MergeKey::Boxed(b.value_clazz, b.ref_clazz),
            Value::Tagged(t) => MergeKey::Tagged(t.clazz, t.tag),
            Value::SysArray(id) => MergeKey::SysArray(*id),
        })
    }

    pub fn as_instance(&self) -> Result<InstanceId, DfaError> {
        match self {
            Value::Instance(id) => Ok(*id),
            v => Err(DfaError::unexpected("instance", v)),
        }
    }

    pub fn as_array(&self) -> Result<ArrayId, DfaError> {
        match self {
            Value::SysArray(id) => Ok(*id),
            v => Err(DfaError::unexpected("array", v)),
        }
    }

    pub fn as_bool(&self) -> Result<BoolValue, DfaError> {
        match self {
            Value::Bool(b) => Ok(*b),
            v => Err(DfaError::unexpected("bool", v)),
        }
    }
}

/// Merge two atoms sharing a [`MergeKey`].
fn merge_atoms(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) if x != y => Value::BOOL,
        (Value::Numeric(x), Value::Numeric(y)) if x.bits != y.bits => {
            Value::Numeric(NumericValue::any(x.clazz, x.kind))
        }
        (Value::Boxed(x), Value::Boxed(y)) => Value::boxed(
            x.original.join(&y.original),
            x.value_clazz,
            x.ref_clazz,
        ),
        (Value::Tagged(x), Value::Tagged(y)) => {
            Value::tagged(x.original.join(&y.original), x.clazz, x.tag)
        }
        _ => a.clone(),
    }
}

impl Lattice for Value {
    fn join(&self, other: &Self) -> Self {
        Value::join(self, other)
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        Value::is_subseteq(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NoValue => f.write_str("void"),
            Value::Undefined => f.write_str("undefined"),
            Value::Unit => f.write_str("unit"),
            Value::Bool(BoolValue::True) => f.write_str("true"),
            Value::Bool(BoolValue::False) => f.write_str("false"),
            Value::Bool(BoolValue::Any) => f.write_str("bool"),
            Value::Numeric(n) => match n.bits {
                Some(bits) => write!(f, "{}:{}", n.kind, n.kind.format_bits(bits)),
                None => write!(f, "{}", n.kind),
            },
            Value::Instance(id) => write!(f, "{id}"),
            Value::Boxed(b) => write!(f, "boxed({})", b.original),
            Value::Tagged(t) => write!(f, "tagged{}({})", t.tag, t.original),
            Value::SysArray(id) => write!(f, "{id}"),
            Value::Set(s) => {
                f.write_str("{")?;
                for (i, v) in s.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32v(bits: Option<u64>) -> Value {
        Value::Numeric(NumericValue {
            clazz: Clazz::from_raw(3),
            kind: NumericKind::I32,
            bits,
        })
    }

    fn inst(i: usize) -> Value {
        Value::Instance(InstanceId::from_raw(i))
    }

    #[test]
    fn numerics_of_one_kind_widen() {
        assert_eq!(i32v(Some(1)).join(&i32v(Some(2))), i32v(None));
        assert_eq!(i32v(Some(1)).join(&i32v(Some(1))), i32v(Some(1)));
        assert_eq!(i32v(None).join(&i32v(Some(9))), i32v(None));
    }

    #[test]
    fn booleans_join_to_any() {
        assert_eq!(Value::TRUE.join(&Value::FALSE), Value::BOOL);
        assert_eq!(Value::BOOL.join(&Value::TRUE), Value::BOOL);
    }

    #[test]
    fn distinct_instances_form_a_set() {
        let s = inst(0).join(&inst(1));
        assert_eq!(s, Value::Set([inst(0), inst(1)].into_iter().collect()));
        assert_eq!(s.join(&inst(1)), s);
        assert_eq!(s.atoms().count(), 2);
        assert_eq!(s.to_string(), "{instance#0, instance#1}");
    }

    #[test]
    fn absent_values_are_identities() {
        assert_eq!(Value::NoValue.join(&inst(4)), inst(4));
        assert_eq!(Value::Undefined.join(&inst(4)), inst(4));
        assert_eq!(Value::NoValue.join(&Value::Undefined), Value::Undefined);
        assert!(Value::NoValue.is_subseteq(&Value::Undefined));
        assert!(!Value::Undefined.is_subseteq(&Value::NoValue));
    }

    #[test]
    fn tagged_values_merge_their_originals() {
        let choice = Clazz::from_raw(7);
        let a = Value::tagged(i32v(Some(1)), choice, 0);
        let b = Value::tagged(i32v(Some(2)), choice, 0);
        let c = Value::tagged(Value::Unit, choice, 1);
        assert_eq!(a.join(&b), Value::tagged(i32v(None), choice, 0));
        assert!(matches!(a.join(&c), Value::Set(s) if s.len() == 2));
    }

    #[test]
    fn accessor_on_wrong_variant_fails() {
        let err = Value::Unit.as_instance().unwrap_err();
        assert_eq!(err.to_string(), "expected instance value, found unit");
        assert_eq!(i32v(Some(7)).to_string(), "i32:7");
        assert!(i32v(Some(7)).is_distinct_from(&i32v(None)));
    }
}
