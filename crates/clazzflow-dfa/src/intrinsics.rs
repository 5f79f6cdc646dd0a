use std::collections::BTreeMap;
use std::fmt;

use clazzflow_ir::Clazz;

use crate::fixpoint::malformed;
use crate::{ArrayKey, CallId, CallKey, Dfa, DfaError, Value};

/// Abstract semantics of an intrinsic: the value a call produces, `None` if
/// the call does not return. A handler may record effects on the store.
pub type IntrinsicFn = fn(&mut Dfa<'_>, CallId) -> Result<Option<Value>, DfaError>;

#[derive(Clone, Copy)]
pub enum Intrinsic {
    Handler(IntrinsicFn),
    /// Known, but without abstract semantics. Calls produce
    /// [`Value::Undefined`] and are reported.
    Unsupported,
}

/// Intrinsic semantics keyed by intrinsic name.
#[derive(Clone)]
pub struct IntrinsicTable {
    entries: BTreeMap<String, Intrinsic>,
}

const INTEGERS: [&str; 8] = ["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64"];
const FLOATS: [&str; 2] = ["f32", "f64"];

const INTEGER_OPS: [&str; 11] = [
    "prefix -°",
    "infix -°",
    "infix +°",
    "infix *°",
    "div",
    "mod",
    "infix <<",
    "infix >>",
    "infix &",
    "infix |",
    "infix ^",
];
const FLOAT_OPS: [&str; 7] = [
    "prefix -", "infix +", "infix -", "infix *", "infix /", "infix %", "infix **",
];
const COMPARISONS: [&str; 6] = [
    "infix ==", "infix !=", "infix >", "infix >=", "infix <", "infix <=",
];

const CONVERSIONS: [&str; 31] = [
    "i8.as_i32",
    "i16.as_i32",
    "i32.as_i64",
    "i32.as_f64",
    "i64.as_f64",
    "u8.as_i32",
    "u16.as_i32",
    "u32.as_i64",
    "u32.as_f64",
    "u64.as_f64",
    "i8.castTo_u8",
    "i16.castTo_u16",
    "i32.castTo_u32",
    "i64.castTo_u64",
    "u8.castTo_i8",
    "u16.castTo_i16",
    "u32.castTo_i32",
    "u32.castTo_f32",
    "u64.castTo_i64",
    "u64.castTo_f64",
    "u16.low8bits",
    "u32.low8bits",
    "u64.low8bits",
    "u32.low16bits",
    "u64.low16bits",
    "u64.low32bits",
    "f32.as_f64",
    "f64.as_f32",
    "f64.as_i64_lax",
    "f32.castTo_u32",
    "f64.castTo_u64",
];

const FLOAT_FUNCTIONS: [&str; 18] = [
    "minExp",
    "maxExp",
    "minPositive",
    "max",
    "epsilon",
    "squareRoot",
    "exp",
    "log",
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "atan",
    "atan2",
    "sinh",
    "cosh",
    "tanh",
];

const UNSUPPORTED: [&str; 17] = [
    "safety",
    "debug",
    "debugLevel",
    "fuzion.std.args.count",
    "fuzion.std.args.get",
    "fuzion.std.out.flush",
    "fuzion.std.err.flush",
    "fuzion.stdin.nextByte",
    "f32.asString",
    "f64.asString",
    "Object.hashCode",
    "Object.asString",
    "fuzion.sys.env_vars.has0",
    "fuzion.sys.env_vars.get0",
    "fuzion.sys.thread.spawn0",
    "fuzion.std.nano_sleep",
    "fuzion.std.nano_time",
];

impl IntrinsicTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Every intrinsic of the standard library the analysis knows.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        let mut handler = |name: String, f: IntrinsicFn| {
            table.insert(name, Intrinsic::Handler(f));
        };

        for ty in INTEGERS {
            for op in INTEGER_OPS {
                handler(format!("{ty}.{op}"), numeric_result);
            }
            for op in COMPARISONS {
                handler(format!("{ty}.{op}"), any_bool);
            }
        }
        for ty in FLOATS {
            for op in FLOAT_OPS {
                handler(format!("{ty}.{op}"), numeric_result);
            }
            for op in COMPARISONS {
                handler(format!("{ty}.{op}"), any_bool);
            }
            for f in FLOAT_FUNCTIONS {
                handler(format!("{ty}s.{f}"), numeric_result);
            }
            handler(format!("{ty}s.isNaN"), any_bool);
        }
        for name in CONVERSIONS {
            handler(name.to_string(), numeric_result);
        }

        handler("fuzion.std.exit".into(), exit);
        handler("fuzion.std.out.write".into(), unit);
        handler("fuzion.std.err.write".into(), unit);

        handler("fuzion.sys.array.alloc".into(), array_alloc);
        handler("fuzion.sys.array.setel".into(), array_setel);
        handler("fuzion.sys.array.get".into(), array_get);

        handler("effect.default".into(), effect_default);
        handler("effect.replace".into(), effect_replace);
        handler("effect.abortable".into(), effect_abortable);
        handler("effect.abort".into(), exit);
        handler("effects.exists".into(), effects_exists);

        for name in UNSUPPORTED {
            table.insert(name, Intrinsic::Unsupported);
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, intrinsic: Intrinsic) -> Option<Intrinsic> {
        self.entries.insert(name.into(), intrinsic)
    }

    pub fn get(&self, name: &str) -> Option<Intrinsic> {
        self.entries.get(name).copied()
    }

    /// Names of the intrinsics with abstract semantics.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, i)| matches!(i, Intrinsic::Handler(_)))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for IntrinsicTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for IntrinsicTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// -- Handlers -----------------------------------------------------------------

fn key(dfa: &Dfa<'_>, id: CallId) -> Result<CallKey, DfaError> {
    Ok(dfa.store().call_key(id)?.clone())
}

fn arg(key: &CallKey, dfa: &Dfa<'_>, index: usize) -> Result<Value, DfaError> {
    key.args.get(index).cloned().ok_or_else(|| DfaError::ArityMismatch {
        clazz: dfa.ir().clazz_name(key.clazz).to_string(),
        expected: index + 1,
        got: key.args.len(),
    })
}

fn effect_type(dfa: &Dfa<'_>, cc: Clazz) -> Result<Clazz, DfaError> {
    dfa.ir()
        .effect_type(cc)
        .ok_or_else(|| malformed(dfa.ir(), cc, "has no effect type"))
}

/// Any value of the call's result type.
fn numeric_result(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let cc = dfa.store().call_key(id)?.clazz;
    let result = dfa
        .ir()
        .clazz_result(cc)
        .ok_or_else(|| malformed(dfa.ir(), cc, "has no result type"))?;
    dfa.any_numeric(result).map(Some)
}

fn any_bool(_: &mut Dfa<'_>, _: CallId) -> Result<Option<Value>, DfaError> {
    Ok(Some(Value::BOOL))
}

fn unit(_: &mut Dfa<'_>, _: CallId) -> Result<Option<Value>, DfaError> {
    Ok(Some(Value::Unit))
}

fn exit(_: &mut Dfa<'_>, _: CallId) -> Result<Option<Value>, DfaError> {
    Ok(None)
}

fn array_alloc(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let array = dfa.store_mut().array(ArrayKey::Alloc(id));
    Ok(Some(Value::SysArray(array)))
}

fn array_setel(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let (array, value) = (arg(&key, dfa, 0)?, arg(&key, dfa, 2)?);
    for atom in array.atoms().filter(|a| !a.is_absent()) {
        dfa.store_mut().array_set(atom.as_array()?, &value)?;
    }
    Ok(Some(Value::Unit))
}

fn array_get(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let array = arg(&key, dfa, 0)?;
    let mut result = Value::NoValue;
    for atom in array.atoms().filter(|a| !a.is_absent()) {
        result = result.join(&dfa.store().array_get(atom.as_array()?)?);
    }
    Ok(Some(result))
}

/// Install the target as the default of its effect type.
fn effect_default(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let effect = effect_type(dfa, key.clazz)?;
    dfa.store_mut().install_default(effect, &key.target);
    Ok(Some(Value::Unit))
}

fn effect_replace(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let effect = effect_type(dfa, key.clazz)?;
    dfa.store_mut().replace_effect(key.env, effect, &key.target)?;
    Ok(Some(Value::Unit))
}

/// Run the `call` of the function argument with the target installed.
fn effect_abortable(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let ir = dfa.ir();
    let effect = effect_type(dfa, key.clazz)?;
    let fun = *ir
        .clazz_generics(key.clazz)
        .first()
        .ok_or_else(|| malformed(ir, key.clazz, "has no function type"))?;
    let call = ir
        .lookup_call(fun)
        .ok_or_else(|| malformed(ir, fun, "has no call routine"))?;
    let f = arg(&key, dfa, 0)?;

    let env = dfa.store_mut().extend_env(key.env, effect, key.target.clone());
    let inner = CallKey {
        clazz: call,
        pre: false,
        target: f,
        args: Vec::new(),
        env: Some(env),
    };
    dfa.new_call(inner, id)?;
    Ok(Some(Value::Unit))
}

/// True if an effect of the given type is installed. Absence is not proof
/// that none will be, so the answer is then either.
fn effects_exists(dfa: &mut Dfa<'_>, id: CallId) -> Result<Option<Value>, DfaError> {
    let key = key(dfa, id)?;
    let ir = dfa.ir();
    let effect = *ir
        .clazz_generics(key.clazz)
        .first()
        .ok_or_else(|| malformed(ir, key.clazz, "has no effect type argument"))?;
    let installed = dfa.store().lookup_effect(key.env, effect)?.is_some();
    Ok(Some(if installed { Value::TRUE } else { Value::BOOL }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_arithmetic_and_effects() {
        let table = IntrinsicTable::standard();
        for name in [
            "i32.infix +°",
            "u64.infix >>",
            "i8.infix <=",
            "f64.infix **",
            "f32s.isNaN",
            "u64.low32bits",
            "f64.castTo_u64",
            "effect.abortable",
            "fuzion.sys.array.setel",
        ] {
            assert!(
                matches!(table.get(name), Some(Intrinsic::Handler(_))),
                "{name} should have a handler"
            );
        }
        assert!(matches!(table.get("fuzion.std.nano_time"), Some(Intrinsic::Unsupported)));
        assert!(table.get("no.such.intrinsic").is_none());
    }

    #[test]
    fn supported_lists_only_handlers() {
        let mut table = IntrinsicTable::empty();
        table.insert("a", Intrinsic::Handler(unit));
        table.insert("b", Intrinsic::Unsupported);
        assert_eq!(table.supported().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_overrides() {
        let mut table = IntrinsicTable::standard();
        let previous = table.insert("fuzion.std.nano_time", Intrinsic::Handler(unit));
        assert!(matches!(previous, Some(Intrinsic::Unsupported)));
        assert!(matches!(table.get("fuzion.std.nano_time"), Some(Intrinsic::Handler(_))));
    }
}
