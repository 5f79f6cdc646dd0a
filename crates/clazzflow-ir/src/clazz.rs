use crate::{Clazz, Code};

/// What kind of feature a clazz is.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureKind {
    /// A routine with a code block (constructors included).
    Routine,
    /// A field of an outer clazz; reading it is a call without code.
    Field,
    /// A primitive whose semantics live outside the IR.
    Intrinsic,
    /// A feature without an implementation, only reachable by dynamic dispatch.
    Abstract,
    /// A tagged union over the clazz's generics.
    Choice,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContractKind {
    Pre,
    Post,
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractKind::Pre => f.write_str("precondition"),
            ContractKind::Post => f.write_str("postcondition"),
        }
    }
}

/// Fixed-width numeric kinds.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumericKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericKind {
    pub fn name(self) -> &'static str {
        match self {
            NumericKind::I8 => "i8",
            NumericKind::I16 => "i16",
            NumericKind::I32 => "i32",
            NumericKind::I64 => "i64",
            NumericKind::U8 => "u8",
            NumericKind::U16 => "u16",
            NumericKind::U32 => "u32",
            NumericKind::U64 => "u64",
            NumericKind::F32 => "f32",
            NumericKind::F64 => "f64",
        }
    }

    /// Size in bytes.
    pub fn size(self) -> usize {
        match self {
            NumericKind::I8 | NumericKind::U8 => 1,
            NumericKind::I16 | NumericKind::U16 => 2,
            NumericKind::I32 | NumericKind::U32 | NumericKind::F32 => 4,
            NumericKind::I64 | NumericKind::U64 | NumericKind::F64 => 8,
        }
    }

    /// Decode a little-endian constant payload into a zero-extended bit
    /// pattern. Returns `None` if `data` is shorter than the kind's size.
    pub fn decode(self, data: &[u8]) -> Option<u64> {
        let bytes = data.get(..self.size())?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(u64::from_le_bytes(buf))
    }

    /// Encode a value as the little-endian payload `decode` expects.
    pub fn encode(self, bits: u64) -> Vec<u8> {
        bits.to_le_bytes()[..self.size()].to_vec()
    }

    /// Render a bit pattern of this kind.
    pub fn format_bits(self, bits: u64) -> String {
        match self {
            NumericKind::I8 => (bits as u8 as i8).to_string(),
            NumericKind::I16 => (bits as u16 as i16).to_string(),
            NumericKind::I32 => (bits as u32 as i32).to_string(),
            NumericKind::I64 => (bits as i64).to_string(),
            NumericKind::U8 | NumericKind::U16 | NumericKind::U32 | NumericKind::U64 => {
                bits.to_string()
            }
            NumericKind::F32 => f32::from_bits(bits as u32).to_string(),
            NumericKind::F64 => f64::from_bits(bits).to_string(),
        }
    }
}

impl std::fmt::Display for NumericKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Clazzes the analysis treats specially.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecialClazz {
    Unit,
    Bool,
    Numeric(NumericKind),
    ConstString,
    Universe,
}

/// Everything known about one clazz.
///
/// Built with the derived builder; the fields of a clazz are not listed here
/// but collected from the `Field` clazzes whose `outer` points at it.
#[derive(Clone, Debug, bon::Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClazzInfo {
    /// Defaults to the name given to [`ProgramBuilder::declare`](crate::ProgramBuilder::declare).
    #[builder(into)]
    pub name: Option<String>,
    pub kind: FeatureKind,
    pub outer: Option<Clazz>,
    /// Result type of a routine or type of a field. `None` means unit.
    pub result: Option<Clazz>,
    /// The field a routine stores its result in.
    pub result_field: Option<Clazz>,
    /// Field receiving the call target.
    pub outer_ref: Option<Clazz>,
    pub code: Option<Code>,
    #[builder(into)]
    pub intrinsic: Option<String>,
    pub effect_type: Option<Clazz>,
    pub special: Option<SpecialClazz>,
    /// The `call` routine of a function clazz.
    pub call: Option<Clazz>,
    /// Argument fields, in call order.
    #[builder(default)]
    pub args: Vec<Clazz>,
    #[builder(default)]
    pub preconditions: Vec<Code>,
    #[builder(default)]
    pub postconditions: Vec<Code>,
    /// Actual generics; for a choice these are its alternatives in tag order.
    #[builder(default)]
    pub generics: Vec<Clazz>,
    #[builder(default)]
    pub is_ref: bool,
    #[builder(default = true)]
    pub needs_code: bool,
}
