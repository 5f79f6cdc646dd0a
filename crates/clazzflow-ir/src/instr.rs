use smallvec::SmallVec;

use crate::{Clazz, Code, ContractKind};

/// A field write or a call.
///
/// For a dynamic access `targets` lists every statically possible
/// `(target type, concrete clazz)` pair; the concrete clazz is the one that
/// runs when the receiver's dynamic type is the target type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Access {
    pub accessed: Clazz,
    pub dynamic: bool,
    pub targets: SmallVec<[(Clazz, Clazz); 2]>,
    /// Only the precondition of `accessed` is evaluated.
    pub precondition_only: bool,
}

impl Access {
    /// A statically bound access.
    pub fn fixed(accessed: Clazz) -> Self {
        Self {
            accessed,
            dynamic: false,
            targets: SmallVec::new(),
            precondition_only: false,
        }
    }

    /// A dynamically bound access through `accessed` with the given
    /// `(target type, concrete clazz)` pairs.
    pub fn dynamic(accessed: Clazz, targets: impl IntoIterator<Item = (Clazz, Clazz)>) -> Self {
        Self {
            accessed,
            dynamic: true,
            targets: targets.into_iter().collect(),
            precondition_only: false,
        }
    }

    pub fn precondition_only(mut self) -> Self {
        self.precondition_only = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchCase {
    /// Tags selecting this case.
    pub tags: SmallVec<[u32; 2]>,
    /// Field of the current clazz receiving the untagged subject.
    pub field: Option<Clazz>,
    pub code: Code,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Match {
    /// Static type of the subject, a choice clazz.
    pub subject: Clazz,
    pub cases: Vec<MatchCase>,
}

/// One instruction of a block.
///
/// Instructions communicate through an operand stack. The comment on each
/// variant gives its stack effect.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    /// `-- current`
    Current,
    /// `-- outer`
    Outer,
    /// `-- arg`
    Arg(usize),
    /// `-- value`
    Const { clazz: Clazz, data: Vec<u8> },
    /// `target value --`
    Assign(Access),
    /// `target args.. -- result`
    Call(Access),
    /// `value -- boxed`
    Box { value: Clazz, reference: Clazz },
    /// `boxed -- value`
    Unbox { reference: Clazz, value: Clazz },
    /// `value -- address`
    AdrOf,
    /// `value -- tagged`
    Tag { value: Clazz, choice: Clazz, tag: u32 },
    /// `subject --`
    Match(Match),
    /// `condition --`
    If { then_code: Code, else_code: Code },
    /// `-- effect`
    Env(Clazz),
    /// `condition --`
    Contract(ContractKind),
    /// `value --`
    Pop,
    Comment(String),
}
