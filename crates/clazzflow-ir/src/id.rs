/// Declare a copyable integer identifier.
///
/// The inner index is `pub(crate)` relative to the invoking crate, so only
/// the crate owning the table can mint ids directly; everyone else goes
/// through `from_raw`.
#[macro_export]
macro_rules! identifier {
    ($(#[$attr:meta])* struct $name:ident => $prefix:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Build an id from a raw index.
            pub fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            /// Return the raw index.
            pub fn raw(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

identifier! {
    /// A fully resolved concrete type or feature.
    struct Clazz => "clazz"
}

identifier! {
    /// An instruction block.
    struct Code => "code"
}

/// The position of one instruction: the clazz whose code is being walked,
/// the block, and the index inside the block.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Site {
    pub clazz: Clazz,
    pub code: Code,
    pub index: usize,
}

impl Site {
    pub fn new(clazz: Clazz, code: Code, index: usize) -> Self {
        Self { clazz, code, index }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}.{}", self.clazz, self.code.0, self.index)
    }
}
