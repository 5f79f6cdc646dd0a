use crate::{Clazz, Code};

/// Error type for clazz tables that cannot be queried consistently.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// A clazz was declared but never defined.
    #[error("clazz {clazz} ('{name}') was declared but never defined")]
    UndefinedClazz { clazz: Clazz, name: String },
    /// A clazz id outside the table was referenced.
    #[error("{referrer} refers to unknown {clazz}")]
    UnknownClazz { referrer: String, clazz: Clazz },
    /// A code id outside the table was referenced.
    #[error("{referrer} refers to unknown {code}")]
    UnknownCode { referrer: String, code: Code },
    /// A routine with a non-unit result has nowhere to store it.
    #[error("routine '{name}' has a result but no result field")]
    MissingResultField { name: String },
    /// No main clazz was set.
    #[error("no main clazz")]
    MissingMain,
}
