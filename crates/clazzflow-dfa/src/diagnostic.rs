use std::fmt;

use clazzflow_ir::{ContractKind, Site};

use crate::CallId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A user-facing finding of the reporting pass.
///
/// Names are captured as strings so a diagnostic can outlive the clazz
/// table it was produced from.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostic {
    /// An intrinsic without abstract semantics was reached.
    UnsupportedIntrinsic { name: String, call: CallId },
    /// A constant of a clazz the analysis cannot materialize.
    UnsupportedConstant { site: Site, clazz: String },
    /// A dynamic access whose target covers none of the site's target types.
    NoDispatchTarget {
        site: Site,
        accessed: String,
        target: String,
    },
    /// A static access to a clazz that has no code.
    NoCode { site: Site, clazz: String },
    AbstractCalled { site: Site, clazz: String },
    /// A contract whose condition is provably false.
    ContractViolation {
        site: Site,
        kind: ContractKind,
        clazz: String,
    },
    /// An effect read with no installed effect and no default.
    MissingEffect { site: Site, effect: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnsupportedIntrinsic { .. } | Diagnostic::UnsupportedConstant { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedIntrinsic { name, call } => {
                write!(f, "intrinsic '{name}' is not supported ({call})")
            }
            Diagnostic::UnsupportedConstant { site, clazz } => {
                write!(f, "{site}: unsupported constant of clazz '{clazz}'")
            }
            Diagnostic::NoDispatchTarget {
                site,
                accessed,
                target,
            } => write!(f, "{site}: no target for access to '{accessed}' on {target}"),
            Diagnostic::NoCode { site, clazz } => {
                write!(f, "{site}: no code for static access to '{clazz}'")
            }
            Diagnostic::AbstractCalled { site, clazz } => {
                write!(f, "{site}: call to abstract feature '{clazz}'")
            }
            Diagnostic::ContractViolation { site, kind, clazz } => {
                write!(f, "{site}: {kind} of '{clazz}' never holds")
            }
            Diagnostic::MissingEffect { site, effect } => {
                write!(f, "{site}: no effect of type '{effect}' installed")
            }
        }
    }
}
