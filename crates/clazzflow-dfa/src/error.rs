use clazzflow_interpreter::InterpreterError;

use crate::{ArrayId, CallId, EnvId, InstanceId};

/// Fatal analysis failures.
///
/// Every variant means the store or the clazz table is not in the shape the
/// analysis relies on; the run is aborted. Conditions the analysis can work
/// around are reported as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, thiserror::Error)]
pub enum DfaError {
    /// A value accessor was used on the wrong variant.
    #[error("expected {expected} value, found {found}")]
    UnexpectedValue { expected: &'static str, found: String },
    /// A clazz lacks a property the analysis needs.
    #[error("clazz '{clazz}' {problem}")]
    MalformedClazz { clazz: String, problem: &'static str },
    #[error("unknown {0}")]
    UnknownInstance(InstanceId),
    #[error("unknown {0}")]
    UnknownCall(CallId),
    #[error("unknown {0}")]
    UnknownEnv(EnvId),
    #[error("unknown {0}")]
    UnknownArray(ArrayId),
    /// A call carries a different number of arguments than its clazz takes.
    #[error("call to '{clazz}' has {got} arguments, expected {expected}")]
    ArityMismatch {
        clazz: String,
        expected: usize,
        got: usize,
    },
    /// `effect.replace` found neither an installed nor a default effect.
    #[error("no effect of type '{effect}' to replace")]
    NoEffectToReplace { effect: String },
    /// The program uses constant strings but the table has no layout for them.
    #[error("constant string used but no constant string clazz is known")]
    MissingConstString,
    /// The pass that runs after the fixpoint changed the store.
    #[error("reporting pass changed the analysis state: {reason}")]
    ReportingPassChanged { reason: String },
    /// No fixpoint was reached within the configured number of sweeps.
    #[error("no fixpoint after {0} iterations")]
    IterationLimit(usize),
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),
}

impl DfaError {
    pub(crate) fn unexpected(expected: &'static str, found: &crate::Value) -> Self {
        DfaError::UnexpectedValue {
            expected,
            found: found.to_string(),
        }
    }
}
