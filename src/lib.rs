//! Whole-program data flow analysis for clazz tables.
//!
//! - [`ir`]: the clazz table interface and an in-memory implementation.
//! - [`interpreter`]: the generic instruction walker.
//! - [`dfa`]: the analysis itself.

pub use clazzflow_dfa as dfa;
pub use clazzflow_interpreter as interpreter;
pub use clazzflow_ir as ir;

pub mod prelude {
    pub use clazzflow_dfa::{Dfa, DfaConfig, DfaError, DfaReport, Diagnostic, Value};
    pub use clazzflow_ir::*;
}
