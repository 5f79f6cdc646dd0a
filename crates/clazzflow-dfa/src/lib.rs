//! Whole-program data flow analysis over a resolved clazz table.
//!
//! The analysis computes, for every reachable call, an over-approximation of
//! the values flowing through it. Calls are told apart by their target,
//! arguments and effect environment, instances by their clazz. Results are
//! collected in a [`DfaReport`].

mod analyze;
mod call;
mod config;
mod diagnostic;
mod env;
mod error;
mod fixpoint;
mod id;
mod intrinsics;
mod report;
mod store;
mod value;

pub use call::{CallKey, CallState};
pub use config::{DfaConfig, InstanceContext};
pub use diagnostic::{Diagnostic, Severity};
pub use env::EnvKey;
pub use error::DfaError;
pub use fixpoint::Dfa;
pub use id::{ArrayId, CallId, EnvId, InstanceId};
pub use intrinsics::{Intrinsic, IntrinsicFn, IntrinsicTable};
pub use report::DfaReport;
pub use store::{ArrayKey, Fields, InstanceKey, Store};
pub use value::{BoolValue, BoxedValue, NumericValue, TaggedValue, Value};
