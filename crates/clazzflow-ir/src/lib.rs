//! Clazz tables and stack-oriented instruction blocks.
//!
//! This crate is the boundary between a front end that lowers a program into
//! fully resolved clazzes and the consumers that walk those clazzes (the
//! abstract interpreter driver, the data flow analysis, code generators).
//! Consumers only ever see the [`IrQuery`] trait; [`Program`] is the in-memory
//! implementation used to assemble clazz tables by hand.

mod clazz;
mod error;
mod id;
mod instr;
mod lattice;
mod program;
mod query;

pub use clazz::{ClazzInfo, ContractKind, FeatureKind, NumericKind, SpecialClazz};
pub use error::ProgramError;
pub use id::{Clazz, Code, Site};
pub use instr::{Access, Instr, Match, MatchCase};
pub use lattice::Lattice;
pub use program::{Program, ProgramBuilder};
pub use query::{ConstStringLayout, IrQuery};

pub use ::smallvec::{self, SmallVec, smallvec};
