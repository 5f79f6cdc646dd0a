//! Hand-assembled clazz tables and assertion helpers shared by the tests of
//! the workspace crates.

pub mod fixtures;
pub mod lattice;
mod prelude;

pub use prelude::Prelude;
