mod error;
mod interpreter;
mod process;

pub use error::InterpreterError;
pub use interpreter::AbstractInterpreter;
pub use process::{ProcessStatement, Step};

pub use smallvec::{self, SmallVec};
