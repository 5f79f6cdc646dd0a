use clazzflow_ir::{Clazz, Code};

/// Error type for driver failures.
///
/// These all mean the instruction stream is malformed; a processor's own
/// failures go through its associated error type.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// An instruction needed more operands than the stack held.
    #[error("operand stack underflow at {code}.{index}")]
    StackUnderflow { code: Code, index: usize },
    /// The clazz has no body to walk.
    #[error("{clazz} has no code")]
    MissingCode { clazz: Clazz },
    /// A precondition walk was requested for a clazz without one.
    #[error("{clazz} has no precondition")]
    MissingPrecondition { clazz: Clazz },
    /// An index inside the block's length returned no instruction.
    #[error("no instruction at {code}.{index}")]
    MissingInstruction { code: Code, index: usize },
}
