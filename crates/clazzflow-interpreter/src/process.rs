use clazzflow_ir::{Access, Clazz, Code, ContractKind, Match, Site};

use crate::{AbstractInterpreter, InterpreterError};

/// What a callback hands back to the driver.
///
/// `value` is `None` when control never continues past the instruction
/// (exit, abort, a call that provably does not return). The driver then drops
/// the rest of the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step<V, O> {
    pub value: Option<V>,
    pub output: O,
}

impl<V, O> Step<V, O> {
    pub fn produce(value: V, output: O) -> Self {
        Self {
            value: Some(value),
            output,
        }
    }

    pub fn diverge(output: O) -> Self {
        Self {
            value: None,
            output,
        }
    }

    pub fn from_option(value: Option<V>, output: O) -> Self {
        Self { value, output }
    }
}

/// Consumer of an instruction stream.
///
/// [`AbstractInterpreter`] walks blocks and calls one method per instruction,
/// threading `Value`s on its operand stack and collecting `Output`s with
/// [`sequence`](Self::sequence). A data flow analysis uses `Value` for
/// abstract values and `()` for output; a code generator would use
/// expressions and statements.
pub trait ProcessStatement {
    type Value: Clone;
    type Output;
    type Error: From<InterpreterError>;

    /// Combine the outputs of consecutive instructions.
    fn sequence(&mut self, outputs: Vec<Self::Output>) -> Self::Output;

    /// The value a block that runs to its end produces.
    fn unit_value(&mut self) -> Self::Value;

    /// Called before each instruction.
    fn statement_header(&mut self, site: Site) -> Self::Output;

    fn comment(&mut self, text: &str) -> Self::Output;

    /// Output for an instruction that produces no code, e.g. a dropped value.
    fn nop(&mut self) -> Self::Output;

    fn current(&mut self, cl: Clazz) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn outer(&mut self, cl: Clazz) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn arg(&mut self, cl: Clazz, index: usize)
        -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn constant(
        &mut self,
        site: Site,
        clazz: Clazz,
        data: &[u8],
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn adr_of(&mut self, value: Self::Value)
    -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    /// Write `value` into the field `access` designates on `target`.
    fn assign(
        &mut self,
        site: Site,
        access: &Access,
        target: Self::Value,
        value: Self::Value,
    ) -> Result<Self::Output, Self::Error>;

    fn call(
        &mut self,
        site: Site,
        access: &Access,
        target: Self::Value,
        args: Vec<Self::Value>,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn box_value(
        &mut self,
        value: Self::Value,
        value_clazz: Clazz,
        ref_clazz: Clazz,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn unbox(
        &mut self,
        value: Self::Value,
        ref_clazz: Clazz,
        value_clazz: Clazz,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn tag(
        &mut self,
        cl: Clazz,
        value: Self::Value,
        value_clazz: Clazz,
        choice: Clazz,
        tag: u32,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    /// Read the installed effect of type `effect`.
    fn env(
        &mut self,
        site: Site,
        effect: Clazz,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    /// N-way branch. The processor decides which cases to walk and walks them
    /// through `interp`.
    fn match_value(
        &mut self,
        interp: &AbstractInterpreter<'_>,
        site: Site,
        m: &Match,
        subject: Self::Value,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    /// Two-way branch on a boolean.
    fn conditional(
        &mut self,
        interp: &AbstractInterpreter<'_>,
        site: Site,
        condition: Self::Value,
        then_code: Code,
        else_code: Code,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;

    fn contract(
        &mut self,
        site: Site,
        kind: ContractKind,
        condition: Self::Value,
    ) -> Result<Step<Self::Value, Self::Output>, Self::Error>;
}
