use clazzflow_ir::{Clazz, Code, ContractKind, Instr, IrQuery, Site};
use smallvec::SmallVec;

use crate::{InterpreterError, ProcessStatement, Step};

type Stack<V> = SmallVec<[V; 8]>;

/// Walks instruction blocks and hands every instruction to a
/// [`ProcessStatement`].
///
/// The driver owns the operand stack and the block structure: it pops
/// operands, pushes produced values, and stops walking a block as soon as a
/// callback reports that control does not continue. Which branches of a match
/// or conditional are walked is left to the processor, which calls back into
/// [`process_code`](Self::process_code) for each one it considers reachable.
#[derive(Clone, Copy)]
pub struct AbstractInterpreter<'ir> {
    ir: &'ir dyn IrQuery,
}

impl<'ir> AbstractInterpreter<'ir> {
    pub fn new(ir: &'ir dyn IrQuery) -> Self {
        Self { ir }
    }

    pub fn ir(&self) -> &'ir dyn IrQuery {
        self.ir
    }

    /// Walk the body of `cl` followed by its postconditions, or only its
    /// preconditions when `pre` is set.
    pub fn process_clazz<P: ProcessStatement>(
        &self,
        p: &mut P,
        cl: Clazz,
        pre: bool,
    ) -> Result<Step<P::Value, P::Output>, P::Error> {
        let mut outputs = Vec::new();
        if pre {
            if !self.ir.clazz_has_precondition(cl) {
                return Err(InterpreterError::MissingPrecondition { clazz: cl }.into());
            }
            if !self.contracts(p, cl, ContractKind::Pre, &mut outputs)? {
                return Ok(Step::diverge(p.sequence(outputs)));
            }
        } else {
            let code = self
                .ir
                .clazz_code(cl)
                .ok_or(InterpreterError::MissingCode { clazz: cl })?;
            let body = self.process_code(p, cl, code)?;
            outputs.push(body.output);
            if body.value.is_none()
                || !self.contracts(p, cl, ContractKind::Post, &mut outputs)?
            {
                return Ok(Step::diverge(p.sequence(outputs)));
            }
        }
        let unit = p.unit_value();
        Ok(Step::produce(unit, p.sequence(outputs)))
    }

    /// Walk every contract block of `kind`. Returns false as soon as one of
    /// them does not continue.
    fn contracts<P: ProcessStatement>(
        &self,
        p: &mut P,
        cl: Clazz,
        kind: ContractKind,
        outputs: &mut Vec<P::Output>,
    ) -> Result<bool, P::Error> {
        let mut index = 0;
        while let Some(code) = self.ir.clazz_contract(cl, kind, index) {
            let step = self.process_code(p, cl, code)?;
            outputs.push(step.output);
            if step.value.is_none() {
                return Ok(false);
            }
            index += 1;
        }
        Ok(true)
    }

    /// Walk one block of `cl`.
    ///
    /// Produces the unit value if control reaches the end of the block and
    /// `None` otherwise.
    pub fn process_code<P: ProcessStatement>(
        &self,
        p: &mut P,
        cl: Clazz,
        code: Code,
    ) -> Result<Step<P::Value, P::Output>, P::Error> {
        let mut stack = Stack::new();
        let mut outputs = Vec::new();
        for index in 0..self.ir.code_len(code) {
            let site = Site::new(cl, code, index);
            let instr = self
                .ir
                .instruction(code, index)
                .ok_or(InterpreterError::MissingInstruction { code, index })?;
            outputs.push(p.statement_header(site));
            let (output, continues) = self.process_instr(p, site, instr, &mut stack)?;
            outputs.push(output);
            if !continues {
                tracing::trace!(%site, "block does not continue");
                return Ok(Step::diverge(p.sequence(outputs)));
            }
        }
        let unit = p.unit_value();
        Ok(Step::produce(unit, p.sequence(outputs)))
    }

    fn process_instr<P: ProcessStatement>(
        &self,
        p: &mut P,
        site: Site,
        instr: &'ir Instr,
        stack: &mut Stack<P::Value>,
    ) -> Result<(P::Output, bool), P::Error> {
        let cl = site.clazz;
        let done = match instr {
            Instr::Current => push(stack, p.current(cl)?),
            Instr::Outer => push(stack, p.outer(cl)?),
            Instr::Arg(i) => push(stack, p.arg(cl, *i)?),
            Instr::Const { clazz, data } => push(stack, p.constant(site, *clazz, data)?),
            Instr::Assign(access) => {
                let value = pop(stack, site)?;
                let target = pop(stack, site)?;
                (p.assign(site, access, target, value)?, true)
            }
            Instr::Call(access) => {
                let arity = self.ir.clazz_args(access.accessed).len();
                if stack.len() <= arity {
                    return Err(underflow(site).into());
                }
                let args: Vec<_> = stack.drain(stack.len() - arity..).collect();
                let target = pop(stack, site)?;
                push(stack, p.call(site, access, target, args)?)
            }
            Instr::Box { value, reference } => {
                let v = pop(stack, site)?;
                push(stack, p.box_value(v, *value, *reference)?)
            }
            Instr::Unbox { reference, value } => {
                let v = pop(stack, site)?;
                push(stack, p.unbox(v, *reference, *value)?)
            }
            Instr::AdrOf => {
                let v = pop(stack, site)?;
                push(stack, p.adr_of(v)?)
            }
            Instr::Tag { value, choice, tag } => {
                let v = pop(stack, site)?;
                push(stack, p.tag(cl, v, *value, *choice, *tag)?)
            }
            Instr::Env(effect) => push(stack, p.env(site, *effect)?),
            Instr::Match(m) => {
                let subject = pop(stack, site)?;
                let step = p.match_value(self, site, m, subject)?;
                (step.output, step.value.is_some())
            }
            Instr::If {
                then_code,
                else_code,
            } => {
                let condition = pop(stack, site)?;
                let step = p.conditional(self, site, condition, *then_code, *else_code)?;
                (step.output, step.value.is_some())
            }
            Instr::Contract(kind) => {
                let condition = pop(stack, site)?;
                let step = p.contract(site, *kind, condition)?;
                (step.output, step.value.is_some())
            }
            Instr::Pop => {
                pop(stack, site)?;
                (p.nop(), true)
            }
            Instr::Comment(text) => (p.comment(text), true),
        };
        Ok(done)
    }
}

fn push<V, O>(stack: &mut Stack<V>, step: Step<V, O>) -> (O, bool) {
    match step.value {
        Some(v) => {
            stack.push(v);
            (step.output, true)
        }
        None => (step.output, false),
    }
}

fn pop<V>(stack: &mut Stack<V>, site: Site) -> Result<V, InterpreterError> {
    stack.pop().ok_or_else(|| underflow(site))
}

fn underflow(site: Site) -> InterpreterError {
    InterpreterError::StackUnderflow {
        code: site.code,
        index: site.index,
    }
}
