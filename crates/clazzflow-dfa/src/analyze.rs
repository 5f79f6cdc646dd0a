use clazzflow_interpreter::{AbstractInterpreter, ProcessStatement, Step};
use clazzflow_ir::{Access, Clazz, Code, ContractKind, FeatureKind, Match, Site, SpecialClazz};
use smallvec::SmallVec;

use crate::fixpoint::malformed;
use crate::{
    ArrayKey, BoolValue, CallId, CallKey, Dfa, DfaError, Diagnostic, InstanceContext, InstanceId,
    NumericValue, Value,
};

type Result<T> = std::result::Result<T, DfaError>;

/// The data flow processor for the code of one call.
///
/// Values are abstract [`Value`]s; nothing is emitted, so the output type is
/// `()`. A callback returning `None` means the analyzed path does not
/// continue, which the driver turns into an early end of the block.
pub(crate) struct Analyze<'a, 'ir> {
    dfa: &'a mut Dfa<'ir>,
    call: CallId,
    key: CallKey,
    frame: InstanceId,
}

impl<'a, 'ir> Analyze<'a, 'ir> {
    pub(crate) fn new(
        dfa: &'a mut Dfa<'ir>,
        call: CallId,
        key: CallKey,
        frame: InstanceId,
    ) -> Self {
        Self {
            dfa,
            call,
            key,
            frame,
        }
    }

    fn frame_value(&self) -> Value {
        Value::Instance(self.frame)
    }

    /// Context for instances this call creates.
    fn instance_context(&self) -> Option<Clazz> {
        match self.dfa.config.instance_context() {
            InstanceContext::Clazz => None,
            InstanceContext::CreatingClazz => Some(self.key.clazz),
        }
    }

    // -- Accesses -------------------------------------------------------------

    /// A read, write or call of the feature `access` designates. For a
    /// dynamic access every target atom whose clazz is one of the access's
    /// target types is handled separately and the results are joined.
    fn access(
        &mut self,
        site: Site,
        access: &Access,
        target: Value,
        args: &[Value],
        is_call: bool,
    ) -> Result<Option<Value>> {
        let ir = self.dfa.ir;
        if !access.dynamic {
            if ir.clazz_needs_code(access.accessed) {
                return self.access0(site, &target, args, access.accessed, is_call);
            }
            self.dfa.diagnose(Diagnostic::NoCode {
                site,
                clazz: ir.clazz_name(access.accessed).to_string(),
            });
            return Ok(None);
        }

        let mut found = false;
        let mut result: Option<Value> = None;
        for &(target_type, cc) in &access.targets {
            for atom in target.atoms() {
                let hit = match atom {
                    Value::Instance(id) => self.dfa.store.instance_clazz(*id)? == target_type,
                    Value::Boxed(b) => b.ref_clazz == target_type,
                    _ => false,
                };
                if !hit {
                    continue;
                }
                found = true;
                self.dfa.record_dispatch(site, cc);
                if let Some(r) = self.access0(site, atom, args, cc, is_call)? {
                    result = Some(match result {
                        Some(prev) => prev.join(&r),
                        None => r,
                    });
                }
            }
        }
        if !found {
            self.dfa.diagnose(Diagnostic::NoDispatchTarget {
                site,
                accessed: ir.clazz_name(access.accessed).to_string(),
                target: target.to_string(),
            });
        }
        Ok(result)
    }

    /// A statically resolved access to `cc`.
    fn access0(
        &mut self,
        site: Site,
        target: &Value,
        args: &[Value],
        cc: Clazz,
        is_call: bool,
    ) -> Result<Option<Value>> {
        if is_call {
            return self.call0(site, target, args, cc, false);
        }
        if !self.dfa.ir.clazz_result_is_unit(cc) {
            let value = args
                .first()
                .ok_or_else(|| malformed(self.dfa.ir, cc, "assigned without a value"))?;
            let value = self.retag(cc, value)?;
            self.dfa.store.set_field(target, cc, &value)?;
        }
        Ok(Some(Value::Unit))
    }

    /// A call of `cc`, or of its precondition when `pre` is set.
    fn call0(
        &mut self,
        site: Site,
        target: &Value,
        args: &[Value],
        cc: Clazz,
        pre: bool,
    ) -> Result<Option<Value>> {
        let ir = self.dfa.ir;
        let kind = if pre {
            FeatureKind::Routine
        } else {
            ir.clazz_kind(cc)
        };
        match kind {
            FeatureKind::Abstract => {
                self.dfa.diagnose(Diagnostic::AbstractCalled {
                    site,
                    clazz: ir.clazz_name(cc).to_string(),
                });
                Ok(None)
            }
            FeatureKind::Routine | FeatureKind::Intrinsic => {
                if !ir.clazz_needs_code(cc) {
                    return Ok(None);
                }
                let key = CallKey {
                    clazz: cc,
                    pre,
                    target: target.clone(),
                    args: args.to_vec(),
                    env: self.key.env,
                };
                let id = self.dfa.new_call(key, self.call)?;
                Ok(self.dfa.call_result(id)?.filter(|v| *v != Value::NoValue))
            }
            FeatureKind::Field => {
                let v = self.dfa.store.read_field(target, cc)?;
                Ok((v != Value::NoValue).then_some(v))
            }
            FeatureKind::Choice => Err(malformed(ir, cc, "is a choice and cannot be called")),
        }
    }

    /// Tag `value` for a field whose type is a choice, based on the clazz of
    /// each atom. Atoms already tagged for that choice are left alone.
    fn retag(&self, field: Clazz, value: &Value) -> Result<Value> {
        let ir = self.dfa.ir;
        let Some(choice) = ir.clazz_result(field) else {
            return Ok(value.clone());
        };
        if !ir.clazz_is_choice(choice) || ir.clazz_special(choice) == Some(SpecialClazz::Bool) {
            return Ok(value.clone());
        }
        let mut result = Value::NoValue;
        for atom in value.atoms() {
            let tagged = match atom {
                Value::Tagged(t) if t.clazz == choice => atom.clone(),
                _ => match self.dfa.value_clazz(atom)? {
                    Some(vc) => match ir.choice_tag(choice, vc) {
                        Some(tag) => Value::tagged(atom.clone(), choice, tag),
                        None => atom.clone(),
                    },
                    None => atom.clone(),
                },
            };
            result = result.join(&tagged);
        }
        Ok(result)
    }

    fn const_string(&mut self, site: Site, data: &[u8]) -> Result<Value> {
        let ir = self.dfa.ir;
        let layout = ir.const_string().ok_or(DfaError::MissingConstString)?;
        let context = self.instance_context();
        let store = &mut self.dfa.store;

        let string = Value::Instance(store.instance(layout.clazz, context));
        let array = Value::Instance(store.instance(layout.array_clazz, context));
        let bytes = store.array(ArrayKey::Constant(site));
        if !data.is_empty() {
            let element = self.dfa.any_numeric(layout.element)?;
            self.dfa.store.array_set(bytes, &element)?;
        }

        let length = ir
            .clazz_result(layout.length)
            .ok_or_else(|| malformed(ir, layout.length, "has no type"))?;
        let length = match self.dfa.any_numeric(length)? {
            Value::Numeric(n) => Value::Numeric(NumericValue {
                bits: Some(data.len() as u64),
                ..n
            }),
            v => v,
        };
        let store = &mut self.dfa.store;
        store.set_field(&array, layout.length, &length)?;
        store.set_field(&array, layout.data, &Value::SysArray(bytes))?;
        store.set_field(&string, layout.internal_array, &array)?;
        Ok(string)
    }

    /// Walk `code` as a branch. Returns true if the branch reaches its end.
    fn branch(&mut self, interp: &AbstractInterpreter<'_>, site: Site, code: Code) -> Result<bool> {
        let step = interp.process_code(self, site.clazz, code)?;
        Ok(step.value.is_some())
    }
}

impl ProcessStatement for Analyze<'_, '_> {
    type Value = Value;
    type Output = ();
    type Error = DfaError;

    fn sequence(&mut self, _outputs: Vec<()>) {}

    fn unit_value(&mut self) -> Value {
        Value::Unit
    }

    fn statement_header(&mut self, _site: Site) {}

    fn comment(&mut self, _text: &str) {}

    fn nop(&mut self) {}

    fn current(&mut self, _cl: Clazz) -> Result<Step<Value, ()>> {
        Ok(Step::produce(self.frame_value(), ()))
    }

    fn outer(&mut self, _cl: Clazz) -> Result<Step<Value, ()>> {
        Ok(Step::produce(self.key.target.clone(), ()))
    }

    fn arg(&mut self, cl: Clazz, index: usize) -> Result<Step<Value, ()>> {
        let arg = self.key.args.get(index).cloned().ok_or_else(|| DfaError::ArityMismatch {
            clazz: self.dfa.ir.clazz_name(cl).to_string(),
            expected: index + 1,
            got: self.key.args.len(),
        })?;
        Ok(Step::produce(arg, ()))
    }

    fn constant(&mut self, site: Site, clazz: Clazz, data: &[u8]) -> Result<Step<Value, ()>> {
        let ir = self.dfa.ir;
        let value = match ir.clazz_special(clazz) {
            Some(SpecialClazz::Bool) => Some(Value::bool(data.first() == Some(&1))),
            Some(SpecialClazz::Numeric(kind)) => Some(Value::Numeric(NumericValue {
                clazz,
                kind,
                bits: kind.decode(data),
            })),
            Some(SpecialClazz::ConstString) => Some(self.const_string(site, data)?),
            Some(SpecialClazz::Unit) => Some(Value::Unit),
            Some(SpecialClazz::Universe) | None => {
                self.dfa.diagnose(Diagnostic::UnsupportedConstant {
                    site,
                    clazz: ir.clazz_name(clazz).to_string(),
                });
                None
            }
        };
        Ok(Step::from_option(value, ()))
    }

    fn adr_of(&mut self, value: Value) -> Result<Step<Value, ()>> {
        Ok(Step::produce(value, ()))
    }

    fn assign(&mut self, site: Site, access: &Access, target: Value, value: Value) -> Result<()> {
        self.access(site, access, target, &[value], false)?;
        Ok(())
    }

    fn call(
        &mut self,
        site: Site,
        access: &Access,
        target: Value,
        args: Vec<Value>,
    ) -> Result<Step<Value, ()>> {
        let cc = access.accessed;
        let mut result = Some(Value::Unit);
        if self.dfa.ir.clazz_has_precondition(cc) {
            result = self.call0(site, &target, &args, cc, true)?;
        }
        if result.is_some() && !access.precondition_only {
            result = self.access(site, access, target, &args, true)?;
        }
        Ok(Step::from_option(result, ()))
    }

    fn box_value(
        &mut self,
        value: Value,
        value_clazz: Clazz,
        ref_clazz: Clazz,
    ) -> Result<Step<Value, ()>> {
        if self.dfa.ir.clazz_is_ref(value_clazz) {
            return Ok(Step::produce(value, ()));
        }
        let mut boxed = Value::NoValue;
        for atom in value.atoms() {
            let b = match atom {
                Value::Instance(id) => {
                    Value::Instance(self.dfa.store.box_instance(*id, ref_clazz)?)
                }
                Value::NoValue | Value::Undefined => atom.clone(),
                _ => Value::boxed(atom.clone(), value_clazz, ref_clazz),
            };
            boxed = boxed.join(&b);
        }
        Ok(Step::produce(boxed, ()))
    }

    fn unbox(
        &mut self,
        value: Value,
        _ref_clazz: Clazz,
        _value_clazz: Clazz,
    ) -> Result<Step<Value, ()>> {
        let mut unboxed = Value::NoValue;
        for atom in value.atoms() {
            let u = match atom {
                Value::Boxed(b) => b.original.clone(),
                other => other.clone(),
            };
            unboxed = unboxed.join(&u);
        }
        Ok(Step::produce(unboxed, ()))
    }

    fn tag(
        &mut self,
        _cl: Clazz,
        value: Value,
        _value_clazz: Clazz,
        choice: Clazz,
        tag: u32,
    ) -> Result<Step<Value, ()>> {
        let tagged = if self.dfa.ir.clazz_special(choice) == Some(SpecialClazz::Bool) {
            Value::Bool(BoolValue::from_tag(tag))
        } else {
            Value::tagged(value, choice, tag)
        };
        Ok(Step::produce(tagged, ()))
    }

    fn env(&mut self, site: Site, effect: Clazz) -> Result<Step<Value, ()>> {
        let value = self.dfa.store.lookup_effect(self.key.env, effect)?;
        if value.is_none() {
            self.dfa.diagnose(Diagnostic::MissingEffect {
                site,
                effect: self.dfa.ir.clazz_name(effect).to_string(),
            });
        }
        Ok(Step::from_option(value, ()))
    }

    fn match_value(
        &mut self,
        interp: &AbstractInterpreter<'_>,
        site: Site,
        m: &Match,
        subject: Value,
    ) -> Result<Step<Value, ()>> {
        let is_bool = self.dfa.ir.clazz_special(m.subject) == Some(SpecialClazz::Bool);
        let mut returns = false;
        for case in &m.cases {
            let mut taken = false;
            let mut untagged = Value::NoValue;
            for &tag in &case.tags {
                for atom in subject.atoms() {
                    let hit = match atom {
                        Value::Bool(b) if is_bool => {
                            b.admits(tag).then(|| Value::Bool(BoolValue::from_tag(tag)))
                        }
                        Value::Tagged(t) => (t.tag == tag).then(|| t.original.clone()),
                        Value::NoValue | Value::Undefined => None,
                        other => return Err(DfaError::unexpected("tagged", other)),
                    };
                    if let Some(v) = hit {
                        taken = true;
                        untagged = untagged.join(&v);
                    }
                }
            }
            tracing::trace!(%site, %subject, tags = ?case.tags, taken, "match case");
            if !taken {
                continue;
            }
            if let Some(field) = case.field {
                let current = self.frame_value();
                self.dfa.store.set_field(&current, field, &untagged)?;
            }
            returns |= self.branch(interp, site, case.code)?;
        }
        Ok(Step::from_option(returns.then_some(Value::Unit), ()))
    }

    fn conditional(
        &mut self,
        interp: &AbstractInterpreter<'_>,
        site: Site,
        condition: Value,
        then_code: Code,
        else_code: Code,
    ) -> Result<Step<Value, ()>> {
        let mut branches: SmallVec<[Code; 2]> = SmallVec::new();
        let (mut then_taken, mut else_taken) = (false, false);
        for atom in condition.atoms().filter(|a| !a.is_absent()) {
            let b = atom.as_bool()?;
            then_taken |= b.admits(1);
            else_taken |= b.admits(0);
        }
        if then_taken {
            branches.push(then_code);
        }
        if else_taken {
            branches.push(else_code);
        }
        let mut returns = false;
        for code in branches {
            returns |= self.branch(interp, site, code)?;
        }
        Ok(Step::from_option(returns.then_some(Value::Unit), ()))
    }

    fn contract(
        &mut self,
        site: Site,
        kind: ContractKind,
        condition: Value,
    ) -> Result<Step<Value, ()>> {
        if condition == Value::FALSE {
            self.dfa.diagnose(Diagnostic::ContractViolation {
                site,
                kind,
                clazz: self.dfa.ir.clazz_name(site.clazz).to_string(),
            });
            return Ok(Step::diverge(()));
        }
        Ok(Step::produce(Value::Unit, ()))
    }
}
