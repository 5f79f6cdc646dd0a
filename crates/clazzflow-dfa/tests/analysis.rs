use clazzflow_dfa::{Dfa, DfaConfig, DfaError, DfaReport, Diagnostic, NumericValue, Value};
use clazzflow_ir::{Clazz, NumericKind};
use clazzflow_test_utils::fixtures;

fn i32_value(clazz: Clazz, v: i32) -> Value {
    Value::Numeric(NumericValue::exact(clazz, NumericKind::I32, v as u32 as u64))
}

fn any_i32(clazz: Clazz) -> Value {
    Value::Numeric(NumericValue::any(clazz, NumericKind::I32))
}

/// The single abstract instance of `clazz`.
fn instance_of(report: &DfaReport<'_>, clazz: Clazz) -> Value {
    let ids: Vec<_> = report
        .instances()
        .filter(|(_, key)| key.clazz == clazz)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids.len(), 1, "expected exactly one instance of {clazz}");
    Value::Instance(ids[0])
}

#[test]
fn dynamic_dispatch_resolves_per_receiver() {
    let f = fixtures::dispatch();
    let report = Dfa::new(&f.program).run().unwrap();
    let i32 = f.prelude.i32;

    assert_eq!(report.field_of(f.main, f.a), Some(i32_value(i32, 1)));
    assert_eq!(report.field_of(f.main, f.b), Some(any_i32(i32)));

    let dog = instance_of(&report, f.animals.dog);
    let cat = instance_of(&report, f.animals.cat);
    assert_eq!(report.field_of(f.main, f.pet), Some(dog.join(&cat)));

    assert_eq!(
        report.monomorphic_target(f.monomorphic),
        Some(f.animals.dog_speak)
    );
    assert_eq!(report.monomorphic_target(f.polymorphic), None);
    let targets = report.resolved_targets(f.polymorphic).unwrap();
    assert!(targets.contains(&f.animals.dog_speak));
    assert!(targets.contains(&f.animals.cat_speak));
    assert_eq!(targets.len(), 2);
    assert!(report.diagnostics().is_empty());
}

#[test]
fn every_receiver_has_a_resolved_target() {
    let f = fixtures::dispatch();
    let report = Dfa::new(&f.program).run().unwrap();
    let receivers = report.field_of(f.main, f.pet).unwrap();
    let targets = report.resolved_targets(f.polymorphic).unwrap();
    for atom in receivers.atoms() {
        let id = atom.as_instance().unwrap();
        let clazz = report.store().instance_clazz(id).unwrap();
        let routine = if clazz == f.animals.dog {
            f.animals.dog_speak
        } else {
            f.animals.cat_speak
        };
        assert!(targets.contains(&routine), "{atom} has no resolved target");
    }
}

#[test]
fn equal_calls_share_one_context() {
    let f = fixtures::counter();
    let report = Dfa::new(&f.program).run().unwrap();

    assert_eq!(report.call_contexts(f.counter).count(), 1);
    let counter = instance_of(&report, f.counter);
    assert_eq!(report.field_of(f.main, f.c1), Some(counter.clone()));
    assert_eq!(report.field_of(f.main, f.c2), Some(counter));

    let any = any_i32(f.prelude.i32);
    assert_eq!(report.field_of(f.counter, f.value), Some(any.clone()));
    assert_eq!(report.field_of(f.main, f.seen), Some(any));
    assert!(report.is_called(f.set));
}

#[test]
fn installed_effect_shadows_default() {
    let f = fixtures::effects();
    let report = Dfa::new(&f.program).run().unwrap();

    let quiet = instance_of(&report, f.quiet);
    let loud = instance_of(&report, f.loud);
    assert_eq!(report.field_of(f.main, f.outside), Some(quiet.clone()));
    assert_eq!(report.field_of(f.fun_call, f.inside), Some(loud.clone()));
    assert_eq!(report.store().default_effect(f.logger), Some(&quiet));

    let (_, key) = report.call_contexts(f.fun_call).next().unwrap();
    let env = key.env.expect("Fun.call runs inside abortable");
    assert_eq!(report.store().lookup_effect(Some(env), f.logger).unwrap(), Some(loud));
}

#[test]
fn missing_effect_is_reported() {
    let f = fixtures::missing_effect();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::MissingEffect { site, .. }] if *site == f.site
    ));
    assert!(report.has_errors());
}

#[test]
fn match_takes_only_possible_cases() {
    let f = fixtures::choice();
    let report = Dfa::new(&f.program).run().unwrap();
    let i32 = f.prelude.i32;

    assert_eq!(report.field_of(f.main, f.got), Some(i32_value(i32, 7)));
    assert_eq!(report.field_of(f.main, f.other), None);
    assert_eq!(
        report.field_of(f.main, f.o),
        Some(Value::tagged(i32_value(i32, 7), f.opt, 0))
    );
}

#[test]
fn assignment_to_choice_field_tags_value() {
    let f = fixtures::choice();
    let report = Dfa::new(&f.program).run().unwrap();
    assert_eq!(
        report.field_of(f.main, f.o2),
        Some(Value::tagged(i32_value(f.prelude.i32, 3), f.opt, 0))
    );
}

#[test]
fn conditional_walks_reachable_branches() {
    let f = fixtures::conditional();
    let report = Dfa::new(&f.program).run().unwrap();
    let i32 = f.prelude.i32;

    assert_eq!(report.field_of(f.main, f.x), Some(i32_value(i32, 1)));
    assert_eq!(report.field_of(f.main, f.y), None);
    assert_eq!(report.field_of(f.main, f.p), Some(i32_value(i32, 3)));
    assert_eq!(report.field_of(f.main, f.q), Some(i32_value(i32, 4)));
}

#[test]
fn unsupported_intrinsics_are_reported_once_per_call() {
    let f = fixtures::intrinsics();
    let report = Dfa::new(&f.program).run().unwrap();

    let names: Vec<&str> = report
        .diagnostics()
        .iter()
        .map(|d| match d {
            Diagnostic::UnsupportedIntrinsic { name, .. } => name.as_str(),
            other => panic!("unexpected diagnostic {other}"),
        })
        .collect();
    assert_eq!(names.iter().filter(|n| **n == "fuzion.std.nano_time").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "mystery.op").count(), 2);
    assert!(!report.has_errors());
    assert_eq!(report.field_of(f.main, f.t1), Some(Value::Undefined));
}

#[test]
fn registered_intrinsic_replaces_diagnostic() {
    fn mystery(
        dfa: &mut Dfa<'_>,
        _: clazzflow_dfa::CallId,
    ) -> Result<Option<Value>, clazzflow_dfa::DfaError> {
        let i32 = dfa.ir().special_clazz(clazzflow_ir::SpecialClazz::Numeric(NumericKind::I32));
        Ok(i32.map(any_i32))
    }

    let f = fixtures::intrinsics();
    let report = Dfa::new(&f.program)
        .with_intrinsic("mystery.op", mystery)
        .with_config(DfaConfig::new().with_report_intrinsics(false))
        .run()
        .unwrap();
    assert!(report.diagnostics().is_empty());
    assert_eq!(report.field_of(f.main, f.r), Some(any_i32(f.prelude.i32)));
}

#[test]
fn exit_ends_the_block() {
    let f = fixtures::exit();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(report.field_of(f.main, f.before).is_some());
    assert_eq!(report.field_of(f.main, f.after), None);
    let main = report.store().call_state(report.main()).unwrap();
    assert!(!main.returns);
}

#[test]
fn returning_intrinsics_are_marked_as_returning() {
    let f = fixtures::effect_control();
    let report = Dfa::new(&f.program).run().unwrap();
    for cl in [f.exists, f.replace] {
        let mut contexts = report.call_contexts(cl).peekable();
        assert!(contexts.peek().is_some());
        for (id, _) in contexts {
            assert!(report.store().call_state(id).unwrap().returns);
        }
    }
    let (abort, _) = report.call_contexts(f.abort).next().unwrap();
    assert!(!report.store().call_state(abort).unwrap().returns);

    let f = fixtures::exit();
    let report = Dfa::new(&f.program).run().unwrap();
    let (exit, _) = report.call_contexts(f.exit).next().unwrap();
    assert!(!report.store().call_state(exit).unwrap().returns);
}

#[test]
fn exists_is_unknown_until_an_effect_is_installed() {
    let f = fixtures::effect_control();
    let report = Dfa::new(&f.program).run().unwrap();
    assert_eq!(report.field_of(f.main, f.before), Some(Value::BOOL));
    assert_eq!(report.field_of(f.main, f.after), Some(Value::TRUE));
    assert_eq!(report.field_of(f.fun_call, f.found), Some(Value::TRUE));
}

#[test]
fn replace_joins_into_the_default() {
    let f = fixtures::effect_control();
    let report = Dfa::new(&f.program).run().unwrap();
    let quiet = instance_of(&report, f.quiet);
    let loud = instance_of(&report, f.loud);
    assert_eq!(report.field_of(f.main, f.seen), Some(quiet.join(&loud)));
    assert!(report.diagnostics().is_empty());
}

#[test]
fn abort_ends_the_wrapped_call() {
    let f = fixtures::effect_control();
    let report = Dfa::new(&f.program).run().unwrap();
    assert_eq!(report.field_of(f.fun_call, f.unreached), None);
    let (call, _) = report.call_contexts(f.fun_call).next().unwrap();
    assert!(!report.store().call_state(call).unwrap().returns);
    assert!(report.store().call_state(report.main()).unwrap().returns);
}

#[test]
fn replacing_an_absent_effect_fails() {
    let f = fixtures::replace_without_effect();
    let result = Dfa::new(&f.program).run();
    assert!(matches!(result, Err(DfaError::NoEffectToReplace { .. })));
}

#[test]
fn failing_precondition_is_reported() {
    let f = fixtures::contract_violation();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::ContractViolation { site, .. }] if site.clazz == f.checked && site.code == f.pre
    ));
    assert_eq!(report.field_of(f.main, f.reached), None);
    assert!(!report.is_called(f.checked));
}

#[test]
fn dispatch_failures_are_reported() {
    let f = fixtures::no_dispatch_target();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::NoDispatchTarget { site, .. }] if *site == f.site
    ));

    let f = fixtures::abstract_call();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::AbstractCalled { site, clazz }] if *site == f.site && clazz == "Animal.speak"
    ));

    let f = fixtures::no_code();
    let report = Dfa::new(&f.program).run().unwrap();
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::NoCode { site, .. }] if *site == f.site
    ));
}

#[test]
fn arrays_collect_stored_elements() {
    let f = fixtures::arrays();
    let report = Dfa::new(&f.program).run().unwrap();
    assert_eq!(report.field_of(f.main, f.x), Some(i32_value(f.prelude.i32, 9)));
    assert!(matches!(report.field_of(f.main, f.arr), Some(Value::SysArray(_))));
}

#[test]
fn constant_string_is_materialized() {
    let f = fixtures::arrays();
    let report = Dfa::new(&f.program).run().unwrap();
    let p = f.prelude;

    let string = instance_of(&report, p.const_string);
    assert_eq!(report.field_of(f.main, f.s), Some(string));
    let array = instance_of(&report, p.string_array);
    assert_eq!(report.field_of(p.const_string, p.internal_array), Some(array));
    assert_eq!(
        report.field_of(p.string_array, p.string_length),
        Some(i32_value(p.i32, 2))
    );

    let Some(Value::SysArray(bytes)) = report.field_of(p.string_array, p.string_data) else {
        panic!("constant string has no byte array");
    };
    assert_eq!(
        report.store().array_get(bytes).unwrap(),
        Value::Numeric(NumericValue::any(p.u8, NumericKind::U8))
    );
}

#[test]
fn why_traces_back_to_main() {
    let f = fixtures::effects();
    let report = Dfa::new(&f.program).run().unwrap();
    let (call, _) = report.call_contexts(f.fun_call).next().unwrap();
    let chain = report.why(call);
    assert_eq!(chain.first(), Some(&report.main()));
    assert_eq!(chain.last(), Some(&call));
    assert_eq!(chain.len(), 3);
    assert_eq!(report.callers(call).count(), 1);
}
