use clazzflow_dfa::{
    ArrayId, Dfa, DfaConfig, DfaError, InstanceContext, InstanceId, NumericValue, Value,
};
use clazzflow_ir::{Clazz, NumericKind};
use clazzflow_test_utils::{fixtures, lattice};

#[test]
fn stored_values_only_grow() {
    let f = fixtures::dispatch();
    let mut dfa = Dfa::new(&f.program);
    let mut previous = dfa.store().clone();
    while dfa.sweep().unwrap() {
        let store = dfa.store();
        assert!(store.instance_count() >= previous.instance_count());
        assert!(store.call_count() >= previous.call_count());
        for (id, _, fields) in previous.instances() {
            let now = store.fields(id).unwrap();
            for (field, old) in fields {
                let new = now.get(field).expect("a field is never unset");
                assert!(old.is_subseteq(new), "{field} of {id} shrank from {old} to {new}");
            }
        }
        for (id, _, state) in previous.calls() {
            assert!(!state.returns || store.call_state(id).unwrap().returns);
        }
        previous = store.clone();
    }
    assert!(!dfa.sweep().unwrap(), "a quiet store stays quiet");
}

#[test]
fn repeated_runs_agree() {
    let f = fixtures::effects();
    let first = Dfa::new(&f.program).run().unwrap().to_string();
    let second = Dfa::new(&f.program).run().unwrap().to_string();
    assert_eq!(first, second);
}

#[test]
fn iteration_limit_aborts() {
    let f = fixtures::dispatch();
    let result = Dfa::new(&f.program)
        .with_config(DfaConfig::new().with_max_iterations(1))
        .run();
    assert!(matches!(result, Err(DfaError::IterationLimit(1))));
}

#[test]
fn limit_above_need_is_harmless() {
    let f = fixtures::counter();
    let report = Dfa::new(&f.program)
        .with_config(DfaConfig::new().with_max_iterations(100))
        .run()
        .unwrap();
    assert!(report.iterations() < 100);
}

#[test]
fn creating_clazz_context_splits_instances() {
    let f = fixtures::counter();
    let report = Dfa::new(&f.program)
        .with_config(DfaConfig::new().with_instance_context(InstanceContext::CreatingClazz))
        .run()
        .unwrap();
    let counters: Vec<_> = report
        .instances()
        .filter(|(_, key)| key.clazz == f.counter)
        .map(|(_, key)| key.context)
        .collect();
    assert_eq!(counters, vec![Some(f.main)]);
}

#[test]
fn value_join_laws() {
    let i32 = Clazz::from_raw(5);
    let opt = Clazz::from_raw(30);
    let num = |bits| Value::Numeric(NumericValue { clazz: i32, kind: NumericKind::I32, bits });
    let inst = |i| Value::Instance(InstanceId::from_raw(i));
    let samples = vec![
        Value::NoValue,
        Value::Undefined,
        Value::Unit,
        Value::TRUE,
        Value::FALSE,
        Value::BOOL,
        num(Some(1)),
        num(Some(2)),
        num(None),
        inst(0),
        inst(1),
        inst(0).join(&inst(1)),
        Value::boxed(num(Some(1)), i32, opt),
        Value::tagged(num(Some(1)), opt, 0),
        Value::tagged(Value::Unit, opt, 1),
        Value::SysArray(ArrayId::from_raw(0)),
    ];
    lattice::assert_semilattice_laws(&samples);
    lattice::assert_bottom(&Value::NoValue, &samples);
}
