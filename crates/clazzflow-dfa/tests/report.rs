use clazzflow_dfa::Dfa;
use clazzflow_test_utils::fixtures;

#[test]
fn counter_report() {
    let f = fixtures::counter();
    let report = Dfa::new(&f.program).run().unwrap();
    insta::assert_snapshot!(report.to_string(), @r"
    instances:
      instance#0 main
        main.c1 = instance#1
        main.c2 = instance#1
        main.seen = i32
      instance#1 Counter
        Counter.init = i32:0
        Counter.value = i32
      instance#2 Counter.set
        Counter.set.v = i32:5
    calls:
      call#0 main() on unit
      call#1 Counter(i32:0) on instance#0
      call#2 Counter.set(i32:5) on instance#1
    ");
}

#[test]
fn reachable_clazzes_of_counter() {
    let f = fixtures::counter();
    let report = Dfa::new(&f.program).run().unwrap();
    let reachable = report.reachable_clazzes();
    assert!(reachable.contains(&f.main));
    assert!(reachable.contains(&f.counter));
    assert!(reachable.contains(&f.set));
    assert_eq!(reachable.len(), 3);
    assert!(report.is_instantiated(f.counter));
    assert!(!report.is_instantiated(f.prelude.const_string));
    assert_eq!(report.call_graph().edge_count(), 2);
}
