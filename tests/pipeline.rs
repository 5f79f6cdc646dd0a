use clazzflow::dfa::NumericValue;
use clazzflow::prelude::*;
use clazzflow_test_utils::Prelude;

struct Boxing {
    program: Program,
    i32: Clazz,
    point: Clazz,
    ref_point: Clazz,
    main: Clazz,
    r: Clazz,
    x: Clazz,
    bx: Clazz,
    ub: Clazz,
}

/// ```text
/// r ref Point := Point 3
/// x := r.x
/// bx ref i32 := 5
/// ub := unbox bx
/// ```
fn boxing() -> Boxing {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);

    let point = b.declare("Point");
    let point_x = b.field(point, "x", p.i32);
    let body = b.code([]);
    b.define(
        point,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .result(point)
            .args(vec![point_x])
            .code(body)
            .build(),
    );
    let ref_point = b.add(
        ClazzInfo::builder()
            .name("ref Point")
            .kind(FeatureKind::Routine)
            .is_ref(true)
            .needs_code(false)
            .build(),
    );
    let ref_i32 = b.add(
        ClazzInfo::builder()
            .name("ref i32")
            .kind(FeatureKind::Routine)
            .is_ref(true)
            .needs_code(false)
            .build(),
    );

    let main = b.declare("main");
    let r = b.field(main, "r", ref_point);
    let x = b.field(main, "x", p.i32);
    let bx = b.field(main, "bx", ref_i32);
    let ub = b.field(main, "ub", p.i32);
    let call = |cl| Instr::Call(Access::fixed(cl));
    let assign = |cl| Instr::Assign(Access::fixed(cl));
    let code = b.code([
        Instr::Current,
        Instr::Current,
        p.i32_const(3),
        call(point),
        Instr::Box {
            value: point,
            reference: ref_point,
        },
        assign(r),
        Instr::Current,
        Instr::Current,
        call(r),
        call(point_x),
        assign(x),
        Instr::Current,
        p.i32_const(5),
        Instr::Box {
            value: p.i32,
            reference: ref_i32,
        },
        assign(bx),
        Instr::Current,
        Instr::Current,
        call(bx),
        Instr::Unbox {
            reference: ref_i32,
            value: p.i32,
        },
        assign(ub),
    ]);
    b.define(
        main,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .code(code)
            .build(),
    );
    b.set_main(main);

    Boxing {
        program: b.build().unwrap(),
        i32: p.i32,
        point,
        ref_point,
        main,
        r,
        x,
        bx,
        ub,
    }
}

fn i32_value(clazz: Clazz, v: u64) -> Value {
    Value::Numeric(NumericValue::exact(clazz, NumericKind::I32, v))
}

#[test]
fn boxed_instance_keeps_fields() {
    let f = boxing();
    let report = Dfa::new(&f.program).run().unwrap();

    assert!(report.is_instantiated(f.point));
    assert!(report.is_instantiated(f.ref_point));
    let Some(Value::Instance(r)) = report.field_of(f.main, f.r) else {
        panic!("r is not an instance");
    };
    assert_eq!(report.store().instance_clazz(r).unwrap(), f.ref_point);
    assert_eq!(report.field_of(f.main, f.x), Some(i32_value(f.i32, 3)));
    assert!(report.diagnostics().is_empty());
}

#[test]
fn boxed_value_unboxes_to_original() {
    let f = boxing();
    let report = Dfa::new(&f.program).run().unwrap();

    let five = i32_value(f.i32, 5);
    assert!(matches!(
        report.field_of(f.main, f.bx),
        Some(Value::Boxed(b)) if b.original == five
    ));
    assert_eq!(report.field_of(f.main, f.ub), Some(five));
}

#[test]
fn serial_runs_are_deterministic() {
    let f = boxing();
    let a = Dfa::new(&f.program).run().unwrap().to_string();
    let b = Dfa::new(&f.program).run().unwrap().to_string();
    assert_eq!(a, b);
    assert!(a.contains("ref Point"));
}
