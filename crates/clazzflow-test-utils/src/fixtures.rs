//! Small programs exercising one analysis feature each.
//!
//! Every fixture returns the built [`Program`] together with the clazzes and
//! sites its tests look at. Calls follow the operand stack convention of
//! [`Instr`]: the target is pushed before the arguments, and an assignment
//! pushes its target before the value.

use clazzflow_ir::{
    Access, Clazz, ClazzInfo, Code, ContractKind, FeatureKind, Instr, Match, MatchCase, Program,
    ProgramBuilder, Site, smallvec,
};

use crate::Prelude;

fn call(cl: Clazz) -> Instr {
    Instr::Call(Access::fixed(cl))
}

fn assign(field: Clazz) -> Instr {
    Instr::Assign(Access::fixed(field))
}

/// `current.field`
fn read(field: Clazz) -> [Instr; 2] {
    [Instr::Current, call(field)]
}

fn routine(name: &str) -> ClazzInfo {
    ClazzInfo::builder().name(name).kind(FeatureKind::Routine).build()
}

/// A routine with the given body and nothing else.
fn with_code(name: &str, code: Code) -> ClazzInfo {
    ClazzInfo::builder()
        .name(name)
        .kind(FeatureKind::Routine)
        .code(code)
        .build()
}

fn intrinsic(name: &str, result: Option<Clazz>, args: Vec<Clazz>) -> ClazzInfo {
    ClazzInfo::builder()
        .name(name)
        .kind(FeatureKind::Intrinsic)
        .intrinsic(name)
        .maybe_result(result)
        .args(args)
        .build()
}

/// A ref constructor with an empty body.
fn constructor(b: &mut ProgramBuilder, cl: Clazz, name: &str) {
    let body = b.code([]);
    b.define(
        cl,
        ClazzInfo::builder()
            .name(name)
            .kind(FeatureKind::Routine)
            .result(cl)
            .code(body)
            .is_ref(true)
            .build(),
    );
}

/// A ref effect clazz `name` with no code of its own.
fn effect(b: &mut ProgramBuilder, name: &str) -> Clazz {
    b.add(
        ClazzInfo::builder()
            .name(name)
            .kind(FeatureKind::Routine)
            .is_ref(true)
            .needs_code(false)
            .build(),
    )
}

/// `effect.name` implemented by the effect intrinsic `intrinsic`.
fn effect_operation(b: &mut ProgramBuilder, effect: Clazz, name: &str, intrinsic: &str) -> Clazz {
    b.add(
        ClazzInfo::builder()
            .name(format!("{}.{name}", b.name(effect)))
            .kind(FeatureKind::Intrinsic)
            .intrinsic(intrinsic)
            .outer(effect)
            .effect_type(effect)
            .build(),
    )
}

/// A routine `owner.name` returning the constant `value`.
fn constant_routine(
    b: &mut ProgramBuilder,
    p: &Prelude,
    owner: Clazz,
    name: &str,
    value: i32,
) -> Clazz {
    let cl = b.declare(format!("{}.{}", b.name(owner), name));
    let result = b.field(cl, "result", p.i32);
    let code = b.code([Instr::Current, p.i32_const(value), assign(result)]);
    b.define(
        cl,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .outer(owner)
            .result(p.i32)
            .result_field(result)
            .code(code)
            .build(),
    );
    cl
}

fn finish(mut b: ProgramBuilder, main: Clazz) -> Program {
    b.set_main(main);
    match b.build() {
        Ok(program) => program,
        Err(e) => panic!("fixture does not build: {e}"),
    }
}

// -- Dynamic dispatch ---------------------------------------------------------

pub struct Animals {
    pub animal: Clazz,
    pub dog: Clazz,
    pub cat: Clazz,
    pub speak: Clazz,
    pub dog_speak: Clazz,
    pub cat_speak: Clazz,
}

impl Animals {
    fn install(b: &mut ProgramBuilder, p: &Prelude) -> Self {
        let animal = b.add(
            ClazzInfo::builder()
                .name("Animal")
                .kind(FeatureKind::Routine)
                .is_ref(true)
                .needs_code(false)
                .build(),
        );
        let speak = b.add(
            ClazzInfo::builder()
                .name("Animal.speak")
                .kind(FeatureKind::Abstract)
                .outer(animal)
                .result(p.i32)
                .build(),
        );
        let dog = b.declare("Dog");
        constructor(b, dog, "Dog");
        let cat = b.declare("Cat");
        constructor(b, cat, "Cat");
        let dog_speak = constant_routine(b, p, dog, "speak", 1);
        let cat_speak = constant_routine(b, p, cat, "speak", 2);
        Self {
            animal,
            dog,
            cat,
            speak,
            dog_speak,
            cat_speak,
        }
    }

    fn speak_dynamically(&self) -> Instr {
        Instr::Call(Access::dynamic(
            self.speak,
            [(self.dog, self.dog_speak), (self.cat, self.cat_speak)],
        ))
    }
}

pub struct Dispatch {
    pub program: Program,
    pub prelude: Prelude,
    pub animals: Animals,
    pub main: Clazz,
    pub a: Clazz,
    pub b: Clazz,
    pub pet: Clazz,
    /// `d.speak` where `d` only ever holds a dog.
    pub monomorphic: Site,
    /// `pet.speak` where `pet` holds a dog or a cat.
    pub polymorphic: Site,
}

/// ```text
/// d := Dog; c := Cat
/// a := d.speak
/// pet := d; pet := c
/// b := pet.speak
/// ```
pub fn dispatch() -> Dispatch {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let animals = Animals::install(&mut b, &p);

    let main = b.declare("main");
    let d = b.field(main, "d", animals.dog);
    let c = b.field(main, "c", animals.cat);
    let a = b.field(main, "a", p.i32);
    let pet = b.field(main, "pet", animals.animal);
    let b_ = b.field(main, "b", p.i32);

    let mut code = vec![
        Instr::Current,
        Instr::Current,
        call(animals.dog),
        assign(d),
        Instr::Current,
        Instr::Current,
        call(animals.cat),
        assign(c),
        Instr::Current,
    ];
    code.extend(read(d));
    let monomorphic_index = code.len();
    code.push(animals.speak_dynamically());
    code.push(assign(a));
    for field in [d, c] {
        code.push(Instr::Current);
        code.extend(read(field));
        code.push(assign(pet));
    }
    code.push(Instr::Current);
    code.extend(read(pet));
    let polymorphic_index = code.len();
    code.push(animals.speak_dynamically());
    code.push(assign(b_));

    let body = b.code(code);
    b.define(main, with_code("main", body));
    Dispatch {
        program: finish(b, main),
        prelude: p,
        animals,
        main,
        a,
        b: b_,
        pet,
        monomorphic: Site::new(main, body, monomorphic_index),
        polymorphic: Site::new(main, body, polymorphic_index),
    }
}

pub struct DispatchFailure {
    pub program: Program,
    pub main: Clazz,
    pub site: Site,
}

/// A dynamic access whose only target type is `Dog` applied to a cat.
pub fn no_dispatch_target() -> DispatchFailure {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let animals = Animals::install(&mut b, &p);
    let main = b.declare("main");
    let body = b.code([
        Instr::Current,
        call(animals.cat),
        Instr::Call(Access::dynamic(animals.speak, [(animals.dog, animals.dog_speak)])),
        Instr::Pop,
    ]);
    b.define(main, with_code("main", body));
    DispatchFailure {
        program: finish(b, main),
        main,
        site: Site::new(main, body, 2),
    }
}

/// A static call of an abstract feature.
pub fn abstract_call() -> DispatchFailure {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let animals = Animals::install(&mut b, &p);
    let main = b.declare("main");
    let body = b.code([Instr::Current, call(animals.dog), call(animals.speak), Instr::Pop]);
    b.define(main, with_code("main", body));
    DispatchFailure {
        program: finish(b, main),
        main,
        site: Site::new(main, body, 2),
    }
}

/// A static call of a routine that has no code.
pub fn no_code() -> DispatchFailure {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let ghost = b.add(
        ClazzInfo::builder()
            .name("ghost")
            .kind(FeatureKind::Routine)
            .outer(p.universe)
            .needs_code(false)
            .build(),
    );
    let main = b.declare("main");
    let body = b.code([Instr::Current, call(ghost), Instr::Pop]);
    b.define(main, with_code("main", body));
    DispatchFailure {
        program: finish(b, main),
        main,
        site: Site::new(main, body, 1),
    }
}

// -- Call contexts ------------------------------------------------------------

pub struct Counter {
    pub program: Program,
    pub prelude: Prelude,
    pub main: Clazz,
    pub counter: Clazz,
    pub value: Clazz,
    pub set: Clazz,
    pub c1: Clazz,
    pub c2: Clazz,
    pub seen: Clazz,
}

/// ```text
/// Counter(init i32) ref is value := init
///   set(v i32) is value := v
/// c1 := Counter 0; c2 := Counter 0
/// c2.set 5
/// seen := c2.value
/// ```
pub fn counter() -> Counter {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);

    let counter = b.declare("Counter");
    let init = b.field(counter, "init", p.i32);
    let value = b.field(counter, "value", p.i32);
    let body = b.code([Instr::Current, Instr::Arg(0), assign(value)]);
    b.define(
        counter,
        ClazzInfo::builder()
            .name("Counter")
            .kind(FeatureKind::Routine)
            .result(counter)
            .args(vec![init])
            .code(body)
            .is_ref(true)
            .build(),
    );

    let set = b.declare("Counter.set");
    let v = b.field(set, "v", p.i32);
    let body = b.code([Instr::Outer, Instr::Arg(0), assign(value)]);
    b.define(
        set,
        ClazzInfo::builder()
            .name("Counter.set")
            .kind(FeatureKind::Routine)
            .outer(counter)
            .args(vec![v])
            .code(body)
            .build(),
    );

    let main = b.declare("main");
    let c1 = b.field(main, "c1", counter);
    let c2 = b.field(main, "c2", counter);
    let seen = b.field(main, "seen", p.i32);
    let mut code = Vec::new();
    for field in [c1, c2] {
        code.extend([
            Instr::Current,
            Instr::Current,
            p.i32_const(0),
            call(counter),
            assign(field),
        ]);
    }
    code.extend(read(c2));
    code.extend([p.i32_const(5), call(set), Instr::Pop, Instr::Current]);
    code.extend(read(c2));
    code.extend([call(value), assign(seen)]);
    let body = b.code(code);
    b.define(main, with_code("main", body));

    Counter {
        program: finish(b, main),
        prelude: p,
        main,
        counter,
        value,
        set,
        c1,
        c2,
        seen,
    }
}

// -- Effects ------------------------------------------------------------------

pub struct Effects {
    pub program: Program,
    pub main: Clazz,
    pub logger: Clazz,
    pub quiet: Clazz,
    pub loud: Clazz,
    pub fun_call: Clazz,
    /// `Fun.call.seen`, the logger visible inside `abortable`.
    pub inside: Clazz,
    /// `main.outside`, the logger visible in main.
    pub outside: Clazz,
}

/// ```text
/// Quiet.default
/// outside := Logger.env
/// Loud.abortable Fun    # Fun.call: seen := Logger.env
/// ```
pub fn effects() -> Effects {
    let mut b = ProgramBuilder::new();
    Prelude::install(&mut b);

    let logger = effect(&mut b, "Logger");
    let quiet = b.declare("Quiet");
    constructor(&mut b, quiet, "Quiet");
    let loud = b.declare("Loud");
    constructor(&mut b, loud, "Loud");

    let fun = b.declare("Fun");
    let fun_call = b.declare("Fun.call");
    let inside = b.field(fun_call, "seen", logger);
    let body = b.code([Instr::Current, Instr::Env(logger), assign(inside)]);
    b.define(
        fun_call,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .outer(fun)
            .code(body)
            .build(),
    );
    let body = b.code([]);
    b.define(
        fun,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .result(fun)
            .code(body)
            .is_ref(true)
            .call(fun_call)
            .build(),
    );

    let default = effect_operation(&mut b, logger, "default", "effect.default");
    let abortable = b.declare("Logger.abortable");
    let f = b.field(abortable, "f", fun);
    b.define(
        abortable,
        ClazzInfo::builder()
            .kind(FeatureKind::Intrinsic)
            .intrinsic("effect.abortable")
            .outer(logger)
            .effect_type(logger)
            .generics(vec![fun])
            .args(vec![f])
            .build(),
    );

    let main = b.declare("main");
    let outside = b.field(main, "outside", logger);
    let body = b.code([
        Instr::Current,
        call(quiet),
        call(default),
        Instr::Pop,
        Instr::Current,
        Instr::Env(logger),
        assign(outside),
        Instr::Current,
        call(loud),
        Instr::Current,
        call(fun),
        call(abortable),
        Instr::Pop,
    ]);
    b.define(main, with_code("main", body));

    Effects {
        program: finish(b, main),
        main,
        logger,
        quiet,
        loud,
        fun_call,
        inside,
        outside,
    }
}

/// Reads an effect nobody installed.
pub fn missing_effect() -> DispatchFailure {
    let mut b = ProgramBuilder::new();
    Prelude::install(&mut b);
    let logger = b.add(routine("Logger"));
    let main = b.declare("main");
    let body = b.code([Instr::Env(logger), Instr::Pop]);
    b.define(main, with_code("main", body));
    DispatchFailure {
        program: finish(b, main),
        main,
        site: Site::new(main, body, 0),
    }
}

pub struct EffectControl {
    pub program: Program,
    pub main: Clazz,
    pub exists: Clazz,
    pub replace: Clazz,
    pub abort: Clazz,
    pub quiet: Clazz,
    pub loud: Clazz,
    pub fun_call: Clazz,
    /// `main.before`, tested before any default is installed.
    pub before: Clazz,
    /// `main.after`, tested once `Quiet` is the default.
    pub after: Clazz,
    /// `main.seen`, the logger visible in main after the replace.
    pub seen: Clazz,
    /// `Fun.call.found`, tested inside `abortable`.
    pub found: Clazz,
    /// `Fun.call.unreached`, assigned after `abort`.
    pub unreached: Clazz,
}

/// ```text
/// before := effects.exists Logger
/// Quiet.default
/// after := effects.exists Logger
/// Loud.replace
/// seen := Logger.env
/// Loud.abortable Fun    # Fun.call: found := effects.exists Logger; Logger.abort; unreached := 1
/// ```
pub fn effect_control() -> EffectControl {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);

    let logger = effect(&mut b, "Logger");
    let quiet = b.declare("Quiet");
    constructor(&mut b, quiet, "Quiet");
    let loud = b.declare("Loud");
    constructor(&mut b, loud, "Loud");

    let default = effect_operation(&mut b, logger, "default", "effect.default");
    let replace = effect_operation(&mut b, logger, "replace", "effect.replace");
    let abort = effect_operation(&mut b, logger, "abort", "effect.abort");
    let exists = b.add(
        ClazzInfo::builder()
            .name("effects.exists")
            .kind(FeatureKind::Intrinsic)
            .intrinsic("effects.exists")
            .result(p.bool)
            .generics(vec![logger])
            .build(),
    );

    let fun = b.declare("Fun");
    let fun_call = b.declare("Fun.call");
    let found = b.field(fun_call, "found", p.bool);
    let unreached = b.field(fun_call, "unreached", p.i32);
    let body = b.code([
        Instr::Current,
        Instr::Current,
        call(exists),
        assign(found),
        Instr::Current,
        call(abort),
        Instr::Pop,
        Instr::Current,
        p.i32_const(1),
        assign(unreached),
    ]);
    b.define(
        fun_call,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .outer(fun)
            .code(body)
            .build(),
    );
    let body = b.code([]);
    b.define(
        fun,
        ClazzInfo::builder()
            .kind(FeatureKind::Routine)
            .result(fun)
            .code(body)
            .is_ref(true)
            .call(fun_call)
            .build(),
    );

    let abortable = b.declare("Logger.abortable");
    let f = b.field(abortable, "f", fun);
    b.define(
        abortable,
        ClazzInfo::builder()
            .kind(FeatureKind::Intrinsic)
            .intrinsic("effect.abortable")
            .outer(logger)
            .effect_type(logger)
            .generics(vec![fun])
            .args(vec![f])
            .build(),
    );

    let main = b.declare("main");
    let before = b.field(main, "before", p.bool);
    let after = b.field(main, "after", p.bool);
    let seen = b.field(main, "seen", logger);
    let body = b.code([
        Instr::Current,
        Instr::Current,
        call(exists),
        assign(before),
        Instr::Current,
        call(quiet),
        call(default),
        Instr::Pop,
        Instr::Current,
        Instr::Current,
        call(exists),
        assign(after),
        Instr::Current,
        call(loud),
        call(replace),
        Instr::Pop,
        Instr::Current,
        Instr::Env(logger),
        assign(seen),
        Instr::Current,
        call(loud),
        Instr::Current,
        call(fun),
        call(abortable),
        Instr::Pop,
    ]);
    b.define(main, with_code("main", body));

    EffectControl {
        program: finish(b, main),
        main,
        exists,
        replace,
        abort,
        quiet,
        loud,
        fun_call,
        before,
        after,
        seen,
        found,
        unreached,
    }
}

/// Replaces an effect that is neither installed nor defaulted.
pub fn replace_without_effect() -> DispatchFailure {
    let mut b = ProgramBuilder::new();
    Prelude::install(&mut b);
    let logger = effect(&mut b, "Logger");
    let quiet = b.declare("Quiet");
    constructor(&mut b, quiet, "Quiet");
    let replace = effect_operation(&mut b, logger, "replace", "effect.replace");
    let main = b.declare("main");
    let body = b.code([Instr::Current, call(quiet), call(replace), Instr::Pop]);
    b.define(main, with_code("main", body));
    DispatchFailure {
        program: finish(b, main),
        main,
        site: Site::new(main, body, 2),
    }
}

// -- Choices ------------------------------------------------------------------

pub struct Choice {
    pub program: Program,
    pub prelude: Prelude,
    pub main: Clazz,
    pub opt: Clazz,
    pub o: Clazz,
    pub o2: Clazz,
    pub got: Clazz,
    pub other: Clazz,
}

/// ```text
/// o Opt := tag 0 7
/// match o
///   v i32 => got := v
///   unit  => other := 0
/// o2 Opt := 3        # tagged on assignment
/// ```
pub fn choice() -> Choice {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let opt = b.add(
        ClazzInfo::builder()
            .name("Opt")
            .kind(FeatureKind::Choice)
            .generics(vec![p.i32, p.unit])
            .needs_code(false)
            .build(),
    );

    let main = b.declare("main");
    let o = b.field(main, "o", opt);
    let o2 = b.field(main, "o2", opt);
    let v = b.field(main, "v", p.i32);
    let got = b.field(main, "got", p.i32);
    let other = b.field(main, "other", p.i32);

    let mut some = vec![Instr::Current];
    some.extend(read(v));
    some.push(assign(got));
    let some = b.code(some);
    let none = b.code([Instr::Current, p.i32_const(0), assign(other)]);

    let mut code = vec![
        Instr::Current,
        p.i32_const(7),
        Instr::Tag {
            value: p.i32,
            choice: opt,
            tag: 0,
        },
        assign(o),
    ];
    code.extend(read(o));
    code.push(Instr::Match(Match {
        subject: opt,
        cases: vec![
            MatchCase {
                tags: smallvec![0],
                field: Some(v),
                code: some,
            },
            MatchCase {
                tags: smallvec![1],
                field: None,
                code: none,
            },
        ],
    }));
    code.extend([Instr::Current, p.i32_const(3), assign(o2)]);
    let body = b.code(code);
    b.define(main, with_code("main", body));

    Choice {
        program: finish(b, main),
        prelude: p,
        main,
        opt,
        o,
        o2,
        got,
        other,
    }
}

pub struct Conditional {
    pub program: Program,
    pub prelude: Prelude,
    pub main: Clazz,
    pub x: Clazz,
    pub y: Clazz,
    pub p: Clazz,
    pub q: Clazz,
}

/// ```text
/// if true then x := 1 else y := 2
/// if 1 = 2 then p := 3 else q := 4
/// ```
pub fn conditional() -> Conditional {
    let mut b = ProgramBuilder::new();
    let pre = Prelude::install(&mut b);
    let eq = b.declare("i32.infix ==");
    let other = b.field(eq, "other", pre.i32);
    b.define(
        eq,
        ClazzInfo::builder()
            .kind(FeatureKind::Intrinsic)
            .intrinsic("i32.infix ==")
            .outer(pre.i32)
            .result(pre.bool)
            .args(vec![other])
            .build(),
    );

    let main = b.declare("main");
    let fields: Vec<Clazz> = ["x", "y", "p", "q"]
        .into_iter()
        .map(|n| b.field(main, n, pre.i32))
        .collect();
    let (x, y, p, q) = (fields[0], fields[1], fields[2], fields[3]);
    let mut branch =
        |field: Clazz, value: i32| b.code([Instr::Current, pre.i32_const(value), assign(field)]);
    let (then1, else1, then2, else2) = (branch(x, 1), branch(y, 2), branch(p, 3), branch(q, 4));

    let body = b.code([
        pre.bool_const(true),
        Instr::If {
            then_code: then1,
            else_code: else1,
        },
        pre.i32_const(1),
        pre.i32_const(2),
        call(eq),
        Instr::If {
            then_code: then2,
            else_code: else2,
        },
    ]);
    b.define(main, with_code("main", body));

    Conditional {
        program: finish(b, main),
        prelude: pre,
        main,
        x,
        y,
        p,
        q,
    }
}

// -- Intrinsics and control -----------------------------------------------------

pub struct Intrinsics {
    pub program: Program,
    pub prelude: Prelude,
    pub main: Clazz,
    pub nano_time: Clazz,
    pub mystery: Clazz,
    pub t1: Clazz,
    pub t2: Clazz,
    pub r: Clazz,
}

/// ```text
/// t1 := nano_time; t2 := nano_time
/// r := helper 1; r := helper 2    # helper x := mystery.op x
/// ```
pub fn intrinsics() -> Intrinsics {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let nano_time = b.add(intrinsic("fuzion.std.nano_time", Some(p.i64), vec![]));
    let mystery = b.declare("mystery.op");
    let mystery_x = b.field(mystery, "x", p.i32);
    b.define(mystery, intrinsic("mystery.op", Some(p.i32), vec![mystery_x]));

    let helper = b.declare("helper");
    let helper_x = b.field(helper, "x", p.i32);
    let result = b.field(helper, "result", p.i32);
    let body = b.code([
        Instr::Current,
        Instr::Current,
        Instr::Arg(0),
        call(mystery),
        assign(result),
    ]);
    b.define(
        helper,
        ClazzInfo::builder()
            .name("helper")
            .kind(FeatureKind::Routine)
            .result(p.i32)
            .result_field(result)
            .args(vec![helper_x])
            .code(body)
            .build(),
    );

    let main = b.declare("main");
    let t1 = b.field(main, "t1", p.i64);
    let t2 = b.field(main, "t2", p.i64);
    let r = b.field(main, "r", p.i32);
    let mut code = Vec::new();
    for t in [t1, t2] {
        code.extend([Instr::Current, Instr::Current, call(nano_time), assign(t)]);
    }
    for x in [1, 2] {
        code.extend([
            Instr::Current,
            Instr::Current,
            p.i32_const(x),
            call(helper),
            assign(r),
        ]);
    }
    let body = b.code(code);
    b.define(main, with_code("main", body));

    Intrinsics {
        program: finish(b, main),
        prelude: p,
        main,
        nano_time,
        mystery,
        t1,
        t2,
        r,
    }
}

pub struct Exit {
    pub program: Program,
    pub main: Clazz,
    pub exit: Clazz,
    pub before: Clazz,
    pub after: Clazz,
}

/// ```text
/// before := 1; exit; after := 2
/// ```
pub fn exit() -> Exit {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let exit = b.add(intrinsic("fuzion.std.exit", None, vec![]));
    let main = b.declare("main");
    let before = b.field(main, "before", p.i32);
    let after = b.field(main, "after", p.i32);
    let body = b.code([
        Instr::Current,
        p.i32_const(1),
        assign(before),
        Instr::Current,
        call(exit),
        Instr::Pop,
        Instr::Current,
        p.i32_const(2),
        assign(after),
    ]);
    b.define(main, with_code("main", body));
    Exit {
        program: finish(b, main),
        main,
        exit,
        before,
        after,
    }
}

pub struct Contract {
    pub program: Program,
    pub main: Clazz,
    pub checked: Clazz,
    pub pre: Code,
    pub reached: Clazz,
}

/// ```text
/// checked pre false is
/// checked; reached := 1
/// ```
pub fn contract_violation() -> Contract {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);
    let pre = b.code([p.bool_const(false), Instr::Contract(ContractKind::Pre)]);
    let body = b.code([]);
    let checked = b.add(
        ClazzInfo::builder()
            .name("checked")
            .kind(FeatureKind::Routine)
            .code(body)
            .preconditions(vec![pre])
            .build(),
    );
    let main = b.declare("main");
    let reached = b.field(main, "reached", p.i32);
    let body = b.code([
        Instr::Current,
        call(checked),
        Instr::Pop,
        Instr::Current,
        p.i32_const(1),
        assign(reached),
    ]);
    b.define(main, with_code("main", body));
    Contract {
        program: finish(b, main),
        main,
        checked,
        pre,
        reached,
    }
}

pub struct Arrays {
    pub program: Program,
    pub prelude: Prelude,
    pub main: Clazz,
    pub arr: Clazz,
    pub x: Clazz,
    pub s: Clazz,
}

/// ```text
/// arr := alloc 4; arr[0] := 9; x := arr[0]
/// s := "hi"
/// ```
pub fn arrays() -> Arrays {
    let mut b = ProgramBuilder::new();
    let p = Prelude::install(&mut b);

    let alloc = b.declare("fuzion.sys.array.alloc");
    let count = b.field(alloc, "count", p.i32);
    b.define(alloc, intrinsic("fuzion.sys.array.alloc", Some(p.sys_array), vec![count]));
    let setel = b.declare("fuzion.sys.array.setel");
    let setel_args = vec![
        b.field(setel, "data", p.sys_array),
        b.field(setel, "index", p.i32),
        b.field(setel, "value", p.i32),
    ];
    b.define(setel, intrinsic("fuzion.sys.array.setel", None, setel_args));
    let get = b.declare("fuzion.sys.array.get");
    let get_args = vec![b.field(get, "data", p.sys_array), b.field(get, "index", p.i32)];
    b.define(get, intrinsic("fuzion.sys.array.get", Some(p.i32), get_args));

    let main = b.declare("main");
    let arr = b.field(main, "arr", p.sys_array);
    let x = b.field(main, "x", p.i32);
    let s = b.field(main, "s", p.const_string);
    let mut code = vec![
        Instr::Current,
        Instr::Current,
        p.i32_const(4),
        call(alloc),
        assign(arr),
        Instr::Current,
    ];
    code.extend(read(arr));
    code.extend([p.i32_const(0), p.i32_const(9), call(setel), Instr::Pop]);
    code.extend([Instr::Current, Instr::Current]);
    code.extend(read(arr));
    code.extend([p.i32_const(0), call(get), assign(x)]);
    code.extend([Instr::Current, p.string_const("hi"), assign(s)]);
    let body = b.code(code);
    b.define(main, with_code("main", body));

    Arrays {
        program: finish(b, main),
        prelude: p,
        main,
        arr,
        x,
        s,
    }
}
