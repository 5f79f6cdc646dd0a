use clazzflow_ir::{
    Clazz, ClazzInfo, ConstStringLayout, FeatureKind, Instr, NumericKind, ProgramBuilder,
    SpecialClazz,
};

/// The basic clazzes every test program needs.
#[derive(Clone, Copy, Debug)]
pub struct Prelude {
    pub universe: Clazz,
    pub unit: Clazz,
    pub false_: Clazz,
    pub true_: Clazz,
    pub bool: Clazz,
    pub i32: Clazz,
    pub i64: Clazz,
    pub u8: Clazz,
    pub f64: Clazz,
    /// Raw array as handed out by `fuzion.sys.array.alloc`.
    pub sys_array: Clazz,
    pub const_string: Clazz,
    pub string_array: Clazz,
    pub internal_array: Clazz,
    pub string_data: Clazz,
    pub string_length: Clazz,
}

fn opaque(name: &str, special: Option<SpecialClazz>) -> ClazzInfo {
    ClazzInfo::builder()
        .name(name)
        .kind(FeatureKind::Routine)
        .maybe_special(special)
        .needs_code(false)
        .build()
}

impl Prelude {
    /// Add the prelude clazzes to `b` and register the constant string
    /// layout.
    pub fn install(b: &mut ProgramBuilder) -> Self {
        let universe = b.add(opaque("universe", Some(SpecialClazz::Universe)));
        let unit = b.add(opaque("unit", Some(SpecialClazz::Unit)));
        let false_ = b.add(opaque("FALSE", None));
        let true_ = b.add(opaque("TRUE", None));
        let bool = b.add(
            ClazzInfo::builder()
                .name("bool")
                .kind(FeatureKind::Choice)
                .special(SpecialClazz::Bool)
                .generics(vec![false_, true_])
                .needs_code(false)
                .build(),
        );
        let numeric = |b: &mut ProgramBuilder, kind: NumericKind| {
            b.add(opaque(kind.name(), Some(SpecialClazz::Numeric(kind))))
        };
        let i32 = numeric(b, NumericKind::I32);
        let i64 = numeric(b, NumericKind::I64);
        let u8 = numeric(b, NumericKind::U8);
        let f64 = numeric(b, NumericKind::F64);
        let sys_array = b.add(opaque("fuzion.sys.Pointer", None));

        let string_array = b.declare("array u8");
        let string_data = b.field(string_array, "data", sys_array);
        let string_length = b.field(string_array, "length", i32);
        b.define(string_array, opaque("array u8", None));

        let const_string = b.declare("const_string");
        let internal_array = b.field(const_string, "internal_array", string_array);
        b.define(
            const_string,
            opaque("const_string", Some(SpecialClazz::ConstString)),
        );

        b.set_const_string(ConstStringLayout {
            clazz: const_string,
            internal_array,
            array_clazz: string_array,
            data: string_data,
            length: string_length,
            element: u8,
        });

        Self {
            universe,
            unit,
            false_,
            true_,
            bool,
            i32,
            i64,
            u8,
            f64,
            sys_array,
            const_string,
            string_array,
            internal_array,
            string_data,
            string_length,
        }
    }

    pub fn i32_const(&self, v: i32) -> Instr {
        Instr::Const {
            clazz: self.i32,
            data: NumericKind::I32.encode(v as u32 as u64),
        }
    }

    pub fn bool_const(&self, v: bool) -> Instr {
        Instr::Const {
            clazz: self.bool,
            data: vec![u8::from(v)],
        }
    }

    pub fn string_const(&self, s: &str) -> Instr {
        Instr::Const {
            clazz: self.const_string,
            data: s.as_bytes().to_vec(),
        }
    }
}
