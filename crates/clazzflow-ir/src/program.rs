use rustc_hash::FxHashMap;

use crate::{
    Clazz, ClazzInfo, Code, ConstStringLayout, ContractKind, FeatureKind, Instr, IrQuery,
    ProgramError, SpecialClazz,
};

/// An in-memory clazz table.
///
/// Assembled with [`ProgramBuilder`], which validates every cross reference
/// so that queries never observe a dangling id.
#[derive(Clone, Debug)]
pub struct Program {
    clazzes: Vec<ClazzInfo>,
    names: Vec<String>,
    by_name: FxHashMap<String, Clazz>,
    fields: Vec<Vec<Clazz>>,
    codes: Vec<Vec<Instr>>,
    specials: FxHashMap<SpecialClazz, Clazz>,
    main: Clazz,
    const_string: Option<ConstStringLayout>,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn info(&self, cl: Clazz) -> &ClazzInfo {
        &self.clazzes[cl.0]
    }

    /// Look a clazz up by its name.
    pub fn find(&self, name: &str) -> Option<Clazz> {
        self.by_name.get(name).copied()
    }

    pub fn clazzes(&self) -> impl Iterator<Item = Clazz> + '_ {
        (0..self.clazzes.len()).map(Clazz)
    }
}

impl IrQuery for Program {
    fn main_clazz(&self) -> Clazz {
        self.main
    }

    fn clazz_count(&self) -> usize {
        self.clazzes.len()
    }

    fn clazz_name(&self, cl: Clazz) -> &str {
        &self.names[cl.0]
    }

    fn clazz_kind(&self, cl: Clazz) -> FeatureKind {
        self.info(cl).kind
    }

    fn clazz_outer(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).outer
    }

    fn clazz_result(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).result
    }

    fn clazz_result_field(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).result_field
    }

    fn clazz_args(&self, cl: Clazz) -> &[Clazz] {
        &self.info(cl).args
    }

    fn clazz_fields(&self, cl: Clazz) -> &[Clazz] {
        &self.fields[cl.0]
    }

    fn clazz_outer_ref(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).outer_ref
    }

    fn clazz_code(&self, cl: Clazz) -> Option<Code> {
        self.info(cl).code
    }

    fn clazz_contract(&self, cl: Clazz, kind: ContractKind, index: usize) -> Option<Code> {
        let info = self.info(cl);
        match kind {
            ContractKind::Pre => info.preconditions.get(index).copied(),
            ContractKind::Post => info.postconditions.get(index).copied(),
        }
    }

    fn clazz_needs_code(&self, cl: Clazz) -> bool {
        self.info(cl).needs_code
    }

    fn clazz_is_ref(&self, cl: Clazz) -> bool {
        self.info(cl).is_ref
    }

    fn clazz_special(&self, cl: Clazz) -> Option<SpecialClazz> {
        self.info(cl).special
    }

    fn special_clazz(&self, special: SpecialClazz) -> Option<Clazz> {
        self.specials.get(&special).copied()
    }

    fn clazz_intrinsic_name(&self, cl: Clazz) -> Option<&str> {
        self.info(cl).intrinsic.as_deref()
    }

    fn clazz_generics(&self, cl: Clazz) -> &[Clazz] {
        &self.info(cl).generics
    }

    fn effect_type(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).effect_type
    }

    fn lookup_call(&self, cl: Clazz) -> Option<Clazz> {
        self.info(cl).call
    }

    fn const_string(&self) -> Option<ConstStringLayout> {
        self.const_string
    }

    fn code_len(&self, code: Code) -> usize {
        self.codes.get(code.0).map_or(0, Vec::len)
    }

    fn instruction(&self, code: Code, index: usize) -> Option<&Instr> {
        self.codes.get(code.0)?.get(index)
    }
}

/// Incrementally assembles a [`Program`].
///
/// Clazzes may be declared before they are defined so that mutually
/// referring clazzes (a routine and its argument fields, a type and its
/// inner routines) can be wired up in any order.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    names: Vec<String>,
    clazzes: Vec<Option<ClazzInfo>>,
    codes: Vec<Vec<Instr>>,
    main: Option<Clazz>,
    const_string: Option<ConstStringLayout>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a clazz defined later with [`define`](Self::define).
    pub fn declare(&mut self, name: impl Into<String>) -> Clazz {
        let id = Clazz(self.clazzes.len());
        self.names.push(name.into());
        self.clazzes.push(None);
        id
    }

    /// Define a previously declared clazz. A name set on `info` replaces the
    /// declared one.
    pub fn define(&mut self, cl: Clazz, info: ClazzInfo) -> &mut Self {
        if let Some(name) = &info.name {
            self.names[cl.0] = name.clone();
        }
        self.clazzes[cl.0] = Some(info);
        self
    }

    /// Declare and define in one go.
    pub fn add(&mut self, info: ClazzInfo) -> Clazz {
        let name = info
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.clazzes.len()));
        let cl = self.declare(name);
        self.define(cl, info);
        cl
    }

    /// Add a field `name` of type `ty` to `owner`.
    pub fn field(&mut self, owner: Clazz, name: &str, ty: Clazz) -> Clazz {
        let qualified = format!("{}.{}", self.names[owner.0], name);
        self.add(
            ClazzInfo::builder()
                .name(qualified)
                .kind(FeatureKind::Field)
                .outer(owner)
                .result(ty)
                .build(),
        )
    }

    pub fn code(&mut self, instrs: impl IntoIterator<Item = Instr>) -> Code {
        let id = Code(self.codes.len());
        self.codes.push(instrs.into_iter().collect());
        id
    }

    pub fn set_main(&mut self, cl: Clazz) -> &mut Self {
        self.main = Some(cl);
        self
    }

    pub fn set_const_string(&mut self, layout: ConstStringLayout) -> &mut Self {
        self.const_string = Some(layout);
        self
    }

    /// Name a clazz was declared with.
    pub fn name(&self, cl: Clazz) -> &str {
        &self.names[cl.0]
    }

    pub fn build(self) -> Result<Program, ProgramError> {
        let count = self.clazzes.len();
        let mut clazzes = Vec::with_capacity(count);
        for (i, slot) in self.clazzes.into_iter().enumerate() {
            match slot {
                Some(info) => clazzes.push(info),
                None => {
                    return Err(ProgramError::UndefinedClazz {
                        clazz: Clazz(i),
                        name: self.names[i].clone(),
                    });
                }
            }
        }

        let check = Checker {
            names: &self.names,
            clazz_count: count,
            code_count: self.codes.len(),
        };
        for (i, info) in clazzes.iter().enumerate() {
            check.clazz_refs(Clazz(i), info)?;
            let needs_result_field = info.kind == FeatureKind::Routine
                && info.result_field.is_none()
                && info.result.is_some_and(|r| {
                    r != Clazz(i) && clazzes[r.0].special != Some(SpecialClazz::Unit)
                });
            if needs_result_field {
                return Err(ProgramError::MissingResultField {
                    name: self.names[i].clone(),
                });
            }
        }
        for (i, instrs) in self.codes.iter().enumerate() {
            for instr in instrs {
                check.instr_refs(Code(i), instr)?;
            }
        }

        let main = self.main.ok_or(ProgramError::MissingMain)?;
        check.clazz("main", main)?;

        let mut fields = vec![Vec::new(); count];
        let mut specials = FxHashMap::default();
        for (i, info) in clazzes.iter().enumerate() {
            if let (FeatureKind::Field, Some(owner)) = (info.kind, info.outer) {
                fields[owner.0].push(Clazz(i));
            }
            if let Some(special) = info.special {
                specials.entry(special).or_insert(Clazz(i));
            }
        }

        let mut by_name = FxHashMap::default();
        for (i, name) in self.names.iter().enumerate() {
            by_name.entry(name.clone()).or_insert(Clazz(i));
        }
        Ok(Program {
            clazzes,
            names: self.names,
            by_name,
            fields,
            codes: self.codes,
            specials,
            main,
            const_string: self.const_string,
        })
    }
}

struct Checker<'a> {
    names: &'a [String],
    clazz_count: usize,
    code_count: usize,
}

impl Checker<'_> {
    fn clazz(&self, referrer: &str, cl: Clazz) -> Result<(), ProgramError> {
        if cl.0 < self.clazz_count {
            Ok(())
        } else {
            Err(ProgramError::UnknownClazz {
                referrer: referrer.to_string(),
                clazz: cl,
            })
        }
    }

    fn code(&self, referrer: &str, code: Code) -> Result<(), ProgramError> {
        if code.0 < self.code_count {
            Ok(())
        } else {
            Err(ProgramError::UnknownCode {
                referrer: referrer.to_string(),
                code,
            })
        }
    }

    fn clazz_refs(&self, cl: Clazz, info: &ClazzInfo) -> Result<(), ProgramError> {
        let referrer = &self.names[cl.0];
        let single = [
            info.outer,
            info.result,
            info.result_field,
            info.outer_ref,
            info.effect_type,
            info.call,
        ];
        for r in single.into_iter().flatten() {
            self.clazz(referrer, r)?;
        }
        for &r in info.args.iter().chain(&info.generics) {
            self.clazz(referrer, r)?;
        }
        for &c in info
            .code
            .iter()
            .chain(&info.preconditions)
            .chain(&info.postconditions)
        {
            self.code(referrer, c)?;
        }
        Ok(())
    }

    fn instr_refs(&self, code: Code, instr: &Instr) -> Result<(), ProgramError> {
        let referrer = code.to_string();
        let referrer = referrer.as_str();
        match instr {
            Instr::Const { clazz, .. } | Instr::Env(clazz) => self.clazz(referrer, *clazz),
            Instr::Assign(access) | Instr::Call(access) => {
                self.clazz(referrer, access.accessed)?;
                for &(tt, cc) in &access.targets {
                    self.clazz(referrer, tt)?;
                    self.clazz(referrer, cc)?;
                }
                Ok(())
            }
            Instr::Box { value, reference } | Instr::Unbox { reference, value } => {
                self.clazz(referrer, *value)?;
                self.clazz(referrer, *reference)
            }
            Instr::Tag { value, choice, .. } => {
                self.clazz(referrer, *value)?;
                self.clazz(referrer, *choice)
            }
            Instr::Match(m) => {
                self.clazz(referrer, m.subject)?;
                for case in &m.cases {
                    if let Some(f) = case.field {
                        self.clazz(referrer, f)?;
                    }
                    self.code(referrer, case.code)?;
                }
                Ok(())
            }
            Instr::If {
                then_code,
                else_code,
            } => {
                self.code(referrer, *then_code)?;
                self.code(referrer, *else_code)
            }
            Instr::Current
            | Instr::Outer
            | Instr::Arg(_)
            | Instr::AdrOf
            | Instr::Contract(_)
            | Instr::Pop
            | Instr::Comment(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Access;

    fn unit(b: &mut ProgramBuilder) -> Clazz {
        b.add(
            ClazzInfo::builder()
                .name("unit")
                .kind(FeatureKind::Routine)
                .special(SpecialClazz::Unit)
                .build(),
        )
    }

    #[test]
    fn fields_are_collected_from_their_owner() {
        let mut b = Program::builder();
        let u = unit(&mut b);
        let main = b.declare("main");
        let x = b.field(main, "x", u);
        let y = b.field(main, "y", u);
        b.define(main, ClazzInfo::builder().kind(FeatureKind::Routine).build());
        b.set_main(main);
        let p = b.build().unwrap();

        assert_eq!(p.clazz_fields(main), &[x, y]);
        assert_eq!(p.clazz_name(x), "main.x");
        assert_eq!(p.special_clazz(SpecialClazz::Unit), Some(u));
        assert_eq!(p.find("main.y"), Some(y));
    }

    #[test]
    fn find_returns_first_clazz_with_name() {
        let mut b = Program::builder();
        let u = unit(&mut b);
        let first = b.declare("twin");
        let second = b.declare("twin");
        for cl in [first, second] {
            b.define(cl, ClazzInfo::builder().kind(FeatureKind::Routine).build());
        }
        b.set_main(first);
        let p = b.build().unwrap();

        assert_eq!(p.find("twin"), Some(first));
        assert_eq!(p.find("unit"), Some(u));
        assert_eq!(p.find("missing"), None);
    }

    #[test]
    fn undefined_clazz_is_rejected() {
        let mut b = Program::builder();
        let main = b.declare("main");
        b.set_main(main);
        let err = b.build().unwrap_err();
        assert!(matches!(err, ProgramError::UndefinedClazz { name, .. } if name == "main"));
    }

    #[test]
    fn dangling_code_in_match_is_rejected() {
        let mut b = Program::builder();
        let u = unit(&mut b);
        let body = b.code([Instr::Match(crate::Match {
            subject: u,
            cases: vec![crate::MatchCase {
                tags: crate::smallvec![0],
                field: None,
                code: Code::from_raw(42),
            }],
        })]);
        let main = b.add(
            ClazzInfo::builder()
                .name("main")
                .kind(FeatureKind::Routine)
                .code(body)
                .build(),
        );
        b.set_main(main);
        let err = b.build().unwrap_err();
        assert!(matches!(err, ProgramError::UnknownCode { code, .. } if code.raw() == 42));
    }

    #[test]
    fn routine_result_needs_a_field() {
        let mut b = Program::builder();
        let i32_ = b.add(
            ClazzInfo::builder()
                .name("i32")
                .kind(FeatureKind::Routine)
                .special(SpecialClazz::Numeric(crate::NumericKind::I32))
                .build(),
        );
        let f = b.add(
            ClazzInfo::builder()
                .name("f")
                .kind(FeatureKind::Routine)
                .result(i32_)
                .build(),
        );
        let body = b.code([Instr::Current, Instr::Call(Access::fixed(f)), Instr::Pop]);
        let main = b.add(
            ClazzInfo::builder()
                .name("main")
                .kind(FeatureKind::Routine)
                .code(body)
                .build(),
        );
        b.set_main(main);
        let err = b.build().unwrap_err();
        assert_eq!(err.to_string(), "routine 'f' has a result but no result field");
    }

    #[test]
    fn missing_main_is_rejected() {
        let mut b = Program::builder();
        unit(&mut b);
        assert!(matches!(b.build(), Err(ProgramError::MissingMain)));
    }
}
