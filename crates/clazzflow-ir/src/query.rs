use crate::{Clazz, Code, ContractKind, FeatureKind, Instr, SpecialClazz};

/// The clazzes involved in materializing a constant string.
///
/// A constant string is an instance of `clazz` whose `internal_array` field
/// holds an instance of `array_clazz`; that instance in turn carries the raw
/// bytes in its `data` field and the byte count in its `length` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstStringLayout {
    pub clazz: Clazz,
    pub internal_array: Clazz,
    pub array_clazz: Clazz,
    pub data: Clazz,
    pub length: Clazz,
    /// Element type of the raw byte array.
    pub element: Clazz,
}

/// Read-only view of a resolved clazz table and its instruction blocks.
///
/// Queries taking a clazz or code id may assume the id came from this table.
pub trait IrQuery {
    fn main_clazz(&self) -> Clazz;
    fn clazz_count(&self) -> usize;
    fn clazz_name(&self, cl: Clazz) -> &str;
    fn clazz_kind(&self, cl: Clazz) -> FeatureKind;
    fn clazz_outer(&self, cl: Clazz) -> Option<Clazz>;
    /// Result type of a routine or type of a field. `None` means unit.
    fn clazz_result(&self, cl: Clazz) -> Option<Clazz>;
    fn clazz_result_field(&self, cl: Clazz) -> Option<Clazz>;
    fn clazz_args(&self, cl: Clazz) -> &[Clazz];
    fn clazz_fields(&self, cl: Clazz) -> &[Clazz];
    fn clazz_outer_ref(&self, cl: Clazz) -> Option<Clazz>;
    fn clazz_code(&self, cl: Clazz) -> Option<Code>;
    /// The `index`th contract block of the given kind.
    fn clazz_contract(&self, cl: Clazz, kind: ContractKind, index: usize) -> Option<Code>;
    fn clazz_needs_code(&self, cl: Clazz) -> bool;
    fn clazz_is_ref(&self, cl: Clazz) -> bool;
    fn clazz_special(&self, cl: Clazz) -> Option<SpecialClazz>;
    fn special_clazz(&self, special: SpecialClazz) -> Option<Clazz>;
    fn clazz_intrinsic_name(&self, cl: Clazz) -> Option<&str>;
    fn clazz_generics(&self, cl: Clazz) -> &[Clazz];
    /// Effect type an effect intrinsic operates on.
    fn effect_type(&self, cl: Clazz) -> Option<Clazz>;
    /// The `call` routine of a function clazz.
    fn lookup_call(&self, cl: Clazz) -> Option<Clazz>;
    fn const_string(&self) -> Option<ConstStringLayout>;
    fn code_len(&self, code: Code) -> usize;
    fn instruction(&self, code: Code, index: usize) -> Option<&Instr>;

    fn clazz_is_unit(&self, cl: Clazz) -> bool {
        self.clazz_special(cl) == Some(SpecialClazz::Unit)
    }

    fn clazz_is_choice(&self, cl: Clazz) -> bool {
        self.clazz_kind(cl) == FeatureKind::Choice
    }

    /// True if accessing `cl` yields no value worth storing.
    fn clazz_result_is_unit(&self, cl: Clazz) -> bool {
        self.clazz_result(cl).is_none_or(|r| self.clazz_is_unit(r))
    }

    fn clazz_has_precondition(&self, cl: Clazz) -> bool {
        self.clazz_contract(cl, ContractKind::Pre, 0).is_some()
    }

    /// Position of `alternative` among the choice's alternatives.
    fn choice_tag(&self, choice: Clazz, alternative: Clazz) -> Option<u32> {
        self.clazz_generics(choice)
            .iter()
            .position(|&g| g == alternative)
            .and_then(|i| u32::try_from(i).ok())
    }
}
