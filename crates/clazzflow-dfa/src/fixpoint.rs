use std::collections::{BTreeMap, BTreeSet};

use clazzflow_interpreter::AbstractInterpreter;
use clazzflow_ir::{Clazz, FeatureKind, IrQuery, Site, SpecialClazz};
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use tracing::{debug, info, trace, warn};

use crate::analyze::Analyze;
use crate::{
    CallId, CallKey, DfaConfig, DfaError, DfaReport, Diagnostic, InstanceContext, Intrinsic,
    IntrinsicFn, IntrinsicTable, NumericValue, Store, Value,
};

/// Whole-program data flow analysis.
///
/// Starting from a call to the main clazz, every known call is re-analyzed
/// in sweeps until a sweep leaves the [`Store`] unchanged. Calls discovered
/// during a sweep are first analyzed by the next one. Once quiet, one more
/// sweep runs with diagnostics enabled so that only findings about the
/// converged state are reported.
///
/// ```ignore
/// let report = Dfa::new(&program).run()?;
/// for d in report.diagnostics() {
///     eprintln!("{d}");
/// }
/// ```
pub struct Dfa<'ir> {
    pub(crate) ir: &'ir dyn IrQuery,
    pub(crate) config: DfaConfig,
    intrinsics: IntrinsicTable,
    pub(crate) store: Store,
    reporting: bool,
    diagnostics: IndexSet<Diagnostic, FxBuildHasher>,
    dispatch: BTreeMap<Site, BTreeSet<Clazz>>,
    edges: BTreeSet<(CallId, CallId)>,
    main: Option<CallId>,
    iterations: usize,
}

impl<'ir> Dfa<'ir> {
    pub fn new(ir: &'ir dyn IrQuery) -> Self {
        Self {
            ir,
            config: DfaConfig::default(),
            intrinsics: IntrinsicTable::standard(),
            store: Store::new(),
            reporting: false,
            diagnostics: IndexSet::default(),
            dispatch: BTreeMap::new(),
            edges: BTreeSet::new(),
            main: None,
            iterations: 0,
        }
    }

    pub fn with_config(mut self, config: DfaConfig) -> Self {
        self.config = config;
        self
    }

    /// Register or override the abstract semantics of an intrinsic.
    pub fn with_intrinsic(mut self, name: impl Into<String>, handler: IntrinsicFn) -> Self {
        self.intrinsics.insert(name, Intrinsic::Handler(handler));
        self
    }

    pub fn ir(&self) -> &'ir dyn IrQuery {
        self.ir
    }

    pub fn config(&self) -> &DfaConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn is_reporting(&self) -> bool {
        self.reporting
    }

    /// Number of sweeps run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    // -- Fixpoint -------------------------------------------------------------

    /// Register the call to the main clazz. Main runs without a target and
    /// without an environment.
    pub fn seed(&mut self) -> CallId {
        if let Some(main) = self.main {
            return main;
        }
        let key = CallKey {
            clazz: self.ir.main_clazz(),
            pre: false,
            target: Value::Unit,
            args: Vec::new(),
            env: None,
        };
        let main = self.store.call(key, None, None);
        self.main = Some(main);
        main
    }

    /// Analyze every call known at the start of the sweep once. Returns true
    /// if the store changed.
    pub fn sweep(&mut self) -> Result<bool, DfaError> {
        Ok(self.sweep_with_reason()?.is_some())
    }

    fn sweep_with_reason(&mut self) -> Result<Option<String>, DfaError> {
        self.seed();
        self.iterations += 1;
        let known = self.store.call_count();
        for index in 0..known {
            self.analyze(CallId(index))?;
        }
        let reason = self.store.take_changed();
        debug!(
            iteration = self.iterations,
            calls = self.store.call_count(),
            instances = self.store.instance_count(),
            arrays = self.store.array_count(),
            changed_by = reason.as_deref().unwrap_or("nothing"),
            "DFA sweep"
        );
        Ok(reason)
    }

    /// Sweep until nothing changes, then run the reporting pass.
    pub fn run(mut self) -> Result<DfaReport<'ir>, DfaError> {
        loop {
            let limit = self.config.max_iterations();
            if let Some(max) = limit.filter(|&max| self.iterations >= max) {
                return Err(DfaError::IterationLimit(max));
            }
            if self.sweep_with_reason()?.is_none() {
                break;
            }
        }
        let iterations = self.iterations;
        info!(
            iterations,
            calls = self.store.call_count(),
            instances = self.store.instance_count(),
            "DFA reached fixpoint"
        );

        self.reporting = true;
        if let Some(reason) = self.sweep_with_reason()? {
            return Err(DfaError::ReportingPassChanged { reason });
        }
        self.iterations = iterations;
        Ok(self.into_report())
    }

    fn into_report(self) -> DfaReport<'ir> {
        let main = self.main.unwrap_or(CallId(0));
        DfaReport::new(
            self.ir,
            self.store,
            self.dispatch,
            self.edges,
            self.diagnostics.into_iter().collect(),
            self.iterations,
            main,
        )
    }

    /// Walk the code of one call.
    fn analyze(&mut self, id: CallId) -> Result<(), DfaError> {
        let ir = self.ir;
        let key = self.store.call_key(id)?.clone();
        if !key.pre && ir.clazz_kind(key.clazz) != FeatureKind::Routine {
            return Ok(());
        }
        trace!(call = %id, clazz = ir.clazz_name(key.clazz), pre = key.pre, "analyzing");

        let formal = ir.clazz_args(key.clazz);
        if formal.len() != key.args.len() {
            return Err(DfaError::ArityMismatch {
                clazz: ir.clazz_name(key.clazz).to_string(),
                expected: formal.len(),
                got: key.args.len(),
            });
        }
        let frame = self.store.call_state(id)?.frame;
        let current = Value::Instance(frame);
        for (field, arg) in formal.iter().zip(&key.args) {
            self.store.set_field(&current, *field, arg)?;
        }
        if let Some(outer_ref) = ir.clazz_outer_ref(key.clazz) {
            self.store.set_field(&current, outer_ref, &key.target)?;
        }

        let (clazz, pre) = (key.clazz, key.pre);
        let interp = AbstractInterpreter::new(ir);
        let mut analyze = Analyze::new(self, id, key, frame);
        let step = interp.process_clazz(&mut analyze, clazz, pre)?;
        if step.value.is_some() {
            self.store.mark_returns(id)?;
        }
        Ok(())
    }

    // -- Calls ----------------------------------------------------------------

    /// The canonical call for `key`, discovered while analyzing `origin`.
    pub(crate) fn new_call(&mut self, key: CallKey, origin: CallId) -> Result<CallId, DfaError> {
        let context = match self.config.instance_context() {
            InstanceContext::Clazz => None,
            InstanceContext::CreatingClazz => Some(self.store.call_key(origin)?.clazz),
        };
        let id = self.store.call(key, context, Some(origin));
        self.edges.insert((origin, id));
        Ok(id)
    }

    /// What a call produces as seen from a caller, `None` if it does not
    /// return (yet).
    pub(crate) fn call_result(&mut self, id: CallId) -> Result<Option<Value>, DfaError> {
        let ir = self.ir;
        let key = self.store.call_key(id)?;
        let (cc, pre) = (key.clazz, key.pre);
        if !pre && ir.clazz_kind(cc) == FeatureKind::Intrinsic {
            return self.intrinsic(id);
        }
        let state = self.store.call_state(id)?;
        if !state.returns {
            return Ok(None);
        }
        if pre {
            return Ok(Some(Value::Unit));
        }
        let value = match ir.clazz_result(cc) {
            None => Value::Unit,
            Some(r) if ir.clazz_is_unit(r) => Value::Unit,
            Some(r) if r == cc => Value::Instance(state.frame),
            Some(_) => {
                let field = ir
                    .clazz_result_field(cc)
                    .ok_or_else(|| malformed(ir, cc, "has a result but no result field"))?;
                self.store
                    .read_field(&Value::Instance(state.frame), field)?
            }
        };
        Ok(Some(value))
    }

    fn intrinsic(&mut self, id: CallId) -> Result<Option<Value>, DfaError> {
        let ir = self.ir;
        let cc = self.store.call_key(id)?.clazz;
        let name = ir
            .clazz_intrinsic_name(cc)
            .unwrap_or_else(|| ir.clazz_name(cc));
        let result = match self.intrinsics.get(name) {
            Some(Intrinsic::Handler(handler)) => handler(self, id)?,
            Some(Intrinsic::Unsupported) | None => {
                if self.config.report_intrinsics() {
                    self.diagnose(Diagnostic::UnsupportedIntrinsic {
                        name: name.to_string(),
                        call: id,
                    });
                }
                Some(Value::Undefined)
            }
        };
        if result.is_some() {
            self.store.mark_returns(id)?;
        }
        Ok(result)
    }

    // -- Helpers for the processor and intrinsics -----------------------------

    /// Record a diagnostic if this is the reporting pass.
    pub(crate) fn diagnose(&mut self, diagnostic: Diagnostic) {
        if self.reporting && !self.diagnostics.contains(&diagnostic) {
            warn!(%diagnostic, "DFA diagnostic");
            self.diagnostics.insert(diagnostic);
        }
    }

    pub(crate) fn record_dispatch(&mut self, site: Site, clazz: Clazz) {
        self.dispatch.entry(site).or_default().insert(clazz);
    }

    /// Any value of the numeric clazz `clazz`.
    pub(crate) fn any_numeric(&self, clazz: Clazz) -> Result<Value, DfaError> {
        match self.ir.clazz_special(clazz) {
            Some(SpecialClazz::Numeric(kind)) => Ok(Value::Numeric(NumericValue::any(clazz, kind))),
            _ => Err(malformed(self.ir, clazz, "is not numeric")),
        }
    }

    /// The clazz a single atom is an instance of, if it has one.
    pub(crate) fn value_clazz(&self, atom: &Value) -> Result<Option<Clazz>, DfaError> {
        Ok(match atom {
            Value::Instance(id) => Some(self.store.instance_clazz(*id)?),
            Value::Numeric(n) => Some(n.clazz),
            Value::Boxed(b) => Some(b.ref_clazz),
            Value::Tagged(t) => Some(t.clazz),
            Value::Unit => self.ir.special_clazz(SpecialClazz::Unit),
            Value::Bool(_) => self.ir.special_clazz(SpecialClazz::Bool),
            _ => None,
        })
    }
}

pub(crate) fn malformed(ir: &dyn IrQuery, clazz: Clazz, problem: &'static str) -> DfaError {
    DfaError::MalformedClazz {
        clazz: ir.clazz_name(clazz).to_string(),
        problem,
    }
}

#[cfg(test)]
mod tests {
    use clazzflow_test_utils::fixtures;
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn diagnostics_are_logged_in_reporting_pass() {
        let f = fixtures::missing_effect();
        let report = Dfa::new(&f.program).run().unwrap();
        assert_eq!(report.diagnostics().len(), 1);
        assert!(logs_contain("DFA diagnostic"));
        assert!(logs_contain("DFA reached fixpoint"));
    }

    #[test]
    fn diagnostics_wait_for_reporting_pass() {
        let f = fixtures::missing_effect();
        let mut dfa = Dfa::new(&f.program);
        while dfa.sweep().unwrap() {}
        assert!(!dfa.is_reporting());
        assert!(dfa.diagnostics.is_empty());
    }

    #[test]
    fn seed_is_idempotent() {
        let f = fixtures::counter();
        let mut dfa = Dfa::new(&f.program);
        let main = dfa.seed();
        assert_eq!(dfa.seed(), main);
        assert_eq!(dfa.store().call_count(), 1);
        let key = dfa.store().call_key(main).unwrap();
        assert_eq!(key.target, Value::Unit);
        assert_eq!(key.env, None);
    }

    #[test]
    fn call_discovered_mid_sweep_waits_for_next_sweep() {
        let f = fixtures::counter();
        let mut dfa = Dfa::new(&f.program);
        assert!(dfa.sweep().unwrap());
        // main found the constructor call but could not analyze it yet.
        assert_eq!(dfa.store().call_count(), 2);
        let ctor = CallId::from_raw(1);
        assert!(!dfa.store().call_state(ctor).unwrap().returns);
        assert!(dfa.sweep().unwrap());
        assert!(dfa.store().call_state(ctor).unwrap().returns);
    }
}
