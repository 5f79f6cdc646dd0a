use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use clazzflow_ir::{Clazz, IrQuery, Site};
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;

use crate::{CallId, CallKey, CallState, Diagnostic, InstanceId, InstanceKey, Store, Value};

/// Result of a converged analysis.
///
/// Owns the final [`Store`] and answers the questions later compiler phases
/// ask: which clazzes are instantiated, which routines are called in which
/// contexts, where a dynamic access can go, and why a call is reachable.
pub struct DfaReport<'ir> {
    ir: &'ir dyn IrQuery,
    store: Store,
    dispatch: BTreeMap<Site, BTreeSet<Clazz>>,
    call_graph: DiGraphMap<CallId, ()>,
    diagnostics: Vec<Diagnostic>,
    iterations: usize,
    main: CallId,
}

impl<'ir> DfaReport<'ir> {
    pub(crate) fn new(
        ir: &'ir dyn IrQuery,
        store: Store,
        dispatch: BTreeMap<Site, BTreeSet<Clazz>>,
        edges: BTreeSet<(CallId, CallId)>,
        diagnostics: Vec<Diagnostic>,
        iterations: usize,
        main: CallId,
    ) -> Self {
        let mut call_graph = DiGraphMap::new();
        for (id, _, _) in store.calls() {
            call_graph.add_node(id);
        }
        for (from, to) in edges {
            call_graph.add_edge(from, to, ());
        }
        Self {
            ir,
            store,
            dispatch,
            call_graph,
            diagnostics,
            iterations,
            main,
        }
    }

    pub fn ir(&self) -> &'ir dyn IrQuery {
        self.ir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Number of sweeps until the fixpoint, not counting the reporting pass.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn main(&self) -> CallId {
        self.main
    }

    // -- Instances ------------------------------------------------------------

    pub fn is_instantiated(&self, clazz: Clazz) -> bool {
        self.store.instances().any(|(_, key, _)| key.clazz == clazz)
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &InstanceKey)> {
        self.store.instances().map(|(id, key, _)| (id, key))
    }

    /// Join of `field` over every instance of `clazz`, `None` if no instance
    /// of `clazz` has it set.
    pub fn field_of(&self, clazz: Clazz, field: Clazz) -> Option<Value> {
        self.store
            .instances()
            .filter(|(_, key, _)| key.clazz == clazz)
            .filter_map(|(_, _, fields)| fields.get(&field))
            .fold(None, |acc: Option<Value>, v| {
                Some(acc.map_or_else(|| v.clone(), |a| a.join(v)))
            })
    }

    // -- Calls ----------------------------------------------------------------

    pub fn calls(&self) -> impl Iterator<Item = (CallId, &CallKey, &CallState)> {
        self.store.calls()
    }

    /// Every analyzed call of `clazz`'s body.
    pub fn call_contexts(&self, clazz: Clazz) -> impl Iterator<Item = (CallId, &CallKey)> {
        self.store
            .calls()
            .filter(move |(_, key, _)| key.clazz == clazz && !key.pre)
            .map(|(id, key, _)| (id, key))
    }

    /// Clazzes with at least one call.
    pub fn reachable_clazzes(&self) -> BTreeSet<Clazz> {
        self.store.calls().map(|(_, key, _)| key.clazz).collect()
    }

    pub fn is_called(&self, clazz: Clazz) -> bool {
        self.call_contexts(clazz).next().is_some()
    }

    /// Clazzes a dynamic access at `site` was resolved to.
    pub fn resolved_targets(&self, site: Site) -> Option<&BTreeSet<Clazz>> {
        self.dispatch.get(&site)
    }

    /// The single target of a dynamic access, if it has exactly one.
    pub fn monomorphic_target(&self, site: Site) -> Option<Clazz> {
        let targets = self.resolved_targets(site)?;
        match targets.len() {
            1 => targets.first().copied(),
            _ => None,
        }
    }

    pub fn call_graph(&self) -> &DiGraphMap<CallId, ()> {
        &self.call_graph
    }

    /// Calls that discovered `call`.
    pub fn callers(&self, call: CallId) -> impl Iterator<Item = CallId> + '_ {
        self.call_graph.neighbors_directed(call, Direction::Incoming)
    }

    /// The chain of calls that first discovered `call`, from main down to
    /// `call` itself.
    pub fn why(&self, call: CallId) -> Vec<CallId> {
        let mut chain = vec![call];
        let mut cursor = call;
        while let Ok(state) = self.store.call_state(cursor) {
            match state.origin {
                Some(origin) if !chain.contains(&origin) => {
                    chain.push(origin);
                    cursor = origin;
                }
                _ => break,
            }
        }
        chain.reverse();
        chain
    }

    // -- Diagnostics ----------------------------------------------------------

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

impl fmt::Display for DfaReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |cl: Clazz| self.ir.clazz_name(cl);
        writeln!(f, "instances:")?;
        for (id, key, fields) in self.store.instances() {
            write!(f, "  {id} {}", name(key.clazz))?;
            if let Some(ctx) = key.context {
                write!(f, " in {}", name(ctx))?;
            }
            writeln!(f)?;
            for (field, value) in fields {
                writeln!(f, "    {} = {value}", name(*field))?;
            }
        }
        writeln!(f, "calls:")?;
        for (id, key, state) in self.store.calls() {
            let args: Vec<String> = key.args.iter().map(ToString::to_string).collect();
            write!(
                f,
                "  {id} {}{}({}) on {}",
                name(key.clazz),
                if key.pre { " pre" } else { "" },
                args.join(", "),
                key.target
            )?;
            if let Some(env) = key.env {
                write!(f, " in {env}")?;
            }
            if !state.returns {
                write!(f, " never returns")?;
            }
            writeln!(f)?;
        }
        for d in &self.diagnostics {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}
