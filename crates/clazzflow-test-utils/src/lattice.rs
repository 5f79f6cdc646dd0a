//! Join-semilattice law checks over sample abstract values.
//!
//! Every helper walks all pairs (and triples, for associativity) of the
//! samples and panics once with the full list of broken laws.

use clazzflow_ir::Lattice;
use std::fmt::{Debug, Write};

fn report(violations: Vec<String>) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{} lattice law violation(s):\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(msg, "  {}. {}", i + 1, v);
    }
    panic!("{msg}");
}

/// Check that `join` is commutative, associative, and idempotent over the
/// given elements.
pub fn assert_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    report(violations);
}

/// Check that `is_subseteq` agrees with `join`: `a <= b` exactly when
/// `a.join(b) == b`.
pub fn assert_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_ordering_consistent(elements, &mut violations);
    report(violations);
}

/// Check that `bottom` is an identity for `join` and below every element.
pub fn assert_bottom<L: Lattice + PartialEq + Debug>(bottom: &L, elements: &[L]) {
    let mut violations = Vec::new();
    for x in elements {
        if !bottom.is_subseteq(x) {
            violations.push(format!(
                "bottom not below element: {bottom:?}.is_subseteq({x:?}) = false"
            ));
        }
        if bottom.join(x) != *x {
            violations.push(format!("bottom identity violated: {bottom:?}.join({x:?}) != {x:?}"));
        }
    }
    report(violations);
}

/// Join laws and ordering consistency together.
pub fn assert_semilattice_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    check_ordering_consistent(elements, &mut violations);
    report(violations);
}

fn check_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        if a.join(a) != *a {
            v.push(format!("join not idempotent: {a:?}.join({a:?}) != {a:?}"));
        }
        for b in elements {
            if a.join(b) != b.join(a) {
                v.push(format!(
                    "join not commutative: {a:?}.join({b:?}) != {b:?}.join({a:?})"
                ));
            }
            for c in elements {
                if a.join(b).join(c) != a.join(&b.join(c)) {
                    v.push(format!(
                        "join not associative: ({a:?}.join({b:?})).join({c:?}) != {a:?}.join({b:?}.join({c:?}))"
                    ));
                }
            }
        }
    }
}

fn check_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        for b in elements {
            let sub = a.is_subseteq(b);
            let join_agrees = a.join(b) == *b;
            if sub != join_agrees {
                v.push(format!(
                    "ordering inconsistent with join: {a:?}.is_subseteq({b:?}) = {sub}, \
                     but {a:?}.join({b:?}) == {b:?} is {join_agrees}"
                ));
            }
            if sub && b.is_subseteq(a) && a != b {
                v.push(format!("ordering not antisymmetric: {a:?} and {b:?}"));
            }
        }
    }
}
