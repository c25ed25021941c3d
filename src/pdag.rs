/*!
The propositional DAG (PDAG, §4.2): a reference-counted immutable DAG over
`{SYMBOL, NOT, AND, OR}`, with the short-circuit identities construction must apply and the
structural-equality predicate the constraint builder uses to deduplicate constraints.

Nodes are `Rc`-backed per §9 (the core is single-threaded, §5); the Tseitin variable cache is a
write-once `Cell<u32>` per node, 0 meaning "not yet assigned" so the CNF lowerer can memoise
without a separate side table.
*/

use std::cell::Cell;
use std::rc::Rc;

use crate::literal::SatVar;

/// A node in the propositional DAG. Cheap to clone (`Rc` bump); construction is the only place
/// that decides sharing, per §4.2 — there is no separate `acquire`/`release` pair to call by
/// hand, `Rc`'s own clone/drop play that role (§9).
#[derive(Clone)]
pub struct PNode(Rc<PNodeInner>);

struct PNodeInner {
    kind: PKind,
    /// Write-once Tseitin auxiliary variable; 0 = unassigned.
    tseitin: Cell<u32>,
}

enum PKind {
    Symbol(SatVar),
    Not(PNode),
    And(PNode, PNode),
    Or(PNode, PNode),
}

impl PNode {
    fn new(kind: PKind) -> Self {
        PNode(Rc::new(PNodeInner { kind, tseitin: Cell::new(0) }))
    }

    /// A leaf wrapping a solver literal.
    pub fn lit(var: SatVar) -> Self {
        PNode::new(PKind::Symbol(var))
    }

    /// `¬p`, lifting double negation and recognising the negation of a leaf (§3, §4.2): the
    /// DAG never contains `NOT(NOT(_))`.
    pub fn not(p: &PNode) -> Self {
        match &p.0.kind {
            PKind::Not(inner) => inner.clone(),
            _ => PNode::new(PKind::Not(p.clone())),
        }
    }

    /// `p ∧ q`, applying the required short-circuit identities of §4.2.
    pub fn and(p: &PNode, q: &PNode, truth: &PNode, falsity: &PNode) -> Self {
        if p.is_identical(q) {
            return p.clone();
        }
        if p.is_identical(truth) {
            return q.clone();
        }
        if q.is_identical(truth) {
            return p.clone();
        }
        if p.is_identical(falsity) || q.is_identical(falsity) {
            return falsity.clone();
        }
        if Self::is_negation_of(p, q) {
            return falsity.clone();
        }
        PNode::new(PKind::And(p.clone(), q.clone()))
    }

    /// `p ∨ q`, applying the required short-circuit identities of §4.2.
    pub fn or(p: &PNode, q: &PNode, truth: &PNode, falsity: &PNode) -> Self {
        if p.is_identical(q) {
            return p.clone();
        }
        if p.is_identical(falsity) {
            return q.clone();
        }
        if q.is_identical(falsity) {
            return p.clone();
        }
        if p.is_identical(truth) || q.is_identical(truth) {
            return truth.clone();
        }
        if Self::is_negation_of(p, q) {
            return truth.clone();
        }
        PNode::new(PKind::Or(p.clone(), q.clone()))
    }

    /// `p → q ≡ ¬p ∨ q`.
    pub fn implies(p: &PNode, q: &PNode, truth: &PNode, falsity: &PNode) -> Self {
        let not_p = PNode::not(p);
        PNode::or(&not_p, q, truth, falsity)
    }

    fn is_negation_of(p: &PNode, q: &PNode) -> bool {
        match (&p.0.kind, &q.0.kind) {
            (PKind::Not(inner), _) => inner.is_identical(q),
            (_, PKind::Not(inner)) => inner.is_identical(p),
            _ => false,
        }
    }

    /// Pointer identity — cheap, and sufficient once identity-preserving sharing is used
    /// consistently (as the constructors above do for their trivial-collapse checks).
    fn is_identical(&self, other: &PNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Deep structural equality, ignoring reference counts (`pexpr_test_eq`, §4.2). Used by
    /// the constraint builder to deduplicate constraint roots.
    pub fn structural_eq(&self, other: &PNode) -> bool {
        if self.is_identical(other) {
            return true;
        }
        match (&self.0.kind, &other.0.kind) {
            (PKind::Symbol(a), PKind::Symbol(b)) => a == b,
            (PKind::Not(a), PKind::Not(b)) => a.structural_eq(b),
            (PKind::And(a1, a2), PKind::And(b1, b2)) => {
                a1.structural_eq(b1) && a2.structural_eq(b2)
            }
            (PKind::Or(a1, a2), PKind::Or(b1, b2)) => a1.structural_eq(b1) && a2.structural_eq(b2),
            _ => false,
        }
    }

    /// Whether this node is in CNF (§4.2): a literal or negated literal, an OR of CNF children
    /// with no AND inside, or an AND of CNF children.
    pub fn is_cnf(&self) -> bool {
        self.is_clause() || matches!(&self.0.kind, PKind::And(a, b) if a.is_cnf() && b.is_cnf())
    }

    /// Whether this node is a single clause: a literal, a negated literal, or an OR of such,
    /// recursively, with no AND anywhere inside.
    fn is_clause(&self) -> bool {
        match &self.0.kind {
            PKind::Symbol(_) => true,
            PKind::Not(inner) => matches!(&inner.0.kind, PKind::Symbol(_)),
            PKind::Or(a, b) => a.is_clause() && b.is_clause(),
            PKind::And(_, _) => false,
        }
    }

    pub fn cached_tseitin(&self) -> Option<SatVar> {
        match self.0.tseitin.get() {
            0 => None,
            v => Some(v),
        }
    }

    /// Stores the Tseitin variable for this node. Panics if already set: the cache is
    /// write-once per §9.
    pub fn set_tseitin(&self, var: SatVar) {
        assert_eq!(self.0.tseitin.get(), 0, "Tseitin variable already assigned");
        self.0.tseitin.set(var);
    }

    pub fn as_symbol(&self) -> Option<SatVar> {
        match &self.0.kind {
            PKind::Symbol(v) => Some(*v),
            _ => None,
        }
    }

    /// If this node is `NOT(SYMBOL(v))`, returns `v`.
    pub fn as_negated_symbol(&self) -> Option<SatVar> {
        match &self.0.kind {
            PKind::Not(inner) => inner.as_symbol(),
            _ => None,
        }
    }

    pub fn as_not(&self) -> Option<&PNode> {
        match &self.0.kind {
            PKind::Not(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_and(&self) -> Option<(&PNode, &PNode)> {
        match &self.0.kind {
            PKind::And(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_or(&self) -> Option<(&PNode, &PNode)> {
        match &self.0.kind {
            PKind::Or(a, b) => Some((a, b)),
            _ => None,
        }
    }

    /// Current strong-count, exposed for tests asserting §8 property 4 (acquire/release
    /// preserves structural equality of any reachable alias).
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

/// A handful of commonly-needed constants bundled for passing to the PDAG constructors, which
/// need `TRUE`/`FALSE` identities to apply their short-circuit rules.
#[derive(Clone)]
pub struct PConstants {
    pub truth: PNode,
    pub falsity: PNode,
}

impl PConstants {
    pub fn new(truth_var: SatVar, falsity_var: SatVar) -> Self {
        PConstants { truth: PNode::lit(truth_var), falsity: PNode::lit(falsity_var) }
    }

    pub fn and(&self, p: &PNode, q: &PNode) -> PNode {
        PNode::and(p, q, &self.truth, &self.falsity)
    }

    pub fn or(&self, p: &PNode, q: &PNode) -> PNode {
        PNode::or(p, q, &self.truth, &self.falsity)
    }

    pub fn not(&self, p: &PNode) -> PNode {
        PNode::not(p)
    }

    pub fn implies(&self, p: &PNode, q: &PNode) -> PNode {
        PNode::implies(p, q, &self.truth, &self.falsity)
    }

    pub fn and_many(&self, nodes: impl IntoIterator<Item = PNode>) -> PNode {
        nodes
            .into_iter()
            .fold(None, |acc, n| Some(match acc {
                Some(a) => self.and(&a, &n),
                None => n,
            }))
            .unwrap_or_else(|| self.truth.clone())
    }

    pub fn or_many(&self, nodes: impl IntoIterator<Item = PNode>) -> PNode {
        nodes
            .into_iter()
            .fold(None, |acc, n| Some(match acc {
                Some(a) => self.or(&a, &n),
                None => n,
            }))
            .unwrap_or_else(|| self.falsity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_with_true_collapses() {
        let c = PConstants::new(1, 2);
        let x = PNode::lit(3);
        let r = c.and(&x, &c.truth);
        assert!(r.structural_eq(&x));
    }

    #[test]
    fn or_with_self_negation_is_true() {
        let c = PConstants::new(1, 2);
        let x = PNode::lit(3);
        let not_x = c.not(&x);
        let r = c.or(&x, &not_x);
        assert!(r.structural_eq(&c.truth));
    }

    #[test]
    fn double_negation_collapses_at_construction() {
        let c = PConstants::new(1, 2);
        let x = PNode::lit(3);
        let nn = c.not(&c.not(&x));
        assert!(nn.structural_eq(&x));
        assert!(nn.as_symbol().is_some());
    }

    #[test]
    fn structural_eq_ignores_ref_counts() {
        let c = PConstants::new(1, 2);
        let x = PNode::lit(3);
        let y = PNode::lit(3);
        let extra = x.clone();
        assert!(x.structural_eq(&y));
        drop(extra);
        assert!(x.structural_eq(&y));
        let _ = &c;
    }

    #[test]
    fn is_cnf_detects_clauses_and_conjunctions() {
        let c = PConstants::new(1, 2);
        let a = PNode::lit(3);
        let b = PNode::lit(4);
        let clause = c.or(&a, &c.not(&b));
        assert!(clause.is_cnf());
        let conj = c.and(&clause, &a);
        assert!(conj.is_cnf());
        let not_cnf = c.and(&c.or(&a, &b), &c.or(&a, &c.and(&a, &b)));
        assert!(!not_cnf.is_cnf());
    }
}
