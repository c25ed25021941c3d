/*!
The CNF lowerer (CNF, §4.5): emits CNF clauses for every PDAG root in a [ConstraintSet], either by
unfolding an already-CNF subtree or by Tseitin-encoding with auxiliary variables.

Mirrors the teacher's own preprocessing pass in spirit (a one-shot transformation of a built
structure into clauses the solver ingests), though the structure being lowered here is the PDAG
rather than a parsed formula.
*/

use log::trace;

use crate::literal::{LiteralStore, LiteralTag, SatLit};
use crate::pdag::PNode;

/// A single emitted clause, as a disjunction of signed literals.
pub type Clause = Vec<SatLit>;

struct CnfEmitter<'a> {
    literals: &'a mut LiteralStore,
    clauses: Vec<Clause>,
}

impl<'a> CnfEmitter<'a> {
    /// Lowers one constraint root, splitting a CNF AND at the top without minting a Tseitin
    /// variable for it, and falling back to `unfold`/`tseitin` per §4.5.
    fn lower_root(&mut self, root: &PNode) {
        if root.is_cnf() {
            self.unfold(root);
            return;
        }
        if let Some((a, b)) = root.as_and() {
            self.lower_root(a);
            self.lower_root(b);
            return;
        }
        let lit = self.tseitin_lit(root);
        trace!("asserting non-CNF root via Tseitin literal {lit}");
        self.clauses.push(vec![lit]);
    }

    /// Walks a node already known to be in CNF, splitting ANDs into separate clauses and
    /// emitting each bottom disjunction as one clause.
    fn unfold(&mut self, node: &PNode) {
        if let Some((a, b)) = node.as_and() {
            self.unfold(a);
            self.unfold(b);
        } else {
            let clause = Self::unfold_clause(node);
            self.clauses.push(clause);
        }
    }

    /// Unfolds a single clause (no AND anywhere inside), recursing through ORs.
    fn unfold_clause(node: &PNode) -> Clause {
        if let Some(v) = node.as_symbol() {
            return vec![SatLit::positive(v)];
        }
        if let Some(v) = node.as_negated_symbol() {
            return vec![SatLit::negative(v)];
        }
        if let Some((a, b)) = node.as_or() {
            let mut clause = Self::unfold_clause(a);
            clause.extend(Self::unfold_clause(b));
            return clause;
        }
        unreachable!("unfold_clause called on a node that failed the is_cnf check")
    }

    /// Tseitin-encodes `node`, returning the (possibly negated, possibly pre-existing) literal
    /// that stands for it. NOT nodes never mint a fresh variable (§4.5): `t ↔ ¬a` is realised by
    /// returning the negation of `a`'s literal directly.
    fn tseitin_lit(&mut self, node: &PNode) -> SatLit {
        if let Some(v) = node.as_symbol() {
            return SatLit::positive(v);
        }
        if let Some(inner) = node.as_not() {
            return self.tseitin_lit(inner).negate();
        }
        if let Some(v) = node.cached_tseitin() {
            return SatLit::positive(v);
        }
        if let Some((a, b)) = node.as_and() {
            let la = self.tseitin_lit(a);
            let lb = self.tseitin_lit(b);
            let t = self.fresh_tseitin_var();
            node.set_tseitin(t);
            let tl = SatLit::positive(t);
            self.clauses.push(vec![la.negate(), lb.negate(), tl]);
            self.clauses.push(vec![la, tl.negate()]);
            self.clauses.push(vec![lb, tl.negate()]);
            return tl;
        }
        if let Some((a, b)) = node.as_or() {
            let la = self.tseitin_lit(a);
            let lb = self.tseitin_lit(b);
            let t = self.fresh_tseitin_var();
            node.set_tseitin(t);
            let tl = SatLit::positive(t);
            self.clauses.push(vec![la, lb, tl.negate()]);
            self.clauses.push(vec![la.negate(), tl]);
            self.clauses.push(vec![lb.negate(), tl]);
            return tl;
        }
        unreachable!("PNode must be one of Symbol/Not/And/Or")
    }

    fn fresh_tseitin_var(&mut self) -> crate::literal::SatVar {
        let label = format!("tmp{}", self.literals.len() + 1);
        self.literals.mint(LiteralTag::TmpSat, label)
    }
}

/// Lowers every root of `set` to CNF clauses, minting any Tseitin auxiliaries in `literals`.
pub fn lower_constraints(
    literals: &mut LiteralStore,
    set: &crate::constraints::ConstraintSet,
) -> Vec<Clause> {
    let mut emitter = CnfEmitter { literals, clauses: Vec::new() };
    let roots: Vec<PNode> = set.all_roots().cloned().collect();
    for root in &roots {
        emitter.lower_root(root);
    }
    emitter.clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdag::PConstants;

    #[test]
    fn unfolds_a_cnf_root_without_minting_aux_vars() {
        let mut literals = LiteralStore::new();
        let (t, f) = literals.create_constants();
        let consts = PConstants::new(t, f);
        let a = PNode::lit(literals.mint(LiteralTag::TmpSat, "a"));
        let b = PNode::lit(literals.mint(LiteralTag::TmpSat, "b"));
        let clause = consts.or(&a, &consts.not(&b));
        let before = literals.len();
        let clauses = lower_constraints(&mut literals, &single_root_set(clause));
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].len(), 2);
        assert_eq!(literals.len(), before);
    }

    #[test]
    fn tseitin_encodes_a_non_cnf_root() {
        let mut literals = LiteralStore::new();
        let (t, f) = literals.create_constants();
        let consts = PConstants::new(t, f);
        let a = PNode::lit(literals.mint(LiteralTag::TmpSat, "a"));
        let b = PNode::lit(literals.mint(LiteralTag::TmpSat, "b"));
        let c = PNode::lit(literals.mint(LiteralTag::TmpSat, "c"));
        // (a ∧ b) ∨ c is not in CNF.
        let and_ab = consts.and(&a, &b);
        let root = consts.or(&and_ab, &c);
        let clauses = lower_constraints(&mut literals, &single_root_set(root));
        // One unit clause for the top-level Tseitin var, plus the defining clauses for the
        // AND and the OR (3 each).
        assert_eq!(clauses.len(), 1 + 3 + 3);
    }

    fn single_root_set(root: PNode) -> crate::constraints::ConstraintSet {
        let mut set = crate::constraints::ConstraintSet::default();
        set.constants.push(root);
        set
    }
}
