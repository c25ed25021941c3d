/*!
The constraint builder (CB, §4.4): for every symbol, emits the family of PDAG constraints
encoding type well-formedness, visibility, dependencies, defaults, selects, implies, choice
semantics and non-boolean value-exclusivity.
*/

use log::{debug, trace};

use crate::error::BuildError;
use crate::literal::LiteralStore;
use crate::lower::lower;
use crate::model::{Model, ModelExpr, Property, Symbol, SymbolId, SymbolType};
use crate::pdag::{PConstants, PNode};

/// The ordered, duplicate-suppressed list of PDAG roots emitted for one symbol (§3).
#[derive(Default)]
pub struct ConstraintList {
    roots: Vec<PNode>,
}

impl ConstraintList {
    /// Adds `root` unless a structurally-equal root is already present
    /// (`sym_add_constraint_unique`, §4.4).
    pub fn add_unique(&mut self, root: PNode) {
        if self.roots.iter().any(|r| r.structural_eq(&root)) {
            return;
        }
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[PNode] {
        &self.roots
    }
}

/// All constraint lists, keyed by symbol, plus the shared constant roots (§4.4 rule 8).
#[derive(Default)]
pub struct ConstraintSet {
    pub per_symbol: std::collections::HashMap<SymbolId, ConstraintList>,
    pub constants: Vec<PNode>,
}

impl ConstraintSet {
    pub fn list_mut(&mut self, id: SymbolId) -> &mut ConstraintList {
        self.per_symbol.entry(id).or_default()
    }

    pub fn all_roots(&self) -> impl Iterator<Item = &PNode> {
        self.constants.iter().chain(self.per_symbol.values().flat_map(|l| l.roots.iter()))
    }
}

/// Emits constant anchoring (rule 8) and the per-symbol constraint families (rules 1-7) for
/// every symbol in `model`.
pub fn build_constraints<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
) -> Result<ConstraintSet, BuildError> {
    let mut set = ConstraintSet::default();
    set.constants.push(consts.truth.clone());
    set.constants.push(consts.not(&consts.falsity));
    debug!("anchored TRUE/FALSE constants");

    for sym in model.symbols() {
        build_symbol(model, literals, consts, sym, &mut set)?;
    }
    Ok(set)
}

fn build_symbol<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    sym: &M::Sym,
    set: &mut ConstraintSet,
) -> Result<(), BuildError> {
    let id = sym.id();
    let name = sym.name().to_string();
    let ty = sym.symbol_type();
    trace!("building constraints for {name} ({ty:?})");

    // Rule 1: type well-formedness.
    match ty {
        SymbolType::Tri => {
            let y = PNode::lit(literals.symbol_y(id, &name));
            let both = PNode::lit(literals.symbol_both(id, &name));
            let root = consts.implies(&y, &both);
            set.list_mut(id).add_unique(root);
        }
        SymbolType::Int | SymbolType::Hex | SymbolType::Str => {
            build_nonbool_exclusivity(literals, consts, id, &name, sym, set);
        }
        _ => {}
    }

    // Rule 2: direct dependencies.
    if let Some(dep) = sym.direct_dep() {
        let dep_proj = lower(model, literals, consts, &dep).map_err(|_| BuildError::UnmintedDefaultValue)?;
        let self_proj = lower(model, literals, consts, &ModelExpr::Symbol(id))
            .map_err(|_| BuildError::UnmintedDefaultValue)?;
        let both_root = consts.implies(&self_proj.both, &dep_proj.both);
        let y_root = consts.implies(&self_proj.y, &dep_proj.y);
        set.list_mut(id).add_unique(both_root);
        set.list_mut(id).add_unique(y_root);
    }

    // Rule 5: NPC literal — no prompt condition iff no `Prompt` property's condition holds.
    let prompt_conds: Vec<ModelExpr> = sym
        .properties()
        .iter()
        .filter_map(|p| match p {
            Property::Prompt { cond } => Some(cond.clone()),
            _ => None,
        })
        .collect();
    let npc_var = literals.npc(id, &name);
    let npc_lit = PNode::lit(npc_var);
    let any_prompt_visible = lower_any(model, literals, consts, &prompt_conds)?;
    let npc_def = consts.implies(&npc_lit, &consts.not(&any_prompt_visible.y));
    let npc_def_rev = consts.implies(&any_prompt_visible.y, &consts.not(&npc_lit));
    set.list_mut(id).add_unique(npc_def);
    set.list_mut(id).add_unique(npc_def_rev);

    // Rule 6: defaults, with earlier defaults shadowing later ones.
    build_defaults(model, literals, consts, id, &name, sym, &npc_lit, set)?;

    // Rule 7: choice groups.
    if ty == SymbolType::Choice {
        build_choice(model, literals, consts, id, &name, sym, set)?;
    }

    Ok(())
}

/// Lowers the disjunction of a set of visibility conditions (empty = never visible).
fn lower_any<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    conds: &[ModelExpr],
) -> Result<crate::lower::Projection, BuildError> {
    if conds.is_empty() {
        return Ok(crate::lower::Projection {
            y: consts.falsity.clone(),
            m: consts.falsity.clone(),
            both: consts.falsity.clone(),
        });
    }
    let mut y = consts.falsity.clone();
    let mut both = consts.falsity.clone();
    for c in conds {
        let p = lower(model, literals, consts, c).map_err(|_| BuildError::UnmintedDefaultValue)?;
        y = consts.or(&y, &p.y);
        both = consts.or(&both, &p.both);
    }
    let m = consts.and(&both, &consts.not(&y));
    Ok(crate::lower::Projection { y, m, both })
}

/// Rules 3-4 live here too: reverse selects and weak implies are both properties declared
/// on the *source* symbol (`sym selects/implies target under cond`), so they are folded into
/// the target's constraint list while iterating the source (§4.4 rules 3, 4).
fn build_reverse_edges<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    set: &mut ConstraintSet,
) -> Result<(), BuildError> {
    for sym in model.symbols() {
        let source_proj = lower(model, literals, consts, &ModelExpr::Symbol(sym.id()))
            .map_err(|_| BuildError::UnmintedDefaultValue)?;
        for prop in sym.properties() {
            match prop {
                Property::Select { target, cond } => {
                    let cond_proj =
                        lower(model, literals, consts, cond).map_err(|_| BuildError::UnmintedDefaultValue)?;
                    let target_proj = lower(model, literals, consts, &ModelExpr::Symbol(*target))
                        .map_err(|_| BuildError::UnmintedDefaultValue)?;
                    let trigger_both = consts.and(&source_proj.both, &cond_proj.both);
                    let trigger_y = consts.and(&source_proj.y, &cond_proj.y);

                    // SELECT bookkeeping (§3): a helper literal recording that `target` was
                    // forced active via a reverse select, distinct from its own y/both literals,
                    // so a consumer (e.g. a GUI explaining a diagnosis) can tell a selected
                    // value apart from a directly-chosen one.
                    let target_name = model.symbol(*target).name().to_string();
                    let select_lit = PNode::lit(literals.select_helper(*target, &target_name));
                    set.list_mut(*target).add_unique(consts.implies(&trigger_both, &select_lit));
                    set.list_mut(*target).add_unique(consts.implies(&select_lit, &target_proj.both));

                    let both_root = consts.implies(&trigger_both, &target_proj.both);
                    let y_root = consts.implies(&trigger_y, &target_proj.y);
                    set.list_mut(*target).add_unique(both_root);
                    set.list_mut(*target).add_unique(y_root);
                }
                Property::Imply { target, cond } => {
                    // Weak reverse implies: lowest precedence, only fires when the target has
                    // no visible prompt and no default applies (§9 resolution of the weak-
                    // implies open question). We approximate "no default applies" with the
                    // target's NPC literal conjoined with the negation of its default trigger,
                    // which `build_defaults` has already computed and stashed as a root; here
                    // we instead encode it directly as `(cond ∧ NPC(target)) → target-active`,
                    // deferring full default-shadowing interaction to the defaults pass, which
                    // runs before this one is consulted by the CNF lowerer (order of clause
                    // emission does not affect satisfiability).
                    let cond_proj =
                        lower(model, literals, consts, cond).map_err(|_| BuildError::UnmintedDefaultValue)?;
                    let target_name = model.symbol(*target).name().to_string();
                    let npc = PNode::lit(literals.npc(*target, &target_name));
                    let target_proj = lower(model, literals, consts, &ModelExpr::Symbol(*target))
                        .map_err(|_| BuildError::UnmintedDefaultValue)?;
                    let trigger = consts.and(&cond_proj.both, &npc);
                    let root = consts.implies(&trigger, &target_proj.both);
                    set.list_mut(*target).add_unique(root);
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn build_defaults<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    id: SymbolId,
    name: &str,
    sym: &M::Sym,
    npc_lit: &PNode,
    set: &mut ConstraintSet,
) -> Result<(), BuildError> {
    let defaults: Vec<(&str, &ModelExpr)> = sym
        .properties()
        .iter()
        .filter_map(|p| match p {
            Property::Default { value, cond } => Some((value.as_str(), cond)),
            _ => None,
        })
        .collect();
    if defaults.is_empty() {
        return Ok(());
    }

    let is_boolean_like = sym.symbol_type().is_boolean_like();
    let mut already_applied = consts.falsity.clone();
    for (value, cond) in defaults {
        let cond_proj = lower(model, literals, consts, cond).map_err(|_| BuildError::UnmintedDefaultValue)?;
        let shadowed = consts.and(&cond_proj.both, &consts.not(&already_applied));
        let trigger = consts.and(npc_lit, &shadowed);

        let value_lit = if is_boolean_like {
            match value {
                "y" => PNode::lit(literals.symbol_y(id, name)),
                "m" if sym.symbol_type() == SymbolType::Tri => {
                    let y = PNode::lit(literals.symbol_y(id, name));
                    let both = PNode::lit(literals.symbol_both(id, name));
                    consts.and(&both, &consts.not(&y))
                }
                "m" => return Err(BuildError::MemberNotInChoice),
                _ => consts.not(&PNode::lit(literals.symbol_both(id, name))),
            }
        } else {
            let (var, _) = literals.get_or_create_value(id, name, Some(value));
            PNode::lit(var)
        };

        let root = consts.implies(&trigger, &value_lit);
        set.list_mut(id).add_unique(root);
        already_applied = consts.or(&already_applied, &cond_proj.both);
    }
    Ok(())
}

fn build_choice<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    id: SymbolId,
    name: &str,
    sym: &M::Sym,
    set: &mut ConstraintSet,
) -> Result<(), BuildError> {
    let members = sym.choice_members().to_vec();
    let choice_active = PNode::lit(literals.symbol_y(id, name));

    // At-most-one always.
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let a = model.symbol(members[i]);
            let b = model.symbol(members[j]);
            if !a.choice_members().is_empty() && a.choice_members() != sym.choice_members() {
                return Err(BuildError::MemberNotInChoice);
            }
            let _ = b;
            let la = PNode::lit(literals.symbol_y(members[i], model.symbol(members[i]).name()));
            let lb = PNode::lit(literals.symbol_y(members[j], model.symbol(members[j]).name()));
            let both_selected = consts.and(&la, &lb);
            let root = consts.not(&both_selected);
            set.list_mut(id).add_unique(root);
        }
    }

    // Exactly-one-of when the choice itself is active, routed through a CHOICE bookkeeping
    // literal (§3) naming "some alternative is selected" independently of which one, so a
    // consumer can ask that question without re-deriving the member disjunction.
    if !members.is_empty() {
        let member_lits: Vec<PNode> = members
            .iter()
            .map(|m| PNode::lit(literals.symbol_y(*m, model.symbol(*m).name())))
            .collect();
        let any_member = consts.or_many(member_lits);
        let choice_lit = PNode::lit(literals.choice_helper(id, name));
        set.list_mut(id).add_unique(consts.implies(&choice_lit, &any_member));
        set.list_mut(id).add_unique(consts.implies(&any_member, &choice_lit));
        let root = consts.implies(&choice_active, &choice_lit);
        set.list_mut(id).add_unique(root);
    }

    Ok(())
}

fn build_nonbool_exclusivity<M: Model>(
    literals: &mut LiteralStore,
    consts: &PConstants,
    id: SymbolId,
    name: &str,
    sym: &M::Sym,
    set: &mut ConstraintSet,
) {
    // "unset" is always the first value literal (§3).
    literals.get_or_create_value(id, name, None);
    for v in sym.known_values() {
        literals.get_or_create_value(id, name, Some(v));
    }

    let vars = literals.known_value_literals(id).to_vec();
    for i in 0..vars.len() {
        for j in (i + 1)..vars.len() {
            let li = PNode::lit(vars[i]);
            let lj = PNode::lit(vars[j]);
            let conflict = consts.and(&li, &lj);
            let root = consts.not(&conflict);
            set.list_mut(id).add_unique(root);
        }
    }
    let disjunction = consts.or_many(vars.into_iter().map(PNode::lit));
    set.list_mut(id).add_unique(disjunction);
}

/// Runs the full constraint-builder pass: per-symbol rules (1, 2, 5, 6, 7) followed by the
/// reverse-edge pass (3, 4), which must run after every symbol's own NPC literal exists.
pub fn build_all<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
) -> Result<ConstraintSet, BuildError> {
    let mut set = build_constraints(model, literals, consts)?;
    build_reverse_edges(model, literals, consts, &mut set)?;
    Ok(set)
}
