/*!
Expression lowering (LOWER, §4.3): translates model-level expressions into three PDAG
projections — `Y` ("evaluates to yes"), `M` ("evaluates to mod") and `BOTH` (`Y ∨ M`, "is this
active at all") — following tristate Kleene semantics.
*/

use log::trace;

use crate::error::LowerError;
use crate::literal::LiteralStore;
use crate::model::{Comparator, Model, ModelExpr, Symbol, SymbolType};
use crate::pdag::{PConstants, PNode};

/// The three projections of a lowered expression.
#[derive(Clone)]
pub struct Projection {
    pub y: PNode,
    pub m: PNode,
    pub both: PNode,
}

impl Projection {
    fn leaf_active(both: PNode, y: PNode, consts: &PConstants) -> Self {
        let m = consts.and(&both, &consts.not(&y));
        Projection { y, m, both }
    }
}

/// Lowers `expr` against `model`/`literals`, minting any value literals a comparator needs.
pub fn lower<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    expr: &ModelExpr,
) -> Result<Projection, LowerError> {
    match expr {
        ModelExpr::True => Ok(Projection {
            y: consts.truth.clone(),
            m: consts.falsity.clone(),
            both: consts.truth.clone(),
        }),
        ModelExpr::False => Ok(Projection {
            y: consts.falsity.clone(),
            m: consts.falsity.clone(),
            both: consts.falsity.clone(),
        }),
        ModelExpr::Symbol(id) => {
            let sym = model.symbol(*id);
            let name = sym.name().to_string();
            match sym.symbol_type() {
                SymbolType::Bool | SymbolType::Choice => {
                    let y = literals.symbol_y(*id, &name);
                    let y = PNode::lit(y);
                    Ok(Projection { y: y.clone(), m: consts.falsity.clone(), both: y })
                }
                _ => {
                    let y = literals.symbol_y(*id, &name);
                    let both = literals.symbol_both(*id, &name);
                    Ok(Projection::leaf_active(PNode::lit(both), PNode::lit(y), consts))
                }
            }
        }
        ModelExpr::And(a, b) => {
            let pa = lower(model, literals, consts, a)?;
            let pb = lower(model, literals, consts, b)?;
            let y = consts.and(&pa.y, &pb.y);
            let both = consts.and(&pa.both, &pb.both);
            Ok(Projection::leaf_active(both, y, consts))
        }
        ModelExpr::Or(a, b) => {
            let pa = lower(model, literals, consts, a)?;
            let pb = lower(model, literals, consts, b)?;
            let y = consts.or(&pa.y, &pb.y);
            let both = consts.or(&pa.both, &pb.both);
            Ok(Projection::leaf_active(both, y, consts))
        }
        ModelExpr::Not(a) => {
            let pa = lower(model, literals, consts, a)?;
            let y = consts.not(&pa.both);
            let both = consts.not(&pa.y);
            // M = Y ∧ ¬BOTH, which collapses to FALSE for a negation (§4.3).
            let m = consts.falsity.clone();
            Ok(Projection { y, m, both })
        }
        ModelExpr::Eq(id, value) => {
            let y = lower_equality(model, literals, consts, *id, value, true)?;
            Ok(Projection { y: y.clone(), m: consts.falsity.clone(), both: y })
        }
        ModelExpr::NotEq(id, value) => {
            let eq = lower_equality(model, literals, consts, *id, value, true)?;
            let y = consts.not(&eq);
            Ok(Projection { y: y.clone(), m: consts.falsity.clone(), both: y })
        }
        ModelExpr::Cmp(id, cmp, value) => {
            let y = lower_comparison(model, literals, consts, *id, *cmp, value)?;
            Ok(Projection { y: y.clone(), m: consts.falsity.clone(), both: y })
        }
    }
}

/// Lowers `sym = value` by enumerating value literals and OR-ing the matching one(s); the
/// "unset" literal participates so an unset symbol compares unequal to any concrete value
/// (§4.3). `ensure_minted` mints `value`'s literal on demand, mint-then-constrain (§9).
fn lower_equality<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    id: crate::model::SymbolId,
    value: &str,
    ensure_minted: bool,
) -> Result<PNode, LowerError> {
    let sym = model.symbol(id);
    if sym.symbol_type().is_boolean_like() {
        return Err(LowerError::UnsupportedComparison);
    }
    let name = sym.name().to_string();
    trace!("lowering equality {name}={value}");
    if ensure_minted {
        let (_, _fresh) = literals.get_or_create_value(id, &name, Some(value));
    }
    let var = literals
        .lookup_value(id, Some(value))
        .expect("value literal minted above");
    Ok(PNode::lit(var))
}

/// Lowers a numeric comparison by enumerating already-minted value literals and OR-ing those
/// that satisfy the predicate under the model's numeric parse (§4.3). Values are parsed as
/// HEX (base 16) for `SymbolType::Hex`, decimal otherwise.
fn lower_comparison<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    consts: &PConstants,
    id: crate::model::SymbolId,
    cmp: Comparator,
    value: &str,
) -> Result<PNode, LowerError> {
    let sym = model.symbol(id);
    let ty = sym.symbol_type();
    if !matches!(ty, SymbolType::Int | SymbolType::Hex) {
        return Err(LowerError::UnsupportedComparison);
    }
    let name = sym.name().to_string();
    let radix = if matches!(ty, SymbolType::Hex) { 16 } else { 10 };
    let threshold = parse_numeric(value, radix).ok_or(LowerError::NotANumber)?;

    // Mint-then-constrain: every known value is fully interned (and, by the constraint
    // builder's exclusivity clauses, fully constrained) before this comparator's OR is built.
    for known in sym.known_values().to_vec() {
        literals.get_or_create_value(id, &name, Some(&known));
    }

    let mut matches = Vec::new();
    for &var in literals.known_value_literals(id) {
        let Some(lit) = literals.literal(var) else { continue };
        let crate::literal::LiteralTag::NonBool(_, Some(text)) = lit.tag() else { continue };
        let Some(n) = parse_numeric(text, radix) else { continue };
        let hit = match cmp {
            Comparator::Lt => n < threshold,
            Comparator::Le => n <= threshold,
            Comparator::Gt => n > threshold,
            Comparator::Ge => n >= threshold,
        };
        if hit {
            matches.push(PNode::lit(var));
        }
    }
    Ok(consts.or_many(matches))
}

fn parse_numeric(text: &str, radix: u32) -> Option<i64> {
    let text = text.trim();
    let text = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    i64::from_str_radix(text, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureModel;
    use crate::model::SymbolId;

    #[test]
    fn and_or_projections_match_kleene_semantics() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let b = model.add_bool("B");
        let mut literals = LiteralStore::new();
        let (t, f) = literals.create_constants();
        let consts = PConstants::new(t, f);
        let expr = ModelExpr::Symbol(a).and(ModelExpr::Symbol(b));
        let proj = lower(&model, &mut literals, &consts, &expr).unwrap();
        assert!(proj.m.structural_eq(&consts.falsity));
        let _ = SymbolId(0);
        let _ = proj.y;
        let _ = proj.both;
    }
}
