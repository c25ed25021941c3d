/*!
The assumption driver (AD, §4.6): translates the current configuration and a conflict (the
user's desired assignments) into solver assumptions, invokes the backend, and classifies the
result.
*/

use log::{debug, trace};

use crate::error::{ConflictError, ErrorKind};
use crate::literal::LiteralStore;
use crate::model::{Model, Symbol, SymbolId, SymbolType, SymbolValue, Tristate};
use crate::solver::{SatBackend, SolveOutcome};

/// One entry of a conflict: a symbol paired with the tristate the caller wants it to hold.
/// Only booleans/tristates are supported as conflict targets (§3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConflictEntry {
    pub symbol: SymbolId,
    pub target: Tristate,
}

/// An ordered list of conflict entries (`sdv_list`, §3).
#[derive(Clone, Debug, Default)]
pub struct Conflict {
    entries: Vec<ConflictEntry>,
}

impl Conflict {
    pub fn new() -> Self {
        Conflict::default()
    }

    /// Adds `symbol := target` to the conflict, validating it against `model` (§7 "invalid
    /// conflict input").
    pub fn add<M: Model>(&mut self, model: &M, symbol: SymbolId, target: Tristate) -> Result<(), ConflictError> {
        if symbol.0 as usize >= model.symbols().len() {
            return Err(ConflictError::UnknownSymbol(symbol));
        }
        let sym = model.symbol(symbol);
        if !sym.symbol_type().is_boolean_like() || sym.symbol_type() == SymbolType::Choice {
            return Err(ConflictError::NonBooleanTarget(symbol));
        }
        if target == Tristate::Mod && sym.symbol_type() == SymbolType::Bool {
            return Err(ConflictError::ModOnBoolean(symbol));
        }
        self.entries.push(ConflictEntry { symbol, target });
        Ok(())
    }

    pub fn entries(&self) -> &[ConflictEntry] {
        &self.entries
    }

    pub fn contains(&self, symbol: SymbolId) -> bool {
        self.entries.iter().any(|e| e.symbol == symbol)
    }
}

/// One assumption: a `(satvar, polarity)` pair tagged with the symbol it encodes, so the
/// diagnosis engine can translate a flipped literal back into a concrete fix (§4.7).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Assumption {
    pub symbol: SymbolId,
    pub var: crate::literal::SatVar,
    pub polarity: bool,
    /// Whether this literal is the `y`-role literal (`false` = `both`-role), for tristate
    /// symbols; always `true` for plain booleans and non-boolean value literals.
    pub is_y_role: bool,
}

/// The outcome of a single assumption-driven solve (§4.6).
pub enum DriveResult {
    /// The conflict already holds; return it verbatim as a one-element diagnosis.
    AlreadySatisfiable,
    /// The solver proved the assumption set inconsistent; carries the failed core.
    Unsatisfiable(Vec<Assumption>),
    /// The solver returned UNKNOWN; treated as "no information" (§7).
    Unknown,
}

/// Builds the full assumption set for `model` under `conflict`: current-value assumptions for
/// every symbol, with conflict targets overriding the current value (§4.6).
pub fn build_assumptions<M: Model>(
    model: &M,
    literals: &mut LiteralStore,
    conflict: &Conflict,
) -> Vec<Assumption> {
    let mut assumptions = Vec::new();
    for sym in model.symbols() {
        let id = sym.id();
        let name = sym.name().to_string();
        if let Some(entry) = conflict.entries().iter().find(|e| e.symbol == id) {
            push_tristate_assumptions(literals, &mut assumptions, id, &name, sym.symbol_type(), entry.target);
            continue;
        }
        match sym.current_value() {
            SymbolValue::Tri(t) => {
                push_tristate_assumptions(literals, &mut assumptions, id, &name, sym.symbol_type(), t);
            }
            SymbolValue::NonBool(value) => {
                push_nonbool_assumptions(literals, &mut assumptions, id, &name, sym, value.as_deref());
            }
        }
    }
    trace!("built {} assumption(s)", assumptions.len());
    assumptions
}

fn push_tristate_assumptions(
    literals: &mut LiteralStore,
    out: &mut Vec<Assumption>,
    id: SymbolId,
    name: &str,
    ty: SymbolType,
    value: Tristate,
) {
    let y = literals.symbol_y(id, name);
    out.push(Assumption { symbol: id, var: y, polarity: value.is_active(), is_y_role: true });
    if matches!(ty, SymbolType::Tri) {
        let both = literals.symbol_both(id, name);
        out.push(Assumption {
            symbol: id,
            var: both,
            polarity: matches!(value, Tristate::Mod | Tristate::Yes),
            is_y_role: false,
        });
    }
}

fn push_nonbool_assumptions<S: Symbol>(
    literals: &mut LiteralStore,
    out: &mut Vec<Assumption>,
    id: SymbolId,
    name: &str,
    sym: &S,
    current: Option<&str>,
) {
    literals.get_or_create_value(id, name, None);
    for v in sym.known_values() {
        literals.get_or_create_value(id, name, Some(v));
    }
    for &var in literals.known_value_literals(id).to_vec().iter() {
        let is_current = literals
            .literal(var)
            .map(|l| matches!(l.tag(), crate::literal::LiteralTag::NonBool(_, v) if v.as_deref() == current))
            .unwrap_or(false);
        out.push(Assumption { symbol: id, var, polarity: is_current, is_y_role: true });
    }
}

/// Invokes the backend with `assumptions`, classifying the result per §4.6/§7.
pub fn drive<B: SatBackend + ?Sized>(
    backend: &mut B,
    assumptions: &[Assumption],
) -> Result<DriveResult, ErrorKind> {
    let raw: Vec<(crate::literal::SatVar, bool)> =
        assumptions.iter().map(|a| (a.var, a.polarity)).collect();
    let outcome = backend.solve(&raw).map_err(ErrorKind::Solver)?;
    debug!("assumption drive outcome: {outcome:?}");
    match outcome {
        SolveOutcome::Satisfiable => Ok(DriveResult::AlreadySatisfiable),
        SolveOutcome::Unknown => Ok(DriveResult::Unknown),
        SolveOutcome::Unsatisfiable => {
            let core = backend.failed_core().map_err(ErrorKind::Solver)?;
            let core_assumptions = assumptions
                .iter()
                .filter(|a| core.iter().any(|&(v, p)| v == a.var && p == a.polarity))
                .copied()
                .collect();
            Ok(DriveResult::Unsatisfiable(core_assumptions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureModel;

    #[test]
    fn conflict_rejects_mod_on_plain_bool() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let mut conflict = Conflict::new();
        assert_eq!(conflict.add(&model, a, Tristate::Mod), Err(ConflictError::ModOnBoolean(a)));
    }

    #[test]
    fn conflict_target_overrides_current_value_assumption() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let mut literals = LiteralStore::new();
        literals.create_constants();
        let mut conflict = Conflict::new();
        conflict.add(&model, a, Tristate::Yes).unwrap();
        let assumptions = build_assumptions(&model, &mut literals, &conflict);
        assert_eq!(assumptions.len(), 1);
        assert!(assumptions[0].polarity);
    }
}
