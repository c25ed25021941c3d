/*!
The SAT backend capability (§6, §9): a narrow trait standing in for the externally-loaded solver
of the source system, plus [OtterBackend], a concrete in-process implementation over the
`otter_sat` crate.

The source loads solver entry points from a shared library by name, tolerating several
file-name spellings, and disables conflict resolution (without aborting) if the load fails.
A safe Rust library cannot fabricate arbitrary `dlopen` targets, so this crate draws the
boundary at the trait: [SatBackend] is the capability set, built once at session start;
[OtterBackend] is the one implementation this crate ships, and a caller wanting a different
solver only needs to implement the trait (see DESIGN.md).
*/

use std::collections::HashMap;

use log::{debug, trace};

use otter_sat::config::Config as OtterConfig;
use otter_sat::context::Context;
use otter_sat::reports::Report as OtterReport;

use crate::error::SolverError;
use crate::literal::SatVar;

/// The outcome of a [SatBackend::solve] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveOutcome {
    Satisfiable,
    Unsatisfiable,
    Unknown,
}

/// The narrow capability set the assumption driver and diagnosis engine need from a solver
/// (§6): add a clause, solve under assumptions, read back the failed-assumption core, and
/// reset for another solve. Variables are addressed by this crate's own [SatVar] numbering;
/// implementations are responsible for whatever internal renumbering they need.
pub trait SatBackend {
    /// Adds one clause, given as signed [SatVar]s (positive = asserted true).
    fn add_clause(&mut self, clause: &[(SatVar, bool)]) -> Result<(), SolverError>;

    /// Solves under the given assumptions (each a `(var, polarity)` pair).
    fn solve(&mut self, assumptions: &[(SatVar, bool)]) -> Result<SolveOutcome, SolverError>;

    /// The failed-assumption core of the most recent `Unsatisfiable` solve.
    fn failed_core(&self) -> Result<Vec<(SatVar, bool)>, SolverError>;

    /// Resets decisions and assumptions so another `solve` can be attempted.
    fn refresh(&mut self);
}

/// A [SatBackend] backed by an in-process `otter_sat` context.
///
/// `otter_sat` numbers its own atoms independently of this crate's `satmap` (atom 0 is reserved
/// internally, see `structures::atom`); `var_to_atom`/`atom_to_var` keep the two numberings in
/// sync, minting a fresh `otter_sat` atom the first time a [SatVar] is referenced.
pub struct OtterBackend {
    ctx: Context,
    var_to_atom: HashMap<SatVar, i32>,
    atom_to_var: HashMap<i32, SatVar>,
    last_assumptions: Vec<(SatVar, bool)>,
}

impl OtterBackend {
    pub fn new() -> Self {
        OtterBackend {
            ctx: Context::from_config(OtterConfig::default()),
            var_to_atom: HashMap::new(),
            atom_to_var: HashMap::new(),
            last_assumptions: Vec::new(),
        }
    }

    /// Returns the `otter_sat` literal (signed atom) standing for `(var, polarity)`, minting a
    /// fresh atom on first use.
    fn literal_for(&mut self, var: SatVar, polarity: bool) -> i32 {
        let atom = *self.var_to_atom.entry(var).or_insert_with(|| {
            let [fresh] = *self.ctx.fresh_or_max_literals(1).as_slice() else {
                unreachable!("fresh_or_max_literals(1) always returns exactly one literal")
            };
            let atom = fresh.unsigned_abs() as i32;
            self.atom_to_var.insert(atom, var);
            trace!("mapped solver variable {var} to backend atom {atom}");
            atom
        });
        if polarity {
            atom
        } else {
            -atom
        }
    }
}

impl Default for OtterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SatBackend for OtterBackend {
    fn add_clause(&mut self, clause: &[(SatVar, bool)]) -> Result<(), SolverError> {
        let lits: Vec<i32> = clause.iter().map(|&(v, p)| self.literal_for(v, p)).collect();
        debug!("adding clause of {} literal(s) to backend", lits.len());
        self.ctx.add_clause(lits).map(|_| ()).map_err(|_| SolverError::Unavailable)
    }

    fn solve(&mut self, assumptions: &[(SatVar, bool)]) -> Result<SolveOutcome, SolverError> {
        self.last_assumptions = assumptions.to_vec();
        let lits: Vec<i32> = assumptions.iter().map(|&(v, p)| self.literal_for(v, p)).collect();
        trace!("solving under {} assumption(s)", lits.len());
        self.ctx
            .solve_given(Some(lits))
            .map_err(|_| SolverError::Unavailable)?;
        let outcome = match self.ctx.report() {
            OtterReport::Satisfiable => SolveOutcome::Satisfiable,
            OtterReport::Unsatisfiable => SolveOutcome::Unsatisfiable,
            OtterReport::Unknown => SolveOutcome::Unknown,
        };
        debug!("solve outcome: {outcome:?}");
        Ok(outcome)
    }

    fn failed_core(&self) -> Result<Vec<(SatVar, bool)>, SolverError> {
        if !matches!(self.ctx.report(), OtterReport::Unsatisfiable) {
            return Err(SolverError::NoCoreAvailable);
        }
        let failed = self.ctx.failed_assumpions();
        let mut core = Vec::new();
        for lit in failed {
            let atom = lit.unsigned_abs() as i32;
            let Some(&var) = self.atom_to_var.get(&atom) else { continue };
            core.push((var, lit.is_positive()));
        }
        Ok(core)
    }

    fn refresh(&mut self) {
        trace!("refreshing backend context for next solve");
        self.ctx.refresh();
    }
}

/// Builds a backend at session start, following the source's "absence disables conflict
/// resolution, does not abort" policy (§6, §9): this in-process backend never fails to
/// construct, but the signature mirrors what a `dlopen`-based one would need to report.
pub fn build_default_backend() -> Option<Box<dyn SatBackend>> {
    Some(Box::new(OtterBackend::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_assumption_failure_is_reported_as_unsat() {
        let mut backend = OtterBackend::new();
        backend.add_clause(&[(1, false), (2, true)]).unwrap();
        backend.add_clause(&[(2, false)]).unwrap();
        let outcome = backend.solve(&[(1, true)]).unwrap();
        assert_eq!(outcome, SolveOutcome::Unsatisfiable);
        let core = backend.failed_core().unwrap();
        assert!(core.iter().any(|&(v, p)| v == 1 && p));
    }

    #[test]
    fn satisfiable_formula_reports_sat() {
        let mut backend = OtterBackend::new();
        backend.add_clause(&[(1, true), (2, true)]).unwrap();
        let outcome = backend.solve(&[]).unwrap();
        assert_eq!(outcome, SolveOutcome::Satisfiable);
    }

    #[test]
    fn refresh_allows_a_second_solve() {
        let mut backend = OtterBackend::new();
        backend.add_clause(&[(1, false), (2, true)]).unwrap();
        backend.add_clause(&[(2, false)]).unwrap();
        assert_eq!(backend.solve(&[(1, true)]).unwrap(), SolveOutcome::Unsatisfiable);
        backend.refresh();
        assert_eq!(backend.solve(&[(1, false)]).unwrap(), SolveOutcome::Satisfiable);
    }
}
