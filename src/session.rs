/*!
The session (§5, §9): the single-threaded owner of the literal store, the constraint set, the
solver backend and the cancellation flag, threaded through every operation rather than left as
implicit global state — the same posture the teacher takes with its `Context`/`GenericContext`
split.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::assumptions::{build_assumptions, drive, Conflict, ConflictEntry, DriveResult};
use crate::cnf::lower_constraints;
use crate::config::Config;
use crate::constraints::build_all;
use crate::diagnosis::{run_diagnosis, Diagnosis, DiagnosisReport, DiagnosisStatus};
use crate::error::{ConflictError, ErrorKind};
use crate::fix::{apply_diagnosis, ApplyReport};
use crate::literal::LiteralStore;
use crate::model::{Model, SymbolId, Tristate};
use crate::pdag::PConstants;
use crate::solver::{build_default_backend, SatBackend};

/// Bundles the core's mutable state for one model instance: the literal store, constraint set,
/// solver backend and cancellation flag (§5, §9). Built once per model and reused across
/// `run_diagnosis` calls; a second `run` while one is in progress is rejected (§5).
pub struct Session {
    literals: LiteralStore,
    consts: PConstants,
    backend: Option<Box<dyn SatBackend>>,
    config: Config,
    conflict: Conflict,
    cancel: Arc<AtomicBool>,
    running: bool,
}

impl Session {
    /// Builds a session for `model`: mints constants, builds and lowers the full constraint
    /// set, asserts every resulting clause to the backend, and constructs the backend itself.
    /// If no backend can be constructed the session is still usable read-only (§6, §7) —
    /// `run_diagnosis` then returns [ErrorKind::Solver].
    pub fn new<M: Model>(model: &M, config: Config) -> Result<Self, ErrorKind> {
        let mut literals = LiteralStore::new();
        let (t, f) = literals.create_constants();
        let consts = PConstants::new(t, f);

        let constraint_set = build_all(model, &mut literals, &consts)?;
        info!("built constraint set for {} symbol(s)", model.symbols().len());

        let clauses = lower_constraints(&mut literals, &constraint_set);
        debug!("lowered constraints to {} clause(s)", clauses.len());

        let mut backend = build_default_backend();
        if let Some(b) = backend.as_deref_mut() {
            for clause in &clauses {
                let raw: Vec<(crate::literal::SatVar, bool)> =
                    clause.iter().map(|l| (l.var(), l.polarity())).collect();
                b.add_clause(&raw).map_err(ErrorKind::Solver)?;
            }
        } else {
            warn!("no SAT solver backend available; conflict resolution is disabled");
        }

        Ok(Session {
            literals,
            consts,
            backend,
            config,
            conflict: Conflict::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            running: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Adds `symbol := target` to the session's conflict set (§3, §7).
    pub fn add_conflict<M: Model>(&mut self, model: &M, symbol: SymbolId, target: Tristate) -> Result<(), ConflictError> {
        self.conflict.add(model, symbol, target)
    }

    pub fn clear_conflict(&mut self) {
        self.conflict = Conflict::new();
    }

    pub fn conflict_entries(&self) -> &[ConflictEntry] {
        self.conflict.entries()
    }

    /// A clone of the cancellation flag, so a UI thread can request interruption of an
    /// in-progress `run_diagnosis` call from another thread (§5).
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs the assumption driver followed by the diagnosis engine for the session's current
    /// conflict set (§4.6, §4.7). Rejects a concurrent call (§5).
    pub fn run_diagnosis<M: Model>(&mut self, model: &M) -> Result<DiagnosisReport, ErrorKind> {
        if self.running {
            return Err(ErrorKind::Diagnosis(crate::error::DiagnosisError::AlreadyRunning));
        }
        self.running = true;
        let result = self.run_diagnosis_inner(model);
        self.running = false;
        result
    }

    fn run_diagnosis_inner<M: Model>(&mut self, model: &M) -> Result<DiagnosisReport, ErrorKind> {
        let Some(backend) = self.backend.as_deref_mut() else {
            return Err(ErrorKind::Solver(crate::error::SolverError::Unavailable));
        };
        self.cancel.store(false, Ordering::SeqCst);

        let assumptions = build_assumptions(model, &mut self.literals, &self.conflict);
        backend.refresh();
        let drive_result = drive(backend, &assumptions)?;

        match drive_result {
            DriveResult::AlreadySatisfiable => {
                info!("conflict is already satisfiable; returning it verbatim");
                let fixes = self
                    .conflict
                    .entries()
                    .iter()
                    .map(|e| crate::diagnosis::SymbolFix::Tristate(e.symbol, e.target))
                    .collect();
                Ok(DiagnosisReport {
                    diagnoses: vec![Diagnosis { fixes }],
                    status: DiagnosisStatus::Normal,
                })
            }
            DriveResult::Unknown => {
                warn!("solver returned UNKNOWN; treating as no diagnoses");
                Ok(DiagnosisReport { diagnoses: Vec::new(), status: DiagnosisStatus::Normal })
            }
            DriveResult::Unsatisfiable(first_core) => {
                let conflict_vars: Vec<crate::literal::SatVar> = assumptions
                    .iter()
                    .filter(|a| self.conflict.contains(a.symbol))
                    .map(|a| a.var)
                    .collect();
                run_diagnosis(
                    backend,
                    &self.literals,
                    &assumptions,
                    &conflict_vars,
                    &first_core,
                    self.config.diagnosis_limit.value,
                    self.config.timeout.value,
                    &self.cancel,
                    self.config.rng_seed.value,
                )
                .map_err(ErrorKind::Diagnosis)
            }
        }
    }

    /// Requests cancellation of an in-progress `run_diagnosis` call (§5, §9). Idempotent.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Applies `diagnosis` to `model` via the fix applier (§4.8).
    pub fn apply<M: Model>(&mut self, model: &mut M, diagnosis: &Diagnosis) -> ApplyReport {
        apply_diagnosis(model, diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureModel;
    use crate::model::{ModelExpr, Property};

    #[test]
    fn s1_trivial_boolean_target() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");

        let mut session = Session::new(&model, Config::default()).unwrap();
        session.add_conflict(&model, a, Tristate::Yes).unwrap();

        let report = session.run_diagnosis(&model).unwrap();
        assert_eq!(report.status, DiagnosisStatus::Normal);
        assert_eq!(report.diagnoses.len(), 1);

        let apply_report = session.apply(&mut model, &report.diagnoses[0]);
        assert!(apply_report.failed.is_empty());
        assert_eq!(
            model.symbol(a).current_value(),
            crate::model::SymbolValue::Tri(Tristate::Yes)
        );
    }

    #[test]
    fn s2_dependency_pulls_in_a_second_fix() {
        let mut model = FixtureModel::new();
        let a = model.add_tri("A");
        let b = model.add_bool("B");
        model.set_direct_dep(b, ModelExpr::Symbol(a));
        model.add_property(a, Property::Prompt { cond: ModelExpr::True });
        model.add_property(b, Property::Prompt { cond: ModelExpr::True });

        let mut session = Session::new(&model, Config::default()).unwrap();
        session.add_conflict(&model, b, Tristate::Yes).unwrap();

        let report = session.run_diagnosis(&model).unwrap();
        assert_eq!(report.status, DiagnosisStatus::Normal);
        assert!(!report.diagnoses.is_empty());
    }

    #[test]
    fn second_run_while_in_progress_is_rejected() {
        let mut model = FixtureModel::new();
        model.add_bool("A");
        let mut session = Session::new(&model, Config::default()).unwrap();
        session.running = true;
        let err = session.run_diagnosis(&model).unwrap_err();
        assert!(matches!(err, ErrorKind::Diagnosis(crate::error::DiagnosisError::AlreadyRunning)));
    }
}
