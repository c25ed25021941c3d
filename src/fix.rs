/*!
The fix applier (FX, §4.8): applies a chosen diagnosis to the live model, respecting
dependency order by retrying the working list until it empties, nothing more can be applied, or
an iteration bound is hit.
*/

use log::{debug, trace, warn};

use crate::diagnosis::{Diagnosis, SymbolFix};
use crate::error::FixError;
use crate::model::{Model, SymbolValue, Tristate};

/// The result of applying a diagnosis: which symbols took their new value, and which the
/// model's range-checked setter refused (§7 "fix-application failure").
#[derive(Clone, Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<crate::model::SymbolId>,
    pub failed: Vec<crate::model::SymbolId>,
}

/// Applies `diagnosis` to `model` (§4.8). Loops over the still-pending fixes, trying each in
/// turn and removing it from the working list on success, restarting the pass whenever
/// something succeeded (dependency order: a fix that fails this pass may succeed once an
/// earlier one in the list has taken effect). Terminates after at most `2 * |diagnosis|`
/// iterations, matching the bound a hand-rolled worklist loop in this style would need to avoid
/// spinning forever on a genuinely-refused fix.
pub fn apply_diagnosis<M: Model>(model: &mut M, diagnosis: &Diagnosis) -> ApplyReport {
    let mut pending: Vec<&SymbolFix> = diagnosis.fixes.iter().collect();
    let mut report = ApplyReport::default();
    let max_iterations = 2 * diagnosis.fixes.len().max(1);
    let mut iterations = 0;

    while !pending.is_empty() && iterations < max_iterations {
        iterations += 1;
        let mut progressed = false;
        let mut still_pending = Vec::new();

        for fix in pending {
            match fix {
                SymbolFix::Disallowed(id) => {
                    warn!("diagnosis flip for {id} has no legal value; skipping ({})", FixError::Refused(*id));
                    report.failed.push(*id);
                }
                SymbolFix::Tristate(id, value) => {
                    trace!("attempting to set {id} to {value}");
                    if model.set_value(*id, SymbolValue::Tri(*value)) {
                        debug!("applied fix {id} := {value}");
                        report.applied.push(*id);
                        progressed = true;
                    } else {
                        still_pending.push(fix);
                    }
                }
                SymbolFix::NonBool(id, value) => {
                    trace!("attempting to set {id} to {value:?}");
                    if model.set_value(*id, SymbolValue::NonBool(value.clone())) {
                        debug!("applied fix {id} := {value:?}");
                        report.applied.push(*id);
                        progressed = true;
                    } else {
                        still_pending.push(fix);
                    }
                }
            }
        }

        pending = still_pending;
        if !progressed {
            break;
        }
    }

    for fix in pending {
        match fix {
            SymbolFix::Tristate(id, _) | SymbolFix::NonBool(id, _) => {
                warn!("fix applier gave up on {id} after exhausting retries ({})", FixError::Refused(*id));
                report.failed.push(*id);
            }
            SymbolFix::Disallowed(_) => {}
        }
    }

    report
}

/// Renders `report`'s failures as [FixError]s, for a caller that wants the typed error form
/// rather than a bare [crate::model::SymbolId] list (§7).
pub fn failures_as_errors(report: &ApplyReport) -> Vec<FixError> {
    report.failed.iter().map(|id| FixError::Refused(*id)).collect()
}

/// Convenience check used by callers that want to know whether every target symbol already
/// reports its declared value, without mutating anything (§4.8 termination condition).
pub fn already_satisfied<M: Model>(model: &M, diagnosis: &Diagnosis) -> bool {
    diagnosis.fixes.iter().all(|fix| match fix {
        SymbolFix::Disallowed(_) => false,
        SymbolFix::Tristate(id, value) => {
            matches!(model.symbol(*id).current_value(), SymbolValue::Tri(v) if v == *value)
        }
        SymbolFix::NonBool(id, value) => {
            matches!(model.symbol(*id).current_value(), SymbolValue::NonBool(v) if v == *value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureModel;

    #[test]
    fn applies_a_single_tristate_fix() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let diagnosis = Diagnosis { fixes: vec![SymbolFix::Tristate(a, Tristate::Yes)] };
        let report = apply_diagnosis(&mut model, &diagnosis);
        assert_eq!(report.applied, vec![a]);
        assert!(report.failed.is_empty());
        assert_eq!(model.symbol(a).current_value(), SymbolValue::Tri(Tristate::Yes));
    }

    #[test]
    fn applies_a_nonbool_fix() {
        let mut model = FixtureModel::new();
        let s = model.add_str("S");
        let diagnosis = Diagnosis { fixes: vec![SymbolFix::NonBool(s, Some("a".to_string()))] };
        let report = apply_diagnosis(&mut model, &diagnosis);
        assert_eq!(report.applied, vec![s]);
        assert!(report.failed.is_empty());
        assert_eq!(model.symbol(s).current_value(), SymbolValue::NonBool(Some("a".to_string())));
    }

    #[test]
    fn disallowed_fix_is_reported_as_failed_without_touching_the_model() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let diagnosis = Diagnosis { fixes: vec![SymbolFix::Disallowed(a)] };
        let report = apply_diagnosis(&mut model, &diagnosis);
        assert_eq!(report.failed, vec![a]);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn failures_render_as_fix_errors() {
        let mut model = FixtureModel::new();
        let a = model.add_bool("A");
        let diagnosis = Diagnosis { fixes: vec![SymbolFix::Disallowed(a)] };
        let report = apply_diagnosis(&mut model, &diagnosis);
        let errors = failures_as_errors(&report);
        assert_eq!(errors, vec![FixError::Refused(a)]);
    }
}
