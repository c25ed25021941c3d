/*!
The diagnosis engine (DX, §4.7): enumerates locally minimal diagnoses from an UNSAT core via a
hitting-set search over successive cores, under a cancellation flag and a wall-clock timeout.
*/

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::assumptions::Assumption;
use crate::error::DiagnosisError;
use crate::literal::{LiteralStore, LiteralTag, SatVar};
use crate::model::{SymbolId, Tristate};
use crate::rng::MinimalPcg32;
use crate::solver::{SatBackend, SolveOutcome};

/// One flip the engine decided to make: negate or reassign the assumption for `symbol`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Flip {
    pub symbol: SymbolId,
    /// The new polarity for the flipped literal (`var`/`is_y_role` identify which literal).
    pub var: crate::literal::SatVar,
    pub polarity: bool,
    pub is_y_role: bool,
}

/// A diagnosis: a minimal set of flips that restores satisfiability together with the conflict
/// (`sfix_list`, §3), translated to a concrete per-symbol replacement value.
#[derive(Clone, Debug, Default)]
pub struct Diagnosis {
    pub fixes: Vec<SymbolFix>,
}

/// One symbol's new value within a diagnosis.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SymbolFix {
    Tristate(SymbolId, Tristate),
    /// A non-boolean symbol's new value, read off the value literal the flip made true.
    /// `None` is the synthetic "unset" value (§3).
    NonBool(SymbolId, Option<String>),
    /// A flip with no legal corresponding value (§4.7 step c).
    Disallowed(SymbolId),
}

/// Exit status of a `run_diagnosis` call (§4.7 step 3, §5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagnosisStatus {
    Normal,
    Timeout,
    Canceled,
    LimitReached,
}

/// The result of a diagnosis search: the diagnoses found (in discovery order, §5) and how the
/// search ended.
pub struct DiagnosisReport {
    pub diagnoses: Vec<Diagnosis>,
    pub status: DiagnosisStatus,
}

/// A candidate hitting set under construction: the flipped assumption indices it contains.
type Candidate = Vec<usize>;

/// Runs the hitting-set search of §4.7.
///
/// `assumptions` is the full assumption set `A` used for the original solve; `conflict_vars`
/// identifies which entries are conflict targets `T` (never flipped); `first_core` is the
/// initial UNSAT core. `cancel` is polled between iterations and before each solve (§5, §9);
/// `limit` bounds the number of diagnoses produced; `deadline` bounds wall-clock time. `rng_seed`
/// seeds the branch-order tie-breaking (§9, `Config::rng_seed`) — the same seed over the same
/// inputs reproduces the same discovery order (§8 property 6), but does not otherwise affect
/// which diagnoses are found. `literals` is consulted only to translate a found candidate back
/// into concrete, per-symbol [SymbolFix]es (a non-boolean value literal carries its value in its
/// [LiteralTag], which the solve/branch loop itself has no need to inspect).
#[allow(clippy::too_many_arguments)]
pub fn run_diagnosis<B: SatBackend + ?Sized>(
    backend: &mut B,
    literals: &LiteralStore,
    assumptions: &[Assumption],
    conflict_vars: &[crate::literal::SatVar],
    first_core: &[Assumption],
    limit: usize,
    timeout: Duration,
    cancel: &Arc<AtomicBool>,
    rng_seed: u64,
) -> Result<DiagnosisReport, DiagnosisError> {
    let start = Instant::now();
    let mut rng = MinimalPcg32::from_seed_u64(rng_seed);
    let flippable: Vec<usize> = (0..assumptions.len())
        .filter(|&i| !conflict_vars.contains(&assumptions[i].var))
        .collect();

    let mut known_cores: Vec<Vec<usize>> = vec![core_indices(assumptions, first_core)];
    let mut frontier: VecDeque<Candidate> = VecDeque::new();
    frontier.push_back(Vec::new());

    let mut diagnoses = Vec::new();
    let mut status = DiagnosisStatus::Normal;

    'search: while let Some(candidate) = frontier.pop_front() {
        if cancel.load(Ordering::SeqCst) {
            debug!("diagnosis search canceled after {} diagnosis(es)", diagnoses.len());
            status = DiagnosisStatus::Canceled;
            break;
        }
        if start.elapsed() > timeout {
            debug!("diagnosis search timed out after {} diagnosis(es)", diagnoses.len());
            status = DiagnosisStatus::Timeout;
            break;
        }
        if diagnoses.len() >= limit {
            status = DiagnosisStatus::LimitReached;
            break;
        }

        let Some(unhit) = known_cores.iter().find(|k| !hits(k, &candidate)) else {
            // `candidate` hits every known core: attempt a solve with it flipped.
            let flipped_raw: Vec<(crate::literal::SatVar, bool)> = candidate
                .iter()
                .map(|&i| (assumptions[i].var, !assumptions[i].polarity))
                .collect();
            let mut raw: Vec<(crate::literal::SatVar, bool)> = assumptions
                .iter()
                .enumerate()
                .filter(|(i, _)| !candidate.contains(i))
                .map(|(_, a)| (a.var, a.polarity))
                .collect();
            raw.extend(flipped_raw);

            // `otter_sat::Context::solve_given` short-circuits to its cached report once the
            // context has reached `Satisfiable`/`Unsatisfiable` (the backend entered this search
            // already `Unsatisfiable` from the driving solve), so every candidate solve here must
            // refresh first or it would just replay the previous outcome.
            backend.refresh();
            let outcome = backend.solve(&raw).map_err(|_| DiagnosisError::Canceled)?;
            match outcome {
                SolveOutcome::Satisfiable => {
                    trace!("candidate of size {} restores satisfiability", candidate.len());
                    diagnoses.push(translate(literals, assumptions, &candidate));
                    continue 'search;
                }
                SolveOutcome::Unknown => continue 'search,
                SolveOutcome::Unsatisfiable => {
                    let core = backend.failed_core().map_err(|_| DiagnosisError::Canceled)?;
                    let core_idx = raw_core_indices(assumptions, &core);
                    if !known_cores.iter().any(|k| k == &core_idx) {
                        known_cores.push(core_idx);
                    }
                    // Re-branch this candidate now that a new core is known.
                    branch(&candidate, &flippable, known_cores.last().unwrap(), &mut frontier, &mut rng);
                    continue 'search;
                }
            }
        };

        branch(&candidate, &flippable, unhit, &mut frontier, &mut rng);
    }

    Ok(DiagnosisReport { diagnoses, status })
}

fn hits(core: &[usize], candidate: &[usize]) -> bool {
    core.iter().any(|c| candidate.contains(c))
}

/// Branches `candidate` over each flippable, not-yet-included literal of `core`, in an order
/// shuffled by `rng` (§9) rather than the core's own enumeration order.
fn branch(
    candidate: &[usize],
    flippable: &[usize],
    core: &[usize],
    frontier: &mut VecDeque<Candidate>,
    rng: &mut MinimalPcg32,
) {
    let mut order: Vec<usize> = core
        .iter()
        .copied()
        .filter(|lit_idx| flippable.contains(lit_idx) && !candidate.contains(lit_idx))
        .collect();
    rng.shuffle(&mut order);
    for lit_idx in order {
        let mut next = candidate.to_vec();
        next.push(lit_idx);
        next.sort_unstable();
        frontier.push_back(next);
    }
}

fn core_indices(assumptions: &[Assumption], core: &[Assumption]) -> Vec<usize> {
    let mut idx: Vec<usize> = assumptions
        .iter()
        .enumerate()
        .filter(|(_, a)| core.iter().any(|c| c.var == a.var && c.polarity == a.polarity))
        .map(|(i, _)| i)
        .collect();
    idx.sort_unstable();
    idx
}

fn raw_core_indices(assumptions: &[Assumption], core: &[(crate::literal::SatVar, bool)]) -> Vec<usize> {
    let mut idx: Vec<usize> = assumptions
        .iter()
        .enumerate()
        .filter(|(_, a)| core.iter().any(|&(v, p)| v == a.var && p == a.polarity))
        .map(|(i, _)| i)
        .collect();
    idx.sort_unstable();
    idx
}

/// One symbol's accumulated flips within a candidate, pending translation to a [SymbolFix].
enum Slot {
    /// `(new y, new both)`, either still unknown.
    Tristate(Option<bool>, Option<bool>),
    /// `(var, new polarity)` per flipped non-boolean value literal for this symbol.
    NonBool(Vec<(SatVar, bool)>),
}

/// Translates a flipped candidate into a concrete [Diagnosis] (§4.7 step c). Non-boolean value
/// literals are told apart from tristate role literals by their [LiteralTag] rather than
/// `Assumption::is_y_role`, since every value-literal assumption carries `is_y_role: true`
/// (`assumptions::push_nonbool_assumptions`).
fn translate(literals: &LiteralStore, assumptions: &[Assumption], candidate: &[usize]) -> Diagnosis {
    let mut by_symbol: std::collections::BTreeMap<SymbolId, Slot> = std::collections::BTreeMap::new();
    for &idx in candidate {
        let a = assumptions[idx];
        let new_polarity = !a.polarity;
        let is_nonbool = matches!(
            literals.literal(a.var).map(|l| l.tag()),
            Some(LiteralTag::NonBool(_, _))
        );
        if is_nonbool {
            match by_symbol.entry(a.symbol).or_insert_with(|| Slot::NonBool(Vec::new())) {
                Slot::NonBool(flips) => flips.push((a.var, new_polarity)),
                Slot::Tristate(_, _) => unreachable!("a symbol's literals are either all NonBool or all tristate"),
            }
        } else {
            match by_symbol.entry(a.symbol).or_insert_with(|| Slot::Tristate(None, None)) {
                Slot::Tristate(y, both) => {
                    if a.is_y_role {
                        *y = Some(new_polarity);
                    } else {
                        *both = Some(new_polarity);
                    }
                }
                Slot::NonBool(_) => unreachable!("a symbol's literals are either all NonBool or all tristate"),
            }
        }
    }
    let mut fixes = Vec::new();
    for (symbol, slot) in by_symbol {
        let fix = match slot {
            Slot::Tristate(y, both) => match (y, both) {
                (Some(true), _) => SymbolFix::Tristate(symbol, Tristate::Yes),
                (Some(false), Some(true)) => SymbolFix::Tristate(symbol, Tristate::Mod),
                (Some(false), Some(false)) | (Some(false), None) => {
                    SymbolFix::Tristate(symbol, Tristate::No)
                }
                (None, Some(true)) => SymbolFix::Tristate(symbol, Tristate::Mod),
                (None, Some(false)) => SymbolFix::Tristate(symbol, Tristate::No),
                (None, None) => SymbolFix::Disallowed(symbol),
            },
            Slot::NonBool(flips) => match flips.iter().find(|&&(_, newly_true)| newly_true) {
                Some(&(var, _)) => match literals.literal(var).map(|l| l.tag()) {
                    Some(LiteralTag::NonBool(_, value)) => SymbolFix::NonBool(symbol, value.clone()),
                    _ => unreachable!("var was matched as LiteralTag::NonBool above"),
                },
                // Every value literal flipped was driven false with none newly true: no known
                // value literal can stand for the symbol's new state (§4.7 step c).
                None => SymbolFix::Disallowed(symbol),
            },
        };
        fixes.push(fix);
    }
    Diagnosis { fixes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::OtterBackend;

    #[test]
    fn trivial_diagnosis_flips_the_one_flippable_assumption() {
        // Clause: ¬q ∨ p (q → p). `p` (symbol 0) sits at its current value `false`; `q`
        // (symbol 1) is the conflict target, pinned `true`. Both are needed to falsify the
        // clause, so the first core contains both, but only `p` is flippable.
        let mut backend = OtterBackend::new();
        backend.add_clause(&[(2, false), (1, true)]).unwrap();

        let assumptions = vec![
            Assumption { symbol: SymbolId(0), var: 1, polarity: false, is_y_role: true },
            Assumption { symbol: SymbolId(1), var: 2, polarity: true, is_y_role: true },
        ];
        let outcome = backend.solve(&[(1, false), (2, true)]).unwrap();
        assert_eq!(outcome, SolveOutcome::Unsatisfiable);
        let core_raw = backend.failed_core().unwrap();
        let first_core: Vec<Assumption> = assumptions
            .iter()
            .filter(|a| core_raw.iter().any(|&(v, p)| v == a.var && p == a.polarity))
            .copied()
            .collect();
        backend.refresh();

        let literals = LiteralStore::new();
        let report = run_diagnosis(
            &mut backend,
            &literals,
            &assumptions,
            &[2], // q's assumption var is the conflict target, never flipped
            &first_core,
            16,
            Duration::from_secs(5),
            &Arc::new(AtomicBool::new(false)),
            0,
        )
        .unwrap();

        assert_eq!(report.status, DiagnosisStatus::Normal);
        assert!(!report.diagnoses.is_empty());
        let first = &report.diagnoses[0];
        assert!(first.fixes.iter().any(|f| matches!(f, SymbolFix::Tristate(SymbolId(0), Tristate::Yes))));
    }

    #[test]
    fn nonbool_value_literal_flip_translates_to_its_minted_value() {
        // `S` (symbol 0) is a non-boolean symbol currently unset, with known values "a"/"b".
        // `A` (symbol 1, boolean) is the conflict target, pinned `true`. Clause: A=y -> S="a",
        // so the only way to satisfy A=y is to also flip S's "unset" assumption false and its
        // "a" assumption true.
        let mut literals = LiteralStore::new();
        literals.create_constants();
        let s = SymbolId(0);
        let (unset_var, _) = literals.get_or_create_value(s, "S", None);
        let (a_var, _) = literals.get_or_create_value(s, "S", Some("a"));
        let (_b_var, _) = literals.get_or_create_value(s, "S", Some("b"));
        let a_sym = SymbolId(1);
        let a_y_var = literals.symbol_y(a_sym, "A");

        let mut backend = OtterBackend::new();
        backend.add_clause(&[(a_y_var, false), (a_var, true)]).unwrap();

        let assumptions = vec![
            Assumption { symbol: s, var: unset_var, polarity: true, is_y_role: true },
            Assumption { symbol: s, var: a_var, polarity: false, is_y_role: true },
            Assumption { symbol: a_sym, var: a_y_var, polarity: true, is_y_role: true },
        ];
        let raw: Vec<(crate::literal::SatVar, bool)> =
            assumptions.iter().map(|a| (a.var, a.polarity)).collect();
        let outcome = backend.solve(&raw).unwrap();
        assert_eq!(outcome, SolveOutcome::Unsatisfiable);
        let core_raw = backend.failed_core().unwrap();
        let first_core: Vec<Assumption> = assumptions
            .iter()
            .filter(|a| core_raw.iter().any(|&(v, p)| v == a.var && p == a.polarity))
            .copied()
            .collect();
        backend.refresh();

        let report = run_diagnosis(
            &mut backend,
            &literals,
            &assumptions,
            &[a_y_var],
            &first_core,
            64,
            Duration::from_secs(5),
            &Arc::new(AtomicBool::new(false)),
            0,
        )
        .unwrap();

        assert_eq!(report.status, DiagnosisStatus::Normal);
        assert!(!report.diagnoses.is_empty());
        assert!(report
            .diagnoses
            .iter()
            .any(|d| d.fixes.iter().any(|f| matches!(f, SymbolFix::NonBool(sym, Some(v)) if *sym == s && v == "a"))));
    }
}
