/*!
A propositional-constraint conflict resolver for hierarchical feature-selection models.

kdiag takes a configuration model — features with boolean/tristate/integer/hex/string values,
dependencies, defaults, reverse selects and implies, and choice groups — together with a
*conflict*: a list of desired assignments that is inconsistent with the model's own constraints.
It computes minimal *diagnoses*: sets of additional changes that, together with the conflict,
restore consistency.

# Orientation

The library is built around a [session::Session], which owns the feature literal store, the
built constraint set, and a SAT solver backend, and exposes `add_conflict`/`run_diagnosis`/
`apply` as its public surface.

Internally, a diagnosis is produced by a pipeline:
- [model] fixes the interface a configuration-model front-end must expose (out of this crate's
  scope; a minimal in-memory implementation lives in [fixture] for tests and the demo binary).
- [lower] translates model expressions into propositional projections under tristate Kleene
  semantics.
- [constraints] emits the constraint family for every symbol as [pdag] nodes.
- [cnf] lowers the constraint set to CNF clauses, unfolding what is already in CNF and
  Tseitin-encoding the rest.
- [solver] wraps a SAT backend capable of assumption-driven solving and core extraction.
- [assumptions] translates the current configuration and the conflict into solver assumptions.
- [diagnosis] searches for minimal hitting sets over the UNSAT cores the solver reports.
- [fix] applies a chosen diagnosis back to the model.

# Logs

Every module that makes a non-trivial decision — constraint emission, Tseitin variable minting,
assumption translation, hitting-set branching, fix application — emits a [log::trace!]/
[log::debug!] record. Logging is via the [log] crate's facade only; nothing is emitted unless a
subscriber (e.g. [env_logger](https://docs.rs/env_logger)) is installed.
*/

#![allow(clippy::collapsible_else_if)]

pub mod assumptions;
pub mod cnf;
pub mod config;
pub mod constraints;
pub mod diagnosis;
pub mod error;
pub mod fix;

/// An in-memory [model::Model]/[model::Symbol] implementation, for tests and the demo binary
/// only — see its own doc comment.
pub mod fixture;

pub mod literal;
pub mod lower;
pub mod model;
pub mod pdag;
pub mod rng;
pub mod session;
pub mod solver;
