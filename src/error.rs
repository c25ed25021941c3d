/*!
Error types used throughout the crate.

- Most of these are unlikely to surface in normal use — they guard invariants of the PDAG, the
  literal store and the solver backend.
- Others are properly external, e.g. a session returns a [ConflictError] to report that an
  entry in the conflict could not be added (unknown symbol, non-boolean target, and so on).

Names of the error enums overlap, for the most part, with the component they belong to (§4 of the
specification this crate implements): [BuildError] for the constraint builder, [LowerError] for
expression lowering, [ConflictError] for the assumption driver, [DiagnosisError] for the
diagnosis engine, [FixError] for the fix applier, [SolverError] for the SAT backend capability.
*/

use crate::model::SymbolId;

/// A union of the varied error kinds produced by the crate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An error while building constraints for a symbol.
    Build(BuildError),

    /// An error while lowering a model expression.
    Lower(LowerError),

    /// An error in the conflict (the user's desired assignments).
    Conflict(ConflictError),

    /// An error, or exhaustion status, from the diagnosis engine.
    Diagnosis(DiagnosisError),

    /// An error while applying a diagnosis to the model.
    Fix(FixError),

    /// An error from the SAT solver capability.
    Solver(SolverError),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build(e) => write!(f, "build error: {e}"),
            Self::Lower(e) => write!(f, "lowering error: {e}"),
            Self::Conflict(e) => write!(f, "conflict error: {e}"),
            Self::Diagnosis(e) => write!(f, "diagnosis error: {e}"),
            Self::Fix(e) => write!(f, "fix error: {e}"),
            Self::Solver(e) => write!(f, "solver error: {e}"),
        }
    }
}

impl std::error::Error for ErrorKind {}

/// Errors raised while emitting the constraint family for a symbol (§4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildError {
    /// A choice member referenced a choice group it does not belong to.
    MemberNotInChoice,

    /// A default property's condition referenced a value literal that was never minted.
    UnmintedDefaultValue,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberNotInChoice => write!(f, "choice member not listed in its choice group"),
            Self::UnmintedDefaultValue => write!(f, "default value literal was never minted"),
        }
    }
}

impl From<BuildError> for ErrorKind {
    fn from(e: BuildError) -> Self {
        ErrorKind::Build(e)
    }
}

/// Errors raised while lowering a model expression to its Y/M/BOTH projections (§4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LowerError {
    /// A comparison referenced a symbol of a type the comparator does not support.
    UnsupportedComparison,

    /// A numeric comparator could not parse one side as a number.
    NotANumber,
}

impl std::fmt::Display for LowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedComparison => write!(f, "unsupported comparison for symbol type"),
            Self::NotANumber => write!(f, "value is not a number"),
        }
    }
}

impl From<LowerError> for ErrorKind {
    fn from(e: LowerError) -> Self {
        ErrorKind::Lower(e)
    }
}

/// Errors raised when adding an entry to the conflict set (§4.6, §7).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConflictError {
    /// No symbol with the given id is known to the model.
    UnknownSymbol(SymbolId),

    /// The conflict target named a non-boolean symbol; only booleans/tristates are supported.
    NonBooleanTarget(SymbolId),

    /// `mod` was requested for a symbol of type `BOOL`.
    ModOnBoolean(SymbolId),
}

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSymbol(id) => write!(f, "unknown symbol {id:?}"),
            Self::NonBooleanTarget(id) => {
                write!(f, "symbol {id:?} is not boolean/tristate")
            }
            Self::ModOnBoolean(id) => write!(f, "symbol {id:?} is a plain boolean, cannot be mod"),
        }
    }
}

impl From<ConflictError> for ErrorKind {
    fn from(e: ConflictError) -> Self {
        ErrorKind::Conflict(e)
    }
}

/// Errors raised around a diagnosis search (§4.7, §7). The search's own timeout/cancellation
/// outcomes are carried as a [crate::diagnosis::DiagnosisStatus] on a successful
/// [crate::diagnosis::DiagnosisReport] rather than here (§7: "returned as status TIMEOUT or
/// CANCELED with whatever partial set was produced") — these variants are for failures the
/// search cannot recover a partial result from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagnosisError {
    /// The backend reported a failure mid-search (e.g. a malformed clause reached the solver).
    Canceled,

    /// A second `run` was requested while a search was already in progress.
    AlreadyRunning,
}

impl std::fmt::Display for DiagnosisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canceled => write!(f, "diagnosis search was canceled"),
            Self::AlreadyRunning => write!(f, "a diagnosis search is already in progress"),
        }
    }
}

impl From<DiagnosisError> for ErrorKind {
    fn from(e: DiagnosisError) -> Self {
        ErrorKind::Diagnosis(e)
    }
}

/// Errors raised while applying a diagnosis to the live model (§4.8, §7).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FixError {
    /// The model's range-checked setter refused the new value for this symbol.
    Refused(SymbolId),
}

impl std::fmt::Display for FixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refused(id) => write!(f, "model refused new value for symbol {id:?}"),
        }
    }
}

impl From<FixError> for ErrorKind {
    fn from(e: FixError) -> Self {
        ErrorKind::Fix(e)
    }
}

/// Errors from the SAT solver capability (§6).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SolverError {
    /// No working solver backend was constructed at session start; conflict resolution is
    /// disabled but the session otherwise remains usable (read-only).
    Unavailable,

    /// `failed_assumptions` was called without a preceding `Unsatisfiable` result.
    NoCoreAvailable,
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no SAT solver backend is available"),
            Self::NoCoreAvailable => write!(f, "no unsatisfiable core is available"),
        }
    }
}

impl From<SolverError> for ErrorKind {
    fn from(e: SolverError) -> Self {
        ErrorKind::Solver(e)
    }
}
