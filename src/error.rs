use std::io;

use thiserror::Error;

use crate::grid::PathId;
use crate::location::Location;

/// Reasons a puzzle is rejected before any encoding work is done.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("puzzle has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("cannot read cell {token:?} at {location}")]
    BadToken { token: String, location: Location },
    #[error("path labels must be exactly 1..={expected_max}, but {missing} is missing")]
    LabelGap { expected_max: PathId, missing: PathId },
    #[error("path {path} has {count} terminals, expected 2")]
    TerminusCount { path: PathId, count: usize },
    #[error("{location} lies outside the grid")]
    OutOfBounds { location: Location },
    #[error("{location} already holds a terminal")]
    Occupied { location: Location },
}

/// Failures talking to the satisfiability oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle {program} could not be started: {source}")]
    Unavailable { program: String, source: io::Error },
    #[error("oracle I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("oracle exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("cannot parse oracle output: {0}")]
    Parse(String),
    #[error("oracle gave no verdict")]
    Indeterminate,
    #[error("in-process solver failed: {0}")]
    Solver(String),
}

/// Failures of a solving run. An unsolvable puzzle is not one of them.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// The oracle's model contradicts the local rules of the encoding that produced it.
    #[error("oracle model is inconsistent at {location}: {reason}")]
    InconsistentModel { location: Location, reason: String },
    #[error("no cycle-free solution within {0} oracle queries")]
    IterationLimit(usize),
    #[error("cannot save formula to {path}: {source}")]
    Save { path: String, source: io::Error },
}
