#![warn(missing_docs)]

//! # `linksat`
//!
//! A solver for [Numberlink](https://en.wikipedia.org/wiki/Numberlink) puzzles on rectangular grids.
//! Parse a puzzle into a [`Grid`], either from text or with a [`GridBuilder`](builder::GridBuilder), then hand it to [`solve()`] with an [`Oracle`](oracle::Oracle).
//!
//! # Internals
//! The puzzle is expressed as a Boolean satisfiability problem and decided by the oracle, in process with `varisat` or by running any DIMACS solver.
//! Two theories are available, in the spirit of [Matt Zucker's write-up](https://mzucker.github.io/2016/09/02/eating-sat-flavored-crow.html):
//!
//! 1. The occupancy theory assigns each cell exactly one path. A terminal has exactly one same-path neighbor; any other cell has exactly two.
//! This is compact, but forbids a path from running alongside itself, so some solvable puzzles are unsatisfiable under it.
//! 2. The occupancy+direction theory also assigns each non-terminal cell one of six shapes, and requires shapes of neighboring cells to agree.
//!
//! Neither theory rules out a closed loop of cells detached from every terminal.
//! Each model is therefore checked by walking every path from one terminal to the other; any loop found is forbidden by a blocking clause and the oracle is asked again.
//! Under the default [`Strategy::Escalating`](config::Strategy::Escalating), an unsatisfiable occupancy formula is retried once under the direction theory.

pub use builder::GridBuilder;
pub use config::{SolverConfig, Strategy};
pub use encoder::Theory;
pub use error::{GridError, OracleError, SolveError};
pub use grid::Grid;
pub use location::Location;
pub use refine::{solve, Outcome, Report};
pub use solution::Solution;

pub mod builder;
pub mod config;
pub mod cycles;
pub mod encoder;
pub mod error;
pub mod grid;
pub mod location;
pub(crate) mod logic;
pub mod oracle;
pub mod placement;
pub mod refine;
pub mod shape;
pub mod solution;
pub mod variables;
#[cfg(feature = "wasm")]
pub mod wasm;
