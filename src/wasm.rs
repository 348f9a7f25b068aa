use wasm_bindgen::prelude::*;

use crate::config::SolverConfig;
use crate::grid::Grid;
use crate::oracle::VarisatOracle;
use crate::refine::solve;

/// Solve a puzzle given in the comma-separated text format with the in-process solver.
///
/// Resolves to the drawn solution, or `undefined` when the puzzle has none. Malformed puzzles and solver failures throw.
#[wasm_bindgen(js_name = solvePuzzle)]
pub fn solve_puzzle(text: &str) -> Result<Option<String>, JsValue> {
    let grid: Grid = text.parse().map_err(to_js)?;
    let (outcome, _) = solve(&grid, VarisatOracle, SolverConfig::default()).map_err(to_js)?;
    Ok(outcome.solution().map(ToString::to_string))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}
