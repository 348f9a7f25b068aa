//! Translating a [`Grid`] into CNF under one of two theories.
//!
//! Both theories share the same outline: allocate a [`VariableMap`], emit the theory's local constraints cell by cell, and prefix any blocking clauses carried over from earlier refinement iterations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use itertools::Itertools;
use strum::{Display, EnumString, VariantArray};
use tracing::debug;
use varisat::Lit;

use crate::cycles::Cycle;
use crate::error::SolveError;
use crate::grid::Grid;
use crate::logic::not_all;
use crate::variables::VariableMap;

pub use direction::DirectionEncoder;
pub use occupancy::OccupancyEncoder;

mod direction;
mod occupancy;

/// The variable and clause scheme used to encode a puzzle.
#[derive(Copy, Clone, Debug, Display, EnumString, Eq, Hash, PartialEq, VariantArray)]
pub enum Theory {
    /// One variable per (cell, path). Small, but cannot express a path that doubles back next to itself.
    #[strum(serialize = "occupancy")]
    Occupancy,
    /// One variable per (cell, path, shape).
    #[strum(serialize = "direction")]
    OccupancyDirection,
}

impl Theory {
    pub fn encoder(&self) -> &'static dyn Encoder {
        match self {
            Self::Occupancy => &OccupancyEncoder,
            Self::OccupancyDirection => &DirectionEncoder,
        }
    }
}

/// A [`Theory`]'s way of turning a grid into a [`Formula`].
pub trait Encoder {
    fn theory(&self) -> Theory;

    /// Enumerate the propositions this theory reasons about.
    fn allocate(&self, grid: &Grid) -> VariableMap {
        let variables = VariableMap::allocate(grid, self.theory());
        debug!(theory = %self.theory(), variables = variables.len(), "allocated variables");
        variables
    }

    /// The theory's own constraints on `grid`, without any blocking clauses.
    fn constraints(&self, grid: &Grid, variables: &VariableMap) -> Vec<Vec<Lit>>;

    /// Build the complete formula: `blocking` clauses first, in the order given, then [`Self::constraints`].
    fn encode(&self, grid: &Grid, variables: &Rc<VariableMap>, blocking: &[Vec<Lit>]) -> Formula {
        let mut clauses = blocking.to_vec();
        clauses.extend(self.constraints(grid, variables));

        let formula = Formula {
            theory: self.theory(),
            variables: Rc::clone(variables),
            clauses,
            num_blocking: blocking.len(),
        };
        debug!(
            theory = %formula.theory,
            variables = formula.num_variables(),
            clauses = formula.num_clauses(),
            blocking = formula.num_blocking,
            "encoded formula"
        );
        formula
    }

    /// Write `formula` to `path` in DIMACS CNF.
    fn save(&self, formula: &Formula, path: &Path) -> Result<(), SolveError> {
        formula.save(path)
    }
}

/// One clause per path-id, each forbidding every cell of `cycle` from holding that path (with the same shape, where the theory has shapes) at once.
pub fn blocking_clauses<'a>(grid: &Grid, variables: &'a VariableMap, cycle: &'a Cycle) -> impl Iterator<Item=Vec<Lit>> + 'a {
    grid.paths().map(move |path| not_all(cycle.cells()
        .iter()
        .map(|proposition| variables.lit(proposition.with_path(path)))))
}

/// A CNF formula together with the mapping that gives its variables meaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    theory: Theory,
    variables: Rc<VariableMap>,
    clauses: Vec<Vec<Lit>>,
    num_blocking: usize,
}

impl Formula {
    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// Every variable the theory allocated counts, whether or not a clause mentions it.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// How many of the leading clauses were carried over as blocking clauses.
    pub fn num_blocking(&self) -> usize {
        self.num_blocking
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Write in DIMACS CNF: a `p cnf` header, then one zero-terminated clause per line.
    pub fn write_dimacs<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "p cnf {} {}", self.num_variables(), self.num_clauses())?;
        for clause in &self.clauses {
            let lits = clause.iter().map(|lit| lit.to_dimacs()).join(" ");
            if lits.is_empty() {
                writeln!(writer, "0")?;
            } else {
                writeln!(writer, "{lits} 0")?;
            }
        }
        writer.flush()
    }

    pub fn save(&self, path: &Path) -> Result<(), SolveError> {
        let save_error = |source| SolveError::Save { path: path.display().to_string(), source };

        let file = File::create(path).map_err(save_error)?;
        self.write_dimacs(BufWriter::new(file)).map_err(save_error)
    }
}
