use std::num::NonZero;
use std::path::{Path, PathBuf};

use strum::{Display, EnumString, VariantArray};

use crate::encoder::Theory;

/// Which theories a run may use, and in what order.
#[derive(Copy, Clone, Debug, Default, Display, EnumString, Eq, Hash, PartialEq, VariantArray)]
pub enum Strategy {
    /// The occupancy theory only.
    #[strum(serialize = "occupancy")]
    Occupancy,
    /// The occupancy+direction theory only.
    #[strum(serialize = "direction")]
    OccupancyDirection,
    /// The occupancy theory, then the occupancy+direction theory once if the first is unsatisfiable.
    #[default]
    #[strum(serialize = "escalating")]
    Escalating,
}

impl Strategy {
    pub fn first_theory(&self) -> Theory {
        match self {
            Self::Occupancy | Self::Escalating => Theory::Occupancy,
            Self::OccupancyDirection => Theory::OccupancyDirection,
        }
    }

    /// Whether an unsatisfiable occupancy formula is retried under the direction theory.
    pub fn escalates(&self) -> bool {
        matches!(self, Self::Escalating)
    }
}

/// Settings for one solving run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    strategy: Strategy,
    max_iterations: Option<NonZero<usize>>,
    dump_dir: Option<PathBuf>,
    name: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_iterations: None,
            dump_dir: None,
            name: "instance".to_string(),
        }
    }
}

impl SolverConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Fail with [`SolveError::IterationLimit`](crate::error::SolveError::IterationLimit) instead of making more than `max` oracle queries.
    pub fn with_max_iterations(mut self, max: Option<NonZero<usize>>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Save every formula queried, in DIMACS form, under `dir`.
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// The instance name used in dumped file names.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn max_iterations(&self) -> Option<NonZero<usize>> {
        self.max_iterations
    }

    pub fn dump_dir(&self) -> Option<&Path> {
        self.dump_dir.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the formula of the given 1-based query is dumped, if dumping is enabled.
    pub fn dump_path(&self, theory: Theory, iteration: usize) -> Option<PathBuf> {
        self.dump_dir.as_ref().map(|dir| dir.join(format!("{theory}-{}-{iteration}.cnf", self.name)))
    }
}
