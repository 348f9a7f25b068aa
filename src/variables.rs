use std::collections::HashMap;

use strum::VariantArray;
use varisat::{Lit, Var};

use crate::encoder::Theory;
use crate::grid::{Grid, PathId};
use crate::location::Location;
use crate::shape::PathShape;

/// The statement "the cell at `location` belongs to `path`", optionally refined by the shape in which the path passes through it.
///
/// A `shape` of `None` is the no-shape proposition: the only kind the occupancy theory uses, and the kind the direction theory uses for terminal cells.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Proposition {
    pub location: Location,
    pub path: PathId,
    pub shape: Option<PathShape>,
}

impl Proposition {
    pub fn occupancy(location: Location, path: PathId) -> Self {
        Self { location, path, shape: None }
    }

    pub fn shaped(location: Location, path: PathId, shape: PathShape) -> Self {
        Self { location, path, shape: Some(shape) }
    }

    /// The same cell and shape, claimed by another path.
    pub fn with_path(self, path: PathId) -> Self {
        Self { path, ..self }
    }
}

/// The one-to-one mapping between [`Proposition`]s and SAT variables for one [`Theory`] on one [`Grid`].
///
/// Variables are numbered consecutively from DIMACS index 1 in a fixed order: row-major cells, then path-ids ascending, then shapes in declaration order.
/// The mapping is immutable once allocated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableMap {
    theory: Theory,
    indices: HashMap<Proposition, Var>,
    // position i holds the proposition of Var::from_index(i)
    propositions: Vec<Proposition>,
}

impl VariableMap {
    /// Enumerate every proposition `theory` needs on `grid` exactly once.
    pub fn allocate(grid: &Grid, theory: Theory) -> Self {
        let mut propositions = Vec::with_capacity(grid.num_cells() * grid.num_paths() * match theory {
            Theory::Occupancy => 1,
            Theory::OccupancyDirection => PathShape::VARIANTS.len(),
        });

        for location in grid.locations() {
            for path in grid.paths() {
                match theory {
                    Theory::Occupancy => propositions.push(Proposition::occupancy(location, path)),
                    // terminals have a fixed, known placement and no shape
                    Theory::OccupancyDirection if grid.is_terminus(location) => propositions.push(Proposition::occupancy(location, path)),
                    Theory::OccupancyDirection => propositions.extend(PathShape::VARIANTS.iter()
                        .map(|shape| Proposition::shaped(location, path, *shape))),
                }
            }
        }

        let indices = propositions.iter()
            .enumerate()
            .map(|(index, proposition)| (*proposition, Var::from_index(index)))
            .collect();

        Self {
            theory,
            indices,
            propositions,
        }
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn len(&self) -> usize {
        self.propositions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.propositions.is_empty()
    }

    pub fn get(&self, proposition: Proposition) -> Option<Var> {
        self.indices.get(&proposition).copied()
    }

    /// The variable of a proposition this map allocated.
    ///
    /// # Panics
    /// If `proposition` was never allocated, which indicates an encoder asking for a proposition outside its own theory.
    pub fn var(&self, proposition: Proposition) -> Var {
        self.indices[&proposition]
    }

    /// Shorthand for the positive literal of [`Self::var`].
    pub fn lit(&self, proposition: Proposition) -> Lit {
        self.var(proposition).positive()
    }

    pub fn proposition(&self, var: Var) -> Option<Proposition> {
        self.propositions.get(var.index()).copied()
    }

    /// All propositions about `location`, in allocation order.
    pub fn at(&self, location: Location) -> impl Iterator<Item=(Proposition, Var)> + '_ {
        // cells are allocated in contiguous, row-major runs
        let start = self.propositions.partition_point(|p| p.location.as_index() < location.as_index());
        self.propositions[start..].iter()
            .take_while(move |p| p.location == location)
            .map(|p| (*p, self.indices[p]))
    }

    /// Every proposition with its variable, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item=(Proposition, Var)> + '_ {
        self.propositions.iter()
            .enumerate()
            .map(|(index, p)| (*p, Var::from_index(index)))
    }
}
