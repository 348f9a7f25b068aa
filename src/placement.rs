use ndarray::Array2;
use tracing::trace;

use crate::encoder::Theory;
use crate::error::SolveError;
use crate::grid::{Grid, PathId};
use crate::location::Location;
use crate::oracle::Assignment;
use crate::shape::{PathShape, SquareStep};
use crate::variables::VariableMap;

/// What a model says about one cell.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Occupant {
    pub path: PathId,
    /// Always [`None`] under the occupancy theory and at terminals.
    pub shape: Option<PathShape>,
}

impl Occupant {
    fn opens_toward(&self, direction: SquareStep) -> bool {
        self.shape.map_or(true, |shape| shape.has_exit(direction))
    }
}

/// A model read back onto the grid: one [`Occupant`] per cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    theory: Theory,
    occupants: Array2<Occupant>,
}

impl Placement {
    /// Decode `assignment` against the propositions of `variables`.
    ///
    /// Every cell must have exactly one true proposition, and a terminal's must name its own path.
    /// Anything else means the model contradicts the encoding that produced it.
    pub fn decode(grid: &Grid, variables: &VariableMap, assignment: &Assignment) -> Result<Self, SolveError> {
        let mut occupants = Vec::with_capacity(grid.num_cells());

        for location in grid.locations() {
            let mut held = variables.at(location).filter(|(_, var)| assignment.value(*var));
            let inconsistent = |reason: String| SolveError::InconsistentModel { location, reason };

            let Some((proposition, _)) = held.next() else {
                return Err(inconsistent("no path holds this cell".to_string()));
            };
            if let Some((other, _)) = held.next() {
                return Err(inconsistent(format!("held by both {proposition:?} and {other:?}")));
            }
            if let Some(label) = grid.label_at(location).filter(|label| *label != proposition.path) {
                return Err(inconsistent(format!("terminal of path {label} is held by path {}", proposition.path)));
            }

            occupants.push(Occupant { path: proposition.path, shape: proposition.shape });
        }

        let occupants = Array2::from_shape_vec((grid.height(), grid.width()), occupants)
            .map_err(|err| SolveError::InconsistentModel { location: Location(0, 0), reason: err.to_string() })?;
        trace!(theory = %variables.theory(), "decoded placement");

        Ok(Self {
            theory: variables.theory(),
            occupants,
        })
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn occupant(&self, location: Location) -> Occupant {
        self.occupants[location.as_index()]
    }

    pub fn path_at(&self, location: Location) -> PathId {
        self.occupant(location).path
    }

    /// Whether the path through `from` continues into its neighbor `to`, which lies in `direction`.
    ///
    /// Under the occupancy theory, sharing a path is enough. Under the direction theory both cells must also open toward each other; a terminal opens every way.
    pub fn links(&self, from: Location, direction: SquareStep, to: Location) -> bool {
        let (a, b) = (self.occupant(from), self.occupant(to));
        if a.path != b.path {
            return false;
        }

        match self.theory {
            Theory::Occupancy => true,
            Theory::OccupancyDirection => a.opens_toward(direction) && b.opens_toward(direction.invert()),
        }
    }

    /// The path-id of every cell, row by row.
    pub fn path_rows(&self) -> Vec<Vec<PathId>> {
        self.occupants.rows()
            .into_iter()
            .map(|row| row.iter().map(|occupant| occupant.path).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::encoder::Theory;
    use crate::error::SolveError;
    use crate::grid::Grid;
    use crate::location::Location;
    use crate::oracle::Assignment;
    use crate::placement::Placement;
    use crate::shape::{PathShape, SquareStep};
    use crate::variables::{Proposition, VariableMap};

    fn assignment(variables: &VariableMap, propositions: &[Proposition]) -> Assignment {
        Assignment::from_lits(propositions.iter().map(|p| variables.lit(*p)))
    }

    #[test]
    fn decode_occupancy() {
        let grid: Grid = "1,.,1\n2,.,2".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::Occupancy);
        let model = assignment(&variables, &[
            Proposition::occupancy(Location(0, 0), 1),
            Proposition::occupancy(Location(1, 0), 1),
            Proposition::occupancy(Location(2, 0), 1),
            Proposition::occupancy(Location(0, 1), 2),
            Proposition::occupancy(Location(1, 1), 2),
            Proposition::occupancy(Location(2, 1), 2),
        ]);

        let placement = Placement::decode(&grid, &variables, &model).unwrap();
        assert_eq!(placement.path_rows(), vec![vec![1, 1, 1], vec![2, 2, 2]]);
        assert!(placement.links(Location(0, 0), SquareStep::Right, Location(1, 0)));
        assert!(!placement.links(Location(1, 0), SquareStep::Down, Location(1, 1)));
    }

    #[test]
    fn direction_links_need_matching_exits() {
        let grid: Grid = "1,.,1\n2,.,2".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::OccupancyDirection);
        let model = assignment(&variables, &[
            Proposition::occupancy(Location(0, 0), 1),
            Proposition::shaped(Location(1, 0), 1, PathShape::Horizontal),
            Proposition::occupancy(Location(2, 0), 1),
            Proposition::occupancy(Location(0, 1), 2),
            Proposition::shaped(Location(1, 1), 2, PathShape::UpLeft),
            Proposition::occupancy(Location(2, 1), 2),
        ]);

        let placement = Placement::decode(&grid, &variables, &model).unwrap();
        assert!(placement.links(Location(1, 0), SquareStep::Left, Location(0, 0)));
        assert!(placement.links(Location(1, 1), SquareStep::Left, Location(0, 1)));
        assert!(!placement.links(Location(1, 1), SquareStep::Right, Location(2, 1)));
    }

    #[test]
    fn direction_links_adjacent_terminals() {
        let grid: Grid = "1,1\n2,2".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::OccupancyDirection);
        let model = assignment(&variables, &[
            Proposition::occupancy(Location(0, 0), 1),
            Proposition::occupancy(Location(1, 0), 1),
            Proposition::occupancy(Location(0, 1), 2),
            Proposition::occupancy(Location(1, 1), 2),
        ]);

        let placement = Placement::decode(&grid, &variables, &model).unwrap();
        assert!(placement.links(Location(0, 0), SquareStep::Right, Location(1, 0)));
        assert!(placement.links(Location(1, 1), SquareStep::Left, Location(0, 1)));
        assert!(!placement.links(Location(0, 0), SquareStep::Down, Location(0, 1)));
    }

    #[test]
    fn reject_inconsistent_models() {
        let grid: Grid = "1,.,1\n2,.,2".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::Occupancy);
        let mut held = vec![
            Proposition::occupancy(Location(0, 0), 1),
            Proposition::occupancy(Location(2, 0), 1),
            Proposition::occupancy(Location(0, 1), 2),
            Proposition::occupancy(Location(1, 1), 2),
            Proposition::occupancy(Location(2, 1), 2),
        ];

        let result = Placement::decode(&grid, &variables, &assignment(&variables, &held));
        assert!(matches!(result, Err(SolveError::InconsistentModel { location: Location(1, 0), .. })));

        held.push(Proposition::occupancy(Location(1, 0), 1));
        held.push(Proposition::occupancy(Location(1, 0), 2));
        let result = Placement::decode(&grid, &variables, &assignment(&variables, &held));
        assert!(matches!(result, Err(SolveError::InconsistentModel { location: Location(1, 0), .. })));

        let swapped = held.iter()
            .filter(|p| p.location != Location(1, 0) && p.location != Location(0, 0))
            .copied()
            .chain([Proposition::occupancy(Location(1, 0), 1), Proposition::occupancy(Location(0, 0), 2)])
            .collect::<Vec<_>>();
        let result = Placement::decode(&grid, &variables, &assignment(&variables, &swapped));
        assert!(matches!(result, Err(SolveError::InconsistentModel { location: Location(0, 0), .. })));
    }
}
