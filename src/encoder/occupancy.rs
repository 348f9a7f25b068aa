use itertools::Itertools;
use varisat::Lit;

use crate::encoder::{Encoder, Theory};
use crate::grid::Grid;
use crate::location::Location;
use crate::logic::{exactly_one, implies_any};
use crate::variables::{Proposition, VariableMap};

/// The occupancy theory: every cell holds exactly one path, and every path cell touches exactly as many same-path cells as its role allows.
///
/// # Logical setup
/// Let X(C, p) mean "cell C holds path p".
///
/// A terminal T of path t has X(T, t) and no other X(T, p).
/// Exactly one neighbor N of T has X(N, t), so a path leaves each terminal once and never touches it again.
///
/// Any other cell C has exactly one X(C, p).
/// If X(C, p), exactly two of the neighbors of C hold p as well:
/// - at least two, since every set of all but one neighbor contains some N with X(N, p);
/// - at most two, since no three (or four) neighbors all hold p.
///
/// A loop of cells satisfies all of this without touching any terminal; see [`crate::cycles`].
#[derive(Copy, Clone, Debug, Default)]
pub struct OccupancyEncoder;

impl OccupancyEncoder {
    fn terminus(grid: &Grid, variables: &VariableMap, location: Location, label: usize, clauses: &mut Vec<Vec<Lit>>) {
        let x = |location, path| variables.lit(Proposition::occupancy(location, path));

        for path in grid.paths() {
            clauses.push(vec![if path == label { x(location, path) } else { !x(location, path) }]);
        }

        // neighboring terminals count: their occupancy is fixed true
        clauses.extend(exactly_one(&grid.neighbors(location)
            .into_iter()
            .map(|(_, neighbor)| x(neighbor, label))
            .collect_vec()));
    }

    fn interior(grid: &Grid, variables: &VariableMap, location: Location, clauses: &mut Vec<Vec<Lit>>) {
        let x = |location, path| variables.lit(Proposition::occupancy(location, path));
        let neighbors = grid.neighbors(location);

        clauses.extend(exactly_one(&grid.paths().map(|path| x(location, path)).collect_vec()));

        for path in grid.paths() {
            let here = x(location, path);
            let around = neighbors.iter().map(|(_, neighbor)| x(*neighbor, path)).collect_vec();

            // at least two; with a single neighbor this is the unit clause !X
            for subset in around.iter().copied().combinations(around.len().saturating_sub(1)) {
                clauses.push(implies_any(here, &subset));
            }

            // at most two
            for size in 3..=around.len() {
                for subset in around.iter().copied().combinations(size) {
                    clauses.push(implies_any(here, &subset.into_iter().map(|lit| !lit).collect_vec()));
                }
            }
        }
    }
}

impl Encoder for OccupancyEncoder {
    fn theory(&self) -> Theory {
        Theory::Occupancy
    }

    fn constraints(&self, grid: &Grid, variables: &VariableMap) -> Vec<Vec<Lit>> {
        let mut clauses = Vec::new();

        for location in grid.locations() {
            match grid.label_at(location) {
                Some(label) => Self::terminus(grid, variables, location, label, &mut clauses),
                None => Self::interior(grid, variables, location, &mut clauses),
            }
        }

        clauses
    }
}

#[cfg(test)]
mod tests {
    use varisat::{Lit, Var};

    use crate::encoder::{Encoder, OccupancyEncoder};
    use crate::grid::Grid;
    use crate::location::Location;
    use crate::variables::Proposition;

    fn lits(dimacs: &[isize]) -> Vec<Lit> {
        dimacs.iter().map(|n| Lit::from_dimacs(*n)).collect()
    }

    #[test]
    fn terminal_clauses() {
        // 1 2
        // 1 2
        let grid: Grid = "1,2\n1,2".parse().unwrap();
        let variables = OccupancyEncoder.allocate(&grid);
        let clauses = OccupancyEncoder.constraints(&grid, &variables);

        // all four cells are terminals: two fixing units and an exactly-one over two neighbors each
        assert_eq!(clauses.len(), 4 * (2 + 2));
        assert_eq!(&clauses[..4], &[
            lits(&[1]),
            lits(&[-2]),
            // (1, 0) and (0, 1) holding path 1
            lits(&[5, 3]),
            lits(&[-5, -3]),
        ]);
    }

    #[test]
    fn interior_corner_clauses() {
        // a corner cell has two neighbors, so it needs both of them
        let grid: Grid = ".,1,2\n1,.,.\n2,.,.".parse().unwrap();
        let variables = OccupancyEncoder.allocate(&grid);
        let clauses = OccupancyEncoder.constraints(&grid, &variables);
        let x = |x, y, path| variables.lit(Proposition::occupancy(Location(x, y), path));

        assert_eq!(variables.var(Proposition::occupancy(Location(0, 0), 1)), Var::from_dimacs(1));
        assert_eq!(&clauses[..5], &[
            vec![x(0, 0, 1), x(0, 0, 2)],
            vec![!x(0, 0, 1), !x(0, 0, 2)],
            vec![!x(0, 0, 1), x(0, 1, 1)],
            vec![!x(0, 0, 1), x(1, 0, 1)],
            vec![!x(0, 0, 2), x(0, 1, 2)],
        ]);
    }

    #[test]
    fn interior_center_clauses() {
        let grid: Grid = "1,.,2\n.,.,.\n1,.,2".parse().unwrap();
        let variables = OccupancyEncoder.allocate(&grid);
        let clauses = OccupancyEncoder.constraints(&grid, &variables);
        let center = variables.lit(Proposition::occupancy(Location(1, 1), 1));

        let about_center = clauses.iter()
            .filter(|clause| clause.first() == Some(&!center) && clause.len() > 2)
            .collect::<Vec<_>>();
        // at least two: 4 subsets of three; at most two: 4 triples and the quadruple
        assert_eq!(about_center.len(), 4 + 4 + 1);
        assert!(about_center.iter().take(4).all(|clause| clause.len() == 4 && clause[1..].iter().all(|lit| lit.is_positive())));
        assert!(about_center.iter().skip(4).all(|clause| clause[1..].iter().all(|lit| lit.is_negative())));
        assert_eq!(about_center.last().map(|clause| clause.len()), Some(5));
    }

    #[test]
    fn encoding_is_reproducible() {
        let grid: Grid = "1,.,.\n.,.,1\n2,.,2".parse().unwrap();
        let variables = OccupancyEncoder.allocate(&grid);
        assert_eq!(OccupancyEncoder.constraints(&grid, &variables), OccupancyEncoder.constraints(&grid, &variables));
    }
}
