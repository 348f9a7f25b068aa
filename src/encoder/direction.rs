use itertools::Itertools;
use strum::VariantArray;
use varisat::Lit;

use crate::encoder::{Encoder, Theory};
use crate::grid::{Grid, PathId};
use crate::location::Location;
use crate::logic::{exactly_one, implies_any, implies_at_most_one};
use crate::shape::{PathShape, SquareStep};
use crate::variables::{Proposition, VariableMap};

/// The occupancy+direction theory: every non-terminal cell holds exactly one (path, shape) pair, and each shape must be met from both of its exits.
///
/// # Logical setup
/// Let S(C, p, s) mean "cell C holds path p, passing through in shape s", and X(T, p) mean "terminal T holds path p".
///
/// A terminal T of path t has X(T, t) and no other X(T, p).
/// Exactly one neighbor N of T links to it: either N is the other terminal of t, or S(N, t, s) for a shape s opening back toward T.
/// No other path may hold such a shape at N.
///
/// Any other cell C has exactly one S(C, p, s). Each exit of s leads to one side of C.
/// If S(C, p, s), each side holds exactly one matching proposition: a same-path shape opening back toward C, or a terminal of p.
/// A shape with an exit off the board, or into a terminal of another path, is impossible.
///
/// Because the two sides are chosen by shape and not by axis, a path may run alongside itself, which the occupancy theory forbids.
#[derive(Copy, Clone, Debug, Default)]
pub struct DirectionEncoder;

impl DirectionEncoder {
    /// The propositions that would connect a cell to `neighbor`, reached by stepping `direction`, on `path`.
    fn side(grid: &Grid, variables: &VariableMap, neighbor: Location, direction: SquareStep, path: PathId) -> Vec<Lit> {
        match grid.label_at(neighbor) {
            Some(label) if label == path => vec![variables.lit(Proposition::occupancy(neighbor, path))],
            Some(_) => Vec::new(),
            None => PathShape::opening_toward(direction.invert())
                .map(|shape| variables.lit(Proposition::shaped(neighbor, path, shape)))
                .collect_vec(),
        }
    }

    fn terminus(grid: &Grid, variables: &VariableMap, location: Location, label: PathId, clauses: &mut Vec<Vec<Lit>>) {
        for path in grid.paths() {
            let x = variables.lit(Proposition::occupancy(location, path));
            clauses.push(vec![if path == label { x } else { !x }]);
        }

        // an adjacent terminal of the same path links directly; one of another path never does
        let candidates = grid.neighbors(location)
            .into_iter()
            .flat_map(|(direction, neighbor)| match grid.label_at(neighbor) {
                Some(other) if other == label => vec![Proposition::occupancy(neighbor, label)],
                Some(_) => Vec::new(),
                None => PathShape::opening_toward(direction.invert())
                    .map(|shape| Proposition::shaped(neighbor, label, shape))
                    .collect_vec(),
            })
            .collect_vec();

        clauses.extend(exactly_one(&candidates.iter().map(|p| variables.lit(*p)).collect_vec()));

        for candidate in candidates.into_iter().filter(|candidate| candidate.shape.is_some()) {
            for path in grid.paths().filter(|path| *path != label) {
                clauses.push(vec![!variables.lit(candidate.with_path(path))]);
            }
        }
    }

    fn interior(grid: &Grid, variables: &VariableMap, location: Location, clauses: &mut Vec<Vec<Lit>>) {
        clauses.extend(exactly_one(&variables.at(location)
            .map(|(_, var)| var.positive())
            .collect_vec()));

        for path in grid.paths() {
            for shape in PathShape::VARIANTS {
                let here = variables.lit(Proposition::shaped(location, path, *shape));

                let sides = SquareStep::VARIANTS.iter()
                    .filter(|direction| shape.has_exit(**direction))
                    .map(|direction| direction.attempt_from(location, grid.dims())
                        .map(|neighbor| Self::side(grid, variables, neighbor, *direction, path))
                        .unwrap_or_default())
                    .collect_vec();

                if sides.iter().any(Vec::is_empty) {
                    clauses.push(vec![!here]);
                    continue;
                }

                for side in sides {
                    clauses.push(implies_any(here, &side));
                    clauses.extend(implies_at_most_one(here, &side));
                }
            }
        }
    }
}

impl Encoder for DirectionEncoder {
    fn theory(&self) -> Theory {
        Theory::OccupancyDirection
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
