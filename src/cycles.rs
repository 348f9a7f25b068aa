//! Finding closed loops in a model.
//!
//! The local rules of either theory are also satisfied by a loop of cells that never touches a terminal.
//! Such loops are found by walking every path from one terminal to the other; whatever no walk visits is left over.

use std::collections::HashSet;

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;
use tracing::{debug, warn};

use crate::grid::{Grid, PathId};
use crate::location::Location;
use crate::placement::Placement;
use crate::variables::Proposition;

/// A maximal group of connected leftover cells, with the propositions the model made true there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cycle {
    cells: Vec<Proposition>,
}

impl Cycle {
    pub fn new(mut cells: Vec<Proposition>) -> Self {
        cells.sort_by_key(|p| p.location.as_index());
        Self { cells }
    }

    pub fn cells(&self) -> &[Proposition] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn path(&self) -> Option<PathId> {
        self.cells.first().map(|p| p.path)
    }
}

/// The outcome of following one path from its first terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Walk {
    /// The other terminal was reached; the route runs from terminal to terminal.
    ReachedTerminus(Vec<Location>),
    /// The walk ran out of unvisited linked cells, or of steps, before reaching the other terminal.
    Exhausted(Vec<Location>),
}

impl Walk {
    pub fn route(&self) -> &[Location] {
        match self {
            Self::ReachedTerminus(route) | Self::Exhausted(route) => route,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::ReachedTerminus(_))
    }
}

/// Everything found in one model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    /// Walk of path `p` at index `p - 1`.
    pub walks: Vec<Walk>,
    pub cycles: Vec<Cycle>,
}

impl Detection {
    /// Every path reaches its other terminal and no cell is left over.
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.walks.iter().all(Walk::is_complete)
    }

    pub fn leftover_cells(&self) -> usize {
        self.cycles.iter().map(Cycle::len).sum()
    }
}

/// Link every pair of neighboring cells the model connects.
pub fn connection_graph(grid: &Grid, placement: &Placement) -> UnGraphMap<Location, ()> {
    let mut graph = UnGraphMap::with_capacity(grid.num_cells(), 2 * grid.num_cells());

    for location in grid.locations() {
        graph.add_node(location);
        for (direction, neighbor) in grid.neighbors(location) {
            // each pair once, from its upper or left cell
            if neighbor.as_index() > location.as_index() && placement.links(location, direction, neighbor) {
                graph.add_edge(location, neighbor, ());
            }
        }
    }

    graph
}

/// Follow `path` from its first terminal toward its second.
///
/// At most one step per cell of the grid is taken, and no cell is visited twice, so the walk always ends.
pub fn walk(grid: &Grid, graph: &UnGraphMap<Location, ()>, path: PathId) -> Walk {
    let Some((start, goal)) = grid.termini(path) else {
        return Walk::Exhausted(Vec::new());
    };

    let mut visited = HashSet::from([start]);
    let mut route = vec![start];
    let mut current = start;

    for _ in 0..grid.num_cells() {
        if current == goal {
            return Walk::ReachedTerminus(route);
        }

        let Some(next) = graph.neighbors(current)
            .filter(|neighbor| !visited.contains(neighbor))
            .min_by_key(|neighbor| neighbor.as_index()) else {
            break;
        };

        visited.insert(next);
        route.push(next);
        current = next;
    }

    if current == goal {
        Walk::ReachedTerminus(route)
    } else {
        Walk::Exhausted(route)
    }
}

/// Walk every path, then group the cells no complete walk visited into [`Cycle`]s.
///
/// The non-terminal cells of an exhausted walk are left over too, so that they can be blocked like any loop.
pub fn detect(grid: &Grid, placement: &Placement) -> Detection {
    let graph = connection_graph(grid, placement);
    let walks = grid.paths().map(|path| walk(grid, &graph, path)).collect_vec();

    let mut covered = HashSet::new();
    for (path, walk) in grid.paths().zip(&walks) {
        match walk {
            Walk::ReachedTerminus(route) => covered.extend(route.iter().copied()),
            Walk::Exhausted(route) => warn!(path, steps = route.len(), "walk did not reach the other terminal"),
        }
    }

    let leftover = grid.locations()
        .filter(|location| !grid.is_terminus(*location) && !covered.contains(location))
        .collect_vec();

    // components are taken over links between leftover cells only
    let mut remainder = UnGraphMap::<Location, ()>::new();
    for location in &leftover {
        remainder.add_node(*location);
    }
    for (a, b, _) in graph.all_edges() {
        if remainder.contains_node(a) && remainder.contains_node(b) {
            remainder.add_edge(a, b, ());
        }
    }

    let mut seen = HashSet::new();
    let mut cycles = Vec::new();
    for location in leftover {
        if seen.contains(&location) {
            continue;
        }

        let mut component = Vec::new();
        let mut bfs = Bfs::new(&remainder, location);
        while let Some(cell) = bfs.next(&remainder) {
            seen.insert(cell);
            let occupant = placement.occupant(cell);
            component.push(Proposition { location: cell, path: occupant.path, shape: occupant.shape });
        }
        cycles.push(Cycle::new(component));
    }

    debug!(
        cycles = cycles.len(),
        leftover = cycles.iter().map(Cycle::len).sum::<usize>(),
        "cycle detection finished"
    );

    Detection { walks, cycles }
}

#[cfg(test)]
mod tests {
    use crate::cycles::{detect, Walk};
    use crate::encoder::Theory;
    use crate::grid::Grid;
    use crate::location::Location;
    use crate::oracle::Assignment;
    use crate::placement::Placement;
    use crate::shape::PathShape;
    use crate::variables::{Proposition, VariableMap};

    /// Decode an occupancy model given as one row of path-id digits per line.
    fn occupancy_placement(grid: &Grid, rows: &[&str]) -> Placement {
        let variables = VariableMap::allocate(grid, Theory::Occupancy);
        let model = Assignment::from_lits(rows.iter()
            .enumerate()
            .flat_map(|(y, row)| row.chars().enumerate().map(move |(x, c)| (Location(x, y), c)))
            .map(|(location, c)| variables.lit(Proposition::occupancy(location, c.to_digit(10).unwrap() as usize))));
        Placement::decode(grid, &variables, &model).unwrap()
    }

    #[test]
    fn clean_model() {
        let grid: Grid = "1,.,.,1\n2,.,.,2".parse().unwrap();
        let placement = occupancy_placement(&grid, &["1111", "2222"]);
        let detection = detect(&grid, &placement);

        assert!(detection.is_clean());
        assert_eq!(detection.walks[0], Walk::ReachedTerminus(vec![Location(0, 0), Location(1, 0), Location(2, 0), Location(3, 0)]));
        assert_eq!(detection.leftover_cells(), 0);
    }

    #[test]
    fn square_loop_is_left_over() {
        let grid: Grid = "1,.,.,1\n2,.,.,2\n3,.,.,4\n.,.,.,.\n.,.,3,4".parse().unwrap();
        let placement = occupancy_placement(&grid, &["1111", "2222", "3114", "3114", "3334"]);
        let detection = detect(&grid, &placement);

        assert!(!detection.is_clean());
        assert!(detection.walks.iter().all(Walk::is_complete));
        assert_eq!(detection.cycles.len(), 1);

        let cycle = &detection.cycles[0];
        assert_eq!(cycle.path(), Some(1));
        assert_eq!(cycle.cells().iter().map(|p| p.location).collect::<Vec<_>>(), vec![
            Location(1, 2), Location(2, 2), Location(1, 3), Location(2, 3),
        ]);
        assert!(cycle.cells().iter().all(|p| p.shape.is_none()));
    }

    #[test]
    fn shaped_loop_keeps_its_shapes() {
        // 1 ─ ─ 1
        // 2 ┌ ┐ 2
        // │ └ ┘ │
        // └ ─ ─ ┘
        let grid: Grid = "1,.,.,1\n2,.,.,2\n.,.,.,.\n.,.,.,.".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::OccupancyDirection);
        let shaped = [
            (1, 0, 1, PathShape::Horizontal), (2, 0, 1, PathShape::Horizontal),
            (1, 1, 2, PathShape::DownRight), (2, 1, 2, PathShape::DownLeft),
            (0, 2, 2, PathShape::Vertical), (1, 2, 2, PathShape::UpRight), (2, 2, 2, PathShape::UpLeft), (3, 2, 2, PathShape::Vertical),
            (0, 3, 2, PathShape::UpRight), (1, 3, 2, PathShape::Horizontal), (2, 3, 2, PathShape::Horizontal), (3, 3, 2, PathShape::UpLeft),
        ];
        let model = Assignment::from_lits(shaped.iter()
            .map(|(x, y, path, shape)| Proposition::shaped(Location(*x, *y), *path, *shape))
            .chain([
                Proposition::occupancy(Location(0, 0), 1),
                Proposition::occupancy(Location(3, 0), 1),
                Proposition::occupancy(Location(0, 1), 2),
                Proposition::occupancy(Location(3, 1), 2),
            ])
            .map(|p| variables.lit(p)));
        let placement = Placement::decode(&grid, &variables, &model).unwrap();
        let detection = detect(&grid, &placement);

        // path 2 runs down the sides and along the bottom; the inner square is a loop
        assert!(detection.walks.iter().all(Walk::is_complete));
        assert_eq!(detection.cycles.len(), 1);
        assert_eq!(detection.cycles[0].cells(), &[
            Proposition::shaped(Location(1, 1), 2, PathShape::DownRight),
            Proposition::shaped(Location(2, 1), 2, PathShape::DownLeft),
            Proposition::shaped(Location(1, 2), 2, PathShape::UpRight),
            Proposition::shaped(Location(2, 2), 2, PathShape::UpLeft),
        ]);
    }

    #[test]
    fn broken_walk_is_exhausted() {
        // path 2 never connects its terminals, so every non-terminal cell it holds is left over
        let grid: Grid = "1,.,1\n2,.,2\n.,.,.".parse().unwrap();
        let variables = VariableMap::allocate(&grid, Theory::OccupancyDirection);
        let model = Assignment::from_lits([
            Proposition::occupancy(Location(0, 0), 1),
            Proposition::shaped(Location(1, 0), 1, PathShape::Horizontal),
            Proposition::occupancy(Location(2, 0), 1),
            Proposition::occupancy(Location(0, 1), 2),
            Proposition::shaped(Location(1, 1), 2, PathShape::DownLeft),
            Proposition::occupancy(Location(2, 1), 2),
            Proposition::shaped(Location(0, 2), 2, PathShape::UpRight),
            Proposition::shaped(Location(1, 2), 2, PathShape::UpLeft),
            Proposition::shaped(Location(2, 2), 2, PathShape::Horizontal),
        ].map(|p| variables.lit(p)));
        let placement = Placement::decode(&grid, &variables, &model).unwrap();
        let detection = detect(&grid, &placement);

        assert!(detection.walks[0].is_complete());
        assert!(matches!(&detection.walks[1], Walk::Exhausted(route) if route.len() == 4));
        assert!(!detection.is_clean());
        assert_eq!(detection.leftover_cells(), 4);
    }
}
