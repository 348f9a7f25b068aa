use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;

use crate::cycles::Walk;
use crate::encoder::Theory;
use crate::error::SolveError;
use crate::grid::{Grid, PathId};
use crate::location::Location;
use crate::placement::Placement;
use crate::shape::PathShape;

/// What is drawn in one cell of a solved puzzle.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Glyph {
    /// A terminal, drawn as its path-id.
    Terminus(PathId),
    /// A cell some path passes through, drawn as its shape.
    Path { path: PathId, shape: PathShape },
}

impl Glyph {
    pub fn path(&self) -> PathId {
        match self {
            Self::Terminus(path) | Self::Path { path, .. } => *path,
        }
    }
}

impl Display for Glyph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminus(path) => write!(f, "{path}"),
            Self::Path { shape, .. } => write!(f, "{}", shape.glyph()),
        }
    }
}

/// A solved puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    theory: Theory,
    glyphs: Array2<Glyph>,
    // route of path p at index p - 1
    routes: Vec<Vec<Location>>,
}

impl Solution {
    /// Draw a cycle-free placement.
    ///
    /// Under the direction theory, each cell's shape is read from the model.
    /// Under the occupancy theory it is inferred from the two neighbors holding the same path, which must exist and be unique.
    pub fn reconstruct(grid: &Grid, placement: &Placement, walks: &[Walk]) -> Result<Self, SolveError> {
        let mut glyphs = Vec::with_capacity(grid.num_cells());

        for location in grid.locations() {
            if let Some(label) = grid.label_at(location) {
                glyphs.push(Glyph::Terminus(label));
                continue;
            }

            let occupant = placement.occupant(location);
            let shape = match occupant.shape {
                Some(shape) => Some(shape),
                None => PathShape::from_neighbor_directions(&grid.neighbors(location)
                    .into_iter()
                    .filter(|(_, neighbor)| placement.path_at(*neighbor) == occupant.path)
                    .map(|(direction, _)| direction)
                    .collect_vec()),
            };

            let Some(shape) = shape else {
                return Err(SolveError::InconsistentModel {
                    location,
                    reason: format!("path {} does not pass through in any one shape", occupant.path),
                });
            };
            glyphs.push(Glyph::Path { path: occupant.path, shape });
        }

        let glyphs = Array2::from_shape_vec((grid.height(), grid.width()), glyphs)
            .map_err(|err| SolveError::InconsistentModel { location: Location(0, 0), reason: err.to_string() })?;

        Ok(Self {
            theory: placement.theory(),
            glyphs,
            routes: walks.iter().map(|walk| walk.route().to_vec()).collect(),
        })
    }

    /// The theory whose model this solution was drawn from.
    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn glyph(&self, location: Location) -> Option<Glyph> {
        self.glyphs.get(location.as_index()).copied()
    }

    pub fn glyphs(&self) -> &Array2<Glyph> {
        &self.glyphs
    }

    /// The cells of `path` in order from its first terminal to its second.
    pub fn route(&self, path: PathId) -> Option<&[Location]> {
        path.checked_sub(1)
            .and_then(|index| self.routes.get(index))
            .map(Vec::as_slice)
    }

    /// Each cell rendered on its own, row by row.
    pub fn glyph_rows(&self) -> Vec<Vec<String>> {
        self.glyphs.rows()
            .into_iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    /// The path-id of each cell, row by row.
    pub fn numbered_rows(&self) -> Vec<Vec<PathId>> {
        self.glyphs.rows()
            .into_iter()
            .map(|row| row.iter().map(Glyph::path).collect())
            .collect()
    }
}

impl Display for Solution {
    /// One line per row; each column is right-aligned to its widest cell.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rows = self.glyph_rows();
        let widths = self.glyphs.columns()
            .into_iter()
            .map(|column| column.iter().map(|glyph| glyph.to_string().chars().count()).max().unwrap_or(0))
            .collect_vec();

        for row in rows {
            for (cell, width) in row.iter().zip(widths.iter().copied()) {
                write!(f, "{cell:>width$}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
