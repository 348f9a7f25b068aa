use itertools::Itertools;
use strum::VariantArray;
use unordered_pair::UnorderedPair;

use crate::location::{Dimension, Location};

/// A single step between orthogonally adjacent cells of a rectangular grid.
///
/// The variant order is the order in which neighbors are visited everywhere in this crate, which keeps generated formulas reproducible.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
pub enum SquareStep {
    /// Toward row 0.
    Up,
    /// Toward the last row.
    Down,
    /// Toward column 0.
    Left,
    /// Toward the last column.
    Right,
}

impl SquareStep {
    /// Attempt the step from `location` in the direction specified by `self`, returning [`None`] if it would leave a grid of `dims`.
    pub fn attempt_from(&self, location: Location, dims: (Dimension, Dimension)) -> Option<Location> {
        let stepped = match self {
            Self::Up => location.offset_by((0, -1)),
            Self::Down => location.offset_by((0, 1)),
            Self::Left => location.offset_by((-1, 0)),
            Self::Right => location.offset_by((1, 0)),
        };

        stepped.within(dims).then_some(stepped)
    }

    /// The step leading back to where `self` came from.
    pub fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Determine the direction from `a` to `b`, if they are orthogonally adjacent.
    pub fn direction_to(a: Location, b: Location) -> Option<Self> {
        Self::VARIANTS.iter()
            .find(|dir| a.offset_by(dir.delta()) == b)
            .copied()
    }

    fn delta(&self) -> (isize, isize) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// One of the six ways a path can pass through a cell, i.e. an unordered pair of distinct [`SquareStep`]s.
///
/// Variants are declared in the numbering used by the direction theory, `1..=6`.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
pub enum PathShape {
    /// `│`
    Vertical,
    /// `─`
    Horizontal,
    /// `┘`
    UpLeft,
    /// `└`
    UpRight,
    /// `┐`
    DownLeft,
    /// `┌`
    DownRight,
}

impl PathShape {
    /// The two directions in which a path leaves a cell of this shape.
    pub fn exits(&self) -> UnorderedPair<SquareStep> {
        use SquareStep::*;

        UnorderedPair::from(match self {
            Self::Vertical => (Up, Down),
            Self::Horizontal => (Left, Right),
            Self::UpLeft => (Up, Left),
            Self::UpRight => (Up, Right),
            Self::DownLeft => (Down, Left),
            Self::DownRight => (Down, Right),
        })
    }

    pub fn has_exit(&self, direction: SquareStep) -> bool {
        let UnorderedPair(a, b) = self.exits();
        a == direction || b == direction
    }

    /// The exit other than `entry`, or [`None`] if `entry` is not an exit of this shape.
    pub fn other_exit(&self, entry: SquareStep) -> Option<SquareStep> {
        let UnorderedPair(a, b) = self.exits();
        if entry == a {
            Some(b)
        } else if entry == b {
            Some(a)
        } else {
            None
        }
    }

    /// The shape whose exits are exactly `exits`. Fails for a pair naming the same direction twice.
    pub fn from_exits(exits: UnorderedPair<SquareStep>) -> Option<Self> {
        Self::VARIANTS.iter()
            .find(|shape| shape.exits() == exits)
            .copied()
    }

    /// Infer a shape from the set of directions in which same-path neighbors were found.
    ///
    /// Returns [`None`] unless exactly two directions are given.
    pub fn from_neighbor_directions(directions: &[SquareStep]) -> Option<Self> {
        match directions.iter().unique().collect_vec().as_slice() {
            [a, b] => Self::from_exits(UnorderedPair(**a, **b)),
            _ => None,
        }
    }

    /// Shapes with an exit toward `direction`, in declaration order.
    pub fn opening_toward(direction: SquareStep) -> impl Iterator<Item=Self> {
        Self::VARIANTS.iter()
            .copied()
            .filter(move |shape| shape.has_exit(direction))
    }

    pub fn glyph(&self) -> char {
        match self {
            Self::Vertical => '│',
            Self::Horizontal => '─',
            Self::UpLeft => '┘',
            Self::UpRight => '└',
            Self::DownLeft => '┐',
            Self::DownRight => '┌',
        }
    }

    /// The number of this shape in the direction theory, `1..=6`.
    pub fn number(&self) -> usize {
        match self {
            Self::Vertical => 1,
            Self::Horizontal => 2,
            Self::UpLeft => 3,
            Self::UpRight => 4,
            Self::DownLeft => 5,
            Self::DownRight => 6,
        }
    }
}
