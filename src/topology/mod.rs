//! Lattice stencils.
//!
//! A topology decides which tiles and lattice points take part in an update, which lattice
//! points may carry flow, and where everything sits in normalized display space. Every
//! implementation follows the same two relaxation formulas (see [`SimulationParams`]) and
//! only differs in how neighbour count, divergence and pressure gradient are gathered.

pub mod hex_edge;
pub mod square_corner;
pub mod square_edge;

pub use hex_edge::HexEdge;
pub use square_corner::SquareCorner;
pub use square_edge::SquareEdge;

use crate::grid::Field;
use crate::params::SimulationParams;
use crate::vector::FlowVector;
use glam::{IVec2, Vec2};
use std::fmt::{self, Debug};

/// Which stencil a grid is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TopologyKind {
    /// Square lattice, velocity at tile corners.
    #[default]
    CornerBased,
    /// Square lattice, velocity components on tile edges.
    EdgeBased,
    /// Offset-row hexagonal lattice, three edge flows per lattice point.
    HexEdgeBased,
}

impl TopologyKind {
    pub fn all() -> &'static [TopologyKind] {
        &[
            TopologyKind::CornerBased,
            TopologyKind::EdgeBased,
            TopologyKind::HexEdgeBased,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TopologyKind::CornerBased => "Square (corners)",
            TopologyKind::EdgeBased => "Square (edges)",
            TopologyKind::HexEdgeBased => "Hexagonal (edges)",
        }
    }

    /// Components per stored velocity.
    pub fn velocity_width(&self) -> usize {
        match self {
            TopologyKind::CornerBased | TopologyKind::EdgeBased => 2,
            TopologyKind::HexEdgeBased => 3,
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Tile counts of a lattice. The velocity grid is one larger on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeSize {
    pub cols: i32,
    pub rows: i32,
}

impl LatticeSize {
    pub fn new(cols: i32, rows: i32) -> Self {
        Self { cols, rows }
    }

    #[inline(always)]
    pub fn contains_tile(&self, col: i32, row: i32) -> bool {
        col >= 0 && col < self.cols && row >= 0 && row < self.rows
    }

    #[inline(always)]
    pub fn contains_point(&self, col: i32, row: i32) -> bool {
        col >= 0 && col <= self.cols && row >= 0 && row <= self.rows
    }
}

/// Read-only access to the frozen state a sweep works from.
pub struct GridView<'a, V> {
    pub pressure: &'a Field<f32>,
    pub velocity: &'a Field<V>,
}

impl<V: FlowVector> GridView<'_, V> {
    /// Stored pressure, or `0` outside the grid.
    #[inline(always)]
    pub fn safe_pressure(&self, col: i32, row: i32) -> f32 {
        self.pressure.get(col, row).unwrap_or(0.0)
    }

    /// Stored velocity without any topology rule applied.
    #[inline(always)]
    pub fn raw_velocity(&self, col: i32, row: i32) -> V {
        self.velocity.get(col, row).unwrap_or(V::ZERO)
    }
}

/// Result of one tile stencil evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileUpdate {
    pub pressure: f32,
    pub divergence: f32,
}

pub trait Topology: Send + Sync + Debug {
    type Velocity: FlowVector;

    fn kind(&self) -> TopologyKind;

    fn size(&self) -> LatticeSize;

    fn is_tile_valid(&self, col: i32, row: i32) -> bool {
        self.size().contains_tile(col, row)
    }

    /// Whether the lattice point may carry flow at all.
    fn is_corner_valid(&self, col: i32, row: i32) -> bool;

    /// Per-axis mask applied to a valid lattice point. Blocked axes are zero.
    fn velocity_mask(&self, _col: i32, _row: i32) -> Self::Velocity {
        Self::Velocity::ONE
    }

    /// Velocity as every stencil sees it: zero at invalid points, masked elsewhere.
    fn safe_velocity(
        &self,
        grid: &GridView<'_, Self::Velocity>,
        col: i32,
        row: i32,
    ) -> Self::Velocity {
        if !self.is_corner_valid(col, row) {
            return Self::Velocity::ZERO;
        }
        grid.raw_velocity(col, row).masked(self.velocity_mask(col, row))
    }

    fn pressure_at(
        &self,
        grid: &GridView<'_, Self::Velocity>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> TileUpdate;

    fn velocity_at(
        &self,
        grid: &GridView<'_, Self::Velocity>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> Self::Velocity;

    /// Normalized placement of a tile.
    fn tile_uv(&self, col: i32, row: i32) -> Vec2;

    /// Normalized placement of a lattice point.
    fn velocity_uv(&self, col: i32, row: i32) -> Vec2;

    /// Tiles the pressure stencil looks at, unfiltered: entries may fall outside the grid.
    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2>;
}

/// Lattice point placement shared by both square topologies.
pub(crate) fn square_point_uv(size: LatticeSize, col: i32, row: i32) -> Vec2 {
    Vec2::new(col as f32 / size.cols as f32, row as f32 / size.rows as f32)
}

/// Tile centre placement shared by both square topologies.
pub(crate) fn square_tile_uv(size: LatticeSize, col: i32, row: i32) -> Vec2 {
    Vec2::new(
        (col as f32 + 0.5) / size.cols as f32,
        (row as f32 + 0.5) / size.rows as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_size_ranges() {
        let size = LatticeSize::new(3, 2);
        assert!(size.contains_tile(2, 1));
        assert!(!size.contains_tile(3, 1));
        assert!(size.contains_point(3, 2));
        assert!(!size.contains_point(4, 2));
        assert!(!size.contains_point(-1, 0));
    }

    #[test]
    fn test_velocity_widths() {
        assert_eq!(TopologyKind::CornerBased.velocity_width(), 2);
        assert_eq!(TopologyKind::EdgeBased.velocity_width(), 2);
        assert_eq!(TopologyKind::HexEdgeBased.velocity_width(), 3);
    }
}
