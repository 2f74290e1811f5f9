use super::{
    square_point_uv, square_tile_uv, GridView, LatticeSize, TileUpdate, Topology, TopologyKind,
};
use crate::params::SimulationParams;
use glam::{IVec2, Vec2};
use std::f32::consts::FRAC_1_SQRT_2;

/// Unit vector along the bottom-left to top-right diagonal (y grows downwards).
const DIAG_BL_TR: Vec2 = Vec2::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2);
/// Unit vector along the top-left to bottom-right diagonal, sign flipped.
const DIAG_TL_BR: Vec2 = Vec2::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2);

/// Moore neighbourhood, row by row starting top-left.
const MOORE: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Square lattice with a planar velocity at each interior tile corner.
///
/// Pressure relaxes over all eight surrounding tiles, forced by the divergence sampled at
/// the tile's four corners. Velocity responds to the four tiles sharing the corner: two
/// axis-aligned gradients plus two diagonal correction terms. The diagonal terms are an
/// ad hoc blend of corner pressures rather than a standard discretization and should not
/// be read as physically exact.
#[derive(Debug, Clone, Copy)]
pub struct SquareCorner {
    size: LatticeSize,
}

impl SquareCorner {
    pub fn new(size: LatticeSize) -> Self {
        Self { size }
    }
}

impl Topology for SquareCorner {
    type Velocity = Vec2;

    fn kind(&self) -> TopologyKind {
        TopologyKind::CornerBased
    }

    fn size(&self) -> LatticeSize {
        self.size
    }

    /// Border corners are pinned: no flow through the domain boundary.
    fn is_corner_valid(&self, col: i32, row: i32) -> bool {
        col > 0 && col < self.size.cols && row > 0 && row < self.size.rows
    }

    fn pressure_at(
        &self,
        grid: &GridView<'_, Vec2>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> TileUpdate {
        let v_top_left = self.safe_velocity(grid, col, row);
        let v_top_right = self.safe_velocity(grid, col + 1, row);
        let v_bottom_left = self.safe_velocity(grid, col, row + 1);
        let v_bottom_right = self.safe_velocity(grid, col + 1, row + 1);

        let v_top = (v_top_left + v_top_right) / 2.0;
        let v_bottom = (v_bottom_left + v_bottom_right) / 2.0;
        let v_left = (v_top_left + v_bottom_left) / 2.0;
        let v_right = (v_top_right + v_bottom_right) / 2.0;

        let divergence = (v_left.x - v_right.x) + (v_top.y - v_bottom.y);

        let pressure_sum: f32 = MOORE
            .iter()
            .map(|offset| grid.safe_pressure(col + offset.x, row + offset.y))
            .sum();

        TileUpdate {
            pressure: params.relax_pressure(pressure_sum, divergence, 8.0),
            divergence,
        }
    }

    fn velocity_at(
        &self,
        grid: &GridView<'_, Vec2>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> Vec2 {
        let p_top_left = grid.safe_pressure(col - 1, row - 1);
        let p_top_right = grid.safe_pressure(col, row - 1);
        let p_bottom_left = grid.safe_pressure(col - 1, row);
        let p_bottom_right = grid.safe_pressure(col, row);

        let p_top = (p_top_left + p_top_right) / 2.0;
        let p_bottom = (p_bottom_left + p_bottom_right) / 2.0;
        let p_left = (p_top_left + p_bottom_left) / 2.0;
        let p_right = (p_top_right + p_bottom_right) / 2.0;

        // Each diagonal end weighs its own tile fully and the two adjacent tiles by half.
        let diag_bottom_left = (p_bottom_left + p_top_left / 2.0 + p_bottom_right / 2.0) / 2.0;
        let diag_top_right = (p_top_right + p_bottom_right / 2.0 + p_top_left / 2.0) / 2.0;
        let diag_top_left = (p_top_left + p_top_right / 2.0 + p_bottom_left / 2.0) / 2.0;
        let diag_bottom_right = (p_bottom_right + p_bottom_left / 2.0 + p_top_right / 2.0) / 2.0;

        let vertical = Vec2::new(0.0, p_top - p_bottom);
        let horizontal = Vec2::new(p_left - p_right, 0.0);
        let diag_rising = DIAG_BL_TR * (diag_bottom_left - diag_top_right);
        let diag_falling = DIAG_TL_BR * (diag_top_left - diag_bottom_right);
        let pressure_gradient = vertical + horizontal + diag_rising + diag_falling;

        self.safe_velocity(grid, col, row) - params.gradient_scale() * pressure_gradient
    }

    fn tile_uv(&self, col: i32, row: i32) -> Vec2 {
        square_tile_uv(self.size, col, row)
    }

    fn velocity_uv(&self, col: i32, row: i32) -> Vec2 {
        square_point_uv(self.size, col, row)
    }

    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2> {
        MOORE.iter().map(|offset| IVec2::new(col, row) + *offset).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Field;

    fn fields(cols: usize, rows: usize) -> (Field<f32>, Field<Vec2>) {
        (
            Field::filled(cols, rows, 0.0),
            Field::filled(cols + 1, rows + 1, Vec2::ZERO),
        )
    }

    #[test]
    fn test_border_corners_are_invalid() {
        let topo = SquareCorner::new(LatticeSize::new(4, 3));
        for col in 0..=4 {
            assert!(!topo.is_corner_valid(col, 0));
            assert!(!topo.is_corner_valid(col, 3));
        }
        for row in 0..=3 {
            assert!(!topo.is_corner_valid(0, row));
            assert!(!topo.is_corner_valid(4, row));
        }
        assert!(topo.is_corner_valid(1, 1));
        assert!(topo.is_corner_valid(3, 2));
    }

    #[test]
    fn test_safe_velocity_ignores_stored_border_value() {
        let topo = SquareCorner::new(LatticeSize::new(3, 3));
        let (pressure, mut velocity) = fields(3, 3);
        velocity.set(0, 1, Vec2::new(4.0, 4.0));
        velocity.set(1, 1, Vec2::new(2.0, -1.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(topo.safe_velocity(&grid, 0, 1), Vec2::ZERO);
        assert_eq!(topo.safe_velocity(&grid, 1, 1), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_corner_flow_forces_only_touching_tiles() {
        let topo = SquareCorner::new(LatticeSize::new(4, 4));
        let params = SimulationParams::default();
        let (pressure, mut velocity) = fields(4, 4);
        velocity.set(2, 2, Vec2::new(1.0, 0.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };

        // Tile (1,1) has the corner on its right side.
        let left_tile = topo.pressure_at(&grid, &params, 1, 1);
        assert!((left_tile.divergence - (-0.5)).abs() < 1e-6);
        let expected = 0.5 / params.time_step / 8.0;
        assert!((left_tile.pressure - expected).abs() < 1e-4);

        // Tile (2,1) has it on its left side.
        let right_tile = topo.pressure_at(&grid, &params, 2, 1);
        assert!((right_tile.divergence - 0.5).abs() < 1e-6);
        assert!(right_tile.pressure < 0.0);

        let far_tile = topo.pressure_at(&grid, &params, 0, 0);
        assert_eq!(far_tile.pressure, 0.0);
    }

    #[test]
    fn test_uniform_pressure_has_no_gradient() {
        let topo = SquareCorner::new(LatticeSize::new(3, 3));
        let params = SimulationParams::default();
        let (mut pressure, velocity) = fields(3, 3);
        pressure.fill(2.0);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        let v = topo.velocity_at(&grid, &params, 1, 1);
        assert!(v.length() < 1e-6);
    }

    #[test]
    fn test_left_right_pressure_difference() {
        let topo = SquareCorner::new(LatticeSize::new(2, 2));
        let params = SimulationParams {
            time_step: 1.0,
            ..Default::default()
        };
        let (mut pressure, velocity) = fields(2, 2);
        pressure.set(0, 0, 1.0);
        pressure.set(0, 1, 1.0);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        let v = topo.velocity_at(&grid, &params, 1, 1);
        // pLeft - pRight = 1, diagonals cancel on the x axis.
        assert!((v.x - (-1.0)).abs() < 1e-5);
        assert!(v.y.abs() < 1e-5);
    }

    #[test]
    fn test_neighbours_are_moore() {
        let topo = SquareCorner::new(LatticeSize::new(5, 5));
        let neighbours = topo.neighbour_indices(2, 2);
        assert_eq!(neighbours.len(), 8);
        assert!(!neighbours.contains(&IVec2::new(2, 2)));
        assert!(neighbours.contains(&IVec2::new(1, 1)));
        assert!(neighbours.contains(&IVec2::new(3, 3)));
    }

    #[test]
    fn test_uv_placement() {
        let topo = SquareCorner::new(LatticeSize::new(4, 2));
        assert_eq!(topo.velocity_uv(4, 2), Vec2::new(1.0, 1.0));
        assert_eq!(topo.velocity_uv(2, 1), Vec2::new(0.5, 0.5));
        assert_eq!(topo.tile_uv(0, 0), Vec2::new(0.125, 0.25));
    }
}
