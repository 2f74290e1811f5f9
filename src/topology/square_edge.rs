use super::{
    square_point_uv, square_tile_uv, GridView, LatticeSize, TileUpdate, Topology, TopologyKind,
};
use crate::params::SimulationParams;
use glam::{IVec2, Vec2};

/// Top, right, bottom, left.
const VON_NEUMANN: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(1, 0),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
];

/// Square lattice with staggered storage: the vector kept at a tile's top-left corner holds
/// the flow through that tile's left edge (`x`) and top edge (`y`).
///
/// Every lattice point is valid, but the component normal to a domain wall is always zero
/// there, so fluid can slide along the walls without crossing them.
#[derive(Debug, Clone, Copy)]
pub struct SquareEdge {
    size: LatticeSize,
}

impl SquareEdge {
    pub fn new(size: LatticeSize) -> Self {
        Self { size }
    }
}

impl Topology for SquareEdge {
    type Velocity = Vec2;

    fn kind(&self) -> TopologyKind {
        TopologyKind::EdgeBased
    }

    fn size(&self) -> LatticeSize {
        self.size
    }

    fn is_corner_valid(&self, col: i32, row: i32) -> bool {
        self.size.contains_point(col, row)
    }

    fn velocity_mask(&self, col: i32, row: i32) -> Vec2 {
        let mut mask = Vec2::ONE;
        if col == 0 || col == self.size.cols {
            mask.x = 0.0;
        }
        if row == 0 || row == self.size.rows {
            mask.y = 0.0;
        }
        mask
    }

    fn pressure_at(
        &self,
        grid: &GridView<'_, Vec2>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> TileUpdate {
        let v_top_left = self.safe_velocity(grid, col, row);
        let v_bottom_left = self.safe_velocity(grid, col, row + 1);
        let v_top_right = self.safe_velocity(grid, col + 1, row);

        let dx = v_top_left.x - v_top_right.x;
        let dy = v_top_left.y - v_bottom_left.y;
        let divergence = dx + dy;

        let pressure_sum: f32 = VON_NEUMANN
            .iter()
            .map(|offset| grid.safe_pressure(col + offset.x, row + offset.y))
            .sum();

        TileUpdate {
            pressure: params.relax_pressure(pressure_sum, divergence, 4.0),
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
        // The left edge separates (col-1,row) from (col,row), the top edge (col,row-1) from it.
        let p_here = grid.safe_pressure(col, row);
        let p_left = grid.safe_pressure(col - 1, row);
        let p_top = grid.safe_pressure(col, row - 1);

        let pressure_gradient = Vec2::new(p_left - p_here, p_top - p_here);

        self.safe_velocity(grid, col, row) - params.gradient_scale() * pressure_gradient
    }

    fn tile_uv(&self, col: i32, row: i32) -> Vec2 {
        square_tile_uv(self.size, col, row)
    }

    fn velocity_uv(&self, col: i32, row: i32) -> Vec2 {
        square_point_uv(self.size, col, row)
    }

    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2> {
        VON_NEUMANN
            .iter()
            .map(|offset| IVec2::new(col, row) + *offset)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Field;

    #[test]
    fn test_wall_normal_components_are_masked() {
        let topo = SquareEdge::new(LatticeSize::new(3, 2));
        let pressure = Field::filled(3, 2, 0.0);
        let velocity = Field::filled(4, 3, Vec2::new(1.0, 1.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };

        for row in 0..=2 {
            assert_eq!(topo.safe_velocity(&grid, 0, row).x, 0.0);
            assert_eq!(topo.safe_velocity(&grid, 3, row).x, 0.0);
        }
        for col in 0..=3 {
            assert_eq!(topo.safe_velocity(&grid, col, 0).y, 0.0);
            assert_eq!(topo.safe_velocity(&grid, col, 2).y, 0.0);
        }
        // Tangential slip survives on the walls.
        assert_eq!(topo.safe_velocity(&grid, 0, 1).y, 1.0);
        assert_eq!(topo.safe_velocity(&grid, 1, 0).x, 1.0);
        assert_eq!(topo.safe_velocity(&grid, 1, 1), Vec2::new(1.0, 1.0));
        assert_eq!(topo.safe_velocity(&grid, 4, 1), Vec2::ZERO);
    }

    #[test]
    fn test_divergence_uses_own_and_adjacent_edges() {
        let topo = SquareEdge::new(LatticeSize::new(3, 3));
        let params = SimulationParams {
            time_step: 1.0,
            ..Default::default()
        };
        let pressure = Field::filled(3, 3, 0.0);
        let mut velocity = Field::filled(4, 4, Vec2::ZERO);
        // Flow leaving tile (1,1) through its right edge.
        velocity.set(2, 1, Vec2::new(-2.0, 0.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };

        let update = topo.pressure_at(&grid, &params, 1, 1);
        assert_eq!(update.divergence, 2.0);
        assert_eq!(update.pressure, -0.5);

        // The same edge is the left edge of tile (2,1).
        let neighbour = topo.pressure_at(&grid, &params, 2, 1);
        assert_eq!(neighbour.divergence, -2.0);
    }

    #[test]
    fn test_velocity_uses_axis_differences_only() {
        let topo = SquareEdge::new(LatticeSize::new(3, 3));
        let params = SimulationParams {
            time_step: 1.0,
            ..Default::default()
        };
        let mut pressure = Field::filled(3, 3, 0.0);
        pressure.set(0, 1, 3.0);
        pressure.set(1, 0, 1.0);
        let velocity = Field::filled(4, 4, Vec2::ZERO);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(topo.velocity_at(&grid, &params, 1, 1), Vec2::new(-3.0, -1.0));
    }

    #[test]
    fn test_neighbours_are_von_neumann() {
        let topo = SquareEdge::new(LatticeSize::new(3, 3));
        assert_eq!(
            topo.neighbour_indices(0, 0),
            vec![
                IVec2::new(0, -1),
                IVec2::new(1, 0),
                IVec2::new(0, 1),
                IVec2::new(-1, 0)
            ]
        );
    }
}
