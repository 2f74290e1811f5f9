use super::{GridView, LatticeSize, TileUpdate, Topology, TopologyKind};
use crate::params::SimulationParams;
use glam::{IVec2, Vec2, Vec3};

/// Neighbour offsets for tiles on even rows: top-left, top-right, right, bottom-right,
/// bottom-left, left.
pub const EVEN_ROW_NEIGHBOURS: [IVec2; 6] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, 0),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
];

/// Same order as [`EVEN_ROW_NEIGHBOURS`]; odd rows sit half a tile to the right.
pub const ODD_ROW_NEIGHBOURS: [IVec2; 6] = [
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
];

#[inline(always)]
fn is_odd(row: i32) -> bool {
    row.rem_euclid(2) == 1
}

/// Offset-row hexagonal lattice.
///
/// A lattice point sits on the top vertex of the tile below it and stores three flows:
/// `x` along that tile's top-left edge, `y` along the vertical edge between the two tiles
/// above the point, `z` along the tile's top-right edge. A tile's other three edges belong
/// to the two lattice points on its lower side.
#[derive(Debug, Clone, Copy)]
pub struct HexEdge {
    size: LatticeSize,
}

impl HexEdge {
    pub fn new(size: LatticeSize) -> Self {
        Self { size }
    }

    /// Lattice points of a tile: top, bottom-left, bottom-right.
    fn tile_points(&self, col: i32, row: i32) -> [IVec2; 3] {
        let top = if is_odd(row) {
            IVec2::new(col + 1, row)
        } else {
            IVec2::new(col, row)
        };
        [top, IVec2::new(col, row + 1), IVec2::new(col + 1, row + 1)]
    }

    /// Signed flow through each of the six edges of a tile, in neighbour order (top-left,
    /// top-right, right, bottom-right, bottom-left, left). Their sum is the divergence.
    pub fn tile_edge_flows(&self, grid: &GridView<'_, Vec3>, col: i32, row: i32) -> [f32; 6] {
        let [top, bottom_left, bottom_right] = self
            .tile_points(col, row)
            .map(|p| self.safe_velocity(grid, p.x, p.y));

        [
            -top.x,
            -top.z,
            -bottom_right.y,
            bottom_right.x,
            bottom_left.z,
            bottom_left.y,
        ]
    }
}

impl Topology for HexEdge {
    type Velocity = Vec3;

    fn kind(&self) -> TopologyKind {
        TopologyKind::HexEdgeBased
    }

    fn size(&self) -> LatticeSize {
        self.size
    }

    /// Row 0 has no tiles above it. Odd rows start half a tile in, even rows end half a
    /// tile early, so each loses one extreme point.
    fn is_corner_valid(&self, col: i32, row: i32) -> bool {
        if col < 0 || col > self.size.cols || row <= 0 || row > self.size.rows {
            return false;
        }
        if is_odd(row) && col == 0 {
            return false;
        }
        if !is_odd(row) && col == self.size.cols {
            return false;
        }
        true
    }

    fn velocity_mask(&self, col: i32, row: i32) -> Vec3 {
        if row == 0 {
            return Vec3::ZERO;
        }
        let mut mask = Vec3::ONE;
        if col == 0 || col == self.size.cols {
            mask.y = 0.0;
            if col == 0 || !is_odd(row) {
                mask.x = 0.0;
            }
            if col == self.size.cols {
                mask.z = 0.0;
            }
        }
        if row == self.size.rows {
            mask.x = 0.0;
            mask.z = 0.0;
        }
        mask
    }

    fn pressure_at(
        &self,
        grid: &GridView<'_, Vec3>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> TileUpdate {
        let (pressure_sum, neighbour_count) = self
            .neighbour_indices(col, row)
            .into_iter()
            .filter(|n| self.is_tile_valid(n.x, n.y))
            .fold((0.0f32, 0usize), |(sum, count), n| {
                (sum + grid.safe_pressure(n.x, n.y), count + 1)
            });

        let divergence: f32 = self.tile_edge_flows(grid, col, row).iter().sum();

        TileUpdate {
            pressure: params.relax_pressure(
                pressure_sum,
                divergence,
                neighbour_count.max(1) as f32,
            ),
            divergence,
        }
    }

    fn velocity_at(
        &self,
        grid: &GridView<'_, Vec3>,
        params: &SimulationParams,
        col: i32,
        row: i32,
    ) -> Vec3 {
        let p_top_left = grid.safe_pressure(col - 1, row - 1);
        let p_top_right = grid.safe_pressure(col, row - 1);
        let p_bottom = if is_odd(row) {
            grid.safe_pressure(col - 1, row)
        } else {
            grid.safe_pressure(col, row)
        };

        let pressure_gradient = Vec3::new(
            p_bottom - p_top_left,
            p_top_left - p_top_right,
            p_bottom - p_top_right,
        );

        let updated =
            self.safe_velocity(grid, col, row) - params.gradient_scale() * pressure_gradient;
        updated * self.velocity_mask(col, row)
    }

    fn tile_uv(&self, col: i32, row: i32) -> Vec2 {
        let span_u = (self.size.cols - 1).max(1) as f32;
        let span_v = (self.size.rows - 1).max(1) as f32;
        let mut u = col as f32 / span_u;
        if is_odd(row) {
            u += 0.5 / span_u;
        }
        Vec2::new(u, row as f32 / span_v)
    }

    fn velocity_uv(&self, col: i32, row: i32) -> Vec2 {
        let mut u = col as f32 / self.size.cols as f32;
        if is_odd(row) {
            u -= 0.5 / self.size.cols as f32;
        }
        Vec2::new(u, row as f32 / self.size.rows as f32)
    }

    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2> {
        let offsets = if is_odd(row) {
            &ODD_ROW_NEIGHBOURS
        } else {
            &EVEN_ROW_NEIGHBOURS
        };
        offsets.iter().map(|o| IVec2::new(col, row) + *o).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Field;

    fn topo_10x10() -> HexEdge {
        HexEdge::new(LatticeSize::new(10, 10))
    }

    #[test]
    fn test_neighbours_even_row() {
        let topo = topo_10x10();
        let expected: Vec<IVec2> = [(4, 3), (5, 3), (6, 4), (5, 5), (4, 5), (4, 4)]
            .iter()
            .map(|&(c, r)| IVec2::new(c, r))
            .collect();
        assert_eq!(topo.neighbour_indices(5, 4), expected);
    }

    #[test]
    fn test_neighbours_odd_row() {
        let topo = topo_10x10();
        let expected: Vec<IVec2> = [(5, 4), (6, 4), (6, 5), (6, 6), (5, 6), (4, 5)]
            .iter()
            .map(|&(c, r)| IVec2::new(c, r))
            .collect();
        assert_eq!(topo.neighbour_indices(5, 5), expected);
    }

    #[test]
    fn test_border_tile_neighbours_include_invalid_entries() {
        let topo = topo_10x10();
        let neighbours = topo.neighbour_indices(0, 0);
        assert_eq!(neighbours.len(), 6);
        let valid: Vec<_> = neighbours
            .into_iter()
            .filter(|n| topo.is_tile_valid(n.x, n.y))
            .collect();
        assert_eq!(valid, vec![IVec2::new(1, 0), IVec2::new(0, 1)]);
    }

    #[test]
    fn test_corner_validity_parity() {
        let topo = topo_10x10();
        assert!(!topo.is_corner_valid(3, 0));
        assert!(!topo.is_corner_valid(0, 1));
        assert!(topo.is_corner_valid(10, 1));
        assert!(!topo.is_corner_valid(10, 2));
        assert!(topo.is_corner_valid(0, 2));
        assert!(topo.is_corner_valid(5, 10));
        assert!(!topo.is_corner_valid(5, 11));
    }

    #[test]
    fn test_axis_mask_on_boundaries() {
        let topo = topo_10x10();
        assert_eq!(topo.velocity_mask(4, 0), Vec3::ZERO);
        assert_eq!(topo.velocity_mask(4, 3), Vec3::ONE);
        assert_eq!(topo.velocity_mask(4, 10), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(topo.velocity_mask(0, 2), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(topo.velocity_mask(10, 3), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_safe_velocity_zero_at_invalid_point() {
        let topo = topo_10x10();
        let pressure = Field::filled(10, 10, 0.0);
        let velocity = Field::filled(11, 11, Vec3::ONE);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(topo.safe_velocity(&grid, 0, 1), Vec3::ZERO);
        assert_eq!(topo.safe_velocity(&grid, 10, 4), Vec3::ZERO);
        assert_eq!(topo.safe_velocity(&grid, 7, 0), Vec3::ZERO);
        assert_eq!(topo.safe_velocity(&grid, 3, 3), Vec3::ONE);
    }

    #[test]
    fn test_edge_flow_sign_convention() {
        let topo = topo_10x10();
        let pressure = Field::filled(10, 10, 0.0);
        let mut velocity = Field::filled(11, 11, Vec3::ZERO);
        // Top point of even tile (4,4) is (4,4); bottom points are (4,5) and (5,5).
        velocity.set(4, 4, Vec3::new(1.0, 0.0, 2.0));
        velocity.set(5, 5, Vec3::new(3.0, 4.0, 0.0));
        velocity.set(4, 5, Vec3::new(0.0, 5.0, 6.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        let flows = topo.tile_edge_flows(&grid, 4, 4);
        assert_eq!(flows, [-1.0, -2.0, -4.0, 3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_odd_tile_uses_shifted_top_point() {
        let topo = topo_10x10();
        let pressure = Field::filled(10, 10, 0.0);
        let mut velocity = Field::filled(11, 11, Vec3::ZERO);
        velocity.set(5, 5, Vec3::new(1.0, 0.0, 0.0));
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(topo.tile_edge_flows(&grid, 4, 5)[0], -1.0);
        assert_eq!(topo.tile_edge_flows(&grid, 5, 5)[0], 0.0);
    }

    #[test]
    fn test_pressure_averages_valid_neighbours_only() {
        let topo = topo_10x10();
        let params = SimulationParams::default();
        let mut pressure = Field::filled(10, 10, 0.0);
        pressure.set(1, 0, 2.0);
        pressure.set(0, 1, 4.0);
        let velocity = Field::filled(11, 11, Vec3::ZERO);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        let update = topo.pressure_at(&grid, &params, 0, 0);
        assert_eq!(update.divergence, 0.0);
        assert_eq!(update.pressure, 3.0);
    }

    #[test]
    fn test_velocity_follows_pressure_difference_across_each_edge() {
        let topo = topo_10x10();
        let params = SimulationParams {
            time_step: 1.0,
            ..Default::default()
        };
        let mut pressure = Field::filled(10, 10, 0.0);
        pressure.set(4, 3, 1.0);
        let velocity = Field::filled(11, 11, Vec3::ZERO);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(
            topo.velocity_at(&grid, &params, 5, 4),
            Vec3::new(1.0, -1.0, 0.0)
        );
        // The last row only keeps its vertical edge.
        pressure.set(3, 9, 1.0);
        let grid = GridView {
            pressure: &pressure,
            velocity: &velocity,
        };
        assert_eq!(
            topo.velocity_at(&grid, &params, 4, 10),
            Vec3::new(0.0, -1.0, 0.0)
        );
    }

    #[test]
    fn test_uv_offsets_by_parity() {
        let topo = topo_10x10();
        assert_eq!(topo.velocity_uv(2, 2), Vec2::new(0.2, 0.2));
        let odd = topo.velocity_uv(1, 1);
        assert!((odd.x - 0.05).abs() < 1e-6);
        assert!((odd.y - 0.1).abs() < 1e-6);
        let tile = topo.tile_uv(0, 1);
        assert!((tile.x - 0.5 / 9.0).abs() < 1e-6);
        assert!((tile.y - 1.0 / 9.0).abs() < 1e-6);
        assert_eq!(topo.tile_uv(9, 9).y, 1.0);
    }

    #[test]
    fn test_single_column_uv_is_finite() {
        let topo = HexEdge::new(LatticeSize::new(1, 1));
        assert!(topo.tile_uv(0, 0).is_finite());
    }
}
