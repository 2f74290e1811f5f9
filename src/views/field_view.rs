use crate::engine::GridSnapshot;
use crate::topology::{LatticeSize, TopologyKind};
use crate::vector::AnyVelocity;
use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke, Vec2};
use glam::IVec2;

/// Maps pressure to a colour: neutral at zero, blending towards `positive` or `negative`
/// and saturating at `±saturation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressurePalette {
    pub neutral: Color32,
    pub positive: Color32,
    pub negative: Color32,
    pub saturation: f32,
}

impl Default for PressurePalette {
    fn default() -> Self {
        Self {
            neutral: Color32::WHITE,
            positive: Color32::from_rgb(220, 30, 30),
            negative: Color32::from_rgb(30, 60, 220),
            saturation: 10.0,
        }
    }
}

impl PressurePalette {
    pub fn color(&self, pressure: f32) -> Color32 {
        if !pressure.is_finite() || self.saturation <= 0.0 {
            return self.neutral;
        }
        let t = (pressure.abs() / self.saturation).min(1.0);
        let target = if pressure >= 0.0 {
            self.positive
        } else {
            self.negative
        };
        lerp_color(self.neutral, target, t)
    }
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

/// Screen directions of the three hex edge flows, positive meaning flow into the tile below
/// the top-left and top-right edges and into the tile left of the vertical edge.
const HEX_FLOW_DIRECTIONS: [Vec2; 3] = [
    Vec2::new(0.5, 0.866_025_4),
    Vec2::new(-1.0, 0.0),
    Vec2::new(-0.5, 0.866_025_4),
];

/// An edit requested by clicking on a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileEdit {
    pub tile: IVec2,
    pub delta: f32,
}

pub struct FieldView {
    pub palette: PressurePalette,
    pub show_velocity: bool,
    /// Screen length of a unit velocity, as a fraction of the tile spacing.
    pub arrow_scale: f32,
    /// Pressure added on left click and removed on right click.
    pub click_strength: f32,
}

impl Default for FieldView {
    fn default() -> Self {
        Self {
            palette: PressurePalette::default(),
            show_velocity: true,
            arrow_scale: 0.15,
            click_strength: 5.0,
        }
    }
}

impl FieldView {
    /// Paints the snapshot into the available space and returns the edit requested by a
    /// click, if any.
    pub fn show(&self, ui: &mut egui::Ui, snapshot: &GridSnapshot) -> Option<TileEdit> {
        let cols = snapshot.size.cols.max(1) as f32;
        let rows = snapshot.size.rows.max(1) as f32;

        let available_size = ui.available_rect_before_wrap().size();
        let domain_aspect = match snapshot.kind {
            TopologyKind::HexEdgeBased => cols / (rows * 0.866_025_4),
            _ => cols / rows,
        };
        let available_aspect = available_size.x / available_size.y;
        let (width, height) = if available_aspect > domain_aspect {
            (available_size.y * domain_aspect, available_size.y)
        } else {
            (available_size.x, available_size.x / domain_aspect)
        };

        let (response, painter) =
            ui.allocate_painter(Vec2::new(width, height), Sense::click());
        let tile_size = Vec2::new(width / cols, height / rows);

        // Hex tile centres run edge to edge in uv, keep half a tile free around them.
        let area = match snapshot.kind {
            TopologyKind::HexEdgeBased => response.rect.shrink2(tile_size * 0.5),
            _ => response.rect,
        };
        let to_screen =
            |uv: glam::Vec2| area.min + Vec2::new(uv.x * area.width(), uv.y * area.height());

        for (pressure, uv) in snapshot.pressure.iter().zip(&snapshot.tile_uv) {
            let color = self.palette.color(*pressure);
            let centre = to_screen(*uv);
            match snapshot.kind {
                TopologyKind::HexEdgeBased => {
                    painter.add(Shape::convex_polygon(
                        hexagon(centre, tile_size),
                        color,
                        Stroke::new(1.0, Color32::from_gray(180)),
                    ));
                }
                _ => {
                    painter.rect_filled(Rect::from_center_size(centre, tile_size), 0.0, color);
                }
            }
        }

        if self.show_velocity {
            let stroke = Stroke::new(1.5, Color32::from_gray(30));
            let scale = tile_size.min_elem() * self.arrow_scale;
            for (velocity, uv) in snapshot.velocity.iter().zip(&snapshot.velocity_uv) {
                let origin = match snapshot.kind {
                    // Lattice points sit on the top vertex of the tile below them.
                    TopologyKind::HexEdgeBased => {
                        to_screen(hex_point_uv(snapshot.size, *uv))
                            - Vec2::new(0.0, hex_radius(tile_size))
                    }
                    _ => to_screen(*uv),
                };
                match velocity {
                    AnyVelocity::Planar(v) => {
                        if *v != glam::Vec2::ZERO {
                            painter.arrow(origin, Vec2::new(v.x, v.y) * scale, stroke);
                        }
                    }
                    AnyVelocity::Triple(v) => {
                        for (flow, direction) in v.to_array().iter().zip(HEX_FLOW_DIRECTIONS) {
                            if *flow != 0.0 {
                                painter.arrow(origin, direction * *flow * scale, stroke);
                            }
                        }
                    }
                }
            }
        }

        let delta = if response.clicked() {
            self.click_strength
        } else if response.secondary_clicked() {
            -self.click_strength
        } else {
            return None;
        };
        let pointer = response.interact_pointer_pos()?;
        let uv = glam::Vec2::new(
            (pointer.x - area.min.x) / area.width().max(1.0),
            (pointer.y - area.min.y) / area.height().max(1.0),
        );
        snapshot
            .nearest_tile(uv)
            .map(|tile| TileEdit { tile, delta })
    }
}

/// Rescales a hex lattice point from its `cols x rows` placement into the `(cols-1) x
/// (rows-1)` placement of tile centres, so it lines up horizontally with its tile.
fn hex_point_uv(size: LatticeSize, uv: glam::Vec2) -> glam::Vec2 {
    let cols = size.cols.max(1) as f32;
    let rows = size.rows.max(1) as f32;
    let span_u = (size.cols - 1).max(1) as f32;
    let span_v = (size.rows - 1).max(1) as f32;
    glam::Vec2::new(uv.x * cols / span_u, uv.y * rows / span_v)
}

fn hex_radius(tile_size: Vec2) -> f32 {
    (tile_size.x * 0.5 / 0.866_025_4).min(tile_size.y * 0.5 / 0.75)
}

/// Pointy-top hexagon filling one tile slot.
fn hexagon(centre: Pos2, tile_size: Vec2) -> Vec<Pos2> {
    let radius = hex_radius(tile_size);
    (0..6)
        .map(|k| {
            let angle = (60.0 * k as f32 - 90.0).to_radians();
            centre + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{HexEdge, Topology};

    #[test]
    fn test_palette_saturates() {
        let palette = PressurePalette::default();
        assert_eq!(palette.color(0.0), palette.neutral);
        assert_eq!(palette.color(10.0), palette.positive);
        assert_eq!(palette.color(250.0), palette.positive);
        assert_eq!(palette.color(-12.0), palette.negative);
        assert_eq!(palette.color(f32::NAN), palette.neutral);
    }

    #[test]
    fn test_palette_blends_halfway() {
        let palette = PressurePalette::default();
        let c = palette.color(5.0);
        assert_eq!(c.r(), 238);
        assert_eq!(c.g(), 143);
        assert_eq!(c.b(), 143);
    }

    #[test]
    fn test_hex_points_line_up_with_their_tiles() {
        let size = LatticeSize::new(10, 10);
        let topo = HexEdge::new(size);
        // Even row: point (c, r) tops tile (c, r). Odd row: point (c, r) tops tile (c-1, r).
        let cases = [
            ((4, 4), (4, 4)),
            ((9, 2), (9, 2)),
            ((5, 5), (4, 5)),
            ((10, 9), (9, 9)),
        ];
        for (point, tile) in cases {
            let mapped = hex_point_uv(size, topo.velocity_uv(point.0, point.1));
            let centre = topo.tile_uv(tile.0, tile.1);
            assert!((mapped - centre).length() < 1e-5, "point {point:?}");
        }
    }

    #[test]
    fn test_hexagon_is_centred() {
        let centre = Pos2::new(10.0, 20.0);
        let points = hexagon(centre, Vec2::new(8.0, 8.0));
        assert_eq!(points.len(), 6);
        let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + (*p - centre));
        assert!(sum.length() < 1e-4);
    }
}
