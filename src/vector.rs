//! Velocity representations.
//!
//! Square lattices store one planar vector per corner, the hexagonal lattice stores three
//! edge flows per lattice point. Both are `glam` vectors behind [`FlowVector`] so the grid
//! store and solver are written once. [`AnyVelocity`] and [`VelocityGridRef`] erase the
//! width for consumers that handle every topology.

use crate::error::ConfigError;
use crate::grid::Field;
use glam::{Vec2, Vec3};
use rand::Rng;
use std::fmt::Debug;

pub trait FlowVector: Copy + Send + Sync + PartialEq + Debug + 'static {
    /// Number of scalar components.
    const WIDTH: usize;
    const ZERO: Self;
    /// All components set to one; the identity for [`FlowVector::masked`].
    const ONE: Self;

    /// Per-axis uniform sample in `[-max, max]`.
    fn random<R: Rng + ?Sized>(rng: &mut R, max: f32) -> Self;

    /// Component-wise product, used to zero blocked axes.
    fn masked(self, mask: Self) -> Self;

    fn is_finite(self) -> bool;

    fn into_any(self) -> AnyVelocity;

    fn from_any(value: AnyVelocity) -> Option<Self>;

    fn grid_ref(field: &Field<Self>) -> VelocityGridRef<'_>;
}

impl FlowVector for Vec2 {
    const WIDTH: usize = 2;
    const ZERO: Self = Vec2::ZERO;
    const ONE: Self = Vec2::ONE;

    fn random<R: Rng + ?Sized>(rng: &mut R, max: f32) -> Self {
        Vec2::new(rng.gen_range(-max..=max), rng.gen_range(-max..=max))
    }

    #[inline(always)]
    fn masked(self, mask: Self) -> Self {
        self * mask
    }

    fn is_finite(self) -> bool {
        Vec2::is_finite(self)
    }

    fn into_any(self) -> AnyVelocity {
        AnyVelocity::Planar(self)
    }

    fn from_any(value: AnyVelocity) -> Option<Self> {
        match value {
            AnyVelocity::Planar(v) => Some(v),
            AnyVelocity::Triple(_) => None,
        }
    }

    fn grid_ref(field: &Field<Self>) -> VelocityGridRef<'_> {
        VelocityGridRef::Planar(field)
    }
}

impl FlowVector for Vec3 {
    const WIDTH: usize = 3;
    const ZERO: Self = Vec3::ZERO;
    const ONE: Self = Vec3::ONE;

    fn random<R: Rng + ?Sized>(rng: &mut R, max: f32) -> Self {
        Vec3::new(
            rng.gen_range(-max..=max),
            rng.gen_range(-max..=max),
            rng.gen_range(-max..=max),
        )
    }

    #[inline(always)]
    fn masked(self, mask: Self) -> Self {
        self * mask
    }

    fn is_finite(self) -> bool {
        Vec3::is_finite(self)
    }

    fn into_any(self) -> AnyVelocity {
        AnyVelocity::Triple(self)
    }

    fn from_any(value: AnyVelocity) -> Option<Self> {
        match value {
            AnyVelocity::Triple(v) => Some(v),
            AnyVelocity::Planar(_) => None,
        }
    }

    fn grid_ref(field: &Field<Self>) -> VelocityGridRef<'_> {
        VelocityGridRef::Triple(field)
    }
}

/// A velocity sample of either supported width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnyVelocity {
    /// `(x, y)` flow at a square-lattice corner.
    Planar(Vec2),
    /// Flows along the top-left, vertical and top-right edges at a hex lattice point.
    Triple(Vec3),
}

impl AnyVelocity {
    /// Builds a velocity from raw components. Anything other than two or three components
    /// is a configuration error.
    pub fn from_components(components: &[f32]) -> Result<Self, ConfigError> {
        match *components {
            [x, y] => Ok(AnyVelocity::Planar(Vec2::new(x, y))),
            [x, y, z] => Ok(AnyVelocity::Triple(Vec3::new(x, y, z))),
            _ => Err(ConfigError::UnsupportedVectorWidth(components.len())),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            AnyVelocity::Planar(_) => Vec2::WIDTH,
            AnyVelocity::Triple(_) => Vec3::WIDTH,
        }
    }

    pub fn components(&self) -> Vec<f32> {
        match self {
            AnyVelocity::Planar(v) => v.to_array().to_vec(),
            AnyVelocity::Triple(v) => v.to_array().to_vec(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.components().iter().all(|&c| c == 0.0)
    }
}

/// Borrowed, width-erased view of a velocity grid.
#[derive(Debug, Clone, Copy)]
pub enum VelocityGridRef<'a> {
    Planar(&'a Field<Vec2>),
    Triple(&'a Field<Vec3>),
}

impl VelocityGridRef<'_> {
    pub fn width(&self) -> usize {
        match self {
            VelocityGridRef::Planar(_) => Vec2::WIDTH,
            VelocityGridRef::Triple(_) => Vec3::WIDTH,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            VelocityGridRef::Planar(f) => f.cols(),
            VelocityGridRef::Triple(f) => f.cols(),
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            VelocityGridRef::Planar(f) => f.rows(),
            VelocityGridRef::Triple(f) => f.rows(),
        }
    }

    /// Raw stored value, without topology masking.
    pub fn get(&self, col: i32, row: i32) -> Option<AnyVelocity> {
        match self {
            VelocityGridRef::Planar(f) => f.get(col, row).map(AnyVelocity::Planar),
            VelocityGridRef::Triple(f) => f.get(col, row).map(AnyVelocity::Triple),
        }
    }

    pub fn to_vec(&self) -> Vec<AnyVelocity> {
        match self {
            VelocityGridRef::Planar(f) => f.iter().map(|&v| AnyVelocity::Planar(v)).collect(),
            VelocityGridRef::Triple(f) => f.iter().map(|&v| AnyVelocity::Triple(v)).collect(),
        }
    }
}
