//! Double-buffered relaxation sweeps over one topology.
//!
//! A [`Solver`] owns the pressure and velocity fields (each with a scratch twin) plus the
//! divergence diagnostic. Every sweep reads only the current buffers, writes every slot of
//! the scratch buffer in parallel, and swaps once the parallel loop has joined.

use crate::error::{ConfigError, EditError};
use crate::grid::{DoubleBuffer, Field};
use crate::params::SimulationParams;
use crate::topology::{GridView, LatticeSize, Topology, TopologyKind};
use crate::vector::{AnyVelocity, FlowVector, VelocityGridRef};
use glam::{IVec2, Vec2};
use rand::{Rng, RngCore};
use rayon::prelude::*;
use std::time::Instant;

pub struct Solver<T: Topology> {
    topology: T,
    params: SimulationParams,
    pressure: DoubleBuffer<f32>,
    velocity: DoubleBuffer<T::Velocity>,
    divergence: Field<f32>,
}

impl<T: Topology> Solver<T> {
    /// Allocates zeroed `cols x rows` pressure and `(cols+1) x (rows+1)` velocity grids.
    pub fn new(topology: T, params: SimulationParams) -> Result<Self, ConfigError> {
        let size = topology.size();
        if size.cols <= 0 || size.rows <= 0 {
            return Err(ConfigError::EmptyLattice {
                cols: size.cols,
                rows: size.rows,
            });
        }
        let width = T::Velocity::WIDTH;
        if width != 2 && width != 3 {
            return Err(ConfigError::UnsupportedVectorWidth(width));
        }
        params.validate()?;

        let cols = size.cols as usize;
        let rows = size.rows as usize;
        log::debug!(
            "allocating {} lattice: {}x{} tiles, {}x{} lattice points",
            topology.kind(),
            cols,
            rows,
            cols + 1,
            rows + 1
        );

        Ok(Self {
            topology,
            params,
            pressure: DoubleBuffer::filled(cols, rows, 0.0),
            velocity: DoubleBuffer::filled(cols + 1, rows + 1, T::Velocity::ZERO),
            divergence: Field::filled(cols, rows, 0.0),
        })
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn view(&self) -> GridView<'_, T::Velocity> {
        GridView {
            pressure: self.pressure.current(),
            velocity: self.velocity.current(),
        }
    }

    pub fn safe_pressure(&self, col: i32, row: i32) -> f32 {
        self.view().safe_pressure(col, row)
    }

    pub fn safe_velocity(&self, col: i32, row: i32) -> T::Velocity {
        self.topology.safe_velocity(&self.view(), col, row)
    }

    pub fn pressure(&self) -> &Field<f32> {
        self.pressure.current()
    }

    pub fn velocity(&self) -> &Field<T::Velocity> {
        self.velocity.current()
    }

    pub fn divergence(&self) -> &Field<f32> {
        &self.divergence
    }

    /// Stored value for a lattice point after the validity rule and axis mask.
    fn admissible_velocity(&self, col: i32, row: i32, value: T::Velocity) -> T::Velocity {
        if self.topology.is_corner_valid(col, row) {
            value.masked(self.topology.velocity_mask(col, row))
        } else {
            T::Velocity::ZERO
        }
    }

    pub fn randomize_velocity<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let max = self.params.max_velocity;
        let field = self.velocity.current();
        let randomized: Vec<T::Velocity> = (0..field.len())
            .map(|idx| {
                let p = field.coords(idx);
                self.admissible_velocity(p.x, p.y, T::Velocity::random(rng, max))
            })
            .collect();
        self.velocity
            .current_mut()
            .as_mut_slice()
            .copy_from_slice(&randomized);
    }

    pub fn randomize_pressure<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for p in self.pressure.current_mut().as_mut_slice() {
            *p = rng.gen_range(-1.0..=1.0);
        }
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.randomize_velocity(rng);
        self.randomize_pressure(rng);
    }

    pub fn zero(&mut self) {
        self.pressure.fill(0.0);
        self.velocity.fill(T::Velocity::ZERO);
        self.divergence.fill(0.0);
    }

    /// Direct edit of the current pressure buffer.
    pub fn write_pressure(&mut self, col: i32, row: i32, value: f32) -> Result<(), EditError> {
        let size = self.topology.size();
        let result = if !value.is_finite() {
            Err(EditError::NonFinite { col, row })
        } else if !self.topology.is_tile_valid(col, row) {
            Err(EditError::OutOfRange {
                col,
                row,
                cols: size.cols,
                rows: size.rows,
            })
        } else {
            self.pressure.current_mut().set(col, row, value);
            Ok(())
        };
        if let Err(err) = &result {
            log::warn!("pressure edit rejected: {}", err);
        }
        result
    }

    /// Direct edit of the current velocity buffer. Axes blocked at that point are stored
    /// as zero.
    pub fn write_velocity(
        &mut self,
        col: i32,
        row: i32,
        value: T::Velocity,
    ) -> Result<(), EditError> {
        let result = if !value.is_finite() {
            Err(EditError::NonFinite { col, row })
        } else if !self.topology.is_corner_valid(col, row) {
            Err(EditError::InvalidCorner { col, row })
        } else {
            let stored = self.admissible_velocity(col, row, value);
            self.velocity.current_mut().set(col, row, stored);
            Ok(())
        };
        if let Err(err) = &result {
            log::warn!("velocity edit rejected: {}", err);
        }
        result
    }

    pub fn step_pressure(&mut self) {
        let start = Instant::now();
        let topology = &self.topology;
        let params = &self.params;
        let (current, scratch) = self.pressure.split();
        let grid = GridView {
            pressure: current,
            velocity: self.velocity.current(),
        };
        let cols = current.cols();

        scratch
            .as_mut_slice()
            .par_iter_mut()
            .zip(self.divergence.as_mut_slice().par_iter_mut())
            .enumerate()
            .for_each(|(idx, (pressure, divergence))| {
                let col = (idx % cols) as i32;
                let row = (idx / cols) as i32;
                let update = topology.pressure_at(&grid, params, col, row);
                *pressure = update.pressure;
                *divergence = update.divergence;
            });

        self.pressure.swap();
        log::trace!("pressure sweep: {:?}", start.elapsed());
    }

    pub fn step_velocity(&mut self) {
        let start = Instant::now();
        let topology = &self.topology;
        let params = &self.params;
        let (current, scratch) = self.velocity.split();
        let grid = GridView {
            pressure: self.pressure.current(),
            velocity: current,
        };
        let cols = current.cols();

        scratch
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, velocity)| {
                let col = (idx % cols) as i32;
                let row = (idx / cols) as i32;
                *velocity = if topology.is_corner_valid(col, row) {
                    topology
                        .velocity_at(&grid, params, col, row)
                        .masked(topology.velocity_mask(col, row))
                } else {
                    T::Velocity::ZERO
                };
            });

        self.velocity.swap();
        log::trace!("velocity sweep: {:?}", start.elapsed());
    }
}

/// Width-erased solver interface. The driver holds one of these and never inspects which
/// topology sits behind it.
pub trait FlowSolver: Send {
    fn kind(&self) -> TopologyKind;
    fn size(&self) -> LatticeSize;
    fn params(&self) -> &SimulationParams;
    fn set_params(&mut self, params: SimulationParams) -> Result<(), ConfigError>;

    fn pressure_grid(&self) -> &Field<f32>;
    fn velocity_grid(&self) -> VelocityGridRef<'_>;
    fn divergence_grid(&self) -> &Field<f32>;

    /// Pressure with the zero boundary applied.
    fn pressure_at(&self, col: i32, row: i32) -> f32;
    /// Velocity with the topology's validity rule and axis mask applied.
    fn velocity_at(&self, col: i32, row: i32) -> AnyVelocity;
    fn is_tile_valid(&self, col: i32, row: i32) -> bool;
    fn is_corner_valid(&self, col: i32, row: i32) -> bool;
    fn tile_uv(&self, col: i32, row: i32) -> Vec2;
    fn velocity_uv(&self, col: i32, row: i32) -> Vec2;
    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2>;

    fn step_pressure(&mut self);
    fn step_velocity(&mut self);
    fn randomize(&mut self, rng: &mut dyn RngCore);
    fn randomize_velocity(&mut self, rng: &mut dyn RngCore);
    fn zero(&mut self);
    fn set_pressure_at(&mut self, col: i32, row: i32, value: f32) -> Result<(), EditError>;
    fn set_velocity_at(&mut self, col: i32, row: i32, value: AnyVelocity)
        -> Result<(), EditError>;
}

impl<T: Topology + 'static> FlowSolver for Solver<T> {
    fn kind(&self) -> TopologyKind {
        self.topology.kind()
    }

    fn size(&self) -> LatticeSize {
        self.topology.size()
    }

    fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn set_params(&mut self, params: SimulationParams) -> Result<(), ConfigError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    fn pressure_grid(&self) -> &Field<f32> {
        self.pressure.current()
    }

    fn velocity_grid(&self) -> VelocityGridRef<'_> {
        T::Velocity::grid_ref(self.velocity.current())
    }

    fn divergence_grid(&self) -> &Field<f32> {
        &self.divergence
    }

    fn pressure_at(&self, col: i32, row: i32) -> f32 {
        self.safe_pressure(col, row)
    }

    fn velocity_at(&self, col: i32, row: i32) -> AnyVelocity {
        self.safe_velocity(col, row).into_any()
    }

    fn is_tile_valid(&self, col: i32, row: i32) -> bool {
        self.topology.is_tile_valid(col, row)
    }

    fn is_corner_valid(&self, col: i32, row: i32) -> bool {
        self.topology.is_corner_valid(col, row)
    }

    fn tile_uv(&self, col: i32, row: i32) -> Vec2 {
        self.topology.tile_uv(col, row)
    }

    fn velocity_uv(&self, col: i32, row: i32) -> Vec2 {
        self.topology.velocity_uv(col, row)
    }

    fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2> {
        self.topology.neighbour_indices(col, row)
    }

    fn step_pressure(&mut self) {
        Solver::step_pressure(self)
    }

    fn step_velocity(&mut self) {
        Solver::step_velocity(self)
    }

    fn randomize(&mut self, rng: &mut dyn RngCore) {
        Solver::randomize(self, rng)
    }

    fn randomize_velocity(&mut self, rng: &mut dyn RngCore) {
        Solver::randomize_velocity(self, rng)
    }

    fn zero(&mut self) {
        Solver::zero(self)
    }

    fn set_pressure_at(&mut self, col: i32, row: i32, value: f32) -> Result<(), EditError> {
        self.write_pressure(col, row, value)
    }

    fn set_velocity_at(
        &mut self,
        col: i32,
        row: i32,
        value: AnyVelocity,
    ) -> Result<(), EditError> {
        match T::Velocity::from_any(value) {
            Some(v) => self.write_velocity(col, row, v),
            None => {
                let err = EditError::WidthMismatch {
                    expected: T::Velocity::WIDTH,
                    found: value.width(),
                };
                log::warn!("velocity edit rejected: {}", err);
                Err(err)
            }
        }
    }
}
