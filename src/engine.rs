//! The driver: owns one solver, repeats its steps per tick and applies interactive edits.

use crate::error::{ConfigError, EditError};
use crate::grid::Field;
use crate::params::SimulationParams;
use crate::solver::{FlowSolver, Solver};
use crate::topology::{HexEdge, LatticeSize, SquareCorner, SquareEdge, TopologyKind};
use crate::vector::{AnyVelocity, VelocityGridRef};
use glam::{IVec2, Vec2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// What a freshly built grid holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialState {
    #[default]
    Zero,
    /// Random velocities within `max_velocity`, zero pressure.
    RandomVelocity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub cols: i32,
    pub rows: i32,
    pub topology: TopologyKind,
    pub params: SimulationParams,
    /// Fixed seed for reproducible randomization, otherwise seeded from entropy.
    pub seed: Option<u64>,
    pub initial_state: InitialState,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cols: 24,
            rows: 16,
            topology: TopologyKind::CornerBased,
            params: SimulationParams::default(),
            seed: None,
            initial_state: InitialState::Zero,
        }
    }
}

/// Per-tick stepping controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub steps_per_tick: usize,
    pub update_pressure: bool,
    pub update_velocity: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            steps_per_tick: 10,
            update_pressure: true,
            update_velocity: true,
        }
    }
}

impl DriverSettings {
    /// Phases one step passes through, in order.
    pub fn phases(&self) -> Vec<StepPhase> {
        let mut phases = Vec::with_capacity(2);
        if self.update_pressure {
            phases.push(StepPhase::SteppingPressure);
        }
        if self.update_velocity {
            phases.push(StepPhase::SteppingVelocity);
        }
        phases
    }
}

/// One sweep within a step. Between steps the driver is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    SteppingPressure,
    SteppingVelocity,
}

/// Summary of one tick, sent to the viewer after every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub steps: usize,
    pub elapsed: Duration,
    pub max_divergence: f32,
    pub pressure_min: f32,
    pub pressure_max: f32,
}

/// Copy of everything needed to draw one frame.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pub kind: TopologyKind,
    pub size: LatticeSize,
    pub pressure: Vec<f32>,
    /// Velocity as the stencils see it, one entry per lattice point, row by row.
    pub velocity: Vec<AnyVelocity>,
    pub divergence: Vec<f32>,
    pub tile_uv: Vec<Vec2>,
    pub velocity_uv: Vec<Vec2>,
    pub tick: u64,
    pub paused: bool,
}

impl GridSnapshot {
    /// Tile whose centre is closest to `uv`.
    pub fn nearest_tile(&self, uv: Vec2) -> Option<IVec2> {
        let cols = self.size.cols.max(1) as usize;
        self.tile_uv
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_squared(uv).total_cmp(&b.distance_squared(uv)))
            .map(|(idx, _)| IVec2::new((idx % cols) as i32, (idx / cols) as i32))
    }
}

/// Builds the solver matching `config.topology`.
pub fn build_solver(config: &EngineConfig) -> Result<Box<dyn FlowSolver>, ConfigError> {
    let size = LatticeSize::new(config.cols, config.rows);
    let solver: Box<dyn FlowSolver> = match config.topology {
        TopologyKind::CornerBased => Box::new(Solver::new(SquareCorner::new(size), config.params)?),
        TopologyKind::EdgeBased => Box::new(Solver::new(SquareEdge::new(size), config.params)?),
        TopologyKind::HexEdgeBased => Box::new(Solver::new(HexEdge::new(size), config.params)?),
    };
    Ok(solver)
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub struct FluidEngine {
    config: EngineConfig,
    settings: DriverSettings,
    solver: Box<dyn FlowSolver>,
    rng: StdRng,
    ticks: u64,
}

impl FluidEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let solver = build_solver(&config)?;
        let mut engine = Self {
            rng: make_rng(config.seed),
            config,
            settings: DriverSettings::default(),
            solver,
            ticks: 0,
        };
        engine.apply_initial_state();
        log::info!(
            "engine ready: {} {}x{}",
            engine.config.topology,
            engine.config.cols,
            engine.config.rows
        );
        Ok(engine)
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    fn apply_initial_state(&mut self) {
        match self.config.initial_state {
            InitialState::Zero => {}
            InitialState::RandomVelocity => {
                self.solver.randomize_velocity(&mut self.rng);
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> DriverSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: DriverSettings) {
        log::debug!("driver settings: {:?}", settings);
        self.settings = settings;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn solver(&self) -> &dyn FlowSolver {
        self.solver.as_ref()
    }

    /// Replaces the grid. Nothing is carried over from the old one; on error the current
    /// grid stays in place.
    pub fn rebuild(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        let solver = build_solver(&config)?;
        if config.seed != self.config.seed || config.seed.is_some() {
            self.rng = make_rng(config.seed);
        }
        self.solver = solver;
        self.config = config;
        self.ticks = 0;
        self.apply_initial_state();
        log::debug!(
            "rebuilt {} grid {}x{}",
            self.config.topology,
            self.config.cols,
            self.config.rows
        );
        Ok(())
    }

    pub fn resize(&mut self, cols: i32, rows: i32) -> Result<(), ConfigError> {
        self.rebuild(EngineConfig {
            cols,
            rows,
            ..self.config.clone()
        })
    }

    pub fn set_topology(&mut self, topology: TopologyKind) -> Result<(), ConfigError> {
        self.rebuild(EngineConfig {
            topology,
            ..self.config.clone()
        })
    }

    /// Parameter changes keep the current state.
    pub fn set_params(&mut self, params: SimulationParams) -> Result<(), ConfigError> {
        self.solver.set_params(params)?;
        self.config.params = params;
        Ok(())
    }

    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn step_pressure(&mut self) {
        self.solver.step_pressure();
    }

    pub fn step_velocity(&mut self) {
        self.solver.step_velocity();
    }

    /// One step: the enabled phases, pressure first.
    pub fn step_once(&mut self) {
        for phase in self.settings.phases() {
            log::trace!("{:?}", phase);
            match phase {
                StepPhase::SteppingPressure => self.solver.step_pressure(),
                StepPhase::SteppingVelocity => self.solver.step_velocity(),
            }
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let start = Instant::now();
        for _ in 0..self.settings.steps_per_tick {
            self.step_once();
        }
        self.ticks += 1;
        let report = self.report(start.elapsed());
        log::debug!(
            "tick {}: {} steps in {:?}, max |div| {:.3e}",
            report.tick,
            report.steps,
            report.elapsed,
            report.max_divergence
        );
        report
    }

    fn report(&self, elapsed: Duration) -> TickReport {
        let pressure = self.solver.pressure_grid();
        let (pressure_min, pressure_max) = pressure
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });
        let max_divergence = self
            .solver
            .divergence_grid()
            .iter()
            .fold(0.0f32, |acc, d| acc.max(d.abs()));
        TickReport {
            tick: self.ticks,
            steps: self.settings.steps_per_tick,
            elapsed,
            max_divergence,
            pressure_min,
            pressure_max,
        }
    }

    pub fn randomize_grid(&mut self) {
        self.solver.randomize(&mut self.rng);
        log::info!("randomized grid");
    }

    pub fn zero_grid(&mut self) {
        self.solver.zero();
        log::info!("zeroed grid");
    }

    pub fn set_pressure_at(&mut self, col: i32, row: i32, value: f32) -> Result<(), EditError> {
        self.solver.set_pressure_at(col, row, value)
    }

    /// Adds `delta` to the stored pressure of a tile.
    pub fn nudge_pressure(&mut self, col: i32, row: i32, delta: f32) -> Result<(), EditError> {
        let current = self.solver.pressure_grid().get(col, row).unwrap_or(0.0);
        self.solver.set_pressure_at(col, row, current + delta)
    }

    pub fn set_velocity_at(
        &mut self,
        col: i32,
        row: i32,
        velocity: AnyVelocity,
    ) -> Result<(), EditError> {
        self.solver.set_velocity_at(col, row, velocity)
    }

    pub fn kind(&self) -> TopologyKind {
        self.solver.kind()
    }

    pub fn size(&self) -> LatticeSize {
        self.solver.size()
    }

    pub fn pressure_grid(&self) -> &Field<f32> {
        self.solver.pressure_grid()
    }

    pub fn velocity_grid(&self) -> VelocityGridRef<'_> {
        self.solver.velocity_grid()
    }

    pub fn divergence_grid(&self) -> &Field<f32> {
        self.solver.divergence_grid()
    }

    pub fn tile_uv(&self, col: i32, row: i32) -> Vec2 {
        self.solver.tile_uv(col, row)
    }

    pub fn velocity_uv(&self, col: i32, row: i32) -> Vec2 {
        self.solver.velocity_uv(col, row)
    }

    pub fn neighbour_indices(&self, col: i32, row: i32) -> Vec<IVec2> {
        self.solver.neighbour_indices(col, row)
    }

    pub fn snapshot(&self, paused: bool) -> GridSnapshot {
        let size = self.size();
        let tiles = (0..size.rows).flat_map(|row| (0..size.cols).map(move |col| (col, row)));
        let points =
            (0..=size.rows).flat_map(|row| (0..=size.cols).map(move |col| (col, row)));

        GridSnapshot {
            kind: self.kind(),
            size,
            pressure: self.pressure_grid().as_slice().to_vec(),
            velocity: points
                .clone()
                .map(|(col, row)| self.solver.velocity_at(col, row))
                .collect(),
            divergence: self.divergence_grid().as_slice().to_vec(),
            tile_uv: tiles.map(|(col, row)| self.tile_uv(col, row)).collect(),
            velocity_uv: points.map(|(col, row)| self.velocity_uv(col, row)).collect(),
            tick: self.ticks,
            paused,
        }
    }
}
