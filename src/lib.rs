//! Interactive approximation of incompressible flow on square and hexagonal lattices.
//!
//! Pressure lives on tiles and velocity on lattice points. Each step relaxes pressure
//! towards the neighbour mean minus a divergence term, then pushes velocity down the
//! pressure gradient. [`engine::FluidEngine`] drives a grid, [`runner`] moves it onto a
//! background thread and [`App`] draws it with egui.

mod app;
pub mod engine;
pub mod error;
pub mod grid;
pub mod params;
pub mod runner;
pub mod solver;
pub mod topology;
pub mod vector;
mod views;

pub use app::App;
pub use engine::{DriverSettings, EngineConfig, FluidEngine, InitialState, TickReport};
pub use error::{ConfigError, EditError, RunnerError};
pub use params::SimulationParams;
pub use topology::TopologyKind;
pub use vector::AnyVelocity;
