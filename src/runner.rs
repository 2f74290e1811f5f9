//! Background simulation thread.
//!
//! The engine lives on its own thread and is driven through a command channel. Commands are
//! drained at the start of every frame, so edits always land between two ticks and are
//! applied in the order they were sent.

use crate::engine::{DriverSettings, EngineConfig, FluidEngine, GridSnapshot, TickReport};
use crate::error::RunnerError;
use crate::params::SimulationParams;
use crate::vector::AnyVelocity;
use std::{
    sync::mpsc::{self, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Target frame length of the simulation loop.
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub enum Command {
    Stop,
    GetSnapshot,
    Pause,
    Resume,
    /// Run one tick, also while paused.
    StepOnce,
    SetSettings(DriverSettings),
    SetParams(SimulationParams),
    Rebuild(EngineConfig),
    Randomize,
    Zero,
    SetPressure { col: i32, row: i32, value: f32 },
    NudgePressure { col: i32, row: i32, delta: f32 },
    SetVelocity { col: i32, row: i32, velocity: AnyVelocity },
}

pub struct SimulationControlHandle {
    command_sender: mpsc::Sender<Command>,
    snapshot_receiver: mpsc::Receiver<GridSnapshot>,
    report_receiver: mpsc::Receiver<TickReport>,
    worker: Option<JoinHandle<()>>,
}

impl SimulationControlHandle {
    pub fn send(&self, command: Command) -> Result<(), RunnerError> {
        self.command_sender
            .send(command)
            .map_err(|_| RunnerError::Disconnected)
    }

    pub fn stop(&self) -> Result<(), RunnerError> {
        self.send(Command::Stop)
    }

    pub fn request_snapshot(&self) -> Result<(), RunnerError> {
        self.send(Command::GetSnapshot)
    }

    pub fn pause(&self) -> Result<(), RunnerError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), RunnerError> {
        self.send(Command::Resume)
    }

    pub fn step_once(&self) -> Result<(), RunnerError> {
        self.send(Command::StepOnce)
    }

    pub fn set_settings(&self, settings: DriverSettings) -> Result<(), RunnerError> {
        self.send(Command::SetSettings(settings))
    }

    pub fn set_params(&self, params: SimulationParams) -> Result<(), RunnerError> {
        self.send(Command::SetParams(params))
    }

    pub fn rebuild(&self, config: EngineConfig) -> Result<(), RunnerError> {
        self.send(Command::Rebuild(config))
    }

    pub fn randomize(&self) -> Result<(), RunnerError> {
        self.send(Command::Randomize)
    }

    pub fn zero(&self) -> Result<(), RunnerError> {
        self.send(Command::Zero)
    }

    pub fn nudge_pressure(&self, col: i32, row: i32, delta: f32) -> Result<(), RunnerError> {
        self.send(Command::NudgePressure { col, row, delta })
    }

    pub fn get_last_available_snapshot(&self) -> Option<GridSnapshot> {
        let mut last_snapshot = None;
        loop {
            match self.snapshot_receiver.try_recv() {
                Ok(snapshot) => last_snapshot = Some(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        last_snapshot
    }

    /// Blocks until the next snapshot arrives or `timeout` runs out.
    pub fn wait_for_snapshot(
        &self,
        timeout: Duration,
    ) -> Result<Option<GridSnapshot>, RunnerError> {
        match self.snapshot_receiver.recv_timeout(timeout) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(RunnerError::Disconnected),
        }
    }

    pub fn get_new_reports(&self) -> Vec<TickReport> {
        self.report_receiver.try_iter().collect()
    }

    /// Stops the thread and waits for it to exit.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        // A closed channel means the thread is already gone.
        let _ = self.command_sender.send(Command::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulationControlHandle {
    fn drop(&mut self) {
        self.join();
    }
}

/// What the loop should do after a command.
enum Flow {
    Continue,
    Stop,
}

struct Worker {
    engine: FluidEngine,
    paused: bool,
    snapshot_sender: mpsc::Sender<GridSnapshot>,
    report_sender: mpsc::Sender<TickReport>,
}

impl Worker {
    fn handle(&mut self, command: Command, snapshot_sent: &mut bool) -> Flow {
        match command {
            Command::Stop => return Flow::Stop,
            Command::GetSnapshot => {
                if !*snapshot_sent {
                    let snapshot = self.engine.snapshot(self.paused);
                    if self.snapshot_sender.send(snapshot).is_err() {
                        return Flow::Stop;
                    }
                    *snapshot_sent = true;
                }
            }
            Command::Pause => self.paused = true,
            Command::Resume => self.paused = false,
            Command::StepOnce => return self.tick(),
            Command::SetSettings(settings) => self.engine.set_settings(settings),
            Command::SetParams(params) => {
                if let Err(err) = self.engine.set_params(params) {
                    log::error!("parameters rejected: {}", err);
                }
            }
            Command::Rebuild(config) => {
                if let Err(err) = self.engine.rebuild(config) {
                    log::error!("rebuild rejected, keeping current grid: {}", err);
                }
            }
            Command::Randomize => self.engine.randomize_grid(),
            Command::Zero => self.engine.zero_grid(),
            // Edit failures are already logged by the solver.
            Command::SetPressure { col, row, value } => {
                let _ = self.engine.set_pressure_at(col, row, value);
            }
            Command::NudgePressure { col, row, delta } => {
                let _ = self.engine.nudge_pressure(col, row, delta);
            }
            Command::SetVelocity { col, row, velocity } => {
                let _ = self.engine.set_velocity_at(col, row, velocity);
            }
        }
        Flow::Continue
    }

    fn tick(&mut self) -> Flow {
        let report = self.engine.tick();
        if self.report_sender.send(report).is_err() {
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn run(mut self, command_receiver: mpsc::Receiver<Command>) {
        'simulation: loop {
            let start = Instant::now();

            let mut snapshot_sent = false;
            loop {
                match command_receiver.try_recv() {
                    Ok(command) => {
                        if let Flow::Stop = self.handle(command, &mut snapshot_sent) {
                            break 'simulation;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'simulation,
                }
            }

            if !self.paused {
                if let Flow::Stop = self.tick() {
                    break;
                }
                log::trace!("frame time: {:?}", start.elapsed());
            }

            if let Some(rest) = FRAME.checked_sub(start.elapsed()) {
                thread::sleep(rest);
            }
        }
        log::info!("simulation thread stopped after {} ticks", self.engine.ticks());
    }
}

/// Moves `engine` onto a new thread and returns the handle that controls it.
pub fn spawn(engine: FluidEngine, start_paused: bool) -> SimulationControlHandle {
    let (command_sender, command_receiver) = mpsc::channel();
    let (snapshot_sender, snapshot_receiver) = mpsc::channel();
    let (report_sender, report_receiver) = mpsc::channel();

    let worker = Worker {
        engine,
        paused: start_paused,
        snapshot_sender,
        report_sender,
    };
    let worker = thread::spawn(move || worker.run(command_receiver));

    SimulationControlHandle {
        command_sender,
        snapshot_receiver,
        report_receiver,
        worker: Some(worker),
    }
}
