use crate::engine::{
    DriverSettings, EngineConfig, FluidEngine, GridSnapshot, InitialState, TickReport,
};
use crate::error::RunnerError;
use crate::params::SimulationParams;
use crate::runner::{self, SimulationControlHandle};
use crate::topology::TopologyKind;
use crate::views::field_view::FieldView;
use eframe::egui;

/// Viewer state. The simulation itself runs on the runner thread; everything here is a
/// local copy of what was last sent to it or received from it.
pub struct App {
    handle: Option<SimulationControlHandle>,
    config: EngineConfig,
    settings: DriverSettings,
    params: SimulationParams,
    paused: bool,
    snapshot: Option<GridSnapshot>,
    last_report: Option<TickReport>,
    field_view: FieldView,
    status: String,
}

impl Default for App {
    fn default() -> Self {
        let config = EngineConfig {
            initial_state: InitialState::RandomVelocity,
            ..Default::default()
        };
        let settings = DriverSettings::default();
        let (handle, status) = match FluidEngine::new(config.clone()) {
            Ok(engine) => (
                Some(runner::spawn(engine.with_settings(settings), true)),
                "Paused".to_owned(),
            ),
            Err(err) => (None, format!("Could not start simulation: {}", err)),
        };
        Self {
            handle,
            params: config.params,
            config,
            settings,
            paused: true,
            snapshot: None,
            last_report: None,
            field_view: FieldView::default(),
            status,
        }
    }
}

impl App {
    pub fn new(_cc: &eframe::CreationContext) -> Self {
        Self::default()
    }

    /// Runs `action` against the runner, dropping the handle once the thread is gone.
    fn with_handle(
        &mut self,
        action: impl FnOnce(&SimulationControlHandle) -> Result<(), RunnerError>,
    ) {
        let Some(handle) = &self.handle else {
            return;
        };
        if let Err(err) = action(handle) {
            log::error!("{}", err);
            self.status = err.to_string();
            self.handle = None;
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.paused {
                if ui.button("Start").clicked() {
                    self.paused = false;
                    self.with_handle(|h| h.resume());
                }
            } else if ui.button("Pause").clicked() {
                self.paused = true;
                self.with_handle(|h| h.pause());
            }
            if ui
                .add_enabled(self.paused, egui::Button::new("Step"))
                .clicked()
            {
                self.with_handle(|h| h.step_once());
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Randomize").clicked() {
                self.with_handle(|h| h.randomize());
            }
            if ui.button("Zero").clicked() {
                self.with_handle(|h| h.zero());
            }
        });

        ui.separator();
        ui.label("Grid");
        let mut rebuild = false;
        egui::ComboBox::from_label("Topology")
            .selected_text(self.config.topology.display_name())
            .show_ui(ui, |ui| {
                for &kind in TopologyKind::all() {
                    rebuild |= ui
                        .selectable_value(&mut self.config.topology, kind, kind.display_name())
                        .changed();
                }
            });
        rebuild |= ui
            .add(egui::Slider::new(&mut self.config.cols, 1..=96).text("Columns"))
            .changed();
        rebuild |= ui
            .add(egui::Slider::new(&mut self.config.rows, 1..=64).text("Rows"))
            .changed();
        if rebuild {
            let config = self.config.clone();
            self.with_handle(|h| h.rebuild(config));
        }

        ui.separator();
        ui.label("Stepping");
        let mut settings = self.settings;
        ui.add(egui::Slider::new(&mut settings.steps_per_tick, 1..=100).text("Steps per tick"));
        ui.checkbox(&mut settings.update_pressure, "Update pressure");
        ui.checkbox(&mut settings.update_velocity, "Update velocity");
        if settings != self.settings {
            self.settings = settings;
            self.with_handle(|h| h.set_settings(settings));
        }

        ui.separator();
        ui.label("Simulation Parameters");
        let mut params = self.params;
        ui.add(
            egui::Slider::new(&mut params.time_step, 0.0..=1.0)
                .text("Time Step")
                .logarithmic(true),
        );
        ui.add(egui::Slider::new(&mut params.density, 0.01..=10.0).text("Density"));
        ui.add(egui::Slider::new(&mut params.cell_size, 0.01..=10.0).text("Cell Size"));
        ui.add(egui::Slider::new(&mut params.viscosity, 0.0..=1.0).text("Viscosity"));
        ui.add(egui::Slider::new(&mut params.max_velocity, 0.0..=20.0).text("Max Velocity"));
        if params != self.params {
            self.params = params;
            self.config.params = params;
            self.with_handle(|h| h.set_params(params));
        }

        ui.separator();
        ui.label("Display");
        ui.checkbox(&mut self.field_view.show_velocity, "Show velocity");
        ui.add(
            egui::Slider::new(&mut self.field_view.arrow_scale, 0.01..=1.0).text("Arrow scale"),
        );
        ui.add(
            egui::Slider::new(&mut self.field_view.palette.saturation, 0.1..=100.0)
                .text("Pressure range")
                .logarithmic(true),
        );
        ui.add(
            egui::Slider::new(&mut self.field_view.click_strength, 0.1..=50.0)
                .text("Click strength"),
        );
        ui.small("Left click raises tile pressure, right click lowers it.");
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(handle) = &self.handle {
            if let Some(snapshot) = handle.get_last_available_snapshot() {
                self.snapshot = Some(snapshot);
            }
            if let Some(report) = handle.get_new_reports().pop() {
                self.last_report = Some(report);
            }
        }
        self.with_handle(|h| h.request_snapshot());

        egui::SidePanel::left("control_panel").show(ctx, |ui| {
            ui.vertical(|ui| self.controls(ui));
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            let text = match &self.last_report {
                Some(report) => format!(
                    "{} | Tick: {}, Steps: {}, Tick time: {:?}, Max |div|: {:.3e}, Pressure: [{:.3}, {:.3}]",
                    self.status,
                    report.tick,
                    report.steps,
                    report.elapsed,
                    report.max_divergence,
                    report.pressure_min,
                    report.pressure_max,
                ),
                None => self.status.clone(),
            };
            ui.label(text);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(snapshot) = &self.snapshot else {
                ui.label("Waiting for simulation...");
                return;
            };
            if let Some(edit) = self.field_view.show(ui, snapshot) {
                let (col, row, delta) = (edit.tile.x, edit.tile.y, edit.delta);
                self.with_handle(|h| h.nudge_pressure(col, row, delta));
            }
        });

        if self.handle.is_some() {
            self.status = if self.paused { "Paused" } else { "Running" }.to_owned();
        }

        // Keep polling the runner for fresh snapshots.
        ctx.request_repaint();
    }
}
