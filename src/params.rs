use crate::error::ConfigError;

/// Scalar knobs shared read-only by every stencil evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Carried for the viewer, the relaxation step does not use it.
    pub viscosity: f32,
    pub time_step: f32,
    pub density: f32,
    pub cell_size: f32,
    /// Per-axis bound used when randomizing velocities.
    pub max_velocity: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            viscosity: 0.1,
            time_step: 1.0 / 60.0,
            density: 1.0,
            cell_size: 1.0,
            max_velocity: 5.0,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |name: &'static str, value: f32, ok: bool| {
            if value.is_finite() && ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter { name, value })
            }
        };
        check("viscosity", self.viscosity, self.viscosity >= 0.0)?;
        check("time_step", self.time_step, self.time_step >= 0.0)?;
        check("density", self.density, self.density > 0.0)?;
        check("cell_size", self.cell_size, self.cell_size > 0.0)?;
        // Randomization samples from [-max, max]; the span itself must stay finite.
        check(
            "max_velocity",
            self.max_velocity,
            self.max_velocity >= 0.0 && (2.0 * self.max_velocity).is_finite(),
        )?;
        if self.time_step > 0.0 {
            check(
                "time_step",
                self.time_step,
                self.gradient_scale().is_finite()
                    && (self.density * self.cell_size / self.time_step).is_finite(),
            )?;
        }
        Ok(())
    }

    /// `time_step / (density * cell_size)`, the factor applied to pressure gradients.
    #[inline(always)]
    pub fn gradient_scale(&self) -> f32 {
        self.time_step / (self.density * self.cell_size)
    }

    /// `density * cell_size * divergence / time_step`. With a zero time step the term is
    /// undefined and is dropped, leaving pure neighbour relaxation.
    #[inline(always)]
    pub fn divergence_forcing(&self, divergence: f32) -> f32 {
        if self.time_step > 0.0 {
            self.density * self.cell_size * divergence / self.time_step
        } else {
            0.0
        }
    }

    /// The shared pressure relaxation contract.
    #[inline(always)]
    pub fn relax_pressure(&self, neighbour_sum: f32, divergence: f32, neighbour_count: f32) -> f32 {
        (neighbour_sum - self.divergence_forcing(divergence)) / neighbour_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_density_rejected() {
        let params = SimulationParams {
            density: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "density", .. })
        ));
    }

    #[test]
    fn test_nan_time_step_rejected() {
        let params = SimulationParams {
            time_step: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "time_step", .. })
        ));
    }

    #[test]
    fn test_overflowing_velocity_bound_rejected() {
        let params = SimulationParams {
            max_velocity: f32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "max_velocity", .. })
        ));
        let params = SimulationParams {
            max_velocity: f32::MAX / 4.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_subnormal_time_step_rejected() {
        let params = SimulationParams {
            time_step: 1e-45,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "time_step", .. })
        ));
        let params = SimulationParams {
            time_step: 1e-6,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert!(params.divergence_forcing(1.0).is_finite());
    }

    #[test]
    fn test_zero_time_step_drops_forcing() {
        let params = SimulationParams {
            time_step: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.divergence_forcing(3.0), 0.0);
        assert_eq!(params.gradient_scale(), 0.0);
        assert_eq!(params.relax_pressure(8.0, 5.0, 4.0), 2.0);
    }

    #[test]
    fn test_relax_pressure_matches_contract() {
        let params = SimulationParams {
            time_step: 0.5,
            density: 2.0,
            cell_size: 1.5,
            ..Default::default()
        };
        // (4 - 2 * 1.5 * 1 / 0.5) / 8
        let p = params.relax_pressure(4.0, 1.0, 8.0);
        assert!((p - (-0.25)).abs() < 1e-6);
        assert!((params.gradient_scale() - 0.5 / 3.0).abs() < 1e-6);
    }
}
