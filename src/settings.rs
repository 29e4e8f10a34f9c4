//! # Settings Module
//!
//! ## Purpose
//! Holds the numerical settings of the equilibrium root finder and persists them as JSON,
//! so that a calculator front end can tune convergence without recompiling.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "tolerance": 1e-12,
//!   "max_iterations": 200,
//!   "derivative_floor": 1e-30,
//!   "finite_difference_step": 1e-8,
//!   "allow_newton_fallback": true
//! }
//! ```
//! Missing keys take their default values.
//!
//! ## Usage Pattern
//! ```rust
//! use ChemCalc::settings::SolverSettings;
//!
//! let mut settings = SolverSettings::new();
//! settings.set_tolerance(1e-10).unwrap();
//! settings.set_max_iterations(500).unwrap();
//! assert_eq!(settings.max_iterations, 500);
//! ```

use crate::errors::{ChemError, ChemResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Numerical settings of the root finder.
///
/// # Fields
/// * `tolerance` - convergence threshold on the residual, relative to its scale (K for an equilibrium)
/// * `max_iterations` - iteration cap, exceeding it is a convergence failure
/// * `derivative_floor` - Newton steps are refused when |f'(x)| falls below this value
/// * `finite_difference_step` - relative step of the numerical derivative
/// * `allow_newton_fallback` - use Newton iteration when no sign-change bracket exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub derivative_floor: f64,
    pub finite_difference_step: f64,
    pub allow_newton_fallback: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            derivative_floor: 1e-30,
            finite_difference_step: 1e-8,
            allow_newton_fallback: true,
        }
    }
}

impl SolverSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a JSON file.
    ///
    /// A missing file is not an error: the defaults are returned and a warning is logged.
    ///
    /// # Returns
    /// * `Ok(SolverSettings)` - loaded (and validated) or default settings
    /// * `Err(ChemError)` - the file exists but cannot be read, parsed or holds invalid values
    pub fn from_json_file(path: &str) -> ChemResult<Self> {
        if !Path::new(path).exists() {
            warn!("settings file '{}' not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: SolverSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        info!("solver settings loaded from '{}'", path);
        Ok(settings)
    }

    /// Writes the settings as pretty-printed JSON.
    pub fn save_to_json_file(&self, path: &str) -> ChemResult<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ChemResult<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ChemError::Settings(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ChemError::Settings(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.derivative_floor >= 0.0 && self.derivative_floor.is_finite()) {
            return Err(ChemError::Settings(format!(
                "derivative_floor must be non-negative, got {}",
                self.derivative_floor
            )));
        }
        if !(self.finite_difference_step > 0.0 && self.finite_difference_step < 1.0) {
            return Err(ChemError::Settings(format!(
                "finite_difference_step must lie in (0, 1), got {}",
                self.finite_difference_step
            )));
        }
        Ok(())
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> ChemResult<()> {
        let previous = self.tolerance;
        self.tolerance = tolerance;
        self.validate().inspect_err(|_| self.tolerance = previous)
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> ChemResult<()> {
        let previous = self.max_iterations;
        self.max_iterations = max_iterations;
        self.validate()
            .inspect_err(|_| self.max_iterations = previous)
    }
}
