use super::equilibrium_model::{
    ConcentrationState, EquilibriumSystem, build_system, parse_concentrations,
};
use super::ph_calculator::{HYDROGEN_ION_NAMES, ph_from_concentration};
use super::root_finder::{RootFinder, RootMethod, RootReport};
use crate::errors::{ChemError, ChemResult};
use crate::settings::SolverSettings;
use log::{debug, info};
use prettytable::{Table, row};

/// Equilibrium concentrations of every species and, for acid-base systems, the pH
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumResult {
    pub extent: f64,
    pub initial: ConcentrationState,
    pub concentrations: ConcentrationState,
    pub residual: f64,
    pub iterations: usize,
    pub method: RootMethod,
    /// present when H+ (or H3O+) takes part in the equilibrium
    pub ph: Option<f64>,
    pub h_plus: Option<f64>,
}

impl EquilibriumResult {
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["species", "initial, mol/L", "equilibrium, mol/L"]);
        for (name, c) in self.concentrations.iter() {
            table.add_row(row![name, format!("{:e}", self.initial.get(name)), format!("{:e}", c)]);
        }
        table.add_row(row!["extent", "", format!("{:e}", self.extent)]);
        table.add_row(row!["residual", "", format!("{:e}", self.residual)]);
        if let (Some(ph), Some(h_plus)) = (self.ph, self.h_plus) {
            table.add_row(row!["[H+]", "", format!("{:e}", h_plus)]);
            table.add_row(row!["pH", "", format!("{:.4}", ph)]);
        }
        table
    }

    pub fn pretty_print(&self) {
        println!(
            "__________equilibrium found by {} in {} iterations__________",
            self.method, self.iterations
        );
        self.table().printstd();
    }
}

// restarts from the partially reacted state after a bracket collapse
const MAX_RESTARTS: usize = 3;

/// Takes an equilibrium expression and initial concentrations, finds the extent at which
/// K - Q vanishes and derives the equilibrium concentrations and pH.
#[derive(Debug, Clone, Default)]
pub struct EquilibriumSolver {
    pub settings: SolverSettings,
    pub system: Option<EquilibriumSystem>,
    pub initial: ConcentrationState,
    pub result: Option<EquilibriumResult>,
}

impl EquilibriumSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SolverSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// "HC2H3O2 = H+ + C2H3O2- ; 1.8e-5"
    pub fn set_expression(&mut self, expression: &str) -> ChemResult<()> {
        self.system = Some(build_system(expression)?);
        self.result = None;
        Ok(())
    }

    /// "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1"
    pub fn set_concentrations(&mut self, concentrations: &str) -> ChemResult<()> {
        self.initial = parse_concentrations(concentrations)?;
        self.result = None;
        Ok(())
    }

    pub fn set_initial_state(&mut self, initial: ConcentrationState) {
        self.initial = initial;
        self.result = None;
    }

    /// solves the stored system and keeps the result
    pub fn solve(&mut self) -> ChemResult<&EquilibriumResult> {
        let system = self
            .system
            .as_ref()
            .ok_or_else(|| ChemError::equilibrium("", "no equilibrium expression was set"))?;
        let result = self.solve_system(system, &self.initial)?;
        let stored: &EquilibriumResult = self.result.insert(result);
        Ok(stored)
    }

    // When K is far from 1 the root sits next to an end of the extent interval, where the
    // floats around it are too coarse for a K-relative residual and the bracket collapses.
    // Extents are then accumulated from the state reached so far, whose remaining extent is
    // small and finely resolved.
    fn find_extent(
        &self,
        system: &EquilibriumSystem,
        initial: &ConcentrationState,
    ) -> ChemResult<(RootReport, ConcentrationState)> {
        let finder = RootFinder::with_settings(self.settings.clone());
        let mut reference = initial.clone();
        let mut extent = 0.0;
        let mut iterations = 0;
        let mut restarts = 0;
        loop {
            let outcome = {
                let residual_function = system.bind(&reference);
                finder.find_root(&residual_function)
            };
            match outcome {
                Ok(report) => {
                    let concentrations = system.concentrations_at(&reference, report.extent)?;
                    let report = RootReport {
                        extent: extent + report.extent,
                        iterations: iterations + report.iterations,
                        ..report
                    };
                    return Ok((report, concentrations));
                }
                Err(ChemError::NonConvergence {
                    iterations: used,
                    extent: partial,
                    ..
                }) if used < self.settings.max_iterations
                    && restarts < MAX_RESTARTS
                    && partial != 0.0 =>
                {
                    restarts += 1;
                    debug!(
                        "bracket collapsed at extent {:e}, restarting from the reacted state",
                        extent + partial
                    );
                    reference = system.concentrations_at(&reference, partial)?;
                    extent += partial;
                    iterations += used;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Solves `system` from `initial` without touching the solver state
    pub fn solve_system(
        &self,
        system: &EquilibriumSystem,
        initial: &ConcentrationState,
    ) -> ChemResult<EquilibriumResult> {
        info!(
            "solving {} ({}) from {:?}",
            system,
            system.mass_action_expression(),
            initial
        );
        let (report, concentrations) = self.find_extent(system, initial)?;
        let hydrogen = HYDROGEN_ION_NAMES
            .iter()
            .copied()
            .find(|name| system.has_species(name));
        let (ph, h_plus) = match hydrogen {
            Some(name) => {
                let h_plus = concentrations.get(name);
                (Some(ph_from_concentration(h_plus)?), Some(h_plus))
            }
            None => (None, None),
        };
        info!(
            "equilibrium extent {:e} after {} {} iterations, residual {:e}",
            report.extent, report.iterations, report.method, report.residual
        );
        Ok(EquilibriumResult {
            extent: report.extent,
            initial: initial.clone(),
            concentrations,
            residual: report.residual,
            iterations: report.iterations,
            method: report.method,
            ph,
            h_plus,
        })
    }
}

/// One-call equilibrium and pH:
/// `calculate_equilibrium_and_ph("HC2H3O2 = H+ + C2H3O2- ; 1.8e-5", "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1")`
pub fn calculate_equilibrium_and_ph(
    expression: &str,
    concentrations: &str,
) -> ChemResult<EquilibriumResult> {
    let mut solver = EquilibriumSolver::new();
    solver.set_expression(expression)?;
    solver.set_concentrations(concentrations)?;
    solver.solve().cloned()
}
