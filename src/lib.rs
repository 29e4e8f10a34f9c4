//! Chemistry calculator core: balancing of chemical equations by exact rational null space,
//! molar masses, single-equilibrium concentrations by root finding, and pH.
#[allow(non_snake_case)]
pub mod Equilibrium;
#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Stoichiometry;
pub mod errors;
pub mod settings;
