/// Module to compile an equilibrium expression "A + B = C + D ; K" together with initial
/// concentrations into a residual function of the extent of reaction x:
/// residual(x) = K - prod [products] / prod [reactants], where reactants are consumed as c0 - x
/// and products formed as c0 + x. A leading integer coefficient ("2 NO2 = N2O4 ; 6.9") is used
/// both as the exponent in the law of mass action and as the multiplier of x.
///
///  # Examples
/// ```
/// use ChemCalc::Equilibrium::equilibrium_model::{build_system, parse_concentrations};
/// let system = build_system("HC2H3O2 = H+ + C2H3O2- ; 1.8*10**-5").unwrap();
/// assert_eq!(system.mass_action_expression(), "K = [H+][C2H3O2-] / [HC2H3O2]");
/// let initial = parse_concentrations("HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1").unwrap();
/// let (lower, upper) = system.extent_bounds(&initial);
/// assert!(lower < 0.0 && upper == 0.2);
/// let residual_at_zero = system.residual(&initial, 0.0).unwrap();
/// assert!(residual_at_zero > 0.0);
/// ```
pub mod equilibrium_model;
/// Scalar root finder: bisection over a sign-change bracket, Newton iteration from a guess
/// when no bracket exists. Every trial point stays inside the admissible interval.
/// The tolerance is relative to `ResidualFunction::residual_scale`, which is K for an equilibrium.
pub mod root_finder;
/// pH, pOH and their inverses
pub mod ph_calculator;
/// Solver tying the equilibrium model, the root finder and the pH calculator together
///
///  # Examples
/// ```
/// use ChemCalc::Equilibrium::equilibrium_solver::{EquilibriumSolver, calculate_equilibrium_and_ph};
/// let result = calculate_equilibrium_and_ph(
///     "HC2H3O2 = H+ + C2H3O2- ; 1.8e-5",
///     "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1",
/// )
/// .unwrap();
/// assert!(result.residual.abs() < 1e-12);
/// println!("pH = {:?}, [H+] = {:?}", result.ph, result.h_plus);
/// result.pretty_print();
///
/// let mut solver = EquilibriumSolver::new();
/// solver.set_expression("NH4+ = NH3 + H+ ; 5.6e-10").unwrap();
/// solver.set_concentrations("NH4+:0.1").unwrap();
/// let ph = solver.solve().unwrap().ph.unwrap();
/// assert!(ph > 5.0 && ph < 5.3);
/// ```
pub mod equilibrium_solver;
mod equilibrium_tests;
