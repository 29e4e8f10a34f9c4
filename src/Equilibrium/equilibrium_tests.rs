//////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::Equilibrium::equilibrium_model::{build_system, parse_concentrations};
    use crate::Equilibrium::equilibrium_solver::{
        EquilibriumResult, EquilibriumSolver, calculate_equilibrium_and_ph,
    };
    use crate::Equilibrium::ph_calculator::{
        HYDROXIDE_ION_NAME, ph_from_concentration, poh_from_concentration,
    };
    use crate::Equilibrium::root_finder::RootMethod;
    use crate::Stoichiometry::balancer::balance_equation;
    use crate::errors::ChemError;
    use crate::settings::SolverSettings;
    use approx::assert_relative_eq;

    const ACETIC: &str = "HC2H3O2 = H+ + C2H3O2- ; 1.8e-5";
    const ACETIC_INITIAL: &str = "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1";

    fn assert_non_negative(result: &EquilibriumResult) {
        for (name, c) in result.concentrations.iter() {
            assert!(*c >= 0.0, "{} has negative concentration {}", name, c);
        }
    }

    #[test]
    fn test_acetic_acid_buffer() {
        let result = calculate_equilibrium_and_ph(ACETIC, ACETIC_INITIAL).unwrap();
        assert!(result.residual.abs() < 1e-12);
        assert_eq!(result.method, RootMethod::Bisection);
        assert_non_negative(&result);

        let h_plus = result.h_plus.unwrap();
        assert!(h_plus > 1e-5 && h_plus < 1e-4, "[H+] = {}", h_plus);
        assert_relative_eq!(result.ph.unwrap(), -h_plus.log10(), epsilon = 1e-12);
        assert_relative_eq!(
            result.concentrations.get("C2H3O2-"),
            0.1 + result.extent,
            epsilon = 1e-15
        );
        assert_relative_eq!(
            result.concentrations.get("HC2H3O2"),
            0.2 - result.extent,
            epsilon = 1e-15
        );
        // the law of mass action holds at the found point
        let system = build_system(ACETIC).unwrap();
        assert_relative_eq!(
            system.reaction_quotient(&result.concentrations),
            1.8e-5,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_weak_acid_without_products() {
        let result =
            calculate_equilibrium_and_ph("NH4+ = NH3 + H+ ; 5.6e-10", "NH4+:0.1").unwrap();
        assert!(result.residual.abs() < 1e-12);
        assert_non_negative(&result);
        // [H+] close to sqrt(K c)
        assert_relative_eq!(result.h_plus.unwrap(), (5.6e-11_f64).sqrt(), max_relative = 5e-3);
        assert_relative_eq!(result.concentrations.get("NH3"), result.h_plus.unwrap());
    }

    #[test]
    fn test_hydronium_counts_as_hydrogen_ion() {
        let result = calculate_equilibrium_and_ph("HA = H3O+ + A- ; 1e-3", "HA:0.1").unwrap();
        let h_plus = result.h_plus.unwrap();
        assert_relative_eq!(result.ph.unwrap(), ph_from_concentration(h_plus).unwrap());
    }

    #[test]
    fn test_reverse_direction() {
        // only product present, the reaction runs backwards to [A] = [B]
        let result = calculate_equilibrium_and_ph("A = B ; 1.0", "B:1.0").unwrap();
        assert!(result.extent < 0.0);
        assert_relative_eq!(result.extent, -0.5, epsilon = 1e-11);
        assert_relative_eq!(result.concentrations.get("A"), 0.5, epsilon = 1e-11);
        assert_eq!(result.ph, None);
        assert_eq!(result.h_plus, None);
        assert_non_negative(&result);
    }

    #[test]
    fn test_coefficient_exponents() {
        let result = calculate_equilibrium_and_ph("2 NO2 = N2O4 ; 6.9", "NO2:0.1").unwrap();
        assert!(result.residual.abs() < 1e-12 * 6.9);
        let no2 = result.concentrations.get("NO2");
        let n2o4 = result.concentrations.get("N2O4");
        assert_relative_eq!(no2 + 2.0 * n2o4, 0.1, epsilon = 1e-14);
        assert_relative_eq!(n2o4 / (no2 * no2), 6.9, max_relative = 1e-9);
    }

    #[test]
    fn test_water_autoionisation() {
        let result = calculate_equilibrium_and_ph("H2O = H+ + OH- ; 1e-14", "H2O:55.5").unwrap();
        assert!(result.residual.abs() < 1e-12 * 1e-14);
        assert!(result.extent > 0.0);
        let h_plus = result.h_plus.unwrap();
        assert_relative_eq!(h_plus, (1e-14_f64 * 55.5).sqrt(), max_relative = 1e-6);
        assert_relative_eq!(result.concentrations.get("OH-"), h_plus);
        let ph = result.ph.unwrap();
        assert!(ph > 6.12 && ph < 6.14, "pH = {}", ph);
    }

    #[test]
    fn test_very_weak_acid_still_dissociates() {
        // K far below the absolute tolerance, the initial state is not an equilibrium
        let expression = "HA = H+ + A- ; 1e-13";
        let result = calculate_equilibrium_and_ph(expression, "HA:0.1,H+:1e-7").unwrap();
        assert!(result.extent > 0.0);
        assert!(result.residual.abs() < 1e-12 * 1e-13);
        // x^2 + 1e-7 x = 1e-14 gives [H+] = 1e-7 (1 + sqrt 5) / 2
        let h_plus = result.h_plus.unwrap();
        assert_relative_eq!(h_plus, 1e-7 * (1.0 + 5f64.sqrt()) / 2.0, max_relative = 1e-5);
        assert!(result.ph.unwrap() < 7.0);
        let system = build_system(expression).unwrap();
        assert_relative_eq!(
            system.reaction_quotient(&result.concentrations),
            1e-13,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_large_equilibrium_constant() {
        // nearly complete reaction, [A] ends up close to 1 / K
        let result = calculate_equilibrium_and_ph("A + B = C ; 1e12", "A:0.1,B:0.2").unwrap();
        assert!(result.residual.abs() < 1e-12 * 1e12, "residual {}", result.residual);
        assert_non_negative(&result);
        let a = result.concentrations.get("A");
        let c = result.concentrations.get("C");
        assert_relative_eq!(a, 1e-12, max_relative = 1e-6);
        assert_relative_eq!(a + c, 0.1, epsilon = 1e-15);
        assert_relative_eq!(result.concentrations.get("B"), 0.1, epsilon = 1e-11);
        assert_relative_eq!(result.extent, 0.1, epsilon = 1e-11);
        assert_relative_eq!(c / (a * result.concentrations.get("B")), 1e12, max_relative = 1e-9);
    }

    #[test]
    fn test_weak_base_gives_hydroxide() {
        let result =
            calculate_equilibrium_and_ph("NH3 = NH4+ + OH- ; 1.8*10**-5", "NH3:0.15").unwrap();
        assert_eq!(result.ph, None);
        assert!(result.concentrations.contains(HYDROXIDE_ION_NAME));
        assert!(!result.initial.contains(HYDROXIDE_ION_NAME));
        let oh = result.concentrations.get(HYDROXIDE_ION_NAME);
        assert_relative_eq!(oh, (1.8e-5_f64 * 0.15).sqrt(), max_relative = 1e-2);
        let poh = poh_from_concentration(oh).unwrap();
        assert!(poh > 2.7 && poh < 2.9, "pOH = {}", poh);
    }

    #[test]
    fn test_spectators_are_kept() {
        let result =
            calculate_equilibrium_and_ph(ACETIC, "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1,Na+:0.1")
                .unwrap();
        assert_eq!(result.concentrations.get("Na+"), 0.1);
    }

    #[test]
    fn test_solver_keeps_its_result() {
        let mut solver = EquilibriumSolver::new();
        assert!(matches!(
            solver.solve(),
            Err(ChemError::EquilibriumSyntax { .. })
        ));
        solver.set_expression(ACETIC).unwrap();
        solver.set_concentrations(ACETIC_INITIAL).unwrap();
        let extent = solver.solve().unwrap().extent;
        assert_eq!(solver.result.as_ref().unwrap().extent, extent);
        solver.set_concentrations("HC2H3O2:0.1").unwrap();
        assert!(solver.result.is_none());
        let table = solver.solve().unwrap().table();
        assert!(table.len() >= 5);
    }

    #[test]
    fn test_errors_propagate() {
        assert!(matches!(
            calculate_equilibrium_and_ph("HC2H3O2 = H+ + C2H3O2-", ACETIC_INITIAL),
            Err(ChemError::EquilibriumSyntax { .. })
        ));
        assert!(matches!(
            calculate_equilibrium_and_ph(ACETIC, "HC2H3O2:-0.2"),
            Err(ChemError::Domain { .. })
        ));
        // nothing present on either side
        assert!(matches!(
            calculate_equilibrium_and_ph("A = B ; 1.0", ""),
            Err(ChemError::Domain { .. })
        ));
    }

    #[test]
    fn test_iteration_cap() {
        let mut settings = SolverSettings::new();
        settings.set_max_iterations(3).unwrap();
        let solver = EquilibriumSolver::with_settings(settings);
        let system = build_system(ACETIC).unwrap();
        let initial = parse_concentrations(ACETIC_INITIAL).unwrap();
        assert!(matches!(
            solver.solve_system(&system, &initial),
            Err(ChemError::NonConvergence { iterations: 3, .. })
        ));
    }

    #[test]
    fn test_ph_of_zero_is_domain_error() {
        assert!(matches!(
            ph_from_concentration(0.0),
            Err(ChemError::Domain { .. })
        ));
    }

    #[test]
    fn test_independent_calls_run_in_parallel() {
        let expected = calculate_equilibrium_and_ph(ACETIC, ACETIC_INITIAL).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let result = calculate_equilibrium_and_ph(ACETIC, ACETIC_INITIAL).unwrap();
                        let balanced = balance_equation("C3H8 + O2 -> CO2 + H2O").unwrap();
                        (result, balanced)
                    })
                })
                .collect();
            for handle in handles {
                let (result, balanced) = handle.join().unwrap();
                assert_eq!(result, expected);
                assert_eq!(balanced, "1 C3H8 + 5 O2 -> 3 CO2 + 4 H2O");
            }
        });
    }
}
