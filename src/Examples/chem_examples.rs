use crate::Equilibrium::equilibrium_model::{build_system, parse_concentrations};
use crate::Equilibrium::equilibrium_solver::{EquilibriumSolver, calculate_equilibrium_and_ph};
use crate::Equilibrium::ph_calculator::{
    HYDROXIDE_ION_NAME, h_plus_from_ph, poh_from_concentration,
};
use crate::Stoichiometry::balancer::balance_equation;
use crate::Stoichiometry::molmass::{calculate_molar_mass, composition_table};
use crate::Stoichiometry::reaction_parser::parse_reaction;
use crate::Stoichiometry::species::Species;
use crate::settings::SolverSettings;
use log::error;

pub fn chem_examples(task: usize) {
    match task {
        0 => {
            // balancing
            for equation in [
                "H2 + O2 -> H2O",
                "KMnO4 + HCl -> KCl + MnCl2 + H2O + Cl2",
                "MnO4- + Fe+2 + H+ -> Mn+2 + Fe+3 + H2O",
                "Na -> Cl",
                "H2 + O2 -> H2O + H2O2",
            ] {
                match balance_equation(equation) {
                    Ok(balanced) => println!("{}  =>  {}", equation, balanced),
                    Err(e) => error!("{}", e),
                }
            }
        }
        1 => {
            // parsed reaction, its species and their molar masses
            let reaction = parse_reaction("C6H12O6 + O2 -> CO2 + H2O").unwrap();
            let balanced = reaction.balanced().unwrap();
            println!("input: {}", reaction.original());
            println!("balanced: {}, check: {}", balanced, balanced.is_balanced());
            for term in balanced.reactants.iter().chain(balanced.products.iter()) {
                println!(
                    "{} x {}: {:.3} g/mol",
                    term.coefficient,
                    term.species.unicode_name(),
                    term.species.molar_mass().unwrap()
                );
            }
        }
        2 => {
            // molar mass and composition
            let (molar_mass, composition) = calculate_molar_mass("K4[Fe(CN)6]").unwrap();
            println!("K4[Fe(CN)6]: {:.3} g/mol, {:?}", molar_mass, composition);
            let ion = Species::new("Fe(CN)6-3").unwrap();
            println!("{} has charge {}", ion.unicode_name(), ion.charge());
            composition_table(&["H2O", "Ca(OH)2", "SO4^2-", "NH4+"])
                .unwrap()
                .printstd();
        }
        3 => {
            // acetic acid / acetate buffer
            let expression = "HC2H3O2 = H+ + C2H3O2- ; 1.8e-5";
            let system = build_system(expression).unwrap();
            println!("{}", system.mass_action_expression());
            let result =
                calculate_equilibrium_and_ph(expression, "HC2H3O2:0.2,H+:1e-7,C2H3O2-:0.1").unwrap();
            result.pretty_print();
            let ph = result.ph.unwrap();
            println!("pOH = {:.4}", 14.0 - ph);
            println!("[H+] back from pH: {:e}", h_plus_from_ph(ph).unwrap());
        }
        4 => {
            // weak base with custom solver settings
            let mut settings = SolverSettings::new();
            settings.set_tolerance(1e-14).unwrap();
            let mut solver = EquilibriumSolver::with_settings(settings);
            solver
                .set_expression("NH3 = NH4+ + OH- ; 1.8*10**-5")
                .unwrap();
            let initial = parse_concentrations("NH3:0.15").unwrap();
            solver.set_initial_state(initial);
            let result = solver.solve().unwrap();
            result.pretty_print();
            if result.concentrations.contains(HYDROXIDE_ION_NAME) {
                let oh = result.concentrations.get(HYDROXIDE_ION_NAME);
                println!("pOH = {:.4}", poh_from_concentration(oh).unwrap());
            }
        }
        5 => {
            // dimerisation with a coefficient
            let result = calculate_equilibrium_and_ph("2 NO2 = N2O4 ; 6.9", "NO2:0.1").unwrap();
            result.pretty_print();
        }
        _ => {
            println!("no such task");
        }
    }
}
