//////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::Stoichiometry::balancer::{StoichiometricMatrix, balance, balance_equation};
    use crate::Stoichiometry::reaction_parser::{Reaction, parse_reaction};
    use crate::Stoichiometry::species::Species;
    use crate::errors::ChemError;

    fn gcd(a: u64, b: u64) -> u64 {
        if b == 0 { a } else { gcd(b, a % b) }
    }

    fn balanced_coefficients(equation: &str) -> Vec<u64> {
        let reaction = parse_reaction(equation).unwrap();
        balance(&reaction.reactant_species(), &reaction.product_species()).unwrap()
    }

    #[test]
    fn test_water() {
        assert_eq!(balanced_coefficients("H2 + O2 -> H2O"), vec![2, 1, 2]);
        assert_eq!(
            balance_equation("H2 + O2 -> H2O").unwrap(),
            "2 H2 + 1 O2 -> 2 H2O"
        );
    }

    #[test]
    fn test_textbook_reactions() {
        let cases: Vec<(&str, Vec<u64>)> = vec![
            ("CH4 + O2 -> CO2 + H2O", vec![1, 2, 1, 2]),
            ("Fe + O2 -> Fe2O3", vec![4, 3, 2]),
            ("C3H8 + O2 -> CO2 + H2O", vec![1, 5, 3, 4]),
            ("Al + H2SO4 -> Al2(SO4)3 + H2", vec![2, 3, 1, 3]),
            (
                "KMnO4 + HCl -> KCl + MnCl2 + H2O + Cl2",
                vec![2, 16, 2, 2, 8, 5],
            ),
            (
                "K4Fe(CN)6 + KMnO4 + H2SO4 -> KHSO4 + Fe2(SO4)3 + MnSO4 + HNO3 + CO2 + H2O",
                vec![10, 122, 299, 162, 5, 122, 60, 60, 188],
            ),
        ];
        for (equation, expected) in cases {
            assert_eq!(balanced_coefficients(equation), expected, "{}", equation);
        }
    }

    #[test]
    fn test_ionic_reactions_conserve_charge() {
        assert_eq!(balanced_coefficients("Fe+3 + OH- -> Fe(OH)3"), vec![1, 3, 1]);
        assert_eq!(
            balanced_coefficients("MnO4- + Fe+2 + H+ -> Mn+2 + Fe+3 + H2O"),
            vec![1, 5, 8, 1, 5, 4]
        );
    }

    #[test]
    fn test_conservation_and_minimality() {
        let equations = [
            "H2 + O2 -> H2O",
            "C6H12O6 + O2 -> CO2 + H2O",
            "Ca3(PO4)2 + SiO2 + C -> CaSiO3 + P4 + CO",
            "Cu + HNO3 -> Cu(NO3)2 + NO + H2O",
            "NH3 + O2 -> NO + H2O",
        ];
        for equation in equations {
            let reaction = parse_reaction(equation).unwrap();
            let balanced = reaction.balanced().unwrap();
            assert!(balanced.is_balanced(), "{}", balanced);
            let coefficients = balanced.coefficients();
            assert!(coefficients.iter().all(|&c| c > 0));
            assert_eq!(coefficients.iter().fold(0, |acc, &c| gcd(acc, c)), 1);
            let matrix = StoichiometricMatrix::new(
                &reaction.reactant_species(),
                &reaction.product_species(),
            );
            assert!(matrix.conserves(&coefficients));
        }
    }

    #[test]
    fn test_input_coefficients_are_ignored() {
        let reaction = parse_reaction("7 H2 + 3 O2 -> 5 H2O").unwrap();
        assert_eq!(reaction.balanced().unwrap().coefficients(), vec![2, 1, 2]);
        // the parsed reaction still carries what the user typed
        assert_eq!(reaction.coefficients(), vec![7, 3, 5]);
    }

    #[test]
    fn test_deterministic() {
        let reactants: Vec<Species> = ["C3H8", "O2"].iter().map(|f| f.parse().unwrap()).collect();
        let products: Vec<Species> = ["CO2", "H2O"].iter().map(|f| f.parse().unwrap()).collect();
        let first = balance(&reactants, &products).unwrap();
        for _ in 0..10 {
            assert_eq!(balance(&reactants, &products).unwrap(), first);
        }
    }

    #[test]
    fn test_round_trip() {
        let balanced = balance_equation("Cu + HNO3 -> Cu(NO3)2 + NO + H2O").unwrap();
        assert_eq!(balanced, "3 Cu + 8 HNO3 -> 3 Cu(NO3)2 + 2 NO + 4 H2O");
        let reparsed: Reaction = balanced.parse().unwrap();
        assert_eq!(reparsed.coefficients(), vec![3, 8, 3, 2, 4]);
        assert_eq!(
            reparsed.balanced().unwrap().coefficients(),
            reparsed.coefficients()
        );
    }

    #[test]
    fn test_unbalancable() {
        let result = balance_equation("Na -> Cl");
        assert!(matches!(result, Err(ChemError::Unbalancable { .. })));
        // only solution gives O2 a zero coefficient
        let result = balance_equation("H2 -> H2 + O2");
        assert!(matches!(result, Err(ChemError::Unbalancable { .. })));
    }

    #[test]
    fn test_ambiguous() {
        let result = balance_equation("H2 + O2 -> H2O + H2O2");
        match result {
            Err(ChemError::AmbiguousBalance { dimension, .. }) => assert_eq!(dimension, 2),
            other => panic!("expected ambiguous balance, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_propagate() {
        assert!(matches!(
            balance_equation("H2 + O2 = H2O"),
            Err(ChemError::ReactionSyntax { .. })
        ));
    }
}
