/// Module to calculate the atomic composition, net charge and molar mass of a chemical formula
///
///  # Examples
/// ```
/// use ChemCalc::Stoichiometry::molmass::{calculate_molar_mass, parse_formula};
/// let (molar_mass, element_composition) = calculate_molar_mass("C6H8O6").unwrap();
/// println!("Element counts: {:?}", element_composition);
/// println!("Molar mass: {:?} g/mol", molar_mass);
/// let (atomic_composition, charge) = parse_formula("Fe(CN)6-3").unwrap();
/// assert_eq!(atomic_composition["C"], 6);
/// assert_eq!(charge, -3);
/// ```
pub mod molmass;
/// Species (formula + composition + charge) and reaction terms
pub mod species;
/// The module takes a reaction equation given as a string ("A + 2 B -> C") and produces an ordered
/// list of reactant and product terms. A coefficient may precede each formula; when absent it is 1.
/// Ions are written with a trailing charge ("H+", "OH-", "Fe+3", "SO4^2-"), a '+' that belongs to
/// a charge is not taken for a term separator.
pub mod reaction_parser;
/// Balancing of chemical equations: the stoichiometric matrix of the reaction is built over all
/// elements (and the charge, for ionic equations) and its null space is found in exact rational
/// arithmetic. A one-dimensional null space gives the balance, which is scaled to the smallest
/// positive integers.
///
///  # Examples
/// ```
/// use ChemCalc::Stoichiometry::balancer::balance_equation;
/// use ChemCalc::Stoichiometry::reaction_parser::parse_reaction;
/// let balanced = balance_equation("H2 + O2 -> H2O").unwrap();
/// assert_eq!(balanced, "2 H2 + 1 O2 -> 2 H2O");
/// let reaction = parse_reaction("KMnO4 + HCl -> KCl + MnCl2 + H2O + Cl2").unwrap();
/// let balanced = reaction.balanced().unwrap();
/// assert_eq!(balanced.coefficients(), vec![2, 16, 2, 2, 8, 5]);
/// ```
pub mod balancer;
mod balancer_tests;
