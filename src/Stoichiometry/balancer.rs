use super::reaction_parser::{Reaction, parse_reaction};
use super::species::Species;
use crate::errors::{ChemError, ChemResult};
use log::{debug, info};
use malachite::num::arithmetic::traits::{Gcd, Lcm};
use malachite::num::basic::traits::{One, Zero};
use malachite::{Natural, Rational};
use nalgebra::DMatrix;
use std::collections::BTreeSet;

/// label of the extra row that conserves charge in ionic equations
pub const CHARGE_ROW: &str = "charge";

/// Element-conservation matrix of a reaction: one row per element (sorted, plus a charge row
/// when any species is an ion), one column per species in reactant-then-product order.
/// Reactant entries are positive, product entries negated, so a balance is a positive vector
/// of its null space
#[derive(Debug, Clone)]
pub struct StoichiometricMatrix {
    pub rows: Vec<String>,
    pub entries: Vec<Vec<i64>>,
    pub n_reactants: usize,
}

impl StoichiometricMatrix {
    pub fn new(reactant_species: &[Species], product_species: &[Species]) -> Self {
        let all_species: Vec<&Species> = reactant_species.iter().chain(product_species).collect();
        let elements: BTreeSet<&String> = reactant_species
            .iter()
            .chain(product_species)
            .flat_map(|species| species.elements().keys())
            .collect();
        let mut rows: Vec<String> = elements.into_iter().cloned().collect();
        let ionic = all_species.iter().any(|species| species.charge() != 0);
        if ionic {
            rows.push(CHARGE_ROW.to_string());
        }
        let n_reactants = reactant_species.len();
        let entries = rows
            .iter()
            .map(|row| {
                all_species
                    .iter()
                    .enumerate()
                    .map(|(column, species)| {
                        let amount = if row == CHARGE_ROW {
                            species.charge() as i64
                        } else {
                            species.count_of(row) as i64
                        };
                        if column < n_reactants { amount } else { -amount }
                    })
                    .collect()
            })
            .collect();
        Self {
            rows,
            entries,
            n_reactants,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.entries.first().map_or(0, |row| row.len())
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| self.entries[i][j] as f64)
    }

    /// basis of the null space computed in exact rational arithmetic
    pub fn null_space(&self) -> Vec<Vec<Rational>> {
        let ncols = self.ncols();
        let mut matrix: Vec<Vec<Rational>> = self
            .entries
            .iter()
            .map(|row| row.iter().map(|&x| Rational::from(x)).collect())
            .collect();
        let pivots = reduce_row_echelon(&mut matrix, ncols);
        let free_columns: Vec<usize> = (0..ncols).filter(|c| !pivots.contains(c)).collect();
        free_columns
            .iter()
            .map(|&free| {
                let mut vector = vec![Rational::ZERO; ncols];
                vector[free] = Rational::ONE;
                for (row, &pivot) in pivots.iter().enumerate() {
                    vector[pivot] = -matrix[row][free].clone();
                }
                vector
            })
            .collect()
    }

    /// true when the matrix times `coefficients` is the zero vector
    pub fn conserves(&self, coefficients: &[u64]) -> bool {
        self.entries.iter().all(|row| {
            row.iter()
                .zip(coefficients)
                .map(|(&a, &c)| a as i128 * c as i128)
                .sum::<i128>()
                == 0
        })
    }
}

/// Gauss-Jordan elimination to reduced row echelon form; returns the pivot columns
pub fn reduce_row_echelon(matrix: &mut [Vec<Rational>], ncols: usize) -> Vec<usize> {
    let nrows = matrix.len();
    let mut pivots = Vec::new();
    let mut pivot_row = 0;
    for col in 0..ncols {
        if pivot_row == nrows {
            break;
        }
        let Some(found) = (pivot_row..nrows).find(|&r| matrix[r][col] != Rational::ZERO) else {
            continue;
        };
        matrix.swap(pivot_row, found);
        let pivot = matrix[pivot_row][col].clone();
        for j in col..ncols {
            matrix[pivot_row][j] = &matrix[pivot_row][j] / &pivot;
        }
        for r in 0..nrows {
            if r == pivot_row || matrix[r][col] == Rational::ZERO {
                continue;
            }
            let factor = matrix[r][col].clone();
            for j in col..ncols {
                let amount = &factor * &matrix[pivot_row][j];
                matrix[r][j] -= amount;
            }
        }
        pivots.push(col);
        pivot_row += 1;
    }
    pivots
}

fn describe(reactant_species: &[Species], product_species: &[Species]) -> String {
    let join = |species: &[Species]| {
        species
            .iter()
            .map(|s| s.formula())
            .collect::<Vec<_>>()
            .join(" + ")
    };
    format!("{} -> {}", join(reactant_species), join(product_species))
}

// scale by the lcm of denominators, then divide by the gcd of the numerators
fn to_minimal_integers(vector: Vec<Rational>) -> Vec<Rational> {
    let mut lcm = Natural::ONE;
    for x in vector.iter() {
        lcm = lcm.lcm(x.denominator_ref());
    }
    let lcm = Rational::from(&lcm);
    let scaled: Vec<Rational> = vector.into_iter().map(|x| x * &lcm).collect();
    let mut gcd = Natural::ZERO;
    for x in scaled.iter() {
        gcd = gcd.gcd(x.numerator_ref());
    }
    if gcd == Natural::ZERO {
        return scaled;
    }
    let gcd = Rational::from(&gcd);
    scaled.into_iter().map(|x| x / &gcd).collect()
}

/// Computes the minimal positive integer coefficients (reactants first, then products)
/// that conserve every element, and the charge when ions are present
pub fn balance(reactant_species: &[Species], product_species: &[Species]) -> ChemResult<Vec<u64>> {
    let input = describe(reactant_species, product_species);
    if reactant_species.is_empty() || product_species.is_empty() {
        return Err(ChemError::Unbalancable {
            input,
            cause: "a reaction needs at least one reactant and one product".to_string(),
        });
    }
    let matrix = StoichiometricMatrix::new(reactant_species, product_species);
    debug!(
        "stoichiometric matrix of {} (rows {:?}): {}",
        input,
        matrix.rows,
        matrix.to_dmatrix()
    );
    let mut basis = matrix.null_space();
    let vector = match basis.len() {
        0 => {
            return Err(ChemError::Unbalancable {
                input,
                cause: "mass cannot be conserved with any choice of coefficients".to_string(),
            });
        }
        1 => basis.remove(0),
        dimension => return Err(ChemError::AmbiguousBalance { input, dimension }),
    };
    let mut vector = to_minimal_integers(vector);
    // raw signs encode side membership: reactant entries must come out positive
    let reactants_negative = vector[..matrix.n_reactants]
        .iter()
        .find(|x| **x != Rational::ZERO)
        .is_some_and(|x| *x < Rational::ZERO);
    if reactants_negative {
        vector = vector.into_iter().map(|x| -x).collect();
    }
    if vector.iter().any(|x| *x <= Rational::ZERO) {
        return Err(ChemError::Unbalancable {
            input,
            cause: "no balance with all coefficients positive exists".to_string(),
        });
    }
    let mut coefficients = Vec::with_capacity(vector.len());
    for x in vector.iter() {
        let value = i64::try_from(x).map_err(|_| ChemError::Unbalancable {
            input: input.clone(),
            cause: format!("coefficient {} does not fit into 64 bits", x),
        })?;
        coefficients.push(value as u64);
    }
    if !matrix.conserves(&coefficients) {
        return Err(ChemError::Unbalancable {
            input,
            cause: "computed coefficients fail the conservation check".to_string(),
        });
    }
    info!("{} balanced with coefficients {:?}", input, coefficients);
    Ok(coefficients)
}

impl Reaction {
    /// a copy of the reaction carrying the balanced coefficients; input coefficients are ignored
    pub fn balanced(&self) -> ChemResult<Reaction> {
        let coefficients = balance(&self.reactant_species(), &self.product_species())?;
        let mut balanced = self.clone();
        for (term, coefficient) in balanced
            .reactants
            .iter_mut()
            .chain(balanced.products.iter_mut())
            .zip(coefficients)
        {
            term.coefficient = coefficient;
        }
        Ok(balanced)
    }
}

/// "H2 + O2 -> H2O" -> "2 H2 + 1 O2 -> 2 H2O"
pub fn balance_equation(text: &str) -> ChemResult<String> {
    let reaction = parse_reaction(text)?;
    Ok(reaction.balanced()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(formulas: &[&str]) -> Vec<Species> {
        formulas.iter().map(|f| Species::new(f).unwrap()).collect()
    }

    #[test]
    fn test_matrix_layout() {
        let matrix = StoichiometricMatrix::new(&species(&["H2", "O2"]), &species(&["H2O"]));
        assert_eq!(matrix.rows, vec!["H", "O"]);
        assert_eq!(matrix.entries, vec![vec![2, 0, -2], vec![0, 2, -1]]);
        assert_eq!(matrix.to_dmatrix().shape(), (2, 3));
    }

    #[test]
    fn test_charge_row_for_ions() {
        let matrix = StoichiometricMatrix::new(&species(&["H+", "OH-"]), &species(&["H2O"]));
        assert_eq!(matrix.rows.last().unwrap(), CHARGE_ROW);
        assert_eq!(matrix.entries.last().unwrap(), &vec![1, -1, 0]);
    }

    #[test]
    fn test_null_space_dimension() {
        let matrix = StoichiometricMatrix::new(&species(&["H2", "O2"]), &species(&["H2O"]));
        let basis = matrix.null_space();
        assert_eq!(basis.len(), 1);
        let as_integers = to_minimal_integers(basis[0].clone());
        assert_eq!(
            as_integers,
            vec![Rational::from(2), Rational::from(1), Rational::from(2)]
        );
    }

    #[test]
    fn test_reduce_row_echelon() {
        let mut matrix = vec![
            vec![Rational::from(2), Rational::from(4)],
            vec![Rational::from(1), Rational::from(3)],
        ];
        let pivots = reduce_row_echelon(&mut matrix, 2);
        assert_eq!(pivots, vec![0, 1]);
        assert_eq!(
            matrix,
            vec![
                vec![Rational::ONE, Rational::ZERO],
                vec![Rational::ZERO, Rational::ONE]
            ]
        );
    }
}
