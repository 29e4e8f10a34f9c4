use super::molmass::{ElementCount, calculate_molar_mass, formula_body, parse_formula};
use crate::errors::{ChemError, ChemResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const SUBSCRIPTS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];
const SUPERSCRIPTS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// A chemical species: formula, atomic composition and net charge.
///
/// Species are compared by their formula with whitespace removed; element symbols stay
/// case-sensitive, so `Co` (cobalt) and `CO` (carbon monoxide) are different species.
#[derive(Debug, Clone)]
pub struct Species {
    formula: String,
    elements: ElementCount,
    charge: i32,
}

impl Species {
    pub fn new(formula: &str) -> ChemResult<Self> {
        let normalized: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
        let (elements, charge) = parse_formula(&normalized).map_err(|e| match e {
            ChemError::FormulaSyntax { cause, .. } => ChemError::formula(formula, cause),
            other => other,
        })?;
        Ok(Self {
            formula: normalized,
            elements,
            charge,
        })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn elements(&self) -> &ElementCount {
        &self.elements
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// number of atoms of `element` in one formula unit
    pub fn count_of(&self, element: &str) -> usize {
        self.elements.get(element).copied().unwrap_or(0)
    }

    pub fn molar_mass(&self) -> ChemResult<f64> {
        calculate_molar_mass(&self.formula).map(|(molar_mass, _)| molar_mass)
    }

    /// formula with unicode subscripts and charge superscript, e.g. `Fe(CN)₆³⁻`
    pub fn unicode_name(&self) -> String {
        let (body, charge) = match formula_body(&self.formula) {
            Ok(parts) => parts,
            Err(_) => return self.formula.clone(),
        };
        let mut name: String = body
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => SUBSCRIPTS[d as usize],
                None => c,
            })
            .collect();
        if charge != 0 {
            let magnitude = charge.unsigned_abs();
            if magnitude > 1 {
                name.extend(
                    magnitude
                        .to_string()
                        .chars()
                        .filter_map(|c| c.to_digit(10))
                        .map(|d| SUPERSCRIPTS[d as usize]),
                );
            }
            name.push(if charge > 0 { '⁺' } else { '⁻' });
        }
        name
    }
}

impl PartialEq for Species {
    fn eq(&self, other: &Self) -> bool {
        self.formula == other.formula
    }
}

impl Eq for Species {}

impl Hash for Species {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.formula.hash(state);
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula)
    }
}

impl FromStr for Species {
    type Err = ChemError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::new(s)
    }
}

/// A species with its stoichiometric coefficient in a reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionTerm {
    pub coefficient: u64,
    pub species: Species,
}

impl ReactionTerm {
    pub fn new(coefficient: u64, species: Species) -> Self {
        Self {
            coefficient,
            species,
        }
    }
}

impl fmt::Display for ReactionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.coefficient, self.species)
    }
}
