use super::species::{ReactionTerm, Species};
use crate::errors::{ChemError, ChemResult};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// arrows separating reactants from products
pub const ARROWS: [&str; 3] = ["->", "=>", "→"];

/// A chemical equation as entered by the user: ordered reactant and product terms.
/// Coefficients found in the text are kept for display, the balancer ignores them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    original: String,
    pub reactants: Vec<ReactionTerm>,
    pub products: Vec<ReactionTerm>,
}

// A '+' is a term separator unless it belongs to a charge: "H+ + OH-", "Ca^2+", "Fe+3"
fn is_term_separator(chars: &[char], i: usize) -> bool {
    let prev = if i > 0 { Some(chars[i - 1]) } else { None };
    if matches!(prev, Some('^') | Some('/')) {
        return false;
    }
    let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
    match next {
        None | Some('+') => false,
        Some(c) if c.is_ascii_digit() => {
            // "Fe+3" is a charge, "Fe + 3 Cl" is a coefficient
            let glued = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
            !(glued && prev.is_some_and(|p| !p.is_whitespace()))
        }
        Some(_) => true,
    }
}

fn split_terms(side: &str) -> Vec<String> {
    let chars: Vec<char> = side.chars().collect();
    let mut terms = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '+' && is_term_separator(&chars, i) {
            terms.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    terms.push(current.trim().to_string());
    terms
}

fn parse_term(input: &str, term: &str) -> ChemResult<ReactionTerm> {
    if term.is_empty() {
        return Err(ChemError::reaction(input, "empty term"));
    }
    let digits_end = term
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(term.len(), |(i, _)| i);
    let (coefficient, formula) = term.split_at(digits_end);
    let formula = formula.trim();
    if formula.is_empty() {
        return Err(ChemError::reaction(
            input,
            format!("term '{}' has no formula", term),
        ));
    }
    let coefficient: u64 = if coefficient.is_empty() {
        1
    } else {
        coefficient.parse().map_err(|_| {
            ChemError::reaction(input, format!("coefficient '{}' is too large", coefficient))
        })?
    };
    if coefficient == 0 {
        return Err(ChemError::reaction(
            input,
            format!("term '{}' has a zero coefficient", term),
        ));
    }
    let species = Species::new(formula).map_err(|e| ChemError::reaction(input, e.to_string()))?;
    Ok(ReactionTerm::new(coefficient, species))
}

pub(crate) fn parse_side(input: &str, side: &str, side_name: &str) -> ChemResult<Vec<ReactionTerm>> {
    if side.trim().is_empty() {
        return Err(ChemError::reaction(input, format!("{} side is empty", side_name)));
    }
    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for term in split_terms(side) {
        let term = parse_term(input, &term)?;
        if !seen.insert(term.species.clone()) {
            return Err(ChemError::reaction(
                input,
                format!("species {} appears twice among the {}", term.species, side_name),
            ));
        }
        terms.push(term);
    }
    Ok(terms)
}

/// Parses "A + 2 B -> C" into ordered reactant and product terms
pub fn parse_reaction(text: &str) -> ChemResult<Reaction> {
    let arrow_count: usize = ARROWS.iter().map(|arrow| text.matches(arrow).count()).sum();
    if arrow_count != 1 {
        return Err(ChemError::reaction(
            text,
            format!("exactly one arrow (->) is required, found {}", arrow_count),
        ));
    }
    let (lhs, rhs) = ARROWS
        .iter()
        .find_map(|arrow| text.split_once(arrow))
        .ok_or_else(|| ChemError::reaction(text, "no arrow found"))?;
    let reactants = parse_side(text, lhs, "reactants")?;
    let products = parse_side(text, rhs, "products")?;
    debug!(
        "reaction {} parsed: {} reactants, {} products",
        text,
        reactants.len(),
        products.len()
    );
    Ok(Reaction {
        original: text.to_string(),
        reactants,
        products,
    })
}

impl Reaction {
    /// string from which the reaction was parsed
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn reactant_species(&self) -> Vec<Species> {
        self.reactants.iter().map(|t| t.species.clone()).collect()
    }

    pub fn product_species(&self) -> Vec<Species> {
        self.products.iter().map(|t| t.species.clone()).collect()
    }

    /// coefficients in reactant-then-product order
    pub fn coefficients(&self) -> Vec<u64> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|t| t.coefficient)
            .collect()
    }

    /// true when the current coefficients conserve every element and the net charge
    pub fn is_balanced(&self) -> bool {
        fn totals(terms: &[ReactionTerm]) -> (BTreeMap<String, u128>, i128) {
            let mut atoms = BTreeMap::new();
            let mut charge = 0i128;
            for term in terms {
                for (element, count) in term.species.elements() {
                    *atoms.entry(element.clone()).or_insert(0) +=
                        term.coefficient as u128 * *count as u128;
                }
                charge += term.coefficient as i128 * term.species.charge() as i128;
            }
            (atoms, charge)
        }
        totals(&self.reactants) == totals(&self.products)
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |terms: &[ReactionTerm]| {
            terms
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" + ")
        };
        write!(
            f,
            "{} -> {}",
            join(self.reactants.as_slice()),
            join(self.products.as_slice())
        )
    }
}

impl FromStr for Reaction {
    type Err = ChemError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_reaction(s)
    }
}
