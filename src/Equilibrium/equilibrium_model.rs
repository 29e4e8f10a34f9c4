use super::root_finder::ResidualFunction;
use crate::Stoichiometry::reaction_parser::parse_side;
use crate::Stoichiometry::species::{ReactionTerm, Species};
use crate::errors::{ChemError, ChemResult};
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// "1.8*10**-5", "1.8 * 10^-5"
static MANTISSA_POWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<mantissa>[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*\*\s*10\s*(?:\*\*|\^)\s*(?P<exponent>[+-]?\d+)$")
        .unwrap()
});
// "10**-5"
static BARE_POWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\s*(?:\*\*|\^)\s*(?P<exponent>[+-]?\d+)$").unwrap());

/// Concentrations (mol/L) keyed by species formula. Species that are not listed have
/// concentration 0. A state is never modified in place: advancing the extent produces a new one
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConcentrationState {
    values: BTreeMap<String, f64>,
}

impl ConcentrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// builds a state from (formula, concentration) pairs; negative or non-finite values fail
    pub fn from_pairs<I, S>(pairs: I) -> ChemResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self::new().with_values(pairs)
    }

    /// copy of the state with the given concentrations replaced
    pub fn with_values<I, S>(&self, pairs: I) -> ChemResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut values = self.values.clone();
        for (name, value) in pairs {
            let name = name.as_ref();
            if !value.is_finite() || value < 0.0 {
                return Err(ChemError::domain(
                    name,
                    value,
                    "concentration must be a finite non-negative number",
                ));
            }
            values.insert(name.split_whitespace().collect(), value);
        }
        Ok(Self { values })
    }

    pub fn with(&self, name: &str, value: f64) -> ChemResult<Self> {
        self.with_values([(name, value)])
    }

    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parses the console input format "HC2H3O2:0.2, H+:1e-7, C2H3O2-:0.1"
pub fn parse_concentrations(text: &str) -> ChemResult<ConcentrationState> {
    let mut pairs: Vec<(String, f64)> = Vec::new();
    for pair in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once(':').ok_or_else(|| {
            ChemError::equilibrium(text, format!("'{}' is not a name:value pair", pair))
        })?;
        let species = Species::new(name.trim())
            .map_err(|e| ChemError::equilibrium(text, e.to_string()))?;
        let value: f64 = value.trim().parse().map_err(|_| {
            ChemError::equilibrium(
                text,
                format!("concentration '{}' of {} is not a number", value.trim(), species),
            )
        })?;
        if pairs.iter().any(|(seen, _)| seen == species.formula()) {
            return Err(ChemError::equilibrium(
                text,
                format!("concentration of {} is given twice", species),
            ));
        }
        pairs.push((species.formula().to_string(), value));
    }
    ConcentrationState::from_pairs(pairs)
}

/// Parses an equilibrium constant: "1.8e-5", "1.8*10**-5", "1.8*10^-5" or "10**-5"
pub fn parse_equilibrium_constant(text: &str) -> ChemResult<f64> {
    let text = text.trim();
    let k = if let Some(caps) = MANTISSA_POWER.captures(text) {
        let mantissa: f64 = caps["mantissa"]
            .parse()
            .map_err(|_| ChemError::equilibrium(text, "mantissa of K is not a number"))?;
        let exponent: i32 = caps["exponent"]
            .parse()
            .map_err(|_| ChemError::equilibrium(text, "exponent of K is out of range"))?;
        mantissa * 10f64.powi(exponent)
    } else if let Some(caps) = BARE_POWER.captures(text) {
        let exponent: i32 = caps["exponent"]
            .parse()
            .map_err(|_| ChemError::equilibrium(text, "exponent of K is out of range"))?;
        10f64.powi(exponent)
    } else {
        text.parse::<f64>().map_err(|_| {
            ChemError::equilibrium(text, format!("equilibrium constant '{}' is not a number", text))
        })?
    };
    if !k.is_finite() || k <= 0.0 {
        return Err(ChemError::equilibrium(
            text,
            format!("equilibrium constant must be positive and finite, got {}", k),
        ));
    }
    Ok(k)
}

/// A single equilibrium "A + B = C + D ; K". Concentrations depend on one extent x:
/// reactants follow c0 - nu*x, products c0 + nu*x
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumSystem {
    expression: String,
    pub reactants: Vec<ReactionTerm>,
    pub products: Vec<ReactionTerm>,
    pub k: f64,
}

fn as_equilibrium_error(input: &str, error: ChemError) -> ChemError {
    match error {
        ChemError::ReactionSyntax { cause, .. } => ChemError::equilibrium(input, cause),
        other => other,
    }
}

/// Parses "HC2H3O2 = H+ + C2H3O2- ; 1.8e-5" into an equilibrium system
pub fn build_system(expression: &str) -> ChemResult<EquilibriumSystem> {
    let (equation, k_text) = expression
        .split_once(';')
        .ok_or_else(|| ChemError::equilibrium(expression, "missing ';' before K"))?;
    if k_text.contains(';') {
        return Err(ChemError::equilibrium(expression, "more than one ';'"));
    }
    if k_text.trim().is_empty() {
        return Err(ChemError::equilibrium(expression, "K is missing after ';'"));
    }
    let k = parse_equilibrium_constant(k_text).map_err(|e| match e {
        ChemError::EquilibriumSyntax { cause, .. } => ChemError::equilibrium(expression, cause),
        other => other,
    })?;
    let equals = equation.matches('=').count();
    if equals != 1 {
        return Err(ChemError::equilibrium(
            expression,
            format!("exactly one '=' is required, found {}", equals),
        ));
    }
    let (lhs, rhs) = equation
        .split_once('=')
        .ok_or_else(|| ChemError::equilibrium(expression, "missing '='"))?;
    let reactants =
        parse_side(expression, lhs, "reactants").map_err(|e| as_equilibrium_error(expression, e))?;
    let products =
        parse_side(expression, rhs, "products").map_err(|e| as_equilibrium_error(expression, e))?;
    for term in reactants.iter().chain(products.iter()) {
        if term.coefficient > i32::MAX as u64 {
            return Err(ChemError::equilibrium(
                expression,
                format!("coefficient of {} is too large", term.species),
            ));
        }
    }
    if let Some(shared) = reactants
        .iter()
        .find(|r| products.iter().any(|p| p.species == r.species))
    {
        return Err(ChemError::equilibrium(
            expression,
            format!("species {} appears on both sides", shared.species),
        ));
    }
    let system = EquilibriumSystem {
        expression: expression.trim().to_string(),
        reactants,
        products,
        k,
    };
    debug!("equilibrium system {} with K = {:e}", system, system.k);
    Ok(system)
}

// relative rounding slack accepted at the ends of the extent interval
const ROUNDOFF: f64 = 4.0 * f64::EPSILON;

// product of c^nu over the terms and its derivative with respect to the extent
fn power_product(terms: &[ReactionTerm], state: &ConcentrationState, direction: f64) -> (f64, f64) {
    let mut value = 1.0;
    let mut derivative = 0.0;
    for term in terms {
        let nu = term.coefficient as i32;
        let c = state.get(term.species.formula());
        let factor = c.powi(nu);
        // d(c0 + nu x)^nu / dx = nu^2 (c0 + nu x)^(nu - 1)
        let d_factor = (nu * nu) as f64 * c.powi(nu - 1) * direction;
        derivative = derivative * factor + value * d_factor;
        value *= factor;
    }
    (value, derivative)
}

impl EquilibriumSystem {
    /// expression the system was built from
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn species_names(&self) -> Vec<&str> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|t| t.species.formula())
            .collect()
    }

    /// law-of-mass-action coefficients: reactants negative, products positive
    pub fn signed_coefficients(&self) -> Vec<(&str, i64)> {
        let reactants = self
            .reactants
            .iter()
            .map(|t| (t.species.formula(), -(t.coefficient as i64)));
        let products = self
            .products
            .iter()
            .map(|t| (t.species.formula(), t.coefficient as i64));
        reactants.chain(products).collect()
    }

    pub fn has_species(&self, name: &str) -> bool {
        self.species_names().contains(&name)
    }

    /// Range of extents that keeps every concentration non-negative:
    /// upper = min over reactants of c0/nu, lower = -min over products of c0/nu
    pub fn extent_bounds(&self, initial: &ConcentrationState) -> (f64, f64) {
        let limit = |terms: &[ReactionTerm]| {
            terms
                .iter()
                .map(|t| initial.get(t.species.formula()) / t.coefficient as f64)
                .fold(f64::INFINITY, f64::min)
        };
        (-limit(self.products.as_slice()), limit(self.reactants.as_slice()))
    }

    /// concentrations after the reaction advanced by `extent`; a negative result is a domain error
    pub fn concentrations_at(
        &self,
        initial: &ConcentrationState,
        extent: f64,
    ) -> ChemResult<ConcentrationState> {
        let mut updated = Vec::with_capacity(self.reactants.len() + self.products.len());
        for (name, nu) in self.signed_coefficients() {
            let c0 = initial.get(name);
            let shift = nu as f64 * extent;
            let mut c = c0 + shift;
            if c < 0.0 {
                if c >= -ROUNDOFF * (c0 + shift.abs()) {
                    c = 0.0;
                } else {
                    return Err(ChemError::domain(
                        "trial extent",
                        extent,
                        format!("concentration of {} would become {}", name, c),
                    ));
                }
            }
            updated.push((name, c));
        }
        initial.with_values(updated)
    }

    /// reaction quotient Q = prod [products]^nu / prod [reactants]^nu
    pub fn reaction_quotient(&self, state: &ConcentrationState) -> f64 {
        let (numerator, _) = power_product(&self.products, state, 1.0);
        let (denominator, _) = power_product(&self.reactants, state, -1.0);
        numerator / denominator
    }

    /// K - Q(x)
    pub fn residual(&self, initial: &ConcentrationState, extent: f64) -> ChemResult<f64> {
        let state = self.concentrations_at(initial, extent)?;
        let q = self.reaction_quotient(&state);
        if q.is_nan() {
            return Err(ChemError::domain(
                "trial extent",
                extent,
                "reaction quotient is undefined, all concentrations on both sides are zero",
            ));
        }
        Ok(self.k - q)
    }

    /// d(K - Q)/dx = -(N'D - ND') / D^2
    pub fn residual_derivative(&self, initial: &ConcentrationState, extent: f64) -> ChemResult<f64> {
        let state = self.concentrations_at(initial, extent)?;
        let (numerator, d_numerator) = power_product(&self.products, &state, 1.0);
        let (denominator, d_denominator) = power_product(&self.reactants, &state, -1.0);
        if denominator == 0.0 {
            return Err(ChemError::domain(
                "trial extent",
                extent,
                "derivative is undefined where a reactant is exhausted",
            ));
        }
        Ok(-(d_numerator * denominator - numerator * d_denominator) / (denominator * denominator))
    }

    /// "K = [H+][C2H3O2-] / [HC2H3O2]"
    pub fn mass_action_expression(&self) -> String {
        let brackets = |terms: &[ReactionTerm]| {
            terms
                .iter()
                .map(|t| {
                    if t.coefficient == 1 {
                        format!("[{}]", t.species.formula())
                    } else {
                        format!("[{}]^{}", t.species.formula(), t.coefficient)
                    }
                })
                .collect::<String>()
        };
        format!(
            "K = {} / {}",
            brackets(self.products.as_slice()),
            brackets(self.reactants.as_slice())
        )
    }

    /// the residual as a function of the extent alone, for the root finder
    pub fn bind<'a>(&'a self, initial: &'a ConcentrationState) -> EquilibriumResidual<'a> {
        for (name, _) in initial.iter() {
            if !self.has_species(name) {
                warn!("{} does not take part in {}, its concentration is kept", name, self);
            }
        }
        for name in self.species_names() {
            if !initial.contains(name) {
                debug!("{} is not given in the initial state, starting from 0", name);
            }
        }
        EquilibriumResidual {
            system: self,
            initial,
        }
    }
}

impl fmt::Display for EquilibriumSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |terms: &[ReactionTerm]| {
            terms
                .iter()
                .map(|t| {
                    if t.coefficient == 1 {
                        t.species.formula().to_string()
                    } else {
                        t.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        write!(
            f,
            "{} = {} ; {:e}",
            join(self.reactants.as_slice()),
            join(self.products.as_slice()),
            self.k
        )
    }
}

impl FromStr for EquilibriumSystem {
    type Err = ChemError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        build_system(s)
    }
}

/// An equilibrium system bound to its initial concentrations
pub struct EquilibriumResidual<'a> {
    pub system: &'a EquilibriumSystem,
    pub initial: &'a ConcentrationState,
}

impl ResidualFunction for EquilibriumResidual<'_> {
    fn residual(&self, x: f64) -> ChemResult<f64> {
        self.system.residual(self.initial, x)
    }

    fn derivative(&self, x: f64, _step: f64) -> ChemResult<f64> {
        self.system.residual_derivative(self.initial, x)
    }

    fn extent_bounds(&self) -> Option<(f64, f64)> {
        Some(self.system.extent_bounds(self.initial))
    }

    /// K - Q is converged relative to K
    fn residual_scale(&self) -> f64 {
        self.system.k
    }
}
