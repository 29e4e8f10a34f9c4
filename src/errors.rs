//! Error types shared by the stoichiometry and equilibrium pipelines.
//!
//! Every error is a local, recoverable condition: it carries the offending input and a
//! human-readable cause so that a calling layer (console menu, web form) can present it
//! and re-prompt the user.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChemError {
    #[error("cannot parse formula '{input}': {cause}")]
    FormulaSyntax { input: String, cause: String },
    #[error("cannot parse reaction '{input}': {cause}")]
    ReactionSyntax { input: String, cause: String },
    #[error("cannot parse equilibrium expression '{input}': {cause}")]
    EquilibriumSyntax { input: String, cause: String },
    #[error("reaction '{input}' cannot be balanced: {cause}")]
    Unbalancable { input: String, cause: String },
    #[error(
        "reaction '{input}' has {dimension} independent balances, a unique balance does not exist"
    )]
    AmbiguousBalance { input: String, dimension: usize },
    #[error("root finder did not converge after {iterations} iterations (last extent {extent}, residual {residual})")]
    NonConvergence {
        iterations: usize,
        extent: f64,
        residual: f64,
    },
    #[error("derivative of the residual vanished at extent {extent} (derivative {derivative})")]
    SingularDerivative { extent: f64, derivative: f64 },
    #[error("value {value} of '{input}' is out of the physical domain: {cause}")]
    Domain {
        input: String,
        value: f64,
        cause: String,
    },
    #[error("unknown element '{symbol}' in formula '{input}'")]
    UnknownElement { input: String, symbol: String },
    #[error("invalid solver settings: {0}")]
    Settings(String),
    #[error("settings file error: {0}")]
    SettingsIo(#[from] std::io::Error),
    #[error("settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

pub type ChemResult<T> = Result<T, ChemError>;

impl ChemError {
    pub fn formula(input: &str, cause: impl Into<String>) -> Self {
        ChemError::FormulaSyntax {
            input: input.to_string(),
            cause: cause.into(),
        }
    }
    pub fn reaction(input: &str, cause: impl Into<String>) -> Self {
        ChemError::ReactionSyntax {
            input: input.to_string(),
            cause: cause.into(),
        }
    }
    pub fn equilibrium(input: &str, cause: impl Into<String>) -> Self {
        ChemError::EquilibriumSyntax {
            input: input.to_string(),
            cause: cause.into(),
        }
    }
    pub fn domain(input: &str, value: f64, cause: impl Into<String>) -> Self {
        ChemError::Domain {
            input: input.to_string(),
            value,
            cause: cause.into(),
        }
    }
}
