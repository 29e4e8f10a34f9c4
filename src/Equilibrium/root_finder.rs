use crate::errors::{ChemError, ChemResult};
use crate::settings::SolverSettings;
use log::{debug, info, warn};
use std::fmt;

/// scalar function whose root is searched for
pub trait ResidualFunction {
    /// value of the function; fails with a domain error outside the physically valid range
    fn residual(&self, x: f64) -> ChemResult<f64>;

    /// derivative of the residual, by finite differences unless overridden
    fn derivative(&self, x: f64, step: f64) -> ChemResult<f64> {
        let h = step * (1.0 + x.abs());
        match (self.residual(x + h), self.residual(x - h)) {
            (Ok(forward), Ok(backward)) => Ok((forward - backward) / (2.0 * h)),
            (Ok(forward), Err(_)) => Ok((forward - self.residual(x)?) / h),
            (Err(_), Ok(backward)) => Ok((self.residual(x)? - backward) / h),
            (Err(e), Err(_)) => Err(e),
        }
    }

    /// closed interval of admissible arguments, if the function has one
    fn extent_bounds(&self) -> Option<(f64, f64)> {
        None
    }

    /// magnitude the tolerance is measured against: |f| < tolerance * scale is converged
    fn residual_scale(&self) -> f64 {
        1.0
    }
}

/// Wraps a closure (and optionally its admissible interval) as a residual function
pub struct FnResidual<F>
where
    F: Fn(f64) -> ChemResult<f64>,
{
    pub f: F,
    pub bounds: Option<(f64, f64)>,
}

impl<F> FnResidual<F>
where
    F: Fn(f64) -> ChemResult<f64>,
{
    pub fn new(f: F) -> Self {
        Self { f, bounds: None }
    }

    pub fn with_bounds(f: F, lower: f64, upper: f64) -> Self {
        Self {
            f,
            bounds: Some((lower, upper)),
        }
    }
}

impl<F> ResidualFunction for FnResidual<F>
where
    F: Fn(f64) -> ChemResult<f64>,
{
    fn residual(&self, x: f64) -> ChemResult<f64> {
        if let Some((lower, upper)) = self.bounds {
            if x < lower || x > upper {
                return Err(ChemError::domain(
                    "trial extent",
                    x,
                    format!("outside the admissible interval [{}, {}]", lower, upper),
                ));
            }
        }
        (self.f)(x)
    }

    fn extent_bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }
}

/// where the search starts: a bracket expected to contain a sign change, or a single guess
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStart {
    Bracket(f64, f64),
    Guess(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMethod {
    Bisection,
    Newton,
}

impl fmt::Display for RootMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootMethod::Bisection => write!(f, "bisection"),
            RootMethod::Newton => write!(f, "Newton"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootReport {
    pub extent: f64,
    pub residual: f64,
    pub iterations: usize,
    pub method: RootMethod,
}

/// Bracketing (bisection) root finder with a Newton fallback
#[derive(Debug, Clone, Default)]
pub struct RootFinder {
    pub settings: SolverSettings,
}

impl RootFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Searches the admissible interval of `f` for a bracket, or starts Newton from 0
    /// when `f` declares no interval
    pub fn find_root(&self, f: &dyn ResidualFunction) -> ChemResult<RootReport> {
        match f.extent_bounds() {
            Some((lower, upper)) => self.solve(f, SearchStart::Bracket(lower, upper)),
            None => self.solve(f, SearchStart::Guess(0.0)),
        }
    }

    fn scaled_tolerance(&self, f: &dyn ResidualFunction) -> f64 {
        let scale = f.residual_scale();
        if scale.is_finite() && scale > 0.0 {
            self.settings.tolerance * scale
        } else {
            self.settings.tolerance
        }
    }

    pub fn solve(&self, f: &dyn ResidualFunction, start: SearchStart) -> ChemResult<RootReport> {
        self.settings.validate()?;
        match start {
            SearchStart::Bracket(a, b) => {
                let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
                let f_lower = f.residual(lower)?;
                let f_upper = f.residual(upper)?;
                debug!(
                    "bracket [{}, {}] with residuals [{}, {}]",
                    lower, upper, f_lower, f_upper
                );
                // an endpoint is a root only when it solves the equation exactly
                if f_lower == 0.0 {
                    return Ok(RootReport {
                        extent: lower,
                        residual: f_lower,
                        iterations: 0,
                        method: RootMethod::Bisection,
                    });
                }
                if f_upper == 0.0 {
                    return Ok(RootReport {
                        extent: upper,
                        residual: f_upper,
                        iterations: 0,
                        method: RootMethod::Bisection,
                    });
                }
                let sign_change = !f_lower.is_nan()
                    && !f_upper.is_nan()
                    && f_lower.is_sign_positive() != f_upper.is_sign_positive();
                if lower < upper && sign_change {
                    self.bisection(f, lower, upper, f_lower)
                } else if self.settings.allow_newton_fallback {
                    warn!(
                        "no sign change on [{}, {}], falling back to Newton iteration from 0",
                        lower, upper
                    );
                    self.newton(f, 0.0)
                } else {
                    Err(ChemError::domain(
                        "bracket",
                        lower,
                        format!("residual does not change sign on [{}, {}]", lower, upper),
                    ))
                }
            }
            SearchStart::Guess(x0) => self.newton(f, x0),
        }
    }

    // the bracket [lower, upper] always keeps the sign change and shrinks every step
    fn bisection(
        &self,
        f: &dyn ResidualFunction,
        mut lower: f64,
        mut upper: f64,
        mut f_lower: f64,
    ) -> ChemResult<RootReport> {
        let tolerance = self.scaled_tolerance(f);
        let mut mid = lower;
        let mut f_mid = f_lower;
        for iteration in 1..=self.settings.max_iterations {
            mid = lower + (upper - lower) / 2.0;
            if mid <= lower || mid >= upper {
                // no float left between the ends and the residual is still above tolerance
                warn!(
                    "bracket collapsed to adjacent floats at {} after {} iterations, residual {}",
                    mid, iteration, f_mid
                );
                return Err(ChemError::NonConvergence {
                    iterations: iteration,
                    extent: mid,
                    residual: f_mid,
                });
            }
            f_mid = f.residual(mid)?;
            if f_mid.is_nan() {
                return Err(ChemError::domain(
                    "residual",
                    mid,
                    "residual is not a number inside the bracket",
                ));
            }
            if f_mid.abs() < tolerance {
                info!(
                    "bisection converged to {} in {} iterations, residual {}",
                    mid, iteration, f_mid
                );
                return Ok(RootReport {
                    extent: mid,
                    residual: f_mid,
                    iterations: iteration,
                    method: RootMethod::Bisection,
                });
            }
            if f_mid.is_sign_positive() == f_lower.is_sign_positive() {
                lower = mid;
                f_lower = f_mid;
            } else {
                upper = mid;
            }
        }
        Err(ChemError::NonConvergence {
            iterations: self.settings.max_iterations,
            extent: mid,
            residual: f_mid,
        })
    }

    fn newton(&self, f: &dyn ResidualFunction, x0: f64) -> ChemResult<RootReport> {
        let tolerance = self.scaled_tolerance(f);
        let bounds = f.extent_bounds();
        let mut x = x0;
        let mut fx = f.residual(x)?;
        for iteration in 0..self.settings.max_iterations {
            if fx.abs() < tolerance {
                info!(
                    "Newton converged to {} in {} iterations, residual {}",
                    x, iteration, fx
                );
                return Ok(RootReport {
                    extent: x,
                    residual: fx,
                    iterations: iteration,
                    method: RootMethod::Newton,
                });
            }
            let derivative = f.derivative(x, self.settings.finite_difference_step)?;
            if !derivative.is_finite() || derivative.abs() <= self.settings.derivative_floor {
                return Err(ChemError::SingularDerivative {
                    extent: x,
                    derivative,
                });
            }
            let next = x - fx / derivative;
            if let Some((lower, upper)) = bounds {
                if next < lower || next > upper {
                    return Err(ChemError::domain(
                        "trial extent",
                        next,
                        format!(
                            "Newton step leaves [{}, {}] and would drive a concentration negative",
                            lower, upper
                        ),
                    ));
                }
            }
            x = next;
            fx = f.residual(x)?;
        }
        if fx.abs() < tolerance {
            return Ok(RootReport {
                extent: x,
                residual: fx,
                iterations: self.settings.max_iterations,
                method: RootMethod::Newton,
            });
        }
        Err(ChemError::NonConvergence {
            iterations: self.settings.max_iterations,
            extent: x,
            residual: fx,
        })
    }
}
