use crate::errors::{ChemError, ChemResult};

/// species names read as the hydrogen ion
pub const HYDROGEN_ION_NAMES: [&str; 2] = ["H+", "H3O+"];
pub const HYDROXIDE_ION_NAME: &str = "OH-";

/// pH = -log10([H+])
pub fn ph_from_concentration(h_plus: f64) -> ChemResult<f64> {
    if !h_plus.is_finite() || h_plus <= 0.0 {
        return Err(ChemError::domain(
            "[H+]",
            h_plus,
            "pH needs a positive hydrogen ion concentration",
        ));
    }
    Ok(-h_plus.log10())
}

/// pOH = -log10([OH-])
pub fn poh_from_concentration(oh_minus: f64) -> ChemResult<f64> {
    if !oh_minus.is_finite() || oh_minus <= 0.0 {
        return Err(ChemError::domain(
            "[OH-]",
            oh_minus,
            "pOH needs a positive hydroxide ion concentration",
        ));
    }
    Ok(-oh_minus.log10())
}

/// [H+] = 10^-pH
pub fn h_plus_from_ph(ph: f64) -> ChemResult<f64> {
    if !ph.is_finite() {
        return Err(ChemError::domain("pH", ph, "pH must be a finite number"));
    }
    Ok(10f64.powf(-ph))
}
