use crate::errors::{ChemError, ChemResult};
use log::debug;
use nalgebra::DMatrix;
use prettytable::{Cell, Row, Table};
use regex::Regex;
// Module to parse a chemical formula into its atomic composition and net charge
// and to calculate molar masses
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// element symbol -> number of atoms
pub type ElementCount = HashMap<String, usize>;

// Define a list of elements and their standard atomic masses, g/mol
const ATOMIC_MASSES: &[(&str, f64)] = &[
    ("H", 1.008),
    ("He", 4.0026),
    ("Li", 6.94),
    ("Be", 9.0122),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998),
    ("Ne", 20.180),
    ("Na", 22.990),
    ("Mg", 24.305),
    ("Al", 26.982),
    ("Si", 28.085),
    ("P", 30.974),
    ("S", 32.06),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.098),
    ("Ca", 40.078),
    ("Sc", 44.956),
    ("Ti", 47.867),
    ("V", 50.942),
    ("Cr", 51.996),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.693),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.630),
    ("As", 74.922),
    ("Se", 78.971),
    ("Br", 79.904),
    ("Kr", 83.798),
    ("Rb", 85.468),
    ("Sr", 87.62),
    ("Y", 88.906),
    ("Zr", 91.224),
    ("Nb", 92.906),
    ("Mo", 95.95),
    ("Tc", 98.0),
    ("Ru", 101.07),
    ("Rh", 102.91),
    ("Pd", 106.42),
    ("Ag", 107.87),
    ("Cd", 112.41),
    ("In", 114.82),
    ("Sn", 118.71),
    ("Sb", 121.76),
    ("Te", 127.60),
    ("I", 126.90),
    ("Xe", 131.29),
    ("Cs", 132.91),
    ("Ba", 137.33),
    ("La", 138.91),
    ("Ce", 140.12),
    ("Pr", 140.91),
    ("Nd", 144.24),
    ("Pm", 145.0),
    ("Sm", 150.36),
    ("Eu", 151.96),
    ("Gd", 157.25),
    ("Tb", 158.93),
    ("Dy", 162.50),
    ("Ho", 164.93),
    ("Er", 167.26),
    ("Tm", 168.93),
    ("Yb", 173.05),
    ("Lu", 174.97),
    ("Hf", 178.49),
    ("Ta", 180.95),
    ("W", 183.84),
    ("Re", 186.21),
    ("Os", 190.23),
    ("Ir", 192.22),
    ("Pt", 195.08),
    ("Au", 196.97),
    ("Hg", 200.59),
    ("Tl", 204.38),
    ("Pb", 207.2),
    ("Bi", 208.98),
    ("Po", 209.0),
    ("At", 210.0),
    ("Rn", 222.0),
    ("Fr", 223.0),
    ("Ra", 226.0),
    ("Ac", 227.0),
    ("Th", 232.04),
    ("Pa", 231.04),
    ("U", 238.03),
    ("Np", 237.0),
    ("Pu", 244.0),
    ("Am", 243.0),
    ("Cm", 247.0),
    ("Bk", 247.0),
    ("Cf", 251.0),
    ("Es", 252.0),
    ("Fm", 257.0),
    ("Md", 258.0),
    ("No", 259.0),
    ("Lr", 266.0),
    ("Rf", 267.0),
    ("Db", 268.0),
    ("Sg", 269.0),
    ("Bh", 270.0),
    ("Hs", 277.0),
    ("Mt", 278.0),
    ("Ds", 281.0),
    ("Rg", 282.0),
    ("Cn", 285.0),
    ("Nh", 286.0),
    ("Fl", 289.0),
    ("Mc", 290.0),
    ("Lv", 293.0),
    ("Ts", 294.0),
    ("Og", 294.0),
];

pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, mass)| *mass)
}

static PHASE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((s|l|g|aq|c|cr)\)$").unwrap());
// sign-first charge (+, -, -3, +2) or caret/slash form (^2+, /3-, ^-)
static CHARGE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<body>.*?)(?:[\^/](?P<mag1>\d*)(?P<sign1>[+-])|(?P<sign2>[+-])(?P<mag2>\d*))?$")
        .unwrap()
});

// phase marks like H2O(g) or NaCl(aq) carry no atoms
fn filter_phases_marks(formula: &str) -> String {
    PHASE_MARK.replace(formula, "").to_string()
}

fn split_charge<'a>(input: &str, formula: &'a str) -> ChemResult<(&'a str, i32)> {
    let Some(caps) = CHARGE_SUFFIX.captures(formula) else {
        return Err(ChemError::formula(input, "malformed charge suffix"));
    };
    let body = caps.name("body").map_or("", |m| m.as_str());
    let (sign, magnitude) = match (caps.name("sign1"), caps.name("sign2")) {
        (Some(sign), _) => (sign.as_str(), caps.name("mag1").map_or("", |m| m.as_str())),
        (None, Some(sign)) => (sign.as_str(), caps.name("mag2").map_or("", |m| m.as_str())),
        (None, None) => return Ok((body, 0)),
    };
    let magnitude: i32 = if magnitude.is_empty() {
        1
    } else {
        magnitude
            .parse()
            .map_err(|_| ChemError::formula(input, format!("charge '{}' is too large", magnitude)))?
    };
    let charge = if sign == "-" { -magnitude } else { magnitude };
    Ok((body, charge))
}

/// formula without phase mark and charge suffix, plus the charge
pub(crate) fn formula_body(formula: &str) -> ChemResult<(String, i32)> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = filter_phases_marks(&compact);
    let (body, charge) = split_charge(formula, &compact)?;
    Ok((body.to_string(), charge))
}

/// Recursive descent over the body of a formula: element tokens and bracketed groups,
/// each with an optional integer multiplier
struct FormulaParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str, body: &str) -> Self {
        Self {
            input,
            chars: body.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, cause: String) -> ChemError {
        ChemError::formula(self.input, cause)
    }

    fn element_symbol(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.chars.len() && self.chars[self.pos].is_ascii_lowercase() {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn multiplier(&mut self) -> ChemResult<usize> {
        let start = self.pos;
        while self.pos < self.chars.len() && self.chars[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let count: usize = digits
            .parse()
            .map_err(|_| self.error(format!("multiplier '{}' is too large", digits)))?;
        if count == 0 {
            return Err(self.error(format!("zero multiplier at position {}", start)));
        }
        Ok(count)
    }

    fn parse_sequence(&mut self, closing: Option<char>) -> ChemResult<ElementCount> {
        let mut counts = ElementCount::new();
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            match c {
                'A'..='Z' => {
                    let symbol = self.element_symbol();
                    let count = self.multiplier()?;
                    *counts.entry(symbol).or_insert(0) += count;
                }
                '(' | '[' => {
                    let close = if c == '(' { ')' } else { ']' };
                    let open_at = self.pos;
                    self.pos += 1;
                    let inner = self.parse_sequence(Some(close))?;
                    if inner.is_empty() {
                        return Err(self.error(format!("empty group at position {}", open_at)));
                    }
                    // multiplier after the bracket distributes over the group
                    let factor = self.multiplier()?;
                    for (element, count) in inner {
                        let scaled = count.checked_mul(factor).ok_or_else(|| {
                            self.error(format!("atom count of {} overflows", element))
                        })?;
                        *counts.entry(element).or_insert(0) += scaled;
                    }
                }
                ')' | ']' => {
                    if closing == Some(c) {
                        self.pos += 1;
                        return Ok(counts);
                    }
                    return Err(self.error(format!("unmatched '{}' at position {}", c, self.pos)));
                }
                _ => {
                    return Err(self.error(format!(
                        "unexpected character '{}' at position {}",
                        c, self.pos
                    )));
                }
            }
        }
        if let Some(close) = closing {
            return Err(self.error(format!("missing closing '{}'", close)));
        }
        Ok(counts)
    }
}

/// Parses a chemical formula and returns a HashMap of elements and their counts together with
/// the net charge. Groups in round or square brackets may be nested, a trailing charge is
/// written sign-first (`Fe(CN)6-3`, `H+`) or after a caret or slash (`Ca^2+`, `Fe/3+`)
pub fn parse_formula(formula: &str) -> ChemResult<(ElementCount, i32)> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ChemError::formula(formula, "formula is empty"));
    }
    let compact = filter_phases_marks(&compact);
    let (body, charge) = split_charge(formula, &compact)?;
    if body.is_empty() {
        return Err(ChemError::formula(formula, "formula contains no elements"));
    }
    let mut parser = FormulaParser::new(formula, body);
    let counts = parser.parse_sequence(None)?;
    debug!("formula {} parsed: {:?}, charge {}", formula, counts, charge);
    Ok((counts, charge))
}

// Function to calculate the molar mass of a substance given its chemical formula
pub fn calculate_molar_mass(formula: &str) -> ChemResult<(f64, ElementCount)> {
    let (counts, _charge) = parse_formula(formula)?;
    let mut molar_mass = 0.0;
    for (element, count) in counts.iter() {
        let mass = atomic_mass(element).ok_or_else(|| ChemError::UnknownElement {
            input: formula.to_string(),
            symbol: element.clone(),
        })?;
        molar_mass += mass * *count as f64;
    }
    Ok((molar_mass, counts))
}

// Function to calculate the molar mass of a vector of chemical formulas
pub fn calculate_molar_mass_of_vector_of_subs(vec_of_formulae: &[&str]) -> ChemResult<Vec<f64>> {
    vec_of_formulae
        .iter()
        .map(|formula| calculate_molar_mass(formula).map(|(molar_mass, _)| molar_mass))
        .collect()
}

/// matrix of atomic composition: rows are substances, columns are elements (sorted)
pub fn create_elem_composition_matrix(
    vec_of_formulae: &[&str],
) -> ChemResult<(DMatrix<f64>, Vec<String>)> {
    let mut set_of_elems: BTreeSet<String> = BTreeSet::new();
    let mut vec_of_compositions = Vec::new();
    for formula in vec_of_formulae.iter() {
        let (counts, _) = parse_formula(formula)?;
        set_of_elems.extend(counts.keys().cloned());
        vec_of_compositions.push(counts);
    }
    let unique_vec_of_elems: Vec<String> = set_of_elems.into_iter().collect();
    let mut matrix = DMatrix::zeros(vec_of_compositions.len(), unique_vec_of_elems.len());
    for (substance_i, composition) in vec_of_compositions.iter().enumerate() {
        for (j, element_j) in unique_vec_of_elems.iter().enumerate() {
            if let Some(count) = composition.get(element_j) {
                matrix[(substance_i, j)] = *count as f64;
            }
        }
    }
    Ok((matrix, unique_vec_of_elems))
}

/// table of atomic composition and net charge of the substances, one row per substance
pub fn composition_table(vec_of_formulae: &[&str]) -> ChemResult<Table> {
    let (matrix, elements) = create_elem_composition_matrix(vec_of_formulae)?;
    let mut table = Table::new();
    let mut header = Row::new(vec![Cell::new("substance")]);
    for element in elements.iter() {
        header.add_cell(Cell::new(element));
    }
    header.add_cell(Cell::new("charge"));
    table.add_row(header);
    for (i, formula) in vec_of_formulae.iter().enumerate() {
        let (_, charge) = parse_formula(formula)?;
        let mut row = Row::new(vec![Cell::new(formula)]);
        for j in 0..elements.len() {
            row.add_cell(Cell::new(&matrix[(i, j)].to_string()));
        }
        row.add_cell(Cell::new(&charge.to_string()));
        table.add_row(row);
    }
    Ok(table)
}
