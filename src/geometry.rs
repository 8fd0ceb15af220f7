//! Core molecular structure data types.
//!
//! This module provides the fundamental data types for representing molecular
//! geometries in Q-Chem workflow calculations:
//!
//! - [`Geometry`]: Molecular structure with element symbols and Cartesian coordinates
//! - Element bookkeeping: symbol/atomic-number lookup, alphabetical formulas,
//!   electron counting
//!
//! Coordinates are in Angstrom throughout; forces parsed from Q-Chem outputs
//! are in Hartree/Bohr.

use nalgebra::DVector;

/// Unit conversion constant: Bohr to Angstrom
pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;
/// Unit conversion constant: Angstrom to Bohr
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

/// Represents a molecular geometry with atomic elements and Cartesian coordinates.
///
/// The `Geometry` struct stores the chemical elements of each atom and their
/// 3D positions. It uses a flat representation where coordinates are stored as
/// a single-dimensional vector in the order [x1, y1, z1, x2, y2, z2, ...],
/// which enables direct use with nalgebra for the vector operations required
/// during geometry optimization.
///
/// # Examples
///
/// ```
/// use qcflow::geometry::Geometry;
///
/// let elements = vec!["O".to_string(), "H".to_string(), "H".to_string()];
/// let coords = vec![
///     0.0, 0.0, 0.0,
///     0.757, 0.586, 0.0,
///     -0.757, 0.586, 0.0,
/// ];
///
/// let geometry = Geometry::new(elements, coords);
/// assert_eq!(geometry.num_atoms, 3);
/// assert_eq!(geometry.formula_alphabetical(), "H2 O1");
/// assert_eq!(geometry.electron_count(0), 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Chemical element symbols for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates [x1, y1, z1, x2, y2, z2, ...] in Angstrom
    pub coords: DVector<f64>,
    /// Number of atoms in the molecule
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a new `Geometry` from an element list and coordinate vector.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`, ensuring data consistency.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
        }
    }

    /// Get the Cartesian coordinates of a specific atom as [x, y, z] in Angstrom.
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Replace the coordinates of a specific atom.
    pub fn set_atom_coords(&mut self, atom_idx: usize, xyz: [f64; 3]) {
        let i = atom_idx * 3;
        self.coords[i] = xyz[0];
        self.coords[i + 1] = xyz[1];
        self.coords[i + 2] = xyz[2];
    }

    /// Return a copy of this geometry with displaced coordinates.
    ///
    /// The displacement vector must have the same length as `coords`.
    pub fn displaced(&self, delta: &DVector<f64>) -> Self {
        assert_eq!(delta.len(), self.coords.len());
        Self {
            elements: self.elements.clone(),
            coords: &self.coords + delta,
            num_atoms: self.num_atoms,
        }
    }

    /// Alphabetical molecular formula, e.g. `"C4 H4 O6"`.
    ///
    /// Element symbols are sorted alphabetically with their counts appended,
    /// separated by single spaces. Counts of one are kept explicit ("O1"),
    /// matching the convention used in workflow result records.
    pub fn formula_alphabetical(&self) -> String {
        let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
        for el in &self.elements {
            *counts.entry(el.as_str()).or_insert(0) += 1;
        }
        counts
            .iter()
            .map(|(el, n)| format!("{}{}", el, n))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total number of electrons for the given molecular charge.
    ///
    /// Unknown element symbols contribute zero electrons; callers that need
    /// strict element checking should validate symbols up front via
    /// [`atomic_number`].
    pub fn electron_count(&self, charge: i32) -> usize {
        let total: i64 = self
            .elements
            .iter()
            .map(|el| atomic_number(el).unwrap_or(0) as i64)
            .sum();
        (total - charge as i64).max(0) as usize
    }

    /// Maximum per-atom distance (Angstrom) between two geometries.
    ///
    /// Used by tests and by the optimizer to decide whether a structure has
    /// actually moved.
    pub fn max_atom_distance(&self, other: &Geometry) -> f64 {
        assert_eq!(self.num_atoms, other.num_atoms);
        let mut max_d = 0.0_f64;
        for i in 0..self.num_atoms {
            let a = self.get_atom_coords(i);
            let b = other.get_atom_coords(i);
            let d = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt();
            if d > max_d {
                max_d = d;
            }
        }
        max_d
    }
}

/// Element symbols indexed by atomic number - 1, through Z = 86.
const ELEMENT_SYMBOLS: [&str; 86] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn",
];

/// Look up the atomic number for an element symbol (case-sensitive, e.g. "Cl").
///
/// Returns `None` for unknown symbols.
pub fn atomic_number(symbol: &str) -> Option<usize> {
    ELEMENT_SYMBOLS.iter().position(|&s| s == symbol).map(|i| i + 1)
}

/// Look up the element symbol for an atomic number.
///
/// Returns "X" for numbers outside the supported range, mirroring the
/// placeholder convention used by output parsers.
pub fn element_symbol(atomic_num: usize) -> String {
    if atomic_num >= 1 && atomic_num <= ELEMENT_SYMBOLS.len() {
        ELEMENT_SYMBOLS[atomic_num - 1].to_string()
    } else {
        "X".to_string()
    }
}
