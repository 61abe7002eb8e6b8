//! Minimal PDB coordinate reader
//!
//! Reads ATOM/HETATM records into flat atom lists for residue-restricted
//! superposition, and recovers AlphaFold per-residue confidence (pLDDT),
//! which AlphaFold writes into the B-factor column.

use cryptic_core::{CrypticError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::kabsch_alignment::superposed_rmsd;

/// One ATOM/HETATM record.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub serial: i32,
    /// Atom name (e.g. "CA", "NZ")
    pub name: String,
    pub residue_name: String,
    pub chain_id: char,
    pub residue_seq: i32,
    pub coord: [f64; 3],
    /// B-factor; pLDDT in AlphaFold models
    pub b_factor: f64,
    pub is_hetatm: bool,
}

/// Which atoms enter a superposition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidueSelection {
    /// Residue numbers; all residues when empty
    pub residues: Vec<i32>,
    pub chain: Option<char>,
    /// Only Cα atoms
    pub ca_only: bool,
}

impl ResidueSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn residues(residues: impl Into<Vec<i32>>) -> Self {
        Self {
            residues: residues.into(),
            ..Default::default()
        }
    }

    pub fn ca_only(mut self) -> Self {
        self.ca_only = true;
        self
    }

    pub fn chain(mut self, chain: char) -> Self {
        self.chain = Some(chain);
        self
    }

    fn matches(&self, atom: &AtomRecord) -> bool {
        !atom.is_hetatm
            && (self.residues.is_empty() || self.residues.contains(&atom.residue_seq))
            && self.chain.map_or(true, |c| c == atom.chain_id)
            && (!self.ca_only || atom.name == "CA")
    }
}

/// Atoms of one structure file.
#[derive(Debug, Clone)]
pub struct StructureCoords {
    pub id: String,
    pub atoms: Vec<AtomRecord>,
}

impl StructureCoords {
    /// Parse PDB text. Only the first MODEL is read.
    pub fn from_pdb_str(id: impl Into<String>, content: &str) -> Result<Self> {
        let id = id.into();
        let mut atoms = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.starts_with("ENDMDL") {
                break;
            }
            let is_hetatm = if line.starts_with("ATOM") {
                false
            } else if line.starts_with("HETATM") {
                true
            } else {
                continue;
            };
            atoms.push(parse_atom(line, is_hetatm).map_err(|reason| {
                CrypticError::pdb(format!("{} line {}: {}", id, lineno + 1, reason))
            })?);
        }
        if atoms.is_empty() {
            return Err(CrypticError::pdb(format!("{}: no ATOM records", id)));
        }
        Ok(Self { id, atoms })
    }

    /// Parse a PDB file; the file stem becomes the structure id.
    pub fn from_pdb_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("structure")
            .to_string();
        Self::from_pdb_str(id, &content)
    }

    /// Selected atoms ordered by (residue number, atom name, chain).
    pub fn select(&self, selection: &ResidueSelection) -> Vec<&AtomRecord> {
        let mut atoms: Vec<&AtomRecord> =
            self.atoms.iter().filter(|a| selection.matches(a)).collect();
        atoms.sort_by(|a, b| {
            a.residue_seq
                .cmp(&b.residue_seq)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.chain_id.cmp(&b.chain_id))
        });
        atoms
    }

    pub fn coords(&self, selection: &ResidueSelection) -> Vec<[f64; 3]> {
        self.select(selection).iter().map(|a| a.coord).collect()
    }

    /// Cα B-factor per residue of the first chain.
    ///
    /// Values outside [0, 100] are rejected since they cannot be pLDDT.
    pub fn plddt_scores(&self) -> Result<BTreeMap<i32, f64>> {
        let Some(first_chain) = self.atoms.iter().find(|a| !a.is_hetatm).map(|a| a.chain_id) else {
            return Err(CrypticError::pdb(format!("{}: no protein atoms", self.id)));
        };
        let mut scores = BTreeMap::new();
        for atom in self
            .atoms
            .iter()
            .filter(|a| !a.is_hetatm && a.chain_id == first_chain && a.name == "CA")
        {
            if !(0.0..=100.0).contains(&atom.b_factor) {
                return Err(CrypticError::pdb(format!(
                    "{}: residue {} has B-factor {} outside the pLDDT range",
                    self.id, atom.residue_seq, atom.b_factor
                )));
            }
            scores.entry(atom.residue_seq).or_insert(atom.b_factor);
        }
        if scores.is_empty() {
            return Err(CrypticError::pdb(format!("{}: no CA atoms", self.id)));
        }
        Ok(scores)
    }

    /// pLDDT as a dense array where index `i` holds residue `i + 1`.
    ///
    /// Requires residues numbered contiguously from 1, as in AlphaFold
    /// models.
    pub fn residue_confidence(&self) -> Result<Vec<f64>> {
        let scores = self.plddt_scores()?;
        for (i, residue) in scores.keys().enumerate() {
            if *residue != i as i32 + 1 {
                return Err(CrypticError::pdb(format!(
                    "{}: residue numbering is not contiguous from 1 (found {} at position {})",
                    self.id,
                    residue,
                    i + 1
                )));
            }
        }
        Ok(scores.into_values().collect())
    }
}

/// Superposed RMSD of two structures over the same residue selection.
///
/// Fails with an alignment error when the selections hold different atom
/// counts or no atoms at all.
pub fn calculate_rmsd(
    model: &StructureCoords,
    reference: &StructureCoords,
    selection: &ResidueSelection,
) -> Result<f64> {
    let model_coords = model.coords(selection);
    let reference_coords = reference.coords(selection);
    if model_coords.len() != reference_coords.len() {
        return Err(CrypticError::alignment(format!(
            "{} selects {} atoms but {} selects {}",
            model.id,
            model_coords.len(),
            reference.id,
            reference_coords.len()
        )));
    }
    superposed_rmsd(&reference_coords, &model_coords)
}

fn parse_atom(line: &str, is_hetatm: bool) -> std::result::Result<AtomRecord, String> {
    if line.len() < 54 || !line.is_char_boundary(54) {
        return Err("record shorter than the coordinate columns".to_string());
    }
    let field = |range: std::ops::Range<usize>| line.get(range).unwrap_or("").trim();
    let coord = |range: std::ops::Range<usize>, axis: &str| {
        field(range)
            .parse::<f64>()
            .map_err(|_| format!("invalid {} coordinate", axis))
    };

    let residue_seq = field(22..26)
        .parse::<i32>()
        .map_err(|_| "invalid residue number".to_string())?;
    let b_factor = match field(60..66) {
        "" => 0.0,
        text => text
            .parse::<f64>()
            .map_err(|_| "invalid B-factor".to_string())?,
    };

    Ok(AtomRecord {
        serial: field(6..11).parse().unwrap_or(0),
        name: field(12..16).to_string(),
        residue_name: field(17..20).to_string(),
        chain_id: field(21..22).chars().next().unwrap_or(' '),
        residue_seq,
        coord: [coord(30..38, "x")?, coord(38..46, "y")?, coord(46..54, "z")?],
        b_factor,
        is_hetatm,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Render ATOM records in fixed PDB columns.
    pub(crate) fn pdb_text(atoms: &[(&str, &str, i32, [f64; 3], f64)]) -> String {
        let mut out = String::new();
        for (i, (name, res, seq, c, b)) in atoms.iter().enumerate() {
            out.push_str(&format!(
                "ATOM  {:>5} {:<4} {:>3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}           {}\n",
                i + 1,
                name,
                res,
                seq,
                c[0],
                c[1],
                c[2],
                1.0,
                b,
                &name[..1]
            ));
        }
        out.push_str("END\n");
        out
    }

    fn adar2_fragment() -> String {
        pdb_text(&[
            ("N", "LYS", 1, [0.0, 0.0, 0.0], 91.2),
            ("CA", "LYS", 1, [1.46, 0.0, 0.0], 91.2),
            ("CA", "ARG", 2, [3.8, 1.2, 0.4], 88.5),
            ("NH1", "ARG", 2, [4.9, 2.8, 1.1], 88.5),
            ("CA", "LYS", 3, [7.1, 0.6, 1.9], 45.0),
        ])
    }

    #[test]
    fn test_parse_columns() {
        let s = StructureCoords::from_pdb_str("frag", &adar2_fragment()).unwrap();
        assert_eq!(s.atoms.len(), 5);
        let ca = &s.atoms[2];
        assert_eq!(ca.name, "CA");
        assert_eq!(ca.residue_name, "ARG");
        assert_eq!(ca.chain_id, 'A');
        assert_eq!(ca.residue_seq, 2);
        assert!((ca.coord[0] - 3.8).abs() < 1e-9);
        assert!((ca.b_factor - 88.5).abs() < 1e-9);
    }

    #[test]
    fn test_plddt_from_ca_b_factor() {
        let s = StructureCoords::from_pdb_str("frag", &adar2_fragment()).unwrap();
        let plddt = s.residue_confidence().unwrap();
        assert_eq!(plddt, vec![91.2, 88.5, 45.0]);
    }

    #[test]
    fn test_plddt_out_of_range_rejected() {
        let text = pdb_text(&[("CA", "GLY", 1, [0.0; 3], 150.0)]);
        let s = StructureCoords::from_pdb_str("x", &text).unwrap();
        assert!(matches!(s.plddt_scores(), Err(CrypticError::PdbParse(_))));
    }

    #[test]
    fn test_gapped_numbering_has_no_dense_confidence() {
        let text = pdb_text(&[
            ("CA", "GLY", 1, [0.0; 3], 90.0),
            ("CA", "GLY", 3, [3.8, 0.0, 0.0], 90.0),
        ]);
        let s = StructureCoords::from_pdb_str("x", &text).unwrap();
        assert_eq!(s.plddt_scores().unwrap().len(), 2);
        assert!(s.residue_confidence().is_err());
    }

    #[test]
    fn test_bad_coordinate_is_parse_error() {
        let mut text = adar2_fragment();
        text = text.replacen("   1.460", "   x.xxx", 1);
        let err = StructureCoords::from_pdb_str("bad", &text).unwrap_err();
        assert!(matches!(err, CrypticError::PdbParse(_)));
        assert!(StructureCoords::from_pdb_str("empty", "HEADER\nEND\n").is_err());
    }

    #[test]
    fn test_selection() {
        let s = StructureCoords::from_pdb_str("frag", &adar2_fragment()).unwrap();
        assert_eq!(s.select(&ResidueSelection::all()).len(), 5);
        assert_eq!(s.select(&ResidueSelection::all().ca_only()).len(), 3);
        assert_eq!(s.select(&ResidueSelection::residues(vec![1, 2])).len(), 4);
        assert_eq!(s.select(&ResidueSelection::all().chain('B')).len(), 0);
    }

    #[test]
    fn test_calculate_rmsd_identity_and_mismatch() {
        let s = StructureCoords::from_pdb_str("frag", &adar2_fragment()).unwrap();
        let rmsd = calculate_rmsd(&s, &s, &ResidueSelection::all()).unwrap();
        assert!(rmsd < 1e-9);

        let shorter = StructureCoords::from_pdb_str(
            "short",
            &pdb_text(&[("CA", "LYS", 1, [0.0; 3], 90.0), ("CA", "ARG", 2, [3.8, 0.0, 0.0], 90.0)]),
        )
        .unwrap();
        let err = calculate_rmsd(&s, &shorter, &ResidueSelection::all().ca_only()).unwrap_err();
        assert!(matches!(err, CrypticError::Alignment(_)));
    }
}
