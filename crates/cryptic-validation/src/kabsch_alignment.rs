//! Kabsch superposition and RMSD
//!
//! Used by the structural cross-check of the validation suite to compare a
//! predicted model against an experimental reference over a residue
//! selection (for ADAR2, AlphaFold model vs. the 1ZY7 crystal structure).
//!
//! # Key Functions
//!
//! - `kabsch_align`: optimal rigid superposition of mobile onto reference
//! - `superposed_rmsd`: RMSD after superposition
//! - `compute_rmsd`: RMSD of two coordinate sets as given

use cryptic_core::{CrypticError, Result};
use nalgebra::{Matrix3, Vector3};

/// Rigid superposition of a mobile coordinate set onto a reference.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// RMSD after superposition (Å)
    pub rmsd: f64,
    /// Proper rotation (det = +1) applied to the mobile coordinates
    pub rotation: [[f64; 3]; 3],
    /// Translation applied after rotation
    pub translation: [f64; 3],
    /// Mobile coordinates in the reference frame
    pub aligned: Vec<[f64; 3]>,
}

/// Centroid of a set of coordinates; the origin for an empty set.
pub fn compute_centroid(coords: &[[f64; 3]]) -> [f64; 3] {
    if coords.is_empty() {
        return [0.0; 3];
    }
    let n = coords.len() as f64;
    let mut centroid = [0.0f64; 3];
    for pos in coords {
        for k in 0..3 {
            centroid[k] += pos[k];
        }
    }
    centroid.map(|c| c / n)
}

/// RMSD of two equally sized coordinate sets, without superposition.
pub fn compute_rmsd(coords1: &[[f64; 3]], coords2: &[[f64; 3]]) -> Result<f64> {
    check_sizes(coords1, coords2)?;
    let n = coords1.len() as f64;
    let sum_sq: f64 = coords1
        .iter()
        .zip(coords2)
        .map(|(a, b)| {
            let dx = a[0] - b[0];
            let dy = a[1] - b[1];
            let dz = a[2] - b[2];
            dx * dx + dy * dy + dz * dz
        })
        .sum();
    Ok((sum_sq / n).sqrt())
}

/// Superpose `mobile` onto `reference` with the Kabsch algorithm.
///
/// 1. Center both sets on their centroids
/// 2. Covariance H = Σ mobile_i · reference_iᵀ
/// 3. SVD: H = U S Vᵀ, R = V Uᵀ
/// 4. If det(R) < 0, flip the column of V belonging to the smallest
///    singular value so R is a proper rotation
pub fn kabsch_align(reference: &[[f64; 3]], mobile: &[[f64; 3]]) -> Result<Alignment> {
    check_sizes(reference, mobile)?;

    let ref_center = Vector3::from(compute_centroid(reference));
    let mobile_center = Vector3::from(compute_centroid(mobile));

    let mut h = Matrix3::<f64>::zeros();
    for (m, r) in mobile.iter().zip(reference) {
        let m = Vector3::from(*m) - mobile_center;
        let r = Vector3::from(*r) - ref_center;
        h += m * r.transpose();
    }

    let rotation = optimal_rotation(&h)?;
    let translation = ref_center - rotation * mobile_center;

    let aligned: Vec<[f64; 3]> = mobile
        .iter()
        .map(|p| {
            let q = rotation * Vector3::from(*p) + translation;
            [q.x, q.y, q.z]
        })
        .collect();
    let rmsd = compute_rmsd(reference, &aligned)?;

    Ok(Alignment {
        rmsd,
        rotation: [
            [rotation[(0, 0)], rotation[(0, 1)], rotation[(0, 2)]],
            [rotation[(1, 0)], rotation[(1, 1)], rotation[(1, 2)]],
            [rotation[(2, 0)], rotation[(2, 1)], rotation[(2, 2)]],
        ],
        translation: [translation.x, translation.y, translation.z],
        aligned,
    })
}

/// RMSD after optimal superposition.
pub fn superposed_rmsd(reference: &[[f64; 3]], mobile: &[[f64; 3]]) -> Result<f64> {
    Ok(kabsch_align(reference, mobile)?.rmsd)
}

fn optimal_rotation(h: &Matrix3<f64>) -> Result<Matrix3<f64>> {
    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(CrypticError::alignment("SVD of the covariance matrix failed"));
    };

    let u_t = u.transpose();
    let mut v = v_t.transpose();
    let mut r = v * u_t;
    if r.determinant() < 0.0 {
        let k = svd.singular_values.imin();
        for i in 0..3 {
            v[(i, k)] = -v[(i, k)];
        }
        r = v * u_t;
    }
    Ok(r)
}

fn check_sizes(a: &[[f64; 3]], b: &[[f64; 3]]) -> Result<()> {
    if a.len() != b.len() {
        return Err(CrypticError::alignment(format!(
            "atom counts differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(CrypticError::alignment("no atoms selected"));
    }
    Ok(())
}
