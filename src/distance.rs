use crate::covariance::RegionCovariance;
use crate::error::{CovError, CovResult};

use nalgebra::{DMatrix, SymmetricEigen};

/// Added to the diagonal of both matrices before comparing, so descriptors of
/// flat regions (zero variance in some features) stay positive definite.
pub const DEFAULT_RIDGE: f64 = 1e-6;

/// Förstner-Moonen distance, sqrt(Σ ln² λᵢ) over the generalized eigenvalues
/// of (a, b). Symmetric, zero only for equal matrices, and invariant to a
/// common affine change of the features.
pub fn forstner_distance(a: &DMatrix<f64>, b: &DMatrix<f64>, ridge: f64) -> CovResult<f64> {
	let n = a.nrows();
	for m in &[a, b] {
		if m.nrows() != n || m.ncols() != n {
			return Err(CovError::DimensionMismatch { expected: n, actual: m.ncols().max(m.nrows()) });
		}
	}

	let eye = DMatrix::<f64>::identity(n, n) * ridge;
	let a = a + &eye;
	let b = b + &eye;

	// λ(a, b) are the eigenvalues of L⁻¹ a L⁻ᵀ where b = L Lᵀ.
	let chol = b.cholesky().ok_or(CovError::NotPositiveDefinite)?;
	let l_inv = chol.l().try_inverse().ok_or(CovError::NotPositiveDefinite)?;
	let m = &l_inv * a * l_inv.transpose();
	let m = (&m + m.transpose()) * 0.5;

	let mut total = 0.0;
	for lambda in SymmetricEigen::new(m).eigenvalues.iter() {
		if *lambda <= 0.0 {
			return Err(CovError::NotPositiveDefinite);
		}
		total += lambda.ln().powi(2);
	}
	Ok(total.sqrt())
}

impl RegionCovariance {
	pub fn distance(&self, other: &RegionCovariance) -> CovResult<f64> {
		forstner_distance(&self.matrix, &other.matrix, DEFAULT_RIDGE)
	}
}
