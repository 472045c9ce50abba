use crate::error::{CovError, CovResult};
use crate::feature_map::FeatureMap;
use crate::search_area::SearchArea;

use rayon::prelude::*;
use tracing::debug;

/// Length of the packed upper triangle of a `dim x dim` symmetric matrix.
pub fn packed_len(dim: usize) -> usize {
	dim * (dim + 1) / 2
}

/// A `rows x cols` grid holding `depth` values per cell, row-major. Cell
/// (r, c) of an integral grid aggregates pixels with row < r and col < c, so
/// row 0 and column 0 are always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralGrid {
	rows: usize,
	cols: usize,
	depth: usize,
	data: Vec<f64>,
}

impl IntegralGrid {
	fn zeros(rows: usize, cols: usize, depth: usize) -> Self {
		IntegralGrid { rows, cols, depth, data: vec![0f64; rows * cols * depth] }
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn cols(&self) -> usize {
		self.cols
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn as_slice(&self) -> &[f64] {
		&self.data
	}

	pub fn get(&self, row: usize, col: usize) -> &[f64] {
		assert!(row < self.rows && col < self.cols, "cell ({},{}) out of bounds for {}x{}", row, col, self.rows, self.cols);
		let start = (row * self.cols + col) * self.depth;
		&self.data[start..start + self.depth]
	}

	fn row_stride(&self) -> usize {
		self.cols * self.depth
	}

	/// Bilinear lookup at a real-valued (x, y) = (col, row). Integer
	/// coordinates return the cell exactly.
	pub fn interpolate(&self, x: f64, y: f64) -> CovResult<Vec<f64>> {
		let mut out = vec![0f64; self.depth];
		self.interpolate_into(x, y, &mut out)?;
		Ok(out)
	}

	pub fn interpolate_into(&self, x: f64, y: f64, out: &mut [f64]) -> CovResult<()> {
		if out.len() != self.depth {
			return Err(CovError::DimensionMismatch { expected: self.depth, actual: out.len() });
		}
		// Written so NaN fails the check too.
		if !(x >= 0.0 && y >= 0.0 && x <= (self.cols - 1) as f64 && y <= (self.rows - 1) as f64) {
			return Err(CovError::OutOfBounds { x, y });
		}

		let (x0, x1) = (x.floor() as usize, x.ceil() as usize);
		let (y0, y1) = (y.floor() as usize, y.ceil() as usize);
		let s = x - x0 as f64;
		let t = y - y0 as f64;

		let w00 = (1.0 - s) * (1.0 - t);
		let w10 = s * (1.0 - t);
		let w01 = (1.0 - s) * t;
		let w11 = s * t;

		let p00 = self.get(y0, x0);
		let p10 = self.get(y0, x1);
		let p01 = self.get(y1, x0);
		let p11 = self.get(y1, x1);
		for (i, o) in out.iter_mut().enumerate() {
			*o = w00 * p00[i] + w10 * p10[i] + w01 * p01[i] + w11 * p11[i];
		}
		Ok(())
	}
}

/// The two prefix-sum structures behind region covariance: one over the
/// packed outer product of each feature vector with itself, one over the
/// feature vector. Only cells inside the search area are accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct DualIntegralImage {
	pub(crate) prod: IntegralGrid,
	pub(crate) sum: IntegralGrid,
	pub(crate) area: SearchArea,
	pub(crate) dim: usize,
	pub(crate) parallel: bool,
}

impl DualIntegralImage {
	pub fn build(features: &FeatureMap, area: SearchArea) -> CovResult<Self> {
		Self::build_with(features, area, true)
	}

	pub fn build_with(features: &FeatureMap, area: SearchArea, parallel: bool) -> CovResult<Self> {
		let (width, height) = (features.width(), features.height());
		let area = SearchArea::new(area.x1, area.y1, area.x2, area.y2, width, height)?;
		let dim = features.dim();
		let plen = packed_len(dim);

		let mut prod = IntegralGrid::zeros(height + 1, width + 1, plen);
		let mut sum = IntegralGrid::zeros(height + 1, width + 1, dim);

		// Grid rows y1+1..=y2 hold feature rows y1..y2.
		let rows = (area.y1 + 1)..(area.y2 + 1);
		let prod_stride = prod.row_stride();
		let sum_stride = sum.row_stride();
		let prod_rows = &mut prod.data[rows.start * prod_stride..rows.end * prod_stride];
		let sum_rows = &mut sum.data[rows.start * sum_stride..rows.end * sum_stride];

		let seed = |(i, (prod_row, sum_row)): (usize, (&mut [f64], &mut [f64]))| {
			seed_row(features, &area, area.y1 + i, prod_row, sum_row);
		};
		if parallel {
			prod_rows.par_chunks_mut(prod_stride).zip(sum_rows.par_chunks_mut(sum_stride)).enumerate().for_each(seed);
		} else {
			prod_rows.chunks_mut(prod_stride).zip(sum_rows.chunks_mut(sum_stride)).enumerate().for_each(seed);
		}

		// Row pass: row r depends on row r-1, so this one is sequential.
		accumulate_down(&mut prod, &area);
		accumulate_down(&mut sum, &area);

		// Column pass: column c depends on column c-1 within a row, rows are independent.
		accumulate_across(&mut prod, &area, parallel);
		accumulate_across(&mut sum, &area, parallel);

		debug!(x1 = area.x1, y1 = area.y1, x2 = area.x2, y2 = area.y2, dim, packed = plen, "integral images built");
		Ok(DualIntegralImage { prod, sum, area, dim, parallel })
	}

	pub fn prod(&self) -> &IntegralGrid {
		&self.prod
	}

	pub fn sum(&self) -> &IntegralGrid {
		&self.sum
	}

	pub fn search_area(&self) -> SearchArea {
		self.area
	}

	pub fn dim(&self) -> usize {
		self.dim
	}
}

/// Writes the raw (not yet summed) products and features of feature row `y`
/// into the matching grid row, at columns x1+1..=x2.
fn seed_row(features: &FeatureMap, area: &SearchArea, y: usize, prod_row: &mut [f64], sum_row: &mut [f64]) {
	let dim = features.dim();
	let plen = packed_len(dim);
	for x in area.x1..area.x2 {
		let f = features.feature(x, y);
		let packed = &mut prod_row[(x + 1) * plen..(x + 2) * plen];
		let mut l = 0;
		for i in 0..dim {
			for j in i..dim {
				packed[l] = f[i] * f[j];
				l += 1;
			}
		}
		sum_row[(x + 1) * dim..(x + 2) * dim].copy_from_slice(f);
	}
}

/// Running sum across the columns of one grid row.
fn prefix_along_row(row: &mut [f64], depth: usize, area: &SearchArea) {
	for c in (area.x1 + 1)..(area.x2 + 1) {
		let (before, rest) = row.split_at_mut(c * depth);
		let prev = &before[(c - 1) * depth..];
		for (cur, p) in rest[..depth].iter_mut().zip(prev) {
			*cur += *p;
		}
	}
}

fn accumulate_across(grid: &mut IntegralGrid, area: &SearchArea, parallel: bool) {
	let stride = grid.row_stride();
	let depth = grid.depth;
	let rows = &mut grid.data[(area.y1 + 1) * stride..(area.y2 + 1) * stride];
	if parallel {
		rows.par_chunks_mut(stride).for_each(|row| prefix_along_row(row, depth, area));
	} else {
		rows.chunks_mut(stride).for_each(|row| prefix_along_row(row, depth, area));
	}
}

fn accumulate_down(grid: &mut IntegralGrid, area: &SearchArea) {
	let stride = grid.row_stride();
	let depth = grid.depth;
	let span = (area.x1 + 1) * depth..(area.x2 + 1) * depth;
	for r in (area.y1 + 1)..(area.y2 + 1) {
		let (before, rest) = grid.data.split_at_mut(r * stride);
		let prev = &before[(r - 1) * stride..];
		for (cur, p) in rest[span.clone()].iter_mut().zip(&prev[span.clone()]) {
			*cur += *p;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::float_image::FloatImage;
	use rand::rngs::StdRng;
	use rand::{Rng, SeedableRng};

	macro_rules! assert_approx_eq {
		($a:expr, $b:expr) => {
			assert!(($a as f64 - $b as f64).abs() < 1e-6, "{} !~= {}", $a, $b);
		};
	}

	fn random_features(width: usize, height: usize, seed: u64) -> FeatureMap {
		let mut rng = StdRng::seed_from_u64(seed);
		let values: Vec<f64> = (0..width * height).map(|_| rng.gen_range(0.0..255.0)).collect();
		FeatureMap::build(&FloatImage::new(width, height, 1, values).unwrap()).unwrap()
	}

	/// Sum of feature `k` over pixels with x1 <= col < x2, y1 <= row < y2.
	fn naive_sum(fm: &FeatureMap, k: usize, x1: usize, y1: usize, x2: usize, y2: usize) -> f64 {
		let mut total = 0.0;
		for y in y1..y2 {
			for x in x1..x2 {
				total += fm.feature(x, y)[k];
			}
		}
		total
	}

	#[test]
	fn packed_lengths() {
		assert_eq!(packed_len(7), 28);
		assert_eq!(packed_len(17), 153);
	}

	#[test]
	fn full_area_matches_naive_sums() {
		let fm = random_features(9, 7, 3);
		let ii = DualIntegralImage::build(&fm, SearchArea::full(9, 7)).unwrap();
		assert_eq!((ii.sum().rows(), ii.sum().cols(), ii.sum().depth()), (8, 10, 7));
		assert_eq!(ii.prod().depth(), 28);
		for r in 0..8 {
			for c in 0..10 {
				for k in 0..7 {
					assert_approx_eq!(ii.sum().get(r, c)[k], naive_sum(&fm, k, 0, 0, c, r));
				}
			}
		}
		// Padding stays zero.
		assert!(ii.prod().get(0, 5).iter().all(|v| *v == 0.0));
		assert!(ii.prod().get(4, 0).iter().all(|v| *v == 0.0));
	}

	#[test]
	fn packed_products_are_upper_triangle_row_major() {
		let fm = random_features(5, 5, 8);
		let ii = DualIntegralImage::build(&fm, SearchArea::full(5, 5)).unwrap();
		// A single pixel is the difference of four cells.
		let (x, y) = (2, 3);
		let cell = |r: usize, c: usize| ii.prod().get(r, c).to_vec();
		let (a, b, c, d) = (cell(y + 1, x + 1), cell(y, x), cell(y, x + 1), cell(y + 1, x));
		let f = fm.feature(x, y);
		let mut l = 0;
		for i in 0..7 {
			for j in i..7 {
				assert_approx_eq!(a[l] + b[l] - c[l] - d[l], f[i] * f[j]);
				l += 1;
			}
		}
	}

	#[test]
	fn restricted_area_accumulates_from_its_own_corner() {
		let fm = random_features(12, 10, 5);
		let area = SearchArea::new(3, 2, 9, 8, 12, 10).unwrap();
		let ii = DualIntegralImage::build(&fm, area).unwrap();
		for r in 2..=8 {
			for c in 3..=9 {
				assert_approx_eq!(ii.sum().get(r, c)[2], naive_sum(&fm, 2, 3, 2, c, r));
			}
		}
		// Nothing outside the area was touched.
		assert!(ii.sum().get(9, 10).iter().all(|v| *v == 0.0));
		assert!(ii.sum().get(5, 1).iter().all(|v| *v == 0.0));
	}

	#[test]
	fn rejects_area_bigger_than_image() {
		let fm = random_features(6, 6, 1);
		let area = SearchArea { x1: 0, y1: 0, x2: 7, y2: 6 };
		assert!(matches!(DualIntegralImage::build(&fm, area), Err(CovError::InvalidSearchArea { .. })));
	}

	#[test]
	fn interpolation_is_exact_at_integers() {
		let fm = random_features(8, 6, 21);
		let ii = DualIntegralImage::build(&fm, SearchArea::full(8, 6)).unwrap();
		for r in 0..7 {
			for c in 0..9 {
				assert_eq!(ii.prod().interpolate(c as f64, r as f64).unwrap(), ii.prod().get(r, c));
				assert_eq!(ii.sum().interpolate(c as f64, r as f64).unwrap(), ii.sum().get(r, c));
			}
		}
	}

	#[test]
	fn interpolation_blends_neighbours() {
		let fm = random_features(8, 6, 2);
		let ii = DualIntegralImage::build(&fm, SearchArea::full(8, 6)).unwrap();
		let g = ii.sum();
		let v = g.interpolate(2.25, 3.5).unwrap();
		for k in 0..7 {
			let expected = 0.75 * 0.5 * g.get(3, 2)[k] + 0.25 * 0.5 * g.get(3, 3)[k]
				+ 0.75 * 0.5 * g.get(4, 2)[k] + 0.25 * 0.5 * g.get(4, 3)[k];
			assert_approx_eq!(v[k], expected);
		}
		// On a grid line only one axis blends.
		let v = g.interpolate(4.0, 1.5).unwrap();
		assert_approx_eq!(v[0], 0.5 * (g.get(1, 4)[0] + g.get(2, 4)[0]));
	}

	#[test]
	fn interpolation_bounds() {
		let fm = random_features(4, 4, 2);
		let ii = DualIntegralImage::build(&fm, SearchArea::full(4, 4)).unwrap();
		assert!(ii.sum().interpolate(4.0, 4.0).is_ok());
		assert!(matches!(ii.sum().interpolate(4.01, 0.0), Err(CovError::OutOfBounds { .. })));
		assert!(matches!(ii.sum().interpolate(0.0, -0.5), Err(CovError::OutOfBounds { .. })));
		assert!(ii.sum().interpolate(f64::NAN, 1.0).is_err());

		let mut short = vec![0f64; 3];
		let res = ii.sum().interpolate_into(1.0, 1.0, &mut short);
		assert!(matches!(res, Err(CovError::DimensionMismatch { expected: 7, actual: 3 })));
	}

	#[test]
	fn rebuilding_is_deterministic() {
		let fm = random_features(20, 15, 99);
		let area = SearchArea::new(1, 2, 18, 14, 20, 15).unwrap();
		let a = DualIntegralImage::build_with(&fm, area, true).unwrap();
		let b = DualIntegralImage::build_with(&fm, area, true).unwrap();
		let c = DualIntegralImage::build_with(&fm, area, false).unwrap();
		assert_eq!(a.prod().as_slice(), b.prod().as_slice());
		assert_eq!(a.sum().as_slice(), c.sum().as_slice());
		assert_eq!(a.prod().as_slice(), c.prod().as_slice());
	}
}
