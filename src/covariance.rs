use crate::config::CovConfig;
use crate::error::{CovError, CovResult};
use crate::feature_map::FeatureMap;
use crate::float_image::FloatImage;
use crate::integral_image::{packed_len, DualIntegralImage, IntegralGrid};
use crate::search_area::{BoundingBox, SearchArea};

use image::DynamicImage;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, info};

/// Covariance of the feature vectors over a region, plus how many pixels
/// (possibly fractional) the region covers.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCovariance {
	pub matrix: DMatrix<f64>,
	pub pixel_count: f64,
}

impl RegionCovariance {
	pub fn dim(&self) -> usize {
		self.matrix.nrows()
	}

	/// Row-major copy, handy for serializing.
	pub fn to_rows(&self) -> Vec<Vec<f64>> {
		(0..self.matrix.nrows()).map(|i| self.matrix.row(i).iter().cloned().collect()).collect()
	}
}

/// Raw region sums: Σ f fᵀ over the region, Σ f, and the pixel count.
#[derive(Debug, Clone, PartialEq)]
pub struct CovComponents {
	pub prod: DMatrix<f64>,
	pub sum: DVector<f64>,
	pub pixel_count: f64,
}

impl CovComponents {
	/// Sample covariance, `P/(N-1) - s sᵀ/(N(N-1))`.
	pub fn covariance(&self) -> CovResult<RegionCovariance> {
		let n = self.pixel_count;
		if !(n >= 2.0) {
			return Err(CovError::DegenerateRegion(n));
		}
		let dim = self.sum.len();
		let matrix = DMatrix::from_fn(dim, dim, |i, j| self.prod[(i, j)] / (n - 1.0) - self.sum[i] * self.sum[j] / (n * (n - 1.0)));
		Ok(RegionCovariance { matrix, pixel_count: n })
	}
}

fn invalid(region: &BoundingBox, reason: &'static str) -> CovError {
	CovError::InvalidRegion { x1: region.x1, y1: region.y1, x2: region.x2, y2: region.y2, reason }
}

fn validate(area: &SearchArea, region: &BoundingBox) -> CovResult<()> {
	let coords = [region.x1, region.y1, region.x2, region.y2];
	if coords.iter().any(|v| !v.is_finite()) {
		return Err(invalid(region, "non-finite coordinate"));
	}
	if !(region.x1 < region.x2 && region.y1 < region.y2) {
		return Err(invalid(region, "corners are inverted or the region is empty"));
	}
	if region.x1 < 0.0 || region.y1 < 0.0 {
		return Err(invalid(region, "negative coordinate"));
	}
	if !area.contains(region) {
		return Err(invalid(region, "region leaves the search area"));
	}
	Ok(())
}

/// Inclusion-exclusion over four interpolated corners:
///
///   A---B
///   |   |
///   C---D
///
/// D, the sum of everything above and left of the far corner, less B and C,
/// plus A since it was taken out twice.
fn corner_sum(grid: &IntegralGrid, region: &BoundingBox) -> CovResult<Vec<f64>> {
	let depth = grid.depth();
	let mut a = vec![0f64; depth];
	let mut b = vec![0f64; depth];
	let mut c = vec![0f64; depth];
	let mut d = vec![0f64; depth];
	grid.interpolate_into(region.x1, region.y1, &mut a)?;
	grid.interpolate_into(region.x2 + 1.0, region.y1, &mut b)?;
	grid.interpolate_into(region.x1, region.y2 + 1.0, &mut c)?;
	grid.interpolate_into(region.x2 + 1.0, region.y2 + 1.0, &mut d)?;
	Ok((0..depth).map(|i| d[i] + a[i] - b[i] - c[i]).collect())
}

impl DualIntegralImage {
	/// Σ f fᵀ, Σ f and N over the inclusive region (x1, y1)-(x2, y2). Cost is
	/// independent of the region's area.
	pub fn components(&self, region: &BoundingBox) -> CovResult<CovComponents> {
		validate(&self.area, region)?;
		let dim = self.dim;
		let pixel_count = (region.x2 - region.x1 + 1.0) * (region.y2 - region.y1 + 1.0);

		let packed = corner_sum(&self.prod, region)?;
		debug_assert_eq!(packed.len(), packed_len(dim));
		let mut prod = DMatrix::zeros(dim, dim);
		let mut l = 0;
		for i in 0..dim {
			for j in i..dim {
				prod[(i, j)] = packed[l];
				prod[(j, i)] = packed[l];
				l += 1;
			}
		}
		let sum = DVector::from_vec(corner_sum(&self.sum, region)?);

		Ok(CovComponents { prod, sum, pixel_count })
	}

	pub fn covariance(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> CovResult<RegionCovariance> {
		self.covariance_of(&BoundingBox::new(x1, y1, x2, y2))
	}

	pub fn covariance_of(&self, region: &BoundingBox) -> CovResult<RegionCovariance> {
		self.components(region)?.covariance()
	}

	/// Evaluates many regions against the same (read-only) integral images.
	pub fn covariances(&self, regions: &[BoundingBox]) -> Vec<CovResult<RegionCovariance>> {
		if self.parallel {
			regions.par_iter().map(|r| self.covariance_of(r)).collect()
		} else {
			regions.iter().map(|r| self.covariance_of(r)).collect()
		}
	}
}

/// Direct O(area·dim²) covariance over integer pixels x1..=x2, y1..=y2.
/// Two-pass (mean first), so it also serves as a numerically careful reference.
pub fn brute_force_covariance(features: &FeatureMap, x1: usize, y1: usize, x2: usize, y2: usize) -> CovResult<RegionCovariance> {
	let region = BoundingBox::new(x1 as f64, y1 as f64, x2 as f64, y2 as f64);
	if x1 > x2 || y1 > y2 || x2 >= features.width() || y2 >= features.height() {
		return Err(invalid(&region, "region leaves the image"));
	}
	let n = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;
	if n < 2.0 {
		return Err(CovError::DegenerateRegion(n));
	}

	let dim = features.dim();
	let mut mean = DVector::<f64>::zeros(dim);
	for y in y1..=y2 {
		for x in x1..=x2 {
			mean += DVector::from_column_slice(features.feature(x, y));
		}
	}
	mean /= n;

	let mut matrix = DMatrix::<f64>::zeros(dim, dim);
	for y in y1..=y2 {
		for x in x1..=x2 {
			let d = DVector::from_column_slice(features.feature(x, y)) - &mean;
			matrix += &d * d.transpose();
		}
	}
	matrix /= n - 1.0;
	Ok(RegionCovariance { matrix, pixel_count: n })
}

/// Per-frame processing context: owns the feature map and the integral images
/// for the current search area. Rebuild it (or call `set_search_area` again)
/// for every new frame or target position.
pub struct CovImage {
	config: CovConfig,
	features: FeatureMap,
	integral: Option<DualIntegralImage>,
}

impl CovImage {
	pub fn new(image: &FloatImage, config: &CovConfig) -> CovResult<Self> {
		let features = FeatureMap::build_with(image, config.parallel)?;
		Ok(CovImage { config: config.clone(), features, integral: None })
	}

	pub fn from_dynamic(img: &DynamicImage, config: &CovConfig) -> CovResult<Self> {
		let image = FloatImage::from_dynamic_with_config(img, config)?;
		Self::new(&image, config)
	}

	pub fn features(&self) -> &FeatureMap {
		&self.features
	}

	pub fn integral(&self) -> Option<&DualIntegralImage> {
		self.integral.as_ref()
	}

	pub fn search_area(&self) -> Option<SearchArea> {
		self.integral.as_ref().map(|ii| ii.search_area())
	}

	/// Estimates the search area around `target` and rebuilds the integral
	/// images for it.
	pub fn set_search_area(&mut self, target: &BoundingBox) -> CovResult<SearchArea> {
		let area = SearchArea::estimate(target, self.features.width(), self.features.height())?;
		info!(x1 = area.x1, y1 = area.y1, x2 = area.x2, y2 = area.y2, "search area set");
		self.rebuild(area)
	}

	pub fn set_full_search_area(&mut self) -> CovResult<SearchArea> {
		self.rebuild(SearchArea::full(self.features.width(), self.features.height()))
	}

	fn rebuild(&mut self, area: SearchArea) -> CovResult<SearchArea> {
		// Drop the old images first so both generations are never alive at once.
		self.integral = None;
		self.integral = Some(DualIntegralImage::build_with(&self.features, area, self.config.parallel)?);
		Ok(area)
	}

	fn ready(&self, region: &BoundingBox) -> CovResult<&DualIntegralImage> {
		self.integral.as_ref().ok_or_else(|| invalid(region, "no search area has been set"))
	}

	pub fn covariance(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> CovResult<RegionCovariance> {
		self.covariance_of(&BoundingBox::new(x1, y1, x2, y2))
	}

	pub fn covariance_of(&self, region: &BoundingBox) -> CovResult<RegionCovariance> {
		self.ready(region)?.covariance_of(region)
	}

	pub fn covariances(&self, regions: &[BoundingBox]) -> CovResult<Vec<CovResult<RegionCovariance>>> {
		let first = regions.first().copied().unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
		let ii = self.ready(&first)?;
		debug!(count = regions.len(), "evaluating regions");
		Ok(ii.covariances(regions))
	}
}
