use crate::error::{CovError, CovResult};
use crate::float_image::FloatImage;

use rayon::prelude::*;
use tracing::debug;

/// Features per colour channel: intensity, Ix, Iy, Ixx, Iyy.
pub const FEATURES_PER_CHANNEL: usize = 5;
pub const FEAT_DIM1: usize = 2 + FEATURES_PER_CHANNEL;
pub const FEAT_DIM3: usize = 2 + 3 * FEATURES_PER_CHANNEL;

pub fn feature_dim(channels: usize) -> CovResult<usize> {
	match channels {
		1 => Ok(FEAT_DIM1),
		3 => Ok(FEAT_DIM3),
		n => Err(CovError::UnsupportedChannels(n)),
	}
}

/// Per-pixel feature vectors, row-major, `dim` values per cell:
/// `[x, y]` then `[I, Ix, Iy, Ixx, Iyy]` for every channel in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
	width: usize,
	height: usize,
	channels: usize,
	dim: usize,
	data: Vec<f64>,
}

impl FeatureMap {
	pub fn build(image: &FloatImage) -> CovResult<Self> {
		Self::build_with(image, true)
	}

	pub fn build_with(image: &FloatImage, parallel: bool) -> CovResult<Self> {
		let dim = feature_dim(image.channels())?;
		let (width, height) = (image.width(), image.height());
		// The stencils read one pixel either side of the nearest interior pixel.
		if width < 3 || height < 3 {
			return Err(CovError::ImageTooSmall { width, height });
		}

		let mut data = vec![0f64; width * height * dim];
		let row_len = width * dim;
		if parallel {
			data.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| fill_row(image, dim, y, row));
		} else {
			data.chunks_mut(row_len).enumerate().for_each(|(y, row)| fill_row(image, dim, y, row));
		}

		debug!(width, height, dim, parallel, "feature map built");
		Ok(FeatureMap { width, height, channels: image.channels(), dim, data })
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn height(&self) -> usize {
		self.height
	}

	pub fn channels(&self) -> usize {
		self.channels
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn as_slice(&self) -> &[f64] {
		&self.data
	}

	/// The feature vector of pixel (x, y).
	pub fn feature(&self, x: usize, y: usize) -> &[f64] {
		assert!(x < self.width && y < self.height, "feature ({},{}) out of bounds for {}x{}", x, y, self.width, self.height);
		let start = (y * self.width + x) * self.dim;
		&self.data[start..start + self.dim]
	}

	/// Features of row y, `width * dim` values.
	pub fn row(&self, y: usize) -> &[f64] {
		assert!(y < self.height, "row {} out of bounds (height {})", y, self.height);
		let row_len = self.width * self.dim;
		&self.data[y * row_len..(y + 1) * row_len]
	}
}

/// Fills one output row. Border rows and columns reuse the derivative of the
/// nearest interior pixel rather than a one-sided difference.
fn fill_row(image: &FloatImage, dim: usize, y: usize, out: &mut [f64]) {
	let width = image.width();
	let channels = image.channels();
	let cy = y.max(1).min(image.height() - 2);
	let above = image.row(cy - 1);
	let centre = image.row(cy);
	let below = image.row(cy + 1);
	let here = image.row(y);

	for (x, cell) in out.chunks_mut(dim).enumerate() {
		cell[0] = x as f64;
		cell[1] = y as f64;

		let cx = x.max(1).min(width - 2);
		for c in 0..channels {
			let left = here[(cx - 1) * channels + c];
			let mid = here[cx * channels + c];
			let right = here[(cx + 1) * channels + c];
			let up = above[x * channels + c];
			let vmid = centre[x * channels + c];
			let down = below[x * channels + c];

			let f = &mut cell[2 + c * FEATURES_PER_CHANNEL..2 + (c + 1) * FEATURES_PER_CHANNEL];
			f[0] = here[x * channels + c];
			f[1] = (right - left) / 2.0;
			f[2] = (down - up) / 2.0;
			f[3] = right - 2.0 * mid + left;
			f[4] = down + up - 2.0 * vmid;
		}
	}
}
