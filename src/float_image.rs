use crate::color::{converter_for, ColorConverter};
use crate::config::CovConfig;
use crate::error::{CovError, CovResult};

use image::DynamicImage;

/// Row-major, channel-interleaved f64 image. Pixel (x, y) channel c lives at
/// `(y * width + x) * channels + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
	width: usize,
	height: usize,
	channels: usize,
	data: Vec<f64>,
}

impl FloatImage {
	pub fn new(width: usize, height: usize, channels: usize, data: Vec<f64>) -> CovResult<Self> {
		let expected = width * height * channels;
		if data.len() != expected {
			return Err(CovError::PixelCountMismatch { expected, actual: data.len() });
		}
		Ok(FloatImage { width, height, channels, data })
	}

	pub fn from_gray(width: usize, height: usize, pixels: &[u8]) -> CovResult<Self> {
		Self::new(width, height, 1, pixels.iter().map(|p| *p as f64).collect())
	}

	/// Gray input passes through untouched (0..255). Anything with colour goes
	/// through `converter` after scaling to 0..1, with an f32 round trip.
	pub fn from_dynamic(img: &DynamicImage, converter: &dyn ColorConverter) -> CovResult<Self> {
		let width = img.width() as usize;
		let height = img.height() as usize;
		if !img.color().has_color() {
			let gray = img.to_luma8();
			return Self::from_gray(width, height, gray.as_raw());
		}

		let rgb = img.to_rgb8();
		let mut data = Vec::with_capacity(width * height * 3);
		for px in rgb.pixels() {
			let converted = converter.convert([
				px.0[0] as f32 / 255.0,
				px.0[1] as f32 / 255.0,
				px.0[2] as f32 / 255.0,
			]);
			data.extend(converted.iter().map(|v| *v as f64));
		}
		Self::new(width, height, 3, data)
	}

	pub fn from_dynamic_with_config(img: &DynamicImage, config: &CovConfig) -> CovResult<Self> {
		let converter = converter_for(config.color_space);
		Self::from_dynamic(img, converter.as_ref())
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

	pub fn as_slice(&self) -> &[f64] {
		&self.data
	}

	/// All channels of pixel (x, y).
	pub fn pixel(&self, x: usize, y: usize) -> &[f64] {
		assert!(x < self.width && y < self.height, "pixel ({},{}) out of bounds for {}x{}", x, y, self.width, self.height);
		let start = (y * self.width + x) * self.channels;
		&self.data[start..start + self.channels]
	}

	pub fn get(&self, x: usize, y: usize, channel: usize) -> f64 {
		assert!(channel < self.channels, "channel {} out of range ({} channels)", channel, self.channels);
		self.pixel(x, y)[channel]
	}

	/// One row, all channels interleaved.
	pub fn row(&self, y: usize) -> &[f64] {
		assert!(y < self.height, "row {} out of bounds (height {})", y, self.height);
		let stride = self.width * self.channels;
		&self.data[y * stride..(y + 1) * stride]
	}
}
