use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovError {
	#[error("Unsupported channel count: {0} (expected 1 or 3)")]
	UnsupportedChannels(usize),
	#[error("Image too small for finite differences: {width}x{height} (need at least 3x3)")]
	ImageTooSmall { width: usize, height: usize },
	#[error("Pixel count mismatch: expected {expected}, got {actual}")]
	PixelCountMismatch { expected: usize, actual: usize },
	#[error("Invalid search area ({x1},{y1})-({x2},{y2}) for a {width}x{height} image")]
	InvalidSearchArea { x1: usize, y1: usize, x2: usize, y2: usize, width: usize, height: usize },
	#[error("Invalid region ({x1},{y1})-({x2},{y2}): {reason}")]
	InvalidRegion { x1: f64, y1: f64, x2: f64, y2: f64, reason: &'static str },
	#[error("Coordinate ({x},{y}) is outside the integral grid")]
	OutOfBounds { x: f64, y: f64 },
	#[error("Region holds {0} pixels; covariance needs at least 2")]
	DegenerateRegion(f64),
	#[error("Dimension mismatch: expected {expected}, got {actual}")]
	DimensionMismatch { expected: usize, actual: usize },
	#[error("Matrix is not positive definite")]
	NotPositiveDefinite,
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Image(#[from] image::ImageError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type CovResult<T> = Result<T, CovError>;
