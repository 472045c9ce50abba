use crate::error::{CovError, CovResult};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An axis-aligned box in pixel coordinates. Corners may be fractional.
/// Used both for target positions and for covariance queries, where
/// (x2, y2) is the last pixel included.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
}

impl BoundingBox {
	pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
		BoundingBox { x1, y1, x2, y2 }
	}

	pub fn width(&self) -> f64 {
		self.x2 - self.x1
	}

	pub fn height(&self) -> f64 {
		self.y2 - self.y1
	}

	fn area(&self) -> f64 {
		self.width().max(0.0) * self.height().max(0.0)
	}

	/// Intersection over union. Zero for disjoint or empty boxes.
	pub fn iou(&self, other: &BoundingBox) -> f64 {
		let iw = self.x2.min(other.x2) - self.x1.max(other.x1);
		let ih = self.y2.min(other.y2) - self.y1.max(other.y1);
		if iw <= 0.0 || ih <= 0.0 {
			return 0.0;
		}
		let intersection = iw * ih;
		let union = self.area() + other.area() - intersection;
		if union <= 0.0 {
			0.0
		} else {
			intersection / union
		}
	}

	/// True when the box cannot be queried against integral images built for
	/// `area`.
	pub fn is_outside(&self, area: &SearchArea) -> bool {
		!area.contains(self)
	}
}

impl FromStr for BoundingBox {
	type Err = CovError;

	/// Parses `x1,y1,x2,y2`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
		if parts.len() != 4 {
			return Err(CovError::Config(format!("expected x1,y1,x2,y2, got '{}'", s)));
		}
		let mut v = [0f64; 4];
		for (slot, part) in v.iter_mut().zip(&parts) {
			*slot = f64::from_str(part).map_err(|e| CovError::Config(format!("bad coordinate '{}': {}", part, e)))?;
		}
		Ok(BoundingBox::new(v[0], v[1], v[2], v[3]))
	}
}

/// Integer pixel bounds within which the integral images are accumulated.
/// `0 <= x1 <= x2 <= width`, `0 <= y1 <= y2 <= height`; pixels with
/// `x1 <= col < x2` and `y1 <= row < y2` are inside.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchArea {
	pub x1: usize,
	pub y1: usize,
	pub x2: usize,
	pub y2: usize,
}

impl SearchArea {
	pub fn new(x1: usize, y1: usize, x2: usize, y2: usize, width: usize, height: usize) -> CovResult<Self> {
		if x1 > x2 || y1 > y2 || x2 > width || y2 > height {
			return Err(CovError::InvalidSearchArea { x1, y1, x2, y2, width, height });
		}
		Ok(SearchArea { x1, y1, x2, y2 })
	}

	pub fn full(width: usize, height: usize) -> Self {
		SearchArea { x1: 0, y1: 0, x2: width, y2: height }
	}

	/// Grows `target` by the smaller of its two sides in every direction and
	/// clamps the result to the image.
	pub fn estimate(target: &BoundingBox, width: usize, height: usize) -> CovResult<Self> {
		let margin = target.width().min(target.height());

		let x1 = if target.x1 - margin <= 0.0 { 0 } else { ((target.x1 - margin) as usize).min(width) };
		let y1 = if target.y1 - margin <= 0.0 { 0 } else { ((target.y1 - margin) as usize).min(height) };
		let x2 = if target.x2 + margin >= width as f64 { width } else { (target.x2 + margin) as usize };
		let y2 = if target.y2 + margin >= height as f64 { height } else { (target.y2 + margin) as usize };

		Self::new(x1, y1, x2, y2, width, height)
	}

	pub fn width(&self) -> usize {
		self.x2 - self.x1
	}

	pub fn height(&self) -> usize {
		self.y2 - self.y1
	}

	/// Whether every integral-image cell a query on `region` touches was
	/// accumulated. The far corner is read at `x2 + 1`, rounded up.
	pub fn contains(&self, region: &BoundingBox) -> bool {
		region.x1 >= self.x1 as f64
			&& region.y1 >= self.y1 as f64
			&& region.x2.ceil() + 1.0 <= self.x2 as f64
			&& region.y2.ceil() + 1.0 <= self.y2 as f64
	}
}
