use crate::error::CovResult;
use crate::integral_image::DualIntegralImage;
use crate::covariance::RegionCovariance;
use crate::search_area::BoundingBox;

/// Splits an inclusive pixel box into top-left, top-right, bottom-left and
/// bottom-right quadrants. Odd sizes give the extra row/column to the far side.
pub fn quadrants(b: &BoundingBox) -> [BoundingBox; 4] {
	let mx = ((b.x1 + b.x2) / 2.0).floor();
	let my = ((b.y1 + b.y2) / 2.0).floor();
	[
		BoundingBox::new(b.x1, b.y1, mx, my),
		BoundingBox::new(mx + 1.0, b.y1, b.x2, my),
		BoundingBox::new(b.x1, my + 1.0, mx, b.y2),
		BoundingBox::new(mx + 1.0, my + 1.0, b.x2, b.y2),
	]
}

/// Left and right halves.
pub fn vertical_halves(b: &BoundingBox) -> [BoundingBox; 2] {
	let mx = ((b.x1 + b.x2) / 2.0).floor();
	[BoundingBox::new(b.x1, b.y1, mx, b.y2), BoundingBox::new(mx + 1.0, b.y1, b.x2, b.y2)]
}

/// Top and bottom halves.
pub fn horizontal_halves(b: &BoundingBox) -> [BoundingBox; 2] {
	let my = ((b.y1 + b.y2) / 2.0).floor();
	[BoundingBox::new(b.x1, b.y1, b.x2, my), BoundingBox::new(b.x1, my + 1.0, b.x2, b.y2)]
}

pub fn quadrant_covariances(ii: &DualIntegralImage, b: &BoundingBox) -> CovResult<[RegionCovariance; 4]> {
	let [tl, tr, bl, br] = quadrants(b);
	Ok([ii.covariance_of(&tl)?, ii.covariance_of(&tr)?, ii.covariance_of(&bl)?, ii.covariance_of(&br)?])
}

/// Left/right halves when `vertical`, top/bottom otherwise.
pub fn half_covariances(ii: &DualIntegralImage, b: &BoundingBox, vertical: bool) -> CovResult<[RegionCovariance; 2]> {
	let [first, second] = if vertical { vertical_halves(b) } else { horizontal_halves(b) };
	Ok([ii.covariance_of(&first)?, ii.covariance_of(&second)?])
}
