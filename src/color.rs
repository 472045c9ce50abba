use crate::config::ColorSpace;

/// Maps a normalized RGB triple (each component in 0..1) onto the three
/// components the feature map sees.
pub trait ColorConverter: Send + Sync {
	fn convert(&self, rgb: [f32; 3]) -> [f32; 3];
}

/// sRGB -> XYZ (D65) -> CIE L*a*b*, all in f32.
/// L lands in 0..100, a and b roughly in -128..127.
#[derive(Debug, Default, Copy, Clone)]
pub struct LabConverter;

/// Undoes the 0..1 normalization and nothing else.
#[derive(Debug, Default, Copy, Clone)]
pub struct RawConverter;

// D65 reference white.
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

const LAB_EPSILON: f32 = 0.008856;

fn srgb_to_linear(c: f32) -> f32 {
	if c <= 0.04045 {
		c / 12.92
	} else {
		((c + 0.055) / 1.055).powf(2.4)
	}
}

fn lab_f(t: f32) -> f32 {
	if t > LAB_EPSILON {
		t.cbrt()
	} else {
		7.787 * t + 16.0 / 116.0
	}
}

impl ColorConverter for LabConverter {
	fn convert(&self, rgb: [f32; 3]) -> [f32; 3] {
		let r = srgb_to_linear(rgb[0].max(0.0).min(1.0));
		let g = srgb_to_linear(rgb[1].max(0.0).min(1.0));
		let b = srgb_to_linear(rgb[2].max(0.0).min(1.0));

		let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
		let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
		let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

		let fx = lab_f(x);
		let fy = lab_f(y);
		let fz = lab_f(z);

		let l = if y > LAB_EPSILON { 116.0 * fy - 16.0 } else { 903.3 * y };
		[l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
	}
}

impl ColorConverter for RawConverter {
	fn convert(&self, rgb: [f32; 3]) -> [f32; 3] {
		[rgb[0] * 255.0, rgb[1] * 255.0, rgb[2] * 255.0]
	}
}

pub fn converter_for(color_space: ColorSpace) -> Box<dyn ColorConverter> {
	match color_space {
		ColorSpace::Lab => Box::new(LabConverter),
		ColorSpace::Raw => Box::new(RawConverter),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	macro_rules! assert_approx_eq {
		($a:expr, $b:expr, $eps:expr) => {
			assert!(($a as f32 - $b as f32).abs() < $eps, "{} !~= {}", $a, $b);
		};
	}

	#[test]
	fn lab_white_and_black() {
		let white = LabConverter.convert([1.0, 1.0, 1.0]);
		assert_approx_eq!(white[0], 100.0, 0.05);
		assert_approx_eq!(white[1], 0.0, 0.05);
		assert_approx_eq!(white[2], 0.0, 0.05);

		let black = LabConverter.convert([0.0, 0.0, 0.0]);
		assert_approx_eq!(black[0], 0.0, 1e-4);
		assert_approx_eq!(black[1], 0.0, 1e-4);
		assert_approx_eq!(black[2], 0.0, 1e-4);
	}

	#[test]
	fn lab_primary_red() {
		// Reference values for sRGB (255, 0, 0) under D65.
		let red = LabConverter.convert([1.0, 0.0, 0.0]);
		assert_approx_eq!(red[0], 53.24, 0.1);
		assert_approx_eq!(red[1], 80.09, 0.3);
		assert_approx_eq!(red[2], 67.20, 0.3);
	}

	#[test]
	fn gray_has_no_chroma() {
		for v in &[0.1f32, 0.5, 0.9] {
			let lab = LabConverter.convert([*v, *v, *v]);
			assert_approx_eq!(lab[1], 0.0, 0.05);
			assert_approx_eq!(lab[2], 0.0, 0.05);
		}
	}

	#[test]
	fn raw_rescales() {
		let raw = converter_for(ColorSpace::Raw).convert([0.0, 0.5, 1.0]);
		assert_eq!(raw, [0.0, 127.5, 255.0]);
	}
}
