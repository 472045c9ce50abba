use crate::error::{CovError, CovResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with 3-channel input before feature extraction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
	/// CIE L*a*b*, so distances between colours roughly track perception.
	#[default]
	Lab,
	/// Keep the 0..255 RGB values.
	Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovConfig {
	pub color_space: ColorSpace,
	pub parallel: bool,
}

impl Default for CovConfig {
	fn default() -> Self {
		CovConfig {
			color_space: ColorSpace::Lab,
			parallel: true,
		}
	}
}

impl CovConfig {
	pub fn from_json_str(s: &str) -> CovResult<Self> {
		serde_json::from_str(s).map_err(|e| CovError::Config(e.to_string()))
	}

	pub fn from_json_file<P: AsRef<Path>>(path: P) -> CovResult<Self> {
		let text = std::fs::read_to_string(path)?;
		Self::from_json_str(&text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_fields_fall_back_to_defaults() {
		let cfg = CovConfig::from_json_str(r#"{ "parallel": false }"#).unwrap();
		assert_eq!(cfg.color_space, ColorSpace::Lab);
		assert!(!cfg.parallel);

		let cfg = CovConfig::from_json_str("{}").unwrap();
		assert_eq!(cfg, CovConfig::default());
	}

	#[test]
	fn parses_color_space() {
		let cfg = CovConfig::from_json_str(r#"{ "color_space": "Raw" }"#).unwrap();
		assert_eq!(cfg.color_space, ColorSpace::Raw);
		assert!(cfg.parallel);
	}

	#[test]
	fn lab_is_the_default_color_space() {
		assert_eq!(ColorSpace::default(), ColorSpace::Lab);
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(CovConfig::from_json_str("{ nope"), Err(CovError::Config(_))));
		assert!(matches!(CovConfig::from_json_str(r#"{ "color_space": "HSV" }"#), Err(CovError::Config(_))));
	}
}
