//! Region covariance descriptors in constant time per query.
//!
//! An image becomes a per-pixel feature map (coordinates, intensity, first
//! and second derivatives per channel). Two integral images over that map,
//! one of packed outer products and one of the raw features, make the
//! covariance of any axis-aligned region (fractional corners included) an
//! O(dim²) lookup regardless of the region's size.
//!
//! ```no_run
//! use covimage::{BoundingBox, CovConfig, CovImage};
//!
//! let img = image::open("frame.png").unwrap();
//! let mut ci = CovImage::from_dynamic(&img, &CovConfig::default()).unwrap();
//! ci.set_search_area(&BoundingBox::new(40.0, 30.0, 80.0, 90.0)).unwrap();
//! let cov = ci.covariance(45.0, 35.5, 75.0, 85.0).unwrap();
//! println!("{} pixels, dim {}", cov.pixel_count, cov.dim());
//! ```

pub mod color;
pub mod config;
pub mod covariance;
pub mod distance;
pub mod error;
pub mod feature_map;
pub mod float_image;
pub mod integral_image;
pub mod region;
pub mod search_area;

pub use config::{ColorSpace, CovConfig};
pub use covariance::{brute_force_covariance, CovComponents, CovImage, RegionCovariance};
pub use error::{CovError, CovResult};
pub use feature_map::FeatureMap;
pub use float_image::FloatImage;
pub use integral_image::{DualIntegralImage, IntegralGrid};
pub use search_area::{BoundingBox, SearchArea};
