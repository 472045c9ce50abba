use covimage::region;
use covimage::{BoundingBox, CovConfig, CovImage, RegionCovariance};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Prints the region covariance descriptor of a box in an image as JSON.
#[derive(Parser, Debug)]
#[command(name = "covimage", version)]
struct Args {
	/// Image to read (anything the image crate can decode).
	image: PathBuf,

	/// Last known target position, x1,y1,x2,y2. The search area is grown around it.
	#[arg(long)]
	target: BoundingBox,

	/// Region to describe, x1,y1,x2,y2 inclusive. Defaults to the target.
	#[arg(long)]
	region: Option<BoundingBox>,

	/// JSON configuration file.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Also describe the four quadrants of the region.
	#[arg(long)]
	quadrants: bool,
}

#[derive(Serialize)]
struct Report {
	name: &'static str,
	region: BoundingBox,
	pixel_count: f64,
	covariance: Vec<Vec<f64>>,
}

impl Report {
	fn new(name: &'static str, region: BoundingBox, cov: &RegionCovariance) -> Self {
		Report { name, region, pixel_count: cov.pixel_count, covariance: cov.to_rows() }
	}
}

fn main() -> Result<()> {
	tracing_subscriber::fmt().with_target(false).with_writer(std::io::stderr).init();
	debug!("Starting...");

	let args = Args::parse();
	let config = match &args.config {
		Some(path) => CovConfig::from_json_file(path).with_context(|| format!("Failed to load config {}", path.display()))?,
		None => CovConfig::default(),
	};

	let img = image::open(&args.image).with_context(|| format!("Failed to open {}", args.image.display()))?;
	let mut cov_image = CovImage::from_dynamic(&img, &config)?;
	let area = cov_image.set_search_area(&args.target)?;
	info!(width = area.width(), height = area.height(), "integral images ready");

	let region = args.region.unwrap_or(args.target);
	let mut reports = vec![Report::new("region", region, &cov_image.covariance_of(&region)?)];

	if args.quadrants {
		let integral = cov_image.integral().context("integral images were not built")?;
		let names = ["top_left", "top_right", "bottom_left", "bottom_right"];
		let covs = region::quadrant_covariances(integral, &region)?;
		for ((name, quadrant), cov) in names.iter().zip(region::quadrants(&region).iter()).zip(covs.iter()) {
			reports.push(Report::new(*name, *quadrant, cov));
		}
	}

	println!("{}", serde_json::to_string_pretty(&reports)?);
	Ok(())
}
