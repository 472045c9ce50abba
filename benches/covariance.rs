use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use covimage::{BoundingBox, CovConfig, CovImage, DualIntegralImage, FeatureMap, FloatImage, SearchArea};

/// Textured scene: a diagonal gradient with a few bright blocks.
fn make_scene(w: usize, h: usize, channels: usize) -> FloatImage {
	let mut data = Vec::with_capacity(w * h * channels);
	for y in 0..h {
		for x in 0..w {
			let block = (x / 40 + y / 30) % 3 == 0;
			for c in 0..channels {
				let base = ((x * 200 / w) + (y * 55 / h) + c * 17) as f64;
				data.push(if block { 255.0 - base * 0.5 } else { base });
			}
		}
	}
	FloatImage::new(w, h, channels, data).expect("scene dimensions")
}

fn bench_feature_map(c: &mut Criterion) {
	let mut group = c.benchmark_group("feature_map");
	for &channels in &[1usize, 3] {
		let img = make_scene(640, 480, channels);
		group.bench_function(BenchmarkId::new("build_640x480", channels), |b| {
			b.iter(|| FeatureMap::build(&img).unwrap())
		});
	}
	group.finish();
}

fn bench_integral(c: &mut Criterion) {
	let mut group = c.benchmark_group("integral");
	for &channels in &[1usize, 3] {
		let features = FeatureMap::build(&make_scene(640, 480, channels)).unwrap();
		let target = BoundingBox::new(280.0, 200.0, 360.0, 280.0);
		let area = SearchArea::estimate(&target, 640, 480).unwrap();
		group.bench_function(BenchmarkId::new("search_area", channels), |b| {
			b.iter(|| DualIntegralImage::build(&features, area).unwrap())
		});
		group.bench_function(BenchmarkId::new("full_640x480", channels), |b| {
			b.iter(|| DualIntegralImage::build(&features, SearchArea::full(640, 480)).unwrap())
		});
	}
	group.finish();
}

fn bench_queries(c: &mut Criterion) {
	let img = make_scene(640, 480, 3);
	let mut ci = CovImage::new(&img, &CovConfig::default()).unwrap();
	ci.set_search_area(&BoundingBox::new(280.0, 200.0, 360.0, 280.0)).unwrap();

	let regions: Vec<BoundingBox> = (0..400)
		.map(|i| {
			let dx = (i % 20) as f64 * 2.5;
			let dy = (i / 20) as f64 * 2.5;
			BoundingBox::new(250.0 + dx, 170.0 + dy, 330.0 + dx, 250.0 + dy)
		})
		.collect();

	let mut group = c.benchmark_group("query");
	group.bench_function("single_fractional", |b| {
		b.iter(|| ci.covariance(281.5, 200.25, 359.75, 279.5).unwrap())
	});
	group.bench_function(BenchmarkId::new("batch", regions.len()), |b| {
		b.iter(|| ci.covariances(&regions).unwrap())
	});
	group.finish();
}

criterion_group!(benches, bench_feature_map, bench_integral, bench_queries);
criterion_main!(benches);
