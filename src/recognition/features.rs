use std::collections::HashSet;

use image::{
	GrayImage, RgbImage,
	imageops::{FilterType, grayscale, resize},
};
use imageproc::{
	corners::{Corner, corners_fast9},
	filter::gaussian_blur_f32,
};
use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::RecognitionConfig;

pub type Descriptor = [u8; 32];

const DESCRIPTOR_BITS: usize = 256;
const PATCH_RADIUS: i32 = 15;
const ORIENTATION_RADIUS: i32 = 15;
// Rotated test points stay within PATCH_RADIUS * sqrt(2).
const BORDER_MARGIN: u32 = 22;
const SUPPRESSION_RADIUS: u32 = 3;
const SMOOTHING_SIGMA: f32 = 2.0;
const PATTERN_SEED: u64 = 0x0b1e_f5ee_d000_0256;

/// Pairs of test offsets, fixed for the process so descriptors from the
/// catalog and from live cards are comparable.
static TEST_PATTERN: Lazy<Vec<[(i32, i32); 2]>> = Lazy::new(|| {
	let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
	let mut sample = move || loop {
		let x = rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS);
		let y = rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS);
		if x * x + y * y <= PATCH_RADIUS * PATCH_RADIUS {
			break (x, y);
		}
	};
	(0..DESCRIPTOR_BITS).map(|_| [sample(), sample()]).collect()
});

/// Descriptors of one image. No two are identical, so an image always
/// passes the ratio test against itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFeatures {
	pub descriptors: Vec<Descriptor>,
}

impl LocalFeatures {
	#[inline]
	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}
}

/// Oriented FAST keypoints with steered BRIEF descriptors, computed on the
/// image resized to the canonical card size.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
	width: u32,
	height: u32,
	fast_threshold: u8,
	max_features: usize,
}

impl FeatureExtractor {
	pub fn new(width: u32, height: u32, fast_threshold: u8, max_features: usize) -> Self {
		Self {
			width: width.max(1),
			height: height.max(1),
			fast_threshold,
			max_features,
		}
	}

	pub fn from_config(config: &RecognitionConfig, width: u32, height: u32) -> Self {
		Self::new(width, height, config.fast_threshold, config.max_features)
	}

	pub fn extract(&self, image: &RgbImage) -> LocalFeatures {
		let gray = grayscale(image);
		let gray = if gray.dimensions() == (self.width, self.height) {
			gray
		} else {
			resize(&gray, self.width, self.height, FilterType::Triangle)
		};
		self.extract_gray(&gray)
	}

	fn extract_gray(&self, gray: &GrayImage) -> LocalFeatures {
		let corners = self.detect_corners(gray);
		let smoothed = gaussian_blur_f32(gray, SMOOTHING_SIGMA);

		let mut seen = HashSet::with_capacity(corners.len());
		let descriptors = corners
			.into_iter()
			.map(|corner| {
				let angle = orientation(&smoothed, corner.x, corner.y);
				steered_brief(&smoothed, corner.x, corner.y, angle)
			})
			.filter(|descriptor| seen.insert(*descriptor))
			.collect();

		LocalFeatures { descriptors }
	}

	/// Strongest FAST corners away from the border, thinned so that no two
	/// lie within the suppression radius.
	fn detect_corners(&self, gray: &GrayImage) -> Vec<Corner> {
		let (width, height) = gray.dimensions();
		if width <= 2 * BORDER_MARGIN || height <= 2 * BORDER_MARGIN {
			return Vec::new();
		}

		let mut corners = corners_fast9(gray, self.fast_threshold);
		corners.retain(|c| {
			c.x >= BORDER_MARGIN
				&& c.y >= BORDER_MARGIN
				&& c.x < width - BORDER_MARGIN
				&& c.y < height - BORDER_MARGIN
		});
		corners.sort_by(|a, b| b.score.total_cmp(&a.score));
		suppress_neighbours(corners, width, height, self.max_features)
	}
}

/// Greedy non-maximum suppression over corners sorted by descending score.
fn suppress_neighbours(corners: Vec<Corner>, width: u32, height: u32, limit: usize) -> Vec<Corner> {
	let mut taken = vec![false; (width * height) as usize];
	let mut kept = Vec::with_capacity(limit.min(corners.len()));

	for corner in corners {
		if kept.len() >= limit {
			break;
		}
		if taken[(corner.y * width + corner.x) as usize] {
			continue;
		}

		let x_range = corner.x.saturating_sub(SUPPRESSION_RADIUS)..(corner.x + SUPPRESSION_RADIUS + 1).min(width);
		for y in corner.y.saturating_sub(SUPPRESSION_RADIUS)..(corner.y + SUPPRESSION_RADIUS + 1).min(height) {
			for x in x_range.clone() {
				taken[(y * width + x) as usize] = true;
			}
		}
		kept.push(corner);
	}

	kept
}

/// Angle of the vector from the keypoint to the intensity centroid of the
/// surrounding disc.
fn orientation(image: &GrayImage, cx: u32, cy: u32) -> f32 {
	let (mut m10, mut m01) = (0.0f32, 0.0f32);
	for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
		for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
			if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
				continue;
			}
			let value = sample(image, cx as i32 + dx, cy as i32 + dy) as f32;
			m10 += dx as f32 * value;
			m01 += dy as f32 * value;
		}
	}
	m01.atan2(m10)
}

fn steered_brief(image: &GrayImage, cx: u32, cy: u32, angle: f32) -> Descriptor {
	let (sin, cos) = angle.sin_cos();
	let rotate = |(x, y): (i32, i32)| {
		let (x, y) = (x as f32, y as f32);
		(
			cx as i32 + (x * cos - y * sin).round() as i32,
			cy as i32 + (x * sin + y * cos).round() as i32,
		)
	};

	let mut descriptor = [0u8; 32];
	for (bit, [p, q]) in TEST_PATTERN.iter().enumerate() {
		let (px, py) = rotate(*p);
		let (qx, qy) = rotate(*q);
		if sample(image, px, py) < sample(image, qx, qy) {
			descriptor[bit / 8] |= 1 << (bit % 8);
		}
	}
	descriptor
}

#[inline]
fn sample(image: &GrayImage, x: i32, y: i32) -> u8 {
	let x = x.clamp(0, image.width() as i32 - 1) as u32;
	let y = y.clamp(0, image.height() as i32 - 1) as u32;
	image.get_pixel(x, y)[0]
}

#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
	a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Counts query descriptors whose nearest reference descriptor is closer
/// than `ratio` times the second nearest.
pub fn count_ratio_matches(query: &LocalFeatures, reference: &LocalFeatures, ratio: f32) -> usize {
	if reference.len() < 2 {
		return 0;
	}

	query
		.descriptors
		.iter()
		.filter(|q| {
			let (mut best, mut second) = (u32::MAX, u32::MAX);
			for r in &reference.descriptors {
				let d = hamming_distance(q, r);
				if d < best {
					second = best;
					best = d;
				} else if d < second {
					second = d;
				}
			}
			(best as f32) < ratio * second as f32
		})
		.count()
}

#[cfg(test)]
mod tests {
	use image::{Rgb, imageops::rotate180};

	use super::*;
	use crate::test_utils::textured_card;

	fn extractor() -> FeatureExtractor {
		FeatureExtractor::new(300, 600, 20, 500)
	}

	#[test]
	fn hamming_counts_differing_bits() {
		let a = [0u8; 32];
		let mut b = [0u8; 32];
		b[0] = 0b1011;
		b[31] = 0xff;
		assert_eq!(hamming_distance(&a, &b), 11);
		assert_eq!(hamming_distance(&b, &b), 0);
	}

	#[test]
	fn flat_image_has_no_features() {
		let flat = RgbImage::from_pixel(300, 600, Rgb([128, 128, 128]));
		assert!(extractor().extract(&flat).is_empty());
	}

	#[test]
	fn textured_image_has_bounded_features() {
		let features = FeatureExtractor::new(300, 600, 20, 40).extract(&textured_card(1));

		assert!(!features.is_empty());
		assert!(features.len() <= 40);
	}

	#[test]
	fn corners_are_spread_out() {
		let corners = extractor().detect_corners(&grayscale(&textured_card(3)));

		assert!(!corners.is_empty());
		for (i, a) in corners.iter().enumerate() {
			for b in &corners[i + 1..] {
				let apart = a.x.abs_diff(b.x).max(a.y.abs_diff(b.y));
				assert!(apart > SUPPRESSION_RADIUS);
			}
		}
	}

	#[test]
	fn descriptors_are_unique() {
		for seed in [1, 5] {
			let features = extractor().extract(&textured_card(seed));
			let unique: HashSet<_> = features.descriptors.iter().collect();

			assert_eq!(unique.len(), features.len());
		}
	}

	#[test]
	fn repeated_texture_keeps_one_descriptor_per_pattern() {
		// The same corner pattern tiled across the card.
		let tile = |x: u32, y: u32| {
			let (tx, ty) = (x % 60, y % 60);
			if tx < 30 && ty < 30 {
				Rgb([30, 30, 30])
			} else {
				Rgb([220, 220, 220])
			}
		};
		let tiled = RgbImage::from_fn(300, 600, tile);

		let features = extractor().extract(&tiled);
		let unique: HashSet<_> = features.descriptors.iter().collect();

		assert!(!features.is_empty());
		assert_eq!(unique.len(), features.len());
	}

	#[test]
	fn every_descriptor_matches_itself() {
		let features = extractor().extract(&textured_card(1));

		assert!(features.len() >= 2);
		assert_eq!(count_ratio_matches(&features, &features, 0.75), features.len());
	}

	#[test]
	fn identical_images_match_more_than_different_ones() {
		let extractor = extractor();
		let a = extractor.extract(&textured_card(1));
		let b = extractor.extract(&textured_card(7));

		let same = count_ratio_matches(&a, &a, 0.75);
		let other = count_ratio_matches(&a, &b, 0.75);

		assert!(same > 2 * other, "same {same} vs other {other}");
	}

	#[test]
	fn half_turn_matches_the_upright_card() {
		let extractor = extractor();
		let upright = extractor.extract(&textured_card(2));
		let turned = extractor.extract(&rotate180(&textured_card(2)));
		let other = extractor.extract(&textured_card(4));

		let same = count_ratio_matches(&turned, &upright, 0.75);
		let different = count_ratio_matches(&turned, &other, 0.75);

		assert!(same > different, "same {same} vs different {different}");
	}

	#[test]
	fn tiny_reference_never_matches() {
		let extractor = extractor();
		let query = extractor.extract(&textured_card(1));
		let single = LocalFeatures {
			descriptors: query.descriptors[..1].to_vec(),
		};

		assert_eq!(count_ratio_matches(&query, &single, 0.75), 0);
		assert_eq!(count_ratio_matches(&query, &LocalFeatures::default(), 0.75), 0);
	}
}
