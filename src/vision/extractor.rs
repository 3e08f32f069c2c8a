use std::path::Path;

use image::RgbImage;
use tracing::{debug, trace};

use crate::{
	config::ExtractionConfig,
	error::ExtractionError,
	model::DetectedCard,
	vision::{
		contour::{approximate_quad, external_contours, normalize_corners},
		geometry::{Point, polygon_area},
		rectify::rectify,
		threshold::card_mask,
	},
};

pub struct CardExtractor {
	config: ExtractionConfig,
}

impl CardExtractor {
	pub fn new(config: ExtractionConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &ExtractionConfig {
		&self.config
	}

	pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<Vec<DetectedCard>, ExtractionError> {
		let image = load_image(path)?;
		self.extract(&image)
	}

	/// Finds every card-shaped quadrilateral in `frame` and rectifies it.
	///
	/// Cards come back in contour discovery order; an empty list is a normal
	/// result.
	pub fn extract(&self, frame: &RgbImage) -> Result<Vec<DetectedCard>, ExtractionError> {
		let (width, height) = frame.dimensions();
		if width == 0 || height == 0 {
			return Err(ExtractionError::EmptyFrame);
		}

		let mask_start = std::time::Instant::now();
		let mask = card_mask(frame, &self.config);
		trace!("Card mask took {:?}", mask_start.elapsed());

		let quads = self.find_quads(&mask, width, height);
		debug!("Found {} card outlines", quads.len());

		let cards = quads
			.into_iter()
			.filter_map(|quad| {
				let corners = normalize_corners(quad);
				let image = rectify(
					frame,
					&corners,
					self.config.card_width,
					self.config.card_height,
				)?;
				Some(DetectedCard::new(corners, image))
			})
			.collect();

		Ok(cards)
	}

	fn find_quads(&self, mask: &image::GrayImage, width: u32, height: u32) -> Vec<[Point; 4]> {
		let frame_area = width as f64 * height as f64;
		let min_area = frame_area * self.config.min_area_ratio;
		let max_area = frame_area * self.config.max_area_ratio;

		external_contours(mask)
			.into_iter()
			.filter(|contour| {
				let area = polygon_area(contour);
				let keep = (min_area..=max_area).contains(&area);
				if !keep {
					trace!("Rejected contour covering {:.0} of {:.0} px", area, frame_area);
				}
				keep
			})
			.filter_map(|contour| approximate_quad(&contour, &self.config.approx_tolerances))
			.collect()
	}
}

pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage, ExtractionError> {
	let path = path.as_ref();
	let image = image::open(path).map_err(|e| ExtractionError::InvalidInput {
		path: path.to_path_buf(),
		reason: e.to_string(),
	})?;
	Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
	use image::Rgb;

	use super::*;
	use crate::test_utils::{BACKGROUND, frame_with_rect};

	#[test]
	fn half_frame_rectangle_yields_one_card() {
		// 283 x 283 on a 400 x 400 frame covers half the frame.
		let frame = frame_with_rect(400, 59, 59, 283, 283);
		let extractor = CardExtractor::new(ExtractionConfig::default());

		let cards = extractor.extract(&frame).unwrap();

		assert_eq!(cards.len(), 1);
		let card = &cards[0];
		assert_eq!(card.image.dimensions(), (300, 600));
		assert!(card.label.is_none());
	}

	#[test]
	fn near_full_frame_rectangle_is_rejected() {
		// 380 x 380 on a 400 x 400 frame covers just over 90%.
		let frame = frame_with_rect(400, 10, 10, 380, 380);
		let extractor = CardExtractor::new(ExtractionConfig::default());

		let cards = extractor.extract(&frame).unwrap();

		assert!(cards.is_empty());
	}

	#[test]
	fn tiny_blob_is_ignored() {
		let frame = frame_with_rect(400, 50, 50, 10, 10);
		let extractor = CardExtractor::new(ExtractionConfig::default());

		assert!(extractor.extract(&frame).unwrap().is_empty());
	}

	#[test]
	fn blank_frame_is_not_an_error() {
		let frame = RgbImage::from_pixel(320, 240, BACKGROUND);
		let extractor = CardExtractor::new(ExtractionConfig::default());

		assert!(extractor.extract(&frame).unwrap().is_empty());
	}

	#[test]
	fn corners_put_longer_edge_first() {
		let mut frame = RgbImage::from_pixel(600, 400, BACKGROUND);
		for y in 100..220 {
			for x in 60..300 {
				frame.put_pixel(x, y, Rgb([30, 30, 30]));
			}
		}
		for y in 40..360 {
			for x in 380..540 {
				frame.put_pixel(x, y, Rgb([30, 30, 30]));
			}
		}
		let extractor = CardExtractor::new(ExtractionConfig::default());

		let cards = extractor.extract(&frame).unwrap();

		assert_eq!(cards.len(), 2);
		for card in &cards {
			let [a, b, c, _] = card.corners;
			assert!(a.distance(b) >= b.distance(c));
		}
	}

	#[test]
	fn missing_file_is_invalid_input() {
		let extractor = CardExtractor::new(ExtractionConfig::default());

		let err = extractor
			.extract_file("definitely/not/here.jpg")
			.unwrap_err();

		assert!(matches!(err, ExtractionError::InvalidInput { .. }));
	}

	#[test]
	fn undecodable_file_is_invalid_input() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("garbage.png");
		std::fs::write(&path, b"not an image").unwrap();

		let err = load_image(&path).unwrap_err();

		assert!(matches!(err, ExtractionError::InvalidInput { .. }));
	}

	#[test]
	fn empty_frame_is_rejected() {
		let extractor = CardExtractor::new(ExtractionConfig::default());
		assert!(matches!(
			extractor.extract(&RgbImage::new(0, 0)),
			Err(ExtractionError::EmptyFrame)
		));
	}
}
