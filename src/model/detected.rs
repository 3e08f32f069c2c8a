use image::RgbImage;

use crate::{model::confidence::Confidence, vision::geometry::Point};

/// One card found in a frame, rectified to the canonical size.
///
/// `corners` are ordered so that edge (0,1) is the longer of the first two
/// edges and maps to the rectified image height.
#[derive(Clone, Debug)]
pub struct DetectedCard {
	pub corners: [Point; 4],
	pub image: RgbImage,
	pub label: Option<String>,
	pub confidence: Option<Confidence>,
}

impl DetectedCard {
	pub fn new(corners: [Point; 4], image: RgbImage) -> Self {
		Self {
			corners,
			image,
			label: None,
			confidence: None,
		}
	}

	pub fn set_label(&mut self, label: impl Into<String>, confidence: Confidence) {
		self.label = Some(label.into());
		self.confidence = Some(confidence);
	}

	#[inline]
	pub fn is_labeled(&self) -> bool {
		self.label.is_some()
	}

	pub fn centroid(&self) -> Point {
		let (sx, sy) = self
			.corners
			.iter()
			.fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
		Point::new(sx / 4.0, sy / 4.0)
	}

	/// Top-left corner of the axis-aligned box around the corners.
	pub fn bounding_origin(&self) -> Point {
		let x = self.corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
		let y = self.corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
		Point::new(x, y)
	}

	pub fn annotation(&self) -> Option<String> {
		let label = self.label.as_ref()?;
		Some(match self.confidence {
			Some(confidence) => format!("{label} ({confidence})"),
			None => label.clone(),
		})
	}
}

/// Sorts cards by the horizontal position of their centroid.
///
/// Extraction returns cards in contour discovery order; callers that need the
/// physical left-to-right layout must call this explicitly.
pub fn sort_left_to_right(cards: &mut [DetectedCard]) {
	cards.sort_by(|a, b| a.centroid().x.total_cmp(&b.centroid().x));
}

/// Labels of every recognized card, in detection order.
pub fn labels_of(cards: &[DetectedCard]) -> Vec<String> {
	cards.iter().filter_map(|card| card.label.clone()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn card_at(x: f32, label: Option<&str>) -> DetectedCard {
		let corners = [
			Point::new(x, 0.0),
			Point::new(x, 20.0),
			Point::new(x + 10.0, 20.0),
			Point::new(x + 10.0, 0.0),
		];
		let mut card = DetectedCard::new(corners, RgbImage::new(1, 1));
		if let Some(label) = label {
			card.set_label(label, Confidence::new(42.0));
		}
		card
	}

	#[test]
	fn sorts_by_centroid_x() {
		let mut cards = vec![
			card_at(50.0, Some("c")),
			card_at(0.0, Some("a")),
			card_at(25.0, Some("b")),
		];

		sort_left_to_right(&mut cards);

		assert_eq!(labels_of(&cards), vec!["a", "b", "c"]);
	}

	#[test]
	fn annotation_includes_confidence() {
		assert_eq!(
			card_at(0.0, Some("le_mat")).annotation().as_deref(),
			Some("le_mat (42.00)")
		);
		assert_eq!(card_at(0.0, None).annotation(), None);
	}

	#[test]
	fn unlabeled_cards_are_skipped() {
		let cards = vec![card_at(0.0, None), card_at(10.0, Some("x"))];
		assert_eq!(labels_of(&cards), vec!["x"]);
	}
}
