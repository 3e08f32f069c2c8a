//! Synthetic frames and cards shared by the image-based unit tests.

use image::{Rgb, RgbImage, imageops::replace};
use imageproc::{
	drawing::draw_polygon_mut,
	geometric_transformations::{Interpolation, Projection, warp_into},
	point::Point,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub(crate) const BACKGROUND: Rgb<u8> = Rgb([200, 200, 200]);

const CARD_BORDER: u32 = 20;
const TRIANGLES: usize = 60;
const TRIANGLE_REACH: i32 = 45;

/// Light frame with one dark axis-aligned rectangle.
pub(crate) fn frame_with_rect(size: u32, x0: u32, y0: u32, w: u32, h: u32) -> RgbImage {
	let mut frame = RgbImage::from_pixel(size, size, BACKGROUND);
	for y in y0..y0 + h {
		for x in x0..x0 + w {
			frame.put_pixel(x, y, Rgb([25, 25, 25]));
		}
	}
	frame
}

/// 300 x 600 card face: a dark border around overlapping triangles whose
/// layout and shades are drawn from `seed`, so every corner has its own
/// surroundings.
pub(crate) fn textured_card(seed: u32) -> RgbImage {
	let mut rng = StdRng::seed_from_u64(u64::from(seed) ^ 0x5eed_ca2d);
	let (inner_w, inner_h) = (300 - 2 * CARD_BORDER, 600 - 2 * CARD_BORDER);
	let mut face = RgbImage::from_pixel(inner_w, inner_h, Rgb([235, 228, 210]));

	for _ in 0..TRIANGLES {
		let cx = rng.gen_range(0..inner_w as i32);
		let cy = rng.gen_range(0..inner_h as i32);
		let triangle: Vec<_> = (0..3)
			.map(|_| {
				Point::new(
					cx + rng.gen_range(-TRIANGLE_REACH..=TRIANGLE_REACH),
					cy + rng.gen_range(-TRIANGLE_REACH..=TRIANGLE_REACH),
				)
			})
			.collect();
		let shade = rng.gen_range(25u8..=225);
		let tint = rng.gen_range(0u8..=30);
		if triangle[0] == triangle[2] {
			continue;
		}
		let color = Rgb([shade, shade.saturating_sub(tint), shade / 2 + 40]);
		draw_polygon_mut(&mut face, &triangle, color);
	}

	let mut card = RgbImage::from_pixel(300, 600, Rgb([20, 20, 20]));
	replace(&mut card, &face, CARD_BORDER as i64, CARD_BORDER as i64);
	card
}

/// Pastes `card` into a `width` x `height` light frame so that the card's
/// top-left, bottom-left, bottom-right and top-right corners land on `quad`.
pub(crate) fn place_card(card: &RgbImage, width: u32, height: u32, quad: [(f32, f32); 4]) -> RgbImage {
	let (w, h) = (card.width() as f32, card.height() as f32);
	let source = [(0.0, 0.0), (0.0, h), (w, h), (w, 0.0)];
	let projection = Projection::from_control_points(source, quad)
		.expect("test quad must be non-degenerate");

	let mut frame = RgbImage::from_pixel(width, height, BACKGROUND);
	warp_into(card, &projection, Interpolation::Bilinear, BACKGROUND, &mut frame);
	frame
}
