use std::cell::RefCell;

use font_kit::{family_name::FamilyName, font::Font, properties::Properties, source::SystemSource};
use image::RgbImage;
use raqote::{DrawOptions, DrawTarget, PathBuilder, Point, SolidSource, Source, StrokeStyle};

use crate::model::DetectedCard;

const OUTLINE_WIDTH: f32 = 3.0;

const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_HEIGHT: f32 = 26.0;
const LABEL_CHAR_WIDTH: f32 = 11.0;
const LABEL_PADDING: f32 = 4.0;
const LABEL_BASELINE: f32 = 20.0;

const COLOR_UNLABELED: (u8, u8, u8, u8) = (255, 255, 160, 0); // Orange
const COLOR_LABELED: (u8, u8, u8, u8) = (255, 0, 255, 0); // Green
const COLOR_LABEL_BACKGROUND: (u8, u8, u8, u8) = (180, 30, 30, 30); // Dark gray
const COLOR_LABEL_TEXT: (u8, u8, u8, u8) = (255, 255, 255, 255); // White

thread_local! {
	static LABEL_FONT: RefCell<Option<Font>> = RefCell::new(
		SystemSource::new()
			.select_best_match(
				&[FamilyName::Title("Arial".into()), FamilyName::SansSerif],
				&Properties::new(),
			)
			.ok()
			.and_then(|handle| handle.load().ok())
	);
}

fn solid((a, r, g, b): (u8, u8, u8, u8)) -> SolidSource {
	SolidSource::from_unpremultiplied_argb(a, r, g, b)
}

/// Draws every card's outline onto `frame`, plus `"<label> (<confidence>)"`
/// for recognized cards. Labels are skipped when no system font is found.
pub fn draw_cards(frame: &mut RgbImage, cards: &[DetectedCard]) {
	if cards.is_empty() {
		return;
	}

	let (width, height) = frame.dimensions();
	let mut dt = DrawTarget::new(width as i32, height as i32);
	dt.clear(SolidSource::from_unpremultiplied_argb(0, 0, 0, 0));

	for card in cards {
		draw_outline(&mut dt, card);
	}
	draw_annotations(&mut dt, cards);

	composite(frame, dt.get_data());
}

fn draw_outline(dt: &mut DrawTarget, card: &DetectedCard) {
	let mut pb = PathBuilder::new();
	let [first, rest @ ..] = &card.corners;
	pb.move_to(first.x, first.y);
	for corner in rest {
		pb.line_to(corner.x, corner.y);
	}
	pb.close();
	let path = pb.finish();

	let color = if card.is_labeled() {
		COLOR_LABELED
	} else {
		COLOR_UNLABELED
	};
	let stroke_style = StrokeStyle {
		width: OUTLINE_WIDTH,
		..Default::default()
	};

	dt.stroke(&path, &Source::Solid(solid(color)), &stroke_style, &DrawOptions::new());
}

fn draw_annotations(dt: &mut DrawTarget, cards: &[DetectedCard]) {
	LABEL_FONT.with(|font_cell| {
		let font_ref = font_cell.borrow();
		let Some(font) = font_ref.as_ref() else {
			return;
		};

		for card in cards {
			let Some(text) = card.annotation() else {
				continue;
			};
			let origin = card.bounding_origin();
			let x = origin.x;
			let y = (origin.y - LABEL_HEIGHT).max(0.0);

			let mut pb = PathBuilder::new();
			pb.rect(
				x,
				y,
				text.chars().count() as f32 * LABEL_CHAR_WIDTH + 2.0 * LABEL_PADDING,
				LABEL_HEIGHT,
			);
			let path = pb.finish();
			dt.fill(&path, &Source::Solid(solid(COLOR_LABEL_BACKGROUND)), &DrawOptions::new());

			dt.draw_text(
				font,
				LABEL_FONT_SIZE,
				&text,
				Point::new(x + LABEL_PADDING, y + LABEL_BASELINE),
				&Source::Solid(solid(COLOR_LABEL_TEXT)),
				&DrawOptions::new(),
			);
		}
	});
}

/// Blends premultiplied ARGB pixels over the frame.
fn composite(frame: &mut RgbImage, argb: &[u32]) {
	for (pixel, &src) in frame.pixels_mut().zip(argb) {
		let alpha = src >> 24;
		if alpha == 0 {
			continue;
		}
		let inverse = 255 - alpha;
		for (channel, shift) in pixel.0.iter_mut().zip([16u32, 8, 0]) {
			let premultiplied = (src >> shift) & 0xff;
			let blended = premultiplied + (*channel as u32 * inverse + 127) / 255;
			*channel = blended.min(255) as u8;
		}
	}
}
