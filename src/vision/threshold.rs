use image::{GrayImage, Luma, RgbImage, imageops::grayscale};
use imageproc::{distance_transform::Norm, filter::gaussian_blur_f32, morphology::close};

use crate::config::ExtractionConfig;

/// Binary silhouette mask of everything darker than its neighbourhood,
/// consolidated so each card becomes one solid outline.
pub fn card_mask(image: &RgbImage, config: &ExtractionConfig) -> GrayImage {
	let gray = grayscale(image);
	let blurred = if config.blur_sigma > 0.0 {
		gaussian_blur_f32(&gray, config.blur_sigma)
	} else {
		gray
	};

	let binary = adaptive_threshold_inv(
		&blurred,
		config.threshold_block_sigma,
		config.threshold_offset,
	);

	if config.closing_radius == 0 {
		return binary;
	}
	close(&binary, Norm::LInf, config.closing_radius)
}

/// Gaussian-weighted adaptive threshold, inverted: a pixel becomes foreground
/// when it is at least `offset` below its local weighted mean.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_sigma: f32, offset: f32) -> GrayImage {
	let local_mean = if block_sigma > 0.0 {
		gaussian_blur_f32(gray, block_sigma)
	} else {
		gray.clone()
	};

	let mut out = GrayImage::new(gray.width(), gray.height());
	for (x, y, pixel) in gray.enumerate_pixels() {
		let threshold = local_mean.get_pixel(x, y)[0] as f32 - offset;
		let value = if pixel[0] as f32 <= threshold { 255 } else { 0 };
		out.put_pixel(x, y, Luma([value]));
	}
	out
}
