use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::vision::geometry::Point;

/// Target corners in the order the normalized source corners map onto:
/// down the left edge, along the bottom, up the right edge.
pub fn target_corners(width: u32, height: u32) -> [(f32, f32); 4] {
	let (w, h) = (width as f32, height as f32);
	[(0.0, 0.0), (0.0, h), (w, h), (w, 0.0)]
}

/// Warps the quadrilateral `corners` of `image` into an upright
/// `width` x `height` raster. Returns `None` for degenerate quads.
pub fn rectify(image: &RgbImage, corners: &[Point; 4], width: u32, height: u32) -> Option<RgbImage> {
	let src = corners.map(|p| (p.x, p.y));
	let projection = Projection::from_control_points(src, target_corners(width, height))?;

	let mut output = RgbImage::new(width, height);
	warp_into(
		image,
		&projection,
		Interpolation::Bilinear,
		Rgb([0u8, 0, 0]),
		&mut output,
	);

	Some(output)
}
