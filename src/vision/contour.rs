use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::vision::geometry::{Point, farthest_from, line_distance, perimeter, signed_area};

/// Outer borders that are not nested inside any other border.
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point>> {
	find_contours::<i32>(mask)
		.into_iter()
		.filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
		.map(|c| c.points.into_iter().map(Point::from).collect())
		.collect()
}

/// Tries each tolerance (as a fraction of the perimeter) in order and returns
/// the first approximation with exactly four vertices.
pub fn approximate_quad(contour: &[Point], tolerances: &[f64]) -> Option<[Point; 4]> {
	if contour.len() < 4 {
		return None;
	}

	let peri = perimeter(contour);
	for &tolerance in tolerances {
		let approx = approximate_closed(contour, tolerance * peri);
		if let Ok(quad) = <[Point; 4]>::try_from(approx) {
			return Some(quad);
		}
	}

	None
}

/// Douglas-Peucker simplification of a closed curve.
///
/// The curve is split at two far-apart vertices so the result does not
/// depend on where tracing started.
pub fn approximate_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
	let n = points.len();
	if n < 3 {
		return points.to_vec();
	}

	let a = farthest_from(points, points[0]);
	let b = farthest_from(points, points[a]);
	if a == b {
		return vec![points[a]];
	}

	let (start, end) = if a < b { (a, b) } else { (b, a) };
	let first: Vec<Point> = points[start..=end].to_vec();
	let second: Vec<Point> = points[end..]
		.iter()
		.chain(points[..=start].iter())
		.copied()
		.collect();

	let mut result = approximate_open(&first, epsilon);
	result.pop();
	let mut tail = approximate_open(&second, epsilon);
	tail.pop();
	result.append(&mut tail);
	result
}

/// Douglas-Peucker simplification of an open polyline; both endpoints are kept.
pub fn approximate_open(points: &[Point], epsilon: f64) -> Vec<Point> {
	if points.len() < 3 {
		return points.to_vec();
	}

	let mut keep = vec![false; points.len()];
	keep[0] = true;
	keep[points.len() - 1] = true;

	let mut stack = vec![(0usize, points.len() - 1)];
	while let Some((first, last)) = stack.pop() {
		if last <= first + 1 {
			continue;
		}

		let mut max_dist = 0.0f64;
		let mut index = first;
		for i in (first + 1)..last {
			let d = line_distance(points[i], points[first], points[last]);
			if d > max_dist {
				max_dist = d;
				index = i;
			}
		}

		if max_dist > epsilon {
			keep[index] = true;
			stack.push((first, index));
			stack.push((index, last));
		}
	}

	points
		.iter()
		.zip(keep)
		.filter_map(|(p, k)| k.then_some(*p))
		.collect()
}

/// Puts the corners in the winding of the target rectangle and rotates them
/// so that edge (0,1) is never shorter than edge (1,2).
pub fn normalize_corners(mut corners: [Point; 4]) -> [Point; 4] {
	if signed_area(&corners) > 0.0 {
		corners[1..].reverse();
	}

	let first = corners[0].distance(corners[1]);
	let second = corners[1].distance(corners[2]);
	if first < second {
		corners.rotate_left(1);
	}

	corners
}
