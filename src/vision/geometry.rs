#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
	pub x: f32,
	pub y: f32,
}

impl Point {
	pub const fn new(x: f32, y: f32) -> Self {
		Self { x, y }
	}

	#[inline]
	pub fn distance(self, other: Point) -> f32 {
		let dx = other.x - self.x;
		let dy = other.y - self.y;
		(dx * dx + dy * dy).sqrt()
	}
}

impl From<imageproc::point::Point<i32>> for Point {
	fn from(p: imageproc::point::Point<i32>) -> Self {
		Self::new(p.x as f32, p.y as f32)
	}
}

pub const EPSILON: f64 = 1e-9;

/// Shoelace area of a closed polygon. Positive when the vertices run
/// clockwise on screen (y axis pointing down).
pub fn signed_area(points: &[Point]) -> f64 {
	if points.len() < 3 {
		return 0.0;
	}

	let mut sum = 0.0f64;
	for (i, a) in points.iter().enumerate() {
		let b = points[(i + 1) % points.len()];
		sum += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
	}
	sum / 2.0
}

pub fn polygon_area(points: &[Point]) -> f64 {
	signed_area(points).abs()
}

pub fn perimeter(points: &[Point]) -> f64 {
	if points.len() < 2 {
		return 0.0;
	}

	points
		.iter()
		.enumerate()
		.map(|(i, a)| a.distance(points[(i + 1) % points.len()]) as f64)
		.sum()
}

/// Distance from `p` to the infinite line through `a` and `b`; falls back to
/// the point distance when `a` and `b` coincide.
pub fn line_distance(p: Point, a: Point, b: Point) -> f64 {
	let (ax, ay) = (a.x as f64, a.y as f64);
	let (bx, by) = (b.x as f64, b.y as f64);
	let (px, py) = (p.x as f64, p.y as f64);

	let dx = bx - ax;
	let dy = by - ay;
	let len = (dx * dx + dy * dy).sqrt();
	if len < EPSILON {
		return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
	}

	((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Index of the point farthest from `from`.
pub fn farthest_from(points: &[Point], from: Point) -> usize {
	let mut best = 0;
	let mut best_dist = -1.0f32;
	for (i, p) in points.iter().enumerate() {
		let d = from.distance(*p);
		if d > best_dist {
			best_dist = d;
			best = i;
		}
	}
	best
}

#[cfg(test)]
mod tests {
	use super::*;

	fn square() -> Vec<Point> {
		vec![
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
			Point::new(10.0, 10.0),
			Point::new(0.0, 10.0),
		]
	}

	#[test]
	fn area_sign_follows_winding() {
		let mut points = square();
		assert_eq!(signed_area(&points), 100.0);

		points.reverse();
		assert_eq!(signed_area(&points), -100.0);
		assert_eq!(polygon_area(&points), 100.0);
	}

	#[test]
	fn closed_perimeter() {
		assert!((perimeter(&square()) - 40.0).abs() < 1e-6);
	}

	#[test]
	fn distance_to_line() {
		let d = line_distance(
			Point::new(5.0, 3.0),
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
		);
		assert!((d - 3.0).abs() < 1e-9);

		let degenerate = line_distance(
			Point::new(3.0, 4.0),
			Point::new(0.0, 0.0),
			Point::new(0.0, 0.0),
		);
		assert!((degenerate - 5.0).abs() < 1e-9);
	}
}
