/// Share of a candidate's local features that found an unambiguous partner in
/// the reference, expressed as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Confidence(f32);

impl Confidence {
	#[inline]
	pub fn new(value: f32) -> Self {
		if value.is_nan() {
			return Self(0.0);
		}
		Self(value.clamp(0.0, 100.0))
	}

	#[inline]
	pub fn from_matches(accepted: usize, total: usize) -> Self {
		if total == 0 {
			return Self(0.0);
		}
		Self::new(accepted as f32 * 100.0 / total as f32)
	}

	#[inline]
	pub const fn value(self) -> f32 {
		self.0
	}
}

impl std::fmt::Display for Confidence {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:.2}", self.0)
	}
}

impl From<f32> for Confidence {
	fn from(value: f32) -> Self {
		Self::new(value)
	}
}

/// Cosine similarity between two unit-norm embeddings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Similarity(f32);

impl Similarity {
	#[inline]
	pub const fn new(value: f32) -> Self {
		Self(value)
	}

	#[inline]
	pub const fn value(self) -> f32 {
		self.0
	}
}

impl std::fmt::Display for Similarity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:.3}", self.0)
	}
}
