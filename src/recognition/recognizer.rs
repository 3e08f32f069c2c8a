use image::{RgbImage, imageops::rotate180};
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::{
	config::RecognitionConfig,
	error::EmbeddingError,
	model::{Confidence, DetectedCard, Similarity},
	recognition::{
		catalog::{ReferenceCatalog, ReferenceEntry},
		embedding::{Embedder, Embedding},
		features::{FeatureExtractor, LocalFeatures, count_ratio_matches},
	},
};

/// A reference entry paired with the score one stage gave it.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a, S> {
	pub entry: &'a ReferenceEntry,
	pub score: S,
}

impl<S> Ranked<'_, S> {
	#[inline]
	pub fn label(&self) -> &str {
		&self.entry.label
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
	pub label: String,
	pub score: Confidence,
}

/// Scores every reference by the better of the upright and the rotated
/// query embedding. Sorted descending; ties keep catalog order.
pub fn stage1<'a>(
	catalog: &'a ReferenceCatalog, query: &Embedding, rotated: &Embedding,
) -> Vec<Ranked<'a, Similarity>> {
	let mut ranked: Vec<_> = catalog
		.entries()
		.iter()
		.map(|entry| {
			let upright = query.cosine(&entry.embedding).value();
			let flipped = rotated.cosine(&entry.embedding).value();
			Ranked {
				entry,
				score: Similarity::new(upright.max(flipped)),
			}
		})
		.collect();

	ranked.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
	ranked
}

/// Re-ranks `shortlist` by the share of query features that pass the ratio
/// test against each reference. Sorted descending; ties keep shortlist order.
pub fn stage2<'a>(
	shortlist: &[&'a ReferenceEntry], query: &LocalFeatures, ratio: f32,
) -> Vec<Ranked<'a, Confidence>> {
	let mut ranked: Vec<_> = shortlist
		.par_iter()
		.map(|&entry| {
			let accepted = if query.is_empty() || entry.features.is_empty() {
				0
			} else {
				count_ratio_matches(query, &entry.features, ratio)
			};
			Ranked {
				entry,
				score: Confidence::from_matches(accepted, query.len()),
			}
		})
		.collect();

	ranked.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
	ranked
}

/// `top_k * multiplier`, raised to `lower_bound`, capped at what is available.
#[inline]
pub fn shortlist_size(top_k: usize, multiplier: usize, lower_bound: usize, available: usize) -> usize {
	top_k.saturating_mul(multiplier).max(lower_bound).min(available)
}

pub struct HybridRecognizer {
	embedder: Box<dyn Embedder>,
	catalog: ReferenceCatalog,
	features: FeatureExtractor,
	top_k: usize,
	shortlist_multiplier: usize,
	shortlist_min: usize,
	ratio_threshold: f32,
}

impl HybridRecognizer {
	pub fn new(
		embedder: Box<dyn Embedder>, catalog: ReferenceCatalog, features: FeatureExtractor,
		config: &RecognitionConfig,
	) -> Self {
		if catalog.is_empty() {
			warn!("Recognizer built over an empty catalog; every card will stay unlabeled");
		}

		Self {
			embedder,
			catalog,
			features,
			top_k: config.top_k.max(1),
			shortlist_multiplier: config.shortlist_multiplier,
			shortlist_min: config.shortlist_min,
			ratio_threshold: config.ratio_threshold,
		}
	}

	#[inline]
	pub fn catalog(&self) -> &ReferenceCatalog {
		&self.catalog
	}

	/// How many results [`HybridRecognizer::label_cards`] asks for.
	#[inline]
	pub fn top_k(&self) -> usize {
		self.top_k
	}

	fn shortlist_len(&self, top_k: usize, available: usize) -> usize {
		shortlist_size(top_k, self.shortlist_multiplier, self.shortlist_min, available)
	}

	/// Ranks `image` against the catalog. At most `top_k` results, possibly
	/// none; `min_score` applies to the stage-1 similarity.
	pub fn recognize(
		&mut self, image: &RgbImage, top_k: usize, min_score: Option<f32>,
	) -> Result<Vec<Recognition>, EmbeddingError> {
		if top_k == 0 || self.catalog.is_empty() {
			return Ok(Vec::new());
		}

		let started = std::time::Instant::now();
		let query = self.embedder.embed(image)?;
		let rotated = self.embedder.embed(&rotate180(image))?;

		let mut coarse = stage1(&self.catalog, &query, &rotated);
		if let Some(min) = min_score {
			coarse.retain(|r| r.score.value() >= min);
		}
		if coarse.is_empty() {
			trace!("No reference passed the stage-1 threshold");
			return Ok(Vec::new());
		}
		debug!("Stage 1 best: {} ({})", coarse[0].label(), coarse[0].score);

		let size = self.shortlist_len(top_k, coarse.len());
		let shortlist: Vec<&ReferenceEntry> = coarse.iter().take(size).map(|r| r.entry).collect();

		let query_features = self.features.extract(image);
		let fine = stage2(&shortlist, &query_features, self.ratio_threshold);

		trace!(
			"Recognition over {} of {} references took {:?}",
			shortlist.len(),
			self.catalog.len(),
			started.elapsed()
		);

		Ok(fine
			.into_iter()
			.take(top_k)
			.map(|r| Recognition {
				label: r.entry.label.clone(),
				score: r.score,
			})
			.collect())
	}

	/// Labels each card with its best match, ranking the configured `top_k`.
	/// A card whose recognition fails is left unlabeled.
	pub fn label_cards(&mut self, cards: &mut [DetectedCard], min_score: Option<f32>) {
		let top_k = self.top_k;
		for card in cards.iter_mut() {
			match self.recognize(&card.image, top_k, min_score) {
				Ok(results) => {
					if let Some(best) = results.into_iter().next() {
						card.set_label(best.label, best.score);
					}
				}
				Err(e) => warn!("Skipping card recognition: {e}"),
			}
		}
	}
}
