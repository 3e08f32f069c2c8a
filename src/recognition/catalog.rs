use std::{
	collections::HashSet,
	path::{Path, PathBuf},
};

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
	error::CatalogError,
	recognition::{
		embedding::{Embedder, Embedding},
		features::{FeatureExtractor, LocalFeatures},
	},
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
	pub label: String,
	pub embedding: Embedding,
	pub features: LocalFeatures,
}

/// Labeled reference cards, built once and read-only afterwards.
#[derive(Debug, Default)]
pub struct ReferenceCatalog {
	entries: Vec<ReferenceEntry>,
}

impl ReferenceCatalog {
	/// Indexes every image in `dir`; each file stem becomes a label.
	pub fn build(
		dir: &Path, embedder: &mut dyn Embedder, extractor: &FeatureExtractor,
	) -> Result<Self, CatalogError> {
		let started = std::time::Instant::now();
		let paths = reference_images(dir)?;
		if paths.is_empty() {
			return Err(CatalogError::Empty(dir.to_path_buf()));
		}

		let mut seen = HashSet::new();
		for path in &paths {
			let label = label_of(path);
			if !seen.insert(label.clone()) {
				return Err(CatalogError::DuplicateLabel(label));
			}
		}

		let loaded = paths
			.par_iter()
			.map(|path| {
				let image = image::open(path)
					.map_err(|e| CatalogError::UnreadableImage {
						path: path.clone(),
						reason: e.to_string(),
					})?
					.to_rgb8();
				let features = extractor.extract(&image);
				debug!("{}: {} local features", path.display(), features.len());
				Ok((label_of(path), image, features))
			})
			.collect::<Result<Vec<(String, RgbImage, LocalFeatures)>, CatalogError>>()?;

		let mut entries = Vec::with_capacity(loaded.len());
		for (label, image, features) in loaded {
			let embedding = embedder
				.embed(&image)
				.map_err(|source| CatalogError::Embedding { label: label.clone(), source })?;
			entries.push(ReferenceEntry {
				label,
				embedding,
				features,
			});
		}

		info!(
			"Loaded {} reference cards from {} in {:?}",
			entries.len(),
			dir.display(),
			started.elapsed()
		);

		Ok(Self { entries })
	}

	/// Wraps prebuilt entries; labels must still be unique.
	pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, CatalogError> {
		let duplicate = {
			let mut seen = HashSet::new();
			entries
				.iter()
				.find(|e| !seen.insert(e.label.as_str()))
				.map(|e| e.label.clone())
		};
		if let Some(label) = duplicate {
			return Err(CatalogError::DuplicateLabel(label));
		}
		Ok(Self { entries })
	}

	#[inline]
	pub fn entries(&self) -> &[ReferenceEntry] {
		&self.entries
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, label: &str) -> Option<&ReferenceEntry> {
		self.entries.iter().find(|e| e.label == label)
	}

	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|e| e.label.as_str())
	}
}

fn reference_images(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
	let unreadable = |e: std::io::Error| CatalogError::UnreadableDirectory {
		path: dir.to_path_buf(),
		reason: e.to_string(),
	};

	let mut paths = Vec::new();
	for entry in std::fs::read_dir(dir).map_err(unreadable)? {
		let path = entry.map_err(unreadable)?.path();
		if path.is_file() && has_image_extension(&path) {
			paths.push(path);
		}
	}
	paths.sort();

	Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn label_of(path: &Path) -> String {
	path.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{recognition::embedding::ThumbnailEmbedder, test_utils::textured_card};

	fn extractor() -> FeatureExtractor {
		FeatureExtractor::new(300, 600, 20, 200)
	}

	#[test]
	fn builds_sorted_entries_from_image_files() {
		let dir = tempfile::tempdir().unwrap();
		textured_card(2).save(dir.path().join("the_moon.png")).unwrap();
		textured_card(1).save(dir.path().join("the_fool.png")).unwrap();
		std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

		let catalog =
			ReferenceCatalog::build(dir.path(), &mut ThumbnailEmbedder::default(), &extractor()).unwrap();

		assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["the_fool", "the_moon"]);
		let fool = catalog.get("the_fool").unwrap();
		assert!(!fool.features.is_empty());
		assert!((fool.embedding.cosine(&fool.embedding).value() - 1.0).abs() < 1e-5);
	}

	#[test]
	fn empty_directory_is_an_error() {
		let dir = tempfile::tempdir().unwrap();

		let err = ReferenceCatalog::build(dir.path(), &mut ThumbnailEmbedder::default(), &extractor())
			.unwrap_err();

		assert!(matches!(err, CatalogError::Empty(_)));
	}

	#[test]
	fn missing_directory_is_an_error() {
		let err = ReferenceCatalog::build(
			Path::new("no/such/reference/dir"),
			&mut ThumbnailEmbedder::default(),
			&extractor(),
		)
		.unwrap_err();

		assert!(matches!(err, CatalogError::UnreadableDirectory { .. }));
	}

	#[test]
	fn same_stem_twice_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		textured_card(1).save(dir.path().join("star.png")).unwrap();
		textured_card(2).save(dir.path().join("star.jpg")).unwrap();

		let err = ReferenceCatalog::build(dir.path(), &mut ThumbnailEmbedder::default(), &extractor())
			.unwrap_err();

		assert!(matches!(err, CatalogError::DuplicateLabel(label) if label == "star"));
	}

	#[test]
	fn corrupt_image_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("broken.png"), b"nope").unwrap();

		let err = ReferenceCatalog::build(dir.path(), &mut ThumbnailEmbedder::default(), &extractor())
			.unwrap_err();

		assert!(matches!(err, CatalogError::UnreadableImage { .. }));
	}
}
