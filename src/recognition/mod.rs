pub mod catalog;
pub mod embedding;
pub mod features;
pub mod recognizer;

pub use catalog::{ReferenceCatalog, ReferenceEntry};
pub use embedding::{Embedder, Embedding, OnnxEmbedder, ThumbnailEmbedder};
pub use features::{FeatureExtractor, LocalFeatures};
pub use recognizer::{HybridRecognizer, Ranked, Recognition, shortlist_size, stage1, stage2};
