use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
	#[error("Camera {index} is unavailable: {reason}")]
	DeviceUnavailable { index: u32, reason: String },

	#[error("Failed to open camera stream: {0}")]
	StreamFailed(String),

	#[error("Frame acquisition failed: {0}")]
	FrameFailed(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
	#[error("Could not read image from '{path}': {reason}")]
	InvalidInput { path: PathBuf, reason: String },

	#[error("Frame has no pixels")]
	EmptyFrame,
}

#[derive(Error, Debug)]
pub enum CatalogError {
	#[error("Could not read reference directory '{path}': {reason}")]
	UnreadableDirectory { path: PathBuf, reason: String },

	#[error("Could not read reference image '{path}': {reason}")]
	UnreadableImage { path: PathBuf, reason: String },

	#[error("Reference label '{0}' appears more than once")]
	DuplicateLabel(String),

	#[error("No reference images found in '{0}'")]
	Empty(PathBuf),

	#[error("Failed to embed reference '{label}': {source}")]
	Embedding {
		label: String,
		#[source]
		source: EmbeddingError,
	},
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
	#[error("Failed to load embedding model from '{path}': {reason}")]
	ModelLoadFailed { path: PathBuf, reason: String },

	#[error("Embedding inference failed: {0}")]
	InferenceFailed(String),

	#[error("Embedding model produced an unusable output: {0}")]
	InvalidOutput(String),

	#[error("Image resize failed: {0}")]
	ResizeFailed(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
	#[error("Reading generation failed: {0}")]
	Reading(String),

	#[error("Speech output failed: {0}")]
	Speech(String),

	#[error("Dispatch worker panicked")]
	WorkerPanicked,
}
