use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use cardspread::{
	capture::CameraCapture,
	collaborators::Collaborators,
	config::Config,
	recognition::{
		Embedder, FeatureExtractor, HybridRecognizer, OnnxEmbedder, ReferenceCatalog,
		ThumbnailEmbedder,
	},
	services::{FramePipeline, run_capture_loop},
	spread::SpreadTracker,
	vision::CardExtractor,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
	let config = Config::load().context("Failed to load configuration")?;

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(&config.debugging.level)),
		)
		.init();

	info!("Initializing card spread reader...");

	let mut camera = CameraCapture::new(config.capture.camera_index)?;

	let mut embedder: Box<dyn Embedder> = match &config.recognition.model_path {
		Some(path) => Box::new(OnnxEmbedder::new(path, config.recognition.model_input_size)?),
		None => {
			info!("No embedding model configured, using thumbnail embeddings");
			Box::new(ThumbnailEmbedder::default())
		}
	};

	let features = FeatureExtractor::from_config(
		&config.recognition,
		config.extraction.card_width,
		config.extraction.card_height,
	);
	let catalog = ReferenceCatalog::build(&config.recognition.reference_dir, embedder.as_mut(), &features)
		.context("Failed to build the reference catalog")?;
	info!("Reference catalog ready with {} cards", catalog.len());

	let recognizer = HybridRecognizer::new(embedder, catalog, features, &config.recognition);
	let tracker = SpreadTracker::new(
		config.spread.clone(),
		Collaborators::from_config(&config.collaborators),
	);

	let mut pipeline = FramePipeline::new(
		CardExtractor::new(config.extraction.clone()),
		recognizer,
		tracker,
		config.recognition.min_score,
	)
	.with_overlay_path(config.debugging.overlay_path.clone());

	let stop = AtomicBool::new(false);
	run_capture_loop(&mut camera, &mut pipeline, &config.capture, &stop)
}
