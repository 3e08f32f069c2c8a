use std::{
	path::PathBuf,
	sync::atomic::{AtomicBool, Ordering},
	thread,
	time::{Duration, Instant},
};

use anyhow::Result;
use image::RgbImage;

use crate::{
	capture::FrameSource,
	config::CaptureConfig,
	drawing::draw_cards,
	model::labels_of,
	recognition::HybridRecognizer,
	spread::SpreadTracker,
	vision::CardExtractor,
};

const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
	pub cards: usize,
	pub labels: Vec<String>,
	pub dispatched: bool,
}

/// Extraction, recognition, tracking and overlay for one frame at a time.
pub struct FramePipeline {
	extractor: CardExtractor,
	recognizer: HybridRecognizer,
	tracker: SpreadTracker,
	min_score: Option<f32>,
	overlay_path: Option<PathBuf>,
}

impl FramePipeline {
	pub fn new(
		extractor: CardExtractor, recognizer: HybridRecognizer, tracker: SpreadTracker,
		min_score: Option<f32>,
	) -> Self {
		Self {
			extractor,
			recognizer,
			tracker,
			min_score,
			overlay_path: None,
		}
	}

	/// Writes every annotated frame to `path`.
	pub fn with_overlay_path(mut self, path: Option<PathBuf>) -> Self {
		self.overlay_path = path;
		self
	}

	pub fn tracker(&self) -> &SpreadTracker {
		&self.tracker
	}

	pub fn tracker_mut(&mut self) -> &mut SpreadTracker {
		&mut self.tracker
	}

	/// Runs the pipeline on `frame` and draws the overlay onto it.
	pub fn process(&mut self, frame: &mut RgbImage, now: Instant) -> Result<FrameReport> {
		let extract_start = Instant::now();
		let mut cards = self.extractor.extract(frame)?;
		tracing::trace!("Extraction took {:?}", extract_start.elapsed());

		let recognize_start = Instant::now();
		self.recognizer.label_cards(&mut cards, self.min_score);
		tracing::trace!("Recognition took {:?}", recognize_start.elapsed());

		let labels = labels_of(&cards);
		tracing::debug!("{} cards, recognized {:?}", cards.len(), labels);

		let dispatched = self.tracker.observe(&labels, now);

		draw_cards(frame, &cards);
		if let Some(path) = &self.overlay_path
			&& let Err(e) = frame.save(path)
		{
			tracing::warn!("Failed to write overlay to {}: {}", path.display(), e);
		}

		Ok(FrameReport {
			cards: cards.len(),
			labels,
			dispatched,
		})
	}
}

/// Pulls frames from `source` until `stop` is set. Frames that fail to
/// arrive or to process are logged and skipped.
pub fn run_capture_loop(
	source: &mut dyn FrameSource, pipeline: &mut FramePipeline, config: &CaptureConfig,
	stop: &AtomicBool,
) -> Result<()> {
	let interval = Duration::from_millis(config.frame_interval_ms);
	tracing::info!("Capture loop started (frame interval: {:?})", interval);

	let mut iteration: u64 = 0;
	while !stop.load(Ordering::Acquire) {
		let loop_start = Instant::now();
		iteration += 1;

		let mut frame = match source.next_frame() {
			Ok(frame) => frame,
			Err(e) => {
				tracing::error!("Frame capture failed: {}", e);
				thread::sleep(RETRY_DELAY);
				continue;
			}
		};

		match pipeline.process(&mut frame, Instant::now()) {
			Ok(report) if report.dispatched => {
				tracing::info!("Frame {}: reading started for {:?}", iteration, report.labels);
			}
			Ok(_) => {}
			Err(e) => tracing::warn!("Frame {} skipped: {}", iteration, e),
		}

		let elapsed = loop_start.elapsed();
		tracing::trace!("Frame {} took {:?}", iteration, elapsed);
		if elapsed < interval {
			thread::sleep(interval - elapsed);
		}
	}

	tracing::info!("Capture loop stopped after {} frames", iteration);
	Ok(())
}
