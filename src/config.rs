use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
	pub capture: CaptureConfig,
	pub extraction: ExtractionConfig,
	pub recognition: RecognitionConfig,
	pub spread: SpreadConfig,
	pub collaborators: CollaboratorConfig,
	pub debugging: DebuggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
	pub camera_index: u32,
	pub frame_interval_ms: u64,
}

impl Default for CaptureConfig {
	fn default() -> Self {
		Self {
			camera_index: 0,
			frame_interval_ms: 0,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
	pub card_width: u32,
	pub card_height: u32,
	pub min_area_ratio: f64,
	pub max_area_ratio: f64,
	/// Polygon approximation tolerances as fractions of the contour perimeter,
	/// tried in order until one yields exactly four vertices.
	pub approx_tolerances: Vec<f64>,
	pub blur_sigma: f32,
	pub threshold_block_sigma: f32,
	pub threshold_offset: f32,
	pub closing_radius: u8,
}

impl Default for ExtractionConfig {
	fn default() -> Self {
		Self {
			card_width: 300,
			card_height: 600,
			min_area_ratio: 0.01,
			max_area_ratio: 0.80,
			approx_tolerances: vec![0.01, 0.02, 0.03, 0.05],
			blur_sigma: 1.4,
			threshold_block_sigma: 2.6,
			threshold_offset: 2.0,
			closing_radius: 4,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecognitionConfig {
	pub reference_dir: PathBuf,
	pub model_path: Option<PathBuf>,
	pub model_input_size: u32,
	pub min_score: Option<f32>,
	pub top_k: usize,
	pub shortlist_multiplier: usize,
	pub shortlist_min: usize,
	pub ratio_threshold: f32,
	pub fast_threshold: u8,
	pub max_features: usize,
}

impl Default for RecognitionConfig {
	fn default() -> Self {
		Self {
			reference_dir: PathBuf::from("data/cards"),
			model_path: None,
			model_input_size: 224,
			min_score: Some(0.75),
			top_k: 1,
			shortlist_multiplier: 3,
			shortlist_min: 6,
			ratio_threshold: 0.75,
			fast_threshold: 20,
			max_features: 500,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpreadConfig {
	pub num_cards: usize,
	pub stable_secs: f32,
	pub grace_secs: f32,
}

impl Default for SpreadConfig {
	fn default() -> Self {
		Self {
			num_cards: 3,
			stable_secs: 1.0,
			grace_secs: 1.0,
		}
	}
}

impl SpreadConfig {
	pub fn stable_duration(&self) -> Duration {
		Duration::from_secs_f32(self.stable_secs.max(0.0))
	}

	pub fn grace_duration(&self) -> Duration {
		Duration::from_secs_f32(self.grace_secs.max(0.0))
	}
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CollaboratorConfig {
	pub reading_command: Option<String>,
	pub reading_args: Vec<String>,
	pub speech_command: Option<String>,
	pub speech_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebuggingConfig {
	pub level: String,
	pub overlay_path: Option<PathBuf>,
}

impl Default for DebuggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			overlay_path: None,
		}
	}
}

impl Config {
	pub fn load() -> Result<Self> {
		let settings = config::Config::builder()
			.add_source(config::File::with_name("config").required(false))
			.add_source(
				config::Environment::with_prefix(env!("CARGO_CRATE_NAME"))
					.separator("__")
					.list_separator(" ")
					.with_list_parse_key("collaborators.reading_args")
					.with_list_parse_key("collaborators.speech_args")
					.try_parsing(true),
			)
			.build()?;

		settings.try_deserialize().map_err(Into::into)
	}
}
