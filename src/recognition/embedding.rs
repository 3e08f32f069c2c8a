use std::path::Path;

use fast_image_resize::{PixelType, Resizer, images::Image};
use image::{
	RgbImage,
	imageops::{FilterType, grayscale, resize},
};
use ndarray::Array4;
use ort::{
	session::{Session, builder::GraphOptimizationLevel},
	value::TensorRef,
};

use crate::{error::EmbeddingError, model::Similarity};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const THUMBNAIL_WIDTH: u32 = 16;
const THUMBNAIL_HEIGHT: u32 = 32;

/// Fixed-length unit-norm vector summarizing a card's global appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
	/// Scales `values` to unit length; an all-zero vector stays zero.
	pub fn normalized(mut values: Vec<f32>) -> Self {
		let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
		if norm > 0.0 {
			values.iter_mut().for_each(|v| *v /= norm);
		}
		Self(values)
	}

	#[inline]
	pub fn as_slice(&self) -> &[f32] {
		&self.0
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Dot product of two unit vectors. Mismatched lengths compare over the
	/// shared prefix.
	pub fn cosine(&self, other: &Embedding) -> Similarity {
		let dot = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
		Similarity::new(dot)
	}
}

pub trait Embedder: Send {
	fn embed(&mut self, image: &RgbImage) -> Result<Embedding, EmbeddingError>;
}

/// Mean-centred grayscale thumbnail. Needs no model file and is cheap
/// enough to run twice per card per frame.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEmbedder {
	width: u32,
	height: u32,
}

impl Default for ThumbnailEmbedder {
	fn default() -> Self {
		Self {
			width: THUMBNAIL_WIDTH,
			height: THUMBNAIL_HEIGHT,
		}
	}
}

impl ThumbnailEmbedder {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width: width.max(1),
			height: height.max(1),
		}
	}
}

impl Embedder for ThumbnailEmbedder {
	fn embed(&mut self, image: &RgbImage) -> Result<Embedding, EmbeddingError> {
		if image.width() == 0 || image.height() == 0 {
			return Err(EmbeddingError::InvalidOutput("empty image".to_string()));
		}

		let thumb = resize(&grayscale(image), self.width, self.height, FilterType::Triangle);
		let values: Vec<f32> = thumb.pixels().map(|p| p[0] as f32).collect();
		let mean = values.iter().sum::<f32>() / values.len() as f32;

		Ok(Embedding::normalized(
			values.into_iter().map(|v| v - mean).collect(),
		))
	}
}

struct ImageBuffers {
	tensor_array: Array4<f32>,
	resized_image: Image<'static>,
}

impl ImageBuffers {
	fn new(size: u32) -> Self {
		Self {
			tensor_array: Array4::<f32>::zeros((1, 3, size as usize, size as usize)),
			resized_image: Image::new(size, size, PixelType::U8x3),
		}
	}
}

/// Image classifier backbone exported to ONNX with the classification head
/// removed; its pooled feature vector is the embedding.
pub struct OnnxEmbedder {
	model: Session,
	resizer: Resizer,
	buffers: ImageBuffers,
	input_size: u32,
}

impl OnnxEmbedder {
	pub fn new(model_path: &Path, input_size: u32) -> Result<Self, EmbeddingError> {
		tracing::debug!("Loading embedding model from {}", model_path.display());

		let load_failed = |e: ort::Error| EmbeddingError::ModelLoadFailed {
			path: model_path.to_path_buf(),
			reason: e.to_string(),
		};

		let model = Session::builder()
			.map_err(load_failed)?
			.with_optimization_level(GraphOptimizationLevel::Level3)
			.map_err(load_failed)?
			.commit_from_file(model_path)
			.map_err(load_failed)?;

		tracing::info!("Embedding model loaded ({input_size}x{input_size} input)");

		Ok(Self {
			model,
			resizer: Resizer::new(),
			buffers: ImageBuffers::new(input_size),
			input_size,
		})
	}
}

impl Embedder for OnnxEmbedder {
	fn embed(&mut self, image: &RgbImage) -> Result<Embedding, EmbeddingError> {
		let (width, height) = image.dimensions();
		if width == 0 || height == 0 {
			return Err(EmbeddingError::InvalidOutput("empty image".to_string()));
		}

		let mut raw_buf = image.as_raw().clone();
		let src_image = Image::from_slice_u8(width, height, raw_buf.as_mut_slice(), PixelType::U8x3)
			.map_err(|e| EmbeddingError::ResizeFailed(e.to_string()))?;
		self.resizer
			.resize(&src_image, &mut self.buffers.resized_image, None)
			.map_err(|e| EmbeddingError::ResizeFailed(e.to_string()))?;

		let resized = RgbImage::from_raw(
			self.input_size,
			self.input_size,
			self.buffers.resized_image.buffer().to_vec(),
		)
		.ok_or_else(|| EmbeddingError::ResizeFailed("resized buffer has wrong length".into()))?;

		image_to_tensor_inplace(&resized, &mut self.buffers.tensor_array);

		let input = TensorRef::from_array_view(self.buffers.tensor_array.view())
			.map_err(|e| EmbeddingError::InferenceFailed(e.to_string()))?;
		let outputs = self
			.model
			.run(ort::inputs![input])
			.map_err(|e| EmbeddingError::InferenceFailed(e.to_string()))?;

		let (_shape, data) = outputs[0]
			.try_extract_tensor::<f32>()
			.map_err(|e| EmbeddingError::InvalidOutput(e.to_string()))?;

		if data.is_empty() || data.iter().any(|v| !v.is_finite()) {
			return Err(EmbeddingError::InvalidOutput(
				"embedding is empty or contains non-finite values".to_string(),
			));
		}

		Ok(Embedding::normalized(data.to_vec()))
	}
}

/// Fills an NCHW tensor with ImageNet-normalized RGB values.
fn image_to_tensor_inplace(image: &RgbImage, array: &mut Array4<f32>) {
	let (width, height) = image.dimensions();

	if array.shape()[2] != height as usize || array.shape()[3] != width as usize {
		tracing::error!(
			"Tensor shape mismatch: expected [_, _, {}, {}], got {:?}",
			height,
			width,
			array.shape()
		);
		return;
	}

	let normalize = |value: u8, channel: usize| {
		(value as f32 / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
	};

	if let Some(slice) = array.as_slice_mut() {
		let plane_size = (width * height) as usize;
		for (i, chunk) in image.as_raw().chunks_exact(3).enumerate() {
			slice[i] = normalize(chunk[0], 0);
			slice[plane_size + i] = normalize(chunk[1], 1);
			slice[plane_size * 2 + i] = normalize(chunk[2], 2);
		}
	} else {
		for (x, y, pixel) in image.enumerate_pixels() {
			let (xi, yi) = (x as usize, y as usize);
			for channel in 0..3 {
				array[[0, channel, yi, xi]] = normalize(pixel.0[channel], channel);
			}
		}
	}
}
