use image::RgbImage;
use nokhwa::{
	Camera,
	pixel_format::RgbFormat,
	utils::{CameraIndex, RequestedFormat, RequestedFormatType},
};

use crate::error::CaptureError;

/// Source of live frames for the capture loop.
pub trait FrameSource {
	fn next_frame(&mut self) -> Result<RgbImage, CaptureError>;
}

pub struct CameraCapture {
	camera: Camera,
}

impl CameraCapture {
	pub fn new(index: u32) -> Result<Self, CaptureError> {
		let requested_format =
			RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

		let mut camera = Camera::new(CameraIndex::Index(index), requested_format).map_err(|e| {
			CaptureError::DeviceUnavailable {
				index,
				reason: e.to_string(),
			}
		})?;
		camera
			.open_stream()
			.map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

		tracing::info!(
			"Camera {} streaming at {}x{} {}fps",
			index,
			camera.resolution().width(),
			camera.resolution().height(),
			camera.frame_rate()
		);

		Ok(Self { camera })
	}
}

impl FrameSource for CameraCapture {
	fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
		let buffer = self
			.camera
			.frame()
			.map_err(|e| CaptureError::FrameFailed(e.to_string()))?;
		let decoded = buffer
			.decode_image::<RgbFormat>()
			.map_err(|e| CaptureError::FrameFailed(e.to_string()))?;

		let (width, height) = (decoded.width(), decoded.height());
		RgbImage::from_raw(width, height, decoded.into_raw())
			.ok_or_else(|| CaptureError::FrameFailed("decoded frame has wrong length".to_string()))
	}
}

impl Drop for CameraCapture {
	fn drop(&mut self) {
		if let Err(e) = self.camera.stop_stream() {
			tracing::warn!("Failed to stop camera stream: {}", e);
		}
	}
}
