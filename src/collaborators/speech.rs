use std::{process::Command, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::error::DispatchError;

/// Plays one utterance and returns once playback has finished.
pub trait SpeechOutput: Send + Sync {
	fn speak(&self, text: &str) -> Result<(), DispatchError>;
}

/// Runs an external program with the text as its last argument and waits
/// for it to exit.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
	program: String,
	args: Vec<String>,
}

impl CommandSpeech {
	pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
		Self {
			program: program.into(),
			args,
		}
	}
}

impl SpeechOutput for CommandSpeech {
	fn speak(&self, text: &str) -> Result<(), DispatchError> {
		let status = Command::new(&self.program)
			.args(&self.args)
			.arg(text)
			.status()
			.map_err(|e| DispatchError::Speech(format!("{}: {}", self.program, e)))?;

		if !status.success() {
			return Err(DispatchError::Speech(format!(
				"speech command exited with {status}"
			)));
		}
		Ok(())
	}
}

/// Writes utterances to the log instead of an audio device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeech;

impl SpeechOutput for LogSpeech {
	fn speak(&self, text: &str) -> Result<(), DispatchError> {
		tracing::info!("Speaking: {}", text);
		Ok(())
	}
}

/// Serializes everything that produces sound on the shared output device.
#[derive(Debug, Clone, Default)]
pub struct AudioLock(Arc<Mutex<()>>);

impl AudioLock {
	pub fn hold(&self) -> MutexGuard<'_, ()> {
		self.0.lock()
	}

	pub fn try_hold(&self) -> Option<MutexGuard<'_, ()>> {
		self.0.try_lock()
	}
}
