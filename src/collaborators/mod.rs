pub mod reading;
pub mod sentences;
pub mod speech;

use std::sync::Arc;

pub use reading::{CommandReader, Fragments, ReadingGenerator, StaticReader};
pub use sentences::SentenceSplitter;
pub use speech::{AudioLock, CommandSpeech, LogSpeech, SpeechOutput};

use crate::{config::CollaboratorConfig, error::DispatchError};

/// Everything a dispatch worker talks to.
#[derive(Clone)]
pub struct Collaborators {
	pub reader: Arc<dyn ReadingGenerator>,
	pub speech: Arc<dyn SpeechOutput>,
	pub audio: AudioLock,
}

impl Collaborators {
	pub fn new(reader: Arc<dyn ReadingGenerator>, speech: Arc<dyn SpeechOutput>) -> Self {
		Self {
			reader,
			speech,
			audio: AudioLock::default(),
		}
	}

	/// External commands where configured, otherwise the built-in fallbacks.
	pub fn from_config(config: &CollaboratorConfig) -> Self {
		let reader: Arc<dyn ReadingGenerator> = match &config.reading_command {
			Some(program) => Arc::new(CommandReader::new(program, config.reading_args.clone())),
			None => Arc::new(StaticReader::announcing()),
		};
		let speech: Arc<dyn SpeechOutput> = match &config.speech_command {
			Some(program) => Arc::new(CommandSpeech::new(program, config.speech_args.clone())),
			None => Arc::new(LogSpeech),
		};
		Self::new(reader, speech)
	}

	/// Generates the reading for `labels` and speaks it sentence by sentence,
	/// holding the audio lock throughout. Returns the number of sentences
	/// spoken.
	pub fn deliver_reading(&self, labels: &[String]) -> Result<usize, DispatchError> {
		let _audio = self.audio.hold();

		let fragments = self.reader.generate(labels)?;
		let mut spoken = 0;
		for sentence in SentenceSplitter::new(fragments) {
			let sentence = sentence?;
			tracing::debug!("Sentence {}: {}", spoken + 1, sentence);
			self.speech.speak(&sentence)?;
			spoken += 1;
		}

		Ok(spoken)
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	#[derive(Default)]
	struct RecordingSpeech {
		spoken: Mutex<Vec<String>>,
	}

	impl SpeechOutput for RecordingSpeech {
		fn speak(&self, text: &str) -> Result<(), DispatchError> {
			self.spoken.lock().push(text.to_string());
			Ok(())
		}
	}

	struct FailingSpeech;

	impl SpeechOutput for FailingSpeech {
		fn speak(&self, _text: &str) -> Result<(), DispatchError> {
			Err(DispatchError::Speech("device busy".into()))
		}
	}

	fn reader(fragments: &[&str]) -> Arc<dyn ReadingGenerator> {
		Arc::new(StaticReader::new(fragments.iter().map(|f| f.to_string()).collect()))
	}

	#[test]
	fn reading_is_spoken_sentence_by_sentence_in_order() {
		let speech = Arc::new(RecordingSpeech::default());
		let collaborators = Collaborators::new(
			reader(&["The Fool begins", ". The Moon ", "doubts! End"]),
			speech.clone(),
		);

		let spoken = collaborators
			.deliver_reading(&["a".into(), "b".into(), "c".into()])
			.unwrap();

		assert_eq!(spoken, 3);
		assert_eq!(
			*speech.spoken.lock(),
			vec!["The Fool begins.", "The Moon doubts!", "End"]
		);
	}

	#[test]
	fn speech_failure_stops_the_reading() {
		let collaborators = Collaborators::new(reader(&["One. Two."]), Arc::new(FailingSpeech));

		let err = collaborators.deliver_reading(&["a".into()]).unwrap_err();

		assert!(matches!(err, DispatchError::Speech(_)));
		assert!(collaborators.audio.try_hold().is_some());
	}

	#[test]
	fn fallbacks_are_used_without_commands() {
		let collaborators = Collaborators::from_config(&CollaboratorConfig::default());

		assert_eq!(collaborators.deliver_reading(&["the_star".into()]).unwrap(), 1);
	}
}
