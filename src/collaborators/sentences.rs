use crate::error::DispatchError;

const TERMINATORS: [char; 4] = ['.', '!', '?', ':'];

/// Regroups a stream of text fragments into sentences.
///
/// A sentence ends at a run of terminator characters. Whatever is left when
/// the stream ends is yielded as a final sentence. Errors from the
/// underlying stream are passed through as they arrive.
pub struct SentenceSplitter<I> {
	fragments: I,
	buffer: String,
	exhausted: bool,
}

impl<I> SentenceSplitter<I>
where
	I: Iterator<Item = Result<String, DispatchError>>,
{
	pub fn new(fragments: I) -> Self {
		Self {
			fragments,
			buffer: String::new(),
			exhausted: false,
		}
	}

	fn take_sentence(&mut self) -> Option<String> {
		loop {
			let start = self.buffer.find(TERMINATORS)?;
			let end = self.buffer[start..]
				.char_indices()
				.find(|(_, c)| !TERMINATORS.contains(c))
				.map_or(self.buffer.len(), |(i, _)| start + i);

			let rest = self.buffer.split_off(end);
			let sentence = std::mem::replace(&mut self.buffer, rest);
			let sentence = collapse_whitespace(&sentence);
			if !sentence.is_empty() && !sentence.chars().all(|c| TERMINATORS.contains(&c)) {
				return Some(sentence);
			}
		}
	}
}

impl<I> Iterator for SentenceSplitter<I>
where
	I: Iterator<Item = Result<String, DispatchError>>,
{
	type Item = Result<String, DispatchError>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(sentence) = self.take_sentence() {
				return Some(Ok(sentence));
			}
			if self.exhausted {
				let tail = collapse_whitespace(&std::mem::take(&mut self.buffer));
				return (!tail.is_empty()).then_some(Ok(tail));
			}

			match self.fragments.next() {
				Some(Ok(fragment)) => self.buffer.push_str(&fragment),
				Some(Err(e)) => return Some(Err(e)),
				None => self.exhausted = true,
			}
		}
	}
}

fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}
