use std::{
	io::{BufRead, BufReader, Lines},
	process::{Child, ChildStdout, Command, Stdio},
};

use crate::error::DispatchError;

pub type Fragments = Box<dyn Iterator<Item = Result<String, DispatchError>> + Send>;

/// Produces the text of a reading for an ordered set of card labels.
///
/// The text arrives as a lazy sequence of fragments; each call starts a new
/// sequence.
pub trait ReadingGenerator: Send + Sync {
	fn generate(&self, labels: &[String]) -> Result<Fragments, DispatchError>;
}

/// Runs an external program with the labels appended to its arguments and
/// streams its standard output line by line.
#[derive(Debug, Clone)]
pub struct CommandReader {
	program: String,
	args: Vec<String>,
}

impl CommandReader {
	pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
		Self {
			program: program.into(),
			args,
		}
	}
}

impl ReadingGenerator for CommandReader {
	fn generate(&self, labels: &[String]) -> Result<Fragments, DispatchError> {
		tracing::debug!("Starting reading command '{}' for {:?}", self.program, labels);

		let mut child = Command::new(&self.program)
			.args(&self.args)
			.args(labels)
			.stdout(Stdio::piped())
			.stdin(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.map_err(|e| DispatchError::Reading(format!("{}: {}", self.program, e)))?;

		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| DispatchError::Reading("reading command has no stdout".to_string()))?;

		Ok(Box::new(CommandFragments {
			child,
			lines: BufReader::new(stdout).lines(),
			done: false,
		}))
	}
}

struct CommandFragments {
	child: Child,
	lines: Lines<BufReader<ChildStdout>>,
	done: bool,
}

impl Iterator for CommandFragments {
	type Item = Result<String, DispatchError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}

		match self.lines.next() {
			Some(Ok(mut line)) => {
				line.push('\n');
				Some(Ok(line))
			}
			Some(Err(e)) => {
				self.done = true;
				Some(Err(DispatchError::Reading(e.to_string())))
			}
			None => {
				self.done = true;
				match self.child.wait() {
					Ok(status) if status.success() => None,
					Ok(status) => Some(Err(DispatchError::Reading(format!(
						"reading command exited with {status}"
					)))),
					Err(e) => Some(Err(DispatchError::Reading(e.to_string()))),
				}
			}
		}
	}
}

impl Drop for CommandFragments {
	fn drop(&mut self) {
		if !self.done {
			let _ = self.child.kill();
			let _ = self.child.wait();
		}
	}
}

/// Fixed text, split into the given fragments. Used when no reading command
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticReader {
	fragments: Vec<String>,
}

impl StaticReader {
	pub fn new(fragments: Vec<String>) -> Self {
		Self { fragments }
	}

	/// Lists the drawn cards.
	pub fn announcing() -> Self {
		Self::default()
	}
}

impl ReadingGenerator for StaticReader {
	fn generate(&self, labels: &[String]) -> Result<Fragments, DispatchError> {
		let fragments = if self.fragments.is_empty() {
			vec![format!("Your cards are {}.", labels.join(", "))]
		} else {
			self.fragments.clone()
		};
		Ok(Box::new(fragments.into_iter().map(Ok)))
	}
}
