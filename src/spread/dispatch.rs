use std::{
	sync::Arc,
	thread::{self, JoinHandle},
};

use parking_lot::Mutex;

use crate::{collaborators::Collaborators, error::DispatchError, spread::state::SpreadState};

/// Releases the dispatch slot when dropped, including during unwinding.
struct SlotRelease {
	state: Arc<Mutex<SpreadState>>,
	success: bool,
}

impl Drop for SlotRelease {
	fn drop(&mut self) {
		self.state.lock().complete_dispatch(self.success);
	}
}

/// The one reading worker that may be running.
#[derive(Default)]
pub struct DispatchSlot {
	handle: Option<JoinHandle<Result<(), DispatchError>>>,
}

impl DispatchSlot {
	/// Starts the worker for `labels`. The caller must already hold the slot
	/// in `state` (see [`SpreadState::try_begin_dispatch`]).
	///
	/// A previous worker releases the slot just before it exits, so it is
	/// joined here rather than left detached.
	pub fn spawn(
		&mut self, labels: Vec<String>, collaborators: Collaborators, state: Arc<Mutex<SpreadState>>,
	) -> Result<(), DispatchError> {
		self.join();

		let release_on_failure = Arc::clone(&state);
		let spawned = thread::Builder::new()
			.name("reading-dispatch".into())
			.spawn(move || {
				let mut release = SlotRelease { state, success: false };
				let spoken = collaborators.deliver_reading(&labels)?;
				tracing::info!("Reading for {:?} finished after {} sentences", labels, spoken);
				release.success = true;
				Ok(())
			});

		match spawned {
			Ok(handle) => {
				self.handle = Some(handle);
				Ok(())
			}
			Err(e) => {
				release_on_failure.lock().complete_dispatch(false);
				Err(DispatchError::Reading(format!("could not start worker: {e}")))
			}
		}
	}

	pub fn is_running(&self) -> bool {
		self.handle.as_ref().is_some_and(|h| !h.is_finished())
	}

	/// Collects a finished worker's outcome, if there is one.
	pub fn reap(&mut self) -> Option<Result<(), DispatchError>> {
		if self.is_running() {
			return None;
		}
		self.join()
	}

	/// Blocks until the current worker, if any, has finished.
	pub fn join(&mut self) -> Option<Result<(), DispatchError>> {
		let handle = self.handle.take()?;
		let outcome = handle.join().unwrap_or(Err(DispatchError::WorkerPanicked));
		if let Err(e) = &outcome {
			tracing::error!("Reading dispatch failed: {}", e);
		}
		Some(outcome)
	}
}

impl Drop for DispatchSlot {
	fn drop(&mut self) {
		self.join();
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::atomic::{AtomicBool, Ordering},
		time::Duration,
	};

	use super::*;
	use crate::collaborators::{Fragments, LogSpeech, ReadingGenerator, SpeechOutput, StaticReader};

	struct PanickingSpeech;

	impl SpeechOutput for PanickingSpeech {
		fn speak(&self, _text: &str) -> Result<(), DispatchError> {
			panic!("audio backend crashed");
		}
	}

	struct BrokenReader;

	impl ReadingGenerator for BrokenReader {
		fn generate(&self, _labels: &[String]) -> Result<Fragments, DispatchError> {
			Err(DispatchError::Reading("model offline".into()))
		}
	}

	struct SlowReader {
		finished: Arc<AtomicBool>,
	}

	impl ReadingGenerator for SlowReader {
		fn generate(&self, _labels: &[String]) -> Result<Fragments, DispatchError> {
			thread::sleep(Duration::from_millis(100));
			self.finished.store(true, Ordering::SeqCst);
			Err(DispatchError::Reading("too slow".into()))
		}
	}

	fn armed_state() -> Arc<Mutex<SpreadState>> {
		let state = Arc::new(Mutex::new(SpreadState::default()));
		assert!(state.lock().try_begin_dispatch());
		state
	}

	#[test]
	fn failure_releases_the_slot_without_locking() {
		let state = armed_state();
		let mut slot = DispatchSlot::default();
		let collaborators = Collaborators::new(Arc::new(BrokenReader), Arc::new(LogSpeech));

		slot.spawn(vec!["a".into()], collaborators, state.clone()).unwrap();
		let outcome = slot.join().unwrap();

		assert!(matches!(outcome, Err(DispatchError::Reading(_))));
		assert!(!state.lock().is_dispatch_in_flight());
		assert!(!state.lock().is_locked());
	}

	#[test]
	fn panic_releases_the_slot() {
		let state = armed_state();
		let mut slot = DispatchSlot::default();
		let collaborators = Collaborators::new(
			Arc::new(StaticReader::announcing()),
			Arc::new(PanickingSpeech),
		);

		slot.spawn(vec!["a".into()], collaborators, state.clone()).unwrap();
		let outcome = slot.join().unwrap();

		assert!(matches!(outcome, Err(DispatchError::WorkerPanicked)));
		assert!(!state.lock().is_dispatch_in_flight());
	}

	#[test]
	fn success_locks_the_tracker() {
		let state = armed_state();
		let mut slot = DispatchSlot::default();
		let collaborators = Collaborators::new(Arc::new(StaticReader::announcing()), Arc::new(LogSpeech));

		slot.spawn(vec!["a".into()], collaborators, state.clone()).unwrap();

		assert!(slot.join().unwrap().is_ok());
		assert!(state.lock().is_locked());
		assert!(!state.lock().is_dispatch_in_flight());
		assert!(slot.join().is_none());
	}

	#[test]
	fn respawning_joins_the_previous_worker() {
		let finished = Arc::new(AtomicBool::new(false));
		let mut slot = DispatchSlot::default();
		let slow = Collaborators::new(
			Arc::new(SlowReader {
				finished: finished.clone(),
			}),
			Arc::new(LogSpeech),
		);
		let quick = Collaborators::new(Arc::new(StaticReader::announcing()), Arc::new(LogSpeech));

		slot.spawn(vec!["a".into()], slow, armed_state()).unwrap();
		slot.spawn(vec!["b".into()], quick, armed_state()).unwrap();

		assert!(finished.load(Ordering::SeqCst));
		assert!(slot.join().unwrap().is_ok());
	}
}
