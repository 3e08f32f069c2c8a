use std::{sync::Arc, time::Instant};

use parking_lot::Mutex;
use tracing::{error, trace};

use crate::{
	collaborators::Collaborators,
	config::SpreadConfig,
	error::DispatchError,
	model::{DetectedCard, labels_of},
	spread::{
		dispatch::DispatchSlot,
		state::{Phase, SpreadState},
	},
};

/// Per-frame driver that decides when a complete, stable spread is on the
/// table and hands it to the reading worker.
pub struct SpreadTracker {
	config: SpreadConfig,
	state: Arc<Mutex<SpreadState>>,
	collaborators: Collaborators,
	slot: DispatchSlot,
}

impl SpreadTracker {
	pub fn new(config: SpreadConfig, collaborators: Collaborators) -> Self {
		Self {
			config,
			state: Arc::new(Mutex::new(SpreadState::default())),
			collaborators,
			slot: DispatchSlot::default(),
		}
	}

	/// Feeds one frame's recognized labels. Returns `true` when this frame
	/// started a dispatch. Never blocks on the worker.
	pub fn observe(&mut self, labels: &[String], now: Instant) -> bool {
		self.slot.reap();

		let armed = self.state.lock().update(labels, now, &self.config);
		let Some(spread) = armed else {
			trace!("{} labeled cards, phase {:?}", labels.len(), self.phase());
			return false;
		};

		match self.slot.spawn(spread, self.collaborators.clone(), Arc::clone(&self.state)) {
			Ok(()) => true,
			Err(e) => {
				error!("{}", e);
				false
			}
		}
	}

	/// Same as [`SpreadTracker::observe`] over the labeled cards of a frame.
	pub fn observe_cards(&mut self, cards: &[DetectedCard], now: Instant) -> bool {
		self.observe(&labels_of(cards), now)
	}

	pub fn phase(&self) -> Phase {
		self.state.lock().phase()
	}

	pub fn is_dispatching(&self) -> bool {
		self.state.lock().is_dispatch_in_flight()
	}

	/// Blocks until the in-flight reading, if any, has finished.
	pub fn wait_for_dispatch(&mut self) -> Option<Result<(), DispatchError>> {
		self.slot.join()
	}
}
