use std::time::Instant;

use tracing::{debug, info};

use crate::config::SpreadConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// No spread has been seen since start-up or the last release.
	Waiting,
	/// A full spread has been seen and is accumulating stability. Frames
	/// with a different card count are ignored in this phase.
	Candidate,
	/// A reading has been delivered; new spreads are ignored until the table
	/// has been cleared for the grace period.
	Locked,
}

/// Stability and lockout bookkeeping for one spread at a time.
///
/// Shared between the capture loop and the dispatch worker behind a single
/// mutex; the worker only ever calls [`SpreadState::complete_dispatch`].
#[derive(Debug, Clone, Default)]
pub struct SpreadState {
	last_stable: Vec<String>,
	stable_since: Option<Instant>,
	dispatch_in_flight: bool,
	locked: bool,
	below_count_since: Option<Instant>,
}

impl SpreadState {
	pub fn phase(&self) -> Phase {
		if self.locked {
			Phase::Locked
		} else if self.stable_since.is_some() {
			Phase::Candidate
		} else {
			Phase::Waiting
		}
	}

	#[inline]
	pub fn is_locked(&self) -> bool {
		self.locked
	}

	#[inline]
	pub fn is_dispatch_in_flight(&self) -> bool {
		self.dispatch_in_flight
	}

	/// Sorted labels of the spread currently being timed, empty if none.
	#[inline]
	pub fn last_stable_labels(&self) -> &[String] {
		&self.last_stable
	}

	/// Applies one frame's labels. Returns the sorted label set when this
	/// frame armed a dispatch; the slot is already taken at that point.
	pub fn update(&mut self, labels: &[String], now: Instant, config: &SpreadConfig) -> Option<Vec<String>> {
		let count = labels.len();

		// A frame without a full spread neither arms nor clears the candidate;
		// only the grace period after a reading resets it.
		if count < config.num_cards && self.locked {
			self.tick_grace(now, config);
			return None;
		}

		self.below_count_since = None;

		if count != config.num_cards || self.locked {
			return None;
		}

		let mut sorted = labels.to_vec();
		sorted.sort();
		if self.stable_since.is_none() || sorted != self.last_stable {
			debug!("New spread candidate: {:?}", sorted);
			self.last_stable = sorted;
			self.stable_since = Some(now);
		}

		let stable_for = self
			.stable_since
			.map(|since| now.saturating_duration_since(since))
			.unwrap_or_default();
		if stable_for > config.stable_duration() && self.try_begin_dispatch() {
			info!("Spread {:?} stable for {:?}, dispatching", self.last_stable, stable_for);
			return Some(self.last_stable.clone());
		}

		None
	}

	/// Takes the single dispatch slot if it is free and the tracker is not
	/// locked.
	pub fn try_begin_dispatch(&mut self) -> bool {
		if self.dispatch_in_flight || self.locked {
			return false;
		}
		self.dispatch_in_flight = true;
		true
	}

	/// Releases the dispatch slot. Success locks the tracker; failure leaves it
	/// unlocked and makes the spread earn a fresh stability window.
	pub fn complete_dispatch(&mut self, success: bool) {
		self.dispatch_in_flight = false;
		if success {
			self.locked = true;
			self.below_count_since = None;
		} else {
			self.stable_since = None;
		}
	}

	fn tick_grace(&mut self, now: Instant, config: &SpreadConfig) {
		let since = *self.below_count_since.get_or_insert(now);
		if now.saturating_duration_since(since) > config.grace_duration() {
			info!("Table cleared, lock released");
			self.locked = false;
			self.below_count_since = None;
			self.reset_stability();
		}
	}

	fn reset_stability(&mut self) {
		self.last_stable.clear();
		self.stable_since = None;
	}
}
