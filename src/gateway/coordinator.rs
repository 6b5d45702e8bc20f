//! Single-flight refresh coordination.
//!
//! [`RefreshCoordinator`] owns the in-flight flag and the FIFO queue of callers waiting on
//! the refresh. The first caller to [`RefreshCoordinator::acquire_or_join`] while the flag is
//! clear becomes the leader and receives a [`RefreshLease`]; everybody else receives a
//! [`PendingRefresh`] that settles exactly once with the leader's result. Flag and queue share
//! one lock that is never held across an `.await`, so the check-and-set happens before any
//! suspension.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::Credential, error::RefreshError};

/// Result delivered to every caller queued behind a refresh.
pub type Settlement = Result<Credential, RefreshError>;

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	queue: Vec<oneshot::Sender<Settlement>>,
}

/// Owned refresh state shared by every clone of a gateway.
#[derive(Clone, Debug, Default)]
pub struct RefreshCoordinator(Arc<Mutex<RefreshState>>);
impl RefreshCoordinator {
	/// Becomes the refresh leader when no refresh is running, otherwise joins the queue.
	pub fn acquire_or_join(&self) -> Ticket {
		let mut state = self.0.lock();

		if state.in_flight {
			let (tx, rx) = oneshot::channel();

			state.queue.push(tx);

			Ticket::Follower(PendingRefresh(rx))
		} else {
			state.in_flight = true;

			Ticket::Leader(RefreshLease { coordinator: self.clone(), settled: false })
		}
	}

	/// Returns `true` while a leader holds the lease.
	pub fn is_refreshing(&self) -> bool {
		self.0.lock().in_flight
	}

	/// Number of callers currently waiting on the leader.
	pub fn queued(&self) -> usize {
		self.0.lock().queue.len()
	}

	fn release(&self, settlement: Option<Settlement>) -> usize {
		let queue = {
			let mut state = self.0.lock();

			state.in_flight = false;

			mem::take(&mut state.queue)
		};
		let drained = queue.len();

		match settlement {
			Some(settlement) =>
				for waiter in queue {
					// A waiter whose caller went away has nothing left to resolve.
					let _ = waiter.send(settlement.clone());
				},
			// Dropping the senders wakes every waiter with `Abandoned`.
			None => drop(queue),
		}

		drained
	}
}

/// Outcome of [`RefreshCoordinator::acquire_or_join`].
#[derive(Debug)]
pub enum Ticket {
	/// Caller must perform the refresh and settle the lease.
	Leader(RefreshLease),
	/// Caller must wait for the leader's result.
	Follower(PendingRefresh),
}

/// Exclusive right to run the refresh.
///
/// Dropping the lease without settling clears the flag and rejects every waiter with
/// [`RefreshError::Abandoned`].
#[derive(Debug)]
pub struct RefreshLease {
	coordinator: RefreshCoordinator,
	settled: bool,
}
impl RefreshLease {
	/// Delivers `settlement` to every queued caller in FIFO order and clears the flag.
	///
	/// Returns how many callers were waiting.
	pub fn settle(mut self, settlement: Settlement) -> usize {
		self.settled = true;

		self.coordinator.release(Some(settlement))
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.release(None);
		}
	}
}

/// Handle a queued caller awaits; settled exactly once.
#[derive(Debug)]
pub struct PendingRefresh(oneshot::Receiver<Settlement>);
impl PendingRefresh {
	/// Waits for the leader's result.
	pub async fn wait(self) -> Settlement {
		self.0.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}
