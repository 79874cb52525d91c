//! Single-flight credential refresh coordinator.
//!
//! The coordinator owns the only shared mutable state in the pipeline: an `Idle`/`Refreshing`
//! flag and a FIFO queue of continuations. Both live behind one lock that is never held
//! across an `.await`, so every transition (enter refresh, enqueue, drain + leave refresh)
//! is a single critical section. The caller that moves the state to `Refreshing` receives a
//! [`RefreshCycle`], which is the sole way back to `Idle`; dropping the cycle without
//! completing it flushes the queue with the failure sentinel, so no waiter is ever stranded.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{LoginExpiredMode, Reauthenticator, TokenContext, TokenFormat, TokenRefresher},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Token value handed to waiters when a refresh fails.
pub const FAILURE_SENTINEL: &str = "";

/// Resume function for one suspended caller.
pub type Continuation = Box<dyn FnOnce(&str) + Send>;

/// Outcome of [`AuthCoordinator::try_enqueue_or_refresh`].
pub enum Entry<'a> {
	/// The caller moved the coordinator to `Refreshing` and must drive the cycle.
	Leader(RefreshCycle<'a>),
	/// A refresh was already in flight; the caller was queued.
	Queued(Waiter),
}
impl Debug for Entry<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Leader(_) => f.write_str("Entry::Leader(..)"),
			Self::Queued(_) => f.write_str("Entry::Queued(..)"),
		}
	}
}

/// How a caller obtained its token from [`AuthCoordinator::single_flight`].
#[derive(Debug)]
pub enum Resumption {
	/// The caller ran the refresh itself.
	Led(Result<String>),
	/// The caller waited for another refresh; the token is empty when that refresh failed.
	Resumed(String),
}

/// Receiving half of a queued continuation.
#[derive(Debug)]
pub struct Waiter(oneshot::Receiver<String>);
impl Waiter {
	/// Waits for the refresh in flight to settle.
	pub async fn wait(self) -> String {
		self.0.await.unwrap_or_else(|_| FAILURE_SENTINEL.to_owned())
	}
}

/// Exclusive ownership of one refresh cycle.
pub struct RefreshCycle<'a> {
	coordinator: &'a AuthCoordinator,
	settled: bool,
}
impl RefreshCycle<'_> {
	/// Drains the queue in FIFO order with `token` and returns the coordinator to `Idle`.
	pub fn complete(mut self, token: &str) {
		self.settle(token);
	}

	fn settle(&mut self, token: &str) {
		if std::mem::replace(&mut self.settled, true) {
			return;
		}

		let drained = {
			let mut state = self.coordinator.state.lock();

			state.refreshing = false;

			std::mem::take(&mut state.queue)
		};

		for resume in drained {
			resume(token);
		}
	}
}
impl Drop for RefreshCycle<'_> {
	fn drop(&mut self) {
		self.settle(FAILURE_SENTINEL);
	}
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	queue: VecDeque<Continuation>,
}

/// Guarantees at most one concurrent credential refresh and resumes queued callers.
pub struct AuthCoordinator {
	tokens: Arc<dyn TokenContext>,
	refresher: Arc<dyn TokenRefresher>,
	reauthenticator: Arc<dyn Reauthenticator>,
	login_expired_mode: LoginExpiredMode,
	token_format: TokenFormat,
	state: Mutex<RefreshState>,
	/// Counters for refresh cycles.
	pub metrics: RefreshMetrics,
}
impl AuthCoordinator {
	/// Creates an idle coordinator.
	pub fn new(
		tokens: Arc<dyn TokenContext>,
		refresher: Arc<dyn TokenRefresher>,
		reauthenticator: Arc<dyn Reauthenticator>,
	) -> Self {
		Self {
			tokens,
			refresher,
			reauthenticator,
			login_expired_mode: LoginExpiredMode::default(),
			token_format: TokenFormat::default(),
			state: Mutex::new(RefreshState::default()),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Overrides how an expired session is surfaced.
	pub fn with_login_expired_mode(mut self, mode: LoginExpiredMode) -> Self {
		self.login_expired_mode = mode;

		self
	}

	/// Overrides how tokens are rendered into the `Authorization` header.
	pub fn with_token_format(mut self, format: TokenFormat) -> Self {
		self.token_format = format;

		self
	}

	/// Session state accessor shared with the rest of the pipeline.
	pub fn tokens(&self) -> &Arc<dyn TokenContext> {
		&self.tokens
	}

	/// Formats `token` for the `Authorization` header.
	pub fn format_token(&self, token: &str) -> Option<String> {
		self.token_format.format(Some(token))
	}

	/// Whether a refresh cycle is active.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Number of queued continuations.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Queues `resume` behind the active refresh; hands it back when the coordinator is idle.
	pub fn enqueue(&self, resume: Continuation) -> Result<(), Continuation> {
		let mut state = self.state.lock();

		if !state.refreshing {
			return Err(resume);
		}

		state.queue.push_back(resume);
		self.metrics.record_queued();

		Ok(())
	}

	/// Either starts a refresh cycle (when idle) or queues the caller (when refreshing).
	pub fn try_enqueue_or_refresh(&self) -> Entry<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.queue.push_back(Box::new(move |token: &str| {
				let _ = tx.send(token.to_owned());
			}));
			self.metrics.record_queued();

			return Entry::Queued(Waiter(rx));
		}

		state.refreshing = true;

		Entry::Leader(RefreshCycle { coordinator: self, settled: false })
	}

	/// Drives `cycle` to completion with the external refresh function.
	///
	/// On success the token is stored and every waiter resumes with it; on failure every
	/// waiter resumes with [`FAILURE_SENTINEL`] and the error is returned. Either way the
	/// coordinator is back to `Idle` when this returns.
	pub async fn refresh(&self, cycle: RefreshCycle<'_>, kind: FlowKind) -> Result<String> {
		let span = FlowSpan::new(kind, "refresh");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.refresher.refresh()).await;

		match &result {
			Ok(token) => {
				self.tokens.set_token(Some(token.clone()));
				cycle.complete(token);
				self.metrics.record_success();
				obs::record_flow_outcome(kind, FlowOutcome::Success);
			},
			Err(err) => {
				cycle.complete(FAILURE_SENTINEL);
				self.metrics.record_failure();
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
				obs::warn_refresh_failed(kind, err);
			},
		}

		result
	}

	/// Obtains a token through the single-flight primitive.
	pub async fn single_flight(&self, kind: FlowKind) -> Resumption {
		match self.try_enqueue_or_refresh() {
			Entry::Leader(cycle) => Resumption::Led(self.refresh(cycle, kind).await),
			Entry::Queued(waiter) => Resumption::Resumed(waiter.wait().await),
		}
	}

	/// Ends the session: flags it expired (modal mode, once access was checked) or logs out,
	/// then clears the token.
	pub async fn reauthenticate(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Reauthenticate;

		let span = FlowSpan::new(KIND, "reauthenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				if self.login_expired_mode == LoginExpiredMode::Modal
					&& self.tokens.is_access_checked()
				{
					self.tokens.set_login_expired(true);
				} else {
					self.reauthenticator.logout().await?;
				}

				self.tokens.set_token(None);

				Ok::<_, Error>(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl Debug for AuthCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("AuthCoordinator")
			.field("refreshing", &state.refreshing)
			.field("pending", &state.queue.len())
			.field("login_expired_mode", &self.login_expired_mode)
			.field("token_format", &self.token_format)
			.finish()
	}
}
