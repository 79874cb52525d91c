//! Failure classification and the error-message reporting stage.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	interceptor::{Dispatch, Reply, ResponseStage, StageFuture},
};

type Reporter = dyn Fn(&str, &Error) + Send + Sync;

/// User-facing failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// No response reached the client.
	Network,
	/// The request timed out (transport timeout or HTTP 408).
	RequestTimeout,
	/// HTTP 400.
	BadRequest,
	/// HTTP 401.
	Unauthorized,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// Any other failure.
	InternalError,
}
impl FailureKind {
	/// Classifies `error`.
	///
	/// Transport variants map directly; other failures are matched on their text
	/// (`Network Error`, `timeout`) before falling back to the HTTP status.
	pub fn of(error: &Error) -> Self {
		match error {
			Error::Transport(TransportError::Network { .. }) => return Self::Network,
			Error::Transport(TransportError::Timeout { .. }) => return Self::RequestTimeout,
			_ => (),
		}

		let text = error.to_string();

		if text.contains("Network Error") {
			return Self::Network;
		}
		if text.contains("timeout") {
			return Self::RequestTimeout;
		}

		Self::from_status(error.status())
	}

	/// Maps an HTTP status to its category.
	pub fn from_status(status: Option<u16>) -> Self {
		match status {
			Some(400) => Self::BadRequest,
			Some(401) => Self::Unauthorized,
			Some(403) => Self::Forbidden,
			Some(404) => Self::NotFound,
			Some(408) => Self::RequestTimeout,
			_ => Self::InternalError,
		}
	}

	/// Default human-readable message.
	pub const fn default_message(self) -> &'static str {
		match self {
			Self::Network => "Network exception, please check your network and try again.",
			Self::RequestTimeout => "The request timed out, please try again later.",
			Self::BadRequest => "Request error. Please check your input and try again.",
			Self::Unauthorized => "Login expired. Please log in again.",
			Self::Forbidden => "Forbidden access.",
			Self::NotFound => "The requested resource does not exist.",
			Self::InternalError => "Internal server error, please try again later.",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.default_message())
	}
}

/// Hands every failure to a reporter callback, then keeps rejecting.
#[derive(Clone)]
pub struct ErrorReportStage {
	reporter: Arc<Reporter>,
}
impl ErrorReportStage {
	/// Creates a stage that calls `reporter(message, error)` for each failure.
	pub fn new<F>(reporter: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&str, &Error),
	{
		Self { reporter: Arc::new(reporter) }
	}
}
impl Debug for ErrorReportStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ErrorReportStage(..)")
	}
}
impl ResponseStage for ErrorReportStage {
	fn rejected<'a>(&'a self, _: &'a dyn Dispatch, error: Error) -> StageFuture<'a, Reply> {
		(self.reporter)(FailureKind::of(&error).default_message(), &error);

		Box::pin(async move { Err(error) })
	}
}
