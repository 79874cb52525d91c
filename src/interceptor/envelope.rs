//! Response stage that applies the per-request output shape.

// self
use crate::{
	_prelude::*,
	classify::{Classification, Classifier},
	interceptor::{Dispatch, Reply, ResponseStage, StageFuture},
	request::ResponseReturn,
};

/// Unwraps the business envelope according to each request's [`ResponseReturn`].
///
/// - `raw`: the untouched [`Reply::Response`].
/// - `body`: the decoded payload unchanged.
/// - `data` (default): the classified inner data, or an [`Error::Business`] that keeps the
///   original status and payload.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeStage {
	classifier: Classifier,
}
impl EnvelopeStage {
	/// Creates a stage backed by `classifier`.
	pub fn new(classifier: Classifier) -> Self {
		Self { classifier }
	}

	fn shape(&self, reply: Reply) -> Result<Reply> {
		let response = match reply {
			Reply::Response(response) => response,
			payload @ Reply::Payload(_) => return Ok(payload),
		};

		match response.request.response_return {
			ResponseReturn::Raw => return Ok(Reply::Response(response)),
			ResponseReturn::Body if response.is_transport_success() =>
				return Ok(Reply::Payload(response.body)),
			_ => (),
		}

		match self.classifier.classify(response.status, &response.body) {
			Classification::Success(data) => Ok(Reply::Payload(data)),
			Classification::BusinessRefresh(business)
			| Classification::BusinessRelogin(business)
			| Classification::BusinessFailure(business) => Err(Error::Business(business)),
			Classification::TransportError { .. } => Err(Error::Status(Box::new(response))),
		}
	}
}
impl ResponseStage for EnvelopeStage {
	fn fulfilled<'a>(&'a self, _: &'a dyn Dispatch, reply: Reply) -> StageFuture<'a, Reply> {
		let shaped = self.shape(reply);

		Box::pin(async move { shaped })
	}
}
