//! Request stage that attaches session headers.

// self
use crate::{
	_prelude::*,
	auth::{TokenContext, TokenFormat},
	interceptor::{RequestStage, StageFuture},
	request::RequestDescriptor,
};

/// Header carrying the client locale.
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";

/// Sets `Authorization` from the current token and `Accept-Language` from the locale.
///
/// An absent or empty token removes any `Authorization` header the request carried.
#[derive(Clone)]
pub struct AuthorizationStage {
	tokens: Arc<dyn TokenContext>,
	format: TokenFormat,
	locale: Option<String>,
}
impl AuthorizationStage {
	/// Creates a stage reading tokens from `tokens`.
	pub fn new(tokens: Arc<dyn TokenContext>, format: TokenFormat) -> Self {
		Self { tokens, format, locale: None }
	}

	/// Sends `locale` as `Accept-Language` on every request.
	pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());

		self
	}

	fn apply(&self, mut request: RequestDescriptor) -> RequestDescriptor {
		request.set_authorization(self.format.format(self.tokens.get_token().as_deref()));

		if let Some(locale) = &self.locale {
			request.headers.insert(ACCEPT_LANGUAGE.into(), locale.clone());
		}

		request
	}
}
impl Debug for AuthorizationStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationStage")
			.field("format", &self.format)
			.field("locale", &self.locale)
			.finish()
	}
}
impl RequestStage for AuthorizationStage {
	fn on_request(&self, request: RequestDescriptor) -> StageFuture<'_, RequestDescriptor> {
		let request = self.apply(request);

		Box::pin(async move { Ok(request) })
	}
}
