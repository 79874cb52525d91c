// self
use crate::{
	_prelude::*,
	auth::{
		AuthCoordinator, BusinessRefreshStage, MemoryTokenContext, Reauthenticator, TokenContext,
		TokenRefresher, UnauthorizedStage,
	},
	classify::{Classifier, EnvelopeConfig},
	client::RequestClient,
	config::{ClientConfig, RefreshPath},
	error::ConfigError,
	http::Transport,
	interceptor::{AuthorizationStage, EnvelopeStage, ErrorReportStage, InterceptorChain},
	seal::{SealStage, Sealer},
};

/// Assembles a [`RequestClient`] from a [`ClientConfig`] and its external collaborators.
///
/// Stages are registered in a fixed order. Request: authorization headers, then sealing.
/// Response: the active refresh path, the envelope, then error reporting.
pub struct RequestClientBuilder {
	config: ClientConfig,
	transport: Option<Arc<dyn Transport>>,
	tokens: Option<Arc<dyn TokenContext>>,
	refresher: Option<Arc<dyn TokenRefresher>>,
	reauthenticator: Option<Arc<dyn Reauthenticator>>,
	envelope: Option<EnvelopeConfig>,
	sealer: Option<Sealer>,
	reporter: Option<ErrorReportStage>,
}
impl RequestClientBuilder {
	/// Creates a builder seeded with `config`.
	pub fn new(config: ClientConfig) -> Self {
		Self {
			config,
			transport: None,
			tokens: None,
			refresher: None,
			reauthenticator: None,
			envelope: None,
			sealer: None,
			reporter: None,
		}
	}

	/// Sets the Transport Core (defaults to reqwest when that feature is enabled).
	pub fn transport(mut self, transport: impl Transport) -> Self {
		self.transport = Some(Arc::new(transport));

		self
	}

	/// Sets the session state accessor (defaults to an empty [`MemoryTokenContext`]).
	pub fn tokens(mut self, tokens: impl 'static + TokenContext) -> Self {
		self.tokens = Some(Arc::new(tokens));

		self
	}

	/// Sets the external refresh function; required unless refresh is disabled.
	pub fn refresher(mut self, refresher: impl 'static + TokenRefresher) -> Self {
		self.refresher = Some(Arc::new(refresher));

		self
	}

	/// Sets the external logout callback; required unless refresh is disabled.
	pub fn reauthenticator(mut self, reauthenticator: impl 'static + Reauthenticator) -> Self {
		self.reauthenticator = Some(Arc::new(reauthenticator));

		self
	}

	/// Replaces the envelope derived from the configuration (e.g., to use a predicate).
	pub fn envelope(mut self, envelope: EnvelopeConfig) -> Self {
		self.envelope = Some(envelope);

		self
	}

	/// Replaces the sealer derived from the configuration's `seal` block.
	pub fn sealer(mut self, sealer: Sealer) -> Self {
		self.sealer = Some(sealer);

		self
	}

	/// Registers a reporter receiving `(message, error)` for every failed call.
	pub fn reporter<F>(mut self, reporter: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&str, &Error),
	{
		self.reporter = Some(ErrorReportStage::new(reporter));

		self
	}

	/// Validates collaborators and wires the interceptor chain.
	pub fn build(self) -> Result<RequestClient, ConfigError> {
		let config = self.config;
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport(&config)?,
		};
		let tokens = self.tokens.unwrap_or_else(|| Arc::new(MemoryTokenContext::default()));
		let sealer = match (self.sealer, &config.seal) {
			(Some(sealer), _) => Some(sealer),
			(None, Some(seal)) => Some(seal.sealer()?),
			(None, None) => None,
		};
		let classifier = Classifier::new(
			self.envelope.unwrap_or_else(|| config.envelope.clone().into()),
			config.auth.clone(),
		);
		let coordinator = match config.refresh_path {
			RefreshPath::Disabled => None,
			RefreshPath::Business | RefreshPath::Unauthorized => {
				let refresher = self
					.refresher
					.ok_or(ConfigError::MissingCollaborator { collaborator: "token refresher" })?;
				let reauthenticator = self
					.reauthenticator
					.ok_or(ConfigError::MissingCollaborator { collaborator: "reauthenticator" })?;

				Some(Arc::new(
					AuthCoordinator::new(tokens.clone(), refresher, reauthenticator)
						.with_login_expired_mode(config.login_expired_mode)
						.with_token_format(config.token_format),
				))
			},
		};
		let mut chain = InterceptorChain::default();
		let mut authorization = AuthorizationStage::new(tokens, config.token_format);

		if let Some(locale) = &config.locale {
			authorization = authorization.with_locale(locale.as_str());
		}

		chain.add_request_stage(authorization);

		if let Some(sealer) = sealer {
			chain.add_request_stage(SealStage::new(sealer));
		}

		match (&coordinator, config.refresh_path) {
			(Some(coordinator), RefreshPath::Unauthorized) => chain.add_response_stage(
				UnauthorizedStage::new(coordinator.clone(), config.enable_refresh_token),
			),
			(Some(coordinator), RefreshPath::Business) => chain.add_response_stage(
				BusinessRefreshStage::new(classifier.clone(), coordinator.clone()),
			),
			_ => (),
		}

		chain.add_response_stage(EnvelopeStage::new(classifier));

		if let Some(reporter) = self.reporter {
			chain.add_response_stage(reporter);
		}

		let mut client = RequestClient::new(transport, config.base_url.clone(), chain);

		if let Some(timeout) = config.timeout() {
			client = client.with_timeout(timeout);
		}

		client.coordinator = coordinator;

		Ok(client)
	}
}
impl Debug for RequestClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClientBuilder")
			.field("config", &self.config)
			.field("transport", &self.transport.is_some())
			.field("refresher", &self.refresher.is_some())
			.field("reauthenticator", &self.reauthenticator.is_some())
			.field("sealer", &self.sealer)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError> {
	let transport = match config.timeout() {
		Some(timeout) => crate::http::ReqwestTransport::with_timeout(timeout)?,
		None => crate::http::ReqwestTransport::default(),
	};

	Ok(Arc::new(transport))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(_: &ClientConfig) -> Result<Arc<dyn Transport>, ConfigError> {
	Err(ConfigError::MissingCollaborator { collaborator: "transport" })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn config(refresh_path: RefreshPath) -> ClientConfig {
		ClientConfig {
			refresh_path,
			..ClientConfig::new(Url::parse("https://api.example.com").expect("Fixture URL."))
		}
	}

	fn transport() -> ScriptedTransport {
		ScriptedTransport::new(|_| Ok(json_response(200, Value::Null)))
	}

	#[test]
	fn refresh_paths_require_callbacks() {
		let error = RequestClientBuilder::new(config(RefreshPath::Business))
			.transport(transport())
			.build()
			.expect_err("Missing refresher should fail.");

		assert!(matches!(
			error,
			ConfigError::MissingCollaborator { collaborator: "token refresher" }
		));

		let client = RequestClientBuilder::new(config(RefreshPath::Disabled))
			.transport(transport())
			.build()
			.expect("Disabled refresh needs no callbacks.");

		assert!(client.coordinator().is_none());
		assert_eq!(client.chain().response_len(), 1);
	}

	#[test]
	fn stages_are_wired_per_configuration() {
		let client = RequestClientBuilder::new(config(RefreshPath::Unauthorized))
			.transport(transport())
			.refresher(|| async { Ok::<_, Error>("t".to_owned()) })
			.reauthenticator(|| async { Ok::<_, Error>(()) })
			.sealer(test_sealer())
			.reporter(|_, _| {})
			.build()
			.expect("Client should build.");

		assert!(client.coordinator().is_some());
		assert_eq!(client.chain().request_len(), 2);
		assert_eq!(client.chain().response_len(), 3);
	}
}
