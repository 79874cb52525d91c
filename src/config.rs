//! Declarative client configuration.
//!
//! [`ClientConfig`] enumerates every recognized option with its default and deserializes from
//! camelCase JSON. Function-valued options (success predicate, data extractor) cannot be
//! expressed in JSON; set them on [`EnvelopeConfig`] and hand it to the client builder.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{LoginExpiredMode, TokenFormat},
	classify::{AuthTriggers, DataField, EnvelopeConfig, SuccessCode},
	error::ConfigError,
	seal::{RsaChunkCipher, SECURITY_HEADER, SecretCode, Sealer},
};

/// Which refresh path the client wires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPath {
	/// Refresh on the configured business refresh code.
	#[default]
	Business,
	/// Refresh on HTTP 401.
	Unauthorized,
	/// Never refresh.
	Disabled,
}

/// Envelope field names and exact success code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvelopeFields {
	/// Field holding the business code.
	pub code_field: String,
	/// Field holding the business message.
	pub msg_field: String,
	/// Field holding the inner data.
	pub data_field: String,
	/// Business code that means success.
	pub success_code: Value,
}
impl Default for EnvelopeFields {
	fn default() -> Self {
		Self {
			code_field: "code".into(),
			msg_field: "msg".into(),
			data_field: "data".into(),
			success_code: Value::from(0),
		}
	}
}
impl From<EnvelopeFields> for EnvelopeConfig {
	fn from(fields: EnvelopeFields) -> Self {
		Self {
			code_field: fields.code_field,
			msg_field: fields.msg_field,
			data_field: DataField::Key(fields.data_field),
			success_code: SuccessCode::Exact(fields.success_code),
		}
	}
}

/// Secure header settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealConfig {
	/// Static project secret.
	pub secret_code: SecretCode,
	/// PKCS#1 or SPKI PEM public key.
	pub public_key_pem: String,
	/// Secure header name.
	#[serde(default = "default_header_name")]
	pub header_name: String,
}
impl SealConfig {
	/// Parses the key and builds a [`Sealer`].
	pub fn sealer(&self) -> Result<Sealer, ConfigError> {
		let cipher = RsaChunkCipher::from_pem(&self.public_key_pem)?;

		Ok(Sealer::new(Arc::new(cipher), self.secret_code.clone())
			.with_header_name(self.header_name.as_str()))
	}
}

/// Every recognized client option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Value of `Accept-Language`; omitted when absent.
	#[serde(default)]
	pub locale: Option<String>,
	/// Default per-request timeout in seconds.
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	/// Envelope field names and success code.
	#[serde(default)]
	pub envelope: EnvelopeFields,
	/// Refresh/relogin trigger pairs.
	#[serde(default)]
	pub auth: AuthTriggers,
	/// Active refresh path.
	#[serde(default)]
	pub refresh_path: RefreshPath,
	/// How an expired session is surfaced.
	#[serde(default)]
	pub login_expired_mode: LoginExpiredMode,
	/// How tokens are rendered into `Authorization`.
	#[serde(default)]
	pub token_format: TokenFormat,
	/// Whether the HTTP 401 path refreshes before re-authenticating.
	#[serde(default = "default_enable_refresh_token")]
	pub enable_refresh_token: bool,
	/// Secure header settings; requests are sent unsealed when absent.
	#[serde(default)]
	pub seal: Option<SealConfig>,
}
impl ClientConfig {
	/// Creates a configuration with every option at its default.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			locale: None,
			timeout_secs: None,
			envelope: EnvelopeFields::default(),
			auth: AuthTriggers::default(),
			refresh_path: RefreshPath::default(),
			login_expired_mode: LoginExpiredMode::default(),
			token_format: TokenFormat::default(),
			enable_refresh_token: default_enable_refresh_token(),
			seal: None,
		}
	}

	/// Parses a JSON document, reporting the failing path on error.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })
	}

	/// Default per-request timeout.
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout_secs.map(StdDuration::from_secs)
	}
}

fn default_header_name() -> String {
	SECURITY_HEADER.into()
}

fn default_enable_refresh_token() -> bool {
	true
}
