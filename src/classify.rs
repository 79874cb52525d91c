//! Business envelope configuration and the pure response classifier.
//!
//! [`Classifier::classify`] maps a transport status plus decoded payload into a
//! [`Classification`]. It never mutates its inputs and holds no state beyond configuration,
//! so identical inputs always classify identically.

// self
use crate::{_prelude::*, interceptor::FailureKind};

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;
type Extractor = dyn Fn(&Value) -> Value + Send + Sync;

/// Message used when an envelope carries no message-like field at all.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Decides whether a business code means success.
#[derive(Clone)]
pub enum SuccessCode {
	/// Success when the code equals this value exactly.
	Exact(Value),
	/// Success when the predicate returns `true` for the code.
	Predicate(Arc<Predicate>),
}
impl SuccessCode {
	/// Wraps a predicate.
	pub fn predicate<F>(f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Value) -> bool,
	{
		Self::Predicate(Arc::new(f))
	}

	/// Evaluates the success condition.
	pub fn matches(&self, code: &Value) -> bool {
		match self {
			Self::Exact(expected) => expected == code,
			Self::Predicate(predicate) => predicate(code),
		}
	}
}
impl Default for SuccessCode {
	fn default() -> Self {
		Self::Exact(Value::from(0))
	}
}
impl Debug for SuccessCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Exact(value) => f.debug_tuple("SuccessCode::Exact").field(value).finish(),
			Self::Predicate(_) => f.write_str("SuccessCode::Predicate(..)"),
		}
	}
}

/// Locates the inner data of a successful envelope.
#[derive(Clone)]
pub enum DataField {
	/// Literal key inside the payload.
	Key(String),
	/// Extraction function applied to the whole payload.
	Extract(Arc<Extractor>),
}
impl DataField {
	/// Wraps an extraction function.
	pub fn extract<F>(f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Value) -> Value,
	{
		Self::Extract(Arc::new(f))
	}

	/// Pulls the data out of `payload`; a missing key yields `null`.
	pub fn apply(&self, payload: &Value) -> Value {
		match self {
			Self::Key(key) => payload.get(key).cloned().unwrap_or(Value::Null),
			Self::Extract(extract) => extract(payload),
		}
	}
}
impl Default for DataField {
	fn default() -> Self {
		Self::Key("data".into())
	}
}
impl Debug for DataField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Key(key) => f.debug_tuple("DataField::Key").field(key).finish(),
			Self::Extract(_) => f.write_str("DataField::Extract(..)"),
		}
	}
}

/// Field names and success rule of the business envelope.
#[derive(Clone, Debug)]
pub struct EnvelopeConfig {
	/// Field holding the business code.
	pub code_field: String,
	/// Field holding the business message.
	pub msg_field: String,
	/// Location of the inner data.
	pub data_field: DataField,
	/// Success rule applied to the business code.
	pub success_code: SuccessCode,
}
impl EnvelopeConfig {
	/// Replaces the success rule with a predicate.
	pub fn with_success_predicate<F>(mut self, f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Value) -> bool,
	{
		self.success_code = SuccessCode::predicate(f);

		self
	}

	/// Replaces the data location with an extraction function.
	pub fn with_data_extractor<F>(mut self, f: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Value) -> Value,
	{
		self.data_field = DataField::extract(f);

		self
	}
}
impl Default for EnvelopeConfig {
	fn default() -> Self {
		Self {
			code_field: "code".into(),
			msg_field: "msg".into(),
			data_field: DataField::default(),
			success_code: SuccessCode::default(),
		}
	}
}

/// Business codes and messages that trigger the Auth Coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthTriggers {
	/// Code signalling a refreshable credential.
	pub refresh_code: i64,
	/// Message that must accompany [`Self::refresh_code`].
	pub refresh_message: String,
	/// Code signalling a terminal session.
	pub relogin_code: i64,
	/// Message that must accompany [`Self::relogin_code`].
	pub relogin_message: String,
}
impl Default for AuthTriggers {
	fn default() -> Self {
		Self {
			refresh_code: 1004,
			refresh_message: "刷新token".into(),
			relogin_code: 1003,
			relogin_message: "信息过期, 请重新登录".into(),
		}
	}
}

/// Read-only view over one classified response.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
	/// Transport status.
	pub status: u16,
	/// Business code, `null` when absent.
	pub code: Value,
	/// Business message, when the message field is a string.
	pub message: Option<String>,
	/// Full decoded payload.
	pub payload: Value,
}
impl ResponseEnvelope {
	/// Reads the envelope fields named by `config` out of `payload`.
	pub fn read(status: u16, payload: &Value, config: &EnvelopeConfig) -> Self {
		Self {
			status,
			code: payload.get(&config.code_field).cloned().unwrap_or(Value::Null),
			message: payload.get(&config.msg_field).and_then(Value::as_str).map(str::to_owned),
			payload: payload.clone(),
		}
	}

	fn code_is(&self, code: i64) -> bool {
		self.code.as_i64() == Some(code)
	}

	fn message_is(&self, message: &str) -> bool {
		self.message.as_deref() == Some(message)
	}
}

/// Structured business failure that keeps the original payload.
#[derive(Clone, Debug, PartialEq)]
pub struct BusinessError {
	/// Transport status of the response.
	pub status: u16,
	/// Business code, `null` when absent.
	pub code: Value,
	/// First non-empty message-like field, or [`UNKNOWN_ERROR`].
	pub message: String,
	/// Original decoded payload.
	pub payload: Value,
}
impl BusinessError {
	fn from_envelope(envelope: ResponseEnvelope, msg_field: &str) -> Self {
		let message = [msg_field, "message", "error"]
			.into_iter()
			.filter_map(|field| envelope.payload.get(field).and_then(Value::as_str))
			.find(|message| !message.is_empty())
			.unwrap_or(UNKNOWN_ERROR)
			.to_owned();

		Self { status: envelope.status, code: envelope.code, message, payload: envelope.payload }
	}
}

/// Tagged outcome of classifying one response.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
	/// Success; carries the extracted data.
	Success(Value),
	/// Credential can be refreshed and the request retried.
	BusinessRefresh(BusinessError),
	/// Session is over; the user must log in again.
	BusinessRelogin(BusinessError),
	/// Any other business code.
	BusinessFailure(BusinessError),
	/// Status outside `[200, 400)`.
	TransportError {
		/// Transport status.
		status: u16,
		/// Human-readable message for the status.
		message: String,
	},
}

/// Pure response classifier.
#[derive(Clone, Debug, Default)]
pub struct Classifier {
	/// Envelope field names and success rule.
	pub envelope: EnvelopeConfig,
	/// Refresh/relogin trigger pairs.
	pub triggers: AuthTriggers,
}
impl Classifier {
	/// Creates a classifier from its two configuration halves.
	pub fn new(envelope: EnvelopeConfig, triggers: AuthTriggers) -> Self {
		Self { envelope, triggers }
	}

	/// Classifies `status` + `payload`.
	///
	/// Relogin is checked before refresh, and both before the success rule.
	pub fn classify(&self, status: u16, payload: &Value) -> Classification {
		if !(200..400).contains(&status) {
			return Classification::TransportError {
				status,
				message: FailureKind::from_status(Some(status)).default_message().to_owned(),
			};
		}

		let envelope = ResponseEnvelope::read(status, payload, &self.envelope);

		if envelope.code_is(self.triggers.relogin_code)
			&& envelope.message_is(&self.triggers.relogin_message)
		{
			return Classification::BusinessRelogin(BusinessError::from_envelope(
				envelope,
				&self.envelope.msg_field,
			));
		}
		if envelope.code_is(self.triggers.refresh_code)
			&& envelope.message_is(&self.triggers.refresh_message)
		{
			return Classification::BusinessRefresh(BusinessError::from_envelope(
				envelope,
				&self.envelope.msg_field,
			));
		}
		if self.envelope.success_code.matches(&envelope.code) {
			return Classification::Success(self.envelope.data_field.apply(payload));
		}

		Classification::BusinessFailure(BusinessError::from_envelope(
			envelope,
			&self.envelope.msg_field,
		))
	}
}
