//! Request descriptors, retry markers, and decoded responses.
//!
//! A [`RequestDescriptor`] is owned by the call that created it. Request stages receive it by
//! value and hand it back, so a stage can never observe another call's descriptor. Retry
//! markers are private and can only be set once each.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, http::TransportResponse};

/// Header carrying the formatted credential.
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP methods understood by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `HEAD`
	Head,
	/// `OPTIONS`
	Options,
}
impl Method {
	/// Returns the uppercase wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Head => "HEAD",
			Method::Options => "OPTIONS",
		}
	}

	/// Returns `true` for the method whose body is encrypted and sent.
	///
	/// Only POST takes the body path; every other method is signed over its query string.
	pub const fn is_mutating(self) -> bool {
		matches!(self, Method::Post)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = UnknownMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(Method::Get),
			"POST" => Ok(Method::Post),
			"PUT" => Ok(Method::Put),
			"PATCH" => Ok(Method::Patch),
			"DELETE" => Ok(Method::Delete),
			"HEAD" => Ok(Method::Head),
			"OPTIONS" => Ok(Method::Options),
			_ => Err(UnknownMethod(s.to_owned())),
		}
	}
}

/// Raised when parsing an unsupported method label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported HTTP method `{0}`.")]
pub struct UnknownMethod(pub String);

/// Request body representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
	/// Structured payload serialized as JSON on the wire.
	Json(Value),
	/// Pre-encoded text sent verbatim (e.g., the sealed ciphertext).
	Text(String),
}
impl Body {
	/// Returns the wire bytes for this body.
	pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
		match self {
			Body::Json(value) => serde_json::to_vec(value),
			Body::Text(text) => Ok(text.as_bytes().to_vec()),
		}
	}
}

/// Output shape selected for a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseReturn {
	/// Untouched response, no envelope handling at all.
	Raw,
	/// Decoded payload, returned unchanged.
	Body,
	/// Envelope-classified inner data field.
	#[default]
	Data,
}

/// Coordinator-owned retry flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryMarkers {
	http: bool,
	business: bool,
}

/// Everything needed to issue one logical call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Target path relative to the client's base URL.
	pub path: String,
	/// Query parameters in insertion order.
	pub query: Vec<(String, Value)>,
	/// Optional request body.
	pub body: Option<Body>,
	/// Mutable header mapping.
	pub headers: BTreeMap<String, String>,
	/// Output shape for the final reply.
	pub response_return: ResponseReturn,
	/// Per-request timeout handed to the transport.
	pub timeout: Option<StdDuration>,
	markers: RetryMarkers,
}
impl RequestDescriptor {
	/// Creates a descriptor for `method` + `path` with no query, body, or headers.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
			headers: BTreeMap::new(),
			response_return: ResponseReturn::default(),
			timeout: None,
			markers: RetryMarkers::default(),
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` descriptor carrying a JSON body.
	pub fn post(path: impl Into<String>, body: Value) -> Self {
		Self::new(Method::Post, path).with_body(Body::Json(body))
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets the body.
	pub fn with_body(mut self, body: Body) -> Self {
		self.body = Some(body);

		self
	}

	/// Sets (or replaces) one header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the output shape.
	pub fn with_response_return(mut self, mode: ResponseReturn) -> Self {
		self.response_return = mode;

		self
	}

	/// Sets the per-request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets or clears the `Authorization` header.
	pub fn set_authorization(&mut self, value: Option<String>) {
		match value {
			Some(value) => {
				self.headers.insert(AUTHORIZATION.into(), value);
			},
			None => {
				self.headers.remove(AUTHORIZATION);
			},
		}
	}

	/// Returns the `Authorization` header, if present.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).map(String::as_str)
	}

	/// Marks the request as retried by the HTTP-401 path; returns `false` if it already was.
	pub fn mark_http_retry(&mut self) -> bool {
		!std::mem::replace(&mut self.markers.http, true)
	}

	/// Marks the request as retried by the business-refresh path; returns `false` if it
	/// already was.
	pub fn mark_business_retry(&mut self) -> bool {
		!std::mem::replace(&mut self.markers.business, true)
	}

	/// Whether the HTTP-401 path already retried this request.
	pub fn is_http_retry(&self) -> bool {
		self.markers.http
	}

	/// Whether the business-refresh path already retried this request.
	pub fn is_business_retry(&self) -> bool {
		self.markers.business
	}

	/// Form-urlencodes the query in insertion order.
	///
	/// `null` values are skipped, strings are used verbatim, and arrays/objects are encoded
	/// as JSON text.
	pub fn query_string(&self) -> String {
		let mut serializer = url::form_urlencoded::Serializer::new(String::new());

		for (key, value) in &self.query {
			match value {
				Value::Null => continue,
				Value::String(text) => serializer.append_pair(key, text),
				other => serializer.append_pair(key, &other.to_string()),
			};
		}

		serializer.finish()
	}
}

/// Decoded backend response plus the request that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
	/// Transport status code.
	pub status: u16,
	/// Response headers (lowercase names).
	pub headers: BTreeMap<String, String>,
	/// Decoded body; `null` when empty, a string when not JSON.
	pub body: Value,
	/// Request as issued by the caller, before request stages ran.
	pub request: RequestDescriptor,
}
impl Response {
	/// Decodes a raw transport response.
	pub fn decode(raw: TransportResponse, request: RequestDescriptor) -> Self {
		let body = if raw.body.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&raw.body).unwrap_or_else(|_| {
				Value::String(String::from_utf8_lossy(&raw.body).into_owned())
			})
		};

		Self { status: raw.status, headers: raw.headers, body, request }
	}

	/// Whether the status falls inside `[200, 400)`.
	pub fn is_transport_success(&self) -> bool {
		(200..400).contains(&self.status)
	}
}
