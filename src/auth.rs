//! Credential access, refresh/re-authentication callbacks, and the Auth Coordinator.

pub mod business;
pub mod coordinator;
pub mod unauthorized;

pub use business::*;
pub use coordinator::*;
pub use unauthorized::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + 'a + Send>>;
/// Boxed future returned by [`Reauthenticator::logout`].
pub type LogoutFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Accessor over the externally owned session state.
pub trait TokenContext
where
	Self: Send + Sync,
{
	/// Returns the current token, if any.
	fn get_token(&self) -> Option<String>;

	/// Replaces (or clears) the current token.
	fn set_token(&self, token: Option<String>);

	/// Sets the login-expired flag.
	fn set_login_expired(&self, expired: bool);

	/// Whether access rights were already checked for this session.
	fn is_access_checked(&self) -> bool;
}

/// Thread-safe in-process [`TokenContext`] for tests and simple deployments.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenContext(Arc<RwLock<TokenState>>);
impl MemoryTokenContext {
	/// Creates a context holding `token`.
	pub fn with_token(token: impl Into<String>) -> Self {
		let context = Self::default();

		context.set_token(Some(token.into()));

		context
	}

	/// Marks access rights as checked (or not).
	pub fn set_access_checked(&self, checked: bool) {
		self.0.write().access_checked = checked;
	}

	/// Returns the login-expired flag.
	pub fn is_login_expired(&self) -> bool {
		self.0.read().login_expired
	}
}
impl TokenContext for MemoryTokenContext {
	fn get_token(&self) -> Option<String> {
		self.0.read().token.clone()
	}

	fn set_token(&self, token: Option<String>) {
		self.0.write().token = token;
	}

	fn set_login_expired(&self, expired: bool) {
		self.0.write().login_expired = expired;
	}

	fn is_access_checked(&self) -> bool {
		self.0.read().access_checked
	}
}

#[derive(Clone, Default)]
struct TokenState {
	token: Option<String>,
	login_expired: bool,
	access_checked: bool,
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("login_expired", &self.login_expired)
			.field("access_checked", &self.access_checked)
			.finish()
	}
}

/// External function that obtains a fresh token.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Returns a new token or fails.
	fn refresh(&self) -> RefreshFuture<'_>;
}
impl<F, Fut> TokenRefresher for F
where
	F: Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<String>>,
{
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(self())
	}
}

/// External callback that ends the session and routes to the login surface.
pub trait Reauthenticator
where
	Self: Send + Sync,
{
	/// Logs the user out.
	fn logout(&self) -> LogoutFuture<'_>;
}
impl<F, Fut> Reauthenticator for F
where
	F: Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<()>>,
{
	fn logout(&self) -> LogoutFuture<'_> {
		Box::pin(self())
	}
}

/// How an expired session is surfaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginExpiredMode {
	/// Log out and route to the login page.
	#[default]
	Page,
	/// Flag the session as expired so a login modal can be shown, once access was checked.
	Modal,
}

/// How a token is rendered into the `Authorization` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
	/// The token verbatim.
	#[default]
	Raw,
	/// `Bearer <token>`.
	Bearer,
}
impl TokenFormat {
	/// Formats `token`; an absent or empty token yields no header.
	pub fn format(self, token: Option<&str>) -> Option<String> {
		let token = token.filter(|token| !token.is_empty())?;

		Some(match self {
			Self::Raw => token.to_owned(),
			Self::Bearer => format!("Bearer {token}"),
		})
	}
}
