//! Outbound requests and the pre-send hooks attached to them.
//!
//! An [`OutboundRequest`] is a call that has not been sent yet. Handlers decorate it with
//! [`PreSendHook`]s; [`OutboundRequest::prepare`] runs every hook exactly once, in
//! registration order, against the [`PendingRequest`] that is about to leave the process.
//! Dropping the `prepare` future (for example because the send was cancelled) drops the
//! in-flight hook with it, so a hook that has not finished never leaves a header behind.

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{_prelude::*, auth::AccessToken, error::ConfigError};

/// Header carrying function keys.
pub const FUNCTIONS_KEY: &str = "x-functions-key";

/// Boxed future returned by [`PreSendHook::before_send`].
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Deferred unit of work executed right before a request is sent.
pub trait PreSendHook
where
	Self: Send + Sync,
{
	/// Mutates the pending request. Returning an error fails the send.
	fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a>;
}

/// Request state handed to hooks at send time.
#[derive(Debug)]
pub struct PendingRequest {
	/// HTTP method.
	pub method: Method,
	/// Base URL the request was built against.
	pub base_url: Url,
	/// Fully resolved target URL.
	pub url: Url,
	/// Headers that will be sent.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl PendingRequest {
	/// Sets `name` to `value`, replacing any previous value. The value is marked sensitive so
	/// it never shows up in `Debug` output.
	pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
		let mut value = HeaderValue::from_str(value).map_err(|source| {
			ConfigError::InvalidHeaderValue { name: name.as_str().to_owned(), source }
		})?;

		value.set_sensitive(true);
		self.headers.insert(name, value);

		Ok(())
	}

	/// Sets `Authorization: Bearer <token>`.
	pub fn set_bearer(&mut self, token: &AccessToken) -> Result<()> {
		self.set_header(AUTHORIZATION, &token.bearer())
	}

	/// Converts into a reqwest request ready for execution.
	pub fn into_reqwest(self) -> reqwest::Request {
		let mut request = reqwest::Request::new(self.method, self.url);

		*request.headers_mut() = self.headers;

		if let Some(body) = self.body {
			*request.body_mut() = Some(body.into());
		}

		request
	}
}

/// HTTP call that has not been sent yet.
#[derive(Clone)]
pub struct OutboundRequest {
	method: Method,
	base_url: Url,
	path: String,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
	hooks: Vec<Arc<dyn PreSendHook>>,
}
impl OutboundRequest {
	/// Creates a request against `base_url`.
	pub fn new(method: Method, base_url: Url) -> Self {
		Self {
			method,
			base_url,
			path: String::new(),
			headers: HeaderMap::new(),
			body: None,
			hooks: Vec::new(),
		}
	}

	/// Appends `path` to the base URL when the request is prepared.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Adds a static header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Registers a hook that runs right before the request is sent.
	pub fn before_send(&mut self, hook: Arc<dyn PreSendHook>) {
		self.hooks.push(hook);
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Current base URL.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Replaces the base URL. Hooks observe the new value when they run.
	pub fn set_base_url(&mut self, base_url: Url) {
		self.base_url = base_url;
	}

	/// Static headers set so far.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Mutable access to the static headers.
	pub fn headers_mut(&mut self) -> &mut HeaderMap {
		&mut self.headers
	}

	/// Number of registered hooks.
	pub fn hook_count(&self) -> usize {
		self.hooks.len()
	}

	/// Runs every hook once, in registration order, and returns the request as it will be sent.
	///
	/// The first failing hook aborts preparation; later hooks never run.
	pub async fn prepare(self) -> Result<PendingRequest> {
		let Self { method, base_url, path, headers, body, hooks } = self;
		let url = resolve_url(&base_url, &path)?;
		let mut pending = PendingRequest { method, base_url, url, headers, body };

		for hook in hooks {
			hook.before_send(&mut pending).await?;
		}

		Ok(pending)
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("base_url", &self.base_url.as_str())
			.field("path", &self.path)
			.field("hooks", &self.hooks.len())
			.finish()
	}
}

fn resolve_url(base_url: &Url, path: &str) -> Result<Url> {
	let path = path.trim_start_matches('/');

	if path.is_empty() {
		return Ok(base_url.clone());
	}

	let joined = format!("{}/{path}", base_url.as_str().trim_end_matches('/'));

	Url::parse(&joined)
		.map_err(|source| ConfigError::InvalidRequestPath { path: path.to_owned(), source }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Tag(&'static str);
	impl PreSendHook for Tag {
		fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a> {
			Box::pin(async move {
				let seen = request
					.headers
					.get("x-trace")
					.and_then(|value| value.to_str().ok())
					.map(|value| format!("{value},{}", self.0))
					.unwrap_or_else(|| self.0.to_owned());

				request.set_header(HeaderName::from_static("x-trace"), &seen)
			})
		}
	}

	struct Fail;
	impl PreSendHook for Fail {
		fn before_send<'a>(&'a self, _request: &'a mut PendingRequest) -> HookFuture<'a> {
			Box::pin(async { Err::<(), Error>(ConfigError::MissingExpiresIn.into()) })
		}
	}

	fn base() -> Url {
		Url::parse("https://api.example.com/v1").expect("Fixture URL should parse.")
	}

	#[tokio::test]
	async fn hooks_run_in_registration_order() {
		let mut request = OutboundRequest::new(Method::GET, base()).with_path("/orders/7");

		request.before_send(Arc::new(Tag("a")));
		request.before_send(Arc::new(Tag("b")));

		let pending = request.prepare().await.expect("Hooks should succeed.");

		assert_eq!(pending.url.as_str(), "https://api.example.com/v1/orders/7");
		assert_eq!(pending.headers.get("x-trace").map(|v| v.to_str().ok()), Some(Some("a,b")));
	}

	#[tokio::test]
	async fn failing_hook_stops_preparation() {
		let mut request = OutboundRequest::new(Method::POST, base()).with_body("{}");

		request.before_send(Arc::new(Fail));
		request.before_send(Arc::new(Tag("never")));

		let err = request.prepare().await.expect_err("Failing hook must abort the send.");

		assert!(matches!(err, Error::Config(ConfigError::MissingExpiresIn)));
	}

	#[test]
	fn set_header_replaces_and_marks_sensitive() {
		let mut pending = PendingRequest {
			method: Method::GET,
			base_url: base(),
			url: base(),
			headers: HeaderMap::new(),
			body: None,
		};

		pending
			.set_header(HeaderName::from_static(FUNCTIONS_KEY), "first")
			.expect("Header should be valid.");
		pending
			.set_header(HeaderName::from_static(FUNCTIONS_KEY), "second")
			.expect("Header should be valid.");

		let values = pending.headers.get_all(FUNCTIONS_KEY).iter().collect::<Vec<_>>();

		assert_eq!(values.len(), 1);
		assert_eq!(values[0], "second");
		assert!(values[0].is_sensitive());
		assert!(pending.set_header(AUTHORIZATION, "bad\nvalue").is_err());
	}

	#[test]
	fn base_url_can_be_replaced_before_send() {
		let mut request = OutboundRequest::new(Method::GET, base());

		request.set_base_url(Url::parse("https://eu.example.com").expect("URL should parse."));

		assert_eq!(request.base_url().as_str(), "https://eu.example.com/");
		assert_eq!(request.hook_count(), 0);
	}
}
