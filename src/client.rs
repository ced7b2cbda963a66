//! Explicit handler wiring and the client that sends authenticated requests.

// self
use crate::{
	_prelude::*,
	auth::DestinationId,
	dispatch::AuthenticationHandler,
	error::TransportError,
	request::OutboundRequest,
};

/// Ordered, immutable list of authentication handlers built once at startup.
#[derive(Clone, Default)]
pub struct HandlerSet(Arc<[Arc<dyn AuthenticationHandler>]>);
impl HandlerSet {
	/// Starts collecting handlers.
	pub fn builder() -> HandlerSetBuilder {
		HandlerSetBuilder::default()
	}

	/// Number of handlers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no handler is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Runs every handler in order on a copy of `request`.
	///
	/// The first failure aborts and leaves `request` untouched. The copy replaces `request`
	/// only once every handler has succeeded.
	pub fn apply(&self, destination: &DestinationId, request: &mut OutboundRequest) -> Result<()> {
		let mut staged = request.clone();

		self.0.iter().try_for_each(|handler| handler.authenticate(destination, &mut staged))?;

		*request = staged;

		Ok(())
	}
}
impl Debug for HandlerSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HandlerSet").field("handlers", &self.0.len()).finish()
	}
}

/// Builder for [`HandlerSet`].
#[derive(Default)]
pub struct HandlerSetBuilder(Vec<Arc<dyn AuthenticationHandler>>);
impl HandlerSetBuilder {
	/// Appends a handler.
	pub fn with(mut self, handler: Arc<dyn AuthenticationHandler>) -> Self {
		self.0.push(handler);

		self
	}

	/// Freezes the list.
	pub fn build(self) -> HandlerSet {
		HandlerSet(self.0.into())
	}
}

/// reqwest client that authenticates every request it builds.
#[derive(Clone, Debug)]
pub struct AuthenticatedClient {
	http: ReqwestClient,
	handlers: HandlerSet,
}
impl AuthenticatedClient {
	/// Pairs an HTTP client with its handlers.
	pub fn new(http: ReqwestClient, handlers: HandlerSet) -> Self {
		Self { http, handlers }
	}

	/// Handlers applied to every request.
	pub fn handlers(&self) -> &HandlerSet {
		&self.handlers
	}

	/// Builds a request for `destination` and lets every handler decorate it.
	pub fn request(
		&self,
		destination: &DestinationId,
		method: Method,
		base_url: Url,
	) -> Result<OutboundRequest> {
		let mut request = OutboundRequest::new(method, base_url);

		self.handlers.apply(destination, &mut request)?;

		Ok(request)
	}

	/// Runs the request's hooks, then sends it.
	///
	/// Nothing is transmitted when a hook fails. Dropping the returned future before the
	/// hooks finish cancels the acquisition in progress.
	pub async fn send(&self, request: OutboundRequest) -> Result<reqwest::Response> {
		let pending = request.prepare().await?;
		let response =
			self.http.execute(pending.into_reqwest()).await.map_err(TransportError::from)?;

		Ok(response)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{AccessToken, ScopeSet},
		confidential::{AcquireFuture, ClientCredentialsSource},
		credential::{ClientSecretCredential, FunctionKeyCredential},
		dispatch::AuthenticationDispatcher,
		request::FUNCTIONS_KEY,
		resolver::MemoryResolver,
	};

	struct NoClientCredentials;
	impl ClientCredentialsSource for NoClientCredentials {
		fn acquire_for_client<'a>(
			&'a self,
			_credential: &'a ClientSecretCredential,
			_scope: &'a ScopeSet,
		) -> AcquireFuture<'a> {
			Box::pin(async {
				Err::<AccessToken, Error>(Error::InvalidClient { reason: "not configured".into() })
			})
		}
	}

	struct Tagger;
	impl AuthenticationHandler for Tagger {
		fn authenticate(
			&self,
			_destination: &DestinationId,
			request: &mut OutboundRequest,
		) -> Result<()> {
			request
				.headers_mut()
				.insert(HeaderName::from_static("x-tagged"), HeaderValue::from_static("1"));

			Ok(())
		}
	}

	struct Refuse;
	impl AuthenticationHandler for Refuse {
		fn authenticate(
			&self,
			_destination: &DestinationId,
			_request: &mut OutboundRequest,
		) -> Result<()> {
			Err(Error::InvalidClient { reason: "refused".into() })
		}
	}

	#[test]
	fn failed_handler_leaves_the_request_untouched() {
		let resolver = Arc::new(MemoryResolver::default());
		let orders = DestinationId::new("orders-api").expect("Destination should be valid.");

		resolver.register(orders.clone(), FunctionKeyCredential::new("k-1"));

		let dispatcher = AuthenticationDispatcher::new(resolver, Arc::new(NoClientCredentials));
		let handlers = HandlerSet::builder()
			.with(Arc::new(Tagger))
			.with(Arc::new(dispatcher))
			.with(Arc::new(Refuse))
			.build();
		let mut request = OutboundRequest::new(
			Method::GET,
			Url::parse("https://fn.example.com").expect("Fixture URL should parse."),
		);
		let err = handlers.apply(&orders, &mut request).expect_err("Last handler refuses.");

		assert!(matches!(err, Error::InvalidClient { .. }));
		assert_eq!(request.hook_count(), 0);
		assert!(!request.headers().contains_key("x-tagged"));
	}

	#[tokio::test]
	async fn handlers_run_in_order() {
		let resolver = Arc::new(MemoryResolver::default());
		let orders = DestinationId::new("orders-api").expect("Destination should be valid.");

		resolver.register(orders.clone(), FunctionKeyCredential::new("k-1"));

		let dispatcher = AuthenticationDispatcher::new(resolver, Arc::new(NoClientCredentials));
		let handlers =
			HandlerSet::builder().with(Arc::new(Tagger)).with(Arc::new(dispatcher)).build();
		let client = AuthenticatedClient::new(ReqwestClient::new(), handlers);
		let request = client
			.request(
				&orders,
				Method::GET,
				Url::parse("https://fn.example.com").expect("Fixture URL should parse."),
			)
			.expect("Handlers should succeed.");

		assert_eq!(client.handlers().len(), 2);
		assert_eq!(request.hook_count(), 1);
		assert!(request.headers().contains_key("x-tagged"));

		let pending = request.prepare().await.expect("Function key hook cannot fail.");

		assert!(pending.headers.contains_key(FUNCTIONS_KEY));
	}
}
