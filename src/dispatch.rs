//! Authentication dispatcher: picks the acquisition strategy for a destination's credential
//! and registers it as a pre-send hook on the outbound request.
//!
//! Dispatch performs no I/O and never suspends. It resolves the destination once, then
//! either leaves the request untouched (no credential), attaches exactly one hook, or fails
//! before touching the request (unsupported kind, rejected ambiguity, invalid scope).

pub mod hooks;

pub use hooks::*;

// self
use crate::{
	_prelude::*,
	auth::DestinationId,
	config::{AmbiguityPolicy, DispatcherConfig},
	confidential::{ClientCredentialsSource, ConfidentialClientPool},
	credential::CredentialDescriptor,
	obs,
	request::{OutboundRequest, PreSendHook},
	resolver::CredentialResolver,
};

/// Something that prepares requests bound to a destination.
pub trait AuthenticationHandler
where
	Self: Send + Sync,
{
	/// Registers whatever hooks `destination` needs on `request`.
	///
	/// Implementations must leave `request` untouched when they fail.
	fn authenticate(
		&self,
		destination: &DestinationId,
		request: &mut OutboundRequest,
	) -> Result<()>;
}

/// Resolves the credential of a destination and attaches the matching hook.
pub struct AuthenticationDispatcher<R>
where
	R: ?Sized + CredentialResolver,
{
	resolver: Arc<R>,
	client_credentials: Arc<dyn ClientCredentialsSource>,
	ambiguity: AmbiguityPolicy,
}
impl<R> AuthenticationDispatcher<R>
where
	R: ?Sized + CredentialResolver,
{
	/// Creates a dispatcher around its resolver and client credentials source.
	pub fn new(resolver: Arc<R>, client_credentials: Arc<dyn ClientCredentialsSource>) -> Self {
		Self { resolver, client_credentials, ambiguity: AmbiguityPolicy::default() }
	}

	/// Builds a dispatcher whose client credentials pool follows `config`.
	pub fn from_config(resolver: Arc<R>, config: &DispatcherConfig) -> Result<Self> {
		let pool = ConfidentialClientPool::new(config.authority()?)
			.with_preemptive_window(config.preemptive_window());

		Ok(Self::new(resolver, Arc::new(pool)).with_ambiguity_policy(config.ambiguity))
	}

	/// Sets how destinations with several credentials are handled.
	pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
		self.ambiguity = policy;

		self
	}

	/// Resolver backing this dispatcher.
	pub fn resolver(&self) -> &Arc<R> {
		&self.resolver
	}

	/// Returns `request` carrying the hook for `destination`'s credential, if any.
	pub fn handle(
		&self,
		destination: &DestinationId,
		mut request: OutboundRequest,
	) -> Result<OutboundRequest> {
		self.authenticate(destination, &mut request)?;

		Ok(request)
	}

	fn select<'d>(
		&self,
		destination: &DestinationId,
		descriptors: &'d [CredentialDescriptor],
	) -> Result<Option<&'d CredentialDescriptor>> {
		match descriptors {
			[] => {
				obs::log_unauthenticated(destination);

				Ok(None)
			},
			[only] => Ok(Some(only)),
			[first, ..] => match self.ambiguity {
				AmbiguityPolicy::FirstWins => {
					obs::log_ambiguous(destination, descriptors.len(), first.kind_label());

					Ok(Some(first))
				},
				AmbiguityPolicy::Reject => Err(Error::AmbiguousCredential {
					destination: destination.to_string(),
					count: descriptors.len(),
				}),
			},
		}
	}

	fn hook_for(
		&self,
		destination: &DestinationId,
		descriptor: &CredentialDescriptor,
	) -> Result<Arc<dyn PreSendHook>> {
		let hook: Arc<dyn PreSendHook> = match descriptor {
			CredentialDescriptor::ClientSecret(credential) => Arc::new(ClientSecretHook::new(
				credential.clone(),
				self.client_credentials.clone(),
			)?),
			CredentialDescriptor::UserToken(credential) =>
				Arc::new(UserTokenHook::new(credential.clone())?),
			CredentialDescriptor::ServiceToken(credential) =>
				Arc::new(ServiceTokenHook::new(credential.clone())?),
			CredentialDescriptor::FunctionKey(credential) =>
				Arc::new(FunctionKeyHook::new(credential.clone())),
			CredentialDescriptor::Unsupported { kind } =>
				return Err(Error::UnsupportedCredentialKind {
					destination: destination.to_string(),
					kind: kind.clone(),
				}),
		};

		Ok(hook)
	}
}
impl<R> AuthenticationHandler for AuthenticationDispatcher<R>
where
	R: ?Sized + CredentialResolver,
{
	fn authenticate(
		&self,
		destination: &DestinationId,
		request: &mut OutboundRequest,
	) -> Result<()> {
		let descriptors = self.resolver.lookup(destination);
		let Some(descriptor) = self.select(destination, &descriptors)? else {
			return Ok(());
		};
		let hook = self.hook_for(destination, descriptor)?;

		request.before_send(hook);

		Ok(())
	}
}
impl<R> Debug for AuthenticationDispatcher<R>
where
	R: ?Sized + CredentialResolver,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticationDispatcher")
			.field("ambiguity", &self.ambiguity)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::AUTHORIZATION;
	// self
	use super::*;
	use crate::{
		auth::{AccessToken, ClientId, ScopeSet, TenantId},
		confidential::AcquireFuture,
		credential::{
			ClientSecretCredential, FunctionKeyCredential, ProviderFuture,
			ServiceTokenCredential, ServiceTokenProvider,
		},
		request::FUNCTIONS_KEY,
		resolver::MemoryResolver,
	};

	struct ScopeAsToken;
	impl ClientCredentialsSource for ScopeAsToken {
		fn acquire_for_client<'a>(
			&'a self,
			_credential: &'a ClientSecretCredential,
			scope: &'a ScopeSet,
		) -> AcquireFuture<'a> {
			Box::pin(async move { Ok(AccessToken::new(scope.normalized())) })
		}
	}

	struct BillingProvider;
	impl ServiceTokenProvider for BillingProvider {
		fn token<'a>(&'a self, scopes: &'a ScopeSet) -> ProviderFuture<'a> {
			Box::pin(async move { Ok(AccessToken::new(format!("svc:{}", scopes.normalized()))) })
		}
	}

	fn destination(name: &str) -> DestinationId {
		DestinationId::new(name).expect("Destination fixture should be valid.")
	}

	fn dispatcher() -> (AuthenticationDispatcher<MemoryResolver>, Arc<MemoryResolver>) {
		let resolver = Arc::new(MemoryResolver::default());

		(AuthenticationDispatcher::new(resolver.clone(), Arc::new(ScopeAsToken)), resolver)
	}

	fn request(base: &str) -> OutboundRequest {
		OutboundRequest::new(Method::GET, Url::parse(base).expect("Fixture URL should parse."))
	}

	fn client_secret() -> ClientSecretCredential {
		ClientSecretCredential::new(
			TenantId::new("contoso").expect("Tenant fixture should be valid."),
			ClientId::new("app-1").expect("Client fixture should be valid."),
			"s3cret",
		)
	}

	#[tokio::test]
	async fn unauthenticated_destinations_pass_through() {
		let (dispatcher, _) = dispatcher();
		let request = dispatcher
			.handle(&destination("public-api"), request("https://public.example.com"))
			.expect("Dispatch should succeed.");

		assert_eq!(request.hook_count(), 0);

		let pending = request.prepare().await.expect("Nothing to run.");

		assert!(pending.headers.is_empty());
	}

	#[tokio::test]
	async fn billing_api_gets_the_service_token() {
		let (dispatcher, resolver) = dispatcher();
		let billing = destination("billing-api");

		resolver.register(
			billing.clone(),
			ServiceTokenCredential::new(Arc::new(BillingProvider), ["https://billing/.default"]),
		);

		let request = dispatcher
			.handle(&billing, request("https://billing.example.com/v2"))
			.expect("Dispatch should succeed.");

		assert_eq!(request.hook_count(), 1);

		let pending = request.prepare().await.expect("Acquisition should succeed.");

		assert_eq!(
			pending.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer svc:https://billing/.default")
		);
		assert!(pending.headers.get(FUNCTIONS_KEY).is_none());
	}

	#[tokio::test]
	async fn default_scope_follows_the_base_url_at_send_time() {
		let (dispatcher, resolver) = dispatcher();
		let orders = destination("orders-api");

		resolver.register(orders.clone(), client_secret());

		let mut request = dispatcher
			.handle(&orders, request("https://old.example.com/v1"))
			.expect("Dispatch should succeed.");

		request.set_base_url(Url::parse("https://api.example.com/v1").expect("URL should parse."));

		let pending = request.prepare().await.expect("Acquisition should succeed.");

		assert_eq!(
			pending.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer https://api.example.com/.default")
		);
	}

	#[test]
	fn unsupported_kinds_fail_before_mutation() {
		let (dispatcher, resolver) = dispatcher();
		let legacy = destination("legacy-api");
		let mut request = request("https://legacy.example.com");

		resolver.register(legacy.clone(), CredentialDescriptor::Unsupported {
			kind: "certificate".into(),
		});

		let err = dispatcher
			.authenticate(&legacy, &mut request)
			.expect_err("Unsupported kind must fail at dispatch.");

		assert!(matches!(
			err,
			Error::UnsupportedCredentialKind { ref destination, ref kind }
				if destination == "legacy-api" && kind == "certificate"
		));
		assert_eq!(request.hook_count(), 0);
	}

	#[tokio::test]
	async fn ambiguous_destinations_use_the_first_credential() {
		let (dispatcher, resolver) = dispatcher();
		let orders = destination("orders-api");

		resolver.register(orders.clone(), FunctionKeyCredential::new("first"));
		resolver.register(orders.clone(), FunctionKeyCredential::new("second"));

		let request =
			dispatcher.handle(&orders, request("https://fn.example.com")).expect("First wins.");

		assert_eq!(request.hook_count(), 1);

		let pending = request.prepare().await.expect("Function key hook cannot fail.");
		let values = pending.headers.get_all(FUNCTIONS_KEY).iter().collect::<Vec<_>>();

		assert_eq!(values, ["first"]);
		assert!(pending.headers.get(AUTHORIZATION).is_none());
	}

	#[test]
	fn reject_policy_refuses_ambiguity() {
		let (dispatcher, resolver) = dispatcher();
		let dispatcher = dispatcher.with_ambiguity_policy(AmbiguityPolicy::Reject);
		let orders = destination("orders-api");
		let mut request = request("https://fn.example.com");

		resolver.register(orders.clone(), FunctionKeyCredential::new("first"));
		resolver.register(orders.clone(), client_secret());

		let err = dispatcher.authenticate(&orders, &mut request).expect_err("Ambiguity rejected.");

		assert!(matches!(err, Error::AmbiguousCredential { count: 2, .. }));
		assert_eq!(request.hook_count(), 0);
	}

	#[test]
	fn from_config_validates_the_authority() {
		let resolver = Arc::new(MemoryResolver::default());
		let config = DispatcherConfig {
			authority_host: "http://login.example.com".into(),
			..Default::default()
		};

		assert!(AuthenticationDispatcher::from_config(resolver.clone(), &config).is_err());
		assert!(
			AuthenticationDispatcher::from_config(resolver, &DispatcherConfig::default()).is_ok()
		);
	}
}
