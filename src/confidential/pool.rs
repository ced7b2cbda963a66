//! Shared confidential clients, one per application registration.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet, TenantId},
	confidential::{
		Authority, ConfidentialClient, DEFAULT_PREEMPTIVE_WINDOW, DefaultErrorClassifier,
		ErrorClassifier, MemoryTokenCache, TokenCache,
	},
	credential::ClientSecretCredential,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
};

/// Boxed future returned by [`ClientCredentialsSource`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Anything able to turn client secret credentials into application tokens.
pub trait ClientCredentialsSource
where
	Self: Send + Sync,
{
	/// Acquires a token for `scope` with the given credential.
	fn acquire_for_client<'a>(
		&'a self,
		credential: &'a ClientSecretCredential,
		scope: &'a ScopeSet,
	) -> AcquireFuture<'a>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PoolKey {
	tenant: TenantId,
	client_id: ClientId,
	secret_fingerprint: String,
}
impl PoolKey {
	fn new(credential: &ClientSecretCredential) -> Self {
		Self {
			tenant: credential.tenant_id.clone(),
			client_id: credential.client_id.clone(),
			secret_fingerprint: credential.secret.fingerprint(),
		}
	}
}

/// Keeps one [`ConfidentialClient`] per tenant, client id, and secret so token caches
/// survive across requests.
pub struct ConfidentialClientPool<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	authority: Authority,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	classifier: Arc<dyn ErrorClassifier>,
	cache: Arc<dyn TokenCache>,
	preemptive_window: Duration,
	clients: Mutex<HashMap<PoolKey, Arc<ConfidentialClient<C, M>>>>,
}
impl<C, M> ConfidentialClientPool<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a pool that reuses the caller-provided transport and mapper.
	pub fn with_http_client(
		authority: Authority,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			authority,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			classifier: Arc::new(DefaultErrorClassifier),
			cache: Arc::new(MemoryTokenCache::default()),
			preemptive_window: DEFAULT_PREEMPTIVE_WINDOW,
			clients: Default::default(),
		}
	}

	/// Replaces the token cache shared by every client of the pool.
	pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.cache = cache;

		self
	}

	/// Replaces the error classifier.
	pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	/// Overrides the preemptive refresh window applied by new clients.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = window;

		self
	}

	/// Authority every client of the pool talks to.
	pub fn authority(&self) -> &Authority {
		&self.authority
	}

	/// Number of distinct clients created so far.
	pub fn len(&self) -> usize {
		self.clients.lock().len()
	}

	/// Returns true when no client has been created yet.
	pub fn is_empty(&self) -> bool {
		self.clients.lock().is_empty()
	}

	/// Returns the client for `credential`, creating it on first use.
	pub fn client_for(&self, credential: &ClientSecretCredential) -> Arc<ConfidentialClient<C, M>> {
		let mut clients = self.clients.lock();

		clients
			.entry(PoolKey::new(credential))
			.or_insert_with(|| {
				Arc::new(
					ConfidentialClient::new(
						credential.tenant_id.clone(),
						credential.client_id.clone(),
						credential.secret.clone(),
						self.authority.clone(),
						self.http_client.clone(),
						self.transport_mapper.clone(),
						self.classifier.clone(),
						self.cache.clone(),
					)
					.with_preemptive_window(self.preemptive_window),
				)
			})
			.clone()
	}
}
impl ConfidentialClientPool {
	/// Creates a pool with the default reqwest transport.
	pub fn new(authority: Authority) -> Self {
		Self::with_http_client(authority, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl Default for ConfidentialClientPool {
	fn default() -> Self {
		Self::new(Authority::default())
	}
}
impl<C, M> ClientCredentialsSource for ConfidentialClientPool<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn acquire_for_client<'a>(
		&'a self,
		credential: &'a ClientSecretCredential,
		scope: &'a ScopeSet,
	) -> AcquireFuture<'a> {
		let client = self.client_for(credential);

		Box::pin(async move { client.acquire_token_for_client(scope).await })
	}
}
impl<C, M> Debug for ConfidentialClientPool<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfidentialClientPool")
			.field("authority", &self.authority)
			.field("clients", &self.len())
			.finish_non_exhaustive()
	}
}
