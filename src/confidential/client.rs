//! Confidential client: one tenant + client id + secret with a cached token per scope.
//!
//! [`ConfidentialClient::acquire_token_for_client`] serves tokens from the [`TokenCache`]
//! until they enter the preemptive refresh window. A per-scope singleflight guard makes
//! concurrent callers wait for the request already in flight instead of stampeding the
//! token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet, TenantId, TokenSecret},
	confidential::{Authority, CacheKey, ErrorClassifier, TokenCache, TokenRecord},
	http::TokenHttpClient,
	oauth::{ClientCredentialsExchange, TransportErrorMapper},
};

/// Default preemptive refresh window, in seconds.
pub const DEFAULT_PREEMPTIVE_WINDOW_SECS: u32 = 60;
/// Default window before expiry in which cached tokens are replaced.
pub const DEFAULT_PREEMPTIVE_WINDOW: Duration =
	Duration::seconds(DEFAULT_PREEMPTIVE_WINDOW_SECS as i64);

/// Client credentials grant for one application registration.
pub struct ConfidentialClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tenant: TenantId,
	client_id: ClientId,
	secret: TokenSecret,
	authority: Authority,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	classifier: Arc<dyn ErrorClassifier>,
	cache: Arc<dyn TokenCache>,
	preemptive_window: Duration,
	guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl<C, M> ConfidentialClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		tenant: TenantId,
		client_id: ClientId,
		secret: TokenSecret,
		authority: Authority,
		http_client: Arc<C>,
		transport_mapper: Arc<M>,
		classifier: Arc<dyn ErrorClassifier>,
		cache: Arc<dyn TokenCache>,
	) -> Self {
		Self {
			tenant,
			client_id,
			secret,
			authority,
			http_client,
			transport_mapper,
			classifier,
			cache,
			preemptive_window: DEFAULT_PREEMPTIVE_WINDOW,
			guards: Default::default(),
		}
	}

	/// Overrides the preemptive refresh window. Negative values disable early refresh.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Tenant the client belongs to.
	pub fn tenant(&self) -> &TenantId {
		&self.tenant
	}

	/// Application identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Returns an application token for `scope`, from the cache when still fresh.
	pub async fn acquire_token_for_client(&self, scope: &ScopeSet) -> Result<AccessToken> {
		let key = CacheKey::new(&self.tenant, &self.client_id, &self.secret, scope);
		let guard = self.guard(&key.scope_fingerprint);
		let _singleflight = guard.lock().await;

		if let Some(current) = self
			.cache
			.fetch(&key)
			.await?
			.filter(|record| !self.should_refresh(record, OffsetDateTime::now_utc()))
		{
			return Ok(current.to_access_token());
		}

		let token_endpoint = self.authority.token_endpoint(&self.tenant)?;
		let record = ClientCredentialsExchange {
			token_endpoint: &token_endpoint,
			method: self.authority.client_auth_method(),
			tenant: &self.tenant,
			client_id: &self.client_id,
			secret: &self.secret,
			http_client: self.http_client.as_ref(),
			transport_mapper: self.transport_mapper.as_ref(),
			classifier: self.classifier.as_ref(),
		}
		.run(scope)
		.await?;
		let token = record.to_access_token();

		self.cache.save(record).await?;

		Ok(token)
	}

	fn guard(&self, fingerprint: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards
			.entry(fingerprint.to_owned())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone()
	}

	fn should_refresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		if record.is_expired_at(now) {
			return true;
		}

		let window = self.effective_window(&record.scope);

		!window.is_zero() && record.expires_at - now <= window
	}

	// Window minus a deterministic per-scope offset in `[0, window)`.
	fn effective_window(&self, scope: &ScopeSet) -> Duration {
		let window_secs = self.preemptive_window.whole_seconds();

		if window_secs <= 1 {
			return self.preemptive_window;
		}

		let modulus = u64::try_from(window_secs).unwrap_or(u64::MAX);
		let jitter = i64::try_from(self.jitter_seed(scope) % modulus).unwrap_or(0);

		self.preemptive_window.checked_sub(Duration::seconds(jitter)).unwrap_or(Duration::ZERO)
	}

	fn jitter_seed(&self, scope: &ScopeSet) -> u64 {
		let mut hasher = DefaultHasher::new();

		self.tenant.hash(&mut hasher);
		self.client_id.hash(&mut hasher);
		scope.hash(&mut hasher);

		hasher.finish()
	}
}
impl<C, M> Debug for ConfidentialClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfidentialClient")
			.field("tenant", &self.tenant)
			.field("client_id", &self.client_id)
			.field("authority", &self.authority)
			.field("preemptive_window", &self.preemptive_window)
			.finish_non_exhaustive()
	}
}
