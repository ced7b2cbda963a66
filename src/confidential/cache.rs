//! Token cache contract and the in-memory cache confidential clients use by default.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, ScopeSet, TenantId, TokenSecret},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Lifecycle status of a cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// The issued-at instant is still in the future.
	Pending,
	/// The token is currently valid.
	Active,
	/// The token is past its expiry instant.
	Expired,
}

/// Application token issued by a client credentials grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Tenant the token was issued by.
	pub tenant: TenantId,
	/// Client the token was issued to.
	pub client_id: ClientId,
	/// Scopes the token was requested for.
	pub scope: ScopeSet,
	/// [`TokenSecret::fingerprint`] of the client secret that obtained the token.
	pub secret_fingerprint: String,
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// `issued_at` plus `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Computes the lifecycle status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.issued_at {
			TokenStatus::Pending
		} else if instant >= self.expires_at {
			TokenStatus::Expired
		} else {
			TokenStatus::Active
		}
	}

	/// Returns true once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Access token handed to request hooks.
	pub fn to_access_token(&self) -> AccessToken {
		AccessToken::new(self.access_token.clone()).with_expires_at(self.expires_at)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("tenant", &self.tenant)
			.field("client_id", &self.client_id)
			.field("scope", &self.scope)
			.field("secret_fingerprint", &self.secret_fingerprint)
			.field("access_token", &self.access_token)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failure reported by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key identifying one cached token.
///
/// Tokens obtained with different secrets for the same application never share a key, so a
/// rotated or revoked secret cannot be served a token its sibling obtained.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
	/// Tenant component.
	pub tenant: TenantId,
	/// Client component.
	pub client_id: ClientId,
	/// Client secret fingerprint.
	pub secret_fingerprint: String,
	/// Scope fingerprint.
	pub scope_fingerprint: String,
}
impl CacheKey {
	/// Builds the key for a tenant, client, secret, and scope set.
	pub fn new(
		tenant: &TenantId,
		client_id: &ClientId,
		secret: &TokenSecret,
		scope: &ScopeSet,
	) -> Self {
		Self {
			tenant: tenant.clone(),
			client_id: client_id.clone(),
			secret_fingerprint: secret.fingerprint(),
			scope_fingerprint: scope.fingerprint(),
		}
	}

	/// Key a record is stored under.
	pub fn for_record(record: &TokenRecord) -> Self {
		Self {
			tenant: record.tenant.clone(),
			client_id: record.client_id.clone(),
			secret_fingerprint: record.secret_fingerprint.clone(),
			scope_fingerprint: record.scope.fingerprint(),
		}
	}
}

/// Storage for client credentials tokens.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Stores or replaces the record under its key.
	fn save(&self, record: TokenRecord) -> CacheFuture<'_, ()>;

	/// Fetches the record stored under `key`.
	fn fetch<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<TokenRecord>>;
}

/// Process-local [`TokenCache`].
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenCache(Arc<RwLock<HashMap<CacheKey, TokenRecord>>>);
impl MemoryTokenCache {
	/// Number of cached records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenCache for MemoryTokenCache {
	fn save(&self, record: TokenRecord) -> CacheFuture<'_, ()> {
		self.0.write().insert(CacheKey::for_record(&record), record);

		Box::pin(async { Ok(()) })
	}

	fn fetch<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<TokenRecord>> {
		let record = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(record) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(issued_at: OffsetDateTime, lifetime: Duration) -> TokenRecord {
		TokenRecord {
			tenant: TenantId::new("contoso").expect("Tenant fixture should be valid."),
			client_id: ClientId::new("app-1").expect("Client fixture should be valid."),
			scope: ScopeSet::single("https://api.example.com/.default")
				.expect("Scope fixture should be valid."),
			secret_fingerprint: TokenSecret::new("good-secret").fingerprint(),
			access_token: "token-1".into(),
			issued_at,
			expires_at: issued_at + lifetime,
		}
	}

	#[test]
	fn status_follows_the_clock() {
		let record = record(macros::datetime!(2025-01-01 00:00 UTC), Duration::hours(1));

		assert_eq!(record.status_at(macros::datetime!(2024-12-31 23:59 UTC)), TokenStatus::Pending);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Active);
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(
			record.to_access_token().expires_at,
			Some(macros::datetime!(2025-01-01 01:00 UTC))
		);
	}

	#[tokio::test]
	async fn memory_cache_partitions_by_scope() {
		let cache = MemoryTokenCache::default();
		let stored = record(OffsetDateTime::now_utc(), Duration::hours(1));
		let secret = TokenSecret::new("good-secret");
		let key = CacheKey::new(&stored.tenant, &stored.client_id, &secret, &stored.scope);
		let other_scope =
			ScopeSet::single("https://other.example.com/.default").expect("Scope should be valid.");
		let other = CacheKey::new(&stored.tenant, &stored.client_id, &secret, &other_scope);

		assert_eq!(key, CacheKey::for_record(&stored));

		cache.save(stored).await.expect("Saving into memory should succeed.");

		let hit = cache.fetch(&key).await.expect("Fetch should succeed.");

		assert_eq!(
			hit.map(|record| record.access_token.expose().to_owned()),
			Some("token-1".into())
		);
		assert!(cache.fetch(&other).await.expect("Fetch should succeed.").is_none());
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn memory_cache_partitions_by_secret() {
		let cache = MemoryTokenCache::default();
		let stored = record(OffsetDateTime::now_utc(), Duration::hours(1));
		let revoked = CacheKey::new(
			&stored.tenant,
			&stored.client_id,
			&TokenSecret::new("revoked-secret"),
			&stored.scope,
		);

		cache.save(stored).await.expect("Saving into memory should succeed.");

		assert!(cache.fetch(&revoked).await.expect("Fetch should succeed.").is_none());
	}

	#[test]
	fn debug_output_redacts_the_token() {
		let record = record(OffsetDateTime::now_utc(), Duration::hours(1));

		assert!(!format!("{record:?}").contains("token-1"));
	}
}
