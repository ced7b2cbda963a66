//! Credential descriptors registered per destination and the provider contracts they lean on.
//!
//! A [`CredentialDescriptor`] only says *how* a token is obtained. Acquisition itself runs
//! later, inside the pre-send hook the dispatcher registers on a request, so every send sees
//! whatever the underlying provider currently hands out.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, PrincipalId, ScopeSet, TenantId, TokenSecret},
	error::BoxError,
};

/// Boxed future returned by external token providers.
pub type ProviderFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessToken, BoxError>> + 'a + Send>>;

/// Acquires delegated tokens on behalf of an authenticated end user (on-behalf-of flows).
pub trait UserTokenProvider
where
	Self: Send + Sync,
{
	/// Returns a token for `scopes` on behalf of `principal`, using silent or cached
	/// acquisition when the provider supports it.
	fn token_for_user<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		principal: &'a UserPrincipal,
	) -> ProviderFuture<'a>;
}

/// Acquires tokens for the running workload (managed identity, workload identity, ...).
pub trait ServiceTokenProvider
where
	Self: Send + Sync,
{
	/// Returns a token for `scopes`.
	///
	/// `scopes` arrives sorted and deduplicated; registration order is not preserved.
	fn token<'a>(&'a self, scopes: &'a ScopeSet) -> ProviderFuture<'a>;
}

/// Stable labels for the credential kinds the dispatcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// Confidential client with a shared secret.
	ClientSecret,
	/// Delegated user token.
	UserToken,
	/// Workload or managed identity token.
	ServiceToken,
	/// Static function key.
	FunctionKey,
}
impl CredentialKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::ClientSecret => "client_secret",
			CredentialKind::UserToken => "user_token",
			CredentialKind::ServiceToken => "service_token",
			CredentialKind::FunctionKey => "function_key",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// End-user identity a delegated token is requested for.
#[derive(Clone, PartialEq, Eq)]
pub struct UserPrincipal {
	/// Stable user identifier (object id, subject, ...).
	pub id: PrincipalId,
	/// Home tenant of the user, when known.
	pub tenant: Option<TenantId>,
	/// Inbound token proving the user's identity, exchanged by on-behalf-of providers.
	pub assertion: Option<TokenSecret>,
}
impl UserPrincipal {
	/// Creates a principal for the provided user id.
	pub fn new(id: PrincipalId) -> Self {
		Self { id, tenant: None, assertion: None }
	}

	/// Sets the home tenant.
	pub fn with_tenant(mut self, tenant: TenantId) -> Self {
		self.tenant = Some(tenant);

		self
	}

	/// Sets the inbound user assertion.
	pub fn with_assertion(mut self, assertion: impl Into<TokenSecret>) -> Self {
		self.assertion = Some(assertion.into());

		self
	}
}
impl Debug for UserPrincipal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserPrincipal")
			.field("id", &self.id)
			.field("tenant", &self.tenant)
			.field("assertion_set", &self.assertion.is_some())
			.finish()
	}
}

/// Confidential client credentials (tenant + client id + shared secret).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretCredential {
	/// Directory tenant issuing the token.
	pub tenant_id: TenantId,
	/// Application (client) identifier.
	pub client_id: ClientId,
	/// Client secret.
	pub secret: TokenSecret,
	/// Explicit scope; `<origin of the request base URL>/.default` when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
}
impl ClientSecretCredential {
	/// Creates a credential without an explicit scope.
	pub fn new(tenant_id: TenantId, client_id: ClientId, secret: impl Into<TokenSecret>) -> Self {
		Self { tenant_id, client_id, secret: secret.into(), scope: None }
	}

	/// Pins the scope instead of deriving it from the request.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}
}

/// Delegated credential: a user token provider plus the user and scope to ask for.
#[derive(Clone)]
pub struct UserTokenCredential {
	/// Provider performing the on-behalf-of acquisition.
	pub provider: Arc<dyn UserTokenProvider>,
	/// Scope requested for the user.
	pub scope: String,
	/// User the token is requested for.
	pub principal: UserPrincipal,
}
impl UserTokenCredential {
	/// Creates a delegated credential.
	pub fn new(
		provider: Arc<dyn UserTokenProvider>,
		scope: impl Into<String>,
		principal: UserPrincipal,
	) -> Self {
		Self { provider, scope: scope.into(), principal }
	}
}
impl Debug for UserTokenCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserTokenCredential")
			.field("scope", &self.scope)
			.field("principal", &self.principal)
			.finish_non_exhaustive()
	}
}

/// Workload credential: a generic token provider plus the scopes to ask for.
#[derive(Clone)]
pub struct ServiceTokenCredential {
	/// Provider issuing workload tokens.
	pub provider: Arc<dyn ServiceTokenProvider>,
	/// Scopes requested from the provider, normalized into a [`ScopeSet`] when the hook is
	/// built.
	pub scopes: Vec<String>,
}
impl ServiceTokenCredential {
	/// Creates a workload credential.
	pub fn new<I, S>(provider: Arc<dyn ServiceTokenProvider>, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { provider, scopes: scopes.into_iter().map(Into::into).collect() }
	}
}
impl Debug for ServiceTokenCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceTokenCredential")
			.field("scopes", &self.scopes)
			.finish_non_exhaustive()
	}
}

/// Static key sent in the `x-functions-key` header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionKeyCredential {
	/// Function key.
	pub key: TokenSecret,
}
impl FunctionKeyCredential {
	/// Wraps a function key.
	pub fn new(key: impl Into<TokenSecret>) -> Self {
		Self { key: key.into() }
	}
}

/// Credential registered for a destination.
#[derive(Clone, Debug)]
pub enum CredentialDescriptor {
	/// Client credentials grant against the configured authority.
	ClientSecret(ClientSecretCredential),
	/// Delegated token for an end user.
	UserToken(UserTokenCredential),
	/// Workload identity token.
	ServiceToken(ServiceTokenCredential),
	/// Static function key.
	FunctionKey(FunctionKeyCredential),
	/// Kind recorded by the registry that no acquisition strategy exists for.
	Unsupported {
		/// Kind label as recorded by the registry.
		kind: String,
	},
}
impl CredentialDescriptor {
	/// Kind of the descriptor, or `None` for [`CredentialDescriptor::Unsupported`].
	pub fn kind(&self) -> Option<CredentialKind> {
		match self {
			Self::ClientSecret(_) => Some(CredentialKind::ClientSecret),
			Self::UserToken(_) => Some(CredentialKind::UserToken),
			Self::ServiceToken(_) => Some(CredentialKind::ServiceToken),
			Self::FunctionKey(_) => Some(CredentialKind::FunctionKey),
			Self::Unsupported { .. } => None,
		}
	}

	/// Label of the descriptor's kind, including unsupported ones.
	pub fn kind_label(&self) -> &str {
		match self {
			Self::Unsupported { kind } => kind.as_str(),
			other => other.kind().map(CredentialKind::as_str).unwrap_or_default(),
		}
	}
}
impl From<ClientSecretCredential> for CredentialDescriptor {
	fn from(value: ClientSecretCredential) -> Self {
		Self::ClientSecret(value)
	}
}
impl From<UserTokenCredential> for CredentialDescriptor {
	fn from(value: UserTokenCredential) -> Self {
		Self::UserToken(value)
	}
}
impl From<ServiceTokenCredential> for CredentialDescriptor {
	fn from(value: ServiceTokenCredential) -> Self {
		Self::ServiceToken(value)
	}
}
impl From<FunctionKeyCredential> for CredentialDescriptor {
	fn from(value: FunctionKeyCredential) -> Self {
		Self::FunctionKey(value)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct NeverProvider;
	impl ServiceTokenProvider for NeverProvider {
		fn token<'a>(&'a self, _scopes: &'a ScopeSet) -> ProviderFuture<'a> {
			Box::pin(async { Err::<AccessToken, BoxError>("unused".into()) })
		}
	}

	#[test]
	fn kinds_and_labels_line_up() {
		let service: CredentialDescriptor =
			ServiceTokenCredential::new(Arc::new(NeverProvider), ["https://billing/.default"])
				.into();
		let key: CredentialDescriptor = FunctionKeyCredential::new("k").into();
		let unknown = CredentialDescriptor::Unsupported { kind: "certificate".into() };

		assert_eq!(service.kind(), Some(CredentialKind::ServiceToken));
		assert_eq!(service.kind_label(), "service_token");
		assert_eq!(key.kind_label(), "function_key");
		assert_eq!(unknown.kind(), None);
		assert_eq!(unknown.kind_label(), "certificate");
	}

	#[test]
	fn debug_output_hides_secrets() {
		let tenant = TenantId::new("contoso").expect("Tenant fixture should be valid.");
		let client = ClientId::new("app-1").expect("Client fixture should be valid.");
		let secret: CredentialDescriptor =
			ClientSecretCredential::new(tenant, client, "hunter2").into();
		let principal = UserPrincipal::new(
			PrincipalId::new("user-1").expect("Principal fixture should be valid."),
		)
		.with_assertion("user-assertion");

		assert!(!format!("{secret:?}").contains("hunter2"));
		assert!(!format!("{principal:?}").contains("user-assertion"));
		assert!(format!("{principal:?}").contains("assertion_set: true"));
	}

	#[test]
	fn client_secret_credential_deserializes_with_optional_scope() {
		let credential: ClientSecretCredential = serde_json::from_str(
			"{\"tenant_id\":\"contoso\",\"client_id\":\"app-1\",\"secret\":\"s\"}",
		)
		.expect("Credential without scope should deserialize.");

		assert_eq!(credential.scope, None);
		assert_eq!(credential.secret.expose(), "s");
	}
}
