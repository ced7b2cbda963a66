//! One pre-send hook per credential variant.
//!
//! Every hook acquires its token when it runs, at send time, and only then writes the
//! header. If the send is cancelled while a hook is still waiting on its provider, the hook
//! future is dropped and the request never receives the header.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	confidential::ClientCredentialsSource,
	credential::{
		ClientSecretCredential, CredentialKind, FunctionKeyCredential, ServiceTokenCredential,
		UserTokenCredential,
	},
	error::ConfigError,
	obs::{self, AcquisitionOutcome, AcquisitionSpan},
	request::{FUNCTIONS_KEY, HookFuture, PendingRequest, PreSendHook},
};

/// Returns the `<origin>/.default` scope for a request's base URL.
pub fn default_scope_for(base_url: &Url) -> Result<ScopeSet> {
	ScopeSet::default_for(base_url)
		.ok_or_else(|| ConfigError::OpaqueBaseUrl { url: base_url.to_string() }.into())
}

/// Client credentials grant through a [`ClientCredentialsSource`].
pub struct ClientSecretHook {
	credential: ClientSecretCredential,
	scope: Option<ScopeSet>,
	source: Arc<dyn ClientCredentialsSource>,
}
impl ClientSecretHook {
	/// Creates the hook, validating an explicit scope up front.
	pub fn new(
		credential: ClientSecretCredential,
		source: Arc<dyn ClientCredentialsSource>,
	) -> Result<Self> {
		let scope = credential
			.scope
			.as_deref()
			.map(ScopeSet::single)
			.transpose()
			.map_err(ConfigError::from)?;

		Ok(Self { credential, scope, source })
	}
}
impl PreSendHook for ClientSecretHook {
	fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a> {
		observed(CredentialKind::ClientSecret, "client_secret_hook", async move {
			// Base URL as of send time, not dispatch time.
			let scope = match &self.scope {
				Some(scope) => scope.clone(),
				None => default_scope_for(&request.base_url)?,
			};
			let token = self.source.acquire_for_client(&self.credential, &scope).await?;

			request.set_bearer(&token)
		})
	}
}
impl Debug for ClientSecretHook {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretHook")
			.field("credential", &self.credential)
			.field("scope", &self.scope)
			.finish_non_exhaustive()
	}
}

/// Delegated token for an end user.
pub struct UserTokenHook {
	credential: UserTokenCredential,
	scopes: ScopeSet,
}
impl UserTokenHook {
	/// Creates the hook, validating the requested scope.
	pub fn new(credential: UserTokenCredential) -> Result<Self> {
		let scopes = ScopeSet::single(credential.scope.as_str()).map_err(ConfigError::from)?;

		Ok(Self { credential, scopes })
	}
}
impl PreSendHook for UserTokenHook {
	fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a> {
		const KIND: CredentialKind = CredentialKind::UserToken;

		observed(KIND, "user_token_hook", async move {
			let token = self
				.credential
				.provider
				.token_for_user(&self.scopes, &self.credential.principal)
				.await
				.map_err(|e| Error::token_acquisition(KIND, e))?;

			request.set_bearer(&token)
		})
	}
}
impl Debug for UserTokenHook {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserTokenHook").field("credential", &self.credential).finish()
	}
}

/// Workload token from a generic provider.
///
/// The provider is asked for the sorted, deduplicated scope set, so registrations that differ
/// only in scope order or repetition request the same token.
pub struct ServiceTokenHook {
	credential: ServiceTokenCredential,
	scopes: ScopeSet,
}
impl ServiceTokenHook {
	/// Creates the hook, validating the requested scopes.
	pub fn new(credential: ServiceTokenCredential) -> Result<Self> {
		let scopes = ScopeSet::new(credential.scopes.iter().map(String::as_str))
			.map_err(ConfigError::from)?;

		Ok(Self { credential, scopes })
	}
}
impl PreSendHook for ServiceTokenHook {
	fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a> {
		const KIND: CredentialKind = CredentialKind::ServiceToken;

		observed(KIND, "service_token_hook", async move {
			let token = self
				.credential
				.provider
				.token(&self.scopes)
				.await
				.map_err(|e| Error::token_acquisition(KIND, e))?;

			request.set_bearer(&token)
		})
	}
}
impl Debug for ServiceTokenHook {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceTokenHook").field("credential", &self.credential).finish()
	}
}

/// Static function key; completes on its first poll.
#[derive(Debug)]
pub struct FunctionKeyHook {
	credential: FunctionKeyCredential,
}
impl FunctionKeyHook {
	/// Creates the hook.
	pub fn new(credential: FunctionKeyCredential) -> Self {
		Self { credential }
	}
}
impl PreSendHook for FunctionKeyHook {
	fn before_send<'a>(&'a self, request: &'a mut PendingRequest) -> HookFuture<'a> {
		observed(CredentialKind::FunctionKey, "function_key_hook", async move {
			request
				.set_header(HeaderName::from_static(FUNCTIONS_KEY), self.credential.key.expose())
		})
	}
}

fn observed<'a, F>(kind: CredentialKind, stage: &'static str, acquisition: F) -> HookFuture<'a>
where
	F: 'a + Send + Future<Output = Result<()>>,
{
	let span = AcquisitionSpan::new(kind, stage);

	obs::record_acquisition(kind, AcquisitionOutcome::Attempt);

	Box::pin(span.instrument(async move {
		let result = acquisition.await;
		let outcome =
			if result.is_ok() { AcquisitionOutcome::Success } else { AcquisitionOutcome::Failure };

		obs::record_acquisition(kind, outcome);

		result
	}))
}
