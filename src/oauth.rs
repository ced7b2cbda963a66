//! Client credentials exchange on top of the `oauth2` crate, plus transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TenantId, TokenSecret},
	confidential::{
		ClientAuthMethod, ErrorClassifier, TokenErrorContext, TokenErrorKind, TokenRecord,
	},
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

type TokenOnlyClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(
				format!("HTTP client error occurred while calling the token endpoint: {message}"),
				meta,
			),
			_ => transient(
				"HTTP client error occurred while calling the token endpoint".into(),
				meta,
			),
		}
	}
}

/// One client credentials exchange against a tenant's token endpoint.
pub(crate) struct ClientCredentialsExchange<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) token_endpoint: &'a Url,
	pub(crate) method: ClientAuthMethod,
	pub(crate) tenant: &'a TenantId,
	pub(crate) client_id: &'a ClientId,
	pub(crate) secret: &'a TokenSecret,
	pub(crate) http_client: &'a C,
	pub(crate) transport_mapper: &'a M,
	pub(crate) classifier: &'a dyn ErrorClassifier,
}
impl<C, M> ClientCredentialsExchange<'_, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Requests an application token for `scope` and turns the response into a cache record.
	pub(crate) async fn run(self, scope: &ScopeSet) -> Result<TokenRecord> {
		let client = self.oauth_client()?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let mut request = client.exchange_client_credentials();

		for value in scope.iter() {
			request = request.add_scope(Scope::new(value.to_owned()));
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(slot.take(), err))?;

		into_record(self.tenant, self.client_id, self.secret, scope, response)
	}

	fn oauth_client(&self) -> Result<TokenOnlyClient> {
		let token_url = TokenUrl::new(self.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidAuthority { source })?;
		let client = BasicClient::new(OAuthClientId::new(self.client_id.to_string()))
			.set_client_secret(ClientSecret::new(self.secret.expose().to_owned()))
			.set_token_uri(token_url);

		Ok(match self.method {
			ClientAuthMethod::ClientSecretBasic => client.set_auth_type(AuthType::BasicAuth),
			ClientAuthMethod::ClientSecretPost => client.set_auth_type(AuthType::RequestBody),
		})
	}

	fn map_request_error(
		&self,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let meta = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) =>
				map_server_response(self.classifier, response, meta),
			RequestTokenError::Request(error) =>
				self.transport_mapper.map_transport_error(meta, error),
			RequestTokenError::Parse(source, _body) =>
				TransientError::TokenResponseParse { source, status: meta_status(meta) }.into(),
			RequestTokenError::Other(message) => transient(message, meta),
		}
	}
}

fn into_record(
	tenant: &TenantId,
	client_id: &ClientId,
	secret: &TokenSecret,
	scope: &ScopeSet,
	response: BasicTokenResponse,
) -> Result<TokenRecord> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let issued_at = OffsetDateTime::now_utc();

	Ok(TokenRecord {
		tenant: tenant.clone(),
		client_id: client_id.clone(),
		scope: scope.clone(),
		secret_fingerprint: secret.fingerprint(),
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		issued_at,
		expires_at: issued_at + Duration::seconds(expires_in),
	})
}

fn map_server_response(
	classifier: &dyn ErrorClassifier,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_owned();
	let mut ctx = TokenErrorContext::default().with_oauth_error(code.clone());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let reason = response.error_description().cloned().unwrap_or(code);

	match classifier.classify(&ctx) {
		TokenErrorKind::InvalidGrant => Error::InvalidGrant { reason },
		TokenErrorKind::InvalidClient => Error::InvalidClient { reason },
		TokenErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		TokenErrorKind::Transient => transient(reason, meta),
	}
}

fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "request to the token endpoint timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta.and_then(|value| value.retry_after),
		}
		.into();
	}

	TransportError::from(err).into()
}

fn transient(message: String, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message,
		status: meta_status(meta),
		retry_after: meta.and_then(|value| value.retry_after),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::{StandardErrorResponse, basic::BasicErrorResponseType};
	// self
	use super::*;
	use crate::confidential::DefaultErrorClassifier;

	#[test]
	fn server_errors_follow_the_classifier() {
		let response = StandardErrorResponse::new(
			BasicErrorResponseType::InvalidClient,
			Some("AADSTS7000215: Invalid client secret provided.".into()),
			None,
		);
		let meta = ResponseMetadata { status: Some(401), retry_after: None };
		let err = map_server_response(&DefaultErrorClassifier, response, Some(&meta));

		assert!(matches!(
			err,
			Error::InvalidClient { ref reason } if reason.starts_with("AADSTS7000215")
		));
	}

	#[test]
	fn transient_errors_carry_metadata() {
		let meta = ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(5)) };
		let err = transient("busy".into(), Some(&meta));

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint {
				status: Some(503),
				retry_after: Some(retry),
				..
			}) if retry == Duration::seconds(5)
		));
	}
}
