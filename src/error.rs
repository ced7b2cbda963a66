//! Error types shared by the dispatcher, the confidential client, and the send path.

// self
use crate::{_prelude::*, credential::CredentialKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error emitted by external token providers and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token cache failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::confidential::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary identity provider failure; the send may be retried by the caller.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The registry holds a credential kind this dispatcher cannot handle.
	#[error("Unhandled credential kind `{kind}` registered for destination `{destination}`.")]
	UnsupportedCredentialKind {
		/// Destination whose credential was rejected.
		destination: String,
		/// Kind label reported by the registry.
		kind: String,
	},
	/// More than one credential resolved for a destination while ambiguity is rejected.
	#[error("Destination `{destination}` resolved {count} credentials; expected at most one.")]
	AmbiguousCredential {
		/// Destination that resolved to several credentials.
		destination: String,
		/// Number of credentials returned by the resolver.
		count: usize,
	},
	/// An external token provider failed to produce a token.
	#[error("Failed to acquire a {kind} token.")]
	TokenAcquisition {
		/// Credential kind whose provider failed.
		kind: CredentialKind,
		/// Provider-specific failure.
		#[source]
		source: BoxError,
	},

	/// Requested scopes exceed what the client may obtain.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Identity provider supplied reason string.
		reason: String,
	},
	/// Identity provider rejected the grant.
	#[error("Identity provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Identity provider supplied reason string.
		reason: String,
	},
	/// Client authentication failed (unknown client, expired secret, ...).
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Identity provider supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Wraps an external provider failure for the given credential kind.
	pub fn token_acquisition(kind: CredentialKind, src: impl Into<BoxError>) -> Self {
		Self::TokenAcquisition { kind, source: src.into() }
	}

	/// Returns `true` when the failure happened while talking to an identity provider, as
	/// opposed to a configuration problem detected locally.
	pub fn is_acquisition_failure(&self) -> bool {
		matches!(
			self,
			Self::Transient(_)
				| Self::Transport(_)
				| Self::TokenAcquisition { .. }
				| Self::InsufficientScope { .. }
				| Self::InvalidGrant { .. }
				| Self::InvalidClient { .. }
		)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Authority host or token endpoint is not a valid URL.
	#[error("Authority contains an invalid URL.")]
	InvalidAuthority {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Authority settings failed validation.
	#[error(transparent)]
	Authority(#[from] crate::confidential::AuthorityError),
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidRequestPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL has no origin to derive a default scope from.
	#[error("Cannot derive a default scope from base URL `{url}`.")]
	OpaqueBaseUrl {
		/// Offending base URL.
		url: String,
	},
	/// A header value produced by a credential is not a valid HTTP header value.
	#[error("Header `{name}` received an invalid value.")]
	InvalidHeaderValue {
		/// Header being written.
		name: String,
		/// Underlying validation failure.
		#[source]
		source: reqwest::header::InvalidHeaderValue,
	},
	/// Identifier validation failed.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	Malformed {
		/// Field path at which parsing failed.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// A registry entry lacks a field its credential kind requires.
	#[error("Registry entry is missing `{path}`.")]
	MissingRegistryField {
		/// Field path, such as `destinations[0].secret`.
		path: String,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Malformed { path: e.path().to_string(), source: e.into_inner() }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unsupported_kind_names_destination_and_kind() {
		let err = Error::UnsupportedCredentialKind {
			destination: "billing-api".into(),
			kind: "certificate".into(),
		};

		assert_eq!(
			err.to_string(),
			"Unhandled credential kind `certificate` registered for destination `billing-api`."
		);
		assert!(!err.is_acquisition_failure());
	}

	#[test]
	fn provider_failures_keep_their_source() {
		let err = Error::token_acquisition(
			CredentialKind::ServiceToken,
			std::io::Error::other("metadata endpoint unreachable"),
		);
		let source = StdError::source(&err).expect("Provider failure should be the source.");

		assert!(err.is_acquisition_failure());
		assert_eq!(err.to_string(), "Failed to acquire a service_token token.");
		assert_eq!(source.to_string(), "metadata endpoint unreachable");
	}

	#[test]
	fn malformed_config_reports_field_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Probe {
			window: u32,
		}

		let mut de = serde_json::Deserializer::from_str("{\"window\":\"soon\"}");
		let err = serde_path_to_error::deserialize::<_, Probe>(&mut de)
			.expect_err("String value must not parse as an integer.");
		let config = ConfigError::from(err);

		assert!(matches!(&config, ConfigError::Malformed { path, .. } if path == "window"));
	}
}
