//! Identity authority descriptor: where client-credentials tokens come from.

// self
use crate::{_prelude::*, auth::TenantId, error::ConfigError};

/// Default Microsoft identity platform host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

const TENANT_PLACEHOLDER: &str = "{tenant}";
const DEFAULT_TOKEN_PATH: &str = "{tenant}/oauth2/v2.0/token";

/// Validation failures raised while building an [`Authority`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityError {
	/// Authority hosts must use HTTPS.
	#[error("Authority host `{url}` must use https.")]
	InsecureHost {
		/// Offending host.
		url: String,
	},
	/// The authority host cannot carry a path (`data:`, `mailto:`, ...).
	#[error("Authority host `{url}` cannot be used as a base URL.")]
	CannotBeBase {
		/// Offending host.
		url: String,
	},
	/// Token path template does not reference the tenant.
	#[error("Token path `{path}` must contain the `{{tenant}}` placeholder.")]
	MissingTenantPlaceholder {
		/// Offending template.
		path: String,
	},
}

/// How the confidential client authenticates at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic authentication with client id and secret.
	ClientSecretBasic,
	/// `client_id` and `client_secret` in the form body.
	#[default]
	ClientSecretPost,
}

/// Identity authority issuing client-credentials tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authority {
	host: String,
	token_path: String,
	client_auth_method: ClientAuthMethod,
}
impl Authority {
	/// Starts building an authority rooted at `host`.
	pub fn builder(host: Url) -> AuthorityBuilder {
		AuthorityBuilder {
			host,
			token_path: DEFAULT_TOKEN_PATH.into(),
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Authority host, without a trailing slash.
	pub fn host(&self) -> &str {
		&self.host
	}

	/// Client authentication method.
	pub fn client_auth_method(&self) -> ClientAuthMethod {
		self.client_auth_method
	}

	/// Token endpoint for `tenant`.
	pub fn token_endpoint(&self, tenant: &TenantId) -> Result<Url> {
		let path = self.token_path.replace(TENANT_PLACEHOLDER, tenant.as_str());

		Url::parse(&format!("{}/{path}", self.host))
			.map_err(|source| ConfigError::InvalidAuthority { source }.into())
	}
}
impl Default for Authority {
	fn default() -> Self {
		Self {
			host: DEFAULT_AUTHORITY_HOST.into(),
			token_path: DEFAULT_TOKEN_PATH.into(),
			client_auth_method: ClientAuthMethod::default(),
		}
	}
}

/// Builder for [`Authority`].
#[derive(Clone, Debug)]
pub struct AuthorityBuilder {
	host: Url,
	token_path: String,
	client_auth_method: ClientAuthMethod,
}
impl AuthorityBuilder {
	/// Overrides the token path template; `{tenant}` is replaced per request.
	pub fn token_path(mut self, template: impl Into<String>) -> Self {
		self.token_path = template.into();

		self
	}

	/// Sets the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Validates and builds the authority.
	pub fn build(self) -> Result<Authority, AuthorityError> {
		if self.host.scheme() != "https" {
			return Err(AuthorityError::InsecureHost { url: self.host.to_string() });
		}
		if self.host.cannot_be_a_base() {
			return Err(AuthorityError::CannotBeBase { url: self.host.to_string() });
		}
		if !self.token_path.contains(TENANT_PLACEHOLDER) {
			return Err(AuthorityError::MissingTenantPlaceholder { path: self.token_path });
		}

		Ok(Authority {
			host: self.host.as_str().trim_end_matches('/').to_owned(),
			token_path: self.token_path.trim_start_matches('/').to_owned(),
			client_auth_method: self.client_auth_method,
		})
	}
}
