//! JSON configuration for the dispatcher and for static credential registries.
//!
//! Both documents are parsed through `serde_path_to_error`, so a malformed value is
//! reported with the path of the field that failed (`ambiguity`, `destinations[2].kind`).

// self
use crate::{
	_prelude::*,
	auth::{ClientId, DestinationId, TenantId, TokenSecret},
	confidential::{
		Authority, ClientAuthMethod, DEFAULT_AUTHORITY_HOST, DEFAULT_PREEMPTIVE_WINDOW_SECS,
	},
	credential::{ClientSecretCredential, CredentialDescriptor, FunctionKeyCredential},
	error::ConfigError,
};

/// What the dispatcher does when a destination resolves to more than one credential.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
	/// Use the first credential in resolver order and log a warning.
	#[default]
	FirstWins,
	/// Fail the dispatch with [`Error::AmbiguousCredential`].
	Reject,
}

/// Dispatcher settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
	/// HTTPS host of the identity authority.
	pub authority_host: String,
	/// Token path template below the host; `{tenant}` is substituted per request.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_path: Option<String>,
	/// Client authentication method used at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Seconds before expiry in which cached client tokens are replaced.
	pub preemptive_window_secs: u32,
	/// Behaviour for destinations with several credentials.
	pub ambiguity: AmbiguityPolicy,
}
impl DispatcherConfig {
	/// Parses a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self> {
		from_json(json)
	}

	/// Builds the authority described by the settings.
	pub fn authority(&self) -> Result<Authority> {
		let host = Url::parse(&self.authority_host)
			.map_err(|source| ConfigError::InvalidAuthority { source })?;
		let mut builder = Authority::builder(host).client_auth_method(self.client_auth_method);

		if let Some(path) = &self.token_path {
			builder = builder.token_path(path.clone());
		}

		Ok(builder.build().map_err(ConfigError::from)?)
	}

	/// Preemptive refresh window as a duration.
	pub fn preemptive_window(&self) -> Duration {
		Duration::seconds(self.preemptive_window_secs.into())
	}
}
impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			authority_host: DEFAULT_AUTHORITY_HOST.into(),
			token_path: None,
			client_auth_method: ClientAuthMethod::default(),
			preemptive_window_secs: DEFAULT_PREEMPTIVE_WINDOW_SECS,
			ambiguity: AmbiguityPolicy::default(),
		}
	}
}

/// Static credential registry.
///
/// ```json
/// {
///   "destinations": [
///     { "destination": "orders-api", "kind": "function_key", "key": "..." },
///     {
///       "destination": "billing-api",
///       "kind": "client_secret",
///       "tenant_id": "contoso",
///       "client_id": "app-1",
///       "secret": "..."
///     }
///   ]
/// }
/// ```
///
/// Only kinds that can be described by data load into descriptors. Any other `kind` is
/// kept as [`CredentialDescriptor::Unsupported`] and fails when a request is dispatched to
/// that destination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
	/// Registered credentials, in resolution order.
	#[serde(default)]
	pub destinations: Vec<RegistryEntry>,
}
impl RegistryConfig {
	/// Parses a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self> {
		from_json(json)
	}

	/// Converts every entry into a destination and descriptor pair.
	pub fn descriptors(&self) -> Result<Vec<(DestinationId, CredentialDescriptor)>> {
		self.destinations
			.iter()
			.enumerate()
			.map(|(idx, entry)| {
				entry.descriptor(idx).map(|descriptor| (entry.destination.clone(), descriptor))
			})
			.collect()
	}
}

/// One credential registered for a destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryEntry {
	/// Destination the credential belongs to.
	pub destination: DestinationId,
	/// Credential kind label (`client_secret`, `function_key`, ...).
	pub kind: String,
	/// Tenant for `client_secret`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<TenantId>,
	/// Client id for `client_secret`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<ClientId>,
	/// Secret for `client_secret`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret: Option<TokenSecret>,
	/// Optional explicit scope for `client_secret`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Key for `function_key`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<TokenSecret>,
}
impl RegistryEntry {
	fn descriptor(&self, idx: usize) -> Result<CredentialDescriptor> {
		let descriptor = match self.kind.as_str() {
			"client_secret" => {
				let mut credential = ClientSecretCredential::new(
					required(&self.tenant_id, idx, "tenant_id")?,
					required(&self.client_id, idx, "client_id")?,
					required(&self.secret, idx, "secret")?,
				);

				credential.scope = self.scope.clone();

				credential.into()
			},
			"function_key" =>
				FunctionKeyCredential::new(required(&self.key, idx, "key")?).into(),
			other => CredentialDescriptor::Unsupported { kind: other.to_owned() },
		};

		Ok(descriptor)
	}
}

fn required<T>(value: &Option<T>, idx: usize, field: &str) -> Result<T>
where
	T: Clone,
{
	value.clone().ok_or_else(|| {
		ConfigError::MissingRegistryField { path: format!("destinations[{idx}].{field}") }.into()
	})
}

fn from_json<T>(json: &str) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	let mut de = serde_json::Deserializer::from_str(json);

	Ok(serde_path_to_error::deserialize(&mut de).map_err(ConfigError::from)?)
}
