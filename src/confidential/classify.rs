//! Classification of token endpoint failures into the crate's error taxonomy.

// self
use crate::_prelude::*;

/// Decides which error a failed token request turns into.
///
/// Implementations only see crate-owned data, never transport types, so custom
/// authorities (sovereign clouds, test doubles, B2C tenants) can reclassify quirky
/// responses without depending on reqwest.
pub trait ErrorClassifier
where
	Self: Send + Sync,
{
	/// Maps a failed token request into a category.
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind;
}

/// Categories a failed token request can fall into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// The authority rejected the grant.
	InvalidGrant,
	/// Client authentication failed (wrong or expired secret, unknown client).
	InvalidClient,
	/// The requested scope is invalid or not granted to the client.
	InsufficientScope,
	/// The failure is temporary.
	Transient,
}

/// Primitive facts about a failed token request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code, when a response arrived.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Whether the failure came from the network layer.
	pub network_error: bool,
}
impl TokenErrorContext {
	/// Context for a transport-level failure.
	pub fn network_failure() -> Self {
		Self { network_error: true, ..Self::default() }
	}

	/// Adds the HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}
}

/// RFC 6749 driven classifier that also understands the `AADSTS` codes Microsoft identity
/// platform embeds in its descriptions.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorClassifier;
impl ErrorClassifier for DefaultErrorClassifier {
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		if ctx.network_error {
			return TokenErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(by_code)
			.or_else(|| ctx.error_description.as_deref().and_then(by_description))
			.unwrap_or_else(|| by_status(ctx.http_status))
	}
}

fn by_code(code: &str) -> Option<TokenErrorKind> {
	match code.to_ascii_lowercase().as_str() {
		"invalid_grant" | "access_denied" | "unsupported_grant_type" =>
			Some(TokenErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(TokenErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(TokenErrorKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" | "slow_down" => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn by_description(description: &str) -> Option<TokenErrorKind> {
	let lowered = description.to_ascii_lowercase();

	// AADSTS7000215: invalid secret, AADSTS7000222: expired secret,
	// AADSTS700016: unknown application.
	if ["aadsts7000215", "aadsts7000222", "aadsts700016", "invalid_client"]
		.iter()
		.any(|needle| lowered.contains(needle))
	{
		return Some(TokenErrorKind::InvalidClient);
	}
	if lowered.contains("aadsts70011") || lowered.contains("invalid_scope") {
		return Some(TokenErrorKind::InsufficientScope);
	}
	if lowered.contains("invalid_grant") {
		return Some(TokenErrorKind::InvalidGrant);
	}
	if lowered.contains("temporarily_unavailable") || lowered.contains("retry") {
		return Some(TokenErrorKind::Transient);
	}

	None
}

fn by_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400 | 404 | 410) => TokenErrorKind::InvalidGrant,
		Some(401) => TokenErrorKind::InvalidClient,
		Some(403) => TokenErrorKind::InsufficientScope,
		_ => TokenErrorKind::Transient,
	}
}
