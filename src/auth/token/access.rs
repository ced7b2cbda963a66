//! Access tokens returned by every acquisition strategy.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Bearer token plus its optional expiry, as returned by an identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Token value placed after `Bearer ` in the `Authorization` header.
	pub secret: TokenSecret,
	/// Expiry instant, when the provider reports one.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Wraps a token value without expiry information.
	pub fn new(secret: impl Into<TokenSecret>) -> Self {
		Self { secret: secret.into(), expires_at: None }
	}

	/// Attaches an expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Formats the `Authorization` header value (`Bearer <token>`).
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn bearer_value_and_debug_output() {
		let token = AccessToken::new("abc.def.ghi")
			.with_expires_at(macros::datetime!(2026-01-01 00:00 UTC));

		assert_eq!(token.bearer(), "Bearer abc.def.ghi");
		assert!(!format!("{token:?}").contains("abc.def.ghi"));
	}
}
