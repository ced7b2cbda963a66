//! Scope sets requested from identity providers.

// std
use std::{cmp::Ordering, collections::BTreeSet, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Suffix appended to a resource origin to request every statically granted permission.
pub const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated, sorted set of scopes with a lazily cached fingerprint.
///
/// The fingerprint is the unpadded base64 SHA-256 digest of the space-joined scopes; the
/// token cache partitions records by it, and [`Hash`] reuses it.
#[derive(Clone, Default)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)?, fingerprint: OnceLock::new() })
	}

	/// Creates a set holding exactly one scope.
	pub fn single(scope: impl Into<String>) -> Result<Self, ScopeValidationError> {
		Self::new([scope.into()])
	}

	/// Builds the `<origin>/.default` scope for a resource URL.
	///
	/// Only the origin (scheme, host, and non-default port) is kept, so
	/// `https://api.example.com/v1` yields `https://api.example.com/.default`. Returns `None`
	/// for URLs without a tuple origin (`data:`, `file:`, ...).
	pub fn default_for(resource: &Url) -> Option<Self> {
		let origin = resource.origin();

		if !origin.is_tuple() {
			return None;
		}

		Self::single(format!("{}{DEFAULT_SCOPE_SUFFIX}", origin.ascii_serialization())).ok()
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(String::as_str)
	}

	/// Space-delimited representation, as sent in a token request.
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable fingerprint of the normalized scopes.
	pub fn fingerprint(&self) -> String {
		self.fingerprint.get_or_init(|| fingerprint_of(&self.scopes)).clone()
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl PartialOrd for ScopeSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ScopeSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.scopes.cmp(&other.scopes)
	}
}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint.get_or_init(|| fingerprint_of(&self.scopes)).hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(self.iter())
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		<Vec<String>>::deserialize(deserializer)
			.and_then(|scopes| Self::new(scopes).map_err(DeError::custom))
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let unique = scopes
		.into_iter()
		.map(|scope| validate(scope.into()))
		.collect::<Result<BTreeSet<_>, _>>()?;

	Ok(unique.into_iter().collect())
}

fn validate(scope: String) -> Result<String, ScopeValidationError> {
	if scope.is_empty() {
		Err(ScopeValidationError::Empty)
	} else if scope.chars().any(char::is_whitespace) {
		Err(ScopeValidationError::ContainsWhitespace { scope })
	} else {
		Ok(scope)
	}
}

fn fingerprint_of(scopes: &[String]) -> String {
	let digest = Sha256::digest(scopes.join(" ").as_bytes());

	STANDARD_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_and_fingerprint_stably() {
		let lhs = ScopeSet::new(["https://b/.default", "https://a/.default", "https://a/.default"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new(["https://a/.default", "https://b/.default"])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(lhs.normalized(), "https://a/.default https://b/.default");
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn invalid_scopes_are_rejected() {
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new([" padded "]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert!(ScopeSet::from_str("").is_ok(), "Empty string represents an empty scope set.");
		assert!(ScopeSet::from_str("   ").is_err(), "Whitespace-only input must be rejected.");
	}

	#[test]
	fn default_scope_keeps_only_the_origin() {
		let url = Url::parse("https://api.example.com/v1").expect("Fixture URL should parse.");
		let scope = ScopeSet::default_for(&url).expect("HTTPS URLs have a tuple origin.");

		assert_eq!(scope.normalized(), "https://api.example.com/.default");

		let url = Url::parse("https://api.example.com:8443/v1/orders?x=1")
			.expect("Fixture URL should parse.");
		let scope = ScopeSet::default_for(&url).expect("HTTPS URLs have a tuple origin.");

		assert_eq!(scope.normalized(), "https://api.example.com:8443/.default");

		let url = Url::parse("data:text/plain,hello").expect("Fixture URL should parse.");

		assert!(ScopeSet::default_for(&url).is_none());
	}

	#[test]
	fn scope_set_serializes_as_sequence() {
		let scopes = ScopeSet::from_str("read write").expect("Scope string should parse.");
		let json = serde_json::to_string(&scopes).expect("Scope set should serialize.");

		assert_eq!(json, "[\"read\",\"write\"]");
		assert!(serde_json::from_str::<ScopeSet>("[\"bad scope\"]").is_err());
		assert!(scopes.contains("write"));
	}
}
