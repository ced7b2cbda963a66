//! Validated identifiers for destinations, tenants, clients, and end users.
//!
//! Every identifier is an [`Id`] tagged with a zero-sized kind from [`kind`]. Kinds keep a
//! tenant from being passed where a destination is expected while sharing one validation path.

// std
use std::{borrow::Borrow, marker::PhantomData, ops::Deref};
// self
use crate::_prelude::*;

/// Longest accepted identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Logical destination keying the credential registry.
pub type DestinationId = Id<kind::Destination>;
/// Directory tenant that issues confidential client tokens.
pub type TenantId = Id<kind::Tenant>;
/// Application (client) identifier known to the identity provider.
pub type ClientId = Id<kind::Client>;
/// End user a delegated token is requested for.
pub type PrincipalId = Id<kind::Principal>;

/// Tag separating one identifier family from another.
pub trait IdKind
where
	Self: 'static + Copy + Ord + Hash + Send + Sync,
{
	/// Label used in validation errors and `Debug` output.
	const LABEL: &'static str;
}

/// Kind tags for the identifier aliases.
pub mod kind {
	// self
	use super::IdKind;

	/// Tag of [`DestinationId`](super::DestinationId).
	#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
	pub struct Destination;
	impl IdKind for Destination {
		const LABEL: &'static str = "Destination";
	}

	/// Tag of [`TenantId`](super::TenantId).
	#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
	pub struct Tenant;
	impl IdKind for Tenant {
		const LABEL: &'static str = "Tenant";
	}

	/// Tag of [`ClientId`](super::ClientId).
	#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
	pub struct Client;
	impl IdKind for Client {
		const LABEL: &'static str = "Client";
	}

	/// Tag of [`PrincipalId`](super::PrincipalId).
	#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
	pub struct Principal;
	impl IdKind for Principal {
		const LABEL: &'static str = "Principal";
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// [`IdKind::LABEL`] of the rejected identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// [`IdKind::LABEL`] of the rejected identifier.
		kind: &'static str,
	},
	/// The identifier exceeded [`MAX_IDENTIFIER_LEN`].
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// [`IdKind::LABEL`] of the rejected identifier.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

/// Non-empty, whitespace-free identifier of kind `K`.
///
/// Hashes and compares like its string value, so maps keyed by `Id<K>` accept `&str` lookups.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id<K: IdKind> {
	value: String,
	marker: PhantomData<K>,
}
impl<K: IdKind> Id<K> {
	/// Validates and wraps the provided value.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		Self::try_from(value.as_ref().to_owned())
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.value
	}
}
impl<K: IdKind> TryFrom<String> for Id<K> {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		let kind = K::LABEL;

		if value.is_empty() {
			Err(IdentifierError::Empty { kind })
		} else if value.chars().any(char::is_whitespace) {
			Err(IdentifierError::ContainsWhitespace { kind })
		} else if value.len() > MAX_IDENTIFIER_LEN {
			Err(IdentifierError::TooLong { kind, max: MAX_IDENTIFIER_LEN })
		} else {
			Ok(Self { value, marker: PhantomData })
		}
	}
}
impl<K: IdKind> FromStr for Id<K> {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl<K: IdKind> From<Id<K>> for String {
	fn from(id: Id<K>) -> Self {
		id.value
	}
}
impl<K: IdKind> Deref for Id<K> {
	type Target = str;

	fn deref(&self) -> &str {
		&self.value
	}
}
impl<K: IdKind> AsRef<str> for Id<K> {
	fn as_ref(&self) -> &str {
		&self.value
	}
}
impl<K: IdKind> Borrow<str> for Id<K> {
	fn borrow(&self) -> &str {
		&self.value
	}
}
impl<K: IdKind> Debug for Id<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}({})", K::LABEL, self.value)
	}
}
impl<K: IdKind> Display for Id<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_padding_and_empty_values() {
		assert!(DestinationId::new(" billing-api").is_err(), "Leading whitespace is rejected.");
		assert!(DestinationId::new("billing-api ").is_err(), "Trailing whitespace is rejected.");
		assert_eq!(TenantId::new(""), Err(IdentifierError::Empty { kind: "Tenant" }));
		assert_eq!(
			ClientId::new("with space"),
			Err(IdentifierError::ContainsWhitespace { kind: "Client" })
		);

		let destination =
			DestinationId::new("billing-api").expect("Destination fixture should be valid.");

		assert_eq!(destination.as_str(), "billing-api");
		assert_eq!(format!("{destination:?}"), "Destination(billing-api)");
		assert_eq!("billing-api".parse::<DestinationId>(), Ok(destination));
	}

	#[test]
	fn serde_enforces_validation() {
		let tenant: TenantId =
			serde_json::from_str("\"contoso\"").expect("Tenant should deserialize successfully.");

		assert_eq!(tenant.as_ref(), "contoso");
		assert!(serde_json::from_str::<TenantId>("\"con toso\"").is_err());
		assert_eq!(
			serde_json::to_string(&tenant).expect("Tenant should serialize."),
			"\"contoso\""
		);
	}

	#[test]
	fn length_limit_is_inclusive() {
		PrincipalId::new("a".repeat(MAX_IDENTIFIER_LEN)).expect("Exact length should succeed.");

		let err = PrincipalId::new("a".repeat(MAX_IDENTIFIER_LEN + 1))
			.expect_err("Overlong ids must fail.");

		assert_eq!(err, IdentifierError::TooLong { kind: "Principal", max: MAX_IDENTIFIER_LEN });
	}

	#[test]
	fn borrow_supports_str_lookup() {
		let map: HashMap<DestinationId, u8> = HashMap::from_iter([(
			DestinationId::new("orders").expect("Destination used for lookup should be valid."),
			3_u8,
		)]);

		assert_eq!(map.get("orders"), Some(&3));
	}
}
