//! Credential registry boundary and the built-in in-memory registry.

pub mod memory;

pub use memory::MemoryResolver;

// self
use crate::{auth::DestinationId, credential::CredentialDescriptor};

/// Looks up the credentials registered for a destination.
///
/// Called once per dispatch. An empty result means the destination is unauthenticated;
/// more than one entry is ambiguous and handled according to the dispatcher's
/// [`AmbiguityPolicy`](crate::config::AmbiguityPolicy). Order is significant.
pub trait CredentialResolver
where
	Self: Send + Sync,
{
	/// Returns every descriptor registered for `destination`, in registration order.
	fn lookup(&self, destination: &DestinationId) -> Vec<CredentialDescriptor>;
}
