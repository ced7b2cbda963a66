//! Thread-safe in-memory [`CredentialResolver`].

// self
use crate::{
	_prelude::*,
	auth::DestinationId,
	config::RegistryConfig,
	credential::CredentialDescriptor,
	resolver::CredentialResolver,
};

type Registry = HashMap<DestinationId, Vec<CredentialDescriptor>>;

/// Registry kept in process memory; cloning shares the underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryResolver(Arc<RwLock<Registry>>);
impl MemoryResolver {
	/// Loads every entry of a static registry document.
	pub fn from_config(config: &RegistryConfig) -> Result<Self> {
		let resolver = Self::default();

		for (destination, descriptor) in config.descriptors()? {
			resolver.register(destination, descriptor);
		}

		Ok(resolver)
	}

	/// Appends a credential for `destination`.
	pub fn register(
		&self,
		destination: DestinationId,
		descriptor: impl Into<CredentialDescriptor>,
	) {
		self.0.write().entry(destination).or_default().push(descriptor.into());
	}

	/// Removes and returns every credential registered for `destination`.
	pub fn remove(&self, destination: &DestinationId) -> Vec<CredentialDescriptor> {
		self.0.write().remove(destination).unwrap_or_default()
	}

	/// Number of destinations with at least one credential.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when no destination is registered.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialResolver for MemoryResolver {
	fn lookup(&self, destination: &DestinationId) -> Vec<CredentialDescriptor> {
		self.0.read().get(destination).cloned().unwrap_or_default()
	}
}
