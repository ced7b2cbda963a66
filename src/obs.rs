//! Optional observability helpers for credential acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `outbound_auth.acquire` with the `credential` (kind)
//!   and `stage` (call site) fields, plus events for unauthenticated and ambiguous
//!   destinations.
//! - Enable `metrics` to increment the `outbound_auth_acquisition_total` counter for every
//!   attempt/success/failure, labeled by `credential` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquisitionOutcome {
	/// A hook started acquiring a credential.
	Attempt,
	/// The header was written.
	Success,
	/// The failure was propagated to the sender.
	Failure,
}
impl AcquisitionOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquisitionOutcome::Attempt => "attempt",
			AcquisitionOutcome::Success => "success",
			AcquisitionOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquisitionOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
