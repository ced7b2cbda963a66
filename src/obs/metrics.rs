// self
use crate::{credential::CredentialKind, obs::AcquisitionOutcome};

/// Records an acquisition outcome via the global metrics recorder (when enabled).
pub fn record_acquisition(kind: CredentialKind, outcome: AcquisitionOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"outbound_auth_acquisition_total",
			"credential" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_acquisition_without_recorder_is_harmless() {
		record_acquisition(CredentialKind::ClientSecret, AcquisitionOutcome::Failure);
	}
}
