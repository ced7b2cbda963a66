// self
use crate::{_prelude::*, auth::DestinationId, credential::CredentialKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAcquisition<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAcquisition<F> = F;

/// Span wrapping one credential acquisition.
#[derive(Clone, Debug)]
pub struct AcquisitionSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AcquisitionSpan {
	/// Creates a span tagged with the credential kind and stage.
	pub fn new(kind: CredentialKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("outbound_auth.acquire", credential = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> AcquisitionSpanGuard {
		#[cfg(feature = "tracing")]
		{
			AcquisitionSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			AcquisitionSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAcquisition<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`AcquisitionSpan::entered`].
pub struct AcquisitionSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for AcquisitionSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AcquisitionSpanGuard(..)")
	}
}

/// Logs that a destination resolved to no credential.
pub fn log_unauthenticated(destination: &DestinationId) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			destination = destination.as_str(),
			"No credential registered; sending without authentication."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = destination;
	}
}

/// Warns that a destination resolved to several credentials and names the one in use.
pub fn log_ambiguous(destination: &DestinationId, count: usize, selected: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			destination = destination.as_str(),
			count,
			selected,
			"Destination resolved to several credentials; using the first one."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (destination, count, selected);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn acquisition_span_guard_exists_with_or_without_tracing() {
		let _guard = AcquisitionSpan::new(CredentialKind::FunctionKey, "test").entered();
	}

	#[test]
	fn log_helpers_accept_destinations() {
		let destination =
			DestinationId::new("billing-api").expect("Destination fixture should be valid.");

		log_unauthenticated(&destination);
		log_ambiguous(&destination, 2, "client_secret");
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = AcquisitionSpan::new(CredentialKind::ServiceToken, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
