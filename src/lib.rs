//! Per-destination authentication for outbound HTTP requests: resolve the credential
//! registered for a logical destination, then attach a freshly acquired token to the
//! request right before it leaves the process.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod confidential;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod request;
pub mod resolver;

#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		confidential::{Authority, ConfidentialClientPool},
		dispatch::AuthenticationDispatcher,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		resolver::MemoryResolver,
	};

	/// Dispatcher type alias used by integration tests.
	pub type TestDispatcher = AuthenticationDispatcher<MemoryResolver>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds an authority whose token endpoints live on the provided (mock) host.
	pub fn test_authority(host: &str) -> Authority {
		Authority::builder(Url::parse(host).expect("Mock authority host should parse."))
			.build()
			.expect("Mock authority should build successfully.")
	}

	/// Constructs a dispatcher backed by a shared in-memory resolver and a confidential client
	/// pool that talks to `authority` through the insecure test transport.
	pub fn build_test_dispatcher(authority: Authority) -> (TestDispatcher, Arc<MemoryResolver>) {
		let resolver = Arc::new(MemoryResolver::default());
		let pool = <ConfidentialClientPool>::with_http_client(
			authority,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		);
		let dispatcher = AuthenticationDispatcher::new(resolver.clone(), Arc::new(pool));

		(dispatcher, resolver)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError, Method,
		header::{HeaderMap, HeaderName, HeaderValue},
	};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
