//! Loads a registry document, then sends two requests to a destination backed by a client
//! secret. The second send reuses the cached token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use outbound_auth::{
	auth::DestinationId,
	client::{AuthenticatedClient, HandlerSet},
	config::{DispatcherConfig, RegistryConfig},
	confidential::ConfidentialClientPool,
	dispatch::AuthenticationDispatcher,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	reqwest::{Client, Method},
	resolver::MemoryResolver,
};

const REGISTRY: &str = r#"{
	"destinations": [{
		"destination": "inventory-api",
		"kind": "client_secret",
		"tenant_id": "tenant-acme",
		"client_id": "inventory-sync",
		"secret": "super-secret"
	}]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tenant-acme/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer demo-access");
			then.status(200).body("[]");
		})
		.await;
	let config = DispatcherConfig::from_json_str(&format!(
		"{{\"authority_host\":\"{}\"}}",
		server.url("/")
	))?;
	// httpmock serves a self-signed certificate.
	let http = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let pool = <ConfidentialClientPool>::with_http_client(
		config.authority()?,
		ReqwestHttpClient::with_client(http.clone()),
		ReqwestTransportErrorMapper,
	);
	let resolver = MemoryResolver::from_config(&RegistryConfig::from_json_str(REGISTRY)?)?;
	let dispatcher = AuthenticationDispatcher::new(Arc::new(resolver), Arc::new(pool));
	let client =
		AuthenticatedClient::new(http, HandlerSet::builder().with(Arc::new(dispatcher)).build());
	let inventory = DestinationId::new("inventory-api")?;
	let base = Url::parse(&server.url("/"))?;

	for _ in 0..2 {
		let request =
			client.request(&inventory, Method::GET, base.clone())?.with_path("/items");
		let response = client.send(request).await?;

		println!("Inventory answered {}.", response.status());
	}

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(2).await;

	Ok(())
}
