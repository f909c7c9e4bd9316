//! Demonstrates an OAuth2-backed Jamf Pro session with the default reqwest transport: the first
//! token is minted at connect time, a sticky backend is pinned, and requests are prepared with the
//! bearer header and the affinity cookie.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
// self
use jamfpro_session::{http::ReqwestExecutor, integration::IntegrationBuilder, reqwest};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let _version_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/jamf-pro-version");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "jpro-ingress=node-a; Path=/; Secure; HttpOnly")
				.body("{\"version\":\"11.12.0\"}");
		})
		.await;
	// The mock server presents a self-signed certificate.
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let mut integration = IntegrationBuilder::new(server.base_url())
		.oauth("demo-client", "demo-secret")
		.buffer_period(Duration::seconds(30))
		.hide_sensitive_data(true)
		.affinity_timeout(Duration::milliseconds(250))
		.connect_with_executor::<ReqwestExecutor>(ReqwestExecutor::with_client(client))
		.await?;
	let url = integration.construct_url("/api/v1/jamf-pro-version")?;
	let cookies = integration.session_cookies(&url).await?;

	println!("Pinned backend: {:?}.", cookies.iter().map(|c| c.header_value()).collect::<Vec<_>>());

	let mut request = http::Request::get(url.as_str()).body(Vec::new())?;

	integration.prepare_request(&mut request).await?;

	println!("Prepared request headers: {:?}.", request.headers());

	token_mock.assert_async().await;

	Ok(())
}
