#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use carrier_auth_broker::{
	_preludet::*,
	carrier::MccMnc,
	error::DiscoveryError,
};

const CLIENT_ID: &str = "client-it";

fn carrier() -> MccMnc {
	MccMnc::new("310260").expect("Carrier identifier should be valid for discovery tests.")
}

fn discovery_endpoint(server: &MockServer) -> Url {
	Url::parse(&server.url("/discovery")).expect("Mock discovery endpoint should parse.")
}

fn configuration_body(issuer: &str) -> String {
	format!(
		"{{\"issuer\":\"{issuer}\",\"authorization_endpoint\":\"{issuer}/authorize\",\
		\"mccmnc\":\"310260\",\"branding\":{{\"carrier_text\":\"Carrier\"}},\
		\"allowed_agent_signatures\":[\"ab:cd\"]}}"
	)
}

#[tokio::test]
async fn discover_resolves_and_caches_the_configuration() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/discovery")
				.query_param("client_id", CLIENT_ID)
				.query_param("mccmnc", "310260");
			then.status(200)
				.header("content-type", "application/json")
				.body(configuration_body("https://idp.carrier.example"));
		})
		.await;
	let config = engine
		.discover(Some(&carrier()), false)
		.await
		.expect("Discovery should resolve the configuration.");

	assert_eq!(config.issuer.as_str(), "https://idp.carrier.example/");
	assert_eq!(
		config.authorization_endpoint.as_str(),
		"https://idp.carrier.example/authorize"
	);
	assert_eq!(config.mcc_mnc.as_deref(), Some("310260"));
	assert_eq!(config.branding.carrier_text, "Carrier");
	assert_eq!(config.allowed_agent_signatures, ["ab:cd"]);

	let cached = engine
		.discover(Some(&carrier()), false)
		.await
		.expect("Second discovery should resolve from the cache.");

	assert_eq!(cached, config);
	assert_eq!(mock.hits_async().await, 1, "The cached call must not reach the network.");
	assert_eq!(engine.metrics.attempts(), 2);
	assert_eq!(engine.metrics.cache_hits(), 1);
}

#[tokio::test]
async fn keyless_discover_caches_under_the_payload_carrier() {
	let server = MockServer::start_async().await;
	let (engine, cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery").query_param_missing("mccmnc");
			then.status(200)
				.header("content-type", "application/json")
				.body(configuration_body("https://idp.carrier.example"));
		})
		.await;
	let config = engine
		.discover(None, false)
		.await
		.expect("A keyless discovery should resolve server-side.");

	assert_eq!(config.mcc_mnc.as_deref(), Some("310260"));
	assert!(
		cache.contains(&carrier()),
		"The configuration must be cached under the payload's carrier."
	);

	let cached = engine
		.discover(Some(&carrier()), false)
		.await
		.expect("A keyed discovery should now resolve from the cache.");

	assert_eq!(cached, config);
	assert_eq!(mock.hits_async().await, 1, "The keyed call must not reach the network.");
	assert_eq!(engine.metrics.cache_hits(), 1);
}

#[tokio::test]
async fn prompt_discover_bypasses_a_fresh_cache_entry() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _plain = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery").query_param_missing("prompt");
			then.status(200)
				.header("content-type", "application/json")
				.body(configuration_body("https://idp.carrier.example"));
		})
		.await;
	let prompted = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery").query_param("prompt", "true");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"error\":\"user_not_found\",\"redirect_uri\":\"https://discoverui.example/start\"}");
		})
		.await;

	engine
		.discover(Some(&carrier()), false)
		.await
		.expect("Priming discovery should resolve and cache.");

	let err = engine
		.discover(Some(&carrier()), true)
		.await
		.expect_err("A prompt=true discovery should surface the detour.");

	assert!(matches!(
		err,
		DiscoveryError::ProviderNotFound { discover_ui_endpoint: Some(ref url) }
			if url.as_str() == "https://discoverui.example/start"
	));

	prompted.assert_async().await;
}

#[tokio::test]
async fn discover_ui_marker_surfaces_as_provider_not_found() {
	let server = MockServer::start_async().await;
	let (engine, cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"error\":\"user_not_found\",\"redirect_uri\":\"https://discoverui.example/start\"}");
		})
		.await;
	let err = engine
		.discover(Some(&carrier()), false)
		.await
		.expect_err("Marker payload should not resolve.");

	assert!(matches!(
		err,
		DiscoveryError::ProviderNotFound { discover_ui_endpoint: Some(ref url) }
			if url.as_str() == "https://discoverui.example/start"
	));
	assert!(!cache.contains(&carrier()), "Marker payloads must never be cached.");
}

#[tokio::test]
async fn not_found_carries_the_discover_ui_endpoint_from_the_body() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(404)
				.header("content-type", "application/json")
				.body("{\"redirect_uri\":\"https://discoverui.example/start\"}");
		})
		.await;
	let err = engine
		.discover(Some(&carrier()), false)
		.await
		.expect_err("A 404 should not resolve.");

	assert!(matches!(
		err,
		DiscoveryError::ProviderNotFound { discover_ui_endpoint: Some(ref url) }
			if url.as_str() == "https://discoverui.example/start"
	));
}

#[tokio::test]
async fn provider_errors_surface_status_and_body() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(503)
				.header("content-type", "application/json")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;
	let err = engine
		.discover(Some(&carrier()), false)
		.await
		.expect_err("A 503 should not resolve.");

	assert!(matches!(
		err,
		DiscoveryError::Http { status: 503, ref body }
			if body.contains("temporarily_unavailable")
	));
	assert_eq!(engine.metrics.failures(), 1);
}

#[tokio::test]
async fn malformed_payload_surfaces_as_parse_error() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(200).header("content-type", "application/json").body("not json");
		})
		.await;
	let err = engine
		.discover(Some(&carrier()), false)
		.await
		.expect_err("Malformed JSON should not resolve.");

	assert!(matches!(err, DiscoveryError::Parse { status: Some(200), .. }));
}

#[tokio::test]
async fn transport_failure_falls_back_to_an_expired_cache_entry() {
	let endpoint =
		Url::parse("http://127.0.0.1:9/discovery").expect("Unreachable endpoint should parse.");
	let (engine, cache) = build_reqwest_test_engine(endpoint, CLIENT_ID);
	let expired =
		test_configuration(Some(carrier()), OffsetDateTime::now_utc() - Duration::minutes(20));

	cache.put(carrier(), expired.clone());

	let config = engine
		.discover(Some(&carrier()), false)
		.await
		.expect("An expired entry should absorb the transport failure.");

	assert_eq!(config, expired);
	assert_eq!(engine.metrics.stale_fallbacks(), 1);
}

#[tokio::test]
async fn prompt_discover_never_takes_the_stale_fallback() {
	let endpoint =
		Url::parse("http://127.0.0.1:9/discovery").expect("Unreachable endpoint should parse.");
	let (engine, cache) = build_reqwest_test_engine(endpoint, CLIENT_ID);

	cache.put(carrier(), test_configuration(Some(carrier()), OffsetDateTime::now_utc()));

	let err = engine
		.discover(Some(&carrier()), true)
		.await
		.expect_err("A prompt=true retry must surface the transport failure.");

	assert!(matches!(err, DiscoveryError::Transport(_)));
	assert_eq!(engine.metrics.stale_fallbacks(), 0);
}

#[tokio::test]
async fn transport_failure_without_cache_surfaces_the_error() {
	let endpoint =
		Url::parse("http://127.0.0.1:9/discovery").expect("Unreachable endpoint should parse.");
	let (engine, _cache) = build_reqwest_test_engine(endpoint, CLIENT_ID);
	let err = engine
		.discover(Some(&carrier()), false)
		.await
		.expect_err("With no cached entry the transport failure must surface.");

	assert!(matches!(err, DiscoveryError::Transport(_)));
	assert_eq!(engine.metrics.failures(), 1);
}

#[tokio::test]
async fn discover_with_assets_requires_a_reachable_manifest() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _discovery = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(200)
				.header("content-type", "application/json")
				.body(configuration_body(server.base_url().trim_end_matches('/')));
		})
		.await;
	let manifest = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/assetlinks.json");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"relation\":[\"delegate_permission/common.handle_all_urls\"]}]");
		})
		.await;
	let config = engine
		.discover_with_assets(Some(&carrier()), false)
		.await
		.expect("Discovery with a reachable manifest should resolve.");

	assert_eq!(config.mcc_mnc.as_deref(), Some("310260"));

	manifest.assert_async().await;
}

#[tokio::test]
async fn discover_with_assets_fails_when_the_manifest_is_missing() {
	let server = MockServer::start_async().await;
	let (engine, _cache) = build_reqwest_test_engine(discovery_endpoint(&server), CLIENT_ID);
	let _discovery = server
		.mock_async(|when, then| {
			when.method(GET).path("/discovery");
			then.status(200)
				.header("content-type", "application/json")
				.body(configuration_body(server.base_url().trim_end_matches('/')));
		})
		.await;
	let _manifest = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/assetlinks.json");
			then.status(404);
		})
		.await;
	let err = engine
		.discover_with_assets(Some(&carrier()), false)
		.await
		.expect_err("A missing manifest must fail the legacy variant.");

	assert!(matches!(
		err,
		DiscoveryError::AssetsNotFound { ref reason } if reason.contains("404")
	));
}
