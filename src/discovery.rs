//! Carrier discovery: resolving a subscriber's OAuth endpoints from MCC/MNC.
//!
//! [`DiscoveryEngine::discover`] checks the shared TTL cache first, then calls
//! the discovery endpoint. A transport failure with any cached entry (even an
//! expired one) silently reuses the cache; this is the system's sole automatic
//! fallback. A 2xx payload carrying the discover-ui marker surfaces as
//! [`DiscoveryError::ProviderNotFound`] so the orchestrator can detour through
//! the carrier-hosted page.

pub mod cache;
pub mod config;

mod metrics;

pub use cache::ConfigurationCache;
pub use config::{Branding, DiscoveryOutcome, OpenIdConfiguration};
pub use metrics::DiscoveryMetrics;

// self
use crate::{
	_prelude::*,
	carrier::MccMnc,
	discovery::config::RawDiscoveryPayload,
	http::{DiscoveryHttpClient, HttpBody, HttpTimeouts},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestDiscoveryClient;

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
const ASSET_LINKS_PATH: &str = "/.well-known/assetlinks.json";

#[cfg(feature = "reqwest")]
/// Discovery engine specialized for the crate's default reqwest transport.
pub type ReqwestDiscoveryEngine = DiscoveryEngine<ReqwestDiscoveryClient>;

/// Resolves carrier OpenID configurations through the discovery endpoint.
///
/// The engine owns the HTTP client, the shared configuration cache, and the
/// per-carrier singleflight guards so concurrent attempts resolving the same
/// carrier collapse into one network call.
#[derive(Clone)]
pub struct DiscoveryEngine<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	/// HTTP client used for every outbound discovery request.
	pub http_client: Arc<C>,
	/// Shared carrier-keyed configuration cache.
	pub cache: Arc<ConfigurationCache>,
	/// Discovery endpoint queried with `(mccmnc?, prompt?)`.
	pub endpoint: Url,
	/// OAuth 2.0 client identifier sent with each discovery call.
	pub client_id: String,
	/// Connect + read deadlines applied per call.
	pub timeouts: HttpTimeouts,
	/// Shared counters for discovery outcomes.
	pub metrics: Arc<DiscoveryMetrics>,
	carrier_guards: Arc<Mutex<HashMap<MccMnc, Arc<AsyncMutex<()>>>>>,
}
impl<C> DiscoveryEngine<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	/// Creates an engine that reuses the caller-provided transport.
	pub fn with_http_client(
		http_client: impl Into<Arc<C>>,
		cache: Arc<ConfigurationCache>,
		endpoint: Url,
		client_id: impl Into<String>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			cache,
			endpoint,
			client_id: client_id.into(),
			timeouts: HttpTimeouts::default(),
			metrics: Default::default(),
			carrier_guards: Default::default(),
		}
	}

	/// Overrides the per-call deadlines.
	pub fn with_timeouts(mut self, timeouts: HttpTimeouts) -> Self {
		self.timeouts = timeouts;

		self
	}

	/// Resolves the OpenID configuration for a carrier.
	///
	/// `prompt_user_not_found` marks the retry issued after an authorization
	/// redirect reported `user_not_found`; the provider is expected to answer
	/// it with a discover-ui detour, never a configuration. The retry always
	/// reaches the network: it neither reads the cache nor takes the stale
	/// fallback on transport failure.
	pub async fn discover(
		&self,
		mcc_mnc: Option<&MccMnc>,
		prompt_user_not_found: bool,
	) -> Result<OpenIdConfiguration, DiscoveryError> {
		const KIND: FlowKind = FlowKind::Discovery;

		let span = FlowSpan::new(KIND, "discover");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_attempt();

				let _singleflight = match mcc_mnc {
					Some(key) => Some(self.carrier_guard(key).lock_arc().await),
					None => None,
				};
				let now = OffsetDateTime::now_utc();

				// prompt=true is a forced refresh; it must reach the network.
				if !prompt_user_not_found
					&& let Some(key) = mcc_mnc
					&& let Some(config) = self.cache.fresh(key, now)
				{
					self.metrics.record_cache_hit();

					return Ok(config);
				}

				let url = self.discovery_url(mcc_mnc, prompt_user_not_found);
				let response = match self.http_client.get(url, self.timeouts).await {
					Ok(response) => response,
					Err(transport) => {
						// Sole automatic fallback: any cached entry, even
						// expired. A prompt=true retry must not take it; a
						// configuration answer there reads as a provider
						// fault, not the network failure it was.
						if !prompt_user_not_found
							&& let Some(key) = mcc_mnc
							&& let Some(config) = self.cache.stale(key)
						{
							self.metrics.record_stale_fallback();

							return Ok(config);
						}

						return Err(transport.into());
					},
				};

				self.interpret_response(mcc_mnc, response, now, prompt_user_not_found)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Legacy variant that additionally fetches the digital-asset-links
	/// manifest naming which native packages may claim the redirect scheme.
	///
	/// The manifest fetch is independent of the discovery outcome: a resolved
	/// configuration with an unreachable manifest still fails, with
	/// [`DiscoveryError::AssetsNotFound`].
	pub async fn discover_with_assets(
		&self,
		mcc_mnc: Option<&MccMnc>,
		prompt_user_not_found: bool,
	) -> Result<OpenIdConfiguration, DiscoveryError> {
		let config = self.discover(mcc_mnc, prompt_user_not_found).await?;

		self.fetch_asset_links(&config).await?;

		Ok(config)
	}

	async fn fetch_asset_links(&self, config: &OpenIdConfiguration) -> Result<(), DiscoveryError> {
		let url = config.issuer.join(ASSET_LINKS_PATH).map_err(|err| {
			DiscoveryError::AssetsNotFound { reason: err.to_string() }
		})?;
		let response = self.http_client.get(url, self.timeouts).await.map_err(|err| {
			DiscoveryError::AssetsNotFound { reason: err.to_string() }
		})?;

		if !response.is_success() {
			return Err(DiscoveryError::AssetsNotFound {
				reason: format!("manifest endpoint returned HTTP {}", response.status),
			});
		}

		Ok(())
	}

	fn discovery_url(&self, mcc_mnc: Option<&MccMnc>, prompt_user_not_found: bool) -> Url {
		let mut url = self.endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("client_id", &self.client_id);
			pairs.append_pair("sdk_version", SDK_VERSION);

			if let Some(mcc_mnc) = mcc_mnc {
				pairs.append_pair("mccmnc", mcc_mnc);
			}
			if prompt_user_not_found {
				pairs.append_pair("prompt", "true");
			}
		}

		url
	}

	fn interpret_response(
		&self,
		mcc_mnc: Option<&MccMnc>,
		response: HttpBody,
		received_at: OffsetDateTime,
		prompt_user_not_found: bool,
	) -> Result<OpenIdConfiguration, DiscoveryError> {
		if response.status == 404 {
			// Unknown carrier; the body may still carry the discover-ui target.
			let discover_ui_endpoint = RawDiscoveryPayload::parse(&response.body)
				.ok()
				.and_then(|payload| payload.discover_ui_endpoint());

			return Err(DiscoveryError::ProviderNotFound { discover_ui_endpoint });
		}
		if !response.is_success() {
			return Err(DiscoveryError::Http { status: response.status, body: response.body });
		}

		let payload = RawDiscoveryPayload::parse(&response.body).map_err(|source| {
			DiscoveryError::Parse { source, status: Some(response.status) }
		})?;

		match payload.interpret(received_at)? {
			DiscoveryOutcome::DiscoverUiRequired { endpoint } =>
				Err(DiscoveryError::ProviderNotFound { discover_ui_endpoint: endpoint }),
			DiscoveryOutcome::Configuration(config) => {
				// Effective key: caller-supplied identifier, else the one the
				// provider embedded in the payload. A prompt=true answer is
				// never cached; the orchestrator rejects it outright.
				let key = mcc_mnc.cloned().or_else(|| config.mcc_mnc.clone());

				if let Some(key) = key
					&& !prompt_user_not_found
				{
					self.cache.put(key, (*config).clone());
				}

				Ok(*config)
			},
		}
	}

	fn carrier_guard(&self, key: &MccMnc) -> Arc<AsyncMutex<()>> {
		let mut guards = self.carrier_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl DiscoveryEngine<ReqwestDiscoveryClient> {
	/// Creates an engine with the crate's default reqwest transport.
	pub fn new(
		cache: Arc<ConfigurationCache>,
		endpoint: Url,
		client_id: impl Into<String>,
	) -> Self {
		Self::with_http_client(ReqwestDiscoveryClient::default(), cache, endpoint, client_id)
	}
}
impl<C> Debug for DiscoveryEngine<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiscoveryEngine")
			.field("endpoint", &self.endpoint)
			.field("client_id", &self.client_id)
			.field("timeouts", &self.timeouts)
			.finish()
	}
}
