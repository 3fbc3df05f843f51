//! Carrier-discovery OAuth 2.0/OIDC authorization broker—resolve per-subscriber identity
//! providers from MCC/MNC and drive PKCE-secured redirect flows that survive process
//! suspension.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod agent;
pub mod carrier;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod http;
pub mod obs;
pub mod request;
pub mod response;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		carrier::{CarrierIdProvider, MccMnc},
		discovery::{Branding, ConfigurationCache, DiscoveryEngine, OpenIdConfiguration, ReqwestDiscoveryEngine},
		http::ReqwestDiscoveryClient,
	};

	/// Carrier lookup fixture returning a fixed identifier.
	#[derive(Debug, Default)]
	pub struct FixedCarrier(pub Option<MccMnc>);
	impl CarrierIdProvider for FixedCarrier {
		fn current(&self) -> Option<MccMnc> {
			self.0.clone()
		}
	}

	/// Builds a plausible resolved configuration for cache and flow fixtures.
	pub fn test_configuration(
		mcc_mnc: Option<MccMnc>,
		received_at: OffsetDateTime,
	) -> OpenIdConfiguration {
		OpenIdConfiguration {
			issuer: Url::parse("https://idp.carrier.example")
				.expect("Issuer fixture should parse successfully."),
			authorization_endpoint: Url::parse("https://idp.carrier.example/authorize")
				.expect("Authorization endpoint fixture should parse successfully."),
			mcc_mnc,
			branding: Branding { carrier_text: "Carrier".into(), carrier_logo: None },
			allowed_agent_signatures: Vec::new(),
			received_at,
		}
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_discovery_client() -> ReqwestDiscoveryClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestDiscoveryClient::with_client(client)
	}

	/// Constructs a [`DiscoveryEngine`] backed by a fresh cache and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_engine(
		endpoint: Url,
		client_id: &str,
	) -> (ReqwestDiscoveryEngine, Arc<ConfigurationCache>) {
		let cache = Arc::new(ConfigurationCache::default());
		let engine = DiscoveryEngine::with_http_client(
			test_reqwest_discovery_client(),
			cache.clone(),
			endpoint,
			client_id,
		);

		(engine, cache)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{
		AuthorizationError, CarrierIdError, DiscoveryError, Error, ErrorKind, PayloadError,
		Result, SnapshotError, TransportError,
	};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
