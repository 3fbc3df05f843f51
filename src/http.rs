//! Transport primitives for discovery and asset-link fetches.
//!
//! The module exposes [`DiscoveryHttpClient`], the broker's only dependency on an
//! HTTP stack. Implementations return the raw status + body for every completed
//! exchange (including non-2xx statuses) and reserve [`TransportError`] for
//! failures where no HTTP response was produced at all, so the discovery engine
//! can distinguish provider errors from transport errors when applying its
//! stale-cache fallback.

// self
use crate::_prelude::*;

/// Connect + read deadlines applied to each discovery HTTP call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
	/// Deadline for establishing the connection.
	pub connect: Duration,
	/// Deadline for receiving the full response after connecting.
	pub read: Duration,
}
impl HttpTimeouts {
	/// Returns the combined budget for a single call.
	pub fn total(self) -> Duration {
		self.connect + self.read
	}
}
impl Default for HttpTimeouts {
	fn default() -> Self {
		Self { connect: Duration::seconds(5), read: Duration::seconds(30) }
	}
}

/// Status + body pair captured from a completed HTTP exchange.
#[derive(Clone, Debug)]
pub struct HttpBody {
	/// HTTP status code returned by the endpoint.
	pub status: u16,
	/// Response body decoded as UTF-8 text.
	pub body: String,
}
impl HttpBody {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Future returned by [`DiscoveryHttpClient::get`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpBody, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing discovery GETs.
///
/// Implementations must be `Send + Sync + 'static` so one client can be shared
/// across broker instances, and the returned futures must be `Send` so flows
/// can hop executors. Any response that carries an HTTP status is `Ok`, even
/// an error status; only connect/read failures map to [`TransportError`].
pub trait DiscoveryHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a GET against `url` under the provided deadlines.
	fn get(&self, url: Url, timeouts: HttpTimeouts) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The per-call total deadline is enforced through reqwest's request timeout;
/// callers that need a strict connect deadline should configure
/// `ClientBuilder::connect_timeout` on the client they pass to
/// [`ReqwestDiscoveryClient::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestDiscoveryClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestDiscoveryClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestDiscoveryClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl DiscoveryHttpClient for ReqwestDiscoveryClient {
	fn get(&self, url: Url, timeouts: HttpTimeouts) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let total = timeouts.total();
			let timeout = std::time::Duration::try_from(total).unwrap_or(std::time::Duration::MAX);
			let response = client.get(url).timeout(timeout).send().await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			Ok(HttpBody { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn timeouts_sum_into_total_budget() {
		let timeouts =
			HttpTimeouts { connect: Duration::seconds(5), read: Duration::seconds(30) };

		assert_eq!(timeouts.total(), Duration::seconds(35));
	}

	#[test]
	fn http_body_success_covers_2xx_only() {
		assert!(HttpBody { status: 200, body: String::new() }.is_success());
		assert!(HttpBody { status: 204, body: String::new() }.is_success());
		assert!(!HttpBody { status: 302, body: String::new() }.is_success());
		assert!(!HttpBody { status: 404, body: String::new() }.is_success());
	}
}
