//! Broker-level error types shared across discovery, flows, and redirect handling.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Discovery-layer failure.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Flow snapshot could not be serialized or restored.
	#[error(transparent)]
	Snapshot(#[from] SnapshotError),
	/// Carrier identifier validation failed.
	#[error(transparent)]
	Carrier(#[from] CarrierIdError),
}

/// Failures raised while resolving a carrier's OpenID configuration.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// The provider could not resolve the subscriber from the carrier identifier alone and
	/// requires a discover-ui detour.
	#[error("Provider not found; discover-ui detour required.")]
	ProviderNotFound {
		/// Carrier-hosted discover-ui endpoint, when the provider supplied one.
		discover_ui_endpoint: Option<Url>,
	},
	/// Discovery endpoint returned a non-success HTTP status other than 404.
	#[error("Discovery endpoint returned HTTP {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Raw response body, preserved for error-code mapping.
		body: String,
	},
	/// Transport-level failure while calling the discovery endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Discovery endpoint responded with malformed JSON that could not be parsed.
	#[error("Discovery endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Discovery payload parsed but is missing required configuration fields.
	#[error(transparent)]
	Payload(#[from] PayloadError),
	/// The digital-asset-links manifest authorizing native redirect handlers was unavailable.
	#[error("Asset-links manifest could not be fetched: {reason}.")]
	AssetsNotFound {
		/// Human-readable failure summary.
		reason: String,
	},
}

/// Structural problems in an otherwise well-formed discovery payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PayloadError {
	/// Payload omitted the `issuer` field.
	#[error("Discovery payload is missing the issuer.")]
	MissingIssuer,
	/// Payload omitted the `authorization_endpoint` field.
	#[error("Discovery payload is missing the authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Payload carried an invalid `mccmnc` value.
	#[error("Discovery payload carries an invalid carrier identifier.")]
	InvalidMccMnc(#[from] CarrierIdError),
}

/// Transport-level failures (network, IO, TLS).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client could not reach the endpoint.
	#[error("Network error occurred while calling the discovery endpoint.")]
	Unreachable {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Connect or read deadline elapsed before the endpoint responded.
	#[error("Discovery request timed out.")]
	Timeout,
	/// The platform TLS stack cannot negotiate TLS 1.2 with the endpoint.
	#[error("TLS 1.2 unsupported")]
	TlsUnsupported,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the discovery endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn unreachable(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Unreachable { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::unreachable(e) }
	}
}

/// Flow snapshot serialization failures.
#[derive(Debug, ThisError)]
#[error("Flow snapshot could not be encoded or decoded.")]
pub struct SnapshotError(#[from] pub(crate) serde_json::Error);

/// Error returned when carrier identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum CarrierIdError {
	/// The identifier was empty.
	#[error("Carrier identifier cannot be empty.")]
	Empty,
	/// The identifier contains non-digit characters.
	#[error("Carrier identifier must contain only ASCII digits.")]
	NonDigit,
	/// The identifier is not an MCC (3 digits) + MNC (2-3 digits) pair.
	#[error("Carrier identifier must be 5 or 6 digits, got {len}.")]
	BadLength {
		/// Character count that failed validation.
		len: usize,
	},
}

/// Closed classification for every terminal authorization failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// The client registration or request parameters are rejected by the provider.
	InvalidConfiguration,
	/// The request itself was malformed or failed an integrity check (state echo).
	InvalidRequest,
	/// The subscriber or their device denied the request.
	RequestDenied,
	/// The provider gave up waiting for the subscriber.
	RequestTimeout,
	/// The provider failed or is temporarily unavailable.
	ServerError,
	/// The carrier network could not complete the authentication.
	NetworkFailure,
	/// The discovery flow itself is in an unrecoverable state.
	DiscoveryState,
	/// Anything the closed taxonomy cannot classify.
	Unknown,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::InvalidConfiguration => "invalid_configuration",
			ErrorKind::InvalidRequest => "invalid_request",
			ErrorKind::RequestDenied => "request_denied",
			ErrorKind::RequestTimeout => "request_timeout",
			ErrorKind::ServerError => "server_error",
			ErrorKind::NetworkFailure => "network_failure",
			ErrorKind::DiscoveryState => "discovery_state",
			ErrorKind::Unknown => "unknown",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal authorization failure surfaced to the host.
///
/// The kind is the only field callers should branch on; the description is
/// free text preserved from the provider or the local integrity check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationError {
	/// Closed failure classification.
	pub kind: ErrorKind,
	/// Optional free-text detail.
	pub description: Option<String>,
}
impl AuthorizationError {
	/// Creates an error with no description.
	pub fn new(kind: ErrorKind) -> Self {
		Self { kind, description: None }
	}

	/// Creates an error carrying a description.
	pub fn with_description(kind: ErrorKind, description: impl Into<String>) -> Self {
		Self { kind, description: Some(description.into()) }
	}
}
impl Display for AuthorizationError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.description {
			Some(description) => write!(f, "{}: {description}", self.kind),
			None => Display::fmt(&self.kind, f),
		}
	}
}
impl StdError for AuthorizationError {}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn authorization_error_display_includes_description() {
		let bare = AuthorizationError::new(ErrorKind::ServerError);

		assert_eq!(bare.to_string(), "server_error");

		let described =
			AuthorizationError::with_description(ErrorKind::InvalidRequest, "state mismatched");

		assert_eq!(described.to_string(), "invalid_request: state mismatched");
	}

	#[test]
	fn discovery_error_converts_into_broker_error() {
		let err: Error = DiscoveryError::Http { status: 500, body: "boom".into() }.into();

		assert!(matches!(err, Error::Discovery(DiscoveryError::Http { status: 500, .. })));
		assert!(err.to_string().contains("500"));
	}

	#[test]
	fn error_kind_serializes_as_snake_case() {
		let payload = serde_json::to_string(&ErrorKind::InvalidConfiguration)
			.expect("Error kind should serialize to JSON.");

		assert_eq!(payload, "\"invalid_configuration\"");
	}
}
