//! Terminal response factory and the closed error taxonomy.
//!
//! Three provider vocabularies (OAuth 2.0, OIDC, carrier-specific) are
//! normalized into [`ErrorKind`] via fixed lookup tables consulted in that
//! order; the first match wins. The ordering is load-bearing: OAuth 2.0 and
//! OIDC both define `invalid_request`-family codes and the carrier table
//! re-purposes `network_failure`, so swapping tables changes classifications.

// self
use crate::{
	_prelude::*,
	carrier::MccMnc,
	error::{AuthorizationError, DiscoveryError, ErrorKind, TransportError},
	request::AuthorizationRequest,
};

// RFC 6749 §4.1.2.1.
const OAUTH_CODES: &[(&str, ErrorKind)] = &[
	("invalid_request", ErrorKind::InvalidConfiguration),
	("unauthorized_client", ErrorKind::InvalidConfiguration),
	("unsupported_response_type", ErrorKind::Unknown),
	("invalid_scope", ErrorKind::InvalidRequest),
	("access_denied", ErrorKind::RequestDenied),
	("temporarily_unavailable", ErrorKind::ServerError),
];
// OIDC Core §3.1.2.6.
const OIDC_CODES: &[(&str, ErrorKind)] = &[
	("invalid_request_object", ErrorKind::InvalidRequest),
	("interaction_required", ErrorKind::Unknown),
	("login_required", ErrorKind::Unknown),
	("account_selection_required", ErrorKind::Unknown),
	("consent_required", ErrorKind::Unknown),
	("invalid_request_uri", ErrorKind::Unknown),
	("request_not_supported", ErrorKind::Unknown),
	("request_uri_not_supported", ErrorKind::Unknown),
	("registration_not_supported", ErrorKind::Unknown),
];
const CARRIER_CODES: &[(&str, ErrorKind)] = &[
	("user_not_found", ErrorKind::DiscoveryState),
	("invalid_login_hint_token", ErrorKind::DiscoveryState),
	("invalid_login_hint", ErrorKind::DiscoveryState),
	("authentication_timed_out", ErrorKind::RequestTimeout),
	("device_unavailable", ErrorKind::RequestDenied),
	("network_failure", ErrorKind::NetworkFailure),
	("user_unsupported", ErrorKind::DiscoveryState),
];

/// Query parameters extracted from a redirect callback URI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedirectParams {
	/// Authorization code issued by the provider.
	pub code: Option<String>,
	/// Echoed CSRF state.
	pub state: Option<String>,
	/// Provider error code.
	pub error: Option<String>,
	/// Provider error description.
	pub error_description: Option<String>,
	/// Carrier identifier resolved during the detour, when echoed and valid.
	pub mcc_mnc: Option<MccMnc>,
	/// Login hint token handed back by the provider.
	pub login_hint_token: Option<String>,
}
impl RedirectParams {
	/// Extracts the known parameters from a redirect URI's query string.
	pub fn from_uri(uri: &Url) -> Self {
		let mut params = Self::default();

		for (key, value) in uri.query_pairs() {
			match key.as_ref() {
				"code" => params.code = Some(value.into_owned()),
				"state" => params.state = Some(value.into_owned()),
				"error" => params.error = Some(value.into_owned()),
				"error_description" => params.error_description = Some(value.into_owned()),
				"mccmnc" => params.mcc_mnc = MccMnc::new(value.as_ref()).ok(),
				"login_hint_token" => params.login_hint_token = Some(value.into_owned()),
				_ => {},
			}
		}

		params
	}

	/// Returns true when the provider signalled the `user_not_found` detour.
	pub fn is_user_not_found(&self) -> bool {
		self.error.as_deref() == Some("user_not_found")
	}
}

/// Terminal outcome of an authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthorizationResponse {
	/// The provider issued an authorization code.
	Success {
		/// Authorization code to exchange at the token endpoint.
		code: String,
		/// Carrier the code was issued for, when known.
		mcc_mnc: Option<MccMnc>,
		/// PKCE verifier to present during the exchange.
		pkce_verifier: String,
		/// Nonce bound to the request.
		nonce: Option<String>,
		/// Authentication context class references requested.
		acr_values: Option<String>,
		/// Free-text context shown during authentication.
		context: Option<String>,
		/// Correlation identifier threaded through provider logs.
		correlation_id: Option<String>,
	},
	/// The attempt failed terminally.
	Failure {
		/// Carrier associated with the attempt, when known.
		mcc_mnc: Option<MccMnc>,
		/// Normalized failure.
		error: AuthorizationError,
	},
}
impl AuthorizationResponse {
	/// Returns true for the success variant.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// Returns the normalized error for failures.
	pub fn error(&self) -> Option<&AuthorizationError> {
		match self {
			Self::Success { .. } => None,
			Self::Failure { error, .. } => Some(error),
		}
	}

	/// Builds the terminal response for a redirect callback.
	///
	/// An `error` parameter maps through the taxonomy tables; a `code`
	/// requires the echoed `state` to match the request's exactly (both-absent
	/// counts as a match); anything else is [`ErrorKind::Unknown`].
	pub fn from_redirect(
		request: &AuthorizationRequest,
		mcc_mnc: Option<&MccMnc>,
		redirect: &Url,
	) -> Self {
		let params = RedirectParams::from_uri(redirect);
		let mcc_mnc = params.mcc_mnc.clone().or_else(|| mcc_mnc.cloned());

		if let Some(error) = &params.error {
			return Self::Failure {
				mcc_mnc,
				error: map_error_code(error, params.error_description.as_deref()),
			};
		}
		if let Some(code) = params.code {
			if !states_match(request.state.as_deref(), params.state.as_deref()) {
				return Self::state_mismatched(mcc_mnc);
			}

			return Self::Success {
				code,
				mcc_mnc,
				pkce_verifier: request.proof_key().verifier().to_owned(),
				nonce: request.nonce.clone(),
				acr_values: request.acr_values.clone(),
				context: request.context.clone(),
				correlation_id: request.correlation_id.clone(),
			};
		}

		Self::Failure { mcc_mnc, error: AuthorizationError::new(ErrorKind::Unknown) }
	}

	/// Builds the terminal response for a discovery failure.
	pub fn from_discovery_failure(mcc_mnc: Option<&MccMnc>, err: &DiscoveryError) -> Self {
		let mcc_mnc = mcc_mnc.cloned();
		let error = match err {
			DiscoveryError::AssetsNotFound { reason } =>
				AuthorizationError::with_description(ErrorKind::DiscoveryState, reason.clone()),
			DiscoveryError::ProviderNotFound { .. } => AuthorizationError::with_description(
				ErrorKind::DiscoveryState,
				"missing discover-ui endpoint",
			),
			DiscoveryError::Http { body, .. } => map_http_error_body(body),
			DiscoveryError::Transport(TransportError::Timeout) =>
				AuthorizationError::with_description(
					ErrorKind::ServerError,
					"discovery request timed out",
				),
			DiscoveryError::Transport(TransportError::TlsUnsupported) =>
				AuthorizationError::with_description(
					ErrorKind::DiscoveryState,
					"TLS 1.2 unsupported",
				),
			DiscoveryError::Transport(transport) =>
				AuthorizationError::with_description(ErrorKind::Unknown, transport.to_string()),
			DiscoveryError::Parse { source, .. } =>
				AuthorizationError::with_description(ErrorKind::Unknown, source.to_string()),
			DiscoveryError::Payload(payload) =>
				AuthorizationError::with_description(ErrorKind::Unknown, payload.to_string()),
		};

		Self::Failure { mcc_mnc, error }
	}

	pub(crate) fn state_mismatched(mcc_mnc: Option<MccMnc>) -> Self {
		Self::Failure {
			mcc_mnc,
			error: AuthorizationError::with_description(
				ErrorKind::InvalidRequest,
				"state mismatched",
			),
		}
	}
}

/// Maps a raw provider error code through the three fixed tables.
///
/// Unmatched codes become [`ErrorKind::Unknown`] with the raw code preserved
/// as the description when the provider supplied none.
pub fn map_error_code(code: &str, description: Option<&str>) -> AuthorizationError {
	for table in [OAUTH_CODES, OIDC_CODES, CARRIER_CODES] {
		if let Some((_, kind)) = table.iter().find(|(raw, _)| *raw == code) {
			return AuthorizationError { kind: *kind, description: description.map(ToOwned::to_owned) };
		}
	}

	AuthorizationError::with_description(ErrorKind::Unknown, description.unwrap_or(code))
}

/// Exact string identity on the echoed state; both-absent counts as a match.
pub(crate) fn states_match(expected: Option<&str>, echoed: Option<&str>) -> bool {
	match (expected, echoed) {
		(None, None) => true,
		(Some(expected), Some(echoed)) => expected == echoed,
		_ => false,
	}
}

fn map_http_error_body(body: &str) -> AuthorizationError {
	#[derive(Deserialize)]
	struct ErrorBody {
		#[serde(default)]
		error: Option<String>,
		#[serde(default)]
		error_description: Option<String>,
	}

	match serde_json::from_str::<ErrorBody>(body) {
		Ok(ErrorBody { error: Some(code), error_description }) =>
			map_error_code(&code, error_description.as_deref()),
		_ => AuthorizationError::with_description(ErrorKind::Unknown, body),
	}
}
