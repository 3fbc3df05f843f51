//! Resolved OpenID provider configurations and discovery payload decoding.

// self
use crate::{_prelude::*, carrier::MccMnc, error::PayloadError};

/// Carrier attribution assets surfaced to the host for rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
	/// Display name of the carrier.
	pub carrier_text: String,
	/// Optional carrier logo URL.
	pub carrier_logo: Option<Url>,
}

/// Provider configuration resolved for one carrier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
	/// Issuer identifier of the provider.
	pub issuer: Url,
	/// Authorization endpoint the external agent is sent to.
	pub authorization_endpoint: Url,
	/// Carrier identifier the configuration was resolved for, when the provider echoed one.
	pub mcc_mnc: Option<MccMnc>,
	/// Carrier attribution assets.
	pub branding: Branding,
	/// Package signatures permitted to claim the redirect scheme (legacy native-app handoff).
	pub allowed_agent_signatures: Vec<String>,
	/// Instant the configuration was received; drives the cache TTL.
	#[serde(with = "time::serde::rfc3339")]
	pub received_at: OffsetDateTime,
}
impl OpenIdConfiguration {
	/// Time-to-live after which a cached configuration must be re-discovered.
	pub const TTL: Duration = Duration::minutes(15);

	/// Returns true once the TTL has elapsed relative to `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now > self.received_at + Self::TTL
	}

	/// Returns true once the TTL has elapsed relative to the current instant.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}

/// Interpreted discovery payload: either a usable configuration or a discover-ui detour.
#[derive(Clone, Debug)]
pub enum DiscoveryOutcome {
	/// The provider resolved the subscriber and returned endpoints.
	Configuration(Box<OpenIdConfiguration>),
	/// The provider requires a discover-ui detour before endpoints can be issued.
	DiscoverUiRequired {
		/// Carrier-hosted discover-ui endpoint, when supplied.
		endpoint: Option<Url>,
	},
}

/// Wire shape of the discovery response. All fields are optional at the serde
/// layer; [`RawDiscoveryPayload::interpret`] enforces which combinations are valid.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDiscoveryPayload {
	#[serde(default)]
	error: Option<String>,
	// Discover-ui marker: the provider answers with a redirect target instead of endpoints.
	#[serde(default)]
	redirect_uri: Option<Url>,
	#[serde(default)]
	issuer: Option<Url>,
	#[serde(default)]
	authorization_endpoint: Option<Url>,
	#[serde(default)]
	mccmnc: Option<String>,
	#[serde(default)]
	branding: Option<RawBranding>,
	#[serde(default)]
	allowed_agent_signatures: Vec<String>,
}
#[derive(Debug, Deserialize)]
struct RawBranding {
	#[serde(default)]
	carrier_text: Option<String>,
	#[serde(default)]
	carrier_logo: Option<Url>,
}
impl RawDiscoveryPayload {
	pub(crate) fn parse(
		body: &str,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let deserializer = &mut serde_json::Deserializer::from_str(body);

		serde_path_to_error::deserialize(deserializer)
	}

	/// Returns the discover-ui endpoint when the payload is the detour marker.
	pub(crate) fn discover_ui_endpoint(&self) -> Option<Url> {
		self.redirect_uri.clone()
	}

	pub(crate) fn interpret(
		self,
		received_at: OffsetDateTime,
	) -> Result<DiscoveryOutcome, PayloadError> {
		if self.error.is_some() || self.authorization_endpoint.is_none() {
			return Ok(DiscoveryOutcome::DiscoverUiRequired { endpoint: self.redirect_uri });
		}

		let issuer = self.issuer.ok_or(PayloadError::MissingIssuer)?;
		let authorization_endpoint =
			self.authorization_endpoint.ok_or(PayloadError::MissingAuthorizationEndpoint)?;
		let mcc_mnc = self.mccmnc.map(MccMnc::new).transpose()?;
		let branding = match self.branding {
			Some(raw) => Branding {
				carrier_text: raw.carrier_text.unwrap_or_default(),
				carrier_logo: raw.carrier_logo,
			},
			None => Branding { carrier_text: String::new(), carrier_logo: None },
		};

		Ok(DiscoveryOutcome::Configuration(Box::new(OpenIdConfiguration {
			issuer,
			authorization_endpoint,
			mcc_mnc,
			branding,
			allowed_agent_signatures: self.allowed_agent_signatures,
			received_at,
		})))
	}
}
