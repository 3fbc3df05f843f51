//! Authorization request model and builder.

pub mod pkce;

pub use pkce::{CodeChallengeMethod, ProofKey};

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::{
	_prelude::*,
	carrier::MccMnc,
	flow::{AttemptOutcome, CallbackHandles, CallbackToken},
	response::AuthorizationResponse,
};

const STATE_ENTROPY_BYTES: usize = 16;
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Immutable PKCE-secured authorization request.
///
/// Every field is fixed at build time except `login_hint_token`, which the
/// provider may hand back mid-flow and which is bound late via
/// [`AuthorizationRequest::bind_login_hint_token`]. The whole request
/// serializes so it survives host-process suspension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Redirect target the external agent returns to.
	pub redirect_uri: Url,
	/// Space-delimited scope string, `openid` by default.
	pub scope: String,
	/// CSRF state echoed back by the provider; `None` when explicitly disabled.
	pub state: Option<String>,
	/// Requested authentication context class references.
	pub acr_values: Option<String>,
	/// OIDC nonce.
	pub nonce: Option<String>,
	/// Provider prompt directive.
	pub prompt: Option<String>,
	/// Correlation identifier threaded through provider logs.
	pub correlation_id: Option<String>,
	/// Free-text context shown to the subscriber during authentication.
	pub context: Option<String>,
	/// UI theme hint forwarded to carrier-rendered pages.
	pub theme: Option<String>,
	login_hint_token: Option<String>,
	pkce: ProofKey,
}
impl AuthorizationRequest {
	/// Creates a builder for the mandatory client id + redirect target pair.
	pub fn builder(client_id: impl Into<String>, redirect_uri: Url) -> AuthorizationRequestBuilder {
		AuthorizationRequestBuilder::new(client_id, redirect_uri)
	}

	/// PKCE pair generated for this attempt.
	pub fn proof_key(&self) -> &ProofKey {
		&self.pkce
	}

	/// Login hint token handed back by the provider, when bound.
	pub fn login_hint_token(&self) -> Option<&str> {
		self.login_hint_token.as_deref()
	}

	/// Binds the late-arriving login hint token. The only permitted mutation
	/// after construction.
	pub fn bind_login_hint_token(&mut self, token: impl Into<String>) {
		self.login_hint_token = Some(token.into());
	}

	/// Builds the outbound authorization URL for a discovered endpoint.
	pub fn authorize_url(&self, endpoint: &Url, mcc_mnc: Option<&MccMnc>) -> Url {
		let mut url = endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.client_id);
			pairs.append_pair("redirect_uri", self.redirect_uri.as_str());
			pairs.append_pair("scope", &self.scope);

			if let Some(state) = &self.state {
				pairs.append_pair("state", state);
			}
			if let Some(nonce) = &self.nonce {
				pairs.append_pair("nonce", nonce);
			}
			if let Some(acr_values) = &self.acr_values {
				pairs.append_pair("acr_values", acr_values);
			}
			if let Some(prompt) = &self.prompt {
				pairs.append_pair("prompt", prompt);
			}
			if let Some(correlation_id) = &self.correlation_id {
				pairs.append_pair("correlation_id", correlation_id);
			}
			if let Some(context) = &self.context {
				pairs.append_pair("context", context);
			}
			if let Some(theme) = &self.theme {
				pairs.append_pair("options", theme);
			}
			if let Some(login_hint_token) = &self.login_hint_token {
				pairs.append_pair("login_hint_token", login_hint_token);
			}
			if let Some(mcc_mnc) = mcc_mnc {
				pairs.append_pair("mccmnc", mcc_mnc);
			}

			pairs.append_pair("code_challenge", self.pkce.challenge());
			pairs.append_pair("code_challenge_method", self.pkce.method().as_str());
			pairs.append_pair("sdk_version", SDK_VERSION);
		}

		url
	}
}

/// Builder yielding an [`AuthorizationRequest`] plus the caller's completion handles.
pub struct AuthorizationRequestBuilder {
	client_id: String,
	redirect_uri: Url,
	scope: String,
	state: StateMode,
	acr_values: Option<String>,
	nonce: Option<String>,
	prompt: Option<String>,
	correlation_id: Option<String>,
	context: Option<String>,
	theme: Option<String>,
	handles: CallbackHandles,
}
enum StateMode {
	Generated,
	Fixed(String),
	Disabled,
}
impl AuthorizationRequestBuilder {
	/// Creates a builder with default scope `openid` and a generated `state`.
	pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
		Self {
			client_id: client_id.into(),
			redirect_uri,
			scope: "openid".into(),
			state: StateMode::Generated,
			acr_values: None,
			nonce: None,
			prompt: None,
			correlation_id: None,
			context: None,
			theme: None,
			handles: CallbackHandles::default(),
		}
	}

	/// Replaces the default scope string.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Replaces the generated `state` with a caller-supplied value.
	pub fn state(mut self, state: impl Into<String>) -> Self {
		self.state = StateMode::Fixed(state.into());

		self
	}

	/// Removes the `state` parameter entirely, disabling the later echo check.
	///
	/// Intended for server-initiated flows where the server binds the request;
	/// interactive clients should keep the generated default.
	pub fn without_state(mut self) -> Self {
		self.state = StateMode::Disabled;

		self
	}

	/// Sets the requested authentication context class references.
	pub fn acr_values(mut self, acr_values: impl Into<String>) -> Self {
		self.acr_values = Some(acr_values.into());

		self
	}

	/// Sets the OIDC nonce.
	pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
		self.nonce = Some(nonce.into());

		self
	}

	/// Sets the provider prompt directive.
	pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
		self.prompt = Some(prompt.into());

		self
	}

	/// Sets the correlation identifier.
	pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
		self.correlation_id = Some(correlation_id.into());

		self
	}

	/// Sets the free-text authentication context.
	pub fn context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());

		self
	}

	/// Sets the UI theme hint.
	pub fn theme(mut self, theme: impl Into<String>) -> Self {
		self.theme = Some(theme.into());

		self
	}

	/// Registers the single-use success callback.
	pub fn on_success(mut self, callback: impl FnOnce(AuthorizationResponse) + Send + 'static) -> Self {
		self.handles.on_success = Some(CallbackToken::new(callback));

		self
	}

	/// Registers the single-use failure callback.
	pub fn on_failure(mut self, callback: impl FnOnce(AuthorizationResponse) + Send + 'static) -> Self {
		self.handles.on_failure = Some(CallbackToken::new(callback));

		self
	}

	/// Registers the single-use completion callback, fired when no more
	/// specific channel consumed the outcome.
	pub fn on_completion(mut self, callback: impl FnOnce(AttemptOutcome) + Send + 'static) -> Self {
		self.handles.on_completion = Some(CallbackToken::new(callback));

		self
	}

	/// Registers the single-use cancellation callback.
	pub fn on_cancellation(mut self, callback: impl FnOnce(()) + Send + 'static) -> Self {
		self.handles.on_cancellation = Some(CallbackToken::new(callback));

		self
	}

	/// Consumes the builder, generating state + PKCE material.
	pub fn build(self) -> (AuthorizationRequest, CallbackHandles) {
		let state = match self.state {
			StateMode::Generated => Some(random_state()),
			StateMode::Fixed(state) => Some(state),
			StateMode::Disabled => None,
		};
		let request = AuthorizationRequest {
			client_id: self.client_id,
			redirect_uri: self.redirect_uri,
			scope: self.scope,
			state,
			acr_values: self.acr_values,
			nonce: self.nonce,
			prompt: self.prompt,
			correlation_id: self.correlation_id,
			context: self.context,
			theme: self.theme,
			login_hint_token: None,
			pkce: ProofKey::generate(),
		};

		(request, self.handles)
	}
}
impl Debug for AuthorizationRequestBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationRequestBuilder")
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("scope", &self.scope)
			.finish()
	}
}

fn random_state() -> String {
	let mut bytes = [0_u8; STATE_ENTROPY_BYTES];

	rand::rng().fill(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}
