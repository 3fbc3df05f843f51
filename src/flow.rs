//! Redirect-driven authorization state machine.
//!
//! The orchestrator owns one attempt at a time and is driven entirely through
//! [`Orchestrator::resume`]: the host calls it with `None` when the external
//! agent returned without a redirect and with `Some(uri)` when a callback URI
//! arrived. Discovery detours (discover-ui, `user_not_found`) are bounded: the
//! discover-ui chain has length one, and a `user_not_found` redirect never
//! re-enters the authorize state. State survives process suspension through
//! [`FlowSnapshot`]; an in-flight discovery is never resumed, the host simply
//! calls `resume` again after restoring and a fresh call is issued.

pub mod handles;

pub use handles::{AttemptOutcome, CallbackHandles, CallbackToken, DeliveryChannel};

// self
use crate::{
	_prelude::*,
	agent::ExternalAgentLauncher,
	carrier::{CarrierIdProvider, MccMnc},
	discovery::{DiscoveryEngine, OpenIdConfiguration},
	http::DiscoveryHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::AuthorizationRequest,
	response::{AuthorizationResponse, RedirectParams},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestDiscoveryClient;

#[cfg(feature = "reqwest")]
/// Orchestrator specialized for the crate's default reqwest transport.
pub type ReqwestOrchestrator = Orchestrator<ReqwestDiscoveryClient>;

/// States of the redirect machine. `None` is initial; every other state is
/// reached only through orchestrator transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
	/// No attempt has started or the previous attempt terminated.
	#[default]
	None,
	/// The agent is on the carrier-hosted discover-ui page.
	DiscoverUi,
	/// The agent is on the provider's authorization endpoint.
	Authorize,
	/// Discover-ui detour triggered by a `user_not_found` authorization redirect.
	DiscoverUserNotFound,
	/// Authorization retry after the `user_not_found` detour; terminal on any redirect.
	AuthorizeUserNotFound,
}
impl FlowState {
	/// Returns a stable label suitable for logs and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowState::None => "none",
			FlowState::DiscoverUi => "discover_ui",
			FlowState::Authorize => "authorize",
			FlowState::DiscoverUserNotFound => "discover_user_not_found",
			FlowState::AuthorizeUserNotFound => "authorize_user_not_found",
		}
	}
}
impl Display for FlowState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Progress report produced by every [`Orchestrator::resume`] call.
#[derive(Debug)]
pub enum FlowProgress {
	/// The external agent was launched; the host should wait for a redirect.
	AwaitingRedirect,
	/// A callback handle consumed the terminal outcome.
	Delivered(DeliveryChannel),
	/// No handle matched; the terminal response returns to the immediate caller.
	Finished(AuthorizationResponse),
	/// The agent returned without a redirect and no cancellation/completion
	/// handle was present.
	Cancelled,
}

/// Serializable attempt state captured while control is with the external agent.
///
/// The four callback handles are re-attached by the host on
/// [`Orchestrator::restore`]; closures do not cross process boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
	/// Machine state at suspension.
	pub state: FlowState,
	/// The immutable request, including its PKCE pair.
	pub request: AuthorizationRequest,
	/// Carrier identifier resolved so far.
	pub mcc_mnc: Option<MccMnc>,
}
impl FlowSnapshot {
	/// Encodes the snapshot as JSON.
	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(self).map_err(SnapshotError)?)
	}

	/// Decodes a snapshot from JSON.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json).map_err(SnapshotError)?)
	}
}

// Which call site triggered a discovery; decides where its outcome leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DiscoverTrigger {
	Initial,
	DiscoverUiRedirect,
	UserNotFound,
	UserNotFoundRedirect,
}
impl DiscoverTrigger {
	fn prompt(self) -> bool {
		matches!(self, DiscoverTrigger::UserNotFound)
	}

	// A second ProviderNotFound while already inside a discover-ui detour.
	fn in_detour(self) -> bool {
		matches!(self, DiscoverTrigger::DiscoverUiRedirect | DiscoverTrigger::UserNotFoundRedirect)
	}

	fn authorize_state(self) -> FlowState {
		match self {
			DiscoverTrigger::UserNotFoundRedirect => FlowState::AuthorizeUserNotFound,
			_ => FlowState::Authorize,
		}
	}

	fn detour_state(self) -> FlowState {
		match self {
			DiscoverTrigger::UserNotFound => FlowState::DiscoverUserNotFound,
			_ => FlowState::DiscoverUi,
		}
	}
}

/// Drives one authorization attempt end to end.
///
/// Construction-time dependency injection: the discovery engine (with its
/// shared cache), the carrier lookup, and the agent launcher are supplied by
/// the host; nothing here is process-global.
pub struct Orchestrator<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	engine: DiscoveryEngine<C>,
	carrier: Arc<dyn CarrierIdProvider>,
	launcher: Arc<dyn ExternalAgentLauncher>,
	state: FlowState,
	request: AuthorizationRequest,
	mcc_mnc: Option<MccMnc>,
	handles: CallbackHandles,
}
impl<C> Orchestrator<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	/// Creates an orchestrator for a fresh attempt.
	pub fn new(
		engine: DiscoveryEngine<C>,
		carrier: Arc<dyn CarrierIdProvider>,
		launcher: Arc<dyn ExternalAgentLauncher>,
		request: AuthorizationRequest,
		handles: CallbackHandles,
	) -> Self {
		Self {
			engine,
			carrier,
			launcher,
			state: FlowState::None,
			request,
			mcc_mnc: None,
			handles,
		}
	}

	/// Rebuilds an orchestrator from a suspension snapshot.
	pub fn restore(
		engine: DiscoveryEngine<C>,
		carrier: Arc<dyn CarrierIdProvider>,
		launcher: Arc<dyn ExternalAgentLauncher>,
		snapshot: FlowSnapshot,
		handles: CallbackHandles,
	) -> Self {
		Self {
			engine,
			carrier,
			launcher,
			state: snapshot.state,
			request: snapshot.request,
			mcc_mnc: snapshot.mcc_mnc,
			handles,
		}
	}

	/// Captures the serializable attempt state for suspension.
	pub fn snapshot(&self) -> FlowSnapshot {
		FlowSnapshot {
			state: self.state,
			request: self.request.clone(),
			mcc_mnc: self.mcc_mnc.clone(),
		}
	}

	/// Current machine state.
	pub fn state(&self) -> FlowState {
		self.state
	}

	/// The request driving this attempt.
	pub fn request(&self) -> &AuthorizationRequest {
		&self.request
	}

	/// Advances the machine with one host event.
	///
	/// `None` means the agent returned without completing; outside the initial
	/// state that is a cancellation. `Some(uri)` is the redirect callback.
	pub async fn resume(&mut self, redirect: Option<Url>) -> FlowProgress {
		const KIND: FlowKind = FlowKind::Authorization;

		let span = FlowSpan::new(KIND, self.state.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let progress = span
			.instrument(async move {
				match self.state {
					FlowState::None => self.start().await,
					_ => match redirect {
						None => self.cancel(),
						Some(uri) => self.handle_redirect(uri).await,
					},
				}
			})
			.await;

		match &progress {
			FlowProgress::AwaitingRedirect => {},
			FlowProgress::Delivered(_) | FlowProgress::Finished(_) | FlowProgress::Cancelled =>
				obs::record_flow_outcome(
					KIND,
					if terminal_succeeded(&progress) {
						FlowOutcome::Success
					} else {
						FlowOutcome::Failure
					},
				),
		}

		progress
	}

	async fn start(&mut self) -> FlowProgress {
		self.mcc_mnc = self.carrier.current();

		let outcome = self.engine.discover(self.mcc_mnc.as_ref(), false).await;

		self.apply_discovery(outcome, DiscoverTrigger::Initial)
	}

	async fn handle_redirect(&mut self, uri: Url) -> FlowProgress {
		let params = RedirectParams::from_uri(&uri);

		match self.state {
			FlowState::DiscoverUi | FlowState::DiscoverUserNotFound => {
				if !crate::response::states_match(
					self.request.state.as_deref(),
					params.state.as_deref(),
				) {
					return self.finish(AuthorizationResponse::state_mismatched(
						self.mcc_mnc.clone(),
					));
				}

				if let Some(token) = params.login_hint_token {
					self.request.bind_login_hint_token(token);
				}
				if let Some(mcc_mnc) = params.mcc_mnc {
					self.mcc_mnc = Some(mcc_mnc);
				}

				let trigger = if self.state == FlowState::DiscoverUserNotFound {
					DiscoverTrigger::UserNotFoundRedirect
				} else {
					DiscoverTrigger::DiscoverUiRedirect
				};
				let outcome = self.engine.discover(self.mcc_mnc.as_ref(), false).await;

				self.apply_discovery(outcome, trigger)
			},
			FlowState::Authorize if params.is_user_not_found() => {
				let outcome = self.engine.discover(self.mcc_mnc.as_ref(), true).await;

				self.apply_discovery(outcome, DiscoverTrigger::UserNotFound)
			},
			FlowState::Authorize | FlowState::AuthorizeUserNotFound => {
				// Loop guard: after one user_not_found detour the redirect is
				// terminal no matter what it carries.
				let response = AuthorizationResponse::from_redirect(
					&self.request,
					self.mcc_mnc.as_ref(),
					&uri,
				);

				self.finish(response)
			},
			FlowState::None => unreachable!("The initial state never holds a redirect."),
		}
	}

	fn apply_discovery(
		&mut self,
		outcome: Result<OpenIdConfiguration, DiscoveryError>,
		trigger: DiscoverTrigger,
	) -> FlowProgress {
		match outcome {
			Ok(config) => {
				if trigger.prompt() {
					// A prompt=true discovery must always fail; a configuration
					// here means the provider responded unexpectedly.
					return self.finish_discovery_state("received OIDC with prompt=true");
				}

				if self.mcc_mnc.is_none() {
					self.mcc_mnc = config.mcc_mnc.clone();
				}

				let url =
					self.request.authorize_url(&config.authorization_endpoint, self.mcc_mnc.as_ref());

				self.launch(url, trigger.authorize_state())
			},
			Err(DiscoveryError::ProviderNotFound { discover_ui_endpoint }) => {
				if trigger.in_detour() {
					return self.finish_discovery_state("too many discover-ui redirects");
				}

				let Some(endpoint) = discover_ui_endpoint else {
					return self.finish_discovery_state("missing discover-ui endpoint");
				};

				self.launch(endpoint, trigger.detour_state())
			},
			Err(err) => self.finish(AuthorizationResponse::from_discovery_failure(
				self.mcc_mnc.as_ref(),
				&err,
			)),
		}
	}

	fn launch(&mut self, uri: Url, next: FlowState) -> FlowProgress {
		match self.launcher.launch(&uri) {
			Ok(()) => {
				self.state = next;

				FlowProgress::AwaitingRedirect
			},
			Err(_) => self.finish(AuthorizationResponse::Failure {
				mcc_mnc: self.mcc_mnc.clone(),
				error: AuthorizationError::with_description(
					ErrorKind::Unknown,
					"external agent unavailable",
				),
			}),
		}
	}

	fn finish_discovery_state(&mut self, description: &str) -> FlowProgress {
		self.finish(AuthorizationResponse::Failure {
			mcc_mnc: self.mcc_mnc.clone(),
			error: AuthorizationError::with_description(ErrorKind::DiscoveryState, description),
		})
	}

	fn finish(&mut self, response: AuthorizationResponse) -> FlowProgress {
		self.state = FlowState::None;

		match self.handles.deliver(response) {
			Ok(channel) => FlowProgress::Delivered(channel),
			Err(response) => FlowProgress::Finished(response),
		}
	}

	fn cancel(&mut self) -> FlowProgress {
		self.state = FlowState::None;

		match self.handles.deliver_cancellation() {
			Some(channel) => FlowProgress::Delivered(channel),
			None => FlowProgress::Cancelled,
		}
	}
}
impl<C> Debug for Orchestrator<C>
where
	C: ?Sized + DiscoveryHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Orchestrator")
			.field("state", &self.state)
			.field("mcc_mnc", &self.mcc_mnc)
			.field("client_id", &self.request.client_id)
			.finish()
	}
}

fn terminal_succeeded(progress: &FlowProgress) -> bool {
	match progress {
		FlowProgress::Delivered(DeliveryChannel::Success) => true,
		FlowProgress::Finished(response) => response.is_success(),
		_ => false,
	}
}
