//! Host-side collaborator contracts for the external authorization agent.
//!
//! The crate exposes traits without concrete implementations so hosts can
//! bring their own browser/custom-tab launcher and, for the legacy native-app
//! handoff, their own package-signature verifier. Internals of both are out of
//! scope here; the orchestrator only depends on these narrow seams.

// self
use crate::_prelude::*;

/// No agent (browser or carrier app) could handle the authorization URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("No external agent is available to handle the authorization URI.")]
pub struct AgentUnavailable;

/// Launches the external authorization agent at a provider URL.
pub trait ExternalAgentLauncher
where
	Self: Send + Sync,
{
	/// Hands the URI to the agent; the redirect arrives later via
	/// `Orchestrator::resume`.
	fn launch(&self, uri: &Url) -> Result<(), AgentUnavailable>;
}

/// Legacy check deciding whether a native app may claim the redirect scheme.
///
/// `expected` holds the package signatures from
/// `OpenIdConfiguration::allowed_agent_signatures`.
pub trait SignatureVerifier
where
	Self: Send + Sync,
{
	/// Returns true when the app registered for `uri` carries one of the
	/// expected signatures.
	fn has_valid_signature(&self, uri: &Url, expected: &[String]) -> bool;
}
