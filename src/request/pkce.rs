//! Proof Key for Code Exchange generation (RFC 7636).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const VERIFIER_LEN: usize = 128;
// RFC 7636 unreserved characters.
const VERIFIER_CHARSET: &[u8] =
	b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Challenge derivation methods defined by RFC 7636.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
	/// SHA-256 digest of the verifier, base64url-encoded without padding.
	S256,
	/// Challenge equals the verifier; used only where no SHA-256 digest is available.
	Plain,
}
impl CodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::S256 => "S256",
			CodeChallengeMethod::Plain => "plain",
		}
	}
}
impl Display for CodeChallengeMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// PKCE verifier/challenge pair bound to one authorization attempt.
///
/// The verifier is generated once and never changes within an attempt; the
/// whole pair serializes alongside the request so it survives suspension.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofKey {
	verifier: String,
	challenge: String,
	method: CodeChallengeMethod,
}
impl ProofKey {
	/// Generates a fresh 128-character verifier and its S256 challenge.
	pub fn generate() -> Self {
		Self::s256(random_verifier())
	}

	/// Derives the S256 challenge for an existing verifier.
	pub fn s256(verifier: impl Into<String>) -> Self {
		let verifier = verifier.into();
		let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

		Self { verifier, challenge, method: CodeChallengeMethod::S256 }
	}

	/// Falls back to the `plain` method where no SHA-256 digest is available;
	/// the challenge then equals the verifier.
	pub fn plain(verifier: impl Into<String>) -> Self {
		let verifier = verifier.into();
		let challenge = verifier.clone();

		Self { verifier, challenge, method: CodeChallengeMethod::Plain }
	}

	/// Secret verifier presented during the token exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Public challenge sent with the authorization request.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Derivation method for the challenge.
	pub fn method(&self) -> CodeChallengeMethod {
		self.method
	}
}
impl Debug for ProofKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// The verifier is a secret; only the public half is printable.
		f.debug_struct("ProofKey")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

fn random_verifier() -> String {
	let mut rng = rand::rng();

	(0..VERIFIER_LEN)
		.map(|_| {
			let idx = rng.random_range(0..VERIFIER_CHARSET.len());

			VERIFIER_CHARSET[idx] as char
		})
		.collect()
}
