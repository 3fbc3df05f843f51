//! Single-invocation completion channels handed to the host.

// self
use crate::{_prelude::*, response::AuthorizationResponse};

type Callback<T> = Box<dyn FnOnce(T) + Send>;

/// Capability-scoped, single-invocation callback token.
///
/// The orchestrator never calls host code directly; it fires these tokens. A
/// token consumes its callback on the first fire and reports `false` on every
/// later attempt, so at most one delivery happens per token even when clones
/// race across threads.
#[derive(Clone)]
pub struct CallbackToken<T>(Arc<Mutex<Option<Callback<T>>>>);
impl<T> CallbackToken<T> {
	/// Wraps a callback into a token.
	pub fn new(callback: impl FnOnce(T) + Send + 'static) -> Self {
		Self(Arc::new(Mutex::new(Some(Box::new(callback)))))
	}

	/// Invokes the callback if it has not fired yet; returns whether it ran.
	pub fn fire(&self, value: T) -> bool {
		let callback = self.0.lock().take();

		match callback {
			Some(callback) => {
				callback(value);

				true
			},
			None => false,
		}
	}

	/// Returns true once the callback has been consumed.
	pub fn is_spent(&self) -> bool {
		self.0.lock().is_none()
	}
}
impl<T> Debug for CallbackToken<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CallbackToken").field(&if self.is_spent() { "spent" } else { "armed" }).finish()
	}
}

/// Terminal outcome of one authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
	/// The attempt produced a terminal response (success or failure).
	Completed(AuthorizationResponse),
	/// The external agent returned without a redirect payload.
	Cancelled,
}

/// Channel that ended up consuming a terminal outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryChannel {
	/// The success handle fired.
	Success,
	/// The failure handle fired.
	Failure,
	/// The completion handle fired.
	Completion,
	/// The cancellation handle fired.
	Cancellation,
}
impl DeliveryChannel {
	/// Returns a stable label suitable for logs and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DeliveryChannel::Success => "success",
			DeliveryChannel::Failure => "failure",
			DeliveryChannel::Completion => "completion",
			DeliveryChannel::Cancellation => "cancellation",
		}
	}
}
impl Display for DeliveryChannel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Up to four outward completion channels; at most one fires per attempt.
#[derive(Debug, Default)]
pub struct CallbackHandles {
	/// Fired for successful terminal responses.
	pub on_success: Option<CallbackToken<AuthorizationResponse>>,
	/// Fired for failed terminal responses.
	pub on_failure: Option<CallbackToken<AuthorizationResponse>>,
	/// Fired when neither the success nor the failure handle consumed the outcome.
	pub on_completion: Option<CallbackToken<AttemptOutcome>>,
	/// Fired when the agent returned without a redirect.
	pub on_cancellation: Option<CallbackToken<()>>,
}
impl CallbackHandles {
	/// Delivers a terminal response through exactly one channel.
	///
	/// Selection order: success handle (successful outcome only), failure
	/// handle (failed outcome only), completion handle, then `Err` hands the
	/// response back for direct return to the immediate caller.
	pub(crate) fn deliver(
		&self,
		response: AuthorizationResponse,
	) -> Result<DeliveryChannel, AuthorizationResponse> {
		let preferred = if response.is_success() {
			self.on_success.as_ref().map(|token| (token, DeliveryChannel::Success))
		} else {
			self.on_failure.as_ref().map(|token| (token, DeliveryChannel::Failure))
		};

		if let Some((token, channel)) = preferred
			&& token.fire(response.clone())
		{
			return Ok(channel);
		}
		if let Some(token) = self.on_completion.as_ref()
			&& token.fire(AttemptOutcome::Completed(response.clone()))
		{
			return Ok(DeliveryChannel::Completion);
		}

		Err(response)
	}

	/// Delivers a cancellation through the cancellation or completion channel.
	pub(crate) fn deliver_cancellation(&self) -> Option<DeliveryChannel> {
		if let Some(token) = self.on_cancellation.as_ref()
			&& token.fire(())
		{
			return Some(DeliveryChannel::Cancellation);
		}
		if let Some(token) = self.on_completion.as_ref()
			&& token.fire(AttemptOutcome::Cancelled)
		{
			return Some(DeliveryChannel::Completion);
		}

		None
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::error::{AuthorizationError, ErrorKind};

	fn failure() -> AuthorizationResponse {
		AuthorizationResponse::Failure {
			mcc_mnc: None,
			error: AuthorizationError::new(ErrorKind::ServerError),
		}
	}

	#[test]
	fn token_fires_exactly_once() {
		let count = Arc::new(AtomicUsize::new(0));
		let counting = count.clone();
		let token = CallbackToken::new(move |()| {
			counting.fetch_add(1, Ordering::SeqCst);
		});

		assert!(!token.is_spent());
		assert!(token.fire(()));
		assert!(!token.fire(()));
		assert!(token.is_spent());
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn failure_prefers_failure_handle_over_completion() {
		let fired = Arc::new(Mutex::new(Vec::new()));
		let failure_log = fired.clone();
		let completion_log = fired.clone();
		let handles = CallbackHandles {
			on_success: None,
			on_failure: Some(CallbackToken::new(move |_| failure_log.lock().push("failure"))),
			on_completion: Some(CallbackToken::new(move |_| {
				completion_log.lock().push("completion")
			})),
			on_cancellation: None,
		};
		let channel = handles.deliver(failure()).expect("Failure handle should consume.");

		assert_eq!(channel, DeliveryChannel::Failure);
		assert_eq!(*fired.lock(), ["failure"]);
	}

	#[test]
	fn spent_handle_falls_through_to_completion() {
		let handles = CallbackHandles {
			on_success: None,
			on_failure: Some(CallbackToken::new(|_| {})),
			on_completion: Some(CallbackToken::new(|_| {})),
			on_cancellation: None,
		};

		if let Some(token) = handles.on_failure.as_ref() {
			token.fire(failure());
		}

		let channel = handles.deliver(failure()).expect("Completion handle should consume.");

		assert_eq!(channel, DeliveryChannel::Completion);
	}

	#[test]
	fn no_handles_hands_the_response_back() {
		let handles = CallbackHandles::default();
		let response = handles.deliver(failure()).expect_err("Response should return directly.");

		assert!(!response.is_success());
		assert_eq!(handles.deliver_cancellation(), None);
	}

	#[test]
	fn cancellation_prefers_its_own_channel() {
		let fired = Arc::new(Mutex::new(Vec::new()));
		let cancel_log = fired.clone();
		let completion_log = fired.clone();
		let handles = CallbackHandles {
			on_success: None,
			on_failure: None,
			on_completion: Some(CallbackToken::new(move |_| {
				completion_log.lock().push("completion")
			})),
			on_cancellation: Some(CallbackToken::new(move |()| cancel_log.lock().push("cancel"))),
		};

		assert_eq!(handles.deliver_cancellation(), Some(DeliveryChannel::Cancellation));
		assert_eq!(*fired.lock(), ["cancel"]);
	}
}
