// self
use carrier_auth_broker::{
	_preludet::*,
	request::AuthorizationRequest,
	response::{AuthorizationResponse, RedirectParams, map_error_code},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse redirect fixture URL.")
}

#[test]
fn redirect_params_extract_only_known_parameters() {
	let params = RedirectParams::from_uri(&url(
		"com.example.app://callback?code=c-1&state=s-1&mccmnc=310260\
		&login_hint_token=hint-1&unknown=ignored",
	));

	assert_eq!(params.code.as_deref(), Some("c-1"));
	assert_eq!(params.state.as_deref(), Some("s-1"));
	assert_eq!(params.error, None);
	assert_eq!(params.mcc_mnc.as_deref(), Some("310260"));
	assert_eq!(params.login_hint_token.as_deref(), Some("hint-1"));
}

#[test]
fn redirect_params_drop_an_invalid_carrier_identifier() {
	let params = RedirectParams::from_uri(&url("com.example.app://callback?mccmnc=not-digits"));

	assert_eq!(params.mcc_mnc, None);
}

#[test]
fn redirect_params_decode_percent_encoded_values() {
	let params = RedirectParams::from_uri(&url(
		"com.example.app://callback?error=access_denied&error_description=User%20declined",
	));

	assert_eq!(params.error.as_deref(), Some("access_denied"));
	assert_eq!(params.error_description.as_deref(), Some("User declined"));
	assert!(!params.is_user_not_found());

	let params = RedirectParams::from_uri(&url("com.example.app://callback?error=user_not_found"));

	assert!(params.is_user_not_found());
}

#[test]
fn error_codes_classify_through_the_fixed_tables() {
	assert_eq!(map_error_code("invalid_request", None).kind, ErrorKind::InvalidConfiguration);
	assert_eq!(map_error_code("invalid_request_object", None).kind, ErrorKind::InvalidRequest);
	assert_eq!(map_error_code("network_failure", None).kind, ErrorKind::NetworkFailure);
	assert_eq!(map_error_code("authentication_timed_out", None).kind, ErrorKind::RequestTimeout);

	let unmatched = map_error_code("something_else", None);

	assert_eq!(unmatched.kind, ErrorKind::Unknown);
	assert_eq!(unmatched.description.as_deref(), Some("something_else"));
}

#[test]
fn from_redirect_prefers_the_error_parameter_over_the_code() {
	let (request, _) = AuthorizationRequest::builder(
		"client-1",
		url("com.example.app://callback"),
	)
	.state("s-1")
	.build();
	let response = AuthorizationResponse::from_redirect(
		&request,
		None,
		&url("com.example.app://callback?code=c-1&error=access_denied&state=s-1"),
	);
	let error = response.error().expect("The error parameter must win.");

	assert_eq!(error.kind, ErrorKind::RequestDenied);
}

#[test]
fn responses_serialize_with_a_tagged_outcome() {
	let response = AuthorizationResponse::Failure {
		mcc_mnc: None,
		error: AuthorizationError::with_description(ErrorKind::ServerError, "maintenance"),
	};
	let json = serde_json::to_string(&response).expect("Response should serialize.");

	assert!(json.contains("\"outcome\":\"failure\""));
	assert!(json.contains("\"server_error\""));

	let restored: AuthorizationResponse =
		serde_json::from_str(&json).expect("Response should deserialize.");

	assert_eq!(restored, response);
}
