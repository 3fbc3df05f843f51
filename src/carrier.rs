//! Carrier identifiers and the host-side SIM lookup contract.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const MCC_LEN: usize = 3;
const MNC_MIN_LEN: usize = 2;
const MNC_MAX_LEN: usize = 3;

/// Mobile country code + mobile network code pair identifying a carrier.
///
/// The value is stored as the concatenated digit string the discovery endpoint
/// and redirect parameters use (`mccmnc`), validated to 5 or 6 ASCII digits.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MccMnc(String);
impl MccMnc {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, CarrierIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the three-digit mobile country code.
	pub fn mcc(&self) -> &str {
		&self.0[..MCC_LEN]
	}

	/// Returns the two- or three-digit mobile network code.
	pub fn mnc(&self) -> &str {
		&self.0[MCC_LEN..]
	}
}
impl Deref for MccMnc {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for MccMnc {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for MccMnc {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<MccMnc> for String {
	fn from(value: MccMnc) -> Self {
		value.0
	}
}
impl TryFrom<String> for MccMnc {
	type Error = CarrierIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for MccMnc {
	type Err = CarrierIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for MccMnc {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "MccMnc({})", self.0)
	}
}
impl Display for MccMnc {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate_view(view: &str) -> Result<(), CarrierIdError> {
	if view.is_empty() {
		return Err(CarrierIdError::Empty);
	}
	if !view.bytes().all(|b| b.is_ascii_digit()) {
		return Err(CarrierIdError::NonDigit);
	}
	if !(MCC_LEN + MNC_MIN_LEN..=MCC_LEN + MNC_MAX_LEN).contains(&view.len()) {
		return Err(CarrierIdError::BadLength { len: view.len() });
	}

	Ok(())
}

/// Host-side lookup for the carrier identifier of the active SIM.
///
/// Implemented outside this crate (telephony APIs, test fixtures). Returning
/// `None` is valid; discovery then resolves the subscriber server-side.
pub trait CarrierIdProvider
where
	Self: Send + Sync,
{
	/// Returns the current carrier identifier, if one can be read from the device.
	fn current(&self) -> Option<MccMnc>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn mcc_mnc_validates_digit_pairs() {
		let id = MccMnc::new("310260").expect("Six-digit identifier should be valid.");

		assert_eq!(id.mcc(), "310");
		assert_eq!(id.mnc(), "260");

		let id = MccMnc::new("23410").expect("Five-digit identifier should be valid.");

		assert_eq!(id.mcc(), "234");
		assert_eq!(id.mnc(), "10");
		assert_eq!(MccMnc::new(""), Err(CarrierIdError::Empty));
		assert_eq!(MccMnc::new("31026a"), Err(CarrierIdError::NonDigit));
		assert_eq!(MccMnc::new("3102"), Err(CarrierIdError::BadLength { len: 4 }));
		assert_eq!(MccMnc::new("3102600"), Err(CarrierIdError::BadLength { len: 7 }));
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: MccMnc =
			serde_json::from_str("\"310260\"").expect("Identifier should deserialize.");

		assert_eq!(id.as_ref(), "310260");
		assert!(serde_json::from_str::<MccMnc>("\"not-digits\"").is_err());
		assert_eq!(
			serde_json::to_string(&id).expect("Identifier should serialize."),
			"\"310260\""
		);
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<MccMnc, u8> = HashMap::from_iter([(
			MccMnc::new("310260").expect("Identifier used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("310260"), Some(&7));
	}
}
