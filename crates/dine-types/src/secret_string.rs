//! Redacting string wrapper for gateway credentials.
//!
//! Auth tokens come out of the configuration file and must never show up in
//! logs, `Debug` dumps of the config or serialized config echoes. The value
//! is zeroed when dropped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Returns the secret itself. Only call this at the point of use
	/// (e.g. building an auth header) and never log the result.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_is_redacted_in_output() {
		let token = SecretString::from("twilio-auth-token");
		assert_eq!(format!("{:?}", token), "SecretString(***REDACTED***)");
		assert_eq!(token.to_string(), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&token).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_secret_is_readable_at_point_of_use() {
		let token: SecretString = serde_json::from_str("\"abc123\"").unwrap();
		assert_eq!(token.expose_secret(), "abc123");
		assert_eq!(token, SecretString::from("abc123"));
	}
}
