//! Phone number normalization.
//!
//! Sessions and orders are keyed by the customer's number in E.164 form with
//! a leading `+`, so every number entering the system goes through here first.

/// Channel prefixes the gateway puts in front of sender numbers.
const CHANNEL_PREFIXES: [&str; 2] = ["whatsapp:", "sms:"];

/// Removes a transport prefix such as `whatsapp:` from a sender address.
pub fn strip_channel_prefix(raw: &str) -> &str {
	let trimmed = raw.trim();
	CHANNEL_PREFIXES
		.iter()
		.find_map(|prefix| trimmed.strip_prefix(prefix))
		.unwrap_or(trimmed)
		.trim()
}

/// Normalizes a phone number to always start with `+`.
///
/// `"919876543210"`, `"+919876543210"` and `"whatsapp:+919876543210"` all
/// map to `"+919876543210"`.
pub fn normalize_phone(raw: &str) -> String {
	let number = strip_channel_prefix(raw);
	if number.starts_with('+') {
		number.to_string()
	} else {
		format!("+{}", number)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_plus_is_added() {
		assert_eq!(normalize_phone("919876543210"), "+919876543210");
		assert_eq!(normalize_phone("+919876543210"), "+919876543210");
	}

	#[test]
	fn test_channel_prefix_is_removed() {
		assert_eq!(normalize_phone("whatsapp:+919876543210"), "+919876543210");
		assert_eq!(normalize_phone(" whatsapp:919876543210 "), "+919876543210");
		assert_eq!(strip_channel_prefix("sms:+1555"), "+1555");
	}
}
