//! Storage namespaces.

use std::str::FromStr;

/// Logical collections kept by the store.
///
/// Keys are written as `<namespace>:<id>`; the namespace is also what the
/// file backend uses to look up per-collection TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Menu items keyed by numeric id.
	Menu,
	/// Orders (with their item lines) keyed by numeric id.
	Orders,
	/// Customer sessions keyed by normalized phone number.
	Sessions,
	/// Id counters for the other collections.
	Sequences,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Menu => "menu",
			StorageKey::Orders => "orders",
			StorageKey::Sessions => "sessions",
			StorageKey::Sequences => "sequences",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Menu, Self::Orders, Self::Sessions, Self::Sequences].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_namespace_names_parse_back() {
		for key in StorageKey::all() {
			assert_eq!(key.as_str().parse::<StorageKey>(), Ok(key));
		}
		assert!("intents".parse::<StorageKey>().is_err());
	}
}
