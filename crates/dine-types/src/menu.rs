//! Menu item types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dish or drink that customers can order.
///
/// Items are never deleted; staff toggle `is_available` instead so that
/// existing orders keep pointing at a valid record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
	/// Stable positive identifier.
	pub id: u64,
	pub name: String,
	pub description: String,
	/// Unit price, never negative.
	pub price: Decimal,
	#[serde(default = "default_available")]
	pub is_available: bool,
}

/// Payload for creating a menu item. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMenuItem {
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub price: Decimal,
	#[serde(default = "default_available")]
	pub is_available: bool,
}

impl NewMenuItem {
	/// Checks the fields that the type system cannot.
	pub fn validate(&self) -> Result<(), String> {
		if self.name.trim().is_empty() {
			return Err("Menu item name cannot be empty".into());
		}
		if self.price < Decimal::ZERO {
			return Err(format!("Price cannot be negative: {}", self.price));
		}
		Ok(())
	}

	/// Builds the stored record once an id has been allocated.
	pub fn into_item(self, id: u64) -> MenuItem {
		MenuItem {
			id,
			name: self.name,
			description: self.description,
			price: self.price,
			is_available: self.is_available,
		}
	}
}

/// Partial update for a menu item. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemUpdate {
	pub name: Option<String>,
	pub description: Option<String>,
	pub price: Option<Decimal>,
	pub is_available: Option<bool>,
}

impl MenuItemUpdate {
	pub fn validate(&self) -> Result<(), String> {
		if let Some(name) = &self.name {
			if name.trim().is_empty() {
				return Err("Menu item name cannot be empty".into());
			}
		}
		if let Some(price) = self.price {
			if price < Decimal::ZERO {
				return Err(format!("Price cannot be negative: {}", price));
			}
		}
		Ok(())
	}

	/// Applies every present field to `item`.
	pub fn apply(self, item: &mut MenuItem) {
		if let Some(name) = self.name {
			item.name = name;
		}
		if let Some(description) = self.description {
			item.description = description;
		}
		if let Some(price) = self.price {
			item.price = price;
		}
		if let Some(is_available) = self.is_available {
			item.is_available = is_available;
		}
	}
}

fn default_available() -> bool {
	true
}
