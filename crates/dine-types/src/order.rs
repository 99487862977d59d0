//! Order types and the order status lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One line of a cart or order: a menu item and how many of it.
///
/// Lines are never merged, so the same `menu_item_id` may appear more than
/// once in a single cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
	pub menu_item_id: u64,
	pub quantity: u32,
}

impl OrderItem {
	pub fn new(menu_item_id: u64, quantity: u32) -> Self {
		Self {
			menu_item_id,
			quantity,
		}
	}
}

/// Lifecycle status of an order.
///
/// Orders move forward through `Pending -> Preparing -> OutForDelivery ->
/// Delivered`, or to `Cancelled` from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
	Pending,
	Preparing,
	OutForDelivery,
	Delivered,
	Cancelled,
}

impl OrderStatus {
	pub const ALL: [OrderStatus; 5] = [
		OrderStatus::Pending,
		OrderStatus::Preparing,
		OrderStatus::OutForDelivery,
		OrderStatus::Delivered,
		OrderStatus::Cancelled,
	];

	/// Wire name, as stored and accepted by the API.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Preparing => "preparing",
			OrderStatus::OutForDelivery => "out-for-delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Human readable name used in chat messages.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::Preparing => "Preparing",
			OrderStatus::OutForDelivery => "Out For Delivery",
			OrderStatus::Delivered => "Delivered",
			OrderStatus::Cancelled => "Cancelled",
		}
	}

	/// Delivered and cancelled orders never change again.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}

	/// An active order is one the customer can still cancel.
	pub fn is_active(&self) -> bool {
		!self.is_terminal()
	}

	/// Checks whether moving from `self` to `next` respects the lifecycle.
	///
	/// Patching an order to the status it already has is accepted.
	pub fn can_transition_to(&self, next: OrderStatus) -> bool {
		if *self == next {
			return true;
		}
		if self.is_terminal() {
			return false;
		}
		match next {
			OrderStatus::Cancelled => true,
			_ => next.rank() > self.rank(),
		}
	}

	fn rank(&self) -> u8 {
		match self {
			OrderStatus::Pending => 0,
			OrderStatus::Preparing => 1,
			OrderStatus::OutForDelivery => 2,
			OrderStatus::Delivered => 3,
			OrderStatus::Cancelled => 4,
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a status string is not one of the five known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status '{0}'. Allowed: pending, preparing, out-for-delivery, delivered, cancelled")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// A confirmed customer order.
///
/// `total_price` is computed once at creation from the menu prices of that
/// moment and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	pub id: u64,
	/// Normalized phone number, always with a leading `+`.
	pub customer_phone: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	pub items: Vec<OrderItem>,
	pub status: OrderStatus,
	pub total_price: Decimal,
	pub created_at: DateTime<Utc>,
}

/// Everything needed to create an order; id, status and timestamp are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
	pub customer_phone: String,
	pub customer_name: Option<String>,
	pub items: Vec<OrderItem>,
	pub total_price: Decimal,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_wire_names() {
		assert_eq!(
			serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(),
			"\"out-for-delivery\""
		);
		assert_eq!(
			"out-for-delivery".parse::<OrderStatus>().unwrap(),
			OrderStatus::OutForDelivery
		);
		assert!("shipped".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_forward_only_transitions() {
		assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
		assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
		assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
		assert!(!OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Pending));
		assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
		assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
		assert!(OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
	}

	#[test]
	fn test_active_statuses() {
		let active: Vec<_> = OrderStatus::ALL
			.into_iter()
			.filter(OrderStatus::is_active)
			.collect();
		assert_eq!(
			active,
			vec![
				OrderStatus::Pending,
				OrderStatus::Preparing,
				OrderStatus::OutForDelivery
			]
		);
	}
}
