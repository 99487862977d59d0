//! Per-customer conversation session types.

use crate::OrderItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a customer currently is in the chat flow.
///
/// Persisted as a plain string. A string that does not name a known state
/// (older data, manual edits) loads as `Unrecognized` so the conversation
/// handler can reset it instead of failing to read the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationState {
	#[default]
	MainMenu,
	ViewingMenu,
	PlacingOrder,
	ConfirmingOrder,
	CancelingOrder,
	Unrecognized(String),
}

impl ConversationState {
	pub fn as_str(&self) -> &str {
		match self {
			ConversationState::MainMenu => "main_menu",
			ConversationState::ViewingMenu => "viewing_menu",
			ConversationState::PlacingOrder => "placing_order",
			ConversationState::ConfirmingOrder => "confirming_order",
			ConversationState::CancelingOrder => "canceling_order",
			ConversationState::Unrecognized(raw) => raw,
		}
	}
}

impl From<String> for ConversationState {
	fn from(raw: String) -> Self {
		match raw.as_str() {
			"main_menu" => ConversationState::MainMenu,
			"viewing_menu" => ConversationState::ViewingMenu,
			"placing_order" => ConversationState::PlacingOrder,
			"confirming_order" => ConversationState::ConfirmingOrder,
			"canceling_order" => ConversationState::CancelingOrder,
			_ => ConversationState::Unrecognized(raw),
		}
	}
}

impl From<ConversationState> for String {
	fn from(state: ConversationState) -> Self {
		match state {
			ConversationState::Unrecognized(raw) => raw,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for ConversationState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An action the customer was asked to confirm on the previous message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
	/// Waiting for YES/NO before cancelling this order.
	CancelOrder { order_id: u64 },
}

/// Conversation context for one customer, keyed by normalized phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSession {
	pub phone: String,
	#[serde(default)]
	pub state: ConversationState,
	/// Items picked but not yet confirmed.
	#[serde(default)]
	pub cart: Vec<OrderItem>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pending_action: Option<PendingAction>,
	pub last_interaction: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	/// Ids of orders created from this session. Informational only; the
	/// order store is authoritative.
	#[serde(default)]
	pub order_history: Vec<u64>,
}

impl CustomerSession {
	/// A fresh session in the main menu with an empty cart.
	pub fn new(phone: impl Into<String>, now: DateTime<Utc>) -> Self {
		Self {
			phone: phone.into(),
			state: ConversationState::MainMenu,
			cart: Vec::new(),
			pending_action: None,
			last_interaction: now,
			customer_name: None,
			order_history: Vec::new(),
		}
	}
}
