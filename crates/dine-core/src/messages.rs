//! Chat message texts.
//!
//! Messages use WhatsApp markup: `*bold*` and `_italic_`.

use dine_order::{MenuSnapshot, PricedLine, ValidationFailure};
use dine_types::{Order, OrderStatus};
use rust_decimal::Decimal;
use std::fmt::Write;

const ACTIVE_ORDERS_SHOWN: usize = 5;
const PAST_ORDERS_SHOWN: usize = 3;

/// Which error text to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	InvalidOption,
	InvalidOrder,
	ItemUnavailable,
	General,
}

/// Renders every customer-facing message.
#[derive(Debug, Clone)]
pub struct Messages {
	business_name: String,
	currency_symbol: String,
}

impl Messages {
	pub fn new(business_name: impl Into<String>, currency_symbol: impl Into<String>) -> Self {
		Self {
			business_name: business_name.into(),
			currency_symbol: currency_symbol.into(),
		}
	}

	fn price(&self, amount: Decimal) -> String {
		format!("{}{:.2}", self.currency_symbol, amount)
	}

	pub fn main_menu(&self) -> String {
		format!(
			"🍕 *Welcome to {}!*\n\n\
			 Please choose an option:\n\
			 1️⃣ View Menu\n\
			 2️⃣ Place Order\n\
			 3️⃣ Check Order Status\n\
			 4️⃣ Cancel Order\n\n\
			 Reply with *1*, *2*, *3*, or *4*",
			self.business_name
		)
	}

	pub fn menu_listing(&self, menu: &MenuSnapshot) -> String {
		let mut message = String::from("📋 *Our Menu:*\n\n");
		if menu.is_empty() {
			message.push_str("_Nothing on the menu right now._\n");
		}
		for item in menu.items() {
			let status = if item.is_available { "✅" } else { "❌ Sold Out" };
			let _ = writeln!(
				message,
				"{}. *{}* - {} {}",
				item.id,
				item.name,
				self.price(item.price),
				status
			);
			if item.description.is_empty() {
				message.push('\n');
			} else {
				let _ = writeln!(message, "   _{}_\n", item.description);
			}
		}
		message.push_str("\nReply *ORDER* to place an order");
		message.push_str("\nReply *BACK* for main menu");
		message
	}

	pub fn order_instructions(&self) -> String {
		"🛒 *Ready to Order!*\n\n\
		 Send me item numbers and quantities like this:\n\
		 *1x2, 3x1*\n\
		 (2 of item 1 and 1 of item 3)\n\n\
		 Example formats:\n\
		 • 1x2 (2 of item 1)\n\
		 • 1x1, 3x2 (1 of item 1, 2 of item 3)\n\
		 • 2x1, 4x1, 3x2 (multiple items)\n\n\
		 Reply *BACK* to return to menu"
			.to_string()
	}

	pub fn order_summary(&self, lines: &[PricedLine], total: Decimal) -> String {
		let mut message = String::from("🛒 *Order Summary:*\n\n");
		for line in lines {
			let _ = writeln!(
				message,
				"• {}x *{}* - {}",
				line.quantity,
				line.name,
				self.price(line.line_total)
			);
		}
		let _ = writeln!(message, "\n💰 *Total: {}*", self.price(total));
		message.push_str("\nReply *CONFIRM* to place order");
		message.push_str("\nReply *CANCEL* to start over");
		message
	}

	/// The customer's most recent active and past orders. `orders` is oldest
	/// first.
	pub fn order_status(&self, orders: &[Order]) -> String {
		if orders.is_empty() {
			return "📦 *Your Orders*\n\n\
			        You have no orders yet.\n\n\
			        Reply *2* to place a new order!"
				.to_string();
		}

		let (active, past): (Vec<&Order>, Vec<&Order>) =
			orders.iter().partition(|order| order.status.is_active());

		let mut message = String::from("📦 *Your Orders*\n\n");
		if !active.is_empty() {
			message.push_str("🟢 *Active Orders:*\n");
			for order in last_n(&active, ACTIVE_ORDERS_SHOWN) {
				let _ = writeln!(
					message,
					"{} #{} - {} - {}",
					status_emoji(order.status),
					order.id,
					order.status.label(),
					self.price(order.total_price)
				);
			}
			message.push('\n');
		}
		if !past.is_empty() {
			message.push_str("📜 *Past Orders:*\n");
			for order in last_n(&past, PAST_ORDERS_SHOWN) {
				let _ = writeln!(
					message,
					"{} #{} - {} - {}",
					status_emoji(order.status),
					order.id,
					order.status.label(),
					self.price(order.total_price)
				);
			}
		}
		message.push_str("\nReply *BACK* for main menu");
		message
	}

	pub fn cancel_prompt(&self, order: &Order, menu: &MenuSnapshot) -> String {
		let mut message = format!(
			"⚠️ *Cancel Order?*\n\n\
			 Order ID: #{}\n\
			 Status: {}\n\
			 Total: {}\n\n\
			 Items:\n",
			order.id,
			order.status.label(),
			self.price(order.total_price)
		);
		message.push_str(&item_bullets(order, menu));
		message.push_str("\n\nReply *YES* to cancel this order");
		message.push_str("\nReply *NO* to keep it");
		message
	}

	pub fn no_active_orders(&self) -> String {
		"❌ *No Active Orders*\n\n\
		 You have no active orders to cancel.\n\n\
		 Reply *BACK* for main menu"
			.to_string()
	}

	pub fn error(&self, kind: ErrorKind) -> String {
		match kind {
			ErrorKind::InvalidOption => "❌ *Invalid Option*\n\n\
				 Please reply with *1*, *2*, *3*, or *4*\n\n\
				 Or reply *HI* to see the main menu"
				.to_string(),
			ErrorKind::InvalidOrder => "❌ *Invalid Order Format*\n\n\
				 Please send items like: *1x2, 3x1*\n\n\
				 Example: 1x2 (2 of item 1)\n\n\
				 Reply *BACK* to return"
				.to_string(),
			ErrorKind::ItemUnavailable => "❌ *Item Unavailable*\n\n\
				 Some items you selected are not available.\n\
				 Please check the menu and try again.\n\n\
				 Reply *1* to view menu"
				.to_string(),
			ErrorKind::General => "❌ *Oops!*\n\n\
				 Something went wrong. Please try again.\n\n\
				 Reply *HI* for main menu"
				.to_string(),
		}
	}

	/// Item error naming the offending line.
	pub fn validation_error(&self, failure: &ValidationFailure) -> String {
		match failure {
			ValidationFailure::NoItems => self.error(ErrorKind::InvalidOrder),
			ValidationFailure::ItemNotFound(id) => format!(
				"❌ *Item Unavailable*\n\n\
				 Item #{} does not exist.\n\
				 Please check the menu and try again.\n\n\
				 Reply *1* to view menu",
				id
			),
			ValidationFailure::ItemUnavailable { name, .. } => format!(
				"❌ *Item Unavailable*\n\n\
				 {} is currently unavailable.\n\
				 Please check the menu and try again.\n\n\
				 Reply *1* to view menu",
				name
			),
			ValidationFailure::TotalTooLarge => "❌ *Order Too Large*\n\n\
				 That order adds up to more than we can take.\n\
				 Please order smaller quantities.\n\n\
				 Reply *HI* for main menu"
				.to_string(),
		}
	}

	pub fn empty_cart(&self) -> String {
		"❌ Your cart is empty! Reply *HI* to start over.".to_string()
	}

	pub fn order_confirmation(&self, order: &Order, menu: &MenuSnapshot) -> String {
		format!(
			"✅ *Order Confirmed!*\n\n\
			 Order ID: #{}\n\
			 {}\n\
			 Total: {}\n\n\
			 Status: {}\n\
			 We'll notify you with updates!\n\n\
			 Reply *HI* anytime to see the main menu.",
			order.id,
			item_bullets(order, menu),
			self.price(order.total_price),
			order.status.label()
		)
	}

	pub fn status_update(&self, order: &Order) -> String {
		let status = match order.status {
			OrderStatus::Pending => "⏳ Your order is pending",
			OrderStatus::Preparing => "👨‍🍳 Your order is being prepared",
			OrderStatus::OutForDelivery => "🚚 Your order is out for delivery!",
			OrderStatus::Delivered => "✅ Your order has been delivered!",
			OrderStatus::Cancelled => "❌ Your order has been cancelled",
		};
		format!(
			"📦 *Order Update*\n\n\
			 Order ID: #{}\n\
			 Status: {}\n\n\
			 Reply *3* to check all your orders.",
			order.id, status
		)
	}

	pub fn cancellation_notice(&self, order_id: u64) -> String {
		format!(
			"❌ *Order Cancelled*\n\n\
			 Order ID: #{}\n\
			 Your order has been cancelled successfully.\n\n\
			 Reply *HI* to place a new order.",
			order_id
		)
	}

	/// Sent when a customer confirms cancelling an order that was delivered
	/// in the meantime.
	pub fn already_delivered(&self, order_id: u64) -> String {
		format!(
			"📦 *Order Already Delivered*\n\n\
			 Order ID: #{}\n\
			 This order has already been delivered and can no longer be cancelled.\n\n\
			 Reply *HI* for main menu",
			order_id
		)
	}
}

fn status_emoji(status: OrderStatus) -> &'static str {
	match status {
		OrderStatus::Pending => "⏳",
		OrderStatus::Preparing => "👨‍🍳",
		OrderStatus::OutForDelivery => "🚚",
		OrderStatus::Delivered => "✅",
		OrderStatus::Cancelled => "❌",
	}
}

fn last_n<'a, T>(items: &'a [T], n: usize) -> &'a [T] {
	&items[items.len().saturating_sub(n)..]
}

/// `• 2x Margherita Pizza` lines for an order, skipping items no longer on
/// the menu.
fn item_bullets(order: &Order, menu: &MenuSnapshot) -> String {
	menu.describe_lines(&order.items)
		.iter()
		.map(|line| format!("• {}x {}", line.quantity, line.name))
		.collect::<Vec<_>>()
		.join("\n")
}
