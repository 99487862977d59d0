//! Order and cart logic for the dine ordering system.
//!
//! Customers type orders as `<item id>x<quantity>` tokens, for example
//! `1x2, 3x1`. This crate turns that text into order lines, checks the lines
//! against a menu snapshot and prices them. It never touches storage: callers
//! load a fresh [`MenuSnapshot`] per request and persist the result themselves.

use dine_types::{MenuItem, OrderItem};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a list of order lines cannot be turned into an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
	#[error("no valid items")]
	NoItems,
	#[error("item {0} does not exist")]
	ItemNotFound(u64),
	#[error("{name} is currently unavailable")]
	ItemUnavailable { id: u64, name: String },
	#[error("order total is too large")]
	TotalTooLarge,
}

static ORDER_TOKEN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(\d+)x(\d+)").expect("order token pattern is valid"));

/// Extracts order lines from free text.
///
/// Every non-overlapping `<id>x<qty>` token becomes one line, left to right.
/// Matching is case-insensitive and everything else in the text is ignored.
/// Repeated ids stay separate lines. Tokens with a zero quantity or numbers
/// too large to represent are dropped.
pub fn parse_order(text: &str) -> Vec<OrderItem> {
	let lowered = text.to_lowercase();
	ORDER_TOKEN
		.captures_iter(&lowered)
		.filter_map(|cap| {
			let id = cap[1].parse::<u64>().ok()?;
			let quantity = cap[2].parse::<u32>().ok().filter(|q| *q > 0)?;
			Some(OrderItem::new(id, quantity))
		})
		.collect()
}

/// One priced order line, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
	pub menu_item_id: u64,
	pub name: String,
	pub quantity: u32,
	pub unit_price: Decimal,
	pub line_total: Decimal,
}

/// The menu as read at the start of a request.
#[derive(Debug, Clone, Default)]
pub struct MenuSnapshot {
	items: BTreeMap<u64, MenuItem>,
}

impl MenuSnapshot {
	pub fn new(items: impl IntoIterator<Item = MenuItem>) -> Self {
		Self {
			items: items.into_iter().map(|item| (item.id, item)).collect(),
		}
	}

	pub fn get(&self, id: u64) -> Option<&MenuItem> {
		self.items.get(&id)
	}

	/// All items in id order.
	pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
		self.items.values()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	fn lookup(&self, id: u64) -> Result<&MenuItem, ValidationFailure> {
		self.get(id).ok_or(ValidationFailure::ItemNotFound(id))
	}

	/// Checks that `lines` is non-empty and only names available items.
	///
	/// The first offending line decides the failure.
	pub fn validate(&self, lines: &[OrderItem]) -> Result<(), ValidationFailure> {
		if lines.is_empty() {
			return Err(ValidationFailure::NoItems);
		}
		for line in lines {
			let item = self.lookup(line.menu_item_id)?;
			if !item.is_available {
				return Err(ValidationFailure::ItemUnavailable {
					id: item.id,
					name: item.name.clone(),
				});
			}
		}
		Ok(())
	}

	/// Prices every line at the current menu price.
	///
	/// Availability is not checked here; an unknown id is still an error, and
	/// so is a line total that does not fit a `Decimal`.
	pub fn price_lines(&self, lines: &[OrderItem]) -> Result<Vec<PricedLine>, ValidationFailure> {
		lines
			.iter()
			.map(|line| {
				let item = self.lookup(line.menu_item_id)?;
				let line_total = item
					.price
					.checked_mul(Decimal::from(line.quantity))
					.ok_or(ValidationFailure::TotalTooLarge)?;
				Ok(PricedLine {
					menu_item_id: item.id,
					name: item.name.clone(),
					quantity: line.quantity,
					unit_price: item.price,
					line_total,
				})
			})
			.collect()
	}

	/// Sum of price times quantity over all lines.
	pub fn total(&self, lines: &[OrderItem]) -> Result<Decimal, ValidationFailure> {
		sum_lines(&self.price_lines(lines)?)
	}

	/// Prices lines for display without failing on ids that have since
	/// vanished from the menu. Such lines are skipped.
	pub fn describe_lines(&self, lines: &[OrderItem]) -> Vec<PricedLine> {
		lines
			.iter()
			.filter_map(|line| match self.price_lines(std::slice::from_ref(line)) {
				Ok(mut priced) => priced.pop(),
				Err(e) => {
					tracing::debug!(menu_item_id = line.menu_item_id, error = %e, "Skipping unpriceable order line");
					None
				},
			})
			.collect()
	}
}

/// Adds up line totals, failing instead of overflowing.
pub fn sum_lines(lines: &[PricedLine]) -> Result<Decimal, ValidationFailure> {
	lines.iter().try_fold(Decimal::ZERO, |acc, line| {
		acc.checked_add(line.line_total)
			.ok_or(ValidationFailure::TotalTooLarge)
	})
}

/// Validates `lines` against `menu`.
pub fn validate_items(lines: &[OrderItem], menu: &MenuSnapshot) -> Result<(), ValidationFailure> {
	menu.validate(lines)
}

/// Totals `lines` at the prices in `menu`.
pub fn compute_total(lines: &[OrderItem], menu: &MenuSnapshot) -> Result<Decimal, ValidationFailure> {
	menu.total(lines)
}
