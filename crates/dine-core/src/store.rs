//! Typed persistence for menu items, orders and customer sessions.
//!
//! Every call reads from storage; nothing is cached between requests. Id
//! allocation and order rewrites are serialized per collection so concurrent
//! webhook deliveries and staff requests cannot hand out the same id or lose
//! a status change.

use chrono::Utc;
use dine_order::MenuSnapshot;
use dine_storage::{StorageError, StorageService};
use dine_types::{
	CustomerSession, MenuItem, MenuItemUpdate, NewMenuItem, NewOrder, Order, OrderStatus,
	StorageKey,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Menu item {0} not found")]
	MenuItemNotFound(u64),
	#[error("Order {0} not found")]
	OrderNotFound(u64),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Invalid record: {0}")]
	Invalid(String),
}

impl From<StorageError> for StoreError {
	fn from(e: StorageError) -> Self {
		StoreError::Storage(e.to_string())
	}
}

/// Result of a status change request.
#[derive(Debug, Clone)]
pub struct StatusChange {
	pub order: Order,
	pub previous: OrderStatus,
}

impl StatusChange {
	pub fn changed(&self) -> bool {
		self.previous != self.order.status
	}
}

pub struct Store {
	storage: Arc<StorageService>,
	/// Held while allocating a menu id and writing the new item.
	menu_lock: Mutex<()>,
	/// Held for every order write.
	orders_lock: Mutex<()>,
}

impl Store {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			menu_lock: Mutex::new(()),
			orders_lock: Mutex::new(()),
		}
	}

	/// Seeds the menu when it is empty. Safe to call on every start.
	///
	/// Returns how many items were written.
	pub async fn initialize(&self, seed: Vec<NewMenuItem>) -> Result<usize, StoreError> {
		let existing: Vec<(String, MenuItem)> = self.storage.list(StorageKey::Menu.as_str()).await?;
		if !existing.is_empty() {
			tracing::debug!(items = existing.len(), "Menu already present, skipping seed");
			return Ok(0);
		}

		let count = seed.len();
		for item in seed {
			self.add_menu_item(item).await?;
		}
		tracing::info!(items = count, "Seeded menu");
		Ok(count)
	}

	/// Allocates the next id for `collection`.
	///
	/// The counter lives under `sequences:<collection>`. When it is missing
	/// (fresh store or data copied in by hand) it starts from the highest id
	/// already present. The counter is written before the record, so a crash
	/// in between leaves a gap instead of a reused id. Callers hold the
	/// collection lock.
	async fn next_id(&self, collection: StorageKey) -> Result<u64, StoreError> {
		let sequences = StorageKey::Sequences.as_str();
		let last = match self
			.storage
			.retrieve_optional::<u64>(sequences, collection.as_str())
			.await?
		{
			Some(last) => last,
			None => self
				.storage
				.list::<serde_json::Value>(collection.as_str())
				.await?
				.into_iter()
				.filter_map(|(id, _)| id.parse::<u64>().ok())
				.max()
				.unwrap_or(0),
		};

		let next = last
			.checked_add(1)
			.ok_or_else(|| StoreError::Invalid(format!("{} id space exhausted", collection.as_str())))?;
		self.storage
			.store(sequences, collection.as_str(), &next)
			.await?;
		Ok(next)
	}

	// Menu

	/// All menu items ordered by id.
	pub async fn list_menu(&self) -> Result<Vec<MenuItem>, StoreError> {
		let mut items: Vec<MenuItem> = self
			.storage
			.list(StorageKey::Menu.as_str())
			.await?
			.into_iter()
			.map(|(_, item)| item)
			.collect();
		items.sort_by_key(|item: &MenuItem| item.id);
		Ok(items)
	}

	pub async fn menu_snapshot(&self) -> Result<MenuSnapshot, StoreError> {
		Ok(MenuSnapshot::new(self.list_menu().await?))
	}

	pub async fn get_menu_item(&self, id: u64) -> Result<Option<MenuItem>, StoreError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Menu.as_str(), &id.to_string())
			.await?)
	}

	pub async fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StoreError> {
		item.validate().map_err(StoreError::Invalid)?;

		let _guard = self.menu_lock.lock().await;
		let id = self.next_id(StorageKey::Menu).await?;
		let item = item.into_item(id);
		self.storage
			.store(StorageKey::Menu.as_str(), &id.to_string(), &item)
			.await?;
		tracing::info!(menu_item_id = id, name = %item.name, "Added menu item");
		Ok(item)
	}

	/// Applies a partial update. Existing orders are unaffected because their
	/// totals were fixed when they were placed.
	pub async fn update_menu_item(
		&self,
		id: u64,
		update: MenuItemUpdate,
	) -> Result<MenuItem, StoreError> {
		update.validate().map_err(StoreError::Invalid)?;

		let _guard = self.menu_lock.lock().await;
		let mut item = self
			.get_menu_item(id)
			.await?
			.ok_or(StoreError::MenuItemNotFound(id))?;
		update.apply(&mut item);
		self.storage
			.update(StorageKey::Menu.as_str(), &id.to_string(), &item)
			.await?;
		Ok(item)
	}

	// Orders

	/// All orders ordered by id, oldest first.
	pub async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
		let mut orders: Vec<Order> = self
			.storage
			.list(StorageKey::Orders.as_str())
			.await?
			.into_iter()
			.map(|(_, order)| order)
			.collect();
		orders.sort_by_key(|order: &Order| order.id);
		Ok(orders)
	}

	pub async fn get_order(&self, id: u64) -> Result<Option<Order>, StoreError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Orders.as_str(), &id.to_string())
			.await?)
	}

	/// Persists a new pending order with its lines as one record.
	pub async fn add_order(&self, new_order: NewOrder) -> Result<Order, StoreError> {
		if new_order.items.is_empty() {
			return Err(StoreError::Invalid("order has no items".into()));
		}

		let _guard = self.orders_lock.lock().await;
		let id = self.next_id(StorageKey::Orders).await?;
		let order = Order {
			id,
			customer_phone: new_order.customer_phone,
			customer_name: new_order.customer_name,
			items: new_order.items,
			status: OrderStatus::Pending,
			total_price: new_order.total_price,
			created_at: Utc::now(),
		};
		self.storage
			.store(StorageKey::Orders.as_str(), &id.to_string(), &order)
			.await?;
		tracing::info!(order_id = id, customer = %order.customer_phone, total = %order.total_price, "Created order");
		Ok(order)
	}

	/// Loads an order, lets `updater` change it and writes it back.
	pub async fn update_order_with<F>(&self, id: u64, updater: F) -> Result<Order, StoreError>
	where
		F: FnOnce(&mut Order) -> Result<(), StoreError>,
	{
		let _guard = self.orders_lock.lock().await;
		let mut order = self
			.get_order(id)
			.await?
			.ok_or(StoreError::OrderNotFound(id))?;
		updater(&mut order)?;
		self.storage
			.update(StorageKey::Orders.as_str(), &id.to_string(), &order)
			.await?;
		Ok(order)
	}

	/// Moves an order to `status` if the lifecycle allows it.
	///
	/// Asking for the current status succeeds without rewriting anything
	/// meaningful; check [`StatusChange::changed`].
	pub async fn set_order_status(
		&self,
		id: u64,
		status: OrderStatus,
	) -> Result<StatusChange, StoreError> {
		let mut previous = status;
		let order = self
			.update_order_with(id, |order| {
				previous = order.status;
				if !order.status.can_transition_to(status) {
					return Err(StoreError::InvalidTransition {
						from: order.status,
						to: status,
					});
				}
				order.status = status;
				Ok(())
			})
			.await?;
		if previous != status {
			tracing::info!(order_id = id, from = %previous, to = %status, "Order status changed");
		}
		Ok(StatusChange { order, previous })
	}

	/// Marks an order cancelled regardless of its current status.
	///
	/// Returns `None` when the order does not exist. Guarding against
	/// cancelling delivered orders is up to the caller.
	pub async fn cancel_order(&self, id: u64) -> Result<Option<Order>, StoreError> {
		match self
			.update_order_with(id, |order| {
				order.status = OrderStatus::Cancelled;
				Ok(())
			})
			.await
		{
			Ok(order) => {
				tracing::info!(order_id = id, "Order cancelled");
				Ok(Some(order))
			},
			Err(StoreError::OrderNotFound(_)) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Orders placed from `phone`, oldest first.
	pub async fn customer_orders(&self, phone: &str) -> Result<Vec<Order>, StoreError> {
		Ok(self
			.list_orders()
			.await?
			.into_iter()
			.filter(|order| order.customer_phone == phone)
			.collect())
	}

	/// Orders from `phone` that are neither delivered nor cancelled, oldest
	/// first.
	pub async fn customer_active_orders(&self, phone: &str) -> Result<Vec<Order>, StoreError> {
		Ok(self
			.customer_orders(phone)
			.await?
			.into_iter()
			.filter(|order| order.status.is_active())
			.collect())
	}

	// Sessions

	/// Loads the session for `phone`, or a fresh one in the main menu.
	///
	/// A fresh session is only persisted by [`save_session`](Self::save_session).
	pub async fn session(&self, phone: &str) -> Result<CustomerSession, StoreError> {
		let existing = self
			.storage
			.retrieve_optional(StorageKey::Sessions.as_str(), phone)
			.await?;
		Ok(existing.unwrap_or_else(|| {
			tracing::debug!(phone = %phone, "Starting new session");
			CustomerSession::new(phone, Utc::now())
		}))
	}

	pub async fn save_session(&self, session: &CustomerSession) -> Result<(), StoreError> {
		self.storage
			.store(StorageKey::Sessions.as_str(), &session.phone, session)
			.await?;
		Ok(())
	}

	/// Drops expired records, typically idle sessions.
	pub async fn cleanup_expired(&self) -> Result<usize, StoreError> {
		Ok(self.storage.cleanup_expired().await?)
	}
}
