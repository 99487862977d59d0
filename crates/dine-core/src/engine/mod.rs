//! The dine engine ties the store, the gateway and the conversation handler
//! together.
//!
//! Chat messages go through [`ConversationHandler`]; staff operations (placing
//! orders by hand, moving orders through the kitchen, cancelling) go through
//! the engine so the customer is notified the same way in every case.

use crate::conversation::ConversationHandler;
use crate::messages::Messages;
use crate::store::{Store, StoreError};
use dine_config::Config;
use dine_gateway::GatewayService;
use dine_order::ValidationFailure;
use dine_storage::StorageService;
use dine_types::{normalize_phone, NewOrder, Order, OrderItem, OrderStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Invalid order: {0}")]
	InvalidOrder(#[from] ValidationFailure),
	#[error("Cannot cancel order with status: {0}")]
	CannotCancel(OrderStatus),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// A staff-entered order before validation.
#[derive(Debug, Clone)]
pub struct OrderRequest {
	pub customer_phone: String,
	pub customer_name: Option<String>,
	pub items: Vec<OrderItem>,
}

/// Main engine shared by the HTTP handlers.
#[derive(Clone)]
pub struct DineEngine {
	pub(crate) config: Config,
	pub(crate) store: Arc<Store>,
	pub(crate) gateway: Arc<GatewayService>,
	pub(crate) conversation: Arc<ConversationHandler>,
	pub(crate) messages: Messages,
}

impl DineEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		gateway: Arc<GatewayService>,
	) -> Self {
		let messages = Messages::new(
			config.service.business_name.clone(),
			config.service.currency_symbol.clone(),
		);
		let store = Arc::new(Store::new(storage));
		let conversation = Arc::new(ConversationHandler::new(
			store.clone(),
			gateway.clone(),
			messages.clone(),
		));

		Self {
			config,
			store,
			gateway,
			conversation,
			messages,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn store(&self) -> &Arc<Store> {
		&self.store
	}

	/// Seeds the menu from configuration if storage holds none.
	pub async fn initialize(&self) -> Result<usize, EngineError> {
		Ok(self.store.initialize(self.config.menu.seed_items()).await?)
	}

	/// Handles one inbound chat message. See
	/// [`ConversationHandler::handle_incoming`].
	pub async fn handle_incoming(&self, from: &str, body: &str) -> Vec<String> {
		self.conversation.handle_incoming(from, body).await
	}

	/// Validates, prices and stores a staff-entered order, then sends the
	/// customer the order confirmation.
	pub async fn place_order(&self, request: OrderRequest) -> Result<Order, EngineError> {
		let menu = self.store.menu_snapshot().await?;
		menu.validate(&request.items)?;
		let total = menu.total(&request.items)?;

		let order = self
			.store
			.add_order(NewOrder {
				customer_phone: normalize_phone(&request.customer_phone),
				customer_name: request.customer_name,
				items: request.items,
				total_price: total,
			})
			.await?;

		let message = self.messages.order_confirmation(&order, &menu);
		self.gateway.send(&order.customer_phone, &message).await;
		Ok(order)
	}

	/// Moves an order forward and notifies the customer when the status
	/// actually changed.
	pub async fn update_order_status(
		&self,
		id: u64,
		status: OrderStatus,
	) -> Result<Order, EngineError> {
		let change = self.store.set_order_status(id, status).await?;
		if change.changed() {
			let message = self.messages.status_update(&change.order);
			self.gateway
				.send(&change.order.customer_phone, &message)
				.await;
		}
		Ok(change.order)
	}

	/// Cancels an order that is not yet delivered or cancelled and notifies
	/// the customer.
	pub async fn cancel_order(&self, id: u64) -> Result<Order, EngineError> {
		let order = self
			.store
			.update_order_with(id, |order| {
				if order.status.is_terminal() {
					return Err(StoreError::InvalidTransition {
						from: order.status,
						to: OrderStatus::Cancelled,
					});
				}
				order.status = OrderStatus::Cancelled;
				Ok(())
			})
			.await
			.map_err(|e| match e {
				StoreError::InvalidTransition { from, .. } => EngineError::CannotCancel(from),
				other => EngineError::Store(other),
			})?;
		tracing::info!(order_id = id, "Order cancelled by staff");

		let message = self.messages.cancellation_notice(order.id);
		self.gateway.send(&order.customer_phone, &message).await;
		Ok(order)
	}

	/// Periodically drops expired records (idle sessions on stores with a
	/// session TTL). Runs until the task is dropped.
	pub async fn run_cleanup(&self) {
		let period = Duration::from_secs(self.config.storage.cleanup_interval_seconds);
		let mut interval = tokio::time::interval(period);
		// The first tick completes immediately.
		interval.tick().await;

		loop {
			interval.tick().await;
			match self.store.cleanup_expired().await {
				Ok(0) => tracing::debug!("No expired records"),
				Ok(removed) => tracing::info!(removed, "Removed expired records"),
				Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dine_gateway::{GatewayError, MessageId, MockGatewayInterface};
	use dine_storage::implementations::memory::MemoryStorage;
	use dine_types::NewMenuItem;
	use rust_decimal::Decimal;
	use rust_decimal_macros::dec;
	use std::str::FromStr;
	use std::sync::Mutex;

	const CONFIG: &str = r#"
[service]
id = "dine-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[gateway]
primary = "log"
[gateway.implementations.log]
"#;

	fn engine_with(gateway: MockGatewayInterface) -> DineEngine {
		let config = Config::from_str(CONFIG).unwrap();
		DineEngine::new(
			config,
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(GatewayService::new(Box::new(gateway))),
		)
	}

	/// A mock gateway that records every message body.
	fn recording() -> (MockGatewayInterface, Arc<Mutex<Vec<(String, String)>>>) {
		let sent = Arc::new(Mutex::new(Vec::new()));
		let mut gateway = MockGatewayInterface::new();
		let log = sent.clone();
		gateway.expect_send().returning(move |to, body| {
			log.lock().unwrap().push((to.to_string(), body.to_string()));
			Ok(MessageId("SM1".into()))
		});
		(gateway, sent)
	}

	fn request(items: Vec<OrderItem>) -> OrderRequest {
		OrderRequest {
			customer_phone: "919876543210".into(),
			customer_name: Some("Asha".into()),
			items,
		}
	}

	#[tokio::test]
	async fn test_initialize_seeds_default_menu() {
		let (gateway, _) = recording();
		let engine = engine_with(gateway);
		assert_eq!(engine.initialize().await.unwrap(), 4);
		assert_eq!(engine.initialize().await.unwrap(), 0);

		let menu = engine.store().list_menu().await.unwrap();
		assert_eq!(menu[0].name, "Margherita Pizza");
		assert_eq!(menu[0].price, dec!(299.0));
	}

	#[tokio::test]
	async fn test_place_order_notifies_customer() {
		let (gateway, sent) = recording();
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();

		let order = engine
			.place_order(request(vec![OrderItem::new(2, 1), OrderItem::new(3, 2)]))
			.await
			.unwrap();
		assert_eq!(order.customer_phone, "+919876543210");
		assert_eq!(order.customer_name.as_deref(), Some("Asha"));
		assert_eq!(order.total_price, dec!(449.0));
		assert_eq!(order.status, OrderStatus::Pending);

		let sent = sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].0, "+919876543210");
		assert!(sent[0].1.contains("Order Confirmed"));
	}

	#[tokio::test]
	async fn test_place_order_rejects_bad_items() {
		let (gateway, sent) = recording();
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();

		assert!(matches!(
			engine.place_order(request(vec![])).await,
			Err(EngineError::InvalidOrder(ValidationFailure::NoItems))
		));
		assert!(matches!(
			engine.place_order(request(vec![OrderItem::new(12, 1)])).await,
			Err(EngineError::InvalidOrder(ValidationFailure::ItemNotFound(12)))
		));

		let feast = engine
			.store()
			.add_menu_item(NewMenuItem {
				name: "Golden Feast".into(),
				description: String::new(),
				price: Decimal::MAX,
				is_available: true,
			})
			.await
			.unwrap();
		assert!(matches!(
			engine.place_order(request(vec![OrderItem::new(feast.id, 3)])).await,
			Err(EngineError::InvalidOrder(ValidationFailure::TotalTooLarge))
		));
		assert!(engine.store().list_orders().await.unwrap().is_empty());
		assert!(sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_status_update_notifies_only_on_change() {
		let (gateway, sent) = recording();
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();
		let order = engine
			.place_order(request(vec![OrderItem::new(1, 1)]))
			.await
			.unwrap();

		engine
			.update_order_status(order.id, OrderStatus::Preparing)
			.await
			.unwrap();
		engine
			.update_order_status(order.id, OrderStatus::Preparing)
			.await
			.unwrap();

		let sent = sent.lock().unwrap();
		assert_eq!(sent.len(), 2);
		assert!(sent[1].1.contains("Your order is being prepared"));
	}

	#[tokio::test]
	async fn test_backwards_status_is_rejected() {
		let (gateway, _) = recording();
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();
		let order = engine
			.place_order(request(vec![OrderItem::new(1, 1)]))
			.await
			.unwrap();
		engine
			.update_order_status(order.id, OrderStatus::Delivered)
			.await
			.unwrap();

		assert!(matches!(
			engine
				.update_order_status(order.id, OrderStatus::Preparing)
				.await,
			Err(EngineError::Store(StoreError::InvalidTransition { .. }))
		));
	}

	#[tokio::test]
	async fn test_cancel_refuses_terminal_orders() {
		let (gateway, sent) = recording();
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();
		let order = engine
			.place_order(request(vec![OrderItem::new(1, 1)]))
			.await
			.unwrap();

		let cancelled = engine.cancel_order(order.id).await.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);
		assert!(sent.lock().unwrap()[1].1.contains("Order Cancelled"));

		assert!(matches!(
			engine.cancel_order(order.id).await,
			Err(EngineError::CannotCancel(OrderStatus::Cancelled))
		));
		assert!(matches!(
			engine.cancel_order(99).await,
			Err(EngineError::Store(StoreError::OrderNotFound(99)))
		));
	}

	#[tokio::test]
	async fn test_gateway_failure_does_not_fail_order() {
		let mut gateway = MockGatewayInterface::new();
		gateway
			.expect_send()
			.returning(|_, _| Err(GatewayError::Network("timeout".into())));
		let engine = engine_with(gateway);
		engine.initialize().await.unwrap();

		let order = engine
			.place_order(request(vec![OrderItem::new(1, 1)]))
			.await
			.unwrap();
		assert!(engine.store().get_order(order.id).await.unwrap().is_some());
	}
}
