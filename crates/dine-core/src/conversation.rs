//! Chat conversation state machine.
//!
//! Each inbound message is handled as one critical section per phone number:
//! load the session, decide, write orders and the session, then send the
//! replies. Replies go out only after everything is persisted, so a gateway
//! failure never loses a state change.

use crate::messages::{ErrorKind, Messages};
use crate::store::{Store, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use dine_gateway::GatewayService;
use dine_order::{parse_order, sum_lines, ValidationFailure};
use dine_types::{
	normalize_phone, ConversationState, CustomerSession, NewOrder, OrderStatus, PendingAction,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Inputs that return to the main menu from any state.
const RESET_KEYWORDS: [&str; 5] = ["HI", "HELLO", "START", "MENU", "BACK"];

#[derive(Debug, Error)]
pub enum ConversationError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("Order error: {0}")]
	Order(#[from] ValidationFailure),
}

pub struct ConversationHandler {
	store: Arc<Store>,
	gateway: Arc<GatewayService>,
	messages: Messages,
	/// One lock per phone number with a message in flight.
	locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationHandler {
	pub fn new(store: Arc<Store>, gateway: Arc<GatewayService>, messages: Messages) -> Self {
		Self {
			store,
			gateway,
			messages,
			locks: DashMap::new(),
		}
	}

	/// Handles one inbound chat message end to end and returns the replies
	/// that were sent.
	///
	/// Never fails: processing errors are logged and answered with the
	/// generic error message.
	#[tracing::instrument(skip_all, fields(phone = tracing::field::Empty))]
	pub async fn handle_incoming(&self, raw_phone: &str, body: &str) -> Vec<String> {
		let phone = normalize_phone(raw_phone);
		if phone.len() < 2 {
			tracing::warn!(from = %raw_phone, "Ignoring message without sender number");
			return Vec::new();
		}
		tracing::Span::current().record("phone", phone.as_str());

		let lock = self
			.locks
			.entry(phone.clone())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();
		let replies = {
			let _guard = lock.lock().await;
			let replies = match self.process(&phone, body).await {
				Ok(replies) => replies,
				Err(e) => {
					tracing::error!(error = %e, "Failed to process message");
					vec![self.messages.error(ErrorKind::General)]
				},
			};
			self.gateway.send_all(&phone, &replies).await;
			replies
		};
		drop(lock);
		self.locks
			.remove_if(&phone, |_, lock| Arc::strong_count(lock) == 1);
		replies
	}

	/// Runs the state machine for one message and persists the session.
	///
	/// Returns the replies to send, in order. Callers must hold the lock for
	/// `phone`.
	pub async fn process(&self, phone: &str, body: &str) -> Result<Vec<String>, ConversationError> {
		let mut session = self.store.session(phone).await?;
		session.last_interaction = Utc::now();

		let input = body.trim();
		let keyword = input.to_uppercase();
		tracing::debug!(state = %session.state, input = %input, "Incoming message");

		let replies = if RESET_KEYWORDS.contains(&keyword.as_str()) {
			self.reset(&mut session)
		} else {
			match session.state.clone() {
				ConversationState::MainMenu => self.on_main_menu(&mut session, input).await?,
				ConversationState::ViewingMenu => self.on_viewing_menu(&mut session, &keyword),
				ConversationState::PlacingOrder => self.on_placing_order(&mut session, input).await?,
				ConversationState::ConfirmingOrder => {
					self.on_confirming_order(&mut session, &keyword).await?
				},
				ConversationState::CancelingOrder => {
					self.on_canceling_order(&mut session, &keyword).await?
				},
				ConversationState::Unrecognized(raw) => {
					tracing::warn!(state = %raw, "Resetting session with unknown state");
					self.reset(&mut session)
				},
			}
		};

		self.store.save_session(&session).await?;
		Ok(replies)
	}

	/// Back to the main menu. The cart is kept; a staged action is dropped.
	fn reset(&self, session: &mut CustomerSession) -> Vec<String> {
		session.state = ConversationState::MainMenu;
		session.pending_action = None;
		vec![self.messages.main_menu()]
	}

	fn invalid_option(&self) -> Vec<String> {
		vec![self.messages.error(ErrorKind::InvalidOption)]
	}

	async fn on_main_menu(
		&self,
		session: &mut CustomerSession,
		input: &str,
	) -> Result<Vec<String>, ConversationError> {
		match input {
			"1" => {
				let menu = self.store.menu_snapshot().await?;
				session.state = ConversationState::ViewingMenu;
				Ok(vec![self.messages.menu_listing(&menu)])
			},
			"2" => {
				let menu = self.store.menu_snapshot().await?;
				session.state = ConversationState::PlacingOrder;
				Ok(vec![
					self.messages.menu_listing(&menu),
					self.messages.order_instructions(),
				])
			},
			"3" => {
				let orders = self.store.customer_orders(&session.phone).await?;
				Ok(vec![self.messages.order_status(&orders)])
			},
			"4" => {
				let active = self.store.customer_active_orders(&session.phone).await?;
				let Some(order) = active.last() else {
					return Ok(vec![self.messages.no_active_orders()]);
				};
				let menu = self.store.menu_snapshot().await?;
				session.pending_action = Some(PendingAction::CancelOrder { order_id: order.id });
				session.state = ConversationState::CancelingOrder;
				Ok(vec![self.messages.cancel_prompt(order, &menu)])
			},
			_ => Ok(self.invalid_option()),
		}
	}

	fn on_viewing_menu(&self, session: &mut CustomerSession, keyword: &str) -> Vec<String> {
		if keyword == "ORDER" {
			session.state = ConversationState::PlacingOrder;
			vec![self.messages.order_instructions()]
		} else {
			self.invalid_option()
		}
	}

	async fn on_placing_order(
		&self,
		session: &mut CustomerSession,
		input: &str,
	) -> Result<Vec<String>, ConversationError> {
		let lines = parse_order(input);
		if lines.is_empty() {
			return Ok(vec![self.messages.error(ErrorKind::InvalidOrder)]);
		}

		let menu = self.store.menu_snapshot().await?;
		let priced = menu
			.validate(&lines)
			.and_then(|()| menu.price_lines(&lines))
			.and_then(|priced| sum_lines(&priced).map(|total| (priced, total)));
		let (priced, total) = match priced {
			Ok(priced) => priced,
			Err(failure) => {
				tracing::debug!(reason = %failure, "Rejected order lines");
				return Ok(vec![self.messages.validation_error(&failure)]);
			},
		};
		session.cart = lines;
		session.state = ConversationState::ConfirmingOrder;
		Ok(vec![self.messages.order_summary(&priced, total)])
	}

	async fn on_confirming_order(
		&self,
		session: &mut CustomerSession,
		keyword: &str,
	) -> Result<Vec<String>, ConversationError> {
		match keyword {
			"CONFIRM" => {
				if session.cart.is_empty() {
					return Ok(vec![self.messages.empty_cart()]);
				}

				let menu = self.store.menu_snapshot().await?;
				let total = match menu.total(&session.cart) {
					Ok(total) => total,
					Err(failure) => {
						tracing::warn!(reason = %failure, "Cart no longer matches the menu");
						return Ok(vec![self.messages.validation_error(&failure)]);
					},
				};

				let order = self
					.store
					.add_order(NewOrder {
						customer_phone: session.phone.clone(),
						customer_name: session.customer_name.clone(),
						items: session.cart.clone(),
						total_price: total,
					})
					.await?;
				session.cart.clear();
				session.order_history.push(order.id);
				session.state = ConversationState::MainMenu;
				Ok(vec![self.messages.order_confirmation(&order, &menu)])
			},
			"CANCEL" => {
				session.cart.clear();
				Ok(self.reset(session))
			},
			_ => Ok(self.invalid_option()),
		}
	}

	async fn on_canceling_order(
		&self,
		session: &mut CustomerSession,
		keyword: &str,
	) -> Result<Vec<String>, ConversationError> {
		match keyword {
			"YES" => {
				session.state = ConversationState::MainMenu;
				let Some(PendingAction::CancelOrder { order_id }) = session.pending_action.take()
				else {
					tracing::warn!("Cancellation confirmed with nothing staged");
					return Ok(vec![self.messages.main_menu()]);
				};
				self.cancel_staged(&session.phone, order_id).await
			},
			"NO" => Ok(self.reset(session)),
			_ => Ok(self.invalid_option()),
		}
	}

	/// Cancels the staged order unless it reached a terminal status since
	/// the prompt was shown.
	async fn cancel_staged(
		&self,
		phone: &str,
		order_id: u64,
	) -> Result<Vec<String>, ConversationError> {
		let result = self
			.store
			.update_order_with(order_id, |order| {
				if order.customer_phone != phone {
					return Err(StoreError::OrderNotFound(order_id));
				}
				if !order.status.is_terminal() {
					order.status = OrderStatus::Cancelled;
				}
				Ok(())
			})
			.await;

		match result {
			Ok(order) if order.status == OrderStatus::Cancelled => {
				tracing::info!(order_id, "Order cancelled by customer");
				Ok(vec![self.messages.cancellation_notice(order_id)])
			},
			Ok(_) => Ok(vec![self.messages.already_delivered(order_id)]),
			Err(StoreError::OrderNotFound(_)) => {
				tracing::warn!(order_id, "Staged order is missing");
				Ok(vec![self.messages.error(ErrorKind::General)])
			},
			Err(e) => Err(e.into()),
		}
	}
}
