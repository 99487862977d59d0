//! Order endpoints for staff.
//!
//! Every change that the customer should know about (new order, status
//! change, cancellation) is announced over WhatsApp by the engine.

use super::{engine_error, store_error};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	response::Json,
};
use dine_core::OrderRequest;
use dine_types::{APIError, Order, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};

/// Body of POST /api/orders.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
	#[serde(alias = "customer_whatsapp")]
	pub customer_phone: String,
	#[serde(default)]
	pub customer_name: Option<String>,
	pub items: Vec<OrderItem>,
}

/// Body of PATCH /api/orders/{id}.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
	pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
	pub message: String,
}

/// Handles POST /api/orders requests.
pub async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, APIError> {
	if request.customer_phone.trim().is_empty() {
		return Err(APIError::bad_request(
			"INVALID_REQUEST",
			"customer_phone is required",
		));
	}
	if request.items.iter().any(|item| item.quantity == 0) {
		return Err(APIError::bad_request(
			"INVALID_ORDER",
			"Quantities must be positive",
		));
	}

	let order = state
		.engine
		.place_order(OrderRequest {
			customer_phone: request.customer_phone,
			customer_name: request.customer_name,
			items: request.items,
		})
		.await
		.map_err(engine_error)?;
	Ok(Json(order))
}

/// Handles GET /api/orders requests.
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, APIError> {
	let orders = state.engine.store().list_orders().await.map_err(store_error)?;
	Ok(Json(orders))
}

/// Handles GET /api/orders/{id} requests.
pub async fn get_order(
	Path(id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<Order>, APIError> {
	state
		.engine
		.store()
		.get_order(id)
		.await
		.map_err(store_error)?
		.map(Json)
		.ok_or_else(|| APIError::not_found("ORDER_NOT_FOUND", "Order not found"))
}

/// Handles PATCH /api/orders/{id} requests.
pub async fn update_order_status(
	Path(id): Path<u64>,
	State(state): State<AppState>,
	Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Order>, APIError> {
	let status: OrderStatus = request.status.parse().map_err(|_| {
		let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
		APIError::bad_request(
			"INVALID_STATUS",
			format!("Invalid status. Allowed: {}", allowed.join(", ")),
		)
	})?;

	let order = state
		.engine
		.update_order_status(id, status)
		.await
		.map_err(engine_error)?;
	Ok(Json(order))
}

/// Handles DELETE /api/orders/{id} requests, which cancel the order.
pub async fn cancel_order(
	Path(id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<CancelResponse>, APIError> {
	state.engine.cancel_order(id).await.map_err(engine_error)?;
	Ok(Json(CancelResponse {
		message: format!("Order #{} cancelled successfully", id),
	}))
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{send, test_app};
	use axum::http::StatusCode;
	use serde_json::json;

	#[tokio::test]
	async fn test_create_order_prices_and_notifies() {
		let (app, _, outbox) = test_app().await;
		let (status, order) = send(
			&app,
			"POST",
			"/api/orders",
			Some(json!({
				"customer_whatsapp": "919876543210",
				"customer_name": "Ravi",
				"items": [{"menu_item_id": 1, "quantity": 2}, {"menu_item_id": 3, "quantity": 1}]
			})),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(order["id"], 1);
		assert_eq!(order["status"], "pending");
		assert_eq!(order["customer_phone"], "+919876543210");
		assert_eq!(order["total_price"], "648.0");

		let outbox = outbox.lock().unwrap();
		assert_eq!(outbox.len(), 1);
		assert_eq!(outbox[0].0, "+919876543210");
		assert!(outbox[0].1.contains("Order ID: #1"));
	}

	#[tokio::test]
	async fn test_create_order_rejects_unavailable_items() {
		let (app, _, outbox) = test_app().await;
		send(
			&app,
			"PATCH",
			"/api/menu/4",
			Some(json!({"is_available": false})),
		)
		.await;

		let (status, body) = send(
			&app,
			"POST",
			"/api/orders",
			Some(json!({
				"customer_phone": "+15550001",
				"items": [{"menu_item_id": 4, "quantity": 1}]
			})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ORDER");
		assert!(body["message"]
			.as_str()
			.unwrap()
			.contains("Garlic Bread is currently unavailable"));
		assert!(outbox.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_create_order_with_oversized_total_is_rejected() {
		let (app, engine, outbox) = test_app().await;
		let (status, item) = send(
			&app,
			"POST",
			"/api/menu",
			Some(json!({"name": "Golden Feast", "price": "79228162514264337593543950335"})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);

		let (status, body) = send(
			&app,
			"POST",
			"/api/orders",
			Some(json!({
				"customer_phone": "+15550001",
				"items": [{"menu_item_id": item["id"], "quantity": 2}]
			})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ORDER");
		assert!(engine.store().list_orders().await.unwrap().is_empty());
		assert!(outbox.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_status_patch_and_lookup() {
		let (app, engine, outbox) = test_app().await;
		engine
			.place_order(dine_core::OrderRequest {
				customer_phone: "+15550001".into(),
				customer_name: None,
				items: vec![dine_types::OrderItem::new(2, 1)],
			})
			.await
			.unwrap();

		let (status, body) = send(
			&app,
			"PATCH",
			"/api/orders/1",
			Some(json!({"status": "out-for-delivery"})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "out-for-delivery");
		assert!(outbox.lock().unwrap()[1]
			.1
			.contains("Your order is out for delivery!"));

		let (status, body) = send(&app, "GET", "/api/orders/1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "out-for-delivery");

		let (status, body) = send(&app, "GET", "/api/orders", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body.as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_bad_status_values() {
		let (app, engine, _) = test_app().await;
		engine
			.place_order(dine_core::OrderRequest {
				customer_phone: "+15550001".into(),
				customer_name: None,
				items: vec![dine_types::OrderItem::new(1, 1)],
			})
			.await
			.unwrap();

		let (status, body) = send(
			&app,
			"PATCH",
			"/api/orders/1",
			Some(json!({"status": "shipped"})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_STATUS");

		send(
			&app,
			"PATCH",
			"/api/orders/1",
			Some(json!({"status": "delivered"})),
		)
		.await;
		let (status, body) = send(
			&app,
			"PATCH",
			"/api/orders/1",
			Some(json!({"status": "pending"})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_STATUS_TRANSITION");

		let (status, _) = send(
			&app,
			"PATCH",
			"/api/orders/42",
			Some(json!({"status": "preparing"})),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_delete_cancels_once() {
		let (app, engine, outbox) = test_app().await;
		engine
			.place_order(dine_core::OrderRequest {
				customer_phone: "+15550001".into(),
				customer_name: None,
				items: vec![dine_types::OrderItem::new(1, 1)],
			})
			.await
			.unwrap();

		let (status, body) = send(&app, "DELETE", "/api/orders/1", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["message"], "Order #1 cancelled successfully");
		assert!(outbox.lock().unwrap()[1].1.contains("Order Cancelled"));

		let (status, body) = send(&app, "DELETE", "/api/orders/1", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["message"], "Cannot cancel order with status: cancelled");

		let (status, _) = send(&app, "DELETE", "/api/orders/9", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}
}
