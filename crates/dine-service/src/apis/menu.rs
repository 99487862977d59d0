//! Menu endpoints.
//!
//! Items are never deleted; staff mark them unavailable instead.

use super::store_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	response::Json,
};
use dine_types::{APIError, MenuItem, MenuItemUpdate, NewMenuItem};

/// Handles GET /api/menu requests.
pub async fn list_menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>, APIError> {
	let items = state.engine.store().list_menu().await.map_err(store_error)?;
	Ok(Json(items))
}

/// Handles POST /api/menu requests.
pub async fn create_menu_item(
	State(state): State<AppState>,
	Json(item): Json<NewMenuItem>,
) -> Result<Json<MenuItem>, APIError> {
	let item = state
		.engine
		.store()
		.add_menu_item(item)
		.await
		.map_err(store_error)?;
	Ok(Json(item))
}

/// Handles GET /api/menu/{id} requests.
pub async fn get_menu_item(
	Path(id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<MenuItem>, APIError> {
	state
		.engine
		.store()
		.get_menu_item(id)
		.await
		.map_err(store_error)?
		.map(Json)
		.ok_or_else(|| APIError::not_found("MENU_ITEM_NOT_FOUND", "Menu item not found"))
}

/// Handles PATCH /api/menu/{id} requests. Only the fields present in the
/// body change.
pub async fn update_menu_item(
	Path(id): Path<u64>,
	State(state): State<AppState>,
	Json(update): Json<MenuItemUpdate>,
) -> Result<Json<MenuItem>, APIError> {
	let item = state
		.engine
		.store()
		.update_menu_item(id, update)
		.await
		.map_err(store_error)?;
	tracing::info!(menu_item_id = id, available = item.is_available, "Updated menu item");
	Ok(Json(item))
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{send, test_app};
	use axum::http::StatusCode;
	use serde_json::json;

	#[tokio::test]
	async fn test_list_seeded_menu() {
		let (app, _, _) = test_app().await;
		let (status, body) = send(&app, "GET", "/api/menu", None).await;
		assert_eq!(status, StatusCode::OK);
		let items = body.as_array().unwrap();
		assert_eq!(items.len(), 4);
		assert_eq!(items[0]["name"], "Margherita Pizza");
	}

	#[tokio::test]
	async fn test_create_then_get() {
		let (app, _, _) = test_app().await;
		let (status, created) = send(
			&app,
			"POST",
			"/api/menu",
			Some(json!({"name": "Masala Dosa", "description": "Crispy", "price": 120.5})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(created["id"], 5);
		assert_eq!(created["is_available"], true);

		let (status, fetched) = send(&app, "GET", "/api/menu/5", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(fetched["name"], "Masala Dosa");
		assert_eq!(fetched["description"], "Crispy");
	}

	#[tokio::test]
	async fn test_negative_price_is_rejected() {
		let (app, _, _) = test_app().await;
		let (status, body) = send(
			&app,
			"POST",
			"/api/menu",
			Some(json!({"name": "Free Lunch", "price": -1})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");
	}

	#[tokio::test]
	async fn test_toggle_availability() {
		let (app, _, _) = test_app().await;
		let (status, body) = send(
			&app,
			"PATCH",
			"/api/menu/2",
			Some(json!({"is_available": false})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["is_available"], false);
		assert_eq!(body["name"], "Pepperoni Pizza");

		let (_, body) = send(&app, "GET", "/api/menu/2", None).await;
		assert_eq!(body["is_available"], false);
	}

	#[tokio::test]
	async fn test_missing_item_is_404() {
		let (app, _, _) = test_app().await;
		let (status, body) = send(&app, "GET", "/api/menu/77", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "MENU_ITEM_NOT_FOUND");

		let (status, _) = send(
			&app,
			"PATCH",
			"/api/menu/77",
			Some(json!({"price": 10})),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}
}
