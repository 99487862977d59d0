//! HTTP server for the dine API.
//!
//! Serves the staff menu and order endpoints under `/api`, the WhatsApp
//! webhook and a health check.

use crate::apis::{menu, order, webhook};
use axum::{
	extract::{DefaultBodyLimit, State},
	http::{HeaderValue, Method},
	response::Json,
	routing::{get, post},
	Router,
};
use dine_config::{ApiConfig, Config};
use dine_core::DineEngine;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<DineEngine>,
	pub config: Config,
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<DineEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Dine API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the full router, middleware included.
pub fn build_router(api_config: &ApiConfig, engine: Arc<DineEngine>) -> Router {
	let config = engine.config().clone();
	let state = AppState { engine, config };

	Router::new()
		.route("/", get(handle_health))
		.nest(
			"/api",
			Router::new()
				.route("/menu", get(menu::list_menu).post(menu::create_menu_item))
				.route(
					"/menu/{id}",
					get(menu::get_menu_item).patch(menu::update_menu_item),
				)
				.route("/orders", get(order::list_orders).post(order::create_order))
				.route(
					"/orders/{id}",
					get(order::get_order)
						.patch(order::update_order_status)
						.delete(order::cancel_order),
				),
		)
		.route("/webhook/whatsapp", post(webhook::handle_whatsapp))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size))
				.layer(cors_layer(api_config)),
		)
		.with_state(state)
}

/// Allows any origin unless `[api.cors]` lists the permitted ones.
fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let methods = [
		Method::GET,
		Method::POST,
		Method::PATCH,
		Method::DELETE,
		Method::OPTIONS,
	];
	match &api_config.cors {
		Some(cors) if !cors.allowed_origins.is_empty() => {
			let origins: Vec<HeaderValue> = cors
				.allowed_origins
				.iter()
				.filter_map(|origin| match origin.parse::<HeaderValue>() {
					Ok(value) => Some(value),
					Err(_) => {
						tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
						None
					},
				})
				.collect();
			CorsLayer::new()
				.allow_origin(origins)
				.allow_methods(methods)
				.allow_headers(Any)
		},
		_ => CorsLayer::permissive(),
	}
}

#[derive(Debug, Serialize)]
struct HealthResponse {
	status: &'static str,
	service: String,
	version: &'static str,
}

/// Handles GET / requests.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		service: state.config.service.business_name.clone(),
		version: env!("CARGO_PKG_VERSION"),
	})
}
