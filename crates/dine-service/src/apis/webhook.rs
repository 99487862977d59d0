//! Inbound WhatsApp webhook.
//!
//! Twilio posts each customer message as a form with `From` and `Body`. The
//! reply batch is sent through the gateway before the webhook answers, and
//! the answer is always `200 {"status":"success"}` so the provider never
//! retries a message that was already handled.

use crate::server::AppState;
use axum::{
	extract::{rejection::FormRejection, State},
	response::Json,
	Form,
};
use serde::{Deserialize, Serialize};

/// The subset of Twilio's webhook fields that the conversation needs.
#[derive(Debug, Deserialize)]
pub struct WhatsAppMessage {
	#[serde(rename = "From", default)]
	pub from: String,
	#[serde(rename = "Body", default)]
	pub body: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
	pub status: &'static str,
}

/// Handles POST /webhook/whatsapp requests.
pub async fn handle_whatsapp(
	State(state): State<AppState>,
	payload: Result<Form<WhatsAppMessage>, FormRejection>,
) -> Json<WebhookAck> {
	match payload {
		Ok(Form(message)) if !message.from.trim().is_empty() => {
			tracing::info!(from = %message.from, "Received WhatsApp message");
			state
				.engine
				.handle_incoming(&message.from, &message.body)
				.await;
		},
		Ok(_) => tracing::warn!("Webhook payload without sender"),
		Err(rejection) => tracing::warn!(error = %rejection, "Unreadable webhook payload"),
	}
	Json(WebhookAck { status: "success" })
}

#[cfg(test)]
mod tests {
	use crate::server::tests::test_app;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use axum::Router;
	use dine_types::{ConversationState, OrderStatus};
	use tower::ServiceExt;

	async fn post_form(app: &Router, body: &str) -> (StatusCode, serde_json::Value) {
		let request = Request::builder()
			.method("POST")
			.uri("/webhook/whatsapp")
			.header("content-type", "application/x-www-form-urlencoded")
			.body(Body::from(body.to_string()))
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	fn message(text: &str) -> String {
		format!(
			"From=whatsapp%3A%2B919876543210&Body={}",
			text.replace(' ', "+").replace(',', "%2C")
		)
	}

	#[tokio::test]
	async fn test_chat_order_through_webhook() {
		let (app, engine, outbox) = test_app().await;
		for text in ["hi", "2", "1x2, 3x1", "CONFIRM"] {
			let (status, body) = post_form(&app, &message(text)).await;
			assert_eq!(status, StatusCode::OK);
			assert_eq!(body["status"], "success");
		}

		let orders = engine.store().list_orders().await.unwrap();
		assert_eq!(orders.len(), 1);
		assert_eq!(orders[0].customer_phone, "+919876543210");
		assert_eq!(orders[0].status, OrderStatus::Pending);

		let outbox = outbox.lock().unwrap();
		assert!(outbox.iter().all(|(to, _)| to == "+919876543210"));
		assert!(outbox[0].1.contains("Welcome to Test Kitchen"));
		assert!(outbox.last().unwrap().1.contains("Order Confirmed"));
	}

	#[tokio::test]
	async fn test_staff_update_reaches_chat_customer() {
		let (app, engine, outbox) = test_app().await;
		for text in ["2", "2x1", "confirm"] {
			post_form(&app, &message(text)).await;
		}
		engine
			.update_order_status(1, OrderStatus::Preparing)
			.await
			.unwrap();

		let session = engine.store().session("+919876543210").await.unwrap();
		assert_eq!(session.state, ConversationState::MainMenu);
		assert!(outbox
			.lock()
			.unwrap()
			.last()
			.unwrap()
			.1
			.contains("Your order is being prepared"));
	}

	#[tokio::test]
	async fn test_malformed_payload_is_acknowledged() {
		let (app, _, outbox) = test_app().await;
		let (status, body) = post_form(&app, "Body=hello").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "success");

		let request = Request::builder()
			.method("POST")
			.uri("/webhook/whatsapp")
			.header("content-type", "application/json")
			.body(Body::from("{}"))
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert!(outbox.lock().unwrap().is_empty());
	}
}
