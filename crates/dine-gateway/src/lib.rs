//! Outbound messaging for the dine ordering system.
//!
//! A gateway delivers one text to one phone number. Callers hand over the
//! normalized number (`+919876543210`); any channel prefix the provider needs
//! is added by the implementation.

use async_trait::async_trait;
use dine_types::{ConfigSchema, ImplementationRegistry};
use std::fmt;
use thiserror::Error;

pub mod implementations {
	pub mod log;
	pub mod twilio;
}

/// Errors that can occur while sending a message.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The provider could not be reached or the response was unreadable.
	#[error("Network error: {0}")]
	Network(String),
	/// The provider answered but refused the message.
	#[error("Message rejected ({status}): {message}")]
	Rejected { status: u16, message: String },
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Provider-assigned identifier of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GatewayInterface: Send + Sync {
	/// Returns the configuration schema for this gateway.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends `body` to the customer at `to`.
	async fn send(&self, to: &str, body: &str) -> Result<MessageId, GatewayError>;
}

/// Builds a gateway from its `[gateway.implementations.<name>]` table.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>;

pub trait GatewayRegistry: ImplementationRegistry<Factory = GatewayFactory> {}

/// Every gateway compiled into the binary, by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{log, twilio};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(twilio::Registry::NAME, twilio::Registry::factory()),
	]
}

/// Sends chat replies and notifications through the configured gateway.
///
/// Delivery is best effort. A failed send is logged and reported as `false`;
/// it never undoes the state change that triggered it.
pub struct GatewayService {
	gateway: Box<dyn GatewayInterface>,
}

impl GatewayService {
	pub fn new(gateway: Box<dyn GatewayInterface>) -> Self {
		Self { gateway }
	}

	/// Sends a message and reports whether the provider accepted it.
	pub async fn send(&self, to: &str, body: &str) -> bool {
		match self.gateway.send(to, body).await {
			Ok(message_id) => {
				tracing::debug!(to = %to, message_id = %message_id, "Message sent");
				true
			},
			Err(e) => {
				tracing::error!(to = %to, error = %e, "Failed to send message");
				false
			},
		}
	}

	/// Sends several messages in order, stopping at the first failure.
	pub async fn send_all(&self, to: &str, bodies: &[String]) -> bool {
		for body in bodies {
			if !self.send(to, body).await {
				return false;
			}
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_send_reports_success() {
		let mut gateway = MockGatewayInterface::new();
		gateway.expect_send().times(1).returning(|to, body| {
			assert_eq!(to, "+15550001");
			assert_eq!(body, "hello");
			Ok(MessageId("SM1".into()))
		});

		let service = GatewayService::new(Box::new(gateway));
		assert!(service.send("+15550001", "hello").await);
	}

	#[tokio::test]
	async fn test_send_swallows_failures() {
		let mut gateway = MockGatewayInterface::new();
		gateway.expect_send().returning(|_, _| {
			Err(GatewayError::Rejected {
				status: 400,
				message: "invalid number".into(),
			})
		});

		let service = GatewayService::new(Box::new(gateway));
		assert!(!service.send("+15550001", "hello").await);
	}

	#[tokio::test]
	async fn test_send_all_stops_at_first_failure() {
		let mut gateway = MockGatewayInterface::new();
		gateway
			.expect_send()
			.times(1)
			.returning(|_, _| Err(GatewayError::Network("timeout".into())));

		let service = GatewayService::new(Box::new(gateway));
		let bodies = vec!["menu".to_string(), "instructions".to_string()];
		assert!(!service.send_all("+15550001", &bodies).await);
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["log", "twilio"]);
	}
}
