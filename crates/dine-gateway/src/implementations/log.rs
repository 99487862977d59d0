//! Gateway that writes outbound messages to the log instead of sending them.
//!
//! Used for local development and demos where no provider account exists.

use crate::{GatewayError, GatewayFactory, GatewayInterface, GatewayRegistry, MessageId};
use async_trait::async_trait;
use dine_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct LogGateway {
	/// Prefix for generated message ids.
	label: String,
	sent: AtomicU64,
}

impl LogGateway {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			sent: AtomicU64::new(0),
		}
	}
}

#[async_trait]
impl GatewayInterface for LogGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogGatewaySchema)
	}

	async fn send(&self, to: &str, body: &str) -> Result<MessageId, GatewayError> {
		let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
		tracing::info!(to = %to, "Outbound message:\n{}", body);
		Ok(MessageId(format!("{}-{}", self.label, n)))
	}
}

/// Optional `label` used as the message id prefix.
pub struct LogGatewaySchema;

impl ConfigSchema for LogGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("label", FieldType::String)]).validate(config)
	}
}

pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	LogGatewaySchema
		.validate(config)
		.map_err(|e| GatewayError::Configuration(e.to_string()))?;
	let label = config
		.get("label")
		.and_then(|v| v.as_str())
		.unwrap_or("log");
	Ok(Box::new(LogGateway::new(label)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_message_ids_are_sequential() {
		let gateway = LogGateway::new("dev");
		assert_eq!(gateway.send("+1", "a").await.unwrap().0, "dev-1");
		assert_eq!(gateway.send("+1", "b").await.unwrap().0, "dev-2");
	}

	#[test]
	fn test_label_must_be_a_string() {
		let config = toml::Value::Table(toml::from_str::<toml::Table>("label = 5").unwrap());
		assert!(create_gateway(&config).is_err());
	}
}
