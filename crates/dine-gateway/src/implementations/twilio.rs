//! WhatsApp delivery through the Twilio Messages API.
//!
//! Messages are posted as a form to
//! `{base_url}/2010-04-01/Accounts/{account_sid}/Messages.json` with HTTP basic
//! auth. Both sender and recipient carry the `whatsapp:` channel prefix.

use crate::{GatewayError, GatewayFactory, GatewayInterface, GatewayRegistry, MessageId};
use async_trait::async_trait;
use dine_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const CHANNEL_PREFIX: &str = "whatsapp:";

/// Adds the WhatsApp channel prefix unless it is already there.
fn channel_address(number: &str) -> String {
	let number = number.trim();
	if number.starts_with(CHANNEL_PREFIX) {
		number.to_string()
	} else {
		format!("{}{}", CHANNEL_PREFIX, number)
	}
}

#[derive(Debug, Deserialize)]
struct MessageResource {
	sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
	message: Option<String>,
	code: Option<i64>,
}

pub struct TwilioGateway {
	client: reqwest::Client,
	messages_url: String,
	account_sid: String,
	auth_token: SecretString,
	from: String,
}

impl TwilioGateway {
	pub fn new(
		base_url: &str,
		account_sid: String,
		auth_token: SecretString,
		from_number: &str,
		timeout: Duration,
	) -> Result<Self, GatewayError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Configuration(format!("HTTP client: {}", e)))?;
		let messages_url = format!(
			"{}/2010-04-01/Accounts/{}/Messages.json",
			base_url.trim_end_matches('/'),
			account_sid
		);

		Ok(Self {
			client,
			messages_url,
			account_sid,
			auth_token,
			from: channel_address(from_number),
		})
	}
}

#[async_trait]
impl GatewayInterface for TwilioGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TwilioGatewaySchema)
	}

	async fn send(&self, to: &str, body: &str) -> Result<MessageId, GatewayError> {
		let to = channel_address(to);
		let form = [("From", self.from.as_str()), ("To", to.as_str()), ("Body", body)];

		let response = self
			.client
			.post(&self.messages_url)
			.basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
			.form(&form[..])
			.send()
			.await
			.map_err(|e| GatewayError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let detail = match response.json::<TwilioErrorBody>().await {
				Ok(TwilioErrorBody {
					message: Some(message),
					code,
				}) => match code {
					Some(code) => format!("{} (code {})", message, code),
					None => message,
				},
				_ => status
					.canonical_reason()
					.unwrap_or("unknown error")
					.to_string(),
			};
			return Err(GatewayError::Rejected {
				status: status.as_u16(),
				message: detail,
			});
		}

		let resource: MessageResource = response
			.json()
			.await
			.map_err(|e| GatewayError::Network(format!("Unreadable response: {}", e)))?;
		tracing::debug!(sid = %resource.sid, to = %to, "Twilio accepted message");
		Ok(MessageId(resource.sid))
	}
}

/// Required: `account_sid`, `auth_token`, `from_number`. Optional: `base_url`,
/// `timeout_seconds`.
pub struct TwilioGatewaySchema;

impl ConfigSchema for TwilioGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let non_empty = |value: &toml::Value| match value.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("must not be empty".to_string()),
		};

		let schema = Schema::new(
			vec![
				Field::new("account_sid", FieldType::String).with_validator(non_empty),
				Field::new("auth_token", FieldType::String).with_validator(non_empty),
				Field::new("from_number", FieldType::String).with_validator(non_empty),
			],
			vec![
				Field::new("base_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("must be an http(s) URL".to_string()),
					}
				}),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(120),
					},
				),
			],
		);
		schema.validate(config)
	}
}

fn config_str<'a>(config: &'a toml::Value, key: &str) -> Result<&'a str, GatewayError> {
	config
		.get(key)
		.and_then(|v| v.as_str())
		.ok_or_else(|| GatewayError::Configuration(format!("{} is required", key)))
}

pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	TwilioGatewaySchema
		.validate(config)
		.map_err(|e| GatewayError::Configuration(e.to_string()))?;

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.and_then(|secs| u64::try_from(secs).ok())
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_BASE_URL);

	let gateway = TwilioGateway::new(
		base_url,
		config_str(config, "account_sid")?.to_string(),
		SecretString::from(config_str(config, "auth_token")?),
		config_str(config, "from_number")?,
		Duration::from_secs(timeout),
	)?;
	Ok(Box::new(gateway))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "twilio";
	type Factory = GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_string_contains, header_exists, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config(base_url: &str) -> toml::Value {
		toml::Value::Table(
			toml::from_str::<toml::Table>(&format!(
				r#"
account_sid = "AC123"
auth_token = "secret"
from_number = "+14155238886"
base_url = "{}"
"#,
				base_url
			))
			.unwrap(),
		)
	}

	#[tokio::test]
	async fn test_send_posts_prefixed_numbers() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/2010-04-01/Accounts/AC123/Messages.json"))
			.and(header_exists("authorization"))
			.and(body_string_contains("To=whatsapp%3A%2B919876543210"))
			.and(body_string_contains("From=whatsapp%3A%2B14155238886"))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM42"})))
			.expect(1)
			.mount(&server)
			.await;

		let gateway = create_gateway(&config(&server.uri())).unwrap();
		let id = gateway.send("+919876543210", "Hello").await.unwrap();
		assert_eq!(id, MessageId("SM42".into()));
	}

	#[tokio::test]
	async fn test_provider_error_is_reported() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(400).set_body_json(json!({
				"code": 21211,
				"message": "Invalid 'To' Phone Number"
			})))
			.mount(&server)
			.await;

		let gateway = create_gateway(&config(&server.uri())).unwrap();
		match gateway.send("+1", "Hello").await {
			Err(GatewayError::Rejected { status, message }) => {
				assert_eq!(status, 400);
				assert!(message.contains("21211"));
			},
			other => panic!("expected rejection, got {:?}", other),
		}
	}

	#[test]
	fn test_missing_credentials_are_rejected() {
		let config = toml::Value::Table(
			toml::from_str::<toml::Table>("account_sid = \"AC123\"\nfrom_number = \"+1\"").unwrap(),
		);
		let err = create_gateway(&config).err().unwrap();
		assert!(err.to_string().contains("auth_token"));
	}

	#[test]
	fn test_channel_prefix_is_not_doubled() {
		assert_eq!(channel_address("whatsapp:+1555"), "whatsapp:+1555");
		assert_eq!(channel_address("+1555"), "whatsapp:+1555");
	}
}
