//! Configuration for the dine ordering service.
//!
//! Configuration is a TOML file. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which keeps gateway credentials
//! out of the file itself.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["storage.toml", "gateway.toml"]`.
//! Each top-level section must appear in exactly one file.

mod loader;

pub use loader::ConfigLoader;

use dine_types::NewMenuItem;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echo of the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and presentation of this ordering service.
	pub service: ServiceConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
	/// Outbound messaging gateway selection.
	pub gateway: GatewayConfig,
	/// Menu seeded into an empty store at startup.
	#[serde(default)]
	pub menu: MenuConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Shown in the chat welcome message.
	#[serde(default = "default_business_name")]
	pub business_name: String,
	/// Prefix used when rendering prices in chat messages.
	#[serde(default = "default_currency_symbol")]
	pub currency_symbol: String,
}

fn default_business_name() -> String {
	"Food Paradise".to_string()
}

fn default_currency_symbol() -> String {
	"₹".to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to its raw settings table.
	pub implementations: HashMap<String, toml::Value>,
	/// How often expired entries (e.g. idle sessions) are swept.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
	3600
}

/// Configuration for the messaging gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Which implementation delivers outbound messages.
	pub primary: String,
	/// Implementation name to its raw settings table.
	pub implementations: HashMap<String, toml::Value>,
}

/// Menu seed configuration.
///
/// The seed is only written when the store holds no menu items at all, so
/// editing it later never overwrites staff changes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MenuConfig {
	#[serde(default)]
	pub seed: Vec<NewMenuItem>,
}

impl MenuConfig {
	/// Items to seed: the configured list, or the built-in starter menu.
	pub fn seed_items(&self) -> Vec<NewMenuItem> {
		if !self.seed.is_empty() {
			return self.seed.clone();
		}
		let item = |name: &str, description: &str, price: Decimal| NewMenuItem {
			name: name.to_string(),
			description: description.to_string(),
			price,
			is_available: true,
		};
		vec![
			item("Margherita Pizza", "Classic cheese pizza", Decimal::new(2990, 1)),
			item("Pepperoni Pizza", "Spicy pepperoni pizza", Decimal::new(3490, 1)),
			item("Coke", "Cold beverage", Decimal::new(500, 1)),
			item("Garlic Bread", "Crispy garlic bread", Decimal::new(990, 1)),
		]
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration for the staff dashboard.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default`
/// for `${VAR_NAME:-default}` when the variable is unset. Inputs over 1MB are
/// rejected.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Checks cross-field rules that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if self.gateway.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one gateway implementation must be configured".into(),
			));
		}
		if !self
			.gateway
			.implementations
			.contains_key(&self.gateway.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary gateway '{}' not found in implementations",
				self.gateway.primary
			)));
		}

		for (index, item) in self.menu.seed.iter().enumerate() {
			item.validate().map_err(|e| {
				ConfigError::Validation(format!("menu.seed[{}]: {}", index, e))
			})?;
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

/// Parses a configuration string, resolving environment variables and
/// validating the result. Includes are not followed; use
/// [`Config::from_file`] for that.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
