//! Builder for constructing the dine engine.
//!
//! Storage and gateway backends are picked by name from the configuration and
//! created through factory functions, so the binary decides which
//! implementations are compiled in.

use crate::engine::DineEngine;
use dine_config::Config;
use dine_gateway::{GatewayError, GatewayInterface, GatewayService};
use dine_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by
/// implementation name.
pub struct DineFactories<SF, GF> {
	pub storage_factories: HashMap<String, SF>,
	pub gateway_factories: HashMap<String, GF>,
}

/// Builds a [`DineEngine`] from configuration.
pub struct DineBuilder {
	config: Config,
}

impl DineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates every configured implementation that has a factory and wires
	/// the primary ones into the engine.
	pub fn build<SF, GF>(self, factories: DineFactories<SF, GF>) -> Result<DineEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		GF: Fn(&toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError>,
	{
		// Create storage implementations
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					storage_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::MissingComponent(format!("primary storage '{}'", primary_storage))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		// Create gateway implementations
		let mut gateway_impls = HashMap::new();
		for (name, config) in &self.config.gateway.implementations {
			let Some(factory) = factories.gateway_factories.get(name) else {
				tracing::warn!(component = "gateway", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.gateway.primary == name;
					tracing::info!(component = "gateway", implementation = %name, enabled = %is_primary, "Loaded");
					gateway_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "gateway",
						implementation = %name,
						error = %e,
						"Failed to create gateway implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create gateway implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary_gateway = &self.config.gateway.primary;
		let gateway_backend = gateway_impls.remove(primary_gateway).ok_or_else(|| {
			BuilderError::MissingComponent(format!("primary gateway '{}'", primary_gateway))
		})?;
		let gateway = Arc::new(GatewayService::new(gateway_backend));

		Ok(DineEngine::new(self.config, storage, gateway))
	}
}
