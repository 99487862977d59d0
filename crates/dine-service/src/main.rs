//! Main entry point for the dine ordering service.
//!
//! Loads the configuration, builds the engine with the compiled-in storage and
//! gateway implementations, seeds the menu and serves the staff API and the
//! WhatsApp webhook until interrupted.

use clap::Parser;
use dine_config::Config;
use dine_core::{DineBuilder, DineEngine, DineFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

use dine_gateway::implementations::log::create_gateway as create_log_gateway;
use dine_gateway::implementations::twilio::create_gateway as create_twilio_gateway;
use dine_storage::implementations::file::create_storage as create_file_storage;
use dine_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the dine service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "DINE_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG wins over --log-level
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started dine");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(build_engine(config.clone())?);
	let seeded = engine.initialize().await?;
	if seeded > 0 {
		tracing::info!(items = seeded, "Menu seeded from configuration");
	}

	let cleanup = {
		let engine = Arc::clone(&engine);
		async move { engine.run_cleanup().await }
	};

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			let api_task = server::start_server(api_config, Arc::clone(&engine));
			tokio::select! {
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
				_ = cleanup => {}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
		None => {
			tracing::warn!("API disabled; no webhook will be received");
			tokio::select! {
				_ = cleanup => {}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
	}

	tracing::info!("Stopped dine");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the engine with every storage and gateway implementation this
/// binary ships.
fn build_engine(config: Config) -> Result<DineEngine, Box<dyn std::error::Error>> {
	let builder = DineBuilder::new(config);

	let storage_factories = create_factory_map!(
		dine_storage::StorageInterface,
		dine_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let gateway_factories = create_factory_map!(
		dine_gateway::GatewayInterface,
		dine_gateway::GatewayError,
		"log" => create_log_gateway,
		"twilio" => create_twilio_gateway,
	);

	let factories = DineFactories {
		storage_factories,
		gateway_factories,
	};

	Ok(builder.build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_args_default_values() {
		let args = Args::try_parse_from(["dine"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args =
			Args::try_parse_from(["dine", "--config", "kitchen.toml", "-l", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("kitchen.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[test]
	fn test_create_factory_map_macro() {
		let factories = create_factory_map!(
			dine_storage::StorageInterface,
			dine_storage::StorageError,
			"memory" => create_memory_storage,
			"file" => create_file_storage,
		);
		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("memory"));
		assert!(factories.contains_key("file"));
	}

	#[tokio::test]
	async fn test_build_engine_with_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let config = Config::from_str(&format!(
			r#"
[service]
id = "dine-test"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[gateway]
primary = "log"
[gateway.implementations.log]
"#,
			dir.path().display()
		))
		.unwrap();

		let engine = build_engine(config).unwrap();
		assert_eq!(engine.initialize().await.unwrap(), 4);
		assert_eq!(engine.store().list_menu().await.unwrap().len(), 4);
	}
}
