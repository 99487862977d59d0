//! Loads a configuration file together with the files it includes.
//!
//! Every top-level section may be defined by only one file, so merging never
//! silently overrides a value.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Follows `include` directives relative to a base directory.
pub struct ConfigLoader {
	base_path: PathBuf,
	/// Canonical paths already read, for cycle detection.
	visited: HashSet<PathBuf>,
	/// Section name to the file that defined it.
	section_origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_origins: HashMap::new(),
		}
	}

	/// Reads `config_path`, merges its includes and validates the result.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let root_path = self.resolve_path(config_path.as_ref())?;
		let mut root = self.read_table(&root_path).await?;

		let includes = take_includes(&mut root)?;
		for key in root.keys() {
			self.section_origins.insert(key.clone(), root_path.clone());
		}

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let included = self.read_table(&include_path).await?;
			if included.contains_key("include") {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					include_path.display()
				)));
			}
			for (key, value) in included {
				if let Some(origin) = self.section_origins.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}",
						key,
						origin.display(),
						include_path.display()
					)));
				}
				self.section_origins.insert(key.clone(), include_path.clone());
				root.insert(key, value);
			}
		}

		let merged = toml::to_string(&root)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize merged config: {}", e)))?;
		merged.parse()
	}

	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		let resolved = resolve_env_vars(&content)?;
		Ok(toml::from_str::<toml::Table>(&resolved)?)
	}

	fn resolve_path(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

/// Removes and returns the `include` entry, a string or an array of strings.
fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const SERVICE: &str = "[service]\nid = \"kitchen-1\"\nbusiness_name = \"Tandoor Corner\"\n";
	const STORAGE: &str =
		"[storage]\nprimary = \"memory\"\n[storage.implementations.memory]\n";
	const GATEWAY: &str = "[gateway]\nprimary = \"log\"\n[gateway.implementations.log]\n";

	#[tokio::test]
	async fn test_single_file_config() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("config.toml"),
			format!("{}{}{}", SERVICE, STORAGE, GATEWAY),
		)
		.unwrap();

		let config = ConfigLoader::new(dir.path())
			.load_config("config.toml")
			.await
			.unwrap();
		assert_eq!(config.service.business_name, "Tandoor Corner");
		assert_eq!(config.gateway.primary, "log");
	}

	#[tokio::test]
	async fn test_includes_are_merged() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = [\"storage.toml\", \"gateway.toml\"]\n{}", SERVICE),
		)
		.unwrap();
		fs::write(dir.path().join("storage.toml"), STORAGE).unwrap();
		fs::write(dir.path().join("gateway.toml"), GATEWAY).unwrap();

		let config = ConfigLoader::new(dir.path())
			.load_config("main.toml")
			.await
			.unwrap();
		assert_eq!(config.service.id, "kitchen-1");
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_duplicate_section_is_rejected() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = \"extra.toml\"\n{}{}{}", SERVICE, STORAGE, GATEWAY),
		)
		.unwrap();
		fs::write(dir.path().join("extra.toml"), STORAGE).unwrap();

		let err = ConfigLoader::new(dir.path())
			.load_config("main.toml")
			.await
			.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'storage'"));
	}

	#[tokio::test]
	async fn test_self_include_is_rejected() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = \"main.toml\"\n{}", SERVICE),
		)
		.unwrap();

		let err = ConfigLoader::new(dir.path())
			.load_config("main.toml")
			.await
			.unwrap_err();
		assert!(err.to_string().contains("Circular include"));
	}

	#[tokio::test]
	async fn test_missing_include_is_reported() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = \"absent.toml\"\n{}", SERVICE),
		)
		.unwrap();

		let err = ConfigLoader::new(dir.path())
			.load_config("main.toml")
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
