//! File-backed storage.
//!
//! Each namespace is a directory under the configured base path and each
//! record a `<id>.bin` file inside it, prefixed with a fixed-size header that
//! carries the expiry time. Writes go to a temporary file that is then renamed
//! over the target, so readers see either the old or the new record.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use dine_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/storage";
const RECORD_EXTENSION: &str = "bin";

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Fixed-size record header.
///
/// Binary layout (64 bytes total):
/// - `[0..4]`: magic bytes `DINE`
/// - `[4..6]`: version (u16, little-endian)
/// - `[6..14]`: expiry (u64, little-endian, Unix seconds, 0 = never)
/// - `[14..64]`: reserved, zeroed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
	version: u16,
	expires_at: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"DINE";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			unix_now().saturating_add(ttl.as_secs())
		};
		Self {
			version: Self::VERSION,
			expires_at,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut expires = [0u8; 8];
		expires.copy_from_slice(&bytes[6..14]);
		Ok(Self {
			version,
			expires_at: u64::from_le_bytes(expires),
		})
	}

	fn is_expired(&self) -> bool {
		self.expires_at != 0 && unix_now() >= self.expires_at
	}
}

/// Default expiry per namespace, from the `ttl_<namespace>` settings.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageKey::all()
			.filter_map(|key| {
				config
					.get(format!("ttl_{}", key.as_str()))
					.and_then(|v| v.as_integer())
					.and_then(|secs| u64::try_from(secs).ok())
					.map(|secs| (key, Duration::from_secs(secs)))
			})
			.collect();
		Self { ttls }
	}

	fn ttl_for(&self, namespace: &str) -> Duration {
		namespace
			.parse::<StorageKey>()
			.ok()
			.and_then(|key| self.ttls.get(&key).copied())
			.unwrap_or(Duration::ZERO)
	}
}

/// Encodes an id into a file stem. Characters outside `[A-Za-z0-9+._-]` are
/// written as `%XX`, which keeps the mapping reversible for `list_keys`.
fn encode_id(id: &str) -> String {
	let mut out = String::with_capacity(id.len());
	for byte in id.bytes() {
		match byte {
			b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'+' | b'.' | b'_' | b'-' => {
				out.push(byte as char)
			},
			_ => out.push_str(&format!("%{:02X}", byte)),
		}
	}
	out
}

fn decode_id(stem: &str) -> Option<String> {
	let bytes = stem.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let hex = stem.get(i + 1..i + 3)?;
			out.push(u8::from_str_radix(hex, 16).ok()?);
			i += 3;
		} else {
			out.push(bytes[i]);
			i += 1;
		}
	}
	String::from_utf8(out).ok()
}

fn is_valid_namespace(namespace: &str) -> bool {
	!namespace.is_empty()
		&& namespace
			.bytes()
			.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub struct FileStorage {
	base_path: PathBuf,
	ttl_config: TtlConfig,
	/// Distinguishes temporary files of concurrent writers.
	write_seq: AtomicU64,
}

impl FileStorage {
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
			write_seq: AtomicU64::new(0),
		}
	}

	fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, StorageError> {
		if !is_valid_namespace(namespace) {
			return Err(StorageError::Backend(format!(
				"Invalid namespace '{}'",
				namespace
			)));
		}
		Ok(self.base_path.join(namespace))
	}

	/// Maps `<namespace>:<id>` to its file, returning the namespace as well.
	fn record_path<'k>(&self, key: &'k str) -> Result<(&'k str, PathBuf), StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Invalid storage key '{}'", key)))?;
		let path = self
			.namespace_dir(namespace)?
			.join(format!("{}.{}", encode_id(id), RECORD_EXTENSION));
		Ok((namespace, path))
	}

	async fn read_record(path: &Path) -> Result<Vec<u8>, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = FileHeader::deserialize(&data)?;
		if header.is_expired() {
			return Err(StorageError::NotFound);
		}
		Ok(data[FileHeader::SIZE..].to_vec())
	}

	/// Deletes expired records in one namespace directory.
	async fn sweep_dir(dir: &Path) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = fs::read_dir(dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
				continue;
			}
			let data = match fs::read(&path).await {
				Ok(data) => data,
				Err(e) => {
					tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file");
					continue;
				},
			};
			match FileHeader::deserialize(&data) {
				Ok(header) if header.is_expired() => match fs::remove_file(&path).await {
					Ok(()) => removed += 1,
					Err(e) => {
						tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired file")
					},
				},
				Ok(_) => {},
				Err(e) => {
					tracing::debug!(path = %path.display(), error = %e, "Skipping file without header")
				},
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let (_, path) = self.record_path(key)?;
		Self::read_record(&path).await
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let (namespace, path) = self.record_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let ttl = ttl.unwrap_or_else(|| self.ttl_config.ttl_for(namespace));
		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&FileHeader::new(ttl).serialize());
		file_data.extend_from_slice(&value);

		let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
		let temp_path = path.with_extension(format!("{}.tmp", seq));
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let (_, path) = self.record_path(key)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let (_, path) = self.record_path(key)?;
		match Self::read_record(&path).await {
			Ok(_) => Ok(true),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let dir = self.namespace_dir(namespace)?;
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut ids = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
				continue;
			}
			match path.file_stem().and_then(|s| s.to_str()).and_then(decode_id) {
				Some(id) => ids.push(id),
				None => tracing::debug!(path = %path.display(), "Skipping file with undecodable name"),
			}
		}
		Ok(ids)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		for key in StorageKey::all() {
			let dir = self.base_path.join(key.as_str());
			if fs::try_exists(&dir).await.unwrap_or(false) {
				removed += Self::sweep_dir(&dir).await?;
			}
		}
		Ok(removed)
	}
}

/// Settings: optional `storage_path` plus `ttl_<namespace>` in seconds for
/// each namespace (`ttl_sessions = 86400` expires idle sessions after a day).
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut optional = vec![Field::new("storage_path", FieldType::String)];
		for key in StorageKey::all() {
			optional.push(Field::new(
				format!("ttl_{}", key.as_str()),
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			));
		}
		Schema::new(vec![], optional).validate(config)
	}
}

pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		TtlConfig::from_config(config),
	)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
