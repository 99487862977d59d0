//! Registry trait for self-registering implementations.

/// Implemented by the `Registry` marker struct of every storage backend and
/// gateway, tying the name used under `implementations.<name>` in the config
/// file to the factory that builds it.
pub trait ImplementationRegistry {
	/// Configuration name, e.g. `"file"` for `storage.implementations.file`.
	const NAME: &'static str;

	/// Factory function type for this kind of implementation.
	type Factory;

	fn factory() -> Self::Factory;
}
