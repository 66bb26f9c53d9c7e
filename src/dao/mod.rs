/// Persisted snapshot model definitions.
pub mod models;
/// Round snapshot storage backends and their selection.
pub mod snapshot_store;
/// Storage abstraction layer shared by every backend.
pub mod storage;
